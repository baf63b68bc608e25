//! Estimation pipeline for tfcost.
//!
//! Turns a resolved [`tfcost_core::RunConfig`] into rendered cost reports.
//!
//! # Architecture
//!
//! - **provider**: collaborator traits (`ResourceLoader`, `UsageLoader`, `PriceSource`)
//! - **terraform**: `ResourceLoader` backed by Terraform plan/state JSON
//! - **pricing**: `PriceSource` backed by the GraphQL pricing API
//! - **pipeline**: load → price → cost → diff, then dispatch
//! - **classify**: user-facing classification of pricing failures
//! - **dispatch** / **output**: rendering and writing each configured output
//! - **progress**: terminal spinner via `indicatif`

pub mod classify;
pub mod dispatch;
pub mod output;
pub mod pipeline;
pub mod pricing;
pub mod progress;
pub mod provider;
pub mod terraform;

pub use classify::{ClassifiedError, classify};
pub use dispatch::{DispatchError, OutputError, dispatch};
pub use pipeline::{Collaborators, PipelineError, estimate, run};
pub use pricing::HttpPriceSource;
pub use provider::{
    LoadError, PriceSource, PricingError, PricingErrorKind, ResourceLoader, UsageFileLoader,
    UsageLoader,
};
pub use terraform::TerraformLoader;
