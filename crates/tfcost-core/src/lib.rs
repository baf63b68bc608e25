//! Core types for tfcost: run configuration, input resolution and the cost model.
//!
//! Provides the configuration model ([`config::RunConfig`]), deprecated-input
//! handling ([`compat`]), layered resolution ([`resolve`]), cross-field checks
//! ([`validate`]), usage files, and the project/resource cost model ([`schema`]).

pub mod compat;
pub mod config;
pub mod environment;
pub mod error;
pub mod resolve;
pub mod schema;
pub mod usage;
pub mod validate;

pub use config::{OutputConfig, OutputFormat, ProjectConfig, RunConfig};
pub use error::ConfigError;
