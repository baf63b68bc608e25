//! Estimation pipeline.
//!
//! Phases run strictly in order, one project at a time:
//!   1. **Load**: usage file, then resources, for every project
//!   2. **Price**: unit prices for every project, under one spinner
//!   3. **Cost**: hourly/monthly costs and the prior-state diff
//!   4. **Dispatch**: render and write every configured output
//!
//! A failure in phases 1 or 2 aborts the run before anything is rendered.

use crate::classify::{ClassifiedError, classify};
use crate::dispatch::{DispatchError, dispatch};
use crate::progress::{Spinner, SpinnerOptions};
use crate::provider::{LoadError, PriceSource, ResourceLoader, UsageLoader};
use std::io::Write;
use tfcost_core::RunConfig;
use tfcost_core::environment::Environment;
use tfcost_core::schema::{self, Project};
use tfcost_core::usage::UsageFileError;

/// The collaborators the pipeline delegates to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub loader: &'a dyn ResourceLoader,
    pub usage: &'a dyn UsageLoader,
    pub prices: &'a dyn PriceSource,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Error loading usage file for {label}")]
    UsageFile {
        label: String,
        #[source]
        source: UsageFileError,
    },
    #[error("Error loading resources from {label}")]
    ResourceLoad {
        label: String,
        #[source]
        source: LoadError,
    },
    #[error(transparent)]
    Pricing(ClassifiedError),
    #[error(transparent)]
    Output(#[from] DispatchError),
}

/// Load, price and cost every configured project.
///
/// Progress lines go to `tracing` when logging is enabled, otherwise to
/// `err_stream`.
pub fn estimate(
    cfg: &RunConfig,
    deps: Collaborators<'_>,
    env: &mut Environment,
    err_stream: &mut dyn Write,
) -> Result<Vec<Project>, PipelineError> {
    let logging = cfg.is_logging();
    let mut projects = Vec::with_capacity(cfg.projects.len());

    for project_cfg in &cfg.projects {
        let label = project_cfg.source_label();
        if logging {
            tracing::info!("Loading resources from {}", label);
        } else {
            // Progress lines are cosmetic; a closed stderr must not fail the run.
            let _ = writeln!(err_stream, "Loading resources from {}", label);
        }

        env.set_terraform_environment(project_cfg);

        let usage = deps
            .usage
            .load_usage(&project_cfg.usage_file)
            .map_err(|source| PipelineError::UsageFile {
                label: label.clone(),
                source,
            })?;
        if !usage.is_empty() {
            env.has_usage_file = true;
        }

        let project = deps
            .loader
            .load_resources(project_cfg, &usage)
            .map_err(|source| PipelineError::ResourceLoad { label, source })?;
        tracing::debug!(
            project = %project.name,
            resources = project.resources.len(),
            "loaded resources"
        );
        projects.push(project);
    }

    let spinner = Spinner::start(
        "Calculating cost estimate",
        SpinnerOptions {
            enable_logging: logging,
            no_color: cfg.global.no_color,
        },
    );

    for project in &mut projects {
        if let Err(e) = deps.prices.populate_prices(project, env) {
            spinner.fail();
            tracing::debug!(project = %project.name, error = %e, "pricing failed");
            return Err(PipelineError::Pricing(classify(e, cfg.global.no_color)));
        }
    }
    spinner.success();

    for project in &mut projects {
        schema::calculate_costs(project);
        project.calculate_diff();
    }

    Ok(projects)
}

/// Run the whole pipeline and write every output.
pub fn run(
    cfg: &RunConfig,
    deps: Collaborators<'_>,
    env: &mut Environment,
    stdout: &mut dyn Write,
    err_stream: &mut dyn Write,
) -> Result<(), PipelineError> {
    let projects = estimate(cfg, deps, env, err_stream)?;
    dispatch(&projects, &cfg.outputs, env, stdout)?;
    Ok(())
}
