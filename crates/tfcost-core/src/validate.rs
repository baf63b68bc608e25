//! Cross-field checks on a resolved [`RunConfig`].
//!
//! Conflicting project sources are hard errors. Redundant combinations only
//! produce warnings, each kind at most once per run. Every project and output
//! is checked; a warning never stops validation of the entries after it.

use crate::config::{OutputFormat, RunConfig};
use crate::error::ConfigError;
use std::fmt;

/// A non-fatal configuration problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageWarning {
    DirIgnoredWithJson,
    ShowSkippedWithJson,
}

impl fmt::Display for UsageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirIgnoredWithJson => {
                write!(f, "Terraform directory is ignored if Terraform JSON is used")
            }
            Self::ShowSkippedWithJson => write!(
                f,
                "The show skipped option is not needed with JSON output as that always includes them."
            ),
        }
    }
}

/// Check all projects and outputs. Returns the warnings to show on success.
pub fn check_usage_errors(config: &RunConfig) -> Result<Vec<UsageWarning>, ConfigError> {
    let mut warnings = Vec::new();

    for project in &config.projects {
        if project.use_state && (!project.plan_file.is_empty() || !project.json_file.is_empty()) {
            return Err(ConfigError::UseStateConflict);
        }

        if !project.json_file.is_empty() && !project.plan_file.is_empty() {
            return Err(ConfigError::PlanSourceConflict);
        }

        if !project.dir.is_empty()
            && !project.json_file.is_empty()
            && !warnings.contains(&UsageWarning::DirIgnoredWithJson)
        {
            warnings.push(UsageWarning::DirIgnoredWithJson);
        }
    }

    if config
        .outputs
        .iter()
        .any(|o| o.output_format() == OutputFormat::Json && o.show_skipped)
    {
        warnings.push(UsageWarning::ShowSkippedWithJson);
    }

    Ok(warnings)
}
