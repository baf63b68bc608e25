//! Configuration errors.

use std::path::PathBuf;

/// Errors raised while resolving or validating the run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("--config-file flag cannot be used with other project and output flags")]
    ConfigFileConflict,

    #[error(
        "The use state option cannot be used with the Terraform plan or Terraform JSON options"
    )]
    UseStateConflict,

    #[error("Please provide either a Terraform Plan JSON file or a Terraform Plan file")]
    PlanSourceConflict,

    #[error("failed to read {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    FileParse { path: PathBuf, message: String },

    #[error(
        "No TFCOST_API_KEY environment variable is set.\nAdd an api_key to {} or export TFCOST_API_KEY.",
        credentials_path.display()
    )]
    MissingApiKey { credentials_path: PathBuf },
}

impl ConfigError {
    /// Whether this error is a bad flag/config combination the user should fix
    /// by changing the invocation. The CLI prints usage guidance for these.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigFileConflict | Self::UseStateConflict | Self::PlanSourceConflict
        )
    }
}
