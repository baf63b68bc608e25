//! Collaborator contracts for the estimation pipeline.
//!
//! The pipeline only talks to resource loading, usage loading and pricing
//! through these traits. [`crate::terraform`] and [`crate::pricing`] hold the
//! implementations the CLI uses; tests plug in their own.

use std::path::PathBuf;
use tfcost_core::ProjectConfig;
use tfcost_core::environment::Environment;
use tfcost_core::schema::Project;
use tfcost_core::usage::{UsageData, UsageFileError};

/// Errors turning a project config into resources.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed: {stderr}")]
    Terraform { command: String, stderr: String },
    #[error("failed to create a temporary plan file")]
    TempFile(#[source] std::io::Error),
    #[error("failed to parse Terraform JSON: {0}")]
    Parse(String),
}

/// What kind of failure a [`PricingError`] ultimately is, decided by the
/// innermost error under any context layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingErrorKind {
    Credential,
    Upstream,
    Other,
}

/// Errors from a price source.
#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Pricing API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("response parse error: {0}")]
    Parse(String),
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<PricingError>,
    },
}

impl PricingError {
    /// Wrap with a context message.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub fn kind(&self) -> PricingErrorKind {
        match self.root() {
            Self::InvalidApiKey => PricingErrorKind::Credential,
            Self::Api { .. } => PricingErrorKind::Upstream,
            Self::Http(_) | Self::Parse(_) | Self::Context { .. } => PricingErrorKind::Other,
        }
    }

    /// The innermost error under all context layers.
    pub fn root(&self) -> &PricingError {
        let mut err = self;
        while let Self::Context { source, .. } = err {
            err = source;
        }
        err
    }
}

/// Loads the resources of one project.
pub trait ResourceLoader {
    /// `usage` supplies quantities for usage-based resources.
    fn load_resources(
        &self,
        project: &ProjectConfig,
        usage: &UsageData,
    ) -> Result<Project, LoadError>;
}

/// Loads usage data for a project. An empty path must yield empty usage.
pub trait UsageLoader {
    fn load_usage(&self, path: &str) -> Result<UsageData, UsageFileError>;
}

/// Reads TOML usage files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsageFileLoader;

impl UsageLoader for UsageFileLoader {
    fn load_usage(&self, path: &str) -> Result<UsageData, UsageFileError> {
        UsageData::load(path)
    }
}

/// Fills in unit prices on a project's cost components.
pub trait PriceSource {
    fn populate_prices(&self, project: &mut Project, env: &Environment)
    -> Result<(), PricingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_kind() {
        let err = PricingError::InvalidApiKey
            .context("pricing aws_instance.web")
            .context("pricing project");
        assert_eq!(err.kind(), PricingErrorKind::Credential);
        assert!(matches!(err.root(), PricingError::InvalidApiKey));
        assert_eq!(err.to_string(), "pricing project");

        let err = PricingError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .context("outer");
        assert_eq!(err.kind(), PricingErrorKind::Upstream);

        let err = PricingError::Http("connection refused".to_string());
        assert_eq!(err.kind(), PricingErrorKind::Other);
        assert!(matches!(err.root(), PricingError::Http(_)));
    }

    #[test]
    fn test_hand_built_context_uses_root_kind() {
        let err = PricingError::Context {
            context: "Error pricing aws_instance.web".to_string(),
            source: Box::new(PricingError::Context {
                context: "inner".to_string(),
                source: Box::new(PricingError::InvalidApiKey),
            }),
        };
        assert_eq!(err.kind(), PricingErrorKind::Credential);
    }
}
