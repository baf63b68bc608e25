//! Usage files: estimated quantities for usage-based resources.
//!
//! ```toml
//! version = "0.1"
//!
//! [resource_usage."aws_lambda_function.api"]
//! monthly_requests = 2000000
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Usage values for one resource, keyed by usage name.
pub type ResourceUsage = BTreeMap<String, f64>;

/// Errors reading a usage file.
#[derive(Debug, thiserror::Error)]
pub enum UsageFileError {
    #[error("failed to read usage file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse usage file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsageFile {
    #[allow(dead_code)]
    version: Option<String>,
    resource_usage: BTreeMap<String, ResourceUsage>,
}

/// Usage for all resources of a project, keyed by resource address.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageData {
    resources: BTreeMap<String, ResourceUsage>,
}

impl UsageData {
    pub fn new(resources: BTreeMap<String, ResourceUsage>) -> Self {
        Self { resources }
    }

    /// Load a usage file. An empty path yields empty usage.
    pub fn load(path: &str) -> Result<Self, UsageFileError> {
        if path.is_empty() {
            return Ok(Self::default());
        }
        let path = Path::new(path);
        let content = std::fs::read_to_string(path).map_err(|source| UsageFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: UsageFile = toml::from_str(&content).map_err(|e| UsageFileError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::new(file.resource_usage))
    }

    pub fn get(&self, address: &str) -> Option<&ResourceUsage> {
        self.resources.get(address)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}
