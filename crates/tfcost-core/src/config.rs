//! Run configuration model and the TOML files it can be loaded from.
//!
//! A run is described by global settings plus ordered project and output
//! configs. They come either from flags/environment (see [`crate::resolve`]) or
//! from a config file:
//!
//! ```toml
//! version = "0.1"
//!
//! [[projects]]
//! dir = "infra/prod"
//! usage_file = "infra/prod/usage.toml"
//!
//! [[outputs]]
//! format = "json"
//! path = "costs.json"
//! ```

use crate::error::ConfigError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Pricing API used when nothing else is configured.
pub const DEFAULT_PRICING_API_ENDPOINT: &str = "https://pricing.api.tfcost.dev";

/// The only config file schema version understood.
pub const CONFIG_FILE_VERSION: &str = "0.1";

/// Environment variable holding the pricing API key.
pub const API_KEY_ENV_VAR: &str = "TFCOST_API_KEY";

/// Settings that apply to the whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub api_key: String,
    pub pricing_api_endpoint: String,
    /// Empty means structured logging is off and progress goes to stderr.
    pub log_level: String,
    pub no_color: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            pricing_api_endpoint: DEFAULT_PRICING_API_ENDPOINT.to_string(),
            log_level: String::new(),
            no_color: false,
        }
    }
}

impl GlobalConfig {
    pub fn is_logging(&self) -> bool {
        !self.log_level.is_empty()
    }

    pub fn uses_default_endpoint(&self) -> bool {
        self.pricing_api_endpoint.trim_end_matches('/') == DEFAULT_PRICING_API_ENDPOINT
    }

    /// Fail when the default pricing API would be called without a key.
    /// Self-hosted endpoints may not need one.
    pub fn check_api_key(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() && self.uses_default_endpoint() {
            return Err(ConfigError::MissingApiKey {
                credentials_path: credentials_file_path(),
            });
        }
        Ok(())
    }
}

/// One Terraform source to estimate. Empty strings mean "not set".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub dir: String,
    /// Relative to `dir`.
    pub plan_file: String,
    pub json_file: String,
    pub use_state: bool,
    pub plan_flags: String,
    pub workspace: String,
    pub terraform_binary: String,
    pub usage_file: String,
}

impl ProjectConfig {
    /// Directory Terraform commands run in.
    pub fn directory(&self) -> &str {
        if self.dir.is_empty() { "." } else { &self.dir }
    }

    /// Human-readable description of where resources are loaded from.
    pub fn source_label(&self) -> String {
        let src = [&self.json_file, &self.plan_file, &self.dir]
            .into_iter()
            .find(|s| !s.is_empty())
            .map_or("", String::as_str);

        let mut label = if src.is_empty() || src == "." {
            "current directory".to_string()
        } else {
            src.to_string()
        };

        if !self.workspace.is_empty() {
            label.push_str(&format!(" ({})", self.workspace));
        }
        label
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Html,
}

impl OutputFormat {
    /// Case-insensitive; anything unrecognised renders as a table.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "html" => Self::Html,
            _ => Self::Table,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Html => "html",
        }
    }
}

/// One rendered output and where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
    pub show_skipped: bool,
    pub no_color: bool,
    /// Empty means standard output.
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table.as_str().to_string(),
            show_skipped: false,
            no_color: false,
            path: String::new(),
        }
    }
}

impl OutputConfig {
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_name(&self.format)
    }
}

/// Fully resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub global: GlobalConfig,
    pub projects: Vec<ProjectConfig>,
    pub outputs: Vec<OutputConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            projects: vec![ProjectConfig::default()],
            outputs: vec![OutputConfig::default()],
        }
    }
}

impl RunConfig {
    pub fn is_logging(&self) -> bool {
        self.global.is_logging()
    }
}

/// On-disk shape of `--config-file`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub version: Option<String>,
    pub projects: Vec<ProjectConfig>,
    pub outputs: Vec<OutputConfig>,
}

impl ConfigFile {
    /// Load and check a config file. A file without outputs gets the default
    /// table output; a file without projects is rejected.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_err = |message: String| ConfigError::FileParse {
            path: path.to_path_buf(),
            message,
        };

        let mut file: Self = toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?;

        if let Some(version) = &file.version
            && version != CONFIG_FILE_VERSION
        {
            return Err(parse_err(format!(
                "unsupported config file version '{}', expected '{}'",
                version, CONFIG_FILE_VERSION
            )));
        }
        if file.projects.is_empty() {
            return Err(parse_err("no projects defined".to_string()));
        }
        if file.outputs.is_empty() {
            file.outputs.push(OutputConfig::default());
        }

        Ok(file)
    }
}

/// Contents of the user's credentials file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub pricing_api_endpoint: Option<String>,
}

impl Credentials {
    /// Load credentials, falling back to empty ones if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read credentials from {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse credentials in {}", path.display()))
    }
}

/// `<config dir>/tfcost/credentials.toml`.
pub fn credentials_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("tfcost")
        .join("credentials.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_run_config() {
        let config = RunConfig::default();
        assert_eq!(config.projects.len(), 1);
        assert_eq!(config.outputs.len(), 1);
        assert_eq!(config.outputs[0].output_format(), OutputFormat::Table);
        assert_eq!(
            config.global.pricing_api_endpoint,
            DEFAULT_PRICING_API_ENDPOINT
        );
        assert!(!config.is_logging());
    }

    #[test]
    fn test_output_format_from_name() {
        assert_eq!(OutputFormat::from_name("JSON"), OutputFormat::Json);
        assert_eq!(OutputFormat::from_name("Html"), OutputFormat::Html);
        assert_eq!(OutputFormat::from_name("table"), OutputFormat::Table);
        assert_eq!(OutputFormat::from_name("yaml"), OutputFormat::Table);
        assert_eq!(OutputFormat::from_name(""), OutputFormat::Table);
    }

    #[test]
    fn test_source_label_priority() {
        let mut project = ProjectConfig::default();
        assert_eq!(project.source_label(), "current directory");

        project.dir = ".".to_string();
        assert_eq!(project.source_label(), "current directory");

        project.dir = "infra".to_string();
        assert_eq!(project.source_label(), "infra");

        project.plan_file = "plan.out".to_string();
        assert_eq!(project.source_label(), "plan.out");

        project.json_file = "plan.json".to_string();
        project.workspace = "staging".to_string();
        assert_eq!(project.source_label(), "plan.json (staging)");
    }

    #[test]
    fn test_check_api_key() {
        let mut global = GlobalConfig::default();
        let err = global.check_api_key().unwrap_err();
        assert!(err.to_string().contains(API_KEY_ENV_VAR));

        global.pricing_api_endpoint = "http://localhost:4000".to_string();
        assert!(global.check_api_key().is_ok());

        global.pricing_api_endpoint = DEFAULT_PRICING_API_ENDPOINT.to_string();
        global.api_key = "key".to_string();
        assert!(global.check_api_key().is_ok());
    }

    #[test]
    fn test_config_file_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tfcost.toml");
        std::fs::write(
            &path,
            r#"
version = "0.1"

[[projects]]
dir = "infra/prod"
workspace = "prod"

[[projects]]
json_file = "plan.json"
"#,
        )
        .unwrap();

        let file = ConfigFile::load(&path).unwrap();
        assert_eq!(file.projects.len(), 2);
        assert_eq!(file.projects[0].dir, "infra/prod");
        assert_eq!(file.projects[1].json_file, "plan.json");
        assert_eq!(file.outputs, vec![OutputConfig::default()]);
    }

    #[test]
    fn test_config_file_errors() {
        let tmp = tempfile::tempdir().unwrap();

        let missing = ConfigFile::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::FileRead { .. }));

        let malformed = tmp.path().join("bad.toml");
        std::fs::write(&malformed, "[[projects]\n").unwrap();
        assert!(matches!(
            ConfigFile::load(&malformed).unwrap_err(),
            ConfigError::FileParse { .. }
        ));

        let wrong_version = tmp.path().join("v.toml");
        std::fs::write(&wrong_version, "version = \"9\"\n[[projects]]\ndir = \".\"\n").unwrap();
        let err = ConfigFile::load(&wrong_version).unwrap_err();
        assert!(err.to_string().contains("unsupported config file version"));

        let empty = tmp.path().join("empty.toml");
        std::fs::write(&empty, "version = \"0.1\"\n").unwrap();
        assert!(
            ConfigFile::load(&empty)
                .unwrap_err()
                .to_string()
                .contains("no projects")
        );
    }

    #[test]
    fn test_credentials_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("credentials.toml");
        assert_eq!(Credentials::load(&path).unwrap(), Credentials::default());

        std::fs::write(&path, "api_key = \"abc\"\n").unwrap();
        let creds = Credentials::load(&path).unwrap();
        assert_eq!(creds.api_key.as_deref(), Some("abc"));
        assert!(creds.pricing_api_endpoint.is_none());
    }
}
