//! Per-run context describing what the user is doing, threaded explicitly
//! through the pipeline and sent along with pricing requests.

use crate::config::{OutputConfig, ProjectConfig};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub version: String,
    pub is_logging: bool,
    pub terraform_binary: String,
    pub terraform_workspace_set: bool,
    pub terraform_source: String,
    /// Set once any project used a non-empty usage file.
    pub has_usage_file: bool,
    pub output_format: String,
    pub output_show_skipped: bool,
    pub output_to_file: bool,
}

impl Environment {
    pub fn new(version: &str, is_logging: bool) -> Self {
        Self {
            version: version.to_string(),
            is_logging,
            ..Self::default()
        }
    }

    /// Record the project about to be loaded.
    pub fn set_terraform_environment(&mut self, project: &ProjectConfig) {
        self.terraform_binary = if project.terraform_binary.is_empty() {
            "terraform".to_string()
        } else {
            project.terraform_binary.clone()
        };
        self.terraform_workspace_set = !project.workspace.is_empty();
        self.terraform_source = if !project.json_file.is_empty() {
            "json_file"
        } else if !project.plan_file.is_empty() {
            "plan_file"
        } else if project.use_state {
            "state"
        } else {
            "dir"
        }
        .to_string();
    }

    /// Record the output about to be rendered.
    pub fn set_output_environment(&mut self, output: &OutputConfig) {
        self.output_format = output.output_format().as_str().to_string();
        self.output_show_skipped = output.show_skipped;
        self.output_to_file = !output.path.is_empty();
    }
}
