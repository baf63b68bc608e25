//! Layered resolution of the run configuration.
//!
//! Every input source produces a partial [`Layer`]. Layers are folded in order
//! on top of [`RunConfig::default`], later sources overwriting earlier ones:
//! credentials file → environment → flags. A `--config-file` replaces the
//! project and output lists wholesale and can't be mixed with project or output
//! flags.
//!
//! Inputs must already have gone through [`crate::compat::apply_deprecations`].

use crate::compat::InputSet;
use crate::config::{ConfigFile, Credentials, GlobalConfig, OutputConfig, ProjectConfig, RunConfig};
use crate::error::ConfigError;
use std::path::Path;

/// Flags that describe a project. Any of them rules out `--config-file`.
pub const PROJECT_FLAGS: &[&str] = &[
    "terraform-dir",
    "terraform-plan-file",
    "terraform-json-file",
    "terraform-use-state",
    "terraform-plan-flags",
    "usage-file",
];

/// Flags that describe an output. Any of them rules out `--config-file`.
pub const OUTPUT_FLAGS: &[&str] = &["format", "show-skipped"];

/// Partial global settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalPatch {
    pub api_key: Option<String>,
    pub pricing_api_endpoint: Option<String>,
    pub log_level: Option<String>,
    pub no_color: Option<bool>,
}

impl GlobalPatch {
    fn merge(self, over: Self) -> Self {
        Self {
            api_key: over.api_key.or(self.api_key),
            pricing_api_endpoint: over.pricing_api_endpoint.or(self.pricing_api_endpoint),
            log_level: over.log_level.or(self.log_level),
            no_color: over.no_color.or(self.no_color),
        }
    }

    fn apply(self, target: &mut GlobalConfig) {
        if let Some(v) = self.api_key {
            target.api_key = v;
        }
        if let Some(v) = self.pricing_api_endpoint {
            target.pricing_api_endpoint = v;
        }
        if let Some(v) = self.log_level {
            target.log_level = v;
        }
        if let Some(v) = self.no_color {
            target.no_color = v;
        }
    }
}

/// Partial project settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub dir: Option<String>,
    pub plan_file: Option<String>,
    pub json_file: Option<String>,
    pub use_state: Option<bool>,
    pub plan_flags: Option<String>,
    pub workspace: Option<String>,
    pub terraform_binary: Option<String>,
    pub usage_file: Option<String>,
}

impl ProjectPatch {
    fn merge(self, over: Self) -> Self {
        Self {
            dir: over.dir.or(self.dir),
            plan_file: over.plan_file.or(self.plan_file),
            json_file: over.json_file.or(self.json_file),
            use_state: over.use_state.or(self.use_state),
            plan_flags: over.plan_flags.or(self.plan_flags),
            workspace: over.workspace.or(self.workspace),
            terraform_binary: over.terraform_binary.or(self.terraform_binary),
            usage_file: over.usage_file.or(self.usage_file),
        }
    }

    fn apply(self, target: &mut ProjectConfig) {
        let strings = [
            (self.dir, &mut target.dir),
            (self.plan_file, &mut target.plan_file),
            (self.json_file, &mut target.json_file),
            (self.plan_flags, &mut target.plan_flags),
            (self.workspace, &mut target.workspace),
            (self.terraform_binary, &mut target.terraform_binary),
            (self.usage_file, &mut target.usage_file),
        ];
        for (value, field) in strings {
            if let Some(v) = value {
                *field = v;
            }
        }
        if let Some(v) = self.use_state {
            target.use_state = v;
        }
    }

    /// Like `apply`, but only for fields the target left empty.
    fn fill(self, target: &mut ProjectConfig) {
        let strings = [
            (self.dir, &mut target.dir),
            (self.plan_file, &mut target.plan_file),
            (self.json_file, &mut target.json_file),
            (self.plan_flags, &mut target.plan_flags),
            (self.workspace, &mut target.workspace),
            (self.terraform_binary, &mut target.terraform_binary),
            (self.usage_file, &mut target.usage_file),
        ];
        for (value, field) in strings {
            if let Some(v) = value
                && field.is_empty()
            {
                *field = v;
            }
        }
    }
}

/// Partial output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputPatch {
    pub format: Option<String>,
    pub show_skipped: Option<bool>,
}

impl OutputPatch {
    fn merge(self, over: Self) -> Self {
        Self {
            format: over.format.or(self.format),
            show_skipped: over.show_skipped.or(self.show_skipped),
        }
    }

    fn apply(self, target: &mut OutputConfig) {
        if let Some(v) = self.format {
            target.format = v;
        }
        if let Some(v) = self.show_skipped {
            target.show_skipped = v;
        }
    }
}

/// Everything one source has to say about the run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layer {
    pub global: GlobalPatch,
    pub project: ProjectPatch,
    pub output: OutputPatch,
}

impl Layer {
    /// `over` wins wherever it sets a value.
    pub fn merge(self, over: Layer) -> Layer {
        Layer {
            global: self.global.merge(over.global),
            project: self.project.merge(over.project),
            output: self.output.merge(over.output),
        }
    }
}

/// A source of configuration values.
pub trait ConfigSource {
    fn layer(&self) -> Layer;
}

/// Fold sources left to right; later sources take precedence.
pub fn fold_layers(sources: &[&dyn ConfigSource]) -> Layer {
    sources
        .iter()
        .fold(Layer::default(), |acc, source| acc.merge(source.layer()))
}

/// Values from the credentials file.
pub struct CredentialsSource<'a>(pub &'a Credentials);

impl ConfigSource for CredentialsSource<'_> {
    fn layer(&self) -> Layer {
        Layer {
            global: GlobalPatch {
                api_key: self.0.api_key.clone(),
                pricing_api_endpoint: self.0.pricing_api_endpoint.clone(),
                ..GlobalPatch::default()
            },
            ..Layer::default()
        }
    }
}

/// Values from `TFCOST_*` environment variables. Empty variables count as unset.
pub struct EnvSource<'a>(pub &'a InputSet);

impl EnvSource<'_> {
    fn var(&self, name: &str) -> Option<String> {
        self.0
            .get(name)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

impl ConfigSource for EnvSource<'_> {
    fn layer(&self) -> Layer {
        Layer {
            global: GlobalPatch {
                api_key: self.var("TFCOST_API_KEY"),
                pricing_api_endpoint: self.var("TFCOST_PRICING_API_ENDPOINT"),
                log_level: self.var("TFCOST_LOG_LEVEL"),
                no_color: self.var("TFCOST_NO_COLOR").and_then(|v| parse_bool(&v)),
            },
            project: ProjectPatch {
                workspace: self.var("TFCOST_TERRAFORM_WORKSPACE"),
                terraform_binary: self.var("TFCOST_TERRAFORM_BINARY"),
                ..ProjectPatch::default()
            },
            output: OutputPatch::default(),
        }
    }
}

/// Values from explicitly supplied CLI flags.
pub struct FlagSource<'a>(pub &'a InputSet);

impl FlagSource<'_> {
    fn string(&self, name: &str) -> Option<String> {
        self.0.get(name).map(str::to_string)
    }

    fn bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(parse_bool)
    }
}

impl ConfigSource for FlagSource<'_> {
    fn layer(&self) -> Layer {
        Layer {
            global: GlobalPatch {
                log_level: self.string("log-level"),
                no_color: self.bool("no-color"),
                ..GlobalPatch::default()
            },
            project: ProjectPatch {
                dir: self.string("terraform-dir"),
                plan_file: self.string("terraform-plan-file"),
                json_file: self.string("terraform-json-file"),
                use_state: self.bool("terraform-use-state"),
                plan_flags: self.string("terraform-plan-flags"),
                usage_file: self.string("usage-file"),
                ..ProjectPatch::default()
            },
            output: OutputPatch {
                format: self.string("format"),
                show_skipped: self.bool("show-skipped"),
            },
        }
    }
}

/// Raw inputs to resolution.
pub struct ResolveInputs<'a> {
    /// Explicitly supplied flags only.
    pub flags: &'a InputSet,
    pub env: &'a InputSet,
    pub credentials: &'a Credentials,
}

/// Resolve the run configuration.
pub fn resolve(inputs: &ResolveInputs<'_>) -> Result<RunConfig, ConfigError> {
    let credentials = CredentialsSource(inputs.credentials);
    let env = EnvSource(inputs.env);
    let flags = FlagSource(inputs.flags);

    let has_project_flags = PROJECT_FLAGS.iter().any(|f| inputs.flags.is_set(f));
    let has_output_flags = OUTPUT_FLAGS.iter().any(|f| inputs.flags.is_set(f));

    let mut config = RunConfig::default();

    if let Some(path) = inputs.flags.get("config-file") {
        if has_project_flags || has_output_flags {
            return Err(ConfigError::ConfigFileConflict);
        }

        let file = ConfigFile::load(Path::new(path))?;
        config.projects = file.projects;
        config.outputs = file.outputs;

        let env_project = env.layer().project;
        for project in &mut config.projects {
            env_project.clone().fill(project);
        }
    } else {
        let layer = fold_layers(&[&env as &dyn ConfigSource, &flags]);
        layer.project.apply(&mut config.projects[0]);
        layer.output.apply(&mut config.outputs[0]);
    }

    fold_layers(&[&credentials as &dyn ConfigSource, &env, &flags])
        .global
        .apply(&mut config.global);

    if config.global.no_color {
        for output in &mut config.outputs {
            output.no_color = true;
        }
    }

    Ok(config)
}

/// Lenient boolean parsing shared by flags and environment variables.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> InputSet {
        pairs.iter().copied().collect()
    }

    fn resolve_with(flags: &InputSet, env: &InputSet, credentials: &Credentials) -> RunConfig {
        resolve(&ResolveInputs {
            flags,
            env,
            credentials,
        })
        .unwrap()
    }

    #[test]
    fn test_no_inputs_gives_defaults() {
        let config = resolve_with(&InputSet::new(), &InputSet::new(), &Credentials::default());
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_config_file_conflicts_with_every_project_and_output_flag() {
        for flag in PROJECT_FLAGS.iter().chain(OUTPUT_FLAGS) {
            for value in ["", "false", "x"] {
                let flags = set(&[("config-file", "does-not-matter.toml"), (*flag, value)]);
                let err = resolve(&ResolveInputs {
                    flags: &flags,
                    env: &InputSet::new(),
                    credentials: &Credentials::default(),
                })
                .unwrap_err();
                assert!(
                    matches!(err, ConfigError::ConfigFileConflict),
                    "--{} {:?} should conflict with --config-file",
                    flag,
                    value
                );
                assert!(err.is_usage_error());
            }
        }
    }

    #[test]
    fn test_global_flags_allowed_with_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tfcost.toml");
        std::fs::write(&path, "[[projects]]\njson_file = \"plan.json\"\n").unwrap();

        let flags = set(&[
            ("config-file", path.to_str().unwrap()),
            ("no-color", "true"),
            ("log-level", "debug"),
        ]);
        let config = resolve_with(&flags, &InputSet::new(), &Credentials::default());

        assert_eq!(config.projects[0].json_file, "plan.json");
        assert!(config.outputs[0].no_color);
        assert_eq!(config.global.log_level, "debug");
        assert!(config.is_logging());
    }

    #[test]
    fn test_config_file_load_error_propagates() {
        let flags = set(&[("config-file", "/nonexistent/tfcost.toml")]);
        let err = resolve(&ResolveInputs {
            flags: &flags,
            env: &InputSet::new(),
            credentials: &Credentials::default(),
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
        assert!(!err.is_usage_error());
    }

    #[test]
    fn test_env_fills_gaps_in_config_file_projects() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tfcost.toml");
        std::fs::write(
            &path,
            "[[projects]]\ndir = \"a\"\nworkspace = \"from-file\"\n\n[[projects]]\ndir = \"b\"\n",
        )
        .unwrap();

        let flags = set(&[("config-file", path.to_str().unwrap())]);
        let env = set(&[("TFCOST_TERRAFORM_WORKSPACE", "from-env")]);
        let config = resolve_with(&flags, &env, &Credentials::default());

        assert_eq!(config.projects[0].workspace, "from-file");
        assert_eq!(config.projects[1].workspace, "from-env");
    }

    #[test]
    fn test_flags_beat_env_beat_defaults() {
        let env = set(&[
            ("TFCOST_TERRAFORM_WORKSPACE", "env-ws"),
            ("TFCOST_TERRAFORM_BINARY", "/opt/terraform"),
            ("TFCOST_LOG_LEVEL", "warn"),
            ("TFCOST_NO_COLOR", "true"),
        ]);
        let flags = set(&[
            ("terraform-dir", "infra"),
            ("log-level", "debug"),
            ("no-color", "false"),
        ]);
        let config = resolve_with(&flags, &env, &Credentials::default());

        let project = &config.projects[0];
        assert_eq!(project.dir, "infra");
        assert_eq!(project.workspace, "env-ws");
        assert_eq!(project.terraform_binary, "/opt/terraform");
        assert_eq!(config.global.log_level, "debug");
        assert!(!config.global.no_color);
        assert!(!config.outputs[0].no_color);
    }

    #[test]
    fn test_output_flags() {
        let flags = set(&[("format", "json"), ("show-skipped", "true")]);
        let config = resolve_with(&flags, &InputSet::new(), &Credentials::default());
        assert_eq!(config.outputs.len(), 1);
        assert_eq!(config.outputs[0].format, "json");
        assert!(config.outputs[0].show_skipped);
        assert!(config.outputs[0].path.is_empty());
    }

    #[test]
    fn test_credentials_are_lowest_priority() {
        let credentials = Credentials {
            api_key: Some("from-file".to_string()),
            pricing_api_endpoint: Some("http://localhost:4000".to_string()),
        };
        let config = resolve_with(&InputSet::new(), &InputSet::new(), &credentials);
        assert_eq!(config.global.api_key, "from-file");
        assert_eq!(config.global.pricing_api_endpoint, "http://localhost:4000");

        let env = set(&[("TFCOST_API_KEY", "from-env"), ("TFCOST_PRICING_API_ENDPOINT", "")]);
        let config = resolve_with(&InputSet::new(), &env, &credentials);
        assert_eq!(config.global.api_key, "from-env");
        assert_eq!(config.global.pricing_api_endpoint, "http://localhost:4000");
    }

    #[test]
    fn test_fold_layers_order() {
        struct Fixed(&'static str);
        impl ConfigSource for Fixed {
            fn layer(&self) -> Layer {
                Layer {
                    project: ProjectPatch {
                        dir: Some(self.0.to_string()),
                        ..ProjectPatch::default()
                    },
                    ..Layer::default()
                }
            }
        }

        let layer = fold_layers(&[&Fixed("first"), &Fixed("second")]);
        assert_eq!(layer.project.dir.as_deref(), Some("second"));
        assert_eq!(fold_layers(&[]), Layer::default());
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
