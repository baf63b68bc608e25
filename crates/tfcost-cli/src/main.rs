//! CLI binary for tfcost: cloud cost estimates for Terraform projects.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, Parser};
use colored::Colorize;
use std::path::Path;
use tfcost_core::compat::{
    DEPRECATED_ENV_VARS, DEPRECATED_FLAGS, InputKind, InputSet, apply_deprecations,
};
use tfcost_core::config::{Credentials, GlobalConfig, credentials_file_path};
use tfcost_core::environment::Environment;
use tfcost_core::resolve::{ResolveInputs, resolve};
use tfcost_core::validate::check_usage_errors;
use tfcost_core::{ConfigError, RunConfig};
use tfcost_engine::{Collaborators, HttpPriceSource, TerraformLoader, UsageFileLoader};

// Values are read through `ArgMatches` so typed flags can be told apart
// from defaults.
#[derive(Parser)]
#[command(
    name = "tfcost",
    version,
    about = "Show cloud cost estimates for Terraform projects"
)]
#[allow(dead_code)]
struct Cli {
    /// Path to a tfcost config file. Cannot be used with project or output flags
    #[arg(long)]
    config_file: Option<String>,

    /// Path to the Terraform code directory (defaults to current directory)
    #[arg(long)]
    terraform_dir: Option<String>,

    /// Path to a Terraform plan file, relative to the Terraform directory
    #[arg(long)]
    terraform_plan_file: Option<String>,

    /// Path to a Terraform plan JSON file
    #[arg(long)]
    terraform_json_file: Option<String>,

    /// Use Terraform state instead of generating a plan
    #[arg(long)]
    terraform_use_state: bool,

    /// Flags to pass to `terraform plan`
    #[arg(long, allow_hyphen_values = true)]
    terraform_plan_flags: Option<String>,

    /// Path to a usage file with quantities for usage-based resources
    #[arg(long)]
    usage_file: Option<String>,

    /// Output format: table, json, html
    #[arg(long)]
    format: Option<String>,

    /// Show unsupported resources (JSON output always includes them)
    #[arg(long)]
    show_skipped: bool,

    /// Turn off colored output
    #[arg(long)]
    no_color: bool,

    /// Enable structured logging at this level: trace, debug, info, warn, error
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long, hide = true)]
    tfjson: Option<String>,

    #[arg(long, hide = true)]
    tfplan: Option<String>,

    #[arg(long, hide = true)]
    use_tfstate: bool,

    #[arg(long, hide = true)]
    tfdir: Option<String>,

    #[arg(long, hide = true, allow_hyphen_values = true)]
    tfflags: Option<String>,

    #[arg(short, long, hide = true)]
    output: Option<String>,
}

/// Flags the user actually typed, keyed by long name. Defaults are left out
/// so they can't override the environment or a config file.
fn supplied_flags(cmd: &clap::Command, matches: &ArgMatches) -> InputSet {
    let mut flags = InputSet::new();

    for arg in cmd.get_arguments() {
        let Some(long) = arg.get_long() else {
            continue;
        };
        let id = arg.get_id().as_str();
        if matches.value_source(id) != Some(ValueSource::CommandLine) {
            continue;
        }

        let value = if arg.get_action().takes_values() {
            matches.get_one::<String>(id).cloned().unwrap_or_default()
        } else {
            matches.get_flag(id).to_string()
        };
        flags.insert(long, value);
    }

    flags
}

/// `TFCOST_*` variables plus the deprecated names we still honour.
fn supplied_env() -> InputSet {
    std::env::vars()
        .filter(|(name, _)| {
            name.starts_with("TFCOST_")
                || DEPRECATED_ENV_VARS
                    .iter()
                    .any(|(old, _)| *old == name.as_str())
        })
        .collect()
}

fn init_logging(global: &GlobalConfig) {
    let filter = if global.is_logging() {
        tracing_subscriber::EnvFilter::try_new(&global.log_level)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!global.no_color)
        .init();
}

fn print_warning(config: &RunConfig, message: &str) {
    if config.is_logging() {
        tracing::warn!("{}", message);
    } else {
        eprintln!("{} {}", "Warning:".yellow().bold(), message);
    }
}

/// Load credentials, holding back any failure until the flags have been
/// checked for usage errors.
fn load_credentials(path: &Path) -> (Credentials, Option<anyhow::Error>) {
    match Credentials::load(path) {
        Ok(credentials) => (credentials, None),
        Err(err) => (Credentials::default(), Some(err)),
    }
}

/// A credentials file that failed to load is fatal only when nothing else
/// supplied the API key. Otherwise it becomes a warning.
fn unreadable_credentials(config: &RunConfig, err: anyhow::Error) -> Result<String> {
    if config.global.api_key.is_empty() {
        return Err(err);
    }
    Ok(format!("Ignoring credentials file: {:#}", err))
}

/// Exit with clap's usage-error formatting for bad flag combinations.
fn exit_on_usage_error(cmd: &mut clap::Command, err: ConfigError) -> anyhow::Error {
    if err.is_usage_error() {
        cmd.error(ErrorKind::ArgumentConflict, err).exit();
    }
    err.into()
}

fn main() -> Result<()> {
    let mut cmd = Cli::command();
    let matches = cmd.clone().get_matches();

    let mut flags = supplied_flags(&cmd, &matches);
    let mut env = supplied_env();
    let mut notices = apply_deprecations(&mut flags, DEPRECATED_FLAGS, InputKind::Flag);
    notices.extend(apply_deprecations(
        &mut env,
        DEPRECATED_ENV_VARS,
        InputKind::EnvVar,
    ));

    let (credentials, credentials_err) = load_credentials(&credentials_file_path());
    let config = resolve(&ResolveInputs {
        flags: &flags,
        env: &env,
        credentials: &credentials,
    })
    .map_err(|e| exit_on_usage_error(&mut cmd, e))?;

    init_logging(&config.global);
    if config.global.no_color {
        colored::control::set_override(false);
    }

    for notice in &notices {
        print_warning(&config, &notice.to_string());
    }

    let warnings = check_usage_errors(&config).map_err(|e| exit_on_usage_error(&mut cmd, e))?;
    for warning in &warnings {
        print_warning(&config, &warning.to_string());
    }
    if let Some(err) = credentials_err {
        print_warning(&config, &unreadable_credentials(&config, err)?);
    }

    config.global.check_api_key()?;

    tracing::debug!(
        projects = config.projects.len(),
        outputs = config.outputs.len(),
        "resolved configuration"
    );

    let mut run_env = Environment::new(env!("CARGO_PKG_VERSION"), config.is_logging());
    let prices = HttpPriceSource::from_config(&config.global);
    let deps = Collaborators {
        loader: &TerraformLoader,
        usage: &UsageFileLoader,
        prices: &prices,
    };

    tfcost_engine::run(
        &config,
        deps,
        &mut run_env,
        &mut std::io::stdout().lock(),
        &mut std::io::stderr(),
    )?;

    Ok(())
}
