//! Render every configured output and write it to its sink.

use crate::output::{self, Options, RenderError, Root};
use std::io::Write;
use std::path::PathBuf;
use tfcost_core::environment::Environment;
use tfcost_core::schema::Project;
use tfcost_core::{OutputConfig, OutputFormat};

/// Why a single output failed.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Error generating output")]
    Render {
        format: OutputFormat,
        #[source]
        source: RenderError,
    },
    #[error("Error saving output")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Error writing output to stdout")]
    Stdout(#[source] std::io::Error),
}

/// Every output that failed, with its position in the configured outputs.
#[derive(Debug, thiserror::Error)]
#[error("{} of {total} outputs failed: {}", .failures.len(), summarize(.failures))]
pub struct DispatchError {
    pub failures: Vec<(usize, OutputError)>,
    pub total: usize,
}

fn summarize(failures: &[(usize, OutputError)]) -> String {
    failures
        .iter()
        .map(|(i, err)| match err {
            OutputError::Write { path, source } => {
                format!("#{} {}: {} ({})", i + 1, err, source, path.display())
            }
            OutputError::Render { format, source } => {
                format!("#{} {}: {} ({})", i + 1, err, source, format.as_str())
            }
            OutputError::Stdout(source) => format!("#{} {}: {}", i + 1, err, source),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Render and write each output in order. A failing output does not stop the
/// others; all failures are reported together at the end.
pub fn dispatch(
    projects: &[Project],
    outputs: &[OutputConfig],
    env: &mut Environment,
    stdout: &mut dyn Write,
) -> Result<(), DispatchError> {
    let root = output::to_output_format(projects);
    let mut failures = Vec::new();

    for (i, out) in outputs.iter().enumerate() {
        env.set_output_environment(out);
        if let Err(e) = write_output(&root, out, stdout) {
            tracing::debug!(output = i, error = %e, "output failed");
            failures.push((i, e));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(DispatchError {
            failures,
            total: outputs.len(),
        })
    }
}

fn write_output(
    root: &Root,
    out: &OutputConfig,
    stdout: &mut dyn Write,
) -> Result<(), OutputError> {
    let format = out.output_format();
    let opts = Options {
        show_skipped: out.show_skipped,
        no_color: out.no_color,
    };

    let rendered = match format {
        OutputFormat::Table => output::render_table(root, opts).map(|s| format!("\n{}", s)),
        OutputFormat::Json => output::render_json(root, opts),
        OutputFormat::Html => output::render_html(root, opts),
    }
    .map_err(|source| OutputError::Render { format, source })?;

    if out.path.is_empty() {
        writeln!(stdout, "{}", rendered).map_err(OutputError::Stdout)?;
    } else {
        let path = PathBuf::from(&out.path);
        std::fs::write(&path, rendered).map_err(|source| OutputError::Write { path, source })?;
    }
    Ok(())
}
