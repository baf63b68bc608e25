//! Terminal spinner shown while prices are fetched.
//!
//! With structured logging enabled the spinner only logs its transitions, so
//! log consumers never see terminal control codes.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct SpinnerOptions {
    pub enable_logging: bool,
    pub no_color: bool,
}

/// A start → success/fail spinner. Purely cosmetic: nothing it does can fail.
pub struct Spinner {
    bar: Option<ProgressBar>,
    message: String,
    opts: SpinnerOptions,
}

impl Spinner {
    /// Start spinning with `message`.
    pub fn start(message: &str, opts: SpinnerOptions) -> Self {
        let bar = if opts.enable_logging {
            tracing::info!("{}", message);
            None
        } else {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.cyan} {msg}")
                    .expect("valid template"),
            );
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            Some(bar)
        };

        Self {
            bar,
            message: message.to_string(),
            opts,
        }
    }

    pub fn success(self) {
        self.finish("✔", true);
    }

    pub fn fail(self) {
        self.finish("✖", false);
    }

    fn finish(self, symbol: &str, ok: bool) {
        let Some(bar) = self.bar else {
            if ok {
                tracing::info!("{}: done", self.message);
            } else {
                tracing::error!("{}: failed", self.message);
            }
            return;
        };

        let symbol = match (self.opts.no_color, ok) {
            (true, _) => symbol.to_string(),
            (false, true) => symbol.green().to_string(),
            (false, false) => symbol.red().to_string(),
        };
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{msg}")
                .expect("valid template"),
        );
        bar.finish_with_message(format!("{} {}", symbol, self.message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_mode_has_no_bar() {
        let spinner = Spinner::start(
            "Calculating cost estimate",
            SpinnerOptions {
                enable_logging: true,
                no_color: true,
            },
        );
        assert!(spinner.bar.is_none());
        spinner.success();
    }

    #[test]
    fn test_terminal_mode_finishes() {
        let spinner = Spinner::start("Calculating cost estimate", SpinnerOptions::default());
        let bar = spinner.bar.clone().unwrap();
        spinner.fail();
        assert!(bar.is_finished());
    }
}
