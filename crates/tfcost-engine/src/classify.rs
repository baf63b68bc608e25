//! Turn pricing failures into messages the user can act on.

use crate::provider::{PricingError, PricingErrorKind};
use colored::Colorize;
use std::error::Error;
use tfcost_core::config::{API_KEY_ENV_VAR, credentials_file_path};

/// Where users are pointed when their credentials keep being rejected.
pub const SUPPORT_EMAIL: &str = "hello@tfcost.dev";

const UPSTREAM_HINT: &str = "We have been notified of this issue.";

/// A pricing failure after classification.
#[derive(Debug, thiserror::Error)]
pub enum ClassifiedError {
    /// The pricing service rejected the API key.
    #[error("{root}\n{hint}")]
    Credential { root: String, hint: String },
    /// The pricing service itself failed.
    #[error("{root}\n{hint}")]
    UpstreamService { root: String, hint: String },
    #[error(transparent)]
    Unclassified(PricingError),
}

impl ClassifiedError {
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::Credential { hint, .. } | Self::UpstreamService { hint, .. } => Some(hint),
            Self::Unclassified(_) => None,
        }
    }

    pub fn root_message(&self) -> String {
        match self {
            Self::Credential { root, .. } | Self::UpstreamService { root, .. } => root.clone(),
            Self::Unclassified(err) => root_cause(err).to_string(),
        }
    }
}

/// Classify a pricing failure by its kind, regardless of how many layers of
/// context callers added.
pub fn classify(err: PricingError, no_color: bool) -> ClassifiedError {
    match err.kind() {
        PricingErrorKind::Credential => ClassifiedError::Credential {
            root: root_cause(&err).to_string(),
            hint: credential_hint(no_color),
        },
        PricingErrorKind::Upstream => ClassifiedError::UpstreamService {
            root: root_cause(&err).to_string(),
            hint: UPSTREAM_HINT.to_string(),
        },
        PricingErrorKind::Other => ClassifiedError::Unclassified(err),
    }
}

fn root_cause<'a>(err: &'a (dyn Error + 'static)) -> &'a (dyn Error + 'static) {
    let mut cause = err;
    while let Some(next) = cause.source() {
        cause = next;
    }
    cause
}

fn credential_hint(no_color: bool) -> String {
    let path = credentials_file_path().display().to_string();
    let contact = format!("If you continue having issues please email {}", SUPPORT_EMAIL);

    if no_color {
        return format!(
            "Please check your {} file or {} environment variable.\n{}",
            path, API_KEY_ENV_VAR, contact
        );
    }

    format!(
        "{} {} {} {} {}\n{}",
        "Please check your".bright_red(),
        path.bold().bright_white(),
        "file or".bright_red(),
        API_KEY_ENV_VAR.bold().bright_white(),
        "environment variable.".bright_red(),
        contact.bright_red(),
    )
}
