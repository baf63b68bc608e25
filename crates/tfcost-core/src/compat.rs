//! Mapping of deprecated flag and environment variable names onto canonical ones.
//!
//! Operates only on inputs the user actually supplied, never on defaults, so a
//! deprecated alias can't silently shadow a canonical value.

use std::collections::BTreeMap;
use std::fmt;

/// Deprecated CLI flags and the canonical flags that replaced them.
pub const DEPRECATED_FLAGS: &[(&str, &str)] = &[
    ("tfjson", "terraform-json-file"),
    ("tfplan", "terraform-plan-file"),
    ("use-tfstate", "terraform-use-state"),
    ("tfdir", "terraform-dir"),
    ("tfflags", "terraform-plan-flags"),
    ("output", "format"),
];

/// Deprecated environment variables and their canonical replacements.
pub const DEPRECATED_ENV_VARS: &[(&str, &str)] = &[
    ("TERRAFORM_BINARY", "TFCOST_TERRAFORM_BINARY"),
    ("TERRAFORM_WORKSPACE", "TFCOST_TERRAFORM_WORKSPACE"),
    ("TFCOST_API_URL", "TFCOST_PRICING_API_ENDPOINT"),
];

/// Explicitly supplied inputs, keyed by flag name (without dashes prefix) or
/// environment variable name. Booleans are stored as `"true"`/`"false"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSet {
    values: BTreeMap<String, String>,
}

impl InputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.values.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InputSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Where an input came from; only affects how names are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Flag,
    EnvVar,
}

impl InputKind {
    fn display_name(self, name: &str) -> String {
        match self {
            Self::Flag => format!("--{}", name),
            Self::EnvVar => name.to_string(),
        }
    }
}

/// A deprecated input that was supplied and has been mapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprecation {
    pub kind: InputKind,
    pub deprecated: String,
    pub canonical: String,
    /// The canonical input was supplied too, so the deprecated value was dropped.
    pub conflict: bool,
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old = self.kind.display_name(&self.deprecated);
        let new = self.kind.display_name(&self.canonical);
        if self.conflict {
            write!(
                f,
                "{} is deprecated and was ignored because {} is also set",
                old, new
            )
        } else {
            write!(
                f,
                "{} is deprecated and will be removed in a future release, use {} instead",
                old, new
            )
        }
    }
}

/// Rewrite supplied deprecated inputs onto their canonical names.
///
/// The canonical value always wins when both are present. Deprecated keys are
/// removed from `inputs` either way. Returns one [`Deprecation`] per deprecated
/// input that was supplied, in mapping-table order.
pub fn apply_deprecations(
    inputs: &mut InputSet,
    mapping: &[(&str, &str)],
    kind: InputKind,
) -> Vec<Deprecation> {
    let mut notices = Vec::new();

    for &(deprecated, canonical) in mapping {
        let Some(value) = inputs.remove(deprecated) else {
            continue;
        };

        let conflict = inputs.is_set(canonical);
        if !conflict {
            inputs.insert(canonical, value);
        }

        notices.push(Deprecation {
            kind,
            deprecated: deprecated.to_string(),
            canonical: canonical.to_string(),
            conflict,
        });
    }

    notices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deprecated_flag_copied_to_canonical() {
        let mut inputs: InputSet = [("tfjson", "plan.json")].into_iter().collect();
        let notices = apply_deprecations(&mut inputs, DEPRECATED_FLAGS, InputKind::Flag);

        assert_eq!(inputs.get("terraform-json-file"), Some("plan.json"));
        assert!(!inputs.is_set("tfjson"));
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].conflict);
        let msg = notices[0].to_string();
        assert!(msg.contains("--tfjson"));
        assert!(msg.contains("--terraform-json-file"));
    }

    #[test]
    fn test_canonical_wins_on_conflict() {
        let mut inputs: InputSet = [("output", "json"), ("format", "html")]
            .into_iter()
            .collect();
        let notices = apply_deprecations(&mut inputs, DEPRECATED_FLAGS, InputKind::Flag);

        assert_eq!(inputs.get("format"), Some("html"));
        assert_eq!(notices.len(), 1);
        assert!(notices[0].conflict);
        assert!(notices[0].to_string().contains("ignored"));
    }

    #[test]
    fn test_untouched_when_nothing_deprecated() {
        let mut inputs: InputSet = [("terraform-dir", "infra")].into_iter().collect();
        let before = inputs.clone();
        let notices = apply_deprecations(&mut inputs, DEPRECATED_FLAGS, InputKind::Flag);
        assert!(notices.is_empty());
        assert_eq!(inputs, before);
    }

    #[test]
    fn test_env_var_names_printed_bare() {
        let mut inputs: InputSet = [("TERRAFORM_BINARY", "/usr/bin/terraform")]
            .into_iter()
            .collect();
        let notices = apply_deprecations(&mut inputs, DEPRECATED_ENV_VARS, InputKind::EnvVar);

        assert_eq!(
            inputs.get("TFCOST_TERRAFORM_BINARY"),
            Some("/usr/bin/terraform")
        );
        let msg = notices[0].to_string();
        assert!(msg.starts_with("TERRAFORM_BINARY is deprecated"));
        assert!(!msg.contains("--"));
    }
}
