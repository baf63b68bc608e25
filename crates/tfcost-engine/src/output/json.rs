use super::{Options, RenderError, Root};

/// Render the report as pretty-printed JSON. Skipped resources are always
/// included, so `show_skipped` has no effect here.
pub fn render_json(root: &Root, _opts: Options) -> Result<String, RenderError> {
    Ok(serde_json::to_string_pretty(root)?)
}
