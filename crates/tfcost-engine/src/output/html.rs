use super::{Options, RenderError, Root, breakdown_rows, format_cost};
use std::fmt::Write;

const STYLE: &str = "body{font-family:sans-serif}\
table{border-collapse:collapse}\
td,th{padding:2px 12px;text-align:left}\
td.num,th.num{text-align:right}\
tr.project td{font-weight:bold;padding-top:16px}\
tr.total td{font-weight:bold;border-top:1px solid #999}";

/// Render the report as a standalone HTML page.
pub fn render_html(root: &Root, opts: Options) -> Result<String, RenderError> {
    let mut out = String::new();

    writeln!(out, "<!DOCTYPE html>")?;
    writeln!(out, "<html lang=\"en\">")?;
    writeln!(out, "<head>")?;
    writeln!(out, "<meta charset=\"utf-8\">")?;
    writeln!(out, "<title>tfcost estimate</title>")?;
    writeln!(out, "<style>{}</style>", STYLE)?;
    writeln!(out, "</head>")?;
    writeln!(out, "<body>")?;
    writeln!(
        out,
        "<p>Generated {}</p>",
        root.time_generated.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out, "<table>")?;
    writeln!(
        out,
        "<thead><tr><th>Name</th><th class=\"num\">Monthly Qty</th><th>Unit</th><th class=\"num\">Monthly Cost</th></tr></thead>"
    )?;
    writeln!(out, "<tbody>")?;

    for project in &root.projects {
        writeln!(
            out,
            "<tr class=\"project\"><td colspan=\"4\">Project: {}</td></tr>",
            escape(&project.name)
        )?;
        for row in breakdown_rows(&project.breakdown) {
            writeln!(
                out,
                "<tr><td>{}</td><td class=\"num\">{}</td><td>{}</td><td class=\"num\">{}</td></tr>",
                escape(&row.name),
                escape(&row.quantity),
                escape(&row.unit),
                escape(&row.cost)
            )?;
        }
        writeln!(
            out,
            "<tr class=\"total\"><td colspan=\"3\">Project total</td><td class=\"num\">{}</td></tr>",
            format_cost(project.breakdown.total_monthly_cost)
        )?;
    }

    writeln!(
        out,
        "<tr class=\"total\"><td colspan=\"3\">Overall total</td><td class=\"num\">{}</td></tr>",
        format_cost(root.total_monthly_cost)
    )?;
    writeln!(out, "</tbody>")?;
    writeln!(out, "</table>")?;

    let counts = &root.summary.unsupported_resource_counts;
    if !counts.is_empty() {
        let total: usize = counts.values().sum();
        writeln!(
            out,
            "<p>{} resource(s) weren't estimated as they're not supported yet.</p>",
            total
        )?;
        if opts.show_skipped {
            writeln!(out, "<ul>")?;
            for (resource_type, n) in counts {
                writeln!(out, "<li>{} x {}</li>", n, escape(resource_type))?;
            }
            writeln!(out, "</ul>")?;
        }
    }

    writeln!(out, "</body>")?;
    write!(out, "</html>")?;
    Ok(out)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::tests::sample_projects;
    use crate::output::to_output_format;

    #[test]
    fn test_html_page() {
        let root = to_output_format(&sample_projects());
        let out = render_html(
            &root,
            Options {
                show_skipped: true,
                no_color: false,
            },
        )
        .unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.ends_with("</html>"));
        assert!(out.contains("Project: plan.json"));
        assert!(out.contains("<li>2 x aws_kinesis_stream</li>"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }
}
