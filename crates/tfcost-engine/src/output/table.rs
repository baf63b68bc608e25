use super::{Options, RenderError, Root, Row, breakdown_rows, format_cost};
use colored::Colorize;
use comfy_table::presets::NOTHING;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use std::fmt::Write;

/// Render the report as a plain-text table for terminals.
pub fn render_table(root: &Root, opts: Options) -> Result<String, RenderError> {
    let mut out = String::new();

    for project in &root.projects {
        writeln!(out, "{} {}", emphasise("Project:", opts), project.name)?;
        writeln!(out)?;

        let mut table = new_table(opts, &["Name", "Monthly Qty", "Unit", "Monthly Cost"]);
        for row in breakdown_rows(&project.breakdown) {
            let Row {
                name,
                quantity,
                unit,
                cost,
            } = row;
            table.add_row(vec![name, quantity, unit, cost]);
        }
        table.add_row(vec![String::new(); 4]);
        table.add_row(vec![
            "Project total".to_string(),
            String::new(),
            String::new(),
            format_cost(project.breakdown.total_monthly_cost),
        ]);
        right_align(&mut table, &[1, 3]);

        writeln!(out, "{}", table)?;
        writeln!(out)?;
    }

    let mut totals = new_table(opts, &[]);
    totals.add_row(vec![
        header_cell("OVERALL TOTAL", opts),
        header_cell(&format_cost(root.total_monthly_cost), opts),
    ]);
    if let Some(past) = root.past_total_monthly_cost
        && let Some(diff) = root.diff_total_monthly_cost
    {
        let sign = if diff < 0.0 { "-" } else { "+" };
        totals.add_row(vec!["Past total".to_string(), format_cost(past)]);
        totals.add_row(vec![
            "Diff".to_string(),
            format!("{}{}", sign, format_cost(diff.abs())),
        ]);
    }
    right_align(&mut totals, &[1]);
    writeln!(out, "{}", totals)?;

    let counts = &root.summary.unsupported_resource_counts;
    if !counts.is_empty() {
        let total: usize = counts.values().sum();
        let noun = if total == 1 {
            "resource wasn't"
        } else {
            "resources weren't"
        };

        writeln!(out)?;
        if opts.show_skipped {
            writeln!(
                out,
                "{} {} estimated as they're not supported yet:",
                total, noun
            )?;
            for (resource_type, n) in counts {
                writeln!(out, "  ∙ {} x {}", n, resource_type)?;
            }
        } else {
            writeln!(
                out,
                "{} {} estimated as they're not supported yet.",
                total, noun
            )?;
            writeln!(out, "Rerun with --show-skipped to see details.")?;
        }
    }

    Ok(out.trim_end().to_string())
}

fn new_table(opts: Options, header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);
    if !header.is_empty() {
        table.set_header(header.iter().map(|h| header_cell(h, opts)).collect::<Vec<_>>());
    }
    table
}

fn header_cell(text: &str, opts: Options) -> Cell {
    if opts.no_color {
        Cell::new(text)
    } else {
        Cell::new(text).add_attribute(Attribute::Bold)
    }
}

fn right_align(table: &mut Table, columns: &[usize]) {
    for &i in columns {
        if let Some(column) = table.column_mut(i) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
}

fn emphasise(text: &str, opts: Options) -> String {
    if opts.no_color {
        text.to_string()
    } else {
        text.bold().to_string()
    }
}
