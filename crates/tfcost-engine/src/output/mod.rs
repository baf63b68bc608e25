//! Format-agnostic report model and the renderers built on it.
//!
//! [`to_output_format`] converts priced projects into one [`Root`] that every
//! renderer reads from, so all outputs of a run agree with each other.

mod html;
mod json;
mod table;

pub use html::render_html;
pub use json::render_json;
pub use table::render_table;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tfcost_core::schema::{Project, Resource, ResourceDiff};

/// Schema version of the JSON report.
pub const OUTPUT_VERSION: &str = "0.1";

/// Render options shared by all formats.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// List unsupported resources. JSON always includes them.
    pub show_skipped: bool,
    pub no_color: bool,
}

/// Errors while rendering a report.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize JSON report")]
    Json(#[from] serde_json::Error),
    #[error("failed to format report")]
    Fmt(#[from] std::fmt::Error),
}

/// Costs of a set of resources.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    pub resources: Vec<Resource>,
    pub total_hourly_cost: f64,
    pub total_monthly_cost: f64,
}

impl Breakdown {
    fn new(resources: &[Resource]) -> Self {
        let resources: Vec<Resource> = resources
            .iter()
            .filter(|r| !r.is_skipped)
            .cloned()
            .collect();
        Self {
            total_hourly_cost: resources.iter().filter_map(|r| r.hourly_cost).sum(),
            total_monthly_cost: resources.iter().filter_map(|r| r.monthly_cost).sum(),
            resources,
        }
    }
}

/// A resource that wasn't estimated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedResource {
    pub name: String,
    pub resource_type: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOutput {
    pub name: String,
    pub breakdown: Breakdown,
    pub past_breakdown: Option<Breakdown>,
    pub diff: Vec<ResourceDiff>,
    pub skipped_resources: Vec<SkippedResource>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_resources: usize,
    pub total_supported_resources: usize,
    pub total_unsupported_resources: usize,
    pub unsupported_resource_counts: BTreeMap<String, usize>,
}

/// The whole report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Root {
    pub version: String,
    pub projects: Vec<ProjectOutput>,
    pub total_hourly_cost: f64,
    pub total_monthly_cost: f64,
    pub past_total_monthly_cost: Option<f64>,
    pub diff_total_monthly_cost: Option<f64>,
    pub time_generated: DateTime<Utc>,
    pub summary: Summary,
}

/// Build the shared report model from priced projects.
pub fn to_output_format(projects: &[Project]) -> Root {
    let mut summary = Summary::default();
    let mut outputs = Vec::with_capacity(projects.len());

    for project in projects {
        let skipped: Vec<SkippedResource> = project
            .resources
            .iter()
            .filter(|r| r.is_skipped)
            .map(|r| SkippedResource {
                name: r.name.clone(),
                resource_type: r.resource_type.clone(),
                message: r.skip_message.clone().unwrap_or_default(),
            })
            .collect();

        summary.total_resources += project.resources.len();
        summary.total_unsupported_resources += skipped.len();
        for s in &skipped {
            *summary
                .unsupported_resource_counts
                .entry(s.resource_type.clone())
                .or_default() += 1;
        }

        outputs.push(ProjectOutput {
            name: project.name.clone(),
            breakdown: Breakdown::new(&project.resources),
            past_breakdown: project.past_resources.as_deref().map(Breakdown::new),
            diff: project.diff.clone(),
            skipped_resources: skipped,
        });
    }
    summary.total_supported_resources =
        summary.total_resources - summary.total_unsupported_resources;

    let total_hourly_cost = outputs.iter().map(|p| p.breakdown.total_hourly_cost).sum();
    let total_monthly_cost: f64 = outputs.iter().map(|p| p.breakdown.total_monthly_cost).sum();
    let past_total_monthly_cost = outputs
        .iter()
        .any(|p| p.past_breakdown.is_some())
        .then(|| {
            outputs
                .iter()
                .filter_map(|p| p.past_breakdown.as_ref())
                .map(|b| b.total_monthly_cost)
                .sum::<f64>()
        });

    Root {
        version: OUTPUT_VERSION.to_string(),
        projects: outputs,
        total_hourly_cost,
        total_monthly_cost,
        past_total_monthly_cost,
        diff_total_monthly_cost: past_total_monthly_cost.map(|past| total_monthly_cost - past),
        time_generated: Utc::now(),
        summary,
    }
}

/// One line of a tabular breakdown.
struct Row {
    name: String,
    quantity: String,
    unit: String,
    cost: String,
}

/// Flatten a breakdown into display rows: one per resource, then one per cost
/// component, indented under it.
fn breakdown_rows(breakdown: &Breakdown) -> Vec<Row> {
    let mut rows = Vec::new();
    for resource in &breakdown.resources {
        push_resource_rows(resource, "", &mut rows);
    }
    rows
}

fn push_resource_rows(resource: &Resource, indent: &str, rows: &mut Vec<Row>) {
    rows.push(Row {
        name: format!("{}{}", indent, resource.name),
        quantity: String::new(),
        unit: String::new(),
        cost: String::new(),
    });

    let child_indent = format!("{}   ", indent);
    let count = resource.cost_components.len() + resource.sub_resources.len();
    for (i, component) in resource.cost_components.iter().enumerate() {
        let branch = if i + 1 == count { "└─" } else { "├─" };
        rows.push(Row {
            name: format!("{}{} {}", indent, branch, component.name),
            quantity: component
                .monthly_quantity
                .map_or_else(|| "-".to_string(), format_quantity),
            unit: component.unit.clone(),
            cost: match component.monthly_cost {
                Some(cost) => format_cost(cost),
                None if component.monthly_quantity.is_none() => "depends on usage".to_string(),
                None => "no price found".to_string(),
            },
        });
    }
    for sub in &resource.sub_resources {
        push_resource_rows(sub, &child_indent, rows);
    }
}

pub(crate) fn format_cost(cost: f64) -> String {
    format!("${:.2}", cost)
}

fn format_quantity(quantity: f64) -> String {
    if quantity.fract().abs() < 1e-9 {
        format!("{:.0}", quantity)
    } else {
        let s = format!("{:.4}", quantity);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tfcost_core::schema::{CostComponent, PriceFilter, calculate_costs};

    /// Two projects: one priced instance and one unsupported resource each.
    pub(crate) fn sample_projects() -> Vec<Project> {
        let mut projects = Vec::new();
        for (name, price) in [("infra", 0.0104), ("plan.json", 0.02)] {
            let mut instance = Resource::new("aws_instance.web", "aws_instance");
            let mut component = CostComponent::hourly(
                "Instance usage (Linux/UNIX, on-demand, t3.micro)",
                "hours",
                1.0,
                PriceFilter::default(),
            );
            component.price = Some(price);
            instance.cost_components.push(component);

            let mut project = Project::new(name);
            project.resources.push(instance);
            project.resources.push(Resource::skipped(
                "aws_kinesis_stream.events",
                "aws_kinesis_stream",
                "This resource is not currently supported",
            ));
            calculate_costs(&mut project);
            project.calculate_diff();
            projects.push(project);
        }
        projects
    }

    #[test]
    fn test_to_output_format_totals() {
        let root = to_output_format(&sample_projects());
        assert_eq!(root.projects.len(), 2);
        assert!((root.total_monthly_cost - (0.0104 + 0.02) * 730.0).abs() < 1e-9);
        assert_eq!(root.past_total_monthly_cost, None);
        assert_eq!(root.summary.total_resources, 4);
        assert_eq!(root.summary.total_supported_resources, 2);
        assert_eq!(
            root.summary.unsupported_resource_counts.get("aws_kinesis_stream"),
            Some(&2)
        );
        assert_eq!(root.projects[0].breakdown.resources.len(), 1);
        assert_eq!(root.projects[0].skipped_resources.len(), 1);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_cost(7.592), "$7.59");
        assert_eq!(format_quantity(730.0), "730");
        assert_eq!(format_quantity(0.25), "0.25");
        assert_eq!(format_quantity(1.0 / 3.0), "0.3333");
    }
}
