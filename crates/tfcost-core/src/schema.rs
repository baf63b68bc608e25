//! Project and resource cost model.
//!
//! Resource loaders build [`Project`]s with unpriced [`CostComponent`]s, the
//! pricing client fills in unit prices, and [`calculate_costs`] plus
//! [`Project::calculate_diff`] derive everything else.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hours used to turn hourly quantities into monthly ones.
pub const HOURS_IN_MONTH: f64 = 730.0;

/// Attributes the pricing service matches a single price on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceFilter {
    pub vendor_name: String,
    pub service: String,
    pub product_family: String,
    pub region: String,
    /// Exact-match product attributes, e.g. `instanceType = t3.micro`.
    pub attribute_filters: BTreeMap<String, String>,
    pub purchase_option: Option<String>,
}

/// One priced line item of a resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostComponent {
    pub name: String,
    pub unit: String,
    /// Set for continuously-running items; monthly quantity is derived from it.
    pub hourly_quantity: Option<f64>,
    pub monthly_quantity: Option<f64>,
    pub price_filter: Option<PriceFilter>,
    /// Unit price in USD, filled in by the pricing client.
    pub price: Option<f64>,
    pub hourly_cost: Option<f64>,
    pub monthly_cost: Option<f64>,
}

impl CostComponent {
    pub fn hourly(name: &str, unit: &str, quantity: f64, filter: PriceFilter) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            hourly_quantity: Some(quantity),
            price_filter: Some(filter),
            ..Self::default()
        }
    }

    /// A usage-based component; `quantity` is `None` when no usage is known.
    pub fn monthly(name: &str, unit: &str, quantity: Option<f64>, filter: PriceFilter) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            monthly_quantity: quantity,
            price_filter: Some(filter),
            ..Self::default()
        }
    }

    fn calculate(&mut self) {
        if self.monthly_quantity.is_none() {
            self.monthly_quantity = self.hourly_quantity.map(|q| q * HOURS_IN_MONTH);
        }
        if self.hourly_quantity.is_none() {
            self.hourly_quantity = self.monthly_quantity.map(|q| q / HOURS_IN_MONTH);
        }

        self.hourly_cost = self.price.zip(self.hourly_quantity).map(|(p, q)| p * q);
        self.monthly_cost = self.price.zip(self.monthly_quantity).map(|(p, q)| p * q);
    }
}

/// A single infrastructure resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Resource address, e.g. `aws_instance.web`.
    pub name: String,
    pub resource_type: String,
    pub is_skipped: bool,
    pub skip_message: Option<String>,
    pub cost_components: Vec<CostComponent>,
    pub sub_resources: Vec<Resource>,
    pub hourly_cost: Option<f64>,
    pub monthly_cost: Option<f64>,
}

impl Resource {
    pub fn new(name: &str, resource_type: &str) -> Self {
        Self {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            ..Self::default()
        }
    }

    /// A resource tfcost can't price yet.
    pub fn skipped(name: &str, resource_type: &str, message: &str) -> Self {
        Self {
            is_skipped: true,
            skip_message: Some(message.to_string()),
            ..Self::new(name, resource_type)
        }
    }

    /// Every cost component of this resource and its sub-resources.
    pub fn cost_components_mut(&mut self) -> Vec<&mut CostComponent> {
        let mut out: Vec<&mut CostComponent> = self.cost_components.iter_mut().collect();
        for sub in &mut self.sub_resources {
            out.extend(sub.cost_components_mut());
        }
        out
    }

    fn calculate(&mut self) {
        let mut hourly = None;
        let mut monthly = None;

        for component in &mut self.cost_components {
            component.calculate();
            hourly = add_opt(hourly, component.hourly_cost);
            monthly = add_opt(monthly, component.monthly_cost);
        }
        for sub in &mut self.sub_resources {
            sub.calculate();
            hourly = add_opt(hourly, sub.hourly_cost);
            monthly = add_opt(monthly, sub.monthly_cost);
        }

        if !self.is_skipped {
            self.hourly_cost = Some(hourly.unwrap_or(0.0));
            self.monthly_cost = Some(monthly.unwrap_or(0.0));
        }
    }
}

fn add_opt(total: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (total, value) {
        (Some(t), Some(v)) => Some(t + v),
        (None, v) => v,
        (t, None) => t,
    }
}

/// How a resource's cost changed between prior state and plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    Added,
    Removed,
    Changed,
}

/// Cost delta for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDiff {
    pub name: String,
    pub change: ChangeKind,
    pub past_monthly_cost: f64,
    pub monthly_cost: f64,
    pub monthly_cost_delta: f64,
}

/// The loaded and priced resources of one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Where the resources came from, e.g. `plan.json` or `infra (prod)`.
    pub name: String,
    pub resources: Vec<Resource>,
    /// Resources from prior state, when the source had any.
    pub past_resources: Option<Vec<Resource>>,
    pub diff: Vec<ResourceDiff>,
}

impl Project {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Every resource, current and past, for pricing.
    pub fn all_resources_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.resources
            .iter_mut()
            .chain(self.past_resources.iter_mut().flatten())
    }

    pub fn total_hourly_cost(&self) -> f64 {
        total(&self.resources, |r| r.hourly_cost)
    }

    pub fn total_monthly_cost(&self) -> f64 {
        total(&self.resources, |r| r.monthly_cost)
    }

    pub fn past_total_monthly_cost(&self) -> Option<f64> {
        self.past_resources
            .as_ref()
            .map(|past| total(past, |r| r.monthly_cost))
    }

    /// Compare prior-state resources with planned ones. Without prior state
    /// every costed resource counts as added.
    pub fn calculate_diff(&mut self) {
        let past: BTreeMap<&str, f64> = self
            .past_resources
            .iter()
            .flatten()
            .filter(|r| !r.is_skipped)
            .map(|r| (r.name.as_str(), r.monthly_cost.unwrap_or(0.0)))
            .collect();
        let current: BTreeMap<&str, f64> = self
            .resources
            .iter()
            .filter(|r| !r.is_skipped)
            .map(|r| (r.name.as_str(), r.monthly_cost.unwrap_or(0.0)))
            .collect();

        let mut diff = Vec::new();
        for (name, &cost) in &current {
            match past.get(name) {
                None => diff.push(resource_diff(name, ChangeKind::Added, 0.0, cost)),
                Some(&old) if (old - cost).abs() > f64::EPSILON => {
                    diff.push(resource_diff(name, ChangeKind::Changed, old, cost));
                }
                Some(_) => {}
            }
        }
        for (name, &old) in &past {
            if !current.contains_key(name) {
                diff.push(resource_diff(name, ChangeKind::Removed, old, 0.0));
            }
        }

        self.diff = diff;
    }
}

fn resource_diff(name: &str, change: ChangeKind, past: f64, current: f64) -> ResourceDiff {
    ResourceDiff {
        name: name.to_string(),
        change,
        past_monthly_cost: past,
        monthly_cost: current,
        monthly_cost_delta: current - past,
    }
}

fn total(resources: &[Resource], cost: impl Fn(&Resource) -> Option<f64>) -> f64 {
    resources.iter().filter_map(cost).sum()
}

/// Derive hourly and monthly costs for every resource of the project.
pub fn calculate_costs(project: &mut Project) {
    for resource in project.all_resources_mut() {
        resource.calculate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str, price: Option<f64>) -> Resource {
        let mut r = Resource::new(name, "aws_instance");
        let mut c = CostComponent::hourly("Instance usage", "hours", 1.0, PriceFilter::default());
        c.price = price;
        r.cost_components.push(c);
        r
    }

    #[test]
    fn test_hourly_component_costs() {
        let mut project = Project::new("plan.json");
        project.resources.push(instance("aws_instance.web", Some(0.01)));
        calculate_costs(&mut project);

        let r = &project.resources[0];
        assert_eq!(r.hourly_cost, Some(0.01));
        assert!((r.monthly_cost.unwrap() - 7.3).abs() < 1e-9);
        assert_eq!(r.cost_components[0].monthly_quantity, Some(730.0));
        assert!((project.total_monthly_cost() - 7.3).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_component_without_usage_has_no_cost() {
        let mut r = Resource::new("aws_lambda_function.api", "aws_lambda_function");
        let mut c = CostComponent::monthly("Requests", "1M requests", None, PriceFilter::default());
        c.price = Some(0.2);
        r.cost_components.push(c);

        let mut project = Project::new("p");
        project.resources.push(r);
        calculate_costs(&mut project);

        let r = &project.resources[0];
        assert_eq!(r.cost_components[0].monthly_cost, None);
        assert_eq!(r.monthly_cost, Some(0.0));
    }

    #[test]
    fn test_skipped_resources_have_no_cost() {
        let mut project = Project::new("p");
        project
            .resources
            .push(Resource::skipped("aws_foo.bar", "aws_foo", "not supported"));
        calculate_costs(&mut project);
        assert_eq!(project.resources[0].monthly_cost, None);
        assert_eq!(project.total_monthly_cost(), 0.0);
    }

    #[test]
    fn test_sub_resources_roll_up() {
        let mut parent = Resource::new("aws_instance.web", "aws_instance");
        parent.sub_resources.push(instance("aws_instance.web.root", Some(1.0)));
        let mut project = Project::new("p");
        project.resources.push(parent);
        calculate_costs(&mut project);
        assert_eq!(project.resources[0].hourly_cost, Some(1.0));
    }

    #[test]
    fn test_diff_added_removed_changed() {
        let mut project = Project::new("p");
        project.resources = vec![
            instance("aws_instance.kept", Some(1.0)),
            instance("aws_instance.resized", Some(2.0)),
            instance("aws_instance.new", Some(1.0)),
        ];
        project.past_resources = Some(vec![
            instance("aws_instance.kept", Some(1.0)),
            instance("aws_instance.resized", Some(1.0)),
            instance("aws_instance.gone", Some(1.0)),
        ]);
        calculate_costs(&mut project);
        project.calculate_diff();

        let by_name: BTreeMap<&str, &ResourceDiff> =
            project.diff.iter().map(|d| (d.name.as_str(), d)).collect();
        assert_eq!(by_name.len(), 3);
        assert_eq!(by_name["aws_instance.new"].change, ChangeKind::Added);
        assert_eq!(by_name["aws_instance.gone"].change, ChangeKind::Removed);
        assert_eq!(by_name["aws_instance.resized"].change, ChangeKind::Changed);
        assert!((by_name["aws_instance.resized"].monthly_cost_delta - 730.0).abs() < 1e-9);
        assert!((project.past_total_monthly_cost().unwrap() - 2190.0).abs() < 1e-9);
    }

    #[test]
    fn test_diff_without_prior_state() {
        let mut project = Project::new("p");
        project.resources.push(instance("aws_instance.web", Some(1.0)));
        calculate_costs(&mut project);
        project.calculate_diff();
        assert_eq!(project.diff.len(), 1);
        assert_eq!(project.diff[0].change, ChangeKind::Added);
        assert_eq!(project.past_total_monthly_cost(), None);
    }
}
