//! Resource loading from Terraform.
//!
//! Sources, in priority order:
//! - a plan JSON file, read directly
//! - a saved plan file, via `terraform show -json <plan>`
//! - the current state, via `terraform show -json`
//! - a directory, via `terraform plan -out <tmp>` then `terraform show -json <tmp>`
//!
//! The JSON is mapped to [`Resource`]s through a small registry of supported
//! resource types; anything else is kept as a skipped resource.

use crate::provider::{LoadError, ResourceLoader};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tfcost_core::ProjectConfig;
use tfcost_core::schema::{CostComponent, PriceFilter, Project, Resource};
use tfcost_core::usage::UsageData;

pub const DEFAULT_TERRAFORM_BINARY: &str = "terraform";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const UNSUPPORTED_MESSAGE: &str = "This resource is not currently supported";

/// Resource types that never cost anything and are left out of reports.
const FREE_RESOURCES: &[&str] = &[
    "aws_iam_policy",
    "aws_iam_role",
    "aws_iam_role_policy",
    "aws_iam_role_policy_attachment",
    "aws_internet_gateway",
    "aws_key_pair",
    "aws_route",
    "aws_route_table",
    "aws_route_table_association",
    "aws_security_group",
    "aws_security_group_rule",
    "aws_subnet",
    "aws_vpc",
];

/// Loads resources by reading plan JSON or running Terraform.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerraformLoader;

impl ResourceLoader for TerraformLoader {
    fn load_resources(
        &self,
        project: &ProjectConfig,
        usage: &UsageData,
    ) -> Result<Project, LoadError> {
        let json = load_plan_json(project)?;
        parse_plan_json(&project.source_label(), &json, usage)
    }
}

fn load_plan_json(project: &ProjectConfig) -> Result<String, LoadError> {
    if !project.json_file.is_empty() {
        let path = Path::new(&project.json_file);
        return std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        });
    }

    let tf = Terraform::new(project);
    if !project.plan_file.is_empty() {
        return tf.run(&["show", "-json", &project.plan_file]);
    }
    if project.use_state {
        return tf.run(&["show", "-json"]);
    }

    let plan = tempfile::Builder::new()
        .prefix("tfcost-plan-")
        .tempfile()
        .map_err(LoadError::TempFile)?;
    let plan_path = plan.path().display().to_string();
    let out_flag = format!("-out={}", plan_path);

    let mut args = vec!["plan", "-input=false", "-lock=false", out_flag.as_str()];
    args.extend(project.plan_flags.split_whitespace());
    tf.run(&args)?;
    tf.run(&["show", "-json", &plan_path])
}

/// A Terraform binary bound to a working directory and workspace.
struct Terraform<'a> {
    binary: &'a str,
    dir: &'a str,
    workspace: &'a str,
}

impl<'a> Terraform<'a> {
    fn new(project: &'a ProjectConfig) -> Self {
        Self {
            binary: if project.terraform_binary.is_empty() {
                DEFAULT_TERRAFORM_BINARY
            } else {
                &project.terraform_binary
            },
            dir: project.directory(),
            workspace: &project.workspace,
        }
    }

    fn run(&self, args: &[&str]) -> Result<String, LoadError> {
        let command = format!("{} {}", self.binary, args.join(" "));
        tracing::debug!(command = %command, dir = self.dir, "running terraform");

        let mut cmd = Command::new(self.binary);
        cmd.args(args)
            .current_dir(self.dir)
            .env("TF_IN_AUTOMATION", "true");
        if !self.workspace.is_empty() {
            cmd.env("TF_WORKSPACE", self.workspace);
        }

        let output = cmd.output().map_err(|source| LoadError::Spawn {
            command: command.clone(),
            source,
        })?;
        if !output.status.success() {
            return Err(LoadError::Terraform {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PlanJson {
    planned_values: Option<StateValues>,
    /// Present instead of `planned_values` when showing state.
    values: Option<StateValues>,
    prior_state: Option<PriorState>,
    configuration: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriorState {
    values: Option<StateValues>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StateValues {
    root_module: Module,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Module {
    resources: Vec<TfResource>,
    child_modules: Vec<Module>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TfResource {
    address: String,
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    values: Value,
}

/// Build a project from `terraform show -json` output.
pub fn parse_plan_json(name: &str, json: &str, usage: &UsageData) -> Result<Project, LoadError> {
    let plan: PlanJson = serde_json::from_str(json).map_err(|e| LoadError::Parse(e.to_string()))?;
    let region = provider_region(&plan.configuration);

    let mut project = Project::new(name);
    if let Some(current) = plan.planned_values.as_ref().or(plan.values.as_ref()) {
        project.resources = build_resources(&current.root_module, &region, usage);
    }
    if let Some(past) = plan.prior_state.as_ref().and_then(|p| p.values.as_ref()) {
        project.past_resources = Some(build_resources(&past.root_module, &region, usage));
    }
    Ok(project)
}

fn provider_region(configuration: &Value) -> String {
    configuration
        .pointer("/provider_config/aws/expressions/region/constant_value")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_REGION)
        .to_string()
}

fn build_resources(module: &Module, region: &str, usage: &UsageData) -> Vec<Resource> {
    let mut out = Vec::new();
    collect_resources(module, region, usage, &mut out);
    out
}

fn collect_resources(module: &Module, region: &str, usage: &UsageData, out: &mut Vec<Resource>) {
    for tf in module.resources.iter().filter(|r| r.mode == "managed") {
        if let Some(resource) = build_resource(tf, region, usage) {
            out.push(resource);
        }
    }
    for child in &module.child_modules {
        collect_resources(child, region, usage, out);
    }
}

/// Map one Terraform resource to a priced resource; `None` for free types.
fn build_resource(tf: &TfResource, region: &str, usage: &UsageData) -> Option<Resource> {
    match tf.resource_type.as_str() {
        "aws_instance" => Some(aws_instance(tf, region)),
        "aws_lambda_function" => Some(aws_lambda_function(tf, region, usage)),
        t if FREE_RESOURCES.contains(&t) => None,
        t => Some(Resource::skipped(&tf.address, t, UNSUPPORTED_MESSAGE)),
    }
}

fn aws_filter(
    service: &str,
    product_family: &str,
    region: &str,
    attrs: &[(&str, &str)],
) -> PriceFilter {
    PriceFilter {
        vendor_name: "aws".to_string(),
        service: service.to_string(),
        product_family: product_family.to_string(),
        region: region.to_string(),
        attribute_filters: attrs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        purchase_option: Some("on_demand".to_string()),
    }
}

fn aws_instance(tf: &TfResource, region: &str) -> Resource {
    let Some(instance_type) = tf.values.get("instance_type").and_then(Value::as_str) else {
        return Resource::skipped(&tf.address, &tf.resource_type, "Missing instance_type");
    };
    let tenancy = match tf.values.get("tenancy").and_then(Value::as_str) {
        Some("dedicated") => "Dedicated",
        Some("host") => "Host",
        _ => "Shared",
    };

    let mut resource = Resource::new(&tf.address, &tf.resource_type);
    resource.cost_components.push(CostComponent::hourly(
        &format!("Instance usage (Linux/UNIX, on-demand, {})", instance_type),
        "hours",
        1.0,
        aws_filter(
            "AmazonEC2",
            "Compute Instance",
            region,
            &[
                ("instanceType", instance_type),
                ("tenancy", tenancy),
                ("operatingSystem", "Linux"),
                ("preInstalledSw", "NA"),
                ("capacitystatus", "Used"),
            ],
        ),
    ));

    let root_block = tf
        .values
        .get("root_block_device")
        .and_then(Value::as_array)
        .and_then(|devices| devices.first());
    let volume_type = root_block
        .and_then(|d| d.get("volume_type"))
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or("gp2");
    let volume_size = root_block
        .and_then(|d| d.get("volume_size"))
        .and_then(Value::as_f64)
        .filter(|s| *s > 0.0)
        .unwrap_or(8.0);

    let mut disk = Resource::new("root_block_device", "aws_ebs_volume");
    disk.cost_components.push(CostComponent::monthly(
        &format!("Storage (general purpose SSD, {})", volume_type),
        "GB",
        Some(volume_size),
        aws_filter(
            "AmazonEC2",
            "Storage",
            region,
            &[("volumeApiName", volume_type)],
        ),
    ));
    resource.sub_resources.push(disk);

    resource
}

fn aws_lambda_function(tf: &TfResource, region: &str, usage: &UsageData) -> Resource {
    let memory_mb = tf
        .values
        .get("memory_size")
        .and_then(Value::as_f64)
        .unwrap_or(128.0);
    let resource_usage = usage.get(&tf.address);
    let requests = resource_usage.and_then(|u| u.get("monthly_requests")).copied();
    let duration_ms = resource_usage
        .and_then(|u| u.get("request_duration_ms"))
        .copied();
    let gb_seconds = requests
        .zip(duration_ms)
        .map(|(r, d)| r * (d / 1000.0) * (memory_mb / 1024.0));

    let mut resource = Resource::new(&tf.address, &tf.resource_type);
    resource.cost_components.push(CostComponent::monthly(
        "Requests",
        "requests",
        requests,
        aws_filter(
            "AWSLambda",
            "Serverless",
            region,
            &[("group", "AWS-Lambda-Requests")],
        ),
    ));
    resource.cost_components.push(CostComponent::monthly(
        "Duration",
        "GB-seconds",
        gb_seconds,
        aws_filter(
            "AWSLambda",
            "Serverless",
            region,
            &[("group", "AWS-Lambda-Duration")],
        ),
    ));
    resource
}
