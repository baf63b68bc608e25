//! GraphQL pricing API client.
//!
//! Uses blocking HTTP via `ureq`; the CLI has no async runtime.

use crate::provider::{PriceSource, PricingError};
use serde_json::{Value, json};
use std::collections::HashMap;
use tfcost_core::config::GlobalConfig;
use tfcost_core::environment::Environment;
use tfcost_core::schema::{PriceFilter, Project};

const PRICE_QUERY: &str = "query($filter: ProductFilter!, $priceFilter: PriceFilter) { \
    products(filter: $filter) { prices(filter: $priceFilter) { USD } } }";

/// Prices cost components by querying the pricing API, one request per
/// distinct price filter.
pub struct HttpPriceSource {
    api_key: String,
    url: String,
    agent: ureq::Agent,
}

impl HttpPriceSource {
    pub const TIMEOUT_SECS: u64 = 30;

    pub fn new(api_key: &str, endpoint: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            url: format!("{}/graphql", endpoint.trim_end_matches('/')),
            agent: ureq::Agent::new_with_config(
                ureq::config::Config::builder()
                    .timeout_global(Some(std::time::Duration::from_secs(Self::TIMEOUT_SECS)))
                    .build(),
            ),
        }
    }

    pub fn from_config(global: &GlobalConfig) -> Self {
        Self::new(&global.api_key, &global.pricing_api_endpoint)
    }

    fn query(&self, variables: &Value, env: &Environment) -> Result<Option<f64>, PricingError> {
        let body = json!({
            "query": PRICE_QUERY,
            "variables": variables,
            "extensions": { "environment": env },
        });

        let mut response = self
            .agent
            .post(&self.url)
            .header("X-Api-Key", &self.api_key)
            .header("User-Agent", &format!("tfcost/{}", env.version))
            .header("content-type", "application/json")
            .send_json(&body)
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => status_error(code),
                other => PricingError::Http(other.to_string()),
            })?;

        let json: Value = response
            .body_mut()
            .read_json()
            .map_err(|e| PricingError::Parse(e.to_string()))?;

        parse_price_response(&json)
    }
}

impl PriceSource for HttpPriceSource {
    fn populate_prices(
        &self,
        project: &mut Project,
        env: &Environment,
    ) -> Result<(), PricingError> {
        let mut cache: HashMap<String, Option<f64>> = HashMap::new();

        for resource in project.all_resources_mut() {
            let resource_name = resource.name.clone();
            for component in resource.cost_components_mut() {
                let Some(filter) = &component.price_filter else {
                    continue;
                };
                let variables = query_variables(filter);
                let key = variables.to_string();

                let price = if let Some(price) = cache.get(&key) {
                    *price
                } else {
                    let price = self.query(&variables, env).map_err(|e| {
                        e.context(format!("Error pricing {} {}", resource_name, component.name))
                    })?;
                    cache.insert(key, price);
                    price
                };

                if price.is_none() {
                    tracing::warn!(
                        resource = %resource_name,
                        component = %component.name,
                        "no price found"
                    );
                }
                component.price = price;
            }
        }

        tracing::debug!(project = %project.name, queries = cache.len(), "priced project");
        Ok(())
    }
}

fn status_error(code: u16) -> PricingError {
    match code {
        401 | 403 => PricingError::InvalidApiKey,
        _ => PricingError::Api {
            status: code,
            message: "unexpected response from pricing API".to_string(),
        },
    }
}

/// GraphQL variables for one price filter.
fn query_variables(filter: &PriceFilter) -> Value {
    let attribute_filters: Vec<Value> = filter
        .attribute_filters
        .iter()
        .map(|(key, value)| json!({ "key": key, "value": value }))
        .collect();

    let mut variables = json!({
        "filter": {
            "vendorName": filter.vendor_name,
            "service": filter.service,
            "productFamily": filter.product_family,
            "region": filter.region,
            "attributeFilters": attribute_filters,
        }
    });
    if let Some(purchase_option) = &filter.purchase_option {
        variables["priceFilter"] = json!({ "purchaseOption": purchase_option });
    }
    variables
}

/// Extract the first USD price, or `None` when nothing matched.
fn parse_price_response(json: &Value) -> Result<Option<f64>, PricingError> {
    if let Some(errors) = json.get("errors").and_then(Value::as_array)
        && !errors.is_empty()
    {
        let messages: Vec<&str> = errors
            .iter()
            .filter_map(|e| e.get("message").and_then(Value::as_str))
            .collect();
        if messages.iter().any(|m| m.contains("Invalid API key")) {
            return Err(PricingError::InvalidApiKey);
        }
        return Err(PricingError::Api {
            status: 200,
            message: if messages.is_empty() {
                "unknown error".to_string()
            } else {
                messages.join("; ")
            },
        });
    }

    let products = json
        .pointer("/data/products")
        .and_then(Value::as_array)
        .ok_or_else(|| PricingError::Parse("missing data.products".to_string()))?;

    let Some(usd) = products
        .first()
        .and_then(|p| p.pointer("/prices/0/USD"))
    else {
        return Ok(None);
    };

    let price = match usd {
        Value::String(s) => s
            .parse::<f64>()
            .map_err(|e| PricingError::Parse(format!("invalid price {:?}: {}", s, e)))?,
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| PricingError::Parse(format!("invalid price {}", n)))?,
        other => return Err(PricingError::Parse(format!("invalid price {}", other))),
    };
    Ok(Some(price))
}
