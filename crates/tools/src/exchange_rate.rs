//! Currency exchange-rate lookup.

use async_trait::async_trait;
use serde_json::{Value, json};

use agentloom_core::tool::{Tool, ToolContext, ToolResponse};

/// Looks up the exchange rate between two ISO 4217 currency codes.
pub struct ExchangeRateTool;

fn rate_for(base: &str, target: &str) -> Option<f64> {
    match (base, target) {
        ("usd", "eur") => Some(0.93),
        ("usd", "jpy") => Some(157.50),
        ("usd", "inr") => Some(83.58),
        _ => None,
    }
}

#[async_trait]
impl Tool for ExchangeRateTool {
    fn name(&self) -> &str {
        "exchange_rate"
    }

    fn description(&self) -> &str {
        "Look up the exchange rate between two currencies, given their \
         ISO 4217 codes (e.g. \"USD\", \"EUR\")."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "base_currency": {
                    "type": "string",
                    "description": "The currency code you are converting from"
                },
                "target_currency": {
                    "type": "string",
                    "description": "The currency code you are converting to"
                }
            },
            "required": ["base_currency", "target_currency"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResponse {
        let Some(base) = arguments["base_currency"].as_str() else {
            return ToolResponse::error("missing required argument: base_currency");
        };
        let Some(target) = arguments["target_currency"].as_str() else {
            return ToolResponse::error("missing required argument: target_currency");
        };
        match rate_for(&base.to_lowercase(), &target.to_lowercase()) {
            Some(rate) => ToolResponse::success(json!({ "rate": rate })),
            None => ToolResponse::error(format!("Unsupported currency pair: {base}/{target}")),
        }
    }
}
