//! Payment-method fee lookup.

use async_trait::async_trait;
use serde_json::{Value, json};

use agentloom_core::tool::{Tool, ToolContext, ToolResponse};

/// Looks up the transaction fee for a named payment method.
pub struct FeeLookupTool;

fn fee_for(method: &str) -> Option<f64> {
    match method.to_lowercase().as_str() {
        "platinum credit card" => Some(0.02),
        "gold debit card" => Some(0.035),
        "bank transfer" => Some(0.01),
        _ => None,
    }
}

#[async_trait]
impl Tool for FeeLookupTool {
    fn name(&self) -> &str {
        "fee_lookup"
    }

    fn description(&self) -> &str {
        "Determine the transaction fee percentage for a payment method. \
         The method must be descriptive, e.g. \"bank transfer\" or \
         \"platinum credit card\"."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "method": {
                    "type": "string",
                    "description": "The name of the payment method"
                }
            },
            "required": ["method"]
        })
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> ToolResponse {
        let Some(method) = arguments["method"].as_str() else {
            return ToolResponse::error("missing required argument: method");
        };
        match fee_for(method) {
            Some(fee) => ToolResponse::success(json!({ "fee_percentage": fee })),
            None => ToolResponse::error(format!("Payment method '{method}' not found")),
        }
    }
}
