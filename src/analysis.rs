//! Contract for the narrative analysis returned by the language-model backend.
//!
//! The pipeline never produces these values itself. They are parsed from the
//! backend's response and handed to the dashboard unchanged.

use crate::error::{PipelineError, Result};
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashFlowProjection {
    #[schemars(description = "Forecast period, 'YYYY-MM'")]
    pub period: String,
    pub projected_inflow: f64,
    pub projected_outflow: f64,
    pub net_cash_flow: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    #[schemars(description = "Path of the record in the submitted data, e.g. 'expenses[3]'")]
    #[serde(default)]
    pub record_path: Option<String>,
    pub description: String,
    pub severity: AnomalySeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementSuggestion {
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub suggestion: String,
    #[serde(default)]
    pub estimated_savings: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialAnalysis {
    #[schemars(description = "Short narrative overview of the financial position")]
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub cash_flow_forecast: Vec<CashFlowProjection>,
    #[serde(default)]
    pub anomalies: Vec<Anomaly>,
    #[serde(default)]
    pub procurement_suggestions: Vec<ProcurementSuggestion>,
    #[serde(default)]
    pub kpis: Vec<Kpi>,
}

impl FinancialAnalysis {
    /// Self-contained JSON schema (no `$ref`, no `$schema`) for structured
    /// output requests.
    pub fn response_schema() -> serde_json::Result<serde_json::Value> {
        let settings = SchemaSettings::draft07().with(|s| {
            s.inline_subschemas = true;
            s.meta_schema = None;
        });
        let root = settings
            .into_generator()
            .into_root_schema_for::<FinancialAnalysis>();
        serde_json::to_value(root)
    }

    /// Parses a backend reply, tolerating a surrounding markdown code fence.
    pub fn from_response_text(text: &str) -> Result<Self> {
        let body = strip_code_fence(text);
        serde_json::from_str(body).map_err(|e| {
            PipelineError::Analysis(format!("Response is not a valid analysis object: {}", e))
        })
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
