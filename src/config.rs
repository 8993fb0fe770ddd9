use crate::error::{PipelineError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE: &str = "user_input";
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 1_000_000.0;
pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PipelineConfig {
    #[schemars(description = "Metadata source recorded when the input does not name one")]
    pub default_source: String,

    #[schemars(
        description = "Amounts above this value are reported as outliers. They are flagged, never rejected."
    )]
    pub outlier_threshold: f64,

    #[schemars(description = "Three-letter currency code applied to balances without one")]
    pub default_currency: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_source: DEFAULT_SOURCE.to_string(),
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
            default_currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.outlier_threshold.is_finite() || self.outlier_threshold <= 0.0 {
            return Err(PipelineError::Config(format!(
                "outlier_threshold must be a positive number, got {}",
                self.outlier_threshold
            )));
        }

        let currency_ok = self.default_currency.len() == 3
            && self
                .default_currency
                .chars()
                .all(|c| c.is_ascii_alphabetic());
        if !currency_ok {
            return Err(PipelineError::Config(format!(
                "default_currency must be a three-letter code, got '{}'",
                self.default_currency
            )));
        }

        if self.default_source.trim().is_empty() {
            return Err(PipelineError::Config(
                "default_source must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
