//! # Financial Data Pipeline
//!
//! Turns heterogeneous, loosely-typed financial input (JSON bodies, uploaded
//! CSV files) into a validated canonical record set before it is handed to a
//! language-model backend for narrative analysis.
//!
//! ## Core Concepts
//!
//! - **Raw Record**: an open mapping of field name to scalar, before any typing
//! - **Category**: invoice, expense, payment or balance, inferred once per record
//! - **Canonical Financial Data**: the four category sequences plus metadata
//! - **Structural error**: a schema violation that blocks analysis
//! - **Quality warning**: a non-blocking completeness or outlier observation
//!
//! ## Example
//!
//! ```rust
//! use financial_data_pipeline::*;
//!
//! let input = r#"[
//!     {"type": "invoice", "amount": 500, "date": "2024-02-01"},
//!     {"vendor": "Acme", "amount": "50", "date": "2024-02-02"}
//! ]"#;
//!
//! let outcome = process_financial_data(input).unwrap();
//! assert!(outcome.is_valid());
//! assert_eq!(outcome.data.invoices.len(), 1);
//! assert_eq!(outcome.data.expenses.len(), 1);
//! assert_eq!(outcome.data.metadata.record_count, 2);
//! ```

pub mod analysis;
pub mod classifier;
pub mod cleaner;
pub mod config;
pub mod csv_adapter;
pub mod error;
pub mod normalizer;
pub mod record;
pub mod schema;
pub mod utils;
pub mod validator;

#[cfg(feature = "gemini")]
pub mod llm;

pub use analysis::*;
pub use classifier::{classify, Category, DEFAULT_CATEGORY, FIELD_NAME_RULES};
pub use cleaner::{clean, is_strict_numeric, parse_strict_numeric};
pub use config::PipelineConfig;
pub use csv_adapter::{cast_cell, parse_csv, parse_csv_reader};
pub use error::{PipelineError, Result};
pub use normalizer::{normalize, Normalizer, NormalizerInput};
pub use record::{FieldValue, RawRecord};
pub use schema::*;
pub use validator::{validate, FieldError, SchemaValidator, ValidationResult};

use log::{debug, info};
use std::sync::Arc;

/// Normalized data together with its validation verdict.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub data: CanonicalFinancialData,
    pub validation: ValidationResult,
}

impl PipelineOutcome {
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid
    }

    pub fn warnings(&self) -> &[String] {
        &self.validation.warnings
    }

    /// The canonical data if structurally valid, otherwise
    /// [`PipelineError::Validation`] with every field error.
    pub fn into_valid(self) -> Result<CanonicalFinancialData> {
        self.validation.ensure_valid()?;
        Ok(self.data)
    }

    /// Read-only handle that can cross thread and task boundaries.
    pub fn into_shared(self) -> Result<Arc<CanonicalFinancialData>> {
        self.into_valid().map(Arc::new)
    }
}

pub struct FinancialDataPipeline {
    config: PipelineConfig,
    normalizer: Normalizer,
    validator: SchemaValidator,
}

impl Default for FinancialDataPipeline {
    fn default() -> Self {
        let config = PipelineConfig::default();
        Self {
            normalizer: Normalizer::from_config(&config),
            validator: SchemaValidator::from_config(&config),
            config,
        }
    }
}

impl FinancialDataPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: Normalizer::from_config(&config),
            validator: SchemaValidator::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replaces the normalizer, e.g. to pin the metadata timestamp.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Normalizes then validates. Structural errors are reported in the
    /// outcome, not returned as `Err`; only parse and normalization failures
    /// are.
    pub fn process(&self, input: impl Into<NormalizerInput>) -> Result<PipelineOutcome> {
        let data = self.normalizer.normalize(input)?;
        let validation = self.validator.validate(&data);

        info!(
            "Pipeline finished: {} records, valid: {}, {} error(s), {} warning(s)",
            data.metadata.record_count,
            validation.is_valid,
            validation.errors.len(),
            validation.warnings.len()
        );
        for error in &validation.errors {
            debug!("Structural error: {}", error);
        }

        Ok(PipelineOutcome { data, validation })
    }

    /// Delimited text with a header row, routed through the CSV adapter.
    pub fn process_csv(&self, text: &str) -> Result<PipelineOutcome> {
        let records = parse_csv(text)?;
        self.process(records)
    }

    /// Like [`process`](Self::process), but structural errors become
    /// [`PipelineError::Validation`].
    pub fn process_strict(&self, input: impl Into<NormalizerInput>) -> Result<CanonicalFinancialData> {
        self.process(input)?.into_valid()
    }

    /// Validated data narrowed into the strict record shapes.
    pub fn process_typed(&self, input: impl Into<NormalizerInput>) -> Result<TypedFinancialData> {
        let data = self.process_strict(input)?;
        TypedFinancialData::from_canonical(&data, &self.config.default_currency).ok_or_else(|| {
            PipelineError::Normalization(
                "validated data could not be narrowed into typed records".to_string(),
            )
        })
    }
}

pub fn process_financial_data(input: impl Into<NormalizerInput>) -> Result<PipelineOutcome> {
    FinancialDataPipeline::default().process(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_end_to_end_processing() {
        let outcome = process_financial_data(json!([
            { "type": "invoice", "amount": 500, "date": "2024-02-01" },
            { "vendor": "Acme", "amount": 50, "date": "2024-02-02" }
        ]))
        .unwrap();

        assert!(outcome.is_valid());
        assert_eq!(outcome.data.invoices.len(), 1);
        assert_eq!(outcome.data.expenses.len(), 1);
        assert_eq!(outcome.data.metadata.record_count, 2);
    }

    #[test]
    fn test_strict_processing_surfaces_field_errors() {
        let err = FinancialDataPipeline::default()
            .process_strict(json!({ "invoices": [{ "date": "2024-01-01" }], "expenses": [] }))
            .unwrap_err();

        match err {
            PipelineError::Validation { errors } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].path, "invoices[0].amount");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_typed_processing_uses_configured_currency() {
        let config = PipelineConfig {
            default_currency: "NZD".to_string(),
            ..PipelineConfig::default()
        };
        let pipeline = FinancialDataPipeline::new(config).unwrap();
        let typed = pipeline
            .process_typed(json!({
                "invoices": [{ "amount": "120", "date": "2024-01-05", "status": "paid" }],
                "expenses": [{ "amount": 20, "date": "2024-01-06", "vendor": "Acme" }],
                "payments": [{ "amount": -20, "date": "2024-01-07", "type": "outbound" }],
                "balances": [{ "account": "Checking", "balance": 1000, "date": "2024-01-31" }]
            }))
            .unwrap();

        assert_eq!(typed.invoices[0].status, Some(InvoiceStatus::Paid));
        assert_eq!(typed.payments[0].payment_type, PaymentType::Outbound);
        assert_eq!(typed.balances[0].currency, "NZD");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = PipelineConfig {
            outlier_threshold: 0.0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            FinancialDataPipeline::new(config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_shared_output_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}

        let shared = process_financial_data(json!([
            { "type": "invoice", "amount": 1, "date": "2024-02-01" }
        ]))
        .unwrap()
        .into_shared()
        .unwrap();
        assert_send_sync(&shared);

        let handle = {
            let shared = Arc::clone(&shared);
            std::thread::spawn(move || shared.metadata.record_count)
        };
        assert_eq!(handle.join().unwrap(), 1);
    }
}
