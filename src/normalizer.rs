use crate::classifier::{classify, Category};
use crate::cleaner::clean;
use crate::config::{PipelineConfig, DEFAULT_SOURCE};
use crate::error::{PipelineError, Result};
use crate::record::{json_kind, RawRecord};
use crate::schema::{CanonicalFinancialData, DataMetadata};
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use serde_json::{Map, Value};

/// Anything the normalizer accepts: JSON text, an already parsed value, or
/// flat records (e.g. rows from [`parse_csv`](crate::parse_csv)).
#[derive(Debug, Clone)]
pub enum NormalizerInput {
    Text(String),
    Value(Value),
    Records(Vec<RawRecord>),
}

impl From<&str> for NormalizerInput {
    fn from(value: &str) -> Self {
        NormalizerInput::Text(value.to_string())
    }
}

impl From<String> for NormalizerInput {
    fn from(value: String) -> Self {
        NormalizerInput::Text(value)
    }
}

impl From<Value> for NormalizerInput {
    fn from(value: Value) -> Self {
        NormalizerInput::Value(value)
    }
}

impl From<Vec<RawRecord>> for NormalizerInput {
    fn from(value: Vec<RawRecord>) -> Self {
        NormalizerInput::Records(value)
    }
}

#[derive(Debug, Default)]
struct Buckets {
    invoices: Vec<RawRecord>,
    expenses: Vec<RawRecord>,
    payments: Vec<RawRecord>,
    balances: Vec<RawRecord>,
}

impl Buckets {
    fn push(&mut self, category: Category, record: RawRecord) {
        match category {
            Category::Invoice => self.invoices.push(record),
            Category::Expense => self.expenses.push(record),
            Category::Payment => self.payments.push(record),
            Category::Balance => self.balances.push(record),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    default_source: String,
    fixed_timestamp: Option<DateTime<Utc>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            default_source: DEFAULT_SOURCE.to_string(),
            fixed_timestamp: None,
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            default_source: config.default_source.clone(),
            fixed_timestamp: None,
        }
    }

    pub fn with_default_source(mut self, source: impl Into<String>) -> Self {
        self.default_source = source.into();
        self
    }

    /// Pins the metadata timestamp instead of reading the clock.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.fixed_timestamp = Some(timestamp);
        self
    }

    pub fn normalize(&self, input: impl Into<NormalizerInput>) -> Result<CanonicalFinancialData> {
        match input.into() {
            NormalizerInput::Text(text) => self.normalize_str(&text),
            NormalizerInput::Value(value) => self.normalize_value(value),
            NormalizerInput::Records(records) => Ok(self.normalize_records(records)),
        }
    }

    pub fn normalize_str(&self, text: &str) -> Result<CanonicalFinancialData> {
        let value: Value = serde_json::from_str(text)?;
        self.normalize_value(value)
    }

    pub fn normalize_value(&self, value: Value) -> Result<CanonicalFinancialData> {
        match value {
            Value::Array(items) => {
                let records = items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| record_at(item, &format!("[{}]", i)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.normalize_records(records))
            }
            Value::Object(object) => self.normalize_categorized(object),
            other => Err(PipelineError::Normalization(format!(
                "top-level input must be an object or an array, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Classifies each flat record into its category, then cleans and
    /// assembles. Never fails.
    pub fn normalize_records(&self, records: Vec<RawRecord>) -> CanonicalFinancialData {
        let mut buckets = Buckets::default();
        for record in records {
            let category = classify(&record);
            buckets.push(category, record);
        }
        self.assemble(buckets, None)
    }

    fn normalize_categorized(&self, mut object: Map<String, Value>) -> Result<CanonicalFinancialData> {
        let source = explicit_source(&object);

        let mut buckets = Buckets::default();
        for category in Category::ALL {
            let key = category.collection_key();
            let records = match object.remove(key) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| record_at(item, &format!("{}[{}]", key, i)))
                    .collect::<Result<Vec<_>>>()?,
                Some(other) => {
                    return Err(PipelineError::Normalization(format!(
                        "'{}' must be an array of records, found {}",
                        key,
                        json_kind(&other)
                    )))
                }
            };
            for record in records {
                buckets.push(category, record);
            }
        }

        Ok(self.assemble(buckets, source))
    }

    fn assemble(&self, buckets: Buckets, source: Option<String>) -> CanonicalFinancialData {
        let clean_all = |records: Vec<RawRecord>| -> Vec<RawRecord> { records.iter().map(clean).collect() };

        let invoices = clean_all(buckets.invoices);
        let expenses = clean_all(buckets.expenses);
        let payments = clean_all(buckets.payments);
        let balances = clean_all(buckets.balances);

        let record_count = invoices.len() + expenses.len() + payments.len() + balances.len();
        let source = source.unwrap_or_else(|| self.default_source.clone());
        let timestamp = self
            .fixed_timestamp
            .unwrap_or_else(Utc::now)
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        debug!(
            "Buckets: {} invoices, {} expenses, {} payments, {} balances",
            invoices.len(),
            expenses.len(),
            payments.len(),
            balances.len()
        );
        info!("Normalized {} records from source '{}'", record_count, source);

        CanonicalFinancialData {
            invoices,
            expenses,
            payments,
            balances,
            metadata: DataMetadata {
                source,
                timestamp,
                record_count,
            },
        }
    }
}

/// `metadata.source`, falling back to a top-level `source` string.
fn explicit_source(object: &Map<String, Value>) -> Option<String> {
    object
        .get("metadata")
        .and_then(|m| m.get("source"))
        .or_else(|| object.get("source"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn record_at(value: Value, location: &str) -> Result<RawRecord> {
    match value {
        Value::Object(object) => Ok(RawRecord::from_json_object(object)),
        other => Err(PipelineError::Normalization(format!(
            "{} must be a record object, found {}",
            location,
            json_kind(&other)
        ))),
    }
}

/// Normalizes with default settings.
pub fn normalize(input: impl Into<NormalizerInput>) -> Result<CanonicalFinancialData> {
    Normalizer::new().normalize(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed() -> Normalizer {
        Normalizer::new().with_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_flat_sequence_is_classified() {
        let data = fixed()
            .normalize(json!([
                { "type": "invoice", "amount": 500, "date": "2024-02-01" },
                { "vendor": "Acme", "amount": 50, "date": "2024-02-02" },
                { "payment_method": "card", "amount": "-20", "date": "2024-02-03" },
                { "account": "Checking", "balance": "1200.50", "date": "2024-02-29" }
            ]))
            .unwrap();

        assert_eq!(data.invoices.len(), 1);
        assert_eq!(data.expenses.len(), 1);
        assert_eq!(data.payments.len(), 1);
        assert_eq!(data.balances.len(), 1);
        assert_eq!(data.metadata.record_count, 4);
        assert_eq!(data.payments[0].number("amount"), Some(-20.0));
        assert_eq!(data.balances[0].number("balance"), Some(1200.5));
    }

    #[test]
    fn test_categorized_input_is_not_reclassified() {
        let data = fixed()
            .normalize(json!({
                "expenses": [{ "invoice_number": "INV-1", "amount": "10", "date": "2024-01-01" }],
                "metadata": { "source": "ledger_export" }
            }))
            .unwrap();

        assert!(data.invoices.is_empty());
        assert_eq!(data.expenses.len(), 1);
        assert!(data.payments.is_empty());
        assert!(data.balances.is_empty());
        assert_eq!(data.metadata.source, "ledger_export");
        assert_eq!(data.metadata.record_count, 1);
    }

    #[test]
    fn test_text_input_and_default_source() {
        let data = fixed()
            .normalize(r#"[{"amount": " 12 ", "memo": "  "}]"#)
            .unwrap();
        assert_eq!(data.metadata.source, "user_input");
        assert_eq!(data.metadata.timestamp, "2024-03-01T12:00:00.000Z");
        assert_eq!(data.expenses[0].get("amount"), Some(&FieldValue::Number(12.0)));
        assert!(!data.expenses[0].contains_key("memo"));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = fixed().normalize("{\"invoices\": [").unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[test]
    fn test_non_object_top_level_is_normalization_error() {
        for input in [json!(42), json!("text"), json!(true), json!(null)] {
            let err = fixed().normalize(input).unwrap_err();
            assert!(matches!(err, PipelineError::Normalization(_)));
        }
    }

    #[test]
    fn test_bad_category_value_is_normalization_error() {
        let err = fixed().normalize(json!({ "invoices": { "amount": 1 } })).unwrap_err();
        assert!(err.to_string().contains("'invoices' must be an array"));

        let err = fixed().normalize(json!({ "payments": [1, 2] })).unwrap_err();
        assert!(err.to_string().contains("payments[0]"));

        let err = fixed().normalize(json!([{ "amount": 1 }, "oops"])).unwrap_err();
        assert!(err.to_string().contains("[1]"));
    }

    #[test]
    fn test_null_category_defaults_to_empty() {
        let data = fixed()
            .normalize(json!({ "invoices": null, "balances": [] }))
            .unwrap();
        assert_eq!(data.metadata.record_count, 0);
    }

    #[test]
    fn test_object_without_category_keys_is_empty() {
        let data = fixed().normalize(json!({})).unwrap();
        assert_eq!(data.metadata.record_count, 0);
        assert!(data.expenses.is_empty());

        let data = fixed().normalize(json!({ "source": "bank_feed" })).unwrap();
        assert_eq!(data.metadata.record_count, 0);
        assert_eq!(data.metadata.source, "bank_feed");
    }

    #[test]
    fn test_records_input_and_configured_source() {
        let records = vec![[("balance", FieldValue::from("10"))].into_iter().collect::<RawRecord>()];
        let data = fixed().with_default_source("csv_upload").normalize(records).unwrap();
        assert_eq!(data.balances.len(), 1);
        assert_eq!(data.metadata.source, "csv_upload");
    }
}
