use crate::classifier::Category;
use crate::config::{PipelineConfig, DEFAULT_OUTLIER_THRESHOLD};
use crate::error::{PipelineError, Result};
use crate::record::{FieldValue, RawRecord};
use crate::schema::{CanonicalFinancialData, InvoiceStatus, PaymentType};
use crate::utils::parse_calendar_date;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A single structural violation, addressed by its path in the canonical
/// structure (e.g. `invoices[0].amount`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
    /// The offending value; `null` when the field is missing.
    pub value: Value,
    pub constraint: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (constraint: {}, value: {})",
            self.path, self.message, self.constraint, self.value
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// `Err(PipelineError::Validation)` carrying every field error, if any.
    pub fn ensure_valid(&self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(PipelineError::Validation {
                errors: self.errors.clone(),
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expect {
    Number,
    NonNegative,
    Text,
    /// Text or number; numeric account codes are coerced by cleaning.
    Identifier,
    OneOf(&'static [&'static str]),
}

struct FieldRule {
    field: &'static str,
    required: bool,
    expect: Expect,
}

const fn required(field: &'static str, expect: Expect) -> FieldRule {
    FieldRule {
        field,
        required: true,
        expect,
    }
}

const fn optional(field: &'static str, expect: Expect) -> FieldRule {
    FieldRule {
        field,
        required: false,
        expect,
    }
}

const INVOICE_RULES: &[FieldRule] = &[
    required("amount", Expect::NonNegative),
    required("date", Expect::Text),
    optional("status", Expect::OneOf(&InvoiceStatus::VALUES)),
];

const EXPENSE_RULES: &[FieldRule] = &[
    required("amount", Expect::NonNegative),
    required("date", Expect::Text),
];

const PAYMENT_RULES: &[FieldRule] = &[
    required("amount", Expect::Number),
    required("date", Expect::Text),
    required("type", Expect::OneOf(&PaymentType::VALUES)),
];

const BALANCE_RULES: &[FieldRule] = &[
    required("account", Expect::Identifier),
    required("balance", Expect::Number),
    required("date", Expect::Text),
    optional("currency", Expect::Text),
];

fn rules_for(category: Category) -> &'static [FieldRule] {
    match category {
        Category::Invoice => INVOICE_RULES,
        Category::Expense => EXPENSE_RULES,
        Category::Payment => PAYMENT_RULES,
        Category::Balance => BALANCE_RULES,
    }
}

/// Categories whose records carry a dated `amount` checked by the quality pass.
const AMOUNT_CATEGORIES: [Category; 3] = [Category::Invoice, Category::Expense, Category::Payment];

pub struct SchemaValidator {
    outlier_threshold: f64,
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self {
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
        }
    }
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            outlier_threshold: config.outlier_threshold,
        }
    }

    pub fn with_outlier_threshold(mut self, threshold: f64) -> Self {
        self.outlier_threshold = threshold;
        self
    }

    /// Structural pass first; the quality pass only runs when it is clean.
    pub fn validate(&self, data: &CanonicalFinancialData) -> ValidationResult {
        let errors = self.check_structure(data);
        let is_valid = errors.is_empty();

        let warnings = if is_valid {
            self.check_quality(data)
        } else {
            debug!("Skipping quality checks: {} structural error(s)", errors.len());
            Vec::new()
        };

        for warning in &warnings {
            warn!("Data quality: {}", warning);
        }

        ValidationResult {
            is_valid,
            errors,
            warnings,
        }
    }

    pub fn check_structure(&self, data: &CanonicalFinancialData) -> Vec<FieldError> {
        let mut errors = Vec::new();

        for category in Category::ALL {
            let key = category.collection_key();
            for (idx, record) in data.records(category).iter().enumerate() {
                for rule in rules_for(category) {
                    let path = format!("{}[{}].{}", key, idx, rule.field);
                    if let Some(error) = check_field(record, rule, path) {
                        errors.push(error);
                    }
                }
            }
        }

        errors
    }

    pub fn check_quality(&self, data: &CanonicalFinancialData) -> Vec<String> {
        let mut warnings = Vec::new();

        if data.invoices.is_empty() {
            warnings.push(
                "No invoices provided - cash flow projections may be inaccurate".to_string(),
            );
        }
        if data.expenses.is_empty() {
            warnings.push(
                "No expenses provided - expense analysis and procurement suggestions will be limited"
                    .to_string(),
            );
        }

        for category in AMOUNT_CATEGORIES {
            let key = category.collection_key();
            for (idx, record) in data.records(category).iter().enumerate() {
                match record.get("date") {
                    None => warnings.push(format!("{}[{}] has no date", key, idx)),
                    Some(FieldValue::Text(date)) if parse_calendar_date(date).is_none() => {
                        warnings.push(format!(
                            "{}[{}].date '{}' is not a recognizable calendar date",
                            key, idx, date
                        ))
                    }
                    _ => {}
                }

                if let Some(amount) = record.number("amount") {
                    if amount < 0.0 {
                        warnings.push(format!(
                            "{}[{}].amount is negative ({})",
                            key, idx, amount
                        ));
                    } else if amount > self.outlier_threshold {
                        warnings.push(format!(
                            "{}[{}].amount {} exceeds the outlier threshold of {}",
                            key, idx, amount, self.outlier_threshold
                        ));
                    }
                }
            }
        }

        warnings
    }
}

fn check_field(record: &RawRecord, rule: &FieldRule, path: String) -> Option<FieldError> {
    let value = match record.get(rule.field) {
        None | Some(FieldValue::Null) => {
            if !rule.required {
                return None;
            }
            return Some(FieldError {
                path,
                message: "Required field is missing".to_string(),
                value: Value::Null,
                constraint: "required".to_string(),
            });
        }
        Some(value) => value,
    };

    let fail = |message: String, constraint: String| FieldError {
        path: path.clone(),
        message,
        value: value.to_json(),
        constraint,
    };

    match rule.expect {
        Expect::Number => match value {
            FieldValue::Number(n) if n.is_finite() => None,
            FieldValue::Number(n) => Some(fail(
                format!("Expected a finite number, got {}", n),
                "type: number".to_string(),
            )),
            other => Some(fail(
                format!("Expected a number, found {}", other.type_name()),
                "type: number".to_string(),
            )),
        },
        Expect::NonNegative => match value {
            FieldValue::Number(n) if !n.is_finite() => Some(fail(
                format!("Expected a finite number, got {}", n),
                "type: number".to_string(),
            )),
            FieldValue::Number(n) if *n >= 0.0 => None,
            FieldValue::Number(n) => Some(fail(
                format!("Must be greater than or equal to 0, got {}", n),
                "minimum: 0".to_string(),
            )),
            other => Some(fail(
                format!("Expected a number, found {}", other.type_name()),
                "type: number".to_string(),
            )),
        },
        Expect::Text => match value {
            FieldValue::Text(_) => None,
            other => Some(fail(
                format!("Expected a string, found {}", other.type_name()),
                "type: string".to_string(),
            )),
        },
        Expect::Identifier => match value {
            FieldValue::Text(_) | FieldValue::Number(_) => None,
            other => Some(fail(
                format!("Expected a string, found {}", other.type_name()),
                "type: string".to_string(),
            )),
        },
        Expect::OneOf(allowed) => match value {
            FieldValue::Text(s) if allowed.contains(&s.as_str()) => None,
            other => Some(fail(
                format!("Must be one of {}, got '{}'", allowed.join(", "), other),
                format!("enum: {}", allowed.join("|")),
            )),
        },
    }
}

/// Validates with default settings.
pub fn validate(data: &CanonicalFinancialData) -> ValidationResult {
    SchemaValidator::new().validate(data)
}
