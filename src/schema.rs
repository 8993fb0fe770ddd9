use crate::classifier::Category;
use crate::record::{FieldValue, RawRecord};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DataMetadata {
    #[schemars(description = "Where the records came from (e.g. 'file_upload', 'user_input')")]
    pub source: String,

    #[schemars(description = "ISO-8601 timestamp of when the records were normalized")]
    pub timestamp: String,

    #[schemars(description = "Total number of records across all four categories at assembly time")]
    pub record_count: usize,
}

/// The normalized four-category record set handed to the analysis backend and
/// the dashboard.
///
/// `metadata.record_count` is computed once when the normalizer assembles the
/// structure. Treat the value as a read-only snapshot from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CanonicalFinancialData {
    pub invoices: Vec<RawRecord>,
    pub expenses: Vec<RawRecord>,
    pub payments: Vec<RawRecord>,
    pub balances: Vec<RawRecord>,
    pub metadata: DataMetadata,
}

impl CanonicalFinancialData {
    pub fn records(&self, category: Category) -> &[RawRecord] {
        match category {
            Category::Invoice => &self.invoices,
            Category::Expense => &self.expenses,
            Category::Payment => &self.payments,
            Category::Balance => &self.balances,
        }
    }

    pub fn total_records(&self) -> usize {
        Category::ALL.iter().map(|c| self.records(*c).len()).sum()
    }

    pub fn category_counts(&self) -> BTreeMap<Category, usize> {
        Category::ALL
            .iter()
            .map(|c| (*c, self.records(*c).len()))
            .collect()
    }

    /// Sum of the numeric `amount` (or `balance` for balances) per category.
    /// Non-numeric values are skipped.
    pub fn totals(&self) -> BTreeMap<Category, f64> {
        Category::ALL
            .iter()
            .map(|c| {
                let field = match c {
                    Category::Balance => "balance",
                    _ => "amount",
                };
                let total: f64 = self
                    .records(*c)
                    .iter()
                    .filter_map(|r| r.number(field))
                    .sum();
                (*c, total)
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// Strict shapes. These are what a structurally valid record narrows into.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub const VALUES: [&'static str; 4] = ["pending", "paid", "overdue", "cancelled"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            "overdue" => Some(Self::Overdue),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    #[schemars(description = "Money received by the business")]
    Inbound,
    #[schemars(description = "Money paid out by the business")]
    Outbound,
}

impl PaymentType {
    pub const VALUES: [&'static str; 2] = ["inbound", "outbound"];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "inbound" => Some(Self::Inbound),
            "outbound" => Some(Self::Outbound),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Invoice {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[schemars(description = "Invoice amount, never negative")]
    pub amount: f64,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InvoiceStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Expense {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[schemars(description = "Expense amount, never negative")]
    pub amount: f64,
    pub date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Payment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[schemars(description = "Payment amount; the sign is meaningful")]
    pub amount: f64,
    pub date: String,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Balance {
    pub account: String,
    pub balance: f64,
    pub date: String,
    #[schemars(description = "ISO currency code, defaults to USD")]
    pub currency: String,
}

/// Optional descriptive fields accept any scalar; cleaning may have turned
/// an all-digit id or vendor into a number.
fn descriptive(record: &RawRecord, field: &str) -> Option<String> {
    match record.get(field) {
        None | Some(FieldValue::Null) => None,
        Some(value) => Some(value.to_string()),
    }
}

/// Account identifiers may be numeric codes that cleaning turned into numbers.
fn identifier(record: &RawRecord, field: &str) -> Option<String> {
    match record.get(field)? {
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Invoice {
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        let status = match record.text("status") {
            Some(s) => Some(InvoiceStatus::parse(s)?),
            None => None,
        };
        Some(Self {
            id: descriptive(record, "id"),
            amount: record.number("amount")?,
            date: record.text("date")?.to_string(),
            description: descriptive(record, "description"),
            customer: descriptive(record, "customer"),
            status,
        })
    }
}

impl Expense {
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        Some(Self {
            id: descriptive(record, "id"),
            amount: record.number("amount")?,
            date: record.text("date")?.to_string(),
            description: descriptive(record, "description"),
            category: descriptive(record, "category"),
            vendor: descriptive(record, "vendor"),
        })
    }
}

impl Payment {
    pub fn from_record(record: &RawRecord) -> Option<Self> {
        Some(Self {
            id: descriptive(record, "id"),
            amount: record.number("amount")?,
            date: record.text("date")?.to_string(),
            payment_type: PaymentType::parse(record.text("type")?)?,
            description: descriptive(record, "description"),
            method: descriptive(record, "method"),
        })
    }
}

impl Balance {
    pub fn from_record(record: &RawRecord, default_currency: &str) -> Option<Self> {
        Some(Self {
            account: identifier(record, "account")?,
            balance: record.number("balance")?,
            date: record.text("date")?.to_string(),
            currency: record
                .text("currency")
                .unwrap_or(default_currency)
                .to_string(),
        })
    }
}

/// Canonical data narrowed into the strict record shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TypedFinancialData {
    pub invoices: Vec<Invoice>,
    pub expenses: Vec<Expense>,
    pub payments: Vec<Payment>,
    pub balances: Vec<Balance>,
    pub metadata: DataMetadata,
}

impl TypedFinancialData {
    /// Narrows every record, returning `None` if any record does not fit its
    /// shape. Run the [`SchemaValidator`](crate::SchemaValidator) first to get
    /// field-level detail.
    pub fn from_canonical(data: &CanonicalFinancialData, default_currency: &str) -> Option<Self> {
        Some(Self {
            invoices: data
                .invoices
                .iter()
                .map(Invoice::from_record)
                .collect::<Option<_>>()?,
            expenses: data
                .expenses
                .iter()
                .map(Expense::from_record)
                .collect::<Option<_>>()?,
            payments: data
                .payments
                .iter()
                .map(Payment::from_record)
                .collect::<Option<_>>()?,
            balances: data
                .balances
                .iter()
                .map(|r| Balance::from_record(r, default_currency))
                .collect::<Option<_>>()?,
            metadata: data.metadata.clone(),
        })
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(TypedFinancialData)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
