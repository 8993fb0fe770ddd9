use crate::record::RawRecord;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[schemars(description = "Money owed to the business by a customer")]
    Invoice,

    #[schemars(description = "Money spent by the business with a vendor")]
    Expense,

    #[schemars(description = "A cash movement in or out of the business")]
    Payment,

    #[schemars(description = "A point-in-time account balance")]
    Balance,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Invoice,
        Category::Expense,
        Category::Payment,
        Category::Balance,
    ];

    /// Maps an explicit `type` tag (already lower-cased) onto a category.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "invoice" | "bill" => Some(Category::Invoice),
            "payment" | "transaction" => Some(Category::Payment),
            "expense" => Some(Category::Expense),
            "balance" => Some(Category::Balance),
            _ => None,
        }
    }

    /// Key under which this category is stored in the canonical structure.
    pub fn collection_key(&self) -> &'static str {
        match self {
            Category::Invoice => "invoices",
            Category::Expense => "expenses",
            Category::Payment => "payments",
            Category::Balance => "balances",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Invoice => "invoice",
            Category::Expense => "expense",
            Category::Payment => "payment",
            Category::Balance => "balance",
        };
        f.pad(name)
    }
}

/// Field-name rules, evaluated top to bottom. The first category with a
/// keyword contained in any field name wins.
pub const FIELD_NAME_RULES: &[(Category, &[&str])] = &[
    (Category::Invoice, &["invoice", "bill", "revenue"]),
    (Category::Payment, &["payment", "transaction"]),
    (Category::Balance, &["balance", "account"]),
];

/// Records that match neither an explicit tag nor a field-name rule land here.
pub const DEFAULT_CATEGORY: Category = Category::Expense;

/// Infers which category a flat record belongs to.
///
/// An explicit string `type` field is consulted first; unknown tags fall
/// through to the field-name rules, and finally to [`DEFAULT_CATEGORY`].
pub fn classify(record: &RawRecord) -> Category {
    if let Some(category) = record
        .text("type")
        .and_then(|tag| Category::from_type_tag(&tag.to_lowercase()))
    {
        return category;
    }

    classify_by_field_names(record).unwrap_or(DEFAULT_CATEGORY)
}

fn classify_by_field_names(record: &RawRecord) -> Option<Category> {
    let names: Vec<String> = record.keys().map(str::to_lowercase).collect();

    FIELD_NAME_RULES
        .iter()
        .find(|(_, keywords)| {
            names
                .iter()
                .any(|name| keywords.iter().any(|kw| name.contains(kw)))
        })
        .map(|(category, _)| *category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    fn record(fields: &[(&str, FieldValue)]) -> RawRecord {
        fields.iter().cloned().collect()
    }

    #[test]
    fn test_explicit_tag_wins_over_field_names() {
        let r = record(&[
            ("type", "payment".into()),
            ("invoice_number", "x".into()),
        ]);
        assert_eq!(classify(&r), Category::Payment);
    }

    #[test]
    fn test_explicit_tag_is_case_insensitive() {
        assert_eq!(classify(&record(&[("type", "BILL".into())])), Category::Invoice);
        assert_eq!(
            classify(&record(&[("type", "Transaction".into())])),
            Category::Payment
        );
        assert_eq!(classify(&record(&[("type", "Balance".into())])), Category::Balance);
        assert_eq!(classify(&record(&[("type", "expense".into())])), Category::Expense);
    }

    #[test]
    fn test_unknown_tag_falls_through_to_field_names() {
        let r = record(&[("type", "inbound".into()), ("payment_ref", "p-1".into())]);
        assert_eq!(classify(&r), Category::Payment);
    }

    #[test]
    fn test_non_text_tag_is_ignored() {
        let r = record(&[("type", FieldValue::from(3.0)), ("account", "Checking".into())]);
        assert_eq!(classify(&r), Category::Balance);
    }

    #[test]
    fn test_field_name_priority() {
        // invoice-like beats payment-like beats balance-like
        let r = record(&[
            ("Account", "Ops".into()),
            ("TransactionId", "t".into()),
            ("BillTo", "Acme".into()),
        ]);
        assert_eq!(classify(&r), Category::Invoice);

        let r = record(&[("account", "Ops".into()), ("payment_date", "2024-01-01".into())]);
        assert_eq!(classify(&r), Category::Payment);

        let r = record(&[("opening_balance", FieldValue::from(10.0))]);
        assert_eq!(classify(&r), Category::Balance);

        let r = record(&[("total_revenue", FieldValue::from(10.0))]);
        assert_eq!(classify(&r), Category::Invoice);
    }

    #[test]
    fn test_default_bucket_is_expense() {
        let r = record(&[("foo", FieldValue::from(1.0)), ("bar", FieldValue::from(2.0))]);
        assert_eq!(classify(&r), Category::Expense);
        assert_eq!(classify(&RawRecord::new()), Category::Expense);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let r = record(&[("vendor", "Acme".into()), ("amount", FieldValue::from(50.0))]);
        let first = classify(&r);
        for _ in 0..10 {
            assert_eq!(classify(&r), first);
        }
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Category::Invoice).unwrap(), "\"invoice\"");
        assert_eq!(Category::Payment.collection_key(), "payments");
    }
}
