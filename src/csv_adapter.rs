use crate::cleaner::parse_strict_numeric;
use crate::error::Result;
use crate::record::{FieldValue, RawRecord};
use crate::utils::{parse_unambiguous_date, to_iso_date};
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, warn};
use std::io::Read;

/// Casts one CSV cell. Empty cells become null, strict numerics become
/// numbers, `true`/`false` become booleans and unambiguous dates are rewritten
/// as `YYYY-MM-DD`. Anything else stays text.
pub fn cast_cell(cell: &str) -> FieldValue {
    let cell = cell.trim();

    if cell.is_empty() {
        return FieldValue::Null;
    }

    if let Some(number) = parse_strict_numeric(cell) {
        return FieldValue::Number(number);
    }

    if cell.eq_ignore_ascii_case("true") {
        return FieldValue::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return FieldValue::Bool(false);
    }

    if let Some(date) = parse_unambiguous_date(cell) {
        return FieldValue::Text(to_iso_date(date));
    }

    FieldValue::Text(cell.to_string())
}

fn row_to_record(headers: &StringRecord, row: &StringRecord) -> RawRecord {
    headers
        .iter()
        .zip(row.iter())
        .filter(|(header, _)| !header.is_empty())
        .map(|(header, cell)| (header, cast_cell(cell)))
        .collect()
}

/// Reads delimited text with a header row into one record per data row.
/// Rows may be shorter than the header; missing cells are left out. Cells
/// beyond the last header are dropped with a warning.
pub fn parse_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut records = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let row = result?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if row.len() > headers.len() {
            warn!(
                "CSV row {} has {} cells but only {} headers, dropping the extra cells",
                index + 1,
                row.len(),
                headers.len()
            );
        }
        records.push(row_to_record(&headers, &row));
    }

    debug!(
        "Parsed {} CSV rows across {} columns",
        records.len(),
        headers.len()
    );
    Ok(records)
}

/// Comma-separated convenience wrapper around [`parse_csv_reader`].
pub fn parse_csv(text: &str) -> Result<Vec<RawRecord>> {
    parse_csv_reader(text.as_bytes(), b',')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cast_cell() {
        assert_eq!(cast_cell(""), FieldValue::Null);
        assert_eq!(cast_cell("  "), FieldValue::Null);
        assert_eq!(cast_cell("42"), FieldValue::Number(42.0));
        assert_eq!(cast_cell("-3.5"), FieldValue::Number(-3.5));
        assert_eq!(cast_cell("TRUE"), FieldValue::Bool(true));
        assert_eq!(cast_cell("false"), FieldValue::Bool(false));
        assert_eq!(cast_cell("2024/02/01"), FieldValue::from("2024-02-01"));
        assert_eq!(cast_cell("2024-02-01T10:00:00Z"), FieldValue::from("2024-02-01"));
        assert_eq!(cast_cell("02/01/2024"), FieldValue::from("02/01/2024"));
        assert_eq!(cast_cell("1,200"), FieldValue::from("1,200"));
        assert_eq!(cast_cell(" Acme "), FieldValue::from("Acme"));

        let huge = "9".repeat(400);
        assert_eq!(cast_cell(&huge), FieldValue::from(huge.as_str()));
    }

    #[test]
    fn test_parse_csv_rows() {
        let text = "type, amount ,date,vendor\n\
                    invoice,500,2024-02-01,\n\
                    ,50,2024-02-02,Acme\n";
        let records = parse_csv(text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("type"), Some("invoice"));
        assert_eq!(records[0].number("amount"), Some(500.0));
        assert_eq!(records[0].get("vendor"), Some(&FieldValue::Null));
        assert_eq!(records[1].get("type"), Some(&FieldValue::Null));
        assert_eq!(records[1].text("vendor"), Some("Acme"));
    }

    #[test]
    fn test_ragged_and_blank_rows() {
        let text = "account,balance,date\nChecking,100\n,,\nSavings,50,2024-01-31,stray,extra\n";
        let records = parse_csv(text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].len(), 2);
        assert!(!records[0].contains_key("date"));
        assert_eq!(records[1].len(), 3);
        assert_eq!(records[1].text("date"), Some("2024-01-31"));
        assert!(records[1].iter().all(|(_, v)| v.as_str() != Some("stray")));
    }

    #[test]
    fn test_quoted_cells_and_custom_delimiter() {
        let text = "description;amount\n\"Rent; March\";1500\n";
        let records = parse_csv_reader(text.as_bytes(), b';').unwrap();
        assert_eq!(records[0].text("description"), Some("Rent; March"));
        assert_eq!(records[0].number("amount"), Some(1500.0));
    }

    #[test]
    fn test_header_only_yields_nothing() {
        assert!(parse_csv("amount,date\n").unwrap().is_empty());
    }
}
