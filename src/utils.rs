use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Formats that are read the same way regardless of locale.
const UNAMBIGUOUS_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses a date written in an unambiguous form: `YYYY-MM-DD`, `YYYY/MM/DD`
/// or an RFC 3339 timestamp.
pub fn parse_unambiguous_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();

    for format in UNAMBIGUOUS_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

/// Lenient date parsing used for quality checks. On top of the unambiguous
/// forms it accepts US-style `MM/DD/YYYY` and naive `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_calendar_date(text: &str) -> Option<NaiveDate> {
    if let Some(date) = parse_unambiguous_date(text) {
        return Some(date);
    }

    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%m/%d/%Y") {
        return Some(date);
    }

    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
}

pub fn to_iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
