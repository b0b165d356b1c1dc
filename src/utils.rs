//! Small helpers.

use chrono::NaiveDate;

pub fn sanitize_symbol(sym: &str) -> String {
    sym.trim().to_uppercase()
}

/// Lenient numeric parse for exchange files: "1,234.50" -> 1234.5, "-" or "" -> None.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn month_abbrev(d: NaiveDate) -> String {
    // "%b" is locale-invariant in chrono: Jan, Feb, ...
    d.format("%b").to_string()
}
