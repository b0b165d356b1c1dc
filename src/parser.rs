//! Parse futures-on-stock contract descriptors from the F&O bhavcopy.
//! Grammar: "FUTSTK" + underlying + "DD-MON-YYYY", e.g. "FUTSTKADANIGREEN26-JUN-2025".

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::types::{ParsedContract, FUTSTK_MARKER};

/// Underlying is everything between the marker and the trailing 11-char date.
static RE_FUTSTK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^FUTSTK(?P<sym>.+)(?P<date>\d{2}-[A-Za-z]{3}-\d{4})$")
        .expect("FUTSTK pattern is valid")
});

pub fn is_stock_future(raw: &str) -> bool {
    raw.trim_start().starts_with(FUTSTK_MARKER)
}

pub fn parse_contract(raw: &str) -> Option<ParsedContract> {
    let t = raw.trim();
    let c = RE_FUTSTK.captures(t)?;

    let underlying = c["sym"].trim().to_uppercase();
    if underlying.is_empty() {
        return None;
    }
    let expiry = NaiveDate::parse_from_str(&c["date"], "%d-%b-%Y").ok()?;

    Some(ParsedContract { underlying, expiry })
}
