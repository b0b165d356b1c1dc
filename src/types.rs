//! Core domain types for contracts, roll results and pre-open rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Descriptor prefix of a futures-on-stock contract in the F&O bhavcopy.
pub const FUTSTK_MARKER: &str = "FUTSTK";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContract {
    pub underlying: String,
    pub expiry: NaiveDate,
}

/// Position of an expiry within one underlying's ascending expiry list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExpiryLabel {
    Current,
    Next,
    Far,
}

impl ExpiryLabel {
    pub const ALL: [ExpiryLabel; 3] = [ExpiryLabel::Current, ExpiryLabel::Next, ExpiryLabel::Far];
}

/// How the rows sharing one expiry collapse into a single price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PriceAggregation {
    #[default]
    Mean,
    First,
}

/// Sign convention of the roll spread and its inclusion rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RollConvention {
    /// `diff = Next - Current`, with a percentage column. A negative threshold
    /// selects backwardation (`diff < min_diff`), otherwise `diff >= min_diff`.
    #[default]
    NextMinusCurrent,
    /// `diff = Current - Next`, included when `diff >= min_diff` (threshold >= 0).
    CurrentMinusNext,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollParams {
    pub min_diff: f64,
    pub selected_stock: Option<String>,
    pub aggregation: PriceAggregation,
    pub convention: RollConvention,
}

impl Default for RollParams {
    fn default() -> Self {
        Self {
            min_diff: -2.0,
            selected_stock: None,
            aggregation: PriceAggregation::Mean,
            convention: RollConvention::NextMinusCurrent,
        }
    }
}

/// Price of one labelled expiry plus its month abbreviation ("Jun").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegPrice {
    pub expiry: NaiveDate,
    pub month: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollResult {
    pub stock: String,
    pub current: LegPrice,
    pub next: LegPrice,
    /// Only reported under `CurrentMinusNext`.
    pub far: Option<LegPrice>,
    pub diff: f64,
    /// Only reported under `NextMinusCurrent`.
    pub pct: Option<f64>,
}

/// Counters for rows and groups the analysis discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DropStats {
    pub rows_scanned: usize,
    pub non_futures: usize,
    pub unparsable_contract: usize,
    pub filtered_by_stock: usize,
    pub single_expiry_groups: usize,
    pub missing_price_groups: usize,
    pub below_threshold_groups: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollOutcome {
    pub rows: Vec<RollResult>,
    /// Set when the run could not proceed (unknown stock, missing column).
    pub message: Option<String>,
    pub stats: DropStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreOpenRow {
    pub symbol: String,
    pub prev_close: f64,
    pub change: Option<f64>,
    pub pct_change: f64,
    pub po_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreOpenOutcome {
    pub rows: Vec<PreOpenRow>,
    pub message: Option<String>,
}
