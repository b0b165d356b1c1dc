//! F&O pre-open snapshot filter: keep symbols whose pre-open % change sits in a
//! positive or negative band, above a minimum previous close.

use tracing::info;

use crate::config::PreOpenCfg;
use crate::table::Table;
use crate::types::{PreOpenOutcome, PreOpenRow};
use crate::utils::{parse_number, sanitize_symbol};

pub const SYMBOL: &str = "SYMBOL";
pub const CHANGE: &str = "CHANGE";
pub const PCT_CHANGE: &str = "PCT_CHANGE";
pub const PREV_CLOSE: &str = "PREV_CLOSE";
pub const PO_PRICE: &str = "P.O. Price";

/// NSE export headers -> canonical names.
const RENAMES: &[(&str, &str)] = &[
    ("CHNG", CHANGE),
    ("%CHNG", PCT_CHANGE),
    ("PREV. CLOSE", PREV_CLOSE),
    ("FINAL", PO_PRICE),
];

pub fn normalize_columns(table: &mut Table) {
    table.rename_columns(RENAMES);
}

pub fn filter(table: &Table, cfg: &PreOpenCfg) -> PreOpenOutcome {
    let (Some(sym_idx), Some(pct_idx), Some(prev_idx)) = (
        table.column_index(SYMBOL),
        table.column_index(PCT_CHANGE),
        table.column_index(PREV_CLOSE),
    ) else {
        let missing = [SYMBOL, PCT_CHANGE, PREV_CLOSE]
            .into_iter()
            .find(|c| table.column_index(c).is_none())
            .unwrap_or(SYMBOL);
        return PreOpenOutcome {
            rows: Vec::new(),
            message: Some(format!("Missing required column: {missing}")),
        };
    };
    let change_idx = table.column_index(CHANGE);
    let po_idx = table.column_index(PO_PRICE);

    let in_band = |pct: f64| {
        (cfg.lower_positive..=cfg.upper_positive).contains(&pct)
            || (cfg.lower_negative..=cfg.upper_negative).contains(&pct)
    };

    let mut rows: Vec<PreOpenRow> = table
        .records()
        .iter()
        .filter_map(|rec| {
            let pct_change = parse_number(Table::get(rec, pct_idx))?;
            let prev_close = parse_number(Table::get(rec, prev_idx))?;
            if !in_band(pct_change) || prev_close < cfg.min_prev_close {
                return None;
            }
            Some(PreOpenRow {
                symbol: sanitize_symbol(Table::get(rec, sym_idx)),
                prev_close,
                change: change_idx.and_then(|i| parse_number(Table::get(rec, i))),
                pct_change,
                po_price: po_idx.and_then(|i| parse_number(Table::get(rec, i))),
            })
        })
        .collect();

    // Stable: ties keep file order.
    rows.sort_by(|a, b| b.pct_change.total_cmp(&a.pct_change));

    info!(
        "Pre-open filter: {} of {} symbols in band",
        rows.len(),
        table.len()
    );
    PreOpenOutcome {
        rows,
        message: None,
    }
}
