//! Calendar-roll analysis of stock futures: group FUTSTK rows by underlying, rank
//! expiries (Current/Next/Far) and flag the Current-vs-Next spread against a threshold.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::config::ColumnsCfg;
use crate::parser::{is_stock_future, parse_contract};
use crate::table::Table;
use crate::types::{
    DropStats, ExpiryLabel, LegPrice, PriceAggregation, RollConvention, RollOutcome, RollParams,
    RollResult,
};
use crate::utils::{month_abbrev, parse_number, round2, sanitize_symbol};

/// One parsed FUTSTK row. `close` is None when the price cell is not numeric.
#[derive(Debug, Clone)]
struct FutRow {
    underlying: String,
    expiry: NaiveDate,
    close: Option<f64>,
}

pub fn analyze(table: &Table, columns: &ColumnsCfg, params: &RollParams) -> RollOutcome {
    let mut stats = DropStats {
        rows_scanned: table.len(),
        ..DropStats::default()
    };

    let (Some(contract_idx), Some(close_idx)) = (
        table.column_index(&columns.contract),
        table.column_index(&columns.close),
    ) else {
        let missing = if table.column_index(&columns.contract).is_none() {
            &columns.contract
        } else {
            &columns.close
        };
        return RollOutcome {
            rows: Vec::new(),
            message: Some(format!("Missing required column: {missing}")),
            stats,
        };
    };

    let mut rows: Vec<FutRow> = Vec::new();
    for rec in table.records() {
        let raw = Table::get(rec, contract_idx);
        if !is_stock_future(raw) {
            stats.non_futures += 1;
            continue;
        }
        let Some(pc) = parse_contract(raw) else {
            stats.unparsable_contract += 1;
            debug!("Dropping unparsable contract {:?}", raw);
            continue;
        };
        rows.push(FutRow {
            underlying: pc.underlying,
            expiry: pc.expiry,
            close: parse_number(Table::get(rec, close_idx)),
        });
    }

    if let Some(stock) = params.selected_stock.as_deref().map(str::trim) {
        if !stock.is_empty() {
            // same folding as the parser applies to the underlying
            let wanted = sanitize_symbol(stock);
            let before = rows.len();
            rows.retain(|r| r.underlying == wanted);
            stats.filtered_by_stock = before - rows.len();
            if rows.is_empty() {
                return RollOutcome {
                    rows: Vec::new(),
                    message: Some(format!("No data found for stock: {stock}")),
                    stats,
                };
            }
        }
    }

    // BTreeMap keeps the output sorted by underlying.
    let mut groups: BTreeMap<&str, Vec<&FutRow>> = BTreeMap::new();
    for r in &rows {
        groups.entry(r.underlying.as_str()).or_default().push(r);
    }

    let mut results = Vec::new();
    for (stock, group) in &groups {
        let expiries: BTreeSet<NaiveDate> = group.iter().map(|r| r.expiry).collect();
        if expiries.len() < 2 {
            stats.single_expiry_groups += 1;
            continue;
        }

        let mut legs: BTreeMap<ExpiryLabel, LegPrice> = BTreeMap::new();
        for (label, expiry) in ExpiryLabel::ALL.iter().zip(expiries.iter()) {
            if let Some(price) = leg_price(group, *expiry, params.aggregation) {
                legs.insert(
                    *label,
                    LegPrice {
                        expiry: *expiry,
                        month: month_abbrev(*expiry),
                        price,
                    },
                );
            }
        }

        let (Some(current), Some(next)) = (
            legs.remove(&ExpiryLabel::Current),
            legs.remove(&ExpiryLabel::Next),
        ) else {
            stats.missing_price_groups += 1;
            debug!("{} lacks a Current or Next price", stock);
            continue;
        };

        match roll_spread(current.price, next.price, params) {
            Some((diff, pct)) => {
                let far = match params.convention {
                    RollConvention::CurrentMinusNext => legs.remove(&ExpiryLabel::Far),
                    RollConvention::NextMinusCurrent => None,
                };
                results.push(RollResult {
                    stock: stock.to_string(),
                    current,
                    next,
                    far,
                    diff,
                    pct,
                });
            }
            None => stats.below_threshold_groups += 1,
        }
    }

    info!(
        "Roll analysis: {} of {} underlyings qualified ({} rows scanned, {} unparsable)",
        results.len(),
        groups.len(),
        stats.rows_scanned,
        stats.unparsable_contract
    );
    debug!("Drop stats: {:?}", stats);

    RollOutcome {
        rows: results,
        message: None,
        stats,
    }
}

/// Representative price of the rows sharing `expiry`. Missing prices are
/// skipped by `Mean`; `First` takes the first row in file order as-is.
fn leg_price(group: &[&FutRow], expiry: NaiveDate, agg: PriceAggregation) -> Option<f64> {
    let mut same = group.iter().filter(|r| r.expiry == expiry);
    match agg {
        PriceAggregation::First => same.next().and_then(|r| r.close),
        PriceAggregation::Mean => {
            let (sum, n) = same
                .filter_map(|r| r.close)
                .fold((0.0, 0usize), |(s, n), p| (s + p, n + 1));
            (n > 0).then(|| sum / n as f64)
        }
    }
}

/// Rounded `(diff, pct)` when the spread passes the threshold, None otherwise.
/// The inclusion test uses the unrounded difference.
fn roll_spread(current: f64, next: f64, params: &RollParams) -> Option<(f64, Option<f64>)> {
    let min_diff = params.min_diff;
    match params.convention {
        RollConvention::NextMinusCurrent => {
            let raw = next - current;
            let keep = if min_diff >= 0.0 {
                raw >= min_diff
            } else {
                raw < min_diff
            };
            if !keep {
                return None;
            }
            let diff = round2(raw);
            let pct = if current != 0.0 {
                round2(diff / current * 100.0)
            } else {
                0.0
            };
            Some((diff, Some(pct)))
        }
        RollConvention::CurrentMinusNext => {
            let raw = current - next;
            (raw >= min_diff).then(|| (round2(raw), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, &str)]) -> Table {
        let mut s = String::from("INSTRUMENT,CONTRACT_D,CLOSE_PRIC\n");
        for (c, p) in rows {
            s.push_str(&format!("X,{c},{p}\n"));
        }
        Table::from_reader(s.as_bytes()).unwrap()
    }

    fn params(min_diff: f64, convention: RollConvention) -> RollParams {
        RollParams {
            min_diff,
            convention,
            ..RollParams::default()
        }
    }

    fn run(t: &Table, p: &RollParams) -> RollOutcome {
        analyze(t, &ColumnsCfg::default(), p)
    }

    fn two_leg(current: &str, next: &str) -> Table {
        table(&[
            ("FUTSTKINFY26-JUN-2025", current),
            ("FUTSTKINFY31-JUL-2025", next),
        ])
    }

    // ---------- grouping & ranking ----------

    #[test]
    fn single_expiry_group_excluded() {
        let t = table(&[
            ("FUTSTKTCS26-JUN-2025", "100"),
            ("FUTSTKINFY26-JUN-2025", "100"),
            ("FUTSTKINFY31-JUL-2025", "110"),
        ]);
        let out = run(&t, &params(0.0, RollConvention::NextMinusCurrent));
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].stock, "INFY");
        assert_eq!(out.stats.single_expiry_groups, 1);
        assert!(out.message.is_none());
    }

    #[test]
    fn expiries_ranked_chronologically_not_by_file_order() {
        let t = table(&[
            ("FUTSTKINFY28-AUG-2025", "130"),
            ("FUTSTKINFY31-JUL-2025", "120"),
            ("FUTSTKINFY26-JUN-2025", "100"),
        ]);
        let out = run(&t, &params(0.0, RollConvention::CurrentMinusNext));
        assert!(out.rows.is_empty()); // 100 - 120 < 0

        let out = run(&t, &params(0.0, RollConvention::NextMinusCurrent));
        let r = &out.rows[0];
        assert_eq!(r.current.month, "Jun");
        assert_eq!(r.next.month, "Jul");
        assert_eq!(r.current.price, 100.0);
        assert_eq!(r.next.price, 120.0);
        assert_eq!(r.diff, 20.0);
        assert_eq!(r.pct, Some(20.0));
        assert!(r.far.is_none());
    }

    #[test]
    fn far_leg_reported_for_current_minus_next() {
        let t = table(&[
            ("FUTSTKSBIN26-JUN-2025", "800"),
            ("FUTSTKSBIN31-JUL-2025", "790"),
            ("FUTSTKSBIN28-AUG-2025", "785"),
        ]);
        let out = run(&t, &params(5.0, RollConvention::CurrentMinusNext));
        let r = &out.rows[0];
        assert_eq!(r.diff, 10.0);
        assert_eq!(r.pct, None);
        let far = r.far.as_ref().expect("far leg");
        assert_eq!(far.month, "Aug");
        assert_eq!(far.price, 785.0);
    }

    #[test]
    fn only_three_nearest_expiries_are_ranked() {
        let t = table(&[
            ("FUTSTKSBIN25-SEP-2025", "700"),
            ("FUTSTKSBIN28-AUG-2025", "785"),
            ("FUTSTKSBIN31-JUL-2025", "790"),
            ("FUTSTKSBIN26-JUN-2025", "800"),
        ]);
        let out = run(&t, &params(0.0, RollConvention::CurrentMinusNext));
        assert_eq!(out.rows.len(), 1);
        let r = &out.rows[0];
        assert_eq!(r.current.month, "Jun");
        assert_eq!(r.next.month, "Jul");
        let far = r.far.as_ref().expect("far leg");
        assert_eq!(far.month, "Aug");
        assert_eq!(far.price, 785.0);
        assert_eq!(r.diff, 10.0);
    }

    #[test]
    fn output_sorted_by_underlying_and_filters_non_futures() {
        let t = table(&[
            ("FUTSTKZEEL26-JUN-2025", "10"),
            ("FUTSTKZEEL31-JUL-2025", "11"),
            ("FUTIDXNIFTY26-JUN-2025", "25000"),
            ("FUTIDXNIFTY31-JUL-2025", "25100"),
            ("FUTSTKACC26-JUN-2025", "2000"),
            ("FUTSTKACC31-JUL-2025", "2010"),
            ("FUTSTKBROKEN", "1"),
        ]);
        let out = run(&t, &params(0.0, RollConvention::NextMinusCurrent));
        let names: Vec<_> = out.rows.iter().map(|r| r.stock.as_str()).collect();
        assert_eq!(names, ["ACC", "ZEEL"]);
        assert_eq!(out.stats.non_futures, 2);
        assert_eq!(out.stats.unparsable_contract, 1);
        assert_eq!(out.stats.rows_scanned, 7);
    }

    // ---------- price aggregation ----------

    #[test]
    fn mean_versus_first_row() {
        let t = table(&[
            ("FUTSTKINFY26-JUN-2025", "100"),
            ("FUTSTKINFY26-JUN-2025", "104"),
            ("FUTSTKINFY31-JUL-2025", "110"),
        ]);
        let mut p = params(0.0, RollConvention::NextMinusCurrent);
        assert_eq!(run(&t, &p).rows[0].current.price, 102.0);

        p.aggregation = PriceAggregation::First;
        assert_eq!(run(&t, &p).rows[0].current.price, 100.0);
    }

    #[test]
    fn unparsable_prices() {
        let t = table(&[
            ("FUTSTKINFY26-JUN-2025", "-"),
            ("FUTSTKINFY26-JUN-2025", "\"1,000\""),
            ("FUTSTKINFY31-JUL-2025", "1010"),
        ]);
        let mut p = params(0.0, RollConvention::NextMinusCurrent);
        assert_eq!(run(&t, &p).rows[0].current.price, 1000.0);

        // first row has no price -> no Current leg -> group dropped
        p.aggregation = PriceAggregation::First;
        let out = run(&t, &p);
        assert!(out.rows.is_empty());
        assert_eq!(out.stats.missing_price_groups, 1);
    }

    // ---------- thresholds ----------

    #[test]
    fn current_minus_next_inclusive_boundary() {
        let t = two_leg("100", "95");
        assert_eq!(run(&t, &params(5.0, RollConvention::CurrentMinusNext)).rows.len(), 1);
        let out = run(&t, &params(5.01, RollConvention::CurrentMinusNext));
        assert!(out.rows.is_empty());
        assert_eq!(out.stats.below_threshold_groups, 1);
    }

    #[test]
    fn next_minus_current_negative_threshold_is_strict() {
        let t = two_leg("100", "97");
        let out = run(&t, &params(-2.0, RollConvention::NextMinusCurrent));
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].diff, -3.0);
        assert_eq!(out.rows[0].pct, Some(-3.0));

        assert!(run(&t, &params(-3.0, RollConvention::NextMinusCurrent)).rows.is_empty());
    }

    #[test]
    fn next_minus_current_positive_threshold_is_inclusive() {
        let t = two_leg("100", "102");
        assert_eq!(run(&t, &params(2.0, RollConvention::NextMinusCurrent)).rows.len(), 1);
        assert!(run(&t, &params(2.5, RollConvention::NextMinusCurrent)).rows.is_empty());
        // backwardation search does not return contango rows
        assert!(run(&t, &params(-1.0, RollConvention::NextMinusCurrent)).rows.is_empty());
    }

    #[test]
    fn zero_current_price_gives_zero_pct() {
        let t = two_leg("0", "5");
        let out = run(&t, &params(0.0, RollConvention::NextMinusCurrent));
        assert_eq!(out.rows[0].pct, Some(0.0));
    }

    #[test]
    fn reported_values_are_rounded() {
        let t = two_leg("100.004", "103.337");
        let r = &run(&t, &params(0.0, RollConvention::NextMinusCurrent)).rows[0];
        assert_eq!(r.diff, 3.33);
        assert_eq!(r.pct, Some(3.33));
        assert_eq!(r.current.price, 100.004);
    }

    // ---------- stock filter ----------

    #[test]
    fn selected_stock_case_insensitive() {
        let t = table(&[
            ("FUTSTKINFY26-JUN-2025", "100"),
            ("FUTSTKINFY31-JUL-2025", "110"),
            ("FUTSTKTCS26-JUN-2025", "100"),
            ("FUTSTKTCS31-JUL-2025", "110"),
        ]);
        let mut p = params(0.0, RollConvention::NextMinusCurrent);
        p.selected_stock = Some("infy".into());
        let out = run(&t, &p);
        assert!(out.message.is_none());
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].stock, "INFY");
        assert_eq!(out.stats.filtered_by_stock, 2);
    }

    #[test]
    fn selected_stock_uses_parser_case_folding() {
        let t = table(&[
            ("FUTSTKäbc26-JUN-2025", "100"),
            ("FUTSTKäbc31-JUL-2025", "110"),
        ]);
        let mut p = params(0.0, RollConvention::NextMinusCurrent);
        p.selected_stock = Some("Äbc".into());
        let out = run(&t, &p);
        assert!(out.message.is_none());
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].stock, "ÄBC");
    }

    #[test]
    fn unknown_stock_short_circuits_with_message() {
        let t = two_leg("100", "110");
        let mut p = params(0.0, RollConvention::NextMinusCurrent);
        p.selected_stock = Some("WIPRO".into());
        let out = run(&t, &p);
        assert!(out.rows.is_empty());
        assert_eq!(out.message.as_deref(), Some("No data found for stock: WIPRO"));
    }

    #[test]
    fn found_stock_below_threshold_has_no_message() {
        let t = two_leg("100", "101");
        let mut p = params(50.0, RollConvention::NextMinusCurrent);
        p.selected_stock = Some("INFY".into());
        let out = run(&t, &p);
        assert!(out.rows.is_empty());
        assert!(out.message.is_none());
    }

    // ---------- degenerate input ----------

    #[test]
    fn missing_column_reports_message() {
        let t = Table::from_reader("SYMBOL,CLOSE_PRIC\nINFY,1\n".as_bytes()).unwrap();
        let out = run(&t, &RollParams::default());
        assert!(out.rows.is_empty());
        assert_eq!(out.message.as_deref(), Some("Missing required column: CONTRACT_D"));
    }

    #[test]
    fn empty_table_is_empty_result() {
        let t = table(&[]);
        let out = run(&t, &RollParams::default());
        assert!(out.rows.is_empty());
        assert!(out.message.is_none());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let t = table(&[
            ("FUTSTKINFY26-JUN-2025", "100"),
            ("FUTSTKINFY31-JUL-2025", "97"),
            ("FUTSTKTCS26-JUN-2025", "50"),
            ("FUTSTKTCS31-JUL-2025", "40"),
        ]);
        let p = RollParams::default();
        assert_eq!(run(&t, &p), run(&t, &p));
    }
}
