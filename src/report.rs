//! Render and export result tables (aligned text, CSV with header row, JSON).

use std::io::Write;

use serde::Serialize;

use crate::types::{LegPrice, PreOpenRow, RollConvention, RollParams, RollResult};

pub const DEFAULT_EXPORT: &str = "filtered_futures.csv";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

/// Header row plus stringified cells, ready for any output format.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl Report {
    pub fn render_text(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for rec in &self.records {
            for (w, cell) in widths.iter_mut().zip(rec) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .enumerate()
                .map(|(i, (c, w))| {
                    // first column (symbol) left-aligned, numbers right-aligned
                    let pad = " ".repeat(w - c.chars().count());
                    if i == 0 {
                        format!("{c}{pad}")
                    } else {
                        format!("{pad}{c}")
                    }
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = line(&self.headers);
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for rec in &self.records {
            out.push_str(&line(rec));
            out.push('\n');
        }
        out
    }

    pub fn write_csv<W: Write>(&self, w: W) -> anyhow::Result<()> {
        let mut wtr = csv::Writer::from_writer(w);
        wtr.write_record(&self.headers)?;
        for rec in &self.records {
            wtr.write_record(rec)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

pub fn write_json<W: Write, T: Serialize>(mut w: W, rows: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut w, rows)?;
    writeln!(w)?;
    Ok(())
}

pub fn roll_headline(params: &RollParams) -> String {
    let m = params.min_diff;
    match params.convention {
        RollConvention::NextMinusCurrent if m >= 0.0 => {
            format!("Stocks where Next >= Current by ₹{} or more", fmt_num(m.abs()))
        }
        RollConvention::NextMinusCurrent => {
            format!("Stocks where Next < Current by ₹{} or more", fmt_num(m.abs()))
        }
        RollConvention::CurrentMinusNext => {
            format!("Stocks where Current - Next >= ₹{}", fmt_num(m))
        }
    }
}

pub fn roll_report(rows: &[RollResult], convention: RollConvention) -> Report {
    let current = month_header("Current Month", rows.iter().map(|r| Some(&r.current)));
    let next = month_header("Next Month", rows.iter().map(|r| Some(&r.next)));

    match convention {
        RollConvention::NextMinusCurrent => Report {
            headers: vec![
                "Stock".into(),
                next,
                current,
                "Difference (₹)".into(),
                "Difference (%)".into(),
            ],
            records: rows
                .iter()
                .map(|r| {
                    vec![
                        r.stock.clone(),
                        fmt_num(r.next.price),
                        fmt_num(r.current.price),
                        fmt_num(r.diff),
                        r.pct.map(fmt_num).unwrap_or_default(),
                    ]
                })
                .collect(),
        },
        RollConvention::CurrentMinusNext => Report {
            headers: vec![
                "Stock".into(),
                current,
                next,
                month_header("Far Next Month", rows.iter().map(|r| r.far.as_ref())),
                "Difference (₹)".into(),
            ],
            records: rows
                .iter()
                .map(|r| {
                    vec![
                        r.stock.clone(),
                        fmt_num(r.current.price),
                        fmt_num(r.next.price),
                        r.far.as_ref().map(|f| fmt_num(f.price)).unwrap_or_default(),
                        fmt_num(r.diff),
                    ]
                })
                .collect(),
        },
    }
}

pub fn preopen_report(rows: &[PreOpenRow]) -> Report {
    Report {
        headers: ["SYMBOL", "PREV_CLOSE", "CHANGE", "PCT_CHANGE", "P.O. Price"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        records: rows
            .iter()
            .map(|r| {
                vec![
                    r.symbol.clone(),
                    fmt_num(r.prev_close),
                    r.change.map(fmt_num).unwrap_or_default(),
                    fmt_num(r.pct_change),
                    r.po_price.map(fmt_num).unwrap_or_default(),
                ]
            })
            .collect(),
    }
}

/// "Current Month (Jun)" when every leg shares one month, else the bare label.
fn month_header<'a>(base: &str, legs: impl Iterator<Item = Option<&'a LegPrice>>) -> String {
    let mut month: Option<&str> = None;
    for leg in legs {
        let Some(leg) = leg else { continue };
        match month {
            None => month = Some(leg.month.as_str()),
            Some(m) if m != leg.month => return base.to_string(),
            _ => {}
        }
    }
    match month {
        Some(m) => format!("{base} ({m})"),
        None => base.to_string(),
    }
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}
