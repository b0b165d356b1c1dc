//! Load and validate runtime configuration.

use anyhow::Context;
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::types::{PriceAggregation, RollConvention, RollParams};

pub const CONFIG_ENV: &str = "FNO_ANALYZER_CONFIG";
const CONFIG_FILE: &str = "config.yaml";
/// Bounds of the minimum-difference input (₹).
pub const MIN_DIFF_LIMIT: f64 = 500.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("min_diff {0} is outside [-500, 500]")]
    MinDiffOutOfRange(f64),
    #[error("convention current_minus_next requires min_diff >= 0, got {0}")]
    NegativeThreshold(f64),
    #[error("pre-open {band} band is inverted: lower {lower} > upper {upper}")]
    InvertedBand {
        band: &'static str,
        lower: f64,
        upper: f64,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnsCfg {
    pub contract: String, // contract descriptor, e.g. FUTSTKINFY26-JUN-2025
    pub close: String,
}

impl Default for ColumnsCfg {
    fn default() -> Self {
        Self {
            contract: "CONTRACT_D".into(),
            close: "CLOSE_PRIC".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ArchiveCfg {
    pub member_prefix: String, // matched against the lowercased member name
    pub member_suffix: String,
}

impl Default for ArchiveCfg {
    fn default() -> Self {
        Self {
            member_prefix: "fo".into(),
            member_suffix: ".csv".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RollCfg {
    /// Unset means the convention's own default threshold.
    pub min_diff: Option<f64>,
    pub selected_stock: Option<String>,
    pub price_aggregation: PriceAggregation,
    pub convention: RollConvention,
}

impl Default for RollCfg {
    fn default() -> Self {
        let p = RollParams::default();
        Self {
            min_diff: None,
            selected_stock: p.selected_stock,
            price_aggregation: p.aggregation,
            convention: p.convention,
        }
    }
}

impl RollCfg {
    /// -2.0 (backwardation search) for `NextMinusCurrent`, 0.0 for `CurrentMinusNext`.
    pub fn min_diff(&self) -> f64 {
        self.min_diff.unwrap_or(match self.convention {
            RollConvention::NextMinusCurrent => RollParams::default().min_diff,
            RollConvention::CurrentMinusNext => 0.0,
        })
    }

    pub fn params(&self) -> RollParams {
        RollParams {
            min_diff: self.min_diff(),
            selected_stock: self
                .selected_stock
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            aggregation: self.price_aggregation,
            convention: self.convention,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct PreOpenCfg {
    pub lower_positive: f64, // %
    pub upper_positive: f64,
    pub lower_negative: f64,
    pub upper_negative: f64,
    pub min_prev_close: f64, // ₹
}

impl Default for PreOpenCfg {
    fn default() -> Self {
        Self {
            lower_positive: 2.0,
            upper_positive: 3.0,
            lower_negative: -3.0,
            upper_negative: -2.0,
            min_prev_close: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub columns: ColumnsCfg,
    pub archive: ArchiveCfg,
    pub roll: RollCfg,
    pub preopen: PreOpenCfg,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config at {}", path.display()))?;
        let cfg: Self = serde_yaml::from_str(&s)
            .with_context(|| format!("parsing config at {}", path.display()))?;
        Ok(cfg)
    }

    /// Explicit path, then `$FNO_ANALYZER_CONFIG`, then ./config.yaml, then the
    /// platform config dir. Built-in defaults when nothing is found.
    pub fn resolve(explicit: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        if let Some(p) = explicit {
            return Ok((Self::load(p)?, Some(p.to_path_buf())));
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            let p = PathBuf::from(p);
            return Ok((Self::load(&p)?, Some(p)));
        }
        let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dirs) = ProjectDirs::from("", "", "fno-futures-analyzer") {
            candidates.push(dirs.config_dir().join(CONFIG_FILE));
        }
        for p in candidates {
            if p.is_file() {
                return Ok((Self::load(&p)?, Some(p)));
            }
        }
        Ok((Self::default(), None))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let min_diff = self.roll.min_diff();
        if !(-MIN_DIFF_LIMIT..=MIN_DIFF_LIMIT).contains(&min_diff) {
            return Err(ConfigError::MinDiffOutOfRange(min_diff));
        }
        if self.roll.convention == RollConvention::CurrentMinusNext && min_diff < 0.0 {
            return Err(ConfigError::NegativeThreshold(min_diff));
        }
        let p = &self.preopen;
        for (band, lower, upper) in [
            ("positive", p.lower_positive, p.upper_positive),
            ("negative", p.lower_negative, p.upper_negative),
        ] {
            if lower > upper {
                return Err(ConfigError::InvertedBand { band, lower, upper });
            }
        }
        Ok(())
    }
}
