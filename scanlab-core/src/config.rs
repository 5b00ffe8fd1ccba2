//! Scan configuration.
//!
//! Loaded once per run from TOML and passed by reference to every component
//! that needs it. Validation runs right after parsing; any failure is fatal
//! before a single symbol is processed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::Target;
use crate::features::warmup_bars;
use crate::regime::Regime;
use crate::scoring::{ComponentWeights, PoolGate};
use crate::strategies::StrategyKind;
use crate::universe::UniverseFilter;

pub const DEFAULT_MIN_HISTORY_BARS: usize = 260;
pub const DEFAULT_SYMBOLS: [&str; 6] = ["AAPL", "MSFT", "NVDA", "TSLA", "AMZN", "META"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse {what}: {message}")]
    Parse { what: &'static str, message: String },

    #[error("missing score map '{0}'")]
    MissingScoreMap(String),

    #[error("strategy {strategy} references unknown pool '{pool}'")]
    UnknownPool { strategy: StrategyKind, pool: String },

    #[error("invalid '{key}': {message}")]
    Invalid { key: String, message: String },
}

fn invalid(key: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key: key.into(),
        message: message.into(),
    }
}

fn positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

fn default_currency() -> String {
    "USD".into()
}

fn default_bar_interval() -> String {
    "1d".into()
}

fn default_min_history() -> usize {
    DEFAULT_MIN_HISTORY_BARS
}

fn default_time_horizon() -> String {
    "SWING".into()
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaConfig {
    /// Universe tag stamped on every alert.
    pub universe: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Symbol whose features drive the regime classifier.
    pub benchmark: String,
    #[serde(default = "default_bar_interval")]
    pub bar_interval: String,
    #[serde(default = "default_min_history")]
    pub min_history_bars: usize,
    #[serde(default = "default_time_horizon")]
    pub time_horizon: String,
    /// Symbols scanned when none are given on the command line.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub min_rr: f64,
    pub stop_atr_multiple: f64,
    #[serde(default)]
    pub require_close_confirm: bool,
    #[serde(default)]
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub allowed_regimes: Vec<Regime>,
    pub pool_default: String,
    pub params: StrategyParams,
}

impl StrategyConfig {
    /// Enabled and permitted under `regime`.
    pub fn runs_in(&self, regime: Regime) -> bool {
        self.enabled && self.allowed_regimes.contains(&regime)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategiesConfig {
    #[serde(rename = "TREND_BREAKOUT")]
    pub trend_breakout: StrategyConfig,
    #[serde(rename = "RS_ROTATION")]
    pub rs_rotation: StrategyConfig,
}

impl StrategiesConfig {
    pub fn get(&self, kind: StrategyKind) -> &StrategyConfig {
        match kind {
            StrategyKind::TrendBreakout => &self.trend_breakout,
            StrategyKind::RsRotation => &self.rs_rotation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub min_total: f64,
    pub max_alerts_per_run: usize,
    pub max_risk_pct_of_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights_global: ComponentWeights,
    pub pools: BTreeMap<String, PoolConfig>,
}

impl ScoringConfig {
    /// Selection-gate limits per pool.
    pub fn gates(&self) -> BTreeMap<String, PoolGate> {
        self.pools
            .iter()
            .map(|(name, p)| {
                (
                    name.clone(),
                    PoolGate {
                        min_total: p.min_total,
                        max_alerts: p.max_alerts_per_run,
                    },
                )
            })
            .collect()
    }
}

/// Full scan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub meta: MetaConfig,
    pub universe_filter: UniverseFilter,
    pub strategies: StrategiesConfig,
    pub scoring: ScoringConfig,
}

impl ScanConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            what: "scan config",
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.meta.benchmark.trim().is_empty() {
            return Err(invalid("meta.benchmark", "must not be empty"));
        }
        let min_history = warmup_bars() + 1;
        if self.meta.min_history_bars < min_history {
            return Err(invalid(
                "meta.min_history_bars",
                format!(
                    "{} is below the {min_history} bars a complete feature row needs",
                    self.meta.min_history_bars
                ),
            ));
        }

        self.universe_filter.validate()?;

        for (name, w) in self.scoring.weights_global.entries() {
            if !w.is_finite() {
                return Err(invalid(format!("scoring.weights_global.{name}"), "must be finite"));
            }
        }
        for (name, pool) in &self.scoring.pools {
            if pool.max_alerts_per_run < 1 {
                return Err(invalid(
                    format!("scoring.pools.{name}.max_alerts_per_run"),
                    "must be >= 1",
                ));
            }
            if !pool.min_total.is_finite() {
                return Err(invalid(format!("scoring.pools.{name}.min_total"), "must be finite"));
            }
            if !positive(pool.max_risk_pct_of_equity) {
                return Err(invalid(
                    format!("scoring.pools.{name}.max_risk_pct_of_equity"),
                    "must be > 0",
                ));
            }
        }

        for kind in StrategyKind::ALL {
            let s = self.strategies.get(kind);
            let key = |field: &str| format!("strategies.{kind}.{field}");
            if !self.scoring.pools.contains_key(&s.pool_default) {
                return Err(ConfigError::UnknownPool {
                    strategy: kind,
                    pool: s.pool_default.clone(),
                });
            }
            if !positive(s.params.min_rr) {
                return Err(invalid(key("params.min_rr"), "must be > 0"));
            }
            if !positive(s.params.stop_atr_multiple) {
                return Err(invalid(key("params.stop_atr_multiple"), "must be > 0"));
            }
            for (i, t) in s.params.targets.iter().enumerate() {
                if !positive(t.rr) || !(positive(t.size_pct) && t.size_pct <= 1.0) {
                    return Err(invalid(
                        key(&format!("params.targets[{i}]")),
                        "rr must be > 0 and size_pct in (0, 1]",
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn pool(&self, name: &str) -> Result<&PoolConfig, ConfigError> {
        self.scoring
            .pools
            .get(name)
            .ok_or_else(|| invalid(format!("scoring.pools.{name}"), "no such pool"))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SCAN_TOML: &str = r#"
[meta]
universe = "US_LARGE_CAP"
benchmark = "SPY"

[universe_filter]
min_price = 5.0
min_avg_dollar_volume_20d = 20000000.0
exclude_symbols = ["GME"]

[strategies.TREND_BREAKOUT]
allowed_regimes = ["TREND"]
pool_default = "CORE"
[strategies.TREND_BREAKOUT.params]
min_rr = 2.0
stop_atr_multiple = 2.0
require_close_confirm = true
targets = [
  { name = "T1", rr = 2.0, size_pct = 0.5 },
  { name = "T2", rr = 3.0, size_pct = 0.5 },
]

[strategies.RS_ROTATION]
allowed_regimes = ["TREND", "RANGE"]
pool_default = "CORE"
[strategies.RS_ROTATION.params]
min_rr = 2.0
stop_atr_multiple = 1.5

[scoring.weights_global]
regime_fit = 0.15
trend_momo = 0.30
mean_reversion = 0.0
volume_flow = 0.15
risk_reward = 0.20
liquidity = 0.20

[scoring.pools.CORE]
min_total = 60.0
max_alerts_per_run = 10
max_risk_pct_of_equity = 0.01
"#;

    #[test]
    fn parses_with_defaults() {
        let c = ScanConfig::from_toml(SCAN_TOML).unwrap();
        assert_eq!(c.meta.currency, "USD");
        assert_eq!(c.meta.min_history_bars, DEFAULT_MIN_HISTORY_BARS);
        assert_eq!(c.meta.time_horizon, "SWING");
        assert_eq!(c.meta.symbols.len(), DEFAULT_SYMBOLS.len());
        assert!(c.strategies.trend_breakout.enabled);
        assert!(!c.strategies.rs_rotation.params.require_close_confirm);
        assert_eq!(c.strategies.trend_breakout.params.targets[1].name, "T2");
        assert_eq!(c.pool("CORE").unwrap().max_alerts_per_run, 10);
    }

    #[test]
    fn regime_gating() {
        let c = ScanConfig::from_toml(SCAN_TOML).unwrap();
        let b = c.strategies.get(StrategyKind::TrendBreakout);
        assert!(b.runs_in(Regime::Trend));
        assert!(!b.runs_in(Regime::Range));
        let r = c.strategies.get(StrategyKind::RsRotation);
        assert!(r.runs_in(Regime::Range));
        assert!(!r.runs_in(Regime::HighVol));
    }

    #[test]
    fn disabled_strategy_never_runs() {
        let toml = SCAN_TOML.replace(
            "[strategies.RS_ROTATION]\n",
            "[strategies.RS_ROTATION]\nenabled = false\n",
        );
        let c = ScanConfig::from_toml(&toml).unwrap();
        assert!(!c.strategies.rs_rotation.runs_in(Regime::Trend));
    }

    #[test]
    fn unknown_pool_is_rejected() {
        let toml = SCAN_TOML.replacen("pool_default = \"CORE\"", "pool_default = \"SATELLITE\"", 1);
        match ScanConfig::from_toml(&toml) {
            Err(ConfigError::UnknownPool { strategy, pool }) => {
                assert_eq!(strategy, StrategyKind::TrendBreakout);
                assert_eq!(pool, "SATELLITE");
            }
            other => panic!("expected UnknownPool, got {other:?}"),
        }
    }

    #[test]
    fn zero_max_alerts_is_rejected() {
        let toml = SCAN_TOML.replace("max_alerts_per_run = 10", "max_alerts_per_run = 0");
        assert!(matches!(
            ScanConfig::from_toml(&toml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn short_min_history_is_rejected() {
        let toml = SCAN_TOML.replace(
            "benchmark = \"SPY\"",
            "benchmark = \"SPY\"\nmin_history_bars = 100",
        );
        match ScanConfig::from_toml(&toml) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "meta.min_history_bars"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn missing_section_is_parse_error() {
        let toml = SCAN_TOML.replace("[scoring.weights_global]", "[scoring.weights]");
        assert!(matches!(
            ScanConfig::from_toml(&toml),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn unknown_regime_is_parse_error() {
        let toml = SCAN_TOML.replace("[\"TREND\"]", "[\"SIDEWAYS\"]");
        assert!(ScanConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = ScanConfig::from_file(Path::new("/nonexistent/scan.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/scan.toml"));
    }

    #[test]
    fn gates_mirror_pools() {
        let c = ScanConfig::from_toml(SCAN_TOML).unwrap();
        let gates = c.scoring.gates();
        assert_eq!(gates["CORE"].min_total, 60.0);
        assert_eq!(gates["CORE"].max_alerts, 10);
    }
}
