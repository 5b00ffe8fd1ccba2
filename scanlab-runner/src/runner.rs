//! Scan runner: wires together bar loading, features, regime, evaluators,
//! scoring, and the selection gate.
//!
//! Order of work in one run:
//! 1. Validate configuration and score maps (fatal on failure)
//! 2. Load and classify the benchmark (fatal on failure)
//! 3. Load every symbol (fan-out; missing data is a skip)
//! 4. Evaluate every symbol (fan-out; bad data is a skip)
//! 5. Fan-in in input order, score, build alerts, apply pool gates
//!
//! Results never depend on thread scheduling: fan-out results are collected
//! in input order and the gate breaks ties by that order.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use scanlab_core::config::{ConfigError, ScanConfig};
use scanlab_core::data::{BarSource, DataError, VolatilitySource};
use scanlab_core::domain::{
    validate_bars, Alert, AlertCandidate, AlertId, AlertScores, Bar, BarError, DataProvenance,
    RegimeSnapshot, SetupInfo,
};
use scanlab_core::features::compute_features;
use scanlab_core::regime::{classify_regime, RegimeError};
use scanlab_core::scoring::{select_by_pool, total_score, ScoreMaps};
use scanlab_core::strategies::{active_strategies, EvalContext, EvalError, Strategy};

use crate::data_loader::dataset_hash;

/// Fixed notice attached to every alert.
pub const COMPLIANCE_NOTICE: &str = "Informational only; not investment advice.";

/// Hex characters kept from the BLAKE3 digest for alert ids.
const ALERT_ID_LEN: usize = 32;
const RUN_ID_LEN: usize = 16;

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("benchmark '{symbol}' has no data")]
    BenchmarkMissing { symbol: String },

    #[error("benchmark '{symbol}': {source}")]
    BenchmarkData {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("benchmark bars rejected: {0}")]
    BenchmarkBars(#[from] BarError),

    #[error("regime classification failed: {0}")]
    Regime(#[from] RegimeError),
}

// ─── Skips ──────────────────────────────────────────────────────────

/// Pipeline stage at which a symbol dropped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipStage {
    Load,
    Validate,
    Features,
    UniverseFilter,
    Evaluate,
}

impl fmt::Display for SkipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Load => "load",
            Self::Validate => "validate",
            Self::Features => "features",
            Self::UniverseFilter => "universe_filter",
            Self::Evaluate => "evaluate",
        };
        f.write_str(s)
    }
}

/// A per-symbol problem recorded in the report. Never aborts the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSkip {
    pub symbol: String,
    pub stage: SkipStage,
    pub reason: String,
}

impl SymbolSkip {
    fn new(symbol: &str, stage: SkipStage, reason: impl fmt::Display) -> Self {
        Self {
            symbol: symbol.to_string(),
            stage,
            reason: reason.to_string(),
        }
    }
}

// ─── Options and report ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Symbols to scan. Empty means `meta.symbols` from the config.
    pub symbols: Vec<String>,
    /// Fan out across symbols with rayon.
    pub parallel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            parallel: true,
        }
    }
}

/// Everything one run produced, including what it skipped and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub regime: RegimeSnapshot,
    pub data_provenance: DataProvenance,
    pub symbols_scanned: usize,
    /// Candidates produced before the selection gate.
    pub candidates_total: usize,
    pub alerts: Vec<Alert>,
    pub skipped: Vec<SymbolSkip>,
}

// ─── Alert building ─────────────────────────────────────────────────

/// Run-wide fields stamped onto every alert.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub universe: String,
    pub currency: String,
    pub time_horizon: String,
    pub provenance: DataProvenance,
    pub regime: RegimeSnapshot,
}

impl AlertContext {
    pub fn new(
        config: &ScanConfig,
        run_id: impl Into<String>,
        created_at: DateTime<Utc>,
        provenance: DataProvenance,
        regime: RegimeSnapshot,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            created_at,
            universe: config.meta.universe.clone(),
            currency: config.meta.currency.clone(),
            time_horizon: config.meta.time_horizon.clone(),
            provenance,
            regime,
        }
    }
}

/// BLAKE3 over run id, symbol, setup and candidate index, hex-truncated.
pub fn alert_id(run_id: &str, symbol: &str, setup: &str, index: usize) -> AlertId {
    let mut hasher = blake3::Hasher::new();
    for part in [run_id.as_bytes(), symbol.as_bytes(), setup.as_bytes()] {
        hasher.update(part);
        hasher.update(&[0x1f]);
    }
    hasher.update(&(index as u64).to_le_bytes());
    let hex = hasher.finalize().to_hex();
    AlertId(hex[..ALERT_ID_LEN].to_string())
}

/// Turn a scored candidate into the persisted alert record.
///
/// `index` is the candidate's position in the run's fan-in order; it keeps
/// ids unique when one symbol yields several candidates.
pub fn build_alert(candidate: AlertCandidate, total: f64, ctx: &AlertContext, index: usize) -> Alert {
    Alert {
        alert_id: alert_id(&ctx.run_id, &candidate.symbol, &candidate.setup_name, index),
        created_at_utc: ctx.created_at,
        universe: ctx.universe.clone(),
        symbol: candidate.symbol,
        currency: ctx.currency.clone(),
        data_provenance: ctx.provenance.clone(),
        market_regime: ctx.regime.clone(),
        setup: SetupInfo {
            setup_name: candidate.setup_name,
            pool: candidate.pool,
            direction: candidate.direction,
            action: candidate.action,
            time_horizon: ctx.time_horizon.clone(),
        },
        scores: AlertScores {
            total,
            components: candidate.components,
        },
        evidence: candidate.evidence,
        trade_plan: candidate.trade_plan,
        compliance_notice: COMPLIANCE_NOTICE.to_string(),
    }
}

// ─── Run ────────────────────────────────────────────────────────────

/// Outcome of the per-symbol pipeline.
#[derive(Debug, Default)]
struct SymbolOutcome {
    candidates: Vec<AlertCandidate>,
    skips: Vec<SymbolSkip>,
}

impl SymbolOutcome {
    fn skipped(skip: SymbolSkip) -> Self {
        Self {
            candidates: Vec::new(),
            skips: vec![skip],
        }
    }
}

/// Map `f` over `items`, in parallel or not. Output order is input order.
fn fan_out<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

/// Run one scan.
///
/// Fails only on run-fatal conditions (bad configuration, unusable
/// benchmark). Per-symbol problems land in `ScanReport::skipped`.
pub fn run_scan(
    config: &ScanConfig,
    maps: &ScoreMaps,
    source: &dyn BarSource,
    volatility: &dyn VolatilitySource,
    opts: &ScanOptions,
) -> Result<ScanReport, ScanError> {
    config.validate()?;
    maps.validate()?;

    let started_at = Utc::now();
    let benchmark = config.meta.benchmark.as_str();
    let requested = if opts.symbols.is_empty() {
        &config.meta.symbols
    } else {
        &opts.symbols
    };
    let symbols = config.universe_filter.resolve_symbols(requested, benchmark);
    info!(
        source = source.name(),
        benchmark,
        symbols = symbols.len(),
        parallel = opts.parallel,
        "scan started"
    );

    // Regime first: every evaluator is gated on it.
    let bench_bars = match source.fetch(benchmark) {
        Ok(Some(bars)) => bars,
        Ok(None) => {
            return Err(ScanError::BenchmarkMissing {
                symbol: benchmark.to_string(),
            })
        }
        Err(err) => {
            return Err(ScanError::BenchmarkData {
                symbol: benchmark.to_string(),
                source: err,
            })
        }
    };
    validate_bars(benchmark, &bench_bars, config.meta.min_history_bars)?;
    let bench_features = compute_features(benchmark, &bench_bars);

    let vix = volatility.latest().unwrap_or_else(|e| {
        warn!(error = %e, "volatility reading unavailable; classifying without it");
        None
    });
    let regime = classify_regime(&bench_features, vix)?;
    let bench_row = bench_features.latest().map_err(RegimeError::from)?;
    info!(regime = %regime.regime, reasons = ?regime.reasons, vix = ?vix, "regime classified");

    // Load
    let fetched = fan_out(&symbols, opts.parallel, |s| source.fetch(s));
    let mut skipped = Vec::new();
    let mut loaded: Vec<(String, Vec<Bar>)> = Vec::with_capacity(symbols.len());
    for (symbol, result) in symbols.iter().zip(fetched) {
        match result {
            Ok(Some(bars)) => loaded.push((symbol.clone(), bars)),
            Ok(None) => skipped.push(SymbolSkip::new(symbol, SkipStage::Load, "no data")),
            Err(e) => skipped.push(SymbolSkip::new(symbol, SkipStage::Load, e)),
        }
    }

    let hash = dataset_hash(
        std::iter::once((benchmark, bench_bars.as_slice()))
            .chain(loaded.iter().map(|(s, b)| (s.as_str(), b.as_slice()))),
    );
    let provenance = DataProvenance {
        vendor: source.source().vendor().to_string(),
        feed: source.source().feed().to_string(),
        bar_interval: config.meta.bar_interval.clone(),
        dataset_hash: Some(hash.clone()),
    };

    // Evaluate
    let strategies = active_strategies(config, regime.regime);
    debug!(
        strategies = ?strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "active strategies"
    );
    let ctx = EvalContext {
        config,
        maps,
        benchmark: bench_row,
        regime: regime.regime,
    };
    let outcomes = fan_out(&loaded, opts.parallel, |(symbol, bars)| {
        evaluate_symbol(symbol, bars, &ctx, &strategies)
    })
    .into_iter()
    .collect::<Result<Vec<_>, ScanError>>()?;

    // Fan-in, in input order
    let mut candidates = Vec::new();
    for outcome in outcomes {
        candidates.extend(outcome.candidates);
        skipped.extend(outcome.skips);
    }
    for skip in &skipped {
        warn!(symbol = %skip.symbol, stage = %skip.stage, reason = %skip.reason, "symbol skipped");
    }

    let run_id = run_id(started_at, &hash);
    let regime_snapshot = RegimeSnapshot {
        regime: regime.regime,
        benchmark: benchmark.to_string(),
        regime_reason: regime.reasons.clone(),
    };
    let alert_ctx = AlertContext::new(
        config,
        run_id.clone(),
        started_at,
        provenance.clone(),
        regime_snapshot.clone(),
    );

    let candidates_total = candidates.len();
    let weights = &config.scoring.weights_global;
    let scored: Vec<Alert> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, c)| {
            let total = total_score(&c.components, weights);
            build_alert(c, total, &alert_ctx, i)
        })
        .collect();
    let alerts = select_by_pool(scored, &config.scoring.gates());

    info!(
        run_id = %run_id,
        candidates = candidates_total,
        alerts = alerts.len(),
        skipped = skipped.len(),
        "scan finished"
    );

    Ok(ScanReport {
        run_id,
        started_at,
        finished_at: Utc::now(),
        regime: regime_snapshot,
        data_provenance: provenance,
        symbols_scanned: symbols.len(),
        candidates_total,
        alerts,
        skipped,
    })
}

fn run_id(started_at: DateTime<Utc>, dataset_hash: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&started_at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    hasher.update(dataset_hash.as_bytes());
    hasher.finalize().to_hex()[..RUN_ID_LEN].to_string()
}

/// Validate, featurize, filter, and evaluate one symbol.
///
/// Only a configuration problem surfacing inside an evaluator is returned as
/// an error; everything else becomes a skip.
fn evaluate_symbol(
    symbol: &str,
    bars: &[Bar],
    ctx: &EvalContext<'_>,
    strategies: &[Box<dyn Strategy>],
) -> Result<SymbolOutcome, ScanError> {
    let config = ctx.config;
    if let Err(e) = validate_bars(symbol, bars, config.meta.min_history_bars) {
        return Ok(SymbolOutcome::skipped(SymbolSkip::new(symbol, SkipStage::Validate, e)));
    }

    let features = compute_features(symbol, bars);
    let row = match features.latest() {
        Ok(row) => row,
        Err(e) => return Ok(SymbolOutcome::skipped(SymbolSkip::new(symbol, SkipStage::Features, e))),
    };

    match config.universe_filter.check(row) {
        Ok(verdict) if verdict.passed() => {}
        Ok(verdict) => {
            return Ok(SymbolOutcome::skipped(SymbolSkip::new(
                symbol,
                SkipStage::UniverseFilter,
                verdict,
            )))
        }
        Err(e) => return Ok(SymbolOutcome::skipped(SymbolSkip::new(symbol, SkipStage::Features, e))),
    }

    let mut outcome = SymbolOutcome::default();
    for strategy in strategies {
        match strategy.evaluate(symbol, &features, ctx) {
            Ok(Some(candidate)) => {
                debug!(symbol, setup = strategy.name(), "candidate produced");
                outcome.candidates.push(candidate);
            }
            Ok(None) => debug!(symbol, setup = strategy.name(), "setup not met"),
            Err(EvalError::Feature(e)) => outcome.skips.push(SymbolSkip::new(
                symbol,
                SkipStage::Evaluate,
                format!("{}: {e}", strategy.name()),
            )),
            Err(EvalError::Config(e)) => return Err(ScanError::Config(e)),
        }
    }
    Ok(outcome)
}
