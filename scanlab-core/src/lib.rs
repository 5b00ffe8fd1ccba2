//! ScanLab Core: bars, indicators, features, regime, scoring, strategy evaluators.
//!
//! This crate contains the pure part of the equity alert scanner:
//! - Domain types (bars, alert candidates, trade plans, alerts)
//! - Indicator engine and feature assembler
//! - Market regime classifier
//! - Piecewise score maps, aggregate scorer, selection gate
//! - Strategy evaluators (trend breakout, relative-strength rotation)
//! - Scan configuration and universe filter
//! - Bar sources (CSV, Parquet, in-memory)
//!
//! Nothing here logs, spawns threads, or holds global state. Orchestration
//! lives in `scanlab-runner`.

pub mod config;
pub mod data;
pub mod domain;
pub mod features;
pub mod indicators;
pub mod regime;
pub mod scoring;
pub mod strategies;
pub mod universe;

pub use config::{ConfigError, ScanConfig};
pub use features::{compute_features, FeatureRow, FeatureSet};
pub use regime::{classify_regime, Regime, RegimeResult};
pub use scoring::ScoreMaps;
pub use strategies::{EvalContext, Strategy, StrategyKind};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything the runner fans out across threads is
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::AlertCandidate>();
        require_sync::<domain::AlertCandidate>();
        require_send::<domain::Alert>();
        require_sync::<domain::Alert>();

        // Feature and config types
        require_send::<FeatureSet>();
        require_sync::<FeatureSet>();
        require_send::<ScanConfig>();
        require_sync::<ScanConfig>();
        require_send::<ScoreMaps>();
        require_sync::<ScoreMaps>();
        require_send::<RegimeResult>();
        require_sync::<RegimeResult>();

        // Trait objects
        require_send::<Box<dyn Strategy>>();
        require_sync::<Box<dyn Strategy>>();
        require_send::<Box<dyn data::BarSource>>();
        require_sync::<Box<dyn data::BarSource>>();
        require_send::<EvalContext<'static>>();
        require_sync::<EvalContext<'static>>();
    }
}
