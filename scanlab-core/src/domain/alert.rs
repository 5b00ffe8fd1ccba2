//! Alert candidates, trade plans, and final persisted alerts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::regime::{Regime, RegimeReason};
use crate::scoring::ComponentScores;

/// Directional intent of a setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
}

/// What the reader of an alert is expected to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Trigger already hit; actionable now.
    Buy,
    /// Watchlist entry; waits for price to come into the entry zone.
    Watch,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Watch => write!(f, "WATCH"),
        }
    }
}

/// How the position is entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "trigger_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryPlan {
    /// Enter on a confirmed close at or above `trigger_price`.
    CloseConfirm { trigger_price: f64 },
    /// Resting limit inside `entry_zone`. The two edges are not ordered.
    LimitEntry { entry_zone: [f64; 2] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidationRule {
    CloseBelowLevel,
}

/// Price level whose breach invalidates the setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invalidation {
    pub rule: InvalidationRule,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopType {
    VolatilityAtr,
}

/// Volatility stop: `reference - atr14 * atr_multiple`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopPlan {
    pub stop_type: StopType,
    pub atr_multiple: f64,
    pub stop_price: f64,
}

/// A reward-ratio profit target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub rr: f64,
    pub size_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizing {
    pub max_risk_pct_of_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub entry: EntryPlan,
    pub invalidation: Invalidation,
    pub stop: StopPlan,
    pub targets: Vec<Target>,
    pub position_sizing: PositionSizing,
}

/// Raw output of one strategy evaluation for one symbol.
///
/// Ephemeral: it either passes the selection gate as part of an [`Alert`] or
/// is dropped at the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub symbol: String,
    pub setup_name: String,
    pub pool: String,
    pub direction: Direction,
    pub action: Action,
    pub components: ComponentScores,
    pub evidence: Vec<String>,
    pub trade_plan: TradePlan,
}

/// Where the bars behind an alert came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProvenance {
    pub vendor: String,
    pub feed: String,
    pub bar_interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_hash: Option<String>,
}

/// Regime state captured at the moment the alert was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub regime: Regime,
    pub benchmark: String,
    pub regime_reason: Vec<RegimeReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupInfo {
    pub setup_name: String,
    pub pool: String,
    pub direction: Direction,
    pub action: Action,
    pub time_horizon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertScores {
    pub total: f64,
    pub components: ComponentScores,
}

/// Unique alert identifier (hex digest).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(pub String);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final, immutable alert record handed to the alert sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: AlertId,
    pub created_at_utc: DateTime<Utc>,
    pub universe: String,
    pub symbol: String,
    pub currency: String,
    pub data_provenance: DataProvenance,
    pub market_regime: RegimeSnapshot,
    pub setup: SetupInfo,
    pub scores: AlertScores,
    pub evidence: Vec<String>,
    pub trade_plan: TradePlan,
    pub compliance_notice: String,
}

impl Alert {
    pub fn total(&self) -> f64 {
        self.scores.total
    }
}
