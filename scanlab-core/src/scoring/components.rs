//! Component sub-scores and the weighted aggregate.

use serde::{Deserialize, Serialize};

/// Per-component sub-scores of one candidate.
///
/// Missing keys deserialize as 0. `event_risk_penalty` is pre-scaled and is
/// added to the total unweighted; it is 0 or negative.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentScores {
    pub regime_fit: f64,
    pub trend_momo: f64,
    pub mean_reversion: f64,
    pub volume_flow: f64,
    pub risk_reward: f64,
    pub liquidity: f64,
    pub event_risk_penalty: f64,
}

/// Global weight per weighted component. Missing keys weigh 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub regime_fit: f64,
    pub trend_momo: f64,
    pub mean_reversion: f64,
    pub volume_flow: f64,
    pub risk_reward: f64,
    pub liquidity: f64,
}

impl ComponentWeights {
    /// `(name, weight)` pairs, in aggregation order.
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("regime_fit", self.regime_fit),
            ("trend_momo", self.trend_momo),
            ("mean_reversion", self.mean_reversion),
            ("volume_flow", self.volume_flow),
            ("risk_reward", self.risk_reward),
            ("liquidity", self.liquidity),
        ]
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Σ component × weight over the six weighted components, plus the
/// unweighted event-risk penalty, rounded to 2 decimals.
pub fn total_score(c: &ComponentScores, w: &ComponentWeights) -> f64 {
    let weighted = c.regime_fit * w.regime_fit
        + c.trend_momo * w.trend_momo
        + c.mean_reversion * w.mean_reversion
        + c.volume_flow * w.volume_flow
        + c.risk_reward * w.risk_reward
        + c.liquidity * w.liquidity;
    round2(weighted + c.event_risk_penalty)
}
