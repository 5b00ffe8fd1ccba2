//! Scoring: piecewise score maps, the weighted aggregate, and the selection
//! gate applied to a run's alerts.

pub mod components;
pub mod score_map;
pub mod selection;

pub use components::{total_score, ComponentScores, ComponentWeights};
pub use score_map::{piecewise_score, ScoreMap, ScoreMaps, ScoreRule, Threshold};
pub use selection::{select, select_by_pool, PoolGate};
