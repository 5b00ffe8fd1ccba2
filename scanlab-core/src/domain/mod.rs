//! Domain types for the scanner

pub mod alert;
pub mod bar;

pub use alert::{
    Action, Alert, AlertCandidate, AlertId, AlertScores, DataProvenance, Direction, EntryPlan,
    Invalidation, InvalidationRule, PositionSizing, RegimeSnapshot, SetupInfo, StopPlan, StopType,
    Target, TradePlan,
};
pub use bar::{validate_bars, Bar, BarError};
