//! Piecewise score maps.
//!
//! A score map is an ordered list of threshold rules. Lookup walks the list in
//! declaration order and returns the score of the first rule whose test the
//! value satisfies, or 0 when none does. Tables are external configuration:
//!
//! ```toml
//! [maps]
//! volume_multiple = [
//!   { gte = 2.0, score = 90 },
//!   { gte = 1.5, score = 75 },
//!   { lt = 1.5, score = 40 },
//! ]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config::ConfigError;

pub const RS_PERCENTILE: &str = "rs_percentile";
pub const TREND_STRUCTURE_POINTS: &str = "trend_structure_points";
pub const RR: &str = "rr";
pub const AVG_DOLLAR_VOLUME_20D: &str = "avg_dollar_volume_20d";
pub const VOLUME_MULTIPLE: &str = "volume_multiple";

/// Maps every evaluator reads. Loading fails if any is absent.
pub const REQUIRED_MAPS: [&str; 5] = [
    RS_PERCENTILE,
    TREND_STRUCTURE_POINTS,
    RR,
    AVG_DOLLAR_VOLUME_20D,
    VOLUME_MULTIPLE,
];

/// Comparison a rule applies to the looked-up value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    Lte(f64),
    Lt(f64),
    Gte(f64),
    Gt(f64),
}

impl Threshold {
    pub fn matches(&self, value: f64) -> bool {
        match *self {
            Self::Lte(t) => value <= t,
            Self::Lt(t) => value < t,
            Self::Gte(t) => value >= t,
            Self::Gt(t) => value > t,
        }
    }

    fn level(&self) -> f64 {
        match *self {
            Self::Lte(t) | Self::Lt(t) | Self::Gte(t) | Self::Gt(t) => t,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lte(t) => write!(f, "<= {t}"),
            Self::Lt(t) => write!(f, "< {t}"),
            Self::Gte(t) => write!(f, ">= {t}"),
            Self::Gt(t) => write!(f, "> {t}"),
        }
    }
}

/// On-disk shape of a rule: exactly one operator key plus `score`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gte: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gt: Option<f64>,
    score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub struct ScoreRule {
    pub threshold: Threshold,
    pub score: f64,
}

impl ScoreRule {
    pub fn new(threshold: Threshold, score: f64) -> Self {
        Self { threshold, score }
    }
}

impl TryFrom<RawRule> for ScoreRule {
    type Error = String;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        let ops = [
            raw.lte.map(Threshold::Lte),
            raw.lt.map(Threshold::Lt),
            raw.gte.map(Threshold::Gte),
            raw.gt.map(Threshold::Gt),
        ];
        let mut present = ops.into_iter().flatten();
        let threshold = match (present.next(), present.next()) {
            (Some(t), None) => t,
            (None, _) => return Err("rule needs one of lte/lt/gte/gt".into()),
            (Some(_), Some(_)) => {
                return Err("rule must have exactly one of lte/lt/gte/gt".into())
            }
        };
        Ok(Self {
            threshold,
            score: raw.score,
        })
    }
}

impl From<ScoreRule> for RawRule {
    fn from(rule: ScoreRule) -> Self {
        let mut raw = RawRule {
            score: rule.score,
            ..Default::default()
        };
        match rule.threshold {
            Threshold::Lte(t) => raw.lte = Some(t),
            Threshold::Lt(t) => raw.lt = Some(t),
            Threshold::Gte(t) => raw.gte = Some(t),
            Threshold::Gt(t) => raw.gt = Some(t),
        }
        raw
    }
}

/// Score of the first rule `value` satisfies; 0 if none does.
///
/// An undefined (NaN) value fails every comparison and therefore scores 0.
pub fn piecewise_score(value: f64, rules: &[ScoreRule]) -> f64 {
    rules
        .iter()
        .find(|r| r.threshold.matches(value))
        .map_or(0.0, |r| r.score)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreMap(pub Vec<ScoreRule>);

impl ScoreMap {
    pub fn score(&self, value: f64) -> f64 {
        piecewise_score(value, &self.0)
    }

    pub fn rules(&self) -> &[ScoreRule] {
        &self.0
    }
}

/// All score maps for a run, keyed by indicator name. Loaded once, read-only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreMaps {
    pub maps: BTreeMap<String, ScoreMap>,
}

impl ScoreMaps {
    /// Load and validate score maps from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate score maps from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let maps: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            what: "score maps",
            message: e.to_string(),
        })?;
        maps.validate()?;
        Ok(maps)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in REQUIRED_MAPS {
            if !self.maps.contains_key(name) {
                return Err(ConfigError::MissingScoreMap(name.to_string()));
            }
        }
        for (name, map) in &self.maps {
            if map.0.is_empty() {
                return Err(ConfigError::Invalid {
                    key: format!("maps.{name}"),
                    message: "score map has no rules".into(),
                });
            }
            for (i, rule) in map.0.iter().enumerate() {
                if !rule.threshold.level().is_finite() || !rule.score.is_finite() {
                    return Err(ConfigError::Invalid {
                        key: format!("maps.{name}[{i}]"),
                        message: format!("non-finite rule ({} => {})", rule.threshold, rule.score),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&ScoreMap, ConfigError> {
        self.maps
            .get(name)
            .ok_or_else(|| ConfigError::MissingScoreMap(name.to_string()))
    }

    /// Look `value` up in the map called `name`.
    pub fn score(&self, name: &str, value: f64) -> Result<f64, ConfigError> {
        Ok(self.get(name)?.score(value))
    }
}
