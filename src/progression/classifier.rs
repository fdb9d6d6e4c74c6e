use super::aggregator::Metrics;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse skill tier shown on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl SkillLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::Beginner => Some(Self::Intermediate),
            Self::Intermediate => Some(Self::Advanced),
            Self::Advanced => None,
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lab-count and point minimums for each tier above Beginner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SkillThresholds {
    #[serde(default = "default_intermediate_labs")]
    pub intermediate_labs: usize,
    #[serde(default = "default_intermediate_points")]
    pub intermediate_points: i64,
    #[serde(default = "default_advanced_labs")]
    pub advanced_labs: usize,
    #[serde(default = "default_advanced_points")]
    pub advanced_points: i64,
}

fn default_intermediate_labs() -> usize {
    3
}

fn default_intermediate_points() -> i64 {
    300
}

fn default_advanced_labs() -> usize {
    6
}

fn default_advanced_points() -> i64 {
    800
}

impl Default for SkillThresholds {
    fn default() -> Self {
        Self {
            intermediate_labs: default_intermediate_labs(),
            intermediate_points: default_intermediate_points(),
            advanced_labs: default_advanced_labs(),
            advanced_points: default_advanced_points(),
        }
    }
}

impl SkillThresholds {
    /// Advanced minimums may not sit below Intermediate ones.
    pub fn validate(&self) -> Result<(), String> {
        if self.intermediate_points < 0 || self.advanced_points < 0 {
            return Err("skill point thresholds must be non-negative".into());
        }
        if self.advanced_labs < self.intermediate_labs
            || self.advanced_points < self.intermediate_points
        {
            return Err(format!(
                "advanced thresholds ({} labs, {} points) below intermediate ({} labs, {} points)",
                self.advanced_labs,
                self.advanced_points,
                self.intermediate_labs,
                self.intermediate_points
            ));
        }
        Ok(())
    }

    fn minimums(&self, level: SkillLevel) -> (usize, i64) {
        match level {
            SkillLevel::Beginner => (0, 0),
            SkillLevel::Intermediate => (self.intermediate_labs, self.intermediate_points),
            SkillLevel::Advanced => (self.advanced_labs, self.advanced_points),
        }
    }
}

/// How far a user is from the next tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub current: SkillLevel,
    pub next: Option<SkillLevel>,
    /// 0..=100; the lesser of lab and point progress toward `next`.
    pub percent: u8,
    pub labs_needed: usize,
    pub points_needed: i64,
}

#[derive(Debug, Clone, Default)]
pub struct SkillClassifier {
    thresholds: SkillThresholds,
}

impl SkillClassifier {
    pub fn new(thresholds: SkillThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, metrics: &Metrics) -> SkillLevel {
        self.classify_counts(metrics.labs_completed_count(), metrics.total_points())
    }

    pub fn classify_counts(&self, labs: usize, points: i64) -> SkillLevel {
        let meets = |level| {
            let (min_labs, min_points) = self.thresholds.minimums(level);
            labs >= min_labs && points >= min_points
        };
        if meets(SkillLevel::Advanced) {
            SkillLevel::Advanced
        } else if meets(SkillLevel::Intermediate) {
            SkillLevel::Intermediate
        } else {
            SkillLevel::Beginner
        }
    }

    pub fn tier_progress(&self, metrics: &Metrics) -> TierProgress {
        let labs = metrics.labs_completed_count();
        let points = metrics.total_points();
        let current = self.classify_counts(labs, points);
        let Some(next) = current.next() else {
            return TierProgress {
                current,
                next: None,
                percent: 100,
                labs_needed: 0,
                points_needed: 0,
            };
        };
        let (min_labs, min_points) = self.thresholds.minimums(next);
        let ratio = |have: f64, need: f64| {
            if need <= 0.0 {
                1.0
            } else {
                (have / need).min(1.0)
            }
        };
        let pct = ratio(labs as f64, min_labs as f64).min(ratio(points as f64, min_points as f64));
        TierProgress {
            current,
            next: Some(next),
            percent: (pct * 100.0).floor() as u8,
            labs_needed: min_labs.saturating_sub(labs),
            points_needed: (min_points - points).max(0),
        }
    }
}
