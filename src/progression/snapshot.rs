use super::classifier::SkillLevel;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// Derived current-state view for one user, handed to display code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionSnapshot {
    pub user_id: String,
    /// Sum of event points; always equal to the event log's total.
    pub total_points: i64,
    /// Points credited by earned achievements.
    pub achievement_points: i64,
    pub current_streak_days: u32,
    pub labs_completed: BTreeSet<String>,
    pub tools_used: BTreeSet<String>,
    pub skill_level: SkillLevel,
    pub earned_achievement_ids: BTreeSet<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub revision: i64,
}

impl ProgressionSnapshot {
    /// Leaderboard figure: event points plus achievement awards.
    pub fn score(&self) -> i64 {
        self.total_points.saturating_add(self.achievement_points)
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.earned_achievement_ids.contains(id)
    }
}

/// Authoritative state read back from the progression tables before a
/// recomputation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredProgression {
    pub user_id: String,
    /// 0 when the user has no progression row yet.
    pub revision: i64,
    pub achievement_points: i64,
    pub earned_achievement_ids: BTreeSet<String>,
    pub timezone: Option<String>,
}

impl StoredProgression {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }
}
