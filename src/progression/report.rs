use super::achievements::AchievementRule;
use super::classifier::TierProgress;
use super::event::ActivityEvent;
use super::snapshot::ProgressionSnapshot;
use serde::Serialize;

/// Lab-count milestones surfaced as the next goal.
pub const LAB_MILESTONES: [usize; 4] = [1, 3, 5, 8];

/// Number of events shown in the recent-activity panel.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// One row of the achievement board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementStatus {
    pub id: String,
    pub name: String,
    pub description: String,
    pub points: i64,
    pub earned: bool,
}

impl AchievementStatus {
    pub fn from_rule(rule: &AchievementRule, snapshot: &ProgressionSnapshot) -> Self {
        Self {
            id: rule.id.to_string(),
            name: rule.name.to_string(),
            description: rule.description.to_string(),
            points: rule.points_awarded,
            earned: snapshot.has_achievement(rule.id),
        }
    }
}

/// "Complete N labs, M more to go".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextGoal {
    pub target_labs: usize,
    pub remaining: usize,
}

/// Smallest milestone above `completed`, capped at the catalog size.
/// `None` once every catalog lab is done.
pub fn next_lab_goal(completed: usize, catalog_labs: usize) -> Option<NextGoal> {
    if catalog_labs == 0 || completed >= catalog_labs {
        return None;
    }
    let target = LAB_MILESTONES
        .iter()
        .copied()
        .find(|&m| m > completed)
        .unwrap_or(catalog_labs)
        .min(catalog_labs);
    Some(NextGoal {
        target_labs: target,
        remaining: target - completed,
    })
}

/// Everything the progress screen renders, as plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub snapshot: ProgressionSnapshot,
    /// Catalog labs the user has completed, out of `labs_total`.
    pub catalog_labs_completed: usize,
    pub labs_total: usize,
    pub achievements: Vec<AchievementStatus>,
    pub recent_activity: Vec<ActivityEvent>,
    pub next_goal: Option<NextGoal>,
    pub tier_progress: TierProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_goal_walks_milestones() {
        assert_eq!(
            next_lab_goal(0, 8),
            Some(NextGoal {
                target_labs: 1,
                remaining: 1
            })
        );
        assert_eq!(
            next_lab_goal(2, 8),
            Some(NextGoal {
                target_labs: 3,
                remaining: 1
            })
        );
        assert_eq!(
            next_lab_goal(3, 8),
            Some(NextGoal {
                target_labs: 5,
                remaining: 2
            })
        );
        assert_eq!(next_lab_goal(8, 8), None);
    }

    #[test]
    fn next_goal_is_capped_by_catalog() {
        assert_eq!(
            next_lab_goal(3, 4),
            Some(NextGoal {
                target_labs: 4,
                remaining: 1
            })
        );
        assert_eq!(
            next_lab_goal(9, 12),
            Some(NextGoal {
                target_labs: 12,
                remaining: 3
            })
        );
        assert_eq!(next_lab_goal(0, 0), None);
    }
}
