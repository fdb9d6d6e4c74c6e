use super::aggregator::Metrics;
use super::catalog::{Catalog, Difficulty};
use serde::Serialize;
use std::collections::BTreeSet;

/// Declarative condition an achievement is unlocked by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Criterion {
    /// At least this many distinct labs completed.
    LabsCompleted(usize),
    /// Every catalog lab in the category completed.
    CategoryComplete(&'static str),
    /// Every catalog lab with the difficulty completed.
    DifficultyComplete(Difficulty),
    /// Every catalog tool used at least once.
    AllToolsUsed,
    /// Streak of at least this many days.
    StreakAtLeast(u32),
}

impl Criterion {
    /// Pure predicate. A criterion over an empty catalog subset never holds.
    pub fn holds(&self, metrics: &Metrics, catalog: &Catalog) -> bool {
        match self {
            Self::LabsCompleted(n) => *n > 0 && metrics.labs_completed_count() >= *n,
            Self::CategoryComplete(category) => {
                all_nonempty(catalog.labs_in_category(category), &metrics.raw.labs_completed)
            }
            Self::DifficultyComplete(difficulty) => all_nonempty(
                catalog.labs_with_difficulty(*difficulty),
                &metrics.raw.labs_completed,
            ),
            Self::AllToolsUsed => all_nonempty(catalog.tool_ids(), &metrics.raw.tools_used),
            Self::StreakAtLeast(days) => *days > 0 && metrics.current_streak_days >= *days,
        }
    }
}

fn all_nonempty<'a>(mut required: impl Iterator<Item = &'a str>, have: &BTreeSet<String>) -> bool {
    let mut any = false;
    let all = required.all(|id| {
        any = true;
        have.contains(id)
    });
    any && all
}

/// Static achievement definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AchievementRule {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub points_awarded: i64,
    pub criterion: Criterion,
}

/// An achievement id together with the points its award credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarnedAchievement {
    pub id: String,
    pub points: i64,
}

pub const FIRST_STEPS: &str = "first-steps";
pub const SQL_MASTER: &str = "sql-master";
pub const XSS_EXPERT: &str = "xss-expert";
pub const TOOL_ENTHUSIAST: &str = "tool-enthusiast";
pub const WEEK_STREAK: &str = "week-streak";
pub const ADVANCED_HACKER: &str = "advanced-hacker";

/// The fixed rule table.
pub fn standard_rules() -> Vec<AchievementRule> {
    vec![
        AchievementRule {
            id: FIRST_STEPS,
            name: "First Steps",
            description: "Complete your first vulnerability lab",
            points_awarded: 50,
            criterion: Criterion::LabsCompleted(1),
        },
        AchievementRule {
            id: SQL_MASTER,
            name: "SQL Master",
            description: "Complete all SQL Injection labs",
            points_awarded: 100,
            criterion: Criterion::CategoryComplete("sql-injection"),
        },
        AchievementRule {
            id: XSS_EXPERT,
            name: "XSS Expert",
            description: "Master Cross-Site Scripting vulnerabilities",
            points_awarded: 100,
            criterion: Criterion::CategoryComplete("xss"),
        },
        AchievementRule {
            id: TOOL_ENTHUSIAST,
            name: "Tool Enthusiast",
            description: "Use every security tool at least once",
            points_awarded: 75,
            criterion: Criterion::AllToolsUsed,
        },
        AchievementRule {
            id: WEEK_STREAK,
            name: "Week Streak",
            description: "Practice for 7 consecutive days",
            points_awarded: 150,
            criterion: Criterion::StreakAtLeast(7),
        },
        AchievementRule {
            id: ADVANCED_HACKER,
            name: "Advanced Hacker",
            description: "Complete all advanced labs",
            points_awarded: 250,
            criterion: Criterion::DifficultyComplete(Difficulty::Advanced),
        },
    ]
}

/// Evaluates the rule table against a user's metrics.
#[derive(Debug, Clone)]
pub struct AchievementEvaluator {
    rules: Vec<AchievementRule>,
    catalog: Catalog,
}

impl AchievementEvaluator {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_rules(standard_rules(), catalog)
    }

    pub fn with_rules(rules: Vec<AchievementRule>, catalog: Catalog) -> Self {
        Self { rules, catalog }
    }

    pub fn rules(&self) -> &[AchievementRule] {
        &self.rules
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rule(&self, id: &str) -> Option<&AchievementRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Ids of rules that hold now and are not yet in `previously_earned`.
    pub fn evaluate(
        &self,
        metrics: &Metrics,
        previously_earned: &BTreeSet<String>,
    ) -> BTreeSet<String> {
        self.rules
            .iter()
            .filter(|r| !previously_earned.contains(r.id))
            .filter(|r| r.criterion.holds(metrics, &self.catalog))
            .map(|r| r.id.to_string())
            .collect()
    }

    /// Attach each id's award points. Unknown ids are skipped.
    pub fn with_points(&self, ids: &BTreeSet<String>) -> Vec<EarnedAchievement> {
        ids.iter()
            .filter_map(|id| {
                self.rule(id).map(|r| EarnedAchievement {
                    id: id.clone(),
                    points: r.points_awarded,
                })
            })
            .collect()
    }
}
