use super::achievements::EarnedAchievement;
use super::error::Result;
use super::event::ActivityEvent;
use super::snapshot::{ProgressionSnapshot, StoredProgression};
use chrono::{DateTime, Utc};

/// Append-only activity log.
pub trait EventLog: Send + Sync {
    /// Every event for the user, ascending by occurrence time. Never truncated.
    fn read(&self, user_id: &str) -> Result<Vec<ActivityEvent>>;

    /// Newest first, at most `limit` events.
    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ActivityEvent>>;

    /// Ascending, optionally from `since` (inclusive).
    fn export(&self, user_id: &str, since: Option<DateTime<Utc>>) -> Result<Vec<ActivityEvent>>;

    /// Insert-only. Returns `false` when an event with the same id already
    /// exists (the append is then a no-op).
    fn append(&self, event: &ActivityEvent) -> Result<bool>;
}

/// A commit of one recomputation, guarded by the revision it was based on.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub user_id: String,
    pub expected_revision: i64,
    pub snapshot: ProgressionSnapshot,
    pub newly_earned: Vec<EarnedAchievement>,
}

/// Acknowledgement of a successful (or already applied) commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAck {
    pub revision: i64,
    pub achievement_points: i64,
    pub achievements_inserted: usize,
    pub already_applied: bool,
}

/// Authoritative store for derived progression state.
pub trait ProgressionStore: Send + Sync {
    fn load(&self, user_id: &str) -> Result<StoredProgression>;

    fn commit(&self, request: CommitRequest) -> Result<CommitAck>;

    fn set_timezone(&self, user_id: &str, timezone: &str) -> Result<()>;
}
