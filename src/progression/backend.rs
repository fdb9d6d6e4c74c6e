use super::error::Result;
use super::event::ActivityEvent;
use super::reader::ProgressionReader;
use super::snapshot::StoredProgression;
use super::store::ProgressionSqliteStore;
use super::traits::{CommitAck, CommitRequest, EventLog, ProgressionStore};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// SQLite-backed event log and progression store: the writer thread for
/// mutations plus a read-only connection for queries.
pub struct SqliteBackend {
    store: ProgressionSqliteStore,
    reader: ProgressionReader,
}

impl SqliteBackend {
    pub fn open(
        db_dir: &Path,
        queue_capacity: usize,
        io_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let store = ProgressionSqliteStore::open(db_dir, queue_capacity, io_timeout)?;
        let reader = ProgressionReader::open(store.db_path(), io_timeout)?;
        Ok(Self { store, reader })
    }
}

impl EventLog for SqliteBackend {
    fn read(&self, user_id: &str) -> Result<Vec<ActivityEvent>> {
        self.reader.read_events(user_id)
    }

    fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<ActivityEvent>> {
        self.reader.recent_events(user_id, limit)
    }

    fn export(&self, user_id: &str, since: Option<DateTime<Utc>>) -> Result<Vec<ActivityEvent>> {
        self.reader.export_events(user_id, since)
    }

    fn append(&self, event: &ActivityEvent) -> Result<bool> {
        self.store.append(event)
    }
}

impl ProgressionStore for SqliteBackend {
    fn load(&self, user_id: &str) -> Result<StoredProgression> {
        self.reader.load_progression(user_id)
    }

    fn commit(&self, request: CommitRequest) -> Result<CommitAck> {
        self.store.commit(request)
    }

    fn set_timezone(&self, user_id: &str, timezone: &str) -> Result<()> {
        self.store.set_timezone(user_id, timezone)
    }
}
