use crate::progression::error::{ProgressionError, Result};
use crate::progression::event::ActivityEvent;
use crate::progression::snapshot::StoredProgression;
use anyhow::Context;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

/// A read-only view of the progression database.
///
/// Opens a separate read-only SQLite connection so that reads don't
/// interfere with the writer thread (WAL mode allows this).
pub struct ProgressionReader {
    conn: Mutex<Connection>,
}

/// Activity event exactly as stored, before validation.
#[derive(Debug, Clone)]
struct EventRow {
    id: String,
    user_id: String,
    event_type: String,
    subject_id: Option<String>,
    points: i64,
    ts_epoch_ms: i64,
}

impl TryFrom<EventRow> for ActivityEvent {
    type Error = ProgressionError;

    fn try_from(row: EventRow) -> Result<Self> {
        let occurred_at =
            DateTime::<Utc>::from_timestamp_millis(row.ts_epoch_ms).ok_or_else(|| {
                ProgressionError::Validation(format!(
                    "event {} has out-of-range timestamp {}",
                    row.id, row.ts_epoch_ms
                ))
            })?;
        let event = ActivityEvent {
            event_type: row.event_type.parse()?,
            id: row.id,
            user_id: row.user_id,
            subject_id: row.subject_id,
            points: row.points,
            occurred_at,
        };
        event.validate()?;
        Ok(event)
    }
}

const EVENT_COLUMNS: &str = "id, user_id, event_type, subject_id, points, ts_epoch_ms";

impl ProgressionReader {
    /// Open a read-only connection to the progression database.
    pub fn open(db_path: &Path, io_timeout: Duration) -> anyhow::Result<Self> {
        let conn = Connection::open_with_flags(
            db_path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("opening progression db read-only: {}", db_path.display()))?;
        conn.busy_timeout(io_timeout)
            .context("setting progression reader busy timeout")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Every event for the user, oldest first.
    pub fn read_events(&self, user_id: &str) -> Result<Vec<ActivityEvent>> {
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM activity_events
                 WHERE user_id = ?1
                 ORDER BY ts_epoch_ms ASC, id ASC"
            ),
            params![user_id],
        )
    }

    /// Newest events first, at most `limit`.
    pub fn recent_events(&self, user_id: &str, limit: usize) -> Result<Vec<ActivityEvent>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM activity_events
                 WHERE user_id = ?1
                 ORDER BY ts_epoch_ms DESC, id DESC
                 LIMIT ?2"
            ),
            params![user_id, limit],
        )
    }

    /// Export events, optionally filtered by timestamp.
    pub fn export_events(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityEvent>> {
        let since = since.map_or(i64::MIN, |t| t.timestamp_millis());
        self.query_events(
            &format!(
                "SELECT {EVENT_COLUMNS} FROM activity_events
                 WHERE user_id = ?1 AND ts_epoch_ms >= ?2
                 ORDER BY ts_epoch_ms ASC, id ASC"
            ),
            params![user_id, since],
        )
    }

    fn query_events(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<ActivityEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok(EventRow {
                id: row.get(0)?,
                user_id: row.get(1)?,
                event_type: row.get(2)?,
                subject_id: row.get(3)?,
                points: row.get(4)?,
                ts_epoch_ms: row.get(5)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(ActivityEvent::try_from(row?)?);
        }
        Ok(results)
    }

    /// Revision, credited points, earned ids and timezone, read in one
    /// transaction so they describe the same committed state.
    pub fn load_progression(&self, user_id: &str) -> Result<StoredProgression> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;

        let row: Option<(i64, i64, Option<String>)> = tx
            .query_row(
                "SELECT revision, achievement_points, timezone
                 FROM user_progression WHERE user_id = ?1",
                params![user_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?;

        let mut stored = StoredProgression::empty(user_id);
        if let Some((revision, achievement_points, timezone)) = row {
            stored.revision = revision;
            stored.achievement_points = achievement_points;
            stored.timezone = timezone;
        }

        let mut stmt = tx.prepare(
            "SELECT achievement_id FROM user_achievements WHERE user_id = ?1",
        )?;
        let ids = stmt.query_map(params![user_id], |r| r.get::<_, String>(0))?;
        for id in ids {
            stored.earned_achievement_ids.insert(id?);
        }
        drop(stmt);
        tx.finish()?;
        Ok(stored)
    }
}
