use crate::progression::error::{ProgressionError, Result};
use crate::progression::event::ActivityEvent;
use crate::progression::schema;
use crate::progression::traits::{CommitAck, CommitRequest};
use anyhow::Context;
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// File name of the progression database inside the configured directory.
pub const DB_FILE: &str = "progression.db";

type Reply<T> = SyncSender<Result<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TicketState {
    Queued,
    Applying,
    Abandoned,
}

/// Hand-off between a waiting caller and the writer thread for one
/// operation. Once the caller has given up (or the deadline has passed) the
/// writer must not apply the operation; once the writer has started applying
/// it the caller waits for the outcome instead of reporting `Unavailable`.
struct Ticket {
    deadline: Instant,
    state: Mutex<TicketState>,
}

impl Ticket {
    fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            deadline: Instant::now() + timeout,
            state: Mutex::new(TicketState::Queued),
        })
    }

    /// Writer side: claim the right to make the operation durable.
    fn begin(&self) -> bool {
        let mut state = self.state.lock();
        match *state {
            TicketState::Applying => true,
            TicketState::Abandoned => false,
            TicketState::Queued if Instant::now() >= self.deadline => {
                *state = TicketState::Abandoned;
                false
            }
            TicketState::Queued => {
                *state = TicketState::Applying;
                true
            }
        }
    }

    /// Caller side: give up, unless the writer is already applying.
    fn abandon(&self) -> bool {
        let mut state = self.state.lock();
        if *state == TicketState::Applying {
            return false;
        }
        *state = TicketState::Abandoned;
        true
    }
}

fn abandoned() -> ProgressionError {
    ProgressionError::Unavailable("write abandoned after its deadline passed".into())
}

/// Operations the writer thread can perform.
enum WriteOp {
    Append {
        event: Box<ActivityEvent>,
        ticket: Arc<Ticket>,
        reply: Reply<bool>,
    },
    Commit {
        request: Box<CommitRequest>,
        ticket: Arc<Ticket>,
        reply: Reply<CommitAck>,
    },
    SetTimezone {
        user_id: String,
        timezone: String,
        ticket: Arc<Ticket>,
        reply: Reply<()>,
    },
    Shutdown,
}

/// Write side of the progression database: a single dedicated writer thread
/// owns the connection, so every mutation for every user is serialized.
pub struct ProgressionSqliteStore {
    sender: Option<SyncSender<WriteOp>>,
    join_handle: Option<thread::JoinHandle<()>>,
    db_path: PathBuf,
    io_timeout: Duration,
}

impl ProgressionSqliteStore {
    /// Open (or create) the database at `db_dir/progression.db`.
    pub fn open(
        db_dir: &Path,
        queue_capacity: usize,
        io_timeout: Duration,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(db_dir)
            .with_context(|| format!("creating progression dir: {}", db_dir.display()))?;

        let db_path = db_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("opening progression db: {}", db_path.display()))?;

        conn.busy_timeout(io_timeout)
            .context("setting progression busy timeout")?;
        conn.execute_batch(schema::PRAGMAS)
            .context("progression PRAGMA setup")?;
        conn.execute_batch(schema::ACTIVITY_EVENTS_DDL)
            .context("activity_events DDL")?;
        conn.execute_batch(schema::USER_PROGRESSION_DDL)
            .context("user_progression DDL")?;
        conn.execute_batch(schema::USER_ACHIEVEMENTS_DDL)
            .context("user_achievements DDL")?;

        let (tx, rx) = mpsc::sync_channel::<WriteOp>(queue_capacity.max(1));

        let handle = thread::Builder::new()
            .name("progression-writer".into())
            .spawn(move || writer_loop(conn, rx))
            .context("spawning progression writer thread")?;

        tracing::debug!(path = %db_path.display(), "progression store opened");

        Ok(Self {
            sender: Some(tx),
            join_handle: Some(handle),
            db_path,
            io_timeout,
        })
    }

    /// Insert-only append. `Ok(false)` if the event id was already recorded.
    pub fn append(&self, event: &ActivityEvent) -> Result<bool> {
        event.validate()?;
        let event = Box::new(event.clone());
        self.submit(|reply, ticket| WriteOp::Append {
            event,
            ticket,
            reply,
        })
    }

    /// Apply one recomputation under the revision guard.
    pub fn commit(&self, request: CommitRequest) -> Result<CommitAck> {
        let request = Box::new(request);
        self.submit(|reply, ticket| WriteOp::Commit {
            request,
            ticket,
            reply,
        })
    }

    /// Record the IANA timezone used for the user's day boundaries. Bumps the
    /// revision, so a recomputation done under the old timezone conflicts.
    pub fn set_timezone(&self, user_id: &str, timezone: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(ProgressionError::Validation("user id is empty".into()));
        }
        timezone.parse::<chrono_tz::Tz>().map_err(|e| {
            ProgressionError::Validation(format!("unknown timezone {timezone}: {e}"))
        })?;
        let user_id = user_id.to_string();
        let timezone = timezone.to_string();
        self.submit(|reply, ticket| WriteOp::SetTimezone {
            user_id,
            timezone,
            ticket,
            reply,
        })
    }

    /// Path to the underlying database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Queue an operation and wait for the writer's answer. A full queue or
    /// a missing answer is surfaced as `Unavailable`, and an operation
    /// reported as `Unavailable` is never applied afterwards.
    fn submit<T>(&self, make: impl FnOnce(Reply<T>, Arc<Ticket>) -> WriteOp) -> Result<T> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            ProgressionError::Unavailable("progression writer is shut down".into())
        })?;
        let ticket = Ticket::new(self.io_timeout);
        let (reply_tx, reply_rx) = mpsc::sync_channel(1);
        match sender.try_send(make(reply_tx, Arc::clone(&ticket))) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!("progression write queue full, rejecting request");
                return Err(ProgressionError::Unavailable(
                    "progression write queue full".into(),
                ));
            }
            Err(TrySendError::Disconnected(_)) => {
                return Err(ProgressionError::Unavailable(
                    "progression writer thread exited".into(),
                ));
            }
        }
        match reply_rx.recv_timeout(self.io_timeout) {
            Ok(result) => result,
            // The writer is mid-write; its answer is bounded by the busy timeout.
            Err(RecvTimeoutError::Timeout) if !ticket.abandon() => {
                reply_rx.recv().map_err(|_| {
                    ProgressionError::Unavailable("progression writer exited mid-write".into())
                })?
            }
            Err(e) => {
                tracing::warn!(timeout = ?self.io_timeout, "progression write timed out");
                Err(ProgressionError::Unavailable(format!(
                    "no answer from progression writer within {:?}: {e}",
                    self.io_timeout
                )))
            }
        }
    }

    /// Graceful shutdown: signal the writer thread and wait for it to finish.
    pub fn shutdown(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.try_send(WriteOp::Shutdown);
            // Drop the sender so the writer thread sees a disconnect even if
            // the Shutdown message could not be delivered (channel full).
            drop(sender);
        }
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ProgressionSqliteStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Writer thread main loop: one transaction per operation, answered on the
/// operation's reply channel.
fn writer_loop(mut conn: Connection, rx: mpsc::Receiver<WriteOp>) {
    while let Ok(op) = rx.recv() {
        match op {
            WriteOp::Shutdown => break,
            WriteOp::Append {
                event,
                ticket,
                reply,
            } => {
                let result = if ticket.begin() {
                    insert_event(&conn, &event)
                } else {
                    Err(abandoned())
                };
                if let Err(ref e) = result {
                    tracing::error!(event_id = %event.id, "progression append failed: {e}");
                }
                let _ = reply.send(result);
            }
            WriteOp::Commit {
                request,
                ticket,
                reply,
            } => {
                let result = commit_progression(&mut conn, &request, &ticket);
                match &result {
                    Ok(ack) => tracing::debug!(
                        user_id = %request.user_id,
                        revision = ack.revision,
                        inserted = ack.achievements_inserted,
                        already_applied = ack.already_applied,
                        "progression committed"
                    ),
                    Err(ProgressionError::Conflict { .. }) => {}
                    Err(e) => tracing::error!(
                        user_id = %request.user_id,
                        "progression commit failed: {e}"
                    ),
                }
                let _ = reply.send(result);
            }
            WriteOp::SetTimezone {
                user_id,
                timezone,
                ticket,
                reply,
            } => {
                let result = if ticket.begin() {
                    upsert_timezone(&conn, &user_id, &timezone)
                } else {
                    Err(abandoned())
                };
                let _ = reply.send(result);
            }
        }
    }
}

fn insert_event(conn: &Connection, e: &ActivityEvent) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO activity_events (
            id, user_id, event_type, subject_id, points, ts, ts_epoch_ms
        ) VALUES (?1,?2,?3,?4,?5,?6,?7)",
        params![
            e.id,
            e.user_id,
            e.event_type.as_str(),
            e.subject_id,
            e.points,
            e.occurred_at.to_rfc3339(),
            e.occurred_at.timestamp_millis(),
        ],
    )?;
    Ok(inserted > 0)
}

fn upsert_timezone(conn: &Connection, user_id: &str, timezone: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO user_progression (user_id, timezone, revision, updated_at)
         VALUES (?1, ?2, 1, ?3)
         ON CONFLICT(user_id) DO UPDATE SET
            timezone = excluded.timezone,
            revision = user_progression.revision + 1,
            updated_at = excluded.updated_at",
        params![user_id, timezone, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn commit_progression(
    conn: &mut Connection,
    req: &CommitRequest,
    ticket: &Ticket,
) -> Result<CommitAck> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let found: i64 = tx
        .query_row(
            "SELECT revision FROM user_progression WHERE user_id = ?1",
            params![req.user_id],
            |r| r.get(0),
        )
        .optional()?
        .unwrap_or(0);

    if found != req.expected_revision {
        if found == req.expected_revision + 1 && already_applied(&tx, req)? {
            let achievement_points = achievement_points(&tx, &req.user_id)?;
            return Ok(CommitAck {
                revision: found,
                achievement_points,
                achievements_inserted: 0,
                already_applied: true,
            });
        }
        return Err(ProgressionError::Conflict {
            user_id: req.user_id.clone(),
            expected: req.expected_revision,
            found,
        });
    }

    let now = Utc::now().to_rfc3339();
    let mut inserted = 0;
    for earned in &req.newly_earned {
        inserted += tx.execute(
            "INSERT OR IGNORE INTO user_achievements
                (user_id, achievement_id, points_awarded, earned_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![req.user_id, earned.id, earned.points, now],
        )?;
    }
    let achievement_points = achievement_points(&tx, &req.user_id)?;

    let snap = &req.snapshot;
    let revision = found + 1;
    tx.execute(
        "INSERT INTO user_progression (
            user_id, total_points, achievement_points, current_streak_days,
            labs_completed, tools_used, skill_level, last_activity_at,
            revision, updated_at
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
        ON CONFLICT(user_id) DO UPDATE SET
            total_points        = MAX(user_progression.total_points, excluded.total_points),
            achievement_points  = excluded.achievement_points,
            current_streak_days = excluded.current_streak_days,
            labs_completed      = excluded.labs_completed,
            tools_used          = excluded.tools_used,
            skill_level         = excluded.skill_level,
            last_activity_at    = excluded.last_activity_at,
            revision            = excluded.revision,
            updated_at          = excluded.updated_at",
        params![
            req.user_id,
            snap.total_points,
            achievement_points,
            snap.current_streak_days,
            serde_json::to_string(&snap.labs_completed)?,
            serde_json::to_string(&snap.tools_used)?,
            snap.skill_level.as_str(),
            snap.last_activity_at.map(|t| t.to_rfc3339()),
            revision,
            now,
        ],
    )?;
    if !ticket.begin() {
        // Dropping the transaction rolls it back.
        return Err(abandoned());
    }
    tx.commit()?;

    Ok(CommitAck {
        revision,
        achievement_points,
        achievements_inserted: inserted,
        already_applied: false,
    })
}

fn achievement_points(tx: &Transaction<'_>, user_id: &str) -> Result<i64> {
    Ok(tx.query_row(
        "SELECT COALESCE(SUM(points_awarded), 0) FROM user_achievements WHERE user_id = ?1",
        params![user_id],
        |r| r.get(0),
    )?)
}

/// Whether the stored row already reflects exactly this request.
fn already_applied(tx: &Transaction<'_>, req: &CommitRequest) -> Result<bool> {
    let row: Option<(i64, u32, String, String)> = tx
        .query_row(
            "SELECT total_points, current_streak_days, labs_completed, tools_used
             FROM user_progression WHERE user_id = ?1",
            params![req.user_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    let Some((total, streak, labs, tools)) = row else {
        return Ok(false);
    };
    let snap = &req.snapshot;
    if total != snap.total_points
        || streak != snap.current_streak_days
        || labs != serde_json::to_string(&snap.labs_completed)?
        || tools != serde_json::to_string(&snap.tools_used)?
    {
        return Ok(false);
    }
    for earned in &req.newly_earned {
        let present: bool = tx.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM user_achievements WHERE user_id = ?1 AND achievement_id = ?2
            )",
            params![req.user_id, earned.id],
            |r| r.get(0),
        )?;
        if !present {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::achievements::EarnedAchievement;
    use crate::progression::classifier::SkillLevel;
    use crate::progression::snapshot::ProgressionSnapshot;
    use chrono::TimeZone;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> ProgressionSqliteStore {
        ProgressionSqliteStore::open(tmp.path(), 16, Duration::from_secs(5)).unwrap()
    }

    fn snapshot(user: &str, points: i64, labs: &[&str]) -> ProgressionSnapshot {
        ProgressionSnapshot {
            user_id: user.into(),
            total_points: points,
            achievement_points: 0,
            current_streak_days: 1,
            labs_completed: labs.iter().map(|s| s.to_string()).collect(),
            tools_used: BTreeSet::new(),
            skill_level: SkillLevel::Beginner,
            earned_achievement_ids: BTreeSet::new(),
            last_activity_at: None,
            revision: 0,
        }
    }

    fn first_steps_request(expected_revision: i64) -> CommitRequest {
        CommitRequest {
            user_id: "u1".into(),
            expected_revision,
            snapshot: snapshot("u1", 100, &["sql-injection-1"]),
            newly_earned: vec![EarnedAchievement {
                id: "first-steps".into(),
                points: 50,
            }],
        }
    }

    fn count(tmp: &TempDir, sql: &str) -> i64 {
        let conn = Connection::open(tmp.path().join(DB_FILE)).unwrap();
        conn.query_row(sql, [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn append_is_idempotent_per_event_id() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ev = ActivityEvent::lab_completed("u1", "xss-reflected", 100, at);
        assert!(store.append(&ev).unwrap());
        assert!(!store.append(&ev).unwrap());
        drop(store);
        assert_eq!(count(&tmp, "SELECT COUNT(*) FROM activity_events"), 1);
    }

    #[test]
    fn append_rejects_invalid_events() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ev = ActivityEvent::lab_completed("u1", "xss-reflected", -1, at);
        assert!(matches!(
            store.append(&ev),
            Err(ProgressionError::Validation(_))
        ));
    }

    #[test]
    fn commit_credits_achievement_points_atomically() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        let ack = store.commit(first_steps_request(0)).unwrap();
        assert_eq!(ack.revision, 1);
        assert_eq!(ack.achievement_points, 50);
        assert_eq!(ack.achievements_inserted, 1);
        assert!(!ack.already_applied);
        drop(store);
        assert_eq!(
            count(&tmp, "SELECT achievement_points FROM user_progression WHERE user_id = 'u1'"),
            50
        );
        assert_eq!(count(&tmp, "SELECT COUNT(*) FROM user_achievements"), 1);
    }

    #[test]
    fn retried_commit_is_acknowledged_without_double_award() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        store.commit(first_steps_request(0)).unwrap();
        let again = store.commit(first_steps_request(0)).unwrap();
        assert!(again.already_applied);
        assert_eq!(again.revision, 1);
        assert_eq!(again.achievement_points, 50);
        drop(store);
        assert_eq!(count(&tmp, "SELECT COUNT(*) FROM user_achievements"), 1);
        assert_eq!(
            count(&tmp, "SELECT revision FROM user_progression WHERE user_id = 'u1'"),
            1
        );
    }

    #[test]
    fn stale_revision_with_different_state_conflicts() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        store.commit(first_steps_request(0)).unwrap();

        let mut stale = first_steps_request(0);
        stale.snapshot.total_points = 40;
        match store.commit(stale) {
            Err(ProgressionError::Conflict {
                expected, found, ..
            }) => {
                assert_eq!(expected, 0);
                assert_eq!(found, 1);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn total_points_never_decrease() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        store.commit(first_steps_request(0)).unwrap();
        let mut lower = first_steps_request(1);
        lower.snapshot.total_points = 10;
        lower.newly_earned.clear();
        store.commit(lower).unwrap();
        drop(store);
        assert_eq!(
            count(&tmp, "SELECT total_points FROM user_progression WHERE user_id = 'u1'"),
            100
        );
    }

    #[test]
    fn set_timezone_validates_and_bumps_revision() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        assert!(matches!(
            store.set_timezone("u1", "Mars/Olympus"),
            Err(ProgressionError::Validation(_))
        ));
        store.set_timezone("u1", "Europe/Oslo").unwrap();
        // Computed before the timezone change.
        assert!(matches!(
            store.commit(first_steps_request(0)),
            Err(ProgressionError::Conflict {
                expected: 0,
                found: 1,
                ..
            })
        ));
        assert_eq!(store.commit(first_steps_request(1)).unwrap().revision, 2);
        store.set_timezone("u1", "Asia/Tokyo").unwrap();
        drop(store);
        let conn = Connection::open(tmp.path().join(DB_FILE)).unwrap();
        let (tz, revision): (String, i64) = conn
            .query_row(
                "SELECT timezone, revision FROM user_progression WHERE user_id = 'u1'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(tz, "Asia/Tokyo");
        assert_eq!(revision, 3);
    }

    /// Take the database write lock from a second connection and release it
    /// after `hold`.
    fn hold_write_lock(tmp: &TempDir, hold: Duration) -> thread::JoinHandle<()> {
        let conn = Connection::open(tmp.path().join(DB_FILE)).unwrap();
        conn.execute_batch("BEGIN IMMEDIATE").unwrap();
        thread::spawn(move || {
            thread::sleep(hold);
            conn.execute_batch("COMMIT").unwrap();
        })
    }

    fn checkin(user: &str) -> ActivityEvent {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ActivityEvent::daily_checkin(user, at)
    }

    #[test]
    fn timed_out_commit_is_never_applied() {
        let tmp = TempDir::new().unwrap();
        let timeout = Duration::from_millis(200);
        let store = ProgressionSqliteStore::open(tmp.path(), 16, timeout).unwrap();
        let lock = hold_write_lock(&tmp, Duration::from_millis(350));

        thread::scope(|s| {
            // Keeps the writer busy waiting on the lock.
            s.spawn(|| store.append(&checkin("u2")));
            thread::sleep(Duration::from_millis(20));
            assert!(matches!(
                store.commit(first_steps_request(0)),
                Err(ProgressionError::Unavailable(_))
            ));
        });
        lock.join().unwrap();

        // The writer reached the commit after its deadline and rolled back.
        let retried = store.commit(first_steps_request(0)).unwrap();
        assert_eq!(retried.revision, 1);
        assert_eq!(retried.achievements_inserted, 1);
        assert!(!retried.already_applied);
        drop(store);
        assert_eq!(count(&tmp, "SELECT COUNT(*) FROM user_achievements"), 1);
    }

    #[test]
    fn timed_out_append_is_never_applied() {
        let tmp = TempDir::new().unwrap();
        let timeout = Duration::from_millis(200);
        let store = ProgressionSqliteStore::open(tmp.path(), 16, timeout).unwrap();
        let lock = hold_write_lock(&tmp, Duration::from_millis(350));

        thread::scope(|s| {
            s.spawn(|| store.append(&checkin("u2")));
            thread::sleep(Duration::from_millis(20));
            assert!(matches!(
                store.append(&checkin("u1")),
                Err(ProgressionError::Unavailable(_))
            ));
        });
        lock.join().unwrap();
        drop(store);
        assert_eq!(
            count(&tmp, "SELECT COUNT(*) FROM activity_events WHERE user_id = 'u1'"),
            0
        );
    }

    #[test]
    fn full_queue_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let store = ProgressionSqliteStore::open(tmp.path(), 1, Duration::from_secs(2)).unwrap();
        let lock = hold_write_lock(&tmp, Duration::from_millis(400));

        thread::scope(|s| {
            // One op in the writer, one waiting in the single queue slot.
            s.spawn(|| store.append(&checkin("u2")));
            thread::sleep(Duration::from_millis(50));
            s.spawn(|| store.append(&checkin("u3")));
            thread::sleep(Duration::from_millis(50));
            match store.append(&checkin("u1")) {
                Err(ProgressionError::Unavailable(msg)) => assert!(msg.contains("queue full")),
                other => panic!("expected a full queue, got {other:?}"),
            }
        });
        lock.join().unwrap();
        drop(store);
        assert_eq!(
            count(&tmp, "SELECT COUNT(*) FROM activity_events WHERE user_id = 'u1'"),
            0
        );
    }

    #[test]
    fn shut_down_store_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp);
        store.shutdown();
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let err = store
            .append(&ActivityEvent::daily_checkin("u1", at))
            .unwrap_err();
        assert!(matches!(err, ProgressionError::Unavailable(_)));
    }
}
