use super::achievements::{AchievementEvaluator, AchievementRule};
use super::aggregator::{Aggregator, Metrics, RawMetrics};
use super::backend::SqliteBackend;
use super::catalog::Catalog;
use super::classifier::{SkillClassifier, SkillLevel, SkillThresholds};
use super::error::{ProgressionError, Result};
use super::event::ActivityEvent;
use super::report::{next_lab_goal, AchievementStatus, ProgressReport, RECENT_ACTIVITY_LIMIT};
use super::snapshot::{ProgressionSnapshot, StoredProgression};
use super::traits::{CommitRequest, EventLog, ProgressionStore};
use crate::config::Config;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Knobs for [`ProgressionEngine`], usually derived from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub default_timezone: Tz,
    pub max_conflict_retries: u32,
    pub cache_snapshots: bool,
    pub thresholds: SkillThresholds,
    pub catalog: Catalog,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_timezone: Tz::UTC,
            max_conflict_retries: 3,
            cache_snapshots: true,
            thresholds: SkillThresholds::default(),
            catalog: Catalog::default(),
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            default_timezone: config.timezone()?,
            max_conflict_retries: config.progression.max_conflict_retries,
            cache_snapshots: config.progression.cache_snapshots,
            thresholds: config.skill.clone(),
            catalog: config.catalog.clone(),
        })
    }
}

/// Where a snapshot handed to the caller came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Live,
    /// The store was unavailable; this is the last state seen for the user.
    Cached,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Refresh {
    pub snapshot: ProgressionSnapshot,
    /// Achievements awarded by this run only.
    pub newly_earned: BTreeSet<String>,
}

#[derive(Debug, Clone)]
struct CachedProgress {
    raw: RawMetrics,
    stored: StoredProgression,
    tz: Tz,
}

/// The single entry point display code talks to.
///
/// Each call runs read log → aggregate → evaluate → classify → commit to
/// completion on the caller's thread. Nothing but the optional per-user
/// cache outlives a call.
pub struct ProgressionEngine {
    log: Arc<dyn EventLog>,
    store: Arc<dyn ProgressionStore>,
    evaluator: AchievementEvaluator,
    classifier: SkillClassifier,
    default_timezone: Tz,
    max_conflict_retries: u32,
    cache: Option<Mutex<HashMap<String, CachedProgress>>>,
}

impl ProgressionEngine {
    pub fn new(
        log: Arc<dyn EventLog>,
        store: Arc<dyn ProgressionStore>,
        options: EngineOptions,
    ) -> Self {
        Self {
            log,
            store,
            evaluator: AchievementEvaluator::new(options.catalog),
            classifier: SkillClassifier::new(options.thresholds),
            default_timezone: options.default_timezone,
            max_conflict_retries: options.max_conflict_retries,
            cache: options.cache_snapshots.then(|| Mutex::new(HashMap::new())),
        }
    }

    pub fn with_backend(backend: Arc<SqliteBackend>, options: EngineOptions) -> Self {
        Self::new(backend.clone(), backend, options)
    }

    pub fn rules(&self) -> &[AchievementRule] {
        self.evaluator.rules()
    }

    pub fn catalog(&self) -> &Catalog {
        self.evaluator.catalog()
    }

    /// Record one activity event and return the recomputed snapshot.
    pub fn record_event_and_refresh(
        &self,
        event: &ActivityEvent,
        now: DateTime<Utc>,
    ) -> Result<ProgressionSnapshot> {
        self.record_event(event, now).map(|r| r.snapshot)
    }

    /// Like [`record_event_and_refresh`](Self::record_event_and_refresh) but
    /// also reports which achievements this run awarded.
    pub fn record_event(&self, event: &ActivityEvent, now: DateTime<Utc>) -> Result<Refresh> {
        event.validate()?;
        if !self.log.append(event)? {
            tracing::debug!(event_id = %event.id, "event already recorded, recomputing");
        }
        self.refresh(&event.user_id, now)
    }

    /// Recompute and commit without recording anything new. A lost revision
    /// race re-runs the whole pipeline up to the configured retry count.
    pub fn refresh(&self, user_id: &str, now: DateTime<Utc>) -> Result<Refresh> {
        let mut attempt = 0;
        loop {
            match self.run_pipeline(user_id, now) {
                Ok(refresh) => return Ok(refresh),
                Err(e @ ProgressionError::Conflict { .. }) => {
                    self.invalidate(user_id);
                    if attempt >= self.max_conflict_retries {
                        tracing::warn!(user_id, attempt, "giving up after repeated conflicts");
                        return Err(e);
                    }
                    attempt += 1;
                    tracing::debug!(user_id, attempt, "progression conflict, re-running pipeline");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn run_pipeline(&self, user_id: &str, now: DateTime<Utc>) -> Result<Refresh> {
        let (stored, tz, metrics) = self.compute(user_id, now)?;

        let newly_earned = self
            .evaluator
            .evaluate(&metrics, &stored.earned_achievement_ids);
        let skill_level = self.classifier.classify(&metrics);
        let mut snapshot = build_snapshot(user_id, &metrics, skill_level, &stored, &newly_earned);

        let ack = self.store.commit(CommitRequest {
            user_id: user_id.to_string(),
            expected_revision: stored.revision,
            snapshot: snapshot.clone(),
            newly_earned: self.evaluator.with_points(&newly_earned),
        })?;
        snapshot.revision = ack.revision;
        snapshot.achievement_points = ack.achievement_points;

        // An identical commit already landed; its awards are not ours to report.
        let newly_earned = if ack.already_applied {
            BTreeSet::new()
        } else {
            newly_earned
        };

        if !newly_earned.is_empty() {
            tracing::info!(
                user_id,
                achievements = ?newly_earned,
                "achievements unlocked"
            );
        }

        let mut fresh = stored;
        fresh.revision = ack.revision;
        fresh.achievement_points = ack.achievement_points;
        fresh.earned_achievement_ids = snapshot.earned_achievement_ids.clone();
        self.remember(user_id, metrics.raw, fresh, tz);

        Ok(Refresh {
            snapshot,
            newly_earned,
        })
    }

    /// Read-only view of the user's progression. Never writes.
    pub fn get_snapshot(&self, user_id: &str, now: DateTime<Utc>) -> Result<ProgressionSnapshot> {
        let (stored, tz, metrics) = self.compute(user_id, now)?;
        let skill_level = self.classifier.classify(&metrics);
        let snapshot = build_snapshot(user_id, &metrics, skill_level, &stored, &BTreeSet::new());
        self.remember(user_id, metrics.raw, stored, tz);
        Ok(snapshot)
    }

    /// As [`get_snapshot`](Self::get_snapshot), but when the store is
    /// unavailable falls back to the last cached state, marked as such.
    pub fn get_snapshot_with_fallback(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(ProgressionSnapshot, SnapshotSource)> {
        match self.get_snapshot(user_id, now) {
            Ok(snapshot) => Ok((snapshot, SnapshotSource::Live)),
            Err(e @ ProgressionError::Unavailable(_)) => {
                let Some(cached) = self.cached(user_id) else {
                    return Err(e);
                };
                tracing::warn!(user_id, "store unavailable, serving cached progression: {e}");
                let today = Aggregator::new(cached.tz).today(now);
                let metrics = Metrics::new(cached.raw, today);
                let skill_level = self.classifier.classify(&metrics);
                let snapshot = build_snapshot(
                    user_id,
                    &metrics,
                    skill_level,
                    &cached.stored,
                    &BTreeSet::new(),
                );
                Ok((snapshot, SnapshotSource::Cached))
            }
            Err(e) => Err(e),
        }
    }

    /// Snapshot plus everything the progress screen shows.
    pub fn progress_report(&self, user_id: &str, now: DateTime<Utc>) -> Result<ProgressReport> {
        let (stored, tz, metrics) = self.compute(user_id, now)?;
        let skill_level = self.classifier.classify(&metrics);
        let snapshot = build_snapshot(user_id, &metrics, skill_level, &stored, &BTreeSet::new());
        let recent_activity = self.log.recent(user_id, RECENT_ACTIVITY_LIMIT)?;

        let catalog = self.evaluator.catalog();
        let catalog_labs_completed = catalog.completed_lab_count(&snapshot.labs_completed);
        let labs_total = catalog.lab_count();
        let achievements = self
            .evaluator
            .rules()
            .iter()
            .map(|rule| AchievementStatus::from_rule(rule, &snapshot))
            .collect();
        let tier_progress = self.classifier.tier_progress(&metrics);
        self.remember(user_id, metrics.raw, stored, tz);

        Ok(ProgressReport {
            next_goal: next_lab_goal(catalog_labs_completed, labs_total),
            snapshot,
            catalog_labs_completed,
            labs_total,
            achievements,
            recent_activity,
            tier_progress,
        })
    }

    /// Events for export, ascending, optionally from `since`.
    pub fn export(
        &self,
        user_id: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityEvent>> {
        self.log.export(user_id, since)
    }

    /// Change the timezone used for the user's day boundaries. The change
    /// bumps the stored revision, so an in-flight pipeline computed under the
    /// old timezone conflicts and re-runs.
    pub fn set_timezone(&self, user_id: &str, timezone: &str) -> Result<()> {
        self.store.set_timezone(user_id, timezone)?;
        self.invalidate(user_id);
        if self.cache.is_some() {
            match self.compute(user_id, Utc::now()) {
                Ok((stored, tz, metrics)) => self.remember(user_id, metrics.raw, stored, tz),
                Err(e) => {
                    tracing::debug!(user_id, "progression not reloaded after timezone change: {e}")
                }
            }
        }
        Ok(())
    }

    /// Load stored state first, then the log, so the revision we commit
    /// against is never newer than the events we folded.
    fn compute(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(StoredProgression, Tz, Metrics)> {
        if user_id.trim().is_empty() {
            return Err(ProgressionError::Validation("user id is empty".into()));
        }
        let stored = self.store.load(user_id)?;
        let tz = self.timezone_for(&stored)?;
        let events = self.log.read(user_id)?;
        let aggregator = Aggregator::new(tz);
        let metrics = Metrics::new(aggregator.aggregate(&events), aggregator.today(now));
        Ok((stored, tz, metrics))
    }

    fn timezone_for(&self, stored: &StoredProgression) -> Result<Tz> {
        match stored.timezone.as_deref() {
            None => Ok(self.default_timezone),
            Some(name) => name.parse::<Tz>().map_err(|e| {
                ProgressionError::Corrupt(format!(
                    "user {} has unknown timezone {name}: {e}",
                    stored.user_id
                ))
            }),
        }
    }

    /// Cache the state a pipeline saw, unless a newer revision is cached.
    fn remember(&self, user_id: &str, raw: RawMetrics, stored: StoredProgression, tz: Tz) {
        let Some(cache) = &self.cache else {
            return;
        };
        let mut cache = cache.lock();
        if let Some(existing) = cache.get(user_id) {
            if existing.stored.revision > stored.revision {
                return;
            }
        }
        cache.insert(user_id.to_string(), CachedProgress { raw, stored, tz });
    }

    fn cached(&self, user_id: &str) -> Option<CachedProgress> {
        self.cache.as_ref()?.lock().get(user_id).cloned()
    }

    fn invalidate(&self, user_id: &str) {
        if let Some(cache) = &self.cache {
            cache.lock().remove(user_id);
        }
    }
}

fn build_snapshot(
    user_id: &str,
    metrics: &Metrics,
    skill_level: SkillLevel,
    stored: &StoredProgression,
    newly_earned: &BTreeSet<String>,
) -> ProgressionSnapshot {
    ProgressionSnapshot {
        user_id: user_id.to_string(),
        total_points: metrics.raw.total_points,
        achievement_points: stored.achievement_points,
        current_streak_days: metrics.current_streak_days,
        labs_completed: metrics.raw.labs_completed.clone(),
        tools_used: metrics.raw.tools_used.clone(),
        skill_level,
        earned_achievement_ids: stored
            .earned_achievement_ids
            .union(newly_earned)
            .cloned()
            .collect(),
        last_activity_at: metrics.raw.last_activity_at,
        revision: stored.revision,
    }
}
