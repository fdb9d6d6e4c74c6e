use super::event::{ActivityEvent, EventType};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;

/// Scalar metrics folded out of a user's event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetrics {
    pub total_points: i64,
    pub labs_completed: BTreeSet<String>,
    pub tools_used: BTreeSet<String>,
    /// Calendar dates (in the user's timezone) with at least one event.
    pub activity_days: BTreeSet<NaiveDate>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Raw metrics plus the streak evaluated against a specific day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metrics {
    pub raw: RawMetrics,
    pub current_streak_days: u32,
}

impl Metrics {
    pub fn new(raw: RawMetrics, today: NaiveDate) -> Self {
        let current_streak_days = current_streak(&raw.activity_days, today);
        Self {
            raw,
            current_streak_days,
        }
    }

    pub fn total_points(&self) -> i64 {
        self.raw.total_points
    }

    pub fn labs_completed_count(&self) -> usize {
        self.raw.labs_completed.len()
    }
}

/// Folds events into [`RawMetrics`] using day boundaries in `tz`.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    tz: Tz,
}

impl Aggregator {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// The calendar date `now` falls on for this aggregator's timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Single pass over already-validated events.
    pub fn aggregate(&self, events: &[ActivityEvent]) -> RawMetrics {
        events.iter().fold(RawMetrics::default(), |mut m, ev| {
            m.total_points = m.total_points.saturating_add(ev.points);
            if let Some(subject) = ev.subject_id.as_ref() {
                match ev.event_type {
                    EventType::LabCompleted => {
                        m.labs_completed.insert(subject.clone());
                    }
                    EventType::ToolUsed => {
                        m.tools_used.insert(subject.clone());
                    }
                    EventType::DailyCheckin => {}
                }
            }
            m.activity_days
                .insert(ev.occurred_at.with_timezone(&self.tz).date_naive());
            if m.last_activity_at.map_or(true, |last| ev.occurred_at > last) {
                m.last_activity_at = Some(ev.occurred_at);
            }
            m
        })
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

/// Length of the run of consecutive active days ending today, or ending
/// yesterday when today has no activity yet. Zero otherwise.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    let mut day = anchor;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(list: &[NaiveDate]) -> BTreeSet<NaiveDate> {
        list.iter().copied().collect()
    }

    #[test]
    fn streak_anchored_at_yesterday() {
        let today = day(2026, 5, 10);
        let set = days(&[day(2026, 5, 8), day(2026, 5, 9)]);
        assert_eq!(current_streak(&set, today), 2);
    }

    #[test]
    fn streak_anchored_at_today() {
        let today = day(2026, 5, 10);
        let set = days(&[day(2026, 5, 9), day(2026, 5, 10)]);
        assert_eq!(current_streak(&set, today), 2);
    }

    #[test]
    fn streak_is_zero_without_recent_activity() {
        let today = day(2026, 5, 10);
        let set = days(&[
            day(2026, 5, 1),
            day(2026, 5, 2),
            day(2026, 5, 3),
            day(2026, 5, 8),
        ]);
        assert_eq!(current_streak(&set, today), 0);
        assert_eq!(current_streak(&BTreeSet::new(), today), 0);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let today = day(2026, 5, 10);
        let set = days(&[
            day(2026, 5, 5),
            day(2026, 5, 7),
            day(2026, 5, 8),
            day(2026, 5, 9),
            day(2026, 5, 10),
        ]);
        assert_eq!(current_streak(&set, today), 4);
    }

    #[test]
    fn streak_crosses_month_boundary() {
        let today = day(2026, 3, 2);
        let set = days(&[day(2026, 2, 27), day(2026, 2, 28), day(2026, 3, 1), day(2026, 3, 2)]);
        assert_eq!(current_streak(&set, today), 4);
    }

    #[test]
    fn aggregate_sums_points_and_collects_sets() {
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let events = vec![
            ActivityEvent::lab_completed("u1", "sql-injection-1", 100, t0),
            ActivityEvent::lab_completed("u1", "sql-injection-1", 100, t0 + Duration::hours(1)),
            ActivityEvent::tool_used("u1", "nmap", 10, t0 + Duration::days(1)),
            ActivityEvent::daily_checkin("u1", t0 + Duration::days(3)),
        ];
        let m = Aggregator::default().aggregate(&events);
        assert_eq!(m.total_points, 210);
        assert_eq!(m.labs_completed.len(), 1);
        assert!(m.tools_used.contains("nmap"));
        assert_eq!(m.activity_days.len(), 3);
        assert_eq!(m.last_activity_at, Some(t0 + Duration::days(3)));
    }

    #[test]
    fn aggregate_of_nothing_is_empty() {
        assert_eq!(Aggregator::default().aggregate(&[]), RawMetrics::default());
    }

    #[test]
    fn day_boundaries_follow_timezone() {
        // 23:30 UTC on May 1st is already May 2nd in Tokyo.
        let late = Utc.with_ymd_and_hms(2026, 5, 1, 23, 30, 0).unwrap();
        let events = vec![ActivityEvent::daily_checkin("u1", late)];

        let utc = Aggregator::default().aggregate(&events);
        assert!(utc.activity_days.contains(&day(2026, 5, 1)));

        let tokyo = Aggregator::new(chrono_tz::Asia::Tokyo).aggregate(&events);
        assert!(tokyo.activity_days.contains(&day(2026, 5, 2)));
    }

    #[test]
    fn metrics_new_computes_streak() {
        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        let events: Vec<_> = (0..3)
            .map(|i| ActivityEvent::daily_checkin("u1", t0 + Duration::days(i)))
            .collect();
        let agg = Aggregator::default();
        let metrics = Metrics::new(agg.aggregate(&events), agg.today(t0 + Duration::days(3)));
        assert_eq!(metrics.current_streak_days, 3);
    }
}
