use super::error::{ProgressionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of activity that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    LabCompleted,
    ToolUsed,
    DailyCheckin,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LabCompleted => "lab_completed",
            Self::ToolUsed => "tool_used",
            Self::DailyCheckin => "daily_checkin",
        }
    }

    /// Labs and tools must name what was completed or used.
    pub fn requires_subject(self) -> bool {
        !matches!(self, Self::DailyCheckin)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ProgressionError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lab_completed" => Ok(Self::LabCompleted),
            "tool_used" => Ok(Self::ToolUsed),
            "daily_checkin" => Ok(Self::DailyCheckin),
            other => Err(ProgressionError::Validation(format!(
                "unknown event type: {other}"
            ))),
        }
    }
}

/// One immutable fact of user activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub id: String,
    pub user_id: String,
    pub event_type: EventType,
    pub subject_id: Option<String>,
    pub points: i64,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Build an event with a fresh id.
    pub fn new(
        user_id: impl Into<String>,
        event_type: EventType,
        subject_id: Option<String>,
        points: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            event_type,
            subject_id,
            points,
            occurred_at,
        }
    }

    pub fn lab_completed(
        user_id: impl Into<String>,
        lab_id: impl Into<String>,
        points: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            EventType::LabCompleted,
            Some(lab_id.into()),
            points,
            occurred_at,
        )
    }

    pub fn tool_used(
        user_id: impl Into<String>,
        tool_id: impl Into<String>,
        points: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            EventType::ToolUsed,
            Some(tool_id.into()),
            points,
            occurred_at,
        )
    }

    pub fn daily_checkin(user_id: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self::new(user_id, EventType::DailyCheckin, None, 0, occurred_at)
    }

    /// Reject events that must never reach aggregation.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ProgressionError::Validation("event id is empty".into()));
        }
        if self.user_id.trim().is_empty() {
            return Err(ProgressionError::Validation("user id is empty".into()));
        }
        if self.points < 0 {
            return Err(ProgressionError::Validation(format!(
                "event {} has negative points ({})",
                self.id, self.points
            )));
        }
        if self.event_type.requires_subject()
            && self.subject_id.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            return Err(ProgressionError::Validation(format!(
                "{} event {} has no subject id",
                self.event_type, self.id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn event_type_parses_known_names() {
        for ty in [
            EventType::LabCompleted,
            EventType::ToolUsed,
            EventType::DailyCheckin,
        ] {
            assert_eq!(ty.as_str().parse::<EventType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_event_type_is_a_validation_error() {
        let err = "lab_started".parse::<EventType>().unwrap_err();
        assert!(matches!(err, ProgressionError::Validation(_)));
    }

    #[test]
    fn negative_points_are_rejected() {
        let ev = ActivityEvent::lab_completed("u1", "xss-reflected", -5, at());
        assert!(matches!(
            ev.validate(),
            Err(ProgressionError::Validation(_))
        ));
    }

    #[test]
    fn lab_without_subject_is_rejected() {
        let ev = ActivityEvent::new("u1", EventType::LabCompleted, None, 10, at());
        assert!(ev.validate().is_err());
        let ev = ActivityEvent::new("u1", EventType::ToolUsed, Some("  ".into()), 10, at());
        assert!(ev.validate().is_err());
    }

    #[test]
    fn checkin_without_subject_is_valid() {
        ActivityEvent::daily_checkin("u1", at()).validate().unwrap();
    }

    #[test]
    fn empty_user_is_rejected() {
        let ev = ActivityEvent::tool_used("", "nmap", 5, at());
        assert!(ev.validate().is_err());
    }

    #[test]
    fn fresh_events_get_distinct_ids() {
        let a = ActivityEvent::daily_checkin("u1", at());
        let b = ActivityEvent::daily_checkin("u1", at());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn event_type_serializes_snake_case() {
        let json = serde_json::to_string(&EventType::DailyCheckin).unwrap();
        assert_eq!(json, "\"daily_checkin\"");
    }
}
