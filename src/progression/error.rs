use thiserror::Error;

/// Failure surfaces of the progression pipeline.
///
/// Aggregation, evaluation and classification are pure; every variant here
/// originates at the store boundary or at event validation.
#[derive(Debug, Error)]
pub enum ProgressionError {
    /// The store could not be reached or the writer did not answer in time.
    #[error("progression store unavailable: {0}")]
    Unavailable(String),

    /// Another commit for the same user landed first.
    #[error("progression conflict for {user_id}: expected revision {expected}, found {found}")]
    Conflict {
        user_id: String,
        expected: i64,
        found: i64,
    },

    /// An activity event (or request) was malformed and was rejected.
    #[error("invalid activity event: {0}")]
    Validation(String),

    /// A stored column could not be decoded.
    #[error("corrupt progression row: {0}")]
    Corrupt(String),
}

impl ProgressionError {
    /// Whether re-running the whole pipeline may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Conflict { .. })
    }
}

impl From<rusqlite::Error> for ProgressionError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for ProgressionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
