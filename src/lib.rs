#![warn(clippy::all)]

pub mod config;
pub mod progression;

pub use config::Config;
pub use progression::{
    ActivityEvent, EngineOptions, EventType, ProgressionEngine, ProgressionError,
    ProgressionSnapshot, Refresh, SnapshotSource, SqliteBackend,
};
