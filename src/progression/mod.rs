pub mod achievements;
pub mod aggregator;
pub mod backend;
pub mod catalog;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod event;
pub mod reader;
pub mod report;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod traits;

pub use backend::SqliteBackend;
pub use engine::{EngineOptions, ProgressionEngine, Refresh, SnapshotSource};
pub use error::{ProgressionError, Result};
pub use event::{ActivityEvent, EventType};
pub use snapshot::ProgressionSnapshot;
