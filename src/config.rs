use crate::progression::catalog::Catalog;
use crate::progression::classifier::SkillThresholds;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration, read from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub progression: ProgressionConfig,
    #[serde(default)]
    pub skill: SkillThresholds,
    #[serde(default)]
    pub catalog: Catalog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StorageConfig {
    /// Directory holding `progression.db`. `~` is expanded.
    #[serde(default = "default_db_dir")]
    pub db_dir: String,

    /// Pending writes accepted before callers get `Unavailable`.
    #[serde(default = "default_queue_capacity")]
    pub writer_queue_capacity: usize,

    /// How long a caller waits on the store (busy timeout and writer reply).
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

fn default_db_dir() -> String {
    directories::ProjectDirs::from("dev", "labprogress", "labprogress")
        .map(|dirs| dirs.data_dir().display().to_string())
        .unwrap_or_else(|| "~/.labprogress".into())
}
fn default_queue_capacity() -> usize {
    64
}

fn default_io_timeout_ms() -> u64 {
    5_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_dir: default_db_dir(),
            writer_queue_capacity: default_queue_capacity(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

impl StorageConfig {
    pub fn resolved_db_dir(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.db_dir)
            .with_context(|| format!("expanding storage.db_dir: {}", self.db_dir))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }

    pub fn io_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.io_timeout_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressionConfig {
    /// IANA timezone for day boundaries of users without their own.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Pipeline re-runs after a lost revision race before giving up.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,

    /// Keep the last good state per user for degraded reads.
    #[serde(default = "default_true")]
    pub cache_snapshots: bool,
}

fn default_timezone() -> String {
    "UTC".into()
}

fn default_max_conflict_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            max_conflict_retries: default_max_conflict_retries(),
            cache_snapshots: true,
        }
    }
}

impl Config {
    /// Default location: `<platform config dir>/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "labprogress", "labprogress")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path`, or from the default location. A missing file
    /// yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("loading config: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("parsing config TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        self.skill
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [skill] section: {e}"))?;
        self.catalog
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [catalog] section: {e}"))?;
        if self.storage.writer_queue_capacity == 0 {
            anyhow::bail!("storage.writer_queue_capacity must be at least 1");
        }
        Ok(())
    }

    /// Default timezone as a parsed `Tz`.
    pub fn timezone(&self) -> Result<chrono_tz::Tz> {
        self.progression
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| {
                anyhow::anyhow!(
                    "unknown progression.timezone {}: {e}",
                    self.progression.timezone
                )
            })
    }

    /// JSON Schema of the configuration file.
    pub fn json_schema() -> Result<String> {
        let schema = schemars::schema_for!(Config);
        serde_json::to_string_pretty(&schema).context("serializing config schema")
    }
}
