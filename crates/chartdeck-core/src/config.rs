//! chartdeck.toml configuration parser.
//!
//! Every section and field has a default, so an empty file (or no file at
//! all) yields a runnable config apart from the trigger credential.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted for the build-trigger token.
pub const TRIGGER_TOKEN_ENV: &str = "CHARTDECK_TRIGGER_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub storage: StorageConfig,
    pub trigger: TriggerConfig,
    pub poll: PollConfig,
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory holding the record database.
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            data_dir: PathBuf::from("/var/lib/chartdeck"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Browser origins allowed to call the API. `["*"]` allows any.
    pub allowed_origins: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:5173".to_string()],
            max_age_secs: 3600,
        }
    }
}

/// Where chart artifacts are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// "s3", "local", or "memory".
    pub backend: String,
    /// Bucket name; also the authority part of artifact locators.
    pub bucket: String,
    /// Root directory for the "local" backend.
    pub path: Option<PathBuf>,
    /// S3 region (S3 only).
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores.
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "s3".to_string(),
            bucket: "helm-templates".to_string(),
            path: None,
            region: None,
            endpoint: None,
        }
    }
}

/// External build system the orchestrator fires jobs at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    /// Full `buildWithParameters` URL of the job.
    pub url: String,
    pub user: String,
    /// API token. Prefer the `CHARTDECK_TRIGGER_TOKEN` environment variable.
    pub token: Option<String>,
    #[serde(with = "crate::duration")]
    pub request_timeout: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080/job/chartdeck/buildWithParameters".to_string(),
            user: "admin".to_string(),
            token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Deadline and interval for one bounded poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    #[serde(with = "crate::duration")]
    pub deadline: Duration,
    #[serde(with = "crate::duration")]
    pub interval: Duration,
}

impl PollSettings {
    pub const fn new(deadline: Duration, interval: Duration) -> Self {
        Self { deadline, interval }
    }
}

/// Poll settings per orchestration operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub create: PollSettings,
    pub update: PollSettings,
    pub delete: PollSettings,
    /// Wait applied by `GET /projects/{id}` before answering 202.
    pub snapshot: PollSettings,
}

impl Default for PollConfig {
    fn default() -> Self {
        let job = PollSettings::new(Duration::from_secs(60), Duration::from_secs(2));
        Self {
            create: job,
            update: job,
            delete: job,
            snapshot: PollSettings::new(Duration::from_secs(30), Duration::from_secs(2)),
        }
    }
}

/// Background cleanup of records whose create never attached artifacts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub enabled: bool,
    #[serde(with = "crate::duration")]
    pub interval: Duration,
    /// Only records older than this are considered orphaned.
    #[serde(with = "crate::duration")]
    pub max_age: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(300),
            max_age: Duration::from_secs(600),
        }
    }
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject settings that would make the poll loop spin or never run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let polls = [
            ("create", &self.poll.create),
            ("update", &self.poll.update),
            ("delete", &self.poll.delete),
            ("snapshot", &self.poll.snapshot),
        ];
        for (op, settings) in polls {
            if settings.interval.is_zero() {
                return Err(ConfigError::Invalid(format!("poll.{op}.interval must be > 0")));
            }
            if settings.deadline < settings.interval {
                return Err(ConfigError::Invalid(format!(
                    "poll.{op}.deadline must be at least one interval"
                )));
            }
        }
        if self.sweep.enabled && self.sweep.interval.is_zero() {
            return Err(ConfigError::Invalid("sweep.interval must be > 0".to_string()));
        }
        if self.trigger.url.trim().is_empty() {
            return Err(ConfigError::Invalid("trigger.url is required".to_string()));
        }
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.bucket is required".to_string()));
        }
        Ok(())
    }

    /// Fill `trigger.token` from the environment when it is set there.
    ///
    /// `lookup` is usually `|k| std::env::var(k).ok()`.
    pub fn resolve_trigger_token(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TRIGGER_TOKEN_ENV).filter(|t| !t.is_empty()) {
            self.trigger.token = Some(token);
        }
    }
}
