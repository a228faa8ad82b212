//! chartdeck-trigger — starts build jobs on the external CI system.
//!
//! A trigger is fire-and-forget from the build system's point of view: the
//! call returns as soon as the job is queued, and completion is observed
//! separately through the project record. Triggering is at-most-once per
//! call; nothing in this crate retries.

pub mod error;
pub mod jenkins;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

pub use error::{TriggerError, TriggerResult};
pub use jenkins::JenkinsTrigger;

/// The operation a build job performs on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobKind {
    Create,
    Update,
    Delete,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Create => "CREATE",
            JobKind::Update => "UPDATE",
            JobKind::Delete => "DELETE",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one build job, sent form-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobRequest {
    #[serde(rename = "type")]
    pub kind: JobKind,
    pub project_name: String,
    pub project_id: String,
}

impl JobRequest {
    pub fn new(kind: JobKind, project_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            kind,
            project_name: project_name.into(),
            project_id: project_id.into(),
        }
    }
}

/// Something that can start a build job and report whether it was accepted.
#[async_trait]
pub trait JobTrigger: Send + Sync {
    /// Fire one job. `Ok(())` means the build system accepted it.
    async fn trigger(&self, request: &JobRequest) -> TriggerResult<()>;
}
