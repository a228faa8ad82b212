//! Domain types for the project record store.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::metadata::{revision_of, MetaData, Metadata, Revision};

/// Unique identifier for a project record.
pub type ProjectId = String;

/// Wire sentinel for a string field that has not been populated.
pub const UNSET: &str = "NULL";

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ── Slot ──────────────────────────────────────────────────────────

/// A string field stored as `"NULL"` until something populates it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Slot {
    #[default]
    Unset,
    Set(String),
}

impl Slot {
    pub fn is_set(&self) -> bool {
        matches!(self, Slot::Set(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Slot::Unset => None,
            Slot::Set(v) => Some(v),
        }
    }
}

impl From<String> for Slot {
    fn from(raw: String) -> Self {
        if raw == UNSET || raw.is_empty() {
            Slot::Unset
        } else {
            Slot::Set(raw)
        }
    }
}

impl From<Slot> for String {
    fn from(slot: Slot) -> Self {
        match slot {
            Slot::Unset => UNSET.to_string(),
            Slot::Set(v) => v,
        }
    }
}

// ── Phase ─────────────────────────────────────────────────────────

/// Where a project is in its lifecycle, derived from the record's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Artifacts attached, job has not reported an endpoint yet.
    Pending,
    /// Endpoint reported, release metadata still incomplete.
    Triggered,
    Complete,
    /// Pending for longer than the caller's staleness bound.
    TimedOut,
    /// Create never attached both artifacts.
    Failed,
}

// ── Project record ────────────────────────────────────────────────

/// The record for one orchestration unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub project_name: String,
    /// Locator of the chart template artifact.
    pub template_url: Slot,
    /// Locator of the values artifact.
    pub values_url: Slot,
    /// Populated by the build job once the release is reachable.
    pub end_point: Slot,
    /// Populated by the build job; see [`Metadata`].
    #[serde(default)]
    pub meta_data: MetaData,
    /// Unix milliseconds, set once at creation.
    pub created_at: u64,
    /// Unix milliseconds of the last orchestrator-initiated change.
    pub updated_at: u64,
}

impl ProjectRecord {
    /// A fresh record with every job-owned field unset.
    pub fn new(id: impl Into<ProjectId>, project_name: impl Into<String>, now: u64) -> Self {
        Self {
            id: id.into(),
            project_name: project_name.into(),
            template_url: Slot::Unset,
            values_url: Slot::Unset,
            end_point: Slot::Unset,
            meta_data: MetaData::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn metadata(&self) -> Metadata {
        Metadata::parse(&self.meta_data)
    }

    pub fn revision(&self) -> Option<Revision> {
        revision_of(&self.meta_data)
    }

    pub fn has_artifacts(&self) -> bool {
        self.template_url.is_set() && self.values_url.is_set()
    }

    /// Phase from field presence alone. Never yields `TimedOut`.
    pub fn phase(&self) -> Phase {
        if !self.has_artifacts() {
            Phase::Failed
        } else if !self.end_point.is_set() {
            Phase::Pending
        } else if self.metadata().is_complete() {
            Phase::Complete
        } else {
            Phase::Triggered
        }
    }

    /// Like [`phase`](Self::phase), but a record pending since before
    /// `now - stale_after` reports `TimedOut`.
    pub fn phase_at(&self, now: u64, stale_after: Duration) -> Phase {
        match self.phase() {
            Phase::Pending
                if now.saturating_sub(self.updated_at) > stale_after.as_millis() as u64 =>
            {
                Phase::TimedOut
            }
            phase => phase,
        }
    }
}

/// A partial update of a record. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub template_url: Option<Slot>,
    pub values_url: Option<Slot>,
    pub end_point: Option<Slot>,
    pub meta_data: Option<MetaData>,
    pub updated_at: Option<u64>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        *self == ProjectPatch::default()
    }

    pub fn apply(self, record: &mut ProjectRecord) {
        if let Some(v) = self.template_url {
            record.template_url = v;
        }
        if let Some(v) = self.values_url {
            record.values_url = v;
        }
        if let Some(v) = self.end_point {
            record.end_point = v;
        }
        if let Some(v) = self.meta_data {
            record.meta_data = v;
        }
        if let Some(v) = self.updated_at {
            record.updated_at = v;
        }
    }
}
