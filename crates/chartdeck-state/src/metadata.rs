//! Release metadata written back by the build job.
//!
//! The job stores `meta_data` as a loose JSON object. It is read through
//! [`Metadata::parse`], which decides completeness against
//! [`REQUIRED_METADATA_KEYS`] in one place.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw metadata mapping as stored in the record.
pub type MetaData = serde_json::Map<String, Value>;

/// Keys the job must have written for a release to count as complete.
pub const REQUIRED_METADATA_KEYS: [&str; 7] = [
    "helm_name",
    "last_deployed",
    "namespace",
    "status",
    "revision",
    "chart",
    "app_version",
];

/// Helm release revision. Increases with every successful upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Revision(pub u64);

impl Revision {
    /// Read a revision from a JSON number or a numeric string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(Revision),
            Value::String(s) => s.trim().parse().ok().map(Revision),
            _ => None,
        }
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully populated release description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseInfo {
    pub helm_name: String,
    pub last_deployed: String,
    pub namespace: String,
    pub status: String,
    pub revision: Revision,
    pub chart: String,
    pub app_version: String,
}

/// Metadata classified by completeness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    /// Nothing written yet.
    Empty,
    /// Some keys written; `missing` lists the required ones still absent.
    Incomplete { missing: Vec<&'static str> },
    Complete(ReleaseInfo),
}

impl Metadata {
    pub fn parse(raw: &MetaData) -> Self {
        if raw.is_empty() {
            return Metadata::Empty;
        }

        let missing: Vec<&'static str> = REQUIRED_METADATA_KEYS
            .iter()
            .copied()
            .filter(|key| match (*key, raw.get(*key)) {
                (_, None) => true,
                ("revision", Some(v)) => Revision::from_value(v).is_none(),
                (_, Some(v)) => scalar_text(v).is_none(),
            })
            .collect();

        if !missing.is_empty() {
            return Metadata::Incomplete { missing };
        }

        let text = |key: &str| raw.get(key).and_then(scalar_text).unwrap_or_default();
        Metadata::Complete(ReleaseInfo {
            helm_name: text("helm_name"),
            last_deployed: text("last_deployed"),
            namespace: text("namespace"),
            status: text("status"),
            revision: raw
                .get("revision")
                .and_then(Revision::from_value)
                .unwrap_or(Revision(0)),
            chart: text("chart"),
            app_version: text("app_version"),
        })
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Metadata::Complete(_))
    }
}

/// Read the revision even when other keys are still missing.
pub fn revision_of(raw: &MetaData) -> Option<Revision> {
    raw.get("revision").and_then(Revision::from_value)
}

/// Strings pass through; numbers are rendered. Anything else is not a value.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
