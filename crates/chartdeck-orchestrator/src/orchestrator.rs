//! Create / update / delete flows for chart projects.
//!
//! Each flow writes what it owns to the record and blob stores, triggers a
//! build job, then polls the record until the job's write-back satisfies
//! the flow's completion condition.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chartdeck_blob::{validate_filename, ChartStore};
use chartdeck_core::{PollConfig, ProjectName};
use chartdeck_state::{
    now_millis, Phase, ProjectId, ProjectPatch, ProjectRecord, RecordStore, Revision, Slot,
};
use chartdeck_trigger::{JobKind, JobRequest, JobTrigger};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::inflight::{InFlight, InFlightGuard};
use crate::poll::{poll_record, Cancellation, PollOutcome, PollSettings};

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub data: Bytes,
}

impl Artifact {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }
}

/// Everything the orchestrator talks to.
#[derive(Clone)]
pub struct OrchestratorContext {
    pub records: Arc<dyn RecordStore>,
    pub charts: ChartStore,
    pub trigger: Arc<dyn JobTrigger>,
    pub polling: PollConfig,
    pub cancel: Cancellation,
}

/// Result of a status read.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Release metadata is fully populated.
    Complete(ProjectRecord),
    /// The record exists but the job has not finished reporting.
    Incomplete(ProjectRecord),
}

impl Snapshot {
    pub fn record(&self) -> &ProjectRecord {
        match self {
            Snapshot::Complete(r) | Snapshot::Incomplete(r) => r,
        }
    }

    pub fn into_record(self) -> ProjectRecord {
        match self {
            Snapshot::Complete(r) | Snapshot::Incomplete(r) => r,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Snapshot::Complete(_))
    }
}

/// Drives chart projects through their build jobs.
///
/// Cheap to clone; clones share stores and the in-flight registry.
#[derive(Clone)]
pub struct Orchestrator {
    ctx: OrchestratorContext,
    inflight: InFlight,
}

impl Orchestrator {
    pub fn new(ctx: OrchestratorContext) -> Self {
        Self {
            ctx,
            inflight: InFlight::new(),
        }
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.ctx.records
    }

    pub fn in_flight(&self) -> &InFlight {
        &self.inflight
    }

    pub fn polling(&self) -> &PollConfig {
        &self.ctx.polling
    }

    /// Register a project, upload its chart, and wait for the build job to
    /// report an endpoint.
    ///
    /// If an upload fails the record and any uploaded artifact are removed
    /// before returning. On `TimedOut` the record is kept; the job may still
    /// finish.
    pub async fn create(
        &self,
        name: &str,
        template: Artifact,
        values: Artifact,
    ) -> OrchestratorResult<ProjectId> {
        let name = ProjectName::parse(name)
            .map_err(|e| OrchestratorError::Validation(e.to_string()))?;
        validate_artifact(&template)?;
        validate_artifact(&values)?;
        if template.filename == values.filename {
            return Err(OrchestratorError::Validation(
                "template and values files must have different names".to_string(),
            ));
        }

        let id: ProjectId = Uuid::new_v4().to_string();
        let _guard = self.acquire(&id)?;

        let record = ProjectRecord::new(&id, name.as_str(), now_millis());
        self.ctx.records.insert(&record)?;
        info!(project = %id, name = %name, "project registered");

        if let Err(e) = self.attach(&id, template, values).await {
            warn!(project = %id, error = %e, "artifact upload failed, rolling back");
            if let Err(cleanup) = self.discard(&id).await {
                warn!(project = %id, error = %cleanup, "rollback incomplete");
            }
            return Err(e);
        }

        self.fire(JobKind::Create, &id, name.as_str()).await?;

        let settings = self.ctx.polling.create;
        let report = poll_record(
            self.ctx.records.as_ref(),
            &id,
            settings,
            &self.ctx.cancel,
            |r| r.end_point.is_set(),
        )
        .await?;

        match report.outcome {
            PollOutcome::Satisfied(record) => {
                info!(
                    project = %id,
                    end_point = record.end_point.as_deref().unwrap_or_default(),
                    attempts = report.attempts,
                    "project deployed"
                );
                Ok(id)
            }
            PollOutcome::TimedOut { .. } => {
                warn!(project = %id, waited = ?report.elapsed, "create job did not report an endpoint");
                Err(OrchestratorError::TimedOut {
                    id,
                    waited: report.elapsed,
                })
            }
            PollOutcome::NotFound => Err(OrchestratorError::NotFound(id)),
            PollOutcome::Cancelled => Err(OrchestratorError::Cancelled),
        }
    }

    /// Replace a project's values file and wait for the upgrade job to bump
    /// the release revision.
    ///
    /// Unknown ids fail with `NotFound` before anything is uploaded or
    /// triggered.
    pub async fn update(&self, id: &str, values: Artifact) -> OrchestratorResult<ProjectRecord> {
        validate_artifact(&values)?;
        let _guard = self.acquire(id)?;

        let record = self
            .ctx
            .records
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;
        if artifact_name(&record.template_url) == Some(values.filename.as_str()) {
            return Err(OrchestratorError::Validation(format!(
                "values file may not reuse the template name {}",
                values.filename
            )));
        }
        let revision_before = record.revision();

        let values_url = self.ctx.charts.put(id, &values.filename, values.data).await?;
        let replaced = match &record.values_url {
            Slot::Set(previous) if *previous != values_url => Some(previous.as_str()),
            _ => None,
        };

        // The old object stays until the record no longer points at it.
        let patched = match self.ctx.records.update_fields(
            id,
            ProjectPatch {
                values_url: Some(Slot::Set(values_url.clone())),
                updated_at: Some(now_millis()),
                ..Default::default()
            },
        ) {
            Ok(true) => Ok(()),
            Ok(false) => Err(OrchestratorError::NotFound(id.to_string())),
            Err(e) => Err(OrchestratorError::from(e)),
        };
        if let Err(e) = patched {
            if replaced.is_some() {
                self.remove_artifact(id, &values_url).await;
            }
            return Err(e);
        }
        if let Some(previous) = replaced {
            self.remove_artifact(id, previous).await;
        }

        self.fire(JobKind::Update, id, &record.project_name).await?;

        let report = poll_record(
            self.ctx.records.as_ref(),
            id,
            self.ctx.polling.update,
            &self.ctx.cancel,
            |r| is_newer(r.revision(), revision_before),
        )
        .await?;

        match report.outcome {
            PollOutcome::Satisfied(record) => {
                info!(
                    project = %id,
                    revision = ?record.revision(),
                    attempts = report.attempts,
                    "project upgraded"
                );
                Ok(record)
            }
            PollOutcome::TimedOut { .. } => {
                warn!(project = %id, waited = ?report.elapsed, before = ?revision_before, "update job did not bump the revision");
                Err(OrchestratorError::TimedOut {
                    id: id.to_string(),
                    waited: report.elapsed,
                })
            }
            PollOutcome::NotFound => Err(OrchestratorError::NotFound(id.to_string())),
            PollOutcome::Cancelled => Err(OrchestratorError::Cancelled),
        }
    }

    /// Trigger teardown and wait for the job to remove the record.
    ///
    /// The job owns record removal. Artifacts are cleaned up here once the
    /// removal is observed.
    pub async fn delete(&self, id: &str) -> OrchestratorResult<()> {
        let _guard = self.acquire(id)?;

        let record = self
            .ctx
            .records
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;

        self.fire(JobKind::Delete, id, &record.project_name).await?;

        let report = poll_record(
            self.ctx.records.as_ref(),
            id,
            self.ctx.polling.delete,
            &self.ctx.cancel,
            |_| false,
        )
        .await?;

        match report.outcome {
            PollOutcome::NotFound => {
                if let Err(e) = self.ctx.charts.delete_project(id).await {
                    warn!(project = %id, error = %e, "failed to remove project artifacts");
                }
                info!(project = %id, attempts = report.attempts, "project deleted");
                Ok(())
            }
            PollOutcome::Cancelled => Err(OrchestratorError::Cancelled),
            PollOutcome::Satisfied(_) | PollOutcome::TimedOut { .. } => {
                warn!(project = %id, waited = ?report.elapsed, "delete job did not remove the record");
                Err(OrchestratorError::DeletionTimedOut {
                    id: id.to_string(),
                    waited: report.elapsed,
                })
            }
        }
    }

    /// Current record, waiting up to the snapshot deadline for its release
    /// metadata to fill in.
    pub async fn snapshot(&self, id: &str) -> OrchestratorResult<Snapshot> {
        let report = poll_record(
            self.ctx.records.as_ref(),
            id,
            self.ctx.polling.snapshot,
            &self.ctx.cancel,
            |r| r.metadata().is_complete(),
        )
        .await?;

        match report.outcome {
            PollOutcome::Satisfied(record) => Ok(Snapshot::Complete(record)),
            PollOutcome::TimedOut { last: Some(record) } => {
                debug!(project = %id, "release metadata still incomplete");
                Ok(Snapshot::Incomplete(record))
            }
            PollOutcome::TimedOut { last: None } | PollOutcome::NotFound => {
                Err(OrchestratorError::NotFound(id.to_string()))
            }
            PollOutcome::Cancelled => Err(OrchestratorError::Cancelled),
        }
    }

    /// Remove a project's record, then its artifacts. Backs the build job's
    /// removal route, so artifacts go away even when no `delete` is still
    /// polling. Returns whether the record existed.
    ///
    /// Safe to repeat: a retry after an artifact failure finds no record
    /// and removes whatever artifacts remain.
    pub async fn forget(&self, id: &str) -> OrchestratorResult<bool> {
        let existed = self.ctx.records.delete(id)?;
        let removed = self.ctx.charts.delete_project(id).await?;
        debug!(project = %id, existed, removed, "project forgotten");
        Ok(existed)
    }

    /// Single immediate read, no waiting.
    pub fn lookup(&self, id: &str) -> OrchestratorResult<ProjectRecord> {
        self.ctx
            .records
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    /// Project ids, newest first.
    pub fn list_projects(&self) -> OrchestratorResult<Vec<ProjectId>> {
        Ok(self.ctx.records.list_ids()?)
    }

    /// Remove records whose create never attached both artifacts and that
    /// are older than `max_age`, along with any artifacts they left behind.
    ///
    /// Projects with an operation in flight are skipped.
    pub async fn sweep_orphans(&self, max_age: Duration) -> OrchestratorResult<Vec<ProjectId>> {
        let now = now_millis();
        let max_age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        let mut swept = Vec::new();

        for record in self.ctx.records.list()? {
            if record.phase() != Phase::Failed || now.saturating_sub(record.created_at) <= max_age_ms {
                continue;
            }
            let Some(_guard) = self.inflight.try_acquire(&record.id) else {
                continue;
            };
            match self.discard(&record.id).await {
                Ok(()) => swept.push(record.id),
                Err(e) => warn!(project = %record.id, error = %e, "failed to sweep orphaned project"),
            }
        }

        if !swept.is_empty() {
            info!(count = swept.len(), "swept orphaned projects");
        }
        Ok(swept)
    }

    fn acquire(&self, id: &str) -> OrchestratorResult<InFlightGuard> {
        self.inflight
            .try_acquire(id)
            .ok_or_else(|| OrchestratorError::Busy(id.to_string()))
    }

    async fn attach(&self, id: &str, template: Artifact, values: Artifact) -> OrchestratorResult<()> {
        let template_url = self.ctx.charts.put(id, &template.filename, template.data).await?;
        let values_url = self.ctx.charts.put(id, &values.filename, values.data).await?;

        let patched = self.ctx.records.update_fields(
            id,
            ProjectPatch {
                template_url: Some(Slot::Set(template_url)),
                values_url: Some(Slot::Set(values_url)),
                ..Default::default()
            },
        )?;
        if !patched {
            return Err(OrchestratorError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn fire(&self, kind: JobKind, id: &str, name: &str) -> OrchestratorResult<()> {
        let request = JobRequest::new(kind, id, name);
        self.ctx.trigger.trigger(&request).await.map_err(|e| {
            warn!(%kind, project = %id, error = %e, "build job trigger failed");
            OrchestratorError::from(e)
        })
    }

    async fn remove_artifact(&self, id: &str, locator: &str) {
        if let Err(e) = self.ctx.charts.delete(locator).await {
            warn!(project = %id, %locator, error = %e, "failed to remove values file");
        }
    }

    /// Remove a project's artifacts and record. Both are attempted; the
    /// first error is returned.
    async fn discard(&self, id: &str) -> OrchestratorResult<()> {
        let blobs = self.ctx.charts.delete_project(id).await;
        let record = self.ctx.records.delete(id);
        blobs?;
        record?;
        Ok(())
    }
}

fn validate_artifact(artifact: &Artifact) -> OrchestratorResult<()> {
    validate_filename(&artifact.filename)
        .map_err(|e| OrchestratorError::Validation(e.to_string()))
}

/// Trailing filename of an artifact locator.
fn artifact_name(locator: &Slot) -> Option<&str> {
    locator.as_deref().and_then(|l| l.rsplit('/').next())
}

/// An update is done once a revision appears that is strictly newer than
/// the one seen before the trigger. With no prior revision, any will do.
fn is_newer(current: Option<Revision>, before: Option<Revision>) -> bool {
    match (current, before) {
        (Some(current), Some(before)) => current > before,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
