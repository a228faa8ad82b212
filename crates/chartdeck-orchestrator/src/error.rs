//! Error types for orchestration flows.

use std::time::Duration;

use chartdeck_blob::BlobError;
use chartdeck_state::{ProjectId, StateError};
use chartdeck_trigger::TriggerError;
use thiserror::Error;

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

/// Every way an orchestration call can end other than success.
///
/// `TimedOut` and `DeletionTimedOut` are not failures of the job: it may
/// still finish, and the record can be re-queried by id.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("record store error: {0}")]
    Store(#[from] StateError),

    #[error("artifact store error: {0}")]
    Blob(#[from] BlobError),

    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error("project {0} not found")]
    NotFound(ProjectId),

    #[error("project {0} already has an operation in progress")]
    Busy(ProjectId),

    #[error("build job for project {id} did not finish within {waited:?}")]
    TimedOut { id: ProjectId, waited: Duration },

    #[error("timed out after {waited:?} waiting for project {id} to be deleted")]
    DeletionTimedOut { id: ProjectId, waited: Duration },

    #[error("operation cancelled")]
    Cancelled,
}
