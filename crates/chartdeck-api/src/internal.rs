//! Write-back routes for the build job.
//!
//! These are the record store's write path exposed over HTTP. They do not
//! notify the orchestrator; pollers observe the change on their next read.
//! Removal also drops the project's artifacts.
//! No in-flight claim is taken, since the job writes while a poll holds one.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chartdeck_state::{MetaData, ProjectPatch, RecordStore, Slot};
use serde::Deserialize;
use tracing::{info, warn};

use crate::handlers::error_response;
use crate::ApiState;

/// What a build job reports about a project.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProgressReport {
    pub end_point: Option<String>,
    pub meta_data: Option<MetaData>,
}

impl ProgressReport {
    fn into_patch(self) -> ProjectPatch {
        ProjectPatch {
            end_point: self.end_point.map(Slot::from),
            meta_data: self.meta_data,
            ..Default::default()
        }
    }
}

/// PATCH /internal/v1/projects/{id}
pub async fn report_progress(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(report): Json<ProgressReport>,
) -> Response {
    let patch = report.into_patch();
    if patch.is_empty() {
        return error_response(
            "report must carry end_point or meta_data",
            StatusCode::BAD_REQUEST,
        );
    }

    match state.orchestrator.records().update_fields(&id, patch) {
        Ok(true) => {
            info!(project = %id, "build job reported progress");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => error_response("project not found", StatusCode::NOT_FOUND),
        Err(e) => {
            warn!(project = %id, error = %e, "failed to record job report");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// DELETE /internal/v1/projects/{id}
///
/// Idempotent. Removes the record and then the project's artifacts, so
/// cleanup does not depend on a `delete` request still polling.
pub async fn remove_project(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.forget(&id).await {
        Ok(existed) => {
            info!(project = %id, existed, "build job removed project");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            warn!(project = %id, error = %e, "failed to remove project");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
