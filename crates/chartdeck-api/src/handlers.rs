//! Public REST handlers.
//!
//! Every handler answers with the `{success, data, error}` envelope. Slow
//! orchestration calls hold the request open until the build job reports
//! back or the configured deadline passes.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chartdeck_orchestrator::{Artifact, OrchestratorError, Snapshot};
use chartdeck_state::{now_millis, MetaData, Phase, ProjectId, ProjectRecord, Slot};
use serde::Serialize;
use tracing::{debug, warn};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(Serialize)]
pub(crate) struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

/// HTTP status for an orchestration failure.
pub fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::Validation(_) => StatusCode::BAD_REQUEST,
        OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
        OrchestratorError::Busy(_) => StatusCode::CONFLICT,
        OrchestratorError::TimedOut { .. } => StatusCode::REQUEST_TIMEOUT,
        OrchestratorError::DeletionTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        OrchestratorError::Trigger(_) => StatusCode::BAD_GATEWAY,
        OrchestratorError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        OrchestratorError::Store(_) | OrchestratorError::Blob(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn orchestration_error(err: OrchestratorError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!(%status, error = %err, "request failed");
    } else {
        debug!(%status, error = %err, "request rejected");
    }
    error_response(&err.to_string(), status)
}

/// Project as presented to API clients.
#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub project_id: ProjectId,
    pub project_name: String,
    pub end_point: Slot,
    /// Unix milliseconds of the last create or update.
    pub day: u64,
    pub meta_data: MetaData,
    pub phase: Phase,
}

impl ProjectView {
    fn from_record(record: ProjectRecord, state: &ApiState) -> Self {
        let stale_after = state.orchestrator.polling().create.deadline;
        let phase = record.phase_at(now_millis(), stale_after);
        Self {
            project_id: record.id,
            project_name: record.project_name,
            end_point: record.end_point,
            day: record.updated_at,
            meta_data: record.meta_data,
            phase,
        }
    }
}

#[derive(Debug, Serialize)]
struct Created {
    project_id: ProjectId,
}

#[derive(Debug, Serialize)]
struct Message {
    message: String,
}

/// Fields of a project upload form.
#[derive(Debug, Default)]
struct UploadForm {
    project_name: Option<String>,
    template: Option<Artifact>,
    values: Option<Artifact>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, String> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match name.as_str() {
                "project_name" => {
                    form.project_name = Some(field.text().await.map_err(|e| e.to_string())?);
                }
                "template" | "values" => {
                    let filename = field
                        .file_name()
                        .map(str::to_string)
                        .ok_or_else(|| format!("'{name}' must be a file upload"))?;
                    let data = field.bytes().await.map_err(|e| e.to_string())?;
                    let artifact = Some(Artifact::new(filename, data));
                    if name == "template" {
                        form.template = artifact;
                    } else {
                        form.values = artifact;
                    }
                }
                other => debug!(field = %other, "ignoring unknown form field"),
            }
        }
        Ok(form)
    }
}

fn missing(field: &str) -> Response {
    error_response(&format!("missing form field '{field}'"), StatusCode::BAD_REQUEST)
}

// ── Routes ─────────────────────────────────────────────────────

/// GET /api
pub async fn welcome() -> Response {
    ApiResponse::ok(Message {
        message: "Welcome to the Chartdeck API".to_string(),
    })
    .into_response()
}

/// GET /api/v1/projects
pub async fn list_projects(State(state): State<ApiState>) -> Response {
    match state.orchestrator.list_projects() {
        Ok(ids) => ApiResponse::ok(ids).into_response(),
        Err(e) => orchestration_error(e),
    }
}

/// POST /api/v1/projects
pub async fn create_project(State(state): State<ApiState>, multipart: Multipart) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(&e, StatusCode::BAD_REQUEST),
    };
    let Some(name) = form.project_name else {
        return missing("project_name");
    };
    let Some(template) = form.template else {
        return missing("template");
    };
    let Some(values) = form.values else {
        return missing("values");
    };

    match state.orchestrator.create(&name, template, values).await {
        Ok(project_id) => {
            (StatusCode::CREATED, ApiResponse::ok(Created { project_id })).into_response()
        }
        Err(e) => orchestration_error(e),
    }
}

/// GET /api/v1/projects/{id}
///
/// 200 once release metadata is complete, 202 with the current record if
/// it is still incomplete when the wait ends.
pub async fn get_project(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.snapshot(&id).await {
        Ok(Snapshot::Complete(record)) => {
            ApiResponse::ok(ProjectView::from_record(record, &state)).into_response()
        }
        Ok(Snapshot::Incomplete(record)) => (
            StatusCode::ACCEPTED,
            ApiResponse::ok(ProjectView::from_record(record, &state)),
        )
            .into_response(),
        Err(e) => orchestration_error(e),
    }
}

/// PUT /api/v1/projects/{id}
pub async fn update_project(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let form = match UploadForm::read(multipart).await {
        Ok(form) => form,
        Err(e) => return error_response(&e, StatusCode::BAD_REQUEST),
    };
    let Some(values) = form.values else {
        return missing("values");
    };

    match state.orchestrator.update(&id, values).await {
        Ok(record) => ApiResponse::ok(ProjectView::from_record(record, &state)).into_response(),
        Err(e) => orchestration_error(e),
    }
}

/// DELETE /api/v1/projects/{id}
pub async fn delete_project(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    match state.orchestrator.delete(&id).await {
        Ok(()) => ApiResponse::ok(Message {
            message: format!("project {id} deleted"),
        })
        .into_response(),
        Err(e) => orchestration_error(e),
    }
}
