//! End-to-end API flows.
//!
//! Builds the full router over in-memory stores. A simulated build job
//! reports back through the internal write-back routes, as the real job
//! does, a few seconds after each trigger.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chartdeck_api::build_router;
use chartdeck_blob::ChartStore;
use chartdeck_core::{CorsConfig, PollConfig, PollSettings};
use chartdeck_orchestrator::{Cancellation, Orchestrator, OrchestratorContext};
use chartdeck_state::{ProjectStore, RecordStore};
use chartdeck_trigger::{JobKind, JobRequest, JobTrigger, TriggerError, TriggerResult};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "chartdeck-test-boundary";
const JOB_DELAY: Duration = Duration::from_secs(3);

/// How the simulated build job behaves.
#[derive(Clone, Copy)]
enum JobMode {
    /// Reports back through the internal routes after `JOB_DELAY`.
    Completes,
    /// Accepts the trigger and never reports.
    Silent,
    /// Refuses the trigger.
    Rejects,
}

struct SimulatedJob {
    mode: JobMode,
    router: Arc<OnceLock<Router>>,
    revision: AtomicU64,
    calls: AtomicUsize,
}

#[async_trait]
impl JobTrigger for SimulatedJob {
    async fn trigger(&self, request: &JobRequest) -> TriggerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            JobMode::Rejects => {
                return Err(TriggerError::Rejected {
                    status: 503,
                    body: "jenkins is down".to_string(),
                });
            }
            JobMode::Silent => return Ok(()),
            JobMode::Completes => {}
        }

        let Some(router) = self.router.get().cloned() else {
            return Ok(());
        };
        let uri = format!("/internal/v1/projects/{}", request.project_id);
        let req = match request.kind {
            JobKind::Create | JobKind::Update => {
                let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
                let report = json!({
                    "end_point": format!("http://{}.apps.example", request.project_name),
                    "meta_data": {
                        "helm_name": request.project_name,
                        "last_deployed": "2026-01-01 10:00:00",
                        "namespace": request.project_name,
                        "status": "deployed",
                        "revision": revision,
                        "chart": format!("{}-0.1.0", request.project_name),
                        "app_version": "1.0.0"
                    }
                });
                Request::builder()
                    .method("PATCH")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(report.to_string()))
                    .unwrap()
            }
            JobKind::Delete => Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        };

        tokio::spawn(async move {
            tokio::time::sleep(JOB_DELAY).await;
            let resp = router.oneshot(req).await.unwrap();
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        });
        Ok(())
    }
}

struct TestApp {
    router: Router,
    store: ProjectStore,
    job: Arc<SimulatedJob>,
}

fn test_app(mode: JobMode) -> TestApp {
    let store = ProjectStore::open_in_memory().unwrap();
    let slot = Arc::new(OnceLock::new());
    let job = Arc::new(SimulatedJob {
        mode,
        router: slot.clone(),
        revision: AtomicU64::new(0),
        calls: AtomicUsize::new(0),
    });

    let job_poll = PollSettings::new(Duration::from_secs(10), Duration::from_secs(2));
    let orchestrator = Orchestrator::new(OrchestratorContext {
        records: Arc::new(store.clone()),
        charts: ChartStore::in_memory("helm-templates"),
        trigger: job.clone(),
        polling: PollConfig {
            create: job_poll,
            update: job_poll,
            delete: job_poll,
            snapshot: PollSettings::new(Duration::from_secs(4), Duration::from_secs(2)),
        },
        cancel: Cancellation::never(),
    });

    let router = build_router(orchestrator, &CorsConfig::default());
    let _ = slot.set(router.clone());
    TestApp { router, store, job }
}

/// A multipart body. Parts are `(field, filename, content)`.
fn multipart(parts: &[(&str, Option<&str>, &str)]) -> Body {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(filename) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/x-yaml\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

fn upload(method: &str, uri: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart(parts))
        .unwrap()
}

fn create_form(name: &str) -> Vec<(&str, Option<&str>, &str)> {
    vec![
        ("project_name", None, name),
        ("template", Some("template.yaml"), "kind: Deployment\n"),
        ("values", Some("values.yaml"), "replicas: 1\n"),
    ]
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test(start_paused = true)]
async fn project_lifecycle() {
    let app = test_app(JobMode::Completes);

    // Create: the job reports an endpoint after 3s, seen on the 4s poll.
    let (status, body) = send(
        &app.router,
        upload("POST", "/api/v1/projects", &create_form("shop-api")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["project_id"].as_str().unwrap().to_string();

    let record = app.store.get(&id).unwrap().unwrap();
    assert_eq!(
        record.template_url.as_deref(),
        Some(format!("memory://helm-templates/projects/{id}/template.yaml").as_str())
    );

    let (status, body) = send(&app.router, get("/api/v1/projects")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([id]));

    let (status, body) = send(&app.router, get(&format!("/api/v1/projects/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["project_name"], "shop-api");
    assert_eq!(body["data"]["end_point"], "http://shop-api.apps.example");
    assert_eq!(body["data"]["meta_data"]["revision"], 1);
    assert_eq!(body["data"]["phase"], "COMPLETE");

    // Update: waits for the revision to move past 1.
    let (status, body) = send(
        &app.router,
        upload(
            "PUT",
            &format!("/api/v1/projects/{id}"),
            &[("values", Some("values.yaml"), "replicas: 3\n")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["meta_data"]["revision"], 2);

    // Delete: waits for the job to remove the record.
    let (status, body) = send(
        &app.router,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/projects/{id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["message"], format!("project {id} deleted"));

    let (status, _) = send(&app.router, get(&format!("/api/v1/projects/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(app.job.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn create_rejects_bad_name_without_side_effects() {
    let app = test_app(JobMode::Completes);

    let (status, body) = send(
        &app.router,
        upload("POST", "/api/v1/projects", &create_form("abc")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(app.store.list_ids().unwrap().is_empty());
    assert_eq!(app.job.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn create_requires_every_field() {
    let app = test_app(JobMode::Completes);

    let (status, body) = send(
        &app.router,
        upload(
            "POST",
            "/api/v1/projects",
            &[
                ("project_name", None, "shop-api"),
                ("template", Some("template.yaml"), "kind: Deployment\n"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("values"));
}

#[tokio::test(start_paused = true)]
async fn silent_job_times_out_and_record_stays_pending() {
    let app = test_app(JobMode::Silent);

    let (status, _) = send(
        &app.router,
        upload("POST", "/api/v1/projects", &create_form("shop-api")),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    let ids = app.store.list_ids().unwrap();
    assert_eq!(ids.len(), 1);

    // Still pending: GET waits out the snapshot deadline and answers 202.
    let (status, body) = send(&app.router, get(&format!("/api/v1/projects/{}", ids[0]))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["data"]["end_point"], "NULL");
    assert_eq!(body["data"]["phase"], "PENDING");
}

#[tokio::test(start_paused = true)]
async fn rejected_trigger_is_bad_gateway() {
    let app = test_app(JobMode::Rejects);

    let (status, body) = send(
        &app.router,
        upload("POST", "/api/v1/projects", &create_form("shop-api")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("503"));
}

#[tokio::test(start_paused = true)]
async fn unknown_project_routes() {
    let app = test_app(JobMode::Completes);

    let (status, _) = send(
        &app.router,
        upload(
            "PUT",
            "/api/v1/projects/ghost",
            &[("values", Some("values.yaml"), "replicas: 3\n")],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        Request::builder()
            .method("PATCH")
            .uri("/internal/v1/projects/ghost")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"end_point":"http://x"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        Request::builder()
            .method("DELETE")
            .uri("/internal/v1/projects/ghost")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(app.job.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn welcome_route() {
    let app = test_app(JobMode::Completes);
    let (status, body) = send(&app.router, get("/api")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Welcome to the Chartdeck API");
}
