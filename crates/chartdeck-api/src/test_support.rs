//! Shared fixtures for handler tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chartdeck_blob::ChartStore;
use chartdeck_core::{PollConfig, PollSettings};
use chartdeck_orchestrator::{Cancellation, Orchestrator, OrchestratorContext};
use chartdeck_state::{ProjectRecord, ProjectStore, Slot};
use chartdeck_trigger::{JobRequest, JobTrigger, TriggerResult};
use serde_json::json;

use crate::ApiState;

type Hook = Box<dyn Fn(&JobRequest) + Send + Sync>;
type Reply = Box<dyn Fn(&JobRequest) -> TriggerResult<()> + Send + Sync>;

/// Trigger double. The hook plays the build job's write-back.
pub struct TestTrigger {
    calls: AtomicUsize,
    reply: Reply,
    hook: Mutex<Option<Hook>>,
}

impl TestTrigger {
    pub fn on_trigger(&self, hook: impl Fn(&JobRequest) + Send + Sync + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobTrigger for TestTrigger {
    async fn trigger(&self, request: &JobRequest) -> TriggerResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(request)?;
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(request);
        }
        Ok(())
    }
}

/// API state over in-memory stores, with 4s / 2s polls everywhere.
pub fn state_with(
    reply: impl Fn(&JobRequest) -> TriggerResult<()> + Send + Sync + 'static,
) -> (ApiState, ProjectStore, Arc<TestTrigger>) {
    state_over(ChartStore::in_memory("charts"), reply)
}

/// Like [`state_with`], over a chart store the test keeps a handle to.
pub fn state_over(
    charts: ChartStore,
    reply: impl Fn(&JobRequest) -> TriggerResult<()> + Send + Sync + 'static,
) -> (ApiState, ProjectStore, Arc<TestTrigger>) {
    let store = ProjectStore::open_in_memory().unwrap();
    let trigger = Arc::new(TestTrigger {
        calls: AtomicUsize::new(0),
        reply: Box::new(reply),
        hook: Mutex::new(None),
    });
    let settings = PollSettings::new(Duration::from_secs(4), Duration::from_secs(2));
    let orchestrator = Orchestrator::new(OrchestratorContext {
        records: Arc::new(store.clone()),
        charts,
        trigger: trigger.clone(),
        polling: PollConfig {
            create: settings,
            update: settings,
            delete: settings,
            snapshot: settings,
        },
        cancel: Cancellation::never(),
    });
    (ApiState { orchestrator }, store, trigger)
}

/// A project whose build job has fully reported back.
pub fn deployed(id: &str, created_at: u64, revision: u64) -> ProjectRecord {
    let mut record = ProjectRecord::new(id, "shop-api", created_at);
    record.template_url = Slot::Set(format!("memory://charts/projects/{id}/template.yaml"));
    record.values_url = Slot::Set(format!("memory://charts/projects/{id}/values.yaml"));
    record.end_point = Slot::Set("http://shop.example".to_string());
    record.meta_data = json!({
        "helm_name": "shop-api",
        "last_deployed": "2026-01-01 10:00:00",
        "namespace": "shop",
        "status": "deployed",
        "revision": revision,
        "chart": "shop-api-0.1.0",
        "app_version": "1.0.0"
    })
    .as_object()
    .unwrap()
    .clone();
    record
}
