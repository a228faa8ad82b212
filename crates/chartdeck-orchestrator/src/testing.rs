//! Test doubles for the record store and the build trigger.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chartdeck_state::{
    MetaData, ProjectId, ProjectPatch, ProjectRecord, ProjectStore, RecordStore, Slot, StateError,
    StateResult,
};
use chartdeck_trigger::{JobRequest, JobTrigger, TriggerError, TriggerResult};
use serde_json::json;

type ReadHook = Box<dyn Fn(u32, &ProjectStore) + Send>;

/// In-memory store that counts `get` calls and can run a hook before each
/// one, standing in for a build job writing to the record between polls.
pub struct CountingStore {
    inner: ProjectStore,
    reads: AtomicU32,
    hook: Mutex<Option<ReadHook>>,
    patches_fail: AtomicBool,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: ProjectStore::open_in_memory().unwrap(),
            reads: AtomicU32::new(0),
            hook: Mutex::new(None),
            patches_fail: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, record: &ProjectRecord) {
        self.inner.insert(record).unwrap();
    }

    /// Run `hook(read_number, store)` before every read. Read numbers start at 1.
    pub fn on_read(&self, hook: impl Fn(u32, &ProjectStore) + Send + 'static) {
        *self.hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Make every later `update_fields` fail with a write error.
    pub fn fail_patches(&self) {
        self.patches_fail.store(true, Ordering::SeqCst);
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Handle to the underlying store, bypassing the read counter.
    pub fn inner(&self) -> ProjectStore {
        self.inner.clone()
    }
}

impl RecordStore for CountingStore {
    fn insert(&self, record: &ProjectRecord) -> StateResult<()> {
        self.inner.insert(record)
    }

    fn get(&self, id: &str) -> StateResult<Option<ProjectRecord>> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(hook) = self.hook.lock().unwrap().as_ref() {
            hook(n, &self.inner);
        }
        self.inner.get(id)
    }

    fn update_fields(&self, id: &str, patch: ProjectPatch) -> StateResult<bool> {
        if self.patches_fail.load(Ordering::SeqCst) {
            return Err(StateError::Write("disk full".to_string()));
        }
        self.inner.update_fields(id, patch)
    }

    fn delete(&self, id: &str) -> StateResult<bool> {
        self.inner.delete(id)
    }

    fn list(&self) -> StateResult<Vec<ProjectRecord>> {
        self.inner.list()
    }
}

type Reply = Box<dyn Fn(&JobRequest) -> TriggerResult<()> + Send + Sync>;

/// Trigger that records every request and answers through a closure.
pub struct ScriptedTrigger {
    requests: Mutex<Vec<JobRequest>>,
    reply: Reply,
}

impl ScriptedTrigger {
    pub fn new(reply: impl Fn(&JobRequest) -> TriggerResult<()> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        })
    }

    /// Accepts every job and does nothing else.
    pub fn accepting() -> Arc<Self> {
        Self::new(|_| Ok(()))
    }

    pub fn rejecting(status: u16) -> Arc<Self> {
        Self::new(move |_| {
            Err(TriggerError::Rejected {
                status,
                body: "job disabled".to_string(),
            })
        })
    }

    pub fn requests(&self) -> Vec<JobRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobTrigger for ScriptedTrigger {
    async fn trigger(&self, request: &JobRequest) -> TriggerResult<()> {
        self.requests.lock().unwrap().push(request.clone());
        (self.reply)(request)
    }
}

/// Metadata with every required key, at `revision`.
pub fn release(revision: u64) -> MetaData {
    json!({
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
    .clone()
}

/// A record with both artifacts attached, as a successful create leaves it
/// before the job reports back.
pub fn attached_record(id: &str, created_at: u64) -> ProjectRecord {
    let mut record = ProjectRecord::new(id, "shop-api", created_at);
    record.template_url = Slot::Set(format!("memory://charts/projects/{id}/template.yaml"));
    record.values_url = Slot::Set(format!("memory://charts/projects/{id}/values.yaml"));
    record
}

/// Patch the job writes on a successful deploy.
pub fn job_report(end_point: &str, revision: u64) -> ProjectPatch {
    ProjectPatch {
        end_point: Some(Slot::Set(end_point.to_string())),
        meta_data: Some(release(revision)),
        ..Default::default()
    }
}

pub fn ids(store: &dyn RecordStore) -> Vec<ProjectId> {
    store.list_ids().unwrap()
}
