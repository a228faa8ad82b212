//! ProjectStore — redb-backed persistence for project records.
//!
//! All values are JSON-serialized into redb's `&[u8]` value column. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::PROJECTS;
use crate::types::{ProjectId, ProjectPatch, ProjectRecord};

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Operations the orchestrator and the HTTP layer need from the record store.
///
/// Implementations must be safe for concurrent use. Reads always observe
/// the latest committed write; there is no caching layer in between.
pub trait RecordStore: Send + Sync {
    /// Insert a new record. Fails with [`StateError::Duplicate`] if the id exists.
    fn insert(&self, record: &ProjectRecord) -> StateResult<()>;

    fn get(&self, id: &str) -> StateResult<Option<ProjectRecord>>;

    /// Apply a patch. Returns false if the record does not exist.
    fn update_fields(&self, id: &str, patch: ProjectPatch) -> StateResult<bool>;

    /// Delete a record. Returns true if it existed; deleting twice is not an error.
    fn delete(&self, id: &str) -> StateResult<bool>;

    /// All records, newest `created_at` first (ties broken by id).
    fn list(&self) -> StateResult<Vec<ProjectRecord>>;

    /// Record ids, newest first.
    fn list_ids(&self) -> StateResult<Vec<ProjectId>> {
        Ok(self.list()?.into_iter().map(|r| r.id).collect())
    }
}

/// Thread-safe record store backed by redb.
#[derive(Clone)]
pub struct ProjectStore {
    db: Arc<Database>,
}

impl ProjectStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "record store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory record store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(PROJECTS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }
}

impl RecordStore for ProjectStore {
    fn insert(&self, record: &ProjectRecord) -> StateResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PROJECTS).map_err(map_err!(Table))?;
            let exists = table
                .get(record.id.as_str())
                .map_err(map_err!(Read))?
                .is_some();
            if exists {
                return Err(StateError::Duplicate(record.id.clone()));
            }
            table
                .insert(record.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = %record.id, name = %record.project_name, "project record inserted");
        Ok(())
    }

    fn get(&self, id: &str) -> StateResult<Option<ProjectRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROJECTS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: ProjectRecord =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn update_fields(&self, id: &str, patch: ProjectPatch) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(PROJECTS).map_err(map_err!(Table))?;
            let current = table
                .get(id)
                .map_err(map_err!(Read))?
                .map(|guard| guard.value().to_vec());
            let Some(current) = current else {
                return Ok(false);
            };

            let mut record: ProjectRecord =
                serde_json::from_slice(&current).map_err(map_err!(Deserialize))?;
            patch.apply(&mut record);
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table
                .insert(id, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%id, "project record patched");
        Ok(true)
    }

    fn delete(&self, id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(PROJECTS).map_err(map_err!(Table))?;
            existed = table.remove(id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%id, existed, "project record deleted");
        Ok(existed)
    }

    fn list(&self) -> StateResult<Vec<ProjectRecord>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROJECTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: ProjectRecord =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(record);
        }
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(results)
    }
}
