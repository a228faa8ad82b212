//! Chart artifact storage using object_store.
//!
//! Supports S3, local filesystem, and in-memory backends.

use std::sync::Arc;

use bytes::Bytes;
use chartdeck_core::StorageConfig;
use futures::TryStreamExt;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use tracing::{debug, info};

use crate::error::{BlobError, BlobResult};

/// Key prefix under which all project artifacts live.
pub const PROJECT_PREFIX: &str = "projects";

/// Storage for the template and values artifacts of every project.
#[derive(Clone)]
pub struct ChartStore {
    store: Arc<dyn ObjectStore>,
    scheme: String,
    bucket: String,
}

impl ChartStore {
    /// Create a chart store from configuration.
    pub fn new(config: &StorageConfig) -> BlobResult<Self> {
        let (store, scheme) = create_object_store(config)?;
        info!(
            backend = %config.backend,
            bucket = %config.bucket,
            "chart store initialized"
        );
        Ok(Self {
            store,
            scheme: scheme.to_string(),
            bucket: config.bucket.clone(),
        })
    }

    /// Create a chart store with a pre-configured object store.
    pub fn with_store(store: Arc<dyn ObjectStore>, scheme: &str, bucket: &str) -> Self {
        Self {
            store,
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// Ephemeral store for tests and local runs.
    pub fn in_memory(bucket: &str) -> Self {
        Self::with_store(Arc::new(object_store::memory::InMemory::new()), "memory", bucket)
    }

    /// Locator for an artifact, as kept in the project record.
    pub fn locator(&self, project_id: &str, filename: &str) -> String {
        format!(
            "{}://{}/{PROJECT_PREFIX}/{project_id}/{filename}",
            self.scheme, self.bucket
        )
    }

    /// Store an artifact, replacing any object already at the same path.
    ///
    /// Returns the artifact's locator.
    pub async fn put(&self, project_id: &str, filename: &str, data: Bytes) -> BlobResult<String> {
        validate_filename(filename)?;
        let path = object_path(project_id, filename);
        let size = data.len();

        self.store
            .put(&path, data.into())
            .await
            .map_err(|e| BlobError::Storage(format!("failed to upload {path}: {e}")))?;

        debug!(%path, size, "artifact uploaded");
        Ok(self.locator(project_id, filename))
    }

    /// Fetch an artifact by locator.
    pub async fn get(&self, locator: &str) -> BlobResult<Bytes> {
        let path = self.parse_locator(locator)?;
        let result = self.store.get(&path).await.map_err(|e| match e {
            object_store::Error::NotFound { .. } => BlobError::NotFound(locator.to_string()),
            e => BlobError::Storage(format!("failed to download {path}: {e}")),
        })?;
        result
            .bytes()
            .await
            .map_err(|e| BlobError::Storage(format!("failed to read {path}: {e}")))
    }

    /// Delete an artifact by locator. Deleting a missing artifact is not an error.
    pub async fn delete(&self, locator: &str) -> BlobResult<()> {
        let path = self.parse_locator(locator)?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                debug!(%path, "artifact deleted");
                Ok(())
            }
            Err(e) => Err(BlobError::Storage(format!("failed to delete {path}: {e}"))),
        }
    }

    /// Delete every artifact of a project. Returns the number removed.
    pub async fn delete_project(&self, project_id: &str) -> BlobResult<usize> {
        let prefix = ObjectPath::from(format!("{PROJECT_PREFIX}/{project_id}"));
        let objects: Vec<_> = self
            .store
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(|e| BlobError::Storage(format!("failed to list {prefix}: {e}")))?;

        let mut removed = 0;
        for meta in objects {
            match self.store.delete(&meta.location).await {
                Ok(()) => removed += 1,
                Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => {
                    return Err(BlobError::Storage(format!(
                        "failed to delete {}: {e}",
                        meta.location
                    )));
                }
            }
        }

        info!(project = %project_id, removed, "project artifacts deleted");
        Ok(removed)
    }

    /// Resolve a locator produced by [`locator`](Self::locator) to an object path.
    pub fn parse_locator(&self, locator: &str) -> BlobResult<ObjectPath> {
        let root = format!("{}://{}/", self.scheme, self.bucket);
        locator
            .strip_prefix(&root)
            .filter(|rest| rest.starts_with(PROJECT_PREFIX))
            .map(ObjectPath::from)
            .ok_or_else(|| BlobError::ForeignLocator(locator.to_string()))
    }
}

/// Reject filenames that would escape the project's prefix.
pub fn validate_filename(filename: &str) -> BlobResult<()> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\'])
        || filename.chars().any(char::is_control);
    if bad {
        return Err(BlobError::InvalidFilename(filename.to_string()));
    }
    Ok(())
}

fn object_path(project_id: &str, filename: &str) -> ObjectPath {
    ObjectPath::from(format!("{PROJECT_PREFIX}/{project_id}/{filename}"))
}

/// Create an object store from configuration, with the locator scheme it uses.
fn create_object_store(
    config: &StorageConfig,
) -> BlobResult<(Arc<dyn ObjectStore>, &'static str)> {
    match config.backend.as_str() {
        "local" => {
            let root = config.path.as_ref().ok_or_else(|| BlobError::Backend {
                backend: "local".to_string(),
                message: "storage.path is required".to_string(),
            })?;
            std::fs::create_dir_all(root).map_err(|e| BlobError::Backend {
                backend: "local".to_string(),
                message: e.to_string(),
            })?;
            let store = object_store::local::LocalFileSystem::new_with_prefix(root).map_err(
                |e| BlobError::Backend {
                    backend: "local".to_string(),
                    message: e.to_string(),
                },
            )?;
            Ok((Arc::new(store), "file"))
        }
        "memory" => Ok((Arc::new(object_store::memory::InMemory::new()), "memory")),
        "s3" => {
            use object_store::aws::AmazonS3Builder;
            let mut builder = AmazonS3Builder::from_env().with_bucket_name(&config.bucket);

            if let Some(region) = &config.region {
                builder = builder.with_region(region);
            }
            if let Some(endpoint) = &config.endpoint {
                builder = builder.with_endpoint(endpoint);
            }

            let store = builder.build().map_err(|e| BlobError::Backend {
                backend: "s3".to_string(),
                message: e.to_string(),
            })?;
            Ok((Arc::new(store), "s3"))
        }
        other => Err(BlobError::UnsupportedBackend(other.to_string())),
    }
}
