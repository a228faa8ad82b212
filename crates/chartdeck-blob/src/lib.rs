//! chartdeck-blob — chart artifact storage.
//!
//! Each project owns two artifacts (template and values) stored under
//! `projects/{id}/{filename}`. Callers keep a *locator* for each, of the
//! form `{scheme}://{bucket}/projects/{id}/{filename}`, in the project record.

pub mod error;
pub mod store;

pub use error::{BlobError, BlobResult};
pub use store::{validate_filename, ChartStore, PROJECT_PREFIX};
