//! chartdeck-state — the project record store.
//!
//! Backed by [redb](https://docs.rs/redb), holds one mutable record per
//! project. The orchestrator inserts and patches records; the external
//! build job writes its completion fields (`end_point`, `meta_data`) into
//! the same record, or removes it on teardown.
//!
//! # Architecture
//!
//! Records are JSON-serialized into redb's `&[u8]` value column, keyed by
//! project id. Field patches run as a read-modify-write inside a single
//! write transaction, so concurrent writers never lose each other's fields.
//!
//! Consumers talk to the [`RecordStore`] trait; [`ProjectStore`] is the
//! redb implementation and is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`).

pub mod error;
pub mod metadata;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use metadata::{Metadata, MetaData, ReleaseInfo, Revision, REQUIRED_METADATA_KEYS};
pub use store::{ProjectStore, RecordStore};
pub use types::*;
