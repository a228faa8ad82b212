//! chartdeck-orchestrator — drives build jobs to completion.
//!
//! The build system has no callback channel. After triggering a job, the
//! orchestrator watches the project record the job writes into, until a
//! completion condition holds or a deadline passes.
//!
//! # Components
//!
//! - **`poll`**: the bounded poll loop shared by every operation
//! - **`orchestrator`**: create / update / delete / snapshot flows and the
//!   orphan sweep
//! - **`inflight`**: per-project serialization of operations
//! - **`sweep`**: periodic removal of projects whose create never finished
//!   uploading
//!
//! # Completion conditions
//!
//! | Operation | Done when |
//! |---|---|
//! | create | `end_point` is set |
//! | update | `meta_data.revision` is greater than before the trigger |
//! | delete | the record no longer exists |
//! | snapshot | `meta_data` carries every required key |

pub mod error;
pub mod inflight;
pub mod orchestrator;
pub mod poll;
mod sweep;

#[cfg(test)]
mod testing;

pub use error::{OrchestratorError, OrchestratorResult};
pub use inflight::{InFlight, InFlightGuard};
pub use orchestrator::{Artifact, Orchestrator, OrchestratorContext, Snapshot};
pub use poll::{poll_record, Cancellation, PollOutcome, PollReport, PollSettings};
