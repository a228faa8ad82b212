//! Error types for the build trigger.

use thiserror::Error;

pub type TriggerResult<T> = Result<T, TriggerError>;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("build system rejected the trigger credentials ({status})")]
    Auth { status: u16 },

    #[error("build trigger request failed: {0}")]
    Transport(String),

    #[error("build system did not accept the job ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid trigger configuration: {0}")]
    Config(String),
}
