//! Project name validation.

use std::fmt;

use thiserror::Error;

/// Shortest accepted project name, in characters.
pub const MIN_NAME_LEN: usize = 4;

/// Longest accepted project name, in characters.
pub const MAX_NAME_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("project name must be {MIN_NAME_LEN}-{MAX_NAME_LEN} characters, got {0}")]
    Length(usize),
}

/// A user-supplied project label that passed length validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(raw: impl Into<String>) -> Result<Self, NameError> {
        let raw = raw.into();
        let len = raw.chars().count();
        if !(MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) {
            return Err(NameError::Length(len));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
