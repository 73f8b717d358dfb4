//! Validated titles for plans and tasks.

use super::WorkflowDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-empty, trimmed title of a plan or task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Title(String);

impl Title {
    /// Maximum number of characters accepted by storage.
    pub const MAX_CHARS: usize = 500;

    /// Validates and normalizes a title.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyTitle`] when the trimmed value is
    /// empty and [`WorkflowDomainError::TitleTooLong`] when it exceeds
    /// [`Title::MAX_CHARS`].
    pub fn new(value: impl AsRef<str>) -> Result<Self, WorkflowDomainError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(WorkflowDomainError::EmptyTitle);
        }
        let length = trimmed.chars().count();
        if length > Self::MAX_CHARS {
            return Err(WorkflowDomainError::TitleTooLong {
                length,
                max: Self::MAX_CHARS,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Validates a generated title, cutting it to [`Title::MAX_CHARS`]
    /// instead of rejecting it.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyTitle`] when the trimmed value is
    /// empty.
    pub fn truncated(value: impl AsRef<str>) -> Result<Self, WorkflowDomainError> {
        let cut: String = value.as_ref().trim().chars().take(Self::MAX_CHARS).collect();
        Self::new(cut)
    }

    /// Returns the title text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Title {
    type Error = WorkflowDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Title> for String {
    fn from(value: Title) -> Self {
        value.0
    }
}
