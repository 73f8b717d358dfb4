//! Identifier newtypes for workflow entities.
//!
//! Each identifier wraps a UUID so that plan, task, project and review ids
//! cannot be mixed up at call sites.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a project.
    ProjectId
);

uuid_identifier!(
    /// Unique identifier for a plan.
    PlanId
);

uuid_identifier!(
    /// Unique identifier for a task.
    TaskId
);

uuid_identifier!(
    /// Unique identifier for a review.
    ReviewId
);

uuid_identifier!(
    /// Identifier of a user acting as reviewer, plan author or actor.
    UserId
);

uuid_identifier!(
    /// Identifier of a reviewer "hat" assigned to a project.
    HatId
);

uuid_identifier!(
    /// Identifier of one accepted generation request for a plan.
    ///
    /// Results carrying a different run identifier than the one recorded on
    /// the plan are ignored.
    GenerationRunId
);

/// Optimistic concurrency version of a plan or task.
///
/// Starts at 1 and increases by exactly one per successful mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version assigned to newly created entities.
    pub const INITIAL: Self = Self(1);

    /// Reconstructs a version from storage.
    #[must_use]
    pub const fn from_persisted(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the version that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
