//! Domain error types.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// The kind of record a lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A story.
    Story,
    /// A node in a story graph.
    Node,
    /// A choice (edge) in a story graph.
    Choice,
    /// A published story version.
    Version,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Story => "story",
            Self::Node => "node",
            Self::Choice => "choice",
            Self::Version => "story version",
        };
        f.write_str(name)
    }
}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A story, node, choice or version does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        entity: EntityKind,
        /// The identifier that was looked up, rendered for display.
        id: String,
    },

    /// Input or story structure failed validation.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable summary naming every failed check.
        message: String,
        /// One entry per failed check.
        violations: Vec<String>,
    },

    /// An illegal state transition or a duplicate ledger entry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Optimistic concurrency conflict on a story record.
    #[error(
        "concurrency conflict on story {story_id}: expected revision {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        /// The story that had the conflict.
        story_id: Uuid,
        /// The revision the writer read.
        expected: i64,
        /// The revision currently stored.
        actual: i64,
    },

    /// The underlying storage failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl DomainError {
    /// Shorthand for a `NotFound` keyed by a UUID.
    #[must_use]
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for a single-item validation failure.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            violations: vec![message.clone()],
            message,
        }
    }

    /// Returns `true` for both plain and optimistic-concurrency conflicts.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::ConcurrencyConflict { .. })
    }
}
