//! Published versions: immutable snapshots of a story graph.
//!
//! A version stores its snapshot as the exact JSON text produced at publish
//! time together with a SHA-256 digest of that text. Readers decode the text
//! on demand, so the stored bytes are never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::DomainError;
use crate::graph::NodeWithChoices;
use crate::story::Story;

/// Structurally complete copy of a story at the moment of publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorySnapshot {
    /// The story record as committed by the publication.
    pub story: Story,
    /// Every node with its outgoing choices.
    pub nodes: Vec<NodeWithChoices>,
}

/// An entry in the append-only version ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryVersion {
    /// Version row identifier.
    pub id: Uuid,
    /// The story this version belongs to.
    pub story_id: Uuid,
    /// Unique per story, strictly increasing.
    pub version_number: i32,
    /// Serialized `StorySnapshot`, stored verbatim.
    pub snapshot_json: String,
    /// Lowercase hex SHA-256 of `snapshot_json`.
    pub snapshot_hash: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Release notes.
    pub notes: Option<String>,
}

/// Lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

impl StoryVersion {
    /// Freezes `snapshot` into a new ledger entry.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the snapshot cannot be serialized.
    pub fn capture(
        id: Uuid,
        version_number: i32,
        snapshot: &StorySnapshot,
        published_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<Self, DomainError> {
        let snapshot_json = serde_json::to_string(snapshot)
            .map_err(|e| DomainError::Persistence(format!("snapshot serialization failed: {e}")))?;
        let snapshot_hash = content_hash(snapshot_json.as_bytes());
        Ok(Self {
            id,
            story_id: snapshot.story.id,
            version_number,
            snapshot_json,
            snapshot_hash,
            published_at,
            notes,
        })
    }

    /// Decodes the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the stored text is not a valid
    /// snapshot document.
    pub fn snapshot(&self) -> Result<StorySnapshot, DomainError> {
        serde_json::from_str(&self.snapshot_json).map_err(|e| {
            DomainError::Persistence(format!(
                "snapshot for story {} version {} is unreadable: {e}",
                self.story_id, self.version_number
            ))
        })
    }

    /// Returns `true` if the stored text still matches its digest.
    #[must_use]
    pub fn verify_integrity(&self) -> bool {
        content_hash(self.snapshot_json.as_bytes()) == self.snapshot_hash
    }
}
