//! The story record and its publication status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form extension fields carried on stories and nodes.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Publication status of a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoryStatus {
    /// Editable; never published or being revised.
    Draft,
    /// Live; the latest published version is current.
    Published,
    /// Retired. No transition leads out of this state.
    Archived,
}

impl StoryStatus {
    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Parses the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRAFT" => Some(Self::Draft),
            "PUBLISHED" => Some(Self::Published),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Sub-state of a `Draft` story.
///
/// `EditingVersion` means the story was published before and the author is
/// preparing the given version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DraftState {
    /// No revision in progress.
    Fresh,
    /// A revision of a published story is being prepared.
    EditingVersion {
        /// The version number the next publish will receive.
        draft_version: i32,
    },
}

impl DraftState {
    /// Returns `true` when a new version is being prepared.
    #[must_use]
    pub fn is_editing_new_version(self) -> bool {
        matches!(self, Self::EditingVersion { .. })
    }

    /// The pending version number, if any.
    #[must_use]
    pub fn draft_version(self) -> Option<i32> {
        match self {
            Self::Fresh => None,
            Self::EditingVersion { draft_version } => Some(draft_version),
        }
    }
}

/// The narrative fields whose edits count as content changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDetails {
    /// Display title.
    pub title: String,
    /// Blurb shown to readers.
    pub description: Option<String>,
    /// Cover image location.
    pub cover_image: Option<String>,
    /// Genre tags.
    pub genres: Vec<String>,
    /// Author-declared difficulty label.
    pub difficulty: Option<String>,
}

/// A story: the owner of a graph of nodes and the subject of publication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Story identifier.
    pub id: Uuid,
    /// Narrative fields.
    #[serde(flatten)]
    pub details: StoryDetails,
    /// Publication status.
    pub status: StoryStatus,
    /// Revision overlay, only meaningful while `Draft`.
    pub draft_state: DraftState,
    /// Last published version number.
    pub current_version: Option<i32>,
    /// When the current version was published.
    pub published_at: Option<DateTime<Utc>>,
    /// Free-form extension fields, never interpreted here.
    pub metadata: Metadata,
    /// Optimistic concurrency counter, bumped on every write.
    pub revision: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Story {
    /// Creates a fresh draft story.
    #[must_use]
    pub fn new(id: Uuid, details: StoryDetails, metadata: Metadata, now: DateTime<Utc>) -> Self {
        Self {
            id,
            details,
            status: StoryStatus::Draft,
            draft_state: DraftState::Fresh,
            current_version: None,
            published_at: None,
            metadata,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` while a new version of a published story is in progress.
    #[must_use]
    pub fn is_editing_new_version(&self) -> bool {
        self.status == StoryStatus::Draft && self.draft_state.is_editing_new_version()
    }

    /// Marks the record as modified and returns the revision it was read at,
    /// which the repository checks on write.
    pub fn touch(&mut self, now: DateTime<Utc>) -> i64 {
        let expected = self.revision;
        self.revision += 1;
        self.updated_at = now;
        expected
    }
}
