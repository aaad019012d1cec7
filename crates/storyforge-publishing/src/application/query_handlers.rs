//! Query handlers for the Publishing context.
//!
//! Read-only views over the structure report and the version ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::value::RawValue;
use storyforge_core::error::{DomainError, EntityKind};
use storyforge_core::graph;
use storyforge_core::repository::{NodeRepository, StoryRepository, VersionRepository};
use storyforge_core::version::{StorySnapshot, StoryVersion};
use storyforge_graph::{ValidationResult, validate_structure};
use tracing::error;
use uuid::Uuid;

/// Ledger entry without its snapshot body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryVersionSummary {
    /// Version row identifier.
    pub id: Uuid,
    /// The story this version belongs to.
    pub story_id: Uuid,
    /// Version number.
    pub version_number: i32,
    /// Lowercase hex SHA-256 of the stored snapshot.
    pub snapshot_hash: String,
    /// Publication time.
    pub published_at: DateTime<Utc>,
    /// Release notes.
    pub notes: Option<String>,
}

impl From<&StoryVersion> for StoryVersionSummary {
    fn from(version: &StoryVersion) -> Self {
        Self {
            id: version.id,
            story_id: version.story_id,
            version_number: version.version_number,
            snapshot_hash: version.snapshot_hash.clone(),
            published_at: version.published_at,
            notes: version.notes.clone(),
        }
    }
}

/// Ledger entry with its snapshot, served as the exact text stored at
/// publish time.
#[derive(Debug, Clone, Serialize)]
pub struct StoryVersionView {
    /// Version metadata.
    #[serde(flatten)]
    pub summary: StoryVersionSummary,
    /// The frozen story and graph.
    pub snapshot: Box<RawValue>,
}

impl StoryVersionView {
    /// Decodes the snapshot into its typed form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the text is not a snapshot.
    pub fn decode_snapshot(&self) -> Result<StorySnapshot, DomainError> {
        serde_json::from_str(self.snapshot.get())
            .map_err(|e| DomainError::Persistence(format!("unreadable snapshot: {e}")))
    }
}

impl TryFrom<&StoryVersion> for StoryVersionView {
    type Error = DomainError;

    fn try_from(version: &StoryVersion) -> Result<Self, Self::Error> {
        if !version.verify_integrity() {
            error!(
                story_id = %version.story_id,
                version_number = version.version_number,
                "stored snapshot does not match its hash"
            );
            return Err(DomainError::Persistence(format!(
                "snapshot of story {} version {} failed its integrity check",
                version.story_id, version.version_number
            )));
        }
        // Reject text that no longer decodes before serving it verbatim.
        version.snapshot()?;
        let snapshot = RawValue::from_string(version.snapshot_json.clone())
            .map_err(|e| DomainError::Persistence(format!("unreadable snapshot: {e}")))?;
        Ok(Self {
            summary: StoryVersionSummary::from(version),
            snapshot,
        })
    }
}

async fn require_story(story_id: Uuid, stories: &dyn StoryRepository) -> Result<(), DomainError> {
    match stories.find_story(story_id).await? {
        Some(_) => Ok(()),
        None => Err(DomainError::not_found(EntityKind::Story, story_id)),
    }
}

/// Runs the structure validator over the story's current graph.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
pub async fn validate_story_structure(
    story_id: Uuid,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<ValidationResult, DomainError> {
    require_story(story_id, stories).await?;
    let graph = nodes.list_nodes_with_choices(story_id).await?;
    let (flat_nodes, flat_choices) = graph::flatten(&graph);
    Ok(validate_structure(&flat_nodes, &flat_choices))
}

/// Returns the highest-numbered version of a story, or `None` if it has never
/// been published.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist, and
/// `DomainError::Persistence` if the stored snapshot is corrupt.
pub async fn get_latest_version(
    story_id: Uuid,
    stories: &dyn StoryRepository,
    versions: &dyn VersionRepository,
) -> Result<Option<StoryVersionView>, DomainError> {
    require_story(story_id, stories).await?;
    versions
        .latest_version(story_id)
        .await?
        .as_ref()
        .map(StoryVersionView::try_from)
        .transpose()
}

/// Returns one specific version of a story.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the version does not exist, and
/// `DomainError::Persistence` if its stored snapshot is corrupt.
pub async fn get_story_version(
    story_id: Uuid,
    version_number: i32,
    versions: &dyn VersionRepository,
) -> Result<StoryVersionView, DomainError> {
    let version = versions
        .find_version(story_id, version_number)
        .await?
        .ok_or_else(|| DomainError::NotFound {
            entity: EntityKind::Version,
            id: format!("{story_id}/{version_number}"),
        })?;
    StoryVersionView::try_from(&version)
}

/// Lists every version of a story, highest number first.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
pub async fn list_story_versions(
    story_id: Uuid,
    stories: &dyn StoryRepository,
    versions: &dyn VersionRepository,
) -> Result<Vec<StoryVersionSummary>, DomainError> {
    require_story(story_id, stories).await?;
    let ledger = versions.list_versions(story_id).await?;
    Ok(ledger.iter().map(StoryVersionSummary::from).collect())
}
