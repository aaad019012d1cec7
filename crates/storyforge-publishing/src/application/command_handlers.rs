//! Command handlers for the Publishing context.
//!
//! A publication is: certify the graph, number the version, freeze a
//! snapshot, flip the story's status, and hand story and version to the
//! repository as one atomic commit.

use serde::Serialize;
use storyforge_core::clock::Clock;
use storyforge_core::error::{DomainError, EntityKind};
use storyforge_core::graph::{self, NodeWithChoices};
use storyforge_core::repository::{NodeRepository, StoryRepository, VersionRepository};
use storyforge_core::story::Story;
use storyforge_core::version::{StorySnapshot, StoryVersion};
use storyforge_graph::{StructureViolation, validate_structure};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::commands::{PublishNewVersion, PublishStory};
use crate::domain::lifecycle;

/// Whether a story's graph may be published, and why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReadiness {
    /// All structural checks passed.
    pub is_valid: bool,
    /// Every failed check.
    pub violations: Vec<StructureViolation>,
    /// Human-readable summary; absent when valid.
    pub message: Option<String>,
}

impl PublishReadiness {
    fn from_violations(violations: Vec<StructureViolation>) -> Self {
        let message = (!violations.is_empty()).then(|| {
            let items: Vec<String> = violations.iter().map(ToString::to_string).collect();
            format!("story is not ready to publish: {}", items.join("; "))
        });
        Self {
            is_valid: violations.is_empty(),
            violations,
            message,
        }
    }

    fn into_error(self) -> DomainError {
        DomainError::Validation {
            message: self.message.unwrap_or_default(),
            violations: self.violations.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Result of a successful publication.
#[derive(Debug, Clone)]
pub struct PublicationResult {
    /// The story as committed.
    pub story: Story,
    /// The ledger entry created.
    pub version: StoryVersion,
}

async fn load_story(story_id: Uuid, stories: &dyn StoryRepository) -> Result<Story, DomainError> {
    stories
        .find_story(story_id)
        .await?
        .ok_or_else(|| DomainError::not_found(EntityKind::Story, story_id))
}

fn readiness_of(nodes: &[NodeWithChoices]) -> PublishReadiness {
    let (flat_nodes, flat_choices) = graph::flatten(nodes);
    let result = validate_structure(&flat_nodes, &flat_choices);
    PublishReadiness::from_violations(result.violations())
}

/// Runs the structural checks a story must pass before publication.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist, or a
/// persistence error from the repositories.
pub async fn validate_for_publishing(
    story_id: Uuid,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<PublishReadiness, DomainError> {
    load_story(story_id, stories).await?;
    let graph = nodes.list_nodes_with_choices(story_id).await?;
    Ok(readiness_of(&graph))
}

/// Loads the graph and fails with the itemized violation list if it is not
/// publishable.
async fn certified_graph(
    story_id: Uuid,
    nodes: &dyn NodeRepository,
) -> Result<Vec<NodeWithChoices>, DomainError> {
    let graph = nodes.list_nodes_with_choices(story_id).await?;
    let readiness = readiness_of(&graph);
    if !readiness.is_valid {
        warn!(
            %story_id,
            violation_count = readiness.violations.len(),
            "publication rejected by structure validation"
        );
        return Err(readiness.into_error());
    }
    Ok(graph)
}

fn default_notes(version_number: i32) -> String {
    if version_number == 1 {
        "Initial publication".to_owned()
    } else {
        format!("Version {version_number}")
    }
}

/// Freezes the graph and commits the story with its new version.
async fn commit(
    story: Story,
    expected_revision: i64,
    version_number: i32,
    graph: Vec<NodeWithChoices>,
    notes: Option<String>,
    stories: &dyn StoryRepository,
) -> Result<PublicationResult, DomainError> {
    let published_at = story.published_at.unwrap_or(story.updated_at);
    let snapshot = StorySnapshot {
        story,
        nodes: graph,
    };
    let version = StoryVersion::capture(
        Uuid::new_v4(),
        version_number,
        &snapshot,
        published_at,
        Some(notes.unwrap_or_else(|| default_notes(version_number))),
    )?;
    stories
        .commit_publication(&snapshot.story, expected_revision, &version)
        .await?;

    info!(
        story_id = %snapshot.story.id,
        version_number,
        snapshot_hash = %version.snapshot_hash,
        "story published"
    );

    Ok(PublicationResult {
        story: snapshot.story,
        version,
    })
}

/// Handles the `PublishStory` command: first publication of a story.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist,
/// `DomainError::Conflict` if it is already published or archived,
/// `DomainError::Validation` listing every failed structural check, and
/// `ConcurrencyConflict`/`Conflict` if another publication won the race.
#[instrument(
    skip_all,
    fields(story_id = %command.story_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_publish_story(
    command: &PublishStory,
    clock: &dyn Clock,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
    versions: &dyn VersionRepository,
) -> Result<PublicationResult, DomainError> {
    let mut story = load_story(command.story_id, stories).await?;
    lifecycle::can_publish(&story)?;
    let graph = certified_graph(story.id, nodes).await?;

    let version_number = versions
        .latest_version(story.id)
        .await?
        .map_or(0, |v| v.version_number)
        + 1;

    let now = clock.now();
    let expected_revision = story.touch(now);
    lifecycle::publish(&mut story, version_number, now)?;

    commit(
        story,
        expected_revision,
        version_number,
        graph,
        command.notes.clone(),
        stories,
    )
    .await
}

/// Handles the `PublishNewVersion` command: publishes the revision prepared
/// since a published story's content was edited.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist,
/// `DomainError::Conflict` unless the story is a draft editing a new version
/// (or if its draft number is not above the latest published one),
/// `DomainError::Validation` listing every failed structural check, and
/// `ConcurrencyConflict`/`Conflict` if another publication won the race.
#[instrument(
    skip_all,
    fields(story_id = %command.story_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_publish_new_version(
    command: &PublishNewVersion,
    clock: &dyn Clock,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
    versions: &dyn VersionRepository,
) -> Result<PublicationResult, DomainError> {
    let mut story = load_story(command.story_id, stories).await?;
    let draft_version = lifecycle::can_publish_new_version(&story)?;
    let graph = certified_graph(story.id, nodes).await?;

    if let Some(latest) = versions.latest_version(story.id).await? {
        if latest.version_number >= draft_version {
            return Err(DomainError::Conflict(format!(
                "story {} already has version {}; draft version {draft_version} is stale",
                story.id, latest.version_number
            )));
        }
    }

    let now = clock.now();
    let expected_revision = story.touch(now);
    let version_number = lifecycle::publish_new_version(&mut story, now)?;

    commit(
        story,
        expected_revision,
        version_number,
        graph,
        command.notes.clone(),
        stories,
    )
    .await
}
