//! Command handlers for the Authoring context.
//!
//! Each handler loads the records it touches, checks the owning story still
//! accepts edits, applies the change and writes it back.

use storyforge_core::clock::Clock;
use storyforge_core::error::{DomainError, EntityKind};
use storyforge_core::graph::{Choice, Node};
use storyforge_core::repository::{NodeRepository, StoryRepository};
use storyforge_core::story::Story;
use storyforge_publishing::domain::lifecycle;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::commands::{
    ArchiveStory, CreateChoice, CreateNode, CreateStory, DeleteChoice, DeleteNode, UpdateChoice,
    UpdateNode, UpdateStory,
};
use crate::domain::editing::{ensure_same_story, next_choice_order, require_text};

async fn load_story(story_id: Uuid, stories: &dyn StoryRepository) -> Result<Story, DomainError> {
    stories
        .find_story(story_id)
        .await?
        .ok_or_else(|| DomainError::not_found(EntityKind::Story, story_id))
}

async fn load_node(node_id: Uuid, nodes: &dyn NodeRepository) -> Result<Node, DomainError> {
    nodes
        .find_node(node_id)
        .await?
        .ok_or_else(|| DomainError::not_found(EntityKind::Node, node_id))
}

async fn load_choice(choice_id: Uuid, nodes: &dyn NodeRepository) -> Result<Choice, DomainError> {
    nodes
        .find_choice(choice_id)
        .await?
        .ok_or_else(|| DomainError::not_found(EntityKind::Choice, choice_id))
}

/// Loads the story and fails unless it still accepts graph edits.
async fn editable_story(
    story_id: Uuid,
    stories: &dyn StoryRepository,
) -> Result<Story, DomainError> {
    let story = load_story(story_id, stories).await?;
    lifecycle::ensure_editable(&story)?;
    Ok(story)
}

/// Handles the `CreateStory` command.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the title is blank.
#[instrument(skip_all, fields(correlation_id = %command.correlation_id))]
pub async fn handle_create_story(
    command: &CreateStory,
    clock: &dyn Clock,
    stories: &dyn StoryRepository,
) -> Result<Story, DomainError> {
    require_text("title", &command.details.title)?;
    let story = Story::new(
        Uuid::new_v4(),
        command.details.clone(),
        command.metadata.clone(),
        clock.now(),
    );
    stories.insert_story(&story).await?;
    info!(story_id = %story.id, "story created");
    Ok(story)
}

/// Handles the `UpdateStory` command.
///
/// Changing a narrative field of a published story moves it back to draft,
/// editing the next version. Metadata and status-only patches never do.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist,
/// `DomainError::Conflict` if it is archived or the patch asks for a status
/// other than the current one or `ARCHIVED`, `DomainError::Validation` for a
/// blank title, and `DomainError::ConcurrencyConflict` on a racing write.
#[instrument(
    skip_all,
    fields(story_id = %command.story_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_update_story(
    command: &UpdateStory,
    clock: &dyn Clock,
    stories: &dyn StoryRepository,
) -> Result<Story, DomainError> {
    let mut story = editable_story(command.story_id, stories).await?;

    let edit = command.patch.apply(&mut story)?;
    let reopened = edit.content_changed && lifecycle::begin_new_version(&mut story);
    if edit.archive {
        lifecycle::archive(&mut story)?;
    }

    let expected_revision = story.touch(clock.now());
    stories.update_story(&story, expected_revision).await?;

    if reopened {
        info!(
            draft_version = story.draft_state.draft_version(),
            "published story reopened for a new version"
        );
    }
    info!(status = story.status.as_str(), "story updated");
    Ok(story)
}

/// Handles the `ArchiveStory` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist and
/// `DomainError::Conflict` if it is already archived.
#[instrument(
    skip_all,
    fields(story_id = %command.story_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_archive_story(
    command: &ArchiveStory,
    clock: &dyn Clock,
    stories: &dyn StoryRepository,
) -> Result<Story, DomainError> {
    let mut story = load_story(command.story_id, stories).await?;
    lifecycle::archive(&mut story)?;
    let expected_revision = story.touch(clock.now());
    stories.update_story(&story, expected_revision).await?;
    info!("story archived");
    Ok(story)
}

/// Handles the `CreateNode` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist,
/// `DomainError::Conflict` if it is archived or already has a start node
/// and this node is flagged as start.
#[instrument(
    skip_all,
    fields(story_id = %command.story_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_create_node(
    command: &CreateNode,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<Node, DomainError> {
    editable_story(command.story_id, stories).await?;

    // The repository rejects a second start node.
    let node = Node {
        id: Uuid::new_v4(),
        story_id: command.story_id,
        title: command.title.clone(),
        content: command.content.clone(),
        is_start: command.is_start,
        is_ending: command.is_ending,
        position: command.position,
        metadata: command.metadata.clone(),
    };
    nodes.insert_node(&node).await?;
    info!(node_id = %node.id, "node created");
    Ok(node)
}

/// Handles the `UpdateNode` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the node does not exist and
/// `DomainError::Conflict` if its story is archived or the patch would give
/// the story a second start node.
#[instrument(
    skip_all,
    fields(node_id = %command.node_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_update_node(
    command: &UpdateNode,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<Node, DomainError> {
    let mut node = load_node(command.node_id, nodes).await?;
    editable_story(node.story_id, stories).await?;

    command.patch.apply(&mut node);
    nodes.update_node(&node).await?;
    info!("node updated");
    Ok(node)
}

/// Handles the `DeleteNode` command. Choices into and out of the node go
/// with it.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the node does not exist and
/// `DomainError::Conflict` if its story is archived.
#[instrument(
    skip_all,
    fields(node_id = %command.node_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_delete_node(
    command: &DeleteNode,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<(), DomainError> {
    let node = load_node(command.node_id, nodes).await?;
    editable_story(node.story_id, stories).await?;
    nodes.delete_node(node.id).await?;
    info!("node deleted");
    Ok(())
}

/// Handles the `CreateChoice` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story or either node does not
/// exist, `DomainError::Validation` if a node belongs to another story or
/// the text is blank, and `DomainError::Conflict` if the story is archived.
#[instrument(
    skip_all,
    fields(story_id = %command.story_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_create_choice(
    command: &CreateChoice,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<Choice, DomainError> {
    require_text("choice text", &command.text)?;
    editable_story(command.story_id, stories).await?;
    let source = load_node(command.source_node_id, nodes).await?;
    let target = load_node(command.target_node_id, nodes).await?;
    ensure_same_story(command.story_id, &source)?;
    ensure_same_story(command.story_id, &target)?;

    let order = match command.order {
        Some(order) => order,
        None => {
            let graph = nodes.list_nodes_with_choices(command.story_id).await?;
            graph
                .iter()
                .find(|n| n.node.id == source.id)
                .map_or(0, |n| next_choice_order(&n.choices))
        }
    };

    let choice = Choice {
        id: Uuid::new_v4(),
        story_id: command.story_id,
        source_node_id: source.id,
        target_node_id: target.id,
        text: command.text.clone(),
        order,
        conditions: command.conditions.clone(),
    };
    nodes.insert_choice(&choice).await?;
    info!(choice_id = %choice.id, order, "choice created");
    Ok(choice)
}

/// Handles the `UpdateChoice` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the choice or a newly referenced node
/// does not exist, `DomainError::Validation` if that node belongs to another
/// story, and `DomainError::Conflict` if the story is archived.
#[instrument(
    skip_all,
    fields(choice_id = %command.choice_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_update_choice(
    command: &UpdateChoice,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<Choice, DomainError> {
    let mut choice = load_choice(command.choice_id, nodes).await?;
    editable_story(choice.story_id, stories).await?;
    for node_id in [command.patch.source_node_id, command.patch.target_node_id]
        .into_iter()
        .flatten()
    {
        let node = load_node(node_id, nodes).await?;
        ensure_same_story(choice.story_id, &node)?;
    }

    command.patch.apply(&mut choice)?;
    nodes.update_choice(&choice).await?;
    info!("choice updated");
    Ok(choice)
}

/// Handles the `DeleteChoice` command.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the choice does not exist and
/// `DomainError::Conflict` if its story is archived.
#[instrument(
    skip_all,
    fields(choice_id = %command.choice_id, correlation_id = %command.correlation_id)
)]
pub async fn handle_delete_choice(
    command: &DeleteChoice,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<(), DomainError> {
    let choice = load_choice(command.choice_id, nodes).await?;
    editable_story(choice.story_id, stories).await?;
    nodes.delete_choice(choice.id).await?;
    info!("choice deleted");
    Ok(())
}
