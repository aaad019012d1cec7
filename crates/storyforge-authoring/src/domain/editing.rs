//! Partial updates to stories, nodes and choices.

use serde::Deserialize;
use storyforge_core::error::DomainError;
use storyforge_core::graph::{Choice, Node, Position};
use storyforge_core::story::{Metadata, Story, StoryDetails, StoryStatus};
use uuid::Uuid;

/// Rejects blank required text.
///
/// # Errors
///
/// Returns `DomainError::Validation` if `value` is empty or whitespace.
pub fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid(format!("{field} must not be blank")));
    }
    Ok(())
}

/// Fields of a story that may change. Absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub genres: Option<Vec<String>>,
    pub difficulty: Option<String>,
    /// Only the current status or `ARCHIVED` is accepted.
    pub status: Option<StoryStatus>,
    pub metadata: Option<Metadata>,
}

/// What a story patch asks the lifecycle to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoryEdit {
    /// A narrative field now holds a different value.
    pub content_changed: bool,
    /// The patch asked for `ARCHIVED`.
    pub archive: bool,
}

impl StoryPatch {
    /// Validates the patch against `story` and writes its fields in.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for a blank title and
    /// `DomainError::Conflict` for a status other than the current one or
    /// `ARCHIVED`. On error `story` is unchanged.
    pub fn apply(&self, story: &mut Story) -> Result<StoryEdit, DomainError> {
        if let Some(title) = &self.title {
            require_text("title", title)?;
        }
        let archive = match self.status {
            None => false,
            Some(status) if status == story.status => false,
            Some(StoryStatus::Archived) => true,
            Some(status) => {
                return Err(DomainError::Conflict(format!(
                    "story {} cannot move from {} to {} by editing",
                    story.id,
                    story.status.as_str(),
                    status.as_str()
                )));
            }
        };

        let content_changed = self.apply_details(&mut story.details);
        if let Some(metadata) = &self.metadata {
            story.metadata.clone_from(metadata);
        }
        Ok(StoryEdit {
            content_changed,
            archive,
        })
    }

    fn apply_details(&self, details: &mut StoryDetails) -> bool {
        let mut changed = false;
        changed |= replace(&mut details.title, self.title.as_ref());
        changed |= replace_opt(&mut details.description, self.description.as_ref());
        changed |= replace_opt(&mut details.cover_image, self.cover_image.as_ref());
        changed |= replace(&mut details.genres, self.genres.as_ref());
        changed |= replace_opt(&mut details.difficulty, self.difficulty.as_ref());
        changed
    }
}

fn replace<T: Clone + PartialEq>(slot: &mut T, value: Option<&T>) -> bool {
    match value {
        Some(v) if v != slot => {
            slot.clone_from(v);
            true
        }
        _ => false,
    }
}

fn replace_opt<T: Clone + PartialEq>(slot: &mut Option<T>, value: Option<&T>) -> bool {
    match value {
        Some(v) if slot.as_ref() != Some(v) => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}

/// Fields of a node that may change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub is_start: Option<bool>,
    pub is_ending: Option<bool>,
    pub position: Option<Position>,
    pub metadata: Option<Metadata>,
}

impl NodePatch {
    /// Writes the patch into `node`.
    pub fn apply(&self, node: &mut Node) {
        replace(&mut node.title, self.title.as_ref());
        replace(&mut node.content, self.content.as_ref());
        replace(&mut node.is_start, self.is_start.as_ref());
        replace(&mut node.is_ending, self.is_ending.as_ref());
        replace(&mut node.position, self.position.as_ref());
        replace(&mut node.metadata, self.metadata.as_ref());
    }
}

/// Fields of a choice that may change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChoicePatch {
    pub source_node_id: Option<Uuid>,
    pub target_node_id: Option<Uuid>,
    pub text: Option<String>,
    pub order: Option<i32>,
    pub conditions: Option<serde_json::Value>,
}

impl ChoicePatch {
    /// Writes the patch into `choice`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for blank text.
    pub fn apply(&self, choice: &mut Choice) -> Result<(), DomainError> {
        if let Some(text) = &self.text {
            require_text("choice text", text)?;
        }
        replace(&mut choice.source_node_id, self.source_node_id.as_ref());
        replace(&mut choice.target_node_id, self.target_node_id.as_ref());
        replace(&mut choice.text, self.text.as_ref());
        replace(&mut choice.order, self.order.as_ref());
        replace(&mut choice.conditions, self.conditions.as_ref());
        Ok(())
    }
}

/// Order for a choice appended after `existing`: one past the highest, or 0.
#[must_use]
pub fn next_choice_order(existing: &[Choice]) -> i32 {
    existing.iter().map(|c| c.order).max().map_or(0, |max| max + 1)
}

/// Checks that a graph record belongs to `story_id`.
///
/// # Errors
///
/// Returns `DomainError::Validation` naming the foreign node.
pub fn ensure_same_story(story_id: Uuid, node: &Node) -> Result<(), DomainError> {
    if node.story_id != story_id {
        return Err(DomainError::invalid(format!(
            "node {} belongs to a different story",
            node.id
        )));
    }
    Ok(())
}
