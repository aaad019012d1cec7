//! Commands for the Authoring context.

use storyforge_core::command::Command;
use storyforge_core::graph::Position;
use storyforge_core::story::{Metadata, StoryDetails};
use uuid::Uuid;

use crate::domain::editing::{ChoicePatch, NodePatch, StoryPatch};

/// Command to create a new draft story.
#[derive(Debug, Clone)]
pub struct CreateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Narrative fields of the new story.
    pub details: StoryDetails,
    /// Free-form extension fields.
    pub metadata: Metadata,
}

impl Command for CreateStory {
    fn command_type(&self) -> &'static str {
        "authoring.create_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to edit a story's fields.
#[derive(Debug, Clone)]
pub struct UpdateStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story to edit.
    pub story_id: Uuid,
    /// Fields to change.
    pub patch: StoryPatch,
}

impl Command for UpdateStory {
    fn command_type(&self) -> &'static str {
        "authoring.update_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn story_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}

/// Command to retire a story.
#[derive(Debug, Clone)]
pub struct ArchiveStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story to archive.
    pub story_id: Uuid,
}

impl Command for ArchiveStory {
    fn command_type(&self) -> &'static str {
        "authoring.archive_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn story_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}

/// Command to add a node to a story graph.
#[derive(Debug, Clone)]
pub struct CreateNode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning story.
    pub story_id: Uuid,
    /// Author-facing title.
    pub title: String,
    /// Content payload.
    pub content: String,
    /// Whether traversal begins here.
    pub is_start: bool,
    /// Whether this node ends the story.
    pub is_ending: bool,
    /// Editor layout.
    pub position: Position,
    /// Free-form extension fields.
    pub metadata: Metadata,
}

impl Command for CreateNode {
    fn command_type(&self) -> &'static str {
        "authoring.create_node"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn story_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}

/// Command to edit a node.
#[derive(Debug, Clone)]
pub struct UpdateNode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The node to edit.
    pub node_id: Uuid,
    /// Fields to change.
    pub patch: NodePatch,
}

impl Command for UpdateNode {
    fn command_type(&self) -> &'static str {
        "authoring.update_node"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to remove a node and every choice touching it.
#[derive(Debug, Clone)]
pub struct DeleteNode {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The node to remove.
    pub node_id: Uuid,
}

impl Command for DeleteNode {
    fn command_type(&self) -> &'static str {
        "authoring.delete_node"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to connect two nodes with a choice.
#[derive(Debug, Clone)]
pub struct CreateChoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The owning story.
    pub story_id: Uuid,
    /// Node the choice is offered on.
    pub source_node_id: Uuid,
    /// Node the choice leads to.
    pub target_node_id: Uuid,
    /// Reader-facing label.
    pub text: String,
    /// Display order; appended after the source's existing choices when absent.
    pub order: Option<i32>,
    /// Opaque payload.
    pub conditions: serde_json::Value,
}

impl Command for CreateChoice {
    fn command_type(&self) -> &'static str {
        "authoring.create_choice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn story_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}

/// Command to edit a choice.
#[derive(Debug, Clone)]
pub struct UpdateChoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The choice to edit.
    pub choice_id: Uuid,
    /// Fields to change.
    pub patch: ChoicePatch,
}

impl Command for UpdateChoice {
    fn command_type(&self) -> &'static str {
        "authoring.update_choice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to remove a choice.
#[derive(Debug, Clone)]
pub struct DeleteChoice {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The choice to remove.
    pub choice_id: Uuid,
}

impl Command for DeleteChoice {
    fn command_type(&self) -> &'static str {
        "authoring.delete_choice"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
