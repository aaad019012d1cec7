//! Story graph records: nodes and the choices connecting them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::story::Metadata;

/// Editor canvas coordinates. Cosmetic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

/// A unit of story content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier.
    pub id: Uuid,
    /// Owning story.
    pub story_id: Uuid,
    /// Author-facing title.
    pub title: String,
    /// Opaque content payload.
    pub content: String,
    /// Where traversal begins. At most one per story.
    pub is_start: bool,
    /// Terminal point of the story.
    pub is_ending: bool,
    /// Editor layout.
    pub position: Position,
    /// Free-form extension fields.
    pub metadata: Metadata,
}

/// A directed edge from one node to another, labelled with reader-facing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Choice identifier.
    pub id: Uuid,
    /// Owning story.
    pub story_id: Uuid,
    /// Node the choice is offered on.
    pub source_node_id: Uuid,
    /// Node the choice leads to.
    pub target_node_id: Uuid,
    /// Reader-facing label.
    pub text: String,
    /// Display order among the source node's choices.
    pub order: i32,
    /// Opaque payload carried through snapshots unchanged.
    pub conditions: serde_json::Value,
}

/// A node together with its outgoing choices, ordered by `order`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeWithChoices {
    /// The node.
    #[serde(flatten)]
    pub node: Node,
    /// Outgoing choices.
    pub choices: Vec<Choice>,
}

/// Splits nodes-with-choices into the flat lists the validator consumes.
#[must_use]
pub fn flatten(nodes: &[NodeWithChoices]) -> (Vec<Node>, Vec<Choice>) {
    let flat_nodes = nodes.iter().map(|n| n.node.clone()).collect();
    let flat_choices = nodes
        .iter()
        .flat_map(|n| n.choices.iter().cloned())
        .collect();
    (flat_nodes, flat_choices)
}
