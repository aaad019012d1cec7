//! Named story graph builder for tests.

use std::collections::HashMap;

use storyforge_core::graph::{Choice, Node, NodeWithChoices, Position};
use uuid::Uuid;

/// Builds a story graph whose nodes are referred to by short names.
///
/// ```ignore
/// let graph = GraphFixture::new().start("A").ending("B").choice("A", "B");
/// ```
#[derive(Debug, Clone)]
pub struct GraphFixture {
    story_id: Uuid,
    nodes: Vec<Node>,
    choices: Vec<Choice>,
    ids: HashMap<String, Uuid>,
}

impl Default for GraphFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphFixture {
    /// Starts an empty graph for a fresh story id.
    #[must_use]
    pub fn new() -> Self {
        Self::for_story(Uuid::new_v4())
    }

    /// Starts an empty graph owned by `story_id`.
    #[must_use]
    pub fn for_story(story_id: Uuid) -> Self {
        Self {
            story_id,
            nodes: Vec::new(),
            choices: Vec::new(),
            ids: HashMap::new(),
        }
    }

    fn push(mut self, name: &str, is_start: bool, is_ending: bool) -> Self {
        let id = Uuid::new_v4();
        self.ids.insert(name.to_owned(), id);
        self.nodes.push(Node {
            id,
            story_id: self.story_id,
            title: name.to_owned(),
            content: format!("Content of {name}"),
            is_start,
            is_ending,
            position: Position::default(),
            metadata: serde_json::Map::new(),
        });
        self
    }

    /// Adds a plain node.
    #[must_use]
    pub fn node(self, name: &str) -> Self {
        self.push(name, false, false)
    }

    /// Adds a start node.
    #[must_use]
    pub fn start(self, name: &str) -> Self {
        self.push(name, true, false)
    }

    /// Adds an ending node.
    #[must_use]
    pub fn ending(self, name: &str) -> Self {
        self.push(name, false, true)
    }

    /// Adds a node that is both start and ending.
    #[must_use]
    pub fn start_ending(self, name: &str) -> Self {
        self.push(name, true, true)
    }

    /// Adds a choice between two named nodes.
    ///
    /// # Panics
    ///
    /// Panics if either name was not added first.
    #[must_use]
    pub fn choice(mut self, from: &str, to: &str) -> Self {
        let source_node_id = self.id(from);
        let target_node_id = self.id(to);
        let order = i32::try_from(
            self.choices
                .iter()
                .filter(|c| c.source_node_id == source_node_id)
                .count(),
        )
        .unwrap();
        self.choices.push(Choice {
            id: Uuid::new_v4(),
            story_id: self.story_id,
            source_node_id,
            target_node_id,
            text: format!("Go to {to}"),
            order,
            conditions: serde_json::Value::Null,
        });
        self
    }

    /// The owning story id.
    #[must_use]
    pub fn story_id(&self) -> Uuid {
        self.story_id
    }

    /// Id of a named node.
    ///
    /// # Panics
    ///
    /// Panics if the name is unknown.
    #[must_use]
    pub fn id(&self, name: &str) -> Uuid {
        *self
            .ids
            .get(name)
            .unwrap_or_else(|| panic!("unknown fixture node {name}"))
    }

    /// Ids of several named nodes, in the given order.
    #[must_use]
    pub fn ids(&self, names: &[&str]) -> Vec<Uuid> {
        names.iter().map(|name| self.id(name)).collect()
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Choices in insertion order.
    #[must_use]
    pub fn choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Nodes with their outgoing choices, as a repository returns them.
    #[must_use]
    pub fn nodes_with_choices(&self) -> Vec<NodeWithChoices> {
        self.nodes
            .iter()
            .map(|node| NodeWithChoices {
                node: node.clone(),
                choices: self
                    .choices
                    .iter()
                    .filter(|c| c.source_node_id == node.id)
                    .cloned()
                    .collect(),
            })
            .collect()
    }
}
