//! Storage ports.
//!
//! Adapters implement these traits; application handlers only ever see
//! `&dyn` references to them.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DomainError;
use crate::graph::{Choice, Node, NodeWithChoices};
use crate::story::Story;
use crate::version::StoryVersion;

/// Story records plus the atomic publication commit.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Loads a story, or `None` if it does not exist.
    async fn find_story(&self, story_id: Uuid) -> Result<Option<Story>, DomainError>;

    /// Inserts a new story.
    async fn insert_story(&self, story: &Story) -> Result<(), DomainError>;

    /// Replaces a story if its stored revision equals `expected_revision`.
    ///
    /// The caller passes the story with its revision already bumped.
    async fn update_story(&self, story: &Story, expected_revision: i64)
    -> Result<(), DomainError>;

    /// Updates the story and appends the version as one atomic unit.
    ///
    /// Fails with `ConcurrencyConflict` on a stale revision and `Conflict` on
    /// a duplicate `(story_id, version_number)`. On any error neither write
    /// is visible.
    async fn commit_publication(
        &self,
        story: &Story,
        expected_revision: i64,
        version: &StoryVersion,
    ) -> Result<(), DomainError>;
}

/// Node and choice persistence.
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// All nodes of a story in creation order, each with its outgoing
    /// choices ordered by `order`.
    async fn list_nodes_with_choices(
        &self,
        story_id: Uuid,
    ) -> Result<Vec<NodeWithChoices>, DomainError>;

    /// Loads a node.
    async fn find_node(&self, node_id: Uuid) -> Result<Option<Node>, DomainError>;

    /// Inserts a node.
    async fn insert_node(&self, node: &Node) -> Result<(), DomainError>;

    /// Replaces a node.
    async fn update_node(&self, node: &Node) -> Result<(), DomainError>;

    /// Deletes a node and every choice that references it.
    async fn delete_node(&self, node_id: Uuid) -> Result<(), DomainError>;

    /// Loads a choice.
    async fn find_choice(&self, choice_id: Uuid) -> Result<Option<Choice>, DomainError>;

    /// Inserts a choice.
    async fn insert_choice(&self, choice: &Choice) -> Result<(), DomainError>;

    /// Replaces a choice.
    async fn update_choice(&self, choice: &Choice) -> Result<(), DomainError>;

    /// Deletes a choice.
    async fn delete_choice(&self, choice_id: Uuid) -> Result<(), DomainError>;
}

/// The write-once version ledger.
#[async_trait]
pub trait VersionRepository: Send + Sync {
    /// Highest-numbered version of a story, if any.
    async fn latest_version(&self, story_id: Uuid) -> Result<Option<StoryVersion>, DomainError>;

    /// A specific version of a story.
    async fn find_version(
        &self,
        story_id: Uuid,
        version_number: i32,
    ) -> Result<Option<StoryVersion>, DomainError>;

    /// All versions of a story, highest version number first.
    async fn list_versions(&self, story_id: Uuid) -> Result<Vec<StoryVersion>, DomainError>;

    /// Appends a version. Rejects a duplicate `(story_id, version_number)`
    /// with `Conflict`.
    async fn create_version(&self, version: &StoryVersion) -> Result<(), DomainError>;
}
