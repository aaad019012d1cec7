//! Test repositories — failing storage doubles.

use async_trait::async_trait;
use storyforge_core::error::DomainError;
use storyforge_core::graph::{Choice, Node, NodeWithChoices};
use storyforge_core::repository::{NodeRepository, StoryRepository, VersionRepository};
use storyforge_core::story::Story;
use storyforge_core::version::StoryVersion;
use uuid::Uuid;

fn refused() -> DomainError {
    DomainError::Persistence("connection refused".into())
}

/// A store whose every operation fails with a persistence error. Useful for
/// testing error-handling paths.
#[derive(Debug, Default)]
pub struct FailingStoryStore;

#[async_trait]
impl StoryRepository for FailingStoryStore {
    async fn find_story(&self, _story_id: Uuid) -> Result<Option<Story>, DomainError> {
        Err(refused())
    }

    async fn insert_story(&self, _story: &Story) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn update_story(&self, _story: &Story, _expected: i64) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn commit_publication(
        &self,
        _story: &Story,
        _expected_revision: i64,
        _version: &StoryVersion,
    ) -> Result<(), DomainError> {
        Err(refused())
    }
}

#[async_trait]
impl NodeRepository for FailingStoryStore {
    async fn list_nodes_with_choices(
        &self,
        _story_id: Uuid,
    ) -> Result<Vec<NodeWithChoices>, DomainError> {
        Err(refused())
    }

    async fn find_node(&self, _node_id: Uuid) -> Result<Option<Node>, DomainError> {
        Err(refused())
    }

    async fn insert_node(&self, _node: &Node) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn update_node(&self, _node: &Node) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn delete_node(&self, _node_id: Uuid) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn find_choice(&self, _choice_id: Uuid) -> Result<Option<Choice>, DomainError> {
        Err(refused())
    }

    async fn insert_choice(&self, _choice: &Choice) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn update_choice(&self, _choice: &Choice) -> Result<(), DomainError> {
        Err(refused())
    }

    async fn delete_choice(&self, _choice_id: Uuid) -> Result<(), DomainError> {
        Err(refused())
    }
}

#[async_trait]
impl VersionRepository for FailingStoryStore {
    async fn latest_version(&self, _story_id: Uuid) -> Result<Option<StoryVersion>, DomainError> {
        Err(refused())
    }

    async fn find_version(
        &self,
        _story_id: Uuid,
        _version_number: i32,
    ) -> Result<Option<StoryVersion>, DomainError> {
        Err(refused())
    }

    async fn list_versions(&self, _story_id: Uuid) -> Result<Vec<StoryVersion>, DomainError> {
        Err(refused())
    }

    async fn create_version(&self, _version: &StoryVersion) -> Result<(), DomainError> {
        Err(refused())
    }
}

/// Wraps a working store and fails only `commit_publication`, leaving the
/// inner store untouched. Used to check that a failed publish rolls back.
#[derive(Debug)]
pub struct FailOnCommit<S>(pub S);

#[async_trait]
impl<S: StoryRepository> StoryRepository for FailOnCommit<S> {
    async fn find_story(&self, story_id: Uuid) -> Result<Option<Story>, DomainError> {
        self.0.find_story(story_id).await
    }

    async fn insert_story(&self, story: &Story) -> Result<(), DomainError> {
        self.0.insert_story(story).await
    }

    async fn update_story(&self, story: &Story, expected: i64) -> Result<(), DomainError> {
        self.0.update_story(story, expected).await
    }

    async fn commit_publication(
        &self,
        _story: &Story,
        _expected_revision: i64,
        _version: &StoryVersion,
    ) -> Result<(), DomainError> {
        Err(DomainError::Persistence(
            "transaction aborted mid-commit".into(),
        ))
    }
}

#[async_trait]
impl<S: NodeRepository> NodeRepository for FailOnCommit<S> {
    async fn list_nodes_with_choices(
        &self,
        story_id: Uuid,
    ) -> Result<Vec<NodeWithChoices>, DomainError> {
        self.0.list_nodes_with_choices(story_id).await
    }

    async fn find_node(&self, node_id: Uuid) -> Result<Option<Node>, DomainError> {
        self.0.find_node(node_id).await
    }

    async fn insert_node(&self, node: &Node) -> Result<(), DomainError> {
        self.0.insert_node(node).await
    }

    async fn update_node(&self, node: &Node) -> Result<(), DomainError> {
        self.0.update_node(node).await
    }

    async fn delete_node(&self, node_id: Uuid) -> Result<(), DomainError> {
        self.0.delete_node(node_id).await
    }

    async fn find_choice(&self, choice_id: Uuid) -> Result<Option<Choice>, DomainError> {
        self.0.find_choice(choice_id).await
    }

    async fn insert_choice(&self, choice: &Choice) -> Result<(), DomainError> {
        self.0.insert_choice(choice).await
    }

    async fn update_choice(&self, choice: &Choice) -> Result<(), DomainError> {
        self.0.update_choice(choice).await
    }

    async fn delete_choice(&self, choice_id: Uuid) -> Result<(), DomainError> {
        self.0.delete_choice(choice_id).await
    }
}

#[async_trait]
impl<S: VersionRepository> VersionRepository for FailOnCommit<S> {
    async fn latest_version(&self, story_id: Uuid) -> Result<Option<StoryVersion>, DomainError> {
        self.0.latest_version(story_id).await
    }

    async fn find_version(
        &self,
        story_id: Uuid,
        version_number: i32,
    ) -> Result<Option<StoryVersion>, DomainError> {
        self.0.find_version(story_id, version_number).await
    }

    async fn list_versions(&self, story_id: Uuid) -> Result<Vec<StoryVersion>, DomainError> {
        self.0.list_versions(story_id).await
    }

    async fn create_version(&self, version: &StoryVersion) -> Result<(), DomainError> {
        self.0.create_version(version).await
    }
}
