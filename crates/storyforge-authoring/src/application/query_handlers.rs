//! Query handlers for the Authoring context.

use storyforge_core::error::{DomainError, EntityKind};
use storyforge_core::graph::NodeWithChoices;
use storyforge_core::repository::{NodeRepository, StoryRepository};
use storyforge_core::story::Story;
use uuid::Uuid;

/// Retrieves a story by ID.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
pub async fn get_story(story_id: Uuid, stories: &dyn StoryRepository) -> Result<Story, DomainError> {
    stories
        .find_story(story_id)
        .await?
        .ok_or_else(|| DomainError::not_found(EntityKind::Story, story_id))
}

/// Lists a story's nodes in creation order, each with its choices in
/// display order.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the story does not exist.
pub async fn list_nodes_with_choices(
    story_id: Uuid,
    stories: &dyn StoryRepository,
    nodes: &dyn NodeRepository,
) -> Result<Vec<NodeWithChoices>, DomainError> {
    get_story(story_id, stories).await?;
    nodes.list_nodes_with_choices(story_id).await
}

#[cfg(test)]
mod tests {
    use storyforge_store::InMemoryStoryStore;
    use storyforge_test_support::{FailingStoryStore, GraphFixture, fixed_now};

    use super::*;
    use storyforge_core::story::StoryDetails;

    #[tokio::test]
    async fn test_list_nodes_with_choices_returns_graph() {
        // Arrange
        let graph = GraphFixture::new()
            .start("A")
            .node("B")
            .ending("C")
            .choice("A", "B")
            .choice("A", "C")
            .choice("B", "C");
        let store = InMemoryStoryStore::new();
        let story = Story::new(
            graph.story_id(),
            StoryDetails {
                title: "Three Rooms".to_owned(),
                description: None,
                cover_image: None,
                genres: Vec::new(),
                difficulty: None,
            },
            serde_json::Map::new(),
            fixed_now(),
        );
        store.insert_story(&story).await.unwrap();
        for node in graph.nodes() {
            store.insert_node(node).await.unwrap();
        }
        for choice in graph.choices() {
            store.insert_choice(choice).await.unwrap();
        }

        // Act
        let listed = list_nodes_with_choices(story.id, &store, &store)
            .await
            .unwrap();

        // Assert
        assert_eq!(listed, graph.nodes_with_choices());
        assert_eq!(get_story(story.id, &store).await.unwrap(), story);
    }

    #[tokio::test]
    async fn test_get_story_returns_not_found_for_missing_story() {
        let store = InMemoryStoryStore::new();
        let story_id = Uuid::new_v4();

        let result = get_story(story_id, &store).await;

        match result {
            Err(DomainError::NotFound { entity, id }) => {
                assert_eq!(entity, EntityKind::Story);
                assert_eq!(id, story_id.to_string());
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_nodes_propagates_persistence_errors() {
        let result = list_nodes_with_choices(Uuid::new_v4(), &FailingStoryStore, &FailingStoryStore).await;

        assert!(matches!(result, Err(DomainError::Persistence(_))));
    }
}
