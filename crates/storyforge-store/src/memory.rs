//! In-memory story store.
//!
//! Every table lives behind a single mutex, so `commit_publication` checks
//! and applies both writes while holding one lock and is trivially atomic.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use storyforge_core::error::{DomainError, EntityKind};
use storyforge_core::graph::{Choice, Node, NodeWithChoices};
use storyforge_core::repository::{NodeRepository, StoryRepository, VersionRepository};
use storyforge_core::story::Story;
use storyforge_core::version::StoryVersion;
use uuid::Uuid;

#[derive(Debug, Default)]
struct Tables {
    stories: HashMap<Uuid, Story>,
    /// Insertion order is creation order.
    nodes: Vec<Node>,
    choices: Vec<Choice>,
    versions: BTreeMap<(Uuid, i32), StoryVersion>,
}

impl Tables {
    fn check_revision(&self, story: &Story, expected: i64) -> Result<(), DomainError> {
        let stored = self
            .stories
            .get(&story.id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Story, story.id))?;
        if stored.revision != expected {
            return Err(DomainError::ConcurrencyConflict {
                story_id: story.id,
                expected,
                actual: stored.revision,
            });
        }
        Ok(())
    }

    /// A story has at most one start node.
    fn check_single_start(&self, node: &Node) -> Result<(), DomainError> {
        let taken = node.is_start
            && self
                .nodes
                .iter()
                .any(|n| n.story_id == node.story_id && n.is_start && n.id != node.id);
        if taken {
            return Err(DomainError::Conflict(format!(
                "story {} already has a start node",
                node.story_id
            )));
        }
        Ok(())
    }

    fn check_version_free(&self, version: &StoryVersion) -> Result<(), DomainError> {
        if self
            .versions
            .contains_key(&(version.story_id, version.version_number))
        {
            return Err(DomainError::Conflict(format!(
                "story {} already has version {}",
                version.story_id, version.version_number
            )));
        }
        Ok(())
    }
}

/// Process-local store implementing every storage port.
#[derive(Debug, Default)]
pub struct InMemoryStoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, DomainError> {
        self.tables
            .lock()
            .map_err(|_| DomainError::Persistence("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl StoryRepository for InMemoryStoryStore {
    async fn find_story(&self, story_id: Uuid) -> Result<Option<Story>, DomainError> {
        Ok(self.tables()?.stories.get(&story_id).cloned())
    }

    async fn insert_story(&self, story: &Story) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if tables.stories.contains_key(&story.id) {
            return Err(DomainError::Conflict(format!(
                "story {} already exists",
                story.id
            )));
        }
        tables.stories.insert(story.id, story.clone());
        Ok(())
    }

    async fn update_story(
        &self,
        story: &Story,
        expected_revision: i64,
    ) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        tables.check_revision(story, expected_revision)?;
        tables.stories.insert(story.id, story.clone());
        Ok(())
    }

    async fn commit_publication(
        &self,
        story: &Story,
        expected_revision: i64,
        version: &StoryVersion,
    ) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        tables.check_revision(story, expected_revision)?;
        tables.check_version_free(version)?;
        tables.stories.insert(story.id, story.clone());
        tables
            .versions
            .insert((version.story_id, version.version_number), version.clone());
        Ok(())
    }
}

#[async_trait]
impl NodeRepository for InMemoryStoryStore {
    async fn list_nodes_with_choices(
        &self,
        story_id: Uuid,
    ) -> Result<Vec<NodeWithChoices>, DomainError> {
        let tables = self.tables()?;
        let mut choices: Vec<&Choice> = tables
            .choices
            .iter()
            .filter(|c| c.story_id == story_id)
            .collect();
        // Stable sort keeps creation order among equal `order` values.
        choices.sort_by_key(|c| c.order);

        Ok(tables
            .nodes
            .iter()
            .filter(|n| n.story_id == story_id)
            .map(|node| NodeWithChoices {
                node: node.clone(),
                choices: choices
                    .iter()
                    .filter(|c| c.source_node_id == node.id)
                    .map(|c| (*c).clone())
                    .collect(),
            })
            .collect())
    }

    async fn find_node(&self, node_id: Uuid) -> Result<Option<Node>, DomainError> {
        Ok(self
            .tables()?
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .cloned())
    }

    async fn insert_node(&self, node: &Node) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        if !tables.stories.contains_key(&node.story_id) {
            return Err(DomainError::not_found(EntityKind::Story, node.story_id));
        }
        if tables.nodes.iter().any(|n| n.id == node.id) {
            return Err(DomainError::Conflict(format!("node {} already exists", node.id)));
        }
        tables.check_single_start(node)?;
        tables.nodes.push(node.clone());
        Ok(())
    }

    async fn update_node(&self, node: &Node) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        tables.check_single_start(node)?;
        let slot = tables
            .nodes
            .iter_mut()
            .find(|n| n.id == node.id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Node, node.id))?;
        *slot = node.clone();
        Ok(())
    }

    async fn delete_node(&self, node_id: Uuid) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        let before = tables.nodes.len();
        tables.nodes.retain(|n| n.id != node_id);
        if tables.nodes.len() == before {
            return Err(DomainError::not_found(EntityKind::Node, node_id));
        }
        tables
            .choices
            .retain(|c| c.source_node_id != node_id && c.target_node_id != node_id);
        Ok(())
    }

    async fn find_choice(&self, choice_id: Uuid) -> Result<Option<Choice>, DomainError> {
        Ok(self
            .tables()?
            .choices
            .iter()
            .find(|c| c.id == choice_id)
            .cloned())
    }

    async fn insert_choice(&self, choice: &Choice) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        for node_id in [choice.source_node_id, choice.target_node_id] {
            if !tables.nodes.iter().any(|n| n.id == node_id) {
                return Err(DomainError::not_found(EntityKind::Node, node_id));
            }
        }
        if tables.choices.iter().any(|c| c.id == choice.id) {
            return Err(DomainError::Conflict(format!(
                "choice {} already exists",
                choice.id
            )));
        }
        tables.choices.push(choice.clone());
        Ok(())
    }

    async fn update_choice(&self, choice: &Choice) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        let slot = tables
            .choices
            .iter_mut()
            .find(|c| c.id == choice.id)
            .ok_or_else(|| DomainError::not_found(EntityKind::Choice, choice.id))?;
        *slot = choice.clone();
        Ok(())
    }

    async fn delete_choice(&self, choice_id: Uuid) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        let before = tables.choices.len();
        tables.choices.retain(|c| c.id != choice_id);
        if tables.choices.len() == before {
            return Err(DomainError::not_found(EntityKind::Choice, choice_id));
        }
        Ok(())
    }
}

#[async_trait]
impl VersionRepository for InMemoryStoryStore {
    async fn latest_version(&self, story_id: Uuid) -> Result<Option<StoryVersion>, DomainError> {
        Ok(self
            .tables()?
            .versions
            .range((story_id, i32::MIN)..=(story_id, i32::MAX))
            .next_back()
            .map(|(_, v)| v.clone()))
    }

    async fn find_version(
        &self,
        story_id: Uuid,
        version_number: i32,
    ) -> Result<Option<StoryVersion>, DomainError> {
        Ok(self
            .tables()?
            .versions
            .get(&(story_id, version_number))
            .cloned())
    }

    async fn list_versions(&self, story_id: Uuid) -> Result<Vec<StoryVersion>, DomainError> {
        Ok(self
            .tables()?
            .versions
            .range((story_id, i32::MIN)..=(story_id, i32::MAX))
            .rev()
            .map(|(_, v)| v.clone())
            .collect())
    }

    async fn create_version(&self, version: &StoryVersion) -> Result<(), DomainError> {
        let mut tables = self.tables()?;
        tables.check_version_free(version)?;
        tables
            .versions
            .insert((version.story_id, version.version_number), version.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyforge_core::story::{StoryDetails, StoryStatus};
    use storyforge_core::version::StorySnapshot;
    use storyforge_test_support::{GraphFixture, fixed_now};

    fn draft_story(id: Uuid) -> Story {
        Story::new(
            id,
            StoryDetails {
                title: "Tides".to_owned(),
                description: None,
                cover_image: None,
                genres: Vec::new(),
                difficulty: None,
            },
            serde_json::Map::new(),
            fixed_now(),
        )
    }

    fn version_of(story: &Story, version_number: i32) -> StoryVersion {
        let snapshot = StorySnapshot {
            story: story.clone(),
            nodes: Vec::new(),
        };
        StoryVersion::capture(Uuid::new_v4(), version_number, &snapshot, fixed_now(), None)
            .unwrap()
    }

    async fn seeded(graph: &GraphFixture) -> InMemoryStoryStore {
        let store = InMemoryStoryStore::new();
        store
            .insert_story(&draft_story(graph.story_id()))
            .await
            .unwrap();
        for node in graph.nodes() {
            store.insert_node(node).await.unwrap();
        }
        for choice in graph.choices() {
            store.insert_choice(choice).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_list_nodes_with_choices_groups_by_source_in_creation_order() {
        // Arrange
        let graph = GraphFixture::new()
            .start("A")
            .node("B")
            .ending("C")
            .choice("A", "B")
            .choice("A", "C")
            .choice("B", "C");
        let store = seeded(&graph).await;

        // Act
        let nodes = store
            .list_nodes_with_choices(graph.story_id())
            .await
            .unwrap();

        // Assert
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].node.id, graph.id("A"));
        assert_eq!(nodes[0].choices.len(), 2);
        assert_eq!(nodes[0].choices[0].target_node_id, graph.id("B"));
        assert_eq!(nodes[1].choices.len(), 1);
        assert!(nodes[2].choices.is_empty());
    }

    #[tokio::test]
    async fn test_delete_node_cascades_to_referencing_choices() {
        let graph = GraphFixture::new()
            .start("A")
            .node("B")
            .ending("C")
            .choice("A", "B")
            .choice("B", "C")
            .choice("A", "C");
        let store = seeded(&graph).await;

        store.delete_node(graph.id("B")).await.unwrap();

        let nodes = store
            .list_nodes_with_choices(graph.story_id())
            .await
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].choices.len(), 1);
        assert_eq!(nodes[0].choices[0].target_node_id, graph.id("C"));
    }

    #[tokio::test]
    async fn test_second_start_node_is_rejected_on_insert_and_update() {
        // Arrange
        let graph = GraphFixture::new().start("A").node("B");
        let store = seeded(&graph).await;
        let mut promoted = graph.nodes()[1].clone();
        promoted.is_start = true;
        let mut extra = graph.nodes()[0].clone();
        extra.id = Uuid::new_v4();

        // Act
        let updated = store.update_node(&promoted).await;
        let inserted = store.insert_node(&extra).await;

        // Assert
        for result in [updated, inserted] {
            match result {
                Err(DomainError::Conflict(msg)) => {
                    assert!(msg.contains("already has a start node"));
                }
                other => panic!("expected Conflict, got {other:?}"),
            }
        }
        let nodes = store
            .list_nodes_with_choices(graph.story_id())
            .await
            .unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(!nodes[1].node.is_start);
    }

    #[tokio::test]
    async fn test_start_node_may_be_rewritten_in_place() {
        let graph = GraphFixture::new().start("A").node("B");
        let store = seeded(&graph).await;
        let mut start = graph.nodes()[0].clone();
        start.title = "Harbour".to_owned();

        store.update_node(&start).await.unwrap();

        let stored = store.find_node(start.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Harbour");
        assert!(stored.is_start);
    }

    #[tokio::test]
    async fn test_update_story_rejects_stale_revision() {
        let story_id = Uuid::new_v4();
        let store = InMemoryStoryStore::new();
        store.insert_story(&draft_story(story_id)).await.unwrap();

        let mut edited = draft_story(story_id);
        edited.revision = 6;
        let result = store.update_story(&edited, 5).await;

        match result {
            Err(DomainError::ConcurrencyConflict {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 0);
            }
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_commit_publication_applies_story_and_version_together() {
        // Arrange
        let story_id = Uuid::new_v4();
        let store = InMemoryStoryStore::new();
        store.insert_story(&draft_story(story_id)).await.unwrap();
        let mut published = draft_story(story_id);
        published.status = StoryStatus::Published;
        published.current_version = Some(1);
        published.revision = 1;
        let version = version_of(&published, 1);

        // Act
        store
            .commit_publication(&published, 0, &version)
            .await
            .unwrap();

        // Assert
        let stored = store.find_story(story_id).await.unwrap().unwrap();
        assert_eq!(stored.status, StoryStatus::Published);
        assert_eq!(store.latest_version(story_id).await.unwrap(), Some(version));
    }

    #[tokio::test]
    async fn test_commit_publication_with_duplicate_version_changes_nothing() {
        // Arrange
        let story_id = Uuid::new_v4();
        let store = InMemoryStoryStore::new();
        let story = draft_story(story_id);
        store.insert_story(&story).await.unwrap();
        store.create_version(&version_of(&story, 1)).await.unwrap();
        let mut published = story.clone();
        published.status = StoryStatus::Published;
        published.revision = 1;

        // Act
        let result = store
            .commit_publication(&published, 0, &version_of(&published, 1))
            .await;

        // Assert
        assert!(matches!(result, Err(DomainError::Conflict(_))));
        let stored = store.find_story(story_id).await.unwrap().unwrap();
        assert_eq!(stored, story);
        assert_eq!(store.list_versions(story_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_versions_are_listed_highest_first_and_isolated_per_story() {
        let story_a = draft_story(Uuid::new_v4());
        let story_b = draft_story(Uuid::new_v4());
        let store = InMemoryStoryStore::new();
        for n in 1..=3 {
            store.create_version(&version_of(&story_a, n)).await.unwrap();
        }
        store.create_version(&version_of(&story_b, 7)).await.unwrap();

        let listed: Vec<i32> = store
            .list_versions(story_a.id)
            .await
            .unwrap()
            .iter()
            .map(|v| v.version_number)
            .collect();

        assert_eq!(listed, vec![3, 2, 1]);
        let latest = store.latest_version(story_a.id).await.unwrap().unwrap();
        assert_eq!(latest.version_number, 3);
        assert!(
            store
                .latest_version(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_insert_choice_requires_existing_nodes() {
        let graph = GraphFixture::new().start("A").ending("B").choice("A", "B");
        let store = InMemoryStoryStore::new();
        store
            .insert_story(&draft_story(graph.story_id()))
            .await
            .unwrap();
        store.insert_node(&graph.nodes()[0]).await.unwrap();

        let result = store.insert_choice(&graph.choices()[0]).await;

        match result {
            Err(DomainError::NotFound { entity, .. }) => assert_eq!(entity, EntityKind::Node),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
