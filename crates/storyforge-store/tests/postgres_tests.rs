//! Integration tests for `PgStoryStore`.
//!
//! These need a PostgreSQL instance reachable through `DATABASE_URL`; run
//! them with `cargo test -- --ignored`.

use sqlx::PgPool;
use storyforge_core::error::DomainError;
use storyforge_core::repository::{NodeRepository, StoryRepository, VersionRepository};
use storyforge_core::story::{DraftState, Story, StoryDetails, StoryStatus};
use storyforge_core::version::{StorySnapshot, StoryVersion};
use storyforge_store::PgStoryStore;
use storyforge_test_support::{GraphFixture, fixed_now};
use uuid::Uuid;

fn make_story(id: Uuid) -> Story {
    Story::new(
        id,
        StoryDetails {
            title: "Harbour Lights".to_owned(),
            description: Some("A night at the docks".to_owned()),
            cover_image: None,
            genres: vec!["noir".to_owned()],
            difficulty: Some("easy".to_owned()),
        },
        serde_json::Map::new(),
        fixed_now(),
    )
}

fn make_version(story: &Story, version_number: i32) -> StoryVersion {
    let snapshot = StorySnapshot {
        story: story.clone(),
        nodes: Vec::new(),
    };
    StoryVersion::capture(Uuid::new_v4(), version_number, &snapshot, fixed_now(), None).unwrap()
}

async fn seed_graph(store: &PgStoryStore, graph: &GraphFixture) {
    store
        .insert_story(&make_story(graph.story_id()))
        .await
        .unwrap();
    for node in graph.nodes() {
        store.insert_node(node).await.unwrap();
    }
    for choice in graph.choices() {
        store.insert_choice(choice).await.unwrap();
    }
}

// --- stories ---

#[ignore = "requires a PostgreSQL DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_story_round_trip_preserves_draft_state(pool: PgPool) {
    let store = PgStoryStore::new(pool);
    let mut story = make_story(Uuid::new_v4());
    story.draft_state = DraftState::EditingVersion { draft_version: 4 };

    store.insert_story(&story).await.unwrap();

    let loaded = store.find_story(story.id).await.unwrap().unwrap();
    assert_eq!(loaded, story);
}

#[ignore = "requires a PostgreSQL DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_update_story_with_stale_revision_is_a_concurrency_conflict(pool: PgPool) {
    let store = PgStoryStore::new(pool);
    let story = make_story(Uuid::new_v4());
    store.insert_story(&story).await.unwrap();

    let mut edited = story.clone();
    edited.revision = 3;
    let result = store.update_story(&edited, 2).await;

    match result {
        Err(DomainError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 0);
        }
        other => panic!("expected ConcurrencyConflict, got {other:?}"),
    }
}

// --- graph ---

#[ignore = "requires a PostgreSQL DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_node_cascades_to_choices(pool: PgPool) {
    let store = PgStoryStore::new(pool);
    let graph = GraphFixture::new()
        .start("A")
        .node("B")
        .ending("C")
        .choice("A", "B")
        .choice("B", "C");
    seed_graph(&store, &graph).await;

    store.delete_node(graph.id("B")).await.unwrap();

    let nodes = store
        .list_nodes_with_choices(graph.story_id())
        .await
        .unwrap();
    assert_eq!(nodes.len(), 2);
    assert!(nodes.iter().all(|n| n.choices.is_empty()));
}

#[ignore = "requires a PostgreSQL DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_second_start_node_is_rejected_by_unique_index(pool: PgPool) {
    let store = PgStoryStore::new(pool);
    let graph = GraphFixture::new().start("A").start("B");
    store
        .insert_story(&make_story(graph.story_id()))
        .await
        .unwrap();
    store.insert_node(&graph.nodes()[0]).await.unwrap();

    let result = store.insert_node(&graph.nodes()[1]).await;

    assert!(matches!(result, Err(DomainError::Conflict(_))));
}

// --- versions ---

#[ignore = "requires a PostgreSQL DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_commit_publication_persists_story_and_version(pool: PgPool) {
    let store = PgStoryStore::new(pool);
    let story = make_story(Uuid::new_v4());
    store.insert_story(&story).await.unwrap();
    let mut published = story.clone();
    published.status = StoryStatus::Published;
    published.current_version = Some(1);
    published.published_at = Some(fixed_now());
    published.revision = 1;
    let version = make_version(&published, 1);

    store
        .commit_publication(&published, 0, &version)
        .await
        .unwrap();

    let loaded = store.find_story(story.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, StoryStatus::Published);
    let latest = store.latest_version(story.id).await.unwrap().unwrap();
    assert_eq!(latest.snapshot_json, version.snapshot_json);
    assert!(latest.verify_integrity());
}

#[ignore = "requires a PostgreSQL DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_commit_publication_rolls_back_story_on_duplicate_version(pool: PgPool) {
    let store = PgStoryStore::new(pool);
    let story = make_story(Uuid::new_v4());
    store.insert_story(&story).await.unwrap();
    store.create_version(&make_version(&story, 1)).await.unwrap();
    let mut published = story.clone();
    published.status = StoryStatus::Published;
    published.revision = 1;

    let result = store
        .commit_publication(&published, 0, &make_version(&published, 1))
        .await;

    assert!(matches!(result, Err(DomainError::Conflict(_))));
    let loaded = store.find_story(story.id).await.unwrap().unwrap();
    assert_eq!(loaded.status, StoryStatus::Draft);
    assert_eq!(loaded.revision, 0);
}

#[ignore = "requires a PostgreSQL DATABASE_URL"]
#[sqlx::test(migrations = "../../migrations")]
async fn test_list_versions_orders_highest_first(pool: PgPool) {
    let store = PgStoryStore::new(pool);
    let story = make_story(Uuid::new_v4());
    store.insert_story(&story).await.unwrap();
    for n in 1..=3 {
        store.create_version(&make_version(&story, n)).await.unwrap();
    }

    let numbers: Vec<i32> = store
        .list_versions(story.id)
        .await
        .unwrap()
        .iter()
        .map(|v| v.version_number)
        .collect();

    assert_eq!(numbers, vec![3, 2, 1]);
    assert!(store.find_version(story.id, 4).await.unwrap().is_none());
}
