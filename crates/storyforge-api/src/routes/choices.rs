//! Routes for choices between nodes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use storyforge_authoring::application::command_handlers;
use storyforge_authoring::domain::commands;
use storyforge_authoring::domain::editing::ChoicePatch;
use storyforge_core::graph::Choice;
use tracing::instrument;
use uuid::Uuid;

use super::log_command;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /stories/{story_id}/choices.
#[derive(Debug, Deserialize)]
pub struct CreateChoiceRequest {
    /// Node the choice is offered on.
    pub source_node_id: Uuid,
    /// Node the choice leads to.
    pub target_node_id: Uuid,
    /// Reader-facing label.
    pub text: String,
    /// Display order; appended when absent.
    #[serde(default)]
    pub order: Option<i32>,
    /// Opaque payload.
    #[serde(default)]
    pub conditions: serde_json::Value,
}

/// POST /stories/{story_id}/choices
#[instrument(skip(state, request))]
async fn create_choice(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Json(request): Json<CreateChoiceRequest>,
) -> Result<(StatusCode, Json<Choice>), ApiError> {
    let command = commands::CreateChoice {
        correlation_id: Uuid::new_v4(),
        story_id,
        source_node_id: request.source_node_id,
        target_node_id: request.target_node_id,
        text: request.text,
        order: request.order,
        conditions: request.conditions,
    };
    log_command(&command);

    let choice =
        command_handlers::handle_create_choice(&command, &*state.stories, &*state.nodes).await?;
    Ok((StatusCode::CREATED, Json(choice)))
}

/// PATCH /choices/{choice_id}
#[instrument(skip(state, changes))]
async fn update_choice(
    State(state): State<AppState>,
    Path(choice_id): Path<Uuid>,
    Json(changes): Json<ChoicePatch>,
) -> Result<Json<Choice>, ApiError> {
    let command = commands::UpdateChoice {
        correlation_id: Uuid::new_v4(),
        choice_id,
        patch: changes,
    };
    log_command(&command);

    let choice =
        command_handlers::handle_update_choice(&command, &*state.stories, &*state.nodes).await?;
    Ok(Json(choice))
}

/// DELETE /choices/{choice_id}
#[instrument(skip(state))]
async fn delete_choice(
    State(state): State<AppState>,
    Path(choice_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteChoice {
        correlation_id: Uuid::new_v4(),
        choice_id,
    };
    log_command(&command);

    command_handlers::handle_delete_choice(&command, &*state.stories, &*state.nodes).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for choices.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories/{story_id}/choices", post(create_choice))
        .route(
            "/choices/{choice_id}",
            patch(update_choice).delete(delete_choice),
        )
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use storyforge_core::repository::{NodeRepository, StoryRepository};
    use storyforge_core::story::{Metadata, Story, StoryDetails};
    use storyforge_test_support::{GraphFixture, fixed_now};

    use super::*;
    use crate::routes::testing::{memory_state, send};

    async fn seeded(graph: &GraphFixture) -> AppState {
        let (state, store) = memory_state();
        let story = Story::new(
            graph.story_id(),
            StoryDetails {
                title: "Canal Locks".to_owned(),
                description: None,
                cover_image: None,
                genres: Vec::new(),
                difficulty: None,
            },
            Metadata::new(),
            fixed_now(),
        );
        store.insert_story(&story).await.unwrap();
        for node in graph.nodes() {
            store.insert_node(node).await.unwrap();
        }
        state
    }

    #[tokio::test]
    async fn test_create_choice_assigns_next_order() {
        // Arrange
        let graph = GraphFixture::new().start("A").ending("B");
        let state = seeded(&graph).await;
        let uri = format!("/stories/{}/choices", graph.story_id());
        let body = json!({
            "source_node_id": graph.id("A"),
            "target_node_id": graph.id("B"),
            "text": "Open the sluice",
        });

        // Act
        let (first_status, first) =
            send(router().with_state(state.clone()), "POST", &uri, Some(&body)).await;
        let (_, second) = send(router().with_state(state), "POST", &uri, Some(&body)).await;

        // Assert
        assert_eq!(first_status, StatusCode::CREATED);
        assert_eq!(first["order"], 0);
        assert_eq!(second["order"], 1);
        assert_eq!(first["conditions"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_create_choice_to_missing_node_returns_404() {
        let graph = GraphFixture::new().start("A");
        let state = seeded(&graph).await;
        let body = json!({
            "source_node_id": graph.id("A"),
            "target_node_id": Uuid::new_v4(),
            "text": "Jump",
        });

        let (status, json) = send(
            router().with_state(state),
            "POST",
            &format!("/stories/{}/choices", graph.story_id()),
            Some(&body),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn test_update_then_delete_choice() {
        // Arrange
        let graph = GraphFixture::new().start("A").ending("B");
        let state = seeded(&graph).await;
        let (_, created) = send(
            router().with_state(state.clone()),
            "POST",
            &format!("/stories/{}/choices", graph.story_id()),
            Some(&json!({
                "source_node_id": graph.id("A"),
                "target_node_id": graph.id("B"),
                "text": "Wait",
            })),
        )
        .await;
        let uri = format!("/choices/{}", created["id"].as_str().unwrap());

        // Act
        let (patched, json) = send(
            router().with_state(state.clone()),
            "PATCH",
            &uri,
            Some(&json!({ "text": "Wait for the tide", "order": 4 })),
        )
        .await;
        let (deleted, _) = send(router().with_state(state.clone()), "DELETE", &uri, None).await;

        // Assert
        assert_eq!(patched, StatusCode::OK);
        assert_eq!(json["text"], "Wait for the tide");
        assert_eq!(json["order"], 4);
        assert_eq!(deleted, StatusCode::NO_CONTENT);
        let remaining = state
            .nodes
            .list_nodes_with_choices(graph.story_id())
            .await
            .unwrap();
        assert!(remaining.iter().all(|n| n.choices.is_empty()));
    }
}
