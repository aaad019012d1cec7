//! Routes for story graph nodes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use storyforge_authoring::application::{command_handlers, query_handlers};
use storyforge_authoring::domain::commands;
use storyforge_authoring::domain::editing::NodePatch;
use storyforge_core::graph::{Node, NodeWithChoices, Position};
use storyforge_core::story::Metadata;
use tracing::instrument;
use uuid::Uuid;

use super::log_command;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /stories/{story_id}/nodes.
#[derive(Debug, Deserialize)]
pub struct CreateNodeRequest {
    /// Author-facing title.
    pub title: String,
    /// Content payload.
    #[serde(default)]
    pub content: String,
    /// Whether traversal begins here.
    #[serde(default)]
    pub is_start: bool,
    /// Whether this node ends the story.
    #[serde(default)]
    pub is_ending: bool,
    /// Editor layout.
    #[serde(default)]
    pub position: Position,
    /// Free-form extension fields.
    #[serde(default)]
    pub metadata: Metadata,
}

/// GET /stories/{story_id}/nodes
#[instrument(skip(state))]
async fn list_nodes(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<Vec<NodeWithChoices>>, ApiError> {
    let nodes =
        query_handlers::list_nodes_with_choices(story_id, &*state.stories, &*state.nodes).await?;
    Ok(Json(nodes))
}

/// POST /stories/{story_id}/nodes
#[instrument(skip(state, request))]
async fn create_node(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Json(request): Json<CreateNodeRequest>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    let command = commands::CreateNode {
        correlation_id: Uuid::new_v4(),
        story_id,
        title: request.title,
        content: request.content,
        is_start: request.is_start,
        is_ending: request.is_ending,
        position: request.position,
        metadata: request.metadata,
    };
    log_command(&command);

    let node = command_handlers::handle_create_node(&command, &*state.stories, &*state.nodes)
        .await?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// PATCH /nodes/{node_id}
#[instrument(skip(state, changes))]
async fn update_node(
    State(state): State<AppState>,
    Path(node_id): Path<Uuid>,
    Json(changes): Json<NodePatch>,
) -> Result<Json<Node>, ApiError> {
    let command = commands::UpdateNode {
        correlation_id: Uuid::new_v4(),
        node_id,
        patch: changes,
    };
    log_command(&command);

    let node = command_handlers::handle_update_node(&command, &*state.stories, &*state.nodes)
        .await?;
    Ok(Json(node))
}

/// DELETE /nodes/{node_id}
#[instrument(skip(state))]
async fn delete_node(
    State(state): State<AppState>,
    Path(node_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteNode {
        correlation_id: Uuid::new_v4(),
        node_id,
    };
    log_command(&command);

    command_handlers::handle_delete_node(&command, &*state.stories, &*state.nodes).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Returns the router for graph nodes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories/{story_id}/nodes", get(list_nodes).post(create_node))
        .route("/nodes/{node_id}", patch(update_node).delete(delete_node))
}
