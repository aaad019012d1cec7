//! Routes for story records.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use storyforge_authoring::application::{command_handlers, query_handlers};
use storyforge_authoring::domain::commands;
use storyforge_authoring::domain::editing::StoryPatch;
use storyforge_core::story::{Metadata, Story, StoryDetails};
use tracing::instrument;
use uuid::Uuid;

use super::log_command;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /stories.
#[derive(Debug, Deserialize)]
pub struct CreateStoryRequest {
    /// Display title.
    pub title: String,
    /// Reader-facing blurb.
    #[serde(default)]
    pub description: Option<String>,
    /// Cover image location.
    #[serde(default)]
    pub cover_image: Option<String>,
    /// Genre tags.
    #[serde(default)]
    pub genres: Vec<String>,
    /// Difficulty label.
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Free-form extension fields.
    #[serde(default)]
    pub metadata: Metadata,
}

/// POST /stories
#[instrument(skip(state, request))]
async fn create_story(
    State(state): State<AppState>,
    Json(request): Json<CreateStoryRequest>,
) -> Result<(StatusCode, Json<Story>), ApiError> {
    let command = commands::CreateStory {
        correlation_id: Uuid::new_v4(),
        details: StoryDetails {
            title: request.title,
            description: request.description,
            cover_image: request.cover_image,
            genres: request.genres,
            difficulty: request.difficulty,
        },
        metadata: request.metadata,
    };
    log_command(&command);

    let story =
        command_handlers::handle_create_story(&command, state.clock.as_ref(), &*state.stories)
            .await?;

    Ok((StatusCode::CREATED, Json(story)))
}

/// GET /stories/{story_id}
#[instrument(skip(state))]
async fn get_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<Story>, ApiError> {
    let story = query_handlers::get_story(story_id, &*state.stories).await?;
    Ok(Json(story))
}

/// PATCH /stories/{story_id}
#[instrument(skip(state, changes))]
async fn update_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    Json(changes): Json<StoryPatch>,
) -> Result<Json<Story>, ApiError> {
    let command = commands::UpdateStory {
        correlation_id: Uuid::new_v4(),
        story_id,
        patch: changes,
    };
    log_command(&command);

    let story =
        command_handlers::handle_update_story(&command, state.clock.as_ref(), &*state.stories)
            .await?;
    Ok(Json(story))
}

/// POST /stories/{story_id}/archive
#[instrument(skip(state))]
async fn archive_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<Story>, ApiError> {
    let command = commands::ArchiveStory {
        correlation_id: Uuid::new_v4(),
        story_id,
    };
    log_command(&command);

    let story =
        command_handlers::handle_archive_story(&command, state.clock.as_ref(), &*state.stories)
            .await?;
    Ok(Json(story))
}

/// Returns the router for story records.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories", post(create_story))
        .route("/stories/{story_id}", get(get_story).patch(update_story))
        .route("/stories/{story_id}/archive", post(archive_story))
}
