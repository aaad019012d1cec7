//! Routes for the Publishing context: structure checks, publication and the
//! version ledger.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storyforge_core::story::Story;
use storyforge_graph::ValidationResult;
use storyforge_publishing::application::command_handlers::{
    self, PublicationResult, PublishReadiness,
};
use storyforge_publishing::application::query_handlers::{
    self, StoryVersionSummary, StoryVersionView,
};
use storyforge_publishing::domain::commands;
use tracing::instrument;
use uuid::Uuid;

use super::log_command;
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for the publish endpoints. May be `{}` or absent.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PublishRequest {
    /// Release notes; generated when absent.
    pub notes: Option<String>,
}

/// Response body after a successful publication.
#[derive(Debug, Serialize)]
pub struct PublicationResponse {
    /// The story as committed.
    pub story: Story,
    /// The ledger entry created.
    pub version: StoryVersionSummary,
}

impl From<PublicationResult> for PublicationResponse {
    fn from(result: PublicationResult) -> Self {
        Self {
            version: StoryVersionSummary::from(&result.version),
            story: result.story,
        }
    }
}

/// GET /stories/{story_id}/structure
#[instrument(skip(state))]
async fn validate_structure(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<ValidationResult>, ApiError> {
    let result =
        query_handlers::validate_story_structure(story_id, &*state.stories, &*state.nodes).await?;
    Ok(Json(result))
}

/// GET /stories/{story_id}/publish-readiness
#[instrument(skip(state))]
async fn publish_readiness(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<PublishReadiness>, ApiError> {
    let readiness =
        command_handlers::validate_for_publishing(story_id, &*state.stories, &*state.nodes)
            .await?;
    Ok(Json(readiness))
}

/// POST /stories/{story_id}/publish
#[instrument(skip(state, request))]
async fn publish_story(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    request: Option<Json<PublishRequest>>,
) -> Result<(StatusCode, Json<PublicationResponse>), ApiError> {
    let Json(request) = request.unwrap_or_default();
    let command = commands::PublishStory {
        correlation_id: Uuid::new_v4(),
        story_id,
        notes: request.notes,
    };
    log_command(&command);

    let result = command_handlers::handle_publish_story(
        &command,
        state.clock.as_ref(),
        &*state.stories,
        &*state.nodes,
        &*state.versions,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// POST /stories/{story_id}/versions
#[instrument(skip(state, request))]
async fn publish_new_version(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
    request: Option<Json<PublishRequest>>,
) -> Result<(StatusCode, Json<PublicationResponse>), ApiError> {
    let Json(request) = request.unwrap_or_default();
    let command = commands::PublishNewVersion {
        correlation_id: Uuid::new_v4(),
        story_id,
        notes: request.notes,
    };
    log_command(&command);

    let result = command_handlers::handle_publish_new_version(
        &command,
        state.clock.as_ref(),
        &*state.stories,
        &*state.nodes,
        &*state.versions,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(result.into())))
}

/// GET /stories/{story_id}/versions
#[instrument(skip(state))]
async fn list_versions(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<Vec<StoryVersionSummary>>, ApiError> {
    let versions =
        query_handlers::list_story_versions(story_id, &*state.stories, &*state.versions).await?;
    Ok(Json(versions))
}

/// GET /stories/{story_id}/versions/latest
#[instrument(skip(state))]
async fn latest_version(
    State(state): State<AppState>,
    Path(story_id): Path<Uuid>,
) -> Result<Json<Option<StoryVersionView>>, ApiError> {
    let latest =
        query_handlers::get_latest_version(story_id, &*state.stories, &*state.versions).await?;
    Ok(Json(latest))
}

/// GET /stories/{story_id}/versions/{version_number}
#[instrument(skip(state))]
async fn get_version(
    State(state): State<AppState>,
    Path((story_id, version_number)): Path<(Uuid, i32)>,
) -> Result<Json<StoryVersionView>, ApiError> {
    let view = query_handlers::get_story_version(story_id, version_number, &*state.versions).await?;
    Ok(Json(view))
}

/// Returns the router for the publishing context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stories/{story_id}/structure", get(validate_structure))
        .route(
            "/stories/{story_id}/publish-readiness",
            get(publish_readiness),
        )
        .route("/stories/{story_id}/publish", post(publish_story))
        .route(
            "/stories/{story_id}/versions",
            get(list_versions).post(publish_new_version),
        )
        .route("/stories/{story_id}/versions/latest", get(latest_version))
        .route(
            "/stories/{story_id}/versions/{version_number}",
            get(get_version),
        )
}
