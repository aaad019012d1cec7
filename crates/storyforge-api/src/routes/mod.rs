//! Route modules organized by bounded context.

pub mod choices;
pub mod health;
pub mod nodes;
pub mod publishing;
pub mod stories;

use axum::Router;
use storyforge_core::command::Command;
use tracing::info;

use crate::state::AppState;

/// Every `/api/v1` route.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(stories::router())
        .merge(nodes::router())
        .merge(choices::router())
        .merge(publishing::router())
}

fn log_command(command: &dyn Command) {
    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        story_id = ?command.story_id(),
        "handling command"
    );
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use storyforge_store::InMemoryStoryStore;
    use storyforge_test_support::{FailingStoryStore, FixedClock, fixed_now};
    use tower::ServiceExt;

    use crate::state::AppState;

    pub fn memory_state() -> (AppState, Arc<InMemoryStoryStore>) {
        let store = Arc::new(InMemoryStoryStore::new());
        let state = AppState::new(Arc::new(FixedClock(fixed_now())), Arc::clone(&store));
        (state, store)
    }

    pub fn failing_state() -> AppState {
        AppState::new(Arc::new(FixedClock(fixed_now())), Arc::new(FailingStoryStore))
    }

    /// Sends one request and decodes the JSON body (`Null` when empty).
    pub async fn send(
        app: Router,
        method: &str,
        uri: &str,
        body: Option<&Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(json).unwrap())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
