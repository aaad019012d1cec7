//! Shared application state.

use std::sync::Arc;

use storyforge_core::clock::Clock;
use storyforge_core::repository::{NodeRepository, StoryRepository, VersionRepository};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock used to timestamp edits and publications.
    pub clock: Arc<dyn Clock>,
    /// Story records.
    pub stories: Arc<dyn StoryRepository>,
    /// Nodes and choices.
    pub nodes: Arc<dyn NodeRepository>,
    /// The version ledger.
    pub versions: Arc<dyn VersionRepository>,
}

impl AppState {
    /// Create application state over a single store that serves every
    /// repository port.
    #[must_use]
    pub fn new<S>(clock: Arc<dyn Clock>, store: Arc<S>) -> Self
    where
        S: StoryRepository + NodeRepository + VersionRepository + 'static,
    {
        Self {
            clock,
            stories: Arc::clone(&store) as Arc<dyn StoryRepository>,
            nodes: Arc::clone(&store) as Arc<dyn NodeRepository>,
            versions: store,
        }
    }
}
