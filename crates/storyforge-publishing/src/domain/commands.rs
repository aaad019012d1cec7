//! Commands for the Publishing context.

use storyforge_core::command::Command;
use uuid::Uuid;

/// Command to publish a story for the first time.
#[derive(Debug, Clone)]
pub struct PublishStory {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story to publish.
    pub story_id: Uuid,
    /// Release notes; generated when absent.
    pub notes: Option<String>,
}

impl Command for PublishStory {
    fn command_type(&self) -> &'static str {
        "publishing.publish_story"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn story_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}

/// Command to publish the revision of an already-published story.
#[derive(Debug, Clone)]
pub struct PublishNewVersion {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The story being revised.
    pub story_id: Uuid,
    /// Release notes; generated when absent.
    pub notes: Option<String>,
}

impl Command for PublishNewVersion {
    fn command_type(&self) -> &'static str {
        "publishing.publish_new_version"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn story_id(&self) -> Option<Uuid> {
        Some(self.story_id)
    }
}
