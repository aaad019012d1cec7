//! Command abstractions shared by the authoring and publishing contexts.

use uuid::Uuid;

/// Trait that all story commands implement.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable command name, used as a tracing field.
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The story this command targets, if it already exists.
    fn story_id(&self) -> Option<Uuid> {
        None
    }
}
