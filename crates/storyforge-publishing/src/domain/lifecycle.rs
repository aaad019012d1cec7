//! Story status state machine.
//!
//! ```text
//! DRAFT ──publish──▶ PUBLISHED ──content edit──▶ DRAFT(editing vN+1)
//!   │                    │                            │
//!   │                    │◀────publish new version────┘
//!   └──archive──▶ ARCHIVED ◀──archive──┘
//! ```
//!
//! Every function either applies a transition in full or returns
//! `DomainError::Conflict` and leaves the story untouched.

use chrono::{DateTime, Utc};
use storyforge_core::error::DomainError;
use storyforge_core::story::{DraftState, Story, StoryStatus};

/// Checks that `story` may take its first (or a plain) publication.
///
/// # Errors
///
/// Returns `DomainError::Conflict` if the story is published or archived.
pub fn can_publish(story: &Story) -> Result<(), DomainError> {
    match story.status {
        StoryStatus::Draft => Ok(()),
        StoryStatus::Published => Err(DomainError::Conflict(format!(
            "story {} is already published",
            story.id
        ))),
        StoryStatus::Archived => Err(DomainError::Conflict(format!(
            "story {} is archived",
            story.id
        ))),
    }
}

/// Checks that `story` is a draft revision of a published story and returns
/// the version number it is preparing.
///
/// # Errors
///
/// Returns `DomainError::Conflict` unless the story is `Draft` with an
/// editing-version overlay.
pub fn can_publish_new_version(story: &Story) -> Result<i32, DomainError> {
    match (story.status, story.draft_state) {
        (StoryStatus::Draft, DraftState::EditingVersion { draft_version }) => Ok(draft_version),
        _ => Err(DomainError::Conflict(format!(
            "story {} is not editing a new version",
            story.id
        ))),
    }
}

/// `DRAFT --publish--> PUBLISHED` with the given version as current.
///
/// # Errors
///
/// See [`can_publish`].
pub fn publish(
    story: &mut Story,
    version_number: i32,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    can_publish(story)?;
    mark_published(story, version_number, now);
    Ok(())
}

/// `DRAFT(editing vN) --publish new version--> PUBLISHED` with vN current.
///
/// # Errors
///
/// See [`can_publish_new_version`].
pub fn publish_new_version(story: &mut Story, now: DateTime<Utc>) -> Result<i32, DomainError> {
    let version_number = can_publish_new_version(story)?;
    mark_published(story, version_number, now);
    Ok(version_number)
}

fn mark_published(story: &mut Story, version_number: i32, now: DateTime<Utc>) {
    story.status = StoryStatus::Published;
    story.draft_state = DraftState::Fresh;
    story.current_version = Some(version_number);
    story.published_at = Some(now);
}

/// `PUBLISHED --content edit--> DRAFT(editing current+1)`.
///
/// Returns `true` if the transition fired; any other status is left alone.
pub fn begin_new_version(story: &mut Story) -> bool {
    if story.status != StoryStatus::Published {
        return false;
    }
    let draft_version = story.current_version.unwrap_or(0) + 1;
    story.status = StoryStatus::Draft;
    story.draft_state = DraftState::EditingVersion { draft_version };
    true
}

/// `DRAFT | PUBLISHED --archive--> ARCHIVED`.
///
/// # Errors
///
/// Returns `DomainError::Conflict` if the story is already archived.
pub fn archive(story: &mut Story) -> Result<(), DomainError> {
    if story.status == StoryStatus::Archived {
        return Err(DomainError::Conflict(format!(
            "story {} is already archived",
            story.id
        )));
    }
    story.status = StoryStatus::Archived;
    story.draft_state = DraftState::Fresh;
    Ok(())
}

/// Checks that `story` still accepts edits to its content or graph.
///
/// # Errors
///
/// Returns `DomainError::Conflict` if the story is archived.
pub fn ensure_editable(story: &Story) -> Result<(), DomainError> {
    if story.status == StoryStatus::Archived {
        return Err(DomainError::Conflict(format!(
            "story {} is archived and can no longer be edited",
            story.id
        )));
    }
    Ok(())
}
