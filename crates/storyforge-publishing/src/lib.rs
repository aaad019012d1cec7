//! Storyforge — Publishing bounded context.
//!
//! Responsible for the story lifecycle (draft, published, archived and the
//! editing-a-new-version overlay), certifying a graph as playable, and
//! freezing it into the append-only version ledger.

pub mod application;
pub mod domain;
