//! Storyforge — Authoring bounded context.
//!
//! Creating and editing stories and their graphs. Content edits to a
//! published story open a new draft version through the publishing
//! lifecycle; everything else is plain record maintenance.

pub mod application;
pub mod domain;
