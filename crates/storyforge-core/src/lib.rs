//! Storyforge Core — shared domain model and storage ports.
//!
//! This crate defines the story graph records, the published version ledger
//! entries, and the repository traits every other crate depends on. It
//! contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod graph;
pub mod repository;
pub mod story;
pub mod version;
