//! Storyforge — story graph integrity validation.
//!
//! Decides whether a story graph is playable: one start node, at least one
//! ending, every node reachable from the start, and no path that stops short
//! of an ending. Pure and free of I/O, so any number of validations may run
//! concurrently on their own copies of a graph.

pub mod validator;

pub use validator::{StructureViolation, ValidationResult, validate_structure};
