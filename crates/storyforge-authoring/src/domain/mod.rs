//! Domain layer for the Authoring context.

pub mod commands;
pub mod editing;
