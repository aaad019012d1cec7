//! Application layer for the Authoring context.

pub mod command_handlers;
pub mod query_handlers;
