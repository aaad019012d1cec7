//! Application layer for the Publishing context.

pub mod command_handlers;
pub mod query_handlers;
