//! Domain layer for the Publishing context.

pub mod commands;
pub mod lifecycle;
