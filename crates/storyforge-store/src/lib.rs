//! Storage adapters for the Storyforge engine.
//!
//! `InMemoryStoryStore` keeps every table behind one lock; `PgStoryStore`
//! maps the same ports onto PostgreSQL and commits publications inside a
//! single transaction.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStoryStore;
pub use postgres::PgStoryStore;
