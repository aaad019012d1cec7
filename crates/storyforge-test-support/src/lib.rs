//! Shared test doubles and fixtures for the Storyforge engine.

mod clock;
mod graph;
mod repository;

pub use clock::{FixedClock, fixed_now};
pub use graph::GraphFixture;
pub use repository::{FailOnCommit, FailingStoryStore};
