//! Mock implementations for integration tests
//!
//! Stands in for the Bot API so the worker pool and the dispatcher can be
//! driven without network access.

pub mod mock_client;

#[allow(unused_imports)]
pub use mock_client::{Behavior, Event, MockClient};
