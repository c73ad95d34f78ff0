//! In-process storage backends

mod memory;

pub use memory::{InMemoryRepositoryProvider, InMemoryStorage};
