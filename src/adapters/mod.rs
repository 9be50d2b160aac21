// Adapters layer: concrete implementations of the domain ports.

pub mod fs;
pub mod memory;

pub use fs::LocalArtifactStore;
pub use memory::{InMemoryAccidentRepository, InMemoryUserRepository};
