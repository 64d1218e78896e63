//! Gantry-Store: SurrealDB Backend for Gantry
//!
//! This crate provides the persistence layer for the build log distribution
//! core. It handles all I/O with SurrealDB, keeping build records, reconstructed
//! log lines, and project history behind backend-agnostic traits.
//!
//! ## Key Components
//!
//! - `BuildStore` / `LogStore` / `ProjectStore`: the storage seams consumed
//!   by the distribution layer
//! - `SurrealStore`: one shared connection implementing all three traits
//! - `fakes`: in-memory implementations for tests

mod error;
pub mod fakes;
mod migrations;
pub mod storage_traits;
mod surreal_store;

pub use error::StorageError;
pub use storage_traits::{BuildStore, LogStore, ProjectStore, StorageResult};
pub use surreal_store::{CloudConfig, SurrealStore};
