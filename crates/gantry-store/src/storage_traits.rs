//! Storage trait definitions for gantry
//!
//! These traits define the persistence seams of the distribution layer:
//! - `BuildStore`: build record persistence (upsert/delete/fetch)
//! - `LogStore`: reconstructed log line persistence (upsert, ordered reads)
//! - `ProjectStore`: project history lookups (average build duration)
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;

use gantry_domain::{Build, BuildId, LogLine};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// BuildStore — Build Record Persistence
// ---------------------------------------------------------------------------

/// Build record store.
///
/// Guarantees:
/// - `put` is an upsert keyed by build id: storing the same id twice
///   replaces the record rather than duplicating it.
/// - `del` of an absent id is a no-op.
/// - `get` returns exactly what the latest `put` stored.
#[async_trait]
pub trait BuildStore: Send + Sync {
    /// Store or replace a build record.
    async fn put(&self, build: &Build) -> StorageResult<()>;

    /// Delete the given builds. Absent ids are skipped silently.
    async fn del(&self, ids: &[BuildId]) -> StorageResult<()>;

    /// Fetch a build record by id, if present.
    async fn get(&self, id: BuildId) -> StorageResult<Option<Build>>;
}

// ---------------------------------------------------------------------------
// LogStore — Reconstructed Log Lines
// ---------------------------------------------------------------------------

/// Log line store.
///
/// Guarantees:
/// - `put` upserts each line by its `(build_id, number)` pair. A line that
///   is re-stored with longer text (a partial that grew before its newline
///   arrived) replaces the earlier snapshot.
/// - `find` returns all lines of a build ordered by ascending `number`.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Store or replace a batch of log lines.
    async fn put(&self, lines: &[LogLine]) -> StorageResult<()>;

    /// Fetch all stored lines for a build, ordered by line number.
    async fn find(&self, build_id: BuildId) -> StorageResult<Vec<LogLine>>;
}

// ---------------------------------------------------------------------------
// ProjectStore — Project History
// ---------------------------------------------------------------------------

/// Project history reader.
///
/// Backs the duration estimate attached to builds as they are announced:
/// consumers use it to render progress for a build that is still running.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Average historical build duration for a project, in seconds.
    /// Returns `0.0` when the project has no recorded history.
    async fn avg_build_duration(&self, name: &str) -> StorageResult<f64>;
}
