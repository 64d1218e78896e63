//! Build records and update deltas as emitted by the distributor.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Distributor-assigned build identifier.
///
/// Opaque to this layer and stable for the build's lifetime; also the key
/// for every per-build state map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildId(pub u64);

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Build lifecycle status.
///
/// The set is owned by the distributor; this layer only inspects whether a
/// build is running (log channel provisioning) or terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl BuildStatus {
    /// Whether the build is currently producing output.
    pub fn is_running(&self) -> bool {
        matches!(self, BuildStatus::Running)
    }

    /// Whether the build has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildStatus::Succeeded | BuildStatus::Failed | BuildStatus::Canceled
        )
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BuildStatus::Queued => "queued",
            BuildStatus::Running => "running",
            BuildStatus::Succeeded => "succeeded",
            BuildStatus::Failed => "failed",
            BuildStatus::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

/// The project a build belongs to.
///
/// `avg_build_duration` is carried when the distributor already knows it;
/// otherwise the persistence layer backfills it from project history on the
/// first `save_build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub name: String,
    pub avg_build_duration: Option<f64>,
}

impl ProjectRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            avg_build_duration: None,
        }
    }

    pub fn with_avg_build_duration(mut self, seconds: f64) -> Self {
        self.avg_build_duration = Some(seconds);
        self
    }
}

/// A build as described by the distributor.
///
/// This layer never originates a `Build`; it reacts to the copies attached
/// to distributor events and persists them on request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub id: BuildId,
    pub project: ProjectRef,
    pub status: BuildStatus,
}

impl Build {
    pub fn new(id: BuildId, project: ProjectRef, status: BuildStatus) -> Self {
        Self {
            id,
            project,
            status,
        }
    }
}

/// Field-change map attached to a build update.
///
/// The distributor reports which build fields mutated as a mapping of field
/// name to its new value (or `true` for flag fields). A `completed` value of
/// `true` marks the build finished and triggers project invalidation plus
/// reconstruction-state cleanup downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildDelta(pub serde_json::Map<String, Value>);

impl BuildDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed field. Builder-style for event construction.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether this delta marks the build finished.
    pub fn completed(&self) -> bool {
        matches!(self.0.get("completed"), Some(Value::Bool(true)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
