//! Distributor lifecycle and data events.
//!
//! The distributor owns scheduling and node assignment; this layer consumes
//! its event stream. Events for one build arrive in emission order, and the
//! stream is the only way a build enters the distribution layer.

use serde::{Deserialize, Serialize};

use crate::build::{Build, BuildDelta, BuildId};

/// One event from the distributor's stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum DistributorEvent {
    /// Build fields changed; `changes` names what mutated.
    BuildUpdated { build: Build, changes: BuildDelta },

    /// A build was canceled by a user or the coordinator.
    BuildCanceled { build: Build },

    /// A raw chunk of build output arrived from a worker.
    BuildData { build: Build, chunk: String },
}

impl DistributorEvent {
    /// The build this event concerns.
    pub fn build_id(&self) -> BuildId {
        match self {
            DistributorEvent::BuildUpdated { build, .. } => build.id,
            DistributorEvent::BuildCanceled { build } => build.id,
            DistributorEvent::BuildData { build, .. } => build.id,
        }
    }

    /// Event kind label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DistributorEvent::BuildUpdated { .. } => "build_updated",
            DistributorEvent::BuildCanceled { .. } => "build_canceled",
            DistributorEvent::BuildData { .. } => "build_data",
        }
    }
}
