//! Channel naming and the transport fan-out seam
//!
//! The relay never talks to client connections directly. It publishes
//! [`ChannelMessage`]s into named channels through the [`ChannelSink`]
//! capability, and the transport layer (in-process hub here, websocket
//! server in a full deployment) owns subscriber lifecycles.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use gantry_domain::{BuildDelta, BuildId, LogLine};

/// Name of a broadcast channel.
///
/// Two global channels (`builds`, `projects`) exist for lifecycle fan-out;
/// each build additionally gets its own log channel named `build<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelName {
    /// Global build list channel (`builds`)
    Builds,
    /// Global project channel (`projects`)
    Projects,
    /// Per-build log channel (`build<id>`)
    Build(BuildId),
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelName::Builds => write!(f, "builds"),
            ChannelName::Projects => write!(f, "projects"),
            ChannelName::Build(id) => write!(f, "build{}", id),
        }
    }
}

/// A message broadcast to channel subscribers.
///
/// Serialized with adjacent tagging so transports see a self-describing
/// `{"event": ..., "data": ...}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// A build changed; `changes` names the mutated fields (`builds` channel).
    BuildChanged { build_id: BuildId, changes: BuildDelta },
    /// A build was canceled (`builds` channel).
    BuildCanceled { build_id: BuildId },
    /// Freshly reconstructed lines (per-build channel). A line number seen
    /// before supersedes the earlier text.
    LinesAppended { lines: Vec<LogLine> },
    /// Point-in-time backlog for one new subscriber (per-build channel).
    LinesSynced { lines: Vec<LogLine> },
    /// Cached project state should be refetched (`projects` channel).
    ProjectInvalidated { name: String },
}

impl ChannelMessage {
    /// Event name as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelMessage::BuildChanged { .. } => "build_changed",
            ChannelMessage::BuildCanceled { .. } => "build_canceled",
            ChannelMessage::LinesAppended { .. } => "lines_appended",
            ChannelMessage::LinesSynced { .. } => "lines_synced",
            ChannelMessage::ProjectInvalidated { .. } => "project_invalidated",
        }
    }
}

/// Callback producing the backlog message for one newly attached subscriber.
///
/// Invoked once per subscription on channels that carry history. Returning
/// `None` means the subscriber joins without backlog (the read failed and
/// was already logged).
pub type BacklogProvider =
    Arc<dyn Fn() -> BoxFuture<'static, Option<ChannelMessage>> + Send + Sync>;

/// Publish-by-channel-name capability.
///
/// Publishing to a channel nobody subscribed to is a silent no-op, and
/// opening a channel that already exists must not disturb it.
#[async_trait::async_trait]
pub trait ChannelSink: Send + Sync {
    /// Broadcast a message to every current subscriber of `channel`,
    /// creating the channel if it does not exist yet.
    async fn publish(&self, channel: ChannelName, message: ChannelMessage);

    /// Create `channel` if absent. `backlog`, when given, is invoked once
    /// for every subscriber that attaches later.
    async fn open_channel(&self, channel: ChannelName, backlog: Option<BacklogProvider>);
}
