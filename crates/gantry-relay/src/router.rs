//! Distributor event fan-out
//!
//! [`EventRouter`] is the explicit context object of the relay: it owns the
//! line assembler and holds the channel registry, the sink, the persistence
//! bridge, and the counters. Every distributor event passes through
//! [`EventRouter::handle`], which decides what gets broadcast where and
//! what gets persisted.

use std::sync::{Arc, Mutex};

use tracing::debug;

use gantry_domain::{Build, BuildDelta, BuildId, DistributorEvent};

use crate::assembler::LineAssembler;
use crate::bridge::StorageBridge;
use crate::channel::{ChannelMessage, ChannelName, ChannelSink};
use crate::metrics::RelayMetrics;
use crate::registry::ChannelRegistry;

/// Routes distributor events to channels and storage.
pub struct EventRouter {
    assembler: Mutex<LineAssembler>,
    registry: Arc<ChannelRegistry>,
    sink: Arc<dyn ChannelSink>,
    bridge: Arc<StorageBridge>,
    metrics: Arc<RelayMetrics>,
}

impl EventRouter {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        sink: Arc<dyn ChannelSink>,
        bridge: Arc<StorageBridge>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            assembler: Mutex::new(LineAssembler::new()),
            registry,
            sink,
            bridge,
            metrics,
        }
    }

    /// React to one distributor event.
    pub async fn handle(&self, event: DistributorEvent) {
        self.metrics.inc_events_routed();

        match event {
            DistributorEvent::BuildUpdated { build, changes } => {
                self.on_update(build, changes).await
            }
            DistributorEvent::BuildCanceled { build } => self.on_cancel(build).await,
            DistributorEvent::BuildData { build, chunk } => self.on_data(build, chunk).await,
        }
    }

    /// Build changed: open its log channel once it runs, invalidate the
    /// project and close reconstruction state when it finishes, and always
    /// announce the change on the global builds channel.
    async fn on_update(&self, build: Build, changes: BuildDelta) {
        if build.status.is_running() {
            self.registry.ensure_channel(build.id).await;
        }

        if changes.completed() {
            self.sink
                .publish(
                    ChannelName::Projects,
                    ChannelMessage::ProjectInvalidated {
                        name: build.project.name.clone(),
                    },
                )
                .await;
            self.flush_completed(build.id).await;
        }

        self.sink
            .publish(
                ChannelName::Builds,
                ChannelMessage::BuildChanged {
                    build_id: build.id,
                    changes,
                },
            )
            .await;
    }

    async fn on_cancel(&self, build: Build) {
        self.sink
            .publish(
                ChannelName::Builds,
                ChannelMessage::BuildCanceled { build_id: build.id },
            )
            .await;
    }

    /// Raw chunk arrived: assemble lines, broadcast them on the build's
    /// channel, and hand the same batch to the bridge. The broadcast never
    /// waits for the write.
    async fn on_data(&self, build: Build, chunk: String) {
        self.registry.ensure_channel(build.id).await;
        self.metrics.inc_chunks_processed();

        let lines = self.assembler.lock().unwrap().feed(build.id, &chunk);
        self.metrics.add_lines_emitted(lines.len() as u64);

        self.sink
            .publish(
                ChannelName::Build(build.id),
                ChannelMessage::LinesAppended {
                    lines: lines.clone(),
                },
            )
            .await;

        let _ = self.bridge.spawn_save_lines(lines);
    }

    /// Drop the build's reconstruction state, closing a non-empty pending
    /// partial as its final line so output not ending in `\n` is kept.
    async fn flush_completed(&self, build_id: BuildId) {
        let (flushed, tracked) = {
            let mut assembler = self.assembler.lock().unwrap();
            let flushed = assembler.finish(build_id);
            (flushed, assembler.tracked_builds())
        };

        debug!(build_id = %build_id, tracked_builds = tracked, "reconstruction state closed");

        if let Some(line) = flushed {
            self.metrics.add_lines_emitted(1);
            self.sink
                .publish(
                    ChannelName::Build(build_id),
                    ChannelMessage::LinesAppended {
                        lines: vec![line.clone()],
                    },
                )
                .await;
            let _ = self.bridge.spawn_save_lines(vec![line]);
        }
    }
}
