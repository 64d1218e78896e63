//! Per-build log channel lifecycle
//!
//! A build's log channel is opened exactly once per build id, the first
//! time a data chunk arrives for it or an update reports it running,
//! whichever comes first. The channel is wired with a backlog provider
//! that reads the build's persisted lines, so subscribers attaching after
//! the build started still see its full history.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use gantry_domain::BuildId;
use gantry_store::LogStore;

use crate::channel::{BacklogProvider, ChannelMessage, ChannelName, ChannelSink};
use crate::metrics::RelayMetrics;

/// Opens and memoizes per-build log channels on the [`ChannelSink`].
pub struct ChannelRegistry {
    opened: Mutex<HashSet<BuildId>>,
    sink: Arc<dyn ChannelSink>,
    logs: Arc<dyn LogStore>,
    metrics: Arc<RelayMetrics>,
}

impl ChannelRegistry {
    pub fn new(
        sink: Arc<dyn ChannelSink>,
        logs: Arc<dyn LogStore>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            opened: Mutex::new(HashSet::new()),
            sink,
            logs,
            metrics,
        }
    }

    /// Open the build's log channel if this is the first request for it.
    ///
    /// Idempotent: later calls (and calls racing the first one) return the
    /// channel name without touching the sink again.
    pub async fn ensure_channel(&self, build_id: BuildId) -> ChannelName {
        let name = ChannelName::Build(build_id);

        {
            let mut opened = self.opened.lock().unwrap();
            if !opened.insert(build_id) {
                return name;
            }
        }

        debug!(build_id = %build_id, channel = %name, "opening build log channel");
        let provider = self.backlog_provider(build_id);
        self.sink.open_channel(name, Some(provider)).await;

        name
    }

    /// Whether the build's channel has been opened through this registry.
    pub fn is_open(&self, build_id: BuildId) -> bool {
        self.opened.lock().unwrap().contains(&build_id)
    }

    fn backlog_provider(&self, build_id: BuildId) -> BacklogProvider {
        let logs = Arc::clone(&self.logs);
        let metrics = Arc::clone(&self.metrics);

        Arc::new(move || {
            let logs = Arc::clone(&logs);
            let metrics = Arc::clone(&metrics);
            Box::pin(async move {
                match logs.find(build_id).await {
                    Ok(lines) => {
                        metrics.inc_backlog_syncs();
                        Some(ChannelMessage::LinesSynced { lines })
                    }
                    Err(e) => {
                        warn!(
                            error = %e,
                            build_id = %build_id,
                            "backlog read failed, subscriber joins without history"
                        );
                        None
                    }
                }
            })
        })
    }
}
