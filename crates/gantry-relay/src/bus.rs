//! In-process distributor event bus
//!
//! The distributor publishes [`DistributorEvent`]s here and the relay
//! consumes them from a broadcast subscription. The bus is deliberately
//! dumb: no buffering beyond the broadcast ring, no replay. A consumer
//! that falls behind is told how much it missed and keeps going.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use gantry_domain::DistributorEvent;

use crate::router::EventRouter;

/// Anything the relay can pull distributor events from.
pub trait BuildEventSource: Send + Sync {
    fn subscribe(&self) -> broadcast::Receiver<DistributorEvent>;
}

/// Broadcast-backed event bus shared between distributor and relay.
pub struct BuildEventBus {
    tx: broadcast::Sender<DistributorEvent>,
}

impl BuildEventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish one event to all current subscribers.
    pub fn publish(&self, event: DistributorEvent) {
        // A send without subscribers returns Err; nothing to do with it.
        let _ = self.tx.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl BuildEventSource for BuildEventBus {
    fn subscribe(&self) -> broadcast::Receiver<DistributorEvent> {
        self.tx.subscribe()
    }
}

/// Subscribe the router to an event source and drive it on its own task.
///
/// The task ends when the source drops its sender side. Lag is logged and
/// skipped; the router only ever sees events that survived the ring.
pub fn spawn_router(source: &dyn BuildEventSource, router: Arc<EventRouter>) -> JoinHandle<()> {
    let mut events = source.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => router.handle(event).await,
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("build event router lagged, skipped {skipped} events");
                }
            }
        }
        debug!("build event source closed, router task exiting");
    })
}
