//! Gantry-Relay: Real-Time Build Log Distribution
//!
//! This crate turns the distributor's raw event stream into ordered,
//! numbered log lines and fans them out over per-build broadcast channels,
//! persisting what it broadcasts on the side.
//!
//! ## Key Components
//!
//! - `LineAssembler`: Reconstructs numbered lines from arbitrary chunking
//! - `ChannelHub`: Broadcast channels with backlog sync for late joiners
//! - `EventRouter`: Maps distributor events to channel traffic and storage
//! - `StorageBridge`: Best-effort persistence that never blocks delivery

pub mod assembler;
pub mod bridge;
pub mod bus;
pub mod channel;
pub mod hub;
pub mod metrics;
pub mod registry;
pub mod router;

pub use assembler::LineAssembler;
pub use bridge::StorageBridge;
pub use bus::{spawn_router, BuildEventBus, BuildEventSource};
pub use channel::{BacklogProvider, ChannelMessage, ChannelName, ChannelSink};
pub use hub::{ChannelHub, ChannelSubscription, SubscriberId, DEFAULT_CHANNEL_CAPACITY};
pub use metrics::RelayMetrics;
pub use registry::ChannelRegistry;
pub use router::EventRouter;
