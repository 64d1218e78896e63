//! In-process broadcast hub
//!
//! [`ChannelHub`] is the in-process [`ChannelSink`]: one tokio broadcast
//! sender per channel name, created lazily except for the two global
//! channels which exist from construction. Subscribers attach through
//! [`ChannelHub::subscribe`] and receive the channel's backlog (when it has
//! a provider) alongside a live receiver.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::channel::{BacklogProvider, ChannelMessage, ChannelName, ChannelSink};

/// Default per-channel broadcast buffer size.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Identifies one hub subscriber, mainly for backlog-delivery logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        SubscriberId(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ChannelState {
    sender: broadcast::Sender<ChannelMessage>,
    backlog: Option<BacklogProvider>,
}

impl ChannelState {
    fn new(capacity: usize) -> Self {
        let (sender, _rx) = broadcast::channel(capacity);
        Self {
            sender,
            backlog: None,
        }
    }
}

/// One attached subscriber: its backlog snapshot plus the live receiver.
///
/// The backlog is a point-in-time read taken while the live receiver is
/// already attached, so a message may appear in both. Consumers treat
/// re-delivered line numbers as overwrites, never as gaps.
pub struct ChannelSubscription {
    pub id: SubscriberId,
    pub backlog: Option<ChannelMessage>,
    pub live: broadcast::Receiver<ChannelMessage>,
}

/// Named broadcast channels over tokio's broadcast primitive.
pub struct ChannelHub {
    capacity: usize,
    channels: Mutex<HashMap<ChannelName, ChannelState>>,
}

impl ChannelHub {
    /// Create a hub with the two global channels pre-opened.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let mut channels = HashMap::new();
        channels.insert(ChannelName::Builds, ChannelState::new(capacity));
        channels.insert(ChannelName::Projects, ChannelState::new(capacity));

        Self {
            capacity,
            channels: Mutex::new(channels),
        }
    }

    /// Attach a new subscriber to a channel, creating the channel if needed.
    ///
    /// The live receiver is registered before the backlog provider runs, so
    /// lines published while the backlog read is in flight are duplicated
    /// into the live stream rather than lost.
    pub async fn subscribe(&self, channel: ChannelName) -> ChannelSubscription {
        let (live, provider) = {
            let mut channels = self.channels.lock().unwrap();
            let state = channels
                .entry(channel)
                .or_insert_with(|| ChannelState::new(self.capacity));
            (state.sender.subscribe(), state.backlog.clone())
        };

        let id = SubscriberId::new();
        let backlog = match &provider {
            Some(provider) => provider().await,
            None => None,
        };

        if let Some(message) = &backlog {
            debug!(
                subscriber = %id,
                channel = %channel,
                kind = message.kind(),
                "backlog delivered to new subscriber"
            );
        }

        ChannelSubscription { id, backlog, live }
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: ChannelName) -> usize {
        let channels = self.channels.lock().unwrap();
        channels
            .get(&channel)
            .map(|state| state.sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of channels the hub currently tracks.
    pub fn channel_count(&self) -> usize {
        self.channels.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ChannelSink for ChannelHub {
    async fn publish(&self, channel: ChannelName, message: ChannelMessage) {
        let sender = {
            let mut channels = self.channels.lock().unwrap();
            let state = channels
                .entry(channel)
                .or_insert_with(|| ChannelState::new(self.capacity));
            state.sender.clone()
        };

        // A send without subscribers returns Err; nothing to do with it.
        let _ = sender.send(message);
    }

    async fn open_channel(&self, channel: ChannelName, backlog: Option<BacklogProvider>) {
        let mut channels = self.channels.lock().unwrap();
        match channels.entry(channel) {
            Entry::Occupied(mut entry) => {
                // Keep existing subscribers; only adopt a backlog provider
                // if the channel does not have one yet.
                let state = entry.get_mut();
                if state.backlog.is_none() {
                    state.backlog = backlog;
                }
            }
            Entry::Vacant(entry) => {
                debug!(channel = %channel, "channel opened");
                let mut state = ChannelState::new(self.capacity);
                state.backlog = backlog;
                entry.insert(state);
            }
        }
    }
}
