//! End-to-end relay flow tests.
//!
//! These wire the full stack the way gantryd does: hub, registry, bridge,
//! router, and bus over in-memory stores. Events go in through the bus and
//! assertions land on channel subscriptions and persisted state.

use std::sync::Arc;
use std::time::Duration;

use gantry_domain::{
    Build, BuildDelta, BuildId, BuildStatus, DistributorEvent, LogLine, ProjectRef,
};
use gantry_relay::{
    spawn_router, BuildEventBus, ChannelHub, ChannelMessage, ChannelName, ChannelRegistry,
    ChannelSink, EventRouter, RelayMetrics, StorageBridge,
};
use gantry_store::fakes::{MemoryBuildStore, MemoryLogStore, MemoryProjectStore};
use gantry_store::LogStore;

struct Relay {
    hub: Arc<ChannelHub>,
    logs: Arc<MemoryLogStore>,
    metrics: Arc<RelayMetrics>,
    bus: BuildEventBus,
}

/// Wire the full relay over in-memory stores and spawn the router task.
fn start_relay() -> Relay {
    let hub = Arc::new(ChannelHub::new(64));
    let logs = Arc::new(MemoryLogStore::new());
    let metrics = Arc::new(RelayMetrics::new());

    let registry = Arc::new(ChannelRegistry::new(
        Arc::clone(&hub) as Arc<dyn ChannelSink>,
        Arc::clone(&logs) as Arc<dyn LogStore>,
        Arc::clone(&metrics),
    ));
    let bridge = Arc::new(StorageBridge::new(
        Arc::new(MemoryBuildStore::new()),
        Arc::clone(&logs) as Arc<dyn LogStore>,
        Arc::new(MemoryProjectStore::new()),
        Arc::clone(&metrics),
    ));
    let router = Arc::new(EventRouter::new(
        registry,
        Arc::clone(&hub) as Arc<dyn ChannelSink>,
        bridge,
        Arc::clone(&metrics),
    ));

    let bus = BuildEventBus::new(64);
    spawn_router(&bus, router);

    Relay {
        hub,
        logs,
        metrics,
        bus,
    }
}

fn running_build(id: u64) -> Build {
    Build::new(BuildId(id), ProjectRef::new("website"), BuildStatus::Running)
}

fn data(id: u64, chunk: &str) -> DistributorEvent {
    DistributorEvent::BuildData {
        build: running_build(id),
        chunk: chunk.to_string(),
    }
}

fn completed(id: u64) -> DistributorEvent {
    DistributorEvent::BuildUpdated {
        build: running_build(id),
        changes: BuildDelta::new().with("completed", true),
    }
}

/// Poll the log store until `count` lines exist for the build.
async fn wait_for_lines(logs: &MemoryLogStore, build_id: BuildId, count: usize) -> Vec<LogLine> {
    for _ in 0..100 {
        let lines = logs.find(build_id).await.expect("log store read");
        if lines.len() >= count {
            return lines;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {count} persisted lines of build {build_id}");
}

async fn recv_lines(sub: &mut gantry_relay::ChannelSubscription) -> Vec<LogLine> {
    match sub.live.recv().await.expect("live channel closed") {
        ChannelMessage::LinesAppended { lines } => lines,
        other => panic!("expected appended lines, got {:?}", other),
    }
}

/// Chunk boundaries never show up in the numbered lines a subscriber sees.
#[tokio::test]
async fn chunking_is_invisible_to_subscribers() {
    let relay = start_relay();
    let mut sub = relay.hub.subscribe(ChannelName::Build(BuildId(1))).await;

    relay.bus.publish(data(1, "he"));
    relay.bus.publish(data(1, "llo\nwor"));
    relay.bus.publish(data(1, "ld\n"));

    assert_eq!(recv_lines(&mut sub).await, vec![LogLine::new(BuildId(1), 1, "he")]);
    assert_eq!(
        recv_lines(&mut sub).await,
        vec![LogLine::new(BuildId(1), 1, "hello")]
    );
    assert_eq!(
        recv_lines(&mut sub).await,
        vec![LogLine::new(BuildId(1), 2, "world")]
    );

    // Storage converges on the final text per line number.
    let lines = wait_for_lines(&relay.logs, BuildId(1), 2).await;
    assert_eq!(
        lines,
        vec![
            LogLine::new(BuildId(1), 1, "hello"),
            LogLine::new(BuildId(1), 2, "world"),
        ]
    );

    assert_eq!(relay.metrics.events_routed(), 3);
    assert_eq!(relay.metrics.chunks_processed(), 3);
    assert_eq!(relay.metrics.lines_emitted(), 3);
}

/// A subscriber that joins mid-build gets persisted history as a backlog
/// sync before any live line.
#[tokio::test]
async fn late_subscriber_syncs_history_first() {
    let relay = start_relay();

    relay.bus.publish(data(2, "one\ntwo\n"));
    wait_for_lines(&relay.logs, BuildId(2), 2).await;

    let mut sub = relay.hub.subscribe(ChannelName::Build(BuildId(2))).await;
    match sub.backlog {
        Some(ChannelMessage::LinesSynced { ref lines }) => {
            assert_eq!(
                *lines,
                vec![
                    LogLine::new(BuildId(2), 1, "one"),
                    LogLine::new(BuildId(2), 2, "two"),
                ]
            );
        }
        ref other => panic!("expected synced backlog, got {:?}", other),
    }

    relay.bus.publish(data(2, "three\n"));
    assert_eq!(
        recv_lines(&mut sub).await,
        vec![LogLine::new(BuildId(2), 3, "three")]
    );

    assert_eq!(relay.metrics.backlog_syncs(), 1);
}

/// Completion invalidates the project, flushes the trailing partial to
/// subscribers, and lands the full log in storage.
#[tokio::test]
async fn completion_flushes_and_invalidates() {
    let relay = start_relay();
    let mut build_sub = relay.hub.subscribe(ChannelName::Build(BuildId(3))).await;
    let mut project_sub = relay.hub.subscribe(ChannelName::Projects).await;

    relay.bus.publish(data(3, "building...\nexit code 0"));
    assert_eq!(
        recv_lines(&mut build_sub).await,
        vec![LogLine::new(BuildId(3), 1, "building...")]
    );

    relay.bus.publish(completed(3));

    assert_eq!(
        project_sub.live.recv().await.unwrap(),
        ChannelMessage::ProjectInvalidated {
            name: "website".to_string(),
        }
    );
    assert_eq!(
        recv_lines(&mut build_sub).await,
        vec![LogLine::new(BuildId(3), 2, "exit code 0")]
    );

    let lines = wait_for_lines(&relay.logs, BuildId(3), 2).await;
    assert_eq!(lines[1], LogLine::new(BuildId(3), 2, "exit code 0"));
}

/// Lifecycle traffic rides the global builds channel.
#[tokio::test]
async fn lifecycle_reaches_the_builds_channel() {
    let relay = start_relay();
    let mut builds = relay.hub.subscribe(ChannelName::Builds).await;

    relay.bus.publish(DistributorEvent::BuildUpdated {
        build: running_build(4),
        changes: BuildDelta::new().with("status", "running"),
    });
    relay.bus.publish(DistributorEvent::BuildCanceled {
        build: running_build(4),
    });

    assert!(matches!(
        builds.live.recv().await.unwrap(),
        ChannelMessage::BuildChanged { build_id: BuildId(4), .. }
    ));
    assert_eq!(
        builds.live.recv().await.unwrap(),
        ChannelMessage::BuildCanceled { build_id: BuildId(4) }
    );
}

/// Two builds interleaved on the bus keep independent numbering and
/// channels.
#[tokio::test]
async fn interleaved_builds_stay_isolated() {
    let relay = start_relay();
    let mut sub_a = relay.hub.subscribe(ChannelName::Build(BuildId(5))).await;
    let mut sub_b = relay.hub.subscribe(ChannelName::Build(BuildId(6))).await;

    relay.bus.publish(data(5, "alpha\n"));
    relay.bus.publish(data(6, "bravo\n"));
    relay.bus.publish(data(5, "charlie\n"));

    assert_eq!(
        recv_lines(&mut sub_a).await,
        vec![LogLine::new(BuildId(5), 1, "alpha")]
    );
    assert_eq!(
        recv_lines(&mut sub_a).await,
        vec![LogLine::new(BuildId(5), 2, "charlie")]
    );
    assert_eq!(
        recv_lines(&mut sub_b).await,
        vec![LogLine::new(BuildId(6), 1, "bravo")]
    );
}

/// Output restarted after completion begins a fresh numbering sequence,
/// and the superseding lines overwrite storage.
#[tokio::test]
async fn numbering_resets_after_completion() {
    let relay = start_relay();
    let mut sub = relay.hub.subscribe(ChannelName::Build(BuildId(7))).await;

    relay.bus.publish(data(7, "first run\n"));
    assert_eq!(
        recv_lines(&mut sub).await,
        vec![LogLine::new(BuildId(7), 1, "first run")]
    );

    relay.bus.publish(completed(7));
    relay.bus.publish(data(7, "second run\n"));

    assert_eq!(
        recv_lines(&mut sub).await,
        vec![LogLine::new(BuildId(7), 1, "second run")]
    );

    // The retry's line 1 replaces the original in storage.
    for _ in 0..100 {
        let lines = relay.logs.find(BuildId(7)).await.expect("log store read");
        if lines == vec![LogLine::new(BuildId(7), 1, "second run")] {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("storage never converged on the retried line");
}
