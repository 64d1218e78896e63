//! Best-effort persistence bridge
//!
//! Sits between the relay and the storage traits. Build record writes are
//! request/response (callers want the augmented build back); line writes
//! are fire-and-forget so a slow or failing store never delays broadcast.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use gantry_domain::{Build, LogLine};
use gantry_store::{BuildStore, LogStore, ProjectStore, StorageResult};

use crate::metrics::RelayMetrics;

/// Write-through to durable storage for builds and log lines.
pub struct StorageBridge {
    builds: Arc<dyn BuildStore>,
    logs: Arc<dyn LogStore>,
    projects: Arc<dyn ProjectStore>,
    metrics: Arc<RelayMetrics>,
}

impl StorageBridge {
    pub fn new(
        builds: Arc<dyn BuildStore>,
        logs: Arc<dyn LogStore>,
        projects: Arc<dyn ProjectStore>,
        metrics: Arc<RelayMetrics>,
    ) -> Self {
        Self {
            builds,
            logs,
            projects,
            metrics,
        }
    }

    /// Store a build record, backfilling the project's average duration
    /// when the incoming build lacks one.
    ///
    /// Returns the stored build, so callers always observe a populated
    /// duration (0.0 when the project has no history yet).
    #[instrument(skip(self, build), fields(build_id = %build.id))]
    pub async fn save_build(&self, build: &Build) -> StorageResult<Build> {
        let mut build = build.clone();

        if build.project.avg_build_duration.is_none() {
            let avg = self
                .projects
                .avg_build_duration(&build.project.name)
                .await?;
            build.project.avg_build_duration = Some(avg);
        }

        self.builds.put(&build).await?;
        Ok(build)
    }

    /// Delete a build's record.
    #[instrument(skip(self, build), fields(build_id = %build.id))]
    pub async fn remove_build(&self, build: &Build) -> StorageResult<()> {
        self.builds.del(&[build.id]).await
    }

    /// Fire-and-forget write-through of freshly reconstructed lines.
    ///
    /// The write runs on its own task. On failure it logs the build and
    /// the highest line number in the batch, bumps the failure counter,
    /// and drops the batch; nothing is retried and nothing reaches the
    /// broadcast path. The returned handle is only needed by tests that
    /// want to await the write.
    pub fn spawn_save_lines(&self, lines: Vec<LogLine>) -> JoinHandle<()> {
        let logs = Arc::clone(&self.logs);
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            if lines.is_empty() {
                return;
            }
            let build_id = lines[0].build_id;
            let through_line = lines.iter().map(|l| l.number).max().unwrap_or(0);

            if let Err(e) = logs.put(&lines).await {
                metrics.inc_persist_failures();
                warn!(
                    error = %e,
                    build_id = %build_id,
                    through_line,
                    "failed to persist log lines"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use gantry_domain::{BuildId, BuildStatus, ProjectRef};
    use gantry_store::fakes::{MemoryBuildStore, MemoryLogStore, MemoryProjectStore};
    use gantry_store::StorageError;

    struct FailingLogStore;

    #[async_trait]
    impl LogStore for FailingLogStore {
        async fn put(&self, _lines: &[LogLine]) -> StorageResult<()> {
            Err(StorageError::Backend("write refused".to_string()))
        }

        async fn find(&self, _build_id: BuildId) -> StorageResult<Vec<LogLine>> {
            Ok(vec![])
        }
    }

    fn bridge_with(
        builds: Arc<MemoryBuildStore>,
        logs: Arc<dyn LogStore>,
        projects: Arc<MemoryProjectStore>,
        metrics: Arc<RelayMetrics>,
    ) -> StorageBridge {
        StorageBridge::new(builds, logs, projects, metrics)
    }

    #[tokio::test]
    async fn save_build_backfills_missing_duration() {
        let builds = Arc::new(MemoryBuildStore::new());
        let projects = Arc::new(MemoryProjectStore::new());
        projects.set_avg_build_duration("website", 93.5);

        let bridge = bridge_with(
            Arc::clone(&builds),
            Arc::new(MemoryLogStore::new()),
            projects,
            Arc::new(RelayMetrics::new()),
        );

        let build = Build::new(BuildId(1), ProjectRef::new("website"), BuildStatus::Running);
        let stored = bridge.save_build(&build).await.unwrap();

        assert_eq!(stored.project.avg_build_duration, Some(93.5));
        let persisted = builds.get(BuildId(1)).await.unwrap().unwrap();
        assert_eq!(persisted.project.avg_build_duration, Some(93.5));
    }

    #[tokio::test]
    async fn save_build_keeps_duration_already_present() {
        let builds = Arc::new(MemoryBuildStore::new());
        let projects = Arc::new(MemoryProjectStore::new());
        projects.set_avg_build_duration("website", 93.5);

        let bridge = bridge_with(
            builds,
            Arc::new(MemoryLogStore::new()),
            projects,
            Arc::new(RelayMetrics::new()),
        );

        let build = Build::new(
            BuildId(1),
            ProjectRef::new("website").with_avg_build_duration(42.0),
            BuildStatus::Running,
        );
        let stored = bridge.save_build(&build).await.unwrap();

        assert_eq!(stored.project.avg_build_duration, Some(42.0));
    }

    #[tokio::test]
    async fn save_build_defaults_duration_to_zero_without_history() {
        let bridge = bridge_with(
            Arc::new(MemoryBuildStore::new()),
            Arc::new(MemoryLogStore::new()),
            Arc::new(MemoryProjectStore::new()),
            Arc::new(RelayMetrics::new()),
        );

        let build = Build::new(BuildId(1), ProjectRef::new("brand-new"), BuildStatus::Queued);
        let stored = bridge.save_build(&build).await.unwrap();

        assert_eq!(stored.project.avg_build_duration, Some(0.0));
    }

    #[tokio::test]
    async fn remove_build_deletes_record() {
        let builds = Arc::new(MemoryBuildStore::new());
        let bridge = bridge_with(
            Arc::clone(&builds),
            Arc::new(MemoryLogStore::new()),
            Arc::new(MemoryProjectStore::new()),
            Arc::new(RelayMetrics::new()),
        );

        let build = Build::new(BuildId(5), ProjectRef::new("website"), BuildStatus::Succeeded);
        bridge.save_build(&build).await.unwrap();
        bridge.remove_build(&build).await.unwrap();

        assert!(builds.get(BuildId(5)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn spawn_save_lines_persists_batch() {
        let logs = Arc::new(MemoryLogStore::new());
        let bridge = bridge_with(
            Arc::new(MemoryBuildStore::new()),
            Arc::clone(&logs) as Arc<dyn LogStore>,
            Arc::new(MemoryProjectStore::new()),
            Arc::new(RelayMetrics::new()),
        );

        let handle = bridge.spawn_save_lines(vec![
            LogLine::new(BuildId(3), 1, "one"),
            LogLine::new(BuildId(3), 2, "two"),
        ]);
        handle.await.unwrap();

        let persisted = logs.find(BuildId(3)).await.unwrap();
        assert_eq!(persisted.len(), 2);
    }

    #[tokio::test]
    async fn spawn_save_lines_failure_is_contained() {
        let metrics = Arc::new(RelayMetrics::new());
        let bridge = bridge_with(
            Arc::new(MemoryBuildStore::new()),
            Arc::new(FailingLogStore),
            Arc::new(MemoryProjectStore::new()),
            Arc::clone(&metrics),
        );

        let handle = bridge.spawn_save_lines(vec![LogLine::new(BuildId(3), 1, "one")]);
        handle.await.unwrap();

        assert_eq!(metrics.persist_failures(), 1);
    }

    #[tokio::test]
    async fn spawn_save_lines_empty_batch_is_a_noop() {
        let metrics = Arc::new(RelayMetrics::new());
        let bridge = bridge_with(
            Arc::new(MemoryBuildStore::new()),
            Arc::new(MemoryLogStore::new()),
            Arc::new(MemoryProjectStore::new()),
            Arc::clone(&metrics),
        );

        bridge.spawn_save_lines(vec![]).await.unwrap();
        assert_eq!(metrics.persist_failures(), 0);
    }
}
