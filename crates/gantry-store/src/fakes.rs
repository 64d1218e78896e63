//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryBuildStore`, `MemoryLogStore`, and `MemoryProjectStore`
//! that satisfy the trait contracts without any external dependencies.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;

use gantry_domain::{Build, BuildId, LogLine};

use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryBuildStore
// ---------------------------------------------------------------------------

/// In-memory build store backed by a `HashMap<BuildId, Build>`.
#[derive(Debug, Default)]
pub struct MemoryBuildStore {
    builds: Mutex<HashMap<BuildId, Build>>,
}

impl MemoryBuildStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BuildStore for MemoryBuildStore {
    async fn put(&self, build: &Build) -> StorageResult<()> {
        let mut builds = self.builds.lock().unwrap();
        builds.insert(build.id, build.clone());
        Ok(())
    }

    async fn del(&self, ids: &[BuildId]) -> StorageResult<()> {
        let mut builds = self.builds.lock().unwrap();
        for id in ids {
            builds.remove(id);
        }
        Ok(())
    }

    async fn get(&self, id: BuildId) -> StorageResult<Option<Build>> {
        let builds = self.builds.lock().unwrap();
        Ok(builds.get(&id).cloned())
    }
}

// ---------------------------------------------------------------------------
// MemoryLogStore
// ---------------------------------------------------------------------------

/// In-memory log store keyed by build, lines ordered by number.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    lines: Mutex<HashMap<BuildId, BTreeMap<u64, LogLine>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn put(&self, lines: &[LogLine]) -> StorageResult<()> {
        let mut store = self.lines.lock().unwrap();
        for line in lines {
            store
                .entry(line.build_id)
                .or_default()
                .insert(line.number, line.clone());
        }
        Ok(())
    }

    async fn find(&self, build_id: BuildId) -> StorageResult<Vec<LogLine>> {
        let store = self.lines.lock().unwrap();
        Ok(store
            .get(&build_id)
            .map(|by_number| by_number.values().cloned().collect())
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryProjectStore
// ---------------------------------------------------------------------------

/// In-memory project history with seedable durations.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    durations: Mutex<HashMap<String, f64>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the average build duration for a project.
    pub fn set_avg_build_duration(&self, name: &str, seconds: f64) {
        let mut durations = self.durations.lock().unwrap();
        durations.insert(name.to_string(), seconds);
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn avg_build_duration(&self, name: &str) -> StorageResult<f64> {
        let durations = self.durations.lock().unwrap();
        Ok(durations.get(name).copied().unwrap_or(0.0))
    }
}
