//! Persistent index store with MVCC snapshots.
//!
//! The store keeps an immutable map from container key to that container's
//! complete entry set. Mutation replaces the map behind an `Arc` swap, so a
//! reader holding a snapshot observes either the fully-old or the fully-new
//! version of a container, never a mix. Each upsert is persisted to its
//! segment file before it becomes visible in memory.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use symdex_api::models::{ContainerRef, TypeEntry};

use crate::error::Result;
use crate::shared::SharedIndex;

pub mod segment;

/// Complete, immutable entry set of one container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerIndex {
    pub container: ContainerRef,
    pub entries: Vec<TypeEntry>,
}

pub type ContainerMap = HashMap<String, Arc<ContainerIndex>>;

pub struct IndexStore {
    index_dir: PathBuf,
    current: RwLock<Arc<ContainerMap>>,
}

impl IndexStore {
    pub fn new(index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_dir: index_dir.into(),
            current: RwLock::new(Arc::new(ContainerMap::new())),
        }
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Reload previously persisted segments. Version mismatches and corrupt
    /// files are skipped; their containers rebuild on the next enqueue.
    pub fn load_persisted(&self) -> Result<usize> {
        let loaded = segment::load_dir(&self.index_dir)?;
        let count = loaded.len();

        let mut map = ContainerMap::with_capacity(count);
        for index in loaded {
            map.insert(index.container.key(), Arc::new(index));
        }

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(map);
        Ok(count)
    }

    /// Cheap point-in-time view of the local container map.
    pub fn snapshot_local(&self) -> Arc<ContainerMap> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces all entries for the container atomically. The segment is
    /// made durable first; on failure the previous version stays visible.
    pub fn upsert_container(&self, container: ContainerRef, entries: Vec<TypeEntry>) -> Result<()> {
        let index = ContainerIndex { container, entries };
        segment::save(&self.index_dir, &index)?;

        let key = index.container.key();
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut map = (**guard).clone();
        map.insert(key, Arc::new(index));
        *guard = Arc::new(map);
        Ok(())
    }

    pub fn remove_container(&self, container_key: &str) -> Result<()> {
        segment::remove(&self.index_dir, container_key)?;

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if guard.contains_key(container_key) {
            let mut map = (**guard).clone();
            map.remove(container_key);
            *guard = Arc::new(map);
        }
        Ok(())
    }

    /// Clears all in-memory state and deletes every local segment file.
    /// Shared artifacts live in their own directories and are never touched.
    pub fn reset(&self) -> Result<()> {
        {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::new(ContainerMap::new());
        }
        segment::clear_dir(&self.index_dir)
    }
}

/// Point-in-time read view: the local container map overlaid by the shared
/// artifacts bound at snapshot time. Shared data takes precedence for the
/// containers it covers; the snapshot pins its binding `Arc`s, so a
/// concurrent set/clear does not affect an in-flight read.
#[derive(Clone)]
pub struct IndexSnapshot {
    local: Arc<ContainerMap>,
    shared: Vec<Arc<SharedIndex>>,
}

impl IndexSnapshot {
    pub fn new(local: Arc<ContainerMap>, shared: Vec<Arc<SharedIndex>>) -> Self {
        Self { local, shared }
    }

    /// Every visible container index, shared-resolved first.
    pub fn containers(&self) -> Vec<&Arc<ContainerIndex>> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();

        for shared in &self.shared {
            for (key, index) in shared.containers() {
                if seen.insert(key.as_str()) {
                    out.push(index);
                }
            }
        }
        for (key, index) in self.local.iter() {
            if !seen.contains(key.as_str()) {
                out.push(index);
            }
        }
        out
    }

    pub fn container_count(&self) -> usize {
        self.containers().len()
    }

    pub fn type_count(&self) -> usize {
        self.containers().iter().map(|c| c.entries.len()).sum()
    }
}
