//! Shared read-only index bindings.
//!
//! A binding maps a logical index identity to an external directory of
//! prebuilt segments. At most one binding exists per logical key; set and
//! clear swap the binding `Arc` under a lock, so readers observe either the
//! old or the new binding and in-flight snapshots keep the one they pinned.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;

use symdex_api::models::ContainerRef;

use crate::store::{ContainerIndex, segment};

/// One external, precomputed, read-only index artifact. Segments load once
/// on first use; the artifact is never written or deleted from here.
pub struct SharedIndex {
    location: PathBuf,
    loaded: OnceCell<HashMap<String, Arc<ContainerIndex>>>,
}

impl SharedIndex {
    pub fn new(location: PathBuf) -> Self {
        Self {
            location,
            loaded: OnceCell::new(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    fn segments(&self) -> &HashMap<String, Arc<ContainerIndex>> {
        self.loaded.get_or_init(|| match segment::load_dir(&self.location) {
            Ok(list) => {
                tracing::info!(
                    "Loaded {} shared segments from {}",
                    list.len(),
                    self.location.display()
                );
                list.into_iter()
                    .map(|index| (index.container.key(), Arc::new(index)))
                    .collect()
            }
            Err(err) => {
                tracing::warn!(
                    "Failed to load shared index at {}: {err}",
                    self.location.display()
                );
                HashMap::new()
            }
        })
    }

    pub fn covers(&self, container_key: &str) -> bool {
        self.segments().contains_key(container_key)
    }

    pub fn containers(&self) -> impl Iterator<Item = (&String, &Arc<ContainerIndex>)> {
        self.segments().iter()
    }
}

#[derive(Default)]
pub struct SharedIndexRegistry {
    bindings: RwLock<HashMap<String, Arc<SharedIndex>>>,
}

impl SharedIndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds or clears the shared location for a logical key. Builds for
    /// covered containers are skipped from then on; clearing reverts to
    /// local build/query behavior.
    pub fn set_shared_location(&self, logical_key: &str, location: Option<PathBuf>) {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        match location {
            Some(path) => {
                tracing::info!(
                    "Binding shared index for '{logical_key}' to {}",
                    path.display()
                );
                bindings.insert(logical_key.to_string(), Arc::new(SharedIndex::new(path)));
            }
            None => {
                tracing::info!("Clearing shared index binding for '{logical_key}'");
                bindings.remove(logical_key);
            }
        }
    }

    pub fn resolve(&self, logical_key: &str) -> Option<Arc<SharedIndex>> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(logical_key)
            .cloned()
    }

    /// The binding whose artifact already covers this container, if any.
    pub fn covering(&self, container: &ContainerRef) -> Option<Arc<SharedIndex>> {
        let logical_key = container.logical_key.as_deref()?;
        let shared = self.resolve(logical_key)?;
        shared.covers(&container.key()).then_some(shared)
    }

    pub fn snapshot(&self) -> Vec<Arc<SharedIndex>> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}
