//! Process-wide lookup from chatter id to the live simulation instance.
//!
//! The registry is an explicit object shared by reference between the view
//! layer (which mounts and unmounts chatters) and the message dispatcher
//! (which routes `say`/`walk_to` calls). Entries are inserted on mount,
//! replaced on remount, and removed by the eviction sweep.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::simulation::ChatterSimulation;
use crate::types::ChatterId;

/// Shared handle to one live simulation.
///
/// The mutex guarantees per-chatter frame updates are strictly sequential;
/// across chatters, tick order is unspecified and must not matter.
pub type ChatterHandle = Arc<Mutex<ChatterSimulation>>;

/// The id → live-instance map.
#[derive(Debug, Default)]
pub struct ChatterRegistry {
    entries: DashMap<ChatterId, ChatterHandle>,
}

impl ChatterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a simulation under its id, returning the handle it replaced
    /// if the chatter was already mounted.
    pub fn insert(&self, sim: ChatterSimulation) -> Option<ChatterHandle> {
        let id = sim.id().clone();
        self.entries.insert(id, Arc::new(Mutex::new(sim)))
    }

    /// Register an existing handle (remount path).
    pub fn insert_handle(&self, id: ChatterId, handle: ChatterHandle) -> Option<ChatterHandle> {
        self.entries.insert(id, handle)
    }

    /// Look up the live handle for a chatter.
    #[must_use]
    pub fn get(&self, id: &ChatterId) -> Option<ChatterHandle> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Like [`get`](Self::get), but a missing entry is a
    /// [`CoreError::ChatterNotFound`] for callers that treat a lookup miss
    /// as more than a no-op.
    ///
    /// # Errors
    /// Returns [`CoreError::ChatterNotFound`] when the id is not mounted.
    pub fn try_get(&self, id: &ChatterId) -> crate::error::Result<ChatterHandle> {
        self.get(id)
            .ok_or_else(|| crate::CoreError::ChatterNotFound(id.clone()))
    }

    /// Remove a chatter's entry, returning its handle if it was mounted.
    pub fn remove(&self, id: &ChatterId) -> Option<ChatterHandle> {
        self.entries.remove(id).map(|(_, handle)| handle)
    }

    /// Whether a live instance exists for this id.
    #[must_use]
    pub fn contains(&self, id: &ChatterId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of mounted chatters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no chatters are mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the currently mounted ids.
    #[must_use]
    pub fn ids(&self) -> Vec<ChatterId> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Visit every mounted chatter. The visit closure runs under the shard
    /// read lock; it may lock the handle but must not insert or remove
    /// registry entries.
    pub fn for_each(&self, mut visit: impl FnMut(&ChatterId, &ChatterHandle)) {
        for entry in &self.entries {
            visit(entry.key(), entry.value());
        }
    }
}
