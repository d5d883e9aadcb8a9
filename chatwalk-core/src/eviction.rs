//! Inactivity eviction — silent chatters leave the overlay.
//!
//! A chatter that has not sent a message for `inactive_after_ms` is removed
//! from both the registry (the character disappears) and the store (the
//! record is gone on the next reload). The sweep runs periodically from the
//! scheduler; evicting is never fatal — a store failure leaves the record
//! behind for the next sweep.

use tracing::{info, warn};

use crate::config::EvictionConfig;
use crate::registry::ChatterRegistry;
use crate::store::ChatterStore;
use crate::types::ChatterId;

/// Whether a chatter whose last activity was at `last_active_ms` counts as
/// inactive at `now_ms`.
#[must_use]
pub fn is_inactive(last_active_ms: u64, now_ms: u64, config: &EvictionConfig) -> bool {
    now_ms.saturating_sub(last_active_ms) > config.inactive_after_ms
}

/// Result of one eviction sweep.
#[derive(Debug, Default)]
pub struct SweepResult {
    /// Chatters removed from the registry and store.
    pub evicted: Vec<ChatterId>,
    /// Chatters removed from the registry whose store delete failed; their
    /// records remain until a later sweep.
    pub store_failures: Vec<ChatterId>,
}

/// Run one eviction pass over every mounted chatter.
pub fn sweep(
    registry: &ChatterRegistry,
    store: &ChatterStore,
    now_ms: u64,
    config: &EvictionConfig,
) -> SweepResult {
    let mut stale = Vec::new();
    registry.for_each(|id, handle| {
        if is_inactive(handle.lock().last_active_ms(), now_ms, config) {
            stale.push(id.clone());
        }
    });

    let mut result = SweepResult::default();
    for id in stale {
        registry.remove(&id);
        match store.delete(&id) {
            Ok(_) => result.evicted.push(id),
            Err(e) => {
                warn!(chatter = %id, error = %e, "eviction: store delete failed");
                result.store_failures.push(id);
            }
        }
    }

    if !result.evicted.is_empty() {
        info!(count = result.evicted.len(), "evicted inactive chatters");
    }
    result
}
