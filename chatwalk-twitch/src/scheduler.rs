//! Frame and maintenance loops.
//!
//! Two cadences drive the overlay:
//!   - the **frame loop** ticks every mounted simulation at the configured
//!     frame interval (default 16ms);
//!   - the **sweep loop** periodically snapshots animation state to the
//!     store and evicts chatters inactive past the configured window.
//!
//! Both run inside a single `tokio::select!` so a shutdown signal cancels
//! them together. Simulation time is milliseconds since the scheduler
//! started, so it is monotonic regardless of wall-clock adjustments.

use std::sync::Arc;
use std::time::Duration;

use chatwalk_core::config::OverlayConfig;
use chatwalk_core::eviction;
use chatwalk_core::registry::ChatterRegistry;
use chatwalk_core::store::ChatterStore;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Drives the per-frame simulation updates and the eviction sweep.
pub struct Scheduler {
    registry: Arc<ChatterRegistry>,
    store: Arc<Mutex<ChatterStore>>,
    config: OverlayConfig,
}

impl Scheduler {
    /// Build a scheduler over a registry and store.
    #[must_use]
    pub fn new(
        registry: Arc<ChatterRegistry>,
        store: Arc<Mutex<ChatterStore>>,
        config: OverlayConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    /// Run both loops until the shutdown channel flips to `true` or the
    /// sender side is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let started = Instant::now();
        let mut rng = StdRng::from_entropy();

        let frame_period = Duration::from_millis(self.config.scheduler.frame_interval_ms);
        let mut frames = tokio::time::interval(frame_period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first sweep waits a full period; sweeping at t=0 is useless.
        let sweep_period = Duration::from_millis(self.config.eviction.sweep_interval_ms);
        let mut sweeps = tokio::time::interval_at(started + sweep_period, sweep_period);
        sweeps.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            frame_interval_ms = self.config.scheduler.frame_interval_ms,
            sweep_interval_ms = self.config.eviction.sweep_interval_ms,
            "scheduler running"
        );

        loop {
            tokio::select! {
                _ = frames.tick() => {
                    let now_ms = elapsed_ms(started);
                    self.tick_frame(now_ms, &mut rng);
                }
                _ = sweeps.tick() => {
                    let now_ms = elapsed_ms(started);
                    self.run_sweep(now_ms);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        // Final snapshot so positions survive the shutdown.
        self.save_snapshots();
        info!("scheduler stopped");
    }

    /// Advance every mounted simulation by one frame.
    pub fn tick_frame(&self, now_ms: u64, rng: &mut impl Rng) {
        self.registry.for_each(|_, handle| {
            handle.lock().tick(now_ms, rng);
        });
    }

    /// Persist animation snapshots, then evict inactive chatters.
    pub fn run_sweep(&self, now_ms: u64) {
        self.save_snapshots();
        let store = self.store.lock();
        eviction::sweep(&self.registry, &store, now_ms, &self.config.eviction);
    }

    /// The registry this scheduler ticks.
    #[must_use]
    pub fn registry(&self) -> &Arc<ChatterRegistry> {
        &self.registry
    }

    fn save_snapshots(&self) {
        let store = self.store.lock();
        self.registry.for_each(|id, handle| {
            let snapshot = handle.lock().snapshot_state();
            if let Err(e) = store.save_state(id, &snapshot) {
                warn!(chatter = %id, error = %e, "failed to snapshot animation state");
            }
        });
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
