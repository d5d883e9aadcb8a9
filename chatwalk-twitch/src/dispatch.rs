//! Routing inbound chat events to chatter simulations.
//!
//! The dispatcher is the single writer path from the transport into the
//! engine: it parses the envelope, filters ignored bot accounts, spawns a
//! simulation on a chatter's first message, delivers the message, and
//! persists the chatter record. The in-memory registry stays authoritative
//! even when persistence fails.

use std::sync::Arc;

use chatwalk_core::config::OverlayConfig;
use chatwalk_core::registry::ChatterRegistry;
use chatwalk_core::simulation::ChatterSimulation;
use chatwalk_core::store::ChatterStore;
use chatwalk_core::types::{Chatter, ChatterId};
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::events::{ChatEnvelope, ChatEvent};

/// What happened to one inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Message delivered to an existing chatter.
    Delivered,
    /// First message from this chatter; a simulation was spawned.
    Spawned,
    /// Sender is on the ignore list; nothing happened.
    Ignored,
    /// Payload was malformed or carried no chat event; dropped with a log.
    Dropped,
}

/// Routes transport payloads into the registry and store.
pub struct Dispatcher {
    registry: Arc<ChatterRegistry>,
    store: Arc<Mutex<ChatterStore>>,
    config: OverlayConfig,
    ignored_users: Vec<String>,
    rng: Mutex<StdRng>,
}

impl Dispatcher {
    /// Build a dispatcher over a registry and store.
    ///
    /// `ignored_users` are matched case-insensitively against the sender's
    /// display name; bot accounts like `streamelements` go here.
    #[must_use]
    pub fn new(
        registry: Arc<ChatterRegistry>,
        store: Arc<Mutex<ChatterStore>>,
        config: OverlayConfig,
        ignored_users: Vec<String>,
    ) -> Self {
        Self::with_rng(registry, store, config, ignored_users, StdRng::from_entropy())
    }

    /// Like [`Dispatcher::new`] but with a caller-supplied RNG, for
    /// deterministic tests.
    #[must_use]
    pub fn with_rng(
        registry: Arc<ChatterRegistry>,
        store: Arc<Mutex<ChatterStore>>,
        config: OverlayConfig,
        ignored_users: Vec<String>,
        rng: StdRng,
    ) -> Self {
        let ignored_users = ignored_users
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect();
        Self {
            registry,
            store,
            config,
            ignored_users,
            rng: Mutex::new(rng),
        }
    }

    /// Handle one raw transport payload.
    ///
    /// Malformed payloads and non-chat envelopes are logged and dropped;
    /// they never take down the dispatcher.
    pub fn dispatch(&self, raw: &str, now_ms: u64) -> DispatchOutcome {
        let envelope: ChatEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "dropping malformed chat payload");
                return DispatchOutcome::Dropped;
            }
        };
        let Some(event) = envelope.data else {
            debug!("envelope carried no chat event");
            return DispatchOutcome::Dropped;
        };
        self.dispatch_event(&event, now_ms)
    }

    /// Handle an already-parsed chat event.
    pub fn dispatch_event(&self, event: &ChatEvent, now_ms: u64) -> DispatchOutcome {
        if self.is_ignored(&event.msg.display_name) {
            debug!(user = %event.msg.display_name, "ignoring bot account");
            return DispatchOutcome::Ignored;
        }

        let id = event.chatter_id();
        let spawned = !self.registry.contains(&id);
        let handle = match self.registry.get(&id) {
            Some(handle) => handle,
            None => {
                let sim = ChatterSimulation::spawn(
                    id.clone(),
                    event.msg.display_name.clone(),
                    self.config.clone(),
                    now_ms,
                    &mut *self.rng.lock(),
                );
                info!(chatter = %id, name = %event.msg.display_name, "spawning chatter");
                let handle: chatwalk_core::registry::ChatterHandle =
                    Arc::new(Mutex::new(sim));
                self.registry.insert_handle(id.clone(), Arc::clone(&handle));
                handle
            }
        };

        handle.lock().say(event.incoming_message(), now_ms);

        let record = Chatter {
            id: id.clone(),
            display_name: event.msg.display_name.clone(),
            last_message: event.message.clone(),
            last_message_at: Utc::now(),
            saved_state: None,
        };
        if let Err(e) = self.store.lock().upsert(&record) {
            warn!(chatter = %id, error = %e, "failed to persist chatter, continuing in memory");
        }

        if spawned {
            DispatchOutcome::Spawned
        } else {
            DispatchOutcome::Delivered
        }
    }

    /// Send a chatter walking toward an x coordinate.
    ///
    /// Returns `false` on a routing miss (unknown chatter); the miss is
    /// logged, never an error.
    pub fn walk_to(&self, id: &ChatterId, target_x: f32) -> bool {
        match self.registry.get(id) {
            Some(handle) => {
                handle.lock().walk_to(target_x);
                true
            }
            None => {
                debug!(chatter = %id, "walk_to for unknown chatter, ignoring");
                false
            }
        }
    }

    /// Make a chatter jump. Routing misses are logged no-ops.
    pub fn jump(&self, id: &ChatterId) -> bool {
        match self.registry.get(id) {
            Some(handle) => {
                handle.lock().jump();
                true
            }
            None => {
                debug!(chatter = %id, "jump for unknown chatter, ignoring");
                false
            }
        }
    }

    /// Rebuild simulations for every persisted chatter.
    ///
    /// Chatters with a saved animation state resume at their last position;
    /// the rest spawn fresh. Returns the number of chatters mounted.
    ///
    /// # Errors
    /// Returns the store error if the saved set cannot be read.
    pub fn mount_saved(&self, now_ms: u64) -> chatwalk_core::error::Result<usize> {
        let saved = self.store.lock().load_all()?;
        let mut rng = self.rng.lock();
        let mut mounted = 0;
        for (id, chatter) in saved {
            if self.registry.contains(&id) {
                continue;
            }
            let sim = match chatter.saved_state {
                Some(state) => ChatterSimulation::from_snapshot(
                    id.clone(),
                    chatter.display_name,
                    state,
                    self.config.clone(),
                    now_ms,
                ),
                None => ChatterSimulation::spawn(
                    id.clone(),
                    chatter.display_name,
                    self.config.clone(),
                    now_ms,
                    &mut *rng,
                ),
            };
            self.registry.insert(sim);
            mounted += 1;
        }
        info!(mounted, "mounted saved chatters");
        Ok(mounted)
    }

    fn is_ignored(&self, display_name: &str) -> bool {
        let lowered = display_name.to_lowercase();
        self.ignored_users.iter().any(|name| *name == lowered)
    }

    /// The registry this dispatcher routes into.
    #[must_use]
    pub fn registry(&self) -> &Arc<ChatterRegistry> {
        &self.registry
    }
}
