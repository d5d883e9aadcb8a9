//! # chatwalk-core
//!
//! The chatter lifecycle and physics/animation engine behind the chatwalk
//! overlay. Every chat participant gets a [`simulation::ChatterSimulation`]:
//! a little character that falls, lands, wanders, jumps on command, and
//! holds a speech bubble for the most recent message.
//!
//! The engine is deliberately headless and deterministic:
//! - all timed behavior is driven by a `tick(now_ms, rng)` call from an
//!   external frame loop — no internal timers, nothing to cancel on drop;
//! - the [`registry::ChatterRegistry`] is an explicit shared object, not an
//!   ambient singleton;
//! - the [`store::ChatterStore`] persists records so the overlay survives a
//!   reload, and [`eviction`] removes chatters that have gone quiet.
//!
//! Rendering, the chat transport, and emote resolution live in sibling
//! crates; this one stops at typed state.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod eviction;
pub mod physics;
pub mod registry;
pub mod simulation;
pub mod store;
pub mod types;

pub use config::OverlayConfig;
pub use error::CoreError;
pub use registry::{ChatterHandle, ChatterRegistry};
pub use simulation::ChatterSimulation;
pub use store::ChatterStore;
pub use types::*;
