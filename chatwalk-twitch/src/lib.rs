//! # chatwalk-twitch — Twitch chat integration for the chatwalk overlay
//!
//! Connects the transport-facing edge of the overlay to the engine in
//! `chatwalk-core`:
//!   - [`events`] — serde types for the inbound chat envelope;
//!   - [`dispatch`] — routing messages to simulations, spawn-on-first-message,
//!     bot filtering, persistence;
//!   - [`scheduler`] — the async frame loop and the eviction sweep.
//!
//! The transport itself (websocket client, reconnect policy) lives outside
//! this crate; anything that can produce raw JSON payloads can drive
//! [`Dispatcher::dispatch`].

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod dispatch;
pub mod events;
pub mod scheduler;

pub use dispatch::{DispatchOutcome, Dispatcher};
pub use events::{ChatEnvelope, ChatEvent, MessageMeta};
pub use scheduler::Scheduler;
