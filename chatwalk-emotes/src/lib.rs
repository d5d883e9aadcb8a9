//! # chatwalk-emotes — emote resolution for chatwalk speech bubbles
//!
//! Turns raw chat messages into bounded sequences of text and inline-emote
//! segments:
//!   - **Provider ranges** — the transport tells us which character ranges
//!     are emotes (`25:6-10`); those always win.
//!   - **Name catalog** — a 7TV channel emote set, fetched once per session
//!     and cached, matched case-exact against whitespace tokens.
//!   - **Length budget** — a message never renders more than the configured
//!     visible length (default 35), counting each emote as one unit.
//!
//! A catalog outage degrades rendering to plain truncated text; it never
//! surfaces to the chatter as a blank bubble.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod display;
pub mod error;
pub mod segment;

pub use catalog::{Catalog, CatalogProvider, EmoteResolver};
pub use display::MessageDisplay;
pub use error::EmoteError;
pub use segment::{Segment, segment_message, visible_length};
