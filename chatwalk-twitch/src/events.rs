//! Inbound chat events from the Twitch transport.
//!
//! The transport delivers JSON envelopes of the shape
//! `{ "data": { "type", "channel", "user", "message", "msg": { ... } } }`.
//! The engine consumes only the message text, the emote range spec, and the
//! sender identity; all other provider metadata is ignored on parse.

use chatwalk_core::types::{ChatterId, IncomingMessage};
use serde::Deserialize;

/// Top-level envelope around a chat event. Envelopes without a `data` field
/// (keepalives, service notices) are not chat events.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEnvelope {
    /// The chat event payload, if this envelope carries one.
    pub data: Option<ChatEvent>,
}

/// One chat message event.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatEvent {
    /// Provider event type (e.g. `"message"`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Channel the message was sent in.
    pub channel: String,
    /// Login name of the sender.
    pub user: String,
    /// Raw message text.
    pub message: String,
    /// Per-message provider metadata.
    pub msg: MessageMeta,
}

/// The subset of Twitch per-message metadata the overlay consumes.
/// Everything else in the provider blob is dropped at parse time.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMeta {
    /// Provider message id (unique per message, not per user).
    pub id: String,
    /// Stable sender id — the canonical chatter identity.
    pub user_id: String,
    /// Display name to render under the character.
    pub display_name: String,
    /// Emote range spec (`emoteId:start-end,.../...`), if the message has
    /// provider emotes.
    #[serde(default)]
    pub emotes: Option<String>,
}

impl ChatEvent {
    /// Canonical chatter identity for this event (the user id, never the
    /// message id).
    #[must_use]
    pub fn chatter_id(&self) -> ChatterId {
        ChatterId::new(self.msg.user_id.clone())
    }

    /// The transport-agnostic message the simulation consumes.
    #[must_use]
    pub fn incoming_message(&self) -> IncomingMessage {
        IncomingMessage {
            text: self.message.clone(),
            emote_spec: self.msg.emotes.clone().filter(|spec| !spec.is_empty()),
        }
    }
}
