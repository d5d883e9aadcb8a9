//! Core type definitions for the chatwalk overlay engine.
//!
//! Everything a chatter carries on screen — identity, the persisted record,
//! and the animation state that gets snapshotted across remounts — lives
//! here and is serde round-trippable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Unique identifier for a chat participant.
///
/// This is the Twitch **user id**, not the per-message id — one chatter keeps
/// the same `ChatterId` across every message they send.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatterId(pub String);

impl ChatterId {
    /// Wrap a raw user-id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChatterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 2D vector used for both position and velocity, in screen units.
///
/// The stage origin is top-left: `y` grows downward, the floor plane sits at
/// `StageConfig::floor_y`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component (downward positive).
    pub y: f32,
}

impl Vec2 {
    /// Construct from components.
    #[must_use]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Walking direction
// ---------------------------------------------------------------------------

/// Which way a chatter is currently walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WalkDirection {
    /// Walking toward smaller x.
    Left,
    /// Not walking.
    #[default]
    Still,
    /// Walking toward larger x.
    Right,
}

impl WalkDirection {
    /// Signed value: -1, 0, or 1.
    #[must_use]
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Still => 0.0,
            Self::Right => 1.0,
        }
    }

    /// True while the chatter is in motion toward a target.
    #[must_use]
    pub fn is_walking(self) -> bool {
        self != Self::Still
    }

    /// Direction toward `target` from `x`.
    #[must_use]
    pub fn toward(x: f32, target: f32) -> Self {
        if x < target { Self::Right } else { Self::Left }
    }
}

// ---------------------------------------------------------------------------
// Animation state
// ---------------------------------------------------------------------------

/// The complete per-chatter animation state.
///
/// Owned exclusively by one [`crate::simulation::ChatterSimulation`]; a
/// snapshot may be taken to rehydrate a replacement instance after a remount
/// (`snapshot_state` / `restore_state` — ownership transfer, never shared
/// mutation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    /// Current position on the stage.
    pub position: Vec2,
    /// Current velocity, units per frame.
    pub velocity: Vec2,
    /// Walking direction; `Still` unless a target is set and unreached.
    pub walking: WalkDirection,
    /// True while the chatter rests on the floor plane.
    pub grounded: bool,
    /// Set once the chatter has completed at least one wander cycle; a
    /// fresh spawn wanders immediately, an idle chatter waits a random delay.
    pub idle: bool,
    /// Horizontal wander/walk target, if any.
    pub target_x: Option<f32>,
    /// Sticky facing: -1.0 or 1.0, preserved while standing still.
    pub direction: f32,
    /// Sprite scale factor for the renderer.
    pub sprite_scale: f32,
    /// Sprite source path/url for the renderer.
    pub sprite_source: String,
}

impl AnimationState {
    /// State for a chatter standing at `(x, floor_y)`, not yet grounded so
    /// the first tick pins it to the floor.
    #[must_use]
    pub fn spawned_at(x: f32, floor_y: f32) -> Self {
        Self {
            position: Vec2::new(x, floor_y),
            velocity: Vec2::default(),
            walking: WalkDirection::Still,
            grounded: false,
            idle: false,
            target_x: None,
            direction: 1.0,
            sprite_scale: 4.0,
            sprite_source: String::from("assets/idle.png"),
        }
    }
}

// ---------------------------------------------------------------------------
// Chatter record
// ---------------------------------------------------------------------------

/// The persisted record for one chat participant.
///
/// Created on the first observed message, updated on every subsequent one,
/// and deleted only by the inactivity eviction sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chatter {
    /// Stable identity (Twitch user id).
    pub id: ChatterId,
    /// Name shown under the character.
    pub display_name: String,
    /// Text of the most recent message.
    pub last_message: String,
    /// Wall-clock time of the most recent message.
    pub last_message_at: DateTime<Utc>,
    /// Animation snapshot saved at the last persist, if any.
    pub saved_state: Option<AnimationState>,
}

impl Chatter {
    /// Build a record for a chatter seen for the first time.
    #[must_use]
    pub fn new(
        id: ChatterId,
        display_name: impl Into<String>,
        last_message: impl Into<String>,
        last_message_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            last_message: last_message.into(),
            last_message_at,
            saved_state: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Incoming message (transport-agnostic)
// ---------------------------------------------------------------------------

/// The part of an inbound chat event the simulation actually consumes.
///
/// The transport crate maps provider envelopes into this; the engine never
/// sees provider metadata beyond the emote range spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Raw message text.
    pub text: String,
    /// Provider emote range spec (`emoteId:start-end,start-end/...`), if any.
    pub emote_spec: Option<String>,
}

impl IncomingMessage {
    /// A plain message with no provider emote ranges.
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            emote_spec: None,
        }
    }
}
