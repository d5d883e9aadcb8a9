//! Configuration for the chatwalk overlay engine.
//!
//! Maps directly to `chatwalk.toml`. Every section has serde defaults so a
//! missing or partial file still yields a working overlay.

use serde::{Deserialize, Serialize};

/// Top-level overlay configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Stage geometry (viewport the characters live in).
    #[serde(default)]
    pub stage: StageConfig,
    /// Physics feel-tuning constants.
    #[serde(default)]
    pub physics: PhysicsConfig,
    /// Idle-wander timing.
    #[serde(default)]
    pub idle: IdleConfig,
    /// Speech bubble limits and timing.
    #[serde(default)]
    pub message: MessageConfig,
    /// Inactivity eviction policy.
    #[serde(default)]
    pub eviction: EvictionConfig,
    /// SQLite persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Frame scheduler settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl OverlayConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::CoreError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// The rectangle the characters move in, in screen units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Stage width; wander targets are picked inside `[0, width)`.
    #[serde(default = "default_stage_width")]
    pub width: f32,
    /// Y coordinate of the floor plane (y grows downward).
    #[serde(default = "default_floor_y")]
    pub floor_y: f32,
    /// Minimum distance from the left edge for fresh spawns.
    #[serde(default = "default_spawn_margin")]
    pub spawn_margin: f32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: 1920.0,
            floor_y: 1080.0,
            spawn_margin: 150.0,
        }
    }
}

/// Physics constants, in units per frame.
///
/// These are tuned for feel, not derived from real physics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Horizontal velocity decay per frame while airborne.
    #[serde(default = "default_drag")]
    pub drag: f32,
    /// Downward acceleration per frame, also the terminal fall speed.
    #[serde(default = "default_falling_speed")]
    pub falling_speed: f32,
    /// Impulse applied on a jump: up and slightly backward.
    #[serde(default = "default_jump_force")]
    pub jump_force: (f32, f32),
    /// Horizontal speed while walking, units per frame.
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    /// Distance from the target below which the chatter counts as arrived.
    #[serde(default = "default_arrival_tolerance")]
    pub arrival_tolerance: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            drag: 0.1,
            falling_speed: 4.0,
            jump_force: (-25.0, -25.0),
            walk_speed: 1.0,
            arrival_tolerance: 1.0,
        }
    }
}

/// How long a grounded chatter waits before wandering somewhere new.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleConfig {
    /// Floor on the wander delay, even for fresh spawns.
    #[serde(default = "default_idle_min_ms")]
    pub min_delay_ms: u64,
    /// Upper bound of the uniform random delay once a chatter has idled.
    #[serde(default = "default_idle_max_ms")]
    pub max_delay_ms: u64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// Speech bubble budget and lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Maximum visible length of a rendered message; each emote counts as 1.
    #[serde(default = "default_max_visible_len")]
    pub max_visible_len: usize,
    /// How long a message stays visible with no newer message.
    #[serde(default = "default_visibility_ms")]
    pub visibility_ms: u64,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            max_visible_len: 35,
            visibility_ms: 10_000,
        }
    }
}

/// When silent chatters get removed from the overlay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    /// A chatter whose last message is older than this is evicted.
    #[serde(default = "default_inactive_after_ms")]
    pub inactive_after_ms: u64,
    /// How often the eviction sweep runs.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            inactive_after_ms: 600_000,
            sweep_interval_ms: 60_000,
        }
    }
}

/// SQLite store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Enable WAL journaling for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { wal_mode: true }
    }
}

/// Frame-loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Milliseconds between simulation frames (16 ≈ 60fps).
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_stage_width() -> f32 {
    1920.0
}
fn default_floor_y() -> f32 {
    1080.0
}
fn default_spawn_margin() -> f32 {
    150.0
}
fn default_drag() -> f32 {
    0.1
}
fn default_falling_speed() -> f32 {
    4.0
}
fn default_jump_force() -> (f32, f32) {
    (-25.0, -25.0)
}
fn default_walk_speed() -> f32 {
    1.0
}
fn default_arrival_tolerance() -> f32 {
    1.0
}
fn default_idle_min_ms() -> u64 {
    500
}
fn default_idle_max_ms() -> u64 {
    10_000
}
fn default_max_visible_len() -> usize {
    35
}
fn default_visibility_ms() -> u64 {
    10_000
}
fn default_inactive_after_ms() -> u64 {
    600_000
}
fn default_sweep_interval_ms() -> u64 {
    60_000
}
fn default_true() -> bool {
    true
}
fn default_frame_interval_ms() -> u64 {
    16
}
