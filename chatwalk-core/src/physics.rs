//! Frame integration for chatter movement.
//!
//! One ground plane, vertical gravity with a terminal velocity, horizontal
//! drag while airborne. Everything is measured in screen units per frame;
//! the constants in [`PhysicsConfig`] are feel-tuning knobs, not physics.
//!
//! ```text
//! position += velocity                  (y clamped to the floor)
//! vx = grounded ? walking * walk_speed : vx * (1 - drag)
//! vy = min(vy + falling_speed, falling_speed)   while airborne
//! floor contact: y = floor, vy = 0, grounded = true
//! ```

use crate::config::PhysicsConfig;
use crate::types::AnimationState;

/// Advance one frame of movement.
///
/// Grounding happens in the same frame the chatter reaches the floor: the
/// vertical velocity is pinned to zero on that exact tick, never later.
/// While grounded, horizontal velocity is driven directly by the walking
/// direction and vertical velocity stays pinned.
pub fn integrate_frame(state: &mut AnimationState, physics: &PhysicsConfig, floor_y: f32) {
    state.position.x += state.velocity.x;
    state.position.y = (state.position.y + state.velocity.y).min(floor_y);

    if state.grounded {
        state.velocity.x = state.walking.sign() * physics.walk_speed;
    } else {
        state.velocity.x *= 1.0 - physics.drag;
        // Gravity with a terminal velocity ceiling.
        state.velocity.y = (state.velocity.y + physics.falling_speed).min(physics.falling_speed);
    }

    if state.position.y >= floor_y && !state.grounded {
        state.position.y = floor_y;
        state.velocity.y = 0.0;
        state.grounded = true;
    }
}

/// Apply the jump impulse: up and slightly backward, plus a small vertical
/// offset so the floor-contact check does not re-ground the chatter on the
/// same frame.
pub fn apply_jump(state: &mut AnimationState, physics: &PhysicsConfig) {
    state.velocity.x = physics.jump_force.0;
    state.velocity.y = physics.jump_force.1;
    state.position.y -= 5.0;
    state.grounded = false;
}

/// True once `x` is within the arrival tolerance of `target`.
#[must_use]
pub fn has_arrived(x: f32, target: f32, tolerance: f32) -> bool {
    (x - target).abs() < tolerance
}
