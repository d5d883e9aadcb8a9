//! Per-chatter simulation — the state machine behind each on-screen character.
//!
//! One [`ChatterSimulation`] owns one chatter's [`AnimationState`] and
//! advances it through a single `tick(now_ms, rng)` entry point. Timed
//! behavior (the idle-wander delay, the speech bubble lifetime) is modeled
//! as deadlines compared against the tick clock, so there are no callbacks
//! to cancel: dropping the instance drops every pending wait with it.
//!
//! States: Falling, Grounded-Idle, Grounded-Walking, plus the airborne jump
//! arc which reuses the falling integration with an impulse start.

use rand::Rng;
use tracing::debug;

use crate::config::OverlayConfig;
use crate::physics;
use crate::types::{AnimationState, Chatter, ChatterId, IncomingMessage, WalkDirection};

// ---------------------------------------------------------------------------
// Active message
// ---------------------------------------------------------------------------

/// A message currently shown in a chatter's speech bubble.
///
/// At most one exists per chatter; a newer message replaces it outright and
/// restarts the expiry clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveMessage {
    /// The message as received from the transport.
    pub message: IncomingMessage,
    /// Tick-clock time the message arrived.
    pub received_at_ms: u64,
    /// Tick-clock time the bubble disappears.
    pub expires_at_ms: u64,
}

// ---------------------------------------------------------------------------
// ChatterSimulation
// ---------------------------------------------------------------------------

/// The live simulation instance for one chatter.
#[derive(Debug)]
pub struct ChatterSimulation {
    id: ChatterId,
    display_name: String,
    state: AnimationState,
    data: Option<Chatter>,
    message: Option<ActiveMessage>,
    /// Deadline for picking the next wander target, if one is pending.
    wander_due_at: Option<u64>,
    /// Tick-clock time of the last message (or the spawn, before any).
    last_active_ms: u64,
    config: OverlayConfig,
}

impl ChatterSimulation {
    /// Spawn a fresh chatter at a random spot on the floor.
    ///
    /// The character starts ungrounded so the first tick runs the landing
    /// transition, exactly like a reload would.
    pub fn spawn(
        id: ChatterId,
        display_name: impl Into<String>,
        config: OverlayConfig,
        now_ms: u64,
        rng: &mut impl Rng,
    ) -> Self {
        let min_x = config.stage.spawn_margin.min(config.stage.width);
        let x = rng.gen_range(min_x..config.stage.width.max(min_x + 1.0));
        let state = AnimationState::spawned_at(x, config.stage.floor_y);
        Self {
            id,
            display_name: display_name.into(),
            state,
            data: None,
            message: None,
            wander_due_at: None,
            last_active_ms: now_ms,
            config,
        }
    }

    /// Rebuild an instance from a saved snapshot (remount continuity).
    pub fn from_snapshot(
        id: ChatterId,
        display_name: impl Into<String>,
        state: AnimationState,
        config: OverlayConfig,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            state,
            data: None,
            message: None,
            wander_due_at: None,
            last_active_ms: now_ms,
            config,
        }
    }

    /// The chatter this instance animates.
    #[must_use]
    pub fn id(&self) -> &ChatterId {
        &self.id
    }

    /// Name rendered under the character.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    // ------------------------------------------------------------------
    // Frame loop
    // ------------------------------------------------------------------

    /// Advance one frame.
    ///
    /// Runs, in order: message expiry, movement integration, target
    /// arrival/steering, facing update, and idle-wander scheduling. Calling
    /// this is the only way simulation state changes over time.
    pub fn tick(&mut self, now_ms: u64, rng: &mut impl Rng) {
        self.expire_message(now_ms);

        physics::integrate_frame(&mut self.state, &self.config.physics, self.config.stage.floor_y);

        self.steer_toward_target();
        if self.state.walking.is_walking() {
            // Facing is the mirror of the walk direction and sticks while idle.
            self.state.direction = -self.state.walking.sign();
        }

        self.schedule_wander(now_ms, rng);
    }

    fn expire_message(&mut self, now_ms: u64) {
        if let Some(active) = &self.message {
            if now_ms >= active.expires_at_ms {
                debug!(chatter = %self.id, "message expired");
                self.message = None;
            }
        }
    }

    fn steer_toward_target(&mut self) {
        let Some(target) = self.state.target_x else {
            self.state.walking = WalkDirection::Still;
            return;
        };
        if physics::has_arrived(
            self.state.position.x,
            target,
            self.config.physics.arrival_tolerance,
        ) {
            self.state.target_x = None;
            self.state.walking = WalkDirection::Still;
        } else {
            self.state.walking = WalkDirection::toward(self.state.position.x, target);
        }
    }

    /// Continuous wandering: while grounded with no target, wait an idle
    /// delay (uniform in `[0, max)` once idle, immediate on first landing,
    /// floored at `min`) and then pick a random spot on the stage.
    fn schedule_wander(&mut self, now_ms: u64, rng: &mut impl Rng) {
        if !self.state.grounded || self.state.target_x.is_some() {
            return;
        }
        match self.wander_due_at {
            None => {
                let raw = if self.state.idle {
                    rng.gen_range(0..self.config.idle.max_delay_ms)
                } else {
                    0
                };
                let delay = raw.max(self.config.idle.min_delay_ms);
                self.wander_due_at = Some(now_ms + delay);
            }
            Some(due) if now_ms >= due => {
                let target = rng.gen_range(0.0..self.config.stage.width);
                self.state.target_x = Some(target);
                self.state.idle = true;
                self.wander_due_at = None;
            }
            Some(_) => {}
        }
    }

    // ------------------------------------------------------------------
    // Control surface
    // ------------------------------------------------------------------

    /// Walk to a horizontal position. Takes effect on the next tick; any
    /// pending wander wait is abandoned.
    pub fn walk_to(&mut self, x: f32) {
        self.state.target_x = Some(x);
        self.wander_due_at = None;
    }

    /// Show a message in the speech bubble, replacing whatever is there and
    /// restarting the expiry clock.
    pub fn say(&mut self, message: IncomingMessage, now_ms: u64) {
        self.message = Some(ActiveMessage {
            message,
            received_at_ms: now_ms,
            expires_at_ms: now_ms + self.config.message.visibility_ms,
        });
        self.last_active_ms = now_ms;
    }

    /// Launch the jump arc: fixed up-and-backward impulse, airborne until
    /// the falling integration grounds the chatter again.
    pub fn jump(&mut self) {
        physics::apply_jump(&mut self.state, &self.config.physics);
    }

    /// Attach the externally owned chatter record. Does not touch animation
    /// state.
    pub fn set_data(&mut self, data: Chatter) {
        self.data = Some(data);
    }

    /// The attached chatter record, if any.
    #[must_use]
    pub fn data(&self) -> Option<&Chatter> {
        self.data.as_ref()
    }

    /// Serialize the current animation state for remount continuity.
    #[must_use]
    pub fn snapshot_state(&self) -> AnimationState {
        self.state.clone()
    }

    /// Replace the animation state wholesale from a snapshot.
    pub fn restore_state(&mut self, state: AnimationState) {
        self.state = state;
        self.wander_due_at = None;
    }

    /// The message currently visible, if any.
    #[must_use]
    pub fn current_message(&self) -> Option<&ActiveMessage> {
        self.message.as_ref()
    }

    /// Tick-clock time of the last message (or spawn).
    #[must_use]
    pub fn last_active_ms(&self) -> u64 {
        self.last_active_ms
    }

    /// Read-only view of the animation state (for renderers and tests).
    #[must_use]
    pub fn state(&self) -> &AnimationState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn sim() -> ChatterSimulation {
        ChatterSimulation::spawn(
            ChatterId::from("1001"),
            "test_chatter",
            OverlayConfig::default(),
            0,
            &mut rng(),
        )
    }

    /// Drive `n` frames at 16ms apart, returning the final clock value.
    fn run_frames(sim: &mut ChatterSimulation, start_ms: u64, n: u64, rng: &mut StdRng) -> u64 {
        let mut now = start_ms;
        for _ in 0..n {
            now += 16;
            sim.tick(now, rng);
        }
        now
    }

    #[test]
    fn spawn_grounds_on_first_tick() {
        let mut sim = sim();
        assert!(!sim.state().grounded);
        sim.tick(16, &mut rng());
        assert!(sim.state().grounded);
        assert_eq!(sim.state().velocity.y, 0.0);
    }

    #[test]
    fn walk_to_reaches_target_and_clears_it() {
        let mut sim = sim();
        let mut r = rng();
        sim.tick(16, &mut r); // ground
        let start_x = sim.state().position.x;
        let target = start_x + 40.0;
        sim.walk_to(target);

        let mut now = 16;
        for _ in 0..200 {
            now += 16;
            sim.tick(now, &mut r);
            if sim.state().target_x.is_none() {
                break;
            }
        }
        assert!(sim.state().target_x.is_none(), "target should clear on arrival");
        assert_eq!(sim.state().walking, WalkDirection::Still);
        assert!((sim.state().position.x - target).abs() < 1.0 + 1.0);
    }

    #[test]
    fn direction_mirrors_walking_and_sticks() {
        let mut sim = sim();
        let mut r = rng();
        sim.tick(16, &mut r);
        sim.walk_to(sim.state().position.x + 100.0);
        sim.tick(32, &mut r);
        assert_eq!(sim.state().walking, WalkDirection::Right);
        assert_eq!(sim.state().direction, -1.0);

        // Force arrival; facing must not reset while standing still.
        sim.walk_to(sim.state().position.x);
        sim.tick(48, &mut r);
        assert_eq!(sim.state().walking, WalkDirection::Still);
        assert_eq!(sim.state().direction, -1.0);
    }

    #[test]
    fn grounded_chatter_wanders_on_its_own() {
        let mut sim = sim();
        let mut r = rng();
        // Spawn has never idled, so the first wander fires after the 500ms
        // floor. 80 frames * 16ms = 1280ms of sim time.
        run_frames(&mut sim, 0, 80, &mut r);
        assert!(
            sim.state().target_x.is_some() || sim.state().idle,
            "fresh chatter should pick a wander target quickly"
        );
        assert!(sim.state().idle);
    }

    #[test]
    fn wander_targets_stay_inside_the_stage() {
        let mut sim = sim();
        let mut r = rng();
        let width = OverlayConfig::default().stage.width;
        let mut now = 0;
        for _ in 0..3000 {
            now += 16;
            sim.tick(now, &mut r);
            if let Some(t) = sim.state().target_x {
                assert!((0.0..width).contains(&t));
            }
        }
    }

    #[test]
    fn say_shows_message_until_visibility_timeout() {
        let mut sim = sim();
        let mut r = rng();
        sim.tick(16, &mut r);
        sim.say(IncomingMessage::plain("hi"), 100);
        assert!(sim.current_message().is_some());

        // Just before the 10s timeout it is still visible.
        sim.tick(100 + 9_999, &mut r);
        assert!(sim.current_message().is_some());

        // At the timeout the bubble clears.
        sim.tick(100 + 10_000, &mut r);
        assert!(sim.current_message().is_none());
    }

    #[test]
    fn newer_message_replaces_and_restarts_the_clock() {
        let mut sim = sim();
        let mut r = rng();
        sim.say(IncomingMessage::plain("first"), 0);
        sim.say(IncomingMessage::plain("second"), 8_000);

        sim.tick(10_001, &mut r);
        let visible = sim.current_message().expect("second message still up");
        assert_eq!(visible.message.text, "second");

        sim.tick(18_000, &mut r);
        assert!(sim.current_message().is_none());
    }

    #[test]
    fn snapshot_restore_reproduces_state() {
        let mut sim = sim();
        let mut r = rng();
        run_frames(&mut sim, 0, 120, &mut r);
        sim.jump();
        sim.tick(2000, &mut r);

        let snapshot = sim.snapshot_state();
        let mut replacement = ChatterSimulation::from_snapshot(
            ChatterId::from("1001"),
            "test_chatter",
            snapshot.clone(),
            OverlayConfig::default(),
            2000,
        );
        assert_eq!(replacement.snapshot_state(), snapshot);
        assert_eq!(replacement.state().position, sim.state().position);
        assert_eq!(replacement.state().velocity, sim.state().velocity);
        assert_eq!(replacement.state().walking, sim.state().walking);
        assert_eq!(replacement.state().direction, sim.state().direction);

        // And the replacement keeps simulating from where the old one left off.
        replacement.tick(2016, &mut r);
    }

    #[test]
    fn jump_leaves_the_ground() {
        let mut sim = sim();
        let mut r = rng();
        sim.tick(16, &mut r);
        assert!(sim.state().grounded);
        sim.jump();
        assert!(!sim.state().grounded);
        assert_eq!(sim.state().velocity.y, -25.0);
    }

    #[test]
    fn set_data_does_not_disturb_animation_state() {
        let mut sim = sim();
        let mut r = rng();
        run_frames(&mut sim, 0, 10, &mut r);
        let before = sim.snapshot_state();
        sim.set_data(Chatter::new(
            ChatterId::from("1001"),
            "test_chatter",
            "hello",
            chrono::Utc::now(),
        ));
        assert_eq!(sim.snapshot_state(), before);
        assert_eq!(sim.data().expect("data").display_name, "test_chatter");
    }
}
