//! Movement Controller
//!
//! Runs the per-step pipeline for one character:
//!
//! ```text
//!  ┌───────────────┐  ┌──────────┐  ┌───────┐  ┌─────────┐  ┌──────┐
//!  │ platform carry├─►│ observed ├─►│ probe ├─►│ gravity ├─►│ walk │
//!  └───────────────┘  │ velocity │  └───────┘  └─────────┘  └──┬───┘
//!                     └──────────┘                             │
//!  ┌──────┐  ┌────────────┐  ┌──────┐  ┌──────────────────┐  ┌─▼────┐
//!  │ move │◄─┤ fall clamp │◄─┤ dash │◄─┤ wall slide/jump/ │◄─┤ jump │
//!  └──────┘  └────────────┘  └──────┘  │ grab/grab-jump   │  └──────┘
//!                                      └──────────────────┘
//! ```
//!
//! Later stages override speed written by earlier ones. The stage that last
//! wrote vertical speed is reported as the step's [`VerticalOwner`].

use thiserror::Error;
use tracing::{debug, info, warn};
#[cfg(feature = "debug-tracing")]
use tracing::trace;

use crate::collision::geometry::{CollisionWorld, PlatformVelocitySource};
use crate::collision::probe::{CollisionReport, CollisionSystem};
use crate::core::fixed::{Fixed, fixed_clamp, fixed_mul, fixed_sign, move_towards};
use crate::core::hash::StateHasher;
use crate::core::timer::TimerId;
use crate::core::vec2::FixedVec2;
use crate::game::config::{DerivedParams, MovementConfig};
use crate::game::dash::process_dash;
use crate::game::events::{MovementEvent, MovementEventKind};
use crate::game::input::{InputFrame, InputSource, InputState};
use crate::game::jump::process_jump;
use crate::game::state::MovementState;
use crate::game::wall::process_wall;

/// Controller errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// A required collaborator was not bound at activation
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

/// Ability stage that last wrote vertical speed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerticalOwner {
    /// Jump launch
    Jump,
    /// Early release cut
    JumpCut,
    /// Wall slide clamp
    WallSlide,
    /// Wall jump launch
    WallJump,
    /// Grab climb
    WallGrab,
    /// Ledge climb impulse
    EdgeClimb,
    /// Hop off a grabbed wall
    WallGrabJump,
    /// Active dash
    Dash,
    /// Post-dash reset
    PostDash,
}

/// Outcome of one step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// Controller step index
    pub step: u32,
    /// Committed position
    pub position: FixedVec2,
    /// Observed velocity at the start of the step
    pub observed_velocity: FixedVec2,
    /// Speed used for the move
    pub speed: FixedVec2,
    /// Grounded according to this step's probe
    pub grounded: bool,
    /// Contact info this step was decided on
    pub collisions: CollisionReport,
    /// One-shot notifications
    pub events: Vec<MovementEvent>,
    /// Last ability stage that wrote vertical speed
    pub vertical_owner: Option<VerticalOwner>,
}

/// Per-step inputs shared by the stage functions.
pub(crate) struct StepContext<'a> {
    pub input: &'a InputState,
    pub params: &'a DerivedParams,
    pub report: CollisionReport,
    pub step: u32,
    pub events: Vec<MovementEvent>,
    pub vertical_owner: Option<VerticalOwner>,
}

impl StepContext<'_> {
    pub fn emit(&mut self, kind: MovementEventKind) {
        debug!(step = self.step, event = kind.name(), "Movement event");
        self.events.push(MovementEvent::new(self.step, kind));
    }

    pub fn set_vertical(&mut self, state: &mut MovementState, speed: Fixed, owner: VerticalOwner) {
        state.speed.y = speed;
        self.vertical_owner = Some(owner);
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Movement pipeline for one character.
pub struct MovementController {
    config: MovementConfig,
    params: DerivedParams,
    probe: CollisionSystem,
    state: MovementState,
    input: Option<Box<dyn InputSource>>,
    last_frame: InputFrame,
    enabled: bool,
    step: u32,
}

impl std::fmt::Debug for MovementController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovementController")
            .field("state", &self.state)
            .field("enabled", &self.enabled)
            .field("has_input", &self.input.is_some())
            .field("step", &self.step)
            .finish()
    }
}

impl MovementController {
    /// Controller at `position`. Invalid config is logged and repaired.
    pub fn new(config: MovementConfig, position: FixedVec2) -> Self {
        let params = DerivedParams::derive(&config);
        let probe = CollisionSystem::new(params.collision);
        let mut state = MovementState::new(position);
        state.timers.arm(TimerId::WallGrab, params.wall_grab_steps);
        Self {
            config,
            params,
            probe,
            state,
            input: None,
            last_frame: InputFrame::new(),
            enabled: true,
            step: 0,
        }
    }

    /// Bind the input source used by [`Self::fixed_step`].
    pub fn bind_input(&mut self, source: Box<dyn InputSource>) {
        self.input = Some(source);
    }

    /// Builder form of [`Self::bind_input`].
    pub fn with_input(mut self, source: Box<dyn InputSource>) -> Self {
        self.bind_input(source);
        self
    }

    /// Check collaborators and enable the controller.
    ///
    /// Without an input source the controller is disabled once and stays so.
    pub fn activate(&mut self) -> Result<(), ControllerError> {
        if self.input.is_none() {
            self.disable_missing_input();
            return Err(ControllerError::MissingCollaborator("input source"));
        }
        self.enabled = true;
        info!(
            position = %self.state.position,
            rays = self.probe.ray_count(),
            "Movement controller activated"
        );
        Ok(())
    }

    fn disable_missing_input(&mut self) {
        if self.enabled {
            warn!("No input source bound, disabling movement controller");
        }
        self.enabled = false;
    }

    /// Enable or disable. Takes effect at the next step.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Whether [`Self::fixed_step`] runs.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pull one frame from the bound source and run one step.
    ///
    /// Returns the consumed frame with the step report, or `None` while disabled.
    pub fn fixed_step(
        &mut self,
        world: &dyn CollisionWorld,
        platforms: Option<&dyn PlatformVelocitySource>,
    ) -> Option<(InputFrame, StepReport)> {
        if !self.enabled {
            return None;
        }
        let frame = match self.input.as_mut() {
            Some(source) => source.next_frame(self.step),
            None => {
                self.disable_missing_input();
                return None;
            }
        };
        let input = InputState::derive(&self.last_frame, &frame);
        self.last_frame = frame;
        Some((frame, self.step_with_input(&input, world, platforms)))
    }

    /// Run one step with an explicit input snapshot.
    pub fn step_with_input(
        &mut self,
        input: &InputState,
        world: &dyn CollisionWorld,
        platforms: Option<&dyn PlatformVelocitySource>,
    ) -> StepReport {
        let step_index = self.step;
        let Self { params, probe, state, .. } = &mut *self;
        let params: &DerivedParams = params;
        probe.clear_debug_rays();

        // 0. Moving platform carry, sampled once
        if let (Some(id), Some(source)) = (state.riding, platforms) {
            if let Some(velocity) = source.platform_velocity(id) {
                let carry = probe.handle_collisions(world, state.position, velocity.scale(params.dt));
                state.position = state.position + carry.displacement;
            }
        }

        // 1. Observed velocity
        state.observed_velocity = (state.position - state.last_position).div_scalar(params.dt);
        state.last_position = state.position;

        // 2. Probe
        let report = probe.probe(world, state.position);
        let grounded = report.grounded();
        state.grounded = grounded;

        let mut ctx = StepContext {
            input,
            params,
            report,
            step: step_index,
            events: Vec::new(),
            vertical_owner: None,
        };

        // 3. Gravity
        apply_gravity(state, &ctx);

        // 4. Walk
        apply_walk(state, &ctx);

        // 5-7. Abilities
        process_jump(state, &mut ctx);
        process_wall(state, &mut ctx);
        let dashing = process_dash(state, &mut ctx, probe, world);

        // 8. Fall clamp
        if !dashing {
            clamp_fall(state, params);
        }

        // 9. Move
        let resolution = probe.handle_collisions(world, state.position, state.speed.scale(params.dt));
        state.position = state.position + resolution.displacement;

        state.riding = if grounded && state.speed.y <= 0 && probe.is_platform_layer(report.down.layer) {
            report.down.collider
        } else {
            None
        };

        #[cfg(feature = "debug-tracing")]
        trace!(
            step = step_index,
            position = %state.position,
            speed = %state.speed,
            grounded,
            owner = ?ctx.vertical_owner,
            "Movement step"
        );

        let step_report = StepReport {
            step: step_index,
            position: state.position,
            observed_velocity: state.observed_velocity,
            speed: state.speed,
            grounded,
            collisions: report,
            events: ctx.events,
            vertical_owner: ctx.vertical_owner,
        };
        self.step += 1;
        step_report
    }

    /// Current state.
    pub fn state(&self) -> &MovementState {
        &self.state
    }

    /// Current position.
    pub fn position(&self) -> FixedVec2 {
        self.state.position
    }

    /// Observed velocity (external queries only).
    pub fn velocity(&self) -> FixedVec2 {
        self.state.observed_velocity
    }

    /// Teleport. Speed and timers are kept.
    pub fn set_position(&mut self, position: FixedVec2) {
        self.state.position = position;
        self.state.last_position = position;
        self.state.riding = None;
    }

    /// Designer config as given.
    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Derived step constants.
    pub fn params(&self) -> &DerivedParams {
        &self.params
    }

    /// Collision probe (debug rays live here).
    pub fn probe(&self) -> &CollisionSystem {
        &self.probe
    }

    /// Mutable probe access for a debug renderer.
    pub fn probe_mut(&mut self) -> &mut CollisionSystem {
        &mut self.probe
    }

    /// Steps executed so far.
    pub fn step_count(&self) -> u32 {
        self.step
    }

    /// Hash step count, input edge memory and movement state.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.step);
        hasher.update_bytes(&[
            self.last_frame.move_x as u8,
            self.last_frame.move_y as u8,
            self.last_frame.buttons,
        ]);
        hasher.update_bool(self.enabled);
        self.state.hash_into(hasher);
    }
}

// =============================================================================
// BASIC STAGES
// =============================================================================

fn apply_gravity(state: &mut MovementState, ctx: &StepContext<'_>) {
    let report = &ctx.report;
    if !report.grounded() && !state.timers.is_active(TimerId::Coyote) {
        state.speed.y = state.speed.y.saturating_sub(ctx.params.gravity_step);
    }

    let landing = report.down.colliding && state.speed.y <= 0;
    let bonk = report.up.colliding && state.speed.y > 0;
    if landing || bonk {
        state.speed.y = 0;
    }
}

fn apply_walk(state: &mut MovementState, ctx: &StepContext<'_>) {
    if state.wall_jump_in_progress {
        return;
    }

    let p = ctx.params;
    let horizontal = ctx.input.horizontal;
    let target = fixed_mul(p.max_move_speed, horizontal);
    let rate = if horizontal != 0 { p.acceleration_step } else { p.deceleration_step };
    state.speed.x = move_towards(state.speed.x, target, rate);

    if horizontal != 0 {
        state.facing = fixed_sign(horizontal);
    }
}

fn clamp_fall(state: &mut MovementState, params: &DerivedParams) {
    if state.speed.y < 0 {
        let magnitude = fixed_clamp(-state.speed.y, params.min_fall_speed, params.max_fall_speed);
        state.speed.y = -magnitude;
    }
}
