//! Simulation Host
//!
//! Drives every character at a fixed rate, independent of the presentation
//! frame rate. This is the loop a replay is verified against.
//!
//! ```text
//!  render frame (variable dt)
//!        │
//!        ▼
//!  FixedStepClock ── N whole steps due ──► tick() × N
//!                                            │
//!                                            ├─ 1. advance moving platforms
//!                                            └─ 2. step characters in id order
//! ```

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::collision::geometry::BoxWorld;
use crate::core::fixed::{Fixed, fixed_from_f64};
use crate::core::hash::{compute_state_hash, StateHash};
use crate::core::vec2::FixedVec2;
use crate::game::config::MovementConfig;
use crate::game::controller::MovementController;
use crate::game::events::CharacterEvent;
use crate::game::input::{InputFrame, InputSource};
use crate::game::state::CharacterId;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

// =============================================================================
// CLOCK
// =============================================================================

/// Converts variable presentation time into whole fixed steps.
///
/// Time is accumulated in integer nanoseconds so the number of due steps
/// never depends on float rounding across frames.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedStepClock {
    step_nanos: u64,
    accumulated: u64,
}

impl FixedStepClock {
    /// Clock stepping `tick_rate` times per second.
    pub fn new(tick_rate: u32) -> Self {
        Self {
            step_nanos: NANOS_PER_SECOND / u64::from(tick_rate.max(1)),
            accumulated: 0,
        }
    }

    /// Length of one step in nanoseconds.
    pub fn step_nanos(&self) -> u64 {
        self.step_nanos
    }

    /// Add elapsed frame time and return how many steps are now due.
    ///
    /// Negative or non-finite durations add nothing.
    pub fn advance(&mut self, seconds: f64) -> u32 {
        if seconds.is_finite() && seconds > 0.0 {
            self.accumulated += (seconds * NANOS_PER_SECOND as f64).round() as u64;
        }
        let due = self.accumulated / self.step_nanos;
        self.accumulated -= due * self.step_nanos;
        due as u32
    }

    /// Time carried over to the next frame, as a fraction of a step.
    pub fn alpha(&self) -> f64 {
        self.accumulated as f64 / self.step_nanos as f64
    }
}

// =============================================================================
// SIMULATION
// =============================================================================

/// Input frame consumed by a character on a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConsumedInput {
    /// Character that read the frame
    pub character: CharacterId,
    /// Controller step the frame was read for
    pub step: u32,
    /// The frame
    pub frame: InputFrame,
}

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Tick number that was simulated
    pub tick: u32,
    /// Movement events, in character order
    pub events: Vec<CharacterEvent>,
    /// Frames read by each stepped character
    pub inputs: Vec<ConsumedInput>,
}

/// When and where a character entered the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpawnRecord {
    /// First tick the character is stepped on
    pub tick: u32,
    /// Initial position
    pub position: FixedVec2,
}

/// Fixed-rate host for a world and its characters.
pub struct Simulation {
    world: BoxWorld,
    characters: BTreeMap<CharacterId, MovementController>,
    spawns: BTreeMap<CharacterId, SpawnRecord>,
    tick: u32,
    tick_rate: u32,
    dt: Fixed,
    clock: FixedStepClock,
    next_id: u32,
}

impl Simulation {
    /// Simulation over `world` at `tick_rate` Hz.
    pub fn new(world: BoxWorld, tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        info!(tick_rate, colliders = world.boxes().len(), "Simulation created");
        Self {
            world,
            characters: BTreeMap::new(),
            spawns: BTreeMap::new(),
            tick: 0,
            tick_rate,
            dt: fixed_from_f64(1.0 / f64::from(tick_rate)),
            clock: FixedStepClock::new(tick_rate),
            next_id: 0,
        }
    }

    /// Spawn a character with the next free id.
    ///
    /// The config's step duration is overridden by the simulation rate.
    pub fn add_character(
        &mut self,
        config: MovementConfig,
        position: FixedVec2,
        input: Box<dyn InputSource>,
    ) -> CharacterId {
        let id = CharacterId(self.next_id);
        self.insert_character(id, config, position, input);
        id
    }

    /// Spawn a character under a caller-chosen id, replacing any existing one.
    pub fn insert_character(
        &mut self,
        id: CharacterId,
        mut config: MovementConfig,
        position: FixedVec2,
        input: Box<dyn InputSource>,
    ) {
        config.step_duration = 1.0 / f64::from(self.tick_rate);
        let mut controller = MovementController::new(config, position).with_input(input);
        if let Err(e) = controller.activate() {
            warn!(character = %id, error = %e, "Character spawned disabled");
        }

        info!(character = %id, tick = self.tick, position = %position, "Character spawned");
        self.characters.insert(id, controller);
        self.spawns.insert(id, SpawnRecord { tick: self.tick, position });
        self.next_id = self.next_id.max(id.0.saturating_add(1));
    }

    /// Remove a character. Returns its controller if it existed.
    pub fn remove_character(&mut self, id: CharacterId) -> Option<MovementController> {
        self.spawns.remove(&id);
        self.characters.remove(&id)
    }

    /// Run one fixed step for the whole simulation.
    pub fn tick(&mut self) -> TickResult {
        let tick = self.tick;
        let mut result = TickResult {
            tick,
            ..TickResult::default()
        };

        // 1. Platforms move first so every character samples the same velocities
        self.world.advance_platforms(self.dt);

        // 2. Characters in id order
        for (&id, controller) in self.characters.iter_mut() {
            let Some((frame, report)) = controller.fixed_step(&self.world, Some(&self.world)) else {
                continue;
            };
            result.inputs.push(ConsumedInput {
                character: id,
                step: report.step,
                frame,
            });
            result.events.extend(report.events.into_iter().map(|event| CharacterEvent {
                tick,
                character: id,
                event,
            }));
        }

        self.tick += 1;
        result
    }

    /// Advance by a presentation frame, running every step that became due.
    pub fn run_frame(&mut self, seconds: f64) -> Vec<TickResult> {
        let due = self.clock.advance(seconds);
        (0..due).map(|_| self.tick()).collect()
    }

    /// Hash of the tick, the world and every character, in id order.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, |hasher| {
            self.world.hash_into(hasher);
            for (id, controller) in &self.characters {
                hasher.update_u32(id.0);
                controller.hash_into(hasher);
            }
        })
    }

    /// Next tick to be simulated.
    pub fn current_tick(&self) -> u32 {
        self.tick
    }

    /// Steps per second.
    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// The fixed-step clock.
    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    /// Level geometry.
    pub fn world(&self) -> &BoxWorld {
        &self.world
    }

    /// Mutable level geometry (editor, scripted platforms).
    pub fn world_mut(&mut self) -> &mut BoxWorld {
        &mut self.world
    }

    /// Look up a character.
    pub fn character(&self, id: CharacterId) -> Option<&MovementController> {
        self.characters.get(&id)
    }

    /// Look up a character mutably.
    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut MovementController> {
        self.characters.get_mut(&id)
    }

    /// All characters in id order.
    pub fn characters(&self) -> impl Iterator<Item = (&CharacterId, &MovementController)> {
        self.characters.iter()
    }

    /// Spawn record of a character.
    pub fn spawn_record(&self, id: CharacterId) -> Option<SpawnRecord> {
        self.spawns.get(&id).copied()
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("tick_rate", &self.tick_rate)
            .field("characters", &self.characters.len())
            .finish()
    }
}
