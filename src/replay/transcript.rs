//! Replay Transcript Recording
//!
//! Records everything needed to re-run a simulation bit for bit: the level,
//! each character's config and spawn point, and its delta-compressed input.
//! State hashes are stored every [`CHECKPOINT_INTERVAL`] ticks so a diverging
//! replay is caught close to where it diverged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::collision::geometry::BoxWorld;
use crate::core::hash::StateHash;
use crate::core::vec2::FixedVec2;
use crate::game::config::MovementConfig;
use crate::game::input::InputRecording;
use crate::game::state::CharacterId;
use crate::game::tick::{Simulation, TickResult};

/// Current transcript version.
pub const TRANSCRIPT_VERSION: u8 = 1;

/// Checkpoint interval in ticks (every 10 seconds at 60Hz).
pub const CHECKPOINT_INTERVAL: u32 = 600;

/// Errors that can occur with transcripts.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Binary encoding or decoding failed
    #[error("binary codec: {0}")]
    Binary(#[from] bincode::Error),

    /// JSON encoding or decoding failed
    #[error("json codec: {0}")]
    Json(#[from] serde_json::Error),

    /// Written by an incompatible version
    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Supported version
        expected: u8,
        /// Version found
        got: u8,
    },

    /// Recording must start before the first tick
    #[error("recording must start at tick 0, simulation is at tick {0}")]
    NotAtStart(u32),
}

/// Who recorded what, when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayMetadata {
    /// Unique replay identifier
    pub replay_id: Uuid,
    /// Wall-clock start of the recording (informational, never hashed)
    pub recorded_at: DateTime<Utc>,
    /// Simulation rate the replay must be run at
    pub tick_rate: u32,
    /// Crate version that produced the replay
    pub engine_version: String,
}

/// One character's part of a replay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CharacterTranscript {
    /// Character id
    pub id: CharacterId,
    /// Tick of the first step
    pub spawn_tick: u32,
    /// Spawn position
    pub position: FixedVec2,
    /// Designer config
    pub config: MovementConfig,
    /// Hash of the derived fixed-point parameters
    pub config_hash: StateHash,
    /// Inputs, indexed by controller step
    pub inputs: InputRecording,
}

/// State hash at a tick boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateCheckpoint {
    /// Ticks simulated when the hash was taken
    pub tick: u32,
    /// Simulation state hash
    pub state_hash: StateHash,
}

/// Complete replay of a simulation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayTranscript {
    /// Version for forward compatibility
    pub version: u8,
    /// Replay metadata
    pub metadata: ReplayMetadata,
    /// Level at tick 0
    pub world: BoxWorld,
    /// Characters in id order
    pub characters: Vec<CharacterTranscript>,
    /// Periodic state hashes
    pub checkpoints: Vec<StateCheckpoint>,
    /// Ticks simulated
    pub final_tick: u32,
    /// State hash after the last tick
    pub final_hash: StateHash,
}

impl ReplayTranscript {
    /// Serialize to compact binary (bincode).
    pub fn to_bytes(&self) -> Result<Vec<u8>, TranscriptError> {
        Ok(bincode::serialize(self)?)
    }

    /// Deserialize from bytes produced by [`Self::to_bytes`].
    pub fn from_bytes(data: &[u8]) -> Result<Self, TranscriptError> {
        let transcript: Self = bincode::deserialize(data)?;
        transcript.check_version()?;
        Ok(transcript)
    }

    /// Serialize to human-readable JSON.
    pub fn to_json(&self) -> Result<String, TranscriptError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON produced by [`Self::to_json`].
    pub fn from_json(json: &str) -> Result<Self, TranscriptError> {
        let transcript: Self = serde_json::from_str(json)?;
        transcript.check_version()?;
        Ok(transcript)
    }

    fn check_version(&self) -> Result<(), TranscriptError> {
        if self.version != TRANSCRIPT_VERSION {
            return Err(TranscriptError::VersionMismatch {
                expected: TRANSCRIPT_VERSION,
                got: self.version,
            });
        }
        Ok(())
    }

    /// Total stored input changes across all characters.
    pub fn delta_count(&self) -> usize {
        self.characters.iter().map(|c| c.inputs.delta_count()).sum()
    }
}

// =============================================================================
// RECORDER
// =============================================================================

/// Captures a live [`Simulation`] tick by tick.
///
/// ```text
/// let mut recorder = TranscriptRecorder::new(&sim)?;
/// loop {
///     let result = sim.tick();
///     recorder.observe(&sim, &result);
/// }
/// let transcript = recorder.finish(&sim);
/// ```
#[derive(Debug)]
pub struct TranscriptRecorder {
    metadata: ReplayMetadata,
    world: BoxWorld,
    characters: BTreeMap<CharacterId, CharacterTranscript>,
    checkpoints: Vec<StateCheckpoint>,
}

impl TranscriptRecorder {
    /// Start recording. The simulation must not have ticked yet.
    pub fn new(sim: &Simulation) -> Result<Self, TranscriptError> {
        if sim.current_tick() != 0 {
            return Err(TranscriptError::NotAtStart(sim.current_tick()));
        }
        let metadata = ReplayMetadata {
            replay_id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            tick_rate: sim.tick_rate(),
            engine_version: crate::VERSION.to_string(),
        };
        info!(replay_id = %metadata.replay_id, "Recording replay");

        let mut recorder = Self {
            metadata,
            world: sim.world().clone(),
            characters: BTreeMap::new(),
            checkpoints: Vec::new(),
        };
        recorder.register_spawns(sim);
        Ok(recorder)
    }

    /// Record the outcome of the tick that just ran.
    pub fn observe(&mut self, sim: &Simulation, result: &TickResult) {
        self.register_spawns(sim);

        for consumed in &result.inputs {
            if let Some(record) = self.characters.get_mut(&consumed.character) {
                record.inputs.record(consumed.step, consumed.frame);
            }
        }

        let tick = sim.current_tick();
        if tick % CHECKPOINT_INTERVAL == 0 {
            let state_hash = sim.compute_hash();
            debug!(tick, hash = %hex::encode(&state_hash[..8]), "Checkpoint");
            self.checkpoints.push(StateCheckpoint { tick, state_hash });
        }
    }

    fn register_spawns(&mut self, sim: &Simulation) {
        for (&id, controller) in sim.characters() {
            if self.characters.contains_key(&id) {
                continue;
            }
            let Some(spawn) = sim.spawn_record(id) else {
                continue;
            };
            self.characters.insert(
                id,
                CharacterTranscript {
                    id,
                    spawn_tick: spawn.tick,
                    position: spawn.position,
                    config: controller.config().clone(),
                    config_hash: controller.params().config_hash(),
                    inputs: InputRecording::new(0),
                },
            );
        }
    }

    /// Seal the transcript with the final state.
    pub fn finish(mut self, sim: &Simulation) -> ReplayTranscript {
        self.register_spawns(sim);
        let final_tick = sim.current_tick();

        let characters: Vec<CharacterTranscript> = self
            .characters
            .into_values()
            .map(|mut c| {
                c.inputs.finalize(final_tick.saturating_sub(c.spawn_tick));
                c
            })
            .collect();

        let transcript = ReplayTranscript {
            version: TRANSCRIPT_VERSION,
            metadata: self.metadata,
            world: self.world,
            characters,
            checkpoints: self.checkpoints,
            final_tick,
            final_hash: sim.compute_hash(),
        };
        info!(
            replay_id = %transcript.metadata.replay_id,
            ticks = final_tick,
            characters = transcript.characters.len(),
            deltas = transcript.delta_count(),
            "Replay recorded"
        );
        transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::geometry::Aabb;
    use crate::game::input::{InputFrame, LiveInput};

    fn recorded_run(ticks: u32) -> ReplayTranscript {
        let mut world = BoxWorld::new();
        world.add_box(Aabb::from_floats(-20.0, -1.0, 20.0, 0.0), 0b01);
        let mut sim = Simulation::new(world, 60);

        let (live, handle) = LiveInput::channel();
        sim.add_character(MovementConfig::default(), FixedVec2::from_floats(0.0, 0.9), Box::new(live));
        let mut recorder = TranscriptRecorder::new(&sim).unwrap();

        for t in 0..ticks {
            match t {
                10 => handle.set_axes(127, InputFrame::NO_INPUT),
                30 => handle.press(InputFrame::BUTTON_JUMP),
                31 => handle.release(InputFrame::BUTTON_JUMP),
                50 => handle.set_axes(InputFrame::NO_INPUT, InputFrame::NO_INPUT),
                _ => {}
            }
            let result = sim.tick();
            recorder.observe(&sim, &result);
        }
        recorder.finish(&sim)
    }

    #[test]
    fn test_recorder_compresses_inputs() {
        let transcript = recorded_run(100);
        assert_eq!(transcript.final_tick, 100);
        assert_eq!(transcript.characters.len(), 1);

        let inputs = &transcript.characters[0].inputs;
        assert_eq!(inputs.delta_count(), 4);
        assert_eq!(inputs.end_tick, 100);
        assert!(inputs.frame_at(30).jump_held());
        assert!(!inputs.frame_at(31).jump_held());
    }

    #[test]
    fn test_recorder_requires_fresh_simulation() {
        let mut sim = Simulation::new(BoxWorld::new(), 60);
        sim.tick();
        assert!(matches!(
            TranscriptRecorder::new(&sim),
            Err(TranscriptError::NotAtStart(1))
        ));
    }

    #[test]
    fn test_checkpoints_at_interval() {
        let transcript = recorded_run(CHECKPOINT_INTERVAL * 2 + 5);
        let ticks: Vec<u32> = transcript.checkpoints.iter().map(|c| c.tick).collect();
        assert_eq!(ticks, vec![CHECKPOINT_INTERVAL, CHECKPOINT_INTERVAL * 2]);
    }

    #[test]
    fn test_binary_and_json_codecs() {
        let transcript = recorded_run(60);

        let bytes = transcript.to_bytes().unwrap();
        let decoded = ReplayTranscript::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.final_hash, transcript.final_hash);
        assert_eq!(decoded.characters, transcript.characters);
        assert_eq!(decoded.metadata, transcript.metadata);

        let json = transcript.to_json().unwrap();
        let decoded = ReplayTranscript::from_json(&json).unwrap();
        assert_eq!(decoded.characters, transcript.characters);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut transcript = recorded_run(10);
        transcript.version = TRANSCRIPT_VERSION + 1;
        let bytes = transcript.to_bytes().unwrap();
        assert!(matches!(
            ReplayTranscript::from_bytes(&bytes),
            Err(TranscriptError::VersionMismatch { got, .. }) if got == TRANSCRIPT_VERSION + 1
        ));
        assert!(ReplayTranscript::from_bytes(&[1, 2, 3]).is_err());
    }
}
