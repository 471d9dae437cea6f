//! Verification API
//!
//! Verify a replay by re-running it from its recorded inputs and comparing
//! state hashes at every checkpoint and at the end.

use thiserror::Error;
use tracing::{info, warn};

use crate::core::hash::StateHash;
use crate::game::config::DerivedParams;
use crate::game::input::RecordedInput;
use crate::game::state::CharacterId;
use crate::game::tick::Simulation;
use crate::replay::transcript::{ReplayTranscript, TRANSCRIPT_VERSION};

/// Verification result.
#[derive(Debug)]
pub struct VerificationResult {
    /// Did verification pass?
    pub valid: bool,

    /// Final state hash (from replay).
    pub computed_final_hash: StateHash,

    /// Expected final hash (from transcript).
    pub expected_final_hash: StateHash,

    /// Checkpoint verification results.
    pub checkpoint_results: Vec<CheckpointResult>,

    /// Detailed error if verification failed.
    pub error: Option<VerificationError>,
}

/// Result of verifying a single checkpoint.
#[derive(Debug)]
pub struct CheckpointResult {
    /// Tick number.
    pub tick: u32,
    /// Expected hash from transcript.
    pub expected: StateHash,
    /// Computed hash from replay.
    pub computed: StateHash,
    /// Did this checkpoint match?
    pub valid: bool,
}

/// Errors that can occur during verification.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// Transcript version mismatch.
    #[error("version mismatch: expected {expected}, got {got}")]
    VersionMismatch {
        /// Expected version.
        expected: u8,
        /// Actual version.
        got: u8,
    },

    /// A config no longer derives the parameters it was recorded with.
    #[error("config of character {character} derives different parameters")]
    ConfigMismatch {
        /// Affected character.
        character: CharacterId,
    },

    /// Checkpoint hash mismatch.
    #[error("checkpoint mismatch at tick {tick}")]
    CheckpointMismatch {
        /// Tick where mismatch occurred.
        tick: u32,
        /// Expected hash.
        expected: StateHash,
        /// Computed hash.
        computed: StateHash,
    },

    /// Final state hash mismatch.
    #[error("final state hash mismatch")]
    FinalStateMismatch {
        /// Expected hash.
        expected: StateHash,
        /// Computed hash.
        computed: StateHash,
    },
}

impl VerificationResult {
    fn failed(
        error: VerificationError,
        computed: StateHash,
        expected: StateHash,
        checkpoint_results: Vec<CheckpointResult>,
    ) -> Self {
        warn!(error = %error, "Replay verification failed");
        Self {
            valid: false,
            computed_final_hash: computed,
            expected_final_hash: expected,
            checkpoint_results,
            error: Some(error),
        }
    }
}

/// Verify a transcript by full replay.
///
/// This is the authoritative verification method.
pub fn verify_transcript(transcript: &ReplayTranscript) -> VerificationResult {
    let expected_final = transcript.final_hash;

    // 1. Version
    if transcript.version != TRANSCRIPT_VERSION {
        let error = VerificationError::VersionMismatch {
            expected: TRANSCRIPT_VERSION,
            got: transcript.version,
        };
        return VerificationResult::failed(error, [0; 32], expected_final, vec![]);
    }

    // 2. Configs must derive the same fixed-point parameters
    for character in &transcript.characters {
        if DerivedParams::derive(&character.config).config_hash() != character.config_hash {
            let error = VerificationError::ConfigMismatch { character: character.id };
            return VerificationResult::failed(error, [0; 32], expected_final, vec![]);
        }
    }

    // 3. Replay tick by tick, spawning characters on their recorded tick
    let mut sim = Simulation::new(transcript.world.clone(), transcript.metadata.tick_rate);
    let mut checkpoint_results = Vec::new();
    let mut checkpoints = transcript.checkpoints.iter().peekable();

    for tick in 0..transcript.final_tick {
        spawn_due(&mut sim, transcript, tick);
        sim.tick();

        let Some(checkpoint) = checkpoints.next_if(|c| c.tick == sim.current_tick()) else {
            continue;
        };
        let computed = sim.compute_hash();
        let valid = computed == checkpoint.state_hash;
        checkpoint_results.push(CheckpointResult {
            tick: checkpoint.tick,
            expected: checkpoint.state_hash,
            computed,
            valid,
        });

        if !valid {
            let error = VerificationError::CheckpointMismatch {
                tick: checkpoint.tick,
                expected: checkpoint.state_hash,
                computed,
            };
            return VerificationResult::failed(error, computed, checkpoint.state_hash, checkpoint_results);
        }
    }
    spawn_due(&mut sim, transcript, transcript.final_tick);

    // 4. Final state
    let final_hash = sim.compute_hash();
    if final_hash != expected_final {
        let error = VerificationError::FinalStateMismatch {
            expected: expected_final,
            computed: final_hash,
        };
        return VerificationResult::failed(error, final_hash, expected_final, checkpoint_results);
    }

    info!(
        ticks = transcript.final_tick,
        checkpoints = checkpoint_results.len(),
        hash = %hex::encode(&final_hash[..8]),
        "Replay verified"
    );
    VerificationResult {
        valid: true,
        computed_final_hash: final_hash,
        expected_final_hash: expected_final,
        checkpoint_results,
        error: None,
    }
}

fn spawn_due(sim: &mut Simulation, transcript: &ReplayTranscript, tick: u32) {
    for character in transcript.characters.iter().filter(|c| c.spawn_tick == tick) {
        sim.insert_character(
            character.id,
            character.config.clone(),
            character.position,
            Box::new(RecordedInput::new(character.inputs.clone())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::geometry::{Aabb, BoxWorld};
    use crate::core::vec2::FixedVec2;
    use crate::game::config::MovementConfig;
    use crate::game::input::{InputFrame, InputRecording};
    use crate::replay::transcript::{TranscriptRecorder, CHECKPOINT_INTERVAL};

    fn level() -> BoxWorld {
        let mut world = BoxWorld::new();
        world.add_box(Aabb::from_floats(-40.0, -1.0, 40.0, 0.0), 0b01);
        world.add_box(Aabb::from_floats(6.0, 0.0, 8.0, 6.0), 0b01);
        world.add_platform(
            Aabb::from_floats(-12.0, 2.0, -8.0, 2.5),
            0b10,
            FixedVec2::from_floats(1.0, 0.0),
        );
        world
    }

    fn script() -> InputRecording {
        let right = InputFrame::with_axes(127, InputFrame::NO_INPUT);
        InputRecording::from_frames([
            (0, right),
            (25, right.with_buttons(InputFrame::BUTTON_JUMP)),
            (45, right.with_buttons(InputFrame::BUTTON_GRAB)),
            (80, InputFrame::with_axes(-127, 127).with_buttons(InputFrame::BUTTON_DASH)),
            (90, InputFrame::new()),
        ])
    }

    fn record(ticks: u32, late_spawn: u32) -> ReplayTranscript {
        let mut sim = Simulation::new(level(), 60);
        sim.add_character(
            MovementConfig::default(),
            FixedVec2::from_floats(0.0, 0.9),
            Box::new(RecordedInput::new(script())),
        );
        let mut recorder = TranscriptRecorder::new(&sim).unwrap();

        for t in 0..ticks {
            if t == late_spawn {
                sim.add_character(
                    MovementConfig::default(),
                    FixedVec2::from_floats(-10.0, 3.5),
                    Box::new(RecordedInput::new(script())),
                );
            }
            let result = sim.tick();
            recorder.observe(&sim, &result);
        }
        recorder.finish(&sim)
    }

    #[test]
    fn test_verify_recorded_run() {
        let transcript = record(CHECKPOINT_INTERVAL + 30, 40);
        assert_eq!(transcript.characters.len(), 2);
        assert_eq!(transcript.characters[1].spawn_tick, 40);

        let result = verify_transcript(&transcript);
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(result.checkpoint_results.len(), 1);
        assert_eq!(result.computed_final_hash, transcript.final_hash);
    }

    #[test]
    fn test_verify_after_binary_round_trip() {
        let transcript = record(200, 0);
        let decoded = ReplayTranscript::from_bytes(&transcript.to_bytes().unwrap()).unwrap();
        assert!(verify_transcript(&decoded).valid);
    }

    #[test]
    fn test_tampered_input_detected() {
        let mut transcript = record(CHECKPOINT_INTERVAL + 30, 40);
        let tampered = InputRecording::from_frames(
            transcript.characters[0]
                .inputs
                .deltas()
                .iter()
                .filter(|d| d.tick != 25)
                .map(|d| (d.tick, d.frame)),
        );
        transcript.characters[0].inputs = tampered;

        let result = verify_transcript(&transcript);
        assert!(!result.valid);
        assert!(matches!(
            result.error,
            Some(VerificationError::CheckpointMismatch { tick, .. }) if tick == CHECKPOINT_INTERVAL
        ));
    }

    #[test]
    fn test_tampered_final_hash_detected() {
        let mut transcript = record(100, 10);
        transcript.final_hash[0] ^= 0xff;

        let result = verify_transcript(&transcript);
        assert!(matches!(result.error, Some(VerificationError::FinalStateMismatch { .. })));
    }

    #[test]
    fn test_config_drift_detected() {
        let mut transcript = record(30, 100);
        transcript.characters[0].config.max_move_speed += 1.0;

        let result = verify_transcript(&transcript);
        assert_eq!(
            result.error,
            Some(VerificationError::ConfigMismatch { character: CharacterId(0) })
        );
    }

    #[test]
    fn test_version_mismatch() {
        let mut transcript = record(10, 100);
        transcript.version = 0;
        let result = verify_transcript(&transcript);
        assert!(matches!(result.error, Some(VerificationError::VersionMismatch { got: 0, .. })));
    }
}
