//! Replay Recording and Verification
//!
//! A transcript holds a level, per-character configs and delta-compressed
//! inputs. Re-running it must reproduce every checkpoint hash exactly.

pub mod transcript;
pub mod verify;

pub use transcript::{
    ReplayTranscript, ReplayMetadata, CharacterTranscript, StateCheckpoint,
    TranscriptRecorder, TranscriptError, TRANSCRIPT_VERSION, CHECKPOINT_INTERVAL,
};
pub use verify::{verify_transcript, VerificationResult, VerificationError, CheckpointResult};
