//! Error types for the divisi engine.

use crate::track::TrackId;
use thiserror::Error;

/// Engine error type.
///
/// Unknown-id lookups fail loudly everywhere: the engine never silently
/// ignores an id it cannot resolve.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown track: {0}")]
    UnknownTrack(TrackId),

    #[error("Unknown send bus: {0:?}")]
    UnknownSend(String),

    #[error("Send bus {0:?} already exists")]
    DuplicateSend(String),

    #[error("Track {0} is not an audio track")]
    NotAudioTrack(TrackId),

    #[error("Track {0} is not a MIDI track")]
    NotMidiTrack(TrackId),

    #[error("Effect index {index} out of range (track has {len} effects)")]
    EffectIndexOutOfRange { index: usize, len: usize },

    #[error("Note index {index} out of range (track has {len} notes)")]
    NoteIndexOutOfRange { index: usize, len: usize },

    #[error("Invalid tempo: {0} (must be > 0)")]
    InvalidTempo(f32),

    #[error("Invalid loop range: start={start}, end={end}")]
    InvalidLoopRange { start: f64, end: f64 },

    #[error("No recording in progress")]
    NotRecording,

    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("Unsupported project version: {0:?}")]
    UnsupportedProjectVersion(String),

    #[error("Export task failed: {0}")]
    ExportTask(String),

    #[error("Project serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Core(#[from] divisi_core::Error),

    #[error(transparent)]
    Export(#[from] divisi_export::ExportError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
