//! Core types and the substrate interface for the divisi mixing engine.
//!
//! # Primary API
//!
//! - [`Substrate`] / [`CaptureSession`]: the opaque processing collaborator
//!   the engine orchestrates (node construction, topology, capture, decode)
//! - [`SoftwareSubstrate`]: the shipped in-process implementation
//! - [`SampleBuffer`] / [`AudioBlob`]: PCM containers
//! - [`NoteEvent`]: MIDI track sequencing events
//! - [`TransportState`] / [`LoopRegion`]: engine-wide transport

pub mod error;
pub use error::{Error, Result};

mod buffer;
pub use buffer::{AudioBlob, SampleBuffer};

mod note;
pub use note::NoteEvent;

mod transport;
pub use transport::{LoopRegion, TransportState};

mod substrate;
pub use substrate::{
    db_to_linear, linear_to_db, CaptureSession, NodeId, ScheduleId, Substrate, ANALYSIS_WINDOW,
    FREQUENCY_BINS, SILENCE_FLOOR_DB,
};

mod software;
pub use software::SoftwareSubstrate;
