//! # Divisi - Multi-track Mixing Engine
//!
//! A multi-track audio mixing and routing engine: track topology over an
//! opaque rendering substrate, post-fader sends, a limited master bus,
//! transport and recording lifecycle, project persistence, and offline
//! WAV export.
//!
//! ## Architecture
//!
//! Divisi is an umbrella crate that coordinates:
//! - **divisi-core** - Substrate interface, software substrate, PCM
//!   containers, note events, transport types
//! - **divisi-export** - Offline resampling and WAV encoding
//!
//! The engine never computes audio samples itself; it builds and rewires a
//! node graph owned by a [`Substrate`](divisi_core::Substrate) and mutates
//! parameters on it. The shipped
//! [`SoftwareSubstrate`](divisi_core::SoftwareSubstrate) models the graph
//! in-process; a real-time implementation plugs in behind the same trait.
//!
//! ## Quick Start
//!
//! ```
//! use divisi::prelude::*;
//!
//! # fn main() -> divisi::Result<()> {
//! let mut engine = AudioEngine::new()?;
//!
//! let guitar = engine.add_track(TrackConfig::audio("guitar"))?;
//! let keys = engine.add_track(TrackConfig::midi("keys").synth_type("fm"))?;
//!
//! engine.set_volume(guitar, -6.0)?;
//! engine.create_send_bus("verb", "reverb")?;
//! engine.route_to_send(guitar, "verb", 0.3)?;
//!
//! engine.add_note(keys, NoteEvent::new(60, 0.0, 1.0, 0.8))?;
//! engine.play()?;
//! # Ok(())
//! # }
//! ```

/// Re-export of divisi-core for direct access
pub use divisi_core as core;

/// Re-export of divisi-export for direct access
pub use divisi_export as export;

pub mod error;
pub use error::{Error, Result};

mod strip;

mod track;
pub use track::{AudioSource, Track, TrackConfig, TrackId, TrackType};

mod bus;
pub use bus::{MasterBus, SendBus, DEFAULT_LIMITER_CEILING_DB};

mod recorder;
pub use recorder::{Recorder, RecorderStop};

pub mod project;
pub use project::{ProjectData, TrackData, PROJECT_FORMAT_VERSION};

mod engine;
pub use engine::{AudioEngine, AudioEngineBuilder};

pub use divisi_core::{
    AudioBlob, LoopRegion, NodeId, NoteEvent, SampleBuffer, SoftwareSubstrate, Substrate,
    TransportState,
};
pub use divisi_export::{AudioFormat, BitDepth, ExportOptions, ResampleQuality};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{AudioEngine, AudioEngineBuilder};

    pub use crate::{Track, TrackConfig, TrackId, TrackType};

    pub use crate::core::{NoteEvent, SampleBuffer, Substrate, TransportState};

    pub use crate::export::{AudioFormat, BitDepth, ExportOptions};

    pub use crate::{ProjectData, Result};
}
