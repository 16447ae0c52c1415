//! Project persistence data model.
//!
//! This is the stable wire format, kept separate from the live object graph:
//! the engine lowers itself into [`ProjectData`] on save and rebuilds from it
//! on load. Track order is insertion order. Effect chains are not persisted.

use crate::track::TrackId;
use divisi_core::NoteEvent;
use serde::{Deserialize, Serialize};

/// Current project format version. Loading rejects anything else.
pub const PROJECT_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    pub version: String,
    pub tempo: f32,
    #[serde(default)]
    pub master_volume_db: f32,
    pub loop_enabled: bool,
    pub loop_start: f64,
    pub loop_end: f64,
    #[serde(default)]
    pub sends: Vec<SendBusData>,
    #[serde(default)]
    pub tracks: Vec<TrackData>,
}

impl ProjectData {
    pub fn is_supported_version(&self) -> bool {
        self.version == PROJECT_FORMAT_VERSION
    }
}

/// Fields common to both track variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackBase {
    pub id: TrackId,
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub volume_db: f32,
    pub pan: f32,
    pub muted: bool,
    pub soloed: bool,
    pub armed: bool,
    #[serde(default)]
    pub sends: Vec<SendRouteData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TrackData {
    Audio {
        #[serde(flatten)]
        base: TrackBase,
        /// Content reference. In-memory sources (e.g. unsaved recordings)
        /// serialize as `None` and come back unbound.
        source: Option<String>,
    },
    Midi {
        #[serde(flatten)]
        base: TrackBase,
        synth_type: String,
        #[serde(default)]
        notes: Vec<NoteEvent>,
    },
}

impl TrackData {
    pub fn base(&self) -> &TrackBase {
        match self {
            TrackData::Audio { base, .. } => base,
            TrackData::Midi { base, .. } => base,
        }
    }
}

/// One send route from a track to a named send bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendRouteData {
    pub name: String,
    pub amount: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendBusData {
    pub name: String,
    pub effect_type: String,
    pub wet_dry: f32,
    pub volume_db: f32,
}
