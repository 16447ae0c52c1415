//! Tracks: audio and MIDI, over a shared channel strip.
//!
//! A track is a tagged union of the two variants rather than a class
//! hierarchy; everything chain-related lives in [`ChannelStrip`]. The engine
//! owns all tracks and is the only mutation path, which keeps the global
//! solo invariant recomputable after every mute/solo change.

use crate::error::{Error, Result};
use crate::strip::ChannelStrip;
use divisi_core::{
    db_to_linear, CaptureSession, NodeId, NoteEvent, SampleBuffer, ScheduleId, Substrate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Opaque track identity, unique and stable for the engine's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track#{}", self.0)
    }
}

/// Track discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Audio,
    Midi,
}

/// Configuration for a new track.
#[derive(Debug, Clone)]
pub struct TrackConfig {
    pub name: String,
    pub color: String,
    pub track_type: TrackType,
    /// Instrument for MIDI tracks; ignored for audio tracks.
    pub synth_type: String,
}

impl TrackConfig {
    pub fn audio(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: String::new(),
            track_type: TrackType::Audio,
            synth_type: String::new(),
        }
    }

    pub fn midi(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: String::new(),
            track_type: TrackType::Midi,
            synth_type: "poly".into(),
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn synth_type(mut self, kind: impl Into<String>) -> Self {
        self.synth_type = kind.into();
        self
    }
}

/// Bound playback source of an audio track.
///
/// A content reference and an in-memory buffer are mutually exclusive;
/// binding one clears the other.
#[derive(Clone)]
pub enum AudioSource {
    /// Content handle (path or URL), resolvable through the substrate.
    Content(String),
    /// In-memory sample buffer, e.g. a finished recording.
    Buffer(Arc<SampleBuffer>),
}

impl AudioSource {
    /// Content reference, if this source has one.
    pub fn reference(&self) -> Option<&str> {
        match self {
            AudioSource::Content(path) => Some(path),
            AudioSource::Buffer(_) => None,
        }
    }
}

pub(crate) struct RecordingHandles {
    pub session: Box<dyn CaptureSession>,
    pub input: NodeId,
}

pub(crate) struct AudioState {
    pub source: Option<AudioSource>,
    pub player: Option<NodeId>,
    pub recording: Option<RecordingHandles>,
}

pub(crate) struct MidiState {
    pub notes: Vec<NoteEvent>,
    pub synth_type: String,
    pub instrument: NodeId,
    pub schedule: Option<ScheduleId>,
}

pub(crate) enum TrackKind {
    Audio(AudioState),
    Midi(MidiState),
}

pub struct Track {
    id: TrackId,
    name: String,
    color: String,
    volume_db: f32,
    pan: f32,
    muted: bool,
    soloed: bool,
    armed: bool,
    /// Send-bus name -> per-track send gain node. Weak association: the
    /// name is a lookup key, never ownership of the bus.
    sends: HashMap<String, NodeId>,
    substrate: Arc<dyn Substrate>,
    strip: ChannelStrip,
    kind: TrackKind,
}

impl Track {
    pub(crate) fn new(
        substrate: Arc<dyn Substrate>,
        id: TrackId,
        config: TrackConfig,
        master_input: NodeId,
    ) -> Result<Self> {
        let strip = ChannelStrip::new(Arc::clone(&substrate), master_input)?;
        let kind = match config.track_type {
            TrackType::Audio => TrackKind::Audio(AudioState {
                source: None,
                player: None,
                recording: None,
            }),
            TrackType::Midi => {
                let instrument = substrate.create_instrument(&config.synth_type)?;
                substrate.connect(instrument, strip.input())?;
                TrackKind::Midi(MidiState {
                    notes: Vec::new(),
                    synth_type: config.synth_type,
                    instrument,
                    schedule: None,
                })
            }
        };
        Ok(Self {
            id,
            name: config.name,
            color: config.color,
            volume_db: 0.0,
            pan: 0.0,
            muted: false,
            soloed: false,
            armed: false,
            sends: HashMap::new(),
            substrate,
            strip,
            kind,
        })
    }

    // --- identity and state ------------------------------------------------

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn track_type(&self) -> TrackType {
        match self.kind {
            TrackKind::Audio(_) => TrackType::Audio,
            TrackKind::Midi(_) => TrackType::Midi,
        }
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_soloed(&self) -> bool {
        self.soloed
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Effect handles in chain order.
    pub fn effects(&self) -> &[NodeId] {
        self.strip.effects()
    }

    /// Names of every send bus this track routes to.
    pub fn send_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Output-stage gain as enforced by the engine's solo recomputation.
    pub fn effective_gain(&self) -> Result<f32> {
        self.strip.effective_gain()
    }

    // --- setters (engine recomputes solo after mute/solo) -------------------

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub(crate) fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    /// Volume in dB. Deliberately unclamped; the caller owns the range.
    pub(crate) fn set_volume_db(&mut self, db: f32) -> Result<()> {
        self.volume_db = db;
        self.strip.set_volume_linear(db_to_linear(db))
    }

    /// Pan, silently clamped to [-1, 1].
    pub(crate) fn set_pan(&mut self, pan: f32) -> Result<()> {
        self.pan = pan.clamp(-1.0, 1.0);
        self.strip.set_pan(self.pan)
    }

    pub(crate) fn set_mute(&mut self, muted: bool) -> Result<()> {
        self.muted = muted;
        self.strip.set_mute_enabled(muted)
    }

    pub(crate) fn set_solo(&mut self, soloed: bool) {
        self.soloed = soloed;
    }

    /// Informational only at this layer; nothing is wired to it.
    pub(crate) fn set_armed(&mut self, armed: bool) {
        self.armed = armed;
    }

    pub(crate) fn set_effective_gain(&self, gain: f32) -> Result<()> {
        self.strip.set_effective_gain(gain)
    }

    // --- chain -------------------------------------------------------------

    pub(crate) fn add_effect(&mut self, node: NodeId, index: Option<usize>) -> Result<()> {
        self.strip.add_effect(node, index)
    }

    pub(crate) fn remove_effect(&mut self, index: usize) -> Result<()> {
        self.strip.remove_effect(index)
    }

    pub(crate) fn strip_output(&self) -> NodeId {
        self.strip.output()
    }

    /// Entry point of the track's chain; external sources connect here.
    pub fn chain_input(&self) -> NodeId {
        self.strip.input()
    }

    pub(crate) fn send_gain(&self, bus: &str) -> Option<NodeId> {
        self.sends.get(bus).copied()
    }

    pub(crate) fn insert_send_gain(&mut self, bus: impl Into<String>, gain: NodeId) {
        self.sends.insert(bus.into(), gain);
    }

    /// Disconnect and release the gain node for `bus`, dropping the entry.
    pub(crate) fn remove_send_gain(&mut self, bus: &str) -> Result<()> {
        let gain = self
            .sends
            .remove(bus)
            .ok_or_else(|| Error::UnknownSend(bus.into()))?;
        self.substrate.dispose(gain)?;
        Ok(())
    }

    /// Amount of the send to `bus`, if routed.
    pub(crate) fn send_amount(&self, bus: &str) -> Result<f32> {
        let gain = self
            .sends
            .get(bus)
            .ok_or_else(|| Error::UnknownSend(bus.into()))?;
        Ok(self.substrate.param(*gain)?)
    }

    // --- audio variant -----------------------------------------------------

    fn audio_mut(&mut self) -> Result<&mut AudioState> {
        match &mut self.kind {
            TrackKind::Audio(state) => Ok(state),
            TrackKind::Midi(_) => Err(Error::NotAudioTrack(self.id)),
        }
    }

    /// Bound source, if any.
    pub fn source(&self) -> Option<&AudioSource> {
        match &self.kind {
            TrackKind::Audio(state) => state.source.as_ref(),
            TrackKind::Midi(_) => None,
        }
    }

    /// Bind a decoded buffer as the playback source, releasing any previous
    /// player first.
    pub(crate) fn bind_source(
        &mut self,
        source: AudioSource,
        buffer: Arc<SampleBuffer>,
    ) -> Result<()> {
        let input = self.strip.input();
        let substrate = Arc::clone(&self.substrate);
        let state = self.audio_mut()?;
        if let Some(old) = state.player.take() {
            substrate.dispose(old)?;
        }
        let player = substrate.create_player(buffer);
        substrate.connect(player, input)?;
        state.player = Some(player);
        state.source = Some(source);
        Ok(())
    }

    /// Start playback. No-op when unbound.
    pub(crate) fn play(&self, at: Option<f64>) -> Result<()> {
        if let TrackKind::Audio(state) = &self.kind {
            if let Some(player) = state.player {
                self.substrate.start_player(player, at)?;
            }
        }
        Ok(())
    }

    /// Stop playback keeping position (pause semantics). No-op when unbound.
    pub(crate) fn pause(&self) -> Result<()> {
        if let TrackKind::Audio(state) = &self.kind {
            if let Some(player) = state.player {
                self.substrate.stop_player(player, None)?;
            }
        }
        Ok(())
    }

    /// Stop playback and rewind. No-op when unbound.
    pub(crate) fn stop(&self, at: Option<f64>) -> Result<()> {
        if let TrackKind::Audio(state) = &self.kind {
            if let Some(player) = state.player {
                self.substrate.stop_player(player, at)?;
                self.substrate.seek_player(player, 0.0)?;
            }
        }
        Ok(())
    }

    /// Seek to a position in seconds. No-op when unbound.
    pub(crate) fn seek(&self, position: f64) -> Result<()> {
        if let TrackKind::Audio(state) = &self.kind {
            if let Some(player) = state.player {
                self.substrate.seek_player(player, position)?;
            }
        }
        Ok(())
    }

    /// Duration of the bound source in seconds; 0 when unbound.
    pub fn duration(&self) -> f64 {
        if let TrackKind::Audio(state) = &self.kind {
            if let Some(player) = state.player {
                return self.substrate.player_duration(player).unwrap_or(0.0);
            }
        }
        0.0
    }

    /// True exactly while both the capture session and its input handle are
    /// held.
    pub fn is_recording(&self) -> bool {
        matches!(&self.kind, TrackKind::Audio(state) if state.recording.is_some())
    }

    /// Open a capture on this track, wiring the input both into the capture
    /// sink and into the volume stage for monitoring.
    pub(crate) fn start_recording(&mut self, device: Option<&str>) -> Result<()> {
        let input_stage = self.strip.input();
        let substrate = Arc::clone(&self.substrate);
        let state = self.audio_mut()?;
        if state.recording.is_some() {
            return Err(Error::AlreadyRecording);
        }
        let mut session = substrate.open_capture(device)?;
        session.start()?;
        let input = session.input_node();
        substrate.connect(input, input_stage)?;
        state.recording = Some(RecordingHandles { session, input });
        Ok(())
    }

    /// Finalize the capture, releasing the input. The caller decodes the
    /// blob and rebinds it as the playback source.
    pub(crate) fn stop_recording(&mut self) -> Result<divisi_core::AudioBlob> {
        let state = self.audio_mut()?;
        let mut handles = state.recording.take().ok_or(Error::NotRecording)?;
        Ok(handles.session.stop()?)
    }

    // --- MIDI variant ------------------------------------------------------

    fn midi(&self) -> Result<&MidiState> {
        match &self.kind {
            TrackKind::Midi(state) => Ok(state),
            TrackKind::Audio(_) => Err(Error::NotMidiTrack(self.id)),
        }
    }

    fn midi_mut(&mut self) -> Result<&mut MidiState> {
        match &mut self.kind {
            TrackKind::Midi(state) => Ok(state),
            TrackKind::Audio(_) => Err(Error::NotMidiTrack(self.id)),
        }
    }

    /// Note sequence, in stored order.
    pub fn notes(&self) -> Result<&[NoteEvent]> {
        Ok(&self.midi()?.notes)
    }

    /// Current instrument type tag.
    pub fn synth_type(&self) -> Result<&str> {
        Ok(&self.midi()?.synth_type)
    }

    pub(crate) fn add_note(&mut self, note: NoteEvent) -> Result<()> {
        self.midi_mut()?.notes.push(note);
        self.reschedule()
    }

    pub(crate) fn remove_note(&mut self, index: usize) -> Result<()> {
        let state = self.midi_mut()?;
        if index >= state.notes.len() {
            return Err(Error::NoteIndexOutOfRange {
                index,
                len: state.notes.len(),
            });
        }
        state.notes.remove(index);
        self.reschedule()
    }

    pub(crate) fn clear_notes(&mut self) -> Result<()> {
        self.midi_mut()?.notes.clear();
        self.reschedule()
    }

    pub(crate) fn set_notes(&mut self, notes: Vec<NoteEvent>) -> Result<()> {
        self.midi_mut()?.notes = notes;
        self.reschedule()
    }

    /// Sound a note immediately, bypassing the stored sequence.
    pub(crate) fn trigger_note(&self, pitch: u8, duration: f64, velocity: f32) -> Result<()> {
        let state = self.midi()?;
        self.substrate
            .trigger_note(state.instrument, pitch, duration, velocity)?;
        Ok(())
    }

    /// Dispose the current instrument and reconnect a replacement, then
    /// rebuild scheduled playback on it.
    pub(crate) fn set_synth_type(&mut self, kind: impl Into<String>) -> Result<()> {
        let kind = kind.into();
        let input = self.strip.input();
        let substrate = Arc::clone(&self.substrate);
        let state = self.midi_mut()?;
        // Schedules do not die with their instrument; cancel explicitly
        // before the old instrument goes away.
        if let Some(old) = state.schedule.take() {
            substrate.cancel_schedule(old)?;
        }
        substrate.dispose(state.instrument)?;
        let instrument = substrate.create_instrument(&kind)?;
        substrate.connect(instrument, input)?;
        state.instrument = instrument;
        state.synth_type = kind;
        self.reschedule()
    }

    /// Rebuild scheduled playback from scratch. Always a full rebuild;
    /// incremental diffs would leave stale per-note schedules behind.
    fn reschedule(&mut self) -> Result<()> {
        let substrate = Arc::clone(&self.substrate);
        let state = self.midi_mut()?;
        if let Some(old) = state.schedule.take() {
            substrate.cancel_schedule(old)?;
        }
        if !state.notes.is_empty() {
            state.schedule = Some(substrate.schedule_notes(state.instrument, &state.notes)?);
        }
        Ok(())
    }

    // --- teardown ----------------------------------------------------------

    /// Release every node this track owns: variant nodes, send gains, and
    /// the strip (effects included).
    pub(crate) fn dispose(&mut self) -> Result<()> {
        match &mut self.kind {
            TrackKind::Audio(state) => {
                if let Some(mut handles) = state.recording.take() {
                    // Finalizing releases the capture input node.
                    let _ = handles.session.stop();
                }
                if let Some(player) = state.player.take() {
                    self.substrate.dispose(player)?;
                }
            }
            TrackKind::Midi(state) => {
                if let Some(schedule) = state.schedule.take() {
                    self.substrate.cancel_schedule(schedule)?;
                }
                self.substrate.dispose(state.instrument)?;
            }
        }
        for (_, gain) in self.sends.drain() {
            self.substrate.dispose(gain)?;
        }
        self.strip.dispose()
    }
}
