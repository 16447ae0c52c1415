//! The mixing engine: track topology, sends, transport and persistence.
//!
//! `AudioEngine` is the single mutation path for the whole object graph.
//! It owns the tracks, the send buses, the master bus and the recorder, and
//! orchestrates an opaque [`Substrate`] that does the actual rendering.
//! Every mute/solo change recomputes the effective gain of every track, so
//! the solo invariant holds after any sequence of operations.

use crate::bus::{MasterBus, SendBus, DEFAULT_LIMITER_CEILING_DB};
use crate::error::{Error, Result};
use crate::project::{
    ProjectData, SendBusData, SendRouteData, TrackBase, TrackData, PROJECT_FORMAT_VERSION,
};
use crate::recorder::Recorder;
use crate::track::{AudioSource, Track, TrackConfig, TrackId, TrackType};
use divisi_core::{
    LoopRegion, NodeId, NoteEvent, SoftwareSubstrate, Substrate, TransportState,
};
use divisi_export::ExportOptions;
use std::path::Path;
use std::sync::Arc;

/// Builder for [`AudioEngine`].
///
/// # Example
///
/// ```no_run
/// use divisi::AudioEngine;
///
/// let engine = AudioEngine::builder()
///     .limiter_ceiling_db(-0.5)
///     .build()
///     .unwrap();
/// ```
pub struct AudioEngineBuilder {
    substrate: Option<Arc<dyn Substrate>>,
    limiter_ceiling_db: f32,
}

impl Default for AudioEngineBuilder {
    fn default() -> Self {
        Self {
            substrate: None,
            limiter_ceiling_db: DEFAULT_LIMITER_CEILING_DB,
        }
    }
}

impl AudioEngineBuilder {
    /// Use a custom substrate instead of the in-process software one.
    pub fn substrate(mut self, substrate: Arc<dyn Substrate>) -> Self {
        self.substrate = Some(substrate);
        self
    }

    /// Master limiter ceiling in dB. Fixed for the engine's lifetime.
    pub fn limiter_ceiling_db(mut self, ceiling_db: f32) -> Self {
        self.limiter_ceiling_db = ceiling_db;
        self
    }

    pub fn build(self) -> Result<AudioEngine> {
        let substrate = self
            .substrate
            .unwrap_or_else(|| Arc::new(SoftwareSubstrate::new()) as Arc<dyn Substrate>);
        let master = MasterBus::new(Arc::clone(&substrate), self.limiter_ceiling_db)?;
        let recorder = Recorder::new(Arc::clone(&substrate));
        log::info!(
            "engine up: {} Hz, {} channels, limiter ceiling {} dB",
            substrate.sample_rate(),
            substrate.channels(),
            self.limiter_ceiling_db
        );
        Ok(AudioEngine {
            substrate,
            master,
            recorder,
            tracks: Vec::new(),
            sends: Vec::new(),
            transport: TransportState::Stopped,
            tempo: 120.0,
            loop_region: LoopRegion::default(),
            next_track_id: 1,
        })
    }
}

pub struct AudioEngine {
    substrate: Arc<dyn Substrate>,
    master: MasterBus,
    recorder: Recorder,
    tracks: Vec<Track>,
    sends: Vec<SendBus>,
    transport: TransportState,
    tempo: f32,
    loop_region: LoopRegion,
    next_track_id: u64,
}

impl AudioEngine {
    /// Engine over the software substrate with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> AudioEngineBuilder {
        AudioEngineBuilder::default()
    }

    // --- tracks ------------------------------------------------------------

    /// Create a track and return its id.
    pub fn add_track(&mut self, config: TrackConfig) -> Result<TrackId> {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        let track = Track::new(Arc::clone(&self.substrate), id, config, self.master.input())?;
        log::debug!("added {} ({:?})", id, track.track_type());
        self.tracks.push(track);
        // A new track must respect an already-active solo
        self.update_solo_state()?;
        Ok(id)
    }

    /// Remove a track, releasing every node it owns.
    pub fn remove_track(&mut self, id: TrackId) -> Result<()> {
        let index = self.track_index(id)?;
        let mut track = self.tracks.remove(index);
        track.dispose()?;
        log::debug!("removed {}", id);
        self.update_solo_state()
    }

    pub fn track(&self, id: TrackId) -> Result<&Track> {
        self.tracks
            .iter()
            .find(|t| t.id() == id)
            .ok_or(Error::UnknownTrack(id))
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or(Error::UnknownTrack(id))
    }

    fn track_index(&self, id: TrackId) -> Result<usize> {
        self.tracks
            .iter()
            .position(|t| t.id() == id)
            .ok_or(Error::UnknownTrack(id))
    }

    /// Track ids in creation order.
    pub fn track_ids(&self) -> Vec<TrackId> {
        self.tracks.iter().map(Track::id).collect()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn set_track_name(&mut self, id: TrackId, name: impl Into<String>) -> Result<()> {
        self.track_mut(id)?.set_name(name);
        Ok(())
    }

    pub fn set_track_color(&mut self, id: TrackId, color: impl Into<String>) -> Result<()> {
        self.track_mut(id)?.set_color(color);
        Ok(())
    }

    pub fn set_volume(&mut self, id: TrackId, db: f32) -> Result<()> {
        self.track_mut(id)?.set_volume_db(db)
    }

    pub fn set_pan(&mut self, id: TrackId, pan: f32) -> Result<()> {
        self.track_mut(id)?.set_pan(pan)
    }

    pub fn set_mute(&mut self, id: TrackId, muted: bool) -> Result<()> {
        self.track_mut(id)?.set_mute(muted)?;
        self.update_solo_state()
    }

    pub fn set_solo(&mut self, id: TrackId, soloed: bool) -> Result<()> {
        self.track_mut(id)?.set_solo(soloed);
        self.update_solo_state()
    }

    pub fn set_armed(&mut self, id: TrackId, armed: bool) -> Result<()> {
        self.track_mut(id)?.set_armed(armed);
        Ok(())
    }

    /// Recompute every track's effective output gain.
    ///
    /// Any active solo silences every non-soloed track; otherwise the gain
    /// mirrors the mute flag. Runs over all tracks on every change, which
    /// keeps the invariant independent of operation ordering.
    fn update_solo_state(&mut self) -> Result<()> {
        let any_solo = self.tracks.iter().any(Track::is_soloed);
        for track in &self.tracks {
            let audible = if any_solo {
                track.is_soloed()
            } else {
                !track.is_muted()
            };
            track.set_effective_gain(if audible { 1.0 } else { 0.0 })?;
        }
        Ok(())
    }

    // --- effects -----------------------------------------------------------

    /// Insert an effect into a track's chain. `index` of `None` appends.
    pub fn add_effect(
        &mut self,
        id: TrackId,
        kind: &str,
        index: Option<usize>,
    ) -> Result<NodeId> {
        let node = self.substrate.create_effect(kind)?;
        match self.track_mut(id)?.add_effect(node, index) {
            Ok(()) => Ok(node),
            Err(e) => {
                // Do not leak the node when the insert is rejected
                self.substrate.dispose(node)?;
                Err(e)
            }
        }
    }

    /// Remove and release the effect at `index` on a track.
    pub fn remove_effect(&mut self, id: TrackId, index: usize) -> Result<()> {
        self.track_mut(id)?.remove_effect(index)
    }

    // --- send buses --------------------------------------------------------

    /// Create a named send bus. Names are unique.
    pub fn create_send_bus(
        &mut self,
        name: impl Into<String>,
        effect_type: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        if self.sends.iter().any(|b| b.name() == name) {
            return Err(Error::DuplicateSend(name));
        }
        let bus = SendBus::new(Arc::clone(&self.substrate), name, effect_type)?;
        self.sends.push(bus);
        Ok(())
    }

    /// Remove a send bus, detaching every track routed to it first.
    pub fn remove_send_bus(&mut self, name: &str) -> Result<()> {
        let index = self
            .sends
            .iter()
            .position(|b| b.name() == name)
            .ok_or_else(|| Error::UnknownSend(name.into()))?;
        for track in &mut self.tracks {
            if track.send_gain(name).is_some() {
                track.remove_send_gain(name)?;
            }
        }
        let bus = self.sends.remove(index);
        bus.dispose()
    }

    pub fn send_bus(&self, name: &str) -> Result<&SendBus> {
        self.sends
            .iter()
            .find(|b| b.name() == name)
            .ok_or_else(|| Error::UnknownSend(name.into()))
    }

    fn send_bus_mut(&mut self, name: &str) -> Result<&mut SendBus> {
        self.sends
            .iter_mut()
            .find(|b| b.name() == name)
            .ok_or_else(|| Error::UnknownSend(name.into()))
    }

    /// Send bus names in creation order.
    pub fn send_bus_names(&self) -> Vec<String> {
        self.sends.iter().map(|b| b.name().to_string()).collect()
    }

    pub fn set_send_wet_dry(&mut self, name: &str, mix: f32) -> Result<()> {
        self.send_bus_mut(name)?.set_wet_dry(mix)
    }

    pub fn set_send_volume(&mut self, name: &str, db: f32) -> Result<()> {
        self.send_bus_mut(name)?.set_volume(db)
    }

    /// Route a track to a send bus at the given amount.
    ///
    /// Idempotent: routing an already-routed pair only updates the amount.
    pub fn route_to_send(&mut self, id: TrackId, bus: &str, amount: f32) -> Result<()> {
        let bus_input = self.send_bus(bus)?.input();
        let substrate = Arc::clone(&self.substrate);
        let track = self.track_mut(id)?;
        if let Some(gain) = track.send_gain(bus) {
            substrate.set_param(gain, amount)?;
            return Ok(());
        }
        let gain = substrate.create_gain(amount);
        substrate.connect(track.strip_output(), gain)?;
        substrate.connect(gain, bus_input)?;
        track.insert_send_gain(bus, gain);
        Ok(())
    }

    /// Remove a track's route to a send bus.
    pub fn remove_send(&mut self, id: TrackId, bus: &str) -> Result<()> {
        self.track_mut(id)?.remove_send_gain(bus)
    }

    /// Current amount of a track's route to a send bus.
    pub fn send_amount(&self, id: TrackId, bus: &str) -> Result<f32> {
        self.track(id)?.send_amount(bus)
    }

    // --- transport ---------------------------------------------------------

    pub fn play(&mut self) -> Result<()> {
        for track in &self.tracks {
            track.play(None)?;
        }
        self.transport = TransportState::Playing;
        Ok(())
    }

    /// Pause playback, keeping every player's position.
    pub fn pause(&mut self) -> Result<()> {
        for track in &self.tracks {
            track.pause()?;
        }
        self.transport = TransportState::Paused;
        Ok(())
    }

    /// Stop playback and rewind every player.
    pub fn stop(&mut self) -> Result<()> {
        for track in &self.tracks {
            track.stop(None)?;
        }
        self.transport = TransportState::Stopped;
        Ok(())
    }

    /// Move every player to `position` seconds.
    pub fn seek(&mut self, position: f64) -> Result<()> {
        for track in &self.tracks {
            track.seek(position)?;
        }
        Ok(())
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport
    }

    /// Tempo in BPM, rejected unless strictly positive.
    pub fn set_tempo(&mut self, bpm: f32) -> Result<()> {
        if bpm <= 0.0 || !bpm.is_finite() {
            return Err(Error::InvalidTempo(bpm));
        }
        self.tempo = bpm;
        Ok(())
    }

    pub fn tempo(&self) -> f32 {
        self.tempo
    }

    /// Loop window; `end` must not precede `start`.
    pub fn set_loop(&mut self, enabled: bool, start: f64, end: f64) -> Result<()> {
        if end < start {
            return Err(Error::InvalidLoopRange { start, end });
        }
        self.loop_region = LoopRegion::new(enabled, start, end);
        Ok(())
    }

    pub fn loop_region(&self) -> LoopRegion {
        self.loop_region
    }

    // --- audio sources and recording ----------------------------------------

    /// Resolve a content reference and bind it as a track's playback source.
    pub async fn load_audio(&mut self, id: TrackId, reference: &str) -> Result<()> {
        self.track_index(id)?;
        let substrate = Arc::clone(&self.substrate);
        let owned = reference.to_string();
        let buffer = crate::recorder::run_blocking(move || Ok(substrate.load_content(&owned)?))
            .await?;
        self.track_mut(id)?
            .bind_source(AudioSource::Content(reference.to_string()), buffer)
    }

    /// Start capturing input into an audio track. Moves the transport to
    /// `Recording`.
    pub async fn start_recording(&mut self, id: TrackId, device: Option<&str>) -> Result<()> {
        self.track_mut(id)?.start_recording(device)?;
        self.transport = TransportState::Recording;
        Ok(())
    }

    /// Finish a capture, decode it and bind it as the track's playback
    /// source. Moves the transport back to `Stopped`.
    pub async fn stop_recording(&mut self, id: TrackId) -> Result<()> {
        let blob = self.track_mut(id)?.stop_recording()?;
        let substrate = Arc::clone(&self.substrate);
        let buffer =
            crate::recorder::run_blocking(move || Ok(Arc::new(substrate.decode(&blob)?))).await?;
        self.track_mut(id)?
            .bind_source(AudioSource::Buffer(Arc::clone(&buffer)), buffer)?;
        self.transport = TransportState::Stopped;
        Ok(())
    }

    // --- MIDI --------------------------------------------------------------

    pub fn add_note(&mut self, id: TrackId, note: NoteEvent) -> Result<()> {
        self.track_mut(id)?.add_note(note)
    }

    pub fn remove_note(&mut self, id: TrackId, index: usize) -> Result<()> {
        self.track_mut(id)?.remove_note(index)
    }

    pub fn clear_notes(&mut self, id: TrackId) -> Result<()> {
        self.track_mut(id)?.clear_notes()
    }

    pub fn set_notes(&mut self, id: TrackId, notes: Vec<NoteEvent>) -> Result<()> {
        self.track_mut(id)?.set_notes(notes)
    }

    pub fn notes(&self, id: TrackId) -> Result<&[NoteEvent]> {
        self.track(id)?.notes()
    }

    /// Sound a note immediately on a MIDI track.
    pub fn trigger_note(
        &self,
        id: TrackId,
        pitch: u8,
        duration: f64,
        velocity: f32,
    ) -> Result<()> {
        self.track(id)?.trigger_note(pitch, duration, velocity)
    }

    pub fn set_synth_type(&mut self, id: TrackId, kind: impl Into<String>) -> Result<()> {
        self.track_mut(id)?.set_synth_type(kind)
    }

    // --- export ------------------------------------------------------------

    /// Export the mix per `options`, returning encoded bytes.
    ///
    /// Fails while any track is recording; the capture path is exclusive.
    pub async fn export(&self, options: &ExportOptions) -> Result<Vec<u8>> {
        if self.tracks.iter().any(Track::is_recording) {
            return Err(Error::AlreadyRecording);
        }
        self.recorder.export(options).await
    }

    /// Export the mix per `options` to a file.
    pub async fn export_to_file(&self, options: &ExportOptions, path: &Path) -> Result<()> {
        if self.tracks.iter().any(Track::is_recording) {
            return Err(Error::AlreadyRecording);
        }
        self.recorder.export_to_file(options, path).await
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    // --- persistence -------------------------------------------------------

    /// Lower the engine state into the persistence model.
    pub fn save_project(&self) -> Result<ProjectData> {
        let sends = self
            .sends
            .iter()
            .map(|bus| SendBusData {
                name: bus.name().into(),
                effect_type: bus.effect_type().into(),
                wet_dry: bus.wet_dry(),
                volume_db: bus.volume(),
            })
            .collect();

        let mut tracks = Vec::with_capacity(self.tracks.len());
        for track in &self.tracks {
            let mut routes = Vec::new();
            for name in track.send_names() {
                routes.push(SendRouteData {
                    amount: track.send_amount(&name)?,
                    name,
                });
            }
            let base = TrackBase {
                id: track.id(),
                name: track.name().into(),
                color: track.color().into(),
                volume_db: track.volume_db(),
                pan: track.pan(),
                muted: track.is_muted(),
                soloed: track.is_soloed(),
                armed: track.is_armed(),
                sends: routes,
            };
            tracks.push(match track.track_type() {
                TrackType::Audio => TrackData::Audio {
                    base,
                    source: track
                        .source()
                        .and_then(AudioSource::reference)
                        .map(String::from),
                },
                TrackType::Midi => TrackData::Midi {
                    base,
                    synth_type: track.synth_type()?.into(),
                    notes: track.notes()?.to_vec(),
                },
            });
        }

        Ok(ProjectData {
            version: PROJECT_FORMAT_VERSION.into(),
            tempo: self.tempo,
            master_volume_db: self.master.volume(),
            loop_enabled: self.loop_region.enabled,
            loop_start: self.loop_region.start,
            loop_end: self.loop_region.end,
            sends,
            tracks,
        })
    }

    /// Serialize the project to JSON.
    pub fn serialize_project(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.save_project()?)?)
    }

    /// Rebuild the engine from a persisted project.
    ///
    /// Everything currently loaded is torn down first. Track ids from the
    /// project are restored verbatim; id allocation continues past the
    /// largest restored id. A source that no longer resolves leaves its
    /// track unbound instead of failing the whole load.
    pub async fn load_project(&mut self, data: ProjectData) -> Result<()> {
        if !data.is_supported_version() {
            return Err(Error::UnsupportedProjectVersion(data.version));
        }
        self.stop()?;

        for mut track in self.tracks.drain(..) {
            track.dispose()?;
        }
        for bus in self.sends.drain(..) {
            bus.dispose()?;
        }

        self.set_tempo(data.tempo)?;
        self.master.set_volume(data.master_volume_db)?;
        self.set_loop(data.loop_enabled, data.loop_start, data.loop_end)?;

        for bus in &data.sends {
            self.create_send_bus(bus.name.clone(), bus.effect_type.clone())?;
            let built = self.send_bus_mut(&bus.name)?;
            built.set_wet_dry(bus.wet_dry)?;
            built.set_volume(bus.volume_db)?;
        }

        for data_track in &data.tracks {
            let base = data_track.base();
            let config = match data_track {
                TrackData::Audio { .. } => TrackConfig::audio(base.name.clone()),
                TrackData::Midi { synth_type, .. } => {
                    TrackConfig::midi(base.name.clone()).synth_type(synth_type.clone())
                }
            };
            let config = config.color(base.color.clone());

            let id = base.id;
            let mut track =
                Track::new(Arc::clone(&self.substrate), id, config, self.master.input())?;
            track.set_volume_db(base.volume_db)?;
            track.set_pan(base.pan)?;
            track.set_mute(base.muted)?;
            track.set_solo(base.soloed);
            track.set_armed(base.armed);
            self.tracks.push(track);
            self.next_track_id = self.next_track_id.max(id.0 + 1);

            for route in &base.sends {
                self.route_to_send(id, &route.name, route.amount)?;
            }

            match data_track {
                TrackData::Audio { source, .. } => {
                    if let Some(reference) = source {
                        if let Err(e) = self.load_audio(id, reference).await {
                            log::warn!("source {:?} failed to load for {}: {}", reference, id, e);
                        }
                    }
                }
                TrackData::Midi { notes, .. } => {
                    if !notes.is_empty() {
                        self.set_notes(id, notes.clone())?;
                    }
                }
            }
        }

        self.update_solo_state()?;
        log::info!(
            "project loaded: {} tracks, {} sends",
            self.tracks.len(),
            self.sends.len()
        );
        Ok(())
    }

    /// Deserialize a project from JSON and load it.
    pub async fn deserialize_project(&mut self, json: &str) -> Result<()> {
        let data: ProjectData = serde_json::from_str(json)?;
        self.load_project(data).await
    }

    // --- accessors ----------------------------------------------------------

    pub fn substrate(&self) -> &Arc<dyn Substrate> {
        &self.substrate
    }

    pub fn master(&self) -> &MasterBus {
        &self.master
    }

    pub fn master_mut(&mut self) -> &mut MasterBus {
        &mut self.master
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use divisi_core::db_to_linear;

    fn engine() -> AudioEngine {
        AudioEngine::new().unwrap()
    }

    #[test]
    fn test_add_remove_track() {
        let mut engine = engine();
        let a = engine.add_track(TrackConfig::audio("a")).unwrap();
        let b = engine.add_track(TrackConfig::midi("b")).unwrap();
        assert_ne!(a, b);
        assert_eq!(engine.track_ids(), vec![a, b]);

        engine.remove_track(a).unwrap();
        assert_eq!(engine.track_ids(), vec![b]);
        assert!(matches!(
            engine.remove_track(a),
            Err(Error::UnknownTrack(_))
        ));
        assert!(matches!(engine.track(a), Err(Error::UnknownTrack(_))));
    }

    #[test]
    fn test_track_ids_never_reused() {
        let mut engine = engine();
        let a = engine.add_track(TrackConfig::audio("a")).unwrap();
        engine.remove_track(a).unwrap();
        let b = engine.add_track(TrackConfig::audio("b")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_solo_matrix() {
        let mut engine = engine();
        let a = engine.add_track(TrackConfig::audio("a")).unwrap();
        let b = engine.add_track(TrackConfig::audio("b")).unwrap();

        let gain = |e: &AudioEngine, id| e.track(id).unwrap().effective_gain().unwrap();

        // No solo anywhere: both audible
        assert_eq!(gain(&engine, a), 1.0);
        assert_eq!(gain(&engine, b), 1.0);

        engine.set_solo(a, true).unwrap();
        assert_eq!(gain(&engine, a), 1.0);
        assert_eq!(gain(&engine, b), 0.0);

        // A track added during a solo is silenced too
        let c = engine.add_track(TrackConfig::audio("c")).unwrap();
        assert_eq!(gain(&engine, c), 0.0);

        engine.set_solo(a, false).unwrap();
        assert_eq!(gain(&engine, b), 1.0);
        assert_eq!(gain(&engine, c), 1.0);

        // Without any solo, mute drives the effective gain
        engine.set_mute(b, true).unwrap();
        assert_eq!(gain(&engine, b), 0.0);
        engine.set_mute(b, false).unwrap();
        assert_eq!(gain(&engine, b), 1.0);
    }

    #[test]
    fn test_send_bus_lifecycle() {
        let mut engine = engine();
        let id = engine.add_track(TrackConfig::audio("a")).unwrap();
        engine.create_send_bus("verb", "reverb").unwrap();
        assert!(matches!(
            engine.create_send_bus("verb", "delay"),
            Err(Error::DuplicateSend(_))
        ));

        engine.route_to_send(id, "verb", 0.3).unwrap();
        assert_relative_eq!(engine.send_amount(id, "verb").unwrap(), 0.3);

        // Re-routing updates the amount in place
        engine.route_to_send(id, "verb", 0.7).unwrap();
        assert_relative_eq!(engine.send_amount(id, "verb").unwrap(), 0.7);

        engine.remove_send_bus("verb").unwrap();
        assert!(matches!(
            engine.send_amount(id, "verb"),
            Err(Error::UnknownSend(_))
        ));
        assert!(engine.send_bus_names().is_empty());
    }

    #[test]
    fn test_route_to_unknown_send() {
        let mut engine = engine();
        let id = engine.add_track(TrackConfig::audio("a")).unwrap();
        assert!(matches!(
            engine.route_to_send(id, "nope", 0.5),
            Err(Error::UnknownSend(_))
        ));
    }

    #[test]
    fn test_effect_chain_ops() {
        let mut engine = engine();
        let id = engine.add_track(TrackConfig::audio("a")).unwrap();
        let fx = engine.add_effect(id, "reverb", None).unwrap();
        assert_eq!(engine.track(id).unwrap().effects(), &[fx]);

        assert!(matches!(
            engine.add_effect(id, "delay", Some(5)),
            Err(Error::EffectIndexOutOfRange { .. })
        ));
        engine.remove_effect(id, 0).unwrap();
        assert!(engine.track(id).unwrap().effects().is_empty());
    }

    #[test]
    fn test_transport_states() {
        let mut engine = engine();
        engine.add_track(TrackConfig::audio("a")).unwrap();
        assert_eq!(engine.transport_state(), TransportState::Stopped);

        engine.play().unwrap();
        assert_eq!(engine.transport_state(), TransportState::Playing);
        engine.pause().unwrap();
        assert_eq!(engine.transport_state(), TransportState::Paused);
        engine.stop().unwrap();
        assert_eq!(engine.transport_state(), TransportState::Stopped);
    }

    #[test]
    fn test_tempo_and_loop_validation() {
        let mut engine = engine();
        engine.set_tempo(90.5).unwrap();
        assert_eq!(engine.tempo(), 90.5);
        assert!(matches!(engine.set_tempo(0.0), Err(Error::InvalidTempo(_))));
        assert!(matches!(
            engine.set_tempo(-10.0),
            Err(Error::InvalidTempo(_))
        ));

        engine.set_loop(true, 1.0, 5.0).unwrap();
        assert!(engine.loop_region().enabled);
        assert!(matches!(
            engine.set_loop(true, 5.0, 1.0),
            Err(Error::InvalidLoopRange { .. })
        ));
    }

    #[test]
    fn test_midi_ops_require_midi_track() {
        let mut engine = engine();
        let audio = engine.add_track(TrackConfig::audio("a")).unwrap();
        assert!(matches!(
            engine.add_note(audio, NoteEvent::new(60, 0.0, 1.0, 1.0)),
            Err(Error::NotMidiTrack(_))
        ));

        let midi = engine.add_track(TrackConfig::midi("m")).unwrap();
        engine.add_note(midi, NoteEvent::new(60, 0.0, 1.0, 1.0)).unwrap();
        engine.add_note(midi, NoteEvent::new(64, 1.0, 1.0, 1.0)).unwrap();
        assert_eq!(engine.notes(midi).unwrap().len(), 2);
        engine.remove_note(midi, 0).unwrap();
        assert_eq!(engine.notes(midi).unwrap()[0].pitch, 64);
        engine.clear_notes(midi).unwrap();
        assert!(engine.notes(midi).unwrap().is_empty());
    }

    #[test]
    fn test_set_volume_linear_gain() {
        let mut engine = engine();
        let id = engine.add_track(TrackConfig::audio("a")).unwrap();
        engine.set_volume(id, -6.0).unwrap();
        assert_eq!(engine.track(id).unwrap().volume_db(), -6.0);
        let volume_node = engine.track(id).unwrap().chain_input();
        assert_relative_eq!(
            engine.substrate().param(volume_node).unwrap(),
            db_to_linear(-6.0),
            epsilon = 1e-6
        );
    }
}
