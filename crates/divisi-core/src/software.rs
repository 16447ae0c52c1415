//! In-process software substrate.
//!
//! `SoftwareSubstrate` is the shipped implementation of [`Substrate`]. It
//! models the full node graph (kinds, parameters, edges) without rendering
//! any audio, which is exactly what the engine needs: topology and parameter
//! state it can mutate and introspect deterministically. A real-time
//! implementation backed by an audio device plugs in behind the same trait.

use crate::buffer::{AudioBlob, SampleBuffer};
use crate::error::{Error, Result};
use crate::note::NoteEvent;
use crate::substrate::{
    CaptureSession, NodeId, ScheduleId, Substrate, ANALYSIS_WINDOW, FREQUENCY_BINS,
    SILENCE_FLOOR_DB,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Gain,
    Pan,
    Limiter,
    Meter,
    Crossfade,
    Analyser,
    Effect(String),
    Instrument(String),
    Player,
    CaptureInput,
    Sink,
}

impl NodeKind {
    fn name(&self) -> &'static str {
        match self {
            NodeKind::Gain => "gain",
            NodeKind::Pan => "pan",
            NodeKind::Limiter => "limiter",
            NodeKind::Meter => "meter",
            NodeKind::Crossfade => "crossfade",
            NodeKind::Analyser => "analyser",
            NodeKind::Effect(_) => "effect",
            NodeKind::Instrument(_) => "instrument",
            NodeKind::Player => "player",
            NodeKind::CaptureInput => "capture input",
            NodeKind::Sink => "sink",
        }
    }
}

struct NodeEntry {
    kind: NodeKind,
    param: f32,
    outputs: Vec<NodeId>,
    buffer: Option<Arc<SampleBuffer>>,
    playing: bool,
    position: f64,
}

impl NodeEntry {
    fn new(kind: NodeKind, param: f32) -> Self {
        Self {
            kind,
            param,
            outputs: Vec::new(),
            buffer: None,
            playing: false,
            position: 0.0,
        }
    }
}

struct ScheduleEntry {
    instrument: NodeId,
    notes: Vec<NoteEvent>,
}

struct Inner {
    sample_rate: u32,
    channels: u16,
    next_node: u64,
    next_schedule: u64,
    nodes: HashMap<u64, NodeEntry>,
    schedules: HashMap<u64, ScheduleEntry>,
    sink: NodeId,
    /// Constant sample value produced by bounded captures.
    capture_signal: f32,
    /// Frames queued for the next live capture finalization.
    pending_input: Vec<f32>,
    content: HashMap<String, Arc<SampleBuffer>>,
}

impl Inner {
    fn alloc(&mut self, kind: NodeKind, param: f32) -> NodeId {
        let id = self.next_node;
        self.next_node += 1;
        self.nodes.insert(id, NodeEntry::new(kind, param));
        NodeId(id)
    }

    fn entry(&self, node: NodeId) -> Result<&NodeEntry> {
        self.nodes.get(&node.0).ok_or(Error::UnknownNode(node))
    }

    fn entry_mut(&mut self, node: NodeId) -> Result<&mut NodeEntry> {
        self.nodes.get_mut(&node.0).ok_or(Error::UnknownNode(node))
    }

    fn expect_kind(&self, node: NodeId, want: &NodeKind) -> Result<()> {
        let entry = self.entry(node)?;
        let matches = match (&entry.kind, want) {
            (NodeKind::Effect(_), NodeKind::Effect(_)) => true,
            (NodeKind::Instrument(_), NodeKind::Instrument(_)) => true,
            (a, b) => a == b,
        };
        if matches {
            Ok(())
        } else {
            Err(Error::WrongNodeKind(node, want.name()))
        }
    }
}

/// Software implementation of the rendering substrate.
///
/// Cheap to clone: clones share the same graph.
#[derive(Clone)]
pub struct SoftwareSubstrate {
    inner: Arc<Mutex<Inner>>,
}

impl SoftwareSubstrate {
    /// Substrate at 44.1 kHz stereo.
    pub fn new() -> Self {
        Self::with_config(44_100, 2)
    }

    pub fn with_config(sample_rate: u32, channels: u16) -> Self {
        let mut inner = Inner {
            sample_rate,
            channels,
            next_node: 0,
            next_schedule: 0,
            nodes: HashMap::new(),
            schedules: HashMap::new(),
            sink: NodeId(0),
            capture_signal: 0.0,
            pending_input: Vec::new(),
            content: HashMap::new(),
        };
        inner.sink = inner.alloc(NodeKind::Sink, 1.0);
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Register a decoded buffer under a content reference so
    /// `load_content` can resolve it.
    pub fn register_content(&self, reference: impl Into<String>, buffer: SampleBuffer) {
        self.inner
            .lock()
            .content
            .insert(reference.into(), Arc::new(buffer));
    }

    /// Set the constant sample value bounded captures produce.
    /// Default is 0.0 (silence).
    pub fn set_capture_signal(&self, value: f32) {
        self.inner.lock().capture_signal = value;
    }

    /// Queue interleaved frames for the next live capture finalization.
    ///
    /// The software substrate has no real input device; this is the shared
    /// input feed a running live capture drains when it stops.
    pub fn feed_input(&self, samples: &[f32]) {
        self.inner.lock().pending_input.extend_from_slice(samples);
    }

    /// Total node count, including the sink.
    pub fn node_count(&self) -> usize {
        self.inner.lock().nodes.len()
    }
}

impl Default for SoftwareSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl Substrate for SoftwareSubstrate {
    fn sample_rate(&self) -> u32 {
        self.inner.lock().sample_rate
    }

    fn channels(&self) -> u16 {
        self.inner.lock().channels
    }

    fn create_gain(&self, gain: f32) -> NodeId {
        self.inner.lock().alloc(NodeKind::Gain, gain)
    }

    fn create_pan(&self, pan: f32) -> NodeId {
        self.inner.lock().alloc(NodeKind::Pan, pan)
    }

    fn create_limiter(&self, ceiling_db: f32) -> NodeId {
        self.inner.lock().alloc(NodeKind::Limiter, ceiling_db)
    }

    fn create_meter(&self) -> NodeId {
        self.inner.lock().alloc(NodeKind::Meter, SILENCE_FLOOR_DB)
    }

    fn create_crossfade(&self, mix: f32) -> NodeId {
        self.inner.lock().alloc(NodeKind::Crossfade, mix)
    }

    fn create_analyser(&self) -> NodeId {
        self.inner.lock().alloc(NodeKind::Analyser, 0.0)
    }

    fn create_effect(&self, kind: &str) -> Result<NodeId> {
        if kind.is_empty() {
            return Err(Error::InvalidKind(kind.into()));
        }
        Ok(self
            .inner
            .lock()
            .alloc(NodeKind::Effect(kind.into()), 1.0))
    }

    fn create_instrument(&self, kind: &str) -> Result<NodeId> {
        if kind.is_empty() {
            return Err(Error::InvalidKind(kind.into()));
        }
        Ok(self
            .inner
            .lock()
            .alloc(NodeKind::Instrument(kind.into()), 1.0))
    }

    fn create_player(&self, buffer: Arc<SampleBuffer>) -> NodeId {
        let mut inner = self.inner.lock();
        let id = inner.alloc(NodeKind::Player, 1.0);
        inner
            .nodes
            .get_mut(&id.0)
            .expect("just allocated")
            .buffer = Some(buffer);
        id
    }

    fn hardware_sink(&self) -> NodeId {
        self.inner.lock().sink
    }

    fn connect(&self, from: NodeId, to: NodeId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.entry(to)?;
        let entry = inner.entry_mut(from)?;
        if !entry.outputs.contains(&to) {
            entry.outputs.push(to);
        }
        Ok(())
    }

    fn disconnect(&self, node: NodeId) -> Result<()> {
        self.inner.lock().entry_mut(node)?.outputs.clear();
        Ok(())
    }

    fn dispose(&self, node: NodeId) -> Result<()> {
        let mut inner = self.inner.lock();
        if node == inner.sink {
            return Err(Error::WrongNodeKind(node, "disposable"));
        }
        inner
            .nodes
            .remove(&node.0)
            .ok_or(Error::UnknownNode(node))?;
        for entry in inner.nodes.values_mut() {
            entry.outputs.retain(|&out| out != node);
        }
        inner.schedules.retain(|_, s| s.instrument != node);
        Ok(())
    }

    fn outputs_of(&self, node: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.inner.lock().entry(node)?.outputs.clone())
    }

    fn set_param(&self, node: NodeId, value: f32) -> Result<()> {
        self.inner.lock().entry_mut(node)?.param = value;
        Ok(())
    }

    fn param(&self, node: NodeId) -> Result<f32> {
        Ok(self.inner.lock().entry(node)?.param)
    }

    fn start_player(&self, node: NodeId, _at: Option<f64>) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.expect_kind(node, &NodeKind::Player)?;
        inner.entry_mut(node)?.playing = true;
        Ok(())
    }

    fn stop_player(&self, node: NodeId, _at: Option<f64>) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.expect_kind(node, &NodeKind::Player)?;
        inner.entry_mut(node)?.playing = false;
        Ok(())
    }

    fn seek_player(&self, node: NodeId, position: f64) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.expect_kind(node, &NodeKind::Player)?;
        inner.entry_mut(node)?.position = position;
        Ok(())
    }

    fn player_duration(&self, node: NodeId) -> Result<f64> {
        let inner = self.inner.lock();
        inner.expect_kind(node, &NodeKind::Player)?;
        Ok(inner
            .entry(node)?
            .buffer
            .as_ref()
            .map(|b| b.duration_secs())
            .unwrap_or(0.0))
    }

    fn schedule_notes(&self, instrument: NodeId, notes: &[NoteEvent]) -> Result<ScheduleId> {
        let mut inner = self.inner.lock();
        inner.expect_kind(instrument, &NodeKind::Instrument(String::new()))?;
        let id = inner.next_schedule;
        inner.next_schedule += 1;
        inner.schedules.insert(
            id,
            ScheduleEntry {
                instrument,
                notes: notes.to_vec(),
            },
        );
        Ok(ScheduleId(id))
    }

    fn cancel_schedule(&self, schedule: ScheduleId) -> Result<()> {
        self.inner
            .lock()
            .schedules
            .remove(&schedule.0)
            .map(|_| ())
            .ok_or(Error::UnknownSchedule(schedule))
    }

    fn scheduled_notes(&self, schedule: ScheduleId) -> Result<Vec<NoteEvent>> {
        Ok(self
            .inner
            .lock()
            .schedules
            .get(&schedule.0)
            .ok_or(Error::UnknownSchedule(schedule))?
            .notes
            .clone())
    }

    fn trigger_note(
        &self,
        instrument: NodeId,
        pitch: u8,
        duration: f64,
        velocity: f32,
    ) -> Result<()> {
        let inner = self.inner.lock();
        inner.expect_kind(instrument, &NodeKind::Instrument(String::new()))?;
        log::debug!(
            "trigger note {} on {} for {}s at velocity {}",
            pitch,
            instrument,
            duration,
            velocity
        );
        Ok(())
    }

    fn meter_level_db(&self, meter: NodeId) -> Result<f32> {
        let inner = self.inner.lock();
        inner.expect_kind(meter, &NodeKind::Meter)?;
        inner.entry(meter).map(|e| e.param)
    }

    fn frequency_data(&self, analyser: NodeId) -> Result<Vec<f32>> {
        self.inner
            .lock()
            .expect_kind(analyser, &NodeKind::Analyser)?;
        Ok(vec![SILENCE_FLOOR_DB; FREQUENCY_BINS])
    }

    fn waveform_data(&self, analyser: NodeId) -> Result<Vec<f32>> {
        self.inner
            .lock()
            .expect_kind(analyser, &NodeKind::Analyser)?;
        Ok(vec![0.0; ANALYSIS_WINDOW])
    }

    fn open_capture(&self, device: Option<&str>) -> Result<Box<dyn CaptureSession>> {
        let mut inner = self.inner.lock();
        let input = inner.alloc(NodeKind::CaptureInput, 1.0);
        log::debug!(
            "opened capture on {:?} (input {})",
            device.unwrap_or("default"),
            input
        );
        drop(inner);
        Ok(Box::new(SoftwareCapture {
            inner: Arc::clone(&self.inner),
            input,
            state: CaptureState::Idle,
            frames: Vec::new(),
        }))
    }

    fn decode(&self, blob: &AudioBlob) -> Result<SampleBuffer> {
        if blob.data.len() % 4 != 0 {
            return Err(Error::Decode(format!(
                "blob length {} is not a whole number of f32 samples",
                blob.data.len()
            )));
        }
        let samples = blob
            .data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(SampleBuffer::new(blob.sample_rate, blob.channels, samples))
    }

    fn load_content(&self, reference: &str) -> Result<Arc<SampleBuffer>> {
        self.inner
            .lock()
            .content
            .get(reference)
            .cloned()
            .ok_or_else(|| Error::ContentNotFound(reference.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaptureState {
    Idle,
    Running,
    Complete,
}

struct SoftwareCapture {
    inner: Arc<Mutex<Inner>>,
    input: NodeId,
    state: CaptureState,
    frames: Vec<f32>,
}

impl CaptureSession for SoftwareCapture {
    fn start(&mut self) -> Result<()> {
        if self.state != CaptureState::Idle {
            return Err(Error::CaptureBusy);
        }
        self.state = CaptureState::Running;
        Ok(())
    }

    fn run_for(&mut self, duration_secs: f64) -> Result<()> {
        if self.state != CaptureState::Idle {
            return Err(Error::CaptureBusy);
        }
        let inner = self.inner.lock();
        let frames = (duration_secs * inner.sample_rate as f64).round() as usize;
        self.frames = vec![inner.capture_signal; frames * inner.channels as usize];
        drop(inner);
        self.state = CaptureState::Complete;
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioBlob> {
        if self.state == CaptureState::Idle {
            return Err(Error::CaptureNotStarted);
        }
        let mut inner = self.inner.lock();
        if self.state == CaptureState::Running && self.frames.is_empty() {
            self.frames = std::mem::take(&mut inner.pending_input);
        }
        let blob = AudioBlob::from_samples(inner.sample_rate, inner.channels, &self.frames);
        // Release the input node; ignore a double stop.
        inner.nodes.remove(&self.input.0);
        for entry in inner.nodes.values_mut() {
            entry.outputs.retain(|&out| out != self.input);
        }
        drop(inner);
        self.state = CaptureState::Idle;
        self.frames.clear();
        Ok(blob)
    }

    fn input_node(&self) -> NodeId {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_introspect() {
        let sub = SoftwareSubstrate::new();
        let a = sub.create_gain(1.0);
        let b = sub.create_pan(0.0);
        let c = sub.create_gain(0.5);

        sub.connect(a, b).unwrap();
        sub.connect(b, c).unwrap();
        sub.connect(a, b).unwrap(); // idempotent

        assert_eq!(sub.outputs_of(a).unwrap(), vec![b]);
        assert_eq!(sub.outputs_of(b).unwrap(), vec![c]);
    }

    #[test]
    fn test_disconnect_keeps_inbound_edges() {
        let sub = SoftwareSubstrate::new();
        let a = sub.create_gain(1.0);
        let b = sub.create_gain(1.0);
        sub.connect(a, b).unwrap();

        sub.disconnect(b).unwrap();
        assert_eq!(sub.outputs_of(a).unwrap(), vec![b]);
        assert!(sub.outputs_of(b).unwrap().is_empty());
    }

    #[test]
    fn test_dispose_scrubs_edges() {
        let sub = SoftwareSubstrate::new();
        let a = sub.create_gain(1.0);
        let b = sub.create_gain(1.0);
        sub.connect(a, b).unwrap();

        sub.dispose(b).unwrap();
        assert!(sub.outputs_of(a).unwrap().is_empty());
        assert!(matches!(sub.param(b), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn test_sink_is_not_disposable() {
        let sub = SoftwareSubstrate::new();
        let sink = sub.hardware_sink();
        assert!(sub.dispose(sink).is_err());
    }

    #[test]
    fn test_wrong_node_kind() {
        let sub = SoftwareSubstrate::new();
        let gain = sub.create_gain(1.0);
        assert!(matches!(
            sub.start_player(gain, None),
            Err(Error::WrongNodeKind(_, "player"))
        ));
        assert!(sub.meter_level_db(gain).is_err());
    }

    #[test]
    fn test_capture_lifecycle_errors() {
        let sub = SoftwareSubstrate::new();
        let mut session = sub.open_capture(None).unwrap();

        assert!(matches!(session.stop(), Err(Error::CaptureNotStarted)));
        session.start().unwrap();
        assert!(matches!(session.start(), Err(Error::CaptureBusy)));
        assert!(matches!(session.run_for(1.0), Err(Error::CaptureBusy)));
        let blob = session.stop().unwrap();
        assert!(blob.is_empty());
    }

    #[test]
    fn test_bounded_capture_exact_size() {
        let sub = SoftwareSubstrate::with_config(44_100, 2);
        let mut session = sub.open_capture(None).unwrap();
        session.run_for(1.0).unwrap();
        let blob = session.stop().unwrap();
        assert_eq!(blob.sample_len(), 44_100 * 2);
    }

    #[test]
    fn test_capture_signal_value() {
        let sub = SoftwareSubstrate::with_config(8_000, 1);
        sub.set_capture_signal(1.0);
        let mut session = sub.open_capture(None).unwrap();
        session.run_for(0.5).unwrap();
        let blob = session.stop().unwrap();
        let buf = sub.decode(&blob).unwrap();
        assert_eq!(buf.frames(), 4_000);
        assert!(buf.samples.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_live_capture_drains_fed_input() {
        let sub = SoftwareSubstrate::with_config(8_000, 1);
        let mut session = sub.open_capture(None).unwrap();
        session.start().unwrap();
        sub.feed_input(&[0.25, -0.25, 0.5]);
        let blob = session.stop().unwrap();
        let buf = sub.decode(&blob).unwrap();
        assert_eq!(buf.samples, vec![0.25, -0.25, 0.5]);
    }

    #[test]
    fn test_capture_stop_releases_input_node() {
        let sub = SoftwareSubstrate::new();
        let before = sub.node_count();
        let mut session = sub.open_capture(None).unwrap();
        assert_eq!(sub.node_count(), before + 1);
        session.start().unwrap();
        session.stop().unwrap();
        assert_eq!(sub.node_count(), before);
    }

    #[test]
    fn test_schedule_round_trip_and_cancel() {
        let sub = SoftwareSubstrate::new();
        let inst = sub.create_instrument("poly").unwrap();
        let notes = vec![NoteEvent::new(60, 0.0, 1.0, 0.8)];
        let id = sub.schedule_notes(inst, &notes).unwrap();
        assert_eq!(sub.scheduled_notes(id).unwrap(), notes);
        sub.cancel_schedule(id).unwrap();
        assert!(matches!(
            sub.cancel_schedule(id),
            Err(Error::UnknownSchedule(_))
        ));
    }

    #[test]
    fn test_dispose_instrument_drops_schedules() {
        let sub = SoftwareSubstrate::new();
        let inst = sub.create_instrument("poly").unwrap();
        let id = sub
            .schedule_notes(inst, &[NoteEvent::new(64, 0.0, 0.5, 1.0)])
            .unwrap();
        sub.dispose(inst).unwrap();
        assert!(sub.scheduled_notes(id).is_err());
    }

    #[test]
    fn test_content_registry() {
        let sub = SoftwareSubstrate::new();
        assert!(matches!(
            sub.load_content("missing.wav"),
            Err(Error::ContentNotFound(_))
        ));
        sub.register_content("kick.wav", SampleBuffer::silent(44_100, 2, 0.25));
        let buf = sub.load_content("kick.wav").unwrap();
        assert_eq!(buf.frames(), 11_025);
    }

    #[test]
    fn test_analyser_snapshot_sizes() {
        let sub = SoftwareSubstrate::new();
        let analyser = sub.create_analyser();
        assert_eq!(sub.frequency_data(analyser).unwrap().len(), FREQUENCY_BINS);
        assert_eq!(sub.waveform_data(analyser).unwrap().len(), ANALYSIS_WINDOW);
    }
}
