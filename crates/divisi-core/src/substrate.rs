//! The substrate interface: the opaque processing collaborator the engine
//! orchestrates.
//!
//! The engine never computes audio samples itself (export-time encoding
//! excepted). It builds and rewires a graph of nodes owned by a substrate:
//! gain, pan, limiter, meter, crossfade, analyser, players, instruments and
//! the hardware sink. Real-time rendering happens inside the substrate's own
//! callback; the engine only mutates topology and parameters from a single
//! control thread.

use crate::buffer::{AudioBlob, SampleBuffer};
use crate::error::Result;
use crate::note::NoteEvent;
use core::fmt;
use std::sync::Arc;

/// Opaque handle to a processing node owned by a substrate.
///
/// Stable for the lifetime of the node; never reused after `dispose`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Handle to a batch of scheduled notes on an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId(pub u64);

impl fmt::Display for ScheduleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schedule#{}", self.0)
    }
}

/// Waveform snapshot window, in samples.
pub const ANALYSIS_WINDOW: usize = 2048;

/// Frequency snapshot bin count (half the analysis window).
pub const FREQUENCY_BINS: usize = ANALYSIS_WINDOW / 2;

/// Meter floor reported for silence, in dB.
pub const SILENCE_FLOOR_DB: f32 = -96.0;

/// Convert a decibel value to linear gain.
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear gain to decibels, floored at [`SILENCE_FLOOR_DB`].
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        SILENCE_FLOOR_DB
    } else {
        (20.0 * linear.log10()).max(SILENCE_FLOOR_DB)
    }
}

/// A live input capture session.
///
/// One session is one capture: open it via [`Substrate::open_capture`], run
/// it either live (`start` then `stop`) or bounded (`run_for` then `stop`),
/// and collect the raw blob from `stop`. The session's `input_node` can be
/// wired into a track chain for monitoring while the capture is running.
pub trait CaptureSession: Send {
    /// Begin capturing. Fails with `CaptureBusy` if already running.
    fn start(&mut self) -> Result<()>;

    /// Capture exactly `duration_secs` of input without real-time pacing.
    ///
    /// Used by bounded export. A real-time substrate may take wall-clock
    /// time here; the software substrate fills the buffer immediately.
    /// Fails with `CaptureBusy` if a live capture was already started.
    fn run_for(&mut self, duration_secs: f64) -> Result<()>;

    /// Finalize the capture and return everything captured so far.
    ///
    /// Releases the session's input node. Fails with `CaptureNotStarted`
    /// if the session was never started or run.
    fn stop(&mut self) -> Result<AudioBlob>;

    /// Monitoring tap for this capture's input signal.
    fn input_node(&self) -> NodeId;
}

/// The opaque rendering substrate.
///
/// Implementations own all nodes and the edges between them. `NodeId`
/// handles returned here are the only way the engine refers to nodes.
/// All methods take `&self`; implementations provide their own interior
/// synchronization. Topology mutation is still expected to come from a
/// single control thread.
pub trait Substrate: Send + Sync {
    /// Output sample rate.
    fn sample_rate(&self) -> u32;

    /// Output channel count.
    fn channels(&self) -> u16;

    // --- node construction -------------------------------------------------

    /// Gain stage with the given linear gain.
    fn create_gain(&self, gain: f32) -> NodeId;

    /// Stereo pan stage, `pan` in [-1, 1].
    fn create_pan(&self, pan: f32) -> NodeId;

    /// Limiter with a fixed ceiling in dB. The ceiling is not adjustable
    /// after construction.
    fn create_limiter(&self, ceiling_db: f32) -> NodeId;

    /// Peak level meter.
    fn create_meter(&self) -> NodeId;

    /// Wet/dry crossfade, `mix` in [0, 1] (0 = dry, 1 = wet).
    fn create_crossfade(&self, mix: f32) -> NodeId;

    /// Frequency/waveform analyser with a fixed analysis window.
    fn create_analyser(&self) -> NodeId;

    /// Named effect unit. The substrate decides what names it supports.
    fn create_effect(&self, kind: &str) -> Result<NodeId>;

    /// Named instrument for note playback.
    fn create_instrument(&self, kind: &str) -> Result<NodeId>;

    /// Sample player bound to a buffer.
    fn create_player(&self, buffer: Arc<SampleBuffer>) -> NodeId;

    /// The terminal hardware output. Always present, never disposable.
    fn hardware_sink(&self) -> NodeId;

    // --- topology ----------------------------------------------------------

    /// Wire `from`'s output into `to`'s input. Idempotent per edge.
    fn connect(&self, from: NodeId, to: NodeId) -> Result<()>;

    /// Drop every outgoing edge of `node`. Inbound edges are untouched.
    fn disconnect(&self, node: NodeId) -> Result<()>;

    /// Destroy a node, removing it and every edge touching it.
    fn dispose(&self, node: NodeId) -> Result<()>;

    /// Current outgoing neighbors of `node`, in connection order.
    fn outputs_of(&self, node: NodeId) -> Result<Vec<NodeId>>;

    // --- parameters --------------------------------------------------------

    /// Set a node's primary scalar (gain, pan position, mix, ...).
    fn set_param(&self, node: NodeId, value: f32) -> Result<()>;

    /// Read back a node's primary scalar.
    fn param(&self, node: NodeId) -> Result<f32>;

    // --- playback ----------------------------------------------------------

    /// Start a player, optionally at a substrate timeline offset.
    fn start_player(&self, node: NodeId, at: Option<f64>) -> Result<()>;

    /// Stop a player without resetting its position.
    fn stop_player(&self, node: NodeId, at: Option<f64>) -> Result<()>;

    /// Move a player's position, in seconds.
    fn seek_player(&self, node: NodeId, position: f64) -> Result<()>;

    /// Duration of the buffer bound to a player, in seconds.
    fn player_duration(&self, node: NodeId) -> Result<f64>;

    // --- note scheduling ---------------------------------------------------

    /// Schedule a batch of notes on an instrument. The whole batch is one
    /// handle; there is no per-note cancellation.
    fn schedule_notes(&self, instrument: NodeId, notes: &[NoteEvent]) -> Result<ScheduleId>;

    /// Cancel a previously scheduled batch.
    fn cancel_schedule(&self, schedule: ScheduleId) -> Result<()>;

    /// Notes currently held for a schedule, for introspection.
    fn scheduled_notes(&self, schedule: ScheduleId) -> Result<Vec<NoteEvent>>;

    /// Sound a single note immediately, bypassing any schedule.
    fn trigger_note(&self, instrument: NodeId, pitch: u8, duration: f64, velocity: f32)
        -> Result<()>;

    // --- telemetry ---------------------------------------------------------

    /// Instantaneous peak level at a meter node, in dB.
    fn meter_level_db(&self, meter: NodeId) -> Result<f32>;

    /// Magnitude snapshot, [`FREQUENCY_BINS`] values in dB.
    fn frequency_data(&self, analyser: NodeId) -> Result<Vec<f32>>;

    /// Time-domain snapshot, [`ANALYSIS_WINDOW`] samples in [-1, 1].
    fn waveform_data(&self, analyser: NodeId) -> Result<Vec<f32>>;

    // --- capture and decode ------------------------------------------------

    /// Open an input capture session on an optional named device.
    fn open_capture(&self, device: Option<&str>) -> Result<Box<dyn CaptureSession>>;

    /// Decode a captured blob to PCM.
    fn decode(&self, blob: &AudioBlob) -> Result<SampleBuffer>;

    /// Resolve a content reference (path or URL) to a decoded buffer.
    fn load_content(&self, reference: &str) -> Result<Arc<SampleBuffer>>;
}
