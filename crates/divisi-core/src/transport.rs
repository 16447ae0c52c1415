//! Transport state and loop region.

/// Global playback/record state, held once per engine (never per track).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
    Recording,
}

/// Loop window in seconds. `end >= start` is enforced at the engine API.
/// Persisted as flat fields on the project model, not as a struct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    pub enabled: bool,
    pub start: f64,
    pub end: f64,
}

impl Default for LoopRegion {
    fn default() -> Self {
        Self {
            enabled: false,
            start: 0.0,
            end: 0.0,
        }
    }
}

impl LoopRegion {
    pub fn new(enabled: bool, start: f64, end: f64) -> Self {
        Self {
            enabled,
            start,
            end,
        }
    }
}
