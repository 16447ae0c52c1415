//! Master bus and send buses.
//!
//! The master bus is the single terminal path every track feeds:
//! input -> limiter -> meter -> output -> hardware sink, with an analyser
//! tapped off the meter. The limiter ceiling is fixed at construction.
//!
//! A send bus is a named parallel effect path. Tracks tap into it post-fader
//! through per-track gain nodes; the bus mixes a dry path against a wet path
//! through its effect and a crossfade, then feeds the sink directly.

use crate::error::Result;
use divisi_core::{db_to_linear, NodeId, Substrate};
use std::sync::Arc;

/// Default limiter ceiling in dB.
pub const DEFAULT_LIMITER_CEILING_DB: f32 = -1.0;

pub struct MasterBus {
    substrate: Arc<dyn Substrate>,
    input: NodeId,
    limiter: NodeId,
    meter: NodeId,
    output: NodeId,
    analyser: NodeId,
    volume_db: f32,
}

impl MasterBus {
    pub(crate) fn new(substrate: Arc<dyn Substrate>, ceiling_db: f32) -> Result<Self> {
        let input = substrate.create_gain(1.0);
        let limiter = substrate.create_limiter(ceiling_db);
        let meter = substrate.create_meter();
        let output = substrate.create_gain(1.0);
        let analyser = substrate.create_analyser();

        substrate.connect(input, limiter)?;
        substrate.connect(limiter, meter)?;
        substrate.connect(meter, output)?;
        substrate.connect(output, substrate.hardware_sink())?;
        // Side tap, not part of the audible path
        substrate.connect(meter, analyser)?;

        Ok(Self {
            substrate,
            input,
            limiter,
            meter,
            output,
            analyser,
            volume_db: 0.0,
        })
    }

    /// Where track chains connect.
    pub(crate) fn input(&self) -> NodeId {
        self.input
    }

    /// Master volume in dB, applied after limiting.
    pub fn set_volume(&mut self, db: f32) -> Result<()> {
        self.volume_db = db;
        Ok(self.substrate.set_param(self.output, db_to_linear(db))?)
    }

    pub fn volume(&self) -> f32 {
        self.volume_db
    }

    /// Instantaneous post-limiter peak level in dB.
    pub fn meter_level(&self) -> Result<f32> {
        Ok(self.substrate.meter_level_db(self.meter)?)
    }

    /// Frequency magnitude snapshot in dB.
    pub fn frequency_data(&self) -> Result<Vec<f32>> {
        Ok(self.substrate.frequency_data(self.analyser)?)
    }

    /// Time-domain waveform snapshot.
    pub fn waveform_data(&self) -> Result<Vec<f32>> {
        Ok(self.substrate.waveform_data(self.analyser)?)
    }

    /// Limiter ceiling in dB, fixed at construction.
    pub fn limiter_ceiling(&self) -> Result<f32> {
        Ok(self.substrate.param(self.limiter)?)
    }
}

pub struct SendBus {
    substrate: Arc<dyn Substrate>,
    name: String,
    effect_type: String,
    input: NodeId,
    effect: NodeId,
    crossfade: NodeId,
    output: NodeId,
    wet_dry: f32,
    volume_db: f32,
}

impl SendBus {
    pub(crate) fn new(
        substrate: Arc<dyn Substrate>,
        name: impl Into<String>,
        effect_type: impl Into<String>,
    ) -> Result<Self> {
        let effect_type = effect_type.into();
        let input = substrate.create_gain(1.0);
        let effect = substrate.create_effect(&effect_type)?;
        let crossfade = substrate.create_crossfade(0.5);
        let output = substrate.create_gain(1.0);

        // Dry path at unity, wet path through the effect and crossfade
        substrate.connect(input, output)?;
        substrate.connect(input, effect)?;
        substrate.connect(effect, crossfade)?;
        substrate.connect(crossfade, output)?;
        substrate.connect(output, substrate.hardware_sink())?;

        Ok(Self {
            substrate,
            name: name.into(),
            effect_type,
            input,
            effect,
            crossfade,
            output,
            wet_dry: 0.5,
            volume_db: 0.0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn effect_type(&self) -> &str {
        &self.effect_type
    }

    /// Where per-track send gains connect.
    pub(crate) fn input(&self) -> NodeId {
        self.input
    }

    /// Wet/dry mix, silently clamped to [0, 1].
    pub fn set_wet_dry(&mut self, mix: f32) -> Result<()> {
        self.wet_dry = mix.clamp(0.0, 1.0);
        Ok(self.substrate.set_param(self.crossfade, self.wet_dry)?)
    }

    pub fn wet_dry(&self) -> f32 {
        self.wet_dry
    }

    /// Return volume in dB.
    pub fn set_volume(&mut self, db: f32) -> Result<()> {
        self.volume_db = db;
        Ok(self.substrate.set_param(self.output, db_to_linear(db))?)
    }

    pub fn volume(&self) -> f32 {
        self.volume_db
    }

    /// Release every node the bus owns. Callers disconnect routed tracks
    /// first; disposal scrubs any edge still pointing here.
    pub(crate) fn dispose(&self) -> Result<()> {
        self.substrate.dispose(self.input)?;
        self.substrate.dispose(self.effect)?;
        self.substrate.dispose(self.crossfade)?;
        self.substrate.dispose(self.output)?;
        Ok(())
    }
}
