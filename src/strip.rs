//! Channel strip: the fixed-order processing chain shared by every track.
//!
//! Chain order is always volume -> pan -> effects... -> mute -> output.
//! Any effect-list mutation rebuilds the whole chain: everything internal is
//! disconnected and relinked in order. Partial relinking is error-prone when
//! effects land at arbitrary positions, so the strip never attempts it.

use crate::error::{Error, Result};
use divisi_core::{NodeId, Substrate};
use std::sync::Arc;

pub(crate) struct ChannelStrip {
    substrate: Arc<dyn Substrate>,
    volume: NodeId,
    pan: NodeId,
    effects: Vec<NodeId>,
    mute: NodeId,
    output: NodeId,
}

impl ChannelStrip {
    /// Build a strip and wire its output into `downstream` (the master bus
    /// input).
    pub fn new(substrate: Arc<dyn Substrate>, downstream: NodeId) -> Result<Self> {
        let volume = substrate.create_gain(1.0);
        let pan = substrate.create_pan(0.0);
        let mute = substrate.create_gain(1.0);
        let output = substrate.create_gain(1.0);

        let strip = Self {
            substrate,
            volume,
            pan,
            effects: Vec::new(),
            mute,
            output,
        };
        strip.relink()?;
        strip.substrate.connect(output, downstream)?;
        Ok(strip)
    }

    /// Entry point of the chain; players, instruments and monitoring inputs
    /// connect here.
    pub fn input(&self) -> NodeId {
        self.volume
    }

    /// Terminal node of the chain; sends tap off this.
    pub fn output(&self) -> NodeId {
        self.output
    }

    pub fn effects(&self) -> &[NodeId] {
        &self.effects
    }

    pub fn set_volume_linear(&self, gain: f32) -> Result<()> {
        Ok(self.substrate.set_param(self.volume, gain)?)
    }

    pub fn set_pan(&self, pan: f32) -> Result<()> {
        Ok(self.substrate.set_param(self.pan, pan)?)
    }

    pub fn set_mute_enabled(&self, muted: bool) -> Result<()> {
        Ok(self
            .substrate
            .set_param(self.mute, if muted { 0.0 } else { 1.0 })?)
    }

    /// The output-stage gain enforced by the engine's solo recomputation.
    pub fn effective_gain(&self) -> Result<f32> {
        Ok(self.substrate.param(self.output)?)
    }

    pub fn set_effective_gain(&self, gain: f32) -> Result<()> {
        Ok(self.substrate.set_param(self.output, gain)?)
    }

    /// Insert an effect and rebuild the chain. `index` of `None` appends.
    pub fn add_effect(&mut self, node: NodeId, index: Option<usize>) -> Result<()> {
        let at = index.unwrap_or(self.effects.len());
        if at > self.effects.len() {
            return Err(Error::EffectIndexOutOfRange {
                index: at,
                len: self.effects.len(),
            });
        }
        self.effects.insert(at, node);
        self.relink()
    }

    /// Remove and release the effect at `index`, then rebuild the chain.
    pub fn remove_effect(&mut self, index: usize) -> Result<()> {
        if index >= self.effects.len() {
            return Err(Error::EffectIndexOutOfRange {
                index,
                len: self.effects.len(),
            });
        }
        let node = self.effects.remove(index);
        self.relink()?;
        self.substrate.dispose(node)?;
        Ok(())
    }

    /// Disconnect every internal node and relink the whole chain in order.
    ///
    /// The output node's own outgoing edges (master bus, send gains) are
    /// never touched here, so a rebuild cannot drop routing.
    fn relink(&self) -> Result<()> {
        self.substrate.disconnect(self.volume)?;
        self.substrate.disconnect(self.pan)?;
        for &effect in &self.effects {
            self.substrate.disconnect(effect)?;
        }
        self.substrate.disconnect(self.mute)?;

        let mut chain = Vec::with_capacity(self.effects.len() + 4);
        chain.push(self.volume);
        chain.push(self.pan);
        chain.extend_from_slice(&self.effects);
        chain.push(self.mute);
        chain.push(self.output);
        for pair in chain.windows(2) {
            self.substrate.connect(pair[0], pair[1])?;
        }
        Ok(())
    }

    /// Release every node the strip owns, effects included.
    pub fn dispose(&self) -> Result<()> {
        for &effect in &self.effects {
            self.substrate.dispose(effect)?;
        }
        self.substrate.dispose(self.volume)?;
        self.substrate.dispose(self.pan)?;
        self.substrate.dispose(self.mute)?;
        self.substrate.dispose(self.output)?;
        Ok(())
    }
}
