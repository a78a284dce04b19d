use std::sync::Arc;

use wab_bridge::{
    BridgeConfig, BridgeError, BusTopology, ControlProxy, Envelope, LoadError, ModuleRegistry,
    Payload, Prop, RenderingHost, TransportError,
};

use super::{
    PARAM_CUTOFF, PARAM_GATE, PARAM_PITCH, PARAM_RESONANCE, PARAM_SHAPE, PARAM_SHIFT_SHAPE,
    USER_PARAMS, WAVE_SLOT_BASE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogueKind {
    Oscillator,
    Effect,
}

impl LogueKind {
    /// Oscillators read a mono shape LFO, effects a stereo input.
    pub fn topology(self) -> BusTopology {
        match self {
            LogueKind::Oscillator => BusTopology::new([1], [1]),
            LogueKind::Effect => BusTopology::new([2], [1]),
        }
    }

    pub fn instance_type(self) -> u32 {
        match self {
            LogueKind::Oscillator => 0,
            LogueKind::Effect => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogueKind::Oscillator => "oscillator",
            LogueKind::Effect => "effect",
        }
    }
}

/// Control-side handle for a logue unit with named parameter setters.
#[derive(Debug)]
pub struct LogueNode {
    kind: LogueKind,
    proxy: ControlProxy,
}

impl LogueNode {
    /// Builds the node and the [`RenderingHost`] to drive from the render
    /// thread. The topology and descriptor in `config` are replaced by the
    /// ones of `kind`.
    pub fn new(
        kind: LogueKind,
        config: &BridgeConfig,
        registry: Arc<ModuleRegistry>,
    ) -> Result<(Self, RenderingHost), BridgeError> {
        let config = config
            .clone()
            .with_topology(kind.topology())
            .with_descriptor(kind.as_str());
        let (proxy, host) = wab_bridge::node(&config, registry)?;
        Ok((Self { kind, proxy }, host))
    }

    pub fn kind(&self) -> LogueKind {
        self.kind
    }

    pub fn proxy(&self) -> &ControlProxy {
        &self.proxy
    }

    pub fn proxy_mut(&mut self) -> &mut ControlProxy {
        &mut self.proxy
    }

    pub async fn load(&mut self, url: &str) -> Result<(), LoadError> {
        let instance_type = self.kind.instance_type();
        tracing::debug!(url, kind = self.kind.as_str(), "loading logue unit");
        self.proxy.load(url, instance_type).await
    }

    pub async fn load_code(&mut self, code: impl Into<String>) -> Result<(), LoadError> {
        let instance_type = self.kind.instance_type();
        self.proxy.load_code(code, instance_type).await
    }

    /// Sets user parameter `index`, `0..=5`. Out of range indices are
    /// dropped.
    pub fn param(&self, index: u32, value: f64) -> Result<(), TransportError> {
        if index >= USER_PARAMS {
            tracing::warn!(index, "user parameter index out of range");
            return Ok(());
        }
        self.proxy.set_param(index, value)
    }

    pub fn set_shape(&self, value: f64) -> Result<(), TransportError> {
        self.proxy.set_param(PARAM_SHAPE, value)
    }

    pub fn set_shift_shape(&self, value: f64) -> Result<(), TransportError> {
        self.proxy.set_param(PARAM_SHIFT_SHAPE, value)
    }

    pub fn set_gate(&self, on: bool) -> Result<(), TransportError> {
        self.proxy.set_param(PARAM_GATE, if on { 1.0 } else { 0.0 })
    }

    /// MIDI note number.
    pub fn set_pitch(&self, note: f64) -> Result<(), TransportError> {
        self.proxy.set_param(PARAM_PITCH, note)
    }

    pub fn set_cutoff(&self, value: f64) -> Result<(), TransportError> {
        self.proxy.set_param(PARAM_CUTOFF, value)
    }

    pub fn set_resonance(&self, value: f64) -> Result<(), TransportError> {
        self.proxy.set_param(PARAM_RESONANCE, value)
    }

    /// Asks the loaded unit for its manifest. `None` when the unit has none.
    pub async fn manifest(&mut self) -> Result<Option<String>, TransportError> {
        self.proxy.post(Envelope::get(Prop::Manifest))?;
        let reply = self
            .proxy
            .next_reply(|envelope| envelope.is_response() && envelope.prop == Prop::Manifest)
            .await?;
        Ok(match reply.payload {
            Payload::Text(manifest) => Some(manifest),
            _ => None,
        })
    }

    /// Uploads a user waveform into wave slot `slot`.
    pub fn load_wave(&self, slot: u16, samples: &[f32]) -> Result<(), TransportError> {
        let bytes: Vec<u8> = samples
            .iter()
            .flat_map(|sample| sample.to_le_bytes())
            .collect();
        self.proxy.send_binary(WAVE_SLOT_BASE + u32::from(slot), bytes)
    }
}
