//! Render-thread half of a node.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::audio::AudioBuffer;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::loader::{LoadJob, LoadedModule, LoaderSettings, ModuleLoader, ModuleRegistry};
use crate::message::{Envelope, LoadStatus, Payload, Prop, Verb};
use crate::transport::RenderPort;

/// Module lifecycle as seen by the rendering host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HostState {
    Uninitialized = 0,
    Loading = 1,
    Ready = 2,
    Error = 3,
}

impl HostState {
    fn decode(value: u8) -> Self {
        match value {
            1 => HostState::Loading,
            2 => HostState::Ready,
            3 => HostState::Error,
            _ => HostState::Uninitialized,
        }
    }
}

/// Lock-free view of a host's [`HostState`] for the control thread.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> HostState {
        HostState::decode(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: HostState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Owns the foreign module on the render thread and drives it once per
/// quantum.
///
/// Control messages are drained at the start of every [`render`](Self::render)
/// call (or explicitly through [`poll`](Self::poll)). Instantiation runs on a
/// loader thread; until it reports back, every quantum renders silence.
pub struct RenderingHost {
    port: RenderPort,
    loader: ModuleLoader,
    state: HostState,
    shared: SharedState,
    pending_instance: Option<u32>,
    active: Option<Box<LoadedModule>>,
}

impl RenderingHost {
    pub fn new(
        config: &BridgeConfig,
        port: RenderPort,
        registry: Arc<ModuleRegistry>,
        shared: SharedState,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let settings = LoaderSettings {
            topology: config.topology.clone(),
            sample_rate: config.sample_rate,
            descriptor: config.descriptor.clone(),
        };
        let loader = ModuleLoader::spawn(registry, settings).map_err(BridgeError::Loader)?;
        shared.store(HostState::Uninitialized);
        Ok(Self {
            port,
            loader,
            state: HostState::Uninitialized,
            shared,
            pending_instance: None,
            active: None,
        })
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn shared_state(&self) -> SharedState {
        self.shared.clone()
    }

    /// The live module, once [`HostState::Ready`].
    pub fn module(&self) -> Option<&LoadedModule> {
        self.active.as_deref()
    }

    /// Responses lost because the control side stopped draining them.
    pub fn dropped_responses(&self) -> u64 {
        self.port.dropped()
    }

    /// Drains pending control messages and picks up a finished load.
    pub fn poll(&mut self) {
        while let Some(envelope) = self.port.try_recv() {
            self.handle_message(envelope);
        }
        self.poll_loader();
    }

    /// Renders one quantum. Always returns `true`: the host never asks to be
    /// removed from the audio graph, a failed module just renders silence.
    pub fn render(&mut self, inputs: &[AudioBuffer], outputs: &mut [AudioBuffer]) -> bool {
        self.poll();
        match self.active.as_deref_mut() {
            Some(LoadedModule { module, bridge }) => {
                bridge.push(module.memory_mut(), inputs);
                module.process(bridge.input_handles(), bridge.output_handles());
                bridge.pull(module.memory(), outputs);
            }
            None => outputs.iter_mut().for_each(AudioBuffer::clear),
        }
        true
    }

    pub fn handle_message(&mut self, envelope: Envelope) {
        if !envelope.is_request() {
            tracing::debug!(verb = ?envelope.verb, "ignoring response sent to rendering host");
            return;
        }
        match (envelope.verb, envelope.prop, envelope.payload) {
            (Verb::Create, Prop::Instance(instance_type), Payload::Code(code)) => {
                self.begin_load(instance_type, code);
            }
            (Verb::Set, _, Payload::Param { key, value }) => match self.active.as_deref_mut() {
                Some(active) => active.module.set_param(key, value),
                None => tracing::trace!(key, "parameter dropped, no module loaded"),
            },
            (Verb::Set, Prop::Slot(slot), Payload::Binary(data)) => self.push_binary(slot, &data),
            (Verb::Get, Prop::Manifest, _) => {
                let payload = self
                    .active
                    .as_deref()
                    .and_then(|active| active.module.manifest())
                    .map_or(Payload::Empty, |manifest| Payload::Text(manifest.to_owned()));
                self.port
                    .post(Envelope::response(Verb::Get, Prop::Manifest, payload));
            }
            (verb, prop, _) => {
                tracing::debug!(?verb, ?prop, "unsupported control message");
            }
        }
    }

    fn begin_load(&mut self, instance_type: u32, code: String) {
        let rejection = match self.state {
            HostState::Loading => Some("a module load is already in progress"),
            HostState::Ready => Some("a module is already loaded"),
            HostState::Uninitialized | HostState::Error => None,
        };
        if let Some(reason) = rejection {
            tracing::warn!(instance_type, reason, "rejecting create request");
            self.port
                .post(Envelope::status(instance_type, LoadStatus::error(reason)));
            return;
        }

        if self.loader.submit(LoadJob {
            instance_type,
            code,
        }) {
            self.pending_instance = Some(instance_type);
            self.set_state(HostState::Loading);
        } else {
            self.set_state(HostState::Error);
            self.port.post(Envelope::status(
                instance_type,
                LoadStatus::error("module loader is unavailable"),
            ));
        }
    }

    fn poll_loader(&mut self) {
        if self.state != HostState::Loading {
            return;
        }
        let Some(outcome) = self.loader.try_take() else {
            return;
        };
        let instance_type = self.pending_instance.take().unwrap_or_default();
        match outcome {
            Ok(loaded) => {
                tracing::info!(
                    module = loaded.module.id(),
                    instance_type,
                    buffers = loaded.bridge.buffer_count(),
                    "module ready"
                );
                self.active = Some(loaded);
                self.set_state(HostState::Ready);
                self.port
                    .post(Envelope::status(instance_type, LoadStatus::Ready));
            }
            Err(reason) => {
                self.set_state(HostState::Error);
                self.port
                    .post(Envelope::status(instance_type, LoadStatus::Error { reason }));
            }
        }
    }

    fn push_binary(&mut self, slot: u32, data: &[u8]) {
        let Some(active) = self.active.as_deref_mut() else {
            tracing::debug!(slot, "binary message dropped, no module loaded");
            return;
        };
        if let Err(err) = active.module.push_binary(Verb::Set.as_str(), slot, data) {
            tracing::warn!(slot, %err, "failed to deliver binary message");
        }
    }

    fn set_state(&mut self, state: HostState) {
        self.state = state;
        self.shared.store(state);
    }
}

impl std::fmt::Debug for RenderingHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingHost")
            .field("state", &self.state)
            .field("module", &self.active)
            .finish_non_exhaustive()
    }
}
