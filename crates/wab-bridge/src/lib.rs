//! Node/processor bridge for foreign DSP modules.
//!
//! A node is split in two halves joined by a message [`transport`]:
//!
//! * [`ControlProxy`] lives on the control thread. It fetches module source,
//!   asks the host to load it and forwards parameter changes.
//! * [`RenderingHost`] lives on the real-time render thread. It instantiates
//!   the module off-thread, then copies one quantum of audio through the
//!   module's linear memory on every [`RenderingHost::render`] call.

pub mod audio;
pub mod bridge;
pub mod config;
pub mod error;
pub mod fetch;
pub mod host;
pub mod loader;
pub mod message;
pub mod module;
pub mod proxy;
pub mod transport;

use std::sync::Arc;

pub use audio::AudioBuffer;
pub use bridge::BufferBridge;
pub use config::{BridgeConfig, BusTopology, MAX_CHANNELS_PER_BUS, QUANTUM_FRAMES};
pub use error::{BridgeError, ConfigError, FetchError, LoadError, TransportError};
pub use fetch::fetch_source;
pub use host::{HostState, RenderingHost, SharedState};
pub use loader::{LoadedModule, ModuleRegistry};
pub use message::{Envelope, LoadStatus, MessageKind, Payload, Prop, Verb};
pub use module::{ForeignModule, ModuleSource};
pub use proxy::{ControlProxy, LoadRequest, ResponseHandler};
pub use transport::{transport, ControlPort, RenderPort};

/// Builds both halves of a node. The [`RenderingHost`] is meant to be moved
/// onto the render thread.
pub fn node(
    config: &BridgeConfig,
    registry: Arc<ModuleRegistry>,
) -> Result<(ControlProxy, RenderingHost), BridgeError> {
    config.validate()?;
    let (control, render) = transport(
        config.command_queue_capacity,
        config.response_queue_capacity,
    );
    let shared = SharedState::new();
    let host = RenderingHost::new(config, render, registry, shared.clone())?;
    Ok((ControlProxy::new(control, shared), host))
}
