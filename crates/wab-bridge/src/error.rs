use std::path::PathBuf;

use thiserror::Error;

/// Invalid node construction parameters.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse bridge config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sample rate {0} is not a positive finite number")]
    SampleRate(f32),
    #[error("{0} queue capacity must be non-zero")]
    ZeroCapacity(&'static str),
    #[error("{side} bus {bus} has {channels} channels")]
    ChannelCount {
        side: &'static str,
        bus: usize,
        channels: usize,
    },
}

/// Failure to hand a message to the other side of the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("transport queue is full")]
    Full,
    #[error("the other end of the transport is gone")]
    Disconnected,
}

/// Failure to retrieve module source text.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read module source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[cfg(feature = "http")]
    #[error("failed to download module source: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unsupported module source url: {0}")]
    UnsupportedScheme(String),
}

/// Outcome of a failed [`ControlProxy::load`](crate::ControlProxy::load).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("module rejected: {reason}")]
    Rejected { reason: String },
    #[error("a load of instance type {instance_type} is still pending")]
    AlreadyPending { instance_type: u32 },
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while constructing a node.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to spawn module loader thread: {0}")]
    Loader(#[source] std::io::Error),
}
