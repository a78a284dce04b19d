//! Control-thread half of a node.

use crate::error::{LoadError, TransportError};
use crate::fetch::fetch_source;
use crate::host::{HostState, SharedState};
use crate::message::{Envelope, LoadStatus};
use crate::transport::ControlPort;

/// Callback receiving every response that does not resolve a pending load.
pub type ResponseHandler = Box<dyn FnMut(Envelope) + Send>;

/// A "create" posted to the host whose status has not arrived yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    pub instance_type: u32,
}

/// Application-facing handle of a node.
///
/// Requests are posted without blocking. Responses are consumed either by an
/// awaiting [`load`](Self::load) / [`next_reply`](Self::next_reply) or by
/// [`dispatch_pending`](Self::dispatch_pending); those that are not the status
/// of a pending load go to the response handler.
pub struct ControlProxy {
    port: ControlPort,
    pending: Option<LoadRequest>,
    handler: Option<ResponseHandler>,
    remote: SharedState,
}

impl ControlProxy {
    pub fn new(port: ControlPort, remote: SharedState) -> Self {
        Self {
            port,
            pending: None,
            handler: None,
            remote,
        }
    }

    pub fn with_handler(mut self, handler: impl FnMut(Envelope) + Send + 'static) -> Self {
        self.set_handler(handler);
        self
    }

    pub fn set_handler(&mut self, handler: impl FnMut(Envelope) + Send + 'static) {
        self.handler = Some(Box::new(handler));
    }

    /// Last state published by the rendering host.
    pub fn remote_state(&self) -> HostState {
        self.remote.load()
    }

    pub fn pending_load(&self) -> Option<LoadRequest> {
        self.pending
    }

    /// Fetches the module source at `url` and loads it as `instance_type`.
    pub async fn load(&mut self, url: &str, instance_type: u32) -> Result<(), LoadError> {
        if let Some(pending) = self.pending {
            return Err(LoadError::AlreadyPending {
                instance_type: pending.instance_type,
            });
        }
        let code = fetch_source(url).await?;
        self.load_code(code, instance_type).await
    }

    /// Sends already fetched module source to the host and waits for its
    /// status.
    ///
    /// Dropping the returned future keeps the load pending; its status is
    /// consumed later by [`dispatch_pending`](Self::dispatch_pending) or
    /// [`next_reply`](Self::next_reply).
    pub async fn load_code(
        &mut self,
        code: impl Into<String>,
        instance_type: u32,
    ) -> Result<(), LoadError> {
        if let Some(pending) = self.pending {
            return Err(LoadError::AlreadyPending {
                instance_type: pending.instance_type,
            });
        }
        self.port.post(Envelope::create(instance_type, code.into()))?;
        self.pending = Some(LoadRequest { instance_type });

        let reply = self
            .next_reply(|envelope| envelope.load_status().is_some())
            .await;
        self.pending = None;
        let reply = reply?;
        match reply.load_status() {
            Some(LoadStatus::Ready) => Ok(()),
            Some(LoadStatus::Error { reason }) => Err(LoadError::Rejected {
                reason: reason.clone(),
            }),
            None => Err(LoadError::Rejected {
                reason: "malformed status response".into(),
            }),
        }
    }

    /// Forwards a parameter change. Delivered in order with every other
    /// request.
    pub fn set_param(&self, key: u32, value: f64) -> Result<(), TransportError> {
        self.port.post(Envelope::set_param(key, value))
    }

    /// Sends a binary property to the module's `slot`.
    pub fn send_binary(&self, slot: u32, data: impl Into<Vec<u8>>) -> Result<(), TransportError> {
        self.port.post(Envelope::set_binary(slot, data.into()))
    }

    pub fn post(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.port.post(envelope)
    }

    /// Waits for the first response matching `predicate`. Responses received
    /// before it are dispatched as by [`dispatch_pending`](Self::dispatch_pending).
    pub async fn next_reply(
        &mut self,
        mut predicate: impl FnMut(&Envelope) -> bool,
    ) -> Result<Envelope, TransportError> {
        loop {
            let envelope = self.port.recv().await.ok_or(TransportError::Disconnected)?;
            if predicate(&envelope) {
                return Ok(envelope);
            }
            self.dispatch(envelope);
        }
    }

    /// Dispatches every response already queued, returning how many there
    /// were.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Some(envelope) = self.port.try_recv() {
            self.dispatch(envelope);
            count += 1;
        }
        count
    }

    fn dispatch(&mut self, envelope: Envelope) {
        if self.pending.is_some() && envelope.load_status().is_some() {
            let pending = self.pending.take();
            tracing::debug!(?pending, status = ?envelope.load_status(), "late load status");
            return;
        }
        match self.handler.as_mut() {
            Some(handler) => handler(envelope),
            None => tracing::trace!(verb = ?envelope.verb, prop = ?envelope.prop, "unhandled response"),
        }
    }
}

impl std::fmt::Debug for ControlProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlProxy")
            .field("pending", &self.pending)
            .field("remote", &self.remote.load())
            .field("handler", &self.handler.is_some())
            .finish_non_exhaustive()
    }
}
