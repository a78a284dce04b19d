//! Ordered message channel between the control thread and the render thread.
//!
//! Requests travel over a bounded crossbeam channel that the render thread
//! polls with `try_recv`. Responses travel over a bounded tokio channel so the
//! control side can await them; the render thread only ever uses `try_send`.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::message::Envelope;

/// Creates a connected port pair.
pub fn transport(command_capacity: usize, response_capacity: usize) -> (ControlPort, RenderPort) {
    let (command_tx, command_rx) = crossbeam_channel::bounded(command_capacity.max(1));
    let (response_tx, response_rx) = mpsc::channel(response_capacity.max(1));
    (
        ControlPort {
            commands: command_tx,
            responses: response_rx,
        },
        RenderPort {
            commands: command_rx,
            responses: response_tx,
            dropped: 0,
        },
    )
}

/// Control-thread end of the transport.
#[derive(Debug)]
pub struct ControlPort {
    commands: Sender<Envelope>,
    responses: mpsc::Receiver<Envelope>,
}

impl ControlPort {
    pub fn post(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.commands.try_send(envelope).map_err(|err| match err {
            TrySendError::Full(_) => TransportError::Full,
            TrySendError::Disconnected(_) => TransportError::Disconnected,
        })
    }

    /// Waits for the next response. `None` once the render side is dropped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.responses.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.responses.try_recv().ok()
    }
}

/// Render-thread end of the transport. Never blocks.
#[derive(Debug)]
pub struct RenderPort {
    commands: Receiver<Envelope>,
    responses: mpsc::Sender<Envelope>,
    dropped: u64,
}

impl RenderPort {
    #[inline]
    pub fn try_recv(&self) -> Option<Envelope> {
        match self.commands.try_recv() {
            Ok(envelope) => Some(envelope),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Posts a response, dropping it if the queue is full or closed.
    #[inline]
    pub fn post(&mut self, envelope: Envelope) -> bool {
        match self.responses.try_send(envelope) {
            Ok(()) => true,
            Err(_) => {
                self.dropped = self.dropped.wrapping_add(1);
                false
            }
        }
    }

    /// Responses lost to a full or closed queue.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
