//! Channel - one persistent connection to the agent endpoint
//!
//! The channel owns a single connection at a time. Opening is non-blocking:
//! [`Channel::open`] spawns a task that connects, then shuttles outbound frames
//! to the transport and inbound frames back as [`ChannelEvent`]s.
//!
//! ```text
//!  ChannelHandle::send ──▶ outbound mpsc ──▶ ┌──────────────┐ ──▶ FrameSink
//!                                            │ channel task │
//!  events receiver ◀── ChannelEvent mpsc ◀── └──────────────┘ ◀── FrameSource
//! ```

pub mod memory;
pub mod websocket;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub use memory::{MemoryConnector, MemoryPeer};
pub use websocket::WebSocketConnector;

/// Lifecycle state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection has been requested
    #[default]
    Idle,
    /// Open requested, not yet confirmed
    Connecting,
    /// Connected, frames may be sent
    Open,
    /// Closed locally or by the peer
    Closed,
    /// Open failed or the transport broke
    Failed,
}

impl ConnectionState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Lifecycle and data events emitted by an open channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection is established
    Opened,
    /// One inbound text frame
    Frame(String),
    /// Connecting failed or the transport errored
    Error(String),
    /// The peer closed the connection
    Closed,
}

/// Write half of a transport
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, frame: String) -> io::Result<()>;
    async fn close(&mut self) -> io::Result<()>;
}

/// Read half of a transport
#[async_trait]
pub trait FrameSource: Send {
    /// Next text frame, `None` once the peer has closed
    async fn receive(&mut self) -> io::Result<Option<String>>;
}

/// Establishes a transport to an endpoint
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> io::Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)>;
}

struct HandleInner {
    state: RwLock<ConnectionState>,
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl HandleInner {
    /// Move to `next` unless the handle was already closed locally
    fn transition(&self, next: ConnectionState) -> bool {
        let mut state = self.state.write();
        if *state == ConnectionState::Closed {
            return false;
        }
        *state = next;
        true
    }
}

/// Shared handle to an open channel
///
/// Cloning the handle does not open another connection; every clone refers
/// to the same task and state.
#[derive(Clone)]
pub struct ChannelHandle {
    inner: Arc<HandleInner>,
}

impl ChannelHandle {
    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Enqueue a text frame for delivery
    ///
    /// Fails with [`Error::ChannelNotReady`] unless the channel is open.
    pub fn send(&self, frame: impl Into<String>) -> Result<()> {
        let state = self.state();
        if !state.is_open() {
            return Err(Error::ChannelNotReady(state));
        }
        self.inner
            .outbound
            .send(frame.into())
            .map_err(|_| Error::ChannelNotReady(ConnectionState::Closed))
    }

    /// Request shutdown; no further events are delivered for this handle
    pub fn close(&self) {
        *self.inner.state.write() = ConnectionState::Closed;
        self.inner.cancel.cancel();
    }

    /// Number of live references to this channel
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }
}

/// Entry point for opening channels
pub struct Channel;

impl Channel {
    /// Open a connection to `url` using `connector`
    ///
    /// Returns immediately. The handle is `Connecting` until
    /// [`ChannelEvent::Opened`] arrives on the returned receiver.
    pub fn open(
        connector: Arc<dyn Connector>,
        url: impl Into<String>,
    ) -> (ChannelHandle, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(HandleInner {
            state: RwLock::new(ConnectionState::Connecting),
            outbound: outbound_tx,
            cancel: CancellationToken::new(),
        });

        let url = url.into();
        let task_inner = inner.clone();
        tokio::spawn(async move {
            run_channel(connector, url, task_inner, outbound_rx, events_tx).await;
        });

        (ChannelHandle { inner }, events_rx)
    }
}

async fn run_channel(
    connector: Arc<dyn Connector>,
    url: String,
    inner: Arc<HandleInner>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    events_tx: mpsc::UnboundedSender<ChannelEvent>,
) {
    info!("Opening channel to {}", url);

    let connected = tokio::select! {
        _ = inner.cancel.cancelled() => {
            debug!("Channel closed before the connection was established");
            return;
        }
        result = connector.connect(&url) => result,
    };

    let (mut sink, mut source) = match connected {
        Ok(halves) => halves,
        Err(e) => {
            warn!("Failed to connect to {}: {}", url, e);
            if inner.transition(ConnectionState::Failed) {
                let _ = events_tx.send(ChannelEvent::Error(e.to_string()));
            }
            return;
        }
    };

    if !inner.transition(ConnectionState::Open) {
        let _ = sink.close().await;
        return;
    }
    info!("Channel open: {}", url);
    let _ = events_tx.send(ChannelEvent::Opened);

    loop {
        tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => {
                debug!("Channel closed locally");
                let _ = sink.close().await;
                break;
            }
            Some(frame) = outbound_rx.recv() => {
                debug!("Sending frame ({} bytes)", frame.len());
                if let Err(e) = sink.send(frame).await {
                    warn!("Failed to send frame: {}", e);
                    if inner.transition(ConnectionState::Failed) {
                        let _ = events_tx.send(ChannelEvent::Error(e.to_string()));
                    }
                    break;
                }
            }
            received = source.receive() => match received {
                Ok(Some(frame)) => {
                    if inner.cancel.is_cancelled() {
                        break;
                    }
                    if events_tx.send(ChannelEvent::Frame(frame)).is_err() {
                        debug!("Event receiver dropped, stopping channel");
                        let _ = sink.close().await;
                        break;
                    }
                }
                Ok(None) => {
                    info!("Channel closed by peer");
                    if inner.transition(ConnectionState::Closed) {
                        let _ = events_tx.send(ChannelEvent::Closed);
                    }
                    break;
                }
                Err(e) => {
                    warn!("Channel receive error: {}", e);
                    if inner.transition(ConnectionState::Failed) {
                        let _ = events_tx.send(ChannelEvent::Error(e.to_string()));
                    }
                    break;
                }
            },
        }
    }
}
