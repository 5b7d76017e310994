//! In-process transport for tests and offline demos

use std::io;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Connector, FrameSink, FrameSource};

enum Behavior {
    Accept(Mutex<Option<MemoryEnds>>),
    Refuse(String),
    Stall,
}

struct MemoryEnds {
    inbound_rx: mpsc::UnboundedReceiver<String>,
    outbound_tx: mpsc::UnboundedSender<String>,
}

/// Connector backed by unbounded mpsc channels
pub struct MemoryConnector {
    behavior: Behavior,
}

impl MemoryConnector {
    /// A connector that accepts exactly one connection, paired with its peer
    pub fn accepting() -> (Self, MemoryPeer) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let connector = Self {
            behavior: Behavior::Accept(Mutex::new(Some(MemoryEnds {
                inbound_rx,
                outbound_tx,
            }))),
        };
        let peer = MemoryPeer {
            inbound_tx,
            outbound_rx,
        };
        (connector, peer)
    }

    /// A connector whose connect attempts fail with `reason`
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self {
            behavior: Behavior::Refuse(reason.into()),
        }
    }

    /// A connector whose connect attempts never complete
    pub fn stalled() -> Self {
        Self {
            behavior: Behavior::Stall,
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _url: &str) -> io::Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)> {
        match &self.behavior {
            Behavior::Accept(ends) => {
                let ends = ends.lock().take().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::AlreadyExists, "memory peer already connected")
                })?;
                Ok((
                    Box::new(MemorySink {
                        tx: Some(ends.outbound_tx),
                    }),
                    Box::new(MemorySource {
                        rx: ends.inbound_rx,
                    }),
                ))
            }
            Behavior::Refuse(reason) => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                reason.clone(),
            )),
            Behavior::Stall => std::future::pending().await,
        }
    }
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: String) -> io::Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "sink closed"))?;
        tx.send(frame)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "memory peer dropped"))
    }

    async fn close(&mut self) -> io::Result<()> {
        self.tx = None;
        Ok(())
    }
}

struct MemorySource {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn receive(&mut self) -> io::Result<Option<String>> {
        Ok(self.rx.recv().await)
    }
}

/// The backend side of a [`MemoryConnector`]
pub struct MemoryPeer {
    inbound_tx: mpsc::UnboundedSender<String>,
    outbound_rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// Deliver a raw frame to the client
    pub fn push(&self, frame: impl Into<String>) {
        let _ = self.inbound_tx.send(frame.into());
    }

    /// Deliver a JSON value as a frame
    pub fn push_json(&self, value: serde_json::Value) {
        self.push(value.to_string());
    }

    /// Wait for the next frame the client sent
    pub async fn next_sent(&mut self) -> Option<String> {
        self.outbound_rx.recv().await
    }

    /// Drain frames the client has sent so far without waiting
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound_rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Close the connection from the backend side
    pub fn disconnect(self) {
        drop(self);
    }
}
