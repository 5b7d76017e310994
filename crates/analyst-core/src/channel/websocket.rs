//! WebSocket transport over tokio-tungstenite

use std::io;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use super::{Connector, FrameSink, FrameSource};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to `ws://` / `wss://` endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> io::Result<(Box<dyn FrameSink>, Box<dyn FrameSource>)> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(to_io_error)?;
        debug!("WebSocket handshake completed with status {}", response.status());

        let (sink, source) = stream.split();
        Ok((Box::new(WsSink { sink }), Box::new(WsSource { source })))
    }
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, frame: String) -> io::Result<()> {
        self.sink.send(Message::Text(frame)).await.map_err(to_io_error)
    }

    async fn close(&mut self) -> io::Result<()> {
        match self.sink.close().await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed) => Ok(()),
            Err(e) => Err(to_io_error(e)),
        }
    }
}

struct WsSource {
    source: SplitStream<WsStream>,
}

#[async_trait]
impl FrameSource for WsSource {
    async fn receive(&mut self) -> io::Result<Option<String>> {
        while let Some(message) = self.source.next().await {
            match message {
                Ok(Message::Text(text)) => return Ok(Some(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Some(text)),
                    Err(_) => debug!("Skipping non UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    debug!("Received close frame: {:?}", frame);
                    return Ok(None);
                }
                Ok(_) => continue,
                Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                    return Ok(None);
                }
                Err(e) => return Err(to_io_error(e)),
            }
        }
        Ok(None)
    }
}

fn to_io_error(e: tungstenite::Error) -> io::Error {
    match e {
        tungstenite::Error::Io(inner) => inner,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}
