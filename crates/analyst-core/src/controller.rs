//! Session controller - wires the channel, decoder, state machine and dispatcher
//!
//! The controller is the only owner of the [`Session`]. Every mutation runs
//! inside one of its `&mut self` methods, one channel event at a time, and a
//! fresh snapshot is published on a watch channel after each one.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::{Channel, ChannelEvent, ChannelHandle, ConnectionState, Connector};
use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::protocol::{self, InboundEvent};
use crate::session::{Notice, Session, SessionChange};

/// What happened as the result of one channel event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The session changed; see the session snapshot for details
    Changed(Vec<SessionChange>),
    /// Something the user should be told about; the session is unchanged
    Notice(Notice),
    /// The connection ended; no further updates will arrive
    Closed,
}

pub struct SessionController {
    endpoint: Url,
    connect_timeout: Duration,
    session: Session,
    channel: Option<ChannelHandle>,
    dispatcher: Option<Dispatcher>,
    events: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    snapshots: watch::Sender<Session>,
}

impl SessionController {
    pub fn new(endpoint: Url, connect_timeout: Duration) -> Self {
        let session = Session::new();
        let (snapshots, _) = watch::channel(session.clone());
        Self {
            endpoint,
            connect_timeout,
            session,
            channel: None,
            dispatcher: None,
            events: None,
            snapshots,
        }
    }

    /// Build a controller from the server section of `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.server.endpoint_url()?,
            config.server.connect_timeout(),
        ))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Borrow the current session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Receive a snapshot after every session mutation
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.snapshots.subscribe()
    }

    /// Open the channel, wait for it to confirm, then send the form
    ///
    /// Only one connection is ever opened per controller. Waiting is a race
    /// between the open confirmation, a failure and the connect timeout.
    pub async fn start(
        &mut self,
        connector: Arc<dyn Connector>,
        form_data: Option<String>,
    ) -> Result<()> {
        if self.channel.is_some() {
            return Err(Error::AlreadyStarted);
        }

        info!("Session {} connecting to {}", self.session.id(), self.endpoint);
        let (handle, mut events) = Channel::open(connector, self.endpoint.as_str());
        self.channel = Some(handle.clone());
        self.session.set_connection(ConnectionState::Connecting);
        self.publish();

        if let Err(e) = self.wait_for_open(&mut events).await {
            warn!("Session {} failed to connect: {}", self.session.id(), e);
            return Err(self.abort_start(&handle, e));
        }

        self.session.connection_opened();
        self.publish();
        info!("Session {} connected", self.session.id());

        let mut dispatcher = Dispatcher::new(handle.clone());
        if let Err(e) = dispatcher.send_form(form_data) {
            warn!("Session {} could not send the form: {}", self.session.id(), e);
            let e = Error::ConnectionFailure(format!("form could not be sent: {}", e));
            return Err(self.abort_start(&handle, e));
        }
        self.dispatcher = Some(dispatcher);
        self.events = Some(events);
        Ok(())
    }

    /// Tear down a start attempt; the session is left `Failed`
    fn abort_start(&mut self, handle: &ChannelHandle, e: Error) -> Error {
        handle.close();
        self.session.set_connection(ConnectionState::Failed);
        self.publish();
        e
    }

    async fn wait_for_open(&self, events: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> Result<()> {
        let timeout = tokio::time::sleep(self.connect_timeout);
        tokio::pin!(timeout);

        loop {
            tokio::select! {
                _ = &mut timeout => {
                    return Err(Error::ConnectTimeout(self.connect_timeout.as_millis() as u64));
                }
                event = events.recv() => match event {
                    Some(ChannelEvent::Opened) => return Ok(()),
                    Some(ChannelEvent::Error(reason)) => return Err(Error::ConnectionFailure(reason)),
                    Some(ChannelEvent::Closed) | None => {
                        return Err(Error::ConnectionFailure(
                            "connection closed before it was established".to_string(),
                        ));
                    }
                    Some(ChannelEvent::Frame(_)) => {
                        debug!("Discarding frame received before open confirmation");
                    }
                },
            }
        }
    }

    /// Process the next channel event
    ///
    /// Frames that decode to nothing are skipped. Returns `None` when the
    /// controller was never started, has been closed, or the connection ended.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        loop {
            let event = self.events.as_mut()?.recv().await;

            let update = match event {
                Some(ChannelEvent::Frame(frame)) => match self.handle_frame(&frame) {
                    Some(update) => update,
                    None => continue,
                },
                Some(ChannelEvent::Error(reason)) => {
                    self.session.set_connection(ConnectionState::Failed);
                    self.events = None;
                    SessionUpdate::Notice(Notice::ConnectionLost { reason })
                }
                Some(ChannelEvent::Closed) | None => {
                    info!("Session {} connection closed", self.session.id());
                    self.session.set_connection(ConnectionState::Closed);
                    self.events = None;
                    SessionUpdate::Closed
                }
                Some(ChannelEvent::Opened) => continue,
            };

            self.publish();
            return Some(update);
        }
    }

    fn handle_frame(&mut self, frame: &str) -> Option<SessionUpdate> {
        match protocol::decode(frame) {
            InboundEvent::NoOp => {
                debug!("Ignoring unrecognized frame: {}", frame);
                None
            }
            InboundEvent::Error(message) => {
                warn!("Agent reported an error: {}", message);
                Some(SessionUpdate::Notice(Notice::Protocol { message }))
            }
            InboundEvent::Update(update) => {
                let changes = self.session.apply(update);
                Some(SessionUpdate::Changed(changes))
            }
        }
    }

    /// Send a human response through the dispatcher
    pub fn submit_input(&mut self, text: &str) -> Result<()> {
        let Some(dispatcher) = self.dispatcher.as_ref() else {
            if text.trim().is_empty() {
                return Err(Error::EmptyInput);
            }
            return Err(Error::DispatchRejected {
                text: text.to_string(),
            });
        };

        dispatcher.submit_input(&mut self.session, text)?;
        self.publish();
        Ok(())
    }

    /// Close the channel; nothing further is delivered afterwards
    pub fn close(&mut self) {
        if let Some(handle) = self.channel.as_ref() {
            handle.close();
        }
        self.events = None;
        if self.session.connection() != ConnectionState::Failed {
            self.session.set_connection(ConnectionState::Closed);
        }
        self.publish();
        info!("Session {} closed", self.session.id());
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.session.clone());
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(handle) = self.channel.take() {
            handle.close();
        }
    }
}
