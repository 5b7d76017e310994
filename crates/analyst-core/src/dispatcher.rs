//! Outbound dispatcher
//!
//! Serializes the two outbound payloads and pushes them through the channel
//! handle. Sends are refused unless the channel is open; the caller gets the
//! rejected text back so nothing the user typed is lost.

use tracing::{debug, info};

use crate::channel::ChannelHandle;
use crate::error::{Error, Result};
use crate::protocol::OutboundFrame;
use crate::session::Session;

pub struct Dispatcher {
    channel: ChannelHandle,
    form_sent: bool,
}

impl Dispatcher {
    pub fn new(channel: ChannelHandle) -> Self {
        Self {
            channel,
            form_sent: false,
        }
    }

    /// Send the initial form submission; allowed once per session
    pub fn send_form(&mut self, form_data: Option<String>) -> Result<()> {
        if self.form_sent {
            return Err(Error::FormAlreadySent);
        }
        if form_data.is_none() {
            info!("No form data available, sending form_data: null");
        }
        let frame = OutboundFrame::form(form_data).encode()?;
        self.channel.send(frame)?;
        self.form_sent = true;
        Ok(())
    }

    pub fn form_sent(&self) -> bool {
        self.form_sent
    }

    /// Send a free-text human response and clear the input gate
    pub fn submit_input(&self, session: &mut Session, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let frame = OutboundFrame::input(text).encode()?;
        match self.channel.send(frame) {
            Ok(()) => {
                debug!("Sent human response for session {}", session.id());
                session.input_submitted();
                Ok(())
            }
            Err(Error::ChannelNotReady(state)) => {
                debug!("Rejected human response, channel is {:?}", state);
                Err(Error::DispatchRejected {
                    text: text.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}
