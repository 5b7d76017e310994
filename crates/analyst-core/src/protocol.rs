//! Wire protocol between the client and the analyst agent
//!
//! Every frame, in both directions, is a single JSON object. Inbound frames
//! carry any subset of the recognized fields; the event kind is decided by
//! which fields are present, never by their order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::{Message, MAX_STEP, MIN_STEP};

/// Inbound field names
pub mod fields {
    pub const ERROR: &str = "error";
    pub const ONELINE_MESSAGE: &str = "oneline_message";
    pub const SUMMARY: &str = "summary";
    pub const CONTENT: &str = "content";
    pub const CURRENT_STEP: &str = "current_step";
    pub const FINAL_REPORT: &str = "final_report";
    pub const REQUIRES_INPUT: &str = "requires_input";
    pub const COMPLETED: &str = "completed";
}

/// Result of decoding one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Malformed frame or nothing recognized; ignored
    NoOp,
    /// Backend-reported error; no other field of the frame is interpreted
    Error(String),
    /// One or more state updates carried by the same frame
    Update(FrameUpdate),
}

/// All sub-events carried by a single frame
///
/// The session applies them in field order: message, step, report,
/// input request, completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameUpdate {
    pub message: Option<Message>,
    pub step: Option<u8>,
    pub report: Option<String>,
    pub requires_input: bool,
    pub completed: bool,
}

impl FrameUpdate {
    pub fn is_empty(&self) -> bool {
        self.message.is_none()
            && self.step.is_none()
            && self.report.is_none()
            && !self.requires_input
            && !self.completed
    }
}

/// Decode a raw text frame
pub fn decode(frame: &str) -> InboundEvent {
    match serde_json::from_str::<Value>(frame) {
        Ok(Value::Object(object)) => decode_object(&object),
        _ => InboundEvent::NoOp,
    }
}

fn decode_object(object: &Map<String, Value>) -> InboundEvent {
    if let Some(message) = object.get(fields::ERROR).and_then(Value::as_str) {
        return InboundEvent::Error(message.to_string());
    }

    let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_string);
    let flag = |key: &str| object.get(key).and_then(Value::as_bool).unwrap_or(false);

    let message = match text(fields::ONELINE_MESSAGE) {
        Some(text) => Some(Message::oneline(text)),
        None => text(fields::SUMMARY).map(|summary| {
            Message::detailed(summary, text(fields::CONTENT).unwrap_or_default())
        }),
    };

    let step = object
        .get(fields::CURRENT_STEP)
        .and_then(Value::as_i64)
        .filter(|step| (i64::from(MIN_STEP)..=i64::from(MAX_STEP)).contains(step))
        .map(|step| step as u8);

    let update = FrameUpdate {
        message,
        step,
        report: text(fields::FINAL_REPORT),
        requires_input: flag(fields::REQUIRES_INPUT),
        completed: flag(fields::COMPLETED),
    };

    if update.is_empty() {
        InboundEvent::NoOp
    } else {
        InboundEvent::Update(update)
    }
}

/// Frames sent from the client to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// Initial submission; `form_data` is the hand-off blob as a string
    Form { form_data: Option<String> },
    /// Free-text human response
    Input { input: String },
}

impl OutboundFrame {
    pub fn form(form_data: Option<String>) -> Self {
        Self::Form { form_data }
    }

    pub fn input(text: impl Into<String>) -> Self {
        Self::Input { input: text.into() }
    }

    /// Serialize to the text frame sent over the channel
    pub fn encode(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
