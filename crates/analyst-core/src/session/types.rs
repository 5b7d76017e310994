//! Session types shared between the state machine and frontends

use serde::{Deserialize, Serialize};

/// Unique identifier for a session
pub type SessionId = String;

/// An entry of the session's message log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Terse status line, rendered without expand affordance
    Oneline { text: String },
    /// Titled block; `content` is collapsible and starts expanded
    Detailed { summary: String, content: String },
}

impl Message {
    /// Create a one-line status message
    pub fn oneline(text: impl Into<String>) -> Self {
        Self::Oneline { text: text.into() }
    }

    /// Create a detailed message
    pub fn detailed(summary: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Detailed {
            summary: summary.into(),
            content: content.into(),
        }
    }

    /// Headline text of the message
    pub fn title(&self) -> &str {
        match self {
            Self::Oneline { text } => text,
            Self::Detailed { summary, .. } => summary,
        }
    }

    pub fn is_collapsible(&self) -> bool {
        matches!(self, Self::Detailed { .. })
    }
}

/// Progress phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Channel not yet open
    #[default]
    AwaitingConnection,
    /// The agent is working
    Streaming,
    /// The agent asked for human input
    WaitingForInput,
    /// The pipeline finished; terminal
    Completed,
}

/// A change produced by applying one inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChange {
    /// A message was appended at this index of the log
    MessageAppended(usize),
    StepChanged(u8),
    ReportSet,
    InputRequested,
    Completed,
}

/// Transient, user-visible condition; never a state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// The connection could not be established
    ConnectionFailure { reason: String },
    /// An established connection broke
    ConnectionLost { reason: String },
    /// The backend reported an error
    Protocol { message: String },
    /// A response could not be sent; `text` is what the user typed
    DispatchRejected { text: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::ConnectionFailure { reason } => format!("Could not connect to the agent: {}", reason),
            Self::ConnectionLost { reason } => format!("Connection to the agent was lost: {}", reason),
            Self::Protocol { message } => format!("Agent error: {}", message),
            Self::DispatchRejected { .. } => {
                "Not connected to the agent, your input was kept".to_string()
            }
        }
    }
}
