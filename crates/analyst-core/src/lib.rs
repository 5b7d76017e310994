//! Analyst Core - client session controller for the data analyst agent
//!
//! This crate provides everything between the request form and the
//! rendered progress view:
//! - A single persistent channel to the agent endpoint
//! - Decoding of streamed agent frames into typed events
//! - The session state machine (steps, message log, input gate, report)
//! - Outbound dispatch of the form payload and human responses
//! - Configuration, the form hand-off store and the report artifact

pub mod channel;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod protocol;
pub mod report;
pub mod session;

pub use channel::{
    Channel, ChannelEvent, ChannelHandle, ConnectionState, Connector, MemoryConnector, MemoryPeer,
    WebSocketConnector,
};
pub use config::{defaults, endpoint_url, Config, ConfigManager};
pub use controller::{SessionController, SessionUpdate};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use form::{AnalysisRequest, HandoffStore};
pub use protocol::{decode, FrameUpdate, InboundEvent, OutboundFrame};
pub use report::ReportArtifact;
pub use session::{
    step_descriptor, Message, Notice, Phase, Session, SessionChange, SessionId, StepDescriptor,
    STEPS,
};
