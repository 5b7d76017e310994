//! The session state machine
//!
//! All mutation goes through a handful of methods, each applied for one
//! event at a time by the controller. Nothing here touches the channel.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::steps::{MAX_STEP, MIN_STEP};
use super::types::{Message, Phase, SessionChange, SessionId};
use crate::channel::ConnectionState;
use crate::protocol::FrameUpdate;

/// Client-side state of one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    id: SessionId,
    phase: Phase,
    connection: ConnectionState,
    current_step: u8,
    messages: Vec<Message>,
    report: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<SessionId>) -> Self {
        Self {
            id: id.into(),
            phase: Phase::AwaitingConnection,
            connection: ConnectionState::Idle,
            current_step: MIN_STEP,
            messages: Vec::new(),
            report: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn report(&self) -> Option<&str> {
        self.report.as_deref()
    }

    /// The agent asked for input and nothing has answered it yet
    pub fn waiting_for_input(&self) -> bool {
        self.phase == Phase::WaitingForInput
    }

    pub fn completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// The agent is working and the user has nothing to do
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Streaming && self.connection.is_open()
    }

    /// Record a connection state reported by the channel
    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.connection != state {
            debug!("Session {} connection {:?} -> {:?}", self.id, self.connection, state);
            self.connection = state;
        }
    }

    /// The channel confirmed it is open
    pub fn connection_opened(&mut self) {
        self.set_connection(ConnectionState::Open);
        if self.phase == Phase::AwaitingConnection {
            self.phase = Phase::Streaming;
        }
    }

    /// Apply every part of one decoded frame
    ///
    /// Order is fixed: message, step, report, input request, completion.
    pub fn apply(&mut self, update: FrameUpdate) -> Vec<SessionChange> {
        let mut changes = Vec::new();

        if let Some(message) = update.message {
            self.messages.push(message);
            changes.push(SessionChange::MessageAppended(self.messages.len() - 1));
        }

        if let Some(step) = update.step {
            if self.advance_step(step) {
                changes.push(SessionChange::StepChanged(step));
            }
        }

        if let Some(report) = update.report {
            let previous_step = self.current_step;
            if self.set_report(report) {
                changes.push(SessionChange::ReportSet);
                if previous_step != self.current_step {
                    changes.push(SessionChange::StepChanged(self.current_step));
                }
            }
        }

        if update.requires_input {
            if self.phase == Phase::Completed {
                debug!("Session {} ignoring input request after completion", self.id);
            } else if self.phase != Phase::WaitingForInput {
                self.phase = Phase::WaitingForInput;
                changes.push(SessionChange::InputRequested);
            }
        }

        if update.completed && self.phase != Phase::Completed {
            info!("Session {} completed", self.id);
            self.phase = Phase::Completed;
            changes.push(SessionChange::Completed);
        }

        changes
    }

    /// A human response was sent; reopen the stream optimistically
    pub fn input_submitted(&mut self) {
        if self.phase == Phase::WaitingForInput {
            self.phase = Phase::Streaming;
        }
    }

    fn advance_step(&mut self, step: u8) -> bool {
        if !(MIN_STEP..=MAX_STEP).contains(&step) {
            return false;
        }
        if step < self.current_step {
            debug!(
                "Session {} ignoring step regression {} -> {}",
                self.id, self.current_step, step
            );
            return false;
        }
        let changed = step != self.current_step;
        self.current_step = step;
        changed
    }

    /// First write wins; an identical repeat is a no-op
    fn set_report(&mut self, report: String) -> bool {
        match &self.report {
            None => {
                self.report = Some(report);
                self.current_step = MAX_STEP;
                true
            }
            Some(existing) if *existing == report => false,
            Some(_) => {
                warn!(
                    "Session {} received a second, different final report; keeping the first",
                    self.id
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_update(text: &str) -> FrameUpdate {
        FrameUpdate {
            message: Some(Message::oneline(text)),
            ..Default::default()
        }
    }

    fn open_session() -> Session {
        let mut session = Session::with_id("test");
        session.connection_opened();
        session
    }

    #[test]
    fn test_new_session_defaults() {
        let session = Session::with_id("s1");
        assert_eq!(session.id(), "s1");
        assert_eq!(session.phase(), Phase::AwaitingConnection);
        assert_eq!(session.connection(), ConnectionState::Idle);
        assert_eq!(session.current_step(), 1);
        assert!(session.messages().is_empty());
        assert!(session.report().is_none());
        assert!(!session.is_loading());
    }

    #[test]
    fn test_open_starts_streaming() {
        let session = open_session();
        assert_eq!(session.phase(), Phase::Streaming);
        assert!(session.is_loading());
    }

    #[test]
    fn test_messages_keep_arrival_order_without_dedup() {
        let mut session = open_session();
        session.apply(message_update("a"));
        session.apply(message_update("b"));
        session.apply(message_update("a"));

        let titles: Vec<&str> = session.messages().iter().map(Message::title).collect();
        assert_eq!(titles, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_step_never_decreases() {
        let mut session = open_session();
        let changes = session.apply(FrameUpdate {
            step: Some(3),
            ..Default::default()
        });
        assert_eq!(changes, vec![SessionChange::StepChanged(3)]);

        let changes = session.apply(FrameUpdate {
            step: Some(2),
            ..Default::default()
        });
        assert!(changes.is_empty());
        assert_eq!(session.current_step(), 3);

        // Repeating the current step is not a change
        assert!(session
            .apply(FrameUpdate {
                step: Some(3),
                ..Default::default()
            })
            .is_empty());
    }

    #[test]
    fn test_report_forces_final_step_and_first_write_wins() {
        let mut session = open_session();
        let changes = session.apply(FrameUpdate {
            report: Some("# First".to_string()),
            ..Default::default()
        });
        assert_eq!(
            changes,
            vec![SessionChange::ReportSet, SessionChange::StepChanged(5)]
        );
        assert_eq!(session.current_step(), 5);

        let changes = session.apply(FrameUpdate {
            report: Some("# First".to_string()),
            ..Default::default()
        });
        assert!(changes.is_empty());

        session.apply(FrameUpdate {
            report: Some("# Second".to_string()),
            ..Default::default()
        });
        assert_eq!(session.report(), Some("# First"));
    }

    #[test]
    fn test_input_gate_round_trip() {
        let mut session = open_session();
        let changes = session.apply(FrameUpdate {
            message: Some(Message::detailed("Please answer this question!", "How many rooms?")),
            requires_input: true,
            ..Default::default()
        });
        assert_eq!(
            changes,
            vec![SessionChange::MessageAppended(0), SessionChange::InputRequested]
        );
        assert!(session.waiting_for_input());
        assert!(!session.is_loading());

        session.input_submitted();
        assert!(!session.waiting_for_input());
        assert_eq!(session.phase(), Phase::Streaming);
    }

    #[test]
    fn test_completion_clears_gate_and_is_terminal() {
        let mut session = open_session();
        session.apply(FrameUpdate {
            requires_input: true,
            ..Default::default()
        });

        let changes = session.apply(FrameUpdate {
            completed: true,
            ..Default::default()
        });
        assert_eq!(changes, vec![SessionChange::Completed]);
        assert!(session.completed());
        assert!(!session.waiting_for_input());

        // Input requests after completion are not honored
        assert!(session
            .apply(FrameUpdate {
                requires_input: true,
                ..Default::default()
            })
            .is_empty());
        assert!(session.completed());

        // Messages may still arrive
        session.apply(message_update("late"));
        assert_eq!(session.messages().len(), 1);
        assert!(session.completed());
    }

    #[test]
    fn test_submit_outside_gate_is_noop() {
        let mut session = open_session();
        session.input_submitted();
        assert_eq!(session.phase(), Phase::Streaming);

        session.apply(FrameUpdate {
            completed: true,
            ..Default::default()
        });
        session.input_submitted();
        assert_eq!(session.phase(), Phase::Completed);
    }
}
