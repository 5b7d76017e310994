//! Protocol decoding tests
//!
//! Tests for mapping raw inbound frames to typed events, including frames
//! that combine several fields and frames that must be ignored.

use analyst_core::protocol::{decode, FrameUpdate, InboundEvent, OutboundFrame};
use analyst_core::{Message, Session, SessionChange};

mod decode_tests {
    use super::*;

    #[test]
    fn test_agent_status_frames() {
        assert_eq!(
            decode(r#"{"oneline_message":"🔍 Reviewing the user request..."}"#),
            InboundEvent::Update(FrameUpdate {
                message: Some(Message::oneline("🔍 Reviewing the user request...")),
                ..Default::default()
            })
        );

        assert_eq!(
            decode(r#"{"current_step":2}"#),
            InboundEvent::Update(FrameUpdate {
                step: Some(2),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_question_frame() {
        let event = decode(
            r#"{"summary":"Please answer this question!","content":"Which budget range?","requires_input":true}"#,
        );
        assert_eq!(
            event,
            InboundEvent::Update(FrameUpdate {
                message: Some(Message::detailed(
                    "Please answer this question!",
                    "Which budget range?"
                )),
                requires_input: true,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_combined_completion_frame() {
        let event = decode(
            r##"{"summary":"Analysis Complete","content":"# Report","completed":true,"final_report":"# Report","current_step":5}"##,
        );
        let InboundEvent::Update(update) = event else {
            panic!("Expected Update");
        };
        assert_eq!(update.message, Some(Message::detailed("Analysis Complete", "# Report")));
        assert!(update.message.as_ref().is_some_and(Message::is_collapsible));
        assert_eq!(update.step, Some(5));
        assert_eq!(update.report.as_deref(), Some("# Report"));
        assert!(update.completed);
        assert!(!update.requires_input);
    }

    #[test]
    fn test_wrong_types_are_ignored_per_field() {
        let event = decode(r#"{"oneline_message":42,"summary":"kept","requires_input":"yes","completed":1}"#);
        assert_eq!(
            event,
            InboundEvent::Update(FrameUpdate {
                message: Some(Message::detailed("kept", "")),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_non_string_error_is_not_an_error() {
        assert_eq!(decode(r#"{"error":null}"#), InboundEvent::NoOp);
        assert_eq!(
            decode(r#"{"error":{"code":1},"oneline_message":"still here"}"#),
            InboundEvent::Update(FrameUpdate {
                message: Some(Message::oneline("still here")),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_content_alone_is_not_a_message() {
        assert_eq!(decode(r#"{"content":"orphan"}"#), InboundEvent::NoOp);
    }

    #[test]
    fn test_outbound_frames_match_wire_shape() {
        let input: serde_json::Value =
            serde_json::from_str(&OutboundFrame::input("q").encode().unwrap()).unwrap();
        assert_eq!(input, serde_json::json!({"input": "q"}));

        let parsed: OutboundFrame = serde_json::from_str(r#"{"form_data":null}"#).unwrap();
        assert_eq!(parsed, OutboundFrame::form(None));
    }
}

mod delta_tests {
    use super::*;

    /// Decoding the same frame twice gives the same session deltas
    #[test]
    fn test_repeated_report_frame_is_idempotent() {
        let report_frame = r##"{"final_report":"# Same"}"##;
        let mut session = Session::with_id("s");
        session.connection_opened();

        let InboundEvent::Update(first) = decode(report_frame) else {
            panic!("Expected Update");
        };
        let InboundEvent::Update(second) = decode(report_frame) else {
            panic!("Expected Update");
        };
        assert_eq!(first, second);

        let changes = session.apply(first);
        assert!(changes.contains(&SessionChange::ReportSet));
        let after_first = session.clone();

        assert!(session.apply(second).is_empty());
        assert_eq!(session, after_first);
    }

    #[test]
    fn test_message_count_matches_message_events() {
        let frames = [
            r#"{"oneline_message":"a"}"#,
            r#"{"current_step":2}"#,
            r#"not json"#,
            r#"{"summary":"b"}"#,
            r#"{"error":"oops","oneline_message":"dropped"}"#,
            r#"{"oneline_message":"c","requires_input":true}"#,
        ];

        let mut session = Session::with_id("s");
        session.connection_opened();
        let mut message_events = 0;
        for frame in frames {
            if let InboundEvent::Update(update) = decode(frame) {
                if update.message.is_some() {
                    message_events += 1;
                }
                session.apply(update);
            }
        }

        assert_eq!(message_events, 3);
        let titles: Vec<&str> = session.messages().iter().map(Message::title).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(session.current_step(), 2);
        assert!(session.waiting_for_input());
    }
}
