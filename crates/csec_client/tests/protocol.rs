//! Frame parsing and conversation accumulation rules: deltas merge
//! into the open assistant turn only, seals are final, and user turns
//! never absorb deltas.

use csec_client::messages::ServerFrame;
use csec_client::{Conversation, Role, Turn};

fn delta(content: &str) -> ServerFrame {
    ServerFrame::Delta {
        content: content.into(),
    }
}

// ── Frame parsing ───────────────────────────────────────────────────

#[test]
fn parses_each_known_frame_type() {
    assert_eq!(
        ServerFrame::parse(r#"{"type":"session","session_id":7}"#).unwrap(),
        Some(ServerFrame::Session { session_id: 7 })
    );
    assert_eq!(
        ServerFrame::parse(r#"{"type":"delta","content":"Hi"}"#).unwrap(),
        Some(ServerFrame::Delta {
            content: "Hi".into()
        })
    );
    assert_eq!(
        ServerFrame::parse(r#"{"type":"done"}"#).unwrap(),
        Some(ServerFrame::Done)
    );
    assert_eq!(
        ServerFrame::parse(r#"{"type":"error","error":"rate_limited"}"#).unwrap(),
        Some(ServerFrame::Error {
            error: "rate_limited".into()
        })
    );
}

#[test]
fn unknown_type_is_skipped_not_an_error() {
    // The backend announces itself with a status frame on connect.
    let parsed = ServerFrame::parse(r#"{"type":"status","message":"connected"}"#).unwrap();
    assert_eq!(parsed, None);
}

#[test]
fn missing_type_is_skipped_not_an_error() {
    let parsed = ServerFrame::parse(r#"{"content":"orphan"}"#).unwrap();
    assert_eq!(parsed, None);
}

#[test]
fn undecodable_text_is_an_error() {
    assert!(ServerFrame::parse("not json").is_err());
    assert!(ServerFrame::parse("").is_err());
}

#[test]
fn known_type_with_missing_fields_is_an_error() {
    assert!(ServerFrame::parse(r#"{"type":"delta"}"#).is_err());
    assert!(ServerFrame::parse(r#"{"type":"session"}"#).is_err());
}

#[test]
fn extra_fields_are_tolerated() {
    let parsed = ServerFrame::parse(r#"{"type":"error","error":"rate_limited","retry_after":30}"#)
        .unwrap();
    assert_eq!(
        parsed,
        Some(ServerFrame::Error {
            error: "rate_limited".into()
        })
    );
}

// ── Accumulation ────────────────────────────────────────────────────

#[test]
fn deltas_merge_into_one_growing_turn() {
    let mut conversation = Conversation::new();
    conversation.push_user("Hi");
    for frame in [
        ServerFrame::Session { session_id: 7 },
        delta("Hel"),
        delta("lo"),
        ServerFrame::Done,
    ] {
        conversation.apply(&frame);
    }

    let turns: Vec<&Turn> = conversation.turns().collect();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0], &Turn::user("Hi"));
    assert_eq!(turns[1], &Turn::assistant("Hello"));
    assert!(!conversation.is_accumulating());
}

#[test]
fn delta_after_seal_opens_a_new_turn() {
    let mut conversation = Conversation::new();
    conversation.apply(&delta("first"));
    conversation.apply(&ServerFrame::Done);
    conversation.apply(&delta("second"));

    let turns: Vec<&Turn> = conversation.turns().collect();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "first");
    assert_eq!(turns[1].content, "second");
    assert!(conversation.is_accumulating());
}

#[test]
fn delta_never_extends_a_user_turn() {
    let mut conversation = Conversation::new();
    conversation.push_user("question");
    conversation.apply(&delta("answer"));

    let turns: Vec<&Turn> = conversation.turns().collect();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0], &Turn::user("question"));
    assert_eq!(turns[1], &Turn::assistant("answer"));
}

#[test]
fn error_seals_the_partial_turn() {
    let mut conversation = Conversation::new();
    conversation.apply(&delta("par"));
    conversation.apply(&ServerFrame::Error {
        error: "stream_failed".into(),
    });

    assert!(!conversation.is_accumulating());
    assert_eq!(conversation.last().map(|t| t.content.as_str()), Some("par"));

    // A later delta must not extend the sealed turn.
    conversation.apply(&delta("tial"));
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation.last().map(|t| t.content.as_str()), Some("tial"));
}

#[test]
fn done_without_open_turn_is_harmless() {
    let mut conversation = Conversation::new();
    conversation.apply(&ServerFrame::Done);
    assert!(conversation.is_empty());

    conversation.apply(&delta("a"));
    conversation.apply(&ServerFrame::Done);
    conversation.apply(&ServerFrame::Done);
    assert_eq!(conversation.len(), 1);
}

#[test]
fn session_frames_do_not_touch_the_conversation() {
    let mut conversation = Conversation::new();
    conversation.apply(&ServerFrame::Session { session_id: 3 });
    assert!(conversation.is_empty());
}

#[test]
fn turn_count_matches_user_sends_plus_delta_runs() {
    let mut conversation = Conversation::new();
    conversation.push_user("one");
    // Run 1: two deltas, sealed by done.
    conversation.apply(&delta("a"));
    conversation.apply(&delta("b"));
    conversation.apply(&ServerFrame::Done);
    conversation.push_user("two");
    // Run 2: one delta, sealed by error.
    conversation.apply(&delta("c"));
    conversation.apply(&ServerFrame::Error { error: "x".into() });
    // Run 3: unsealed tail.
    conversation.apply(&delta("d"));

    assert_eq!(conversation.len(), 5);
    let roles: Vec<Role> = conversation.turns().map(|t| t.role).collect();
    assert_eq!(
        roles,
        [
            Role::User,
            Role::Assistant,
            Role::User,
            Role::Assistant,
            Role::Assistant,
        ]
    );
}

#[test]
fn push_user_seals_any_open_assistant_turn_first() {
    let mut conversation = Conversation::new();
    conversation.apply(&delta("interrupted"));
    conversation.push_user("next question");

    let turns: Vec<&Turn> = conversation.turns().collect();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0], &Turn::assistant("interrupted"));
    assert_eq!(turns[1], &Turn::user("next question"));
    assert!(!conversation.is_accumulating());
}
