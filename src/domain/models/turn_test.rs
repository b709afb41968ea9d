use super::RequestId;
use super::Role;
use super::Turn;
use super::TurnKind;
use super::TurnStatus;
use crate::domain::models::Blob;

#[test]
fn it_creates_user_text_turns() {
    let turn = Turn::user_text("hi");
    assert_eq!(turn.role, Role::User);
    assert_eq!(turn.kind(), TurnKind::Text);
    assert_eq!(turn.content(), "hi");
    assert_eq!(turn.media_ref(), None);
    assert_eq!(turn.status, TurnStatus::Complete);
}

#[test]
fn it_creates_user_image_turns() {
    let blob = Blob {
        mime_type: "image/png".to_string(),
        data: "aGVsbG8=".to_string(),
    };
    let turn = Turn::user_image("img123.png", Some(blob));
    assert_eq!(turn.role, Role::User);
    assert_eq!(turn.kind(), TurnKind::Image);
    assert_eq!(turn.media_ref(), Some("img123.png"));
    assert_eq!(turn.content(), "");
}

#[test]
fn it_tracks_streaming_ids() {
    let turn = Turn::assistant_streaming(RequestId(4), "");
    assert!(turn.is_streaming(RequestId(4)));
    assert!(!turn.is_streaming(RequestId(5)));
    assert_eq!(turn.streaming_id(), Some(RequestId(4)));

    let done = Turn::assistant_finished("4", TurnStatus::Complete);
    assert_eq!(done.streaming_id(), None);
    assert!(!done.is_streaming(RequestId(4)));
}

#[test]
fn it_displays_roles() {
    assert_eq!(Role::User.to_string(), "user");
    assert_eq!(Role::Assistant.to_string(), "assistant");
}
