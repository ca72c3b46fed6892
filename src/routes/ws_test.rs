use super::*;
use crate::config::ChatLimits;
use crate::state::test_helpers;
use frames::{EVENT_SEND_MESSAGE, OutgoingMessage};
use serde_json::json;
use tokio::time::{Duration, timeout};

fn connection() -> Connection {
    Connection::new(Uuid::new_v4(), "익명42".into())
}

fn client_bytes(event: &ClientEvent) -> Vec<u8> {
    frames::encode_frame(&event.to_frame())
}

fn send_bytes(user_id: Option<UserId>, nick: &str, text: &str) -> Vec<u8> {
    client_bytes(&ClientEvent::SendMessage(OutgoingMessage {
        user_id,
        nick_name: nick.into(),
        message: text.into(),
    }))
}

async fn recv_broadcast(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
    timeout(Duration::from_millis(500), rx.recv())
        .await
        .expect("broadcast receive timed out")
        .expect("broadcast channel closed unexpectedly")
}

async fn assert_no_broadcast(rx: &mut mpsc::Receiver<ServerEvent>) {
    assert!(
        timeout(Duration::from_millis(80), rx.recv()).await.is_err(),
        "expected no broadcast event"
    );
}

fn error_code(events: &[ServerEvent]) -> Option<&str> {
    match events {
        [ServerEvent::Error { code, .. }] => Some(code.as_str()),
        _ => None,
    }
}

/// Join `conn` to the room through the real dispatch path.
async fn join(state: &AppState, conn: &mut Connection, tx: &mpsc::Sender<ServerEvent>) {
    let replies = process_inbound_bytes(state, conn, tx, &client_bytes(&ClientEvent::JoinChat)).await;
    assert!(replies.is_empty());
}

// =============================================================================
// greeting
// =============================================================================

#[test]
fn greeting_announces_client_id_then_nickname() {
    let conn = connection();
    let [connected, nickname] = conn.greeting();
    assert_eq!(connected, ServerEvent::Connected { client_id: conn.client_id });
    assert_eq!(nickname, ServerEvent::SetNickname { nick_name: "익명42".into() });
}

// =============================================================================
// join / authenticate
// =============================================================================

#[tokio::test]
async fn join_chat_adds_client_to_room() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);

    join(&state, &mut conn, &tx).await;

    assert!(conn.joined);
    assert!(chat::is_joined(&state, conn.client_id).await);
}

#[tokio::test]
async fn authenticate_before_join_is_carried_into_room() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);

    let replies =
        process_inbound_bytes(&state, &mut conn, &tx, &client_bytes(&ClientEvent::Authenticate { user_id: 1 })).await;
    assert!(replies.is_empty());
    join(&state, &mut conn, &tx).await;

    let room = state.room.read().await;
    assert_eq!(room.clients[&conn.client_id].user_id, Some(1));
}

#[tokio::test]
async fn authenticate_after_join_updates_room_without_rejoin() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);
    join(&state, &mut conn, &tx).await;

    process_inbound_bytes(&state, &mut conn, &tx, &client_bytes(&ClientEvent::Authenticate { user_id: 5 })).await;

    assert_eq!(conn.user_id, Some(5));
    let room = state.room.read().await;
    assert_eq!(room.clients.len(), 1);
    assert_eq!(room.clients[&conn.client_id].user_id, Some(5));
}

// =============================================================================
// send_message
// =============================================================================

#[tokio::test]
async fn send_message_requires_join() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, mut rx) = mpsc::channel(8);

    let replies = process_inbound_bytes(&state, &mut conn, &tx, &send_bytes(None, "", "hello")).await;

    assert_eq!(error_code(&replies), Some("E_NOT_JOINED"));
    assert_no_broadcast(&mut rx).await;
}

#[tokio::test]
async fn send_message_echoes_to_sender_and_peers() {
    let state = test_helpers::test_app_state();
    let mut sender = connection();
    let mut peer = connection();
    let (sender_tx, mut sender_rx) = mpsc::channel(8);
    let (peer_tx, mut peer_rx) = mpsc::channel(8);
    process_inbound_bytes(&state, &mut sender, &sender_tx, &client_bytes(&ClientEvent::Authenticate { user_id: 1 }))
        .await;
    join(&state, &mut sender, &sender_tx).await;
    join(&state, &mut peer, &peer_tx).await;

    let replies = process_inbound_bytes(&state, &mut sender, &sender_tx, &send_bytes(Some(1), "A", "hi")).await;
    assert!(replies.is_empty());

    let echo = recv_broadcast(&mut sender_rx).await;
    let seen = recv_broadcast(&mut peer_rx).await;
    assert_eq!(echo, seen);
    let ServerEvent::ReceiveMessage(msg) = echo else {
        panic!("expected receive_message, got {echo:?}");
    };
    assert_eq!(msg.user_id, Some(1));
    assert_eq!(msg.nick_name, "A");
    assert_eq!(msg.message, "hi");
    assert!(msg.id.is_some());
}

#[tokio::test]
async fn guest_message_uses_guest_nickname_and_null_user() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, mut rx) = mpsc::channel(8);
    join(&state, &mut conn, &tx).await;

    process_inbound_bytes(&state, &mut conn, &tx, &send_bytes(Some(7), "", "반가워요")).await;

    let ServerEvent::ReceiveMessage(msg) = recv_broadcast(&mut rx).await else {
        panic!("expected receive_message");
    };
    assert_eq!(msg.user_id, None);
    assert_eq!(msg.nick_name, "익명42");
}

#[tokio::test]
async fn blank_message_is_rejected_without_broadcast() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let mut peer = connection();
    let (tx, mut rx) = mpsc::channel(8);
    let (peer_tx, mut peer_rx) = mpsc::channel(8);
    join(&state, &mut conn, &tx).await;
    join(&state, &mut peer, &peer_tx).await;

    let replies = process_inbound_bytes(&state, &mut conn, &tx, &send_bytes(None, "", "    ")).await;

    assert_eq!(error_code(&replies), Some("E_EMPTY_MESSAGE"));
    assert_no_broadcast(&mut rx).await;
    assert_no_broadcast(&mut peer_rx).await;
}

#[tokio::test]
async fn over_long_message_is_rejected() {
    let limits = ChatLimits { max_message_len: 4, ..ChatLimits::default() };
    let state = test_helpers::test_app_state_with_limits(limits);
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);
    join(&state, &mut conn, &tx).await;

    let replies = process_inbound_bytes(&state, &mut conn, &tx, &send_bytes(None, "", "12345")).await;

    assert_eq!(error_code(&replies), Some("E_MESSAGE_TOO_LONG"));
}

#[tokio::test]
async fn flooding_client_is_rate_limited() {
    let limits = ChatLimits { rate_limit: 1, ..ChatLimits::default() };
    let state = test_helpers::test_app_state_with_limits(limits);
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);
    join(&state, &mut conn, &tx).await;

    assert!(process_inbound_bytes(&state, &mut conn, &tx, &send_bytes(None, "", "one")).await.is_empty());
    let replies = process_inbound_bytes(&state, &mut conn, &tx, &send_bytes(None, "", "two")).await;

    assert_eq!(error_code(&replies), Some("E_RATE_LIMITED"));
}

// =============================================================================
// malformed input
// =============================================================================

#[tokio::test]
async fn garbage_bytes_are_rejected() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);

    let replies = process_inbound_bytes(&state, &mut conn, &tx, &[0xff, 0x00, 0x01]).await;

    assert_eq!(error_code(&replies), Some("E_BAD_FRAME"));
}

#[tokio::test]
async fn server_only_event_from_client_is_rejected() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);
    let bytes = frames::encode_frame(&ServerEvent::SetNickname { nick_name: "운영자".into() }.to_frame());

    let replies = process_inbound_bytes(&state, &mut conn, &tx, &bytes).await;

    assert_eq!(error_code(&replies), Some("E_BAD_FRAME"));
}

#[tokio::test]
async fn json_text_frames_are_dispatched() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, mut rx) = mpsc::channel(8);
    join(&state, &mut conn, &tx).await;

    let frame = Frame::new(EVENT_SEND_MESSAGE, json!({"userId": null, "nickName": "", "message": "text frame"}));
    let text = serde_json::to_string(&frame).expect("serialize");
    let replies = process_inbound_text(&state, &mut conn, &tx, &text).await;
    assert!(replies.is_empty());

    let ServerEvent::ReceiveMessage(msg) = recv_broadcast(&mut rx).await else {
        panic!("expected receive_message");
    };
    assert_eq!(msg.message, "text frame");
}

#[tokio::test]
async fn invalid_json_text_is_rejected() {
    let state = test_helpers::test_app_state();
    let mut conn = connection();
    let (tx, _rx) = mpsc::channel(8);

    let replies = process_inbound_text(&state, &mut conn, &tx, "{not json").await;

    assert_eq!(error_code(&replies), Some("E_BAD_FRAME"));
}
