use orbit_server::db::Database;
use orbit_server::models::User;
use orbit_server::uploads::UploadStore;
use orbit_server::{handle_message, ServerState, WsMessage};
use serde_json::{json, Value};
use tokio::sync::mpsc;

fn state() -> ServerState {
    ServerState::new(
        Database::open_in_memory().unwrap(),
        UploadStore::new(std::env::temp_dir().join("orbit-security-tests"), "/uploads", 1024),
    )
}

fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        name: id.to_string(),
        username: None,
        profile_image: None,
    }
}

fn call(state: &ServerState, as_user: &str, op: Value) -> Value {
    let frame = json!({ "type": "request", "request_id": "r", "op": op });
    let raw = handle_message(&frame.to_string(), &user(as_user), state).unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_sender_spoofing_protection() {
    let state = state();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.add_client("victim".to_string(), tx);

    // "attacker" is the authenticated connection, claiming to be "admin"
    let reply = call(
        &state,
        "attacker",
        json!({ "name": "sendMessage", "senderId": "admin", "receiverId": "victim", "message": "Click this link" }),
    );

    assert_eq!(reply["error"]["code"], "unauthorized");
    assert!(rx.try_recv().is_err(), "Victim must not receive a spoofed message");

    let conn = state.db.lock().unwrap();
    let stored: i64 = conn
        .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
        .unwrap();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_notification_reads_are_scoped_to_caller() {
    let state = state();
    call(
        &state,
        "alice",
        json!({ "name": "createNotification", "recipientId": "bob", "type": "follow" }),
    );

    for name in [
        "getUserNotifications",
        "getUnreadNotificationsCount",
        "markNotificationsAsRead",
    ] {
        let reply = call(&state, "mallory", json!({ "name": name, "userId": "bob" }));
        assert_eq!(reply["error"]["code"], "unauthorized", "{} leaked", name);
    }

    let own = call(&state, "bob", json!({ "name": "getUnreadNotificationsCount", "userId": "bob" }));
    assert_eq!(own["data"], 1);
}

#[tokio::test]
async fn test_notification_sender_is_the_caller() {
    let state = state();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.add_client("bob".to_string(), tx);

    call(
        &state,
        "mallory",
        json!({ "name": "createNotification", "recipientId": "bob", "type": "comment", "commentText": "hi" }),
    );

    let push: WsMessage = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    match push {
        WsMessage::Notification { notification } => assert_eq!(notification.sender.id, "mallory"),
        other => panic!("Expected notification, got {:?}", other),
    }
}

#[tokio::test]
async fn test_outsiders_cannot_touch_a_conversation() {
    let state = state();
    let sent = call(
        &state,
        "alice",
        json!({ "name": "sendMessage", "senderId": "alice", "receiverId": "bob", "message": "secret" }),
    );
    let message_id = sent["data"]["id"].clone();

    let read = call(
        &state,
        "eve",
        json!({ "name": "getMessages", "senderId": "alice", "receiverId": "bob" }),
    );
    assert_eq!(read["error"]["code"], "unauthorized");

    let seen = call(&state, "eve", json!({ "name": "markMessageAsSeen", "messageId": message_id }));
    assert_eq!(seen["error"]["code"], "unauthorized");

    let deleted = call(&state, "eve", json!({ "name": "deleteMessage", "messageId": message_id }));
    assert_eq!(deleted["error"]["code"], "unauthorized");

    let bob_reads = call(
        &state,
        "bob",
        json!({ "name": "getMessages", "senderId": "alice", "receiverId": "bob" }),
    );
    assert_eq!(bob_reads["data"][0]["seen"], false);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = ServerState::new(
        Database::open_in_memory().unwrap(),
        UploadStore::new(dir.path(), "/uploads", 8),
    );

    let reply = call(
        &state,
        "alice",
        json!({
            "name": "sendMessageWithFile",
            "senderId": "alice",
            "receiverId": "bob",
            "file": { "filename": "big.bin", "mimetype": "application/octet-stream", "data": "QUFBQUFBQUFBQUFBQUFBQQ==" }
        }),
    );
    assert_eq!(reply["error"]["code"], "upload");
    assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
}
