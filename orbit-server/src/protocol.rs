use serde::{Deserialize, Serialize};

use crate::error::ErrorBody;
use crate::models::input::{
    ConversationArgs, CreateNotificationArgs, JoinCallArgs, MessageIdArgs, SendFileArgs,
    SendMessageArgs, UserArgs,
};
use crate::models::{Message, Notification};

/// WebSocket frame types (shared between server and client)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WsMessage {
    #[serde(rename = "connect")]
    Connect {
        user_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        profile_image: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    #[serde(rename = "auth_response")]
    AuthResponse { success: bool, message: String },
    #[serde(rename = "request")]
    Request { request_id: String, op: Operation },
    #[serde(rename = "response")]
    Response {
        request_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ErrorBody>,
    },
    #[serde(rename = "new_message")]
    NewMessage { message: Message },
    #[serde(rename = "message_seen")]
    MessageSeen {
        message_ids: Vec<String>,
        seen_by: String,
    },
    #[serde(rename = "message_deleted")]
    MessageDeleted { message_id: String },
    #[serde(rename = "notification")]
    Notification { notification: Notification },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Operations a connected client may request, named as in the chat schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum Operation {
    #[serde(rename = "getMessages")]
    GetMessages(ConversationArgs),
    #[serde(rename = "getUnreadCount")]
    GetUnreadCount(ConversationArgs),
    #[serde(rename = "joinvideocall")]
    JoinVideoCall(JoinCallArgs),
    #[serde(rename = "sendMessage")]
    SendMessage(SendMessageArgs),
    #[serde(rename = "sendMessageWithFile")]
    SendMessageWithFile(SendFileArgs),
    #[serde(rename = "markMessageAsSeen")]
    MarkMessageAsSeen(MessageIdArgs),
    #[serde(rename = "markAllMessagesAsSeen")]
    MarkAllMessagesAsSeen(ConversationArgs),
    #[serde(rename = "deleteMessage")]
    DeleteMessage(MessageIdArgs),
    #[serde(rename = "getUserNotifications")]
    GetUserNotifications(UserArgs),
    #[serde(rename = "getUnreadNotificationsCount")]
    GetUnreadNotificationsCount(UserArgs),
    #[serde(rename = "markNotificationsAsRead")]
    MarkNotificationsAsRead(UserArgs),
    #[serde(rename = "createNotification")]
    CreateNotification(CreateNotificationArgs),
}

impl Operation {
    /// Wire name of the operation, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::GetMessages(_) => "getMessages",
            Operation::GetUnreadCount(_) => "getUnreadCount",
            Operation::JoinVideoCall(_) => "joinvideocall",
            Operation::SendMessage(_) => "sendMessage",
            Operation::SendMessageWithFile(_) => "sendMessageWithFile",
            Operation::MarkMessageAsSeen(_) => "markMessageAsSeen",
            Operation::MarkAllMessagesAsSeen(_) => "markAllMessagesAsSeen",
            Operation::DeleteMessage(_) => "deleteMessage",
            Operation::GetUserNotifications(_) => "getUserNotifications",
            Operation::GetUnreadNotificationsCount(_) => "getUnreadNotificationsCount",
            Operation::MarkNotificationsAsRead(_) => "markNotificationsAsRead",
            Operation::CreateNotification(_) => "createNotification",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_message_serialization() {
        let msg = WsMessage::Connect {
            user_id: "user123".to_string(),
            name: Some("Alice".to_string()),
            username: None,
            profile_image: None,
            token: None,
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connect\""));
        assert!(json.contains("\"user_id\":\"user123\""));
        assert!(!json.contains("token"));
    }

    #[test]
    fn test_request_parses_from_client_format() {
        let json = r#"{
            "type": "request",
            "request_id": "r1",
            "op": {"name": "sendMessage", "senderId": "u1", "receiverId": "u2", "message": "hey"}
        }"#;
        let msg: WsMessage = serde_json::from_str(json).unwrap();
        match msg {
            WsMessage::Request {
                request_id,
                op: Operation::SendMessage(args),
            } => {
                assert_eq!(request_id, "r1");
                assert_eq!(args.sender_id, "u1");
                assert_eq!(args.receiver_id, "u2");
                assert_eq!(args.message.as_deref(), Some("hey"));
                assert!(args.media.is_none());
            }
            other => panic!("Expected sendMessage request, got {:?}", other),
        }
    }

    #[test]
    fn test_join_call_request_uses_room_id_casing() {
        let json = r#"{"type":"request","request_id":"r2","op":{"name":"joinvideocall","roomID":"abc"}}"#;
        let msg: WsMessage = serde_json::from_str(json).unwrap();
        if let WsMessage::Request {
            op: Operation::JoinVideoCall(args),
            ..
        } = msg
        {
            assert_eq!(args.room_id, "abc");
        } else {
            panic!("Expected joinvideocall request");
        }
    }

    #[test]
    fn test_error_response_omits_data() {
        let msg = WsMessage::Response {
            request_id: "r3".to_string(),
            data: None,
            error: Some(ErrorBody {
                code: "validation".to_string(),
                message: "bad".to_string(),
            }),
        };

        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"response\""));
        assert!(json.contains("\"code\":\"validation\""));
        assert!(!json.contains("\"data\""));
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let json = r#"{"type":"request","request_id":"r4","op":{"name":"dropTables"}}"#;
        assert!(serde_json::from_str::<WsMessage>(json).is_err());
    }

    #[test]
    fn test_operation_names_match_wire_tags() {
        let op = Operation::MarkNotificationsAsRead(UserArgs {
            user_id: "u1".to_string(),
        });
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["name"], op.name());
        assert_eq!(json["userId"], "u1");
    }
}
