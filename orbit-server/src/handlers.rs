//! Operation handlers.
//!
//! Each handler validates its arguments, checks that the authenticated user
//! may act on the ids it names, touches storage under the database lock and
//! pushes live events to the other party.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use crate::models::input::{
    normalize_text, ConversationArgs, CreateNotificationArgs, JoinCallArgs, MessageIdArgs,
    SendFileArgs, SendMessageArgs, UserArgs, ValidateExt,
};
use crate::models::{Media, Message, Notification, NotificationKind, User, ZegoTokenResponse};
use crate::protocol::{Operation, WsMessage};
use crate::repo::messages::{self as message_repo, NewMessage};
use crate::repo::notifications::{self as notification_repo, NewNotification};
use crate::state::ServerState;
use crate::video;

/// Run one operation on behalf of `session` and return its JSON result
pub fn handle_operation(op: Operation, session: &User, state: &ServerState) -> ApiResult<Value> {
    debug!(op = op.name(), user_id = %session.id, "Handling operation");
    match op {
        Operation::GetMessages(args) => to_value(get_messages(args, session, state)?),
        Operation::GetUnreadCount(args) => to_value(get_unread_count(args, session, state)?),
        Operation::JoinVideoCall(args) => to_value(join_video_call(args, session, state)?),
        Operation::SendMessage(args) => to_value(send_message(args, session, state)?),
        Operation::SendMessageWithFile(args) => {
            to_value(send_message_with_file(args, session, state)?)
        }
        Operation::MarkMessageAsSeen(args) => to_value(mark_message_as_seen(args, session, state)?),
        Operation::MarkAllMessagesAsSeen(args) => {
            to_value(mark_all_messages_as_seen(args, session, state)?)
        }
        Operation::DeleteMessage(args) => to_value(delete_message(args, session, state)?),
        Operation::GetUserNotifications(args) => {
            to_value(get_user_notifications(args, session, state)?)
        }
        Operation::GetUnreadNotificationsCount(args) => {
            to_value(get_unread_notifications_count(args, session, state)?)
        }
        Operation::MarkNotificationsAsRead(args) => {
            to_value(mark_notifications_as_read(args, session, state)?)
        }
        Operation::CreateNotification(args) => to_value(create_notification(args, session, state)?),
    }
}

fn to_value<T: Serialize>(value: T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Internal(e.to_string()))
}

fn require_self(session: &User, user_id: &str, action: &str) -> ApiResult<()> {
    if session.id == user_id {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(format!(
            "{} may not {} for {}",
            session.id, action, user_id
        )))
    }
}

fn require_participant(session: &User, args: &ConversationArgs) -> ApiResult<()> {
    if session.id == args.sender_id || session.id == args.receiver_id {
        Ok(())
    } else {
        Err(ApiError::Unauthorized(format!(
            "{} is not part of this conversation",
            session.id
        )))
    }
}

pub fn get_messages(
    args: ConversationArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<Vec<Message>> {
    args.validate_input()?;
    require_participant(session, &args)?;

    let conn = state.db.lock()?;
    message_repo::list_conversation(&conn, &args.sender_id, &args.receiver_id)
}

pub fn get_unread_count(
    args: ConversationArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<i64> {
    args.validate_input()?;
    require_participant(session, &args)?;

    let conn = state.db.lock()?;
    message_repo::count_unseen(&conn, &args.sender_id, &args.receiver_id)
}

pub fn join_video_call(
    args: JoinCallArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<ZegoTokenResponse> {
    args.validate_input()?;
    let response = video::join_video_call(state.calls.as_ref(), session, &args.room_id)?;
    info!(user_id = %session.id, room_id = %args.room_id, "Issued video call token");
    Ok(response)
}

/// Store a message and push it to the receiver
fn deliver(
    state: &ServerState,
    sender_id: &str,
    receiver_id: &str,
    text: Option<String>,
    media: Option<Media>,
) -> ApiResult<Message> {
    let message = {
        let conn = state.db.lock()?;
        message_repo::insert_message(
            &conn,
            NewMessage {
                sender_id,
                receiver_id,
                text,
                media,
            },
        )?
    }; // Lock released here

    state.push(
        receiver_id,
        &WsMessage::NewMessage {
            message: message.clone(),
        },
    );
    Ok(message)
}

pub fn send_message(
    args: SendMessageArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<Message> {
    args.validate_input()?;
    require_self(session, &args.sender_id, "send messages")?;

    let text = normalize_text(args.message);
    let media = args.media.filter(|m| !m.is_empty());
    if text.is_none() && media.is_none() {
        return Err(ApiError::Validation(
            "A message needs text or media".to_string(),
        ));
    }

    deliver(state, &args.sender_id, &args.receiver_id, text, media)
}

pub fn send_message_with_file(
    args: SendFileArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<Message> {
    args.validate_input()?;
    require_self(session, &args.sender_id, "send messages")?;

    let text = normalize_text(args.message);
    if text.is_none() && args.file.is_none() {
        return Err(ApiError::Validation(
            "A message needs text or a file".to_string(),
        ));
    }

    // Write the file before taking the database lock
    let media = match &args.file {
        Some(file) => Some(state.uploads.save(file)?),
        None => None,
    };

    deliver(state, &args.sender_id, &args.receiver_id, text, media)
}

pub fn mark_message_as_seen(
    args: MessageIdArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<bool> {
    args.validate_input()?;

    let participants = {
        let conn = state.db.lock()?;
        let Some(participants) = message_repo::participants(&conn, &args.message_id)? else {
            return Ok(false);
        };
        if !participants.includes(&session.id) {
            return Err(ApiError::Unauthorized(format!(
                "{} is not part of this conversation",
                session.id
            )));
        }
        message_repo::mark_seen(&conn, &args.message_id)?;
        participants
    };

    state.push(
        participants.other(&session.id),
        &WsMessage::MessageSeen {
            message_ids: vec![args.message_id],
            seen_by: session.id.clone(),
        },
    );
    Ok(true)
}

pub fn mark_all_messages_as_seen(
    args: ConversationArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<bool> {
    args.validate_input()?;
    require_self(session, &args.receiver_id, "mark messages seen")?;

    let changed = {
        let conn = state.db.lock()?;
        message_repo::mark_all_seen(&conn, &args.sender_id, &args.receiver_id)?
    };

    if !changed.is_empty() {
        state.push(
            &args.sender_id,
            &WsMessage::MessageSeen {
                message_ids: changed,
                seen_by: session.id.clone(),
            },
        );
    }
    Ok(true)
}

pub fn delete_message(
    args: MessageIdArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<bool> {
    args.validate_input()?;

    let participants = {
        let conn = state.db.lock()?;
        let Some(participants) = message_repo::participants(&conn, &args.message_id)? else {
            return Ok(false);
        };
        if participants.sender_id != session.id {
            return Err(ApiError::Unauthorized(
                "Only the sender may delete a message".to_string(),
            ));
        }
        message_repo::delete_message(&conn, &args.message_id)?;
        participants
    };

    state.push(
        &participants.receiver_id,
        &WsMessage::MessageDeleted {
            message_id: args.message_id,
        },
    );
    Ok(true)
}

pub fn get_user_notifications(
    args: UserArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<Vec<Notification>> {
    args.validate_input()?;
    require_self(session, &args.user_id, "read notifications")?;

    let conn = state.db.lock()?;
    notification_repo::list_for_user(&conn, &args.user_id)
}

pub fn get_unread_notifications_count(
    args: UserArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<i64> {
    args.validate_input()?;
    require_self(session, &args.user_id, "read notifications")?;

    let conn = state.db.lock()?;
    notification_repo::unread_count(&conn, &args.user_id)
}

pub fn mark_notifications_as_read(
    args: UserArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<bool> {
    args.validate_input()?;
    require_self(session, &args.user_id, "mark notifications read")?;

    let conn = state.db.lock()?;
    let changed = notification_repo::mark_all_read(&conn, &args.user_id)?;
    debug!(user_id = %args.user_id, changed, "Marked notifications read");
    Ok(true)
}

pub fn create_notification(
    args: CreateNotificationArgs,
    session: &User,
    state: &ServerState,
) -> ApiResult<Notification> {
    args.validate_input()?;

    let notification = {
        let conn = state.db.lock()?;
        notification_repo::insert_notification(
            &conn,
            NewNotification {
                recipient_id: &args.recipient_id,
                sender_id: &session.id,
                kind: NotificationKind::from(args.kind),
                comment_text: normalize_text(args.comment_text),
                post: args
                    .post
                    .filter(|p| p.has_media() || p.thumbnail_url.is_some()),
            },
        )?
    };

    state.push(
        &args.recipient_id,
        &WsMessage::Notification {
            notification: notification.clone(),
        },
    );
    Ok(notification)
}
