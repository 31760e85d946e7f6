// src/models/update.rs
//! Telegram webhook update data model.
//!
//! Only the subset of the Bot API update consumed by the webhook relay is
//! modeled; everything else in the payload is ignored. All fields are
//! optional because updates arrive in many shapes (channel posts, callback
//! queries, ...) and the relay must ack them all.

use serde::{Deserialize, Serialize};

/// An incoming Bot API update.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Update {
    pub message: Option<Message>,
    pub edited_message: Option<Message>,
}

impl Update {
    /// The message carried by this update, preferring the original over an
    /// edit.
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }
}

/// A chat message within an update.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Message {
    pub chat: Option<Chat>,
    pub from: Option<User>,
}

impl Message {
    /// Chat to reply into: the chat id, falling back to the sender id.
    pub fn reply_chat_id(&self) -> Option<i64> {
        self.chat
            .as_ref()
            .map(|chat| chat.id)
            .or_else(|| self.from.as_ref().map(|user| user.id))
    }
}

/// The chat a message was sent in.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

/// The Telegram account that sent a message. Only the id is needed: it is
/// the reply target when an update carries no chat.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_chat_id_prefers_chat_over_sender() {
        let update: Update = serde_json::from_str(
            r#"{"update_id":1,"message":{"message_id":7,"chat":{"id":10,"type":"private"},"from":{"id":20,"first_name":"A"},"text":"/start"}}"#,
        )
        .unwrap();
        assert_eq!(update.message().unwrap().reply_chat_id(), Some(10));
    }

    #[test]
    fn test_reply_chat_id_falls_back_to_sender() {
        let message = Message {
            chat: None,
            from: Some(User { id: 20 }),
        };
        assert_eq!(message.reply_chat_id(), Some(20));
    }

    #[test]
    fn test_edited_message_is_used_when_message_absent() {
        let update: Update = serde_json::from_str(
            r#"{"update_id":2,"edited_message":{"chat":{"id":11}}}"#,
        )
        .unwrap();
        assert_eq!(update.message().unwrap().reply_chat_id(), Some(11));
    }

    #[test]
    fn test_unrelated_update_kinds_deserialize_empty() {
        let update: Update =
            serde_json::from_str(r#"{"update_id":3,"callback_query":{"id":"x"}}"#).unwrap();
        assert!(update.message().is_none());
    }
}
