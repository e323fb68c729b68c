//! Outgoing-robot callback payload.

use serde::{Deserialize, Serialize};

/// Body the platform POSTs when a user messages the robot.
///
/// Only `text` is required to dispatch; every other field is optional so
/// older or trimmed callbacks still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutgoingMessage {
    pub msgtype: Option<String>,
    pub text: OutgoingText,
    pub msg_id: Option<String>,
    pub create_at: Option<i64>,
    /// `"1"` for a one-to-one chat, `"2"` for a group.
    pub conversation_type: Option<String>,
    pub conversation_id: Option<String>,
    pub conversation_title: Option<String>,
    pub sender_id: Option<String>,
    pub sender_nick: Option<String>,
    pub sender_corp_id: Option<String>,
    pub sender_staff_id: Option<String>,
    pub chatbot_user_id: Option<String>,
    pub chatbot_corp_id: Option<String>,
    pub at_users: Vec<AtUser>,
    pub is_admin: Option<bool>,
    pub is_in_at_list: Option<bool>,
    pub session_webhook: Option<String>,
    pub session_webhook_expired_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingText {
    pub content: String,
}

/// A user mentioned in the message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AtUser {
    pub dingtalk_id: String,
    pub staff_id: Option<String>,
}

impl OutgoingMessage {
    /// The chat text.
    pub fn content(&self) -> &str {
        &self.text.content
    }

    /// Returns `true` if the robot was @-mentioned.
    pub fn is_mentioned(&self) -> bool {
        if self.is_in_at_list == Some(true) {
            return true;
        }
        match &self.chatbot_user_id {
            Some(bot) => self.at_users.iter().any(|u| &u.dingtalk_id == bot),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_group_callback() {
        let body = r#"{
            "msgtype": "text",
            "text": {"content": " hello world"},
            "msgId": "msg0001",
            "createAt": 1700000000000,
            "conversationType": "2",
            "conversationId": "cid123",
            "senderNick": "alice",
            "chatbotUserId": "$:LWCP_v1:$bot",
            "atUsers": [{"dingtalkId": "$:LWCP_v1:$bot"}],
            "isAdmin": false,
            "isInAtList": true,
            "sessionWebhookExpiredTime": 1700000600000
        }"#;
        let msg: OutgoingMessage = serde_json::from_str(body).unwrap();
        assert_eq!(msg.content(), " hello world");
        assert_eq!(msg.sender_nick.as_deref(), Some("alice"));
        assert_eq!(msg.at_users.len(), 1);
        assert!(msg.is_mentioned());
    }

    #[test]
    fn test_minimal_payload() {
        let msg: OutgoingMessage = serde_json::from_str(r#"{"text":{"content":"ping"}}"#).unwrap();
        assert_eq!(msg.content(), "ping");
        assert!(!msg.is_mentioned());
    }

    #[test]
    fn test_mention_via_at_users() {
        let msg = OutgoingMessage {
            chatbot_user_id: Some("bot".into()),
            at_users: vec![AtUser {
                dingtalk_id: "bot".into(),
                staff_id: None,
            }],
            ..Default::default()
        };
        assert!(msg.is_mentioned());

        let other = OutgoingMessage {
            chatbot_user_id: Some("bot".into()),
            at_users: vec![AtUser {
                dingtalk_id: "someone".into(),
                staff_id: Some("007".into()),
            }],
            is_in_at_list: Some(false),
            ..Default::default()
        };
        assert!(!other.is_mentioned());
    }
}
