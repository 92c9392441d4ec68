use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::notice::{Notice, Tone};
use super::player::PlayerId;

/// Everything said in one game channel, kept in memory by the HTTP adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLog {
    pub channel_id: String,
    pub messages: Vec<ChatMessage>,
    pub members: Vec<PlayerId>,
    pub talk_channels: BTreeMap<String, Vec<PlayerId>>,
    pub archived: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: String,
    pub sender: Option<PlayerId>,
    // set for private messages and single-player prompts
    pub recipient: Option<PlayerId>,
    pub talk: Option<String>,
    pub title: Option<String>,
    pub content: String,
    pub tone: Tone,
    pub options: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub message_type: ChatMessageType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatMessageType {
    Group,
    Private,
    Talk,
    Prompt,
    System,
}

impl ChatLog {
    pub fn new(channel_id: String) -> Self {
        ChatLog {
            channel_id,
            messages: Vec::new(),
            members: Vec::new(),
            talk_channels: BTreeMap::new(),
            archived: false,
        }
    }

    pub fn add_message(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn add_system_message(&mut self, content: String) -> ChatMessage {
        let message = ChatMessage::new(None, content, ChatMessageType::System);
        self.add_message(message.clone());
        message
    }

    pub fn remove_message(&mut self, message_id: &str) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.message_id != message_id);
        self.messages.len() != before
    }

    pub fn get_messages_by_type(&self, message_type: ChatMessageType) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| m.message_type == message_type)
            .collect()
    }

    /// Whether `viewer` may read `message`. Anonymous viewers only see the
    /// group conversation.
    pub fn is_visible_to(&self, message: &ChatMessage, viewer: Option<&str>) -> bool {
        match message.message_type {
            ChatMessageType::Group | ChatMessageType::System => true,
            ChatMessageType::Private => message.recipient.as_deref() == viewer && viewer.is_some(),
            ChatMessageType::Prompt => match &message.recipient {
                Some(recipient) => Some(recipient.as_str()) == viewer,
                None => true,
            },
            ChatMessageType::Talk => {
                let (Some(talk), Some(viewer)) = (&message.talk, viewer) else {
                    return false;
                };
                self.talk_channels
                    .get(talk)
                    .is_some_and(|members| members.iter().any(|m| m == viewer))
            }
        }
    }

    pub fn visible_to(&self, viewer: Option<&str>) -> Vec<&ChatMessage> {
        self.messages
            .iter()
            .filter(|m| self.is_visible_to(m, viewer))
            .collect()
    }
}

impl ChatMessage {
    pub fn new(sender: Option<PlayerId>, content: String, message_type: ChatMessageType) -> Self {
        ChatMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            sender,
            recipient: None,
            talk: None,
            title: None,
            content,
            tone: Tone::Plain,
            options: Vec::new(),
            timestamp: Utc::now(),
            message_type,
        }
    }

    pub fn from_notice(notice: &Notice, recipient: Option<PlayerId>) -> Self {
        let message_type = if recipient.is_some() {
            ChatMessageType::Private
        } else {
            ChatMessageType::Group
        };
        ChatMessage {
            recipient,
            title: notice.title.clone(),
            tone: notice.tone,
            ..ChatMessage::new(None, notice.body.clone(), message_type)
        }
    }

    pub fn prompt(recipient: Option<PlayerId>, content: String, options: Vec<String>) -> Self {
        ChatMessage {
            recipient,
            options,
            ..ChatMessage::new(None, content, ChatMessageType::Prompt)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_messages_stay_private() {
        let mut log = ChatLog::new("c1".to_string());
        log.add_message(ChatMessage::from_notice(&Notice::text("hello all"), None));
        log.add_message(ChatMessage::from_notice(
            &Notice::info("Your role", "Seer"),
            Some("alice".to_string()),
        ));

        assert_eq!(log.visible_to(Some("alice")).len(), 2);
        assert_eq!(log.visible_to(Some("bob")).len(), 1);
        assert_eq!(log.visible_to(None).len(), 1);
    }

    #[test]
    fn test_talk_channel_members_only() {
        let mut log = ChatLog::new("c1".to_string());
        log.talk_channels
            .insert("pack".to_string(), vec!["w1".to_string(), "w2".to_string()]);
        let mut message = ChatMessage::new(Some("w1".to_string()), "tonight?".to_string(), ChatMessageType::Talk);
        message.talk = Some("pack".to_string());
        log.add_message(message);

        assert_eq!(log.visible_to(Some("w2")).len(), 1);
        assert!(log.visible_to(Some("villager")).is_empty());
    }
}
