//! `Messenger` over an in-memory chat log. Every message is appended to the
//! channel's log and broadcast to its WebSocket subscribers.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use crate::models::{
    action::{ActionKind, Location},
    chat::{ChatLog, ChatMessage, ChatMessageType},
    notice::Notice,
    player::PlayerId,
};
use crate::ports::{Messenger, MessengerError, PromptId};

const BROADCAST_CAPACITY: usize = 1000;

/// Which channel each player is currently partied in.
pub type Memberships = Arc<Mutex<HashMap<PlayerId, String>>>;

pub struct ChannelMessenger {
    channel: String,
    log: Mutex<ChatLog>,
    tx: broadcast::Sender<ChatMessage>,
    memberships: Memberships,
}

impl ChannelMessenger {
    pub fn new(channel: &str, memberships: Memberships) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            channel: channel.to_string(),
            log: Mutex::new(ChatLog::new(channel.to_string())),
            tx,
            memberships,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatMessage> {
        self.tx.subscribe()
    }

    pub async fn log(&self) -> ChatLog {
        self.log.lock().await.clone()
    }

    pub async fn is_visible_to(&self, message: &ChatMessage, viewer: Option<&str>) -> bool {
        self.log.lock().await.is_visible_to(message, viewer)
    }

    /// A player speaking in the group channel or in one of their talk channels.
    pub async fn say(
        &self,
        sender: &PlayerId,
        content: String,
        talk: Option<String>,
    ) -> Result<(), MessengerError> {
        let message = {
            let log = self.log.lock().await;
            if log.archived {
                return Err(MessengerError::Platform("the game channel is archived".to_string()));
            }
            match talk {
                Some(talk) => {
                    let member = log
                        .talk_channels
                        .get(&talk)
                        .is_some_and(|members| members.contains(sender));
                    if !member {
                        return Err(MessengerError::Platform(format!("{} is not in {}", sender, talk)));
                    }
                    ChatMessage {
                        talk: Some(talk),
                        ..ChatMessage::new(Some(sender.clone()), content, ChatMessageType::Talk)
                    }
                }
                None => ChatMessage::new(Some(sender.clone()), content, ChatMessageType::Group),
            }
        };
        self.post(message).await;
        Ok(())
    }

    async fn post(&self, message: ChatMessage) {
        self.log.lock().await.add_message(message.clone());
        if self.tx.send(message).is_err() {
            tracing::trace!(channel = %self.channel, "no subscribers");
        }
    }

    async fn post_system(&self, content: String) {
        let message = self.log.lock().await.add_system_message(content);
        if self.tx.send(message).is_err() {
            tracing::trace!(channel = %self.channel, "no subscribers");
        }
    }
}

#[async_trait]
impl Messenger for ChannelMessenger {
    async fn open_game_channel(&self, party: &[PlayerId]) -> Result<(), MessengerError> {
        {
            // each game starts from an empty log
            let mut log = self.log.lock().await;
            log.messages.clear();
            log.members = party.to_vec();
            log.talk_channels.clear();
            log.archived = false;
        }
        self.post_system(format!("Game channel opened for {}.", party.join(", ")))
            .await;
        Ok(())
    }

    async fn archive_game_channel(&self) -> Result<(), MessengerError> {
        self.post_system("This game channel is now archived.".to_string())
            .await;
        self.log.lock().await.archived = true;
        Ok(())
    }

    async fn open_talk_channel(&self, name: &str, members: &[PlayerId]) -> Result<(), MessengerError> {
        self.log
            .lock()
            .await
            .talk_channels
            .insert(name.to_string(), members.to_vec());
        tracing::debug!(channel = %self.channel, talk = name, "talk channel opened");
        Ok(())
    }

    async fn member_joined(&self, player: &PlayerId) {
        self.memberships
            .lock()
            .await
            .insert(player.clone(), self.channel.clone());
    }

    async fn member_left(&self, player: &PlayerId) {
        let mut memberships = self.memberships.lock().await;
        if memberships.get(player) == Some(&self.channel) {
            memberships.remove(player);
        }
    }

    async fn send_group(&self, notice: &Notice) -> Result<(), MessengerError> {
        self.post(ChatMessage::from_notice(notice, None)).await;
        Ok(())
    }

    async fn send_private(&self, to: &PlayerId, notice: &Notice) -> Result<(), MessengerError> {
        self.post(ChatMessage::from_notice(notice, Some(to.clone())))
            .await;
        Ok(())
    }

    async fn prompt_single(
        &self,
        to: &PlayerId,
        kind: ActionKind,
        options: &[PlayerId],
    ) -> Result<PromptId, MessengerError> {
        let message = ChatMessage::prompt(Some(to.clone()), kind.prompt_text().to_string(), options.to_vec());
        let id = message.message_id.clone();
        self.post(message).await;
        Ok(id)
    }

    async fn prompt_multi(&self, options: &[PlayerId]) -> Result<PromptId, MessengerError> {
        let message = ChatMessage::prompt(
            None,
            "Who should be exiled? Pick any number of players.".to_string(),
            options.to_vec(),
        );
        let id = message.message_id.clone();
        self.post(message).await;
        Ok(id)
    }

    async fn prompt_location(
        &self,
        to: &PlayerId,
        options: &[Location],
    ) -> Result<PromptId, MessengerError> {
        let message = ChatMessage::prompt(
            Some(to.clone()),
            ActionKind::InvestigateLocation.prompt_text().to_string(),
            options.iter().map(|l| l.to_string()).collect(),
        );
        let id = message.message_id.clone();
        self.post(message).await;
        Ok(id)
    }

    async fn delete_prompt(&self, prompt: &PromptId) -> Result<(), MessengerError> {
        if self.log.lock().await.remove_message(prompt) {
            Ok(())
        } else {
            Err(MessengerError::Platform(format!("unknown prompt {}", prompt)))
        }
    }
}
