use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::models::config::GameConfig;
use crate::models::player::PlayerId;
use crate::ports::{Messenger, RandomPort, SystemRandom};
use crate::services::session::Session;
use crate::utils::chat_messenger::{ChannelMessenger, Memberships};

/// Session registry of the HTTP adapter, keyed by channel id.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<Mutex<HashMap<String, Arc<Session>>>>,
    pub messengers: Arc<Mutex<HashMap<String, Arc<ChannelMessenger>>>>,
    pub memberships: Memberships,
    pub game_config: Arc<GameConfig>,
    pub rng: Arc<dyn RandomPort>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(GameConfig::from_env(), Arc::new(SystemRandom))
    }

    pub fn with_config(game_config: GameConfig, rng: Arc<dyn RandomPort>) -> Self {
        AppState {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            messengers: Arc::new(Mutex::new(HashMap::new())),
            memberships: Memberships::default(),
            game_config: Arc::new(game_config),
            rng,
        }
    }

    pub async fn messenger_for(&self, channel: &str) -> Arc<ChannelMessenger> {
        let mut messengers = self.messengers.lock().await;
        messengers
            .entry(channel.to_string())
            .or_insert_with(|| Arc::new(ChannelMessenger::new(channel, self.memberships.clone())))
            .clone()
    }

    /// The channel's session, created on first use.
    pub async fn session_for(&self, channel: &str) -> Arc<Session> {
        let messenger = self.messenger_for(channel).await;
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(channel.to_string())
            .or_insert_with(|| {
                tracing::info!(channel, "session created");
                let messenger: Arc<dyn Messenger> = messenger;
                Session::new(channel, (*self.game_config).clone(), messenger, self.rng.clone())
            })
            .clone()
    }

    /// The channel `player` is partied in, if any.
    pub async fn membership(&self, player: &PlayerId) -> Option<String> {
        self.memberships.lock().await.get(player).cloned()
    }
}
