//! Boundaries the engine talks through. The adapter implements `Messenger`
//! once per platform; `RandomPort` exists so tests can force every roll.

use async_trait::async_trait;

use crate::models::{
    action::{ActionKind, Location},
    notice::Notice,
    player::PlayerId,
};

/// Handle of a prompt the adapter sent, used to delete it later.
pub type PromptId = String;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessengerError {
    #[error("could not reach {0} privately")]
    Unreachable(PlayerId),
    #[error("platform error: {0}")]
    Platform(String),
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn open_game_channel(&self, party: &[PlayerId]) -> Result<(), MessengerError>;
    async fn archive_game_channel(&self) -> Result<(), MessengerError>;
    async fn open_talk_channel(
        &self,
        name: &str,
        members: &[PlayerId],
    ) -> Result<(), MessengerError>;

    // membership bookkeeping across sessions belongs to the adapter
    async fn member_joined(&self, player: &PlayerId);
    async fn member_left(&self, player: &PlayerId);

    async fn send_group(&self, notice: &Notice) -> Result<(), MessengerError>;
    async fn send_private(&self, to: &PlayerId, notice: &Notice) -> Result<(), MessengerError>;

    async fn prompt_single(
        &self,
        to: &PlayerId,
        kind: ActionKind,
        options: &[PlayerId],
    ) -> Result<PromptId, MessengerError>;
    async fn prompt_multi(&self, options: &[PlayerId]) -> Result<PromptId, MessengerError>;
    async fn prompt_location(
        &self,
        to: &PlayerId,
        options: &[Location],
    ) -> Result<PromptId, MessengerError>;
    async fn delete_prompt(&self, prompt: &PromptId) -> Result<(), MessengerError>;
}

pub trait RandomPort: Send + Sync {
    /// Uniform index in `0..len`. `len` is never zero.
    fn gen_index(&self, len: usize) -> usize;
    /// True with probability `p`.
    fn gen_bool(&self, p: f64) -> bool;
}

impl dyn RandomPort + '_ {
    pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.gen_index(items.len()))
        }
    }
}

/// Thread-local rand generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRandom;

impl RandomPort for SystemRandom {
    fn gen_index(&self, len: usize) -> usize {
        use rand::Rng;
        rand::thread_rng().gen_range(0..len)
    }

    fn gen_bool(&self, p: f64) -> bool {
        use rand::Rng;
        rand::thread_rng().gen_bool(p.clamp(0.0, 1.0))
    }
}
