//! Shared helpers for unit and integration tests.

use async_trait::async_trait;
use dotenvy::dotenv;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, Once};

use crate::models::{
    action::{ActionKind, Location},
    game::Game,
    notice::Notice,
    player::PlayerId,
    role::Role,
};
use crate::ports::{Messenger, MessengerError, PromptId, RandomPort};

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A game already in the Playing state, players `p1..pN` holding `roles`
/// in order.
pub fn playing_game(roles: &[Role]) -> Game {
    let mut game = Game::new();
    game.party = (1..=roles.len()).map(|i| format!("p{}", i)).collect();
    game.assign_roles(roles);
    game.state = crate::models::game::GameState::Playing;
    game
}

/// Replays queued outcomes, then falls back to a fixed answer.
pub struct ScriptedRandom {
    bools: Mutex<VecDeque<bool>>,
    indices: Mutex<VecDeque<usize>>,
    fallback: bool,
}

impl ScriptedRandom {
    pub fn always(outcome: bool) -> Self {
        Self {
            bools: Mutex::new(VecDeque::new()),
            indices: Mutex::new(VecDeque::new()),
            fallback: outcome,
        }
    }

    pub fn with_bools(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        if let Ok(mut bools) = self.bools.lock() {
            bools.extend(outcomes);
        }
        self
    }

    pub fn with_indices(self, picks: impl IntoIterator<Item = usize>) -> Self {
        if let Ok(mut indices) = self.indices.lock() {
            indices.extend(picks);
        }
        self
    }
}

impl RandomPort for ScriptedRandom {
    fn gen_index(&self, len: usize) -> usize {
        let next = self.indices.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or(0) % len
    }

    fn gen_bool(&self, _p: f64) -> bool {
        let next = self.bools.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or(self.fallback)
    }
}

/// Real randomness from a fixed seed.
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl RandomPort for SeededRandom {
    fn gen_index(&self, len: usize) -> usize {
        match self.0.lock() {
            Ok(mut rng) => rng.gen_range(0..len),
            Err(_) => 0,
        }
    }

    fn gen_bool(&self, p: f64) -> bool {
        match self.0.lock() {
            Ok(mut rng) => rng.gen_bool(p.clamp(0.0, 1.0)),
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Group(Notice),
    Private(PlayerId, Notice),
    Prompt(Option<PlayerId>, Vec<String>),
}

/// Keeps everything the engine sends. Players in `unreachable` reject
/// private messages and prompts.
#[derive(Default)]
pub struct RecordingMessenger {
    pub sent: Mutex<Vec<Sent>>,
    pub members: Mutex<HashSet<PlayerId>>,
    pub talk_channels: Mutex<Vec<(String, Vec<PlayerId>)>>,
    pub deleted: Mutex<Vec<PromptId>>,
    pub channel_open: Mutex<bool>,
    pub archived: Mutex<usize>,
    /// While set, group sends fail with a platform error.
    pub group_down: Mutex<bool>,
    unreachable: HashSet<PlayerId>,
    next_prompt: Mutex<usize>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unreachable(players: &[&str]) -> Self {
        Self {
            unreachable: players.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn group_notices(&self) -> Vec<Notice> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Group(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn private_to(&self, player: &str) -> Vec<Notice> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Private(to, notice) if to == player => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn group_titles(&self) -> Vec<String> {
        self.group_notices()
            .into_iter()
            .filter_map(|n| n.title)
            .collect()
    }

    fn record(&self, sent: Sent) {
        if let Ok(mut log) = self.sent.lock() {
            log.push(sent);
        }
    }

    fn reachable(&self, player: &PlayerId) -> Result<(), MessengerError> {
        if self.unreachable.contains(player) {
            Err(MessengerError::Unreachable(player.clone()))
        } else {
            Ok(())
        }
    }

    fn prompt_id(&self) -> PromptId {
        match self.next_prompt.lock() {
            Ok(mut next) => {
                *next += 1;
                format!("prompt-{}", next)
            }
            Err(_) => "prompt".to_string(),
        }
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn open_game_channel(&self, _party: &[PlayerId]) -> Result<(), MessengerError> {
        if let Ok(mut open) = self.channel_open.lock() {
            *open = true;
        }
        Ok(())
    }

    async fn archive_game_channel(&self) -> Result<(), MessengerError> {
        if let Ok(mut archived) = self.archived.lock() {
            *archived += 1;
        }
        Ok(())
    }

    async fn open_talk_channel(&self, name: &str, members: &[PlayerId]) -> Result<(), MessengerError> {
        if let Ok(mut talks) = self.talk_channels.lock() {
            talks.push((name.to_string(), members.to_vec()));
        }
        Ok(())
    }

    async fn member_joined(&self, player: &PlayerId) {
        if let Ok(mut members) = self.members.lock() {
            members.insert(player.clone());
        }
    }

    async fn member_left(&self, player: &PlayerId) {
        if let Ok(mut members) = self.members.lock() {
            members.remove(player);
        }
    }

    async fn send_group(&self, notice: &Notice) -> Result<(), MessengerError> {
        if self.group_down.lock().map(|down| *down).unwrap_or(false) {
            return Err(MessengerError::Platform("group channel unavailable".to_string()));
        }
        self.record(Sent::Group(notice.clone()));
        Ok(())
    }

    async fn send_private(&self, to: &PlayerId, notice: &Notice) -> Result<(), MessengerError> {
        self.reachable(to)?;
        self.record(Sent::Private(to.clone(), notice.clone()));
        Ok(())
    }

    async fn prompt_single(
        &self,
        to: &PlayerId,
        _kind: ActionKind,
        options: &[PlayerId],
    ) -> Result<PromptId, MessengerError> {
        self.reachable(to)?;
        self.record(Sent::Prompt(Some(to.clone()), options.to_vec()));
        Ok(self.prompt_id())
    }

    async fn prompt_multi(&self, options: &[PlayerId]) -> Result<PromptId, MessengerError> {
        self.record(Sent::Prompt(None, options.to_vec()));
        Ok(self.prompt_id())
    }

    async fn prompt_location(
        &self,
        to: &PlayerId,
        options: &[Location],
    ) -> Result<PromptId, MessengerError> {
        self.reachable(to)?;
        self.record(Sent::Prompt(
            Some(to.clone()),
            options.iter().map(|l| l.to_string()).collect(),
        ));
        Ok(self.prompt_id())
    }

    async fn delete_prompt(&self, prompt: &PromptId) -> Result<(), MessengerError> {
        if let Ok(mut deleted) = self.deleted.lock() {
            deleted.push(prompt.clone());
        }
        Ok(())
    }
}
