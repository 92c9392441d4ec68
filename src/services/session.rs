//! One party's game session. Command handlers lock the game briefly to
//! validate and record; the spawned session task drives the lifecycle and
//! never holds the lock while waiting or talking to the messenger.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::error::GameError;
use crate::models::{
    action::{Action, ActionKind, Location},
    config::GameConfig,
    game::{Game, GameSpeed, GameState, VictoryReason, Window},
    notice::{Dispatch, Notice, Reply},
    player::PlayerId,
    role::{Role, Team},
};
use crate::ports::{Messenger, PromptId, RandomPort};
use crate::services::{
    balancer,
    night::{self, NightReport},
    scheduler::{ArmedWait, Phase, PhaseTimer},
    vote::{self, DayReport},
};

/// The ability `id` may use tonight, if any.
pub fn night_ability(game: &Game, id: &str) -> Option<ActionKind> {
    let player = game.player(id).filter(|p| p.alive)?;
    let ability = player.role.ability()?;
    match player.role {
        Role::Avenger if !player.ability_active => None,
        Role::Lunatic if game.core_wolves_alive() > 0 => None,
        _ => Some(ability),
    }
}

pub fn role_catalog() -> String {
    let line = |role: &Role| format!("{} ({}): {}", role, role.team(), role.description());
    let section = |team: Team| {
        Role::ALL
            .iter()
            .filter(|r| r.team() == team)
            .map(line)
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "Village\n{}\n\nWerewolves\n{}\n\nLoners\n{}",
        section(Team::Village),
        section(Team::Werewolf),
        section(Team::Jester)
    )
}

pub struct Session {
    id: String,
    config: GameConfig,
    messenger: Arc<dyn Messenger>,
    rng: Arc<dyn RandomPort>,
    game: Mutex<Game>,
    timer: PhaseTimer,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        id: impl Into<String>,
        config: GameConfig,
        messenger: Arc<dyn Messenger>,
        rng: Arc<dyn RandomPort>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            config,
            messenger,
            rng,
            game: Mutex::new(Game::new()),
            timer: PhaseTimer::new(),
            task: Mutex::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn state(&self) -> GameState {
        self.game.lock().await.state
    }

    pub async fn snapshot(&self) -> Game {
        self.game.lock().await.clone()
    }

    /// The phase whose timed wait is currently running.
    pub async fn waiting_on(&self) -> Option<Phase> {
        self.timer.active_phase().await
    }

    /// Waits for the session task, if one is running, to reach Idle.
    pub async fn finished(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                log::error!("session {} task failed: {}", self.id, e);
            }
        }
    }

    // ---- lobby commands -------------------------------------------------

    pub async fn create_game(
        self: &Arc<Self>,
        creator: &str,
        language: &str,
        speed: GameSpeed,
    ) -> Result<Reply, GameError> {
        let state = self.state().await;
        if state != GameState::Idle {
            return Err(GameError::WrongState { actual: state });
        }
        // a task from an abandoned party may still be winding down
        self.finished().await;
        let join_wait = {
            let mut game = self.game.lock().await;
            if game.state != GameState::Idle {
                return Err(GameError::WrongState { actual: game.state });
            }
            game.reset();
            game.party.push(creator.to_string());
            game.language = language.to_string();
            game.speed = speed;
            game.state = GameState::Joining;
            // armed under the game lock so continue and leave can reach it
            // before the session task is scheduled
            self.timer
                .arm(Phase::Joining, speed.scale(self.config.join_duration))
                .await
        };
        log::info!("session {}: {} created a game ({:?})", self.id, creator, speed);
        self.messenger.member_joined(&creator.to_string()).await;

        let handle = tokio::spawn(Arc::clone(self).run(join_wait));
        *self.task.lock().await = Some(handle);

        Ok(Reply::public(Notice::info(
            "A new game",
            format!("{} is gathering a party. Join now!", creator),
        )))
    }

    pub async fn join(&self, player: &str) -> Result<Reply, GameError> {
        let size = {
            let mut game = self.game.lock().await;
            if game.state != GameState::Joining {
                return Err(GameError::WrongState { actual: game.state });
            }
            if game.contains(player) {
                return Err(GameError::AlreadyInParty(player.to_string()));
            }
            game.party.push(player.to_string());
            game.party.len()
        };
        self.timer.restart(Phase::Joining).await;
        self.messenger.member_joined(&player.to_string()).await;
        Ok(Reply::public(Notice::text(format!(
            "{} joined the party ({} players).",
            player, size
        ))))
    }

    pub async fn leave(&self, player: &str) -> Result<Reply, GameError> {
        let abandoned = {
            let mut game = self.game.lock().await;
            if game.state != GameState::Joining {
                return Err(GameError::WrongState { actual: game.state });
            }
            if !game.contains(player) {
                return Err(GameError::NotInParty(player.to_string()));
            }
            game.party.retain(|member| member != player);
            if game.party.is_empty() {
                game.reset();
                true
            } else {
                false
            }
        };
        self.messenger.member_left(&player.to_string()).await;

        if abandoned {
            log::info!("session {}: party abandoned", self.id);
            self.timer.cancel(Phase::Joining).await;
            return Ok(Reply::public(Notice::text(
                "The last player left. The game was called off.",
            )));
        }
        self.timer.restart(Phase::Joining).await;
        Ok(Reply::public(Notice::text(format!("{} left the party.", player))))
    }

    pub async fn show_party(&self) -> Reply {
        let game = self.game.lock().await;
        let body = if game.party.is_empty() {
            "Nobody is in the party.".to_string()
        } else {
            game.party
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    let mut line = format!("{}. {}", i + 1, id);
                    if i == 0 {
                        line.push_str(" (leader)");
                    }
                    if game.state == GameState::Playing && !game.is_alive(id) {
                        line.push_str(" (dead)");
                    }
                    line
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        Reply::ephemeral(Notice::info("Party", body))
    }

    pub fn show_role_catalog(&self) -> Reply {
        Reply::ephemeral(Notice::info("Roles", role_catalog()))
    }

    pub fn describe_role(&self, fragment: &str) -> Result<Reply, GameError> {
        let role = Role::find(fragment).ok_or_else(|| GameError::UnknownRole(fragment.to_string()))?;
        let limits = format!(
            "Team: {}\nAt most {} per game, needs at least {} players.",
            role.team(),
            role.max_count(),
            role.min_party_size().max(1)
        );
        Ok(Reply::ephemeral(Notice::info(
            role.to_string(),
            format!("{}\n{}", role.description(), limits),
        )))
    }

    pub async fn continue_wait(&self, player: &str) -> Result<Reply, GameError> {
        {
            let game = self.game.lock().await;
            if !game.is_leader(player) {
                return Err(GameError::NotLeader);
            }
        }
        match self.timer.cancel_active().await {
            Some(phase) => {
                log::debug!("session {}: {} skipped {:?}", self.id, player, phase);
                Ok(Reply::public(Notice::text("The leader moves things along.")))
            }
            None => Err(GameError::NoActiveWait),
        }
    }

    pub async fn promote(&self, leader: &str, target: &str) -> Result<Reply, GameError> {
        let mut game = self.game.lock().await;
        if game.state != GameState::Joining {
            return Err(GameError::WrongState { actual: game.state });
        }
        if !game.is_leader(leader) {
            return Err(GameError::NotLeader);
        }
        let Some(index) = game.party.iter().position(|member| member == target) else {
            return Err(GameError::NotInParty(target.to_string()));
        };
        let promoted = game.party.remove(index);
        game.party.insert(0, promoted);
        Ok(Reply::public(Notice::text(format!("{} now leads the party.", target))))
    }

    pub async fn remove(&self, leader: &str, target: &str) -> Result<Reply, GameError> {
        {
            let mut game = self.game.lock().await;
            if game.state != GameState::Joining {
                return Err(GameError::WrongState { actual: game.state });
            }
            if !game.is_leader(leader) {
                return Err(GameError::NotLeader);
            }
            if leader == target {
                return Err(GameError::InvalidTarget(target.to_string()));
            }
            if !game.contains(target) {
                return Err(GameError::NotInParty(target.to_string()));
            }
            game.party.retain(|member| member != target);
        }
        self.timer.restart(Phase::Joining).await;
        self.messenger.member_left(&target.to_string()).await;
        Ok(Reply::public(Notice::text(format!("{} was removed from the party.", target))))
    }

    // ---- in-game commands -----------------------------------------------

    pub async fn submit_action(
        &self,
        actor: &str,
        kind: ActionKind,
        target: &str,
    ) -> Result<Reply, GameError> {
        if kind == ActionKind::InvestigateLocation {
            return Err(GameError::InvalidTarget(target.to_string()));
        }
        let mut game = self.game.lock().await;
        Self::check_night_actor(&game, actor, kind)?;
        if target == actor || !game.is_alive(target) {
            return Err(GameError::InvalidTarget(target.to_string()));
        }
        game.actions
            .insert(actor.to_string(), Action::on_player(kind, actor, target));
        Ok(Reply::ephemeral(Notice::text(format!(
            "Recorded: {} {}.",
            kind, target
        ))))
    }

    pub async fn submit_location(&self, actor: &str, location: Location) -> Result<Reply, GameError> {
        let mut game = self.game.lock().await;
        Self::check_night_actor(&game, actor, ActionKind::InvestigateLocation)?;
        game.actions
            .insert(actor.to_string(), Action::at_location(actor, location));
        Ok(Reply::ephemeral(Notice::text(format!(
            "You will search {} tonight.",
            location
        ))))
    }

    fn check_night_actor(game: &Game, actor: &str, kind: ActionKind) -> Result<(), GameError> {
        if game.state != GameState::Playing {
            return Err(GameError::WrongState { actual: game.state });
        }
        if game.window != Window::Night {
            return Err(GameError::WrongPhase);
        }
        let Some(player) = game.player(actor) else {
            return Err(GameError::NotInParty(actor.to_string()));
        };
        if !player.alive {
            return Err(GameError::NotAlive);
        }
        if night_ability(game, actor) != Some(kind) {
            return Err(GameError::WrongRole);
        }
        Ok(())
    }

    pub async fn submit_nominations(
        &self,
        voter: &str,
        targets: &[PlayerId],
    ) -> Result<Reply, GameError> {
        let (outcome, everyone_voted) = {
            let mut game = self.game.lock().await;
            Self::check_voter(&game, voter)?;
            let outcome = vote::record_nominations(&mut game, &voter.to_string(), targets);
            if let ControlFlow::Break(victory) = &outcome.flow {
                game.pending_victory = Some(victory.clone());
            }
            (outcome, Self::everyone_voted(&game))
        };

        let delivered = self.deliver(outcome.dispatches).await;
        if outcome.flow.is_break() || everyone_voted {
            self.timer.cancel(Phase::Day).await;
        }
        delivered?;

        let body = if outcome.accepted.is_empty() {
            "You nominated nobody.".to_string()
        } else {
            format!(
                "You nominated {}.",
                outcome.accepted.iter().cloned().collect::<Vec<_>>().join(", ")
            )
        };
        Ok(Reply::ephemeral(Notice::text(body)))
    }

    pub async fn skip_nominations(&self, voter: &str) -> Result<Reply, GameError> {
        let everyone_voted = {
            let mut game = self.game.lock().await;
            Self::check_voter(&game, voter)?;
            game.votes.insert(voter.to_string(), Default::default());
            Self::everyone_voted(&game)
        };
        if everyone_voted {
            self.timer.cancel(Phase::Day).await;
        }
        Ok(Reply::ephemeral(Notice::text("You chose not to nominate anyone today.")))
    }

    pub async fn vote_yes(&self, _voter: &str) -> Result<Reply, GameError> {
        Err(GameError::LegacyVote)
    }

    pub async fn vote_no(&self, _voter: &str) -> Result<Reply, GameError> {
        Err(GameError::LegacyVote)
    }

    fn check_voter(game: &Game, voter: &str) -> Result<(), GameError> {
        if game.state != GameState::Playing {
            return Err(GameError::WrongState { actual: game.state });
        }
        if game.window != Window::Nominations {
            return Err(GameError::WrongPhase);
        }
        if !game.contains(voter) {
            return Err(GameError::NotInParty(voter.to_string()));
        }
        if !game.is_alive(voter) {
            return Err(GameError::NotAlive);
        }
        Ok(())
    }

    fn everyone_voted(game: &Game) -> bool {
        game.living().all(|p| game.votes.contains_key(&p.id))
    }

    // ---- session task ---------------------------------------------------

    async fn run(self: Arc<Self>, join_wait: ArmedWait) {
        self.timer.wait_armed(join_wait).await;

        if self.game.lock().await.state != GameState::Joining {
            // abandoned while waiting
            return;
        }
        if let Err(e) = self.assign().await {
            log::warn!("session {}: game did not start: {}", self.id, e);
            return;
        }
        let outcome = self.play().await;
        self.finish(outcome).await;
    }

    /// Joining → Assigned → Playing.
    async fn assign(&self) -> Result<(), GameError> {
        let started = {
            let mut game = self.game.lock().await;
            let size = game.party.len();
            let roles = if size < self.config.min_players {
                Err(GameError::NotEnoughPlayers {
                    found: size,
                    required: self.config.min_players,
                })
            } else {
                balancer::generate_roles(size, self.rng.as_ref())
            };
            match roles {
                Ok(roles) => {
                    game.assign_roles(&roles);
                    game.state = GameState::Assigned;
                    Ok(game.clone())
                }
                Err(e) => {
                    let party = std::mem::take(&mut game.party);
                    game.reset();
                    Err((e, party))
                }
            }
        };

        let game = match started {
            Ok(game) => game,
            Err((e, party)) => {
                let notice = Notice::bad("The game could not start", e.to_string());
                if let Err(send) = self.messenger.send_group(&notice).await {
                    log::warn!("session {}: {}", self.id, send);
                }
                for member in &party {
                    self.messenger.member_left(member).await;
                }
                return Err(e);
            }
        };

        log::info!("session {}: roles assigned to {} players", self.id, game.party.len());
        if let Err(e) = self.messenger.open_game_channel(&game.party).await {
            self.abort_start(&game.party).await;
            return Err(e.into());
        }
        if let Err(e) = self.brief(&game).await {
            self.abort_start(&game.party).await;
            return Err(e);
        }

        self.game.lock().await.state = GameState::Playing;
        Ok(())
    }

    async fn abort_start(&self, party: &[PlayerId]) {
        self.game.lock().await.reset();
        for member in party {
            self.messenger.member_left(member).await;
        }
    }

    /// Private role reveals plus what each role knows from the start.
    async fn brief(&self, game: &Game) -> Result<(), GameError> {
        let mut dispatches = Vec::new();
        for player in game.party.iter().filter_map(|id| game.player(id)) {
            dispatches.push(Dispatch::Private(
                player.id.clone(),
                Notice::info(
                    "Your role",
                    format!(
                        "You are the {} ({}). {}",
                        player.role,
                        player.team,
                        player.role.description()
                    ),
                ),
            ));
        }

        let seer = game.living().find(|p| p.role == Role::Seer).map(|p| p.id.clone());
        for beholder in game.living().filter(|p| p.role == Role::Beholder) {
            let body = match &seer {
                Some(seer) => format!("The Seer is {}.", seer),
                None => "There is no Seer in this village.".to_string(),
            };
            dispatches.push(Dispatch::Private(beholder.id.clone(), Notice::info("You behold", body)));
        }

        let pack: Vec<PlayerId> = game.living().filter(|p| p.is_wolf_team()).map(|p| p.id.clone()).collect();
        if pack.len() > 1 {
            self.messenger.open_talk_channel("pack", &pack).await?;
            for wolf in &pack {
                dispatches.push(Dispatch::Private(
                    wolf.clone(),
                    Notice::info("Your pack", pack.join(", ")),
                ));
            }
        }

        self.deliver(dispatches).await?;
        self.messenger
            .send_group(&Notice::info(
                "The game begins",
                format!("{} players. Everyone has received their role.", game.party.len()),
            ))
            .await?;
        Ok(())
    }

    async fn play(&self) -> Result<VictoryReason, GameError> {
        loop {
            if let ControlFlow::Break(victory) = self.night().await? {
                return Ok(victory);
            }
            if let ControlFlow::Break(victory) = self.day().await? {
                return Ok(victory);
            }
        }
    }

    async fn night(&self) -> Result<ControlFlow<VictoryReason>, GameError> {
        let (prompts, duration) = {
            let mut game = self.game.lock().await;
            game.actions.clear();
            game.window = Window::Night;
            let living = game.living_ids();
            let prompts: Vec<(PlayerId, ActionKind, Vec<PlayerId>)> = living
                .iter()
                .filter_map(|id| night_ability(&game, id).map(|kind| (id.clone(), kind)))
                .map(|(id, kind)| {
                    let options = living.iter().filter(|o| **o != id).cloned().collect();
                    (id, kind, options)
                })
                .collect();
            (prompts, game.speed.scale(self.config.night_duration))
        };

        self.messenger
            .send_group(&Notice::info(
                "Night falls",
                "The village sleeps. Those with night abilities, check your messages.",
            ))
            .await?;

        let mut sent: Vec<PromptId> = Vec::new();
        for (id, kind, options) in prompts {
            let prompt = if kind == ActionKind::InvestigateLocation {
                self.messenger.prompt_location(&id, &Location::ALL).await
            } else {
                self.messenger.prompt_single(&id, kind, &options).await
            };
            match prompt {
                Ok(prompt) => sent.push(prompt),
                Err(e) => self.report_unreachable(&id, &e.to_string()).await?,
            }
        }
        self.game.lock().await.prompts = sent;

        self.timer.wait(Phase::Night, duration).await;

        let (report, prompts) = {
            let mut game = self.game.lock().await;
            game.window = Window::Closed;
            let prompts = std::mem::take(&mut game.prompts);
            let report: NightReport = night::resolve_night(&mut game, self.rng.as_ref(), self.config.pacing);
            (report, prompts)
        };
        self.delete_prompts(&prompts).await;
        self.deliver(report.dispatches).await?;
        Ok(report.flow)
    }

    async fn day(&self) -> Result<ControlFlow<VictoryReason>, GameError> {
        let (living, date, duration) = {
            let mut game = self.game.lock().await;
            game.calendar.advance();
            game.votes.clear();
            game.window = Window::Nominations;
            (
                game.living_ids(),
                game.calendar,
                game.speed.scale(self.config.day_duration),
            )
        };

        self.messenger
            .send_group(&Notice::info(
                date.to_string(),
                format!(
                    "The sun rises over the village. Still standing: {}.\nNominate whoever you want exiled.",
                    living.join(", ")
                ),
            ))
            .await?;
        let prompt = self.messenger.prompt_multi(&living).await?;
        self.game.lock().await.prompts = vec![prompt];

        self.timer.wait(Phase::Day, duration).await;

        let (report, prompts) = {
            let mut game = self.game.lock().await;
            game.window = Window::Closed;
            let prompts = std::mem::take(&mut game.prompts);
            let report = match game.pending_victory.take() {
                Some(victory) => {
                    game.votes.clear();
                    DayReport {
                        dispatches: Vec::new(),
                        verdict: vote::Verdict::NobodyVoted,
                        flow: ControlFlow::Break(victory),
                    }
                }
                None => vote::resolve_day(&mut game, self.rng.as_ref(), self.config.pacing),
            };
            (report, prompts)
        };
        self.delete_prompts(&prompts).await;
        log::debug!("session {}: day verdict {:?}", self.id, report.verdict);
        self.deliver(report.dispatches).await?;
        Ok(report.flow)
    }

    async fn finish(&self, outcome: Result<VictoryReason, GameError>) {
        let notice = {
            let game = self.game.lock().await;
            match &outcome {
                Ok(victory) => {
                    log::info!("session {}: {:?}", self.id, victory);
                    Notice::good("Game over", format!("{}\n\n{}", victory, game.roster(Some(victory))))
                }
                Err(e) => {
                    log::error!("session {}: game aborted: {}", self.id, e);
                    Notice::bad("Game aborted", format!("{}\n\n{}", e, game.roster(None)))
                }
            }
        };
        if let Err(e) = self.messenger.send_group(&notice).await {
            log::warn!("session {}: could not announce the end: {}", self.id, e);
        }
        if let Err(e) = self.messenger.archive_game_channel().await {
            log::warn!("session {}: could not archive the game channel: {}", self.id, e);
        }

        let party = {
            let mut game = self.game.lock().await;
            let party = std::mem::take(&mut game.party);
            game.reset();
            party
        };
        for member in &party {
            self.messenger.member_left(member).await;
        }
    }

    async fn delete_prompts(&self, prompts: &[PromptId]) {
        for prompt in prompts {
            if let Err(e) = self.messenger.delete_prompt(prompt).await {
                log::warn!("session {}: could not delete prompt {}: {}", self.id, prompt, e);
            }
        }
    }

    async fn report_unreachable(&self, player: &PlayerId, reason: &str) -> Result<(), GameError> {
        log::warn!("session {}: {} unreachable: {}", self.id, player, reason);
        self.messenger
            .send_group(&Notice::bad(
                "Message not delivered",
                format!(
                    "{} could not be reached privately. Check that direct messages are allowed.",
                    player
                ),
            ))
            .await?;
        Ok(())
    }

    /// Sends an outbox in order. Pauses are real sleeps. A failed private
    /// message is reported to the group and does not stop the rest.
    async fn deliver(&self, dispatches: Vec<Dispatch>) -> Result<(), GameError> {
        for dispatch in dispatches {
            match dispatch {
                Dispatch::Group(notice) => self.messenger.send_group(&notice).await?,
                Dispatch::Private(to, notice) => {
                    if let Err(e) = self.messenger.send_private(&to, &notice).await {
                        self.report_unreachable(&to, &e.to_string()).await?;
                    }
                }
                Dispatch::Pause(pause) => tokio::time::sleep(pause).await,
            }
        }
        Ok(())
    }
}
