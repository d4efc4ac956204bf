//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task and is reached only through its
//! command channel. Every mutation of members, scores, roles, and timers
//! happens inside that task, one command at a time, so round transitions
//! for a room are totally ordered without any lock.

use std::collections::HashMap;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tagrush_protocol::{Outcome, PlayerId, PlayerState, Position, RoomId, ServerMessage};
use tagrush_timer::{Deadline, Expiry};
use tokio::sync::{mpsc, oneshot};

use crate::round::{self, Trigger};
use crate::{Player, RoomConfig, RoomError, RoomPhase};

/// Channel sender for delivering outbound messages to one connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response; the rest are
/// fire-and-forget.
pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Replies with the number of members left.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<usize, RoomError>>,
    },

    Ready {
        player_id: PlayerId,
    },

    StartGame {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<GameStart, RoomError>>,
    },

    Moved {
        player_id: PlayerId,
        position: Position,
    },

    Collide {
        player_id: PlayerId,
        reported: PlayerId,
        round: Option<u64>,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    Players {
        reply: oneshot::Sender<Vec<PlayerState>>,
    },

    Shutdown,
}

/// A snapshot of room metadata.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub name: String,
    pub phase: RoomPhase,
    /// Rounds begun so far. A collision that wins the game does not begin
    /// one. Never decreases, not even across rematches.
    pub round: u64,
    pub player_count: usize,
    pub max_players: usize,
    /// Time left on the round-failure timeout, `None` when disarmed.
    pub round_time_left: Option<Duration>,
    /// Time left on the game-start delay, `None` when disarmed.
    pub start_time_left: Option<Duration>,
}

/// Reply to `startGame`: the requester's state and everyone else's.
#[derive(Debug, Clone, PartialEq)]
pub struct GameStart {
    pub me: PlayerState,
    pub others: Vec<PlayerState>,
}

/// Handle to a running room actor.
///
/// Cheap to clone; the registry keeps one per room and hands out clones
/// so callers can talk to a room without holding the registry lock.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Adds a player and registers its outbound channel with the room.
    pub async fn join(&self, player_id: PlayerId, sender: PlayerSender) -> Result<(), RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    /// Removes a player. Returns how many members remain.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Leave { player_id, reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    pub async fn ready(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.send(RoomCommand::Ready { player_id }).await
    }

    /// Resets the room for a new game and schedules the first round.
    pub async fn start_game(&self, player_id: PlayerId) -> Result<GameStart, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::StartGame { player_id, reply })
            .await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))?
    }

    pub async fn moved(&self, player_id: PlayerId, position: Position) -> Result<(), RoomError> {
        self.send(RoomCommand::Moved {
            player_id,
            position,
        })
        .await
    }

    /// Reports a catch. Stale or foreign reports are dropped by the room.
    pub async fn collide(
        &self,
        player_id: PlayerId,
        reported: PlayerId,
        round: Option<u64>,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Collide {
            player_id,
            reported,
            round,
        })
        .await
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Current state of every member, in member order.
    pub async fn players(&self) -> Result<Vec<PlayerState>, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Players { reply }).await?;
        rx.await.map_err(|_| RoomError::Unavailable(self.room_id))
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    name: String,
    config: RoomConfig,
    phase: RoomPhase,
    round: u64,
    /// Members in join order. Spawn and role assignment follow this order.
    players: Vec<Player>,
    senders: HashMap<PlayerId, PlayerSender>,
    start_timer: Deadline,
    round_timer: Deadline,
    rng: StdRng,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, name = %self.name, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                expiry = self.start_timer.expired() => self.on_start_delay_elapsed(expiry),
                expiry = self.round_timer.expired() => self.on_round_timeout(expiry),
            }
        }

        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                player_id,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_join(player_id, sender));
            }
            RoomCommand::Leave { player_id, reply } => {
                let _ = reply.send(self.handle_leave(player_id));
            }
            RoomCommand::Ready { player_id } => self.handle_ready(player_id),
            RoomCommand::StartGame { player_id, reply } => {
                let _ = reply.send(self.handle_start_game(player_id));
            }
            RoomCommand::Moved {
                player_id,
                position,
            } => self.handle_moved(player_id, position),
            RoomCommand::Collide {
                player_id,
                reported,
                round,
            } => self.handle_collide(player_id, reported, round),
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Players { reply } => {
                let _ = reply.send(self.players.iter().map(Player::state).collect());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_id = %self.room_id, "room shutting down");
                self.cancel_timers();
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    fn handle_join(&mut self, player_id: PlayerId, sender: PlayerSender) -> Result<(), RoomError> {
        if self.is_member(player_id) {
            return Err(RoomError::AlreadyInRoom(player_id, self.room_id));
        }
        if self.players.len() >= self.config.max_players() {
            return Err(RoomError::RoomFull(self.room_id));
        }

        self.players.push(Player::new(player_id));
        self.senders.insert(player_id, sender);
        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            players = self.players.len(),
            "player joined"
        );
        Ok(())
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<usize, RoomError> {
        let Some(index) = self.players.iter().position(|p| p.id == player_id) else {
            return Err(RoomError::NotInRoom(player_id, self.room_id));
        };
        self.players.remove(index);
        self.senders.remove(&player_id);

        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            players = self.players.len(),
            "player left"
        );

        // A departed member can't be chased or scheduled for; the game
        // stops and waits for a fresh startGame.
        self.cancel_timers();
        if self.phase.is_running() {
            for player in &mut self.players {
                player.is_it = false;
            }
            self.transition(RoomPhase::Idle);
        }

        Ok(self.players.len())
    }

    // -----------------------------------------------------------------------
    // Session entry points
    // -----------------------------------------------------------------------

    fn handle_ready(&mut self, player_id: PlayerId) {
        if !self.is_member(player_id) {
            tracing::debug!(room_id = %self.room_id, %player_id, "ready from non-member, ignoring");
            return;
        }
        tracing::debug!(room_id = %self.room_id, %player_id, "player ready");

        if self.players.len() == self.config.ready_players {
            tracing::info!(room_id = %self.room_id, "room full enough, initializing game");
            self.broadcast(&ServerMessage::InitGame);
        }
    }

    fn handle_start_game(&mut self, player_id: PlayerId) -> Result<GameStart, RoomError> {
        if !self.is_member(player_id) {
            return Err(RoomError::NotInRoom(player_id, self.room_id));
        }

        for player in &mut self.players {
            player.reset();
        }
        self.round_timer.cancel();
        self.transition(RoomPhase::Starting);
        self.start_timer.arm(self.config.start_delay);

        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            delay_ms = self.config.start_delay.as_millis() as u64,
            "game starting"
        );

        let mut me = None;
        let mut others = Vec::with_capacity(self.players.len().saturating_sub(1));
        for player in &self.players {
            if player.id == player_id {
                me = Some(player.state());
            } else {
                others.push(player.state());
            }
        }
        let me = me.ok_or(RoomError::NotInRoom(player_id, self.room_id))?;
        Ok(GameStart { me, others })
    }

    fn handle_moved(&mut self, player_id: PlayerId, position: Position) {
        let Some(player) = self.players.iter_mut().find(|p| p.id == player_id) else {
            return;
        };
        player.position = position;
        let state = player.state();
        self.broadcast_except(player_id, &ServerMessage::PlayerMoved(state));
    }

    /// Accepts a catch report only from the current chaser, about itself,
    /// for the round that is actually running.
    fn handle_collide(&mut self, player_id: PlayerId, reported: PlayerId, round: Option<u64>) {
        let stale = |reason: &'static str| {
            tracing::debug!(
                room_id = %self.room_id,
                %player_id,
                %reported,
                ?round,
                current_round = self.round,
                reason,
                "ignoring collision"
            );
        };

        if self.phase != RoomPhase::RoundActive {
            return stale("no active round");
        }
        if reported != player_id {
            return stale("reported chaser is not the sender");
        }
        if round.is_some_and(|r| r != self.round) {
            return stale("round already resolved");
        }
        if !self.players.iter().any(|p| p.id == player_id && p.is_it) {
            return stale("sender is not IT");
        }

        self.begin_round(Trigger::Collision);
    }

    // -----------------------------------------------------------------------
    // Round coordination
    // -----------------------------------------------------------------------

    fn on_start_delay_elapsed(&mut self, expiry: Expiry) {
        if self.phase != RoomPhase::Starting {
            tracing::debug!(
                room_id = %self.room_id,
                generation = expiry.generation,
                phase = %self.phase,
                "stale start delay"
            );
            return;
        }
        self.begin_round(Trigger::Start);
    }

    fn on_round_timeout(&mut self, expiry: Expiry) {
        if self.phase != RoomPhase::RoundActive {
            tracing::debug!(
                room_id = %self.room_id,
                generation = expiry.generation,
                phase = %self.phase,
                "stale round timeout"
            );
            return;
        }
        if let Some(it) = round::penalize_it(&mut self.players) {
            tracing::info!(
                room_id = %self.room_id,
                round = self.round,
                %it,
                late_ms = expiry.late_by.as_millis() as u64,
                "round timed out"
            );
        }
        self.begin_round(Trigger::Timeout);
    }

    /// Resolves the current round (if any) and starts the next one.
    fn begin_round(&mut self, trigger: Trigger) {
        self.round_timer.cancel();

        if self.check_score(false) {
            tracing::debug!(room_id = %self.room_id, %trigger, "game already won, not starting a round");
            return;
        }

        if self.players.len() < self.config.min_players {
            tracing::debug!(
                room_id = %self.room_id,
                players = self.players.len(),
                min = self.config.min_players,
                "not enough players for a round"
            );
            self.start_timer.cancel();
            if self.phase.is_running() {
                self.transition(RoomPhase::Idle);
            }
            return;
        }

        round::assign_spawns(&mut self.players, &self.config.spawn_points, &mut self.rng);
        let it = round::rotate_roles(&mut self.players, trigger == Trigger::Collision);

        let it_count = round::it_count(&self.players);
        if it_count != 1 {
            tracing::error!(
                room_id = %self.room_id,
                round = self.round + 1,
                it_count,
                "round began without exactly one IT"
            );
            debug_assert_eq!(it_count, 1, "round began without exactly one IT");
        }

        // A winning collision ends the game without counting a new round.
        if self.check_score(true) {
            return;
        }

        self.round += 1;
        self.transition(RoomPhase::RoundActive);
        self.broadcast(&ServerMessage::RoundStarted {
            round: self.round,
            players: round::snapshot(&self.players),
        });
        self.round_timer.arm(self.config.round_timeout);

        tracing::info!(
            room_id = %self.room_id,
            round = self.round,
            %trigger,
            it = ?it,
            "round started"
        );
    }

    /// Returns `true` if some member reached the win score. With
    /// `notify`, ends the game: every member learns whether they won,
    /// and all timers are canceled.
    fn check_score(&mut self, notify: bool) -> bool {
        let Some(winner) = round::find_winner(&self.players, self.config.win_score) else {
            return false;
        };

        if notify {
            self.cancel_timers();
            self.transition(RoomPhase::GameOver);
            for player in &self.players {
                let outcome = if player.id == winner {
                    Outcome::Won
                } else {
                    Outcome::Lost
                };
                self.send_to(player.id, ServerMessage::GameOver { outcome, winner });
            }
            tracing::info!(room_id = %self.room_id, %winner, round = self.round, "game over");
        }

        true
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn transition(&mut self, to: RoomPhase) {
        if self.phase == to {
            return;
        }
        debug_assert!(
            self.phase.can_transition_to(to),
            "illegal room transition {} -> {}",
            self.phase,
            to
        );
        tracing::debug!(room_id = %self.room_id, from = %self.phase, %to, "phase change");
        self.phase = to;
    }

    fn cancel_timers(&mut self) {
        self.start_timer.cancel();
        self.round_timer.cancel();
    }

    fn is_member(&self, player_id: PlayerId) -> bool {
        self.senders.contains_key(&player_id)
    }

    fn broadcast(&self, msg: &ServerMessage) {
        for player in &self.players {
            self.send_to(player.id, msg.clone());
        }
    }

    fn broadcast_except(&self, excluded: PlayerId, msg: &ServerMessage) {
        for player in self.players.iter().filter(|p| p.id != excluded) {
            self.send_to(player.id, msg.clone());
        }
    }

    /// Drops the message if the connection's writer is gone; its
    /// disconnect cleanup will remove the member shortly.
    fn send_to(&self, player_id: PlayerId, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&player_id) {
            if sender.send(msg).is_err() {
                tracing::debug!(room_id = %self.room_id, %player_id, "outbound channel closed");
            }
        }
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.room_id,
            name: self.name.clone(),
            phase: self.phase,
            round: self.round,
            player_count: self.players.len(),
            max_players: self.config.max_players(),
            round_time_left: self.round_timer.remaining(),
            start_time_left: self.start_timer.remaining(),
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_room(
    room_id: RoomId,
    name: String,
    config: RoomConfig,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);

    let actor = RoomActor {
        room_id,
        name,
        config,
        phase: RoomPhase::Idle,
        round: 0,
        players: Vec::new(),
        senders: HashMap::new(),
        start_timer: Deadline::new("start"),
        round_timer: Deadline::new("round"),
        rng: StdRng::from_rng(&mut rand::rng()),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        sender: tx,
    }
}
