//! Turn dispatcher.
//!
//! Owns the roster of player actors and the round-robin cursor. While idle it
//! holds the turn token; granting a turn moves the token to exactly one player and
//! nothing else is granted until the token comes back (or the stall timer gives
//! up on it and rolls the move back).

use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use log::{error, info, warn};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::config::GameSettings;
use crate::game::board::BoardModifierTable;
use crate::game::dice::DiceFactory;
use crate::game::state::PositionVector;
use crate::game::token::TurnToken;
use crate::game::types::PlayerId;
use crate::protocol::display::DisplayDriver;
use crate::protocol::handshake::{
    await_exit, await_readiness, ExitRecord, ExitSender, ExitStatus, ProcessIdentity,
    ProcessRole, ReadinessRecord, ReadySender,
};
use crate::protocol::messages::{
    AdvanceTurn, Completion, Dispatch, Drain, DrainReport, GrantTurn, Terminate, TurnAbandoned,
    TurnCompleted, TurnRolledBack,
};
use crate::protocol::player::PlayerActor;

/// First index at or after `cursor` (wrapping, one revolution at most) that is eligible.
pub fn next_eligible(cursor: usize, players: usize, eligible: impl Fn(usize) -> bool) -> Option<usize> {
    (0..players)
        .map(|step| (cursor + step) % players)
        .find(|index| eligible(*index))
}

struct RosterEntry {
    id: PlayerId,
    addr: Addr<PlayerActor>,
    arbiter: Arbiter,
    exit_rx: Option<oneshot::Receiver<ExitRecord>>,
    /// Stalled or unreachable; never granted a turn again.
    failed: bool,
}

struct Outstanding {
    seq: u64,
    player: PlayerId,
    snapshot: PositionVector,
    timer: SpawnHandle,
}

enum DispatchState {
    Idle(TurnToken),
    AwaitingCompletion(Outstanding),
    Draining,
}

pub struct TurnDispatcher {
    identity: ProcessIdentity,
    game_id: Uuid,
    players: usize,
    board: Arc<BoardModifierTable>,
    dice: Option<DiceFactory>,
    display: Addr<DisplayDriver>,
    coordinator: Recipient<TurnAbandoned>,
    turn_timeout: Duration,
    handshake_timeout: Duration,
    drain_timeout: Duration,
    roster: Vec<RosterEntry>,
    cursor: usize,
    state: DispatchState,
    ready_tx: Option<ReadySender>,
    exit_tx: Option<ExitSender>,
}

impl TurnDispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: &GameSettings,
        token: TurnToken,
        board: Arc<BoardModifierTable>,
        dice: DiceFactory,
        display: Addr<DisplayDriver>,
        coordinator: Recipient<TurnAbandoned>,
        ready_tx: ReadySender,
        exit_tx: ExitSender,
    ) -> Self {
        Self {
            identity: ProcessIdentity::new(ProcessRole::Dispatcher),
            game_id: token.game_id(),
            players: token.positions().players(),
            board,
            dice: Some(dice),
            display,
            coordinator,
            turn_timeout: settings.turn_timeout,
            handshake_timeout: settings.handshake_timeout,
            drain_timeout: settings.drain_timeout,
            roster: Vec::new(),
            cursor: 0,
            state: DispatchState::Idle(token),
            ready_tx: Some(ready_tx),
            exit_tx: Some(exit_tx),
        }
    }

    /// Start one player actor per roster slot, each on its own arbiter.
    fn spawn_players(&mut self) -> Vec<(PlayerId, oneshot::Receiver<ReadinessRecord>)> {
        let Some(dice) = self.dice.take() else {
            return Vec::new();
        };
        let mut pending = Vec::with_capacity(self.players);
        for index in 0..self.players {
            let id = PlayerId(index);
            let (ready_tx, ready_rx) = oneshot::channel();
            let (exit_tx, exit_rx) = oneshot::channel();
            let arbiter = Arbiter::new();
            let board = Arc::clone(&self.board);
            let source = dice(id);
            let display = self.display.clone().recipient();
            let addr = PlayerActor::start_in_arbiter(&arbiter.handle(), move |_| {
                PlayerActor::new(id, board, source, display, ready_tx, exit_tx)
            });
            self.roster.push(RosterEntry {
                id,
                addr,
                arbiter,
                exit_rx: Some(exit_rx),
                failed: false,
            });
            pending.push((id, ready_rx));
        }
        info!("[Dispatcher] Forked {} players", self.players);
        pending
    }

    fn is_eligible(&self, token: &TurnToken, index: usize) -> bool {
        !self.roster[index].failed && !token.positions().is_finished(PlayerId(index))
    }

    /// Grant the next eligible player the turn, skipping players whose mailbox is gone.
    fn grant_next(&mut self, mut token: TurnToken, ctx: &mut Context<Self>) -> Dispatch {
        loop {
            let Some(index) =
                next_eligible(self.cursor, self.players, |i| self.is_eligible(&token, i))
            else {
                self.state = DispatchState::Idle(token);
                return Dispatch::NoEligible;
            };

            let player = PlayerId(index);
            let snapshot = token.positions().clone();
            let seq = token.stamp();
            self.cursor = (index + 1) % self.players;

            match self.roster[index].addr.try_send(GrantTurn { seq, token }) {
                Ok(()) => {
                    let timer = ctx.run_later(self.turn_timeout, move |act, ctx| {
                        act.on_turn_stalled(seq, ctx);
                    });
                    self.state = DispatchState::AwaitingCompletion(Outstanding {
                        seq,
                        player,
                        snapshot,
                        timer,
                    });
                    info!("[Dispatcher] Turn #{} granted to player {}", seq, player);
                    return Dispatch::Granted { seq, player };
                }
                Err(SendError::Closed(grant)) | Err(SendError::Full(grant)) => {
                    warn!(
                        "[Dispatcher] Player {} unreachable, marking it failed",
                        player
                    );
                    self.roster[index].failed = true;
                    token = grant.token;
                }
            }
        }
    }

    /// The outstanding turn timed out: fail the player and roll its move back.
    fn on_turn_stalled(&mut self, seq: u64, _ctx: &mut Context<Self>) {
        let outstanding = match std::mem::replace(&mut self.state, DispatchState::Draining) {
            DispatchState::AwaitingCompletion(o) if o.seq == seq => o,
            other => {
                self.state = other;
                return;
            }
        };
        let player = outstanding.player;
        warn!(
            "[Dispatcher] Turn #{} for player {} stalled after {}ms; marking it failed",
            seq,
            player,
            self.turn_timeout.as_millis()
        );
        if let Some(entry) = self.roster.get_mut(player.index()) {
            entry.failed = true;
            entry.addr.do_send(Terminate);
        }
        self.display.do_send(TurnRolledBack {
            seq,
            positions: outstanding.snapshot.clone(),
        });
        let token = TurnToken::recover(self.game_id, seq, outstanding.snapshot);
        self.state = DispatchState::Idle(token);
        self.coordinator.do_send(TurnAbandoned { seq, player });
    }
}

impl Actor for TurnDispatcher {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let pending = self.spawn_players();
        let deadline = self.handshake_timeout;

        // Nothing else is handled until every player has reported in.
        ctx.wait(
            async move {
                for (id, rx) in pending {
                    await_readiness(ProcessRole::Player(id), rx, deadline).await?;
                }
                Ok::<(), crate::error::GameError>(())
            }
            .into_actor(self)
            .map(|result, act, ctx| match result {
                Ok(()) => {
                    info!("[Dispatcher] Players ready. Waiting for game commands...");
                    if let Some(tx) = act.ready_tx.take() {
                        let _ = tx.send(ReadinessRecord {
                            identity: act.identity,
                            detail: format!("{} players ready", act.players),
                        });
                    }
                }
                Err(e) => {
                    error!("[Dispatcher] {}", e);
                    // Dropping the sender tells the coordinator the handshake failed.
                    act.ready_tx.take();
                    ctx.stop();
                }
            }),
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        for entry in &self.roster {
            entry.arbiter.stop();
        }
        info!("[Dispatcher] Players parent terminating");
        if let Some(tx) = self.exit_tx.take() {
            let _ = tx.send(ExitRecord {
                identity: self.identity,
            });
        }
    }
}

impl Handler<AdvanceTurn> for TurnDispatcher {
    type Result = MessageResult<AdvanceTurn>;

    fn handle(&mut self, _: AdvanceTurn, ctx: &mut Self::Context) -> Self::Result {
        let token = match std::mem::replace(&mut self.state, DispatchState::Draining) {
            DispatchState::Idle(token) => token,
            DispatchState::AwaitingCompletion(outstanding) => {
                self.state = DispatchState::AwaitingCompletion(outstanding);
                return MessageResult(Dispatch::Busy);
            }
            DispatchState::Draining => return MessageResult(Dispatch::NoEligible),
        };
        MessageResult(self.grant_next(token, ctx))
    }
}

impl Handler<TurnCompleted> for TurnDispatcher {
    type Result = MessageResult<TurnCompleted>;

    fn handle(&mut self, msg: TurnCompleted, ctx: &mut Self::Context) -> Self::Result {
        let token = msg.token;
        let matches = matches!(
            &self.state,
            DispatchState::AwaitingCompletion(o) if o.seq == token.seq() && token.game_id() == self.game_id
        );
        if !matches {
            warn!(
                "[Dispatcher] Discarding stale completion for turn #{}",
                token.seq()
            );
            return MessageResult(Completion::Stale);
        }
        if let DispatchState::AwaitingCompletion(outstanding) =
            std::mem::replace(&mut self.state, DispatchState::Idle(token))
        {
            ctx.cancel_future(outstanding.timer);
        }
        MessageResult(Completion::Accepted)
    }
}

impl Handler<Drain> for TurnDispatcher {
    type Result = ResponseActFuture<Self, DrainReport>;

    fn handle(&mut self, _: Drain, ctx: &mut Self::Context) -> Self::Result {
        let token = match std::mem::replace(&mut self.state, DispatchState::Draining) {
            DispatchState::Idle(token) => Some(token),
            DispatchState::AwaitingCompletion(outstanding) => {
                ctx.cancel_future(outstanding.timer);
                warn!(
                    "[Dispatcher] Draining with turn #{} outstanding; rolling it back",
                    outstanding.seq
                );
                self.display.do_send(TurnRolledBack {
                    seq: outstanding.seq,
                    positions: outstanding.snapshot.clone(),
                });
                Some(TurnToken::recover(
                    self.game_id,
                    outstanding.seq,
                    outstanding.snapshot,
                ))
            }
            DispatchState::Draining => None,
        };

        info!("[Dispatcher] Terminating all players");
        let mut pending = Vec::with_capacity(self.roster.len());
        for entry in &mut self.roster {
            entry.addr.do_send(Terminate);
            pending.push((entry.id, entry.exit_rx.take()));
        }
        let deadline = self.drain_timeout;

        Box::pin(
            async move {
                let mut exits = Vec::with_capacity(pending.len());
                for (id, rx) in pending {
                    let status = match rx {
                        Some(rx) => await_exit(ProcessRole::Player(id), rx, deadline).await,
                        None => ExitStatus::Confirmed,
                    };
                    info!("[Dispatcher] Player {} terminated ({:?})", id, status);
                    exits.push((id, status));
                }
                exits
            }
            .into_actor(self)
            .map(move |exits, act, ctx| {
                // Stopping the arbiter also takes down a player that ignored Terminate.
                for entry in &act.roster {
                    entry.arbiter.stop();
                }
                ctx.stop();
                DrainReport { token, exits }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_skips_ineligible() {
        let finished = [false, false, true, false];
        let eligible = |i: usize| !finished[i];
        assert_eq!(next_eligible(0, 4, eligible), Some(0));
        assert_eq!(next_eligible(2, 4, eligible), Some(3));
        assert_eq!(next_eligible(3, 4, eligible), Some(3));
    }

    #[test]
    fn test_scan_wraps_once() {
        let eligible = |i: usize| i == 1;
        assert_eq!(next_eligible(2, 4, eligible), Some(1));
        assert_eq!(next_eligible(0, 4, |_| false), None);
    }

    #[test]
    fn test_round_robin_order() {
        // A, B, C, D with C finished cycles A, B, D.
        let finished = [false, false, true, false];
        let mut cursor = 0;
        let mut order = Vec::new();
        for _ in 0..6 {
            let index = next_eligible(cursor, 4, |i| !finished[i]).unwrap();
            order.push(PlayerId(index).letter());
            cursor = (index + 1) % 4;
        }
        assert_eq!(order, vec!['A', 'B', 'D', 'A', 'B', 'D']);
    }
}
