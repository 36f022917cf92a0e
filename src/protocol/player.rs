//! Player actor.
//!
//! Idle until granted a turn. Plays the turn on the token it was handed, passes
//! the token on to the display, and goes back to idle. A player that reaches the
//! terminal cell reports its completion and stops for good.

use std::sync::Arc;

use actix::prelude::*;
use log::{error, info};

use crate::game::board::BoardModifierTable;
use crate::game::dice::DiceSource;
use crate::game::movement::play_turn;
use crate::game::types::{MoveOutcome, PlayerId, TurnRecord};
use crate::protocol::handshake::{
    ExitRecord, ExitSender, ProcessIdentity, ProcessRole, ReadinessRecord, ReadySender,
};
use crate::protocol::messages::{GrantTurn, MoveCompleted, Terminate};

pub struct PlayerActor {
    id: PlayerId,
    identity: ProcessIdentity,
    board: Arc<BoardModifierTable>,
    dice: Box<dyn DiceSource>,
    display: Recipient<MoveCompleted>,
    ready_tx: Option<ReadySender>,
    exit_tx: Option<ExitSender>,
}

impl PlayerActor {
    pub fn new(
        id: PlayerId,
        board: Arc<BoardModifierTable>,
        dice: Box<dyn DiceSource>,
        display: Recipient<MoveCompleted>,
        ready_tx: ReadySender,
        exit_tx: ExitSender,
    ) -> Self {
        Self {
            id,
            identity: ProcessIdentity::new(ProcessRole::Player(id)),
            board,
            dice,
            display,
            ready_tx: Some(ready_tx),
            exit_tx: Some(exit_tx),
        }
    }

    fn log_turn(&self, record: &TurnRecord) {
        let rolls: Vec<String> = record.rolls.iter().map(|r| r.to_string()).collect();
        info!("[Player {}] (at {}): {}", self.id, record.from, rolls.join("+"));
        for hop in &record.hops {
            let kind = if hop.is_ladder() { "Ladder" } else { "Snake" };
            info!("[Player {}] {} at cell {} jump to {}", self.id, kind, hop.from, hop.to);
        }
        match &record.outcome {
            MoveOutcome::AlreadyFinished => {
                info!("[Player {}] Already finished, ignoring stale turn", self.id)
            }
            MoveOutcome::Cancelled => {
                info!("[Player {}] Cancelled, stays at cell {}", self.id, record.from)
            }
            MoveOutcome::Overshoot { target } => info!(
                "[Player {}] Move not permitted (cannot go beyond 100: {}), stays at {}",
                self.id, target, record.from
            ),
            MoveOutcome::OffBoard { target } => info!(
                "[Player {}] Move not permitted (cell {} is off the board), stays at {}",
                self.id, target, record.from
            ),
            MoveOutcome::Occupied { cell, by } => info!(
                "[Player {}] Move not permitted (cell {} already occupied by {}), stays at {}",
                self.id, cell, by, record.from
            ),
            MoveOutcome::Moved { to } => info!("[Player {}] Moves to cell {}", self.id, to),
            MoveOutcome::Finished { rank } => {
                info!("[Player {}] Exits with rank = {}", self.id, rank)
            }
        }
    }
}

impl Actor for PlayerActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        if let Some(tx) = self.ready_tx.take() {
            let _ = tx.send(ReadinessRecord {
                identity: self.identity,
                detail: format!("player {} initialized", self.id),
            });
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(tx) = self.exit_tx.take() {
            let _ = tx.send(ExitRecord {
                identity: self.identity,
            });
        }
    }
}

impl Handler<GrantTurn> for PlayerActor {
    type Result = ();

    fn handle(&mut self, msg: GrantTurn, ctx: &mut Self::Context) -> Self::Result {
        let GrantTurn { seq, mut token } = msg;
        let record = match play_turn(self.id, &mut token, &self.board, self.dice.as_mut()) {
            Ok(record) => record,
            Err(e) => {
                // The token dies with us; the dispatcher's stall timer recovers it.
                error!("[Player {}] Turn #{} aborted: {}", self.id, seq, e);
                ctx.stop();
                return;
            }
        };
        self.log_turn(&record);

        let finished = matches!(record.outcome, MoveOutcome::Finished { .. });
        self.display.do_send(MoveCompleted { seq, record, token });
        if finished {
            ctx.stop();
        }
    }
}

impl Handler<Terminate> for PlayerActor {
    type Result = ();

    fn handle(&mut self, _: Terminate, ctx: &mut Self::Context) -> Self::Result {
        info!("[Player {}] Terminating", self.id);
        ctx.stop();
    }
}
