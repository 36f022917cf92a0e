//! Display driver.
//!
//! Owns no game state. Renders whatever snapshot the token carries when a move
//! completes, then acknowledges to the coordinator and passes the token along.
//! A turn the dispatcher has rolled back is never shown as current: a late
//! completion for it is dropped, and a frame already drawn is redrawn from the
//! rollback snapshot.

use std::collections::HashSet;
use std::sync::Arc;

use actix::prelude::*;
use log::{debug, info, warn};

use crate::config::RenderMode;
use crate::game::board::BoardModifierTable;
use crate::game::render::{render_frame, render_json};
use crate::game::state::PositionVector;
use crate::protocol::handshake::{
    ExitRecord, ExitSender, ProcessIdentity, ProcessRole, ReadinessRecord, ReadySender,
};
use crate::protocol::messages::{MoveCompleted, RenderDone, Terminate, TurnReport, TurnRolledBack};

pub struct DisplayDriver {
    identity: ProcessIdentity,
    board: Arc<BoardModifierTable>,
    mode: RenderMode,
    coordinator: Recipient<RenderDone>,
    /// Snapshot drawn once at startup, before any turn.
    initial: Option<PositionVector>,
    frames: u64,
    last_rendered: u64,
    /// Rolled-back turns whose completion has not shown up yet.
    rolled_back: HashSet<u64>,
    ready_tx: Option<ReadySender>,
    exit_tx: Option<ExitSender>,
}

impl DisplayDriver {
    pub fn new(
        board: Arc<BoardModifierTable>,
        mode: RenderMode,
        coordinator: Recipient<RenderDone>,
        initial: PositionVector,
        ready_tx: ReadySender,
        exit_tx: ExitSender,
    ) -> Self {
        Self {
            identity: ProcessIdentity::new(ProcessRole::Display),
            board,
            mode,
            coordinator,
            initial: Some(initial),
            frames: 0,
            last_rendered: 0,
            rolled_back: HashSet::new(),
            ready_tx: Some(ready_tx),
            exit_tx: Some(exit_tx),
        }
    }

    fn render(&mut self, seq: u64, positions: &PositionVector) {
        self.frames += 1;
        match self.mode {
            RenderMode::Text => println!("{}", render_frame(&self.board, positions)),
            RenderMode::Json => println!("{}", render_json(seq, positions)),
            RenderMode::Quiet => {}
        }
        debug!(
            "[Display] Frame {} rendered (turn #{}, {} remaining)",
            self.frames,
            seq,
            positions.remaining()
        );
    }
}

impl Actor for DisplayDriver {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        if let Some(initial) = self.initial.take() {
            self.render(0, &initial);
        }
        if let Some(tx) = self.ready_tx.take() {
            let _ = tx.send(ReadinessRecord {
                identity: self.identity,
                detail: "board rendered".to_string(),
            });
        }
        info!("[Display] Board ready. Waiting for game updates...");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("[Display] Terminating after {} frames", self.frames);
        if let Some(tx) = self.exit_tx.take() {
            let _ = tx.send(ExitRecord {
                identity: self.identity,
            });
        }
    }
}

impl Handler<MoveCompleted> for DisplayDriver {
    type Result = ();

    fn handle(&mut self, msg: MoveCompleted, _ctx: &mut Self::Context) -> Self::Result {
        let MoveCompleted { seq, record, token } = msg;
        if self.rolled_back.remove(&seq) {
            warn!("[Display] Dropping late completion of rolled-back turn #{}", seq);
            return;
        }
        self.render(seq, token.positions());
        self.last_rendered = seq;
        let report = TurnReport {
            seq,
            record,
            positions: token.positions().clone(),
        };
        self.coordinator.do_send(RenderDone { report, token });
    }
}

impl Handler<TurnRolledBack> for DisplayDriver {
    type Result = ();

    fn handle(&mut self, msg: TurnRolledBack, _ctx: &mut Self::Context) -> Self::Result {
        if self.last_rendered == msg.seq {
            warn!("[Display] Turn #{} was rolled back; redrawing the board", msg.seq);
            self.render(msg.seq, &msg.positions);
        } else {
            self.rolled_back.insert(msg.seq);
        }
    }
}

impl Handler<Terminate> for DisplayDriver {
    type Result = ();

    fn handle(&mut self, _: Terminate, ctx: &mut Self::Context) -> Self::Result {
        ctx.stop();
    }
}
