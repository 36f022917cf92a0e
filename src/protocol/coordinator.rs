//! Coordinator actor.
//!
//! Creates the shared state, spawns the display driver and the turn dispatcher
//! (which spawns the players), runs the startup rendezvous, serves operator
//! commands one turn at a time, and owns the ordered wind-down.

use std::time::Duration;

use actix::prelude::*;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::config::GameSettings;
use crate::error::GameError;
use crate::game::board::BoardModifierTable;
use crate::game::dice::DiceFactory;
use crate::game::state::{FinalStandings, PositionVector, SharedGameState};
use crate::game::token::TurnToken;
use crate::game::types::PlayerId;
use crate::protocol::command::{Command, CommandReply};
use crate::protocol::dispatcher::TurnDispatcher;
use crate::protocol::display::DisplayDriver;
use crate::protocol::handshake::{
    await_exit, await_readiness, ExitRecord, ExitStatus, ProcessRole, ReadinessRecord,
};
use crate::protocol::messages::{
    AdvanceTurn, Completion, Dispatch, Drain, RenderDone, Terminate, TurnAbandoned, TurnCompleted,
    TurnReport,
};

/// How the game ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub turns_played: u64,
    pub positions: PositionVector,
    pub standings: Vec<(PlayerId, u32)>,
    /// Players dropped by the stall supervisor.
    pub failed: Vec<PlayerId>,
}

/// Wait until the game is over (used once autoplay is running).
#[derive(Message)]
#[rtype(result = "Result<GameSummary, GameError>")]
pub struct AwaitGameOver;

/// Stop every actor in order and reclaim the shared state.
#[derive(Message)]
#[rtype(result = "Result<FinalStandings, GameError>")]
pub struct Shutdown;

#[derive(Message)]
#[rtype(result = "Result<(), GameError>")]
struct Boot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Ready,
    ShuttingDown,
    Stopped,
}

/// A spawned actor, its thread, and the channel its exit record arrives on.
struct Spawned<A: Actor> {
    addr: Addr<A>,
    arbiter: Arbiter,
    exit_rx: Option<oneshot::Receiver<ExitRecord>>,
}

enum TurnResolution {
    Played(TurnReport),
    Abandoned(TurnAbandoned),
}

enum Step {
    Turn(TurnResolution),
    NoEligible,
}

pub struct Coordinator {
    settings: GameSettings,
    shared: Option<SharedGameState>,
    /// Held until the dispatcher is spawned.
    token: Option<TurnToken>,
    dice: Option<DiceFactory>,
    display: Option<Spawned<DisplayDriver>>,
    dispatcher: Option<Spawned<TurnDispatcher>>,
    phase: Phase,
    pending: Option<oneshot::Sender<TurnResolution>>,
    /// Highest turn sequence already resolved; anything at or below it is stale.
    last_seq: u64,
    last_positions: PositionVector,
    turns_played: u64,
    failed: Vec<PlayerId>,
    autoplay: bool,
    autoplay_delay: Duration,
    autoplay_timer: Option<SpawnHandle>,
    game_over: Option<GameSummary>,
    game_over_waiters: Vec<oneshot::Sender<GameSummary>>,
}

impl Coordinator {
    fn new(
        settings: GameSettings,
        shared: SharedGameState,
        token: TurnToken,
        dice: DiceFactory,
    ) -> Self {
        Self {
            autoplay_delay: settings.autoplay_delay,
            last_positions: token.positions().clone(),
            settings,
            shared: Some(shared),
            token: Some(token),
            dice: Some(dice),
            display: None,
            dispatcher: None,
            phase: Phase::Created,
            pending: None,
            last_seq: 0,
            turns_played: 0,
            failed: Vec::new(),
            autoplay: false,
            autoplay_timer: None,
            game_over: None,
            game_over_waiters: Vec::new(),
        }
    }

    /// Start a game with every player at the start cell.
    pub async fn launch(
        settings: GameSettings,
        board: BoardModifierTable,
        dice: DiceFactory,
    ) -> Result<Addr<Self>, GameError> {
        let positions = PositionVector::new(settings.players);
        Self::launch_with_positions(settings, board, positions, dice).await
    }

    /// Start a game from the given positions.
    pub async fn launch_with_positions(
        settings: GameSettings,
        board: BoardModifierTable,
        positions: PositionVector,
        dice: DiceFactory,
    ) -> Result<Addr<Self>, GameError> {
        let (shared, token) = SharedGameState::create(board, positions)?;
        let addr = Coordinator::new(settings, shared, token, dice).start();
        addr.send(Boot).await??;
        Ok(addr)
    }

    fn spawn_display(
        &mut self,
        ctx: &mut Context<Self>,
    ) -> Result<oneshot::Receiver<ReadinessRecord>, GameError> {
        let board = self
            .shared
            .as_ref()
            .map(SharedGameState::board)
            .ok_or_else(|| GameError::Setup("shared game state is gone".to_string()))?;
        let initial = self
            .token
            .as_ref()
            .map(|token| token.positions().clone())
            .ok_or_else(|| GameError::Setup("turn token is gone".to_string()))?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let arbiter = Arbiter::new();
        let mode = self.settings.render;
        let me = ctx.address().recipient::<RenderDone>();
        let addr = DisplayDriver::start_in_arbiter(&arbiter.handle(), move |_| {
            DisplayDriver::new(board, mode, me, initial, ready_tx, exit_tx)
        });
        self.display = Some(Spawned {
            addr,
            arbiter,
            exit_rx: Some(exit_rx),
        });
        Ok(ready_rx)
    }

    fn spawn_dispatcher(
        &mut self,
        ctx: &mut Context<Self>,
    ) -> Result<oneshot::Receiver<ReadinessRecord>, GameError> {
        let display = self
            .display
            .as_ref()
            .map(|display| display.addr.clone())
            .ok_or_else(|| GameError::Setup("display driver is not running".to_string()))?;
        let board = self
            .shared
            .as_ref()
            .map(SharedGameState::board)
            .ok_or_else(|| GameError::Setup("shared game state is gone".to_string()))?;
        let (Some(token), Some(dice)) = (self.token.take(), self.dice.take()) else {
            return Err(GameError::Setup("dispatcher already spawned".to_string()));
        };

        let (ready_tx, ready_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let arbiter = Arbiter::new();
        let settings = self.settings.clone();
        let me = ctx.address().recipient::<TurnAbandoned>();
        let addr = TurnDispatcher::start_in_arbiter(&arbiter.handle(), move |_| {
            TurnDispatcher::new(&settings, token, board, dice, display, me, ready_tx, exit_tx)
        });
        self.dispatcher = Some(Spawned {
            addr,
            arbiter,
            exit_rx: Some(exit_rx),
        });
        Ok(ready_rx)
    }

    /// Tear down whatever startup managed to spawn, then release the state and fail with `error`.
    fn abort_startup(&mut self, error: GameError) -> ResponseActFuture<Self, Result<(), GameError>> {
        self.phase = Phase::ShuttingDown;
        let dispatcher = self.dispatcher.take();
        let display = self.display.take();
        let deadline = self.settings.drain_timeout;

        Box::pin(
            wind_down(dispatcher, display, deadline)
                .into_actor(self)
                .map(move |token, act, ctx| -> Result<(), GameError> {
                    let token = token.or_else(|| act.token.take());
                    if let Some(shared) = act.shared.take() {
                        shared.reclaim(token);
                    }
                    act.phase = Phase::Stopped;
                    ctx.stop();
                    Err(error)
                }),
        )
    }

    /// Settle the pending turn, unless `seq` was already settled.
    fn resolve(&mut self, seq: u64, resolution: TurnResolution) {
        if seq <= self.last_seq {
            warn!("[Coordinator] Ignoring late news of turn #{}", seq);
            return;
        }
        self.last_seq = seq;
        match self.pending.take() {
            Some(tx) => {
                let _ = tx.send(resolution);
            }
            None => warn!("[Coordinator] Turn #{} settled with no turn pending", seq),
        }
    }

    /// Ask the dispatcher for one turn and wait for the display's acknowledgment.
    fn advance(
        &mut self,
        _ctx: &mut Context<Self>,
    ) -> ResponseActFuture<Self, Result<CommandReply, GameError>> {
        if let Some(summary) = &self.game_over {
            return Box::pin(fut::ready(Ok(CommandReply::GameOver(summary.clone()))));
        }
        if self.pending.is_some() {
            return Box::pin(fut::ready(Err(GameError::TurnInFlight)));
        }
        let dispatcher = match (&self.dispatcher, self.phase) {
            (Some(dispatcher), Phase::Ready) => dispatcher.addr.clone(),
            _ => {
                return Box::pin(fut::ready(Err(GameError::Shell(
                    "the game is not running".to_string(),
                ))));
            }
        };

        let (tx, rx) = oneshot::channel();
        self.pending = Some(tx);
        // The dispatcher gives up on a stalled player first; this only fires if it cannot.
        let guard = self.settings.turn_timeout * 2;

        Box::pin(
            async move {
                match dispatcher.send(AdvanceTurn).await? {
                    Dispatch::Granted { seq, .. } => match tokio::time::timeout(guard, rx).await {
                        Ok(Ok(resolution)) => Ok(Step::Turn(resolution)),
                        Ok(Err(_)) | Err(_) => Err(GameError::ProtocolStall { seq }),
                    },
                    Dispatch::NoEligible => Ok(Step::NoEligible),
                    Dispatch::Busy => Err(GameError::TurnInFlight),
                }
            }
            .into_actor(self)
            .map(|result, act, _ctx| -> Result<CommandReply, GameError> {
                act.pending = None;
                match result? {
                    Step::Turn(TurnResolution::Played(report)) => {
                        act.turns_played += 1;
                        act.last_positions = report.positions.clone();
                        Ok(CommandReply::Turn(report))
                    }
                    Step::Turn(TurnResolution::Abandoned(abandoned)) => {
                        act.failed.push(abandoned.player);
                        Ok(CommandReply::Stalled {
                            seq: abandoned.seq,
                            player: abandoned.player,
                        })
                    }
                    Step::NoEligible => Ok(CommandReply::GameOver(act.finish_game())),
                }
            }),
        )
    }

    fn finish_game(&mut self) -> GameSummary {
        if let Some(summary) = &self.game_over {
            return summary.clone();
        }
        let summary = GameSummary {
            turns_played: self.turns_played,
            positions: self.last_positions.clone(),
            standings: self.last_positions.standings(),
            failed: self.failed.clone(),
        };
        info!(
            "[Coordinator] GAME OVER after {} turns ({} players remaining)",
            summary.turns_played,
            summary.positions.remaining()
        );
        for waiter in self.game_over_waiters.drain(..) {
            let _ = waiter.send(summary.clone());
        }
        self.game_over = Some(summary.clone());
        summary
    }

    fn schedule_autoplay(&mut self, ctx: &mut Context<Self>) {
        let handle = ctx.run_later(self.autoplay_delay, |act, ctx| act.autoplay_tick(ctx));
        self.autoplay_timer = Some(handle);
    }

    fn autoplay_tick(&mut self, ctx: &mut Context<Self>) {
        self.autoplay_timer = None;
        if self.phase != Phase::Ready || self.game_over.is_some() {
            return;
        }
        if self.pending.is_some() {
            self.schedule_autoplay(ctx);
            return;
        }
        let turn = self.advance(ctx);
        ctx.spawn(turn.map(|result, act, ctx| match result {
            Ok(CommandReply::GameOver(_)) => {}
            Ok(_) | Err(GameError::TurnInFlight) => act.schedule_autoplay(ctx),
            Err(e) => {
                error!("[Coordinator] Autoplay stopped: {}", e);
                act.finish_game();
            }
        }));
    }
}

impl Actor for Coordinator {
    type Context = Context<Self>;

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!("[Coordinator] Stopped");
    }
}

impl Handler<Boot> for Coordinator {
    type Result = ResponseActFuture<Self, Result<(), GameError>>;

    fn handle(&mut self, _: Boot, ctx: &mut Self::Context) -> Self::Result {
        let deadline = self.settings.handshake_timeout;
        let display_rx = self.spawn_display(ctx);

        Box::pin(
            async move { await_readiness(ProcessRole::Display, display_rx?, deadline).await }
                .into_actor(self)
                .then(move |display_ready, act, ctx| {
                    // The dispatcher is only spawned once the display is known to be up.
                    let pending = display_ready
                        .and_then(|record| act.spawn_dispatcher(ctx).map(|rx| (record, rx)));
                    async move {
                        let (display, rx) = pending?;
                        let dispatcher =
                            await_readiness(ProcessRole::Dispatcher, rx, deadline).await?;
                        Ok::<_, GameError>((display, dispatcher))
                    }
                    .into_actor(act)
                })
                .then(
                    |result, act, _ctx| -> ResponseActFuture<Self, Result<(), GameError>> {
                        match result {
                            Ok((display, dispatcher)) => {
                                info!(
                                    "[Coordinator] Received display readiness ({}) and dispatcher readiness ({}: {})",
                                    display.identity.instance,
                                    dispatcher.identity.instance,
                                    dispatcher.detail
                                );
                                if let Some(shared) = &act.shared {
                                    info!("[Coordinator] Game {} is ready", shared.game_id());
                                }
                                act.phase = Phase::Ready;
                                Box::pin(fut::ready(Ok(())))
                            }
                            Err(e) => {
                                error!("[Coordinator] Startup aborted: {}", e);
                                act.abort_startup(e)
                            }
                        }
                    },
                ),
        )
    }
}

impl Handler<Command> for Coordinator {
    type Result = ResponseActFuture<Self, Result<CommandReply, GameError>>;

    fn handle(&mut self, msg: Command, ctx: &mut Self::Context) -> Self::Result {
        let reply = match msg {
            Command::AdvanceTurn => return self.advance(ctx),
            Command::SetDelay(_) if self.autoplay => Err(GameError::Shell(
                "the delay cannot be changed after autoplay begins".to_string(),
            )),
            Command::SetDelay(delay_ms) => {
                self.autoplay_delay = Duration::from_millis(delay_ms);
                info!("[Coordinator] Delay set to {}ms", delay_ms);
                Ok(CommandReply::DelaySet { delay_ms })
            }
            Command::AutoplayStart if self.autoplay => {
                Err(GameError::Shell("autoplay is already running".to_string()))
            }
            Command::AutoplayStart => match &self.game_over {
                Some(_) => Err(GameError::GameOver),
                None if self.phase != Phase::Ready => {
                    Err(GameError::Shell("the game is not running".to_string()))
                }
                None => {
                    self.autoplay = true;
                    let delay_ms = self.autoplay_delay.as_millis() as u64;
                    info!("[Coordinator] Starting autoplay (delay: {}ms)...", delay_ms);
                    self.schedule_autoplay(ctx);
                    Ok(CommandReply::AutoplayStarted { delay_ms })
                }
            },
            Command::Quit if self.autoplay => Err(GameError::Shell(
                "the game cannot be quit once autoplay has started".to_string(),
            )),
            Command::Quit => Ok(CommandReply::QuitAccepted),
        };
        Box::pin(fut::ready(reply))
    }
}

impl Handler<RenderDone> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: RenderDone, ctx: &mut Self::Context) -> Self::Result {
        let RenderDone { report, token } = msg;
        let Some(dispatcher) = self.dispatcher.as_ref().map(|d| d.addr.clone()) else {
            warn!("[Coordinator] Dropping token for turn #{}: no dispatcher", report.seq);
            return;
        };
        // The turn counts only if the dispatcher takes the token back; a rolled-back
        // turn is settled by its TurnAbandoned instead.
        ctx.spawn(
            async move { dispatcher.send(TurnCompleted { token }).await }
                .into_actor(self)
                .map(move |verdict, act, _ctx| match verdict {
                    Ok(Completion::Accepted) => {
                        act.resolve(report.seq, TurnResolution::Played(report))
                    }
                    Ok(Completion::Stale) => warn!(
                        "[Coordinator] Render of turn #{} arrived after it was rolled back",
                        report.seq
                    ),
                    Err(e) => warn!(
                        "[Coordinator] Could not return the token of turn #{}: {}",
                        report.seq, e
                    ),
                }),
        );
    }
}

impl Handler<TurnAbandoned> for Coordinator {
    type Result = ();

    fn handle(&mut self, msg: TurnAbandoned, _ctx: &mut Self::Context) -> Self::Result {
        warn!(
            "[Coordinator] Player {} stalled on turn #{}; continuing without it",
            msg.player, msg.seq
        );
        self.resolve(msg.seq, TurnResolution::Abandoned(msg));
    }
}

impl Handler<AwaitGameOver> for Coordinator {
    type Result = ResponseFuture<Result<GameSummary, GameError>>;

    fn handle(&mut self, _: AwaitGameOver, _ctx: &mut Self::Context) -> Self::Result {
        if let Some(summary) = &self.game_over {
            let summary = summary.clone();
            return Box::pin(async move { Ok(summary) });
        }
        let (tx, rx) = oneshot::channel();
        self.game_over_waiters.push(tx);
        Box::pin(async move {
            rx.await
                .map_err(|_| GameError::Shell("the game was shut down before it ended".to_string()))
        })
    }
}

impl Handler<Shutdown> for Coordinator {
    type Result = ResponseActFuture<Self, Result<FinalStandings, GameError>>;

    fn handle(&mut self, _: Shutdown, ctx: &mut Self::Context) -> Self::Result {
        if matches!(self.phase, Phase::ShuttingDown | Phase::Stopped) {
            return Box::pin(fut::ready(Err(GameError::Shell(
                "shutdown already in progress".to_string(),
            ))));
        }
        self.phase = Phase::ShuttingDown;
        if let Some(timer) = self.autoplay_timer.take() {
            ctx.cancel_future(timer);
        }

        let dispatcher = self.dispatcher.take();
        let display = self.display.take();
        let deadline = self.settings.drain_timeout;

        Box::pin(
            wind_down(dispatcher, display, deadline)
            .into_actor(self)
            .map(|token, act, ctx| -> Result<FinalStandings, GameError> {
                let token = token.or_else(|| act.token.take());
                let shared = act
                    .shared
                    .take()
                    .ok_or_else(|| GameError::Shell("shared game state already reclaimed".to_string()))?;
                let standings = shared.reclaim(token);
                info!("[Coordinator] Cleanup complete. Game ends here.");
                act.phase = Phase::Stopped;
                ctx.stop();
                Ok(standings)
            }),
        )
    }
}

/// Drain the dispatcher (and with it every player), then stop the display.
/// Yields the token if the dispatcher handed it back.
async fn wind_down(
    dispatcher: Option<Spawned<TurnDispatcher>>,
    display: Option<Spawned<DisplayDriver>>,
    deadline: Duration,
) -> Option<TurnToken> {
    let mut token = None;

    if let Some(dispatcher) = dispatcher {
        match dispatcher.addr.send(Drain).await {
            Ok(report) => {
                let unconfirmed = report
                    .exits
                    .iter()
                    .filter(|(_, status)| *status != ExitStatus::Confirmed)
                    .count();
                if unconfirmed > 0 {
                    warn!("[Coordinator] {} players were force-stopped", unconfirmed);
                }
                token = report.token;
            }
            Err(e) => warn!("[Coordinator] Dispatcher unreachable during drain: {}", e),
        }
        let status = match dispatcher.exit_rx {
            Some(rx) => await_exit(ProcessRole::Dispatcher, rx, deadline).await,
            None => ExitStatus::Vanished,
        };
        dispatcher.arbiter.stop();
        info!("[Coordinator] Players process terminated ({:?})", status);
    }

    if let Some(display) = display {
        display.addr.do_send(Terminate);
        let status = match display.exit_rx {
            Some(rx) => await_exit(ProcessRole::Display, rx, deadline).await,
            None => ExitStatus::Vanished,
        };
        display.arbiter.stop();
        info!("[Coordinator] Board process terminated ({:?})", status);
    }

    token
}
