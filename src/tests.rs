//! End-to-end games through the coordinator, with scripted dice and no rendering.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use actix::prelude::*;

use crate::config::{GameSettings, RenderMode};
use crate::error::GameError;
use crate::game::board::BoardModifierTable;
use crate::game::dice::{DiceFactory, DiceSource, ScriptedDice};
use crate::game::layout::load_layout;
use crate::game::state::PositionVector;
use crate::game::types::{Cell, MoveOutcome, PlayerId};
use crate::protocol::command::{Command, CommandReply};
use crate::protocol::coordinator::{AwaitGameOver, Coordinator, Shutdown};
use crate::protocol::handshake::ProcessRole;
use crate::protocol::messages::TurnReport;

fn quiet(players: usize) -> GameSettings {
    let mut settings = GameSettings::with_players(players);
    settings.render = RenderMode::Quiet;
    settings.turn_timeout = Duration::from_millis(300);
    settings.handshake_timeout = Duration::from_millis(2000);
    settings.drain_timeout = Duration::from_millis(500);
    settings
}

async fn start_at(cells: &[Cell], board: BoardModifierTable, scripts: Vec<Vec<u8>>) -> Addr<Coordinator> {
    let positions = PositionVector::from_cells(cells).unwrap();
    Coordinator::launch_with_positions(quiet(cells.len()), board, positions, ScriptedDice::factory(scripts))
        .await
        .expect("game failed to start")
}

async fn advance(addr: &Addr<Coordinator>) -> Result<CommandReply, GameError> {
    addr.send(Command::AdvanceTurn).await.unwrap()
}

/// Scripted rolls that each take `delay` to produce.
struct SlowDice {
    delay: Duration,
    inner: ScriptedDice,
}

impl DiceSource for SlowDice {
    fn roll(&mut self) -> Result<u8, GameError> {
        std::thread::sleep(self.delay);
        self.inner.roll()
    }
}

/// Scripted dice where player A is slow to roll.
fn slow_first_player(delay: Duration, scripts: Vec<Vec<u8>>) -> DiceFactory {
    Box::new(move |player: PlayerId| -> Box<dyn DiceSource> {
        let inner = ScriptedDice::new(scripts.get(player.index()).cloned().unwrap_or_default());
        if player.index() == 0 {
            Box::new(SlowDice { delay, inner })
        } else {
            Box::new(inner)
        }
    })
}

fn played(reply: Result<CommandReply, GameError>) -> TurnReport {
    match reply {
        Ok(CommandReply::Turn(report)) => report,
        other => panic!("expected a played turn, got {other:?}"),
    }
}

#[actix::test]
async fn test_triple_six_keeps_player_in_place() {
    let addr = Coordinator::launch(
        quiet(4),
        BoardModifierTable::empty(),
        ScriptedDice::factory(vec![vec![6, 6, 6]]),
    )
    .await
    .unwrap();

    let report = played(advance(&addr).await);
    assert_eq!(report.seq, 1);
    assert_eq!(report.record.player, PlayerId(0));
    assert_eq!(report.record.outcome, MoveOutcome::Cancelled);
    assert_eq!(report.positions.position(PlayerId(0)), 0);
    assert_eq!(report.positions.remaining(), 4);

    let standings = addr.send(Shutdown).await.unwrap().unwrap();
    let positions = standings.positions.unwrap();
    assert!(positions.iter().all(|(_, cell)| cell == 0));
    assert!(standings.standings.is_empty());
}

#[actix::test]
async fn test_overshoot_still_reaches_the_display() {
    let addr = start_at(&[97, 0], BoardModifierTable::empty(), vec![vec![5]]).await;

    let report = played(advance(&addr).await);
    assert_eq!(report.record.outcome, MoveOutcome::Overshoot { target: 102 });
    assert_eq!(report.positions.position(PlayerId(0)), 97);

    addr.send(Shutdown).await.unwrap().unwrap();
}

#[actix::test]
async fn test_ladder_from_bundled_layout() {
    let board = load_layout(concat!(env!("CARGO_MANIFEST_DIR"), "/boards/ludo.txt")).unwrap();
    let addr = start_at(&[0, 0], board, vec![vec![4]]).await;

    let report = played(advance(&addr).await);
    assert_eq!(report.record.hops.len(), 1);
    assert_eq!(report.record.outcome, MoveOutcome::Moved { to: 14 });

    let standings = addr.send(Shutdown).await.unwrap().unwrap();
    assert_eq!(standings.positions.unwrap().position(PlayerId(0)), 14);
}

#[actix::test]
async fn test_round_robin_skips_finished_player() {
    let scripts = vec![vec![1; 4], vec![1; 4], vec![], vec![1; 4]];
    let addr = start_at(&[0, 10, 100, 20], BoardModifierTable::empty(), scripts).await;

    let mut order = Vec::new();
    for _ in 0..6 {
        order.push(played(advance(&addr).await).record.player.letter());
    }
    assert_eq!(order, vec!['A', 'B', 'D', 'A', 'B', 'D']);

    let positions = addr.send(Shutdown).await.unwrap().unwrap().positions.unwrap();
    assert_eq!(positions.position(PlayerId(0)), 2);
    assert_eq!(positions.position(PlayerId(1)), 12);
    assert_eq!(positions.position(PlayerId(3)), 22);
    assert_eq!(positions.rank(PlayerId(2)), Some(1));
}

#[actix::test]
async fn test_occupied_target_is_refused() {
    let addr = start_at(&[1, 3], BoardModifierTable::empty(), vec![vec![2], vec![2]]).await;

    let first = played(advance(&addr).await);
    assert_eq!(
        first.record.outcome,
        MoveOutcome::Occupied { cell: 3, by: PlayerId(1) }
    );
    assert_eq!(first.positions.position(PlayerId(0)), 1);

    let second = played(advance(&addr).await);
    assert_eq!(second.record.outcome, MoveOutcome::Moved { to: 5 });

    addr.send(Shutdown).await.unwrap().unwrap();
}

#[actix::test]
async fn test_second_request_while_turn_in_flight() {
    let addr = start_at(&[0, 0], BoardModifierTable::empty(), vec![vec![2]]).await;

    let first = addr.send(Command::AdvanceTurn);
    let second = addr.send(Command::AdvanceTurn);
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    assert_eq!(played(first).record.outcome, MoveOutcome::Moved { to: 2 });
    assert!(matches!(second, Err(GameError::TurnInFlight)));

    addr.send(Shutdown).await.unwrap().unwrap();
}

#[actix::test]
async fn test_stalled_player_is_dropped_and_rolled_back() {
    // Player A has no rolls: its turn fails and the token is lost with it.
    let scripts = vec![vec![], vec![2, 2], vec![3, 3]];
    let addr = start_at(&[0, 0, 0], BoardModifierTable::empty(), scripts).await;

    match advance(&addr).await {
        Ok(CommandReply::Stalled { seq, player }) => {
            assert_eq!(seq, 1);
            assert_eq!(player, PlayerId(0));
        }
        other => panic!("expected a stall, got {other:?}"),
    }

    let mut order = Vec::new();
    for _ in 0..4 {
        let report = played(advance(&addr).await);
        assert!(report.seq > 1);
        order.push(report.record.player.letter());
    }
    assert_eq!(order, vec!['B', 'C', 'B', 'C']);

    let positions = addr.send(Shutdown).await.unwrap().unwrap().positions.unwrap();
    assert_eq!(positions.position(PlayerId(0)), 0);
    assert_eq!(positions.position(PlayerId(1)), 4);
    assert_eq!(positions.position(PlayerId(2)), 6);
    assert!(positions.is_consistent());
}

#[actix::test]
async fn test_game_over_after_last_finish() {
    let addr = start_at(&[99], BoardModifierTable::empty(), vec![vec![1]]).await;

    let report = played(advance(&addr).await);
    assert_eq!(report.record.outcome, MoveOutcome::Finished { rank: 1 });
    assert_eq!(report.positions.remaining(), 0);

    match advance(&addr).await {
        Ok(CommandReply::GameOver(summary)) => {
            assert_eq!(summary.turns_played, 1);
            assert_eq!(summary.standings, vec![(PlayerId(0), 1)]);
            assert!(summary.failed.is_empty());
        }
        other => panic!("expected game over, got {other:?}"),
    }
    assert!(matches!(
        addr.send(Command::AutoplayStart).await.unwrap(),
        Err(GameError::GameOver)
    ));

    addr.send(Shutdown).await.unwrap().unwrap();
}

#[actix::test]
async fn test_autoplay_runs_to_completion() {
    let scripts = vec![vec![5], vec![5, 5]];
    let addr = start_at(&[95, 90], BoardModifierTable::empty(), scripts).await;

    assert_eq!(
        addr.send(Command::SetDelay(10)).await.unwrap().unwrap(),
        CommandReply::DelaySet { delay_ms: 10 }
    );
    assert_eq!(
        addr.send(Command::AutoplayStart).await.unwrap().unwrap(),
        CommandReply::AutoplayStarted { delay_ms: 10 }
    );
    assert!(matches!(
        addr.send(Command::Quit).await.unwrap(),
        Err(GameError::Shell(_))
    ));
    assert!(matches!(
        addr.send(Command::SetDelay(500)).await.unwrap(),
        Err(GameError::Shell(_))
    ));

    let summary = addr.send(AwaitGameOver).await.unwrap().unwrap();
    assert_eq!(summary.turns_played, 3);
    assert_eq!(summary.standings, vec![(PlayerId(0), 1), (PlayerId(1), 2)]);
    assert_eq!(summary.positions.remaining(), 0);

    let standings = addr.send(Shutdown).await.unwrap().unwrap();
    assert_eq!(standings.standings, summary.standings);
}

#[actix::test]
async fn test_quit_before_autoplay() {
    let addr = start_at(&[0, 0], BoardModifierTable::empty(), vec![]).await;
    let reply = addr.send(Command::Quit).await.unwrap().unwrap();
    assert!(reply.ends_session());
    assert_eq!(reply, CommandReply::QuitAccepted);

    let standings = addr.send(Shutdown).await.unwrap().unwrap();
    assert_eq!(standings.positions.unwrap(), PositionVector::new(2));
}

#[actix::test]
async fn test_render_queued_past_the_deadline_is_not_a_played_turn() {
    // A's move reaches the display at ~100ms, but the coordinator cannot look at
    // it before the 300ms turn deadline has rolled the turn back.
    let scripts = vec![vec![2], vec![1, 1]];
    let addr = Coordinator::launch(
        quiet(2),
        BoardModifierTable::empty(),
        slow_first_player(Duration::from_millis(100), scripts),
    )
    .await
    .unwrap();

    let reply = addr.send(Command::AdvanceTurn);
    tokio::time::sleep(Duration::from_millis(50)).await;
    std::thread::sleep(Duration::from_millis(400));

    match reply.await.unwrap() {
        Ok(CommandReply::Stalled { seq, player }) => {
            assert_eq!(seq, 1);
            assert_eq!(player, PlayerId(0));
        }
        other => panic!("expected a stall, got {other:?}"),
    }

    let report = played(advance(&addr).await);
    assert_eq!(report.seq, 2);
    assert_eq!(report.record.player, PlayerId(1));
    assert_eq!(report.positions.position(PlayerId(0)), 0);

    let positions = addr.send(Shutdown).await.unwrap().unwrap().positions.unwrap();
    assert_eq!(positions.position(PlayerId(0)), 0);
    assert_eq!(positions.position(PlayerId(1)), 1);
    assert!(positions.is_consistent());
}

#[actix::test]
async fn test_move_finishing_after_rollback_is_dropped() {
    let scripts = vec![vec![2], vec![3, 3]];
    let addr = Coordinator::launch(
        quiet(2),
        BoardModifierTable::empty(),
        slow_first_player(Duration::from_millis(500), scripts),
    )
    .await
    .unwrap();

    assert!(matches!(
        advance(&addr).await,
        Ok(CommandReply::Stalled { seq: 1, player: PlayerId(0) })
    ));
    // Let A's late move reach the display.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let report = played(advance(&addr).await);
    assert_eq!(report.record.player, PlayerId(1));
    assert_eq!(report.record.outcome, MoveOutcome::Moved { to: 3 });

    let positions = addr.send(Shutdown).await.unwrap().unwrap().positions.unwrap();
    assert_eq!(positions.position(PlayerId(0)), 0);
    assert_eq!(positions.position(PlayerId(1)), 3);
}

#[actix::test]
async fn test_shutdown_rolls_back_outstanding_turn() {
    let mut settings = quiet(2);
    settings.turn_timeout = Duration::from_millis(2000);
    settings.drain_timeout = Duration::from_millis(1000);
    let addr = Coordinator::launch(
        settings,
        BoardModifierTable::empty(),
        slow_first_player(Duration::from_millis(400), vec![vec![2], vec![1]]),
    )
    .await
    .unwrap();

    let turn = addr.send(Command::AdvanceTurn);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let standings = addr.send(Shutdown).await.unwrap().unwrap();
    let positions = standings.positions.unwrap();
    assert_eq!(positions.position(PlayerId(0)), 0);
    assert_eq!(positions.position(PlayerId(1)), 0);
    assert!(positions.is_consistent());
    assert!(standings.standings.is_empty());

    assert!(!matches!(turn.await, Ok(Ok(CommandReply::Turn(_)))));
}

#[actix::test]
async fn test_failed_startup_waits_for_exits_before_reclaiming() {
    let mut settings = quiet(2);
    settings.handshake_timeout = Duration::from_millis(100);
    let built = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&built);
    let dice: DiceFactory = Box::new(move |player: PlayerId| -> Box<dyn DiceSource> {
        // Holds the dispatcher past its readiness deadline.
        if player.index() == 0 {
            std::thread::sleep(Duration::from_millis(300));
        }
        counter.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedDice::new(vec![1]))
    });

    let started = Instant::now();
    let result = Coordinator::launch(settings, BoardModifierTable::empty(), dice).await;

    assert!(matches!(
        result,
        Err(GameError::Handshake { role: ProcessRole::Dispatcher, .. })
    ));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}
