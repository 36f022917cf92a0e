//! Main entry point for the snake-ludo game.
//!
//! Loads the board layout, starts the coordinator (which brings up the display
//! driver, the turn dispatcher and the players), then reads operator commands from
//! stdin until the game ends or the operator quits.

use log::{error, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::GameSettings;
use crate::error::GameError;
use crate::game::dice::{RandomDice, ScriptedDice};
use crate::game::layout::load_layout;
use crate::protocol::command::{Command, CommandReply, HELP};
use crate::protocol::coordinator::{AwaitGameOver, Coordinator, GameSummary, Shutdown};

pub mod config;
mod error;
mod game;
mod protocol;

#[cfg(test)]
mod tests;

#[actix::main]
async fn main() {
    // Initialize logger from environment variable (default to info level).
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("[Main] {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), GameError> {
    let settings = GameSettings::from_args(std::env::args().skip(1))?;
    let board = load_layout(&settings.layout_path)?;
    let dice = match &settings.dice_scripts {
        Some(scripts) => {
            info!("[Main] Replaying scripted dice for {} players", scripts.len());
            ScriptedDice::factory(scripts.clone())
        }
        None => RandomDice::factory(settings.seed),
    };

    info!(
        "[Main] Starting a game for {} players on {}",
        settings.players,
        settings.layout_path.display()
    );
    let coordinator = Coordinator::launch(settings, board, dice).await?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut autoplay = false;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                println!("{HELP}");
                continue;
            }
        };
        match coordinator.send(command).await? {
            Ok(reply) => {
                print_reply(&reply);
                autoplay = matches!(reply, CommandReply::AutoplayStarted { .. });
                if reply.ends_session() {
                    break;
                }
            }
            Err(e) => println!("{e}"),
        }
    }

    if autoplay {
        let summary = coordinator.send(AwaitGameOver).await??;
        print_summary(&summary);
    }

    let standings = coordinator.send(Shutdown).await??;
    match &standings.positions {
        Some(positions) => info!(
            "[Main] Game {} closed with {} players still on the board",
            standings.game_id,
            positions.remaining()
        ),
        None => warn!("[Main] Game {} closed without its final positions", standings.game_id),
    }
    for (player, rank) in &standings.standings {
        println!("Player {player}: rank {rank}");
    }
    Ok(())
}

fn print_reply(reply: &CommandReply) {
    match reply {
        CommandReply::Turn(report) => {
            info!(
                "[Main] Turn #{} done, {} players remaining",
                report.seq,
                report.positions.remaining()
            )
        }
        CommandReply::Stalled { seq, player } => {
            println!("Player {player} stopped responding on turn #{seq} and is out of the game")
        }
        CommandReply::GameOver(summary) => print_summary(summary),
        CommandReply::DelaySet { delay_ms } => println!("Delay set to {delay_ms}ms"),
        CommandReply::AutoplayStarted { delay_ms } => {
            println!("Starting autoplay (delay: {delay_ms}ms)...")
        }
        CommandReply::QuitAccepted => println!("Quitting game..."),
    }
}

fn print_summary(summary: &GameSummary) {
    println!("GAME OVER after {} turns", summary.turns_played);
    for player in &summary.failed {
        println!("Player {player} was dropped after a stall");
    }
}
