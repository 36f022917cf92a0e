//! Board rendering for the display driver.
//!
//! The grid is drawn boustrophedon style: cell 1 bottom-left, cell 100 top-left.

use std::fmt::Write;

use serde::Serialize;

use crate::config::game::{BOARD_CELLS, START_CELL};
use crate::game::board::BoardModifierTable;
use crate::game::state::PositionVector;
use crate::game::types::{Cell, PlayerId};

const ROW_WIDTH: u32 = 10;

/// ANSI clear-screen and cursor-home, so each frame replaces the previous one.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Cell shown at `row` (0 = bottom) and `col` (0 = left).
pub fn cell_at(row: u32, col: u32) -> Cell {
    if row % 2 == 1 {
        row * ROW_WIDTH + (ROW_WIDTH - col)
    } else {
        row * ROW_WIDTH + col + 1
    }
}

pub fn render_text(board: &BoardModifierTable, positions: &PositionVector) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "========== SNAKE LUDO ==========\n");

    out.push_str("Snakes:\n");
    push_modifier_list(&mut out, board.snakes(), 'S');
    out.push_str("\nLadders:\n");
    push_modifier_list(&mut out, board.ladders(), 'L');
    out.push('\n');

    for row in (0..BOARD_CELLS / ROW_WIDTH).rev() {
        for col in 0..ROW_WIDTH {
            let cell = cell_at(row, col);
            // First player on a cell wins the marker, like the classic board.
            match positions.iter().find(|(_, at)| *at == cell) {
                Some((player, _)) => {
                    let _ = write!(out, "{:>4}", player.letter());
                }
                None => {
                    let _ = write!(out, "{:>4}", cell);
                }
            }
        }
        out.push('\n');
    }

    let _ = writeln!(out, "\nFinished: {}", names_at(positions, BOARD_CELLS));
    let _ = writeln!(out, "Home: {}", names_at(positions, START_CELL));
    let _ = writeln!(out, "Players remaining: {}", positions.remaining());
    out
}

/// A full terminal frame: clear the screen, then draw the board.
pub fn render_frame(board: &BoardModifierTable, positions: &PositionVector) -> String {
    format!("{CLEAR_SCREEN}{}", render_text(board, positions))
}

/// One-line JSON snapshot.
pub fn render_json(seq: u64, positions: &PositionVector) -> String {
    #[derive(Serialize)]
    struct Snapshot<'a> {
        seq: u64,
        positions: &'a PositionVector,
        standings: Vec<(PlayerId, u32)>,
    }
    let snapshot = Snapshot {
        seq,
        positions,
        standings: positions.standings(),
    };
    serde_json::to_string(&snapshot)
        .unwrap_or_else(|e| format!(r#"{{"error":"failed to serialize snapshot: {e}"}}"#))
}

fn push_modifier_list(out: &mut String, records: impl Iterator<Item = (Cell, i64)>, marker: char) {
    let mut count = 0;
    for (from, to) in records {
        let _ = write!(out, "{marker}({from:>2}->{to:>2})");
        count += 1;
        out.push_str(if count % 3 == 0 { "\n" } else { "   ||   " });
    }
    if count == 0 {
        out.push_str("None");
    }
    out.push('\n');
}

fn names_at(positions: &PositionVector, cell: Cell) -> String {
    let names: Vec<String> = positions
        .iter()
        .filter(|(_, at)| *at == cell)
        .map(|(player, _)| player.letter().to_string())
        .collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(" ")
    }
}
