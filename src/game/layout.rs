//! Board layout loader.
//!
//! The layout format is a stream of records: `L <from> <to>` for a ladder,
//! `S <from> <to>` for a snake, and `E` to stop reading. The marker may be glued
//! to the source cell (`L4 14`). Anything else between records is skipped.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::error::GameError;
use crate::game::board::BoardModifierTable;
use crate::game::types::Cell;

/// Read and parse a layout file.
pub fn load_layout(path: impl AsRef<Path>) -> Result<BoardModifierTable, GameError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| {
        GameError::Setup(format!("could not open layout {}: {e}", path.display()))
    })?;
    let board = parse_layout(&text)?;
    info!(
        "[Layout] Loaded {} ({} ladders, {} snakes)",
        path.display(),
        board.ladders().count(),
        board.snakes().count()
    );
    Ok(board)
}

pub fn parse_layout(text: &str) -> Result<BoardModifierTable, GameError> {
    let mut board = BoardModifierTable::empty();
    let mut tokens = text.split_whitespace();

    while let Some(token) = tokens.next() {
        if token == "E" {
            break;
        }
        let Some((marker, glued)) = split_marker(token) else {
            continue;
        };
        let from = match glued {
            Some(cell) => parse_number(cell, marker)?,
            None => next_number(&mut tokens, marker)?,
        };
        let to = next_number(&mut tokens, marker)?;
        let from = Cell::try_from(from).map_err(|_| {
            GameError::Setup(format!("{marker} record has invalid source {from}"))
        })?;
        if marker == 'L' && to < i64::from(from) {
            debug!("[Layout] Ladder {} -> {} goes down the board", from, to);
        }
        if marker == 'S' && to > i64::from(from) {
            debug!("[Layout] Snake {} -> {} goes up the board", from, to);
        }
        board.insert(from, to)?;
    }
    Ok(board)
}

/// `L`/`S` alone, or glued to a number (`L4`). Words like `Snakes` are not markers.
fn split_marker(token: &str) -> Option<(char, Option<&str>)> {
    let marker = match token.chars().next()? {
        marker @ ('L' | 'S') => marker,
        _ => return None,
    };
    let rest = &token[1..];
    if rest.is_empty() {
        return Some((marker, None));
    }
    rest.parse::<i64>().ok().map(|_| (marker, Some(rest)))
}

fn next_number<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    marker: char,
) -> Result<i64, GameError> {
    let token = tokens
        .next()
        .ok_or_else(|| GameError::Setup(format!("{marker} record is missing a cell")))?;
    parse_number(token, marker)
}

fn parse_number(token: &str, marker: char) -> Result<i64, GameError> {
    token
        .parse()
        .map_err(|_| GameError::Setup(format!("{marker} record has invalid cell `{token}`")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records_until_terminator() {
        let board = parse_layout("L 4 14\nS 17 7\nE\nL 20 90\n").unwrap();
        assert_eq!(board.modifier(4), 10);
        assert_eq!(board.modifier(17), -10);
        // Records after `E` are never read.
        assert_eq!(board.modifier(20), 0);
    }

    #[test]
    fn test_unmarked_tokens_are_skipped() {
        let board = parse_layout("# board\nL 2 8 x S 50 3").unwrap();
        assert_eq!(board.modifier(2), 6);
        assert_eq!(board.modifier(50), -47);
    }

    #[test]
    fn test_marker_glued_to_source() {
        let board = parse_layout("Snakes and ladders\nL4 14\nS17 7\nE").unwrap();
        assert_eq!(board.modifier(4), 10);
        assert_eq!(board.modifier(17), -10);
        assert_eq!(board.ladders().count(), 1);
        assert_eq!(board.snakes().count(), 1);
    }

    #[test]
    fn test_malformed_records() {
        assert!(parse_layout("L 4").is_err());
        assert!(parse_layout("S ten 3").is_err());
        assert!(parse_layout("L 0 5").is_err());
        assert!(parse_layout("L -3 5").is_err());
        assert!(parse_layout("L 10 20 S 20 10").is_err());
    }

    #[test]
    fn test_bundled_layout_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/boards/ludo.txt");
        let board = load_layout(path).unwrap();
        assert_eq!(board.ladders().count(), 7);
        assert_eq!(board.snakes().count(), 8);
    }

    #[test]
    fn test_missing_file_is_setup_failure() {
        let err = load_layout("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, GameError::Setup(_)));
    }
}
