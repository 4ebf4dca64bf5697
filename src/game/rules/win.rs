//! Win detection for 90-ball tickets.

use crate::game::columns::TICKET_NUMBERS;
use crate::game::ticket::Grid;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::instrument;

/// Achievement levels of a ticket against the drawn set.
///
/// Derived on every draw-state change, never stored. `line` is reported
/// independently of `full_house`; a caller wanting line-only status computes
/// `line && !full_house`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinResult {
    /// Numbers on the ticket that have been drawn.
    pub marked: usize,
    /// Numbers on the ticket (always 15).
    pub total: usize,
    /// Some row has all 5 of its numbers drawn.
    pub line: bool,
    /// Smallest complete row index, when `line` is true.
    pub line_row: Option<usize>,
    /// All 15 numbers drawn.
    pub full_house: bool,
}

/// Evaluates a grid against the set of drawn numbers.
///
/// Pure and O(15); safe to call on every snapshot.
#[instrument(skip_all, fields(drawn = drawn.len()))]
pub fn evaluate(grid: &Grid, drawn: &HashSet<u8>) -> WinResult {
    let mut marked = 0;
    let mut line_row = None;

    for (ri, row) in grid.rows().iter().enumerate() {
        let mut row_complete = true;
        for &n in row.iter().flatten() {
            if drawn.contains(&n) {
                marked += 1;
            } else {
                row_complete = false;
            }
        }
        if row_complete && line_row.is_none() {
            line_row = Some(ri);
        }
    }

    WinResult {
        marked,
        total: TICKET_NUMBERS,
        line: line_row.is_some(),
        line_row,
        full_house: marked == TICKET_NUMBERS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::layout::build_grid;

    fn sample_grid() -> Grid {
        build_grid(&[2, 8, 11, 19, 25, 33, 38, 44, 49, 52, 60, 67, 74, 81, 88]).unwrap()
    }

    #[test]
    fn test_nothing_drawn() {
        let result = evaluate(&sample_grid(), &HashSet::new());
        assert_eq!(result.marked, 0);
        assert!(!result.line);
        assert!(!result.full_house);
    }

    #[test]
    fn test_full_house_when_all_drawn() {
        let grid = sample_grid();
        let drawn: HashSet<u8> = grid.numbers().into_iter().collect();
        let result = evaluate(&grid, &drawn);
        assert_eq!(result.marked, 15);
        assert!(result.line);
        assert!(result.full_house);
    }

    #[test]
    fn test_line_reports_smallest_row() {
        let grid = sample_grid();
        let drawn: HashSet<u8> = grid.rows()[1].iter().flatten().copied().collect();
        let result = evaluate(&grid, &drawn);
        assert!(result.line);
        assert_eq!(result.line_row, Some(1));
        assert!(!result.full_house);
    }

    #[test]
    fn test_off_ticket_numbers_do_not_mark() {
        let grid = sample_grid();
        let drawn: HashSet<u8> = (1..=90).filter(|n| !grid.numbers().contains(n)).collect();
        let result = evaluate(&grid, &drawn);
        assert_eq!(result.marked, 0);
    }
}
