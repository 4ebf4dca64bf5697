//! Ticket layout engine: places 15 numbers on a 3x9 grid.
//!
//! Row assignment is an exact-cover search: each column's k numbers
//! (k in 0..=2) must occupy k distinct rows while every row ends at
//! exactly 5 filled cells. Two strategies exist:
//!
//! - [`build_grid`] — exhaustive backtracking, deterministic, and the
//!   sole arbiter of whether a selection is accepted;
//! - [`greedy_grid`] — the historical row-balancing variant, kept as a
//!   fast pre-check. It additionally demands 1 or 2 numbers in *every*
//!   column, so it rejects some selections backtracking accepts. Never
//!   report a rejection to a user from the greedy path alone.

use super::columns::{
    COLUMN_COUNT, MAX_PER_COLUMN, ROW_COUNT, ROW_FILL, TICKET_NUMBERS, column_label, column_of,
    column_range,
};
use super::ticket::Grid;
use derive_more::{Display, Error};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::instrument;

/// Why a selection could not be laid out.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum LayoutError {
    /// The selection does not hold exactly 15 numbers.
    #[display("selection holds {found} numbers, expected 15")]
    WrongCount {
        /// Numbers in the selection.
        found: usize,
    },
    /// A number lies outside 1..=90.
    #[display("number {number} is outside 1..=90")]
    OutOfRange {
        /// Offending number.
        number: u8,
    },
    /// A number appears more than once.
    #[display("number {number} appears more than once")]
    Duplicate {
        /// Offending number.
        number: u8,
    },
    /// A column count the greedy strategy cannot place (it requires 1 or 2
    /// numbers per column).
    #[display(
        "column {column} ({}) holds {count} numbers, greedy placement needs 1 or 2",
        column_label(*column)
    )]
    InvalidColumnCount {
        /// Column index.
        column: usize,
        /// Numbers in that column.
        count: usize,
    },
    /// No row assignment satisfies 5 numbers per row.
    #[display("selection cannot form a grid with 5 numbers per row")]
    Unsatisfiable,
}

/// Incremental report on a selection still being composed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionReport {
    /// Numbers chosen per column.
    pub per_column: [usize; COLUMN_COUNT],
    /// Total numbers chosen.
    pub total: usize,
    /// Problems with the selection so far.
    pub issues: Vec<SelectionIssue>,
    /// Whether a full grid can be formed; `None` until the selection is
    /// complete and issue-free.
    pub completable: Option<bool>,
}

impl SelectionReport {
    /// True when the selection is complete and can become a ticket.
    pub fn is_ready(&self) -> bool {
        self.total == TICKET_NUMBERS && self.issues.is_empty() && self.completable == Some(true)
    }
}

/// A problem flagged during incremental validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectionIssue {
    /// A number lies outside 1..=90.
    OutOfRange {
        /// Offending number.
        number: u8,
    },
    /// A column already holds more than 2 numbers.
    ColumnFull {
        /// Column index.
        column: usize,
        /// Numbers in that column.
        count: usize,
    },
    /// More than 15 numbers chosen.
    TooMany {
        /// Numbers in the selection.
        found: usize,
    },
}

/// Builds a grid from exactly 15 distinct numbers using exhaustive
/// backtracking over row assignments.
///
/// Columns are processed in ascending order, row subsets in lexicographic
/// order, and the first satisfying assignment wins, so the result is
/// deterministic for a given selection. Within a column, numbers are sorted
/// ascending and placed into the chosen rows in ascending row order.
///
/// # Errors
///
/// Returns [`LayoutError::Unsatisfiable`] when no row assignment yields 5
/// numbers per row (with 15 distinct in-range numbers this only happens when
/// some column holds more than 2). Never returns a partially valid grid.
#[instrument(skip(selection), fields(count = selection.len()))]
pub fn build_grid(selection: &[u8]) -> Result<Grid, LayoutError> {
    let columns = partition(selection)?;
    let counts = column_counts(&columns);

    let mut fill = [0usize; ROW_COUNT];
    let mut assigned: [Vec<usize>; COLUMN_COUNT] = Default::default();
    if !assign_rows(&counts, 0, &mut fill, &mut assigned) {
        return Err(LayoutError::Unsatisfiable);
    }

    Ok(place(&columns, &assigned))
}

/// Builds a grid with the historical greedy row-balancing strategy.
///
/// Each column must hold 1 or 2 numbers; a column's numbers go to the rows
/// currently holding the fewest cells (ties broken by lowest row index).
/// Accepts only if every row ends at exactly 5 — no backtracking.
///
/// This strategy is *not* authoritative: selections with an empty column are
/// rejected here but accepted by [`build_grid`].
#[instrument(skip(selection), fields(count = selection.len()))]
pub fn greedy_grid(selection: &[u8]) -> Result<Grid, LayoutError> {
    let columns = partition(selection)?;

    for (ci, members) in columns.iter().enumerate() {
        if members.is_empty() || members.len() > MAX_PER_COLUMN {
            return Err(LayoutError::InvalidColumnCount {
                column: ci,
                count: members.len(),
            });
        }
    }

    let mut cells = [[None; COLUMN_COUNT]; ROW_COUNT];
    let mut fill = [0usize; ROW_COUNT];
    for (ci, members) in columns.iter().enumerate() {
        let mut order: Vec<usize> = (0..ROW_COUNT).collect();
        order.sort_by_key(|&r| (fill[r], r));
        for (number, &row) in members.iter().zip(order.iter()) {
            cells[row][ci] = Some(*number);
            fill[row] += 1;
        }
    }

    if fill.iter().any(|&f| f != ROW_FILL) {
        return Err(LayoutError::Unsatisfiable);
    }
    Ok(Grid(cells))
}

/// Pure incremental check for a selection still being chosen.
///
/// Usable at any size below or at 15: reports per-column counts, flags
/// columns already over 2, and — once the selection is complete and clean —
/// answers completability with the backtracking search so users never see a
/// false negative.
pub fn validate_selection(selection: &BTreeSet<u8>) -> SelectionReport {
    let mut per_column = [0usize; COLUMN_COUNT];
    let mut issues = Vec::new();

    for &n in selection {
        match column_of(n) {
            Some(c) => per_column[c] += 1,
            None => issues.push(SelectionIssue::OutOfRange { number: n }),
        }
    }
    for (ci, &count) in per_column.iter().enumerate() {
        if count > MAX_PER_COLUMN {
            issues.push(SelectionIssue::ColumnFull { column: ci, count });
        }
    }
    if selection.len() > TICKET_NUMBERS {
        issues.push(SelectionIssue::TooMany {
            found: selection.len(),
        });
    }

    let completable = if selection.len() == TICKET_NUMBERS && issues.is_empty() {
        let mut fill = [0usize; ROW_COUNT];
        let mut assigned: [Vec<usize>; COLUMN_COUNT] = Default::default();
        Some(assign_rows(&per_column, 0, &mut fill, &mut assigned))
    } else {
        None
    };

    SelectionReport {
        per_column,
        total: selection.len(),
        issues,
        completable,
    }
}

/// Generates a random valid grid.
///
/// Picks a column-count profile (every column one number, six columns
/// promoted to two), samples numbers inside each column's range, and places
/// rows with the backtracking engine. Such profiles always admit a row
/// assignment, so generation cannot fail.
pub fn random_grid<R: Rng>(rng: &mut R) -> Grid {
    let mut counts = [1usize; COLUMN_COUNT];
    for ci in rand::seq::index::sample(rng, COLUMN_COUNT, TICKET_NUMBERS - COLUMN_COUNT) {
        counts[ci] = 2;
    }

    let mut columns: [Vec<u8>; COLUMN_COUNT] = Default::default();
    for (ci, members) in columns.iter_mut().enumerate() {
        let pool: Vec<u8> = column_range(ci).collect();
        *members = pool.choose_multiple(rng, counts[ci]).copied().collect();
        members.sort_unstable();
    }

    let mut fill = [0usize; ROW_COUNT];
    let mut assigned: [Vec<usize>; COLUMN_COUNT] = Default::default();
    let ok = assign_rows(&counts, 0, &mut fill, &mut assigned);
    debug_assert!(ok, "a 1-or-2-per-column profile always admits a row assignment");

    place(&columns, &assigned)
}

/// Splits a selection into per-column sorted member lists.
fn partition(selection: &[u8]) -> Result<[Vec<u8>; COLUMN_COUNT], LayoutError> {
    if selection.len() != TICKET_NUMBERS {
        return Err(LayoutError::WrongCount {
            found: selection.len(),
        });
    }

    let mut columns: [Vec<u8>; COLUMN_COUNT] = Default::default();
    for &n in selection {
        let c = column_of(n).ok_or(LayoutError::OutOfRange { number: n })?;
        if columns[c].contains(&n) {
            return Err(LayoutError::Duplicate { number: n });
        }
        columns[c].push(n);
    }
    for members in &mut columns {
        members.sort_unstable();
    }
    Ok(columns)
}

fn column_counts(columns: &[Vec<u8>; COLUMN_COUNT]) -> [usize; COLUMN_COUNT] {
    let mut counts = [0usize; COLUMN_COUNT];
    for (ci, members) in columns.iter().enumerate() {
        counts[ci] = members.len();
    }
    counts
}

/// Row subsets to try for a column holding `k` numbers, in lexicographic
/// order. Empty for k > 2, which makes such columns a dead end.
fn row_choices(k: usize) -> &'static [&'static [usize]] {
    match k {
        0 => &[&[]],
        1 => &[&[0], &[1], &[2]],
        2 => &[&[0, 1], &[0, 2], &[1, 2]],
        _ => &[],
    }
}

/// Backtracking search: assigns each column's numbers to distinct rows so
/// every row ends at exactly [`ROW_FILL`] cells.
fn assign_rows(
    counts: &[usize; COLUMN_COUNT],
    column: usize,
    fill: &mut [usize; ROW_COUNT],
    assigned: &mut [Vec<usize>; COLUMN_COUNT],
) -> bool {
    if column == COLUMN_COUNT {
        return fill.iter().all(|&f| f == ROW_FILL);
    }
    for choice in row_choices(counts[column]) {
        if choice.iter().any(|&r| fill[r] >= ROW_FILL) {
            continue;
        }
        for &r in *choice {
            fill[r] += 1;
        }
        assigned[column] = choice.to_vec();
        if assign_rows(counts, column + 1, fill, assigned) {
            return true;
        }
        for &r in *choice {
            fill[r] -= 1;
        }
    }
    assigned[column].clear();
    false
}

/// Writes sorted column members into their assigned rows (both ascending).
fn place(columns: &[Vec<u8>; COLUMN_COUNT], assigned: &[Vec<usize>; COLUMN_COUNT]) -> Grid {
    let mut cells = [[None; COLUMN_COUNT]; ROW_COUNT];
    for (ci, members) in columns.iter().enumerate() {
        for (number, &row) in members.iter().zip(assigned[ci].iter()) {
            cells[row][ci] = Some(*number);
        }
    }
    Grid(cells)
}
