//! Ticket and grid types.

use super::columns::{
    COLUMN_COUNT, MAX_PER_COLUMN, ROW_COUNT, ROW_FILL, TICKET_NUMBERS, column_label, column_of,
};
use chrono::{DateTime, Utc};
use derive_more::{Display, Error};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Unique identifier for a ticket.
pub type TicketId = String;

/// A 3x9 ticket grid: each cell is empty or holds one number.
///
/// A valid grid carries exactly 15 distinct numbers, 5 per row, at most 2
/// per column, each inside its column's range. Construction goes through
/// the layout engine; [`Grid::validate`] re-checks the invariants for
/// grids deserialized from storage or the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid(pub(crate) [[Option<u8>; COLUMN_COUNT]; ROW_COUNT]);

impl Grid {
    /// Returns the cell at the given row and column.
    pub fn get(&self, row: usize, column: usize) -> Option<u8> {
        self.0[row][column]
    }

    /// Returns the rows of the grid.
    pub fn rows(&self) -> &[[Option<u8>; COLUMN_COUNT]; ROW_COUNT] {
        &self.0
    }

    /// Returns all numbers on the grid in row-major order.
    pub fn numbers(&self) -> Vec<u8> {
        self.0.iter().flatten().filter_map(|c| *c).collect()
    }

    /// Checks the structural invariants of the grid.
    pub fn validate(&self) -> Result<(), GridError> {
        let numbers = self.numbers();
        if numbers.len() != TICKET_NUMBERS {
            return Err(GridError::WrongCellCount {
                found: numbers.len(),
            });
        }

        let mut sorted = numbers.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != numbers.len() {
            return Err(GridError::DuplicateNumber);
        }

        for (ri, row) in self.0.iter().enumerate() {
            let filled = row.iter().filter(|c| c.is_some()).count();
            if filled != ROW_FILL {
                return Err(GridError::BadRowFill {
                    row: ri,
                    found: filled,
                });
            }
        }

        for ci in 0..COLUMN_COUNT {
            let mut filled = 0;
            for row in &self.0 {
                if let Some(n) = row[ci] {
                    if column_of(n) != Some(ci) {
                        return Err(GridError::OutOfColumnRange { number: n, column: ci });
                    }
                    filled += 1;
                }
            }
            if filled > MAX_PER_COLUMN {
                return Err(GridError::ColumnOverflow {
                    column: ci,
                    found: filled,
                });
            }
        }

        Ok(())
    }

    /// Formats the grid as a human-readable string.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for (ri, row) in self.0.iter().enumerate() {
            for cell in row {
                match cell {
                    Some(n) => out.push_str(&format!("{:>3}", n)),
                    None => out.push_str("  ."),
                }
            }
            if ri < ROW_COUNT - 1 {
                out.push('\n');
            }
        }
        out
    }
}

/// A structural invariant violated by a grid.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum GridError {
    /// The grid does not hold exactly 15 numbers.
    #[display("grid holds {found} numbers, expected 15")]
    WrongCellCount {
        /// Numbers found on the grid.
        found: usize,
    },
    /// A number appears more than once.
    #[display("grid holds a duplicate number")]
    DuplicateNumber,
    /// A row does not hold exactly 5 numbers.
    #[display("row {row} holds {found} numbers, expected 5")]
    BadRowFill {
        /// Row index.
        row: usize,
        /// Numbers found in the row.
        found: usize,
    },
    /// A column holds more than 2 numbers.
    #[display("column {column} holds {found} numbers, at most 2 allowed")]
    ColumnOverflow {
        /// Column index.
        column: usize,
        /// Numbers found in the column.
        found: usize,
    },
    /// A cell's value lies outside its column's range.
    #[display("number {number} does not belong to column {column} ({})", column_label(*column))]
    OutOfColumnRange {
        /// Offending number.
        number: u8,
        /// Column index.
        column: usize,
    },
}

/// A participant's ticket: identity, owner, and an immutable grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Opaque unique id.
    pub id: TicketId,
    /// Owner display name.
    pub owner: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// The 3x9 grid.
    pub grid: Grid,
    /// Device that created the ticket, if reported.
    #[serde(default)]
    pub client_id: Option<String>,
}

impl Ticket {
    /// Creates a ticket with a fresh id and the current timestamp.
    pub fn new<R: Rng>(rng: &mut R, owner: impl Into<String>, grid: Grid) -> Self {
        Self {
            id: new_ticket_id(rng),
            owner: owner.into(),
            created: Utc::now(),
            grid,
            client_id: None,
        }
    }

    /// Attaches the creating device's id.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }
}

/// Generates an 8-character uppercase hex ticket id.
fn new_ticket_id<R: Rng>(rng: &mut R) -> TicketId {
    const CHARSET: &[u8] = b"0123456789ABCDEF";
    (0..8)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_ticket_ids_are_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = new_ticket_id(&mut rng);
        let b = new_ticket_id(&mut rng);
        assert_eq!(a.len(), 8);
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_rejects_empty_grid() {
        let grid = Grid([[None; COLUMN_COUNT]; ROW_COUNT]);
        assert_eq!(grid.validate(), Err(GridError::WrongCellCount { found: 0 }));
    }

    #[test]
    fn test_out_of_column_range_names_the_range() {
        let err = GridError::OutOfColumnRange { number: 42, column: 8 };
        assert_eq!(
            err.to_string(),
            "number 42 does not belong to column 8 (80-90)"
        );
    }
}
