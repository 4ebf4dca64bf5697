//! Fixed partition of the 90-ball number space into nine column ranges.
//!
//! Column 0 covers 1-9, columns 1 through 7 cover one decade each, and
//! column 8 is extended to include 90. Pure data, no state.

use std::ops::RangeInclusive;

/// Number of columns on a ticket.
pub const COLUMN_COUNT: usize = 9;

/// Number of rows on a ticket.
pub const ROW_COUNT: usize = 3;

/// Filled cells required per row.
pub const ROW_FILL: usize = 5;

/// Total numbers on a ticket.
pub const TICKET_NUMBERS: usize = 15;

/// Highest drawable number.
pub const MAX_NUMBER: u8 = 90;

/// Maximum numbers a single column may hold.
pub const MAX_PER_COLUMN: usize = 2;

/// Returns the column a number belongs to, or `None` if it is outside 1..=90.
pub fn column_of(number: u8) -> Option<usize> {
    if number == 0 || number > MAX_NUMBER {
        return None;
    }
    Some(((number / 10) as usize).min(COLUMN_COUNT - 1))
}

/// Returns the inclusive number range of a column.
///
/// # Panics
///
/// Panics if `column >= 9`; callers index with values from [`column_of`].
pub fn column_range(column: usize) -> RangeInclusive<u8> {
    assert!(column < COLUMN_COUNT, "column out of bounds");
    match column {
        0 => 1..=9,
        8 => 80..=90,
        c => {
            let lo = (c as u8) * 10;
            lo..=lo + 9
        }
    }
}

/// Human-readable label for a column range.
pub fn column_label(column: usize) -> &'static str {
    const LABELS: [&str; COLUMN_COUNT] = [
        "1-9", "10-19", "20-29", "30-39", "40-49", "50-59", "60-69", "70-79", "80-90",
    ];
    LABELS[column]
}
