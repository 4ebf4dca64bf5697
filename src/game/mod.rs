//! Core 90-ball bingo domain: number space, tickets, layout, draws, rules.

pub mod columns;
pub mod draw;
pub mod layout;
pub mod rules;
pub mod ticket;

pub use columns::{COLUMN_COUNT, MAX_NUMBER, ROW_COUNT, ROW_FILL, TICKET_NUMBERS};
pub use draw::{DrawSnapshot, DrawState};
pub use layout::{LayoutError, SelectionIssue, SelectionReport};
pub use rules::{WinResult, evaluate};
pub use ticket::{Grid, GridError, Ticket, TicketId};
