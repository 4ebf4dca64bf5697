//! Bolillero library - shared 90-ball bingo over HTTP
//!
//! One server process hosts one game. The host role drives draws and resets
//! through admin-gated endpoints; participant devices poll the shared draw
//! state, mark their tickets, announce each ball once, and claim wins
//! idempotently.
//!
//! # Architecture
//!
//! - **Game**: number space, ticket layout engine, draw state, win rules
//! - **Server**: axum JSON API over one shared [`GameSession`]
//! - **Sync**: per-device polling state machine turning snapshots into
//!   ordered, exactly-once effects
//! - **Claim**: durable local dedup in front of the server's claim registry
//!
//! # Example
//!
//! ```no_run
//! use bolillero::game::layout::random_grid;
//! use bolillero::game::{Ticket, evaluate};
//! use std::collections::HashSet;
//!
//! let mut rng = rand::thread_rng();
//! let grid = random_grid(&mut rng);
//! let ticket = Ticket::new(&mut rng, "Ana", grid);
//! let result = evaluate(&ticket.grid, &HashSet::from([7, 23, 71]));
//! assert!(!result.full_house);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod announce;
pub mod claim;
pub mod cli;
pub mod client;
pub mod config;
pub mod game;
pub mod participant;
pub mod server;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tickets;

// Crate-level exports - core game types
pub use game::{DrawSnapshot, DrawState, Grid, Ticket, TicketId, WinResult, evaluate};

// Crate-level exports - server side
pub use server::{AppState, router, serve};
pub use session::GameSession;

// Crate-level exports - participant side
pub use claim::{ClaimGate, ClaimKey, ClaimKind, ClaimOutcome};
pub use client::HttpGameClient;
pub use participant::ParticipantRuntime;
pub use sync::{SyncConfig, SyncEvent, SyncSession};
