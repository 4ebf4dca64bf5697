//! Host-side authoritative draw state.

use super::columns::MAX_NUMBER;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// The single authoritative game state, owned by the host role.
///
/// The drawn sequence only grows; numbers are never removed or reordered.
/// The game-instance id changes only on [`DrawState::reset`]. All other
/// roles observe this state read-only through [`DrawSnapshot`]s.
#[derive(Debug, Clone)]
pub struct DrawState {
    available: Vec<u8>,
    drawn: Vec<u8>,
    last: Option<u8>,
    game_id: String,
    join_code: String,
}

impl DrawState {
    /// Creates a fresh game with a full pool, a new instance id, and a new
    /// join code.
    #[instrument(skip(rng))]
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let state = Self {
            available: (1..=MAX_NUMBER).collect(),
            drawn: Vec::new(),
            last: None,
            game_id: new_game_id(rng),
            join_code: new_join_code(rng),
        };
        info!(game_id = %state.game_id, "Created new game");
        state
    }

    /// Draws one number uniformly from the remaining pool.
    ///
    /// Returns `None` once all 90 numbers have been drawn.
    #[instrument(skip_all, fields(game_id = %self.game_id))]
    pub fn draw<R: Rng>(&mut self, rng: &mut R) -> Option<u8> {
        if self.available.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.available.len());
        let number = self.available.swap_remove(idx);
        self.drawn.push(number);
        self.last = Some(number);
        info!(number, count = self.drawn.len(), "Number drawn");
        Some(number)
    }

    /// Starts a new game instance: full pool, new id, new join code.
    #[instrument(skip_all, fields(old_game_id = %self.game_id))]
    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        *self = Self::new(rng);
    }

    /// The drawn sequence, in draw order.
    pub fn drawn(&self) -> &[u8] {
        &self.drawn
    }

    /// The most recently drawn number.
    pub fn last(&self) -> Option<u8> {
        self.last
    }

    /// Numbers still in the pool.
    pub fn remaining(&self) -> usize {
        self.available.len()
    }

    /// The game-instance id.
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// The join code gating ticket creation for this instance.
    pub fn join_code(&self) -> &str {
        &self.join_code
    }

    /// True once at least one number has been drawn.
    pub fn in_progress(&self) -> bool {
        !self.drawn.is_empty()
    }

    /// A read-only snapshot for polling clients.
    pub fn snapshot(&self, host_online: bool) -> DrawSnapshot {
        DrawSnapshot {
            drawn: self.drawn.clone(),
            last: self.last,
            remaining: self.available.len(),
            game_id: self.game_id.clone(),
            host_online,
        }
    }
}

/// Wire-level snapshot of the shared draw state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawSnapshot {
    /// Ordered drawn sequence.
    pub drawn: Vec<u8>,
    /// Most recently drawn number.
    pub last: Option<u8>,
    /// Numbers still in the pool.
    pub remaining: usize,
    /// Game-instance id; changes only on reset.
    pub game_id: String,
    /// Whether the host is currently live.
    pub host_online: bool,
}

/// Generates an 8-character uppercase hex game-instance id.
fn new_game_id<R: Rng>(rng: &mut R) -> String {
    const CHARSET: &[u8] = b"0123456789ABCDEF";
    (0..8)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Generates a six-digit join code.
fn new_join_code<R: Rng>(rng: &mut R) -> String {
    (0..6)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
