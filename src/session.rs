//! Shared host-side game session.
//!
//! The host role owns the draw state; every mutation goes through this
//! session so the authoritative side serializes draws, resets, and claim
//! registration. Participants only ever read snapshots.

use crate::announce::draw_phrase;
use crate::claim::{ClaimAck, ClaimKind, ClaimRejection};
use crate::game::{DrawSnapshot, DrawState, TicketId, WinResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// One completed draw, as reported to the host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DrawReport {
    /// The drawn number.
    pub number: u8,
    /// 1-based position in the draw sequence.
    pub count: usize,
    /// Numbers still in the pool.
    pub remaining: usize,
    /// Caller phrase for this draw.
    pub phrase: String,
}

struct Inner {
    draw: DrawState,
    host_seen: Option<Instant>,
    // Claims for the current instance only; reset clears it, and stale
    // instances are refused before reaching the registry.
    claims: HashSet<(TicketId, ClaimKind)>,
    // Participant liveness: device id -> last ping. Pruned on access.
    presence: HashMap<String, Instant>,
}

impl Inner {
    fn prune_presence(&mut self, ttl: Duration) {
        self.presence.retain(|_, seen| seen.elapsed() < ttl);
    }
}

/// Thread-safe handle to the single shared game.
#[derive(Clone)]
pub struct GameSession {
    inner: Arc<Mutex<Inner>>,
    host_ttl: Duration,
}

impl GameSession {
    /// Creates a session with a fresh game and the given host-liveness TTL.
    #[instrument]
    pub fn new(host_ttl: Duration) -> Self {
        info!("Creating game session");
        let draw = DrawState::new(&mut rand::thread_rng());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                draw,
                host_seen: None,
                claims: HashSet::new(),
                presence: HashMap::new(),
            })),
            host_ttl,
        }
    }

    /// Records a host heartbeat. Draws and resets count as heartbeats too.
    pub fn heartbeat(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.host_seen = Some(Instant::now());
    }

    /// A read-only snapshot; host liveness derives from the last heartbeat.
    pub fn snapshot(&self) -> DrawSnapshot {
        let inner = self.inner.lock().unwrap();
        let host_online = inner
            .host_seen
            .is_some_and(|seen| seen.elapsed() < self.host_ttl);
        inner.draw.snapshot(host_online)
    }

    /// Draws the next number; `None` once the pool is exhausted.
    #[instrument(skip(self))]
    pub fn draw(&self) -> Option<DrawReport> {
        let mut inner = self.inner.lock().unwrap();
        inner.host_seen = Some(Instant::now());
        let number = inner.draw.draw(&mut rand::thread_rng())?;
        let count = inner.draw.drawn().len();
        info!(number, count, "Number drawn");
        Some(DrawReport {
            number,
            count,
            remaining: inner.draw.remaining(),
            phrase: draw_phrase(number, count),
        })
    }

    /// Resets to a new game instance, clearing the claim registry.
    /// Returns the new instance id.
    #[instrument(skip(self))]
    pub fn reset(&self) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.host_seen = Some(Instant::now());
        inner.draw.reset(&mut rand::thread_rng());
        inner.claims.clear();
        info!(game_id = %inner.draw.game_id(), "Game reset");
        inner.draw.game_id().to_string()
    }

    /// Current game-instance id.
    pub fn game_id(&self) -> String {
        self.inner.lock().unwrap().draw.game_id().to_string()
    }

    /// Current join code.
    pub fn join_code(&self) -> String {
        self.inner.lock().unwrap().draw.join_code().to_string()
    }

    /// True once drawing has started.
    pub fn in_progress(&self) -> bool {
        self.inner.lock().unwrap().draw.in_progress()
    }

    /// The drawn sequence so far.
    pub fn drawn(&self) -> Vec<u8> {
        self.inner.lock().unwrap().draw.drawn().to_vec()
    }

    /// Checks a join code for ticket creation: it must match, and the game
    /// must not have started.
    pub fn verify_join_code(&self, code: &str) -> bool {
        let inner = self.inner.lock().unwrap();
        code == inner.draw.join_code() && !inner.draw.in_progress()
    }

    /// Records a participant-device ping and returns the online count.
    ///
    /// Devices that have not pinged within the liveness TTL drop out of the
    /// count; the same TTL governs host and participant liveness.
    pub fn presence_ping(&self, client_id: &str) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.presence.insert(client_id.to_string(), Instant::now());
        inner.prune_presence(self.host_ttl);
        inner.presence.len()
    }

    /// Participant devices seen within the liveness TTL.
    pub fn online_count(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.prune_presence(self.host_ttl);
        inner.presence.len()
    }

    /// Registers a win claim, serializing cross-device dedup.
    ///
    /// The first claim per (ticket, kind) in the current instance wins;
    /// later ones are `Duplicate`. Claims against a superseded instance are
    /// `StaleGame`, and claims the drawn set does not support are
    /// `NotAWinner`.
    #[instrument(skip(self, result), fields(%ticket_id, %kind))]
    pub fn register_claim(
        &self,
        game_id: &str,
        ticket_id: &TicketId,
        kind: ClaimKind,
        result: &WinResult,
    ) -> ClaimAck {
        let mut inner = self.inner.lock().unwrap();

        if game_id != inner.draw.game_id() {
            warn!(stale_game_id = %game_id, "Claim against superseded game instance");
            return ClaimAck::Rejected(ClaimRejection::StaleGame);
        }

        let verified = match kind {
            ClaimKind::Line => result.line,
            ClaimKind::FullHouse => result.full_house,
        };
        if !verified {
            warn!(marked = result.marked, "Claim not supported by drawn numbers");
            return ClaimAck::Rejected(ClaimRejection::NotAWinner);
        }

        if !inner.claims.insert((ticket_id.clone(), kind)) {
            info!("Claim already registered");
            return ClaimAck::Rejected(ClaimRejection::Duplicate);
        }

        info!("Claim registered");
        ClaimAck::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::TICKET_NUMBERS;

    fn full_house_result() -> WinResult {
        WinResult {
            marked: TICKET_NUMBERS,
            total: TICKET_NUMBERS,
            line: true,
            line_row: Some(0),
            full_house: true,
        }
    }

    #[test]
    fn test_first_claim_wins_second_is_duplicate() {
        let session = GameSession::new(Duration::from_secs(35));
        let game_id = session.game_id();
        let ticket = "AB12CD34".to_string();
        let result = full_house_result();

        assert_eq!(
            session.register_claim(&game_id, &ticket, ClaimKind::FullHouse, &result),
            ClaimAck::Accepted
        );
        assert_eq!(
            session.register_claim(&game_id, &ticket, ClaimKind::FullHouse, &result),
            ClaimAck::Rejected(ClaimRejection::Duplicate)
        );
        // A different kind on the same ticket is its own claim.
        assert_eq!(
            session.register_claim(&game_id, &ticket, ClaimKind::Line, &result),
            ClaimAck::Accepted
        );
    }

    #[test]
    fn test_stale_game_claim_rejected() {
        let session = GameSession::new(Duration::from_secs(35));
        let old_id = session.game_id();
        session.reset();
        assert_eq!(
            session.register_claim(
                &old_id,
                &"AB12CD34".to_string(),
                ClaimKind::FullHouse,
                &full_house_result()
            ),
            ClaimAck::Rejected(ClaimRejection::StaleGame)
        );
    }

    #[test]
    fn test_unverified_claim_rejected() {
        let session = GameSession::new(Duration::from_secs(35));
        let game_id = session.game_id();
        let losing = WinResult {
            marked: 4,
            total: TICKET_NUMBERS,
            line: false,
            line_row: None,
            full_house: false,
        };
        assert_eq!(
            session.register_claim(&game_id, &"AB12CD34".to_string(), ClaimKind::Line, &losing),
            ClaimAck::Rejected(ClaimRejection::NotAWinner)
        );
    }

    #[test]
    fn test_reset_clears_claims() {
        let session = GameSession::new(Duration::from_secs(35));
        let ticket = "AB12CD34".to_string();
        let result = full_house_result();

        session.register_claim(&session.game_id(), &ticket, ClaimKind::FullHouse, &result);
        let new_id = session.reset();
        assert_eq!(
            session.register_claim(&new_id, &ticket, ClaimKind::FullHouse, &result),
            ClaimAck::Accepted
        );
    }

    #[test]
    fn test_presence_counts_distinct_devices() {
        let session = GameSession::new(Duration::from_secs(35));
        assert_eq!(session.online_count(), 0);
        assert_eq!(session.presence_ping("device-a"), 1);
        assert_eq!(session.presence_ping("device-b"), 2);
        // A repeat ping refreshes rather than duplicates.
        assert_eq!(session.presence_ping("device-a"), 2);
        assert_eq!(session.online_count(), 2);
    }

    #[test]
    fn test_presence_expires_with_ttl() {
        let session = GameSession::new(Duration::ZERO);
        assert_eq!(session.presence_ping("device-a"), 0);
        assert_eq!(session.online_count(), 0);
    }

    #[test]
    fn test_host_offline_until_heartbeat() {
        let session = GameSession::new(Duration::from_secs(35));
        assert!(!session.snapshot().host_online);
        session.heartbeat();
        assert!(session.snapshot().host_online);
    }
}
