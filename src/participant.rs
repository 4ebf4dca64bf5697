//! Participant runtime: ties the sync session, tickets, announcements, and
//! the claim gate into one polling loop.

use crate::announce::{Announcer, draw_phrase};
use crate::claim::{ClaimError, ClaimGate, ClaimKey, ClaimKind, ClaimOutcome, ClaimTransport};
use crate::client::DrawSource;
use crate::game::{Ticket, TicketId, evaluate};
use crate::storage::KeyValueStore;
use crate::sync::{Poller, SyncConfig, SyncEvent, SyncSession};
use std::collections::{HashSet, hash_set};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// One participant device: local tickets, a sync session against the shared
/// game, and a claim gate for wins.
///
/// Line completions are announced locally; full houses additionally go
/// through the claim gate, at most once per (game instance, ticket).
pub struct ParticipantRuntime<S: KeyValueStore, A: Announcer> {
    sync: SyncSession,
    tickets: Vec<Ticket>,
    gate: ClaimGate<S>,
    announcer: A,
    drawn: HashSet<u8>,
    lines_announced: HashSet<TicketId>,
}

impl<S: KeyValueStore, A: Announcer> ParticipantRuntime<S, A> {
    /// Creates a runtime for the given tickets.
    pub fn new(config: SyncConfig, tickets: Vec<Ticket>, gate: ClaimGate<S>, announcer: A) -> Self {
        Self {
            sync: SyncSession::new(config),
            tickets,
            gate,
            announcer,
            drawn: HashSet::new(),
            lines_announced: HashSet::new(),
        }
    }

    /// The locally marked numbers.
    pub fn drawn(&self) -> hash_set::Iter<'_, u8> {
        self.drawn.iter()
    }

    /// The tickets this device plays.
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// One poll cycle: fetch a snapshot, apply its effects, announce, and
    /// claim. A transport failure is recorded and retried next tick.
    #[instrument(skip_all)]
    pub async fn poll_once<C>(&mut self, client: &C) -> Result<Vec<SyncEvent>, ClaimError>
    where
        C: DrawSource + ClaimTransport + Sync,
    {
        let snapshot = match client.fetch_state().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "State poll failed");
                if let Some(event) = self.sync.poll_failed() {
                    return Ok(vec![event]);
                }
                return Ok(Vec::new());
            }
        };

        let events = self.sync.observe(&snapshot, Instant::now());
        for event in &events {
            match event {
                SyncEvent::BaselineAdopted { .. } => {
                    self.drawn = self.sync.drawn().iter().copied().collect();
                    self.lines_announced.clear();
                }
                SyncEvent::DrawObserved { number, index } => {
                    self.drawn.insert(*number);
                    self.announcer.announce(&draw_phrase(*number, *index));
                }
                SyncEvent::GameReset { .. } => {
                    // The new instance's prior draws were adopted silently.
                    self.drawn = self.sync.drawn().iter().copied().collect();
                    self.lines_announced.clear();
                }
                SyncEvent::HostGraceExpired => {
                    self.drawn.clear();
                    self.lines_announced.clear();
                }
                SyncEvent::HostOffline { .. }
                | SyncEvent::HostRecovered
                | SyncEvent::Reconnecting
                | SyncEvent::Reconnected => {}
            }
        }

        // Re-derive wins only when the marked set may have changed.
        let draws_changed = events.iter().any(|e| {
            matches!(
                e,
                SyncEvent::DrawObserved { .. }
                    | SyncEvent::BaselineAdopted { .. }
                    | SyncEvent::GameReset { .. }
            )
        });
        if draws_changed {
            self.check_wins(client).await?;
        }

        Ok(events)
    }

    async fn check_wins<C>(&mut self, client: &C) -> Result<(), ClaimError>
    where
        C: ClaimTransport + Sync,
    {
        let Some(game_id) = self.sync.game_id().map(str::to_string) else {
            return Ok(());
        };

        for ticket in &self.tickets {
            let result = evaluate(&ticket.grid, &self.drawn);

            if result.line && !result.full_house && self.lines_announced.insert(ticket.id.clone()) {
                info!(ticket_id = %ticket.id, row = ?result.line_row, "Line complete");
                self.announcer
                    .announce(&format!("Line! Ticket {} for {}", ticket.id, ticket.owner));
            }

            if result.full_house {
                let key = ClaimKey::new(game_id.clone(), ticket.id.clone());
                match self.gate.claim(client, &key, ClaimKind::FullHouse).await {
                    Ok(ClaimOutcome::Accepted) => {
                        self.announcer.announce(&format!(
                            "Full house! Ticket {} for {}",
                            ticket.id, ticket.owner
                        ));
                    }
                    Ok(ClaimOutcome::AlreadyClaimed) => {}
                    Ok(ClaimOutcome::Rejected(reason)) => {
                        info!(ticket_id = %ticket.id, ?reason, "Full-house claim refused");
                    }
                    // The submission never left the device; the next win
                    // detection retries it.
                    Err(ClaimError::Transport(e)) => {
                        warn!(ticket_id = %ticket.id, error = %e, "Claim submission failed, will retry");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    /// Polls forever at the given cadence.
    pub async fn run<C>(&mut self, client: &C, interval: Duration)
    where
        C: DrawSource + ClaimTransport + Sync,
    {
        let poller = Poller::new(interval);
        poller
            .run(async || match self.poll_once(client).await {
                Ok(_) => true,
                Err(e) => {
                    warn!(error = %e, "Poll cycle failed");
                    true
                }
            })
            .await;
    }
}
