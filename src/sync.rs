//! Draw synchronization protocol: per-client polling state machine.
//!
//! Each participant device owns one [`SyncSession`]. Snapshots arrive at a
//! fixed, uncoordinated cadence; the session turns each one into an ordered
//! batch of [`SyncEvent`]s that downstream code applies exactly once. The
//! session itself performs no I/O and takes the current instant as an
//! argument, so the whole protocol is testable without timers.

use crate::game::DrawSnapshot;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Tuning knobs for a sync session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How long a mid-game host may stay offline before the client resets.
    pub host_grace: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host_grace: Duration::from_secs(30),
        }
    }
}

/// An effect the client must apply, in order, exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// First observation: the snapshot was adopted with no draw effects.
    BaselineAdopted {
        /// Draws already present at adoption.
        drawn: usize,
    },
    /// A newly observed draw. `index` is the 1-based position in the game's
    /// draw sequence; announcing is keyed on it so re-polling the same
    /// snapshot never re-announces.
    DrawObserved {
        /// The drawn number.
        number: u8,
        /// 1-based sequence index of the draw.
        index: usize,
    },
    /// The game-instance id changed: local state was cleared and the new
    /// instance's already-drawn sequence adopted silently, as on a first
    /// observation. Only draws after this point produce effects.
    GameReset {
        /// The new game-instance id.
        game_id: String,
        /// Draws the new instance already had at adoption.
        drawn: usize,
    },
    /// The host went offline mid-game; a grace countdown was armed.
    HostOffline {
        /// Time until the client resets if the host does not recover.
        grace: Duration,
    },
    /// The host recovered before the grace elapsed; nothing was mutated.
    HostRecovered,
    /// The grace elapsed: local state was reset and instance tracking
    /// cleared. The next snapshot is adopted as a fresh baseline.
    HostGraceExpired,
    /// A poll failed; local state is retained while reconnecting.
    Reconnecting,
    /// A poll succeeded after one or more failures.
    Reconnected,
}

/// Per-client synchronization state machine.
///
/// Phases: uninitialized, then synced, with a host-grace deadline that can
/// be pending in either, and a disconnected overlay that never mutates game
/// state on its own.
#[derive(Debug)]
pub struct SyncSession {
    config: SyncConfig,
    initialized: bool,
    drawn: Vec<u8>,
    game_id: Option<String>,
    last_processed: usize,
    connected: bool,
    host_deadline: Option<Instant>,
}

impl SyncSession {
    /// Creates an uninitialized session.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            initialized: false,
            drawn: Vec::new(),
            game_id: None,
            last_processed: 0,
            connected: true,
            host_deadline: None,
        }
    }

    /// The locally known drawn sequence.
    pub fn drawn(&self) -> &[u8] {
        &self.drawn
    }

    /// The game-instance id being tracked, if any.
    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    /// False while polls are failing.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Applies one snapshot, returning the effects to run in order.
    #[instrument(skip_all, fields(server_drawn = snapshot.drawn.len(), game_id = %snapshot.game_id))]
    pub fn observe(&mut self, snapshot: &DrawSnapshot, now: Instant) -> Vec<SyncEvent> {
        let mut events = Vec::new();

        if !self.connected {
            self.connected = true;
            if self.initialized {
                info!("Poll succeeded after failures, resuming");
                events.push(SyncEvent::Reconnected);
            }
        }

        // First observation: adopt as baseline with no draw effects so a
        // client joining mid-game does not replay the whole history. A host
        // already offline mid-game arms the grace countdown right away.
        if !self.initialized {
            self.initialized = true;
            self.drawn = snapshot.drawn.clone();
            self.game_id = Some(snapshot.game_id.clone());
            self.last_processed = snapshot.drawn.len();
            info!(drawn = self.drawn.len(), "Adopted baseline");
            events.push(SyncEvent::BaselineAdopted {
                drawn: self.drawn.len(),
            });
            if !snapshot.host_online && !snapshot.drawn.is_empty() {
                let grace = self.config.host_grace;
                warn!(grace_secs = grace.as_secs(), "Host offline at baseline, arming grace countdown");
                self.host_deadline = Some(now + grace);
                events.push(SyncEvent::HostOffline { grace });
            }
            return events;
        }

        // Authoritative reset: the instance id changed under us. The new
        // instance's existing draws are adopted like a baseline, not
        // replayed as announcements.
        if self.game_id.as_deref() != Some(snapshot.game_id.as_str()) {
            info!(
                new_game_id = %snapshot.game_id,
                adopted = snapshot.drawn.len(),
                "Game instance changed, clearing local state"
            );
            self.drawn = snapshot.drawn.clone();
            self.last_processed = snapshot.drawn.len();
            self.host_deadline = None;
            self.game_id = Some(snapshot.game_id.clone());
            events.push(SyncEvent::GameReset {
                game_id: snapshot.game_id.clone(),
                drawn: snapshot.drawn.len(),
            });
        }

        // Host liveness: a liveness report, unlike a transport failure, may
        // eventually reset the game.
        if !snapshot.host_online {
            let in_progress = !snapshot.drawn.is_empty() || !self.drawn.is_empty();
            if in_progress {
                match self.host_deadline {
                    None => {
                        let grace = self.config.host_grace;
                        warn!(grace_secs = grace.as_secs(), "Host offline, arming grace countdown");
                        self.host_deadline = Some(now + grace);
                        events.push(SyncEvent::HostOffline { grace });
                    }
                    Some(deadline) if now >= deadline => {
                        warn!("Host grace elapsed, resetting local state");
                        self.reset_local();
                        events.push(SyncEvent::HostGraceExpired);
                        return events;
                    }
                    Some(_) => {}
                }
            }
        } else if self.host_deadline.take().is_some() {
            info!("Host recovered within grace");
            events.push(SyncEvent::HostRecovered);
        }

        // New draws: the sequence only grows, so the unseen suffix is
        // determined by the length difference.
        if snapshot.drawn.len() > self.drawn.len() {
            for &number in &snapshot.drawn[self.drawn.len()..] {
                self.last_processed += 1;
                debug!(number, index = self.last_processed, "New draw observed");
                events.push(SyncEvent::DrawObserved {
                    number,
                    index: self.last_processed,
                });
            }
            self.drawn = snapshot.drawn.clone();
        } else if snapshot.drawn.len() < self.drawn.len() {
            // Same instance but fewer draws: a stale read. Keep local state.
            warn!(
                local = self.drawn.len(),
                server = snapshot.drawn.len(),
                "Snapshot shorter than local sequence, ignoring"
            );
        }

        events
    }

    /// Records a failed poll. State is retained; emits [`SyncEvent::Reconnecting`]
    /// on the first failure of a streak.
    pub fn poll_failed(&mut self) -> Option<SyncEvent> {
        if self.connected {
            self.connected = false;
            warn!("Poll failed, will retry next tick");
            Some(SyncEvent::Reconnecting)
        } else {
            None
        }
    }

    /// Full local reset: back to uninitialized, instance tracking cleared.
    fn reset_local(&mut self) {
        self.initialized = false;
        self.drawn.clear();
        self.game_id = None;
        self.last_processed = 0;
        self.host_deadline = None;
    }
}

/// A repeating poll driver: one task per concern, fixed cadence, and a tick
/// is skipped while the previous one is still in flight, so polls never
/// overlap or apply out of order.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
}

impl Poller {
    /// Creates a poller with the given cadence.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Runs `tick` repeatedly until it returns `false`.
    pub async fn run<F>(self, mut tick: F)
    where
        F: AsyncFnMut() -> bool,
    {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if !tick().await {
                break;
            }
        }
    }
}
