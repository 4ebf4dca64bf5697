//! Draw announcements.
//!
//! Phrase wording follows the caller's script: the first and last balls get
//! special phrasing. Actual speech synthesis is an external collaborator;
//! the runtime only guarantees each phrase is produced at most once per
//! observed draw.

use crate::game::columns::MAX_NUMBER;
use tracing::info;

/// Sink for announcement phrases.
pub trait Announcer {
    /// Emits one phrase.
    fn announce(&mut self, phrase: &str);
}

/// Announcer that writes phrases to the log.
#[derive(Debug, Default)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&mut self, phrase: &str) {
        info!(phrase, "Announcement");
    }
}

/// Builds the caller phrase for a draw at the given 1-based sequence index.
pub fn draw_phrase(number: u8, index: usize) -> String {
    if index == 1 {
        format!("First ball, number {number}")
    } else if index == MAX_NUMBER as usize {
        format!("Last ball, number {number}. Full game!")
    } else {
        format!("Next ball, number {number}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last_ball_phrasing() {
        assert_eq!(draw_phrase(7, 1), "First ball, number 7");
        assert_eq!(draw_phrase(42, 2), "Next ball, number 42");
        assert_eq!(draw_phrase(3, 90), "Last ball, number 3. Full game!");
    }
}
