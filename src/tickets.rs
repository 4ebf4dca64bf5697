//! Ticket persistence: one JSON document per ticket in a data directory.

use crate::game::{Ticket, TicketId};
use crate::storage::StorageError;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// File-backed ticket repository.
#[derive(Debug, Clone)]
pub struct TicketStore {
    dir: PathBuf,
}

impl TicketStore {
    /// Opens (creating if needed) a ticket directory.
    #[instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id.to_uppercase()))
    }

    /// Persists a ticket.
    #[instrument(skip(self, ticket), fields(ticket_id = %ticket.id))]
    pub fn save(&self, ticket: &Ticket) -> Result<(), StorageError> {
        let content = serde_json::to_string_pretty(ticket)?;
        std::fs::write(self.path_for(&ticket.id), content)?;
        debug!("Ticket saved");
        Ok(())
    }

    /// Loads a ticket by id; `None` when absent.
    #[instrument(skip(self))]
    pub fn load(&self, id: &str) -> Result<Option<Ticket>, StorageError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Lists all tickets, sorted by id. Unreadable files are skipped with a
    /// warning rather than failing the listing.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Ticket>, StorageError> {
        let mut tickets = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(StorageError::from)
                .and_then(|c| serde_json::from_str::<Ticket>(&c).map_err(StorageError::from))
            {
                Ok(ticket) => tickets.push(ticket),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable ticket"),
            }
        }
        tickets.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tickets)
    }

    /// Deletes a ticket; missing ids are not an error.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &TicketId) -> Result<(), StorageError> {
        let path = self.path_for(id);
        if path.exists() {
            std::fs::remove_file(path)?;
            info!("Ticket deleted");
        }
        Ok(())
    }

    /// Deletes every ticket. Used when a new round supersedes the old one.
    #[instrument(skip(self))]
    pub fn clear(&self) -> Result<usize, StorageError> {
        let tickets = self.list()?;
        for ticket in &tickets {
            self.delete(&ticket.id)?;
        }
        info!(removed = tickets.len(), "All tickets deleted");
        Ok(tickets.len())
    }
}
