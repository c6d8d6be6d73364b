//! Bounded persistent collection of saved cards.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::card::{BingoCard, CardRecord};

/// Maximum number of cards the store will hold.
pub const MAX_SAVED_CARDS: usize = 6;

/// File name of the JSON blob under the store root.
pub const STORE_FILE: &str = "saved_cards.json";

/// Outcome of importing a shared card record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The card was added to the store.
    Added,
    /// A card with the same id is already saved; nothing changed.
    AlreadySaved,
    /// The store is full; the card was not added.
    LimitReached,
}

/// Manager for the saved-card collection, backed by a single JSON blob
/// on disk. Every mutation persists synchronously.
pub struct CardStore {
    path: PathBuf,
    cards: Vec<CardRecord>,
}

impl CardStore {
    /// Open (or initialise) a store rooted at the provided directory.
    ///
    /// An unreadable or unparsable blob is logged and treated as an
    /// empty store. A blob holding more than [`MAX_SAVED_CARDS`]
    /// entries is truncated and written back immediately.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let path = root.into().join(STORE_FILE);
        let mut store = Self {
            cards: load_cards(&path),
            path,
        };
        if store.cards.len() > MAX_SAVED_CARDS {
            store.cards.truncate(MAX_SAVED_CARDS);
            store.persist()?;
        }
        Ok(store)
    }

    /// Default store root under the user's config directory.
    pub fn default_root() -> PathBuf {
        crate::config::AppConfig::config_dir()
    }

    /// Saved cards in insertion order.
    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    /// Look up a saved card by id.
    pub fn card(&self, id: Uuid) -> Option<&CardRecord> {
        self.cards.iter().find(|record| record.id == id)
    }

    /// Whether another card fits under the cap.
    pub fn can_save_more(&self) -> bool {
        self.cards.len() < MAX_SAVED_CARDS
    }

    /// Number of free slots remaining.
    pub fn cards_remaining(&self) -> usize {
        MAX_SAVED_CARDS.saturating_sub(self.cards.len())
    }

    /// Snapshot the card into a new record and append it.
    ///
    /// Each save gets a fresh id so the same working card can be saved
    /// as multiple versions. Returns `Ok(None)` when the store is full.
    pub fn save_card(&mut self, card: &BingoCard) -> Result<Option<CardRecord>> {
        if !self.can_save_more() {
            return Ok(None);
        }
        let marks = card.marked_positions();
        let record = CardRecord {
            id: Uuid::new_v4(),
            grid: card.grid().to_vec(),
            date_created: Utc::now(),
            marked_cells: (!marks.is_empty()).then_some(marks),
        };
        self.cards.push(record.clone());
        self.persist()?;
        Ok(Some(record))
    }

    /// Add a record received through a share link, deduplicating by id.
    pub fn import_record(&mut self, record: CardRecord) -> Result<ImportOutcome> {
        if self.cards.iter().any(|saved| saved.id == record.id) {
            return Ok(ImportOutcome::AlreadySaved);
        }
        if !self.can_save_more() {
            return Ok(ImportOutcome::LimitReached);
        }
        self.cards.push(record);
        self.persist()?;
        Ok(ImportOutcome::Added)
    }

    /// Write the card's current grid and marks back over the saved
    /// record with the given id, keeping its creation date.
    ///
    /// Returns `false` when no record with that id exists.
    pub fn update_card(&mut self, card: &BingoCard, id: Uuid) -> Result<bool> {
        let Some(record) = self.cards.iter_mut().find(|record| record.id == id) else {
            return Ok(false);
        };
        let marks = card.marked_positions();
        record.grid = card.grid().to_vec();
        record.marked_cells = (!marks.is_empty()).then_some(marks);
        self.persist()?;
        Ok(true)
    }

    /// Remove the card with the given id. No-op when absent.
    pub fn delete_card(&mut self, id: Uuid) -> Result<()> {
        let before = self.cards.len();
        self.cards.retain(|record| record.id != id);
        if self.cards.len() != before {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(&self.cards)?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

fn load_cards(path: &Path) -> Vec<CardRecord> {
    if !path.exists() {
        return Vec::new();
    }
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!("Failed to read card store {}: {err}", path.display());
            return Vec::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(cards) => cards,
        Err(err) => {
            warn!("Failed to parse card store {}: {err}", path.display());
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CellPosition;
    use tempfile::tempdir;

    fn filled_card() -> BingoCard {
        let mut card = BingoCard::new();
        for row in 0..crate::card::GRID_SIZE {
            for column in 0..crate::card::GRID_SIZE {
                card.set_value(CellPosition::new(row, column), format!("cell {row}{column}"));
            }
        }
        card
    }

    #[test]
    fn save_and_reload_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let mut store = CardStore::new(dir.path())?;
        let mut card = filled_card();
        card.toggle_mark(CellPosition::new(0, 4));

        let record = store.save_card(&card)?.expect("store should have room");
        assert_eq!(record.grid[0][0], "cell 00");
        assert_eq!(
            record.marked_cells.as_deref(),
            Some(&[crate::card::MarkedPosition { row: 0, column: 4 }][..])
        );

        let reloaded = CardStore::new(dir.path())?;
        assert_eq!(reloaded.cards().len(), 1);
        assert_eq!(reloaded.cards()[0].id, record.id);
        assert_eq!(reloaded.cards_remaining(), MAX_SAVED_CARDS - 1);
        Ok(())
    }

    #[test]
    fn each_save_gets_a_fresh_id() -> Result<()> {
        let dir = tempdir()?;
        let mut store = CardStore::new(dir.path())?;
        let card = filled_card();
        let first = store.save_card(&card)?.expect("first save");
        let second = store.save_card(&card)?.expect("second save");
        assert_ne!(first.id, second.id);
        assert_ne!(first.id, card.id());
        Ok(())
    }

    #[test]
    fn save_refuses_past_capacity() -> Result<()> {
        let dir = tempdir()?;
        let mut store = CardStore::new(dir.path())?;
        let card = filled_card();
        for _ in 0..MAX_SAVED_CARDS {
            assert!(store.save_card(&card)?.is_some());
        }
        assert!(!store.can_save_more());
        assert_eq!(store.cards_remaining(), 0);
        assert!(store.save_card(&card)?.is_none());
        assert_eq!(store.cards().len(), MAX_SAVED_CARDS);
        Ok(())
    }

    #[test]
    fn import_dedupes_by_id() -> Result<()> {
        let dir = tempdir()?;
        let mut store = CardStore::new(dir.path())?;
        let card = filled_card();
        let record = store.save_card(&card)?.expect("save");

        assert_eq!(
            store.import_record(record.clone())?,
            ImportOutcome::AlreadySaved
        );
        assert_eq!(store.cards().len(), 1);

        let mut incoming = record;
        incoming.id = Uuid::new_v4();
        assert_eq!(store.import_record(incoming)?, ImportOutcome::Added);
        assert_eq!(store.cards().len(), 2);
        Ok(())
    }

    #[test]
    fn import_reports_limit_reached() -> Result<()> {
        let dir = tempdir()?;
        let mut store = CardStore::new(dir.path())?;
        let card = filled_card();
        for _ in 0..MAX_SAVED_CARDS {
            store.save_card(&card)?;
        }
        let record = CardRecord {
            id: Uuid::new_v4(),
            grid: card.grid().to_vec(),
            date_created: Utc::now(),
            marked_cells: None,
        };
        assert_eq!(store.import_record(record)?, ImportOutcome::LimitReached);
        assert_eq!(store.cards().len(), MAX_SAVED_CARDS);
        Ok(())
    }

    #[test]
    fn update_keeps_creation_date() -> Result<()> {
        let dir = tempdir()?;
        let mut store = CardStore::new(dir.path())?;
        let record = store.save_card(&filled_card())?.expect("save");

        let mut edited = BingoCard::from_record(&record);
        edited.set_value(CellPosition::new(0, 0), "rewritten");
        edited.toggle_mark(CellPosition::new(4, 4));

        assert!(store.update_card(&edited, record.id)?);
        let saved = store.card(record.id).expect("record present");
        assert_eq!(saved.grid[0][0], "rewritten");
        assert_eq!(saved.date_created, record.date_created);
        assert!(saved.marked_cells.is_some());

        assert!(!store.update_card(&edited, Uuid::new_v4())?);
        Ok(())
    }

    #[test]
    fn delete_removes_by_id() -> Result<()> {
        let dir = tempdir()?;
        let mut store = CardStore::new(dir.path())?;
        let first = store.save_card(&filled_card())?.expect("save");
        let second = store.save_card(&filled_card())?.expect("save");

        store.delete_card(first.id)?;
        assert_eq!(store.cards().len(), 1);
        assert_eq!(store.cards()[0].id, second.id);

        // Deleting an unknown id is a no-op.
        store.delete_card(Uuid::new_v4())?;
        assert_eq!(store.cards().len(), 1);
        Ok(())
    }

    #[test]
    fn oversized_blob_is_truncated_on_load() -> Result<()> {
        let dir = tempdir()?;
        let card = filled_card();
        let records: Vec<CardRecord> = (0..MAX_SAVED_CARDS + 3)
            .map(|_| CardRecord {
                id: Uuid::new_v4(),
                grid: card.grid().to_vec(),
                date_created: Utc::now(),
                marked_cells: None,
            })
            .collect();
        std::fs::write(
            dir.path().join(STORE_FILE),
            serde_json::to_vec_pretty(&records)?,
        )?;

        let store = CardStore::new(dir.path())?;
        assert_eq!(store.cards().len(), MAX_SAVED_CARDS);
        assert_eq!(store.cards()[0].id, records[0].id);

        let reloaded = CardStore::new(dir.path())?;
        assert_eq!(reloaded.cards().len(), MAX_SAVED_CARDS);
        Ok(())
    }

    #[test]
    fn corrupt_blob_falls_back_to_empty() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join(STORE_FILE), b"not json")?;
        let store = CardStore::new(dir.path())?;
        assert!(store.cards().is_empty());
        Ok(())
    }
}
