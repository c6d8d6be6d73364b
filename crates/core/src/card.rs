//! In-memory bingo card model and its persisted snapshot form.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of rows and columns on a card.
pub const GRID_SIZE: usize = 5;

/// Fixed text of the centre free square.
pub const FREE_LABEL: &str = "FREE";

/// Column header letters displayed above the grid.
pub const COLUMN_LETTERS: [&str; GRID_SIZE] = ["B", "I", "N", "G", "O"];

/// Coordinate of a single cell on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPosition {
    /// Row index, 0-based from the top.
    pub row: usize,
    /// Column index, 0-based from the left.
    pub column: usize,
}

impl CellPosition {
    /// Create a position from row and column indices.
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Whether this is the immutable centre free square.
    pub fn is_center(&self) -> bool {
        self.row == GRID_SIZE / 2 && self.column == GRID_SIZE / 2
    }

    /// Whether the position lies on the grid at all.
    pub fn in_bounds(&self) -> bool {
        self.row < GRID_SIZE && self.column < GRID_SIZE
    }
}

/// Serialized form of a marked cell inside a [`CardRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkedPosition {
    /// Row index of the marked cell.
    pub row: usize,
    /// Column index of the marked cell.
    pub column: usize,
}

impl From<CellPosition> for MarkedPosition {
    fn from(pos: CellPosition) -> Self {
        Self {
            row: pos.row,
            column: pos.column,
        }
    }
}

/// Persisted snapshot of a card, as stored locally and shared between
/// devices via deep links.
///
/// Field names follow the original wire format (`dateCreated`,
/// `markedCells`); `markedCells` is omitted entirely when a card has
/// never been played.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    /// Stable identifier used for dedupe on import.
    pub id: Uuid,
    /// Row-major 5x5 grid of cell text.
    pub grid: Vec<Vec<String>>,
    /// When the card was first saved.
    pub date_created: DateTime<Utc>,
    /// Cells marked complete, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marked_cells: Option<Vec<MarkedPosition>>,
}

impl CardRecord {
    /// True when the grid has exactly [`GRID_SIZE`] rows of
    /// [`GRID_SIZE`] cells each.
    pub fn has_valid_grid(&self) -> bool {
        self.grid.len() == GRID_SIZE && self.grid.iter().all(|row| row.len() == GRID_SIZE)
    }
}

/// Mutable play state for a single card: the grid text plus the set of
/// marked cells.
#[derive(Debug, Clone)]
pub struct BingoCard {
    id: Uuid,
    grid: Vec<Vec<String>>,
    marked: HashSet<CellPosition>,
}

impl Default for BingoCard {
    fn default() -> Self {
        Self::new()
    }
}

impl BingoCard {
    /// Create an empty card with the centre square preset to `FREE`.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            grid: empty_grid(),
            marked: HashSet::new(),
        }
    }

    /// Rebuild play state from a stored record.
    ///
    /// The grid is normalised to 5x5 and the centre square is forced
    /// back to `FREE`, so a malformed record can never break the model
    /// invariants.
    pub fn from_record(record: &CardRecord) -> Self {
        let mut grid = empty_grid();
        for (row_idx, row) in record.grid.iter().take(GRID_SIZE).enumerate() {
            for (col_idx, value) in row.iter().take(GRID_SIZE).enumerate() {
                grid[row_idx][col_idx] = value.clone();
            }
        }
        grid[GRID_SIZE / 2][GRID_SIZE / 2] = FREE_LABEL.to_string();

        let marked = record
            .marked_cells
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|pos| {
                let pos = CellPosition::new(pos.row, pos.column);
                pos.in_bounds().then_some(pos)
            })
            .collect();

        Self {
            id: record.id,
            grid,
            marked,
        }
    }

    /// Identifier carried over into saved and shared records.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Borrow the full grid, row-major.
    pub fn grid(&self) -> &[Vec<String>] {
        &self.grid
    }

    /// Text of the cell at `pos`, or the empty string out of bounds.
    pub fn value(&self, pos: CellPosition) -> &str {
        self.grid
            .get(pos.row)
            .and_then(|row| row.get(pos.column))
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Set the text of the cell at `pos`.
    ///
    /// Writes to the centre square or out-of-bounds coordinates are
    /// ignored.
    pub fn set_value(&mut self, pos: CellPosition, value: impl Into<String>) {
        if pos.is_center() || !pos.in_bounds() {
            return;
        }
        self.grid[pos.row][pos.column] = value.into();
    }

    /// Reset every cell to empty (centre back to `FREE`) and drop all
    /// marks.
    pub fn clear(&mut self) {
        self.grid = empty_grid();
        self.marked.clear();
    }

    /// True when every non-centre cell has text. Gates play mode.
    pub fn is_filled(&self) -> bool {
        for (row_idx, row) in self.grid.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                if CellPosition::new(row_idx, col_idx).is_center() {
                    continue;
                }
                if value.is_empty() {
                    return false;
                }
            }
        }
        true
    }

    /// Flip the mark on the cell at `pos`.
    pub fn toggle_mark(&mut self, pos: CellPosition) {
        if !pos.in_bounds() {
            return;
        }
        if !self.marked.remove(&pos) {
            self.marked.insert(pos);
        }
    }

    /// Whether the cell at `pos` is marked complete.
    pub fn is_marked(&self, pos: CellPosition) -> bool {
        self.marked.contains(&pos)
    }

    /// Number of marked cells.
    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Marks in row-major order, ready for persistence.
    pub fn marked_positions(&self) -> Vec<MarkedPosition> {
        let mut positions: Vec<CellPosition> = self.marked.iter().copied().collect();
        positions.sort_by_key(|pos| (pos.row, pos.column));
        positions.into_iter().map(MarkedPosition::from).collect()
    }
}

fn empty_grid() -> Vec<Vec<String>> {
    let mut grid = vec![vec![String::new(); GRID_SIZE]; GRID_SIZE];
    grid[GRID_SIZE / 2][GRID_SIZE / 2] = FREE_LABEL.to_string();
    grid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_card() -> BingoCard {
        let mut card = BingoCard::new();
        for row in 0..GRID_SIZE {
            for column in 0..GRID_SIZE {
                card.set_value(CellPosition::new(row, column), format!("cell {row}{column}"));
            }
        }
        card
    }

    #[test]
    fn new_card_has_free_center() {
        let card = BingoCard::new();
        assert_eq!(card.value(CellPosition::new(2, 2)), FREE_LABEL);
        assert!(!card.is_filled());
    }

    #[test]
    fn center_cell_is_immutable() {
        let mut card = BingoCard::new();
        card.set_value(CellPosition::new(2, 2), "overwritten");
        assert_eq!(card.value(CellPosition::new(2, 2)), FREE_LABEL);
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut card = BingoCard::new();
        card.set_value(CellPosition::new(7, 0), "nope");
        assert_eq!(card.grid().len(), GRID_SIZE);
        assert_eq!(card.value(CellPosition::new(7, 0)), "");
    }

    #[test]
    fn is_filled_ignores_center() {
        let card = filled_card();
        assert!(card.is_filled());

        let mut partial = filled_card();
        partial.set_value(CellPosition::new(0, 0), "");
        assert!(!partial.is_filled());
    }

    #[test]
    fn toggling_twice_restores_state() {
        let mut card = filled_card();
        let pos = CellPosition::new(1, 3);
        card.toggle_mark(pos);
        assert!(card.is_marked(pos));
        card.toggle_mark(pos);
        assert!(!card.is_marked(pos));
        assert_eq!(card.marked_count(), 0);
    }

    #[test]
    fn clear_resets_grid_and_marks() {
        let mut card = filled_card();
        card.toggle_mark(CellPosition::new(0, 0));
        card.clear();
        assert_eq!(card.value(CellPosition::new(0, 0)), "");
        assert_eq!(card.value(CellPosition::new(2, 2)), FREE_LABEL);
        assert_eq!(card.marked_count(), 0);
    }

    #[test]
    fn from_record_normalizes_malformed_grids() {
        let record = CardRecord {
            id: Uuid::new_v4(),
            grid: vec![vec!["a".to_string(); 2]; 3],
            date_created: Utc::now(),
            marked_cells: Some(vec![
                MarkedPosition { row: 0, column: 1 },
                MarkedPosition { row: 9, column: 9 },
            ]),
        };
        let card = BingoCard::from_record(&record);
        assert_eq!(card.grid().len(), GRID_SIZE);
        assert_eq!(card.value(CellPosition::new(2, 2)), FREE_LABEL);
        assert!(card.is_marked(CellPosition::new(0, 1)));
        assert_eq!(card.marked_count(), 1);
    }

    #[test]
    fn record_serializes_with_wire_field_names() {
        let record = CardRecord {
            id: Uuid::new_v4(),
            grid: vec![vec![String::new(); GRID_SIZE]; GRID_SIZE],
            date_created: Utc::now(),
            marked_cells: None,
        };
        let json = serde_json::to_value(&record).expect("serialize record");
        assert!(json.get("dateCreated").is_some());
        assert!(json.get("markedCells").is_none());
    }
}
