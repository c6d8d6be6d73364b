#![warn(clippy::all, missing_docs)]

//! Core domain logic for the bingo card maker.
//!
//! This crate hosts the card grid model, the bounded persistent
//! card store, the share-link codec, and configuration handling
//! used by the terminal UI and any future frontends.

pub mod card;
pub mod config;
pub mod share;
pub mod store;

pub use card::{
    BingoCard, CardRecord, CellPosition, MarkedPosition, COLUMN_LETTERS, FREE_LABEL, GRID_SIZE,
};
pub use config::AppConfig;
pub use share::ShareError;
pub use store::{CardStore, ImportOutcome, MAX_SAVED_CARDS};
