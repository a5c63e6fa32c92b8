//! Data ingestion and storage
//!
//! Games CSV import, team label normalization and SQLite persistence.

pub mod database;
pub mod games;
pub mod teams;

pub use database::{Database, DatabaseStats};
pub use games::{read_games, read_games_csv};
pub use teams::{canonical_name, normalize_team};
