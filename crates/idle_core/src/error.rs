//! Error types for infrastructure failures.
//!
//! Gameplay actions (building, pets, upgrades) have their own error enums
//! next to the systems that produce them; this type covers loading data
//! and moving state in and out of the engine.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for engine IO-adjacent failures.
#[derive(Debug, Error)]
pub enum GameError {
    /// A data catalog could not be parsed.
    #[error("Failed to parse catalog '{name}': {message}")]
    CatalogParse {
        /// Catalog being parsed (file name or "builtin").
        name: String,
        /// Parser message.
        message: String,
    },

    /// A catalog parsed but violates its invariants.
    #[error("Invalid catalog '{name}': {problems:?}")]
    CatalogInvalid {
        /// Catalog name.
        name: String,
        /// Every problem found.
        problems: Vec<String>,
    },

    /// A save blob was not valid JSON for the save shape.
    #[error("Failed to parse save data: {0}")]
    SaveParse(String),

    /// A save could not be written as JSON.
    #[error("Failed to encode save data: {0}")]
    SaveEncode(String),

    /// Engine state could not be encoded or decoded.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
