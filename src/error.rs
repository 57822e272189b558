//! Error types for the recoverable layers: textual input, board import,
//! configuration files and move validation.
//!
//! Search and board preconditions (full columns, unknown fingerprints,
//! zero temperature) are programming errors and panic instead.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to parse a column from text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseMoveError {
    #[error("'{0}' is not a column number")]
    NotANumber(String),

    #[error("column {0} is out of range (0-6)")]
    OutOfRange(usize),
}

/// A raw grid that no sequence of moves could produce
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("disc at row {row}, column {col} has an empty cell below it")]
    FloatingDisc { row: usize, col: usize },

    #[error("cell at row {row}, column {col} holds {value}, expected 0, 1 or -1")]
    InvalidCell { row: usize, col: usize, value: i32 },

    #[error("both players have four in a row")]
    TwoWinners,

    #[error("turn order must be [1, -1] or [-1, 1], got {0:?}")]
    InvalidPlayers(Vec<i32>),

    #[error("first player holds {first} discs and second player {second}")]
    DiscCount { first: usize, second: usize },
}

/// Move rejected by the game controller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveValidationError {
    #[error("column {0} is out of range (0-6)")]
    ColumnOutOfRange(usize),

    #[error("column {0} is full")]
    ColumnFull(usize),

    #[error("game is already over")]
    GameAlreadyOver,
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown difficulty profile '{0}' (expected normal, hard or god)")]
    UnknownProfile(String),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
