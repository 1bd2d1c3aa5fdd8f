//! Core error types for breathroom-core.
//!
//! This module defines the error hierarchy using thiserror. Invalid control
//! calls (pause while idle, start while running) are not errors: they are
//! reported as `None` by the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for breathroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A routine id could not be resolved against the catalog
    #[error("Unknown routine: {id}")]
    RoutineNotFound { id: String },

    /// A combo id could not be resolved against the catalog
    #[error("Unknown combo: {id}")]
    ComboNotFound { id: String },

    /// Remote history store failures
    #[error("Remote history error: {message}")]
    Remote {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A collaborator (cue or visual sink) failed
    #[error("Sink '{sink}' failed: {message}")]
    Sink { sink: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Row could not be decoded into a domain value
    #[error("Corrupt row in {table}: {message}")]
    CorruptRow { table: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be prepared
    #[error("Cannot prepare data directory {path}: {message}")]
    DataDir { path: PathBuf, message: String },
}

/// Validation errors, worded for the user who typed the input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name missing or too long
    #[error("Name must be between 1 and {max} characters")]
    InvalidName { max: usize },

    /// Routine duration outside the accepted range
    #[error("Duration must be between {min} and {max} minutes (got {got})")]
    DurationOutOfRange { min: u32, max: u32, got: u32 },

    /// A phase duration is negative, non-finite, too short or too long
    #[error("Phase '{phase}' must be 0 or between {min} and {max} seconds (got {got})")]
    PhaseOutOfRange { phase: String, min: f64, max: f64, got: f64 },

    /// Every phase is zero
    #[error("At least one phase must be longer than 0 seconds")]
    NoActivePhase,

    /// Combo without members
    #[error("A combo needs at least one routine")]
    EmptyCombo,

    /// Combo member not present in the catalog
    #[error("Unknown routine in combo: {0}")]
    UnknownRoutine(String),

    /// Built-in entries are read-only
    #[error("'{0}' is built in and cannot be deleted")]
    BuiltIn(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Remote {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
