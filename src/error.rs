//! Error types for the WorryTree application
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for user-visible notification surfaces.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Worry not found: {0}")]
    WorryNotFound(String),

    #[error("Record store error: {0}")]
    Store(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
