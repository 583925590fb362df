// ⚠️ Error taxonomy for the rally system
// Connection failures end the session, storage failures end one operation,
// validation failures happen before anything touches the database.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RallyError {
    #[error("Cannot open database at {path:?}: {source}")]
    Connection {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("No cars available for racing!")]
    NoCars,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RallyError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        RallyError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// True for failures caught before any database call
    pub fn is_validation(&self) -> bool {
        matches!(self, RallyError::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, RallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = RallyError::validation("car name", "must not be empty");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "Invalid car name: must not be empty");
    }

    #[test]
    fn test_storage_is_not_validation() {
        let err = RallyError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("Database error"));
    }
}
