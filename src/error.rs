use thiserror::Error;

use crate::forms::FormErrors;

#[derive(Error, Debug)]
pub enum FyyurError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Validation failed: {0}")]
    Validation(FormErrors),

    #[error("Integrity violation: {message}")]
    IntegrityViolation { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template rendering failed: {0}")]
    Template(#[from] askama::Error),
}

impl FyyurError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        FyyurError::NotFound { entity, id }
    }

    pub fn database(message: impl Into<String>) -> Self {
        FyyurError::Database {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FyyurError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, FyyurError>;
