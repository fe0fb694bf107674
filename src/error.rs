use thiserror::Error;

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing or malformed required fields, or a broken reference.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("corrupt record payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
