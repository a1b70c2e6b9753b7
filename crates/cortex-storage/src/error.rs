use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Conversation {0} not found")]
    NotFound(String),

    #[error("Invalid conversation id: {0:?}")]
    InvalidId(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
