use thiserror::Error;

#[derive(Error, Debug)]
pub enum RoutinelyError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoutinelyError>;

impl RoutinelyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RoutinelyError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        RoutinelyError::NotFound(what.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RoutinelyError::Validation(_) | RoutinelyError::NotFound(_)
        )
    }
}
