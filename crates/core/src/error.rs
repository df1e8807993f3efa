use crate::store::DbError;
use crate::validation::FieldErrors;

/// The two record types held by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Patient,
    Entry,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Patient => write!(f, "patient"),
            RecordKind::Entry => write!(f, "entry"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },
    #[error("invalid page")]
    InvalidPage,
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<FieldErrors> for RecordError {
    fn from(errors: FieldErrors) -> Self {
        RecordError::Validation(errors)
    }
}

impl From<rusqlite::Error> for RecordError {
    fn from(err: rusqlite::Error) -> Self {
        RecordError::Storage(DbError::Sqlite(err))
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
