use std::fmt;

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// Unknown entity: kind ("room", "timespan", ...) plus the id looked up.
    NotFound { kind: &'static str, id: i64 },
    /// Request contradicts the data model (bad enum value, source == target,
    /// no group on either side of a merge).
    Validation(String),
    /// State conflict: device already registered, timespan already closed.
    Conflict(String),
    InvalidData(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "SQLite error: {e}"),
            StoreError::NotFound { kind, id } => write!(f, "{kind} {id} not found"),
            StoreError::Validation(msg) => write!(f, "validation failed: {msg}"),
            StoreError::Conflict(msg) => write!(f, "conflict: {msg}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
