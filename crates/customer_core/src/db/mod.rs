//! Database connection bootstrap.
//!
//! # Responsibility
//! - Parse connection strings into SQLite open targets.
//! - Open and configure connections for the customer repository.
//!
//! # Invariants
//! - Opening never creates a database or schema; both must pre-exist.
//! - Returned connections have been probed with a real read.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod conn_str;
mod open;

pub use conn_str::{ConnectionString, OpenTarget};
pub use open::{clamp_busy_timeout, open_db, DEFAULT_BUSY_TIMEOUT, MAX_BUSY_TIMEOUT};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    InvalidConnectionString(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidConnectionString(message) => {
                write!(f, "invalid connection string: {message}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::InvalidConnectionString(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
