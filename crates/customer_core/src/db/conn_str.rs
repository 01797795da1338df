//! Connection string parsing.
//!
//! Accepted forms:
//! - `sqlite::memory:` / `:memory:`: private in-memory database
//! - `sqlite://<path>` / `sqlite:<path>`: database file
//! - `file:<path>?<params>`: SQLite URI, passed through untouched
//! - bare path: database file
//!
//! Any other `<scheme>://` prefix is rejected.

use super::DbError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Where a parsed connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    Memory,
    Path(String),
    Uri(String),
}

/// Validated database connection descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    target: OpenTarget,
}

impl ConnectionString {
    pub fn target(&self) -> &OpenTarget {
        &self.target
    }

    /// Short label for log lines; never includes the path.
    pub fn mode(&self) -> &'static str {
        match self.target {
            OpenTarget::Memory => "memory",
            OpenTarget::Path(_) => "file",
            OpenTarget::Uri(_) => "uri",
        }
    }
}

impl FromStr for ConnectionString {
    type Err = DbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DbError::InvalidConnectionString(
                "connection string cannot be empty".to_string(),
            ));
        }

        if trimmed == ":memory:" || trimmed == "sqlite::memory:" {
            return Ok(Self {
                target: OpenTarget::Memory,
            });
        }

        if trimmed.starts_with("file:") {
            return Ok(Self {
                target: OpenTarget::Uri(trimmed.to_string()),
            });
        }

        let path = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
            rest
        } else if let Some(rest) = trimmed.strip_prefix("sqlite:") {
            rest
        } else if let Some((scheme, _)) = trimmed.split_once("://") {
            return Err(DbError::InvalidConnectionString(format!(
                "unsupported scheme `{scheme}`; expected sqlite or file"
            )));
        } else {
            trimmed
        };

        if path.is_empty() {
            return Err(DbError::InvalidConnectionString(
                "connection string has no database path".to_string(),
            ));
        }

        Ok(Self {
            target: OpenTarget::Path(path.to_string()),
        })
    }
}

impl Display for ConnectionString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            OpenTarget::Memory => write!(f, "sqlite::memory:"),
            OpenTarget::Path(path) => write!(f, "sqlite://{path}"),
            OpenTarget::Uri(uri) => write!(f, "{uri}"),
        }
    }
}
