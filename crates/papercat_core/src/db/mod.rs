//! Catalog storage: connection bootstrap and the `papers`/`categories` schema.
//!
//! Every connection handed out by [`open_db`] and friends has the full
//! catalog schema applied, so repositories never see a half-migrated file.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_db_with_options, DbOpenOptions};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or upgrading a catalog database.
#[derive(Debug)]
pub enum DbError {
    /// Driver error outside of a migration step.
    Sqlite(rusqlite::Error),
    /// The file was written by a newer papercat release.
    SchemaTooNew { found: u32, supported: u32 },
    /// A catalog migration failed; the whole upgrade was rolled back.
    MigrationFailed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "catalog storage error: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "catalog schema version {found} is newer than this build supports ({supported})"
            ),
            Self::MigrationFailed {
                version,
                name,
                source,
            } => write!(f, "catalog migration {version:04}_{name} failed: {source}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::MigrationFailed { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
