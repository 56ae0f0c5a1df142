//! # freon-db
//!
//! The coordinator's persistent store: the registry of groups, participants,
//! ceremonies, and players, plus the two append-only message logs (keygen
//! keyed by group, sign keyed by ceremony).
//!
//! The store holds no secrets. Protocol payloads pass through as opaque hex
//! and are never interpreted; the only cryptographic judgment made here is
//! the constant-time sanity-hash comparison on ceremony join.
//!
//! Callers serialize access (the coordinator wraps one connection in a
//! mutex), so each exported operation is a single transaction by exclusion.

pub mod migrations;
pub mod queries;
pub mod schema;

use std::path::Path;

use rusqlite::Connection;

use freon_types::ErrorKind;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("stored payload is not valid hex")]
    Corrupt,

    #[error("no such group")]
    UnknownGroup,

    #[error("no such ceremony")]
    UnknownCeremony,

    #[error("no such party in this group")]
    UnknownParty,

    #[error("group is full")]
    GroupFull,

    #[error("threshold exceeds party size or party size out of range")]
    InvalidThreshold,

    #[error("group verification key is already set")]
    AlreadyFinalized,

    #[error("ceremony is no longer active")]
    CeremonyClosed,

    #[error("submitted hash does not match the ceremony hash")]
    HashMismatch,

    #[error("ceremony has not produced a signature yet")]
    NotYetSigned,
}

impl DbError {
    /// Map a store failure onto the wire error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Sqlite(_) | DbError::Migration(_) => ErrorKind::NetworkError,
            DbError::Corrupt => ErrorKind::BadEncoding,
            DbError::UnknownGroup => ErrorKind::UnknownGroup,
            DbError::UnknownCeremony => ErrorKind::UnknownCeremony,
            DbError::UnknownParty => ErrorKind::UnknownParty,
            DbError::GroupFull => ErrorKind::GroupFull,
            DbError::InvalidThreshold => ErrorKind::InvalidThreshold,
            DbError::AlreadyFinalized => ErrorKind::AlreadyFinalized,
            DbError::CeremonyClosed => ErrorKind::CeremonyClosed,
            DbError::HashMismatch => ErrorKind::HashMismatch,
            DbError::NotYetSigned => ErrorKind::NotYetSigned,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the coordinator database at the given path.
///
/// Configures WAL mode and foreign keys, then runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}
