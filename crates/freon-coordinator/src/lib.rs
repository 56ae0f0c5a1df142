//! # freon-coordinator
//!
//! The coordinating server: a persistent registry of groups, ceremonies,
//! and participants, plus two append-only message logs that it relays
//! without ever interpreting. Participants drive every state change through
//! the POST-only JSON API in [`routes`]; the coordinator stores no secrets
//! and validates only the sanity hash and ceremony lifecycle.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Mutex;

use rusqlite::Connection;

/// Shared server state: one SQLite connection behind a mutex.
///
/// The mutex is the store's serialization point: every store operation runs
/// to completion while holding it, which is what makes each request a single
/// transaction without explicit BEGIN/COMMIT bookkeeping per handler.
pub struct AppState {
    pub db: Mutex<Connection>,
}

impl AppState {
    pub fn new(db: Connection) -> Self {
        AppState { db: Mutex::new(db) }
    }
}
