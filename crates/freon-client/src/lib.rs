//! # freon-client
//!
//! The participant side of Freon. One crate covers everything a party does:
//!
//! - [`relay`] — typed HTTP client for the coordinator's API
//! - [`store`] — the local JSON share store
//! - [`driver`] — the generic round loop: a poller task and a protocol
//!   engine sharing one inbox
//! - [`keygen`] — the DKG ceremony, from enrollment to the persisted share
//! - [`sign`] — the signing ceremony, from share lookup to the encoded
//!   signature
//!
//! The binary in `main.rs` is a thin clap front-end over these modules.

pub mod driver;
pub mod keygen;
pub mod relay;
pub mod sign;
pub mod store;

use freon_types::ErrorKind;

/// Error types for participant operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The coordinator rejected the request with a tagged kind.
    #[error("coordinator: {}", .0.wire_token())]
    Api(ErrorKind),

    /// The request never produced a usable response.
    #[error("network: {0}")]
    Network(String),

    /// A primitive operation failed (envelope, codec, identity file).
    #[error(transparent)]
    Crypto(#[from] freon_crypto::CryptoError),

    /// The protocol engine failed or aborted.
    #[error(transparent)]
    Ceremony(#[from] freon_ceremony::CeremonyError),

    /// The ceremony parameters are unusable (e.g. `t > n`).
    #[error("configuration error: {0}")]
    Config(String),

    /// The share store has no record for the group.
    #[error("no local share recorded for group {0}")]
    NoLocalShare(String),

    /// An enrolled party has no public share in the local record.
    #[error("no public share recorded for party {0}")]
    MissingPublicShare(u16),

    /// The share store could not be read or written.
    #[error("share store: {0}")]
    Store(String),

    /// The one-hour ceremony deadline passed.
    #[error("ceremony timed out")]
    Timeout,
}

impl ClientError {
    /// Whether the failure is worth retrying on the next tick.
    ///
    /// Only transport-level failures qualify; a tagged coordinator error is
    /// a fact about ceremony state, not the network.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
