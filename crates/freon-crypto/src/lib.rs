//! # freon-crypto
//!
//! The derived cryptographic primitives that glue Freon's ceremonies
//! together. The FROST arithmetic itself lives in `freon-ceremony`; this
//! crate holds everything around it:
//!
//! - [`envelope`] — age share-at-rest encryption to an X25519 recipient
//! - [`sanity`] — HMAC-SHA-384 binding of a candidate message to a group id
//! - [`election`] — transcript digest and deterministic leader election
//! - [`ids`] — unique identifiers and the big-endian u16 hex codec
//! - [`sshsig`] — OpenSSH SSHSIG armoring of a finished signature

pub mod election;
pub mod envelope;
pub mod ids;
pub mod sanity;
pub mod sshsig;

/// Error types for the primitive operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// The recipient string is not a valid age X25519 public key.
    #[error("not a valid age X25519 recipient")]
    BadRecipient,

    /// Malformed hex, or bytes of the wrong shape for the codec.
    #[error("malformed encoding")]
    BadEncoding,

    /// The identity file parsed but yielded no identities.
    #[error("identity file contains no identities")]
    EmptyIdentityFile,

    /// Every identity in the file failed to open the envelope.
    #[error("no identity in the file can decrypt this envelope")]
    NoMatchingIdentity,

    /// The age envelope itself could not be produced or read.
    #[error("envelope error: {0}")]
    Envelope(String),

    /// Filesystem failure while reading an identity file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
