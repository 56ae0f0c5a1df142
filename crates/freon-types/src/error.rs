//! The tagged error taxonomy shared between coordinator and client.
//!
//! Non-OK HTTP responses carry `{"message": "<token>"}` where the token is
//! one of the fixed strings below. Carrying a tag instead of free-form prose
//! lets the client make structured decisions, most importantly telling a
//! terminal `CeremonyClosed` apart from a retryable transport failure.

use serde::{Deserialize, Serialize};

/// Every failure kind that can surface in Freon, on either side of the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    // Input errors
    #[error("threshold exceeds party size or party size out of range")]
    InvalidThreshold,
    #[error("recipient is not a valid age X25519 public key")]
    BadRecipient,
    #[error("malformed hex or binary encoding")]
    BadEncoding,
    #[error("identity file contains no identities")]
    EmptyIdentityFile,
    #[error("no identity in the file can decrypt this share")]
    NoMatchingIdentity,
    #[error("no local share recorded for this group")]
    NoLocalShare,
    #[error("an enrolled party has no public share in the local record")]
    MissingPublicShare,
    #[error("invalid ceremony configuration")]
    ConfigError,

    // State errors
    #[error("no such group")]
    UnknownGroup,
    #[error("no such ceremony")]
    UnknownCeremony,
    #[error("no such party in this group")]
    UnknownParty,
    #[error("group already has its full complement of participants")]
    GroupFull,
    #[error("group verification key is already set")]
    AlreadyFinalized,
    #[error("ceremony is no longer active")]
    CeremonyClosed,
    #[error("submitted hash does not match the ceremony hash")]
    HashMismatch,
    #[error("ceremony has not produced a signature yet")]
    NotYetSigned,

    // Transient errors
    #[error("request to the coordinator failed")]
    NetworkError,
    #[error("poller failed to fetch messages")]
    PollError,

    // Cryptographic abort
    #[error("the protocol rejected a message and aborted")]
    ProtocolAborted,
}

impl ErrorKind {
    /// The stable token carried in the wire `message` field.
    pub fn wire_token(self) -> &'static str {
        match self {
            ErrorKind::InvalidThreshold => "invalid-threshold",
            ErrorKind::BadRecipient => "bad-recipient",
            ErrorKind::BadEncoding => "bad-encoding",
            ErrorKind::EmptyIdentityFile => "empty-identity-file",
            ErrorKind::NoMatchingIdentity => "no-matching-identity",
            ErrorKind::NoLocalShare => "no-local-share",
            ErrorKind::MissingPublicShare => "missing-public-share",
            ErrorKind::ConfigError => "config-error",
            ErrorKind::UnknownGroup => "unknown-group",
            ErrorKind::UnknownCeremony => "unknown-ceremony",
            ErrorKind::UnknownParty => "unknown-party",
            ErrorKind::GroupFull => "group-full",
            ErrorKind::AlreadyFinalized => "already-finalized",
            ErrorKind::CeremonyClosed => "ceremony-closed",
            ErrorKind::HashMismatch => "hash-mismatch",
            ErrorKind::NotYetSigned => "not-yet-signed",
            ErrorKind::NetworkError => "network-error",
            ErrorKind::PollError => "poll-error",
            ErrorKind::ProtocolAborted => "protocol-aborted",
        }
    }

    /// Parse a wire token back into a kind. Unrecognized tokens map to
    /// `NetworkError` so an older client degrades to a retryable failure
    /// instead of a panic.
    pub fn from_wire_token(token: &str) -> Self {
        match token {
            "invalid-threshold" => ErrorKind::InvalidThreshold,
            "bad-recipient" => ErrorKind::BadRecipient,
            "bad-encoding" => ErrorKind::BadEncoding,
            "empty-identity-file" => ErrorKind::EmptyIdentityFile,
            "no-matching-identity" => ErrorKind::NoMatchingIdentity,
            "no-local-share" => ErrorKind::NoLocalShare,
            "missing-public-share" => ErrorKind::MissingPublicShare,
            "config-error" => ErrorKind::ConfigError,
            "unknown-group" => ErrorKind::UnknownGroup,
            "unknown-ceremony" => ErrorKind::UnknownCeremony,
            "unknown-party" => ErrorKind::UnknownParty,
            "group-full" => ErrorKind::GroupFull,
            "already-finalized" => ErrorKind::AlreadyFinalized,
            "ceremony-closed" => ErrorKind::CeremonyClosed,
            "hash-mismatch" => ErrorKind::HashMismatch,
            "not-yet-signed" => ErrorKind::NotYetSigned,
            "poll-error" => ErrorKind::PollError,
            "protocol-aborted" => ErrorKind::ProtocolAborted,
            _ => ErrorKind::NetworkError,
        }
    }
}

/// The body of every non-OK coordinator response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// A wire token from [`ErrorKind::wire_token`].
    pub message: String,
}

impl From<ErrorKind> for ErrorBody {
    fn from(kind: ErrorKind) -> Self {
        ErrorBody {
            message: kind.wire_token().to_string(),
        }
    }
}
