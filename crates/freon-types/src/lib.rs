//! # freon-types
//!
//! Shared domain types used across the Freon workspace: the JSON bodies of
//! every coordinator endpoint, the tagged error kinds carried in non-OK
//! responses, and the client-side share record.
//!
//! The coordinator and the participant client both depend on this crate, so
//! a request struct serialized by one side always matches what the other
//! side parses.

pub mod error;
pub mod share;
pub mod wire;

pub use error::ErrorKind;

/// A party's position inside a group, assigned densely from 1 at join time.
pub type PartyId = u16;

/// Prefix of group identifiers (`g_` + 48 hex).
pub const GROUP_ID_PREFIX: &str = "g_";

/// Prefix of ceremony identifiers (`c_` + 48 hex).
pub const CEREMONY_ID_PREFIX: &str = "c_";

/// Prefix of participant identifiers (`p_` + 48 hex).
pub const PARTICIPANT_ID_PREFIX: &str = "p_";

/// Smallest group a keygen ceremony will accept.
pub const MIN_PARTY_SIZE: u16 = 2;

/// Largest group a keygen ceremony will accept.
pub const MAX_PARTY_SIZE: u16 = 255;
