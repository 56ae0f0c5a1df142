//! # freon-ceremony
//!
//! The protocol layer of a Freon participant: the envelope that protocol
//! payloads travel in (opaque bytes as far as the relay is concerned), and
//! the two engines that drive frost-ed25519 through its rounds.
//!
//! - [`envelope`] — versioned CBOR envelope with sender and optional
//!   recipient, relayed as hex
//! - [`dkg`] — three-round distributed key generation engine
//! - [`sign`] — two-round threshold signing engine
//!
//! Both engines share one driving shape: `start()` yields the first
//! outbound payloads, `handle()` consumes one inbound payload and yields any
//! follow-ups, and `is_complete()` says when the output is ready. The
//! engines never talk to the network; the client's ceremony driver shuttles
//! payloads between them and the relay log.

pub mod dkg;
pub mod envelope;
pub mod sign;

use frost_ed25519 as frost;

/// Error types for the protocol engines.
#[derive(Debug, thiserror::Error)]
pub enum CeremonyError {
    /// The library rejected a protocol message; the ceremony is dead.
    #[error("protocol aborted: {0}")]
    Aborted(String),

    /// An envelope or package could not be encoded or decoded.
    #[error("payload encoding error: {0}")]
    Encoding(String),

    /// A party id the FROST library cannot represent (zero).
    #[error("invalid party id {0}")]
    InvalidParty(u16),
}

pub type Result<T> = std::result::Result<T, CeremonyError>;

/// Common driving interface shared by the DKG and signing engines.
pub trait Engine {
    /// Produce the engine's opening payloads. Called once.
    fn start(&mut self) -> Result<Vec<Vec<u8>>>;

    /// Consume one inbound payload, producing any outbound payloads the
    /// engine is now ready to send.
    fn handle(&mut self, payload: &[u8]) -> Result<Vec<Vec<u8>>>;

    /// Whether the engine holds its final output.
    fn is_complete(&self) -> bool;
}

pub(crate) fn identifier(party_id: u16) -> Result<frost::Identifier> {
    frost::Identifier::try_from(party_id).map_err(|_| CeremonyError::InvalidParty(party_id))
}
