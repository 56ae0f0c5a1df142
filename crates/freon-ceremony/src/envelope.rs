//! The protocol message envelope.
//!
//! Everything a party posts to the relay is one of these, CBOR-serialized
//! and hex-encoded for transport. The relay never looks inside; the envelope
//! exists so receiving parties can tell who sent a payload, whether it is
//! addressed to them, and which package type to deserialize.

use serde::{Deserialize, Serialize};

use crate::{CeremonyError, Result};

/// Current envelope version.
pub const ENVELOPE_VERSION: u8 = 1;

/// Which FROST package the body carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayloadKind {
    /// A DKG round-1 commitment package, broadcast.
    DkgRound1,
    /// A DKG round-2 share package, addressed to one recipient.
    DkgRound2,
    /// A signing nonce-commitment package, broadcast.
    SignCommit,
    /// A signature share, broadcast.
    SignShare,
}

/// One protocol message as it travels through the relay log.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    /// Envelope version. Must be [`ENVELOPE_VERSION`].
    pub version: u8,
    /// Body type.
    pub kind: PayloadKind,
    /// Sending party id.
    pub from: u16,
    /// Recipient party id; `None` for broadcast.
    pub to: Option<u16>,
    /// Serialized FROST package.
    pub body: Vec<u8>,
}

impl Envelope {
    /// A broadcast envelope.
    pub fn broadcast(kind: PayloadKind, from: u16, body: Vec<u8>) -> Self {
        Envelope {
            version: ENVELOPE_VERSION,
            kind,
            from,
            to: None,
            body,
        }
    }

    /// An envelope addressed to one party.
    pub fn addressed(kind: PayloadKind, from: u16, to: u16, body: Vec<u8>) -> Self {
        Envelope {
            version: ENVELOPE_VERSION,
            kind,
            from,
            to: Some(to),
            body,
        }
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| CeremonyError::Encoding(format!("envelope serialization: {e}")))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes, rejecting unknown versions.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let envelope: Envelope = ciborium::from_reader(data)
            .map_err(|e| CeremonyError::Encoding(format!("envelope deserialization: {e}")))?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(CeremonyError::Encoding(format!(
                "unsupported envelope version {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }

    /// Whether a party should feed this envelope to its engine: it must come
    /// from someone else and be broadcast or addressed to the party. Other
    /// traffic (self-echoes from the log, third-party round-2 packages) is
    /// relay noise.
    pub fn is_for(&self, me: u16) -> bool {
        self.from != me && self.to.map_or(true, |to| to == me)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_cbor() {
        let envelope = Envelope::addressed(PayloadKind::DkgRound2, 3, 1, vec![0xde, 0xad]);
        let bytes = envelope.to_bytes().expect("serialize");
        let parsed = Envelope::from_bytes(&bytes).expect("deserialize");
        assert_eq!(parsed.kind, PayloadKind::DkgRound2);
        assert_eq!(parsed.from, 3);
        assert_eq!(parsed.to, Some(1));
        assert_eq!(parsed.body, vec![0xde, 0xad]);
    }

    #[test]
    fn rejects_unknown_version() {
        let mut envelope = Envelope::broadcast(PayloadKind::DkgRound1, 1, vec![]);
        envelope.version = 9;
        let bytes = envelope.to_bytes().expect("serialize");
        assert!(Envelope::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(Envelope::from_bytes(b"not cbor at all").is_err());
    }

    #[test]
    fn addressing_rules() {
        let broadcast = Envelope::broadcast(PayloadKind::SignCommit, 2, vec![]);
        assert!(broadcast.is_for(1));
        assert!(!broadcast.is_for(2), "own echo is not consumed");

        let addressed = Envelope::addressed(PayloadKind::DkgRound2, 2, 3, vec![]);
        assert!(addressed.is_for(3));
        assert!(!addressed.is_for(1), "third parties relay but do not consume");
        assert!(!addressed.is_for(2));
    }
}
