//! Transcript digest and deterministic leader election.
//!
//! Exactly one party in a quorum reports the final artifact to the
//! coordinator. Rather than running an extra consensus round, the parties
//! derive the reporter from a transcript hash they all compute over the same
//! relay log: every inbound payload is folded in log-id order, so every
//! honest party finishes the ceremony holding the same digest and the same
//! answer to "am I elected?".

use sha2::{Digest, Sha384};

/// Domain-separation seed for keygen transcripts.
pub const KEYGEN_TRANSCRIPT_PREFIX: &[u8] = b"FREON KeyGen Ceremony v1";

/// Domain-separation seed for signing transcripts.
pub const SIGN_TRANSCRIPT_PREFIX: &[u8] = b"FREON Sign Ceremony v1";

/// A streaming SHA-384 digest over every protocol payload a party observes
/// in the relay log, seeded with a ceremony-specific prefix.
#[derive(Clone)]
pub struct Transcript {
    digest: Sha384,
}

impl Transcript {
    /// A transcript seeded for a keygen ceremony.
    pub fn for_keygen() -> Self {
        Self::with_prefix(KEYGEN_TRANSCRIPT_PREFIX)
    }

    /// A transcript seeded for a signing ceremony.
    pub fn for_sign() -> Self {
        Self::with_prefix(SIGN_TRANSCRIPT_PREFIX)
    }

    fn with_prefix(prefix: &[u8]) -> Self {
        let mut digest = Sha384::new();
        digest.update(prefix);
        Transcript { digest }
    }

    /// Fold one payload's raw bytes into the transcript.
    pub fn fold(&mut self, payload: &[u8]) {
        self.digest.update(payload);
    }

    /// The 48-byte digest of everything folded so far.
    pub fn current(&self) -> [u8; 48] {
        self.digest.clone().finalize().into()
    }
}

/// Reduce a transcript hash to an index in `[0, party_size)`.
///
/// The last 8 bytes are read as a big-endian u64 and reduced modulo
/// `party_size`. The modulus never exceeds 2^16, so the modulo bias is
/// bounded above by 2^-48.
///
/// # Panics
///
/// Panics if the hash is shorter than 8 bytes or `party_size` is zero; both
/// indicate a programming error, not an operator-reachable condition.
pub fn select_index(hash: &[u8], party_size: u64) -> u64 {
    assert!(hash.len() >= 8, "transcript hash must be at least 8 bytes");
    assert!(party_size >= 1, "party size must be at least 1");
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&hash[hash.len() - 8..]);
    u64::from_be_bytes(tail) % party_size
}

/// Whether `me` is the elected reporter for the given transcript hash.
///
/// `parties` is the set of participating party ids, in any order. A party
/// outside the set is never elected; a sole member always is.
pub fn am_i_elected(hash: &[u8], me: u16, parties: &[u16]) -> bool {
    if !parties.contains(&me) {
        return false;
    }
    if parties.len() <= 1 {
        return true;
    }
    let mut sorted = parties.to_vec();
    sorted.sort_unstable();
    let index = select_index(hash, sorted.len() as u64);
    sorted[index as usize] == me
}
