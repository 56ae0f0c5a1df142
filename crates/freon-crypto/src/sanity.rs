//! The sanity hash binding a candidate message to its group.
//!
//! `HMAC-SHA-384(key = SHA-384(group_id), msg = message)`. The coordinator
//! stores the creator's hash and compares it in constant time when a party
//! joins, so a ceremony created for one group can never be joined with a
//! message accepted under another group's id.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha384};

type HmacSha384 = Hmac<Sha384>;

/// Compute the hex sanity hash of `message` under `group_id`.
pub fn sanity_hash(message: &[u8], group_id: &str) -> String {
    let key = Sha384::digest(group_id.as_bytes());
    let mut mac =
        HmacSha384::new_from_slice(&key).expect("HMAC-SHA-384 accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::unique_id;

    #[test]
    fn binds_message_and_group() {
        let id = unique_id();
        let group = format!("g_{id}");
        let other = format!("c_{id}");

        let hashes = [
            sanity_hash(b"Hello World", &group),
            sanity_hash(b"Hello World", &other),
            sanity_hash(b"UwU", &group),
            sanity_hash(b"UwU", &other),
        ];
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn is_deterministic() {
        assert_eq!(
            sanity_hash(b"candidate", "g_0123"),
            sanity_hash(b"candidate", "g_0123")
        );
    }

    #[test]
    fn digest_is_sha384_sized() {
        // 48 bytes, hex-encoded.
        assert_eq!(sanity_hash(b"x", "g_0").len(), 96);
    }
}
