//! Unique identifiers and the big-endian u16 codec.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::{CryptoError, Result};

/// 24 cryptographically random bytes as 48 lowercase hex characters.
///
/// UUIDs are not used here: their 122 bits of entropy are too thin for
/// identifiers that double as unguessable capability tokens.
pub fn unique_id() -> String {
    let mut bytes = [0u8; 24];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Encode a party id as exactly 4 hex characters, big-endian.
pub fn uint16_to_hex_be(n: u16) -> String {
    hex::encode(n.to_be_bytes())
}

/// Decode a big-endian 4-hex-character party id.
pub fn hex_be_to_uint16(s: &str) -> Result<u16> {
    let bytes = hex::decode(s).map_err(|_| CryptoError::BadEncoding)?;
    let bytes: [u8; 2] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::BadEncoding)?;
    Ok(u16::from_be_bytes(bytes))
}
