//! OpenSSH SSHSIG armoring for a finished Ed25519 signature.
//!
//! Produces the same block `ssh-keygen -Y sign` would, so a Freon group
//! signature drops straight into existing `allowed_signers` verification
//! workflows. Framing per OpenSSH's `PROTOCOL.sshsig`: every segment is
//! length-prefixed with a 4-byte big-endian count, the whole buffer is
//! base64-encoded, wrapped at 70 columns, and framed with PEM-style lines.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

const MAGIC: &[u8] = b"SSHSIG";
const VERSION: u32 = 1;
const KEY_TYPE: &[u8] = b"ssh-ed25519";
const WRAP_COLUMNS: usize = 70;

fn put_string(buf: &mut Vec<u8>, s: &[u8]) {
    buf.extend_from_slice(&(s.len() as u32).to_be_bytes());
    buf.extend_from_slice(s);
}

/// Encode a 32-byte Ed25519 public key and 64-byte raw signature as an
/// ASCII-armored SSHSIG block.
///
/// The scheme signs the message directly (no pre-hash), so the embedded
/// hash-algorithm string is the key type itself.
///
/// # Panics
///
/// Panics on key or signature material of the wrong length; sizes are fixed
/// by Ed25519 and a mismatch is a programming error.
pub fn encode(pub_key: &[u8], raw_sig: &[u8], namespace: &str) -> String {
    assert_eq!(pub_key.len(), 32, "Ed25519 public key must be 32 bytes");
    assert_eq!(raw_sig.len(), 64, "Ed25519 signature must be 64 bytes");

    let mut buf = Vec::new();
    put_string(&mut buf, MAGIC);
    buf.extend_from_slice(&VERSION.to_be_bytes());

    let mut key_blob = Vec::new();
    put_string(&mut key_blob, KEY_TYPE);
    put_string(&mut key_blob, pub_key);
    put_string(&mut buf, &key_blob);

    put_string(&mut buf, namespace.as_bytes());

    // reserved
    put_string(&mut buf, &[]);

    // hash algorithm
    put_string(&mut buf, KEY_TYPE);

    let mut sig_blob = Vec::new();
    put_string(&mut sig_blob, KEY_TYPE);
    put_string(&mut sig_blob, raw_sig);
    put_string(&mut buf, &sig_blob);

    let b64 = STANDARD.encode(&buf);
    let mut out = String::from("-----BEGIN SSH SIGNATURE-----\n");
    for chunk in b64.as_bytes().chunks(WRAP_COLUMNS) {
        out.push_str(std::str::from_utf8(chunk).expect("base64 output is ASCII"));
        out.push('\n');
    }
    out.push_str("-----END SSH SIGNATURE-----\n");
    out
}

#[cfg(test)]
mod tests {
    use rand::RngCore;
    use sha2::{Digest, Sha256, Sha384};

    use super::*;

    #[test]
    fn produces_framed_block() {
        let mut pk = [0u8; 32];
        let mut sig = [0u8; 64];
        rand::rngs::OsRng.fill_bytes(&mut pk);
        rand::rngs::OsRng.fill_bytes(&mut sig);

        let encoded = encode(&pk, &sig, "test");
        assert!(encoded.starts_with("-----BEGIN SSH SIGNATURE-----\n"));
        assert!(encoded.ends_with("-----END SSH SIGNATURE-----\n"));
        for line in encoded.lines() {
            assert!(line.len() <= WRAP_COLUMNS);
        }
    }

    #[test]
    fn matches_reference_vector() {
        let pk_seed: [u8; 48] = Sha384::digest(b"Soatok Dreamseeker").into();
        let pk = &pk_seed[..32];

        let mut sig = Vec::new();
        sig.extend_from_slice(&Sha256::digest(b"Signature Format"));
        sig.extend_from_slice(&Sha256::digest(b"Freeon - OpenSSH"));

        let expected = "-----BEGIN SSH SIGNATURE-----\n\
AAAABlNTSFNJRwAAAAEAAAAzAAAAC3NzaC1lZDI1NTE5AAAAIEWbPXw3NFqPht+qbUzQeU\n\
ot2rnHXclITN0UivggnYz5AAAABHRlc3QAAAAAAAAAC3NzaC1lZDI1NTE5AAAAUwAAAAtz\n\
c2gtZWQyNTUxOQAAAEAn5PrscAKy4X4bzwdTN19iOi+Tb3UJYRJU9z/U6Jb+qtX3kF5ZYH\n\
6eVkXFIipre97XzH+lojn92vOx7elXLe/Y\n\
-----END SSH SIGNATURE-----\n";

        assert_eq!(encode(pk, &sig, "test"), expected);
    }

    #[test]
    #[should_panic(expected = "32 bytes")]
    fn rejects_short_key() {
        encode(&[0u8; 31], &[0u8; 64], "test");
    }

    #[test]
    #[should_panic(expected = "64 bytes")]
    fn rejects_short_signature() {
        encode(&[0u8; 32], &[0u8; 63], "test");
    }
}
