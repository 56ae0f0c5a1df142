//! age share-at-rest encryption.
//!
//! Secret shares produced by DKG are encrypted to the participant's own age
//! recipient before they touch disk, keeping share-at-rest protection
//! orthogonal to the transport: the coordinator cannot read a share even if
//! it is fully compromised.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

use age::x25519::Recipient;

use crate::{CryptoError, Result};

/// Encrypt `plaintext` to exactly one X25519 recipient.
///
/// Returns the raw age envelope, hex-encoded for storage inside the JSON
/// share record.
pub fn encrypt_share(recipient: &str, plaintext: &[u8]) -> Result<String> {
    let recipient: Recipient = recipient
        .trim()
        .parse()
        .map_err(|_| CryptoError::BadRecipient)?;

    let encryptor = age::Encryptor::with_recipients(vec![Box::new(recipient)])
        .ok_or(CryptoError::BadRecipient)?;

    let mut envelope = Vec::new();
    let mut writer = encryptor
        .wrap_output(&mut envelope)
        .map_err(|e| CryptoError::Envelope(e.to_string()))?;
    writer
        .write_all(plaintext)
        .map_err(|e| CryptoError::Envelope(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| CryptoError::Envelope(e.to_string()))?;

    Ok(hex::encode(envelope))
}

/// Decrypt a hex-encoded envelope with the identities in `identity_path`.
///
/// The file may list several identities; each is tried in file order and the
/// first successful decryption wins.
pub fn decrypt_share(ciphertext_hex: &str, identity_path: &Path) -> Result<Vec<u8>> {
    let ciphertext = hex::decode(ciphertext_hex).map_err(|_| CryptoError::BadEncoding)?;
    let identities = load_identities(identity_path)?;

    let decryptor = match age::Decryptor::new(&ciphertext[..])
        .map_err(|e| CryptoError::Envelope(e.to_string()))?
    {
        age::Decryptor::Recipients(d) => d,
        // Shares are never passphrase-encrypted.
        _ => return Err(CryptoError::NoMatchingIdentity),
    };

    let mut reader = decryptor
        .decrypt(identities.iter().map(|i| i.as_ref() as &dyn age::Identity))
        .map_err(|_| CryptoError::NoMatchingIdentity)?;

    let mut plaintext = Vec::new();
    reader
        .read_to_end(&mut plaintext)
        .map_err(|e| CryptoError::Envelope(e.to_string()))?;
    Ok(plaintext)
}

/// Load every identity from an age identity file.
///
/// A file that parses but yields zero identities is rejected outright so a
/// truncated key file fails loudly instead of producing a confusing
/// "no matching identity" later.
fn load_identities(path: &Path) -> Result<Vec<Box<dyn age::Identity>>> {
    let file = File::open(path)?;
    let identity_file = age::IdentityFile::from_buffer(BufReader::new(file))
        .map_err(|e| CryptoError::Envelope(e.to_string()))?;

    let entries = identity_file.into_identities();
    if entries.is_empty() {
        return Err(CryptoError::EmptyIdentityFile);
    }

    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            age::IdentityFileEntry::Native(identity) => {
                Box::new(identity) as Box<dyn age::Identity>
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn write_identity_file(identities: &[&age::x25519::Identity]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp identity file");
        for identity in identities {
            use age::secrecy::ExposeSecret;
            writeln!(file, "{}", identity.to_string().expose_secret()).expect("write identity");
        }
        file.flush().expect("flush identity file");
        file
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let identity = age::x25519::Identity::generate();
        let recipient = identity.to_public().to_string();
        let file = write_identity_file(&[&identity]);

        let share = b"threshold share material";
        let envelope = encrypt_share(&recipient, share).expect("encrypt");
        let plaintext = decrypt_share(&envelope, file.path()).expect("decrypt");
        assert_eq!(plaintext, share);
    }

    #[test]
    fn second_identity_in_file_can_decrypt() {
        let wrong = age::x25519::Identity::generate();
        let right = age::x25519::Identity::generate();
        let file = write_identity_file(&[&wrong, &right]);

        let envelope =
            encrypt_share(&right.to_public().to_string(), b"shared secret").expect("encrypt");
        let plaintext = decrypt_share(&envelope, file.path()).expect("decrypt");
        assert_eq!(plaintext, b"shared secret");
    }

    #[test]
    fn wrong_identity_is_rejected() {
        let owner = age::x25519::Identity::generate();
        let stranger = age::x25519::Identity::generate();
        let file = write_identity_file(&[&stranger]);

        let envelope = encrypt_share(&owner.to_public().to_string(), b"secret").expect("encrypt");
        let err = decrypt_share(&envelope, file.path()).unwrap_err();
        assert!(matches!(err, CryptoError::NoMatchingIdentity));
    }

    #[test]
    fn malformed_recipient_is_rejected() {
        let err = encrypt_share("age1notakey", b"secret").unwrap_err();
        assert!(matches!(err, CryptoError::BadRecipient));
    }

    #[test]
    fn malformed_hex_is_rejected() {
        let identity = age::x25519::Identity::generate();
        let file = write_identity_file(&[&identity]);
        let err = decrypt_share("zz not hex", file.path()).unwrap_err();
        assert!(matches!(err, CryptoError::BadEncoding));
    }

    #[test]
    fn empty_identity_file_is_rejected() {
        let identity = age::x25519::Identity::generate();
        let envelope =
            encrypt_share(&identity.to_public().to_string(), b"secret").expect("encrypt");

        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        writeln!(file, "# comments only, no keys").expect("write comment");
        file.flush().expect("flush");

        let err = decrypt_share(&envelope, file.path()).unwrap_err();
        assert!(matches!(err, CryptoError::EmptyIdentityFile));
    }
}
