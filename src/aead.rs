//! Content layer AEAD: AES-256-GCM (COSE alg A256GCM)

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use getrandom::getrandom;
use zeroize::Zeroizing;

use crate::error::{DecryptCause, Error, Result};
use crate::wire::{CONTENT_KEY_BYTES, NONCE_BYTES};

/// Fresh random content encryption key.
pub fn content_key() -> Result<Zeroizing<[u8; CONTENT_KEY_BYTES]>> {
    let mut key = Zeroizing::new([0u8; CONTENT_KEY_BYTES]);
    getrandom(&mut key[..]).map_err(|_| Error::Encoding)?;
    Ok(key)
}

/// Random 12-byte nonce. Used during encryption only.
pub fn nonce() -> Result<[u8; NONCE_BYTES]> {
    let mut n = [0u8; NONCE_BYTES];
    getrandom(&mut n).map_err(|_| Error::Encoding)?;
    Ok(n)
}

pub fn seal(
    key: &[u8; CONTENT_KEY_BYTES],
    nonce: &[u8; NONCE_BYTES],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| Error::Encoding)?;
    let payload = Payload { msg: plaintext, aad };
    cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| Error::Encoding)
}

/// Open with key and nonce as found on the wire; wrong sizes fail like a bad tag.
pub fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if key.len() != CONTENT_KEY_BYTES {
        return Err(Error::decryption(DecryptCause::ContentKeyLength));
    }
    if nonce.len() != NONCE_BYTES {
        return Err(Error::decryption(DecryptCause::ContentAead));
    }
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|_| Error::decryption(DecryptCause::ContentKeyLength))?;
    let payload = Payload { msg: ciphertext, aad };
    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| Error::decryption(DecryptCause::ContentAead))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_and_binding() {
        let key = content_key().unwrap();
        let n = nonce().unwrap();
        let ct = seal(&key, &n, b"content", b"aad").unwrap();
        assert_eq!(ct.len(), b"content".len() + 16);
        assert_eq!(open(key.as_slice(), &n, &ct, b"aad").unwrap(), b"content");
        assert!(matches!(
            open(key.as_slice(), &n, &ct, b"other"),
            Err(Error::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn wrong_sizes_fail_as_decryption() {
        let key = content_key().unwrap();
        let n = nonce().unwrap();
        let ct = seal(&key, &n, b"x", b"").unwrap();
        assert!(matches!(
            open(&key[..16], &n, &ct, b""),
            Err(Error::DecryptionFailed { .. })
        ));
        assert!(matches!(
            open(key.as_slice(), &n[..8], &ct, b""),
            Err(Error::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn fresh_keys_differ() {
        assert_ne!(*content_key().unwrap(), *content_key().unwrap());
        assert_ne!(nonce().unwrap(), nonce().unwrap());
    }
}
