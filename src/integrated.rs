//! Integrated encryption (single recipient, COSE_Encrypt0)
//!
//!   protected   = {1: integrated alg}
//!   aad         = Enc_structure("Encrypt0", protected, external_aad)
//!   info        = external_info
//!   (ek, ct)    = HPKE.Seal(pkR, info, aad, plaintext)
//!   message     = 16([protected, {-4: ek}, ct])

use crate::error::{DecryptCause, Error, Result};
use crate::header::{self, EncContext};
use crate::key::CoseKey;
use crate::options::Options;
use crate::suite::{self, Mode, SuiteConfig};
use crate::wire::{self, Encrypt0};

pub fn seal(plaintext: &[u8], recipient_public_key: &[u8], options: &Options) -> Result<Vec<u8>> {
    let suite = suite::resolve(options.suite);
    let recipient = CoseKey::decode(recipient_public_key)?;
    recipient.require_suite(suite)?;

    tracing::debug!(
        suite = %suite.id,
        plaintext_len = plaintext.len(),
        "sealing COSE_Encrypt0"
    );

    let protected = header::build_protected_header(suite.integrated_alg)?;
    let aad = header::build_enc_structure(EncContext::Encrypt0, &protected, &options.external_aad)?;

    let (encapsulated_key, ciphertext) = suite
        .seal(&recipient.raw_public(), plaintext, &aad, &options.external_info)
        .map_err(|e| Error::invalid_key(format!("recipient key rejected: {e}")))?;

    wire::build_single(&Encrypt0 {
        protected,
        unprotected: header::recipient_header(encapsulated_key, recipient.kid()),
        ciphertext,
    })
}

pub fn open(message: &[u8], recipient_private_key: &[u8], options: &Options) -> Result<Vec<u8>> {
    let message = wire::parse_single(message)?;
    let key = CoseKey::decode_private(recipient_private_key)?;
    open_message(&message, &key, options)
}

pub(crate) fn open_message(message: &Encrypt0, key: &CoseKey, options: &Options) -> Result<Vec<u8>> {
    let encapsulated_key = message
        .unprotected
        .encapsulated_key()
        .ok_or_else(|| Error::decryption(DecryptCause::MissingEncapsulatedKey))?;

    // An unreadable protected header cannot name a suite; it only fails the AAD.
    let alg = header::parse_protected_header(&message.protected)
        .ok()
        .and_then(|protected| protected.alg());
    let suite = resolve_suite(alg, options)?;
    if !key.fits(suite) {
        return Err(Error::decryption(DecryptCause::KeyTypeMismatch));
    }

    tracing::debug!(
        suite = %suite.id,
        ciphertext_len = message.ciphertext.len(),
        "opening COSE_Encrypt0"
    );

    let aad = header::build_enc_structure(EncContext::Encrypt0, &message.protected, &options.external_aad)?;
    let private = key
        .d()
        .ok_or_else(|| Error::invalid_key("private key required (missing d)"))?;

    suite
        .open(private, encapsulated_key, &message.ciphertext, &aad, &options.external_info)
        .map_err(|e| Error::decryption(DecryptCause::Hpke(e)))
}

/// Forced suite wins; otherwise `alg` must be an integrated-mode id.
fn resolve_suite(alg: Option<i64>, options: &Options) -> Result<&'static SuiteConfig> {
    if let Some(id) = options.suite {
        return Ok(id.config());
    }
    match alg.and_then(suite::suite_and_mode) {
        Some((suite, Mode::Integrated)) => Ok(suite),
        _ => Err(Error::decryption(DecryptCause::UnknownAlgorithm(alg))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::generate_key_pair;
    use crate::suite::SuiteId;

    #[test]
    fn roundtrip_with_info_and_aad() {
        let kp = generate_key_pair(Some(SuiteId::Hpke4)).unwrap();
        let options = Options::new()
            .with_suite(SuiteId::Hpke4)
            .with_external_aad(b"aad".to_vec())
            .with_external_info(b"info".to_vec());
        let message = seal(b"hi", &kp.public_key, &options).unwrap();

        // The suite is inferred from the header when not forced.
        let inferred = Options::new()
            .with_external_aad(b"aad".to_vec())
            .with_external_info(b"info".to_vec());
        assert_eq!(open(&message, &kp.private_key, &inferred).unwrap(), b"hi");
        assert!(matches!(
            open(&message, &kp.private_key, &Options::new()),
            Err(Error::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn seal_rejects_key_of_other_suite() {
        let kp = generate_key_pair(Some(SuiteId::Hpke4)).unwrap();
        assert!(matches!(
            seal(b"x", &kp.public_key, &Options::new()),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn missing_encapsulated_key_fails() {
        let kp = generate_key_pair(None).unwrap();
        let mut message = wire::parse_single(&seal(b"x", &kp.public_key, &Options::new()).unwrap()).unwrap();
        message.unprotected = header::HeaderMap::new();
        let key = CoseKey::decode_private(&kp.private_key).unwrap();
        assert!(matches!(
            open_message(&message, &key, &Options::new()),
            Err(Error::DecryptionFailed {
                cause: Some(DecryptCause::MissingEncapsulatedKey)
            })
        ));
    }

    #[test]
    fn key_encryption_alg_is_not_accepted() {
        let kp = generate_key_pair(None).unwrap();
        let mut message = wire::parse_single(&seal(b"x", &kp.public_key, &Options::new()).unwrap()).unwrap();
        message.protected = header::build_protected_header(suite::ALG_HPKE_7_KEY_ENCRYPTION).unwrap();
        let key = CoseKey::decode_private(&kp.private_key).unwrap();
        assert!(matches!(
            open_message(&message, &key, &Options::new()),
            Err(Error::DecryptionFailed {
                cause: Some(DecryptCause::UnknownAlgorithm(Some(53)))
            })
        ));
    }
}
