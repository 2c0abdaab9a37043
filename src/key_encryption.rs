//! Key encryption (multi recipient, COSE_Encrypt)
//!
//! Content layer:
//!   protected   = {1: 3}                                   (A256GCM)
//!   aad         = Enc_structure("Encrypt", protected, external_aad)
//!   ct          = AES-256-GCM(cek, iv, aad, plaintext)     unprotected = {5: iv}
//!
//! Recipient layer, once per recipient key:
//!   protected   = {1: key-encryption alg}
//!   info        = Recipient_structure(3, protected, recipient_extra_info)
//!   (ek, wrap)  = HPKE.Seal(pkR, info, aad = h'', cek)     unprotected = {-4: ek}
//!
//! Opening tries recipient entries in message order and stops at the first
//! one that yields the content key.

use zeroize::Zeroizing;

use crate::aead;
use crate::error::{DecryptCause, Error, Result};
use crate::header::{self, EncContext, HeaderValue, HEADER_IV};
use crate::key::CoseKey;
use crate::options::Options;
use crate::suite::{self, Mode, SuiteConfig, ALG_A256GCM};
use crate::wire::{self, Encrypt, Recipient};

pub fn seal<K: AsRef<[u8]>>(
    plaintext: &[u8],
    recipient_public_keys: &[K],
    options: &Options,
) -> Result<Vec<u8>> {
    if recipient_public_keys.is_empty() {
        return Err(Error::NoRecipients);
    }
    let suite = suite::resolve(options.suite);

    // Validate every key before any randomness is spent.
    let recipients = recipient_public_keys
        .iter()
        .map(|bytes| {
            let key = CoseKey::decode(bytes.as_ref())?;
            key.require_suite(suite)?;
            Ok(key)
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        suite = %suite.id,
        recipients = recipients.len(),
        plaintext_len = plaintext.len(),
        "sealing COSE_Encrypt"
    );

    let cek = aead::content_key()?;
    let iv = aead::nonce()?;

    let protected = header::build_protected_header(suite.content_alg)?;
    let aad = header::build_enc_structure(EncContext::Encrypt, &protected, &options.external_aad)?;
    let ciphertext = aead::seal(&cek, &iv, plaintext, &aad)?;

    let mut unprotected = header::HeaderMap::new();
    unprotected.insert(HEADER_IV, HeaderValue::Bytes(iv.to_vec()));

    let recipient_protected = header::build_protected_header(suite.key_encryption_alg)?;
    let info = header::build_recipient_structure(
        suite.content_alg,
        &recipient_protected,
        &options.recipient_extra_info,
    )?;

    let entries = recipients
        .iter()
        .map(|key| {
            let (encapsulated_key, wrapped) = suite
                .seal(&key.raw_public(), cek.as_slice(), &[], &info)
                .map_err(|e| Error::invalid_key(format!("recipient key rejected: {e}")))?;
            Ok(Recipient {
                protected: recipient_protected.clone(),
                unprotected: header::recipient_header(encapsulated_key, key.kid()),
                ciphertext: wrapped,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    wire::build_multi(&Encrypt {
        protected,
        unprotected,
        ciphertext,
        recipients: entries,
    })
}

pub fn open(message: &[u8], recipient_private_key: &[u8], options: &Options) -> Result<Vec<u8>> {
    let message = wire::parse_multi(message)?;
    let key = CoseKey::decode_private(recipient_private_key)?;
    open_message(&message, &key, options)
}

pub(crate) fn open_message(message: &Encrypt, key: &CoseKey, options: &Options) -> Result<Vec<u8>> {
    let protected = header::parse_protected_header(&message.protected)
        .map_err(|_| Error::decryption(DecryptCause::UnknownAlgorithm(None)))?;
    let content_alg = protected
        .alg()
        .unwrap_or_else(|| suite::resolve(options.suite).content_alg);
    if content_alg != ALG_A256GCM {
        return Err(Error::decryption(DecryptCause::UnknownAlgorithm(Some(content_alg))));
    }
    let private = key
        .d()
        .ok_or_else(|| Error::invalid_key("private key required (missing d)"))?;

    tracing::debug!(
        recipients = message.recipients.len(),
        ciphertext_len = message.ciphertext.len(),
        "opening COSE_Encrypt"
    );

    let mut cek = None;
    for (index, recipient) in message.recipients.iter().enumerate() {
        match try_recipient(recipient, key, private, content_alg, options) {
            Attempt::Opened(content_key) => {
                tracing::trace!(index, "recipient entry opened");
                cek = Some(content_key);
                break;
            }
            Attempt::Skipped(reason) => tracing::trace!(index, reason, "recipient entry skipped"),
            Attempt::Failed(err) => tracing::trace!(index, %err, "recipient entry did not open"),
        }
    }
    let cek = cek.ok_or(Error::NoMatchingRecipient)?;

    let iv = message
        .unprotected
        .iv()
        .ok_or_else(|| Error::malformed("content layer is missing the IV"))?;
    let aad = header::build_enc_structure(EncContext::Encrypt, &message.protected, &options.external_aad)?;
    aead::open(&cek, iv, &message.ciphertext, &aad)
}

/// Outcome of one trial decryption.
enum Attempt {
    Opened(Zeroizing<Vec<u8>>),
    Skipped(&'static str),
    Failed(hpke::HpkeError),
}

fn try_recipient(
    recipient: &Recipient,
    key: &CoseKey,
    private: &[u8],
    content_alg: i64,
    options: &Options,
) -> Attempt {
    let Some(encapsulated_key) = recipient.unprotected.encapsulated_key() else {
        return Attempt::Skipped("no encapsulated key");
    };
    let Ok(protected) = header::parse_protected_header(&recipient.protected) else {
        return Attempt::Skipped("unreadable protected header");
    };
    let Some(suite) = resolve_suite(protected.alg(), options) else {
        return Attempt::Skipped("unknown algorithm");
    };
    if !key.fits(suite) {
        return Attempt::Skipped("key type does not match suite");
    }
    let Ok(info) =
        header::build_recipient_structure(content_alg, &recipient.protected, &options.recipient_extra_info)
    else {
        return Attempt::Skipped("cannot build recipient structure");
    };

    match suite.open(private, encapsulated_key, &recipient.ciphertext, &[], &info) {
        Ok(cek) => Attempt::Opened(Zeroizing::new(cek)),
        Err(err) => Attempt::Failed(err),
    }
}

/// Forced suite wins; otherwise `alg` must be a key-encryption id.
fn resolve_suite(alg: Option<i64>, options: &Options) -> Option<&'static SuiteConfig> {
    if let Some(id) = options.suite {
        return Some(id.config());
    }
    match alg.and_then(suite::suite_and_mode) {
        Some((suite, Mode::KeyEncryption)) => Some(suite),
        _ => None,
    }
}
