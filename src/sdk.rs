//! COSE-HPKE SDK: public API surface
//!
//! `encrypt` picks the mode from the recipient count, `decrypt` picks it
//! from the message shape. Both operate purely on byte strings; the suite
//! and all binding inputs travel in [`Options`].

use crate::error::{Error, Result};
use crate::header;
use crate::integrated;
use crate::key::CoseKey;
use crate::key_encryption;
use crate::options::Options;
use crate::suite::{self, SuiteId};
use crate::wire::CoseMessage;

/// Encrypt `plaintext` to one or more COSE_Key-encoded public keys.
///
/// One recipient yields a COSE_Encrypt0, two or more a COSE_Encrypt.
pub fn encrypt<K: AsRef<[u8]>>(plaintext: &[u8], recipients: &[K], options: &Options) -> Result<Vec<u8>> {
    match recipients {
        [] => Err(Error::NoRecipients),
        [only] => integrated::seal(plaintext, only.as_ref(), options),
        many => key_encryption::seal(plaintext, many, options),
    }
}

/// Decrypt a COSE_Encrypt0 or COSE_Encrypt with a COSE_Key-encoded private key.
pub fn decrypt(message: &[u8], private_key: &[u8], options: &Options) -> Result<Vec<u8>> {
    let message = CoseMessage::decode(message)?;
    let key = CoseKey::decode_private(private_key)?;
    match message {
        CoseMessage::Single(single) => integrated::open_message(&single, &key, options),
        CoseMessage::Multi(multi) => key_encryption::open_message(&multi, &key, options),
    }
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// COSE_Encrypt0, integrated mode.
    Single,
    /// COSE_Encrypt, key-encryption mode.
    Multi,
}

/// Parsed metadata of a message (no decryption performed).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageInfo {
    pub kind: MessageKind,
    pub tagged: bool,
    pub algorithm: Option<i64>,
    pub suite: Option<SuiteId>,
    pub kid: Option<Vec<u8>>,
    pub ciphertext_len: usize,
    pub recipients: Vec<RecipientInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipientInfo {
    pub algorithm: Option<i64>,
    pub suite: Option<SuiteId>,
    pub kid: Option<Vec<u8>>,
    pub has_encapsulated_key: bool,
}

/// Classify and describe a message without any key.
pub fn inspect(message: &[u8]) -> Result<MessageInfo> {
    let tagged = CoseMessage::is_tagged(message);
    match CoseMessage::decode(message)? {
        CoseMessage::Single(single) => {
            let algorithm = header::parse_protected_header(&single.protected)?.alg();
            Ok(MessageInfo {
                kind: MessageKind::Single,
                tagged,
                algorithm,
                suite: suite_of(algorithm),
                kid: single.unprotected.kid().map(<[u8]>::to_vec),
                ciphertext_len: single.ciphertext.len(),
                recipients: Vec::new(),
            })
        }
        CoseMessage::Multi(multi) => {
            let recipients = multi
                .recipients
                .iter()
                .map(|r| {
                    let algorithm = header::parse_protected_header(&r.protected)?.alg();
                    Ok(RecipientInfo {
                        algorithm,
                        suite: suite_of(algorithm),
                        kid: r.unprotected.kid().map(<[u8]>::to_vec),
                        has_encapsulated_key: r.unprotected.encapsulated_key().is_some(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(MessageInfo {
                kind: MessageKind::Multi,
                tagged,
                algorithm: header::parse_protected_header(&multi.protected)?.alg(),
                suite: None,
                kid: None,
                ciphertext_len: multi.ciphertext.len(),
                recipients,
            })
        }
    }
}

fn suite_of(algorithm: Option<i64>) -> Option<SuiteId> {
    algorithm.and_then(suite::suite_from_algorithm).map(|s| s.id)
}
