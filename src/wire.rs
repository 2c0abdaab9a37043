//! Message framing
//!
//! COSE_Encrypt0 (single recipient, tag 16):
//!   [protected: bstr, unprotected: {-4: ek, ...}, ciphertext: bstr]
//!
//! COSE_Encrypt (multi recipient, tag 96):
//!   [protected: bstr, unprotected: {5: iv}, ciphertext: bstr, recipients: [+ recipient]]
//!   recipient = [protected: bstr, unprotected: {-4: ek, ...}, wrapped_cek: bstr]
//!
//! The tag is optional on input and always written on output.

use ciborium::value::Value;

use crate::cbor;
use crate::error::{Error, Result};
use crate::header::HeaderMap;

/// CBOR tag for COSE_Encrypt0.
pub const COSE_ENCRYPT0_TAG: u64 = 16;

/// CBOR tag for COSE_Encrypt.
pub const COSE_ENCRYPT_TAG: u64 = 96;

pub const NONCE_BYTES: usize = 12;
pub const CONTENT_KEY_BYTES: usize = 32;

/// Integrated-mode message.
#[derive(Clone, Debug, PartialEq)]
pub struct Encrypt0 {
    pub protected: Vec<u8>,
    pub unprotected: HeaderMap,
    pub ciphertext: Vec<u8>,
}

/// One recipient entry of a COSE_Encrypt.
#[derive(Clone, Debug, PartialEq)]
pub struct Recipient {
    pub protected: Vec<u8>,
    pub unprotected: HeaderMap,
    pub ciphertext: Vec<u8>,
}

/// Key-encryption-mode message.
#[derive(Clone, Debug, PartialEq)]
pub struct Encrypt {
    pub protected: Vec<u8>,
    pub unprotected: HeaderMap,
    pub ciphertext: Vec<u8>,
    pub recipients: Vec<Recipient>,
}

/// A classified message.
#[derive(Clone, Debug, PartialEq)]
pub enum CoseMessage {
    Single(Encrypt0),
    Multi(Encrypt),
}

impl CoseMessage {
    /// Decode and classify: tag 16 / 96 if present, else arity 3 / 4.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = decode_value(bytes)?;
        let (tag, items) = match value {
            Value::Tag(tag, inner) => match *inner {
                Value::Array(items) => (Some(tag), items),
                _ => return Err(Error::UnrecognizedMessageType),
            },
            Value::Array(items) => (None, items),
            _ => return Err(Error::UnrecognizedMessageType),
        };

        match (tag, items.len()) {
            (Some(COSE_ENCRYPT0_TAG), _) | (None, 3) => Ok(CoseMessage::Single(single_from_items(items)?)),
            (Some(COSE_ENCRYPT_TAG), _) | (None, 4) => Ok(CoseMessage::Multi(multi_from_items(items)?)),
            _ => Err(Error::UnrecognizedMessageType),
        }
    }

    pub fn is_tagged(bytes: &[u8]) -> bool {
        matches!(cbor::decode(bytes), Ok(Value::Tag(..)))
    }
}

// ---------------------------------------------------------------------------
// COSE_Encrypt0
// ---------------------------------------------------------------------------

pub fn build_single(message: &Encrypt0) -> Result<Vec<u8>> {
    cbor::encode(&Value::Tag(
        COSE_ENCRYPT0_TAG,
        Box::new(Value::Array(vec![
            Value::Bytes(message.protected.clone()),
            message.unprotected.to_value(),
            Value::Bytes(message.ciphertext.clone()),
        ])),
    ))
}

pub fn parse_single(bytes: &[u8]) -> Result<Encrypt0> {
    let items = untag(decode_value(bytes)?, COSE_ENCRYPT0_TAG, "COSE_Encrypt0")?;
    single_from_items(items)
}

fn single_from_items(items: Vec<Value>) -> Result<Encrypt0> {
    let [protected, unprotected, ciphertext] = exact::<3>(items, "COSE_Encrypt0")?;
    Ok(Encrypt0 {
        protected: byte_string(protected, "protected header")?,
        unprotected: HeaderMap::from_value(unprotected)?,
        ciphertext: byte_string(ciphertext, "ciphertext")?,
    })
}

// ---------------------------------------------------------------------------
// COSE_Encrypt
// ---------------------------------------------------------------------------

pub fn build_multi(message: &Encrypt) -> Result<Vec<u8>> {
    let recipients = message
        .recipients
        .iter()
        .map(|r| {
            Value::Array(vec![
                Value::Bytes(r.protected.clone()),
                r.unprotected.to_value(),
                Value::Bytes(r.ciphertext.clone()),
            ])
        })
        .collect();

    cbor::encode(&Value::Tag(
        COSE_ENCRYPT_TAG,
        Box::new(Value::Array(vec![
            Value::Bytes(message.protected.clone()),
            message.unprotected.to_value(),
            Value::Bytes(message.ciphertext.clone()),
            Value::Array(recipients),
        ])),
    ))
}

pub fn parse_multi(bytes: &[u8]) -> Result<Encrypt> {
    let items = untag(decode_value(bytes)?, COSE_ENCRYPT_TAG, "COSE_Encrypt")?;
    multi_from_items(items)
}

fn multi_from_items(items: Vec<Value>) -> Result<Encrypt> {
    let [protected, unprotected, ciphertext, recipients] = exact::<4>(items, "COSE_Encrypt")?;
    let recipients = match recipients {
        Value::Array(entries) => entries
            .into_iter()
            .map(recipient_from_value)
            .collect::<Result<Vec<_>>>()?,
        _ => return Err(Error::malformed("recipients must be an array")),
    };
    Ok(Encrypt {
        protected: byte_string(protected, "protected header")?,
        unprotected: HeaderMap::from_value(unprotected)?,
        ciphertext: byte_string(ciphertext, "ciphertext")?,
        recipients,
    })
}

fn recipient_from_value(value: Value) -> Result<Recipient> {
    let items = match value {
        Value::Array(items) => items,
        _ => return Err(Error::malformed("recipient must be an array")),
    };
    let [protected, unprotected, ciphertext] = exact::<3>(items, "COSE_recipient")?;
    Ok(Recipient {
        protected: byte_string(protected, "recipient protected header")?,
        unprotected: HeaderMap::from_value(unprotected)?,
        ciphertext: byte_string(ciphertext, "recipient ciphertext")?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn decode_value(bytes: &[u8]) -> Result<Value> {
    cbor::decode(bytes).map_err(|e| Error::malformed(format!("not CBOR: {e}")))
}

fn untag(value: Value, expected: u64, what: &str) -> Result<Vec<Value>> {
    let inner = match value {
        Value::Tag(tag, inner) if tag == expected => *inner,
        Value::Tag(tag, _) => {
            return Err(Error::malformed(format!("{what}: unexpected tag {tag}")))
        }
        other => other,
    };
    match inner {
        Value::Array(items) => Ok(items),
        _ => Err(Error::malformed(format!("{what} must be an array"))),
    }
}

fn exact<const N: usize>(items: Vec<Value>, what: &str) -> Result<[Value; N]> {
    let len = items.len();
    items
        .try_into()
        .map_err(|_| Error::malformed(format!("{what} must have {N} elements, got {len}")))
}

fn byte_string(value: Value, what: &str) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(Error::malformed(format!("{what} must be a byte string"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{recipient_header, HeaderValue, HEADER_IV};

    fn sample_single() -> Encrypt0 {
        Encrypt0 {
            protected: vec![0xa1, 0x01, 0x18, 0x2d],
            unprotected: recipient_header(vec![0x04; 65], None),
            ciphertext: vec![0xaa; 20],
        }
    }

    fn sample_multi() -> Encrypt {
        let mut unprotected = HeaderMap::new();
        unprotected.insert(HEADER_IV, HeaderValue::Bytes(vec![0; NONCE_BYTES]));
        Encrypt {
            protected: vec![0xa1, 0x01, 0x03],
            unprotected,
            ciphertext: vec![0xbb; 24],
            recipients: vec![
                Recipient {
                    protected: vec![0xa1, 0x01, 0x18, 0x35],
                    unprotected: recipient_header(vec![1; 65], Some(&b"a"[..])),
                    ciphertext: vec![2; 48],
                },
                Recipient {
                    protected: vec![0xa1, 0x01, 0x18, 0x32],
                    unprotected: recipient_header(vec![3; 32], None),
                    ciphertext: vec![4; 48],
                },
            ],
        }
    }

    fn untagged(bytes: &[u8]) -> Vec<u8> {
        match cbor::decode(bytes).unwrap() {
            Value::Tag(_, inner) => cbor::encode(&inner).unwrap(),
            other => cbor::encode(&other).unwrap(),
        }
    }

    #[test]
    fn single_is_tagged_16() {
        let bytes = build_single(&sample_single()).unwrap();
        // tag(16) = 0xd0, array(3) = 0x83
        assert_eq!(&bytes[..2], &[0xd0, 0x83]);
        assert_eq!(parse_single(&bytes).unwrap(), sample_single());
        assert_eq!(parse_single(&untagged(&bytes)).unwrap(), sample_single());
    }

    #[test]
    fn multi_is_tagged_96() {
        let bytes = build_multi(&sample_multi()).unwrap();
        // tag(96) = 0xd8 0x60, array(4) = 0x84
        assert_eq!(&bytes[..3], &[0xd8, 0x60, 0x84]);
        assert_eq!(parse_multi(&bytes).unwrap(), sample_multi());
        assert_eq!(parse_multi(&untagged(&bytes)).unwrap(), sample_multi());
    }

    #[test]
    fn classification_by_tag_and_arity() {
        let single = build_single(&sample_single()).unwrap();
        let multi = build_multi(&sample_multi()).unwrap();

        assert!(matches!(CoseMessage::decode(&single), Ok(CoseMessage::Single(_))));
        assert!(matches!(CoseMessage::decode(&multi), Ok(CoseMessage::Multi(_))));
        assert!(matches!(CoseMessage::decode(&untagged(&single)), Ok(CoseMessage::Single(_))));
        assert!(matches!(CoseMessage::decode(&untagged(&multi)), Ok(CoseMessage::Multi(_))));
        assert!(CoseMessage::is_tagged(&single));
        assert!(!CoseMessage::is_tagged(&untagged(&single)));

        let two = cbor::encode(&Value::Array(vec![Value::Null, Value::Null])).unwrap();
        let tagged_other = cbor::encode(&Value::Tag(
            17,
            Box::new(Value::Array(vec![Value::Null, Value::Null, Value::Null])),
        ))
        .unwrap();
        let map = cbor::encode(&Value::Map(vec![])).unwrap();
        for bytes in [two, tagged_other, map] {
            assert!(matches!(
                CoseMessage::decode(&bytes),
                Err(Error::UnrecognizedMessageType)
            ));
        }
    }

    #[test]
    fn parse_rejects_wrong_shapes() {
        let multi = build_multi(&sample_multi()).unwrap();
        assert!(matches!(parse_single(&multi), Err(Error::MalformedMessage(_))));

        let single = build_single(&sample_single()).unwrap();
        assert!(matches!(parse_multi(&single), Err(Error::MalformedMessage(_))));

        let wrong_types = cbor::encode(&Value::Array(vec![
            Value::Map(vec![]),
            Value::Map(vec![]),
            Value::Bytes(vec![]),
        ]))
        .unwrap();
        assert!(matches!(parse_single(&wrong_types), Err(Error::MalformedMessage(_))));

        // Tag 16 with four elements.
        let tagged_four = cbor::encode(&Value::Tag(
            COSE_ENCRYPT0_TAG,
            Box::new(Value::Array(vec![Value::Null; 4])),
        ))
        .unwrap();
        assert!(matches!(
            CoseMessage::decode(&tagged_four),
            Err(Error::MalformedMessage(_))
        ));

        assert!(matches!(parse_single(&[0xff]), Err(Error::MalformedMessage(_))));
    }

    #[test]
    fn bad_recipient_entry_is_malformed() {
        let mut items = match cbor::decode(&untagged(&build_multi(&sample_multi()).unwrap())).unwrap() {
            Value::Array(items) => items,
            _ => unreachable!(),
        };
        items[3] = Value::Array(vec![Value::Array(vec![Value::Bytes(vec![]), Value::Map(vec![])])]);
        let bytes = cbor::encode(&Value::Array(items)).unwrap();
        assert!(matches!(parse_multi(&bytes), Err(Error::MalformedMessage(_))));
    }
}
