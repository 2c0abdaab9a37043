//! Header maps and the two authenticated structures.
//!
//! Enc_structure (AEAD aad):
//!   [context: tstr, protected: bstr, external_aad: bstr]
//!
//! Recipient_structure (HPKE info, key-encryption mode):
//!   ["HPKE Recipient", next_layer_alg: int, recipient_protected: bstr, extra_info: bstr]
//!
//! Protected headers are serialized exactly once and carried as opaque
//! bytes from then on; nothing here re-serializes them.

use ciborium::value::Value;

use crate::cbor;
use crate::error::{Error, Result};

pub const HEADER_ALG: i64 = 1;
pub const HEADER_KID: i64 = 4;
pub const HEADER_IV: i64 = 5;

/// Encapsulated key (`ek`) parameter.
pub const HEADER_ENCAPSULATED_KEY: i64 = -4;

pub const RECIPIENT_CONTEXT: &str = "HPKE Recipient";

/// Context string of an Enc_structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncContext {
    /// COSE_Encrypt0 (integrated mode).
    Encrypt0,
    /// Content layer of COSE_Encrypt.
    Encrypt,
    /// Recipient layer of COSE_Encrypt. Unused by HPKE recipients, which
    /// bind through Recipient_structure instead.
    EncRecipient,
}

impl EncContext {
    pub const fn as_str(self) -> &'static str {
        match self {
            EncContext::Encrypt0 => "Encrypt0",
            EncContext::Encrypt => "Encrypt",
            EncContext::EncRecipient => "Enc_Recipient",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HeaderValue {
    Int(i64),
    Bytes(Vec<u8>),
    Text(String),
    /// Anything else, kept as-is.
    Other(Value),
}

impl HeaderValue {
    fn to_value(&self) -> Value {
        match self {
            HeaderValue::Int(i) => cbor::int(*i),
            HeaderValue::Bytes(b) => Value::Bytes(b.clone()),
            HeaderValue::Text(t) => Value::Text(t.clone()),
            HeaderValue::Other(v) => v.clone(),
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Integer(_) => match cbor::as_int(&value) {
                Some(i) => HeaderValue::Int(i),
                None => HeaderValue::Other(value),
            },
            Value::Bytes(b) => HeaderValue::Bytes(b),
            Value::Text(t) => HeaderValue::Text(t),
            other => HeaderValue::Other(other),
        }
    }
}

/// Header parameters keyed by integer label, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<(i64, HeaderValue)>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Set `label`, replacing any previous value.
    pub fn insert(&mut self, label: i64, value: HeaderValue) {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: i64) -> Option<&HeaderValue> {
        self.entries.iter().find(|(l, _)| *l == label).map(|(_, v)| v)
    }

    pub fn int(&self, label: i64) -> Option<i64> {
        match self.get(label) {
            Some(HeaderValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn bytes(&self, label: i64) -> Option<&[u8]> {
        match self.get(label) {
            Some(HeaderValue::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    pub fn alg(&self) -> Option<i64> {
        self.int(HEADER_ALG)
    }

    pub fn kid(&self) -> Option<&[u8]> {
        self.bytes(HEADER_KID)
    }

    pub fn iv(&self) -> Option<&[u8]> {
        self.bytes(HEADER_IV)
    }

    pub fn encapsulated_key(&self) -> Option<&[u8]> {
        self.bytes(HEADER_ENCAPSULATED_KEY)
    }

    pub(crate) fn to_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(label, value)| (cbor::int(*label), value.to_value()))
                .collect(),
        )
    }

    pub(crate) fn from_value(value: Value) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            _ => return Err(Error::malformed("header must be a map")),
        };
        let mut map = HeaderMap::new();
        for (label, value) in entries {
            let label = cbor::as_int(&label)
                .ok_or_else(|| Error::malformed("header label must be an integer"))?;
            map.insert(label, HeaderValue::from_value(value));
        }
        Ok(map)
    }
}

/// Unprotected header carrying an encapsulated key and, optionally, a kid.
pub(crate) fn recipient_header(encapsulated_key: Vec<u8>, kid: Option<&[u8]>) -> HeaderMap {
    let mut header = HeaderMap::new();
    header.insert(HEADER_ENCAPSULATED_KEY, HeaderValue::Bytes(encapsulated_key));
    if let Some(kid) = kid {
        header.insert(HEADER_KID, HeaderValue::Bytes(kid.to_vec()));
    }
    header
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Serialized protected header `{1: alg}`.
pub fn build_protected_header(alg: i64) -> Result<Vec<u8>> {
    cbor::encode(&Value::Map(vec![(cbor::int(HEADER_ALG), cbor::int(alg))]))
}

/// Empty bytes mean "no protected parameters".
pub fn parse_protected_header(bytes: &[u8]) -> Result<HeaderMap> {
    if bytes.is_empty() {
        return Ok(HeaderMap::new());
    }
    let value = cbor::decode(bytes)
        .map_err(|e| Error::malformed(format!("protected header: {e}")))?;
    HeaderMap::from_value(value)
}

pub fn build_enc_structure(
    context: EncContext,
    protected: &[u8],
    external_aad: &[u8],
) -> Result<Vec<u8>> {
    cbor::encode(&Value::Array(vec![
        Value::Text(context.as_str().to_string()),
        Value::Bytes(protected.to_vec()),
        Value::Bytes(external_aad.to_vec()),
    ]))
}

pub fn build_recipient_structure(
    next_alg: i64,
    recipient_protected: &[u8],
    extra_info: &[u8],
) -> Result<Vec<u8>> {
    cbor::encode(&Value::Array(vec![
        Value::Text(RECIPIENT_CONTEXT.to_string()),
        cbor::int(next_alg),
        Value::Bytes(recipient_protected.to_vec()),
        Value::Bytes(extra_info.to_vec()),
    ]))
}
