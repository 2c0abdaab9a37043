//! COSE_Key model for EC2 (P-256) and OKP (X25519) keys
//!
//! Wire form is a CBOR map with integer labels, written in a fixed order:
//!
//!   {1: kty, [2: kid], [3: alg], -1: crv, -2: x, [-3: y], [-4: d]}
//!
//! EC2 keys always carry x and y; OKP keys never carry y. A key is private
//! iff `d` is present. Raw HPKE keys:
//!
//!   P-256 public   = 0x04 || x[32] || y[32]   (65 bytes)
//!   X25519 public  = x[32]
//!   private        = d[32]

use core::fmt;

use ciborium::value::Value;
use zeroize::Zeroizing;

use crate::cbor;
use crate::error::{Error, Result};
use crate::suite::{self, SuiteConfig, SuiteId};

pub const COSE_KEY_KTY: i64 = 1;
pub const COSE_KEY_KID: i64 = 2;
pub const COSE_KEY_ALG: i64 = 3;
pub const COSE_KEY_CRV: i64 = -1;
pub const COSE_KEY_X: i64 = -2;
pub const COSE_KEY_Y: i64 = -3;
pub const COSE_KEY_D: i64 = -4;

pub const KTY_OKP: i64 = 1;
pub const KTY_EC2: i64 = 2;

pub const CRV_P256: i64 = 1;
pub const CRV_X25519: i64 = 4;

/// Coordinate and scalar size for both curves.
pub const COORDINATE_BYTES: usize = 32;

/// Uncompressed SEC1 point: 0x04 || x || y.
pub const P256_PUBLIC_KEY_BYTES: usize = 1 + 2 * COORDINATE_BYTES;

const SEC1_UNCOMPRESSED: u8 = 0x04;

/// Key type (and, implicitly, curve).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Octet key pair on X25519.
    Okp,
    /// Double-coordinate key on P-256.
    Ec2,
}

impl KeyType {
    pub const fn kty(self) -> i64 {
        match self {
            KeyType::Okp => KTY_OKP,
            KeyType::Ec2 => KTY_EC2,
        }
    }

    pub const fn crv(self) -> i64 {
        match self {
            KeyType::Okp => CRV_X25519,
            KeyType::Ec2 => CRV_P256,
        }
    }

    fn from_kty(kty: i64) -> Option<Self> {
        match kty {
            KTY_OKP => Some(KeyType::Okp),
            KTY_EC2 => Some(KeyType::Ec2),
            _ => None,
        }
    }
}

/// A decoded COSE_Key.
#[derive(Clone, PartialEq, Eq)]
pub struct CoseKey {
    key_type: KeyType,
    kid: Option<Vec<u8>>,
    alg: Option<i64>,
    x: [u8; COORDINATE_BYTES],
    y: Option<[u8; COORDINATE_BYTES]>,
    d: Option<Zeroizing<[u8; COORDINATE_BYTES]>>,
}

/// A freshly generated key pair, both halves CBOR-encoded.
#[derive(Clone)]
pub struct KeyPair {
    pub public_key: Vec<u8>,
    pub private_key: Zeroizing<Vec<u8>>,
}

impl CoseKey {
    /// Generate a key pair for `suite` (default HPKE-7).
    pub fn generate(suite: Option<SuiteId>) -> Result<(CoseKey, CoseKey)> {
        let config = suite::resolve(suite);
        let (public_raw, private_raw) = config.generate_raw();
        let public = Self::from_raw_public(config.key_type, &public_raw)?
            .with_alg(config.integrated_alg);
        let private = public.clone().with_private_raw(&private_raw)?;
        tracing::debug!(suite = %config.id, "generated key pair");
        Ok((public, private))
    }

    /// Build a public key from raw HPKE public key bytes.
    pub fn from_raw_public(key_type: KeyType, raw: &[u8]) -> Result<Self> {
        let (x, y) = match key_type {
            KeyType::Ec2 => {
                if raw.len() != P256_PUBLIC_KEY_BYTES || raw[0] != SEC1_UNCOMPRESSED {
                    return Err(Error::invalid_key("P-256 public key must be 65 bytes with 0x04 prefix"));
                }
                let x = coordinate(&raw[1..1 + COORDINATE_BYTES], "x")?;
                let y = coordinate(&raw[1 + COORDINATE_BYTES..], "y")?;
                (x, Some(y))
            }
            KeyType::Okp => (coordinate(raw, "x")?, None),
        };
        Ok(CoseKey {
            key_type,
            kid: None,
            alg: None,
            x,
            y,
            d: None,
        })
    }

    pub(crate) fn with_private_raw(mut self, raw: &[u8]) -> Result<Self> {
        self.d = Some(Zeroizing::new(coordinate(raw, "d")?));
        Ok(self)
    }

    pub fn with_kid(mut self, kid: impl Into<Vec<u8>>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn with_alg(mut self, alg: i64) -> Self {
        self.alg = Some(alg);
        self
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn kid(&self) -> Option<&[u8]> {
        self.kid.as_deref()
    }

    pub fn alg(&self) -> Option<i64> {
        self.alg
    }

    pub fn x(&self) -> &[u8] {
        &self.x
    }

    pub fn y(&self) -> Option<&[u8]> {
        self.y.as_ref().map(|y| y.as_slice())
    }

    pub fn d(&self) -> Option<&[u8]> {
        self.d.as_ref().map(|d| d.as_slice())
    }

    pub fn is_private(&self) -> bool {
        self.d.is_some()
    }

    /// The same key with the private scalar removed.
    pub fn public_key(&self) -> CoseKey {
        CoseKey {
            d: None,
            ..self.clone()
        }
    }

    /// Raw HPKE public key bytes.
    pub fn raw_public(&self) -> Vec<u8> {
        match self.y {
            Some(y) => {
                let mut out = Vec::with_capacity(P256_PUBLIC_KEY_BYTES);
                out.push(SEC1_UNCOMPRESSED);
                out.extend_from_slice(&self.x);
                out.extend_from_slice(&y);
                out
            }
            None => self.x.to_vec(),
        }
    }

    /// Whether this key can be used with `suite`.
    pub fn fits(&self, suite: &SuiteConfig) -> bool {
        self.key_type == suite.key_type
    }

    /// Reject keys whose type does not match `suite` (seal path).
    pub(crate) fn require_suite(&self, suite: &SuiteConfig) -> Result<()> {
        if self.fits(suite) {
            Ok(())
        } else {
            Err(Error::invalid_key(format!(
                "{:?} key cannot be used with {}",
                self.key_type, suite.id
            )))
        }
    }

    // -----------------------------------------------------------------------
    // CBOR
    // -----------------------------------------------------------------------

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut entries = Vec::with_capacity(7);
        entries.push((cbor::int(COSE_KEY_KTY), cbor::int(self.key_type.kty())));
        if let Some(kid) = &self.kid {
            entries.push((cbor::int(COSE_KEY_KID), Value::Bytes(kid.clone())));
        }
        if let Some(alg) = self.alg {
            entries.push((cbor::int(COSE_KEY_ALG), cbor::int(alg)));
        }
        entries.push((cbor::int(COSE_KEY_CRV), cbor::int(self.key_type.crv())));
        entries.push((cbor::int(COSE_KEY_X), Value::Bytes(self.x.to_vec())));
        if let Some(y) = &self.y {
            entries.push((cbor::int(COSE_KEY_Y), Value::Bytes(y.to_vec())));
        }
        if let Some(d) = &self.d {
            entries.push((cbor::int(COSE_KEY_D), Value::Bytes(d.to_vec())));
        }
        cbor::encode(&Value::Map(entries))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let value = cbor::decode(bytes).map_err(|e| Error::invalid_key(format!("not CBOR: {e}")))?;
        let entries = match value {
            Value::Map(entries) => entries,
            _ => return Err(Error::invalid_key("COSE_Key must be a CBOR map")),
        };

        let kty = cbor::map_get(&entries, COSE_KEY_KTY).and_then(cbor::as_int);
        let key_type = kty
            .and_then(KeyType::from_kty)
            .ok_or_else(|| Error::invalid_key(format!("unsupported key type: {kty:?}")))?;

        let crv = cbor::map_get(&entries, COSE_KEY_CRV).and_then(cbor::as_int);
        if crv != Some(key_type.crv()) {
            return Err(Error::invalid_key(format!(
                "curve {crv:?} does not match key type {key_type:?}"
            )));
        }

        let kid = match cbor::map_get(&entries, COSE_KEY_KID) {
            None => None,
            Some(Value::Bytes(kid)) => Some(kid.clone()),
            Some(_) => return Err(Error::invalid_key("kid must be a byte string")),
        };
        let alg = match cbor::map_get(&entries, COSE_KEY_ALG) {
            None => None,
            Some(v) => Some(cbor::as_int(v).ok_or_else(|| Error::invalid_key("alg must be an integer"))?),
        };

        let x = coordinate(required_bytes(&entries, COSE_KEY_X, "x")?, "x")?;
        let y = match (key_type, cbor::map_get(&entries, COSE_KEY_Y)) {
            (KeyType::Ec2, Some(_)) => Some(coordinate(required_bytes(&entries, COSE_KEY_Y, "y")?, "y")?),
            (KeyType::Ec2, None) => return Err(Error::invalid_key("EC2 key is missing y")),
            (KeyType::Okp, Some(_)) => return Err(Error::invalid_key("OKP key must not carry y")),
            (KeyType::Okp, None) => None,
        };
        let d = match cbor::map_get(&entries, COSE_KEY_D) {
            None => None,
            Some(_) => Some(Zeroizing::new(coordinate(
                required_bytes(&entries, COSE_KEY_D, "d")?,
                "d",
            )?)),
        };

        Ok(CoseKey {
            key_type,
            kid,
            alg,
            x,
            y,
            d,
        })
    }

    /// Decode a key that must carry the private scalar.
    pub fn decode_private(bytes: &[u8]) -> Result<Self> {
        let key = Self::decode(bytes)?;
        if !key.is_private() {
            return Err(Error::invalid_key("private key required (missing d)"));
        }
        Ok(key)
    }
}

impl fmt::Debug for CoseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoseKey")
            .field("key_type", &self.key_type)
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("d", &self.d.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Generate a key pair and encode both halves.
pub fn generate_key_pair(suite: Option<SuiteId>) -> Result<KeyPair> {
    let (public, private) = CoseKey::generate(suite)?;
    Ok(KeyPair {
        public_key: public.encode()?,
        private_key: Zeroizing::new(private.encode()?),
    })
}

fn required_bytes<'a>(entries: &'a [(Value, Value)], label: i64, name: &str) -> Result<&'a [u8]> {
    match cbor::map_get(entries, label) {
        Some(Value::Bytes(b)) => Ok(b),
        Some(_) => Err(Error::invalid_key(format!("{name} must be a byte string"))),
        None => Err(Error::invalid_key(format!("missing {name}"))),
    }
}

fn coordinate(bytes: &[u8], name: &str) -> Result<[u8; COORDINATE_BYTES]> {
    bytes.try_into().map_err(|_| {
        Error::invalid_key(format!(
            "{name} must be {COORDINATE_BYTES} bytes, got {}",
            bytes.len()
        ))
    })
}
