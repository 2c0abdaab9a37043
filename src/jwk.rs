//! JWK import/export for COSE keys.
//!
//!   EC2 / P-256   <->  {"kty":"EC",  "crv":"P-256",  "x":..., "y":..., ["d":...]}
//!   OKP / X25519  <->  {"kty":"OKP", "crv":"X25519", "x":..., ["d":...]}
//!
//! Members are base64url without padding. Keys imported from JWK get the
//! integrated algorithm id of the suite matching their curve.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::key::{CoseKey, KeyType};
use crate::suite::SuiteId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Jwk {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|_| Error::Encoding)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::invalid_key(format!("JWK: {e}")))
    }
}

impl CoseKey {
    pub fn to_jwk(&self) -> Jwk {
        let (kty, crv) = match self.key_type() {
            KeyType::Ec2 => ("EC", "P-256"),
            KeyType::Okp => ("OKP", "X25519"),
        };
        Jwk {
            kty: kty.to_string(),
            crv: crv.to_string(),
            x: URL_SAFE_NO_PAD.encode(self.x()),
            y: self.y().map(|y| URL_SAFE_NO_PAD.encode(y)),
            d: self.d().map(|d| URL_SAFE_NO_PAD.encode(d)),
            kid: self.kid().map(|kid| String::from_utf8_lossy(kid).into_owned()),
        }
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let (key_type, suite) = match (jwk.kty.as_str(), jwk.crv.as_str()) {
            ("EC", "P-256") => (KeyType::Ec2, SuiteId::Hpke7),
            ("OKP", "X25519") => (KeyType::Okp, SuiteId::Hpke4),
            (kty, crv) => {
                return Err(Error::invalid_key(format!("unsupported JWK type: {kty}/{crv}")))
            }
        };

        let mut raw = Vec::with_capacity(65);
        if key_type == KeyType::Ec2 {
            let y = jwk
                .y
                .as_deref()
                .ok_or_else(|| Error::invalid_key("JWK missing y coordinate"))?;
            raw.push(0x04);
            raw.extend_from_slice(&member(&jwk.x, "x")?);
            raw.extend_from_slice(&member(y, "y")?);
        } else {
            if jwk.y.is_some() {
                return Err(Error::invalid_key("OKP JWK must not carry y"));
            }
            raw.extend_from_slice(&member(&jwk.x, "x")?);
        }

        let mut key = CoseKey::from_raw_public(key_type, &raw)?.with_alg(suite.config().integrated_alg);
        if let Some(kid) = &jwk.kid {
            key = key.with_kid(kid.as_bytes());
        }
        if let Some(d) = &jwk.d {
            key = key.with_private_raw(&Zeroizing::new(member(d, "d")?))?;
        }
        Ok(key)
    }
}

fn member(text: &str, name: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|_| Error::invalid_key(format!("JWK member {name} is not base64url")))
}
