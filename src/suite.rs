//! Cipher suite registry
//!
//! Two HPKE suites are supported, each with a distinct algorithm id per
//! mode:
//!
//!   HPKE-7 (default)  DHKEM(P-256, HKDF-SHA256) / HKDF-SHA256 / AES-256-GCM
//!                     integrated 45, key encryption 53, EC2 / P-256
//!   HPKE-4            DHKEM(X25519, HKDF-SHA256) / HKDF-SHA256 / ChaCha20-Poly1305
//!                     integrated 42, key encryption 50, OKP / X25519
//!
//! Both use A256GCM (3) for the content layer of multi-recipient messages.

use core::fmt;
use core::marker::PhantomData;
use core::str::FromStr;

use hpke::aead::{Aead as AeadTrait, AesGcm256, ChaCha20Poly1305};
use hpke::kdf::{HkdfSha256, Kdf as KdfTrait};
use hpke::kem::{DhP256HkdfSha256, X25519HkdfSha256};
use hpke::{Deserializable, HpkeError, Kem as KemTrait, OpModeR, OpModeS, Serializable};
use rand_core::OsRng;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::key::KeyType;

pub const ALG_HPKE_4_INTEGRATED: i64 = 42;
pub const ALG_HPKE_4_KEY_ENCRYPTION: i64 = 50;
pub const ALG_HPKE_7_INTEGRATED: i64 = 45;
pub const ALG_HPKE_7_KEY_ENCRYPTION: i64 = 53;

/// AES-256-GCM content encryption (COSE "A256GCM").
pub const ALG_A256GCM: i64 = 3;

/// Supported suite identifiers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SuiteId {
    /// HPKE-4: X25519 / ChaCha20-Poly1305.
    Hpke4,
    /// HPKE-7: P-256 / AES-256-GCM.
    #[default]
    Hpke7,
}

impl SuiteId {
    pub const fn as_str(self) -> &'static str {
        match self {
            SuiteId::Hpke4 => "HPKE-4",
            SuiteId::Hpke7 => "HPKE-7",
        }
    }

    pub fn config(self) -> &'static SuiteConfig {
        match self {
            SuiteId::Hpke4 => &HPKE_4,
            SuiteId::Hpke7 => &HPKE_7,
        }
    }
}

impl fmt::Display for SuiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuiteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HPKE-4" => Ok(SuiteId::Hpke4),
            "HPKE-7" => Ok(SuiteId::Hpke7),
            other => Err(Error::UnsupportedSuite(other.to_string())),
        }
    }
}

/// Static description of one suite.
#[derive(Debug, PartialEq, Eq)]
pub struct SuiteConfig {
    pub id: SuiteId,
    pub integrated_alg: i64,
    pub key_encryption_alg: i64,
    pub content_alg: i64,
    pub key_type: KeyType,
}

static HPKE_4: SuiteConfig = SuiteConfig {
    id: SuiteId::Hpke4,
    integrated_alg: ALG_HPKE_4_INTEGRATED,
    key_encryption_alg: ALG_HPKE_4_KEY_ENCRYPTION,
    content_alg: ALG_A256GCM,
    key_type: KeyType::Okp,
};

static HPKE_7: SuiteConfig = SuiteConfig {
    id: SuiteId::Hpke7,
    integrated_alg: ALG_HPKE_7_INTEGRATED,
    key_encryption_alg: ALG_HPKE_7_KEY_ENCRYPTION,
    content_alg: ALG_A256GCM,
    key_type: KeyType::Ec2,
};

static SUITES: [&SuiteConfig; 2] = [&HPKE_4, &HPKE_7];

/// Encryption mode a header algorithm id belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Integrated,
    KeyEncryption,
}

/// The named suite, or the default (HPKE-7) when none is given.
pub fn resolve(id: Option<SuiteId>) -> &'static SuiteConfig {
    id.unwrap_or_default().config()
}

/// Resolve a suite by its textual id (`"HPKE-4"` / `"HPKE-7"`).
pub fn resolve_name(name: Option<&str>) -> Result<&'static SuiteConfig> {
    match name {
        Some(name) => Ok(name.parse::<SuiteId>()?.config()),
        None => Ok(resolve(None)),
    }
}

/// Reverse lookup from a header algorithm id, in either mode.
pub fn suite_from_algorithm(alg: i64) -> Option<&'static SuiteConfig> {
    suite_and_mode(alg).map(|(suite, _)| suite)
}

/// Reverse lookup that also reports which mode the id belongs to.
pub fn suite_and_mode(alg: i64) -> Option<(&'static SuiteConfig, Mode)> {
    SUITES.iter().find_map(|s| {
        if s.integrated_alg == alg {
            Some((*s, Mode::Integrated))
        } else if s.key_encryption_alg == alg {
            Some((*s, Mode::KeyEncryption))
        } else {
            None
        }
    })
}

impl SuiteConfig {
    pub fn alg_for(&self, mode: Mode) -> i64 {
        match mode {
            Mode::Integrated => self.integrated_alg,
            Mode::KeyEncryption => self.key_encryption_alg,
        }
    }

    /// Fresh key pair as raw bytes: (public, private).
    pub(crate) fn generate_raw(&self) -> (Vec<u8>, Zeroizing<Vec<u8>>) {
        match self.id {
            SuiteId::Hpke4 => Hpke4::generate_raw(),
            SuiteId::Hpke7 => Hpke7::generate_raw(),
        }
    }

    /// Single-shot HPKE base-mode seal. Returns (encapsulated key, ciphertext).
    pub(crate) fn seal(
        &self,
        public_key: &[u8],
        plaintext: &[u8],
        aad: &[u8],
        info: &[u8],
    ) -> core::result::Result<(Vec<u8>, Vec<u8>), HpkeError> {
        match self.id {
            SuiteId::Hpke4 => Hpke4::seal(public_key, plaintext, aad, info),
            SuiteId::Hpke7 => Hpke7::seal(public_key, plaintext, aad, info),
        }
    }

    /// Single-shot HPKE base-mode open.
    pub(crate) fn open(
        &self,
        private_key: &[u8],
        encapsulated_key: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        info: &[u8],
    ) -> core::result::Result<Vec<u8>, HpkeError> {
        match self.id {
            SuiteId::Hpke4 => Hpke4::open(private_key, encapsulated_key, ciphertext, aad, info),
            SuiteId::Hpke7 => Hpke7::open(private_key, encapsulated_key, ciphertext, aad, info),
        }
    }
}

// ---------------------------------------------------------------------------
// Sealed-box primitive
// ---------------------------------------------------------------------------

/// Sealed-box capability of one HPKE suite over raw key bytes.
pub(crate) trait SealedBox {
    fn generate_raw() -> (Vec<u8>, Zeroizing<Vec<u8>>);

    fn seal(
        public_key: &[u8],
        plaintext: &[u8],
        aad: &[u8],
        info: &[u8],
    ) -> core::result::Result<(Vec<u8>, Vec<u8>), HpkeError>;

    fn open(
        private_key: &[u8],
        encapsulated_key: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        info: &[u8],
    ) -> core::result::Result<Vec<u8>, HpkeError>;
}

pub(crate) struct Hpke<A, Kdf, Kem>(PhantomData<(A, Kdf, Kem)>);

type Hpke4 = Hpke<ChaCha20Poly1305, HkdfSha256, X25519HkdfSha256>;
type Hpke7 = Hpke<AesGcm256, HkdfSha256, DhP256HkdfSha256>;

impl<A: AeadTrait, Kdf: KdfTrait, Kem: KemTrait> SealedBox for Hpke<A, Kdf, Kem> {
    fn generate_raw() -> (Vec<u8>, Zeroizing<Vec<u8>>) {
        let (sk, pk) = Kem::gen_keypair(&mut OsRng);
        (
            pk.to_bytes().to_vec(),
            Zeroizing::new(sk.to_bytes().to_vec()),
        )
    }

    fn seal(
        public_key: &[u8],
        plaintext: &[u8],
        aad: &[u8],
        info: &[u8],
    ) -> core::result::Result<(Vec<u8>, Vec<u8>), HpkeError> {
        let pk = Kem::PublicKey::from_bytes(public_key)?;
        let (encapped, ciphertext) = hpke::single_shot_seal::<A, Kdf, Kem, _>(
            &OpModeS::Base,
            &pk,
            info,
            plaintext,
            aad,
            &mut OsRng,
        )?;
        Ok((encapped.to_bytes().to_vec(), ciphertext))
    }

    fn open(
        private_key: &[u8],
        encapsulated_key: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
        info: &[u8],
    ) -> core::result::Result<Vec<u8>, HpkeError> {
        let sk = Kem::PrivateKey::from_bytes(private_key)?;
        let encapped = Kem::EncappedKey::from_bytes(encapsulated_key)?;
        hpke::single_shot_open::<A, Kdf, Kem>(
            &OpModeR::Base,
            &sk,
            &encapped,
            info,
            ciphertext,
            aad,
        )
    }
}
