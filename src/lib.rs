//! # COSE-HPKE
//!
//! Public-key encryption of arbitrary payloads as COSE messages, using
//! HPKE (RFC 9180) cipher suites, plus a compact URL fragment transport.
//!
//! ## Quick Start
//!
//! ```rust
//! use cose_hpke::{decrypt, encrypt, generate_key_pair, Options};
//!
//! let alice = generate_key_pair(None).unwrap();
//!
//! let message = encrypt(b"hello", &[&alice.public_key], &Options::new()).unwrap();
//! let plaintext = decrypt(&message, &alice.private_key, &Options::new()).unwrap();
//!
//! assert_eq!(plaintext, b"hello");
//! ```
//!
//! ## Modes
//!
//! - **Integrated** (one recipient): COSE_Encrypt0, tag 16. HPKE seals the
//!   plaintext directly.
//! - **Key encryption** (two or more): COSE_Encrypt, tag 96. A random
//!   AES-256-GCM content key encrypts the plaintext and is HPKE-sealed to
//!   each recipient.
//!
//! ## Suites
//!
//! - **HPKE-7** (default): P-256, HKDF-SHA256, AES-256-GCM
//! - **HPKE-4**: X25519, HKDF-SHA256, ChaCha20-Poly1305
//!
//! ## Errors
//!
//! Cryptographic failures all surface as [`Error::DecryptionFailed`] with
//! the same message; in multi-recipient messages a key that matches no
//! entry gives [`Error::NoMatchingRecipient`].

#![deny(unsafe_code)]
#![doc(html_root_url = "https://docs.rs/cose-hpke/0.1.0")]

// ---------------------------------------------------------------------------
// Internal modules (not part of public API)
// ---------------------------------------------------------------------------

mod aead;
mod error;
mod options;
mod sdk;

// ---------------------------------------------------------------------------
// Building blocks, public for tooling and interop tests
// ---------------------------------------------------------------------------

pub mod cbor;
pub mod fragment;
pub mod header;
pub mod integrated;
pub mod jwk;
pub mod key;
pub mod key_encryption;
pub mod suite;
pub mod wire;

// ---------------------------------------------------------------------------
// Public SDK interface
// ---------------------------------------------------------------------------

pub use error::{DecryptCause, Error, Result};
pub use fragment::{
    create_shareable_url, decode_fragment, encode_fragment, parse_shareable_url, Compression,
    DEFAULT_BASE_URL, MAX_URL_LENGTH,
};
pub use jwk::Jwk;
pub use key::{generate_key_pair, CoseKey, KeyPair, KeyType};
pub use options::Options;
pub use sdk::{decrypt, encrypt, inspect, MessageInfo, MessageKind, RecipientInfo};
pub use suite::SuiteId;
pub use wire::CoseMessage;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Encode a COSE_Key.
pub fn encode_key(key: &CoseKey) -> Result<Vec<u8>> {
    key.encode()
}

/// Decode and validate a COSE_Key.
pub fn decode_key(bytes: &[u8]) -> Result<CoseKey> {
    CoseKey::decode(bytes)
}
