//! Unified error type for COSE-HPKE.
//!
//! Every decryption failure renders as the same `decryption failed` text.
//! The reason is kept in [`DecryptCause`] and only reachable through
//! [`std::error::Error::source`], for local diagnostics.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("unsupported cipher suite: {0}")]
    UnsupportedSuite(String),

    #[error("at least one recipient is required")]
    NoRecipients,

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unrecognized message type: expected COSE_Encrypt0 or COSE_Encrypt")]
    UnrecognizedMessageType,

    #[error("decryption failed")]
    DecryptionFailed {
        #[source]
        cause: Option<DecryptCause>,
    },

    #[error("no recipient entry could be opened with this key")]
    NoMatchingRecipient,

    #[error(
        "URL exceeds maximum length: {:.2} MiB > {:.2} MiB limit",
        mib(.actual),
        mib(.max)
    )]
    UrlTooLarge { actual: usize, max: usize },

    #[error("URL does not contain a fragment")]
    NoFragment,

    #[error("fragment payload is empty")]
    EmptyFragment,

    #[error("fragment payload is corrupt")]
    CorruptFragment,

    #[error("invalid options: {0}")]
    InvalidOptions(&'static str),

    #[error("encoding error")]
    Encoding,
}

/// Internal reason behind [`Error::DecryptionFailed`].
#[derive(Debug, Error)]
pub enum DecryptCause {
    #[error("encapsulated key missing from unprotected header")]
    MissingEncapsulatedKey,

    #[error("algorithm {0:?} does not identify a suite for this layer")]
    UnknownAlgorithm(Option<i64>),

    #[error("private key type does not match the suite")]
    KeyTypeMismatch,

    #[error("hpke: {0}")]
    Hpke(hpke::HpkeError),

    #[error("content decryption failed")]
    ContentAead,

    #[error("recovered content key has the wrong length")]
    ContentKeyLength,
}

impl Error {
    pub(crate) fn decryption(cause: DecryptCause) -> Self {
        Error::DecryptionFailed { cause: Some(cause) }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedMessage(reason.into())
    }

    pub(crate) fn invalid_key(reason: impl Into<String>) -> Self {
        Error::InvalidKey(reason.into())
    }
}

fn mib(bytes: &usize) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}
