//! Per-call configuration.

use crate::error::{Error, Result};
use crate::suite::SuiteId;

/// Options shared by encrypt and decrypt.
///
/// - `suite`: suite to encrypt with, or to force on decrypt instead of
///   inferring it from the message. Defaults to HPKE-7 on encrypt.
/// - `external_aad`: bound into the Enc_structure of either mode.
/// - `external_info`: HPKE info for integrated (single recipient) mode.
/// - `recipient_extra_info`: extra info in each Recipient_structure
///   (multi recipient mode).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub suite: Option<SuiteId>,
    pub external_aad: Vec<u8>,
    pub external_info: Vec<u8>,
    pub recipient_extra_info: Vec<u8>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_suite(mut self, suite: SuiteId) -> Self {
        self.suite = Some(suite);
        self
    }

    pub fn with_external_aad(mut self, aad: impl Into<Vec<u8>>) -> Self {
        self.external_aad = aad.into();
        self
    }

    pub fn with_external_info(mut self, info: impl Into<Vec<u8>>) -> Self {
        self.external_info = info.into();
        self
    }

    pub fn with_recipient_extra_info(mut self, info: impl Into<Vec<u8>>) -> Self {
        self.recipient_extra_info = info.into();
        self
    }

    /// Reject fields that the mode chosen for `recipients` would ignore.
    pub fn check_for(&self, recipients: usize) -> Result<()> {
        match recipients {
            0 => Err(Error::NoRecipients),
            1 if !self.recipient_extra_info.is_empty() => Err(Error::InvalidOptions(
                "recipient extra info only applies to multiple recipients",
            )),
            n if n > 1 && !self.external_info.is_empty() => Err(Error::InvalidOptions(
                "external info only applies to a single recipient",
            )),
            _ => Ok(()),
        }
    }
}
