//! URL fragment transport
//!
//! Payload carried after `#`:
//!
//!   base64url_nopad( version[1] || data )
//!
//!   0x00  data is the raw message
//!   0x01  data is the message, raw DEFLATE (RFC 1951) compressed
//!   else  legacy fragment without a version byte: the whole decoded
//!         payload is the message
//!
//! Deflate is used only when it is strictly smaller than the input.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use miniz_oxide::deflate::compress_to_vec;
use miniz_oxide::inflate::decompress_to_vec_with_limit;

use crate::error::{Error, Result};

pub const VERSION_UNCOMPRESSED: u8 = 0x00;
pub const VERSION_DEFLATE: u8 = 0x01;

/// Longest URL `create_shareable_url` will produce.
pub const MAX_URL_LENGTH: usize = 2 * 1024 * 1024;

/// Upper bound on inflated output.
pub const MAX_DECOMPRESSED_LENGTH: usize = 64 * 1024 * 1024;

pub const DEFAULT_BASE_URL: &str = "https://cose-hpke.github.io/decrypt";

const DEFLATE_LEVEL: u8 = 6;

/// URL-safe alphabet, no padding written, padding tolerated on input.
const FRAGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Whether the encoder may compress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    Deflate,
    Disabled,
}

pub fn compress(data: &[u8]) -> Vec<u8> {
    compress_to_vec(data, DEFLATE_LEVEL)
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_to_vec_with_limit(data, MAX_DECOMPRESSED_LENGTH).map_err(|_| Error::CorruptFragment)
}

pub fn encode_fragment(data: &[u8]) -> String {
    encode_fragment_with(data, Compression::Deflate)
}

pub fn encode_fragment_with(data: &[u8], compression: Compression) -> String {
    let compressed = match compression {
        Compression::Deflate => Some(compress(data)).filter(|c| c.len() < data.len()),
        Compression::Disabled => None,
    };

    let mut payload = Vec::with_capacity(1 + data.len());
    match compressed {
        Some(c) => {
            tracing::debug!(raw = data.len(), compressed = c.len(), "fragment uses deflate");
            payload.push(VERSION_DEFLATE);
            payload.extend_from_slice(&c);
        }
        None => {
            tracing::debug!(raw = data.len(), "fragment stored uncompressed");
            payload.push(VERSION_UNCOMPRESSED);
            payload.extend_from_slice(data);
        }
    }
    FRAGMENT_ENGINE.encode(payload)
}

pub fn decode_fragment(fragment: &str) -> Result<Vec<u8>> {
    let mut payload = FRAGMENT_ENGINE
        .decode(fragment)
        .map_err(|_| Error::CorruptFragment)?;

    match payload.first().copied() {
        None => Err(Error::EmptyFragment),
        Some(VERSION_UNCOMPRESSED) => {
            payload.remove(0);
            Ok(payload)
        }
        Some(VERSION_DEFLATE) => decompress(&payload[1..]),
        Some(first) => {
            // TODO: drop the legacy path once pre-versioned links have expired.
            tracing::debug!(first_byte = first, "fragment has no version byte, treating as legacy");
            Ok(payload)
        }
    }
}

/// `base_url#fragment`, refusing URLs longer than [`MAX_URL_LENGTH`].
pub fn create_shareable_url(data: &[u8], base_url: &str) -> Result<String> {
    create_shareable_url_with(data, base_url, Compression::Deflate)
}

pub fn create_shareable_url_with(data: &[u8], base_url: &str, compression: Compression) -> Result<String> {
    let url = format!("{base_url}#{}", encode_fragment_with(data, compression));
    if url.len() > MAX_URL_LENGTH {
        return Err(Error::UrlTooLarge {
            actual: url.len(),
            max: MAX_URL_LENGTH,
        });
    }
    Ok(url)
}

pub fn parse_shareable_url(url: &str) -> Result<Vec<u8>> {
    match url.split_once('#') {
        Some((_, fragment)) if !fragment.is_empty() => decode_fragment(fragment),
        _ => Err(Error::NoFragment),
    }
}
