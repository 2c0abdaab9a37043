//! Thin helpers over `ciborium::Value`.
//!
//! COSE structures are small fixed shapes (maps with integer labels,
//! arrays, byte strings, tags), so everything goes through the dynamic
//! `Value` model and is converted into typed structs right at the edge.

use core::fmt::Write as _;

use ciborium::value::{Integer, Value};

use crate::error::{Error, Result};

/// Serialize a value to CBOR bytes.
pub(crate) fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|_| Error::Encoding)?;
    Ok(out)
}

/// Decode exactly one CBOR item; trailing bytes are an error. Callers map
/// the error into their own variant.
pub(crate) fn decode(bytes: &[u8]) -> core::result::Result<Value, String> {
    let mut rest = bytes;
    let value = ciborium::de::from_reader(&mut rest).map_err(|e| e.to_string())?;
    if !rest.is_empty() {
        return Err(format!("{} trailing bytes after CBOR item", rest.len()));
    }
    Ok(value)
}

pub(crate) fn int(v: i64) -> Value {
    Value::Integer(Integer::from(v))
}

pub(crate) fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => i64::try_from(*i).ok(),
        _ => None,
    }
}

/// Look up an integer label in a CBOR map.
pub(crate) fn map_get(entries: &[(Value, Value)], label: i64) -> Option<&Value> {
    entries
        .iter()
        .find(|(k, _)| as_int(k) == Some(label))
        .map(|(_, v)| v)
}

/// Render CBOR bytes in diagnostic notation (RFC 8949 section 8).
///
/// ```
/// let bytes = [0xa1, 0x01, 0x18, 0x2d]; // {1: 45}
/// assert_eq!(cose_hpke::cbor::diagnostic(&bytes).unwrap(), "{1: 45}");
/// ```
pub fn diagnostic(bytes: &[u8]) -> Result<String> {
    let value = decode(bytes).map_err(Error::MalformedMessage)?;
    let mut out = String::new();
    write_diagnostic(&mut out, &value);
    Ok(out)
}

fn write_diagnostic(out: &mut String, value: &Value) {
    match value {
        Value::Integer(i) => {
            let _ = write!(out, "{}", i128::from(*i));
        }
        Value::Bytes(b) => {
            let _ = write!(out, "h'{}'", hex::encode(b));
        }
        Value::Text(s) => {
            let _ = write!(out, "{s:?}");
        }
        Value::Float(f) => {
            let _ = write!(out, "{f:?}");
        }
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Null => out.push_str("null"),
        Value::Tag(tag, inner) => {
            let _ = write!(out, "{tag}(");
            write_diagnostic(out, inner);
            out.push(')');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_diagnostic(out, item);
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_diagnostic(out, k);
                out.push_str(": ");
                write_diagnostic(out, v);
            }
            out.push('}');
        }
        _ => out.push_str("undefined"),
    }
}
