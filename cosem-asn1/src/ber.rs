//! Minimal BER encoding as used by ACSE framing
//!
//! Tags may span several bytes but the length is always a single byte
//! (0..255). Indefinite-length forms are not used by DLMS.

use cosem_core::error::{DlmsError, DlmsResult};

/// Encode `data` as `tag ++ len(data) ++ data`.
///
/// An empty `data` yields an empty output; callers treat absence as
/// "field omitted".
pub fn encode(tag: &[u8], data: &[u8]) -> Vec<u8> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(tag.len() + 1 + data.len());
    out.extend_from_slice(tag);
    out.push(data.len() as u8);
    out.extend_from_slice(data);
    out
}

/// Encode with a single-byte tag.
pub fn encode_tag(tag: u8, data: &[u8]) -> Vec<u8> {
    encode(&[tag], data)
}

/// Decode a BER element, returning `(tag, length, payload)`.
///
/// The payload must span the whole remaining input; a shorter or longer
/// input fails with `LengthMismatch`.
pub fn decode(data: &[u8], tag_length: usize) -> DlmsResult<(Vec<u8>, u8, Vec<u8>)> {
    if data.len() < tag_length + 1 {
        return Err(DlmsError::insufficient(tag_length + 1, data.len()));
    }

    let tag = data[..tag_length].to_vec();
    let length = data[tag_length];
    let payload = &data[tag_length + 1..];

    if payload.len() != usize::from(length) {
        return Err(DlmsError::LengthMismatch {
            declared: usize::from(length),
            actual: payload.len(),
        });
    }

    Ok((tag, length, payload.to_vec()))
}
