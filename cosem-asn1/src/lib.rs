//! ASN.1 encoding support for DLMS/COSEM
//!
//! Two codecs live here: the one-byte-tag/one-byte-length BER subset used
//! for ACSE framing, and the A-XDR self-describing data encoding used by
//! xDLMS payloads.

pub mod axdr;
pub mod ber;

pub use axdr::{
    decode_data, AxdrDecoder, AxdrValue, ConfAttribute, ConfElement, EncodingConf, FieldLength,
    DEFAULT_MAX_DEPTH,
};
pub use cosem_core::error::{DlmsError, DlmsResult};
