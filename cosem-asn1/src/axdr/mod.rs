//! A-XDR codec
//!
//! Encoding of the self-describing data tree lives on
//! [`cosem_core::DataObject::to_bytes`]; this module provides the decoding
//! side: a cursor-based decoder for self-describing values and a declarative
//! decoder driven by an encoding configuration of attributes, sequences and
//! choices.

mod conf;
mod decoder;

pub use conf::{AxdrValue, ConfAttribute, ConfElement, EncodingConf, FieldLength};
pub use decoder::{decode_data, AxdrDecoder, DEFAULT_MAX_DEPTH};
