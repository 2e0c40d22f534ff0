//! Declarative decoding configuration
//!
//! A configuration is an ordered list of elements. Attributes are named
//! fields with a fixed or variable length; sequences consume a stream of
//! self-describing values terminated by the end of the buffer; choices
//! dispatch on one discriminating byte.

use cosem_core::datatypes::DataObject;
use cosem_core::error::{DlmsError, DlmsResult};

/// Decoded value of one configuration element
#[derive(Debug, Clone, PartialEq)]
pub enum AxdrValue {
    /// An optional attribute that was not present
    Absent,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    Bytes(Vec<u8>),
    Data(DataObject),
    DataList(Vec<DataObject>),
}

impl AxdrValue {
    pub fn bool_from(data: &[u8]) -> DlmsResult<AxdrValue> {
        let byte = one_byte(data)?;
        Ok(AxdrValue::Bool(byte != 0))
    }

    pub fn u8_from(data: &[u8]) -> DlmsResult<AxdrValue> {
        Ok(AxdrValue::U8(one_byte(data)?))
    }

    pub fn i8_from(data: &[u8]) -> DlmsResult<AxdrValue> {
        Ok(AxdrValue::I8(one_byte(data)? as i8))
    }

    pub fn u16_from(data: &[u8]) -> DlmsResult<AxdrValue> {
        if data.len() != 2 {
            return Err(DlmsError::LengthMismatch {
                declared: 2,
                actual: data.len(),
            });
        }
        Ok(AxdrValue::U16(u16::from_be_bytes([data[0], data[1]])))
    }

    pub fn u32_from(data: &[u8]) -> DlmsResult<AxdrValue> {
        if data.len() != 4 {
            return Err(DlmsError::LengthMismatch {
                declared: 4,
                actual: data.len(),
            });
        }
        Ok(AxdrValue::U32(u32::from_be_bytes([
            data[0], data[1], data[2], data[3],
        ])))
    }

    pub fn bytes_from(data: &[u8]) -> DlmsResult<AxdrValue> {
        Ok(AxdrValue::Bytes(data.to_vec()))
    }
}

fn one_byte(data: &[u8]) -> DlmsResult<u8> {
    if data.len() != 1 {
        return Err(DlmsError::LengthMismatch {
            declared: 1,
            actual: data.len(),
        });
    }
    Ok(data[0])
}

/// Length of an attribute on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLength {
    Fixed(usize),
    Variable,
}

/// A named field with a known construction rule
#[derive(Clone)]
pub struct ConfAttribute {
    pub name: &'static str,
    pub length: FieldLength,
    /// Peek one byte: `0x00` means absent, `0x01` means present
    pub optional: bool,
    /// Peek one byte: `0x00` means "use this default"
    pub default: Option<AxdrValue>,
    pub construct: fn(&[u8]) -> DlmsResult<AxdrValue>,
}

impl ConfAttribute {
    pub fn fixed(name: &'static str, length: usize, construct: fn(&[u8]) -> DlmsResult<AxdrValue>) -> Self {
        Self {
            name,
            length: FieldLength::Fixed(length),
            optional: false,
            default: None,
            construct,
        }
    }

    pub fn variable(name: &'static str, construct: fn(&[u8]) -> DlmsResult<AxdrValue>) -> Self {
        Self {
            name,
            length: FieldLength::Variable,
            optional: false,
            default: None,
            construct,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: AxdrValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// One element of an encoding configuration
#[derive(Clone)]
pub enum ConfElement {
    Attribute(ConfAttribute),
    /// A stream of self-describing data values terminated by buffer end
    Sequence { name: &'static str },
    /// Dispatch on one discriminating byte
    Choice(Vec<(u8, ConfElement)>),
}

/// An ordered decoding plan
#[derive(Clone)]
pub struct EncodingConf {
    pub elements: Vec<ConfElement>,
}

impl EncodingConf {
    pub fn new(elements: Vec<ConfElement>) -> Self {
        Self { elements }
    }
}
