use crate::datatypes::cosem_date_time::CosemDateTime;
use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};

/// One-byte tags of the self-describing DLMS data encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataTag {
    NullData = 0,
    Array = 1,
    Structure = 2,
    Boolean = 3,
    DoubleLong = 5,
    DoubleLongUnsigned = 6,
    OctetString = 9,
    VisibleString = 10,
    Integer = 15,
    Long = 16,
    Unsigned = 17,
    LongUnsigned = 18,
    DateTime = 25,
}

impl DataTag {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(DataTag::NullData),
            1 => Ok(DataTag::Array),
            2 => Ok(DataTag::Structure),
            3 => Ok(DataTag::Boolean),
            5 => Ok(DataTag::DoubleLong),
            6 => Ok(DataTag::DoubleLongUnsigned),
            9 => Ok(DataTag::OctetString),
            10 => Ok(DataTag::VisibleString),
            15 => Ok(DataTag::Integer),
            16 => Ok(DataTag::Long),
            17 => Ok(DataTag::Unsigned),
            18 => Ok(DataTag::LongUnsigned),
            25 => Ok(DataTag::DateTime),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "DataTag",
                value: other,
            }),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Fixed payload length in bytes; `None` for variable-width types and
    /// for arrays/structures, whose payload is a counted element list.
    pub fn fixed_length(self) -> Option<usize> {
        match self {
            DataTag::NullData => Some(0),
            DataTag::Boolean | DataTag::Integer | DataTag::Unsigned => Some(1),
            DataTag::Long | DataTag::LongUnsigned => Some(2),
            DataTag::DoubleLong | DataTag::DoubleLongUnsigned => Some(4),
            DataTag::DateTime => Some(CosemDateTime::LENGTH),
            DataTag::Array | DataTag::Structure | DataTag::OctetString | DataTag::VisibleString => {
                None
            }
        }
    }
}

/// Container holding data sent to or received from a smart meter
///
/// Each variant corresponds to one tag of the self-describing encoding.
/// Arrays and structures carry a variable-length element count followed by
/// that many nested values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataObject {
    Null,
    Boolean(bool),
    Integer(i8),
    Long(i16),
    DoubleLong(i32),
    Unsigned(u8),
    LongUnsigned(u16),
    DoubleLongUnsigned(u32),
    OctetString(Vec<u8>),
    VisibleString(String),
    Array(Vec<DataObject>),
    Structure(Vec<DataObject>),
    DateTime(CosemDateTime),
}

impl DataObject {
    /// The encoding tag of this value
    pub fn tag(&self) -> DataTag {
        match self {
            DataObject::Null => DataTag::NullData,
            DataObject::Boolean(_) => DataTag::Boolean,
            DataObject::Integer(_) => DataTag::Integer,
            DataObject::Long(_) => DataTag::Long,
            DataObject::DoubleLong(_) => DataTag::DoubleLong,
            DataObject::Unsigned(_) => DataTag::Unsigned,
            DataObject::LongUnsigned(_) => DataTag::LongUnsigned,
            DataObject::DoubleLongUnsigned(_) => DataTag::DoubleLongUnsigned,
            DataObject::OctetString(_) => DataTag::OctetString,
            DataObject::VisibleString(_) => DataTag::VisibleString,
            DataObject::Array(_) => DataTag::Array,
            DataObject::Structure(_) => DataTag::Structure,
            DataObject::DateTime(_) => DataTag::DateTime,
        }
    }

    /// Encode the value to its self-describing byte representation
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.tag().to_u8()];
        match self {
            DataObject::Null => {}
            DataObject::Boolean(value) => out.push(u8::from(*value)),
            DataObject::Integer(value) => out.push(*value as u8),
            DataObject::Long(value) => out.extend_from_slice(&value.to_be_bytes()),
            DataObject::DoubleLong(value) => out.extend_from_slice(&value.to_be_bytes()),
            DataObject::Unsigned(value) => out.push(*value),
            DataObject::LongUnsigned(value) => out.extend_from_slice(&value.to_be_bytes()),
            DataObject::DoubleLongUnsigned(value) => out.extend_from_slice(&value.to_be_bytes()),
            DataObject::OctetString(value) => {
                out.extend_from_slice(&encode_variable_integer(value.len()));
                out.extend_from_slice(value);
            }
            DataObject::VisibleString(value) => {
                out.extend_from_slice(&encode_variable_integer(value.len()));
                out.extend_from_slice(value.as_bytes());
            }
            DataObject::Array(items) | DataObject::Structure(items) => {
                out.extend_from_slice(&encode_variable_integer(items.len()));
                for item in items {
                    out.extend_from_slice(&item.to_bytes());
                }
            }
            DataObject::DateTime(value) => out.extend_from_slice(&value.to_bytes()),
        }
        out
    }

    /// True for `Array` and `Structure`
    pub fn is_container(&self) -> bool {
        matches!(self, DataObject::Array(_) | DataObject::Structure(_))
    }
}

/// Encode a variable length integer
///
/// A value that fits in 7 bits is encoded in one byte. Otherwise the first
/// byte has its high bit set and its low seven bits give the count of
/// big-endian value bytes that follow.
pub fn encode_variable_integer(value: usize) -> Vec<u8> {
    if value <= 0x7F {
        return vec![value as u8];
    }

    let mut encoded_length = 1;
    while value > (1usize << (8 * encoded_length)) - 1 {
        encoded_length += 1;
    }

    let mut out = Vec::with_capacity(encoded_length + 1);
    out.push(0x80 | encoded_length as u8);
    for i in (0..encoded_length).rev() {
        out.push((value >> (8 * i)) as u8);
    }
    out
}

/// Decode a variable length integer, returning the value and the rest of
/// the input.
pub fn decode_variable_integer(data: &[u8]) -> DlmsResult<(usize, &[u8])> {
    let first = *data
        .first()
        .ok_or_else(|| DlmsError::insufficient(1, data.len()))?;

    if first & 0x80 == 0 {
        return Ok((usize::from(first), &data[1..]));
    }

    let count = usize::from(first & 0x7F);
    if data.len() < count + 1 {
        return Err(DlmsError::insufficient(count + 1, data.len()));
    }
    let mut value = 0usize;
    for &byte in &data[1..=count] {
        value = (value << 8) | usize::from(byte);
    }
    Ok((value, &data[count + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_integer_short_form() {
        assert_eq!(encode_variable_integer(0), vec![0]);
        assert_eq!(encode_variable_integer(127), vec![0x7F]);
        let (value, rest) = decode_variable_integer(&[0x05, 0xAA]).unwrap();
        assert_eq!(value, 5);
        assert_eq!(rest, &[0xAA]);
    }

    #[test]
    fn test_variable_integer_long_form() {
        assert_eq!(encode_variable_integer(128), vec![0x81, 0x80]);
        assert_eq!(encode_variable_integer(0x1234), vec![0x82, 0x12, 0x34]);
        let (value, rest) = decode_variable_integer(&[0x82, 0x12, 0x34]).unwrap();
        assert_eq!(value, 0x1234);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_variable_integer_insufficient() {
        assert!(decode_variable_integer(&[]).is_err());
        assert!(decode_variable_integer(&[0x82, 0x12]).is_err());
    }

    #[test]
    fn test_primitive_encoding() {
        assert_eq!(DataObject::Null.to_bytes(), vec![0x00]);
        assert_eq!(DataObject::Boolean(true).to_bytes(), vec![0x03, 0x01]);
        assert_eq!(DataObject::Integer(-1).to_bytes(), vec![0x0F, 0xFF]);
        assert_eq!(
            DataObject::LongUnsigned(0x0102).to_bytes(),
            vec![0x12, 0x01, 0x02]
        );
        assert_eq!(
            DataObject::DoubleLongUnsigned(1).to_bytes(),
            vec![0x06, 0x00, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_octet_string_encoding() {
        assert_eq!(
            DataObject::OctetString(vec![1, 2, 3]).to_bytes(),
            vec![0x09, 0x03, 0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn test_structure_encoding() {
        let value = DataObject::Structure(vec![
            DataObject::Unsigned(7),
            DataObject::OctetString(vec![0xAB]),
        ]);
        assert_eq!(
            value.to_bytes(),
            vec![0x02, 0x02, 0x11, 0x07, 0x09, 0x01, 0xAB]
        );
    }

    #[test]
    fn test_empty_array_is_legal() {
        assert_eq!(DataObject::Array(vec![]).to_bytes(), vec![0x01, 0x00]);
    }
}
