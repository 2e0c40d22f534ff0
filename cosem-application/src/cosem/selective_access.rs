//! Selective-access descriptors
//!
//! Range descriptors limit a profile buffer read by time window, entry
//! descriptors by entry index. Both are encoded as a leading type byte
//! followed by an A-XDR structure of four elements.

use cosem_core::datatypes::CosemDateTime;
use cosem_core::error::{DlmsError, DlmsResult};
use cosem_core::obis_code::ObisCode;

use crate::enums::CosemInterface;

use super::CosemAttributeDescriptor;

const RANGE_DESCRIPTOR: u8 = 1;
const ENTRY_DESCRIPTOR: u8 = 2;

/// A value captured in a profile buffer
///
/// A `data_index` of 0 references the whole attribute; any other value
/// points to one element of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureObject {
    pub attribute: CosemAttributeDescriptor,
    pub data_index: u16,
}

impl CaptureObject {
    pub fn new(attribute: CosemAttributeDescriptor, data_index: u16) -> Self {
        Self {
            attribute,
            data_index,
        }
    }

    /// Encode as a structure of four elements: interface (long-unsigned),
    /// instance (octet-string of 6), attribute (integer), data-index
    /// (long-unsigned)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0x02, 0x04];
        out.extend_from_slice(&[0x11, 0x02]);
        out.extend_from_slice(&self.attribute.interface.to_u16().to_be_bytes());
        out.extend_from_slice(&[0x09, 0x06]);
        out.extend_from_slice(self.attribute.instance.as_bytes());
        out.extend_from_slice(&[0x0F, 0x01, self.attribute.attribute]);
        out.extend_from_slice(&[0x12, 0x02]);
        out.extend_from_slice(&self.data_index.to_be_bytes());
        out
    }

    /// Parse at the head of `source`, returning the object and the number
    /// of bytes consumed.
    pub fn from_bytes(source: &[u8]) -> DlmsResult<(Self, usize)> {
        expect_bytes(source, 0, &[0x02, 0x04], "capture-object structure")?;
        expect_bytes(source, 2, &[0x11, 0x02], "capture-object interface")?;
        let interface =
            CosemInterface::from_u16(u16::from_be_bytes([at(source, 4)?, at(source, 5)?]))?;
        expect_bytes(source, 6, &[0x09, 0x06], "capture-object instance")?;
        if source.len() < 14 {
            return Err(DlmsError::insufficient(14, source.len()));
        }
        let instance = ObisCode::from_bytes(&source[8..14])?;
        expect_bytes(source, 14, &[0x0F, 0x01], "capture-object attribute")?;
        let attribute = at(source, 16)?;
        expect_bytes(source, 17, &[0x12, 0x02], "capture-object data-index")?;
        let data_index = u16::from_be_bytes([at(source, 19)?, at(source, 20)?]);

        Ok((
            Self {
                attribute: CosemAttributeDescriptor::new(interface, instance, attribute),
                data_index,
            },
            21,
        ))
    }
}

/// Limits a profile-generic buffer read to a time window
///
/// An empty `selected_values` list means all columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeDescriptor {
    pub restricting_object: CaptureObject,
    pub from_value: CosemDateTime,
    pub to_value: CosemDateTime,
    pub selected_values: Vec<CaptureObject>,
}

impl RangeDescriptor {
    pub fn new(
        restricting_object: CaptureObject,
        from_value: CosemDateTime,
        to_value: CosemDateTime,
    ) -> Self {
        Self {
            restricting_object,
            from_value,
            to_value,
            selected_values: Vec::new(),
        }
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        if !self.selected_values.is_empty() {
            return Err(DlmsError::InvalidData(
                "column selection in range descriptors is not supported".into(),
            ));
        }

        let mut out = vec![RANGE_DESCRIPTOR, 0x02, 0x04];
        out.extend_from_slice(&self.restricting_object.to_bytes());

        for value in [&self.from_value, &self.to_value] {
            out.push(0x09);
            out.push(CosemDateTime::LENGTH as u8);
            out.extend_from_slice(&value.to_bytes());
        }

        // empty array selects all columns
        out.extend_from_slice(&[0x01, 0x00]);
        Ok(out)
    }

    pub fn from_bytes(source: &[u8]) -> DlmsResult<(Self, usize)> {
        if at(source, 0)? != RANGE_DESCRIPTOR {
            return Err(DlmsError::UnexpectedTag {
                got: source[0],
                expected: RANGE_DESCRIPTOR,
            });
        }
        expect_bytes(source, 1, &[0x02, 0x04], "range-descriptor structure")?;

        let mut offset = 3;
        let (restricting_object, consumed) = CaptureObject::from_bytes(&source[offset..])?;
        offset += consumed;

        let mut read_datetime = |offset: &mut usize| -> DlmsResult<CosemDateTime> {
            if at(source, *offset)? != 0x09 {
                return Err(DlmsError::UnexpectedTag {
                    got: source[*offset],
                    expected: 0x09,
                });
            }
            let length = usize::from(at(source, *offset + 1)?);
            let start = *offset + 2;
            if source.len() < start + length {
                return Err(DlmsError::insufficient(start + length, source.len()));
            }
            let value = CosemDateTime::from_bytes(&source[start..start + length])?;
            *offset = start + length;
            Ok(value)
        };

        let from_value = read_datetime(&mut offset)?;
        let to_value = read_datetime(&mut offset)?;

        // selected values array, when present
        if offset < source.len() && source[offset] == 0x01 {
            offset += 1;
            let count = usize::from(at(source, offset)?);
            offset += 1;
            if count > 0 {
                return Err(DlmsError::InvalidData(
                    "column selection in range descriptors is not supported".into(),
                ));
            }
        }

        Ok((
            Self {
                restricting_object,
                from_value,
                to_value,
                selected_values: Vec::new(),
            },
            offset,
        ))
    }
}

/// Limits a profile-generic buffer read by entry index
///
/// Entries and selected values are one-indexed; a `to_entry` or
/// `to_selected_value` of 0 requests the highest possible value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryDescriptor {
    pub from_entry: u32,
    pub to_entry: u32,
    pub from_selected_value: u16,
    pub to_selected_value: u16,
}

impl EntryDescriptor {
    pub const LENGTH: usize = 19;

    pub fn new(
        from_entry: u32,
        to_entry: u32,
        from_selected_value: u16,
        to_selected_value: u16,
    ) -> Self {
        Self {
            from_entry,
            to_entry,
            from_selected_value,
            to_selected_value,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![ENTRY_DESCRIPTOR, 0x02, 0x04];
        out.push(0x06);
        out.extend_from_slice(&self.from_entry.to_be_bytes());
        out.push(0x06);
        out.extend_from_slice(&self.to_entry.to_be_bytes());
        out.push(0x12);
        out.extend_from_slice(&self.from_selected_value.to_be_bytes());
        out.push(0x12);
        out.extend_from_slice(&self.to_selected_value.to_be_bytes());
        out
    }

    pub fn from_bytes(source: &[u8]) -> DlmsResult<(Self, usize)> {
        if source.len() < Self::LENGTH {
            return Err(DlmsError::insufficient(Self::LENGTH, source.len()));
        }
        if source[0] != ENTRY_DESCRIPTOR {
            return Err(DlmsError::UnexpectedTag {
                got: source[0],
                expected: ENTRY_DESCRIPTOR,
            });
        }
        expect_bytes(source, 1, &[0x02, 0x04], "entry-descriptor structure")?;
        expect_tag(source, 3, 0x06, "from-entry")?;
        let from_entry = u32::from_be_bytes([source[4], source[5], source[6], source[7]]);
        expect_tag(source, 8, 0x06, "to-entry")?;
        let to_entry = u32::from_be_bytes([source[9], source[10], source[11], source[12]]);
        expect_tag(source, 13, 0x12, "from-selected-value")?;
        let from_selected_value = u16::from_be_bytes([source[14], source[15]]);
        expect_tag(source, 16, 0x12, "to-selected-value")?;
        let to_selected_value = u16::from_be_bytes([source[17], source[18]]);

        Ok((
            Self {
                from_entry,
                to_entry,
                from_selected_value,
                to_selected_value,
            },
            Self::LENGTH,
        ))
    }
}

/// Selective access carried by GET and SET requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectiveAccessDescriptor {
    Range(RangeDescriptor),
    Entry(EntryDescriptor),
}

impl SelectiveAccessDescriptor {
    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        match self {
            SelectiveAccessDescriptor::Range(descriptor) => descriptor.to_bytes(),
            SelectiveAccessDescriptor::Entry(descriptor) => Ok(descriptor.to_bytes()),
        }
    }

    /// Parse a descriptor by its leading type byte, returning the
    /// descriptor and the number of bytes consumed.
    pub fn from_bytes(source: &[u8]) -> DlmsResult<(Self, usize)> {
        match source.first() {
            Some(&RANGE_DESCRIPTOR) => {
                let (descriptor, consumed) = RangeDescriptor::from_bytes(source)?;
                Ok((SelectiveAccessDescriptor::Range(descriptor), consumed))
            }
            Some(&ENTRY_DESCRIPTOR) => {
                let (descriptor, consumed) = EntryDescriptor::from_bytes(source)?;
                Ok((SelectiveAccessDescriptor::Entry(descriptor), consumed))
            }
            Some(&other) => Err(DlmsError::UnknownEnumValue {
                kind: "selective access descriptor",
                value: other,
            }),
            None => Err(DlmsError::insufficient(1, 0)),
        }
    }
}

fn at(source: &[u8], index: usize) -> DlmsResult<u8> {
    source
        .get(index)
        .copied()
        .ok_or_else(|| DlmsError::insufficient(index + 1, source.len()))
}

fn expect_tag(source: &[u8], index: usize, expected: u8, _what: &'static str) -> DlmsResult<()> {
    let got = at(source, index)?;
    if got != expected {
        return Err(DlmsError::UnexpectedTag { got, expected });
    }
    Ok(())
}

fn expect_bytes(
    source: &[u8],
    index: usize,
    expected: &[u8],
    what: &'static str,
) -> DlmsResult<()> {
    if source.len() < index + expected.len() {
        return Err(DlmsError::insufficient(index + expected.len(), source.len()));
    }
    if &source[index..index + expected.len()] != expected {
        return Err(DlmsError::InvalidData(format!(
            "malformed {}: expected {:02X?}, got {:02X?}",
            what,
            expected,
            &source[index..index + expected.len()]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosem_core::datatypes::{CosemDate, CosemDateTime, CosemTime};

    fn clock_capture() -> CaptureObject {
        CaptureObject::new(
            CosemAttributeDescriptor::new(
                CosemInterface::Clock,
                ObisCode::new(0, 0, 1, 0, 0, 255),
                2,
            ),
            0,
        )
    }

    fn datetime(hour: u8) -> CosemDateTime {
        CosemDateTime::new(CosemDate::new(2024, 5, 1), CosemTime::new(hour, 0, 0))
    }

    #[test]
    fn test_capture_object_round_trip() {
        let capture = clock_capture();
        let bytes = capture.to_bytes();
        assert_eq!(bytes.len(), 21);
        let (parsed, consumed) = CaptureObject::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, capture);
        assert_eq!(consumed, 21);
    }

    #[test]
    fn test_range_descriptor_round_trip() {
        let descriptor = RangeDescriptor::new(clock_capture(), datetime(0), datetime(23));
        let bytes = descriptor.to_bytes().unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..3], &[0x02, 0x04]);
        // trailing empty array means all columns
        assert_eq!(&bytes[bytes.len() - 2..], &[0x01, 0x00]);

        let (parsed, consumed) = RangeDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, descriptor);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn test_entry_descriptor_round_trip() {
        let descriptor = EntryDescriptor::new(1, 0, 1, 0);
        let bytes = descriptor.to_bytes();
        assert_eq!(bytes.len(), EntryDescriptor::LENGTH);
        assert_eq!(bytes[0], 2);
        let (parsed, consumed) = EntryDescriptor::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, descriptor);
        assert_eq!(consumed, EntryDescriptor::LENGTH);
    }

    #[test]
    fn test_factory_dispatch() {
        let entry = EntryDescriptor::new(5, 10, 1, 3);
        let (parsed, _) = SelectiveAccessDescriptor::from_bytes(&entry.to_bytes()).unwrap();
        assert_eq!(parsed, SelectiveAccessDescriptor::Entry(entry));

        assert!(SelectiveAccessDescriptor::from_bytes(&[9]).is_err());
        assert!(SelectiveAccessDescriptor::from_bytes(&[]).is_err());
    }

    #[test]
    fn test_column_selection_rejected() {
        let mut descriptor = RangeDescriptor::new(clock_capture(), datetime(0), datetime(23));
        descriptor.selected_values.push(clock_capture());
        assert!(descriptor.to_bytes().is_err());
    }
}
