use std::collections::BTreeMap;

use cosem_core::datatypes::{
    decode_variable_integer, CosemDateTime, DataObject, DataTag,
};
use cosem_core::error::{DlmsError, DlmsResult};

use super::conf::{AxdrValue, ConfAttribute, ConfElement, EncodingConf, FieldLength};

/// Default nesting depth budget for self-describing values
///
/// Bounds recursion through arrays and structures so hostile input cannot
/// blow the stack.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Cursor-based A-XDR decoder
///
/// Decodes either a single self-describing value
/// ([`AxdrDecoder::decode_data_object`]) or a whole buffer according to an
/// [`EncodingConf`].
pub struct AxdrDecoder<'a> {
    buffer: &'a [u8],
    position: usize,
    max_depth: usize,
}

impl<'a> AxdrDecoder<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(buffer: &'a [u8], max_depth: usize) -> Self {
        Self {
            buffer,
            position: 0,
            max_depth,
        }
    }

    pub fn buffer_empty(&self) -> bool {
        self.position >= self.buffer.len()
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.buffer[self.position..]
    }

    fn get_bytes(&mut self, length: usize) -> DlmsResult<&'a [u8]> {
        let available = self.buffer.len() - self.position;
        if length > available {
            return Err(DlmsError::insufficient(length, available));
        }
        let part = &self.buffer[self.position..self.position + length];
        self.position += length;
        Ok(part)
    }

    fn get_byte(&mut self) -> DlmsResult<u8> {
        Ok(self.get_bytes(1)?[0])
    }

    /// Read an A-XDR length prefix at the cursor
    pub fn get_length(&mut self) -> DlmsResult<usize> {
        let (length, rest) = decode_variable_integer(self.remaining())?;
        self.position = self.buffer.len() - rest.len();
        Ok(length)
    }

    /// Decode one self-describing data value at the cursor
    pub fn decode_data_object(&mut self) -> DlmsResult<DataObject> {
        self.decode_data_at_depth(0)
    }

    fn decode_data_at_depth(&mut self, depth: usize) -> DlmsResult<DataObject> {
        if depth > self.max_depth {
            return Err(DlmsError::InvalidData(format!(
                "data nesting exceeds maximum depth of {}",
                self.max_depth
            )));
        }

        let tag = DataTag::from_u8(self.get_byte()?)?;
        match tag {
            DataTag::NullData => Ok(DataObject::Null),
            DataTag::Boolean => Ok(DataObject::Boolean(self.get_byte()? != 0)),
            DataTag::Integer => Ok(DataObject::Integer(self.get_byte()? as i8)),
            DataTag::Unsigned => Ok(DataObject::Unsigned(self.get_byte()?)),
            DataTag::Long => {
                let raw = self.get_bytes(2)?;
                Ok(DataObject::Long(i16::from_be_bytes([raw[0], raw[1]])))
            }
            DataTag::LongUnsigned => {
                let raw = self.get_bytes(2)?;
                Ok(DataObject::LongUnsigned(u16::from_be_bytes([
                    raw[0], raw[1],
                ])))
            }
            DataTag::DoubleLong => {
                let raw = self.get_bytes(4)?;
                Ok(DataObject::DoubleLong(i32::from_be_bytes([
                    raw[0], raw[1], raw[2], raw[3],
                ])))
            }
            DataTag::DoubleLongUnsigned => {
                let raw = self.get_bytes(4)?;
                Ok(DataObject::DoubleLongUnsigned(u32::from_be_bytes([
                    raw[0], raw[1], raw[2], raw[3],
                ])))
            }
            DataTag::OctetString => {
                let length = self.get_length()?;
                Ok(DataObject::OctetString(self.get_bytes(length)?.to_vec()))
            }
            DataTag::VisibleString => {
                let length = self.get_length()?;
                let raw = self.get_bytes(length)?;
                let text = String::from_utf8(raw.to_vec())
                    .map_err(|_| DlmsError::InvalidData("visible-string is not ASCII".into()))?;
                Ok(DataObject::VisibleString(text))
            }
            DataTag::DateTime => {
                let raw = self.get_bytes(CosemDateTime::LENGTH)?;
                Ok(DataObject::DateTime(CosemDateTime::from_bytes(raw)?))
            }
            DataTag::Array => {
                let items = self.decode_elements(depth)?;
                Ok(DataObject::Array(items))
            }
            DataTag::Structure => {
                let items = self.decode_elements(depth)?;
                Ok(DataObject::Structure(items))
            }
        }
    }

    fn decode_elements(&mut self, depth: usize) -> DlmsResult<Vec<DataObject>> {
        let count = self.get_length()?;
        let mut items = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            items.push(self.decode_data_at_depth(depth + 1)?);
        }
        Ok(items)
    }

    /// Decode the whole buffer according to an encoding configuration
    ///
    /// Returns the named results. Optional attributes that are absent map
    /// to [`AxdrValue::Absent`].
    pub fn decode(&mut self, conf: &EncodingConf) -> DlmsResult<BTreeMap<&'static str, AxdrValue>> {
        let mut result = BTreeMap::new();
        let count = conf.elements.len();
        for (index, element) in conf.elements.iter().enumerate() {
            let is_last = index == count - 1;
            self.decode_single(element, is_last, &mut result)?;
        }
        Ok(result)
    }

    fn decode_single(
        &mut self,
        element: &ConfElement,
        is_last: bool,
        result: &mut BTreeMap<&'static str, AxdrValue>,
    ) -> DlmsResult<()> {
        match element {
            ConfElement::Attribute(attribute) => {
                let value = self.decode_attribute(attribute, is_last)?;
                result.insert(attribute.name, value);
            }
            ConfElement::Sequence { name } => {
                let value = self.decode_sequence()?;
                result.insert(name, value);
            }
            ConfElement::Choice(choices) => {
                let discriminator = self.get_byte()?;
                let chosen = choices
                    .iter()
                    .find(|(byte, _)| *byte == discriminator)
                    .map(|(_, element)| element)
                    .ok_or(DlmsError::UnknownEnumValue {
                        kind: "encoding choice",
                        value: discriminator,
                    })?;
                self.decode_single(chosen, is_last, result)?;
            }
        }
        Ok(())
    }

    fn decode_attribute(
        &mut self,
        attribute: &ConfAttribute,
        is_last: bool,
    ) -> DlmsResult<AxdrValue> {
        if attribute.optional {
            let indicator = self.get_byte()?;
            if indicator == 0x00 {
                return Ok(AxdrValue::Absent);
            }
        }

        if let Some(default) = &attribute.default {
            let indicator = self.get_byte()?;
            if indicator == 0x00 {
                return Ok(default.clone());
            }
        }

        match attribute.length {
            FieldLength::Fixed(length) => {
                let data = self.get_bytes(length)?;
                (attribute.construct)(data)
            }
            FieldLength::Variable if is_last => {
                // Terminal variable attribute consumes the rest of the buffer
                let data = self.remaining();
                self.position = self.buffer.len();
                (attribute.construct)(data)
            }
            FieldLength::Variable => {
                let length = self.get_length()?;
                let data = self.get_bytes(length)?;
                (attribute.construct)(data)
            }
        }
    }

    fn decode_sequence(&mut self) -> DlmsResult<AxdrValue> {
        let mut parsed = Vec::new();
        while !self.buffer_empty() {
            parsed.push(self.decode_data_object()?);
        }
        // One-element lists are unwrapped as a convenience
        match parsed.pop() {
            Some(only) if parsed.is_empty() => Ok(AxdrValue::Data(only)),
            Some(last) => {
                parsed.push(last);
                Ok(AxdrValue::DataList(parsed))
            }
            None => Ok(AxdrValue::DataList(parsed)),
        }
    }
}

/// Decode a buffer holding exactly one self-describing data value
pub fn decode_data(buffer: &[u8]) -> DlmsResult<DataObject> {
    let mut decoder = AxdrDecoder::new(buffer);
    let value = decoder.decode_data_object()?;
    if !decoder.buffer_empty() {
        return Err(DlmsError::LengthMismatch {
            declared: buffer.len() - decoder.remaining().len(),
            actual: buffer.len(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosem_core::datatypes::DataObject;

    fn round_trip(value: DataObject) {
        let encoded = value.to_bytes();
        let decoded = decode_data(&encoded).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn test_primitive_round_trips() {
        round_trip(DataObject::Null);
        round_trip(DataObject::Boolean(true));
        round_trip(DataObject::Integer(-5));
        round_trip(DataObject::Long(-1234));
        round_trip(DataObject::DoubleLong(-123456));
        round_trip(DataObject::Unsigned(200));
        round_trip(DataObject::LongUnsigned(54321));
        round_trip(DataObject::DoubleLongUnsigned(4_000_000_000));
        round_trip(DataObject::OctetString(vec![0, 1, 2, 3, 4, 5]));
        round_trip(DataObject::VisibleString("abc123".into()));
    }

    #[test]
    fn test_container_round_trips() {
        round_trip(DataObject::Array(vec![
            DataObject::LongUnsigned(1),
            DataObject::LongUnsigned(2),
        ]));
        round_trip(DataObject::Structure(vec![
            DataObject::Unsigned(3),
            DataObject::OctetString(vec![1, 0, 1, 8, 0, 255]),
            DataObject::Array(vec![]),
        ]));
    }

    #[test]
    fn test_empty_array() {
        let decoded = decode_data(&[0x01, 0x00]).unwrap();
        assert_eq!(decoded, DataObject::Array(vec![]));
    }

    #[test]
    fn test_depth_budget() {
        // 40 nested one-element structures, deeper than the default budget
        let mut encoded = Vec::new();
        for _ in 0..40 {
            encoded.extend_from_slice(&[0x02, 0x01]);
        }
        encoded.push(0x00);
        assert!(decode_data(&encoded).is_err());

        let mut deep = AxdrDecoder::with_max_depth(&encoded, 64);
        assert!(deep.decode_data_object().is_ok());
    }

    #[test]
    fn test_conf_fixed_and_variable() {
        let conf = EncodingConf::new(vec![
            ConfElement::Attribute(ConfAttribute::fixed("version", 1, AxdrValue::u8_from)),
            ConfElement::Attribute(ConfAttribute::fixed("pdu_size", 2, AxdrValue::u16_from)),
            ConfElement::Attribute(ConfAttribute::variable("tail", AxdrValue::bytes_from)),
        ]);
        let mut decoder = AxdrDecoder::new(&[0x06, 0x01, 0xF4, 0xAA, 0xBB]);
        let result = decoder.decode(&conf).unwrap();
        assert_eq!(result["version"], AxdrValue::U8(6));
        assert_eq!(result["pdu_size"], AxdrValue::U16(500));
        // terminal variable attribute takes the rest of the buffer
        assert_eq!(result["tail"], AxdrValue::Bytes(vec![0xAA, 0xBB]));
    }

    #[test]
    fn test_conf_optional_and_default() {
        let conf = EncodingConf::new(vec![
            ConfElement::Attribute(
                ConfAttribute::variable("key", AxdrValue::bytes_from).optional(),
            ),
            ConfElement::Attribute(
                ConfAttribute::fixed("allowed", 1, AxdrValue::bool_from)
                    .with_default(AxdrValue::Bool(true)),
            ),
        ]);

        let mut decoder = AxdrDecoder::new(&[0x00, 0x00]);
        let result = decoder.decode(&conf).unwrap();
        assert_eq!(result["key"], AxdrValue::Absent);
        assert_eq!(result["allowed"], AxdrValue::Bool(true));

        let mut decoder = AxdrDecoder::new(&[0x01, 0x02, 0xCA, 0xFE, 0x01, 0x00]);
        let result = decoder.decode(&conf).unwrap();
        assert_eq!(result["key"], AxdrValue::Bytes(vec![0xCA, 0xFE]));
        assert_eq!(result["allowed"], AxdrValue::Bool(false));
    }

    #[test]
    fn test_conf_choice() {
        let conf = EncodingConf::new(vec![ConfElement::Choice(vec![
            (0x00, ConfElement::Sequence { name: "data" }),
            (
                0x01,
                ConfElement::Attribute(ConfAttribute::fixed("error", 1, AxdrValue::u8_from)),
            ),
        ])]);

        let mut decoder = AxdrDecoder::new(&[0x00, 0x12, 0x00, 0x2A]);
        let result = decoder.decode(&conf).unwrap();
        assert_eq!(result["data"], AxdrValue::Data(DataObject::LongUnsigned(42)));

        let mut decoder = AxdrDecoder::new(&[0x01, 0x0B]);
        let result = decoder.decode(&conf).unwrap();
        assert_eq!(result["error"], AxdrValue::U8(11));

        let mut decoder = AxdrDecoder::new(&[0x07, 0x00]);
        assert!(decoder.decode(&conf).is_err());
    }

    #[test]
    fn test_sequence_collects_until_buffer_end() {
        let conf = EncodingConf::new(vec![ConfElement::Sequence { name: "body" }]);
        let mut decoder = AxdrDecoder::new(&[0x11, 0x01, 0x11, 0x02]);
        let result = decoder.decode(&conf).unwrap();
        assert_eq!(
            result["body"],
            AxdrValue::DataList(vec![DataObject::Unsigned(1), DataObject::Unsigned(2)])
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        assert!(decode_data(&[0x03, 0x01, 0xFF]).is_err());
    }
}
