//! GET service APDUs
//!
//! Requests carry tag 0xC0, responses tag 0xC4; a one-byte type
//! discriminator selects the concrete variant. Response data is kept as raw
//! A-XDR bytes so the caller decides when to decode it.

use cosem_core::error::{DlmsError, DlmsResult};

use crate::cosem::{CosemAttributeDescriptor, SelectiveAccessDescriptor};
use crate::enums::{DataAccessResult, GetRequestType, GetResponseType};

use super::invoke_id::InvokeIdAndPriority;

pub const GET_REQUEST_TAG: u8 = 0xC0;
pub const GET_RESPONSE_TAG: u8 = 0xC4;

fn check_header(data: &[u8], tag: u8, expected_type: u8, what: &'static str) -> DlmsResult<()> {
    if data.len() < 3 {
        return Err(DlmsError::insufficient(3, data.len()));
    }
    if data[0] != tag {
        return Err(DlmsError::UnexpectedTag {
            got: data[0],
            expected: tag,
        });
    }
    if data[1] != expected_type {
        return Err(DlmsError::InvalidData(format!(
            "type {} is not valid for {}",
            data[1], what
        )));
    }
    Ok(())
}

/// Reads one attribute, optionally with selective access
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequestNormal {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub cosem_attribute: CosemAttributeDescriptor,
    pub access_selection: Option<SelectiveAccessDescriptor>,
}

impl GetRequestNormal {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        cosem_attribute: CosemAttributeDescriptor,
        access_selection: Option<SelectiveAccessDescriptor>,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            cosem_attribute,
            access_selection,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(data, GET_REQUEST_TAG, GetRequestType::Normal as u8, "GetRequestNormal")?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;

        let rest = &data[3..];
        if rest.len() < CosemAttributeDescriptor::LENGTH {
            return Err(DlmsError::insufficient(
                CosemAttributeDescriptor::LENGTH,
                rest.len(),
            ));
        }
        let cosem_attribute =
            CosemAttributeDescriptor::from_bytes(&rest[..CosemAttributeDescriptor::LENGTH])?;
        let rest = &rest[CosemAttributeDescriptor::LENGTH..];

        let access_selection = parse_access_selection(rest)?.0;

        Ok(Self {
            invoke_id_and_priority,
            cosem_attribute,
            access_selection,
        })
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        let mut out = vec![
            GET_REQUEST_TAG,
            GetRequestType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
        ];
        out.extend_from_slice(&self.cosem_attribute.to_bytes());
        write_access_selection(&mut out, &self.access_selection)?;
        Ok(out)
    }
}

/// Acknowledges the most recent data block and asks for the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetRequestNext {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub block_number: u32,
}

impl GetRequestNext {
    pub fn new(invoke_id_and_priority: InvokeIdAndPriority, block_number: u32) -> Self {
        Self {
            invoke_id_and_priority,
            block_number,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(data, GET_REQUEST_TAG, GetRequestType::Next as u8, "GetRequestNext")?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 7 {
            return Err(DlmsError::insufficient(7, data.len()));
        }
        let block_number = u32::from_be_bytes([data[3], data[4], data[5], data[6]]);
        Ok(Self {
            invoke_id_and_priority,
            block_number,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            GET_REQUEST_TAG,
            GetRequestType::Next as u8,
            self.invoke_id_and_priority.to_byte(),
        ];
        out.extend_from_slice(&self.block_number.to_be_bytes());
        out
    }
}

/// Reads several attributes in one round trip
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequestWithList {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub attributes: Vec<CosemAttributeDescriptor>,
    pub access_selections: Vec<Option<SelectiveAccessDescriptor>>,
}

impl GetRequestWithList {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        attributes: Vec<CosemAttributeDescriptor>,
        access_selections: Vec<Option<SelectiveAccessDescriptor>>,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            attributes,
            access_selections,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(
            data,
            GET_REQUEST_TAG,
            GetRequestType::WithList as u8,
            "GetRequestWithList",
        )?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;

        let mut rest = &data[3..];
        let count = usize::from(
            *rest
                .first()
                .ok_or_else(|| DlmsError::insufficient(1, 0))?,
        );
        rest = &rest[1..];

        let mut attributes = Vec::with_capacity(count);
        let mut access_selections = Vec::with_capacity(count);
        for _ in 0..count {
            if rest.len() < CosemAttributeDescriptor::LENGTH {
                return Err(DlmsError::insufficient(
                    CosemAttributeDescriptor::LENGTH,
                    rest.len(),
                ));
            }
            attributes.push(CosemAttributeDescriptor::from_bytes(
                &rest[..CosemAttributeDescriptor::LENGTH],
            )?);
            rest = &rest[CosemAttributeDescriptor::LENGTH..];

            let (selection, consumed) = parse_access_selection(rest)?;
            access_selections.push(selection);
            rest = &rest[consumed..];
        }

        Ok(Self {
            invoke_id_and_priority,
            attributes,
            access_selections,
        })
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        let mut out = vec![
            GET_REQUEST_TAG,
            GetRequestType::WithList as u8,
            self.invoke_id_and_priority.to_byte(),
        ];
        out.push(self.attributes.len() as u8);
        for (index, attribute) in self.attributes.iter().enumerate() {
            out.extend_from_slice(&attribute.to_bytes());
            let selection = self.access_selections.get(index).cloned().flatten();
            write_access_selection(&mut out, &selection)?;
        }
        Ok(out)
    }
}

fn parse_access_selection(
    data: &[u8],
) -> DlmsResult<(Option<SelectiveAccessDescriptor>, usize)> {
    match data.first() {
        None | Some(0) => Ok((None, data.len().min(1))),
        Some(_) => {
            let (descriptor, consumed) = SelectiveAccessDescriptor::from_bytes(&data[1..])?;
            Ok((Some(descriptor), consumed + 1))
        }
    }
}

fn write_access_selection(
    out: &mut Vec<u8>,
    selection: &Option<SelectiveAccessDescriptor>,
) -> DlmsResult<()> {
    match selection {
        Some(descriptor) => {
            out.push(0x01);
            out.extend_from_slice(&descriptor.to_bytes()?);
        }
        None => out.push(0x00),
    }
    Ok(())
}

/// Successful response carrying the attribute value as raw A-XDR bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponseNormal {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub data: Vec<u8>,
}

impl GetResponseNormal {
    pub fn new(invoke_id_and_priority: InvokeIdAndPriority, data: Vec<u8>) -> Self {
        Self {
            invoke_id_and_priority,
            data,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(data, GET_RESPONSE_TAG, GetResponseType::Normal as u8, "GetResponseNormal")?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        let choice = *data
            .get(3)
            .ok_or_else(|| DlmsError::insufficient(4, data.len()))?;
        if choice != 0 {
            return Err(DlmsError::InvalidData(format!(
                "data choice is not 0 to indicate data but: {}",
                choice
            )));
        }
        Ok(Self {
            invoke_id_and_priority,
            data: data[4..].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            GET_RESPONSE_TAG,
            GetResponseType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
            0x00,
        ];
        out.extend_from_slice(&self.data);
        out
    }
}

/// Normal response whose body is a data access error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetResponseNormalWithError {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub error: DataAccessResult,
}

impl GetResponseNormalWithError {
    pub fn new(invoke_id_and_priority: InvokeIdAndPriority, error: DataAccessResult) -> Self {
        Self {
            invoke_id_and_priority,
            error,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(
            data,
            GET_RESPONSE_TAG,
            GetResponseType::Normal as u8,
            "GetResponseNormalWithError",
        )?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 5 {
            return Err(DlmsError::insufficient(5, data.len()));
        }
        if data[3] != 1 {
            return Err(DlmsError::InvalidData(format!(
                "data choice is not 1 to indicate an error but: {}",
                data[3]
            )));
        }
        Ok(Self {
            invoke_id_and_priority,
            error: DataAccessResult::from_u8(data[4])?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        vec![
            GET_RESPONSE_TAG,
            GetResponseType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
            0x01,
            self.error.to_u8(),
        ]
    }
}

/// One block of a long attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponseWithDataBlock {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub last_block: bool,
    pub block_number: u32,
    pub raw_data: Vec<u8>,
}

impl GetResponseWithDataBlock {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        last_block: bool,
        block_number: u32,
        raw_data: Vec<u8>,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            last_block,
            block_number,
            raw_data,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(
            data,
            GET_RESPONSE_TAG,
            GetResponseType::WithBlock as u8,
            "GetResponseWithDataBlock",
        )?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 9 {
            return Err(DlmsError::insufficient(9, data.len()));
        }
        let last_block = data[3] != 0;
        let block_number = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        let raw_length = usize::from(data[8]);
        if data.len() < 9 + raw_length {
            return Err(DlmsError::insufficient(9 + raw_length, data.len()));
        }
        Ok(Self {
            invoke_id_and_priority,
            last_block,
            block_number,
            raw_data: data[9..9 + raw_length].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            GET_RESPONSE_TAG,
            GetResponseType::WithBlock as u8,
            self.invoke_id_and_priority.to_byte(),
            u8::from(self.last_block),
        ];
        out.extend_from_slice(&self.block_number.to_be_bytes());
        out.push(self.raw_data.len() as u8);
        out.extend_from_slice(&self.raw_data);
        out
    }
}

/// Final block of a long attribute value (type 4)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponseLastBlock {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub block_number: u32,
    pub raw_data: Vec<u8>,
}

impl GetResponseLastBlock {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        block_number: u32,
        raw_data: Vec<u8>,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            block_number,
            raw_data,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(
            data,
            GET_RESPONSE_TAG,
            GetResponseType::LastBlock as u8,
            "GetResponseLastBlock",
        )?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 8 {
            return Err(DlmsError::insufficient(8, data.len()));
        }
        let block_number = u32::from_be_bytes([data[3], data[4], data[5], data[6]]);
        let raw_length = usize::from(data[7]);
        if data.len() < 8 + raw_length {
            return Err(DlmsError::insufficient(8 + raw_length, data.len()));
        }
        Ok(Self {
            invoke_id_and_priority,
            block_number,
            raw_data: data[8..8 + raw_length].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            GET_RESPONSE_TAG,
            GetResponseType::LastBlock as u8,
            self.invoke_id_and_priority.to_byte(),
        ];
        out.extend_from_slice(&self.block_number.to_be_bytes());
        out.push(self.raw_data.len() as u8);
        out.extend_from_slice(&self.raw_data);
        out
    }
}

/// Final block signalling an error (type 5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetResponseLastBlockWithError {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub block_number: u32,
    pub error: DataAccessResult,
}

impl GetResponseLastBlockWithError {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        block_number: u32,
        error: DataAccessResult,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            block_number,
            error,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(
            data,
            GET_RESPONSE_TAG,
            GetResponseType::LastBlockWithError as u8,
            "GetResponseLastBlockWithError",
        )?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 8 {
            return Err(DlmsError::insufficient(8, data.len()));
        }
        let block_number = u32::from_be_bytes([data[3], data[4], data[5], data[6]]);
        Ok(Self {
            invoke_id_and_priority,
            block_number,
            error: DataAccessResult::from_u8(data[7])?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            GET_RESPONSE_TAG,
            GetResponseType::LastBlockWithError as u8,
            self.invoke_id_and_priority.to_byte(),
        ];
        out.extend_from_slice(&self.block_number.to_be_bytes());
        out.push(self.error.to_u8());
        out
    }
}

/// With-list response; the codec is a known gap pending full support of
/// multi-reference responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResponseWithList {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub results: Vec<Vec<u8>>,
}

impl GetResponseWithList {
    pub fn new(invoke_id_and_priority: InvokeIdAndPriority, results: Vec<Vec<u8>>) -> Self {
        Self {
            invoke_id_and_priority,
            results,
        }
    }

    pub fn from_bytes(_data: &[u8]) -> DlmsResult<Self> {
        Err(DlmsError::InvalidData(
            "GetResponseWithList decoding is not implemented".into(),
        ))
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        Err(DlmsError::InvalidData(
            "GetResponseWithList encoding is not implemented".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosem::EntryDescriptor;
    use crate::enums::CosemInterface;
    use cosem_core::obis_code::ObisCode;

    fn invoke(id: u8) -> InvokeIdAndPriority {
        InvokeIdAndPriority::confirmed(id).unwrap()
    }

    fn energy_attribute() -> CosemAttributeDescriptor {
        CosemAttributeDescriptor::new(
            CosemInterface::Register,
            ObisCode::from_string("1-0:1.8.0.255").unwrap(),
            2,
        )
    }

    #[test]
    fn test_get_request_normal_wire_format() {
        let request = GetRequestNormal::new(invoke(1), energy_attribute(), None);
        assert_eq!(
            request.to_bytes().unwrap(),
            vec![0xC0, 0x01, 0x41, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x02, 0x00]
        );
    }

    #[test]
    fn test_get_request_normal_round_trip() {
        let request = GetRequestNormal::new(
            invoke(2),
            energy_attribute(),
            Some(SelectiveAccessDescriptor::Entry(EntryDescriptor::new(
                1, 0, 1, 0,
            ))),
        );
        let parsed = GetRequestNormal::from_bytes(&request.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_get_request_next_round_trip() {
        let request = GetRequestNext::new(invoke(3), 7);
        let bytes = request.to_bytes();
        assert_eq!(&bytes[..3], &[0xC0, 0x02, 0x43]);
        assert_eq!(GetRequestNext::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_get_request_with_list_round_trip() {
        let other = CosemAttributeDescriptor::new(
            CosemInterface::Clock,
            ObisCode::from_string("0-0:1.0.0.255").unwrap(),
            2,
        );
        let request = GetRequestWithList::new(
            invoke(4),
            vec![energy_attribute(), other],
            vec![
                None,
                Some(SelectiveAccessDescriptor::Entry(EntryDescriptor::new(
                    1, 5, 1, 0,
                ))),
            ],
        );
        let parsed = GetRequestWithList::from_bytes(&request.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_get_response_normal_round_trip() {
        let response = GetResponseNormal::new(invoke(1), vec![0x12, 0x00, 0x2A]);
        let bytes = response.to_bytes();
        assert_eq!(&bytes[..4], &[0xC4, 0x01, 0x41, 0x00]);
        assert_eq!(GetResponseNormal::from_bytes(&bytes).unwrap(), response);
    }

    #[test]
    fn test_get_response_with_error_round_trip() {
        let response =
            GetResponseNormalWithError::new(invoke(1), DataAccessResult::ObjectUnavailable);
        let bytes = response.to_bytes();
        assert_eq!(bytes, vec![0xC4, 0x01, 0x41, 0x01, 0x0B]);
        assert_eq!(
            GetResponseNormalWithError::from_bytes(&bytes).unwrap(),
            response
        );
    }

    #[test]
    fn test_get_response_data_block_round_trip() {
        let response =
            GetResponseWithDataBlock::new(invoke(1), false, 1, vec![0xAB; 253]);
        let bytes = response.to_bytes();
        assert_eq!(&bytes[..3], &[0xC4, 0x02, 0x41]);
        assert_eq!(bytes[3], 0x00);
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(bytes[8], 0xFD);
        assert_eq!(
            GetResponseWithDataBlock::from_bytes(&bytes).unwrap(),
            response
        );
    }

    #[test]
    fn test_get_response_last_block_round_trip() {
        let response = GetResponseLastBlock::new(invoke(1), 3, vec![1, 2, 3]);
        assert_eq!(
            GetResponseLastBlock::from_bytes(&response.to_bytes()).unwrap(),
            response
        );

        let with_error = GetResponseLastBlockWithError::new(
            invoke(1),
            3,
            DataAccessResult::DataBlockUnavailable,
        );
        assert_eq!(
            GetResponseLastBlockWithError::from_bytes(&with_error.to_bytes()).unwrap(),
            with_error
        );
    }

    #[test]
    fn test_get_response_with_list_is_a_gap() {
        let response = GetResponseWithList::new(invoke(1), vec![]);
        assert!(response.to_bytes().is_err());
        assert!(GetResponseWithList::from_bytes(&[0xC4, 0x03]).is_err());
    }

    #[test]
    fn test_wrong_tag_rejected() {
        assert!(matches!(
            GetRequestNormal::from_bytes(&[0xC1, 0x01, 0x41]),
            Err(DlmsError::UnexpectedTag { .. })
        ));
    }
}
