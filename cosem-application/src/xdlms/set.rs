//! SET service APDUs, normal variant only

use cosem_core::error::{DlmsError, DlmsResult};

use crate::cosem::{CosemAttributeDescriptor, SelectiveAccessDescriptor};
use crate::enums::{DataAccessResult, SetRequestType, SetResponseType};

use super::invoke_id::InvokeIdAndPriority;

pub const SET_REQUEST_TAG: u8 = 0xC1;
pub const SET_RESPONSE_TAG: u8 = 0xC5;

/// Writes one attribute; the value trails as raw A-XDR bytes
///
/// ```text
/// Set-Request-Normal ::= SEQUENCE {
///     invoke-id-and-priority      Invoke-Id-And-Priority,
///     cosem-attribute-descriptor  Cosem-Attribute-Descriptor,
///     access-selection            Selective-Access-Descriptor OPTIONAL,
///     value                       Data
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SetRequestNormal {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub cosem_attribute: CosemAttributeDescriptor,
    pub access_selection: Option<SelectiveAccessDescriptor>,
    pub data: Vec<u8>,
}

impl SetRequestNormal {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        cosem_attribute: CosemAttributeDescriptor,
        access_selection: Option<SelectiveAccessDescriptor>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            cosem_attribute,
            access_selection,
            data,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < 3 {
            return Err(DlmsError::insufficient(3, data.len()));
        }
        if data[0] != SET_REQUEST_TAG {
            return Err(DlmsError::UnexpectedTag {
                got: data[0],
                expected: SET_REQUEST_TAG,
            });
        }
        if data[1] != SetRequestType::Normal as u8 {
            return Err(DlmsError::InvalidData(format!(
                "type {} is not valid for SetRequestNormal",
                data[1]
            )));
        }
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
        let mut rest = &rest[CosemAttributeDescriptor::LENGTH..];

        let access_selection = match rest.first() {
            None => None,
            Some(0) => {
                rest = &rest[1..];
                None
            }
            Some(_) => {
                let (descriptor, consumed) = SelectiveAccessDescriptor::from_bytes(&rest[1..])?;
                rest = &rest[1 + consumed..];
                Some(descriptor)
            }
        };

        Ok(Self {
            invoke_id_and_priority,
            cosem_attribute,
            access_selection,
            data: rest.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        let mut out = vec![
            SET_REQUEST_TAG,
            SetRequestType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
        ];
        out.extend_from_slice(&self.cosem_attribute.to_bytes());
        match &self.access_selection {
            Some(descriptor) => {
                out.push(0x01);
                out.extend_from_slice(&descriptor.to_bytes()?);
            }
            None => out.push(0x00),
        }
        out.extend_from_slice(&self.data);
        Ok(out)
    }
}

/// Result of a normal SET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetResponseNormal {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub result: DataAccessResult,
}

impl SetResponseNormal {
    pub fn new(invoke_id_and_priority: InvokeIdAndPriority, result: DataAccessResult) -> Self {
        Self {
            invoke_id_and_priority,
            result,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < 4 {
            return Err(DlmsError::insufficient(4, data.len()));
        }
        if data[0] != SET_RESPONSE_TAG {
            return Err(DlmsError::UnexpectedTag {
                got: data[0],
                expected: SET_RESPONSE_TAG,
            });
        }
        if data[1] != SetResponseType::Normal as u8 {
            return Err(DlmsError::InvalidData(format!(
                "type {} is not valid for SetResponseNormal",
                data[1]
            )));
        }
        Ok(Self {
            invoke_id_and_priority: InvokeIdAndPriority::from_byte(data[2])?,
            result: DataAccessResult::from_u8(data[3])?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        vec![
            SET_RESPONSE_TAG,
            SetResponseType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
            self.result.to_u8(),
        ]
    }
}
