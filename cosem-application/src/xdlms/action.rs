//! ACTION service APDUs, normal variant only
//!
//! The three response shapes share tag and type byte; they are told apart
//! by the has-data flag and the choice byte that follows it.

use cosem_core::error::{DlmsError, DlmsResult};

use crate::cosem::CosemMethodDescriptor;
use crate::enums::{ActionResultStatus, ActionType, DataAccessResult};

use super::invoke_id::InvokeIdAndPriority;

pub const ACTION_REQUEST_TAG: u8 = 0xC3;
pub const ACTION_RESPONSE_TAG: u8 = 0xC7;

fn check_header(data: &[u8], tag: u8, what: &'static str) -> DlmsResult<()> {
    if data.len() < 3 {
        return Err(DlmsError::insufficient(3, data.len()));
    }
    if data[0] != tag {
        return Err(DlmsError::UnexpectedTag {
            got: data[0],
            expected: tag,
        });
    }
    if data[1] != ActionType::Normal as u8 {
        return Err(DlmsError::InvalidData(format!(
            "action type {} is not valid for {}",
            data[1], what
        )));
    }
    Ok(())
}

/// Invokes one method, optionally with invocation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequestNormal {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub cosem_method: CosemMethodDescriptor,
    pub data: Option<Vec<u8>>,
}

impl ActionRequestNormal {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        cosem_method: CosemMethodDescriptor,
        data: Option<Vec<u8>>,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            cosem_method,
            data,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(data, ACTION_REQUEST_TAG, "ActionRequestNormal")?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;

        let rest = &data[3..];
        if rest.len() < CosemMethodDescriptor::LENGTH {
            return Err(DlmsError::insufficient(
                CosemMethodDescriptor::LENGTH,
                rest.len(),
            ));
        }
        let cosem_method =
            CosemMethodDescriptor::from_bytes(&rest[..CosemMethodDescriptor::LENGTH])?;
        let rest = &rest[CosemMethodDescriptor::LENGTH..];

        let invocation_data = match rest.first() {
            None | Some(0) => None,
            Some(_) => Some(rest[1..].to_vec()),
        };

        Ok(Self {
            invoke_id_and_priority,
            cosem_method,
            data: invocation_data,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            ACTION_REQUEST_TAG,
            ActionType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
        ];
        out.extend_from_slice(&self.cosem_method.to_bytes());
        match &self.data {
            Some(data) if !data.is_empty() => {
                out.push(0x01);
                out.extend_from_slice(data);
            }
            _ => out.push(0x00),
        }
        out
    }
}

/// Response without a return value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionResponseNormal {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub status: ActionResultStatus,
}

impl ActionResponseNormal {
    pub fn new(invoke_id_and_priority: InvokeIdAndPriority, status: ActionResultStatus) -> Self {
        Self {
            invoke_id_and_priority,
            status,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(data, ACTION_RESPONSE_TAG, "ActionResponseNormal")?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 5 {
            return Err(DlmsError::insufficient(5, data.len()));
        }
        let status = ActionResultStatus::from_u8(data[3])?;
        if data[4] != 0 {
            return Err(DlmsError::InvalidData(
                "action response carries data and is not an ActionResponseNormal".into(),
            ));
        }
        Ok(Self {
            invoke_id_and_priority,
            status,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        vec![
            ACTION_RESPONSE_TAG,
            ActionType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
            self.status.to_u8(),
            0x00,
        ]
    }
}

/// Response carrying a return value as raw A-XDR bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponseNormalWithData {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub status: ActionResultStatus,
    pub data: Vec<u8>,
}

impl ActionResponseNormalWithData {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        status: ActionResultStatus,
        data: Vec<u8>,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            status,
            data,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(data, ACTION_RESPONSE_TAG, "ActionResponseNormalWithData")?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 6 {
            return Err(DlmsError::insufficient(6, data.len()));
        }
        let status = ActionResultStatus::from_u8(data[3])?;
        if data[4] == 0 {
            return Err(DlmsError::InvalidData(
                "action response has no data and is not an ActionResponseNormalWithData".into(),
            ));
        }
        if data[5] != 0 {
            return Err(DlmsError::InvalidData(format!(
                "action response choice is not 0 to indicate data but: {}",
                data[5]
            )));
        }
        Ok(Self {
            invoke_id_and_priority,
            status,
            data: data[6..].to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            ACTION_RESPONSE_TAG,
            ActionType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
            self.status.to_u8(),
            0x01,
            0x00,
        ];
        out.extend_from_slice(&self.data);
        out
    }
}

/// Response whose return payload is a data access error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionResponseNormalWithError {
    pub invoke_id_and_priority: InvokeIdAndPriority,
    pub status: ActionResultStatus,
    pub error: DataAccessResult,
}

impl ActionResponseNormalWithError {
    pub fn new(
        invoke_id_and_priority: InvokeIdAndPriority,
        status: ActionResultStatus,
        error: DataAccessResult,
    ) -> Self {
        Self {
            invoke_id_and_priority,
            status,
            error,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        check_header(data, ACTION_RESPONSE_TAG, "ActionResponseNormalWithError")?;
        let invoke_id_and_priority = InvokeIdAndPriority::from_byte(data[2])?;
        if data.len() < 7 {
            return Err(DlmsError::insufficient(7, data.len()));
        }
        let status = ActionResultStatus::from_u8(data[3])?;
        if data[4] == 0 {
            return Err(DlmsError::InvalidData(
                "action response has no data and is not an ActionResponseNormalWithError".into(),
            ));
        }
        if data[5] != 1 {
            return Err(DlmsError::InvalidData(format!(
                "action response choice is not 1 to indicate an error but: {}",
                data[5]
            )));
        }
        Ok(Self {
            invoke_id_and_priority,
            status,
            error: DataAccessResult::from_u8(data[6])?,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        vec![
            ACTION_RESPONSE_TAG,
            ActionType::Normal as u8,
            self.invoke_id_and_priority.to_byte(),
            self.status.to_u8(),
            0x01,
            0x01,
            self.error.to_u8(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::CosemInterface;
    use cosem_core::datatypes::DataObject;
    use cosem_core::obis_code::ObisCode;

    fn invoke() -> InvokeIdAndPriority {
        InvokeIdAndPriority::confirmed(1).unwrap()
    }

    fn reply_to_hls_method() -> CosemMethodDescriptor {
        CosemMethodDescriptor::new(
            CosemInterface::AssociationLn,
            ObisCode::from_string("0-0:40.0.0.255").unwrap(),
            1,
        )
    }

    #[test]
    fn test_action_request_round_trip() {
        let request = ActionRequestNormal::new(
            invoke(),
            reply_to_hls_method(),
            Some(DataObject::OctetString(vec![0xAA; 16]).to_bytes()),
        );
        let bytes = request.to_bytes();
        assert_eq!(&bytes[..3], &[0xC3, 0x01, 0x41]);
        assert_eq!(ActionRequestNormal::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_action_request_without_data() {
        let request = ActionRequestNormal::new(invoke(), reply_to_hls_method(), None);
        let bytes = request.to_bytes();
        assert_eq!(*bytes.last().unwrap(), 0x00);
        assert_eq!(ActionRequestNormal::from_bytes(&bytes).unwrap(), request);
    }

    #[test]
    fn test_action_response_normal_round_trip() {
        let response = ActionResponseNormal::new(invoke(), ActionResultStatus::Success);
        let bytes = response.to_bytes();
        assert_eq!(bytes, vec![0xC7, 0x01, 0x41, 0x00, 0x00]);
        assert_eq!(ActionResponseNormal::from_bytes(&bytes).unwrap(), response);
    }

    #[test]
    fn test_action_response_with_data_round_trip() {
        let response = ActionResponseNormalWithData::new(
            invoke(),
            ActionResultStatus::Success,
            DataObject::OctetString(vec![0x42; 8]).to_bytes(),
        );
        let bytes = response.to_bytes();
        assert_eq!(&bytes[3..6], &[0x00, 0x01, 0x00]);
        assert_eq!(
            ActionResponseNormalWithData::from_bytes(&bytes).unwrap(),
            response
        );
    }

    #[test]
    fn test_action_response_with_error_round_trip() {
        let response = ActionResponseNormalWithError::new(
            invoke(),
            ActionResultStatus::OtherReason,
            DataAccessResult::ScopeOfAccessViolated,
        );
        let bytes = response.to_bytes();
        assert_eq!(bytes, vec![0xC7, 0x01, 0x41, 0xFA, 0x01, 0x01, 0x0D]);
        assert_eq!(
            ActionResponseNormalWithError::from_bytes(&bytes).unwrap(),
            response
        );
    }

    #[test]
    fn test_response_shape_mismatches_rejected() {
        let with_data = ActionResponseNormalWithData::new(
            invoke(),
            ActionResultStatus::Success,
            vec![0x09, 0x00],
        );
        assert!(ActionResponseNormal::from_bytes(&with_data.to_bytes()).is_err());

        let plain = ActionResponseNormal::new(invoke(), ActionResultStatus::Success);
        assert!(ActionResponseNormalWithData::from_bytes(&plain.to_bytes()).is_err());
    }
}
