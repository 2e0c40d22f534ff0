//! APDU factory
//!
//! Reverse parsing dispatched on the leading tag byte, with a secondary
//! dispatch on the type byte for the service families and a peek at the
//! choice byte for normal responses.

use cosem_core::error::{DlmsError, DlmsResult};

use crate::acse::{
    ApplicationAssociationRequest, ApplicationAssociationResponse, ReleaseRequest, ReleaseResponse,
};
use crate::xdlms::{
    ActionRequestNormal, ActionResponseNormal, ActionResponseNormalWithData,
    ActionResponseNormalWithError, DataNotification, ExceptionResponse,
    GetRequestNext, GetRequestNormal, GetRequestWithList, GetResponseLastBlock,
    GetResponseLastBlockWithError, GetResponseNormal, GetResponseNormalWithError,
    GetResponseWithDataBlock, GetResponseWithList, GlobalCipherInitiateRequest,
    GlobalCipherInitiateResponse, InitiateRequest, InitiateResponse, SetRequestNormal,
    SetResponseNormal,
};

/// Any APDU this stack understands
#[derive(Debug, Clone, PartialEq)]
pub enum Apdu {
    InitiateRequest(InitiateRequest),
    InitiateResponse(InitiateResponse),
    GlobalCipherInitiateRequest(GlobalCipherInitiateRequest),
    GlobalCipherInitiateResponse(GlobalCipherInitiateResponse),
    DataNotification(DataNotification),
    ExceptionResponse(ExceptionResponse),
    Aarq(ApplicationAssociationRequest),
    Aare(ApplicationAssociationResponse),
    Rlrq(ReleaseRequest),
    Rlre(ReleaseResponse),
    GetRequestNormal(GetRequestNormal),
    GetRequestNext(GetRequestNext),
    GetRequestWithList(GetRequestWithList),
    GetResponseNormal(GetResponseNormal),
    GetResponseNormalWithError(GetResponseNormalWithError),
    GetResponseWithDataBlock(GetResponseWithDataBlock),
    GetResponseWithList(GetResponseWithList),
    GetResponseLastBlock(GetResponseLastBlock),
    GetResponseLastBlockWithError(GetResponseLastBlockWithError),
    SetRequestNormal(SetRequestNormal),
    SetResponseNormal(SetResponseNormal),
    ActionRequestNormal(ActionRequestNormal),
    ActionResponseNormal(ActionResponseNormal),
    ActionResponseNormalWithData(ActionResponseNormalWithData),
    ActionResponseNormalWithError(ActionResponseNormalWithError),
}

impl Apdu {
    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        Ok(match self {
            Apdu::InitiateRequest(apdu) => apdu.to_bytes(),
            Apdu::InitiateResponse(apdu) => apdu.to_bytes(),
            Apdu::GlobalCipherInitiateRequest(apdu) => apdu.to_bytes(),
            Apdu::GlobalCipherInitiateResponse(apdu) => apdu.to_bytes(),
            Apdu::DataNotification(apdu) => apdu.to_bytes(),
            Apdu::ExceptionResponse(apdu) => apdu.to_bytes(),
            Apdu::Aarq(apdu) => apdu.to_bytes(),
            Apdu::Aare(apdu) => apdu.to_bytes(),
            Apdu::Rlrq(apdu) => apdu.to_bytes(),
            Apdu::Rlre(apdu) => apdu.to_bytes(),
            Apdu::GetRequestNormal(apdu) => apdu.to_bytes()?,
            Apdu::GetRequestNext(apdu) => apdu.to_bytes(),
            Apdu::GetRequestWithList(apdu) => apdu.to_bytes()?,
            Apdu::GetResponseNormal(apdu) => apdu.to_bytes(),
            Apdu::GetResponseNormalWithError(apdu) => apdu.to_bytes(),
            Apdu::GetResponseWithDataBlock(apdu) => apdu.to_bytes(),
            Apdu::GetResponseWithList(apdu) => apdu.to_bytes()?,
            Apdu::GetResponseLastBlock(apdu) => apdu.to_bytes(),
            Apdu::GetResponseLastBlockWithError(apdu) => apdu.to_bytes(),
            Apdu::SetRequestNormal(apdu) => apdu.to_bytes()?,
            Apdu::SetResponseNormal(apdu) => apdu.to_bytes(),
            Apdu::ActionRequestNormal(apdu) => apdu.to_bytes(),
            Apdu::ActionResponseNormal(apdu) => apdu.to_bytes(),
            Apdu::ActionResponseNormalWithData(apdu) => apdu.to_bytes(),
            Apdu::ActionResponseNormalWithError(apdu) => apdu.to_bytes(),
        })
    }
}

/// Parse any APDU by its leading tag
pub fn parse_apdu(data: &[u8]) -> DlmsResult<Apdu> {
    let tag = *data
        .first()
        .ok_or_else(|| DlmsError::insufficient(1, data.len()))?;

    match tag {
        0x01 => Ok(Apdu::InitiateRequest(InitiateRequest::from_bytes(data)?)),
        0x08 => Ok(Apdu::InitiateResponse(InitiateResponse::from_bytes(data)?)),
        0x0F => Ok(Apdu::DataNotification(DataNotification::from_bytes(data)?)),
        0x21 => Ok(Apdu::GlobalCipherInitiateRequest(
            GlobalCipherInitiateRequest::from_bytes(data)?,
        )),
        0x28 => Ok(Apdu::GlobalCipherInitiateResponse(
            GlobalCipherInitiateResponse::from_bytes(data)?,
        )),
        0x60 => Ok(Apdu::Aarq(ApplicationAssociationRequest::from_bytes(data)?)),
        0x61 => Ok(Apdu::Aare(ApplicationAssociationResponse::from_bytes(
            data,
        )?)),
        0x62 => Ok(Apdu::Rlrq(ReleaseRequest::from_bytes(data)?)),
        0x63 => Ok(Apdu::Rlre(ReleaseResponse::from_bytes(data)?)),
        0xC0 => get_request_from_bytes(data),
        0xC4 => get_response_from_bytes(data),
        0xC1 => set_request_from_bytes(data),
        0xC5 => set_response_from_bytes(data),
        0xC3 => action_request_from_bytes(data),
        0xC7 => action_response_from_bytes(data),
        0xD8 => Ok(Apdu::ExceptionResponse(ExceptionResponse::from_bytes(
            data,
        )?)),
        0xDB => Err(DlmsError::CipheringError(
            "general-global-cipher APDUs are not processed by this stack".into(),
        )),
        other => Err(DlmsError::UnknownApdu(other)),
    }
}

fn type_byte(data: &[u8]) -> DlmsResult<u8> {
    data.get(1)
        .copied()
        .ok_or_else(|| DlmsError::insufficient(2, data.len()))
}

fn get_request_from_bytes(data: &[u8]) -> DlmsResult<Apdu> {
    match type_byte(data)? {
        1 => Ok(Apdu::GetRequestNormal(GetRequestNormal::from_bytes(data)?)),
        2 => Ok(Apdu::GetRequestNext(GetRequestNext::from_bytes(data)?)),
        3 => Ok(Apdu::GetRequestWithList(GetRequestWithList::from_bytes(
            data,
        )?)),
        other => Err(DlmsError::UnknownEnumValue {
            kind: "GetRequest type",
            value: other,
        }),
    }
}

fn get_response_from_bytes(data: &[u8]) -> DlmsResult<Apdu> {
    match type_byte(data)? {
        1 => {
            // choice byte after the invoke id decides data or error
            if data.get(3) == Some(&1) {
                Ok(Apdu::GetResponseNormalWithError(
                    GetResponseNormalWithError::from_bytes(data)?,
                ))
            } else {
                Ok(Apdu::GetResponseNormal(GetResponseNormal::from_bytes(
                    data,
                )?))
            }
        }
        2 => Ok(Apdu::GetResponseWithDataBlock(
            GetResponseWithDataBlock::from_bytes(data)?,
        )),
        3 => Ok(Apdu::GetResponseWithList(GetResponseWithList::from_bytes(
            data,
        )?)),
        4 => Ok(Apdu::GetResponseLastBlock(GetResponseLastBlock::from_bytes(
            data,
        )?)),
        5 => Ok(Apdu::GetResponseLastBlockWithError(
            GetResponseLastBlockWithError::from_bytes(data)?,
        )),
        other => Err(DlmsError::UnknownEnumValue {
            kind: "GetResponse type",
            value: other,
        }),
    }
}

fn set_request_from_bytes(data: &[u8]) -> DlmsResult<Apdu> {
    match type_byte(data)? {
        1 => Ok(Apdu::SetRequestNormal(SetRequestNormal::from_bytes(data)?)),
        other => Err(DlmsError::UnknownEnumValue {
            kind: "SetRequest type",
            value: other,
        }),
    }
}

fn set_response_from_bytes(data: &[u8]) -> DlmsResult<Apdu> {
    match type_byte(data)? {
        1 => Ok(Apdu::SetResponseNormal(SetResponseNormal::from_bytes(
            data,
        )?)),
        other => Err(DlmsError::UnknownEnumValue {
            kind: "SetResponse type",
            value: other,
        }),
    }
}

fn action_request_from_bytes(data: &[u8]) -> DlmsResult<Apdu> {
    match type_byte(data)? {
        1 => Ok(Apdu::ActionRequestNormal(ActionRequestNormal::from_bytes(
            data,
        )?)),
        other => Err(DlmsError::UnknownEnumValue {
            kind: "ActionRequest type",
            value: other,
        }),
    }
}

fn action_response_from_bytes(data: &[u8]) -> DlmsResult<Apdu> {
    if type_byte(data)? != 1 {
        return Err(DlmsError::UnknownEnumValue {
            kind: "ActionResponse type",
            value: data[1],
        });
    }

    // [tag, type, invoke-id, status, has-data, choice, ...]
    let has_data = data.get(4).copied().unwrap_or(0) != 0;
    if !has_data {
        return Ok(Apdu::ActionResponseNormal(ActionResponseNormal::from_bytes(
            data,
        )?));
    }
    match data.get(5) {
        Some(0) => Ok(Apdu::ActionResponseNormalWithData(
            ActionResponseNormalWithData::from_bytes(data)?,
        )),
        Some(1) => Ok(Apdu::ActionResponseNormalWithError(
            ActionResponseNormalWithError::from_bytes(data)?,
        )),
        Some(&other) => Err(DlmsError::UnknownEnumValue {
            kind: "ActionResponse choice",
            value: other,
        }),
        None => Err(DlmsError::insufficient(6, data.len())),
    }
}
