//! RLRQ / RLRE — association release

use cosem_asn1::ber;
use cosem_core::error::{DlmsError, DlmsResult};

use crate::enums::{ReleaseRequestReason, ReleaseResponseReason};

use super::user_information::UserInformation;

const REASON_TAG: u8 = 0x80;
const USER_INFORMATION_TAG: u8 = 0xBE;
const INTEGER_TAG: u8 = 0x02;

/// The reason field tolerates both a bare byte and a wrapped BER INTEGER
fn reason_value(content: &[u8]) -> DlmsResult<u8> {
    match content {
        [value] => Ok(*value),
        [INTEGER_TAG, 0x01, value] => Ok(*value),
        _ => Err(DlmsError::InvalidData(format!(
            "malformed release reason: {:02X?}",
            content
        ))),
    }
}

fn parse_release_fields(
    data: &[u8],
    tag: u8,
) -> DlmsResult<(Option<u8>, Option<UserInformation>)> {
    let (outer_tag, _, content) = ber::decode(data, 1)?;
    if outer_tag != [tag] {
        return Err(DlmsError::UnexpectedTag {
            got: outer_tag[0],
            expected: tag,
        });
    }

    let mut reason = None;
    let mut user_information = None;

    let mut rest: &[u8] = &content;
    while !rest.is_empty() {
        if rest.len() < 2 {
            return Err(DlmsError::insufficient(2, rest.len()));
        }
        let field_tag = rest[0];
        let field_length = usize::from(rest[1]);
        if rest.len() < 2 + field_length {
            return Err(DlmsError::insufficient(2 + field_length, rest.len()));
        }
        let field = &rest[2..2 + field_length];

        match field_tag {
            REASON_TAG => reason = Some(reason_value(field)?),
            USER_INFORMATION_TAG => user_information = Some(UserInformation::from_bytes(field)?),
            other => {
                return Err(DlmsError::UnknownEnumValue {
                    kind: "release field tag",
                    value: other,
                })
            }
        }
        rest = &rest[2 + field_length..];
    }

    Ok((reason, user_information))
}

/// RLRQ APDU, tag 0x62
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseRequest {
    pub reason: Option<ReleaseRequestReason>,
    pub user_information: Option<UserInformation>,
}

impl ReleaseRequest {
    pub const TAG: u8 = 0x62;

    pub fn new(reason: Option<ReleaseRequestReason>) -> Self {
        Self {
            reason,
            user_information: None,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (reason, user_information) = parse_release_fields(data, Self::TAG)?;
        Ok(Self {
            reason: reason.map(ReleaseRequestReason::from_u8).transpose()?,
            user_information,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut fields = Vec::new();
        if let Some(reason) = self.reason {
            fields.extend_from_slice(&ber::encode_tag(REASON_TAG, &[reason as u8]));
        }
        if let Some(user_information) = &self.user_information {
            fields.extend_from_slice(&ber::encode_tag(
                USER_INFORMATION_TAG,
                &user_information.to_bytes(),
            ));
        }
        // an RLRQ with no fields still needs its empty envelope
        if fields.is_empty() {
            return vec![Self::TAG, 0x00];
        }
        ber::encode_tag(Self::TAG, &fields)
    }
}

/// RLRE APDU, tag 0x63
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseResponse {
    pub reason: Option<ReleaseResponseReason>,
    pub user_information: Option<UserInformation>,
}

impl ReleaseResponse {
    pub const TAG: u8 = 0x63;

    pub fn new(reason: Option<ReleaseResponseReason>) -> Self {
        Self {
            reason,
            user_information: None,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (reason, user_information) = parse_release_fields(data, Self::TAG)?;
        Ok(Self {
            reason: reason.map(ReleaseResponseReason::from_u8).transpose()?,
            user_information,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut fields = Vec::new();
        if let Some(reason) = self.reason {
            let inner = ber::encode_tag(INTEGER_TAG, &[reason as u8]);
            fields.extend_from_slice(&ber::encode_tag(REASON_TAG, &inner));
        }
        if let Some(user_information) = &self.user_information {
            fields.extend_from_slice(&ber::encode_tag(
                USER_INFORMATION_TAG,
                &user_information.to_bytes(),
            ));
        }
        if fields.is_empty() {
            return vec![Self::TAG, 0x00];
        }
        ber::encode_tag(Self::TAG, &fields)
    }
}
