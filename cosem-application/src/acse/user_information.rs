//! The user-information field of the association APDUs
//!
//! A BER octet string whose value is the xDLMS initiate negotiation, plain
//! or ciphered.

use cosem_asn1::ber;
use cosem_core::error::{DlmsError, DlmsResult};

use crate::xdlms::{
    GlobalCipherInitiateRequest, GlobalCipherInitiateResponse, InitiateRequest, InitiateResponse,
};

const OCTET_STRING_TAG: u8 = 0x04;

#[derive(Debug, Clone, PartialEq)]
pub enum UserInformationContent {
    InitiateRequest(InitiateRequest),
    InitiateResponse(InitiateResponse),
    GlobalCipherInitiateRequest(GlobalCipherInitiateRequest),
    GlobalCipherInitiateResponse(GlobalCipherInitiateResponse),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserInformation {
    pub content: UserInformationContent,
}

impl UserInformation {
    pub fn new(content: UserInformationContent) -> Self {
        Self { content }
    }

    pub fn initiate_request(request: InitiateRequest) -> Self {
        Self::new(UserInformationContent::InitiateRequest(request))
    }

    pub fn initiate_response(response: InitiateResponse) -> Self {
        Self::new(UserInformationContent::InitiateResponse(response))
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (tag, _, content) = ber::decode(data, 1)?;
        if tag != [OCTET_STRING_TAG] {
            return Err(DlmsError::UnexpectedTag {
                got: tag[0],
                expected: OCTET_STRING_TAG,
            });
        }

        let inner_tag = *content
            .first()
            .ok_or_else(|| DlmsError::insufficient(1, 0))?;
        let parsed = match inner_tag {
            InitiateRequest::TAG => {
                UserInformationContent::InitiateRequest(InitiateRequest::from_bytes(&content)?)
            }
            InitiateResponse::TAG => {
                UserInformationContent::InitiateResponse(InitiateResponse::from_bytes(&content)?)
            }
            GlobalCipherInitiateRequest::TAG => UserInformationContent::GlobalCipherInitiateRequest(
                GlobalCipherInitiateRequest::from_bytes(&content)?,
            ),
            GlobalCipherInitiateResponse::TAG => {
                UserInformationContent::GlobalCipherInitiateResponse(
                    GlobalCipherInitiateResponse::from_bytes(&content)?,
                )
            }
            other => return Err(DlmsError::UnknownApdu(other)),
        };

        Ok(Self::new(parsed))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let content = match &self.content {
            UserInformationContent::InitiateRequest(request) => request.to_bytes(),
            UserInformationContent::InitiateResponse(response) => response.to_bytes(),
            UserInformationContent::GlobalCipherInitiateRequest(request) => request.to_bytes(),
            UserInformationContent::GlobalCipherInitiateResponse(response) => response.to_bytes(),
        };
        ber::encode_tag(OCTET_STRING_TAG, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdlms::Conformance;

    #[test]
    fn test_initiate_request_round_trip() {
        let info =
            UserInformation::initiate_request(InitiateRequest::new(Conformance::default_client(), 500));
        let bytes = info.to_bytes();
        assert_eq!(bytes[0], 0x04);
        assert_eq!(UserInformation::from_bytes(&bytes).unwrap(), info);
    }

    #[test]
    fn test_initiate_response_round_trip() {
        let info = UserInformation::initiate_response(InitiateResponse::new(
            Conformance::default_client(),
            1224,
        ));
        assert_eq!(UserInformation::from_bytes(&info.to_bytes()).unwrap(), info);
    }

    #[test]
    fn test_unknown_inner_tag_rejected() {
        // octet string wrapping an unknown tag 0x05
        let bytes = [0x04, 0x01, 0x05];
        assert!(matches!(
            UserInformation::from_bytes(&bytes),
            Err(DlmsError::UnknownApdu(0x05))
        ));
    }
}
