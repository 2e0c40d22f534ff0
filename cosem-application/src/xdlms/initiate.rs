//! InitiateRequest / InitiateResponse APDUs
//!
//! These ride inside the user-information field of the AARQ and AARE. The
//! ciphered variants carry the same negotiation opaquely; payload
//! processing is the caller's concern.

use cosem_asn1::axdr::{AxdrDecoder, AxdrValue, ConfAttribute, ConfElement, EncodingConf};
use cosem_core::error::{DlmsError, DlmsResult};

use super::conformance::Conformance;

/// Tag and length prefixing the conformance bit-block
const CONFORMANCE_TAG: [u8; 3] = [0x5F, 0x1F, 0x04];

/// DLMS version this stack speaks
pub const DLMS_VERSION: u8 = 6;

fn conformance_block_from(data: &[u8]) -> DlmsResult<AxdrValue> {
    if data.len() != 3 + Conformance::LENGTH {
        return Err(DlmsError::LengthMismatch {
            declared: 3 + Conformance::LENGTH,
            actual: data.len(),
        });
    }
    if data[..3] != CONFORMANCE_TAG {
        return Err(DlmsError::InvalidData(format!(
            "conformance block tag is not {:02X?}: {:02X?}",
            CONFORMANCE_TAG,
            &data[..3]
        )));
    }
    Ok(AxdrValue::Bytes(data[3..].to_vec()))
}

/// InitiateRequest APDU, tag 0x01
///
/// ```text
/// InitiateRequest ::= SEQUENCE {
///     dedicated-key                 OCTET STRING OPTIONAL,
///     response-allowed              BOOLEAN DEFAULT TRUE,
///     proposed-quality-of-service   IMPLICIT Integer8 OPTIONAL,
///     proposed-dlms-version-number  Integer8,
///     proposed-conformance          Conformance,
///     client-max-receive-pdu-size   Unsigned16
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateRequest {
    pub dedicated_key: Option<Vec<u8>>,
    pub response_allowed: bool,
    pub proposed_quality_of_service: Option<i8>,
    pub proposed_dlms_version_number: u8,
    pub proposed_conformance: Conformance,
    pub client_max_receive_pdu_size: u16,
}

impl InitiateRequest {
    pub const TAG: u8 = 0x01;

    pub fn new(proposed_conformance: Conformance, client_max_receive_pdu_size: u16) -> Self {
        Self {
            dedicated_key: None,
            response_allowed: true,
            proposed_quality_of_service: None,
            proposed_dlms_version_number: DLMS_VERSION,
            proposed_conformance,
            client_max_receive_pdu_size,
        }
    }

    fn encoding_conf() -> EncodingConf {
        EncodingConf::new(vec![
            ConfElement::Attribute(
                ConfAttribute::variable("dedicated_key", AxdrValue::bytes_from).optional(),
            ),
            ConfElement::Attribute(
                ConfAttribute::fixed("response_allowed", 1, AxdrValue::bool_from)
                    .with_default(AxdrValue::Bool(true)),
            ),
            ConfElement::Attribute(
                ConfAttribute::fixed("quality_of_service", 1, AxdrValue::i8_from).optional(),
            ),
            ConfElement::Attribute(ConfAttribute::fixed("dlms_version", 1, AxdrValue::u8_from)),
            ConfElement::Attribute(ConfAttribute::fixed(
                "conformance",
                3 + Conformance::LENGTH,
                conformance_block_from,
            )),
            ConfElement::Attribute(ConfAttribute::fixed("max_pdu_size", 2, AxdrValue::u16_from)),
        ])
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let tag = *data
            .first()
            .ok_or_else(|| DlmsError::insufficient(1, data.len()))?;
        if tag != Self::TAG {
            return Err(DlmsError::UnexpectedTag {
                got: tag,
                expected: Self::TAG,
            });
        }

        let mut decoder = AxdrDecoder::new(&data[1..]);
        let fields = decoder.decode(&Self::encoding_conf())?;

        let dedicated_key = match &fields["dedicated_key"] {
            AxdrValue::Bytes(key) => Some(key.clone()),
            _ => None,
        };
        let response_allowed = matches!(fields["response_allowed"], AxdrValue::Bool(true));
        let proposed_quality_of_service = match fields["quality_of_service"] {
            AxdrValue::I8(value) => Some(value),
            _ => None,
        };
        let proposed_dlms_version_number = match fields["dlms_version"] {
            AxdrValue::U8(value) => value,
            _ => unreachable!("dlms_version is a fixed u8 attribute"),
        };
        let proposed_conformance = match &fields["conformance"] {
            AxdrValue::Bytes(block) => Conformance::from_bytes(block)?,
            _ => unreachable!("conformance is a fixed bytes attribute"),
        };
        let client_max_receive_pdu_size = match fields["max_pdu_size"] {
            AxdrValue::U16(value) => value,
            _ => unreachable!("max_pdu_size is a fixed u16 attribute"),
        };

        Ok(Self {
            dedicated_key,
            response_allowed,
            proposed_quality_of_service,
            proposed_dlms_version_number,
            proposed_conformance,
            client_max_receive_pdu_size,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![Self::TAG];

        match &self.dedicated_key {
            Some(key) => {
                out.push(0x01);
                out.push(key.len() as u8);
                out.extend_from_slice(key);
            }
            None => out.push(0x00),
        }

        if self.response_allowed {
            out.push(0x00);
        } else {
            out.push(0x01);
            out.push(0x00);
        }

        match self.proposed_quality_of_service {
            Some(quality) => {
                out.push(0x01);
                out.push(quality as u8);
            }
            None => out.push(0x00),
        }

        out.push(self.proposed_dlms_version_number);
        out.extend_from_slice(&CONFORMANCE_TAG);
        out.extend_from_slice(&self.proposed_conformance.to_bytes());
        out.extend_from_slice(&self.client_max_receive_pdu_size.to_be_bytes());
        out
    }
}

/// InitiateResponse APDU, tag 0x08
///
/// Mirrors the request without dedicated-key and response-allowed and adds
/// the trailing `vaa-name`, fixed at 0x0007 under LN referencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateResponse {
    pub negotiated_quality_of_service: Option<i8>,
    pub negotiated_dlms_version_number: u8,
    pub negotiated_conformance: Conformance,
    pub server_max_receive_pdu_size: u16,
}

impl InitiateResponse {
    pub const TAG: u8 = 0x08;
    const VAA_NAME: [u8; 2] = [0x00, 0x07];

    pub fn new(negotiated_conformance: Conformance, server_max_receive_pdu_size: u16) -> Self {
        Self {
            negotiated_quality_of_service: None,
            negotiated_dlms_version_number: DLMS_VERSION,
            negotiated_conformance,
            server_max_receive_pdu_size,
        }
    }

    fn encoding_conf() -> EncodingConf {
        EncodingConf::new(vec![
            ConfElement::Attribute(
                ConfAttribute::fixed("quality_of_service", 1, AxdrValue::i8_from).optional(),
            ),
            ConfElement::Attribute(ConfAttribute::fixed("dlms_version", 1, AxdrValue::u8_from)),
            ConfElement::Attribute(ConfAttribute::fixed(
                "conformance",
                3 + Conformance::LENGTH,
                conformance_block_from,
            )),
            ConfElement::Attribute(ConfAttribute::fixed("max_pdu_size", 2, AxdrValue::u16_from)),
        ])
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < 3 {
            return Err(DlmsError::insufficient(3, data.len()));
        }
        if data[data.len() - 2..] != Self::VAA_NAME {
            return Err(DlmsError::InvalidData(format!(
                "vaa-name is not 0x0007: {:02X?}",
                &data[data.len() - 2..]
            )));
        }
        let data = &data[..data.len() - 2];

        if data[0] != Self::TAG {
            return Err(DlmsError::UnexpectedTag {
                got: data[0],
                expected: Self::TAG,
            });
        }

        let mut decoder = AxdrDecoder::new(&data[1..]);
        let fields = decoder.decode(&Self::encoding_conf())?;

        let negotiated_quality_of_service = match fields["quality_of_service"] {
            AxdrValue::I8(value) => Some(value),
            _ => None,
        };
        let negotiated_dlms_version_number = match fields["dlms_version"] {
            AxdrValue::U8(value) => value,
            _ => unreachable!("dlms_version is a fixed u8 attribute"),
        };
        let negotiated_conformance = match &fields["conformance"] {
            AxdrValue::Bytes(block) => Conformance::from_bytes(block)?,
            _ => unreachable!("conformance is a fixed bytes attribute"),
        };
        let server_max_receive_pdu_size = match fields["max_pdu_size"] {
            AxdrValue::U16(value) => value,
            _ => unreachable!("max_pdu_size is a fixed u16 attribute"),
        };

        Ok(Self {
            negotiated_quality_of_service,
            negotiated_dlms_version_number,
            negotiated_conformance,
            server_max_receive_pdu_size,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![Self::TAG];

        match self.negotiated_quality_of_service {
            Some(quality) => {
                out.push(0x01);
                out.push(quality as u8);
            }
            None => out.push(0x00),
        }

        out.push(self.negotiated_dlms_version_number);
        out.extend_from_slice(&CONFORMANCE_TAG);
        out.extend_from_slice(&self.negotiated_conformance.to_bytes());
        out.extend_from_slice(&self.server_max_receive_pdu_size.to_be_bytes());
        out.extend_from_slice(&Self::VAA_NAME);
        out
    }
}

/// Ciphered initiate negotiation, request form (tag 0x21)
///
/// The ciphered text is carried opaquely; deciphering is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalCipherInitiateRequest {
    pub security_control: u8,
    pub invocation_counter: u32,
    pub ciphered_text: Vec<u8>,
}

impl GlobalCipherInitiateRequest {
    pub const TAG: u8 = 0x21;

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (security_control, invocation_counter, ciphered_text) =
            ciphered_initiate_from_bytes(data, Self::TAG)?;
        Ok(Self {
            security_control,
            invocation_counter,
            ciphered_text,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ciphered_initiate_to_bytes(
            Self::TAG,
            self.security_control,
            self.invocation_counter,
            &self.ciphered_text,
        )
    }
}

/// Ciphered initiate negotiation, response form (tag 0x28)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalCipherInitiateResponse {
    pub security_control: u8,
    pub invocation_counter: u32,
    pub ciphered_text: Vec<u8>,
}

impl GlobalCipherInitiateResponse {
    pub const TAG: u8 = 0x28;

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (security_control, invocation_counter, ciphered_text) =
            ciphered_initiate_from_bytes(data, Self::TAG)?;
        Ok(Self {
            security_control,
            invocation_counter,
            ciphered_text,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ciphered_initiate_to_bytes(
            Self::TAG,
            self.security_control,
            self.invocation_counter,
            &self.ciphered_text,
        )
    }
}

fn ciphered_initiate_from_bytes(data: &[u8], tag: u8) -> DlmsResult<(u8, u32, Vec<u8>)> {
    if data.len() < 2 {
        return Err(DlmsError::insufficient(2, data.len()));
    }
    if data[0] != tag {
        return Err(DlmsError::UnexpectedTag {
            got: data[0],
            expected: tag,
        });
    }

    let length = usize::from(data[1]);
    if data.len() < length + 2 {
        return Err(DlmsError::insufficient(length + 2, data.len()));
    }
    let content = &data[2..2 + length];
    if content.len() < 5 {
        return Err(DlmsError::insufficient(5, content.len()));
    }

    let security_control = content[0];
    let invocation_counter =
        u32::from_be_bytes([content[1], content[2], content[3], content[4]]);
    Ok((security_control, invocation_counter, content[5..].to_vec()))
}

fn ciphered_initiate_to_bytes(
    tag: u8,
    security_control: u8,
    invocation_counter: u32,
    ciphered_text: &[u8],
) -> Vec<u8> {
    let mut content = Vec::with_capacity(5 + ciphered_text.len());
    content.push(security_control);
    content.extend_from_slice(&invocation_counter.to_be_bytes());
    content.extend_from_slice(ciphered_text);

    let mut out = Vec::with_capacity(content.len() + 2);
    out.push(tag);
    out.push(content.len() as u8);
    out.extend_from_slice(&content);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiate_request_plain_round_trip() {
        let request = InitiateRequest::new(Conformance::default_client(), 500);
        let bytes = request.to_bytes();
        assert_eq!(bytes[0], 0x01);
        // absent key, default response-allowed, absent QoS, version 6
        assert_eq!(&bytes[1..5], &[0x00, 0x00, 0x00, 0x06]);
        assert_eq!(&bytes[5..8], &CONFORMANCE_TAG);
        let parsed = InitiateRequest::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_initiate_request_with_dedicated_key_and_qos() {
        let mut request = InitiateRequest::new(Conformance::default_client(), 1024);
        request.dedicated_key = Some(vec![0x11; 16]);
        request.proposed_quality_of_service = Some(-1);
        let parsed = InitiateRequest::from_bytes(&request.to_bytes()).unwrap();
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_initiate_request_response_not_allowed() {
        let mut request = InitiateRequest::new(Conformance::default_client(), 128);
        request.response_allowed = false;
        let parsed = InitiateRequest::from_bytes(&request.to_bytes()).unwrap();
        assert!(!parsed.response_allowed);
    }

    #[test]
    fn test_initiate_response_round_trip() {
        let response = InitiateResponse::new(Conformance::default_client(), 1224);
        let bytes = response.to_bytes();
        assert_eq!(bytes[0], 0x08);
        assert_eq!(&bytes[bytes.len() - 2..], &[0x00, 0x07]);
        let parsed = InitiateResponse::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn test_initiate_response_bad_vaa_name() {
        let response = InitiateResponse::new(Conformance::default_client(), 1224);
        let mut bytes = response.to_bytes();
        let end = bytes.len();
        bytes[end - 1] = 0x08;
        assert!(InitiateResponse::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_bad_conformance_tag_rejected() {
        let request = InitiateRequest::new(Conformance::default_client(), 500);
        let mut bytes = request.to_bytes();
        bytes[5] = 0x5E;
        assert!(InitiateRequest::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_ciphered_initiate_round_trip() {
        let request = GlobalCipherInitiateRequest {
            security_control: 0x30,
            invocation_counter: 0x00001234,
            ciphered_text: vec![0xDE, 0xAD, 0xBE, 0xEF],
        };
        let bytes = request.to_bytes();
        assert_eq!(bytes[0], 0x21);
        assert_eq!(bytes[1], 9);
        assert_eq!(GlobalCipherInitiateRequest::from_bytes(&bytes).unwrap(), request);

        let response = GlobalCipherInitiateResponse {
            security_control: 0x30,
            invocation_counter: 1,
            ciphered_text: vec![0x01],
        };
        assert_eq!(
            GlobalCipherInitiateResponse::from_bytes(&response.to_bytes()).unwrap(),
            response
        );
    }
}
