//! Building blocks shared by the ACSE APDUs

use cosem_asn1::ber;
use cosem_core::error::{DlmsError, DlmsResult};

use crate::enums::{
    AcseServiceProviderDiagnostics, AcseServiceUserDiagnostics, AuthenticationMechanism,
};

/// Fixed prefix of every DLMS object identifier
pub const DLMS_OID_PREFIX: [u8; 5] = [0x60, 0x85, 0x74, 0x05, 0x08];

const OBJECT_IDENTIFIER_TAG: u8 = 0x06;
const INTEGER_TAG: u8 = 0x02;

/// Application context name
///
/// Tells the server how objects are referenced and whether ciphered APDUs
/// are used. The trailing context id encodes both flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppContextName {
    pub logical_name_refs: bool,
    pub ciphered_apdus: bool,
}

impl AppContextName {
    const APP_CONTEXT: u8 = 1;

    pub fn new(logical_name_refs: bool, ciphered_apdus: bool) -> Self {
        Self {
            logical_name_refs,
            ciphered_apdus,
        }
    }

    pub fn context_id(&self) -> u8 {
        match (self.logical_name_refs, self.ciphered_apdus) {
            (true, false) => 1,
            (false, false) => 2,
            (true, true) => 3,
            (false, true) => 4,
        }
    }

    fn from_context_id(context_id: u8) -> DlmsResult<Self> {
        match context_id {
            1 => Ok(Self::new(true, false)),
            2 => Ok(Self::new(false, false)),
            3 => Ok(Self::new(true, true)),
            4 => Ok(Self::new(false, true)),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "application context id",
                value: other,
            }),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut content = DLMS_OID_PREFIX.to_vec();
        content.push(Self::APP_CONTEXT);
        content.push(self.context_id());
        ber::encode_tag(OBJECT_IDENTIFIER_TAG, &content)
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (tag, _, content) = ber::decode(data, 1)?;
        if tag != [OBJECT_IDENTIFIER_TAG] {
            return Err(DlmsError::UnexpectedTag {
                got: tag[0],
                expected: OBJECT_IDENTIFIER_TAG,
            });
        }
        let (last, prefix) = content
            .split_last()
            .ok_or_else(|| DlmsError::insufficient(1, 0))?;
        let mut expected = DLMS_OID_PREFIX.to_vec();
        expected.push(Self::APP_CONTEXT);
        if prefix != expected.as_slice() {
            return Err(DlmsError::InvalidData(format!(
                "static part of the application context object id is wrong: {:02X?}",
                prefix
            )));
        }
        Self::from_context_id(*last)
    }
}

/// Authentication mechanism name
///
/// Encoded as the raw OID bytes (no inner tag) under field tag 0x8B/0x89.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MechanismName {
    pub mechanism: AuthenticationMechanism,
}

impl MechanismName {
    const APP_CONTEXT: u8 = 2;

    pub fn new(mechanism: AuthenticationMechanism) -> Self {
        Self { mechanism }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = DLMS_OID_PREFIX.to_vec();
        out.push(Self::APP_CONTEXT);
        out.push(self.mechanism.to_u8());
        out
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (last, prefix) = data
            .split_last()
            .ok_or_else(|| DlmsError::insufficient(1, 0))?;
        let mut expected = DLMS_OID_PREFIX.to_vec();
        expected.push(Self::APP_CONTEXT);
        if prefix != expected.as_slice() {
            return Err(DlmsError::InvalidData(format!(
                "static part of the mechanism name object id is wrong: {:02X?}",
                prefix
            )));
        }
        Ok(Self::new(AuthenticationMechanism::from_u8(*last)?))
    }
}

/// How an authentication value is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordType {
    /// GraphicString, implicit tag 0x80
    Chars,
    /// BIT STRING, implicit tag 0x81
    Bits,
}

impl PasswordType {
    fn tag(self) -> u8 {
        match self {
            PasswordType::Chars => 0x80,
            PasswordType::Bits => 0x81,
        }
    }
}

/// The password carried in AARQ and AARE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationValue {
    pub password: Vec<u8>,
    pub password_type: PasswordType,
}

impl AuthenticationValue {
    pub fn chars(password: Vec<u8>) -> Self {
        Self {
            password,
            password_type: PasswordType::Chars,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        ber::encode_tag(self.password_type.tag(), &self.password)
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (tag, _, content) = ber::decode(data, 1)?;
        let password_type = match tag[0] {
            0x80 => PasswordType::Chars,
            0x81 => PasswordType::Bits,
            other => {
                return Err(DlmsError::UnknownEnumValue {
                    kind: "authentication value tag",
                    value: other,
                })
            }
        };
        Ok(Self {
            password: content,
            password_type,
        })
    }
}

/// Two-byte ACSE requirements bit-string carrying the authentication flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFunctionalUnit {
    pub authentication: bool,
}

impl AuthFunctionalUnit {
    pub fn new(authentication: bool) -> Self {
        Self { authentication }
    }

    /// Empty when authentication is off: the field is omitted entirely
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.authentication {
            vec![0x07, 0x80]
        } else {
            Vec::new()
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() != 2 {
            return Err(DlmsError::LengthMismatch {
                declared: 2,
                actual: data.len(),
            });
        }
        Ok(Self::new(data[1] != 0))
    }
}

/// Integer wrapped for BER transport (universal tag 2)
pub fn encode_ber_integer(value: u8) -> Vec<u8> {
    ber::encode_tag(INTEGER_TAG, &[value])
}

/// Decode a single-byte BER integer
pub fn decode_ber_integer(data: &[u8]) -> DlmsResult<u8> {
    let (tag, _, content) = ber::decode(data, 1)?;
    if tag != [INTEGER_TAG] {
        return Err(DlmsError::UnexpectedTag {
            got: tag[0],
            expected: INTEGER_TAG,
        });
    }
    content
        .first()
        .copied()
        .ok_or_else(|| DlmsError::insufficient(1, 0))
}

/// The result-source-diagnostics choice of the AARE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSourceDiagnostics {
    AcseServiceUser(AcseServiceUserDiagnostics),
    AcseServiceProvider(AcseServiceProviderDiagnostics),
}

impl ResultSourceDiagnostics {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ResultSourceDiagnostics::AcseServiceUser(value) => {
                ber::encode_tag(0x81, &[*value as u8])
            }
            ResultSourceDiagnostics::AcseServiceProvider(value) => {
                ber::encode_tag(0x82, &[*value as u8])
            }
        }
    }

    /// Both primitive (0x81/0x82) and constructed (0xA1/0xA2) tag forms
    /// occur in the field; the value may be bare or a BER INTEGER.
    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (tag, _, content) = ber::decode(data, 1)?;
        let value = if content.first() == Some(&INTEGER_TAG) {
            decode_ber_integer(&content)?
        } else {
            *content
                .first()
                .ok_or_else(|| DlmsError::insufficient(1, 0))?
        };

        match tag[0] & 0b1101_1111 {
            0x81 => Ok(ResultSourceDiagnostics::AcseServiceUser(
                AcseServiceUserDiagnostics::from_u8(value)?,
            )),
            0x82 => Ok(ResultSourceDiagnostics::AcseServiceProvider(
                AcseServiceProviderDiagnostics::from_u8(value)?,
            )),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "result source diagnostics tag",
                value: other,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_context_name_ln_plain() {
        let name = AppContextName::new(true, false);
        assert_eq!(
            name.to_bytes(),
            vec![0x06, 0x07, 0x60, 0x85, 0x74, 0x05, 0x08, 0x01, 0x01]
        );
        assert_eq!(AppContextName::from_bytes(&name.to_bytes()).unwrap(), name);
    }

    #[test]
    fn test_app_context_ids() {
        assert_eq!(AppContextName::new(true, false).context_id(), 1);
        assert_eq!(AppContextName::new(false, false).context_id(), 2);
        assert_eq!(AppContextName::new(true, true).context_id(), 3);
        assert_eq!(AppContextName::new(false, true).context_id(), 4);
    }

    #[test]
    fn test_app_context_bad_prefix() {
        let bytes = vec![0x06, 0x07, 0x60, 0x85, 0x74, 0x05, 0x09, 0x01, 0x01];
        assert!(AppContextName::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_mechanism_name_round_trip() {
        let name = MechanismName::new(AuthenticationMechanism::Hls);
        assert_eq!(
            name.to_bytes(),
            vec![0x60, 0x85, 0x74, 0x05, 0x08, 0x02, 0x02]
        );
        assert_eq!(MechanismName::from_bytes(&name.to_bytes()).unwrap(), name);
    }

    #[test]
    fn test_authentication_value_round_trip() {
        let value = AuthenticationValue::chars(b"12345678".to_vec());
        let bytes = value.to_bytes();
        assert_eq!(bytes[0], 0x80);
        assert_eq!(AuthenticationValue::from_bytes(&bytes).unwrap(), value);
    }

    #[test]
    fn test_auth_functional_unit() {
        assert_eq!(
            AuthFunctionalUnit::new(true).to_bytes(),
            vec![0x07, 0x80]
        );
        assert!(AuthFunctionalUnit::new(false).to_bytes().is_empty());
        let parsed = AuthFunctionalUnit::from_bytes(&[0x07, 0x80]).unwrap();
        assert!(parsed.authentication);
    }

    #[test]
    fn test_diagnostics_primitive_form() {
        let diagnostics = ResultSourceDiagnostics::AcseServiceUser(
            AcseServiceUserDiagnostics::AuthenticationFailed,
        );
        let bytes = diagnostics.to_bytes();
        assert_eq!(bytes, vec![0x81, 0x01, 0x0D]);
        assert_eq!(
            ResultSourceDiagnostics::from_bytes(&bytes).unwrap(),
            diagnostics
        );
    }

    #[test]
    fn test_diagnostics_constructed_form_with_inner_integer() {
        let bytes = [0xA1, 0x03, 0x02, 0x01, 0x0D];
        let diagnostics = ResultSourceDiagnostics::from_bytes(&bytes).unwrap();
        assert_eq!(
            diagnostics,
            ResultSourceDiagnostics::AcseServiceUser(
                AcseServiceUserDiagnostics::AuthenticationFailed
            )
        );
    }

    #[test]
    fn test_provider_diagnostics() {
        let bytes = [0x82, 0x01, 0x01];
        assert_eq!(
            ResultSourceDiagnostics::from_bytes(&bytes).unwrap(),
            ResultSourceDiagnostics::AcseServiceProvider(
                AcseServiceProviderDiagnostics::NoReasonGiven
            )
        );
    }
}
