//! AARQ — Application Association Request

use cosem_asn1::ber;
use cosem_core::error::{DlmsError, DlmsResult};

use crate::enums::AuthenticationMechanism;

use super::base::{AppContextName, AuthFunctionalUnit, AuthenticationValue, MechanismName};
use super::user_information::UserInformation;

const OCTET_STRING_TAG: u8 = 0x04;

/// Opens an application association with a DLMS server
///
/// The calling AP title doubles as the client system title, the calling AE
/// qualifier as the client public certificate. The user information wraps
/// the xDLMS InitiateRequest.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationAssociationRequest {
    pub user_information: UserInformation,
    pub system_title: Option<Vec<u8>>,
    pub public_cert: Option<Vec<u8>>,
    pub authentication: Option<AuthenticationMechanism>,
    pub ciphered: bool,
    pub authentication_value: Option<Vec<u8>>,
    pub called_ap_title: Option<Vec<u8>>,
    pub called_ae_qualifier: Option<Vec<u8>>,
    pub called_ap_invocation_identifier: Option<Vec<u8>>,
    pub called_ae_invocation_identifier: Option<Vec<u8>>,
    pub calling_ap_invocation_identifier: Option<Vec<u8>>,
    pub calling_ae_invocation_identifier: Option<Vec<u8>>,
    pub implementation_information: Option<Vec<u8>>,
}

impl ApplicationAssociationRequest {
    pub const TAG: u8 = 0x60;

    pub fn new(
        user_information: UserInformation,
        authentication: Option<AuthenticationMechanism>,
        ciphered: bool,
        authentication_value: Option<Vec<u8>>,
    ) -> Self {
        Self {
            user_information,
            system_title: None,
            public_cert: None,
            // a mechanism of None means no authentication at all
            authentication: authentication.filter(|m| *m != AuthenticationMechanism::None),
            ciphered,
            authentication_value,
            called_ap_title: None,
            called_ae_qualifier: None,
            called_ap_invocation_identifier: None,
            called_ae_invocation_identifier: None,
            calling_ap_invocation_identifier: None,
            calling_ae_invocation_identifier: None,
            implementation_information: None,
        }
    }

    /// The sender ACSE requirements, present only when authenticating
    pub fn sender_acse_requirements(&self) -> Option<AuthFunctionalUnit> {
        self.authentication.map(|_| AuthFunctionalUnit::new(true))
    }

    pub fn mechanism_name(&self) -> Option<MechanismName> {
        self.authentication.map(MechanismName::new)
    }

    pub fn application_context_name(&self) -> AppContextName {
        AppContextName::new(true, self.ciphered)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut fields = Vec::new();

        fields.extend_from_slice(&ber::encode_tag(
            0xA1,
            &self.application_context_name().to_bytes(),
        ));

        for (tag, value) in [
            (0xA2, &self.called_ap_title),
            (0xA3, &self.called_ae_qualifier),
            (0xA4, &self.called_ap_invocation_identifier),
            (0xA5, &self.called_ae_invocation_identifier),
        ] {
            if let Some(value) = value {
                fields.extend_from_slice(&ber::encode_tag(tag, value));
            }
        }

        if let Some(system_title) = &self.system_title {
            let inner = ber::encode_tag(OCTET_STRING_TAG, system_title);
            fields.extend_from_slice(&ber::encode_tag(0xA6, &inner));
        }
        if let Some(public_cert) = &self.public_cert {
            let inner = ber::encode_tag(OCTET_STRING_TAG, public_cert);
            fields.extend_from_slice(&ber::encode_tag(0xA7, &inner));
        }

        for (tag, value) in [
            (0xA8, &self.calling_ap_invocation_identifier),
            (0xA9, &self.calling_ae_invocation_identifier),
        ] {
            if let Some(value) = value {
                fields.extend_from_slice(&ber::encode_tag(tag, value));
            }
        }

        if let Some(requirements) = self.sender_acse_requirements() {
            fields.extend_from_slice(&ber::encode_tag(0x8A, &requirements.to_bytes()));
        }
        if let Some(mechanism) = self.mechanism_name() {
            fields.extend_from_slice(&ber::encode_tag(0x8B, &mechanism.to_bytes()));
        }
        if let Some(password) = &self.authentication_value {
            let value = AuthenticationValue::chars(password.clone());
            fields.extend_from_slice(&ber::encode_tag(0xAC, &value.to_bytes()));
        }
        if let Some(information) = &self.implementation_information {
            fields.extend_from_slice(&ber::encode_tag(0xBD, information));
        }
        fields.extend_from_slice(&ber::encode_tag(0xBE, &self.user_information.to_bytes()));

        ber::encode_tag(Self::TAG, &fields)
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        let (tag, _, content) = ber::decode(data, 1)?;
        if tag != [Self::TAG] {
            return Err(DlmsError::UnexpectedTag {
                got: tag[0],
                expected: Self::TAG,
            });
        }

        let mut app_context: Option<AppContextName> = None;
        let mut requirements: Option<AuthFunctionalUnit> = None;
        let mut mechanism: Option<MechanismName> = None;
        let mut authentication_value: Option<Vec<u8>> = None;
        let mut user_information: Option<UserInformation> = None;
        let mut request = Self {
            user_information: UserInformation::initiate_request(
                crate::xdlms::InitiateRequest::new(Default::default(), 0),
            ),
            system_title: None,
            public_cert: None,
            authentication: None,
            ciphered: false,
            authentication_value: None,
            called_ap_title: None,
            called_ae_qualifier: None,
            called_ap_invocation_identifier: None,
            called_ae_invocation_identifier: None,
            calling_ap_invocation_identifier: None,
            calling_ae_invocation_identifier: None,
            implementation_information: None,
        };

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
                // protocol version 1 is assumed and not decoded
                0x80 => {}
                0xA1 => app_context = Some(AppContextName::from_bytes(field)?),
                0xA2 => request.called_ap_title = Some(field.to_vec()),
                0xA3 => request.called_ae_qualifier = Some(field.to_vec()),
                0xA4 => request.called_ap_invocation_identifier = Some(field.to_vec()),
                0xA5 => request.called_ae_invocation_identifier = Some(field.to_vec()),
                0xA6 => {
                    let (_, _, inner) = ber::decode(field, 1)?;
                    request.system_title = Some(inner);
                }
                0xA7 => {
                    let (_, _, inner) = ber::decode(field, 1)?;
                    request.public_cert = Some(inner);
                }
                0xA8 => request.calling_ap_invocation_identifier = Some(field.to_vec()),
                0xA9 => request.calling_ae_invocation_identifier = Some(field.to_vec()),
                0x8A => requirements = Some(AuthFunctionalUnit::from_bytes(field)?),
                0x8B => mechanism = Some(MechanismName::from_bytes(field)?),
                0xAC => {
                    authentication_value = Some(AuthenticationValue::from_bytes(field)?.password)
                }
                0xBD => request.implementation_information = Some(field.to_vec()),
                0xBE => user_information = Some(UserInformation::from_bytes(field)?),
                other => {
                    return Err(DlmsError::UnknownEnumValue {
                        kind: "AARQ field tag",
                        value: other,
                    })
                }
            }
            rest = &rest[2 + field_length..];
        }

        let app_context = app_context.ok_or_else(|| {
            DlmsError::ApplicationAssociationError(
                "AARQ is missing the application context name".into(),
            )
        })?;
        if !app_context.logical_name_refs {
            return Err(DlmsError::ShortNameNotSupported);
        }

        request.ciphered = app_context.ciphered_apdus;
        request.user_information = user_information.ok_or_else(|| {
            DlmsError::ApplicationAssociationError("AARQ is missing the user information".into())
        })?;
        request.authentication = match (requirements, mechanism) {
            (Some(requirements), Some(mechanism)) if requirements.authentication => {
                Some(mechanism.mechanism)
            }
            _ => None,
        };
        request.authentication_value = authentication_value;

        Ok(request)
    }
}
