//! AARE — Application Association Response

use cosem_asn1::ber;
use cosem_core::error::{DlmsError, DlmsResult};

use crate::enums::{AssociationResult, AuthenticationMechanism};

use super::base::{
    decode_ber_integer, encode_ber_integer, AppContextName, AuthFunctionalUnit,
    AuthenticationValue, MechanismName, ResultSourceDiagnostics,
};
use super::user_information::UserInformation;

const OCTET_STRING_TAG: u8 = 0x04;

/// The server's answer to an AARQ
///
/// Carries the association result and its source diagnostics; a successful
/// answer wraps the xDLMS InitiateResponse in the user information.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationAssociationResponse {
    pub result: AssociationResult,
    pub result_source_diagnostics: ResultSourceDiagnostics,
    pub ciphered: bool,
    pub authentication: Option<AuthenticationMechanism>,
    pub system_title: Option<Vec<u8>>,
    pub public_cert: Option<Vec<u8>>,
    pub authentication_value: Option<Vec<u8>>,
    pub user_information: Option<UserInformation>,
    pub responding_ap_invocation_id: Option<Vec<u8>>,
    pub responding_ae_invocation_id: Option<Vec<u8>>,
    pub implementation_information: Option<Vec<u8>>,
}

impl ApplicationAssociationResponse {
    pub const TAG: u8 = 0x61;

    pub fn new(
        result: AssociationResult,
        result_source_diagnostics: ResultSourceDiagnostics,
        ciphered: bool,
        user_information: Option<UserInformation>,
    ) -> Self {
        Self {
            result,
            result_source_diagnostics,
            ciphered,
            authentication: None,
            system_title: None,
            public_cert: None,
            authentication_value: None,
            user_information,
            responding_ap_invocation_id: None,
            responding_ae_invocation_id: None,
            implementation_information: None,
        }
    }

    pub fn responder_acse_requirements(&self) -> Option<AuthFunctionalUnit> {
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
        fields.extend_from_slice(&ber::encode_tag(
            0xA2,
            &encode_ber_integer(self.result as u8),
        ));
        fields.extend_from_slice(&ber::encode_tag(
            0xA3,
            &self.result_source_diagnostics.to_bytes(),
        ));

        if let Some(system_title) = &self.system_title {
            let inner = ber::encode_tag(OCTET_STRING_TAG, system_title);
            fields.extend_from_slice(&ber::encode_tag(0xA4, &inner));
        }
        if let Some(public_cert) = &self.public_cert {
            let inner = ber::encode_tag(OCTET_STRING_TAG, public_cert);
            fields.extend_from_slice(&ber::encode_tag(0xA5, &inner));
        }
        if let Some(id) = &self.responding_ap_invocation_id {
            fields.extend_from_slice(&ber::encode_tag(0xA6, id));
        }
        if let Some(id) = &self.responding_ae_invocation_id {
            fields.extend_from_slice(&ber::encode_tag(0xA7, id));
        }

        if let Some(requirements) = self.responder_acse_requirements() {
            fields.extend_from_slice(&ber::encode_tag(0x88, &requirements.to_bytes()));
        }
        if let Some(mechanism) = self.mechanism_name() {
            fields.extend_from_slice(&ber::encode_tag(0x89, &mechanism.to_bytes()));
        }
        if let Some(password) = &self.authentication_value {
            let value = AuthenticationValue::chars(password.clone());
            fields.extend_from_slice(&ber::encode_tag(0xAA, &value.to_bytes()));
        }
        if let Some(information) = &self.implementation_information {
            fields.extend_from_slice(&ber::encode_tag(0xBD, information));
        }
        if let Some(user_information) = &self.user_information {
            fields.extend_from_slice(&ber::encode_tag(0xBE, &user_information.to_bytes()));
        }

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
        let mut result: Option<AssociationResult> = None;
        let mut diagnostics: Option<ResultSourceDiagnostics> = None;
        let mut requirements: Option<AuthFunctionalUnit> = None;
        let mut mechanism: Option<MechanismName> = None;
        let mut system_title = None;
        let mut public_cert = None;
        let mut authentication_value = None;
        let mut user_information = None;
        let mut responding_ap_invocation_id = None;
        let mut responding_ae_invocation_id = None;
        let mut implementation_information = None;

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
                0xA2 => result = Some(AssociationResult::from_u8(decode_ber_integer(field)?)?),
                0xA3 => diagnostics = Some(ResultSourceDiagnostics::from_bytes(field)?),
                0xA4 => {
                    let (_, _, inner) = ber::decode(field, 1)?;
                    system_title = Some(inner);
                }
                0xA5 => {
                    let (_, _, inner) = ber::decode(field, 1)?;
                    public_cert = Some(inner);
                }
                0xA6 => responding_ap_invocation_id = Some(field.to_vec()),
                0xA7 => responding_ae_invocation_id = Some(field.to_vec()),
                0x88 => requirements = Some(AuthFunctionalUnit::from_bytes(field)?),
                0x89 => mechanism = Some(MechanismName::from_bytes(field)?),
                0xAA => {
                    authentication_value = Some(AuthenticationValue::from_bytes(field)?.password)
                }
                0xBD => implementation_information = Some(field.to_vec()),
                0xBE => user_information = Some(UserInformation::from_bytes(field)?),
                other => {
                    return Err(DlmsError::UnknownEnumValue {
                        kind: "AARE field tag",
                        value: other,
                    })
                }
            }
            rest = &rest[2 + field_length..];
        }

        let app_context = app_context.ok_or_else(|| {
            DlmsError::ApplicationAssociationError(
                "AARE is missing the application context name".into(),
            )
        })?;
        if !app_context.logical_name_refs {
            return Err(DlmsError::ShortNameNotSupported);
        }

        let result = result.ok_or_else(|| {
            DlmsError::ApplicationAssociationError("AARE is missing the result".into())
        })?;
        let result_source_diagnostics = diagnostics.ok_or_else(|| {
            DlmsError::ApplicationAssociationError(
                "AARE is missing the result source diagnostics".into(),
            )
        })?;

        let authentication = match (requirements, mechanism) {
            (Some(requirements), Some(mechanism)) if requirements.authentication => {
                Some(mechanism.mechanism)
            }
            _ => None,
        };

        Ok(Self {
            result,
            result_source_diagnostics,
            ciphered: app_context.ciphered_apdus,
            authentication,
            system_title,
            public_cert,
            authentication_value,
            user_information,
            responding_ap_invocation_id,
            responding_ae_invocation_id,
            implementation_information,
        })
    }
}
