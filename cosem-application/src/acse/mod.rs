//! ACSE association control APDUs
//!
//! AARQ/AARE open an application association, RLRQ/RLRE close it. Each is
//! a BER-tagged container of optional BER-tagged fields.

pub mod aare;
pub mod aarq;
pub mod base;
pub mod release;
pub mod user_information;

pub use aare::ApplicationAssociationResponse;
pub use aarq::ApplicationAssociationRequest;
pub use base::{
    AppContextName, AuthFunctionalUnit, AuthenticationValue, MechanismName, PasswordType,
    ResultSourceDiagnostics,
};
pub use release::{ReleaseRequest, ReleaseResponse};
pub use user_information::{UserInformation, UserInformationContent};
