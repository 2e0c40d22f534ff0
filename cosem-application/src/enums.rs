//! Wire enumerations shared across the application layer

use cosem_core::error::{DlmsError, DlmsResult};

/// Result of a data access operation as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataAccessResult {
    Success = 0,
    HardwareFault = 1,
    TemporaryFailure = 2,
    ReadWriteDenied = 3,
    ObjectUndefined = 4,
    ObjectClassInconsistent = 9,
    ObjectUnavailable = 11,
    TypeUnmatched = 12,
    ScopeOfAccessViolated = 13,
    DataBlockUnavailable = 14,
    LongGetAborted = 15,
    NoLongGetInProgress = 16,
    LongSetAborted = 17,
    NoLongSetInProgress = 18,
    DataBlockNumberInvalid = 19,
    OtherReason = 250,
}

impl DataAccessResult {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::HardwareFault),
            2 => Ok(Self::TemporaryFailure),
            3 => Ok(Self::ReadWriteDenied),
            4 => Ok(Self::ObjectUndefined),
            9 => Ok(Self::ObjectClassInconsistent),
            11 => Ok(Self::ObjectUnavailable),
            12 => Ok(Self::TypeUnmatched),
            13 => Ok(Self::ScopeOfAccessViolated),
            14 => Ok(Self::DataBlockUnavailable),
            15 => Ok(Self::LongGetAborted),
            16 => Ok(Self::NoLongGetInProgress),
            17 => Ok(Self::LongSetAborted),
            18 => Ok(Self::NoLongSetInProgress),
            19 => Ok(Self::DataBlockNumberInvalid),
            250 => Ok(Self::OtherReason),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "DataAccessResult",
                value: other,
            }),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Result status of an ACTION invocation; shares the `DataAccessResult`
/// value space apart from the long-action codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionResultStatus {
    Success = 0,
    HardwareFault = 1,
    TemporaryFailure = 2,
    ReadWriteDenied = 3,
    ObjectUndefined = 4,
    ObjectClassInconsistent = 9,
    ObjectUnavailable = 11,
    TypeUnmatched = 12,
    ScopeOfAccessViolated = 13,
    DataBlockUnavailable = 14,
    LongActionAborted = 15,
    NoLongActionInProgress = 16,
    OtherReason = 250,
}

impl ActionResultStatus {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Success),
            1 => Ok(Self::HardwareFault),
            2 => Ok(Self::TemporaryFailure),
            3 => Ok(Self::ReadWriteDenied),
            4 => Ok(Self::ObjectUndefined),
            9 => Ok(Self::ObjectClassInconsistent),
            11 => Ok(Self::ObjectUnavailable),
            12 => Ok(Self::TypeUnmatched),
            13 => Ok(Self::ScopeOfAccessViolated),
            14 => Ok(Self::DataBlockUnavailable),
            15 => Ok(Self::LongActionAborted),
            16 => Ok(Self::NoLongActionInProgress),
            250 => Ok(Self::OtherReason),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "ActionResultStatus",
                value: other,
            }),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Type discriminator of GET requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GetRequestType {
    Normal = 1,
    Next = 2,
    WithList = 3,
}

/// Type discriminator of GET responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GetResponseType {
    Normal = 1,
    WithBlock = 2,
    WithList = 3,
    LastBlock = 4,
    LastBlockWithError = 5,
}

/// Type discriminator of SET requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SetRequestType {
    Normal = 1,
    WithFirstBlock = 2,
    WithBlock = 3,
    WithList = 4,
    FirstBlockWithList = 5,
}

/// Type discriminator of SET responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SetResponseType {
    Normal = 1,
    WithBlock = 2,
    WithLastBlock = 3,
    LastBlockWithList = 4,
    WithList = 5,
}

/// Type discriminator of ACTION requests and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActionType {
    Normal = 1,
    NextPBlock = 2,
    WithList = 3,
    WithFirstPBlock = 4,
    WithListAndFirstPBlock = 5,
    WithPBlock = 6,
}

/// State error of an exception response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StateException {
    ServiceNotAllowed = 1,
    ServiceUnknown = 2,
}

impl StateException {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            1 => Ok(Self::ServiceNotAllowed),
            2 => Ok(Self::ServiceUnknown),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "StateException",
                value: other,
            }),
        }
    }
}

/// Service error of an exception response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServiceException {
    OperationNotPossible = 1,
    ServiceNotSupported = 2,
    OtherReason = 3,
    PduTooLong = 4,
    DecipheringError = 5,
    InvocationCounterError = 6,
}

impl ServiceException {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            1 => Ok(Self::OperationNotPossible),
            2 => Ok(Self::ServiceNotSupported),
            3 => Ok(Self::OtherReason),
            4 => Ok(Self::PduTooLong),
            5 => Ok(Self::DecipheringError),
            6 => Ok(Self::InvocationCounterError),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "ServiceException",
                value: other,
            }),
        }
    }
}

/// Authentication mechanism id carried in the ACSE mechanism name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthenticationMechanism {
    None = 0,
    Lls = 1,
    Hls = 2,
    /// Insecure, kept for old meters
    HlsMd5 = 3,
    /// Insecure, kept for old meters
    HlsSha1 = 4,
    HlsGmac = 5,
    HlsSha256 = 6,
    HlsEcdsa = 7,
}

impl AuthenticationMechanism {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Lls),
            2 => Ok(Self::Hls),
            3 => Ok(Self::HlsMd5),
            4 => Ok(Self::HlsSha1),
            5 => Ok(Self::HlsGmac),
            6 => Ok(Self::HlsSha256),
            7 => Ok(Self::HlsEcdsa),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "AuthenticationMechanism",
                value: other,
            }),
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Result field of an AARE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AssociationResult {
    Accepted = 0,
    RejectedPermanent = 1,
    RejectedTransient = 2,
}

impl AssociationResult {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Accepted),
            1 => Ok(Self::RejectedPermanent),
            2 => Ok(Self::RejectedTransient),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "AssociationResult",
                value: other,
            }),
        }
    }
}

/// Diagnostics reported by the ACSE service user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AcseServiceUserDiagnostics {
    Null = 0,
    NoReasonGiven = 1,
    ApplicationContextNameNotSupported = 2,
    CallingApTitleNotRecognized = 3,
    CallingApInvocationIdentifierNotRecognized = 4,
    CallingAeQualifierNotRecognized = 5,
    CallingAeInvocationIdentifierNotRecognized = 6,
    CalledApTitleNotRecognized = 7,
    CalledApInvocationIdentifierNotRecognized = 8,
    CalledAeQualifierNotRecognized = 9,
    CalledAeInvocationIdentifierNotRecognized = 10,
    AuthenticationMechanismNameNotRecognized = 11,
    AuthenticationMechanismNameRequired = 12,
    AuthenticationFailed = 13,
    AuthenticationRequired = 14,
}

impl AcseServiceUserDiagnostics {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::NoReasonGiven),
            2 => Ok(Self::ApplicationContextNameNotSupported),
            3 => Ok(Self::CallingApTitleNotRecognized),
            4 => Ok(Self::CallingApInvocationIdentifierNotRecognized),
            5 => Ok(Self::CallingAeQualifierNotRecognized),
            6 => Ok(Self::CallingAeInvocationIdentifierNotRecognized),
            7 => Ok(Self::CalledApTitleNotRecognized),
            8 => Ok(Self::CalledApInvocationIdentifierNotRecognized),
            9 => Ok(Self::CalledAeQualifierNotRecognized),
            10 => Ok(Self::CalledAeInvocationIdentifierNotRecognized),
            11 => Ok(Self::AuthenticationMechanismNameNotRecognized),
            12 => Ok(Self::AuthenticationMechanismNameRequired),
            13 => Ok(Self::AuthenticationFailed),
            14 => Ok(Self::AuthenticationRequired),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "AcseServiceUserDiagnostics",
                value: other,
            }),
        }
    }
}

/// Diagnostics reported by the ACSE service provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AcseServiceProviderDiagnostics {
    Null = 0,
    NoReasonGiven = 1,
    NoCommonAcseVersion = 2,
}

impl AcseServiceProviderDiagnostics {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::NoReasonGiven),
            2 => Ok(Self::NoCommonAcseVersion),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "AcseServiceProviderDiagnostics",
                value: other,
            }),
        }
    }
}

/// Reason carried in an RLRQ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReleaseRequestReason {
    Normal = 0,
    Urgent = 1,
    UserDefined = 30,
}

impl ReleaseRequestReason {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Urgent),
            30 => Ok(Self::UserDefined),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "ReleaseRequestReason",
                value: other,
            }),
        }
    }
}

/// Reason carried in an RLRE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReleaseResponseReason {
    Normal = 0,
    NotFinished = 1,
    UserDefined = 30,
}

impl ReleaseResponseReason {
    pub fn from_u8(value: u8) -> DlmsResult<Self> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::NotFinished),
            30 => Ok(Self::UserDefined),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "ReleaseResponseReason",
                value: other,
            }),
        }
    }
}

/// COSEM interface class identifiers
///
/// Only the identification is interpreted here; interface-class semantics
/// live with the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CosemInterface {
    Data = 1,
    Register = 3,
    ExtendedRegister = 4,
    DemandRegister = 5,
    RegisterActivation = 6,
    ProfileGeneric = 7,
    Clock = 8,
    ScriptTable = 9,
    Schedule = 10,
    SpecialDaysTable = 11,
    AssociationSn = 12,
    AssociationLn = 15,
    SapAssignment = 17,
    ImageTransfer = 18,
    IecLocalPortSetup = 19,
    ActivityCalendar = 20,
    RegisterMonitor = 21,
    SingleActionSchedule = 22,
    IecHdlcSetup = 23,
    ModemConfiguration = 27,
    AutoAnswer = 28,
    AutoConnect = 29,
    Push = 40,
    TcpUdpSetup = 41,
    Ipv4Setup = 42,
    MacAddressSetup = 43,
    PppSetup = 44,
    GprsModemSetup = 45,
    GsmDiagnostics = 47,
    Ipv6Setup = 48,
    SecuritySetup = 64,
    ParameterMonitor = 65,
    SensorManager = 67,
    Arbitrator = 68,
    DisconnectControl = 70,
    Limiter = 71,
    MbusClient = 72,
    CompactData = 62,
    StatusMapping = 63,
    Account = 111,
    Credit = 112,
    Charge = 113,
    TokenGateway = 115,
    NtpSetup = 100,
}

impl CosemInterface {
    pub fn from_u16(value: u16) -> DlmsResult<Self> {
        match value {
            1 => Ok(Self::Data),
            3 => Ok(Self::Register),
            4 => Ok(Self::ExtendedRegister),
            5 => Ok(Self::DemandRegister),
            6 => Ok(Self::RegisterActivation),
            7 => Ok(Self::ProfileGeneric),
            8 => Ok(Self::Clock),
            9 => Ok(Self::ScriptTable),
            10 => Ok(Self::Schedule),
            11 => Ok(Self::SpecialDaysTable),
            12 => Ok(Self::AssociationSn),
            15 => Ok(Self::AssociationLn),
            17 => Ok(Self::SapAssignment),
            18 => Ok(Self::ImageTransfer),
            19 => Ok(Self::IecLocalPortSetup),
            20 => Ok(Self::ActivityCalendar),
            21 => Ok(Self::RegisterMonitor),
            22 => Ok(Self::SingleActionSchedule),
            23 => Ok(Self::IecHdlcSetup),
            27 => Ok(Self::ModemConfiguration),
            28 => Ok(Self::AutoAnswer),
            29 => Ok(Self::AutoConnect),
            40 => Ok(Self::Push),
            41 => Ok(Self::TcpUdpSetup),
            42 => Ok(Self::Ipv4Setup),
            43 => Ok(Self::MacAddressSetup),
            44 => Ok(Self::PppSetup),
            45 => Ok(Self::GprsModemSetup),
            47 => Ok(Self::GsmDiagnostics),
            48 => Ok(Self::Ipv6Setup),
            62 => Ok(Self::CompactData),
            63 => Ok(Self::StatusMapping),
            64 => Ok(Self::SecuritySetup),
            65 => Ok(Self::ParameterMonitor),
            67 => Ok(Self::SensorManager),
            68 => Ok(Self::Arbitrator),
            70 => Ok(Self::DisconnectControl),
            71 => Ok(Self::Limiter),
            72 => Ok(Self::MbusClient),
            100 => Ok(Self::NtpSetup),
            111 => Ok(Self::Account),
            112 => Ok(Self::Credit),
            113 => Ok(Self::Charge),
            115 => Ok(Self::TokenGateway),
            other => Err(DlmsError::UnknownEnumValue {
                kind: "CosemInterface",
                value: (other & 0xFF) as u8,
            }),
        }
    }

    pub fn to_u16(self) -> u16 {
        self as u16
    }
}
