use thiserror::Error;

/// Main error type for DLMS/COSEM operations
///
/// Every parsing surface in the stack returns a `DlmsResult`. Nothing is
/// recovered locally; the caller decides whether to retry, re-handshake or
/// abort. The state machines are the one exception: an illegal event leaves
/// the state unchanged and surfaces the error for inspection.
#[derive(Error, Debug)]
pub enum DlmsError {
    #[error("Insufficient data: needed {needed} bytes but only {available} available")]
    InsufficientData { needed: usize, available: usize },

    #[error("Unexpected tag: got 0x{got:02X}, expected 0x{expected:02X}")]
    UnexpectedTag { got: u8, expected: u8 },

    #[error("Length mismatch: declared {declared} but actual data is {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Checksum mismatch: computed {computed:02X?}, received {received:02X?}")]
    ChecksumMismatch { computed: [u8; 2], received: [u8; 2] },

    #[error("Frame is not enclosed by HDLC flags")]
    MissingHdlcFlags,

    #[error("Unknown value {value} for {kind}")]
    UnknownEnumValue { kind: &'static str, value: u8 },

    #[error("Tag 0x{0:02X} is not a known APDU")]
    UnknownApdu(u8),

    #[error("Link protocol error: can't handle {frame_type} frame when state is {state}")]
    LinkProtocolError {
        state: &'static str,
        frame_type: &'static str,
    },

    #[error("DLMS protocol error: can't handle {event} when state is {state}")]
    LocalDlmsProtocolError {
        state: &'static str,
        event: &'static str,
    },

    #[error("Application association error: {0}")]
    ApplicationAssociationError(String),

    #[error("Pre-established association error: {0}")]
    PreEstablishedAssociationError(String),

    #[error("Release is not used on this connection: {0}")]
    NoRlrqRlreError(String),

    #[error("Conformance error: {0}")]
    ConformanceError(String),

    #[error("Ciphering error: {0}")]
    CipheringError(String),

    #[error("Cryptography error: {0}")]
    CryptographyError(String),

    #[error("Decryption error: {0}")]
    DecryptionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("DLMS client error: {0}")]
    DlmsClientError(String),

    #[error("Short Name referencing is not supported")]
    ShortNameNotSupported,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),
}

impl DlmsError {
    /// Build an `InsufficientData` error from a required byte count and the
    /// slice that was on hand.
    pub fn insufficient(needed: usize, available: usize) -> Self {
        DlmsError::InsufficientData { needed, available }
    }
}

/// Result type alias for DLMS/COSEM operations
pub type DlmsResult<T> = Result<T, DlmsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DlmsError::UnexpectedTag {
            got: 0xC1,
            expected: 0xC0,
        };
        assert_eq!(err.to_string(), "Unexpected tag: got 0xC1, expected 0xC0");
    }

    #[test]
    fn test_insufficient_helper() {
        let err = DlmsError::insufficient(9, 4);
        assert!(matches!(
            err,
            DlmsError::InsufficientData {
                needed: 9,
                available: 4
            }
        ));
    }
}
