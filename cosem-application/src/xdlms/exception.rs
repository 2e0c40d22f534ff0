//! ExceptionResponse APDU

use cosem_core::error::{DlmsError, DlmsResult};

use crate::enums::{ServiceException, StateException};

/// Server-side exception report, tag 0xD8
///
/// When the service error is `InvocationCounterError` a four-byte
/// big-endian invocation counter trails the two error bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub state_error: StateException,
    pub service_error: ServiceException,
    pub invocation_counter: Option<u32>,
}

impl ExceptionResponse {
    pub const TAG: u8 = 0xD8;

    pub fn new(
        state_error: StateException,
        service_error: ServiceException,
        invocation_counter: Option<u32>,
    ) -> Self {
        Self {
            state_error,
            service_error,
            invocation_counter,
        }
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() < 3 {
            return Err(DlmsError::insufficient(3, data.len()));
        }
        if data[0] != Self::TAG {
            return Err(DlmsError::UnexpectedTag {
                got: data[0],
                expected: Self::TAG,
            });
        }
        let state_error = StateException::from_u8(data[1])?;
        let service_error = ServiceException::from_u8(data[2])?;

        let invocation_counter = if service_error == ServiceException::InvocationCounterError {
            if data.len() < 7 {
                return Err(DlmsError::insufficient(7, data.len()));
            }
            Some(u32::from_be_bytes([data[3], data[4], data[5], data[6]]))
        } else {
            None
        };

        Ok(Self {
            state_error,
            service_error,
            invocation_counter,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![Self::TAG, self.state_error as u8, self.service_error as u8];
        if let Some(counter) = self.invocation_counter {
            out.extend_from_slice(&counter.to_be_bytes());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_counter_error_layout() {
        let raw = [0xD8, 0x01, 0x06, 0x00, 0x00, 0x12, 0x34];
        let response = ExceptionResponse::from_bytes(&raw).unwrap();
        assert_eq!(response.state_error, StateException::ServiceNotAllowed);
        assert_eq!(
            response.service_error,
            ServiceException::InvocationCounterError
        );
        assert_eq!(response.invocation_counter, Some(0x1234));
        assert_eq!(response.to_bytes(), raw);
    }

    #[test]
    fn test_without_counter() {
        let response = ExceptionResponse::new(
            StateException::ServiceUnknown,
            ServiceException::OperationNotPossible,
            None,
        );
        let bytes = response.to_bytes();
        assert_eq!(bytes, vec![0xD8, 0x02, 0x01]);
        assert_eq!(ExceptionResponse::from_bytes(&bytes).unwrap(), response);
    }

    #[test]
    fn test_counter_required_with_invocation_counter_error() {
        assert!(ExceptionResponse::from_bytes(&[0xD8, 0x01, 0x06, 0x00]).is_err());
    }
}
