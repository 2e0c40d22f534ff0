//! HDLC control and frame-format fields

use cosem_core::error::{DlmsError, DlmsResult};

use super::frames::HdlcFrameKind;

const POLL_FINAL_BIT: u8 = 0b0001_0000;
const MAX_SEQUENCE_NUMBER: u8 = 7;
const MAX_FRAME_LENGTH: u16 = 0b0111_1111_1111;

/// One-byte HDLC control field
///
/// The low bits identify the frame type; I and RR frames additionally carry
/// three-bit sequence numbers. The poll/final bit (0x10) is ORed in when the
/// final flag is set; the unnumbered frames emitted here are always final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlField {
    Snrm,
    Ua,
    Disconnect,
    ReceiveReady { receive_sequence: u8 },
    Information {
        send_sequence: u8,
        receive_sequence: u8,
        final_flag: bool,
    },
}

impl ControlField {
    pub fn receive_ready(receive_sequence: u8) -> DlmsResult<Self> {
        validate_sequence(receive_sequence)?;
        Ok(ControlField::ReceiveReady { receive_sequence })
    }

    pub fn information(
        send_sequence: u8,
        receive_sequence: u8,
        final_flag: bool,
    ) -> DlmsResult<Self> {
        validate_sequence(send_sequence)?;
        validate_sequence(receive_sequence)?;
        Ok(ControlField::Information {
            send_sequence,
            receive_sequence,
            final_flag,
        })
    }

    /// The poll/final bit of this field
    pub fn is_final(&self) -> bool {
        match self {
            ControlField::Information { final_flag, .. } => *final_flag,
            _ => true,
        }
    }

    pub fn to_byte(&self) -> u8 {
        let base = match self {
            ControlField::Snrm => 0b1000_0011,
            ControlField::Ua => 0b0110_0011,
            ControlField::Disconnect => 0b0100_0011,
            ControlField::ReceiveReady { receive_sequence } => {
                0b0000_0001 | (receive_sequence << 5)
            }
            ControlField::Information {
                send_sequence,
                receive_sequence,
                ..
            } => (send_sequence << 1) | (receive_sequence << 5),
        };
        if self.is_final() {
            base | POLL_FINAL_BIT
        } else {
            base
        }
    }

    /// Classify a received control byte
    pub fn kind_of(byte: u8) -> DlmsResult<HdlcFrameKind> {
        if byte & 0b0000_0001 == 0 {
            return Ok(HdlcFrameKind::Information);
        }
        if byte & 0b0000_1111 == 0b0000_0001 {
            return Ok(HdlcFrameKind::ReceiveReady);
        }
        match byte & !POLL_FINAL_BIT {
            0b1000_0011 => Ok(HdlcFrameKind::Snrm),
            0b0110_0011 => Ok(HdlcFrameKind::Ua),
            0b0100_0011 => Ok(HdlcFrameKind::Disconnect),
            _ => Err(DlmsError::UnknownEnumValue {
                kind: "HDLC control field",
                value: byte,
            }),
        }
    }

    /// Parse an information control byte into its sequence numbers
    pub fn information_from_byte(byte: u8) -> DlmsResult<Self> {
        if byte & 0b0000_0001 != 0 {
            return Err(DlmsError::InvalidData(
                "byte does not represent an information control field".into(),
            ));
        }
        ControlField::information(
            (byte & 0b0000_1110) >> 1,
            (byte & 0b1110_0000) >> 5,
            byte & POLL_FINAL_BIT != 0,
        )
    }

    /// Parse a receive-ready control byte
    pub fn receive_ready_from_byte(byte: u8) -> DlmsResult<Self> {
        if byte & 0b0000_1111 != 0b0000_0001 {
            return Err(DlmsError::InvalidData(
                "byte does not represent a receive-ready control field".into(),
            ));
        }
        ControlField::receive_ready((byte & 0b1110_0000) >> 5)
    }
}

fn validate_sequence(value: u8) -> DlmsResult<()> {
    if value > MAX_SEQUENCE_NUMBER {
        return Err(DlmsError::InvalidData(format!(
            "sequence number can only be between 0 and 7, got {}",
            value
        )));
    }
    Ok(())
}

/// 16-bit HDLC frame format field
///
/// The four leftmost bits are fixed at 0b1010 (HDLC frame format 3), bit 11
/// is the segmentation flag and bits 0..10 carry the frame length excluding
/// the two flag bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormatField {
    pub length: u16,
    pub segmented: bool,
}

impl FrameFormatField {
    pub fn new(length: u16, segmented: bool) -> DlmsResult<Self> {
        if length > MAX_FRAME_LENGTH {
            return Err(DlmsError::InvalidData(format!(
                "frame length {} does not fit in 11 bits",
                length
            )));
        }
        Ok(Self { length, segmented })
    }

    pub fn to_bytes(&self) -> [u8; 2] {
        let mut value = 0b1010_0000_0000_0000 | self.length;
        if self.segmented {
            value |= 0b0000_1000_0000_0000;
        }
        value.to_be_bytes()
    }

    pub fn from_bytes(data: &[u8]) -> DlmsResult<Self> {
        if data.len() != 2 {
            return Err(DlmsError::LengthMismatch {
                declared: 2,
                actual: data.len(),
            });
        }
        if data[0] & 0b1111_0000 != 0b1010_0000 {
            return Err(DlmsError::InvalidData(format!(
                "not a DLMS HDLC frame format field: {:02X?}",
                data
            )));
        }
        let segmented = data[0] & 0b0000_1000 != 0;
        let length = (u16::from_be_bytes([data[0], data[1]])) & MAX_FRAME_LENGTH;
        FrameFormatField::new(length, segmented)
    }
}
