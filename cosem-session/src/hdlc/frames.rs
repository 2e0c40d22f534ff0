//! HDLC frame types
//!
//! Five frame types share one assembler:
//! `flag | format(2) | dest | src | control | [HCS] | [info] | FCS | flag`.
//! The header check sequence is present exactly when an information field
//! is. Information frames prefix their payload with a three-byte LLC header.

use cosem_core::error::{DlmsError, DlmsResult};

use super::address::{
    destination_from_frame, find_addresses_in_frame, source_from_frame, AddressRole, HdlcAddress,
};
use super::crc::{FCS, HCS};
use super::fields::{ControlField, FrameFormatField};

/// HDLC frame boundary flag
pub const HDLC_FLAG: u8 = 0x7E;

/// LLC header prefixed to command payloads
pub const LLC_COMMAND_HEADER: [u8; 3] = [0xE6, 0xE6, 0x00];

/// LLC header prefixed to response payloads
pub const LLC_RESPONSE_HEADER: [u8; 3] = [0xE7, 0xE7, 0x00];

/// Discriminant of the five frame types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HdlcFrameKind {
    Snrm,
    Ua,
    Information,
    ReceiveReady,
    Disconnect,
}

impl HdlcFrameKind {
    pub fn name(&self) -> &'static str {
        match self {
            HdlcFrameKind::Snrm => "SNRM",
            HdlcFrameKind::Ua => "UA",
            HdlcFrameKind::Information => "I",
            HdlcFrameKind::ReceiveReady => "RR",
            HdlcFrameKind::Disconnect => "DISC",
        }
    }
}

/// Shared frame assembly
///
/// `information` must already carry its LLC header when one applies.
fn assemble(
    destination: &HdlcAddress,
    source: &HdlcAddress,
    control: ControlField,
    segmented: bool,
    information: &[u8],
) -> DlmsResult<Vec<u8>> {
    let destination_bytes = destination.to_bytes();
    let source_bytes = source.to_bytes();

    let length = if information.is_empty() {
        5 + destination_bytes.len() + source_bytes.len()
    } else {
        7 + destination_bytes.len() + source_bytes.len() + information.len()
    };
    let format = FrameFormatField::new(length as u16, segmented)?;

    let mut content = Vec::with_capacity(length);
    content.extend_from_slice(&format.to_bytes());
    content.extend_from_slice(&destination_bytes);
    content.extend_from_slice(&source_bytes);
    content.push(control.to_byte());

    if !information.is_empty() {
        let hcs = HCS.calculate(&content, false);
        content.extend_from_slice(&hcs);
        content.extend_from_slice(information);
    }

    let fcs = FCS.calculate(&content, false);

    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(HDLC_FLAG);
    out.extend_from_slice(&content);
    out.extend_from_slice(&fcs);
    out.push(HDLC_FLAG);
    Ok(out)
}

/// Validated offsets of a received frame
struct FrameLayout {
    format: FrameFormatField,
    control_position: usize,
    control_byte: u8,
}

fn check_envelope(frame: &[u8]) -> DlmsResult<FrameLayout> {
    if frame.len() < 2 || frame[0] != HDLC_FLAG || frame[frame.len() - 1] != HDLC_FLAG {
        return Err(DlmsError::MissingHdlcFlags);
    }
    if frame.len() < 9 {
        return Err(DlmsError::insufficient(9, frame.len()));
    }

    let format = FrameFormatField::from_bytes(&frame[1..3])?;
    if usize::from(format.length) + 2 != frame.len() {
        return Err(DlmsError::LengthMismatch {
            declared: usize::from(format.length) + 2,
            actual: frame.len(),
        });
    }

    let (destination, source) = find_addresses_in_frame(frame)?;
    let control_position = 3 + destination.length + source.length;
    if control_position >= frame.len() - 3 {
        return Err(DlmsError::insufficient(control_position + 4, frame.len()));
    }

    Ok(FrameLayout {
        format,
        control_position,
        control_byte: frame[control_position],
    })
}

fn verify_fcs(frame: &[u8]) -> DlmsResult<()> {
    let content = &frame[1..frame.len() - 3];
    let computed = FCS.calculate(content, false);
    let received = [frame[frame.len() - 3], frame[frame.len() - 2]];
    if computed != received {
        return Err(DlmsError::ChecksumMismatch { computed, received });
    }
    Ok(())
}

/// Verify HCS and return the information field located after it
fn verify_hcs_and_information<'a>(
    frame: &'a [u8],
    layout: &FrameLayout,
) -> DlmsResult<&'a [u8]> {
    let hcs_position = layout.control_position + 1;
    if hcs_position + 2 > frame.len() - 3 {
        return Err(DlmsError::insufficient(hcs_position + 5, frame.len()));
    }
    let header = &frame[1..hcs_position];
    let computed = HCS.calculate(header, false);
    let received = [frame[hcs_position], frame[hcs_position + 1]];
    if computed != received {
        return Err(DlmsError::ChecksumMismatch { computed, received });
    }
    Ok(&frame[hcs_position + 2..frame.len() - 3])
}

fn information_present(frame: &[u8], layout: &FrameLayout) -> bool {
    // content between the flags: format(2) + addresses + control + FCS(2)
    // anything beyond that is HCS + information
    frame.len() - 2 > layout.control_position + 3
}

/// SNRM frame, used to open an HDLC connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnrmFrame {
    pub destination: HdlcAddress,
    pub source: HdlcAddress,
}

impl SnrmFrame {
    pub fn new(destination: HdlcAddress, source: HdlcAddress) -> Self {
        Self {
            destination,
            source,
        }
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        assemble(
            &self.destination,
            &self.source,
            ControlField::Snrm,
            false,
            &[],
        )
    }

    pub fn from_bytes(frame: &[u8]) -> DlmsResult<Self> {
        let layout = check_envelope(frame)?;
        if ControlField::kind_of(layout.control_byte)? != HdlcFrameKind::Snrm {
            return Err(DlmsError::UnexpectedTag {
                got: layout.control_byte,
                expected: ControlField::Snrm.to_byte(),
            });
        }
        verify_fcs(frame)?;
        Ok(Self {
            destination: destination_from_frame(frame, AddressRole::Server)?,
            source: source_from_frame(frame, AddressRole::Client)?,
        })
    }
}

/// UA frame, acknowledges SNRM and DISC; may carry negotiation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UaFrame {
    pub destination: HdlcAddress,
    pub source: HdlcAddress,
    pub payload: Vec<u8>,
}

impl UaFrame {
    pub fn new(destination: HdlcAddress, source: HdlcAddress, payload: Vec<u8>) -> Self {
        Self {
            destination,
            source,
            payload,
        }
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        assemble(
            &self.destination,
            &self.source,
            ControlField::Ua,
            false,
            &self.payload,
        )
    }

    pub fn from_bytes(frame: &[u8]) -> DlmsResult<Self> {
        let layout = check_envelope(frame)?;
        if ControlField::kind_of(layout.control_byte)? != HdlcFrameKind::Ua {
            return Err(DlmsError::UnexpectedTag {
                got: layout.control_byte,
                expected: ControlField::Ua.to_byte(),
            });
        }
        verify_fcs(frame)?;
        let payload = if information_present(frame, &layout) {
            verify_hcs_and_information(frame, &layout)?.to_vec()
        } else {
            Vec::new()
        };
        Ok(Self {
            destination: destination_from_frame(frame, AddressRole::Client)?,
            source: source_from_frame(frame, AddressRole::Server)?,
            payload,
        })
    }
}

/// RR frame, acknowledges received I-frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveReadyFrame {
    pub destination: HdlcAddress,
    pub source: HdlcAddress,
    pub receive_sequence: u8,
}

impl ReceiveReadyFrame {
    pub fn new(
        destination: HdlcAddress,
        source: HdlcAddress,
        receive_sequence: u8,
    ) -> DlmsResult<Self> {
        // validated through the control field
        ControlField::receive_ready(receive_sequence)?;
        Ok(Self {
            destination,
            source,
            receive_sequence,
        })
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        assemble(
            &self.destination,
            &self.source,
            ControlField::receive_ready(self.receive_sequence)?,
            false,
            &[],
        )
    }

    pub fn from_bytes(frame: &[u8]) -> DlmsResult<Self> {
        let layout = check_envelope(frame)?;
        let control = ControlField::receive_ready_from_byte(layout.control_byte)?;
        verify_fcs(frame)?;
        let receive_sequence = match control {
            ControlField::ReceiveReady { receive_sequence } => receive_sequence,
            _ => unreachable!("parsed a receive-ready control field"),
        };
        Ok(Self {
            destination: destination_from_frame(frame, AddressRole::Client)?,
            source: source_from_frame(frame, AddressRole::Server)?,
            receive_sequence,
        })
    }
}

/// I-frame carrying an LLC-prefixed xDLMS payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationFrame {
    pub destination: HdlcAddress,
    pub source: HdlcAddress,
    pub payload: Vec<u8>,
    pub send_sequence: u8,
    pub receive_sequence: u8,
    pub segmented: bool,
    pub final_flag: bool,
}

impl InformationFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        destination: HdlcAddress,
        source: HdlcAddress,
        payload: Vec<u8>,
        send_sequence: u8,
        receive_sequence: u8,
        segmented: bool,
        final_flag: bool,
    ) -> DlmsResult<Self> {
        ControlField::information(send_sequence, receive_sequence, final_flag)?;
        Ok(Self {
            destination,
            source,
            payload,
            send_sequence,
            receive_sequence,
            segmented,
            final_flag,
        })
    }

    /// The information field: LLC command header plus payload
    fn information(&self) -> Vec<u8> {
        if self.payload.is_empty() {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(3 + self.payload.len());
        out.extend_from_slice(&LLC_COMMAND_HEADER);
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        assemble(
            &self.destination,
            &self.source,
            ControlField::information(
                self.send_sequence,
                self.receive_sequence,
                self.final_flag,
            )?,
            self.segmented,
            &self.information(),
        )
    }

    pub fn from_bytes(frame: &[u8]) -> DlmsResult<Self> {
        let layout = check_envelope(frame)?;
        let control = ControlField::information_from_byte(layout.control_byte)?;
        verify_fcs(frame)?;
        let information = verify_hcs_and_information(frame, &layout)?;

        // Either LLC header may prefix the payload; strip it on ingest
        let payload = if information.starts_with(&LLC_COMMAND_HEADER)
            || information.starts_with(&LLC_RESPONSE_HEADER)
        {
            information[3..].to_vec()
        } else {
            information.to_vec()
        };

        let (send_sequence, receive_sequence, final_flag) = match control {
            ControlField::Information {
                send_sequence,
                receive_sequence,
                final_flag,
            } => (send_sequence, receive_sequence, final_flag),
            _ => unreachable!("parsed an information control field"),
        };

        Ok(Self {
            destination: destination_from_frame(frame, AddressRole::Client)?,
            source: source_from_frame(frame, AddressRole::Server)?,
            payload,
            send_sequence,
            receive_sequence,
            segmented: layout.format.segmented,
            final_flag,
        })
    }
}

/// DISC frame, closes the HDLC connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectFrame {
    pub destination: HdlcAddress,
    pub source: HdlcAddress,
}

impl DisconnectFrame {
    pub fn new(destination: HdlcAddress, source: HdlcAddress) -> Self {
        Self {
            destination,
            source,
        }
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        assemble(
            &self.destination,
            &self.source,
            ControlField::Disconnect,
            false,
            &[],
        )
    }

    pub fn from_bytes(frame: &[u8]) -> DlmsResult<Self> {
        let layout = check_envelope(frame)?;
        if ControlField::kind_of(layout.control_byte)? != HdlcFrameKind::Disconnect {
            return Err(DlmsError::UnexpectedTag {
                got: layout.control_byte,
                expected: ControlField::Disconnect.to_byte(),
            });
        }
        verify_fcs(frame)?;
        Ok(Self {
            destination: destination_from_frame(frame, AddressRole::Server)?,
            source: source_from_frame(frame, AddressRole::Client)?,
        })
    }
}

/// Any HDLC frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HdlcFrame {
    Snrm(SnrmFrame),
    Ua(UaFrame),
    Information(InformationFrame),
    ReceiveReady(ReceiveReadyFrame),
    Disconnect(DisconnectFrame),
}

impl HdlcFrame {
    pub fn kind(&self) -> HdlcFrameKind {
        match self {
            HdlcFrame::Snrm(_) => HdlcFrameKind::Snrm,
            HdlcFrame::Ua(_) => HdlcFrameKind::Ua,
            HdlcFrame::Information(_) => HdlcFrameKind::Information,
            HdlcFrame::ReceiveReady(_) => HdlcFrameKind::ReceiveReady,
            HdlcFrame::Disconnect(_) => HdlcFrameKind::Disconnect,
        }
    }

    pub fn to_bytes(&self) -> DlmsResult<Vec<u8>> {
        match self {
            HdlcFrame::Snrm(frame) => frame.to_bytes(),
            HdlcFrame::Ua(frame) => frame.to_bytes(),
            HdlcFrame::Information(frame) => frame.to_bytes(),
            HdlcFrame::ReceiveReady(frame) => frame.to_bytes(),
            HdlcFrame::Disconnect(frame) => frame.to_bytes(),
        }
    }

    /// Parse whole-frame bytes, dispatching on the control field
    pub fn from_bytes(frame: &[u8]) -> DlmsResult<Self> {
        let layout = check_envelope(frame)?;
        match ControlField::kind_of(layout.control_byte)? {
            HdlcFrameKind::Snrm => Ok(HdlcFrame::Snrm(SnrmFrame::from_bytes(frame)?)),
            HdlcFrameKind::Ua => Ok(HdlcFrame::Ua(UaFrame::from_bytes(frame)?)),
            HdlcFrameKind::Information => Ok(HdlcFrame::Information(
                InformationFrame::from_bytes(frame)?,
            )),
            HdlcFrameKind::ReceiveReady => Ok(HdlcFrame::ReceiveReady(
                ReceiveReadyFrame::from_bytes(frame)?,
            )),
            HdlcFrameKind::Disconnect => Ok(HdlcFrame::Disconnect(DisconnectFrame::from_bytes(
                frame,
            )?)),
        }
    }

    /// The xDLMS payload of an information frame, empty otherwise
    pub fn payload(&self) -> &[u8] {
        match self {
            HdlcFrame::Information(frame) => &frame.payload,
            HdlcFrame::Ua(frame) => &frame.payload,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> HdlcAddress {
        HdlcAddress::server(1).unwrap()
    }

    fn client() -> HdlcAddress {
        HdlcAddress::client(0x10).unwrap()
    }

    #[test]
    fn test_snrm_encoding() {
        let frame = SnrmFrame::new(server(), client());
        let bytes = frame.to_bytes().unwrap();
        assert_eq!(&bytes[..6], &[0x7E, 0xA0, 0x07, 0x03, 0x21, 0x93]);
        assert_eq!(bytes.len(), 9);
        assert_eq!(*bytes.last().unwrap(), 0x7E);
    }

    #[test]
    fn test_snrm_round_trip() {
        let frame = SnrmFrame::new(server(), client());
        let parsed = SnrmFrame::from_bytes(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(frame, parsed);
    }

    #[test]
    fn test_ua_with_negotiation_payload() {
        let payload = vec![
            0x81, 0x80, 0x12, 0x05, 0x01, 0x80, 0x06, 0x01, 0x80, 0x07, 0x04, 0x00, 0x00, 0x00,
            0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0x01,
        ];
        let frame = UaFrame::new(client(), server(), payload.clone());
        let bytes = frame.to_bytes().unwrap();
        let parsed = UaFrame::from_bytes(&bytes).unwrap();
        assert_eq!(frame, parsed);
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn test_ua_without_payload() {
        let frame = UaFrame::new(client(), server(), Vec::new());
        let bytes = frame.to_bytes().unwrap();
        // no information field means no HCS: fixed overhead of 5 plus addresses
        assert_eq!(bytes[2], 0x07);
        assert_eq!(UaFrame::from_bytes(&bytes).unwrap(), frame);
    }

    #[test]
    fn test_information_frame_wraps_llc() {
        let payload = vec![
            0xC0, 0x01, 0x41, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x02, 0x00,
        ];
        let frame =
            InformationFrame::new(server(), client(), payload.clone(), 0, 0, false, true).unwrap();
        let bytes = frame.to_bytes().unwrap();

        // length = 7 fixed + 2 addresses + LLC(3) + payload(13)
        assert_eq!(&bytes[..3], &[0x7E, 0xA0, 0x19]);
        // control byte: N(S)=0, N(R)=0, final
        assert_eq!(bytes[5], 0x10);
        // LLC command header follows the HCS
        assert_eq!(&bytes[8..11], &LLC_COMMAND_HEADER);
        assert_eq!(&bytes[11..24], payload.as_slice());
    }

    #[test]
    fn test_information_round_trip() {
        let frame = InformationFrame::new(
            client(),
            server(),
            vec![0xC4, 0x01, 0x41, 0x00, 0x11, 0x07],
            3,
            5,
            false,
            true,
        )
        .unwrap();
        let parsed = InformationFrame::from_bytes(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(frame, parsed);
    }

    #[test]
    fn test_information_strips_response_llc() {
        let frame = InformationFrame::new(
            client(),
            server(),
            vec![0xC4, 0x01, 0x41, 0x00, 0x11, 0x07],
            0,
            1,
            false,
            true,
        )
        .unwrap();
        let mut bytes = frame.to_bytes().unwrap();
        // rewrite the LLC command header into a response header and refresh
        // the checksums
        bytes[8] = 0xE7;
        bytes[9] = 0xE7;
        let end = bytes.len();
        let fcs = FCS.calculate(&bytes[1..end - 3], false);
        bytes[end - 3] = fcs[0];
        bytes[end - 2] = fcs[1];

        let parsed = InformationFrame::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.payload, frame.payload);
    }

    #[test]
    fn test_receive_ready_round_trip() {
        let frame = ReceiveReadyFrame::new(client(), server(), 5).unwrap();
        let parsed = ReceiveReadyFrame::from_bytes(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(frame, parsed);
    }

    #[test]
    fn test_disconnect_round_trip() {
        let frame = DisconnectFrame::new(server(), client());
        let parsed = DisconnectFrame::from_bytes(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(frame, parsed);
    }

    #[test]
    fn test_dispatch_parse() {
        let frame = SnrmFrame::new(server(), client());
        let parsed = HdlcFrame::from_bytes(&frame.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.kind(), HdlcFrameKind::Snrm);
    }

    #[test]
    fn test_missing_flags() {
        let frame = SnrmFrame::new(server(), client());
        let mut bytes = frame.to_bytes().unwrap();
        bytes[0] = 0x7D;
        assert!(matches!(
            HdlcFrame::from_bytes(&bytes),
            Err(DlmsError::MissingHdlcFlags)
        ));
    }

    #[test]
    fn test_corrupted_fcs_detected() {
        let frame = SnrmFrame::new(server(), client());
        let mut bytes = frame.to_bytes().unwrap();
        let fcs_position = bytes.len() - 3;
        bytes[fcs_position] ^= 0xFF;
        assert!(matches!(
            SnrmFrame::from_bytes(&bytes),
            Err(DlmsError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupted_hcs_detected() {
        let frame = InformationFrame::new(
            client(),
            server(),
            vec![0xC4, 0x01, 0x41, 0x00, 0x11, 0x07],
            0,
            0,
            false,
            true,
        )
        .unwrap();
        let mut bytes = frame.to_bytes().unwrap();
        bytes[6] ^= 0xFF;
        assert!(matches!(
            InformationFrame::from_bytes(&bytes),
            Err(DlmsError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_declared_length_must_match() {
        let frame = SnrmFrame::new(server(), client());
        let mut bytes = frame.to_bytes().unwrap();
        bytes[2] += 1;
        assert!(matches!(
            SnrmFrame::from_bytes(&bytes),
            Err(DlmsError::LengthMismatch { .. })
        ));
    }
}
