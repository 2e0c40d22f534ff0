//! HDLC address encoding and parsing
//!
//! A client address is always one byte. A server address has a logical part
//! and an optional physical part for multi-drop configurations; each part is
//! seven bits wide here. Every emitted address byte is the value shifted
//! left by one, and the least significant bit of the terminal byte is set to
//! mark the end of the address.

use cosem_core::error::{DlmsError, DlmsResult};
use std::fmt;

/// Reserved HDLC address values
pub mod reserved {
    /// Guaranteed to be received by no one
    pub const NO_STATION: u8 = 0x00;
    /// Client management process
    pub const CLIENT_MANAGEMENT_PROCESS: u8 = 0x01;
    /// Public client
    pub const CLIENT_PUBLIC: u8 = 0x10;
    /// All-station (broadcast)
    pub const ALL_STATION: u8 = 0x7F;
    /// Server management logical device
    pub const SERVER_MANAGEMENT_LOGICAL_DEVICE: u8 = 0x01;
    /// Calling physical device (one-byte form)
    pub const SERVER_CALLING_PHYSICAL: u8 = 0x7E;
}

const MAX_ADDRESS: u8 = 0x7F;

/// Role of the station an address names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressRole {
    Client,
    Server,
}

/// HDLC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HdlcAddress {
    logical: u8,
    physical: Option<u8>,
    role: AddressRole,
    extended_addressing: bool,
}

impl HdlcAddress {
    pub fn new(
        logical: u8,
        physical: Option<u8>,
        role: AddressRole,
        extended_addressing: bool,
    ) -> DlmsResult<Self> {
        validate_component(logical)?;
        if let Some(physical) = physical {
            validate_component(physical)?;
        }
        Ok(Self {
            logical,
            physical,
            role,
            extended_addressing,
        })
    }

    /// One-byte client address
    pub fn client(logical: u8) -> DlmsResult<Self> {
        Self::new(logical, None, AddressRole::Client, false)
    }

    /// Server address with just a logical part
    pub fn server(logical: u8) -> DlmsResult<Self> {
        Self::new(logical, None, AddressRole::Server, false)
    }

    /// Server address with logical and physical parts
    pub fn server_with_physical(logical: u8, physical: u8) -> DlmsResult<Self> {
        Self::new(logical, Some(physical), AddressRole::Server, false)
    }

    pub fn logical(&self) -> u8 {
        self.logical
    }

    pub fn physical(&self) -> Option<u8> {
        self.physical
    }

    pub fn role(&self) -> AddressRole {
        self.role
    }

    /// Number of bytes this address occupies on the wire
    pub fn length(&self) -> usize {
        self.to_bytes().len()
    }

    /// Encode the address
    ///
    /// Zero bytes are elided unless extended addressing is set, so the
    /// emitted form is 1, 2 or 4 bytes with exactly one terminal bit.
    pub fn to_bytes(&self) -> Vec<u8> {
        let raw: Vec<u8> = match self.role {
            AddressRole::Client => vec![(self.logical << 1) | 0b0000_0001],
            AddressRole::Server => {
                let logical_lower = self.logical << 1;
                match self.physical {
                    Some(physical) => {
                        let physical_lower = (physical << 1) | 0b0000_0001;
                        vec![0, logical_lower, 0, physical_lower]
                    }
                    None => vec![0, logical_lower | 0b0000_0001],
                }
            }
        };

        raw.into_iter()
            .filter(|&byte| byte != 0 || self.extended_addressing)
            .collect()
    }
}

fn validate_component(value: u8) -> DlmsResult<()> {
    if value > MAX_ADDRESS {
        return Err(DlmsError::InvalidData(format!(
            "HDLC address component must be between 0 and 127, got {}",
            value
        )));
    }
    Ok(())
}

impl fmt::Display for HdlcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.physical {
            Some(physical) => write!(f, "{}/{}", self.logical, physical),
            None => write!(f, "{}", self.logical),
        }
    }
}

/// Raw address data recovered from a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAddress {
    pub logical: u16,
    pub physical: Option<u16>,
    pub length: usize,
}

impl RawAddress {
    fn into_address(self, role: AddressRole, extended: bool) -> DlmsResult<HdlcAddress> {
        HdlcAddress::new(
            narrow_or_err(self.logical)?,
            self.physical.map(narrow_or_err).transpose()?,
            role,
            extended,
        )
    }
}

/// Recover the destination address from whole-frame bytes
pub fn destination_from_frame(frame: &[u8], role: AddressRole) -> DlmsResult<HdlcAddress> {
    let (destination, _) = find_addresses_in_frame(frame)?;
    destination.into_address(role, false)
}

/// Recover the source address from whole-frame bytes
///
/// A four-byte source keeps its extended encoding on re-encode.
pub fn source_from_frame(frame: &[u8], role: AddressRole) -> DlmsResult<HdlcAddress> {
    let (_, source) = find_addresses_in_frame(frame)?;
    let extended = source.length == 4;
    source.into_address(role, extended)
}

fn narrow_or_err(value: u16) -> DlmsResult<u8> {
    if value > u16::from(MAX_ADDRESS) {
        return Err(DlmsError::InvalidData(format!(
            "HDLC address component must be between 0 and 127, got {}",
            value
        )));
    }
    Ok(value as u8)
}

/// Locate the destination and source addresses in whole-frame bytes
///
/// Addresses start at offset 3 (after the opening flag and the two format
/// bytes). Each can be 1, 2 or 4 bytes; the terminal byte is the one whose
/// least significant bit is set.
pub fn find_addresses_in_frame(frame: &[u8]) -> DlmsResult<(RawAddress, RawAddress)> {
    if frame.len() < 5 {
        return Err(DlmsError::insufficient(5, frame.len()));
    }

    let destination = scan_address(frame, 3)?;
    let source = scan_address(frame, 3 + destination.length)?;
    Ok((destination, source))
}

fn scan_address(frame: &[u8], start: usize) -> DlmsResult<RawAddress> {
    let mut length = None;
    for candidate in [1usize, 2, 4] {
        let terminal = start + candidate - 1;
        if terminal >= frame.len() {
            break;
        }
        if frame[terminal] & 0b0000_0001 != 0 {
            length = Some(candidate);
            break;
        }
    }
    let length = length.ok_or_else(|| {
        DlmsError::InvalidData("could not find a terminated HDLC address in frame".into())
    })?;

    if frame.len() < start + length {
        return Err(DlmsError::insufficient(start + length, frame.len()));
    }
    let bytes = &frame[start..start + length];

    let (logical, physical) = match length {
        1 => (u16::from(bytes[0] >> 1), None),
        2 => (u16::from(bytes[0] >> 1), Some(u16::from(bytes[1] >> 1))),
        4 => (
            parse_two_byte_address(&bytes[..2]),
            Some(parse_two_byte_address(&bytes[2..])),
        ),
        _ => unreachable!("address length is 1, 2 or 4"),
    };

    Ok(RawAddress {
        logical,
        physical,
        length,
    })
}

fn parse_two_byte_address(bytes: &[u8]) -> u16 {
    let upper = u16::from(bytes[0] >> 1);
    let lower = u16::from(bytes[1] >> 1);
    (upper << 7) | lower
}
