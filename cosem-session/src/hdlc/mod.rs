//! HDLC framing and link state

pub mod address;
pub mod crc;
pub mod fields;
pub mod frames;
pub mod state;

pub use address::{
    destination_from_frame, find_addresses_in_frame, source_from_frame, AddressRole, HdlcAddress,
};
pub use crc::{CrcCcitt, FCS, HCS};
pub use fields::{ControlField, FrameFormatField};
pub use frames::{
    DisconnectFrame, HdlcFrame, HdlcFrameKind, InformationFrame, ReceiveReadyFrame, SnrmFrame,
    UaFrame, HDLC_FLAG, LLC_COMMAND_HEADER, LLC_RESPONSE_HEADER,
};
pub use state::{HdlcConnectionState, HdlcState};
