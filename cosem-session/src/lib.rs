//! HDLC session layer for DLMS/COSEM
//!
//! Frame construction and parsing, HDLC addressing, the two CRC-CCITT
//! check sequences and the link-layer connection state machine.

pub mod hdlc;

pub use cosem_core::error::{DlmsError, DlmsResult};
pub use hdlc::*;
