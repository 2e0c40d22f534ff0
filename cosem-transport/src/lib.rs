//! Transport boundary for DLMS/COSEM
//!
//! The protocol core consumes and produces byte slices and never touches a
//! port itself. This crate defines the collaborator contract the core is
//! driven through, plus a TCP implementation for meters reachable over
//! TCP/IP gateways.

pub mod tcp;
pub mod transport;

pub use cosem_core::error::{DlmsError, DlmsResult};
pub use tcp::{TcpSettings, TcpTransport};
pub use transport::Transport;
