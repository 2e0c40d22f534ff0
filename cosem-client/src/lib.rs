//! DLMS/COSEM client
//!
//! The sans-IO [`DlmsConnection`] owns both state machines and turns typed
//! requests into frame bytes and inbound bytes into parsed APDUs. The async
//! [`DlmsClient`] drives a connection over any [`cosem_transport::Transport`].

pub mod client;
pub mod connection;

pub use client::DlmsClient;
pub use connection::{ConnectionSettings, DlmsConnection, NegotiatedParameters};
pub use cosem_core::error::{DlmsError, DlmsResult};
