//! The transport collaborator contract

use async_trait::async_trait;
use bytes::Bytes;
use cosem_core::error::{DlmsError, DlmsResult};

/// A physical channel to a meter
///
/// Implementations own the socket or port; the protocol layers above only
/// ever exchange byte chunks through this interface.
#[async_trait]
pub trait Transport: Send {
    /// Open the physical channel
    async fn connect(&mut self) -> DlmsResult<()>;

    /// Close the physical channel
    async fn disconnect(&mut self) -> DlmsResult<()>;

    fn is_connected(&self) -> bool;

    /// Record the client and logical server ids this channel serves
    ///
    /// The server address is a logical DLMS server, usually 1.
    fn set_address(&mut self, client: u8, server: u8);

    /// Transmit one HDLC frame or APDU payload
    async fn send(&mut self, data: &[u8]) -> DlmsResult<()>;

    /// Pull the next inbound byte chunk
    async fn receive(&mut self) -> DlmsResult<Bytes>;

    /// Broadcast capability; optional
    async fn send_broadcast(&mut self, _data: &[u8]) -> DlmsResult<()> {
        Err(DlmsError::CommunicationError(
            "this transport does not support broadcast".into(),
        ))
    }
}
