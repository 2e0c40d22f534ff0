//! Client-side DLMS/COSEM protocol stack
//!
//! Translates between application-level service requests (get/set/action on
//! metering objects) and the bytes on the wire exchanged with an
//! electricity meter. The caller owns the physical transport, drives the
//! connection and consumes parsed APDUs.
//!
//! # Architecture
//!
//! The workspace is layered bottom-up:
//!
//! - `cosem-core`: errors, OBIS codes, the DLMS data model
//! - `cosem-asn1`: BER and A-XDR codecs
//! - `cosem-session`: HDLC framing, check sequences, link state machine
//! - `cosem-application`: ACSE and xDLMS APDUs, APDU factory, DLMS state machine
//! - `cosem-transport`: the transport boundary and a TCP implementation
//! - `cosem-client`: the connection object and an async client
//!
//! # Usage
//!
//! ```no_run
//! use cosem::client::{ConnectionSettings, DlmsClient};
//! use cosem::transport::{TcpSettings, TcpTransport};
//!
//! # async fn run() -> cosem::DlmsResult<()> {
//! let transport = TcpTransport::new(TcpSettings::new("10.0.0.7", 4059));
//! let mut client = DlmsClient::new(transport, ConnectionSettings::default());
//! client.connect().await?;
//! client.associate().await?;
//! # Ok(())
//! # }
//! ```

pub use cosem_core::datatypes::*;
pub use cosem_core::{DlmsError, DlmsResult, ObisCode};

pub mod asn1 {
    pub use cosem_asn1::*;
}

pub mod session {
    pub use cosem_session::*;
}

pub mod application {
    pub use cosem_application::*;
}

pub mod transport {
    pub use cosem_transport::*;
}

pub mod client {
    pub use cosem_client::*;
}
