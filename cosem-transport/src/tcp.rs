//! TCP transport

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use cosem_core::error::{DlmsError, DlmsResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::transport::Transport;

/// Settings for a TCP connection to a meter or gateway
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl TcpSettings {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// Transport over a TCP stream
pub struct TcpTransport {
    settings: TcpSettings,
    stream: Option<TcpStream>,
    client_address: u8,
    server_address: u8,
}

impl TcpTransport {
    const READ_BUFFER_SIZE: usize = 2048;

    pub fn new(settings: TcpSettings) -> Self {
        Self {
            settings,
            stream: None,
            client_address: 0x10,
            server_address: 1,
        }
    }

    pub fn client_address(&self) -> u8 {
        self.client_address
    }

    pub fn server_address(&self) -> u8 {
        self.server_address
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> DlmsResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let address = format!("{}:{}", self.settings.host, self.settings.port);
        log::debug!("connecting to {}", address);
        let stream = timeout(self.settings.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| {
                DlmsError::CommunicationError(format!("connect to {} timed out", address))
            })??;
        stream.set_nodelay(true)?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) -> DlmsResult<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn set_address(&mut self, client: u8, server: u8) {
        self.client_address = client;
        self.server_address = server;
    }

    async fn send(&mut self, data: &[u8]) -> DlmsResult<()> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DlmsError::CommunicationError("transport is not connected".into()))?;
        log::debug!("sending {} bytes", data.len());
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn receive(&mut self) -> DlmsResult<Bytes> {
        let read_timeout = self.settings.read_timeout;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| DlmsError::CommunicationError("transport is not connected".into()))?;

        let mut buffer = vec![0u8; Self::READ_BUFFER_SIZE];
        let read = timeout(read_timeout, stream.read(&mut buffer))
            .await
            .map_err(|_| DlmsError::CommunicationError("read timed out".into()))??;
        if read == 0 {
            return Err(DlmsError::CommunicationError(
                "connection closed by remote".into(),
            ));
        }
        buffer.truncate(read);
        log::debug!("received {} bytes", read);
        Ok(Bytes::from(buffer))
    }
}
