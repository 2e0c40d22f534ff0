//! Async client driving a connection over a transport
//!
//! One request is in flight at a time; responses are matched to requests
//! by invoke id. Each call to the transport is expected to deliver one
//! whole HDLC frame, which serial and TCP gateways provide.

use cosem_application::apdu::Apdu;
use cosem_application::cosem::{
    CosemAttributeDescriptor, CosemMethodDescriptor, SelectiveAccessDescriptor,
};
use cosem_application::enums::{ActionResultStatus, DataAccessResult};
use cosem_application::xdlms::InvokeIdAndPriority;
use cosem_asn1::axdr;
use cosem_core::datatypes::DataObject;
use cosem_core::error::{DlmsError, DlmsResult};
use cosem_transport::Transport;

use crate::connection::{ConnectionSettings, DlmsConnection, NegotiatedParameters};

/// High-level DLMS client
pub struct DlmsClient<T: Transport> {
    transport: T,
    connection: DlmsConnection,
}

impl<T: Transport> DlmsClient<T> {
    pub fn new(mut transport: T, settings: ConnectionSettings) -> Self {
        transport.set_address(settings.client_address, settings.server_logical_address);
        Self {
            transport,
            connection: DlmsConnection::new(settings),
        }
    }

    pub fn connection(&self) -> &DlmsConnection {
        &self.connection
    }

    /// Open the transport and establish the HDLC link (SNRM/UA)
    pub async fn connect(&mut self) -> DlmsResult<()> {
        self.transport.connect().await?;
        let snrm = self.connection.snrm_bytes()?;
        self.transport.send(&snrm).await?;
        let response = self.transport.receive().await?;
        // the UA acknowledging SNRM has no payload
        if self.connection.receive_bytes(&response)?.is_some() {
            return Err(DlmsError::CommunicationError(
                "expected a UA frame to answer SNRM".into(),
            ));
        }
        Ok(())
    }

    /// Establish the application association (AARQ/AARE)
    pub async fn associate(&mut self) -> DlmsResult<Option<NegotiatedParameters>> {
        let aarq = self.connection.aarq_bytes()?;
        let apdu = self.exchange(aarq).await?;
        match apdu {
            Apdu::Aare(_) => Ok(self.connection.negotiated().copied()),
            other => Err(DlmsError::CommunicationError(format!(
                "expected an AARE, got {:?}",
                other
            ))),
        }
    }

    async fn exchange(&mut self, bytes: Vec<u8>) -> DlmsResult<Apdu> {
        self.transport.send(&bytes).await?;
        loop {
            let inbound = self.transport.receive().await?;
            if let Some(apdu) = self.connection.receive_bytes(&inbound)? {
                return Ok(apdu);
            }
        }
    }

    fn check_invoke_id(
        request: InvokeIdAndPriority,
        response: InvokeIdAndPriority,
    ) -> DlmsResult<()> {
        if request.invoke_id() != response.invoke_id() {
            return Err(DlmsError::DlmsClientError(format!(
                "response invoke id {} does not match request invoke id {}",
                response.invoke_id(),
                request.invoke_id()
            )));
        }
        Ok(())
    }

    /// Read one attribute, following block transfers to completion
    pub async fn get(
        &mut self,
        attribute: CosemAttributeDescriptor,
        access_selection: Option<SelectiveAccessDescriptor>,
    ) -> DlmsResult<DataObject> {
        let (invoke, request) = self
            .connection
            .get_request_bytes(attribute, access_selection)?;
        let mut apdu = self.exchange(request).await?;
        let mut assembled: Vec<u8> = Vec::new();

        loop {
            match apdu {
                Apdu::GetResponseNormal(response) => {
                    Self::check_invoke_id(invoke, response.invoke_id_and_priority)?;
                    return axdr::decode_data(&response.data);
                }
                Apdu::GetResponseNormalWithError(response) => {
                    Self::check_invoke_id(invoke, response.invoke_id_and_priority)?;
                    return Err(data_access_error(response.error));
                }
                Apdu::GetResponseWithDataBlock(block) => {
                    Self::check_invoke_id(invoke, block.invoke_id_and_priority)?;
                    assembled.extend_from_slice(&block.raw_data);
                    if block.last_block {
                        return axdr::decode_data(&assembled);
                    }
                    let next = self.connection.get_next_bytes(invoke)?;
                    apdu = self.exchange(next).await?;
                }
                Apdu::GetResponseLastBlock(block) => {
                    Self::check_invoke_id(invoke, block.invoke_id_and_priority)?;
                    assembled.extend_from_slice(&block.raw_data);
                    return axdr::decode_data(&assembled);
                }
                Apdu::GetResponseLastBlockWithError(block) => {
                    Self::check_invoke_id(invoke, block.invoke_id_and_priority)?;
                    return Err(data_access_error(block.error));
                }
                Apdu::ExceptionResponse(exception) => {
                    return Err(DlmsError::CommunicationError(format!(
                        "meter answered with an exception: {:?}",
                        exception
                    )))
                }
                other => {
                    return Err(DlmsError::CommunicationError(format!(
                        "unexpected answer to a GET request: {:?}",
                        other
                    )))
                }
            }
        }
    }

    /// Write one attribute
    pub async fn set(
        &mut self,
        attribute: CosemAttributeDescriptor,
        access_selection: Option<SelectiveAccessDescriptor>,
        value: &DataObject,
    ) -> DlmsResult<()> {
        let (invoke, request) =
            self.connection
                .set_request_bytes(attribute, access_selection, value.to_bytes())?;
        match self.exchange(request).await? {
            Apdu::SetResponseNormal(response) => {
                Self::check_invoke_id(invoke, response.invoke_id_and_priority)?;
                if response.result != DataAccessResult::Success {
                    return Err(data_access_error(response.result));
                }
                Ok(())
            }
            other => Err(DlmsError::CommunicationError(format!(
                "unexpected answer to a SET request: {:?}",
                other
            ))),
        }
    }

    /// Invoke one method, returning its optional result data
    pub async fn action(
        &mut self,
        method: CosemMethodDescriptor,
        parameters: Option<&DataObject>,
    ) -> DlmsResult<Option<DataObject>> {
        let (invoke, request) = self
            .connection
            .action_request_bytes(method, parameters.map(DataObject::to_bytes))?;
        match self.exchange(request).await? {
            Apdu::ActionResponseNormal(response) => {
                Self::check_invoke_id(invoke, response.invoke_id_and_priority)?;
                if response.status != ActionResultStatus::Success {
                    return Err(DlmsError::CommunicationError(format!(
                        "action failed with status {:?}",
                        response.status
                    )));
                }
                Ok(None)
            }
            Apdu::ActionResponseNormalWithData(response) => {
                Self::check_invoke_id(invoke, response.invoke_id_and_priority)?;
                Ok(Some(axdr::decode_data(&response.data)?))
            }
            Apdu::ActionResponseNormalWithError(response) => {
                Self::check_invoke_id(invoke, response.invoke_id_and_priority)?;
                Err(data_access_error(response.error))
            }
            other => Err(DlmsError::CommunicationError(format!(
                "unexpected answer to an ACTION request: {:?}",
                other
            ))),
        }
    }

    /// Release the association (RLRQ/RLRE)
    pub async fn release(&mut self) -> DlmsResult<()> {
        let request = self.connection.release_bytes()?;
        match self.exchange(request).await? {
            Apdu::Rlre(_) => Ok(()),
            other => Err(DlmsError::CommunicationError(format!(
                "expected an RLRE, got {:?}",
                other
            ))),
        }
    }

    /// Close the HDLC link (DISC/UA) and the transport
    pub async fn disconnect(&mut self) -> DlmsResult<()> {
        let disc = self.connection.disconnect_bytes()?;
        self.transport.send(&disc).await?;
        let response = self.transport.receive().await?;
        self.connection.receive_bytes(&response)?;
        self.transport.disconnect().await?;
        self.connection.close();
        Ok(())
    }
}

fn data_access_error(result: DataAccessResult) -> DlmsError {
    DlmsError::CommunicationError(format!("meter reported {:?}", result))
}
