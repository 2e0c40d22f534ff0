//! Sans-IO connection object
//!
//! Owns the HDLC link and the DLMS session state machines. Outbound: a
//! typed request is validated against the current state, serialised and
//! wrapped in an information frame. Inbound: bytes are parsed as a frame,
//! the checksums verified, the payload dispatched by tag and both state
//! machines advanced. Not safe to share across threads; a caller that
//! needs concurrency wraps the connection in a mutex or dedicates a task
//! per meter.

use cosem_application::acse::{
    ApplicationAssociationRequest, ApplicationAssociationResponse, ReleaseRequest,
    UserInformation, UserInformationContent,
};
use cosem_application::apdu::{parse_apdu, Apdu};
use cosem_application::cosem::{
    CosemAttributeDescriptor, CosemMethodDescriptor, SelectiveAccessDescriptor,
};
use cosem_application::enums::{
    AssociationResult, AuthenticationMechanism, ReleaseRequestReason,
};
use cosem_application::state::{DlmsConnectionState, DlmsEvent, DlmsState};
use cosem_application::xdlms::{
    ActionRequestNormal, Conformance, GetRequestNext, GetRequestNormal, InitiateRequest,
    InvokeIdAndPriority, SetRequestNormal,
};
use cosem_core::error::{DlmsError, DlmsResult};
use cosem_session::hdlc::{
    DisconnectFrame, HdlcAddress, HdlcConnectionState, HdlcFrame, InformationFrame, SnrmFrame,
};

/// Connection parameters chosen by the caller
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub client_address: u8,
    pub server_logical_address: u8,
    pub client_max_receive_pdu_size: u16,
    pub conformance: Conformance,
    /// Close the association with RLRQ/RLRE before dropping the link
    pub use_release: bool,
    pub authentication: Option<AuthenticationMechanism>,
    pub password: Option<Vec<u8>>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            client_address: 0x10,
            server_logical_address: 1,
            client_max_receive_pdu_size: 1024,
            conformance: Conformance::default_client(),
            use_release: true,
            authentication: None,
            password: None,
        }
    }
}

/// Parameters the server granted in its InitiateResponse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedParameters {
    pub conformance: Conformance,
    pub server_max_receive_pdu_size: u16,
    pub dlms_version: u8,
}

/// The DLMS client connection
pub struct DlmsConnection {
    settings: ConnectionSettings,
    link: HdlcConnectionState,
    session: DlmsConnectionState,
    send_sequence: u8,
    receive_sequence: u8,
    next_invoke_id: u8,
    negotiated: Option<NegotiatedParameters>,
    last_block_number: u32,
}

impl DlmsConnection {
    pub fn new(settings: ConnectionSettings) -> Self {
        Self {
            settings,
            link: HdlcConnectionState::new(),
            session: DlmsConnectionState::new(),
            send_sequence: 0,
            receive_sequence: 0,
            next_invoke_id: 1,
            negotiated: None,
            last_block_number: 0,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn link_state(&self) -> &HdlcConnectionState {
        &self.link
    }

    pub fn session_state(&self) -> DlmsState {
        self.session.current_state()
    }

    pub fn negotiated(&self) -> Option<&NegotiatedParameters> {
        self.negotiated.as_ref()
    }

    /// Block number of the most recently received data block
    pub fn last_block_number(&self) -> u32 {
        self.last_block_number
    }

    fn server_address(&self) -> DlmsResult<HdlcAddress> {
        HdlcAddress::server(self.settings.server_logical_address)
    }

    fn client_address(&self) -> DlmsResult<HdlcAddress> {
        HdlcAddress::client(self.settings.client_address)
    }

    fn next_invoke_id(&mut self) -> DlmsResult<InvokeIdAndPriority> {
        let id = self.next_invoke_id;
        self.next_invoke_id = (self.next_invoke_id + 1) & 0x0F;
        InvokeIdAndPriority::confirmed(id)
    }

    /// Bytes of the SNRM frame that opens the link
    pub fn snrm_bytes(&mut self) -> DlmsResult<Vec<u8>> {
        let frame = SnrmFrame::new(self.server_address()?, self.client_address()?);
        let bytes = frame.to_bytes()?;
        self.link.process_frame(cosem_session::hdlc::HdlcFrameKind::Snrm)?;
        self.send_sequence = 0;
        self.receive_sequence = 0;
        Ok(bytes)
    }

    /// Bytes of the DISC frame that closes the link
    pub fn disconnect_bytes(&mut self) -> DlmsResult<Vec<u8>> {
        let frame = DisconnectFrame::new(self.server_address()?, self.client_address()?);
        let bytes = frame.to_bytes()?;
        self.link
            .process_frame(cosem_session::hdlc::HdlcFrameKind::Disconnect)?;
        Ok(bytes)
    }

    /// Wrap an APDU in an information frame, advancing both state machines
    pub fn send_apdu(&mut self, apdu: &Apdu) -> DlmsResult<Vec<u8>> {
        let event = DlmsEvent::from_apdu(apdu)?;
        self.session.process_event(event)?;

        let frame = InformationFrame::new(
            self.server_address()?,
            self.client_address()?,
            apdu.to_bytes()?,
            self.send_sequence,
            self.receive_sequence,
            false,
            true,
        )?;
        let bytes = frame.to_bytes()?;
        self.link
            .process_frame(cosem_session::hdlc::HdlcFrameKind::Information)?;
        self.send_sequence = (self.send_sequence + 1) % 8;
        Ok(bytes)
    }

    /// Process inbound frame bytes into a parsed APDU
    ///
    /// Frames without a payload (UA, RR, DISC acknowledgements) advance the
    /// link state machine and yield `None`.
    pub fn receive_bytes(&mut self, bytes: &[u8]) -> DlmsResult<Option<Apdu>> {
        let frame = HdlcFrame::from_bytes(bytes)?;
        self.link.process_frame(frame.kind())?;

        if let HdlcFrame::Information(information) = &frame {
            self.receive_sequence = (information.send_sequence + 1) % 8;
        }

        let payload = frame.payload();
        if payload.is_empty() {
            return Ok(None);
        }

        let apdu = parse_apdu(payload)?;
        self.apply_inbound_apdu(&apdu)?;
        Ok(Some(apdu))
    }

    fn apply_inbound_apdu(&mut self, apdu: &Apdu) -> DlmsResult<()> {
        // A rejected AARE leaves the session state untouched; the caller
        // inspects the result and drops the connection to recover.
        if let Apdu::Aare(aare) = apdu {
            if aare.result != AssociationResult::Accepted {
                return Err(DlmsError::ApplicationAssociationError(format!(
                    "association rejected: {:?} ({:?})",
                    aare.result, aare.result_source_diagnostics
                )));
            }
            self.negotiated = Self::negotiated_from_aare(aare);
        }

        if let Apdu::GetResponseWithDataBlock(block) = apdu {
            self.last_block_number = block.block_number;
        }
        if let Apdu::GetResponseLastBlock(block) = apdu {
            self.last_block_number = block.block_number;
        }

        let event = DlmsEvent::from_apdu(apdu)?;
        self.session.process_event(event)
    }

    fn negotiated_from_aare(
        aare: &ApplicationAssociationResponse,
    ) -> Option<NegotiatedParameters> {
        match &aare.user_information {
            Some(UserInformation {
                content: UserInformationContent::InitiateResponse(response),
            }) => Some(NegotiatedParameters {
                conformance: response.negotiated_conformance,
                server_max_receive_pdu_size: response.server_max_receive_pdu_size,
                dlms_version: response.negotiated_dlms_version_number,
            }),
            _ => None,
        }
    }

    /// The AARQ opening the application association, framed and sequenced
    pub fn aarq_bytes(&mut self) -> DlmsResult<Vec<u8>> {
        let initiate = InitiateRequest::new(
            self.settings.conformance,
            self.settings.client_max_receive_pdu_size,
        );
        let aarq = ApplicationAssociationRequest::new(
            UserInformation::initiate_request(initiate),
            self.settings.authentication,
            false,
            self.settings.password.clone(),
        );
        self.send_apdu(&Apdu::Aarq(aarq))
    }

    fn check_conformance(&self, wanted: &str, granted: bool) -> DlmsResult<()> {
        // before negotiation completes the proposed conformance applies
        if self.negotiated.is_some() && !granted {
            return Err(DlmsError::ConformanceError(format!(
                "negotiated conformance does not allow {}",
                wanted
            )));
        }
        Ok(())
    }

    fn granted_conformance(&self) -> Conformance {
        self.negotiated
            .map(|parameters| parameters.conformance)
            .unwrap_or(self.settings.conformance)
    }

    /// Frame a normal GET request
    pub fn get_request_bytes(
        &mut self,
        attribute: CosemAttributeDescriptor,
        access_selection: Option<SelectiveAccessDescriptor>,
    ) -> DlmsResult<(InvokeIdAndPriority, Vec<u8>)> {
        self.check_conformance("get", self.granted_conformance().get)?;
        if access_selection.is_some() {
            self.check_conformance(
                "selective access",
                self.granted_conformance().selective_access,
            )?;
        }
        let invoke = self.next_invoke_id()?;
        let request = GetRequestNormal::new(invoke, attribute, access_selection);
        let bytes = self.send_apdu(&Apdu::GetRequestNormal(request))?;
        Ok((invoke, bytes))
    }

    /// Frame the acknowledgement of the most recent data block
    pub fn get_next_bytes(
        &mut self,
        invoke: InvokeIdAndPriority,
    ) -> DlmsResult<Vec<u8>> {
        let request = GetRequestNext::new(invoke, self.last_block_number);
        self.send_apdu(&Apdu::GetRequestNext(request))
    }

    /// Frame a normal SET request
    pub fn set_request_bytes(
        &mut self,
        attribute: CosemAttributeDescriptor,
        access_selection: Option<SelectiveAccessDescriptor>,
        data: Vec<u8>,
    ) -> DlmsResult<(InvokeIdAndPriority, Vec<u8>)> {
        self.check_conformance("set", self.granted_conformance().set)?;
        let invoke = self.next_invoke_id()?;
        let request = SetRequestNormal::new(invoke, attribute, access_selection, data);
        let bytes = self.send_apdu(&Apdu::SetRequestNormal(request))?;
        Ok((invoke, bytes))
    }

    /// Frame a normal ACTION request
    pub fn action_request_bytes(
        &mut self,
        method: CosemMethodDescriptor,
        data: Option<Vec<u8>>,
    ) -> DlmsResult<(InvokeIdAndPriority, Vec<u8>)> {
        self.check_conformance("action", self.granted_conformance().action)?;
        let invoke = self.next_invoke_id()?;
        let request = ActionRequestNormal::new(invoke, method, data);
        let bytes = self.send_apdu(&Apdu::ActionRequestNormal(request))?;
        Ok((invoke, bytes))
    }

    /// Frame the release request closing the association
    pub fn release_bytes(&mut self) -> DlmsResult<Vec<u8>> {
        if !self.settings.use_release {
            return Err(DlmsError::NoRlrqRlreError(
                "this connection skips RLRQ/RLRE; disconnect the link instead".into(),
            ));
        }
        let request = ReleaseRequest::new(Some(ReleaseRequestReason::Normal));
        self.send_apdu(&Apdu::Rlrq(request))
    }

    /// Signal locally that the association is over
    pub fn end_association(&mut self) -> DlmsResult<()> {
        self.session.process_event(DlmsEvent::EndAssociation)
    }

    /// Drop both state machines into their terminal states
    pub fn close(&mut self) {
        self.link.close();
        self.negotiated = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosem_application::acse::ReleaseResponse;
    use cosem_application::enums::CosemInterface;
    use cosem_application::xdlms::{GetResponseNormal, InitiateResponse};
    use cosem_core::datatypes::DataObject;
    use cosem_core::obis_code::ObisCode;
    use cosem_session::hdlc::{HdlcState, UaFrame};

    fn energy_attribute() -> CosemAttributeDescriptor {
        CosemAttributeDescriptor::new(
            CosemInterface::Register,
            ObisCode::from_string("1-0:1.8.0.255").unwrap(),
            2,
        )
    }

    fn server_to_client_information(connection: &DlmsConnection, payload: Vec<u8>) -> Vec<u8> {
        InformationFrame::new(
            HdlcAddress::client(connection.settings().client_address).unwrap(),
            HdlcAddress::server(connection.settings().server_logical_address).unwrap(),
            payload,
            0,
            1,
            false,
            true,
        )
        .unwrap()
        .to_bytes()
        .unwrap()
    }

    fn accepted_aare_bytes() -> Vec<u8> {
        use cosem_application::acse::base::ResultSourceDiagnostics;
        use cosem_application::enums::AcseServiceUserDiagnostics;

        ApplicationAssociationResponse::new(
            AssociationResult::Accepted,
            ResultSourceDiagnostics::AcseServiceUser(AcseServiceUserDiagnostics::Null),
            false,
            Some(UserInformation::initiate_response(InitiateResponse::new(
                Conformance::default_client(),
                1224,
            ))),
        )
        .to_bytes()
    }

    fn connected(settings: ConnectionSettings) -> DlmsConnection {
        let mut connection = DlmsConnection::new(settings);
        connection.snrm_bytes().unwrap();
        let ua = UaFrame::new(
            HdlcAddress::client(connection.settings().client_address).unwrap(),
            HdlcAddress::server(connection.settings().server_logical_address).unwrap(),
            Vec::new(),
        )
        .to_bytes()
        .unwrap();
        assert!(connection.receive_bytes(&ua).unwrap().is_none());
        connection
    }

    #[test]
    fn test_link_establishment() {
        let connection = connected(ConnectionSettings::default());
        assert_eq!(connection.link_state().current_state(), HdlcState::Idle);
    }

    #[test]
    fn test_association_sequence() {
        let mut connection = connected(ConnectionSettings::default());
        connection.aarq_bytes().unwrap();
        assert_eq!(
            connection.session_state(),
            DlmsState::AwaitingAssociationResponse
        );

        let aare = server_to_client_information(&connection, accepted_aare_bytes());
        let apdu = connection.receive_bytes(&aare).unwrap().unwrap();
        assert!(matches!(apdu, Apdu::Aare(_)));
        assert_eq!(connection.session_state(), DlmsState::Ready);
        assert_eq!(
            connection.negotiated().unwrap().server_max_receive_pdu_size,
            1224
        );
    }

    #[test]
    fn test_get_round_trip_updates_sequence_numbers() {
        let mut connection = connected(ConnectionSettings::default());
        connection.aarq_bytes().unwrap();
        let aare = server_to_client_information(&connection, accepted_aare_bytes());
        connection.receive_bytes(&aare).unwrap();

        let (invoke, request_bytes) = connection
            .get_request_bytes(energy_attribute(), None)
            .unwrap();
        // second I-frame from the client carries N(S)=1
        assert_eq!(
            InformationFrame::from_bytes(&request_bytes)
                .unwrap()
                .send_sequence,
            1
        );
        assert_eq!(connection.session_state(), DlmsState::AwaitingGetResponse);

        let response = GetResponseNormal::new(invoke, DataObject::DoubleLongUnsigned(42).to_bytes());
        let response_bytes = server_to_client_information(&connection, response.to_bytes());
        let apdu = connection.receive_bytes(&response_bytes).unwrap().unwrap();
        assert!(matches!(apdu, Apdu::GetResponseNormal(_)));
        assert_eq!(connection.session_state(), DlmsState::Ready);
    }

    #[test]
    fn test_get_refused_before_association() {
        let mut connection = connected(ConnectionSettings::default());
        let error = connection
            .get_request_bytes(energy_attribute(), None)
            .unwrap_err();
        assert!(matches!(error, DlmsError::LocalDlmsProtocolError { .. }));
    }

    #[test]
    fn test_release_flow() {
        let mut connection = connected(ConnectionSettings::default());
        connection.aarq_bytes().unwrap();
        let aare = server_to_client_information(&connection, accepted_aare_bytes());
        connection.receive_bytes(&aare).unwrap();

        connection.release_bytes().unwrap();
        assert_eq!(
            connection.session_state(),
            DlmsState::AwaitingReleaseResponse
        );
        let rlre = server_to_client_information(&connection, ReleaseResponse::new(None).to_bytes());
        connection.receive_bytes(&rlre).unwrap();
        assert_eq!(connection.session_state(), DlmsState::NoAssociation);
    }

    #[test]
    fn test_release_disabled() {
        let settings = ConnectionSettings {
            use_release: false,
            ..ConnectionSettings::default()
        };
        let mut connection = connected(settings);
        connection.aarq_bytes().unwrap();
        let aare = server_to_client_information(&connection, accepted_aare_bytes());
        connection.receive_bytes(&aare).unwrap();

        assert!(matches!(
            connection.release_bytes(),
            Err(DlmsError::NoRlrqRlreError(_))
        ));
    }

    #[test]
    fn test_rejected_aare_leaves_state() {
        use cosem_application::acse::base::ResultSourceDiagnostics;
        use cosem_application::enums::AcseServiceUserDiagnostics;

        let mut connection = connected(ConnectionSettings::default());
        connection.aarq_bytes().unwrap();

        let rejection = ApplicationAssociationResponse::new(
            AssociationResult::RejectedPermanent,
            ResultSourceDiagnostics::AcseServiceUser(
                AcseServiceUserDiagnostics::AuthenticationFailed,
            ),
            false,
            None,
        )
        .to_bytes();
        let bytes = server_to_client_information(&connection, rejection);
        let error = connection.receive_bytes(&bytes).unwrap_err();
        assert!(matches!(
            error,
            DlmsError::ApplicationAssociationError(_)
        ));
        assert_eq!(
            connection.session_state(),
            DlmsState::AwaitingAssociationResponse
        );
    }
}
