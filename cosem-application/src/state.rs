//! DLMS connection state machine
//!
//! Sequences association establishment, HLS authentication, data exchange,
//! GET block-transfer pacing and release. Events are either APDUs passing
//! through the connection or synthetic flow-control markers.

use cosem_core::error::{DlmsError, DlmsResult};

use crate::apdu::Apdu;

/// State of the DLMS connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlmsState {
    NoAssociation,
    AwaitingAssociationResponse,
    Ready,
    AwaitingReleaseResponse,
    AwaitingGetResponse,
    AwaitingGetBlockResponse,
    ShouldAckLastGetBlock,
    AwaitingSetResponse,
    AwaitingActionResponse,
    ShouldSendHlsServerChallengeResult,
    AwaitingHlsClientChallengeResult,
    HlsDone,
}

impl DlmsState {
    pub fn name(&self) -> &'static str {
        match self {
            DlmsState::NoAssociation => "NO_ASSOCIATION",
            DlmsState::AwaitingAssociationResponse => "AWAITING_ASSOCIATION_RESPONSE",
            DlmsState::Ready => "READY",
            DlmsState::AwaitingReleaseResponse => "AWAITING_RELEASE_RESPONSE",
            DlmsState::AwaitingGetResponse => "AWAITING_GET_RESPONSE",
            DlmsState::AwaitingGetBlockResponse => "AWAITING_GET_BLOCK_RESPONSE",
            DlmsState::ShouldAckLastGetBlock => "SHOULD_ACK_LAST_GET_BLOCK",
            DlmsState::AwaitingSetResponse => "AWAITING_SET_RESPONSE",
            DlmsState::AwaitingActionResponse => "AWAITING_ACTION_RESPONSE",
            DlmsState::ShouldSendHlsServerChallengeResult => {
                "SHOULD_SEND_HLS_SERVER_CHALLENGE_RESULT"
            }
            DlmsState::AwaitingHlsClientChallengeResult => "AWAITING_HLS_CLIENT_CHALLENGE_RESULT",
            DlmsState::HlsDone => "HLS_DONE",
        }
    }
}

/// Events driving the connection state machine
///
/// A data-block response whose last-block flag is set counts as the
/// last-block event, so only not-last blocks enter the ack cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DlmsEvent {
    Aarq,
    Aare,
    Rlrq,
    Rlre,
    ExceptionResponse,
    DataNotification,
    GetRequestNormal,
    GetRequestNext,
    GetRequestWithList,
    GetResponseNormal,
    GetResponseNormalWithError,
    GetResponseWithDataBlock,
    GetResponseLastBlock,
    GetResponseLastBlockWithError,
    SetRequestNormal,
    SetResponseNormal,
    ActionRequestNormal,
    ActionResponseNormal,
    ActionResponseNormalWithData,
    ActionResponseNormalWithError,
    /// Start the HLS challenge-response sequence
    HlsStart,
    /// The server challenge result verified
    HlsSuccess,
    /// The server challenge result did not verify
    HlsFailed,
    /// Give up on an association attempt
    RejectAssociation,
    /// Tear down the association locally
    EndAssociation,
}

impl DlmsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DlmsEvent::Aarq => "AARQ",
            DlmsEvent::Aare => "AARE",
            DlmsEvent::Rlrq => "RLRQ",
            DlmsEvent::Rlre => "RLRE",
            DlmsEvent::ExceptionResponse => "ExceptionResponse",
            DlmsEvent::DataNotification => "DataNotification",
            DlmsEvent::GetRequestNormal => "GetRequestNormal",
            DlmsEvent::GetRequestNext => "GetRequestNext",
            DlmsEvent::GetRequestWithList => "GetRequestWithList",
            DlmsEvent::GetResponseNormal => "GetResponseNormal",
            DlmsEvent::GetResponseNormalWithError => "GetResponseNormalWithError",
            DlmsEvent::GetResponseWithDataBlock => "GetResponseWithDataBlock",
            DlmsEvent::GetResponseLastBlock => "GetResponseLastBlock",
            DlmsEvent::GetResponseLastBlockWithError => "GetResponseLastBlockWithError",
            DlmsEvent::SetRequestNormal => "SetRequestNormal",
            DlmsEvent::SetResponseNormal => "SetResponseNormal",
            DlmsEvent::ActionRequestNormal => "ActionRequestNormal",
            DlmsEvent::ActionResponseNormal => "ActionResponseNormal",
            DlmsEvent::ActionResponseNormalWithData => "ActionResponseNormalWithData",
            DlmsEvent::ActionResponseNormalWithError => "ActionResponseNormalWithError",
            DlmsEvent::HlsStart => "HlsStart",
            DlmsEvent::HlsSuccess => "HlsSuccess",
            DlmsEvent::HlsFailed => "HlsFailed",
            DlmsEvent::RejectAssociation => "RejectAssociation",
            DlmsEvent::EndAssociation => "EndAssociation",
        }
    }

    /// Classify an APDU as a state machine event
    pub fn from_apdu(apdu: &Apdu) -> DlmsResult<Self> {
        match apdu {
            Apdu::Aarq(_) => Ok(DlmsEvent::Aarq),
            Apdu::Aare(_) => Ok(DlmsEvent::Aare),
            Apdu::Rlrq(_) => Ok(DlmsEvent::Rlrq),
            Apdu::Rlre(_) => Ok(DlmsEvent::Rlre),
            Apdu::ExceptionResponse(_) => Ok(DlmsEvent::ExceptionResponse),
            Apdu::DataNotification(_) => Ok(DlmsEvent::DataNotification),
            Apdu::GetRequestNormal(_) => Ok(DlmsEvent::GetRequestNormal),
            Apdu::GetRequestNext(_) => Ok(DlmsEvent::GetRequestNext),
            Apdu::GetRequestWithList(_) => Ok(DlmsEvent::GetRequestWithList),
            Apdu::GetResponseNormal(_) => Ok(DlmsEvent::GetResponseNormal),
            Apdu::GetResponseNormalWithError(_) => Ok(DlmsEvent::GetResponseNormalWithError),
            Apdu::GetResponseWithDataBlock(block) => {
                if block.last_block {
                    Ok(DlmsEvent::GetResponseLastBlock)
                } else {
                    Ok(DlmsEvent::GetResponseWithDataBlock)
                }
            }
            Apdu::GetResponseLastBlock(_) => Ok(DlmsEvent::GetResponseLastBlock),
            Apdu::GetResponseLastBlockWithError(_) => Ok(DlmsEvent::GetResponseLastBlockWithError),
            Apdu::SetRequestNormal(_) => Ok(DlmsEvent::SetRequestNormal),
            Apdu::SetResponseNormal(_) => Ok(DlmsEvent::SetResponseNormal),
            Apdu::ActionRequestNormal(_) => Ok(DlmsEvent::ActionRequestNormal),
            Apdu::ActionResponseNormal(_) => Ok(DlmsEvent::ActionResponseNormal),
            Apdu::ActionResponseNormalWithData(_) => Ok(DlmsEvent::ActionResponseNormalWithData),
            Apdu::ActionResponseNormalWithError(_) => Ok(DlmsEvent::ActionResponseNormalWithError),
            Apdu::GetResponseWithList(_) => Err(DlmsError::InvalidData(
                "GetResponseWithList has no state machine arc yet".into(),
            )),
            Apdu::InitiateRequest(_)
            | Apdu::InitiateResponse(_)
            | Apdu::GlobalCipherInitiateRequest(_)
            | Apdu::GlobalCipherInitiateResponse(_) => Err(DlmsError::InvalidData(
                "initiate negotiation travels inside the association APDUs".into(),
            )),
        }
    }
}

/// Tracks state changes of the DLMS connection
///
/// Every APDU sent or received, plus the synthetic flow-control events, is
/// passed through [`process_event`]. An event with no arc from the current
/// state raises a protocol error and leaves the state untouched;
/// transitions are atomic.
///
/// [`process_event`]: DlmsConnectionState::process_event
#[derive(Debug)]
pub struct DlmsConnectionState {
    current_state: DlmsState,
}

impl DlmsConnectionState {
    pub fn new() -> Self {
        Self {
            current_state: DlmsState::NoAssociation,
        }
    }

    pub fn with_state(state: DlmsState) -> Self {
        Self {
            current_state: state,
        }
    }

    pub fn current_state(&self) -> DlmsState {
        self.current_state
    }

    /// Advance the state machine
    pub fn process_event(&mut self, event: DlmsEvent) -> DlmsResult<()> {
        use DlmsEvent as E;
        use DlmsState as S;

        let new_state = match (self.current_state, event) {
            (S::NoAssociation, E::Aarq) => S::AwaitingAssociationResponse,

            (S::AwaitingAssociationResponse, E::Aare) => S::Ready,
            (S::AwaitingAssociationResponse, E::ExceptionResponse) => S::NoAssociation,

            (S::Ready, E::Rlrq) => S::AwaitingReleaseResponse,
            (S::Ready, E::GetRequestNormal) => S::AwaitingGetResponse,
            (S::Ready, E::GetRequestWithList) => S::AwaitingGetResponse,
            (S::Ready, E::SetRequestNormal) => S::AwaitingSetResponse,
            (S::Ready, E::ActionRequestNormal) => S::AwaitingActionResponse,
            (S::Ready, E::HlsStart) => S::ShouldSendHlsServerChallengeResult,
            (S::Ready, E::DataNotification) => S::Ready,
            (S::Ready, E::RejectAssociation) => S::NoAssociation,
            (S::Ready, E::EndAssociation) => S::NoAssociation,

            (S::ShouldSendHlsServerChallengeResult, E::ActionRequestNormal) => {
                S::AwaitingHlsClientChallengeResult
            }
            (S::AwaitingHlsClientChallengeResult, E::ActionResponseNormalWithData) => S::HlsDone,
            (S::AwaitingHlsClientChallengeResult, E::ActionResponseNormal) => S::NoAssociation,
            (S::AwaitingHlsClientChallengeResult, E::ActionResponseNormalWithError) => {
                S::NoAssociation
            }
            (S::HlsDone, E::HlsSuccess) => S::Ready,
            (S::HlsDone, E::HlsFailed) => S::NoAssociation,

            (S::AwaitingGetResponse, E::GetResponseNormal) => S::Ready,
            (S::AwaitingGetResponse, E::GetResponseNormalWithError) => S::Ready,
            (S::AwaitingGetResponse, E::GetResponseWithDataBlock) => S::ShouldAckLastGetBlock,
            (S::AwaitingGetResponse, E::GetResponseLastBlock) => S::Ready,
            (S::AwaitingGetResponse, E::GetResponseLastBlockWithError) => S::Ready,
            (S::AwaitingGetResponse, E::ExceptionResponse) => S::Ready,

            (S::ShouldAckLastGetBlock, E::GetRequestNext) => S::AwaitingGetBlockResponse,

            (S::AwaitingGetBlockResponse, E::GetResponseWithDataBlock) => S::ShouldAckLastGetBlock,
            (S::AwaitingGetBlockResponse, E::GetResponseLastBlock) => S::Ready,
            (S::AwaitingGetBlockResponse, E::GetResponseLastBlockWithError) => S::Ready,
            (S::AwaitingGetBlockResponse, E::GetResponseNormalWithError) => S::Ready,
            (S::AwaitingGetBlockResponse, E::ExceptionResponse) => S::Ready,

            (S::AwaitingSetResponse, E::SetResponseNormal) => S::Ready,

            (S::AwaitingActionResponse, E::ActionResponseNormal) => S::Ready,
            (S::AwaitingActionResponse, E::ActionResponseNormalWithData) => S::Ready,
            (S::AwaitingActionResponse, E::ActionResponseNormalWithError) => S::Ready,

            (S::AwaitingReleaseResponse, E::Rlre) => S::NoAssociation,
            (S::AwaitingReleaseResponse, E::ExceptionResponse) => S::Ready,

            (state, event) => {
                return Err(DlmsError::LocalDlmsProtocolError {
                    state: state.name(),
                    event: event.name(),
                })
            }
        };

        log::debug!(
            "DLMS connection: {} --{}--> {}",
            self.current_state.name(),
            event.name(),
            new_state.name()
        );
        self.current_state = new_state;
        Ok(())
    }
}

impl Default for DlmsConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DlmsEvent as E;
    use DlmsState as S;

    const ALL_STATES: [DlmsState; 12] = [
        S::NoAssociation,
        S::AwaitingAssociationResponse,
        S::Ready,
        S::AwaitingReleaseResponse,
        S::AwaitingGetResponse,
        S::AwaitingGetBlockResponse,
        S::ShouldAckLastGetBlock,
        S::AwaitingSetResponse,
        S::AwaitingActionResponse,
        S::ShouldSendHlsServerChallengeResult,
        S::AwaitingHlsClientChallengeResult,
        S::HlsDone,
    ];

    const ALL_EVENTS: [DlmsEvent; 25] = [
        E::Aarq,
        E::Aare,
        E::Rlrq,
        E::Rlre,
        E::ExceptionResponse,
        E::DataNotification,
        E::GetRequestNormal,
        E::GetRequestNext,
        E::GetRequestWithList,
        E::GetResponseNormal,
        E::GetResponseNormalWithError,
        E::GetResponseWithDataBlock,
        E::GetResponseLastBlock,
        E::GetResponseLastBlockWithError,
        E::SetRequestNormal,
        E::SetResponseNormal,
        E::ActionRequestNormal,
        E::ActionResponseNormal,
        E::ActionResponseNormalWithData,
        E::ActionResponseNormalWithError,
        E::HlsStart,
        E::HlsSuccess,
        E::HlsFailed,
        E::RejectAssociation,
        E::EndAssociation,
    ];

    fn accepted(state: DlmsState, event: DlmsEvent) -> Option<DlmsState> {
        let mut machine = DlmsConnectionState::with_state(state);
        machine
            .process_event(event)
            .ok()
            .map(|_| machine.current_state())
    }

    fn transition_table() -> Vec<(DlmsState, DlmsEvent, DlmsState)> {
        vec![
            (S::NoAssociation, E::Aarq, S::AwaitingAssociationResponse),
            (S::AwaitingAssociationResponse, E::Aare, S::Ready),
            (
                S::AwaitingAssociationResponse,
                E::ExceptionResponse,
                S::NoAssociation,
            ),
            (S::Ready, E::Rlrq, S::AwaitingReleaseResponse),
            (S::Ready, E::GetRequestNormal, S::AwaitingGetResponse),
            (S::Ready, E::GetRequestWithList, S::AwaitingGetResponse),
            (S::Ready, E::SetRequestNormal, S::AwaitingSetResponse),
            (S::Ready, E::ActionRequestNormal, S::AwaitingActionResponse),
            (S::Ready, E::HlsStart, S::ShouldSendHlsServerChallengeResult),
            (S::Ready, E::DataNotification, S::Ready),
            (S::Ready, E::RejectAssociation, S::NoAssociation),
            (S::Ready, E::EndAssociation, S::NoAssociation),
            (
                S::ShouldSendHlsServerChallengeResult,
                E::ActionRequestNormal,
                S::AwaitingHlsClientChallengeResult,
            ),
            (
                S::AwaitingHlsClientChallengeResult,
                E::ActionResponseNormalWithData,
                S::HlsDone,
            ),
            (
                S::AwaitingHlsClientChallengeResult,
                E::ActionResponseNormal,
                S::NoAssociation,
            ),
            (
                S::AwaitingHlsClientChallengeResult,
                E::ActionResponseNormalWithError,
                S::NoAssociation,
            ),
            (S::HlsDone, E::HlsSuccess, S::Ready),
            (S::HlsDone, E::HlsFailed, S::NoAssociation),
            (S::AwaitingGetResponse, E::GetResponseNormal, S::Ready),
            (
                S::AwaitingGetResponse,
                E::GetResponseNormalWithError,
                S::Ready,
            ),
            (
                S::AwaitingGetResponse,
                E::GetResponseWithDataBlock,
                S::ShouldAckLastGetBlock,
            ),
            (S::AwaitingGetResponse, E::GetResponseLastBlock, S::Ready),
            (
                S::AwaitingGetResponse,
                E::GetResponseLastBlockWithError,
                S::Ready,
            ),
            (S::AwaitingGetResponse, E::ExceptionResponse, S::Ready),
            (
                S::ShouldAckLastGetBlock,
                E::GetRequestNext,
                S::AwaitingGetBlockResponse,
            ),
            (
                S::AwaitingGetBlockResponse,
                E::GetResponseWithDataBlock,
                S::ShouldAckLastGetBlock,
            ),
            (
                S::AwaitingGetBlockResponse,
                E::GetResponseLastBlock,
                S::Ready,
            ),
            (
                S::AwaitingGetBlockResponse,
                E::GetResponseLastBlockWithError,
                S::Ready,
            ),
            (
                S::AwaitingGetBlockResponse,
                E::GetResponseNormalWithError,
                S::Ready,
            ),
            (S::AwaitingGetBlockResponse, E::ExceptionResponse, S::Ready),
            (S::AwaitingSetResponse, E::SetResponseNormal, S::Ready),
            (S::AwaitingActionResponse, E::ActionResponseNormal, S::Ready),
            (
                S::AwaitingActionResponse,
                E::ActionResponseNormalWithData,
                S::Ready,
            ),
            (
                S::AwaitingActionResponse,
                E::ActionResponseNormalWithError,
                S::Ready,
            ),
            (S::AwaitingReleaseResponse, E::Rlre, S::NoAssociation),
            (S::AwaitingReleaseResponse, E::ExceptionResponse, S::Ready),
        ]
    }

    #[test]
    fn test_accepted_set_matches_transition_table() {
        let table = transition_table();
        for state in ALL_STATES {
            for event in ALL_EVENTS {
                let arc = table
                    .iter()
                    .find(|(from, with, _)| *from == state && *with == event)
                    .map(|(_, _, to)| *to);
                assert_eq!(
                    accepted(state, event),
                    arc,
                    "state {:?} event {:?}",
                    state,
                    event
                );
            }
        }
    }

    #[test]
    fn test_association_and_get_cycle() {
        let mut machine = DlmsConnectionState::new();
        machine.process_event(E::Aarq).unwrap();
        machine.process_event(E::Aare).unwrap();
        machine.process_event(E::GetRequestNormal).unwrap();
        machine.process_event(E::GetResponseNormal).unwrap();
        assert_eq!(machine.current_state(), S::Ready);
    }

    #[test]
    fn test_block_transfer_cycle() {
        let mut machine = DlmsConnectionState::with_state(S::AwaitingGetResponse);
        machine.process_event(E::GetResponseWithDataBlock).unwrap();
        assert_eq!(machine.current_state(), S::ShouldAckLastGetBlock);
        machine.process_event(E::GetRequestNext).unwrap();
        assert_eq!(machine.current_state(), S::AwaitingGetBlockResponse);
        machine.process_event(E::GetResponseLastBlock).unwrap();
        assert_eq!(machine.current_state(), S::Ready);
    }

    #[test]
    fn test_new_get_refused_during_block_transfer() {
        let mut machine = DlmsConnectionState::with_state(S::ShouldAckLastGetBlock);
        let error = machine.process_event(E::GetRequestNormal).unwrap_err();
        assert!(matches!(error, DlmsError::LocalDlmsProtocolError { .. }));
        assert_eq!(machine.current_state(), S::ShouldAckLastGetBlock);
    }

    #[test]
    fn test_hls_handshake() {
        let mut machine = DlmsConnectionState::with_state(S::Ready);
        machine.process_event(E::HlsStart).unwrap();
        machine.process_event(E::ActionRequestNormal).unwrap();
        machine
            .process_event(E::ActionResponseNormalWithData)
            .unwrap();
        assert_eq!(machine.current_state(), S::HlsDone);
        machine.process_event(E::HlsSuccess).unwrap();
        assert_eq!(machine.current_state(), S::Ready);
    }

    #[test]
    fn test_hls_failure_paths() {
        let mut machine = DlmsConnectionState::with_state(S::AwaitingHlsClientChallengeResult);
        machine.process_event(E::ActionResponseNormal).unwrap();
        assert_eq!(machine.current_state(), S::NoAssociation);

        let mut machine = DlmsConnectionState::with_state(S::HlsDone);
        machine.process_event(E::HlsFailed).unwrap();
        assert_eq!(machine.current_state(), S::NoAssociation);
    }

    #[test]
    fn test_release_exchange() {
        let mut machine = DlmsConnectionState::with_state(S::Ready);
        machine.process_event(E::Rlrq).unwrap();
        machine.process_event(E::Rlre).unwrap();
        assert_eq!(machine.current_state(), S::NoAssociation);
    }

    #[test]
    fn test_release_refused_keeps_association() {
        let mut machine = DlmsConnectionState::with_state(S::AwaitingReleaseResponse);
        machine.process_event(E::ExceptionResponse).unwrap();
        assert_eq!(machine.current_state(), S::Ready);
    }

    #[test]
    fn test_last_block_apdu_classification() {
        use crate::xdlms::{GetResponseWithDataBlock, InvokeIdAndPriority};

        let invoke = InvokeIdAndPriority::confirmed(1).unwrap();
        let not_last = Apdu::GetResponseWithDataBlock(GetResponseWithDataBlock::new(
            invoke,
            false,
            1,
            vec![0xAB],
        ));
        assert_eq!(
            DlmsEvent::from_apdu(&not_last).unwrap(),
            E::GetResponseWithDataBlock
        );

        let last = Apdu::GetResponseWithDataBlock(GetResponseWithDataBlock::new(
            invoke,
            true,
            2,
            vec![0xAB],
        ));
        assert_eq!(DlmsEvent::from_apdu(&last).unwrap(), E::GetResponseLastBlock);
    }
}
