//! HDLC link-layer connection state machine

use cosem_core::error::{DlmsError, DlmsResult};

use super::frames::HdlcFrameKind;

/// State of the HDLC link
///
/// ```text
/// NotConnected --SNRM--> AwaitingConnection --UA--> Idle
/// Idle         --I/RR--> AwaitingResponse   --I/RR--> Idle
/// Idle         --DISC--> AwaitingDisconnect --UA--> NotConnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdlcState {
    /// Session created but no HDLC connection established yet
    NotConnected,
    /// SNRM sent, waiting for the UA that opens the link
    AwaitingConnection,
    /// Connected with no exchange in flight
    Idle,
    /// An I or RR frame is in flight
    AwaitingResponse,
    /// DISC sent, waiting for the closing UA
    AwaitingDisconnect,
    /// Terminal state after the connection is dropped
    Closed,
}

impl HdlcState {
    pub fn name(&self) -> &'static str {
        match self {
            HdlcState::NotConnected => "NOT_CONNECTED",
            HdlcState::AwaitingConnection => "AWAITING_CONNECTION",
            HdlcState::Idle => "IDLE",
            HdlcState::AwaitingResponse => "AWAITING_RESPONSE",
            HdlcState::AwaitingDisconnect => "AWAITING_DISCONNECT",
            HdlcState::Closed => "CLOSED",
        }
    }
}

/// Tracks state changes of the HDLC link
///
/// Every sent or received frame is passed to [`process_frame`]; a frame with
/// no arc from the current state raises a link protocol error and leaves the
/// state untouched.
///
/// [`process_frame`]: HdlcConnectionState::process_frame
#[derive(Debug)]
pub struct HdlcConnectionState {
    current_state: HdlcState,
}

impl HdlcConnectionState {
    pub fn new() -> Self {
        Self {
            current_state: HdlcState::NotConnected,
        }
    }

    pub fn current_state(&self) -> HdlcState {
        self.current_state
    }

    /// Advance the state machine with a frame of the given kind
    pub fn process_frame(&mut self, frame_kind: HdlcFrameKind) -> DlmsResult<()> {
        use HdlcFrameKind::*;
        use HdlcState::*;

        let new_state = match (self.current_state, frame_kind) {
            (NotConnected, Snrm) => AwaitingConnection,
            (AwaitingConnection, Ua) => Idle,
            (Idle, Information) | (Idle, ReceiveReady) => AwaitingResponse,
            (Idle, Disconnect) => AwaitingDisconnect,
            (AwaitingResponse, Information) | (AwaitingResponse, ReceiveReady) => Idle,
            (AwaitingDisconnect, Ua) => NotConnected,
            (state, frame) => {
                return Err(DlmsError::LinkProtocolError {
                    state: state.name(),
                    frame_type: frame.name(),
                })
            }
        };

        log::debug!(
            "HDLC link: {} --{}--> {}",
            self.current_state.name(),
            frame_kind.name(),
            new_state.name()
        );
        self.current_state = new_state;
        Ok(())
    }

    /// True when the local side is allowed to send a frame
    pub fn is_send_state(&self) -> bool {
        matches!(
            self.current_state,
            HdlcState::NotConnected | HdlcState::Idle
        )
    }

    /// True when the local side is waiting for a frame from the remote
    pub fn is_receive_state(&self) -> bool {
        matches!(
            self.current_state,
            HdlcState::AwaitingConnection
                | HdlcState::AwaitingResponse
                | HdlcState::AwaitingDisconnect
        )
    }

    /// Drop the link; terminal until a new connection object is made
    pub fn close(&mut self) {
        self.current_state = HdlcState::Closed;
    }
}

impl Default for HdlcConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HdlcFrameKind::*;
    use HdlcState::*;

    const ALL_STATES: [HdlcState; 5] = [
        NotConnected,
        AwaitingConnection,
        Idle,
        AwaitingResponse,
        AwaitingDisconnect,
    ];
    const ALL_FRAMES: [HdlcFrameKind; 5] = [Snrm, Ua, Information, ReceiveReady, Disconnect];

    fn accepted(state: HdlcState, frame: HdlcFrameKind) -> Option<HdlcState> {
        let mut machine = HdlcConnectionState { current_state: state };
        machine.process_frame(frame).ok().map(|_| machine.current_state())
    }

    #[test]
    fn test_connect_exchange() {
        let mut machine = HdlcConnectionState::new();
        machine.process_frame(Snrm).unwrap();
        assert_eq!(machine.current_state(), AwaitingConnection);
        machine.process_frame(Ua).unwrap();
        assert_eq!(machine.current_state(), Idle);
    }

    #[test]
    fn test_data_exchange_and_disconnect() {
        let mut machine = HdlcConnectionState::new();
        machine.process_frame(Snrm).unwrap();
        machine.process_frame(Ua).unwrap();
        machine.process_frame(Information).unwrap();
        assert_eq!(machine.current_state(), AwaitingResponse);
        machine.process_frame(Information).unwrap();
        assert_eq!(machine.current_state(), Idle);
        machine.process_frame(Disconnect).unwrap();
        machine.process_frame(Ua).unwrap();
        assert_eq!(machine.current_state(), NotConnected);
    }

    #[test]
    fn test_accepted_set_matches_transition_table() {
        let expected: &[(HdlcState, HdlcFrameKind, HdlcState)] = &[
            (NotConnected, Snrm, AwaitingConnection),
            (AwaitingConnection, Ua, Idle),
            (Idle, Information, AwaitingResponse),
            (Idle, ReceiveReady, AwaitingResponse),
            (Idle, Disconnect, AwaitingDisconnect),
            (AwaitingResponse, Information, Idle),
            (AwaitingResponse, ReceiveReady, Idle),
            (AwaitingDisconnect, Ua, NotConnected),
        ];

        for state in ALL_STATES {
            for frame in ALL_FRAMES {
                let arc = expected
                    .iter()
                    .find(|(from, with, _)| *from == state && *with == frame)
                    .map(|(_, _, to)| *to);
                assert_eq!(
                    accepted(state, frame),
                    arc,
                    "state {:?} frame {:?}",
                    state,
                    frame
                );
            }
        }
    }

    #[test]
    fn test_illegal_frame_leaves_state_unchanged() {
        let mut machine = HdlcConnectionState::new();
        let error = machine.process_frame(Ua).unwrap_err();
        assert!(matches!(error, DlmsError::LinkProtocolError { .. }));
        assert_eq!(machine.current_state(), NotConnected);
    }

    #[test]
    fn test_send_and_receive_predicates() {
        let machine = HdlcConnectionState::new();
        assert!(machine.is_send_state());
        assert!(!machine.is_receive_state());

        let mut machine = HdlcConnectionState::new();
        machine.process_frame(Snrm).unwrap();
        assert!(!machine.is_send_state());
        assert!(machine.is_receive_state());
    }

    #[test]
    fn test_close_is_terminal() {
        let mut machine = HdlcConnectionState::new();
        machine.close();
        assert_eq!(machine.current_state(), Closed);
        assert!(machine.process_frame(Snrm).is_err());
    }
}
