//! Table driven MAC state machine.
//!
//! Every request of the upper layer, every received frame, transmission
//! completion and timer expiry is an [`Event`]. [`TABLE`] maps the current
//! [`MacState`] and the kind of event to an [`Action`] and the next state.
//! The first matching row wins, rows without a state match any state. The
//! transition is applied after the action ran, whatever its outcome: an
//! action that decides the next state on its own raises an internal event
//! handled by a later row.

use bitflags::bitflags;
use heapless::Deque;
use rand_core::RngCore;

use crate::frame::Address;
use crate::hopping::FrequencyHopping;
use crate::phy::radio::Radio;
use crate::upper::UpperLayer;

use super::command::{MacConfirm, MacIndication};
use super::event::{Event, EventKind};
use super::mcps::data::DataConfirm;
use super::mcps::purge::PurgeConfirm;
use super::mlme::associate::AssociateConfirm;
use super::mlme::comm_status::CommStatusIndication;
use super::mlme::poll::PollConfirm;
use super::mlme::scan::ScanConfirm;
use super::mlme::start::StartConfirm;
use super::mlme::sync::SyncLossIndication;
use super::security::Security;
use super::{Error, Mac};

/// Depth of the internal event queue.
const INTERNAL_EVENTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MacState {
    Idle,
    /// Association request sent, waiting for the response.
    Associating,
    /// Explicit poll in progress.
    Polling,
    Scanning,
    /// Start request in progress, possibly sending a realignment first.
    Starting,
}

bitflags! {
    /// Groups of actions that can be left out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ActionSets: u8 {
        /// Data transfer, purge, transmission completion and timers.
        const MANAGEMENT = 0x01;
        const SCAN = 0x02;
        /// Association and polling as a device.
        const DEVICE = 0x04;
        /// Starting a PAN, answering associations and data requests.
        const COORDINATOR = 0x08;
        /// Beacon synchronization and tracking.
        const BEACON_DEVICE = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    DataRequest,
    Purge,
    DataReceived,
    TxComplete,
    Timer,
    AssociateRequest,
    AssociateResponseReceived,
    AssociateFailed,
    AssociateIndication,
    AssociateResponse,
    PollRequest,
    PollComplete,
    DataRequestReceived,
    AutoPoll,
    ScanRequest,
    ScanBeacon,
    ScanComplete,
    StartRequest,
    StartComplete,
    BeaconRequestReceived,
    RealignReceived,
    SyncRequest,
    BeaconReceived,
}

impl Action {
    pub const fn set(self) -> ActionSets {
        match self {
            Self::DataRequest
            | Self::Purge
            | Self::DataReceived
            | Self::TxComplete
            | Self::Timer => ActionSets::MANAGEMENT,
            Self::ScanRequest | Self::ScanBeacon | Self::ScanComplete => ActionSets::SCAN,
            Self::AssociateRequest
            | Self::AssociateResponseReceived
            | Self::AssociateFailed
            | Self::PollRequest
            | Self::PollComplete
            | Self::RealignReceived => ActionSets::DEVICE,
            Self::AssociateIndication
            | Self::AssociateResponse
            | Self::DataRequestReceived
            | Self::StartRequest
            | Self::StartComplete
            | Self::BeaconRequestReceived => ActionSets::COORDINATOR,
            Self::SyncRequest | Self::BeaconReceived | Self::AutoPoll => ActionSets::BEACON_DEVICE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    /// `None` matches every state.
    pub state: Option<MacState>,
    pub event: EventKind,
    pub action: Action,
    /// `None` keeps the state.
    pub next: Option<MacState>,
}

macro_rules! row {
    (_, $event:ident => $action:ident) => {
        Transition {
            state: None,
            event: EventKind::$event,
            action: Action::$action,
            next: None,
        }
    };
    ($state:ident, $event:ident => $action:ident) => {
        Transition {
            state: Some(MacState::$state),
            event: EventKind::$event,
            action: Action::$action,
            next: None,
        }
    };
    ($state:ident, $event:ident => $action:ident, $next:ident) => {
        Transition {
            state: Some(MacState::$state),
            event: EventKind::$event,
            action: Action::$action,
            next: Some(MacState::$next),
        }
    };
}

pub const TABLE: &[Transition] = &[
    row!(_, Data => DataRequest),
    row!(_, Purge => Purge),
    row!(_, RxData => DataReceived),
    row!(_, TxComplete => TxComplete),
    row!(_, Timer => Timer),
    row!(Idle, Associate => AssociateRequest, Associating),
    row!(Associating, RxAssociateResponse => AssociateResponseReceived, Idle),
    row!(Associating, AssociateFailed => AssociateFailed, Idle),
    row!(_, RxAssociateRequest => AssociateIndication),
    row!(Idle, AssociateResponse => AssociateResponse),
    row!(Idle, Poll => PollRequest, Polling),
    row!(Polling, PollComplete => PollComplete, Idle),
    row!(_, RxDataRequest => DataRequestReceived),
    row!(_, AutoPoll => AutoPoll),
    row!(Idle, Scan => ScanRequest, Scanning),
    row!(Scanning, RxBeacon => ScanBeacon),
    row!(Scanning, ScanComplete => ScanComplete, Idle),
    row!(Idle, Start => StartRequest, Starting),
    row!(Starting, StartComplete => StartComplete, Idle),
    row!(_, RxBeaconRequest => BeaconRequestReceived),
    row!(_, RxRealign => RealignReceived),
    row!(Idle, Sync => SyncRequest),
    row!(_, RxBeacon => BeaconReceived),
];

/// Find the row for `event` in `state` among the enabled action sets.
pub fn lookup(state: MacState, event: EventKind, sets: ActionSets) -> Option<&'static Transition> {
    TABLE.iter().find(|t| {
        t.event == event
            && t.state.map_or(true, |s| s == state)
            && sets.contains(t.action.set())
    })
}

/// State of the dispatcher.
#[derive(Debug)]
pub struct Fsm {
    pub state: MacState,
    pub sets: ActionSets,
    /// One request waiting for the machine to return to idle.
    pub pending: Option<Event>,
    /// Events raised by actions, handled before the next external event.
    pub internal: Deque<Event, INTERNAL_EVENTS>,
}

impl Fsm {
    pub fn new(sets: ActionSets) -> Self {
        Self {
            state: MacState::Idle,
            sets,
            pending: None,
            internal: Deque::new(),
        }
    }

    pub fn reset(&mut self) {
        self.state = MacState::Idle;
        self.pending = None;
        self.internal.clear();
    }
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Run `event` and every event it raises.
    pub(crate) fn dispatch(&mut self, event: Event) {
        self.process(event);
        loop {
            if let Some(event) = self.fsm.internal.pop_front() {
                self.process(event);
                continue;
            }
            if self.fsm.state == MacState::Idle {
                if let Some(event) = self.fsm.pending.take() {
                    self.process(event);
                    continue;
                }
            }
            break;
        }
    }

    /// Queue an internal event, handled once the current action returns.
    pub(crate) fn raise(&mut self, event: Event) {
        if let Err(event) = self.fsm.internal.push_back(event) {
            error!("internal event queue full, {:?} lost", event.kind());
            self.upper.fault(Error::NoResources);
        }
    }

    fn process(&mut self, event: Event) {
        let kind = event.kind();
        let state = self.fsm.state;

        if kind.is_api()
            && !matches!(kind, EventKind::Data | EventKind::Purge)
            && state != MacState::Idle
        {
            if kind == EventKind::Scan && state == MacState::Scanning {
                self.reject(event, Error::ScanInProgress);
                return;
            }
            debug!("{:?} pending in {:?}", kind, state);
            if let Some(displaced) = self.fsm.pending.replace(event) {
                self.reject(displaced, Error::BadState);
            }
            return;
        }

        let Some(transition) = lookup(state, kind, self.fsm.sets) else {
            if kind.is_api() {
                self.reject(event, Error::BadState);
            } else {
                trace!("{:?} ignored in {:?}", kind, state);
            }
            return;
        };

        trace!("{:?} in {:?}: {:?}", kind, state, transition.action);
        self.execute(transition.action, event);
        if let Some(next) = transition.next {
            self.fsm.state = next;
        }
    }

    fn execute(&mut self, action: Action, event: Event) {
        match (action, event) {
            (Action::DataRequest, Event::Data(request)) => self.mcps_data_request(request),
            (Action::Purge, Event::Purge(request)) => self.mcps_purge_request(request),
            (Action::DataReceived, Event::RxData(frame)) => self.mcps_data_indication(frame),
            (Action::TxComplete, Event::TxComplete { kind, status, pending }) => {
                self.tx_complete(kind, status, pending)
            }
            (Action::Timer, Event::Timer(id)) => self.timer_expired(id),
            (Action::AssociateRequest, Event::Associate(request)) => {
                self.mlme_associate_request(request)
            }
            (Action::AssociateResponseReceived, Event::RxAssociateResponse(frame)) => {
                self.association_response_received(frame)
            }
            (Action::AssociateFailed, Event::AssociateFailed(error)) => {
                self.association_failed(error)
            }
            (Action::AssociateIndication, Event::RxAssociateRequest(frame)) => {
                self.mlme_associate_indication(frame)
            }
            (Action::AssociateResponse, Event::AssociateResponse(response)) => {
                self.mlme_associate_response(response)
            }
            (Action::PollRequest, Event::Poll(request)) => self.mlme_poll_request(request),
            (Action::PollComplete, Event::PollComplete(status)) => self.poll_complete(status),
            (Action::DataRequestReceived, Event::RxDataRequest(frame)) => {
                self.data_request_received(frame)
            }
            (Action::AutoPoll, Event::AutoPoll) => self.auto_poll(),
            (Action::ScanRequest, Event::Scan(request)) => self.mlme_scan_request(request),
            (Action::ScanBeacon, Event::RxBeacon(frame)) => self.scan_beacon(frame),
            (Action::ScanComplete, Event::ScanComplete) => self.scan_complete(),
            (Action::StartRequest, Event::Start(request)) => self.mlme_start_request(request),
            (Action::StartComplete, Event::StartComplete(status)) => self.start_complete(status),
            (Action::BeaconRequestReceived, Event::RxBeaconRequest(frame)) => {
                self.beacon_request_received(frame)
            }
            (Action::RealignReceived, Event::RxRealign(frame)) => self.realign_received(frame),
            (Action::SyncRequest, Event::Sync(request)) => self.mlme_sync_request(request),
            (Action::BeaconReceived, Event::RxBeacon(frame)) => self.beacon_received(frame),
            (action, event) => error!("{:?} cannot run on {:?}", action, event.kind()),
        }
    }

    /// Fail a request with `error` through its confirm.
    fn reject(&mut self, event: Event, error: Error) {
        debug!("{:?} rejected: {:?}", event.kind(), error);
        match event {
            Event::Data(request) => self.upper.mac_confirm(MacConfirm::McpsData(DataConfirm {
                handle: request.handle,
                status: Err(error),
                timestamp: None,
            })),
            Event::Purge(request) => self.upper.mac_confirm(MacConfirm::McpsPurge(PurgeConfirm {
                handle: request.handle,
                status: Err(error),
            })),
            Event::Associate(_) => self
                .upper
                .mac_confirm(MacConfirm::MlmeAssociate(AssociateConfirm::failed(error))),
            Event::AssociateResponse(response) => {
                let indication = CommStatusIndication {
                    pan_id: self.pib.pan_id,
                    src_address: Address::Extended(self.pib.extended_address),
                    dst_address: Address::Extended(response.device_address),
                    status: Err(error),
                    security: response.security,
                };
                self.upper
                    .mac_indication(MacIndication::MlmeCommStatus(indication))
            }
            Event::Poll(_) => self
                .upper
                .mac_confirm(MacConfirm::MlmePoll(PollConfirm { status: Err(error) })),
            Event::Scan(request) => self
                .upper
                .mac_confirm(MacConfirm::MlmeScan(ScanConfirm::failed(&request, error))),
            Event::Start(_) => self
                .upper
                .mac_confirm(MacConfirm::MlmeStart(StartConfirm { status: Err(error) })),
            Event::Sync(request) => {
                let indication = SyncLossIndication {
                    reason: error,
                    pan_id: self.pib.pan_id,
                    channel: request.channel,
                    page: request.page,
                    security: Security::NONE,
                };
                self.upper
                    .mac_indication(MacIndication::MlmeSyncLoss(indication))
            }
            _ => {}
        }
    }
}
