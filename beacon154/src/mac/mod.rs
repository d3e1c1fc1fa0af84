//! The MAC sublayer of a beacon-enabled PAN.
//!
//! [`Mac`] owns every subsystem: the PIBs, the timer queue, the transmit
//! queue and the state of the beacon roles. It runs in one context. The
//! radio driver only posts [`RadioEvent`]s to the shared [`EventQueue`],
//! [`Mac::poll`] (or [`Mac::run`]) drains them and [`Mac::request`] takes
//! requests of the upper layer. Both run everything through the state
//! machine in [`fsm`], one event at a time, and never block: waiting always
//! means arming a timer.

pub mod command;
pub mod constants;
pub mod coord;
pub mod device;
pub mod event;
pub mod fsm;
pub mod mcps;
pub mod mlme;
pub mod pib;
pub mod queue;
pub mod security;
pub mod superframe;
mod utils;

use rand_core::RngCore;

use crate::frame::{Address, CommandId, Frame, FrameBuffer, FrameType};
use crate::hopping::{FrequencyHopping, NoHopping};
use crate::phy::pib::Pib as PhyPib;
use crate::phy::radio::{Radio, RadioEvent, RxReason, TxMode, TxStatus};
use crate::sync::event_queue::EventQueue;
use crate::time::SymbolTime;
use crate::timer::{TimerId, TimerQueue};
use crate::upper::UpperLayer;

pub use command::{MacConfirm, MacIndication, MacRequest};

use coord::Coordinator;
use device::Tracker;
use event::{Event, RxFrame};
use fsm::{ActionSets, Fsm, MacState};
use mcps::data::DataIndication;
use mlme::associate::Association;
use mlme::comm_status::CommStatusIndication;
use mlme::scan::ScanState;
use pib::Pib;
use queue::{Completion, PollKind, TxKind, TxOptions, TxQueue};
use security::{Security, SecurityPib};
use superframe::Schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A parameter is out of range or not supported.
    InvalidParameter,
    /// No source or destination address, or a short address that is not
    /// assigned.
    InvalidAddress,
    /// No queued transaction with that handle.
    InvalidHandle,
    /// A bounded collection is full.
    NoResources,
    /// The transmit queue class is full.
    TransactionOverflow,
    /// The outgoing superframe collides with the incoming one.
    SuperframeOverlap,
    /// The request is not allowed in the current state.
    BadState,
    /// A scan found no beacon.
    NoBeacon,
    /// Nothing was pending at the coordinator.
    NoData,
    /// A scan is already running.
    ScanInProgress,
    /// Security requested while security is disabled, or not supported.
    UnsupportedSecurity,
    /// No key for the key identifier, or the device is unknown.
    UnavailableKey,
    /// The frame counter is exhausted, or replayed.
    CounterError,
    /// The security level is below the required minimum.
    ImproperSecurityLevel,
    /// The key may not be used for this frame type.
    ImproperKeyType,
    /// The MIC does not match.
    SecurityError,
    /// No acknowledgment after every retry.
    NoAck,
    /// The channel was busy.
    ChannelAccessFailure,
    /// The frame does not fit in a PSDU.
    FrameTooLong,
    /// An indirect transaction was not requested in time, or was purged.
    TransactionExpired,
    /// The tracked beacon was lost.
    BeaconLoss,
    /// The coordinator moved the PAN.
    Realignment,
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<crate::frame::Error> for Error {
    fn from(_: crate::frame::Error) -> Self {
        Error::NoResources
    }
}

/// Map the status of a radio transmission.
pub(crate) fn tx_result(status: TxStatus) -> Result<()> {
    match status {
        TxStatus::Success | TxStatus::AckPending => Ok(()),
        TxStatus::NoAck => Err(Error::NoAck),
        TxStatus::ChannelAccessFailure => Err(Error::ChannelAccessFailure),
    }
}

/// The MAC sublayer.
pub struct Mac<'a, R, U, Rng, H = NoHopping> {
    radio: R,
    upper: U,
    rng: Rng,
    hopping: H,
    events: &'a EventQueue,
    pib: Pib,
    phy_pib: PhyPib,
    security: SecurityPib,
    timers: TimerQueue,
    queue: TxQueue,
    schedule: Schedule,
    fsm: Fsm,
    coord: Coordinator,
    tracker: Tracker,
    scan: Option<ScanState>,
    association: Option<Association>,
    /// Data request sent, waiting for the acknowledgment or the frame.
    poll: Option<PollKind>,
}

impl<'a, R, U, Rng> Mac<'a, R, U, Rng, NoHopping>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
{
    pub fn new(radio: R, upper: U, rng: Rng, events: &'a EventQueue) -> Self {
        Self::with_hopping(radio, upper, rng, events, NoHopping)
    }
}

impl<'a, R, U, Rng, H> Mac<'a, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    pub fn with_hopping(radio: R, upper: U, rng: Rng, events: &'a EventQueue, hopping: H) -> Self {
        let mut mac = Self {
            radio,
            upper,
            rng,
            hopping,
            events,
            pib: Pib::default(),
            phy_pib: PhyPib::default(),
            security: SecurityPib::new(),
            timers: TimerQueue::new(),
            queue: TxQueue::new(),
            schedule: Schedule::default(),
            fsm: Fsm::new(ActionSets::all()),
            coord: Coordinator::default(),
            tracker: Tracker::default(),
            scan: None,
            association: None,
            poll: None,
        };
        mac.mlme_reset_request(true);
        mac
    }

    /// Restrict the state machine to `sets`. Requests handled by a
    /// disabled set are rejected with [`Error::BadState`].
    pub fn with_action_sets(mut self, sets: ActionSets) -> Self {
        self.fsm = Fsm::new(sets);
        self
    }

    pub fn pib(&self) -> &Pib {
        &self.pib
    }

    pub fn phy_pib(&self) -> &PhyPib {
        &self.phy_pib
    }

    /// Key, device and security level tables.
    pub fn security_pib(&self) -> &SecurityPib {
        &self.security
    }

    pub fn security_pib_mut(&mut self) -> &mut SecurityPib {
        &mut self.security
    }

    pub fn state(&self) -> MacState {
        self.fsm.state
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn upper(&self) -> &U {
        &self.upper
    }

    pub fn upper_mut(&mut self) -> &mut U {
        &mut self.upper
    }

    /// Run a request of the upper layer. The outcome is reported with a
    /// confirm.
    pub fn request(&mut self, request: MacRequest) {
        self.dispatch(request.into());
        self.service();
        self.rearm();
    }

    /// Process every queued radio event.
    pub fn poll(&mut self) {
        while let Some(event) = self.events.pop() {
            match event {
                RadioEvent::TxDone(status) => self.tx_done(status),
                RadioEvent::Rx {
                    frame,
                    timestamp,
                    lqi,
                } => self.receive(frame, timestamp, lqi),
                RadioEvent::TimerTrigger => self.expire_timers(),
            }
            self.service();
        }
        self.rearm();
    }

    /// Process radio events forever.
    pub async fn run(&mut self) -> ! {
        loop {
            self.events.wait().await;
            self.poll();
        }
    }

    fn rearm(&mut self) {
        let next = self.timers.next_expiry();
        self.radio.arm_trigger(next);
    }

    fn expire_timers(&mut self) {
        let now = self.radio.now();
        while let Some(id) = self.timers.expire(now) {
            trace!("timer {:?} expired", id);
            self.dispatch(Event::Timer(id));
        }
    }

    /// Hand the next eligible queue entry to the radio. Entries are secured
    /// the first time they go out, retransmissions reuse the frame.
    fn service(&mut self) {
        if self.coord.beacon_in_flight {
            return;
        }

        loop {
            let phase = self.schedule.phase;
            let Some(entry) = self.queue.next(phase) else {
                return;
            };

            let secured = Frame::new_unchecked(entry.frame.as_slice())
                .frame_control()
                .security_enabled();
            let mut result = Ok(());
            if secured && !entry.options.contains(TxOptions::SECURED) {
                result = self
                    .security
                    .protect(&mut entry.frame, self.pib.extended_address);
                entry.options.insert(TxOptions::SECURED);
            }

            match result {
                Ok(()) => {
                    let mode = if entry.options.contains(TxOptions::SLOTTED) {
                        TxMode::SlottedCsma
                    } else {
                        TxMode::UnslottedCsma
                    };
                    trace!("transmit {:?} ({} octets)", entry.kind, entry.frame.len());
                    self.radio.transmit(entry.frame.as_slice(), mode);
                    return;
                }
                Err(error) => {
                    warn!("cannot secure {:?}: {:?}", entry.kind, error);
                    if let Some(entry) = self.queue.abort() {
                        self.dispatch(Event::TxComplete {
                            kind: entry.kind,
                            status: Err(error),
                            pending: false,
                        });
                    }
                }
            }
        }
    }

    fn tx_done(&mut self, status: TxStatus) {
        if self.coord.beacon_in_flight {
            self.coord.beacon_in_flight = false;
            self.dispatch(Event::TxComplete {
                kind: TxKind::Beacon,
                status: tx_result(status),
                pending: false,
            });
            return;
        }

        match self.queue.complete(status) {
            Some(Completion::Done { entry, pending }) => self.dispatch(Event::TxComplete {
                kind: entry.kind,
                status: Ok(()),
                pending,
            }),
            Some(Completion::Failed { entry, error }) => self.dispatch(Event::TxComplete {
                kind: entry.kind,
                status: Err(error),
                pending: false,
            }),
            Some(Completion::Retry) => trace!("retry after {:?}", status),
            None => warn!("transmission done without a frame in flight"),
        }
    }

    /// Route the outcome of a transmission to the procedure that queued it.
    pub(crate) fn tx_complete(&mut self, kind: TxKind, status: Result<()>, pending: bool) {
        match kind {
            TxKind::Data { handle } => self.data_sent(handle, status),
            TxKind::AssociationRequest => self.association_request_sent(status),
            TxKind::AssociationResponse { device } => self.association_response_sent(device, status),
            TxKind::DataRequest(kind) => self.data_request_sent(kind, status, pending),
            TxKind::Realignment => self.realignment_sent(status),
            TxKind::Beacon => self.beacon_sent(status),
            TxKind::BeaconRequest | TxKind::BeaconReply | TxKind::EmptyData => {
                if let Err(error) = status {
                    debug!("{:?} not sent: {:?}", kind, error);
                }
            }
        }
    }

    pub(crate) fn timer_expired(&mut self, id: TimerId) {
        match id {
            TimerId::BeaconPrepare => self.beacon_prepare(),
            TimerId::BeaconTransmit => self.beacon_transmit(),
            TimerId::BeaconBattLife => self.beacon_batt_life_end(),
            TimerId::BeaconPeriod => self.beacon_period_end(),
            TimerId::BeaconSync => self.beacon_missed(),
            TimerId::BeaconTrack => self.beacon_track(),
            TimerId::BeaconIncomingPeriod => self.incoming_period_end(),
            TimerId::ResponseWait => self.association_poll(),
            TimerId::FrameResponse => self.frame_response_timeout(),
            TimerId::ScanDwell => self.next_scan_channel(),
            TimerId::IndirectExpiry => self.indirect_expiry(),
        }
    }

    /// Without beacons, indirect entries age by one base superframe.
    fn indirect_expiry(&mut self) {
        if self.coord.is_beaconing() {
            return;
        }
        for entry in self.queue.expire_tick() {
            debug!("{:?} for {:?} expired", entry.kind, entry.destination);
            self.tx_complete(entry.kind, Err(Error::TransactionExpired), false);
        }
        if self.queue.iter().any(|e| e.is_indirect()) {
            let now = self.radio.now();
            self.timers
                .arm(TimerId::IndirectExpiry, now, constants::BASE_SUPERFRAME_DURATION);
        }
    }

    fn receive(&mut self, mut buffer: FrameBuffer, timestamp: SymbolTime, lqi: u8) {
        let Ok(frame) = Frame::new(buffer.as_slice()) else {
            trace!("malformed frame dropped");
            return;
        };

        if self.pib.promiscuous_mode {
            let indication = DataIndication::new(RxFrame {
                buffer,
                timestamp,
                lqi,
                security: None,
            });
            self.upper
                .mac_indication(MacIndication::McpsData(indication));
            return;
        }

        if !utils::is_frame_for_us(&self.pib, self.coord.started, &frame) {
            trace!("frame filtered");
            return;
        }
        let frame_type = frame.frame_control().frame_type();

        let security = match self
            .security
            .unprotect(&mut buffer, self.pib.security_enabled)
        {
            Ok(security) => security,
            Err(error) => {
                warn!("{:?} frame failed security: {:?}", frame_type, error);
                self.security_failure(&buffer, error);
                return;
            }
        };

        let frame = Frame::new_unchecked(buffer.as_slice());
        let command = match frame_type {
            FrameType::MacCommand => frame.payload().first().map(|id| CommandId::from(*id)),
            _ => None,
        };
        let rx = RxFrame {
            buffer,
            timestamp,
            lqi,
            security,
        };

        let event = match (frame_type, command) {
            (FrameType::Beacon, _) => Event::RxBeacon(rx),
            (FrameType::Data, _) => Event::RxData(rx),
            (_, Some(CommandId::AssociationRequest)) => Event::RxAssociateRequest(rx),
            (_, Some(CommandId::AssociationResponse)) => Event::RxAssociateResponse(rx),
            (_, Some(CommandId::DataRequest)) => Event::RxDataRequest(rx),
            (_, Some(CommandId::BeaconRequest)) => Event::RxBeaconRequest(rx),
            (_, Some(CommandId::CoordinatorRealignment)) => Event::RxRealign(rx),
            (_, command) => {
                debug!("command {:?} not handled", command);
                return;
            }
        };
        self.dispatch(event);
    }

    /// Only realignment and association response commands report a failed
    /// security check.
    fn security_failure(&mut self, buffer: &FrameBuffer, error: Error) {
        let frame = Frame::new_unchecked(buffer.as_slice());
        if frame.frame_control().frame_type() != FrameType::MacCommand {
            return;
        }
        let Some(aux) = frame.auxiliary_security_header() else {
            return;
        };
        let command = frame.payload().first().map(|id| CommandId::from(*id));
        if !matches!(
            command,
            Some(CommandId::CoordinatorRealignment | CommandId::AssociationResponse)
        ) {
            return;
        }

        let addressing = frame.addressing();
        let indication = CommStatusIndication {
            pan_id: addressing
                .as_ref()
                .and_then(|af| af.dst_pan_id())
                .unwrap_or(self.pib.pan_id),
            src_address: addressing
                .as_ref()
                .map_or(Address::Absent, |af| af.src_address()),
            dst_address: addressing
                .as_ref()
                .map_or(Address::Absent, |af| af.dst_address()),
            status: Err(error),
            security: Security::from(&crate::frame::AuxSecurityHeaderRepr::parse(&aux)),
        };
        self.upper
            .mac_indication(MacIndication::MlmeCommStatus(indication));
    }

    fn rx_set(&mut self, reason: RxReason, on: bool) {
        if on {
            self.radio.rx_enable(reason);
        } else {
            self.radio.rx_disable(reason);
        }
    }

    fn tune(&mut self, page: u8, channel: u8) {
        if self.phy_pib.current_channel != channel || self.phy_pib.current_page != page {
            self.phy_pib.current_page = page;
            self.phy_pib.current_channel = channel;
            self.radio.set_channel(page, channel);
        }
    }

    fn set_pan_id(&mut self, pan_id: u16) {
        self.pib.pan_id = pan_id;
        self.radio.set_pan_id(pan_id);
    }
}
