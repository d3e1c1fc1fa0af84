//! Coordinator role: starting a PAN and sending periodic beacons.
//!
//! Every beacon takes two timers. `BeaconPrepare` fires
//! `MAC_BEACON_PREPARE_LEAD` symbols ahead and builds the frame,
//! `BeaconTransmit` hands it to the radio without CCA so that it is on air
//! exactly at the beacon time. Both are aligned on the beacon interval, so a
//! coordinator that also tracks its parent follows the parent's timing.

use rand_core::RngCore;

use crate::frame::{Address, AddressingRepr, CommandRepr, FrameBuffer, FrameType, ORDER_NONE};
use crate::hopping::FrequencyHopping;
use crate::mac::constants::*;
use crate::mac::event::{Event, RxFrame};
use crate::mac::mlme::start::StartRequest;
use crate::mac::queue::{TxFlags, TxKind};
use crate::mac::superframe::{beacon_interval, cap_end, cap_start, superframe_interval, valid_orders};
use crate::mac::utils::build_command;
use crate::mac::{Error, Mac, Result};
use crate::phy::constants::is_valid_channel;
use crate::phy::radio::{Radio, RxReason, TxMode};
use crate::time::SymbolTime;
use crate::timer::TimerId;
use crate::upper::UpperLayer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoordState {
    #[default]
    Idle,
    /// Waiting for the realignment command to go out.
    Starting,
    Beaconing,
}

#[derive(Debug)]
pub struct Coordinator {
    pub(crate) state: CoordState,
    /// A PAN was started. Frames without a destination address are for us.
    pub(crate) started: bool,
    /// Start request applied once its realignment command was sent.
    pub(crate) request: Option<StartRequest>,
    pub(crate) beacon: Option<FrameBuffer>,
    pub(crate) beacon_in_flight: bool,
    /// When the last beacon went on air.
    pub(crate) beacon_time: SymbolTime,
    pub(crate) beacon_len: usize,
    /// Offset of our beacon from the start of the beacon interval.
    pub(crate) tx_offset: u32,
    pub(crate) final_cap_slot: u8,
    /// The prepared beacon announces a broadcast frame.
    pub(crate) broadcast_pending: bool,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self {
            state: CoordState::Idle,
            started: false,
            request: None,
            beacon: None,
            beacon_in_flight: false,
            beacon_time: SymbolTime::ZERO,
            beacon_len: 0,
            tx_offset: 0,
            final_cap_slot: 15,
            broadcast_pending: false,
        }
    }
}

impl Coordinator {
    pub fn is_beaconing(&self) -> bool {
        self.state == CoordState::Beaconing
    }
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Validate and apply a start request. Returns `false` when the request
    /// waits for its realignment command.
    pub(crate) fn coord_start(&mut self, request: StartRequest) -> Result<bool> {
        self.validate_start(&request)?;

        if request.coord_realignment {
            self.send_realignment(&request)?;
            self.coord.request = Some(request);
            if !self.coord.is_beaconing() {
                self.coord.state = CoordState::Starting;
            }
            return Ok(false);
        }

        self.start_apply(&request);
        Ok(true)
    }

    fn validate_start(&self, request: &StartRequest) -> Result<()> {
        if !valid_orders(request.beacon_order, request.superframe_order)
            || !is_valid_channel(request.page, request.channel)
            || request.pan_id == BROADCAST_PAN_ID
        {
            return Err(Error::InvalidParameter);
        }
        self.check_security(&request.beacon_security)?;
        if request.coord_realignment {
            self.check_security(&request.realignment_security)?;
        }

        if request.pan_coordinator || !self.tracker.is_tracking() || request.beacon_order == ORDER_NONE {
            return Ok(());
        }

        // our superframe sits in the inactive part of the tracked one
        let tracked = self.tracker.superframe;
        if request.beacon_order != tracked.beacon_order {
            return Err(Error::SuperframeOverlap);
        }
        let margin = 2 * BEACON_MARGIN[tracked.beacon_order as usize];
        let earliest = superframe_interval(tracked.superframe_order) + margin;
        let latest = beacon_interval(tracked.beacon_order)
            .checked_sub(margin + superframe_interval(request.superframe_order))
            .ok_or(Error::SuperframeOverlap)?;
        if request.start_time < earliest || request.start_time > latest {
            return Err(Error::SuperframeOverlap);
        }
        Ok(())
    }

    /// Broadcast the new configuration to the PAN.
    fn send_realignment(&mut self, request: &StartRequest) -> Result<()> {
        let addressing = AddressingRepr {
            dst_pan_id: BROADCAST_PAN_ID,
            dst_address: Address::BROADCAST,
            src_pan_id: self.pib.pan_id,
            src_address: Address::Extended(self.pib.extended_address),
        };
        let header = self.header(
            FrameType::MacCommand,
            addressing,
            false,
            &request.realignment_security,
        );
        let frame = build_command(
            &header,
            &CommandRepr::CoordinatorRealignment {
                pan_id: request.pan_id,
                coordinator_short_address: self.pib.short_address,
                channel: request.channel,
                short_address: NO_SHORT_ADDRESS,
                channel_page: Some(request.page),
            },
        )?;
        self.enqueue(frame, TxKind::Realignment, Address::BROADCAST, false)
    }

    pub(crate) fn realignment_sent(&mut self, status: Result<()>) {
        let Some(request) = self.coord.request.take() else {
            return;
        };
        if self.coord.state == CoordState::Starting {
            self.coord.state = CoordState::Idle;
        }
        match status {
            Ok(()) => self.start_apply(&request),
            Err(error) => warn!("realignment not sent: {:?}", error),
        }
        self.raise(Event::StartComplete(status));
    }

    fn start_apply(&mut self, request: &StartRequest) {
        let now = self.radio.now();

        self.pib.pan_coordinator = request.pan_coordinator;
        self.pib.beacon_order = request.beacon_order;
        self.pib.superframe_order = request.superframe_order;
        self.pib.batt_life_ext = request.battery_life_extension;
        self.set_pan_id(request.pan_id);
        self.tune(request.page, request.channel);
        self.coord.started = true;

        self.timers.cancel(TimerId::BeaconPrepare);
        self.timers.cancel(TimerId::BeaconTransmit);
        self.timers.cancel(TimerId::BeaconPeriod);
        self.timers.cancel(TimerId::BeaconBattLife);
        self.coord.beacon = None;

        let tracking = self.tracker.is_tracking();
        self.coord.tx_offset = if request.pan_coordinator || !tracking {
            0
        } else {
            request.start_time
        };
        self.pib.beacon_tx_time = self.coord.tx_offset;

        if request.beacon_order == ORDER_NONE {
            info!(
                "nonbeacon PAN {:04x} started on channel {}",
                request.pan_id, request.channel
            );
            self.coord.state = CoordState::Idle;
            self.queue.set_slotted(false);
            self.rx_set(RxReason::BEACON_NETWORK, false);
            if !tracking {
                self.schedule.phase = TxFlags::OUTGOING_CAP;
            }
            if self.pib.rx_on_when_idle {
                self.rx_set(RxReason::WHEN_IDLE, true);
            }

            // frames queued under beacons: broadcasts go out now, the rest
            // waits for a data request and ages per base superframe
            self.queue.ready_broadcasts();
            if self.queue.iter().any(|e| e.is_indirect())
                && !self.timers.is_armed(TimerId::IndirectExpiry)
            {
                self.timers
                    .arm(TimerId::IndirectExpiry, now, BASE_SUPERFRAME_DURATION);
            }
            return;
        }

        info!(
            "PAN {:04x} started on channel {}, BO {} SO {}",
            request.pan_id, request.channel, request.beacon_order, request.superframe_order
        );
        self.coord.state = CoordState::Beaconing;
        self.queue.set_slotted(true);
        if !tracking {
            self.timers
                .sync_rollover(beacon_interval(request.beacon_order));
            self.timers.realign(now);
            // nothing goes out before our first beacon
            self.schedule.phase = TxFlags::INACTIVE;
        }
        self.arm_prepare();
    }

    /// Offset of the next `BeaconPrepare` in the beacon interval.
    fn arm_prepare(&mut self) {
        let offset = match self.coord.tx_offset {
            0 => beacon_interval(self.pib.beacon_order),
            offset => offset,
        };
        let now = self.radio.now();
        self.timers.arm_aligned(
            TimerId::BeaconPrepare,
            now,
            offset.saturating_sub(MAC_BEACON_PREPARE_LEAD + TX_SLOTTED_DELAY),
        );
    }

    pub(crate) fn beacon_prepare(&mut self) {
        if !self.coord.is_beaconing() {
            return;
        }
        if self.scan.is_some() {
            // off channel, skip this beacon but keep the sequence
            self.pib.next_bsn();
            self.arm_prepare();
            return;
        }

        match self.build_beacon() {
            Ok(beacon) => self.coord.beacon = Some(beacon),
            Err(error) => {
                error!("cannot build beacon: {:?}", error);
                self.arm_prepare();
                return;
            }
        }
        self.coord.broadcast_pending = self.queue.has_broadcast();

        let offset = match self.coord.tx_offset {
            0 => beacon_interval(self.pib.beacon_order),
            offset => offset,
        };
        let now = self.radio.now();
        self.timers
            .arm_aligned(TimerId::BeaconTransmit, now, offset - TX_SLOTTED_DELAY);
    }

    pub(crate) fn beacon_transmit(&mut self) {
        self.arm_prepare();
        let Some(beacon) = self.coord.beacon.take() else {
            return;
        };
        if self.queue.is_busy() {
            // the sequence number is spent, receivers see a gap
            warn!("radio busy, beacon {} dropped", self.pib.bsn.wrapping_sub(1));
            return;
        }

        trace!("transmit beacon ({} octets)", beacon.len());
        self.radio.transmit(beacon.as_slice(), TxMode::NoCca);
        self.coord.beacon_in_flight = true;
        self.coord.beacon_len = beacon.len();
        self.coord.beacon_time = self.radio.now() + TX_SLOTTED_DELAY;
        if self.pib.rx_on_when_idle {
            self.rx_set(RxReason::WHEN_IDLE, true);
        }
    }

    /// The beacon is out: our CAP begins.
    pub(crate) fn beacon_sent(&mut self, status: Result<()>) {
        if let Err(error) = status {
            warn!("beacon not sent: {:?}", error);
            self.coord.broadcast_pending = false;
            return;
        }

        let beacon_order = self.pib.beacon_order;
        let superframe_order = self.pib.superframe_order;
        if superframe_order == ORDER_NONE {
            self.schedule.phase = TxFlags::INACTIVE;
            self.rx_set(RxReason::BEACON_NETWORK | RxReason::WHEN_IDLE, false);
        } else {
            let start = cap_start(self.coord.beacon_len);
            let end = cap_end(self.coord.final_cap_slot, superframe_order, beacon_order);
            self.schedule.cap_start = start;
            self.schedule.cap_end = end;
            self.schedule.phase = TxFlags::OUTGOING_CAP;
            self.rx_set(RxReason::BEACON_NETWORK, true);

            let beacon_time = self.coord.beacon_time;
            self.timers.arm(TimerId::BeaconPeriod, beacon_time, end);
            if self.pib.batt_life_ext && self.pib.rx_on_when_idle {
                let periods = self.pib.batt_life_ext_periods as u32;
                self.timers.arm(
                    TimerId::BeaconBattLife,
                    beacon_time,
                    start + BATT_LIFE_OFFSET + periods * UNIT_BACKOFF_PERIOD,
                );
            }
        }

        // one persistence unit per beacon
        for entry in self.queue.expire_tick() {
            debug!("{:?} for {:?} expired", entry.kind, entry.destination);
            self.tx_complete(entry.kind, Err(Error::TransactionExpired), false);
        }
        self.queue.ready_requested();
        if self.coord.broadcast_pending {
            self.queue.promote_broadcast();
            self.coord.broadcast_pending = false;
        }
    }

    /// End of our CAP.
    pub(crate) fn beacon_period_end(&mut self) {
        self.schedule.phase = TxFlags::INACTIVE;
        self.queue.clear_ready_indirect();
        if self.pib.superframe_order != self.pib.beacon_order {
            self.rx_set(RxReason::BEACON_NETWORK | RxReason::WHEN_IDLE, false);
        }

        let now = self.radio.now();
        if let Some(channel) = self.hopping.next_channel(now) {
            trace!("hop to channel {}", channel);
            let page = self.phy_pib.current_page;
            self.tune(page, channel);
        }
    }

    /// Battery life extension: the idle receiver goes off early in the CAP.
    pub(crate) fn beacon_batt_life_end(&mut self) {
        self.rx_set(RxReason::WHEN_IDLE | RxReason::BEACON_NETWORK, false);
    }

    /// Stop sending beacons, for example after losing the parent we are
    /// aligned to.
    pub(crate) fn stop_beaconing(&mut self) {
        self.timers.cancel(TimerId::BeaconPrepare);
        self.timers.cancel(TimerId::BeaconTransmit);
        self.timers.cancel(TimerId::BeaconPeriod);
        self.timers.cancel(TimerId::BeaconBattLife);
        self.coord.state = CoordState::Idle;
        self.coord.beacon = None;
        self.coord.started = false;
        self.queue.set_slotted(false);
        self.rx_set(RxReason::BEACON_NETWORK, false);
        info!("beacons stopped");
    }

    /// Without periodic beacons, a beacon request is answered at once.
    pub(crate) fn beacon_request_received(&mut self, _frame: RxFrame) {
        if !self.coord.started || self.pib.beacon_enabled() {
            trace!("beacon request ignored");
            return;
        }
        let result = self
            .build_beacon()
            .and_then(|beacon| self.enqueue(beacon, TxKind::BeaconReply, Address::Absent, false));
        if let Err(error) = result {
            warn!("no beacon reply: {:?}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{
        AddressingMode, BeaconPayload, BeaconRepr, Frame, HeaderRepr, SuperframeRepr,
    };
    use crate::mac::command::{MacConfirm, MacRequest};
    use crate::mac::device::TrackState;
    use crate::mac::fsm::MacState;
    use crate::mac::mcps::data::DataRequest;
    use crate::mac::mlme::scan::{ScanRequest, ScanType};
    use crate::mac::security::Security;
    use crate::mac::tests::*;
    use crate::phy::radio::TxStatus;
    use crate::sync::event_queue::EventQueue;

    const CHANNEL: u8 = 15;

    fn coordinator(events: &EventQueue) -> TestMac<'_> {
        let mut mac = mac(events, COORD_EXT);
        mac.pib.short_address = 0x0000;
        mac
    }

    fn start(beacon_order: u8, superframe_order: u8) -> StartRequest {
        StartRequest {
            pan_id: PAN_ID,
            channel: CHANNEL,
            page: 0,
            start_time: 0,
            beacon_order,
            superframe_order,
            pan_coordinator: true,
            battery_life_extension: false,
            coord_realignment: false,
            realignment_security: Security::NONE,
            beacon_security: Security::NONE,
        }
    }

    fn start_status(mac: &TestMac<'_>) -> Option<Result<()>> {
        mac.upper().confirms.iter().find_map(|c| match c {
            MacConfirm::MlmeStart(c) => Some(c.status),
            _ => None,
        })
    }

    fn at(symbols: u32) -> SymbolTime {
        SymbolTime::from_symbols(symbols)
    }

    #[test]
    fn start_beacon_pan() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(6, 4)));

        assert_eq!(start_status(&mac), Some(Ok(())));
        assert_eq!(mac.state(), MacState::Idle);
        assert!(mac.coord.is_beaconing());
        assert_eq!(mac.pib().pan_id, PAN_ID);
        assert_eq!(mac.phy_pib().current_channel, CHANNEL);
        assert_eq!(
            mac.radio().trigger,
            Some(at(beacon_interval(6) - MAC_BEACON_PREPARE_LEAD - TX_SLOTTED_DELAY))
        );
        // nothing before the first beacon
        assert_eq!(mac.schedule.phase, TxFlags::INACTIVE);
    }

    #[test]
    fn invalid_start() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(4, 6)));
        assert_eq!(start_status(&mac), Some(Err(Error::InvalidParameter)));

        mac.upper_mut().clear();
        mac.request(MacRequest::MlmeStart(StartRequest {
            channel: 27,
            ..start(6, 4)
        }));
        assert_eq!(start_status(&mac), Some(Err(Error::InvalidParameter)));
        assert!(!mac.coord.started);
        assert_eq!(mac.state(), MacState::Idle);
    }

    #[test]
    fn overlapping_superframes() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.tracker.state = TrackState::Tracking;
        mac.tracker.superframe = SuperframeRepr {
            beacon_order: 6,
            superframe_order: 2,
            ..Default::default()
        };
        let request = StartRequest {
            pan_coordinator: false,
            ..start(6, 2)
        };

        mac.request(MacRequest::MlmeStart(StartRequest {
            start_time: 100,
            ..request
        }));
        assert_eq!(start_status(&mac), Some(Err(Error::SuperframeOverlap)));

        mac.upper_mut().clear();
        mac.request(MacRequest::MlmeStart(StartRequest {
            beacon_order: 7,
            start_time: 8000,
            ..request
        }));
        assert_eq!(start_status(&mac), Some(Err(Error::SuperframeOverlap)));

        mac.upper_mut().clear();
        mac.request(MacRequest::MlmeStart(StartRequest {
            start_time: 8000,
            ..request
        }));
        assert_eq!(start_status(&mac), Some(Ok(())));
        assert_eq!(mac.coord.tx_offset, 8000);
        assert_eq!(mac.pib().beacon_tx_time, 8000);
    }

    #[test]
    fn beacon_opens_the_cap() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(6, 4)));

        let beacon_time = beacon_interval(6);
        run_until(&mut mac, &events, at(beacon_time - TX_SLOTTED_DELAY));
        let [(beacon, mode)] = &mac.radio().transmitted()[..] else {
            panic!("no beacon");
        };
        assert_eq!(*mode, TxMode::NoCca);
        let frame = Frame::new(&beacon[..]).unwrap();
        assert_eq!(frame.frame_control().frame_type(), FrameType::Beacon);
        let payload = BeaconPayload::new(frame.payload()).unwrap();
        assert_eq!(BeaconRepr::parse(&payload).superframe.beacon_order, 6);

        tx_done(&mut mac, &events, TxStatus::Success);
        assert_eq!(mac.schedule.phase, TxFlags::OUTGOING_CAP);
        assert!(mac.radio().rx.contains(RxReason::BEACON_NETWORK));

        let end = beacon_time + cap_end(15, 4, 6);
        run_until(&mut mac, &events, at(end - 1));
        assert_eq!(mac.schedule.phase, TxFlags::OUTGOING_CAP);
        run_until(&mut mac, &events, at(end));
        assert_eq!(mac.schedule.phase, TxFlags::INACTIVE);
        assert!(!mac.radio().rx.contains(RxReason::BEACON_NETWORK));

        // and the next one, one interval later
        mac.radio_mut().clear();
        run_until(&mut mac, &events, at(2 * beacon_time - TX_SLOTTED_DELAY));
        assert_eq!(mac.radio().transmitted().len(), 1);
    }

    #[test]
    fn no_active_period() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.pib.rx_on_when_idle = true;
        mac.request(MacRequest::MlmeStart(start(6, ORDER_NONE)));
        run_until(&mut mac, &events, at(beacon_interval(6) - TX_SLOTTED_DELAY));
        tx_done(&mut mac, &events, TxStatus::Success);
        assert_eq!(mac.schedule.phase, TxFlags::INACTIVE);
        assert!(!mac.radio().rx.contains(RxReason::BEACON_NETWORK));
        assert!(!mac.radio().rx.contains(RxReason::WHEN_IDLE));
    }

    fn data_request_from(device: u16) -> FrameBuffer {
        let header = HeaderRepr {
            ack_request: true,
            sequence_number: Some(0x44),
            ..HeaderRepr::new(
                FrameType::MacCommand,
                AddressingRepr {
                    dst_pan_id: PAN_ID,
                    dst_address: Address::short(0x0000),
                    src_pan_id: PAN_ID,
                    src_address: Address::short(device),
                },
            )
        };
        build_command(&header, &CommandRepr::DataRequest).unwrap()
    }

    #[test]
    fn indirect_data_in_the_cap() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(6, 6)));
        mac.request(MacRequest::McpsData(DataRequest {
            src_addr_mode: AddressingMode::Short,
            dst_pan_id: PAN_ID,
            dst_address: Address::short(0x0002),
            msdu: heapless::Vec::from_slice(&[0xab]).unwrap(),
            handle: 7,
            ack_request: true,
            indirect: true,
            security: Security::NONE,
        }));

        let beacon_time = beacon_interval(6);
        run_until(&mut mac, &events, at(beacon_time - TX_SLOTTED_DELAY));
        let beacon = mac.radio().last_transmitted().unwrap();
        let frame = Frame::new(&beacon[..]).unwrap();
        let payload = BeaconPayload::new(frame.payload()).unwrap();
        assert!(payload.is_pending(&[Address::short(0x0002)]));
        tx_done(&mut mac, &events, TxStatus::Success);

        mac.radio_mut().clear();
        rx(&mut mac, &events, data_request_from(0x0002), at(beacon_time + 500));
        let [(data, mode)] = &mac.radio().transmitted()[..] else {
            panic!("pending frame not sent");
        };
        assert_eq!(*mode, TxMode::SlottedCsma);
        assert_eq!(Frame::new(&data[..]).unwrap().payload(), &[0xab]);

        tx_done(&mut mac, &events, TxStatus::Success);
        assert!(matches!(
            mac.upper().confirms[..],
            [
                MacConfirm::MlmeStart(_),
                MacConfirm::McpsData(crate::mac::mcps::data::DataConfirm {
                    handle: 7,
                    status: Ok(()),
                    ..
                })
            ]
        ));
    }

    #[test]
    fn indirect_expires_after_persistence() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.pib.transaction_persistence_time = 2;
        mac.request(MacRequest::MlmeStart(start(6, 6)));
        mac.request(MacRequest::McpsData(DataRequest {
            src_addr_mode: AddressingMode::Short,
            dst_pan_id: PAN_ID,
            dst_address: Address::short(0x0002),
            msdu: heapless::Vec::new(),
            handle: 3,
            ack_request: true,
            indirect: true,
            security: Security::NONE,
        }));

        for n in 1..=2 {
            run_until(&mut mac, &events, at(n * beacon_interval(6) - TX_SLOTTED_DELAY));
            tx_done(&mut mac, &events, TxStatus::Success);
        }
        let status = mac.upper().confirms.iter().find_map(|c| match c {
            MacConfirm::McpsData(c) => Some(c.status),
            _ => None,
        });
        assert_eq!(status, Some(Err(Error::TransactionExpired)));
        assert!(mac.queue.is_empty());
    }

    #[test]
    fn realignment_before_restart() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(ORDER_NONE, ORDER_NONE)));
        assert_eq!(start_status(&mac), Some(Ok(())));
        mac.upper_mut().clear();

        mac.request(MacRequest::MlmeStart(StartRequest {
            channel: 20,
            coord_realignment: true,
            ..start(ORDER_NONE, ORDER_NONE)
        }));
        assert_eq!(mac.state(), MacState::Starting);
        assert!(start_status(&mac).is_none());
        // still on the old channel
        assert_eq!(mac.phy_pib().current_channel, CHANNEL);

        let frame = mac.radio().last_transmitted().unwrap();
        let frame = Frame::new(&frame[..]).unwrap();
        let addressing = frame.addressing().unwrap();
        assert_eq!(addressing.dst_address(), Address::BROADCAST);
        let command = crate::frame::MacCommand::new(frame.payload()).unwrap();
        assert_eq!(
            CommandRepr::parse(&command),
            Some(CommandRepr::CoordinatorRealignment {
                pan_id: PAN_ID,
                coordinator_short_address: 0x0000,
                channel: 20,
                short_address: NO_SHORT_ADDRESS,
                channel_page: Some(0),
            })
        );

        tx_done(&mut mac, &events, TxStatus::Success);
        assert_eq!(start_status(&mac), Some(Ok(())));
        assert_eq!(mac.state(), MacState::Idle);
        assert_eq!(mac.phy_pib().current_channel, 20);
    }

    fn beacon_request() -> FrameBuffer {
        let header = HeaderRepr {
            sequence_number: Some(0x10),
            ..HeaderRepr::new(
                FrameType::MacCommand,
                AddressingRepr {
                    dst_pan_id: BROADCAST_PAN_ID,
                    dst_address: Address::BROADCAST,
                    ..Default::default()
                },
            )
        };
        build_command(&header, &CommandRepr::BeaconRequest).unwrap()
    }

    #[test]
    fn beacon_request_answered_without_beacons() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        rx(&mut mac, &events, beacon_request(), at(10));
        // not started yet
        assert!(mac.radio().transmitted().is_empty());

        mac.request(MacRequest::MlmeStart(start(ORDER_NONE, ORDER_NONE)));
        rx(&mut mac, &events, beacon_request(), at(20));
        let reply = mac.radio().last_transmitted().unwrap();
        let reply = Frame::new(&reply[..]).unwrap();
        assert_eq!(reply.frame_control().frame_type(), FrameType::Beacon);
        assert_eq!(reply.addressing().unwrap().src_pan_id(), Some(PAN_ID));
    }

    #[test]
    fn broadcast_after_beacon() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(6, 6)));
        mac.request(MacRequest::McpsData(DataRequest {
            src_addr_mode: AddressingMode::Short,
            dst_pan_id: PAN_ID,
            dst_address: Address::BROADCAST,
            msdu: heapless::Vec::from_slice(&[1]).unwrap(),
            handle: 9,
            ack_request: false,
            indirect: true,
            security: Security::NONE,
        }));

        run_until(&mut mac, &events, at(beacon_interval(6) - TX_SLOTTED_DELAY));
        let beacon = mac.radio().last_transmitted().unwrap();
        assert!(Frame::new(&beacon[..]).unwrap().frame_control().frame_pending());

        mac.radio_mut().clear();
        tx_done(&mut mac, &events, TxStatus::Success);
        let frame = mac.radio().last_transmitted().unwrap();
        let frame = Frame::new(&frame[..]).unwrap();
        assert_eq!(frame.payload(), &[1]);
        assert_eq!(frame.addressing().unwrap().dst_address(), Address::BROADCAST);
    }

    #[test]
    fn failed_beacon_keeps_the_cap_closed() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(6, 4)));
        mac.request(MacRequest::McpsData(DataRequest {
            src_addr_mode: AddressingMode::Short,
            dst_pan_id: PAN_ID,
            dst_address: Address::BROADCAST,
            msdu: heapless::Vec::from_slice(&[1]).unwrap(),
            handle: 9,
            ack_request: false,
            indirect: true,
            security: Security::NONE,
        }));

        run_until(&mut mac, &events, at(beacon_interval(6) - TX_SLOTTED_DELAY));
        mac.radio_mut().clear();
        tx_done(&mut mac, &events, TxStatus::ChannelAccessFailure);

        assert_eq!(mac.schedule.phase, TxFlags::INACTIVE);
        assert!(!mac.radio().rx.contains(RxReason::BEACON_NETWORK));
        assert!(!mac.timers.is_armed(TimerId::BeaconPeriod));
        assert!(!mac.timers.is_armed(TimerId::BeaconBattLife));
        assert!(mac.timers.is_armed(TimerId::BeaconPrepare));
        // the broadcast waits for a beacon that announces it
        assert!(mac.radio().transmitted().is_empty());
        assert_eq!(mac.queue.len(), 1);
        assert!(mac.upper().confirms.iter().all(|c| !matches!(c, MacConfirm::McpsData(_))));
    }

    #[test]
    fn battery_life_extension_turns_receiver_off() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.pib.rx_on_when_idle = true;
        mac.request(MacRequest::MlmeStart(StartRequest {
            battery_life_extension: true,
            ..start(6, 6)
        }));

        let beacon_time = beacon_interval(6);
        run_until(&mut mac, &events, at(beacon_time - TX_SLOTTED_DELAY));
        tx_done(&mut mac, &events, TxStatus::Success);
        assert!(mac.radio().rx.contains(RxReason::WHEN_IDLE));
        assert!(mac.timers.is_armed(TimerId::BeaconBattLife));

        run_until(&mut mac, &events, at(beacon_time + 2000));
        assert_eq!(mac.schedule.phase, TxFlags::OUTGOING_CAP);
        assert!(mac.radio().rx.is_empty());
    }

    #[test]
    fn battery_life_timer_needs_idle_receiver() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(StartRequest {
            battery_life_extension: true,
            ..start(6, 6)
        }));
        run_until(&mut mac, &events, at(beacon_interval(6) - TX_SLOTTED_DELAY));
        tx_done(&mut mac, &events, TxStatus::Success);
        assert!(!mac.timers.is_armed(TimerId::BeaconBattLife));
        assert!(mac.radio().rx.contains(RxReason::BEACON_NETWORK));
    }

    #[test]
    fn restart_without_beacons_flushes_queue() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.pib.transaction_persistence_time = 2;
        mac.request(MacRequest::MlmeStart(start(6, 6)));
        for (handle, dst_address) in [(3, Address::short(0x0002)), (9, Address::BROADCAST)] {
            mac.request(MacRequest::McpsData(DataRequest {
                src_addr_mode: AddressingMode::Short,
                dst_pan_id: PAN_ID,
                dst_address,
                msdu: heapless::Vec::from_slice(&[handle]).unwrap(),
                handle,
                ack_request: false,
                indirect: true,
                security: Security::NONE,
            }));
        }
        assert!(mac.radio().transmitted().is_empty());

        mac.request(MacRequest::MlmeStart(start(ORDER_NONE, ORDER_NONE)));
        let [(frame, mode)] = &mac.radio().transmitted()[..] else {
            panic!("broadcast not sent");
        };
        assert_eq!(*mode, TxMode::UnslottedCsma);
        let frame = Frame::new(&frame[..]).unwrap();
        assert_eq!(frame.payload(), &[9]);
        assert_eq!(frame.addressing().unwrap().dst_address(), Address::BROADCAST);
        tx_done(&mut mac, &events, TxStatus::Success);

        run_until(&mut mac, &events, at(3 * BASE_SUPERFRAME_DURATION));
        let statuses: std::vec::Vec<_> = mac
            .upper()
            .confirms
            .iter()
            .filter_map(|c| match c {
                MacConfirm::McpsData(c) => Some((c.handle, c.status)),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, [(9, Ok(())), (3, Err(Error::TransactionExpired))]);
        assert!(mac.queue.is_empty());
        assert!(!mac.timers.is_armed(TimerId::IndirectExpiry));
    }

    #[test]
    fn scan_skips_beacons() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeStart(start(6, 6)));
        mac.request(MacRequest::MlmeScan(ScanRequest {
            scan_type: ScanType::Passive,
            channels: 1 << 11,
            duration: 14,
            page: 0,
            security: Security::NONE,
        }));
        assert_eq!(mac.state(), MacState::Scanning);
        let bsn = mac.pib.bsn;

        run_until(&mut mac, &events, at(beacon_interval(6) - TX_SLOTTED_DELAY));
        assert!(mac.radio().transmitted().is_empty());
        assert_eq!(mac.pib.bsn, bsn.wrapping_add(1));
        assert!(mac.coord.is_beaconing());
    }
}
