//! Device role: synchronizing with the beacons of our coordinator.
//!
//! A sync request opens a receive window of one beacon interval. Once the
//! beacon is heard, a tracking device arms `BeaconTrack` just before the
//! next one is due, opens the receiver and arms `BeaconSync` as the end of
//! the window. Each missed beacon widens the window by one margin, until
//! `macMaxLostBeacons` are missed in a row.

use heapless::Vec;
use rand_core::RngCore;

use crate::frame::{Address, BeaconPayload, CommandRepr, SuperframeRepr, ORDER_NONE};
use crate::hopping::{FrequencyHopping, CHANNEL_HOPPING_SUB_IE};
use crate::mac::command::MacIndication;
use crate::mac::constants::*;
use crate::mac::event::{Event, RxFrame};
use crate::mac::mlme::sync::SyncLossIndication;
use crate::mac::queue::TxFlags;
use crate::mac::security::Security;
use crate::mac::superframe::{beacon_interval, cap_end, cap_start};
use crate::mac::{Error, Mac};
use crate::phy::radio::{Radio, RxReason};
use crate::timer::TimerId;
use crate::upper::UpperLayer;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackState {
    #[default]
    None,
    /// Waiting for the first beacon.
    Sync,
    Tracking,
}

#[derive(Debug, Default)]
pub struct Tracker {
    pub(crate) state: TrackState,
    /// Keep tracking after the first beacon.
    pub(crate) track: bool,
    /// Beacons missed in a row.
    pub(crate) lost: u8,
    /// Superframe of the last beacon heard.
    pub(crate) superframe: SuperframeRepr,
    /// Beacon order we wake up for, at least the coordinator's.
    pub(crate) followed_order: u8,
}

impl Tracker {
    pub fn is_tracking(&self) -> bool {
        self.state == TrackState::Tracking
    }
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Wait for the next beacon of the coordinator.
    pub(crate) fn start_sync(&mut self, track: bool) {
        self.timers.cancel(TimerId::BeaconTrack);
        self.timers.cancel(TimerId::BeaconIncomingPeriod);
        self.tracker.state = TrackState::Sync;
        self.tracker.track = track;
        self.tracker.lost = 0;
        self.tracker.followed_order = self.pib.beacon_order;

        self.rx_set(RxReason::BEACON_SYNC, true);
        self.arm_sync_window();
    }

    fn arm_sync_window(&mut self) {
        let now = self.radio.now();
        let window = beacon_interval(self.pib.beacon_order)
            + BASE_SUPERFRAME_DURATION
            + MAC_BEACON_PROCESS_DELAY;
        self.timers.arm(TimerId::BeaconSync, now, window);
    }

    /// Arm the opening of the receive window for the next followed beacon.
    fn arm_track(&mut self) {
        let order = self.tracker.followed_order;
        let margin = BEACON_MARGIN[order as usize] * (self.tracker.lost as u32 + 1);
        let now = self.radio.now();
        self.timers.arm_aligned(
            TimerId::BeaconTrack,
            now,
            beacon_interval(order).saturating_sub(margin),
        );
    }

    pub(crate) fn beacon_received(&mut self, frame: RxFrame) {
        let Some(descriptor) = self.pan_descriptor(&frame) else {
            return;
        };
        let ours = self.tracker.state != TrackState::None
            && self.is_coordinator(&descriptor.coord_address)
            && descriptor.coord_pan_id == self.pib.pan_id;
        if !ours {
            if !self.pib.auto_request {
                self.beacon_notify(&frame, descriptor);
            }
            return;
        }

        let superframe = descriptor.superframe;
        let beacon_order = superframe.beacon_order;
        if beacon_order == ORDER_NONE {
            warn!("coordinator stopped sending beacons");
            self.sync_loss(Error::BeaconLoss, true);
            return;
        }

        self.timers.cancel(TimerId::BeaconSync);
        self.rx_set(RxReason::BEACON_SYNC | RxReason::BEACON_DEVICE, false);
        self.tracker.lost = 0;
        self.tracker.superframe = superframe;
        if !self.coord.is_beaconing() {
            self.pib.beacon_order = beacon_order;
            self.pib.superframe_order = superframe.superframe_order;
        }

        self.timers.sync_rollover(beacon_interval(beacon_order));
        self.timers.realign(frame.timestamp);

        if let Ok(ies) = frame.frame().information_elements() {
            if let Some(content) = ies.mlme_sub_ie(true, CHANNEL_HOPPING_SUB_IE) {
                self.hopping.on_beacon_ie(content);
            }
        }

        if superframe.superframe_order != ORDER_NONE {
            let end = cap_end(
                superframe.final_cap_slot,
                superframe.superframe_order,
                beacon_order,
            );
            self.schedule.cap_start = cap_start(frame.buffer.len());
            self.schedule.incoming_cap_end = end;
            self.schedule.phase = TxFlags::INCOMING_CAP;
            self.timers
                .arm(TimerId::BeaconIncomingPeriod, frame.timestamp, end);
            if self.pib.rx_on_when_idle {
                self.rx_set(RxReason::WHEN_IDLE, true);
            }
        }

        let mut own: Vec<Address, 2> = Vec::new();
        let _ = own.push(Address::Extended(self.pib.extended_address));
        if self.pib.short_address < Address::USE_EXTENDED {
            let _ = own.push(Address::short(self.pib.short_address));
        }
        let (pending, has_payload) = BeaconPayload::new(frame.frame().payload())
            .map(|beacon| (beacon.is_pending(&own), !beacon.beacon_payload().is_empty()))
            .unwrap_or_default();
        let broadcast = frame.frame().frame_control().frame_pending();
        if broadcast {
            self.rx_set(RxReason::BROADCAST_PEND, true);
        }

        if self.tracker.track {
            self.tracker.state = TrackState::Tracking;
            let device_order = self.pib.device_beacon_order;
            self.tracker.followed_order = if device_order > beacon_order
                && device_order < ORDER_NONE
                && !pending
                && !broadcast
            {
                device_order
            } else {
                beacon_order
            };
            self.arm_track();
        } else {
            self.tracker.state = TrackState::None;
        }
        trace!(
            "beacon {} from coordinator, pending {}",
            frame.frame().sequence_number().unwrap_or_default(),
            pending
        );

        if !self.pib.auto_request || has_payload {
            self.beacon_notify(&frame, descriptor);
        }
        if self.pib.auto_request && pending {
            self.raise(Event::AutoPoll);
        }
    }

    /// Open the receive window for the next beacon.
    pub(crate) fn beacon_track(&mut self) {
        let order = self.tracker.followed_order;
        let margin = BEACON_MARGIN[order as usize] * (self.tracker.lost as u32 + 1);
        self.rx_set(RxReason::BEACON_DEVICE, true);

        let now = self.radio.now();
        self.timers.arm_aligned(
            TimerId::BeaconSync,
            now,
            BEACON_TIMEOUT_MULTIPLE * margin + MAC_BEACON_PROCESS_DELAY,
        );
    }

    /// No beacon inside the receive window.
    pub(crate) fn beacon_missed(&mut self) {
        self.rx_set(RxReason::BEACON_SYNC | RxReason::BEACON_DEVICE, false);
        self.tracker.lost = self.tracker.lost.saturating_add(1);
        debug!("beacon missed ({})", self.tracker.lost);
        if self.tracker.lost >= self.pib.max_lost_beacons {
            warn!("{} beacons missed, sync lost", self.tracker.lost);
            self.sync_loss(Error::BeaconLoss, true);
            return;
        }

        match self.tracker.state {
            TrackState::Sync => {
                self.rx_set(RxReason::BEACON_SYNC, true);
                self.arm_sync_window();
            }
            TrackState::Tracking => {
                // every beacon counts until we hear one again
                self.tracker.followed_order = self.tracker.superframe.beacon_order;
                self.arm_track();
            }
            TrackState::None => {}
        }
    }

    /// End of the incoming CAP.
    pub(crate) fn incoming_period_end(&mut self) {
        if self.schedule.phase == TxFlags::INCOMING_CAP {
            self.schedule.phase = TxFlags::INACTIVE;
        }
        self.rx_set(RxReason::BROADCAST_PEND | RxReason::WHEN_IDLE, false);

        if !self.coord.is_beaconing() {
            let now = self.radio.now();
            if let Some(channel) = self.hopping.next_channel(now) {
                let page = self.phy_pib.current_page;
                self.tune(page, channel);
            }
        }
    }

    /// The broadcast announced in the beacon arrived.
    pub(crate) fn broadcast_received(&mut self) {
        self.rx_set(RxReason::BROADCAST_PEND, false);
    }

    /// Stop following the coordinator. Frames waiting for its CAP go out in
    /// our own schedule.
    pub(crate) fn sync_loss(&mut self, reason: Error, notify: bool) {
        self.timers.cancel(TimerId::BeaconSync);
        self.timers.cancel(TimerId::BeaconTrack);
        self.timers.cancel(TimerId::BeaconIncomingPeriod);
        self.rx_set(
            RxReason::BEACON_SYNC | RxReason::BEACON_DEVICE | RxReason::BROADCAST_PEND,
            false,
        );
        self.tracker.state = TrackState::None;
        self.tracker.lost = 0;

        if self.coord.is_beaconing() && !self.pib.pan_coordinator {
            self.stop_beaconing();
        }
        self.schedule.phase = TxFlags::OUTGOING_CAP;
        self.queue.flush_incoming_cap();

        if notify {
            let indication = SyncLossIndication {
                reason,
                pan_id: self.pib.pan_id,
                channel: self.phy_pib.current_channel,
                page: self.phy_pib.current_page,
                security: Security::NONE,
            };
            self.upper
                .mac_indication(MacIndication::MlmeSyncLoss(indication));
        }
    }

    /// The coordinator moved the PAN.
    pub(crate) fn realign_received(&mut self, frame: RxFrame) {
        if !self.is_coordinator(&frame.src_address()) {
            trace!("realignment from another coordinator");
            return;
        }
        let Some(CommandRepr::CoordinatorRealignment {
            pan_id,
            coordinator_short_address,
            channel,
            short_address,
            channel_page,
        }) = frame.command()
        else {
            return;
        };

        info!("realigned to PAN {:04x} on channel {}", pan_id, channel);
        let tracking = self.tracker.state != TrackState::None && self.tracker.track;
        let page = channel_page.unwrap_or(self.phy_pib.current_page);
        self.set_pan_id(pan_id);
        self.pib.coord_short_address = coordinator_short_address;
        if short_address != NO_SHORT_ADDRESS {
            self.pib.short_address = short_address;
            self.radio.set_short_address(short_address);
        }
        self.tune(page, channel);

        self.sync_loss(Error::Realignment, true);
        if tracking && self.pib.beacon_enabled() {
            self.start_sync(true);
        }
    }
}
