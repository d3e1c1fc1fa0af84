use heapless::Vec;
use rand_core::RngCore;

use crate::frame::{Address, AddressingRepr, CommandRepr, FrameType};
use crate::hopping::FrequencyHopping;
use crate::mac::command::MacConfirm;
use crate::mac::constants::{BASE_SUPERFRAME_DURATION, BROADCAST_PAN_ID, MAX_PAN_DESCRIPTORS};
use crate::mac::event::{Event, RxFrame};
use crate::mac::queue::{TxFlags, TxKind};
use crate::mac::security::Security;
use crate::mac::utils::build_command;
use crate::mac::{Error, Mac, Result};
use crate::phy::constants::is_valid_channel;
use crate::phy::radio::{Radio, RxReason};
use crate::timer::TimerId;
use crate::upper::UpperLayer;

pub use super::beacon::PanDescriptor;

/// Largest scan duration exponent.
pub const MAX_SCAN_DURATION: u8 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanType {
    /// Listen for beacons.
    Passive,
    /// Send a beacon request on each channel, then listen.
    Active,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanRequest {
    pub scan_type: ScanType,
    /// Bit `n` selects channel `n` of `page`.
    pub channels: u32,
    /// Each channel is scanned for `BASE_SUPERFRAME_DURATION * (2^duration + 1)`
    /// symbols.
    pub duration: u8,
    pub page: u8,
    pub security: Security,
}

#[derive(Debug, Clone)]
pub struct ScanConfirm {
    pub status: Result<()>,
    pub scan_type: ScanType,
    pub page: u8,
    /// Channels left out because the descriptor list filled up.
    pub unscanned_channels: u32,
    pub pan_descriptors: Vec<PanDescriptor, MAX_PAN_DESCRIPTORS>,
}

impl ScanConfirm {
    pub fn failed(request: &ScanRequest, error: Error) -> Self {
        Self {
            status: Err(error),
            scan_type: request.scan_type,
            page: request.page,
            unscanned_channels: request.channels,
            pan_descriptors: Vec::new(),
        }
    }
}

/// A scan in progress, and what to restore once it is over.
#[derive(Debug)]
pub struct ScanState {
    request: ScanRequest,
    status: Result<()>,
    /// Channels still to scan.
    remaining: u32,
    descriptors: Vec<PanDescriptor, MAX_PAN_DESCRIPTORS>,
    restore_channel: u8,
    restore_page: u8,
    restore_pan_id: u16,
    restore_phase: TxFlags,
}

fn validate(request: &ScanRequest) -> Result<()> {
    if request.duration > MAX_SCAN_DURATION || request.channels == 0 {
        return Err(Error::InvalidParameter);
    }
    let unsupported = (0..32)
        .filter(|ch| request.channels & (1 << ch) != 0)
        .any(|ch| !is_valid_channel(request.page, ch as u8));
    if unsupported {
        return Err(Error::InvalidParameter);
    }
    Ok(())
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Scan the requested channels one at a time. The scan confirm carries
    /// the coordinators heard; our channel and PAN ID are restored
    /// afterwards.
    pub(crate) fn mlme_scan_request(&mut self, request: ScanRequest) {
        let status = validate(&request).and_then(|()| self.check_security(&request.security));

        self.scan = Some(ScanState {
            request,
            status,
            remaining: if status.is_ok() { request.channels } else { 0 },
            descriptors: Vec::new(),
            restore_channel: self.phy_pib.current_channel,
            restore_page: self.phy_pib.current_page,
            restore_pan_id: self.pib.pan_id,
            restore_phase: self.schedule.phase,
        });
        if status.is_err() {
            self.raise(Event::ScanComplete);
            return;
        }

        info!("{:?} scan of {:08x}", request.scan_type, request.channels);
        self.schedule.phase = TxFlags::SCAN_RELATED;
        self.set_pan_id(BROADCAST_PAN_ID);
        self.rx_set(RxReason::SCAN, true);
        self.next_scan_channel();
    }

    /// The dwell time of a channel elapsed, or the scan just started.
    pub(crate) fn next_scan_channel(&mut self) {
        let Some(scan) = self.scan.as_mut() else {
            return;
        };
        if scan.remaining == 0 {
            self.raise(Event::ScanComplete);
            return;
        }
        let channel = scan.remaining.trailing_zeros() as u8;
        scan.remaining &= !(1 << channel);
        let request = scan.request;

        trace!("scanning channel {}", channel);
        self.tune(request.page, channel);
        if request.scan_type == ScanType::Active {
            if let Err(error) = self.send_beacon_request() {
                warn!("beacon request on channel {} failed: {:?}", channel, error);
            }
        }

        let now = self.radio.now();
        let dwell = BASE_SUPERFRAME_DURATION * ((1 << request.duration) + 1);
        self.timers.arm(TimerId::ScanDwell, now, dwell);
    }

    fn send_beacon_request(&mut self) -> Result<()> {
        let addressing = AddressingRepr {
            dst_pan_id: BROADCAST_PAN_ID,
            dst_address: Address::BROADCAST,
            ..Default::default()
        };
        let header = self.header(FrameType::MacCommand, addressing, false, &Security::NONE);
        let frame = build_command(&header, &CommandRepr::BeaconRequest)?;
        self.enqueue(frame, TxKind::BeaconRequest, Address::BROADCAST, false)
    }

    /// A beacon arrived while scanning. Every coordinator is listed once per
    /// channel; a full list ends the scan.
    pub(crate) fn scan_beacon(&mut self, frame: RxFrame) {
        let Some(descriptor) = self.pan_descriptor(&frame) else {
            return;
        };
        let Some(scan) = self.scan.as_mut() else {
            return;
        };

        let known = scan.descriptors.iter().any(|d| {
            d.coord_address == descriptor.coord_address
                && d.coord_pan_id == descriptor.coord_pan_id
                && d.channel == descriptor.channel
        });
        if !known {
            debug!(
                "PAN {:04x} on channel {}",
                descriptor.coord_pan_id, descriptor.channel
            );
            let _ = scan.descriptors.push(descriptor);
        }
        let full = scan.descriptors.is_full();

        if !self.pib.auto_request {
            self.beacon_notify(&frame, descriptor);
        }
        if full {
            self.raise(Event::ScanComplete);
        }
    }

    pub(crate) fn scan_complete(&mut self) {
        self.timers.cancel(TimerId::ScanDwell);
        self.rx_set(RxReason::SCAN, false);
        self.queue
            .remove_where(|e| e.flags.contains(TxFlags::SCAN_RELATED));

        let Some(scan) = self.scan.take() else {
            return;
        };
        self.schedule.phase = scan.restore_phase;
        self.tune(scan.restore_page, scan.restore_channel);
        self.set_pan_id(scan.restore_pan_id);

        let status = match scan.status {
            Ok(()) if scan.descriptors.is_empty() => Err(Error::NoBeacon),
            status => status,
        };
        self.upper.mac_confirm(MacConfirm::MlmeScan(ScanConfirm {
            status,
            scan_type: scan.request.scan_type,
            page: scan.request.page,
            unscanned_channels: if scan.status.is_ok() {
                scan.remaining
            } else {
                scan.request.channels
            },
            pan_descriptors: scan.descriptors,
        }));
    }
}
