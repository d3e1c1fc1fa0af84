use heapless::Vec;
use rand_core::RngCore;

use crate::frame::ORDER_NONE;
use crate::hopping::FrequencyHopping;
use crate::mac::constants::{MAX_BEACON_PAYLOAD, MAX_LOST_BEACONS};
use crate::mac::device::TrackState;
use crate::mac::{Error, Mac, Result};
use crate::phy::constants::is_valid_channel;
use crate::phy::radio::{Radio, RxReason};
use crate::upper::UpperLayer;

/// Attributes that may be written by an upper layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PibAttribute {
    PanId(u16),
    ShortAddress(u16),
    ExtendedAddress([u8; 8]),
    CoordShortAddress(u16),
    CoordExtendedAddress([u8; 8]),
    AssociationPermit(bool),
    AutoRequest(bool),
    BattLifeExt(bool),
    BattLifeExtPeriods(u8),
    BeaconPayload(Vec<u8, MAX_BEACON_PAYLOAD>),
    Bsn(u8),
    Dsn(u8),
    MaxFrameRetries(u8),
    MaxFrameTotalWaitTime(u32),
    MaxLostBeacons(u8),
    PromiscuousMode(bool),
    ResponseWaitTime(u8),
    RxOnWhenIdle(bool),
    SecurityEnabled(bool),
    TransactionPersistenceTime(u16),
    DeviceBeaconOrder(u8),
    /// Only while no PAN is tracked or started on it.
    BeaconOrder(u8),
    CurrentChannel { page: u8, channel: u8 },
    TxPower(i8),
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Used by the next higher layer to attempt to write the given value to
    /// the indicated MAC or PHY PIB attribute. Addresses and the channel
    /// are applied to the radio at once.
    pub fn set(&mut self, attribute: PibAttribute) -> Result<()> {
        trace!("set {:?}", attribute);
        match attribute {
            PibAttribute::PanId(pan_id) => self.set_pan_id(pan_id),
            PibAttribute::ShortAddress(address) => {
                self.pib.short_address = address;
                self.radio.set_short_address(address);
            }
            PibAttribute::ExtendedAddress(address) => {
                self.pib.extended_address = address;
                self.radio.set_extended_address(address);
            }
            PibAttribute::CoordShortAddress(address) => self.pib.coord_short_address = address,
            PibAttribute::CoordExtendedAddress(address) => {
                self.pib.coord_extended_address = address;
            }
            PibAttribute::AssociationPermit(permit) => self.pib.association_permit = permit,
            PibAttribute::AutoRequest(auto) => self.pib.auto_request = auto,
            PibAttribute::BattLifeExt(enabled) => self.pib.batt_life_ext = enabled,
            PibAttribute::BattLifeExtPeriods(periods) => {
                if !(6..=41).contains(&periods) {
                    return Err(Error::InvalidParameter);
                }
                self.pib.batt_life_ext_periods = periods;
            }
            PibAttribute::BeaconPayload(payload) => self.pib.beacon_payload = payload,
            PibAttribute::Bsn(bsn) => self.pib.bsn = bsn,
            PibAttribute::Dsn(dsn) => self.pib.dsn = dsn,
            PibAttribute::MaxFrameRetries(retries) => {
                if retries > 7 {
                    return Err(Error::InvalidParameter);
                }
                self.pib.max_frame_retries = retries;
            }
            PibAttribute::MaxFrameTotalWaitTime(wait) => self.pib.max_frame_total_wait_time = wait,
            PibAttribute::MaxLostBeacons(lost) => {
                if lost == 0 || lost > MAX_LOST_BEACONS {
                    return Err(Error::InvalidParameter);
                }
                self.pib.max_lost_beacons = lost;
            }
            PibAttribute::PromiscuousMode(enabled) => {
                self.pib.promiscuous_mode = enabled;
                self.rx_set(RxReason::WHEN_IDLE, enabled || self.pib.rx_on_when_idle);
            }
            PibAttribute::ResponseWaitTime(wait) => {
                if !(2..=64).contains(&wait) {
                    return Err(Error::InvalidParameter);
                }
                self.pib.response_wait_time = wait;
            }
            PibAttribute::RxOnWhenIdle(enabled) => {
                self.pib.rx_on_when_idle = enabled;
                // in a beacon-enabled PAN only the CAP counts
                if !self.pib.beacon_enabled() {
                    self.rx_set(RxReason::WHEN_IDLE, enabled);
                }
            }
            PibAttribute::SecurityEnabled(enabled) => self.pib.security_enabled = enabled,
            PibAttribute::TransactionPersistenceTime(time) => {
                self.pib.transaction_persistence_time = time;
            }
            PibAttribute::DeviceBeaconOrder(order) => {
                if order > ORDER_NONE {
                    return Err(Error::InvalidParameter);
                }
                self.pib.device_beacon_order = order;
            }
            PibAttribute::BeaconOrder(order) => {
                if order > ORDER_NONE {
                    return Err(Error::InvalidParameter);
                }
                if self.coord.started || self.tracker.state != TrackState::None {
                    return Err(Error::BadState);
                }
                self.pib.beacon_order = order;
            }
            PibAttribute::CurrentChannel { page, channel } => {
                if !is_valid_channel(page, channel) {
                    return Err(Error::InvalidParameter);
                }
                self.tune(page, channel);
            }
            PibAttribute::TxPower(dbm) => {
                self.phy_pib.tx_power = dbm;
                self.radio.set_power(dbm);
            }
        }
        Ok(())
    }
}
