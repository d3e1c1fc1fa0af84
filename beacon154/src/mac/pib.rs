use heapless::Vec;

use crate::frame::ORDER_NONE;

use super::constants::*;

/// PAN Information Base (PIB) specified by MAC sublayer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pib {
    /// The extended address assigned to the device.
    pub extended_address: [u8; 8],
    /// Indication of whether a coordinator is currently allowing association.
    /// If `true`, association is permitted.
    pub association_permit: bool,
    /// Indication of whether a device automatically sends a data request
    /// command if its address is listed in the beacon frame.
    pub auto_request: bool,
    /// Indication of whether battery life extension, by reduction of
    /// coordinator receiver operation time during the CAP, is enabled.
    pub batt_life_ext: bool,
    /// In battery life extension mode, the number of backoff periods during
    /// which the receiver is enabled after the IFS following a beacon.
    pub batt_life_ext_periods: u8,
    /// The contents of the beacon payload.
    pub beacon_payload: Vec<u8, MAX_BEACON_PAYLOAD>,
    /// Indicates the frequency with which the beacon is transmitted. A value
    /// of 15 indicates that the coordinator will not transmit periodic
    /// beacons.
    pub beacon_order: u8,
    /// The length of the active portion of the outgoing superframe. A value
    /// of 15 indicates that the superframe will not be active after the
    /// beacon.
    pub superframe_order: u8,
    /// Offset from the tracked beacon at which our own beacon is sent.
    pub beacon_tx_time: u32,
    /// The sequence number added to the transmitted beacon frame.
    pub bsn: u8,
    /// The sequence number added to the transmitted data or MAC command
    /// frame.
    pub dsn: u8,
    /// The address of the coordinator through which the device is associated.
    pub coord_extended_address: [u8; 8],
    /// The short address assigned to the coordinator through which the device
    /// is associated. A value of 0xfffe indicates that the coordinator is
    /// only using its extended address. A value of 0xffff indicates that this
    /// value is unknown.
    pub coord_short_address: u16,
    /// The maximum number of retries allowed after a transmission failure.
    pub max_frame_retries: u8,
    /// The maximum number of symbols to wait for a frame intended as a
    /// response to a data request frame.
    pub max_frame_total_wait_time: u32,
    /// The maximum number of consecutive beacons that may be missed before
    /// the device declares a loss of synchronization.
    pub max_lost_beacons: u8,
    /// The identifier of the PAN on which the device is operating. If this
    /// value is 0xffff, the device is not associated.
    pub pan_id: u16,
    /// Indication of whether the MAC sublayer is in a promiscuous (receive
    /// all) mode. A value of `true` indicates that the MAC sublayer accepts
    /// all frames received from the PHY.
    pub promiscuous_mode: bool,
    /// The maximum time, in multiples of the base superframe duration, a
    /// device shall wait for a response command frame to be available
    /// following a request command frame.
    pub response_wait_time: u8,
    /// Indication of whether the MAC sublayer is to enable its receiver
    /// during idle periods. For a beacon-enabled PAN, this attribute is
    /// relevant only during the CAP of the incoming superframe. For a
    /// nonbeacon-enabled PAN, this attribute is relevant at all times.
    pub rx_on_when_idle: bool,
    /// Indication of whether the MAC sublayer has security enabled. A value
    /// of `true` indicates that security is enabled, while a value of `false`
    /// indicates that security is disabled.
    pub security_enabled: bool,
    /// The address that the device uses to communicate in the PAN. If the
    /// device is the PAN coordinator, this value shall be chosen before a PAN
    /// is started. Otherwise, the short address is allocated by a coordinator
    /// during association.
    pub short_address: u16,
    /// The maximum time, in beacon intervals (or base superframe durations
    /// without beacons), a transaction is stored by a coordinator and
    /// indicated in its beacon.
    pub transaction_persistence_time: u16,
    /// The device is the PAN coordinator.
    pub pan_coordinator: bool,
    /// Larger beacon order a device may follow when nothing is pending
    /// for it, waking for every `2^(device_beacon_order - beacon_order)`th
    /// beacon only. 15 disables it.
    pub device_beacon_order: u8,
}

impl Default for Pib {
    fn default() -> Self {
        Self {
            extended_address: [0; 8],
            association_permit: false,
            auto_request: true,
            batt_life_ext: false,
            batt_life_ext_periods: 6,
            beacon_payload: Vec::new(),
            beacon_order: ORDER_NONE,
            superframe_order: ORDER_NONE,
            beacon_tx_time: 0,
            bsn: 0,
            dsn: 0,
            coord_extended_address: [0; 8],
            coord_short_address: NO_SHORT_ADDRESS,
            max_frame_retries: MAC_MAX_FRAME_RETRIES,
            max_frame_total_wait_time: MAC_MAX_FRAME_TOTAL_WAIT_TIME,
            max_lost_beacons: MAC_MAX_LOST_BEACONS,
            pan_id: MAC_PAN_ID,
            promiscuous_mode: false,
            response_wait_time: MAC_RESPONSE_WAIT_TIME,
            rx_on_when_idle: false,
            security_enabled: false,
            short_address: NO_SHORT_ADDRESS,
            transaction_persistence_time: MAC_TRANSACTION_PERSISTENCE_TIME,
            pan_coordinator: false,
            device_beacon_order: ORDER_NONE,
        }
    }
}

impl Pib {
    /// The beacon-enabled PAN we are part of, as coordinator or device.
    pub fn beacon_enabled(&self) -> bool {
        self.beacon_order < ORDER_NONE
    }

    /// Next data sequence number.
    pub(crate) fn next_dsn(&mut self) -> u8 {
        let dsn = self.dsn;
        self.dsn = self.dsn.wrapping_add(1);
        dsn
    }

    /// Next beacon sequence number.
    pub(crate) fn next_bsn(&mut self) -> u8 {
        let bsn = self.bsn;
        self.bsn = self.bsn.wrapping_add(1);
        bsn
    }
}
