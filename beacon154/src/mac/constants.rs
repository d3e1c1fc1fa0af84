#![allow(dead_code)]
pub use customizable::*;

use crate::phy::constants::{CCA_TIME, TURNAROUND_TIME};

pub const BROADCAST_PAN_ID: u16 = 0xffff;
/// Short address of a device that is not associated.
pub const NO_SHORT_ADDRESS: u16 = 0xffff;
// Constants of section 8.4.2, Table 8-93, MAC constants
/// The number of symbols forming a superframe slot when the superframe order is
/// equal to zero, as described in 6.2.1.
pub const BASE_SLOT_DURATION: u32 = 60;
/// The number of slots contained in any superframe.
pub const NUM_SUPERFRAME_SLOTS: u32 = 16;
/// The number of symbols forming a superframe when the superframe order is
/// equal to zero.
pub const BASE_SUPERFRAME_DURATION: u32 = BASE_SLOT_DURATION * NUM_SUPERFRAME_SLOTS;
/// The number of consecutive lost beacons that will cause the MAC sublayer of a
/// receiving device to declare a loss of synchronization.
pub const MAX_LOST_BEACONS: u8 = 4;
/// The maximum size of an MPDU, in octets, that can be followed by a SIFS
/// period.
pub const MAX_SIFS_FRAME_SIZE: usize = 18;
/// The minimum number of symbols forming the CAP.
pub const MIN_CAP_LENGTH: u32 = 440;
/// The number of symbols forming the basic time period used by the CSMA-CA
/// algorithm.
pub const UNIT_BACKOFF_PERIOD: u32 = TURNAROUND_TIME + CCA_TIME;
/// The minimum number of symbols forming a LIFS period.
pub const LIFS_PERIOD: u32 = 40;

/// Beacon reception margin per beacon order, covering clock drift over one
/// beacon interval.
pub const BEACON_MARGIN: [u32; 16] = [
    12, 12, 12, 12, 12, 12, 12, 24, 48, 96, 192, 384, 768, 1324, 2588, 0,
];
/// Guard before the end of the CAP when the superframe spans the whole
/// beacon interval.
pub const CAP_GUARD_FULL: u32 = 160;
/// Guard before the end of the CAP followed by an inactive period.
pub const CAP_GUARD: u32 = 240;
/// Start of the battery life extension period after the end of the beacon.
pub const BATT_LIFE_OFFSET: u32 = LIFS_PERIOD;
/// Time between the transmit call and the start of a transmission without
/// channel access.
pub const TX_SLOTTED_DELAY: u32 = TURNAROUND_TIME;
/// Width of the beacon reception window, in beacon margins.
pub const BEACON_TIMEOUT_MULTIPLE: u32 = 2;
/// Largest beacon payload.
pub const MAX_BEACON_PAYLOAD: usize = 52;
/// Most PAN descriptors collected by one scan.
pub const MAX_PAN_DESCRIPTORS: usize = 8;

#[cfg(test)]
mod customizable {
    #![allow(dead_code)]

    pub const MAC_MAX_FRAME_RETRIES: u8 = 3; // 0-7
    pub const MAC_MAX_DIRECT: usize = 4;
    pub const MAC_MAX_INDIRECT: usize = 4;
    pub const MAC_MAX_DATA: usize = 118;
    pub const MAC_TRANSACTION_PERSISTENCE_TIME: u16 = 4;
    pub const MAC_RESPONSE_WAIT_TIME: u8 = 32;
    pub const MAC_MAX_FRAME_TOTAL_WAIT_TIME: u32 = 1220;
    pub const MAC_PAN_ID: u16 = 0xffff;
    pub const MAC_MAX_LOST_BEACONS: u8 = 4;
    pub const MAC_BEACON_PREPARE_LEAD: u32 = 320;
    pub const MAC_BEACON_PROCESS_DELAY: u32 = 64;
}

#[cfg(not(test))]
mod customizable {
    #![allow(unused)]
    include!(concat!(env!("OUT_DIR"), "/config.rs"));
}
