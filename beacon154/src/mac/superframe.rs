//! Superframe timing.
//!
//! All values are in symbols. Offsets are relative to the start of the
//! beacon that opens the superframe.

use crate::frame::ORDER_NONE;
use crate::phy::constants::airtime;

use super::constants::{BASE_SLOT_DURATION, BASE_SUPERFRAME_DURATION, CAP_GUARD, CAP_GUARD_FULL};
use super::queue::TxFlags;

/// `BEACON_INTERVAL(bo)`: time between two beacons.
pub const fn beacon_interval(beacon_order: u8) -> u32 {
    BASE_SUPERFRAME_DURATION << beacon_order
}

/// `SF_INTERVAL(so)`: length of the active period.
pub const fn superframe_interval(superframe_order: u8) -> u32 {
    BASE_SUPERFRAME_DURATION << superframe_order
}

/// Guard kept free before the end of the CAP.
pub const fn cap_guard(superframe_order: u8, beacon_order: u8) -> u32 {
    if superframe_order == beacon_order {
        CAP_GUARD_FULL
    } else {
        CAP_GUARD
    }
}

/// The CAP starts when the beacon is on air.
pub const fn cap_start(beacon_len: usize) -> u32 {
    airtime(beacon_len)
}

/// End of the CAP: end of the final CAP slot minus the guard.
pub const fn cap_end(final_cap_slot: u8, superframe_order: u8, beacon_order: u8) -> u32 {
    (((final_cap_slot as u32) + 1) << superframe_order) * BASE_SLOT_DURATION
        - cap_guard(superframe_order, beacon_order)
}

/// Returns `true` for a valid pair of orders: the superframe order does not
/// exceed the beacon order, or there is no active period.
pub const fn valid_orders(beacon_order: u8, superframe_order: u8) -> bool {
    beacon_order <= ORDER_NONE
        && (superframe_order == ORDER_NONE || superframe_order <= beacon_order)
}

/// Superframe schedule state shared by the beacon roles and the transmit
/// queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Schedule phase, matched against the queue entry flags.
    pub phase: TxFlags,
    /// CAP bounds of the outgoing superframe.
    pub cap_start: u32,
    pub cap_end: u32,
    /// CAP end of the incoming superframe.
    pub incoming_cap_end: u32,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            phase: TxFlags::OUTGOING_CAP,
            cap_start: 0,
            cap_end: 0,
            incoming_cap_end: 0,
        }
    }
}
