//! Frequency hopping capability.
//!
//! A coordinator may carry hopping information in an MLME payload IE of its
//! beacons and move to another channel after each beacon. [`NoHopping`]
//! does neither.

use crate::time::SymbolTime;

/// Sub-ID of the channel hopping long MLME sub-IE.
pub const CHANNEL_HOPPING_SUB_IE: u8 = 0x09;

pub trait FrequencyHopping {
    /// Content of the channel hopping sub-IE added to outgoing beacons.
    /// Beacons without it keep the 2003 frame version.
    fn beacon_ie(&self) -> Option<&[u8]> {
        None
    }

    /// Called at the end of the active period. Returns the channel to move
    /// to.
    fn next_channel(&mut self, now: SymbolTime) -> Option<u8> {
        let _ = now;
        None
    }

    /// A beacon from the tracked coordinator carried hopping information.
    fn on_beacon_ie(&mut self, content: &[u8]) {
        let _ = content;
    }
}

/// Stay on one channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHopping;

impl FrequencyHopping for NoHopping {}

/// Round robin over a fixed channel list, announcing the current index in
/// the beacon.
#[derive(Debug, Clone)]
pub struct ChannelList<const N: usize> {
    channels: [u8; N],
    index: usize,
    ie: [u8; 2],
}

impl<const N: usize> ChannelList<N> {
    pub fn new(channels: [u8; N]) -> Self {
        Self {
            channels,
            index: 0,
            ie: [N as u8, 0],
        }
    }

    pub fn current(&self) -> Option<u8> {
        self.channels.get(self.index).copied()
    }
}

impl<const N: usize> FrequencyHopping for ChannelList<N> {
    fn beacon_ie(&self) -> Option<&[u8]> {
        (N > 1).then_some(&self.ie[..])
    }

    fn next_channel(&mut self, _now: SymbolTime) -> Option<u8> {
        if N < 2 {
            return None;
        }
        self.index = (self.index + 1) % N;
        self.ie[1] = self.index as u8;
        self.current()
    }

    fn on_beacon_ie(&mut self, content: &[u8]) {
        if let [len, index] = content {
            if *len as usize == N && (*index as usize) < N {
                self.index = *index as usize;
                self.ie[1] = *index;
            }
        }
    }
}
