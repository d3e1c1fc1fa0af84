use bitflags::bitflags;

use crate::frame::FrameBuffer;
use crate::time::SymbolTime;

/// Channel access used for one transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxMode {
    /// Slotted CSMA-CA, aligned on backoff boundaries of the superframe.
    SlottedCsma,
    /// Unslotted CSMA-CA.
    UnslottedCsma,
    /// Listen before talk.
    Lbt,
    /// Transmit at once without clear channel assessment. Used for beacons.
    NoCca,
}

/// Outcome of one transmission, reported with [`RadioEvent::TxDone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    /// Sent, and acknowledged when an acknowledgment was requested.
    Success,
    /// No acknowledgment received.
    NoAck,
    /// The channel was busy.
    ChannelAccessFailure,
    /// Acknowledged with the frame pending bit set.
    AckPending,
}

bitflags! {
    /// Reasons to keep the receiver on. The receiver is on as long as at
    /// least one reason is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RxReason: u8 {
        /// Waiting for a frame after a data request.
        const POLL = 0x01;
        /// `macRxOnWhenIdle`.
        const WHEN_IDLE = 0x02;
        /// Channel scan.
        const SCAN = 0x04;
        /// Waiting for an acknowledgment.
        const ACK_WAIT = 0x08;
        /// A beacon announced pending broadcast data.
        const BROADCAST_PEND = 0x10;
        /// Reception window of a tracked beacon.
        const BEACON_DEVICE = 0x20;
        /// Contention access period of the outgoing superframe.
        const BEACON_NETWORK = 0x40;
        /// Searching for the first beacon.
        const BEACON_SYNC = 0x80;
    }
}

/// Events raised by the radio driver, usually from interrupt context, and
/// posted to the [`EventQueue`](crate::sync::event_queue::EventQueue).
#[derive(Debug, Clone)]
pub enum RadioEvent {
    /// The last transmission completed.
    TxDone(TxStatus),
    /// A frame was received. The FCS is already checked and stripped.
    Rx {
        frame: FrameBuffer,
        timestamp: SymbolTime,
        lqi: u8,
    },
    /// The compare armed with [`Radio::arm_trigger`] fired.
    TimerTrigger,
}

/// The radio driver and symbol timer the MAC sublayer runs on.
///
/// Calls never block: a transmission completes with a
/// [`RadioEvent::TxDone`], the timer with a [`RadioEvent::TimerTrigger`].
pub trait Radio {
    /// Tune to `channel` of channel `page`.
    fn set_channel(&mut self, page: u8, channel: u8);

    /// Set the transmit power in dBm.
    fn set_power(&mut self, dbm: i8);

    /// Address filtering: PAN ID.
    fn set_pan_id(&mut self, pan_id: u16);

    /// Address filtering: short address.
    fn set_short_address(&mut self, address: u16);

    /// Address filtering: extended address, most significant octet first.
    fn set_extended_address(&mut self, address: [u8; 8]);

    /// Returns the IEEE802.15.4 8-octet MAC address of the radio device.
    fn extended_address(&self) -> [u8; 8];

    /// Start transmitting `frame` with the given channel access.
    fn transmit(&mut self, frame: &[u8], mode: TxMode);

    /// Add a reason to keep the receiver on.
    fn rx_enable(&mut self, reason: RxReason);

    /// Remove a reason to keep the receiver on.
    fn rx_disable(&mut self, reason: RxReason);

    /// The current value of the symbol clock.
    fn now(&self) -> SymbolTime;

    /// Arm the timer compare at `at`, or disarm it with `None`.
    fn arm_trigger(&mut self, at: Option<SymbolTime>);
}

#[cfg(test)]
pub mod tests {
    use std::vec::Vec;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum TestRadioEvent {
        SetChannel(u8, u8),
        SetPower(i8),
        SetPanId(u16),
        SetShortAddress(u16),
        SetExtendedAddress([u8; 8]),
        Transmit(Vec<u8>, TxMode),
        RxEnable(RxReason),
        RxDisable(RxReason),
    }

    /// A radio recording every call.
    pub struct TestRadio {
        pub ieee802154_address: [u8; 8],
        pub events: Vec<TestRadioEvent>,
        pub rx: RxReason,
        pub now: SymbolTime,
        pub trigger: Option<SymbolTime>,
    }

    impl TestRadio {
        pub fn new(ieee802154_address: [u8; 8]) -> Self {
            Self {
                ieee802154_address,
                events: Vec::new(),
                rx: RxReason::empty(),
                now: SymbolTime::ZERO,
                trigger: None,
            }
        }

        /// Frames handed to [`Radio::transmit`], oldest first.
        pub fn transmitted(&self) -> Vec<(Vec<u8>, TxMode)> {
            self.events
                .iter()
                .filter_map(|event| match event {
                    TestRadioEvent::Transmit(frame, mode) => Some((frame.clone(), *mode)),
                    _ => None,
                })
                .collect()
        }

        pub fn last_transmitted(&self) -> Option<Vec<u8>> {
            self.transmitted().pop().map(|(frame, _)| frame)
        }

        pub fn clear(&mut self) {
            self.events.clear();
        }
    }

    impl Radio for TestRadio {
        fn set_channel(&mut self, page: u8, channel: u8) {
            self.events.push(TestRadioEvent::SetChannel(page, channel));
        }

        fn set_power(&mut self, dbm: i8) {
            self.events.push(TestRadioEvent::SetPower(dbm));
        }

        fn set_pan_id(&mut self, pan_id: u16) {
            self.events.push(TestRadioEvent::SetPanId(pan_id));
        }

        fn set_short_address(&mut self, address: u16) {
            self.events.push(TestRadioEvent::SetShortAddress(address));
        }

        fn set_extended_address(&mut self, address: [u8; 8]) {
            self.ieee802154_address = address;
            self.events.push(TestRadioEvent::SetExtendedAddress(address));
        }

        fn extended_address(&self) -> [u8; 8] {
            self.ieee802154_address
        }

        fn transmit(&mut self, frame: &[u8], mode: TxMode) {
            self.events
                .push(TestRadioEvent::Transmit(Vec::from(frame), mode));
        }

        fn rx_enable(&mut self, reason: RxReason) {
            self.rx.insert(reason);
            self.events.push(TestRadioEvent::RxEnable(reason));
        }

        fn rx_disable(&mut self, reason: RxReason) {
            self.rx.remove(reason);
            self.events.push(TestRadioEvent::RxDisable(reason));
        }

        fn now(&self) -> SymbolTime {
            self.now
        }

        fn arm_trigger(&mut self, at: Option<SymbolTime>) {
            self.trigger = at;
        }
    }
}
