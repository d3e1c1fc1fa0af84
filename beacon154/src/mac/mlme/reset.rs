use rand_core::RngCore;

use crate::hopping::FrequencyHopping;
use crate::mac::coord::Coordinator;
use crate::mac::device::Tracker;
use crate::mac::pib::Pib;
use crate::mac::security::SecurityPib;
use crate::mac::superframe::Schedule;
use crate::mac::Mac;
use crate::phy::radio::{Radio, RxReason};
use crate::timer::TimerQueue;
use crate::upper::UpperLayer;

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Used by the next higher layer to request a reset operation. Every
    /// procedure stops without a confirm and the transmit queue is emptied.
    /// With `set_default_pib` the PIB and the security tables go back to
    /// their defaults, otherwise they are kept.
    pub fn mlme_reset_request(&mut self, set_default_pib: bool) {
        self.timers = TimerQueue::new();
        self.queue.clear();
        self.fsm.reset();
        self.coord = Coordinator::default();
        self.tracker = Tracker::default();
        self.schedule = Schedule::default();
        self.scan = None;
        self.association = None;
        self.poll = None;
        self.radio.rx_disable(RxReason::all());

        if set_default_pib {
            self.pib = Pib::default();
            self.security = SecurityPib::new();
        }
        self.pib.extended_address = self.radio.extended_address();
        self.pib.dsn = self.rng.next_u32() as u8;
        self.pib.bsn = self.rng.next_u32() as u8;

        self.radio.set_pan_id(self.pib.pan_id);
        self.radio.set_short_address(self.pib.short_address);
        if self.pib.rx_on_when_idle && !self.pib.beacon_enabled() {
            self.radio.rx_enable(RxReason::WHEN_IDLE);
        }
        debug!("MAC reset, default PIB: {}", set_default_pib);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Address;
    use crate::mac::command::MacRequest;
    use crate::mac::fsm::MacState;
    use crate::mac::mlme::poll::PollRequest;
    use crate::mac::mlme::set::PibAttribute;
    use crate::mac::security::Security;
    use crate::mac::tests::*;
    use crate::phy::radio::tests::TestRadioEvent;
    use crate::sync::event_queue::EventQueue;

    #[test]
    fn reset_stops_everything() {
        let events = EventQueue::new();
        let mut mac = mac(&events, DEVICE_EXT);
        mac.set(PibAttribute::PanId(PAN_ID)).unwrap();
        mac.set(PibAttribute::ShortAddress(0x0002)).unwrap();
        mac.request(MacRequest::MlmePoll(PollRequest {
            coord_address: Address::short(0x0000),
            coord_pan_id: PAN_ID,
            security: Security::NONE,
        }));
        assert_eq!(mac.state(), MacState::Polling);

        mac.radio_mut().clear();
        mac.mlme_reset_request(false);
        assert_eq!(mac.state(), MacState::Idle);
        assert!(mac.queue.is_empty());
        assert!(mac.timers.next_expiry().is_none());
        assert!(mac.radio().rx.is_empty());
        // kept, and given back to the radio
        assert_eq!(mac.pib().short_address, 0x0002);
        assert!(mac
            .radio()
            .events
            .contains(&TestRadioEvent::SetShortAddress(0x0002)));
        assert!(mac.upper().confirms.is_empty());

        mac.mlme_reset_request(true);
        assert_eq!(mac.pib().pan_id, 0xffff);
        assert_eq!(mac.pib().extended_address, DEVICE_EXT.to_be_bytes());
    }
}
