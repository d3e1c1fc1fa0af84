//! Beacon frames: building our own, and reporting received ones.

use heapless::Vec;
use rand_core::RngCore;

use crate::frame::{
    encode_header_ies, encode_payload_ies, Address, AddressingRepr, BeaconPayload, BeaconRepr,
    FrameBuffer, FrameType, FrameVersion, HeaderRepr, PayloadIeRequest, SubIeRequest,
    SuperframeRepr, MAX_PENDING_ADDRESSES,
};
use crate::hopping::{FrequencyHopping, CHANNEL_HOPPING_SUB_IE};
use crate::mac::command::MacIndication;
use crate::mac::constants::MAX_BEACON_PAYLOAD;
use crate::mac::event::RxFrame;
use crate::mac::security::Security;
use crate::mac::utils::MAX_FRAME_LEN;
use crate::mac::{Error, Mac, Result};
use crate::phy::radio::Radio;
use crate::time::SymbolTime;
use crate::upper::UpperLayer;

/// A coordinator heard in a beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanDescriptor {
    pub coord_address: Address,
    pub coord_pan_id: u16,
    pub channel: u8,
    pub page: u8,
    pub superframe: SuperframeRepr,
    pub gts_permit: bool,
    pub lqi: u8,
    pub timestamp: SymbolTime,
    pub security: Option<Security>,
}

#[derive(Debug, Clone)]
pub struct BeaconNotifyIndication {
    pub bsn: u8,
    pub pan_descriptor: PanDescriptor,
    /// Short addresses first, then extended ones.
    pub pending_addresses: Vec<Address, { 2 * MAX_PENDING_ADDRESSES }>,
    pub payload: Vec<u8, MAX_BEACON_PAYLOAD>,
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Build the next beacon from the PIB and the indirect entries of the
    /// transmit queue.
    pub(crate) fn build_beacon(&mut self) -> Result<FrameBuffer> {
        let bsn = self.pib.next_bsn();

        let mut beacon = BeaconRepr {
            superframe: SuperframeRepr {
                beacon_order: self.pib.beacon_order,
                superframe_order: self.pib.superframe_order,
                final_cap_slot: self.coord.final_cap_slot,
                battery_life_extension: self.pib.batt_life_ext,
                pan_coordinator: self.pib.pan_coordinator,
                association_permit: self.pib.association_permit,
            },
            gts_permit: false,
            pending_short: Vec::new(),
            pending_extended: Vec::new(),
            payload: &self.pib.beacon_payload,
        };
        for address in self.queue.pending_addresses() {
            // only 7 of each kind fit, the others wait for the next beacon
            let _ = beacon.add_pending(address);
        }

        let len = beacon.buffer_len();
        if len > MAX_FRAME_LEN {
            return Err(Error::FrameTooLong);
        }
        let mut buffer = FrameBuffer::new(MAX_FRAME_LEN - len);
        beacon.emit(buffer.reserve_back(len)?)?;

        let ie = self.hopping.beacon_ie();
        if let Some(content) = ie {
            let sub_ies = [SubIeRequest {
                id: CHANNEL_HOPPING_SUB_IE,
                long: true,
                content,
            }];
            encode_payload_ies(&mut buffer, &[PayloadIeRequest::Mlme(&sub_ies)], true)?;
            encode_header_ies(&mut buffer, &[], true)?;
        }

        let header = HeaderRepr {
            frame_version: if ie.is_some() {
                FrameVersion::Ieee802154_2020
            } else {
                FrameVersion::Ieee802154_2003
            },
            frame_pending: self.queue.has_broadcast(),
            ie_present: ie.is_some(),
            sequence_number: Some(bsn),
            ..HeaderRepr::new(
                FrameType::Beacon,
                AddressingRepr {
                    src_pan_id: self.pib.pan_id,
                    src_address: self.own_address(),
                    ..Default::default()
                },
            )
        };
        header.emit(&mut buffer)?;
        Ok(buffer)
    }

    /// Describe the sender of a received beacon.
    pub(crate) fn pan_descriptor(&self, frame: &RxFrame) -> Option<PanDescriptor> {
        let f = frame.frame();
        let addressing = f.addressing()?;
        let payload = BeaconPayload::new(f.payload()).ok()?;
        let beacon = BeaconRepr::parse(&payload);

        Some(PanDescriptor {
            coord_address: addressing.src_address(),
            coord_pan_id: addressing.src_pan_id()?,
            channel: self.phy_pib.current_channel,
            page: self.phy_pib.current_page,
            superframe: beacon.superframe,
            gts_permit: beacon.gts_permit,
            lqi: frame.lqi,
            timestamp: frame.timestamp,
            security: frame.security,
        })
    }

    /// Hand a received beacon to the upper layer.
    pub(crate) fn beacon_notify(&mut self, frame: &RxFrame, pan_descriptor: PanDescriptor) {
        let f = frame.frame();
        let Ok(payload) = BeaconPayload::new(f.payload()) else {
            return;
        };
        let beacon = BeaconRepr::parse(&payload);

        let mut indication = BeaconNotifyIndication {
            bsn: f.sequence_number().unwrap_or_default(),
            pan_descriptor,
            pending_addresses: Vec::new(),
            payload: Vec::new(),
        };
        for address in beacon.pending_short.iter().chain(beacon.pending_extended.iter()) {
            let _ = indication.pending_addresses.push(*address);
        }
        let len = beacon.payload.len().min(MAX_BEACON_PAYLOAD);
        let _ = indication.payload.extend_from_slice(&beacon.payload[..len]);

        self.upper
            .mac_indication(MacIndication::MlmeBeaconNotify(indication));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, ParsedIes};
    use crate::hopping::ChannelList;
    use crate::mac::constants::MAX_BEACON_PAYLOAD;
    use crate::mac::tests::*;
    use crate::mac::Mac;
    use crate::phy::radio::tests::TestRadio;
    use crate::sync::event_queue::EventQueue;
    use crate::upper::tests::TestUpperLayer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn beacon_from_pib() {
        let events = EventQueue::new();
        let mut mac = mac(&events, COORD_EXT);
        mac.pib.pan_id = PAN_ID;
        mac.pib.short_address = 0x0000;
        mac.pib.beacon_order = 6;
        mac.pib.superframe_order = 4;
        mac.pib.pan_coordinator = true;
        mac.pib.association_permit = true;
        mac.pib.beacon_payload.extend_from_slice(b"hello").unwrap();
        let bsn = mac.pib.bsn;

        let buffer = mac.build_beacon().unwrap();
        let frame = Frame::new(buffer.as_slice()).unwrap();
        assert_eq!(frame.frame_control().frame_type(), FrameType::Beacon);
        assert_eq!(frame.sequence_number(), Some(bsn));
        assert_eq!(mac.pib.bsn, bsn.wrapping_add(1));
        assert!(!frame.frame_control().frame_pending());

        let af = frame.addressing().unwrap();
        assert_eq!(af.src_address(), Address::short(0x0000));
        assert_eq!(af.src_pan_id(), Some(PAN_ID));

        let payload = BeaconPayload::new(frame.payload()).unwrap();
        let beacon = BeaconRepr::parse(&payload);
        assert_eq!(beacon.superframe.beacon_order, 6);
        assert_eq!(beacon.superframe.superframe_order, 4);
        assert_eq!(beacon.superframe.final_cap_slot, 15);
        assert!(beacon.superframe.pan_coordinator);
        assert!(beacon.superframe.association_permit);
        assert_eq!(beacon.payload, b"hello");
    }

    #[test]
    fn largest_payload_fits() {
        let events = EventQueue::new();
        let mut mac = mac(&events, COORD_EXT);
        mac.pib.beacon_payload.extend_from_slice(&[0; MAX_BEACON_PAYLOAD]).unwrap();
        assert!(mac.build_beacon().is_ok());
    }

    #[test]
    fn hopping_ie() {
        let events = EventQueue::new();
        let mut mac = Mac::with_hopping(
            TestRadio::new(COORD_EXT.to_be_bytes()),
            TestUpperLayer::default(),
            StdRng::seed_from_u64(1),
            &events,
            ChannelList::new([11, 16, 21]),
        );
        mac.pib.pan_id = PAN_ID;

        let buffer = mac.build_beacon().unwrap();
        let frame = Frame::new(buffer.as_slice()).unwrap();
        assert!(frame.frame_control().information_elements_present());
        assert_eq!(frame.frame_control().frame_version(), FrameVersion::Ieee802154_2020);

        let ies: ParsedIes<'_> = frame.information_elements().unwrap();
        assert_eq!(ies.mlme_sub_ie(true, CHANNEL_HOPPING_SUB_IE), Some(&[3, 0][..]));
        // the beacon fields follow the IEs
        let payload = BeaconPayload::new(frame.payload()).unwrap();
        assert_eq!(BeaconRepr::parse(&payload).superframe.beacon_order, 15);
    }

    #[test]
    fn notify_lists_pending() {
        let events = EventQueue::new();
        let mut mac = mac(&events, DEVICE_EXT);
        mac.pib.auto_request = false;

        let pending = [Address::short(0x0002), Address::extended(DEVICE_EXT)];
        let beacon = beacon_frame(SuperframeRepr::default(), 9, &pending, b"abc");
        rx(&mut mac, &events, beacon, SymbolTime::from_symbols(77));

        let [MacIndication::MlmeBeaconNotify(notify)] = &mac.upper().indications[..] else {
            panic!("no beacon notify");
        };
        assert_eq!(notify.bsn, 9);
        assert_eq!(notify.pending_addresses[..], pending);
        assert_eq!(&notify.payload[..], b"abc");
        assert_eq!(notify.pan_descriptor.coord_address, Address::extended(COORD_EXT));
        assert_eq!(notify.pan_descriptor.coord_pan_id, PAN_ID);
        assert_eq!(notify.pan_descriptor.timestamp, SymbolTime::from_symbols(77));
        assert_eq!(notify.pan_descriptor.lqi, 0xff);
    }
}
