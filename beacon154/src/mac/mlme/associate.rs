use rand_core::RngCore;

use crate::frame::{association_status, Address, AddressingRepr, CommandRepr, FrameType};
use crate::hopping::FrequencyHopping;
use crate::mac::command::{MacConfirm, MacIndication};
use crate::mac::constants::{BASE_SUPERFRAME_DURATION, BROADCAST_PAN_ID, NO_SHORT_ADDRESS};
use crate::mac::event::{Event, RxFrame};
use crate::mac::mlme::comm_status::CommStatusIndication;
use crate::mac::queue::{PollKind, TxKind};
use crate::mac::security::Security;
use crate::mac::utils::build_command;
use crate::mac::{Error, Mac, Result};
use crate::phy::constants::is_valid_channel;
use crate::phy::radio::Radio;
use crate::timer::TimerId;
use crate::upper::UpperLayer;

#[derive(Debug, Clone, Copy)]
pub struct AssociateRequest {
    pub channel: u8,
    pub page: u8,
    pub coord_address: Address,
    pub coord_pan_id: u16,
    /// Capability information field, see
    /// [`CapabilityInformation`](crate::frame::CapabilityInformation).
    pub capability: u8,
    pub security: Security,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociateConfirm {
    /// Assigned short address, `0xffff` when the association failed.
    pub short_address: u16,
    /// Outcome of the procedure. A coordinator refusing us still completes
    /// it: see `association_status`.
    pub status: Result<()>,
    /// Status of the association response, when one was received.
    pub association_status: Option<u8>,
}

impl AssociateConfirm {
    pub fn failed(error: Error) -> Self {
        Self {
            short_address: NO_SHORT_ADDRESS,
            status: Err(error),
            association_status: None,
        }
    }
}

/// A device asks to join our PAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociateIndication {
    pub device_address: [u8; 8],
    pub capability: u8,
    pub security: Security,
}

/// Answer of the upper layer to an [`AssociateIndication`].
#[derive(Debug, Clone, Copy)]
pub struct AssociateResponse {
    pub device_address: [u8; 8],
    pub short_address: u16,
    /// One of [`association_status`].
    pub status: u8,
    pub security: Security,
}

/// Association in progress on the device side.
#[derive(Debug, Clone, Copy)]
pub struct Association {
    pub coord_address: Address,
    pub coord_pan_id: u16,
    pub security: Security,
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Requests the association with a coordinator. The response is polled
    /// for `macResponseWaitTime` base superframes after the request was
    /// acknowledged.
    pub(crate) fn mlme_associate_request(&mut self, request: AssociateRequest) {
        if let Err(error) = self.send_association_request(&request) {
            self.raise(Event::AssociateFailed(error));
        }
    }

    fn send_association_request(&mut self, request: &AssociateRequest) -> Result<()> {
        if !is_valid_channel(request.page, request.channel)
            || !request.coord_address.is_unicast()
            || request.coord_pan_id == BROADCAST_PAN_ID
        {
            return Err(Error::InvalidParameter);
        }
        self.check_security(&request.security)?;

        self.tune(request.page, request.channel);
        self.set_pan_id(request.coord_pan_id);
        match request.coord_address {
            Address::Short(_) => {
                self.pib.coord_short_address = request
                    .coord_address
                    .as_short()
                    .unwrap_or(NO_SHORT_ADDRESS);
            }
            Address::Extended(address) => self.pib.coord_extended_address = address,
            Address::Absent => {}
        }

        let addressing = AddressingRepr {
            dst_pan_id: request.coord_pan_id,
            dst_address: request.coord_address,
            src_pan_id: BROADCAST_PAN_ID,
            src_address: Address::Extended(self.pib.extended_address),
        };
        let header = self.header(FrameType::MacCommand, addressing, true, &request.security);
        let frame = build_command(
            &header,
            &CommandRepr::AssociationRequest {
                capability: request.capability,
            },
        )?;
        self.enqueue(frame, TxKind::AssociationRequest, request.coord_address, false)?;

        self.association = Some(Association {
            coord_address: request.coord_address,
            coord_pan_id: request.coord_pan_id,
            security: request.security,
        });
        Ok(())
    }

    pub(crate) fn association_request_sent(&mut self, status: Result<()>) {
        match status {
            Ok(()) => {
                let now = self.radio.now();
                let wait = u32::from(self.pib.response_wait_time) * BASE_SUPERFRAME_DURATION;
                self.timers.arm(TimerId::ResponseWait, now, wait);
            }
            Err(error) => self.raise(Event::AssociateFailed(error)),
        }
    }

    /// `macResponseWaitTime` elapsed: fetch the response.
    pub(crate) fn association_poll(&mut self) {
        let Some(association) = self.association else {
            return;
        };
        if let Err(error) = self.send_data_request(
            PollKind::Association,
            association.coord_address,
            association.coord_pan_id,
            &association.security,
        ) {
            self.raise(Event::AssociateFailed(error));
        }
    }

    pub(crate) fn association_response_received(&mut self, frame: RxFrame) {
        let Some(CommandRepr::AssociationResponse {
            short_address,
            status,
        }) = frame.command()
        else {
            self.association_failed(Error::NoData);
            return;
        };

        self.timers.cancel(TimerId::ResponseWait);
        if self.poll.is_some() {
            self.end_poll();
        }
        self.association = None;

        let short_address = if status == association_status::SUCCESS {
            self.pib.short_address = short_address;
            self.radio.set_short_address(short_address);
            info!("associated, short address {:04x}", short_address);
            short_address
        } else {
            info!("association refused: {}", status);
            NO_SHORT_ADDRESS
        };

        self.upper
            .mac_confirm(MacConfirm::MlmeAssociate(AssociateConfirm {
                short_address,
                status: Ok(()),
                association_status: Some(status),
            }));
    }

    pub(crate) fn association_failed(&mut self, error: Error) {
        debug!("association failed: {:?}", error);
        self.timers.cancel(TimerId::ResponseWait);
        if self.poll.is_some() {
            self.end_poll();
        }
        self.association = None;
        self.upper
            .mac_confirm(MacConfirm::MlmeAssociate(AssociateConfirm::failed(error)));
    }

    /// An association request arrived. Only devices identifying with their
    /// extended address may join, and only while association is permitted.
    pub(crate) fn mlme_associate_indication(&mut self, frame: RxFrame) {
        if !self.pib.association_permit {
            trace!("association not permitted");
            return;
        }
        let Address::Extended(device_address) = frame.src_address() else {
            return;
        };
        let Some(CommandRepr::AssociationRequest { capability }) = frame.command() else {
            return;
        };

        self.upper
            .mac_indication(MacIndication::MlmeAssociate(AssociateIndication {
                device_address,
                capability,
                security: frame.security.unwrap_or(Security::NONE),
            }));
    }

    /// Queue the association response until the device polls for it. Its
    /// outcome is reported with a comm status indication.
    pub(crate) fn mlme_associate_response(&mut self, response: AssociateResponse) {
        let device = Address::Extended(response.device_address);
        if let Err(error) = self.send_association_response(&response) {
            self.association_response_sent(device, Err(error));
        }
    }

    fn send_association_response(&mut self, response: &AssociateResponse) -> Result<()> {
        self.check_security(&response.security)?;
        let device = Address::Extended(response.device_address);
        let addressing = AddressingRepr {
            dst_pan_id: self.pib.pan_id,
            dst_address: device,
            src_pan_id: self.pib.pan_id,
            src_address: Address::Extended(self.pib.extended_address),
        };
        let header = self.header(FrameType::MacCommand, addressing, true, &response.security);
        let frame = build_command(
            &header,
            &CommandRepr::AssociationResponse {
                short_address: response.short_address,
                status: response.status,
            },
        )?;
        self.enqueue(frame, TxKind::AssociationResponse { device }, device, true)
    }

    pub(crate) fn association_response_sent(&mut self, device: Address, status: Result<()>) {
        let indication = CommStatusIndication {
            pan_id: self.pib.pan_id,
            src_address: Address::Extended(self.pib.extended_address),
            dst_address: device,
            status,
            security: Security::NONE,
        };
        self.upper
            .mac_indication(MacIndication::MlmeCommStatus(indication));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, FrameBuffer, HeaderRepr};
    use crate::mac::fsm::MacState;
    use crate::mac::tests::*;
    use crate::mac::MacRequest;
    use crate::phy::radio::tests::TestRadioEvent;
    use crate::phy::radio::TxStatus;
    use crate::sync::event_queue::EventQueue;
    use crate::time::SymbolTime;

    const CAPABILITY: u8 = 0x80;

    fn request() -> MacRequest {
        MacRequest::MlmeAssociate(AssociateRequest {
            channel: 15,
            page: 0,
            coord_address: Address::extended(COORD_EXT),
            coord_pan_id: PAN_ID,
            capability: CAPABILITY,
            security: Security::NONE,
        })
    }

    fn response(short_address: u16, status: u8) -> FrameBuffer {
        let header = HeaderRepr {
            ack_request: true,
            sequence_number: Some(0x10),
            ..HeaderRepr::new(
                FrameType::MacCommand,
                AddressingRepr {
                    dst_pan_id: PAN_ID,
                    dst_address: Address::extended(DEVICE_EXT),
                    src_pan_id: PAN_ID,
                    src_address: Address::extended(COORD_EXT),
                },
            )
        };
        build_command(
            &header,
            &CommandRepr::AssociationResponse {
                short_address,
                status,
            },
        )
        .unwrap()
    }

    fn confirm(mac: &TestMac<'_>) -> Option<AssociateConfirm> {
        mac.upper().confirms.iter().find_map(|c| match c {
            MacConfirm::MlmeAssociate(c) => Some(*c),
            _ => None,
        })
    }

    /// Request, acknowledgment, response wait and poll.
    fn associate_until_poll(mac: &mut TestMac<'_>, events: &EventQueue) {
        mac.request(request());
        assert_eq!(mac.state(), MacState::Associating);
        assert!(mac.radio().events.contains(&TestRadioEvent::SetChannel(0, 15)));
        assert_eq!(mac.pib().pan_id, PAN_ID);

        let frame = mac.radio().last_transmitted().unwrap();
        let frame = Frame::new(&frame[..]).unwrap();
        assert_eq!(frame.payload(), &[0x01, CAPABILITY]);
        let af = frame.addressing().unwrap();
        assert_eq!(af.src_pan_id(), Some(BROADCAST_PAN_ID));
        assert_eq!(af.src_address(), Address::extended(DEVICE_EXT));

        tx_done(mac, events, TxStatus::Success);
        let wait = u32::from(mac.pib().response_wait_time) * BASE_SUPERFRAME_DURATION;
        advance(mac, events, SymbolTime::from_symbols(wait - 1));
        assert_eq!(mac.radio().transmitted().len(), 1);
        advance(mac, events, SymbolTime::from_symbols(wait));

        let frame = mac.radio().last_transmitted().unwrap();
        assert_eq!(Frame::new(&frame[..]).unwrap().payload(), &[0x04]);
        tx_done(mac, events, TxStatus::AckPending);
    }

    #[test]
    fn associate() {
        let events = EventQueue::new();
        let mut mac = mac(&events, DEVICE_EXT);
        associate_until_poll(&mut mac, &events);

        rx(&mut mac, &events, response(0x0005, association_status::SUCCESS), SymbolTime::from_symbols(31_000));
        assert_eq!(
            confirm(&mac),
            Some(AssociateConfirm {
                short_address: 0x0005,
                status: Ok(()),
                association_status: Some(association_status::SUCCESS),
            })
        );
        assert_eq!(mac.pib().short_address, 0x0005);
        assert_eq!(mac.pib().coord_extended_address, COORD_EXT.to_be_bytes());
        assert!(mac.radio().events.contains(&TestRadioEvent::SetShortAddress(0x0005)));
        assert_eq!(mac.state(), MacState::Idle);
        assert!(mac.association.is_none());
        assert!(mac.poll.is_none());
    }

    #[test]
    fn refused() {
        let events = EventQueue::new();
        let mut mac = mac(&events, DEVICE_EXT);
        associate_until_poll(&mut mac, &events);

        rx(&mut mac, &events, response(0xffff, association_status::PAN_AT_CAPACITY), SymbolTime::from_symbols(31_000));
        let confirm = confirm(&mac).unwrap();
        assert_eq!(confirm.association_status, Some(association_status::PAN_AT_CAPACITY));
        assert_eq!(confirm.short_address, 0xffff);
        assert_eq!(mac.pib().short_address, 0xffff);
    }

    #[test]
    fn no_response() {
        let events = EventQueue::new();
        let mut mac = mac(&events, DEVICE_EXT);
        mac.request(request());
        tx_done(&mut mac, &events, TxStatus::Success);
        let wait = u32::from(mac.pib().response_wait_time) * BASE_SUPERFRAME_DURATION;
        advance(&mut mac, &events, SymbolTime::from_symbols(wait));
        // nothing pending at the coordinator
        tx_done(&mut mac, &events, TxStatus::Success);

        assert_eq!(confirm(&mac), Some(AssociateConfirm::failed(Error::NoData)));
        assert_eq!(mac.state(), MacState::Idle);
    }

    #[test]
    fn request_not_acknowledged() {
        let events = EventQueue::new();
        let mut mac = mac(&events, DEVICE_EXT);
        mac.pib.max_frame_retries = 0;
        mac.request(request());
        tx_done(&mut mac, &events, TxStatus::NoAck);
        assert_eq!(confirm(&mac), Some(AssociateConfirm::failed(Error::NoAck)));
        assert!(!mac.timers.is_armed(TimerId::ResponseWait));
    }

    #[test]
    fn invalid_channel() {
        let events = EventQueue::new();
        let mut mac = mac(&events, DEVICE_EXT);
        mac.request(MacRequest::MlmeAssociate(AssociateRequest {
            channel: 5,
            ..match request() {
                MacRequest::MlmeAssociate(r) => r,
                _ => unreachable!(),
            }
        }));
        assert_eq!(confirm(&mac), Some(AssociateConfirm::failed(Error::InvalidParameter)));
        assert_eq!(mac.state(), MacState::Idle);
        assert!(mac.radio().transmitted().is_empty());
    }

    fn association_request() -> FrameBuffer {
        let header = HeaderRepr {
            ack_request: true,
            sequence_number: Some(0x20),
            ..HeaderRepr::new(
                FrameType::MacCommand,
                AddressingRepr {
                    dst_pan_id: PAN_ID,
                    dst_address: Address::short(0x0000),
                    src_pan_id: BROADCAST_PAN_ID,
                    src_address: Address::extended(DEVICE_EXT),
                },
            )
        };
        build_command(&header, &CommandRepr::AssociationRequest { capability: CAPABILITY }).unwrap()
    }

    fn data_request() -> FrameBuffer {
        let header = HeaderRepr {
            ack_request: true,
            sequence_number: Some(0x21),
            ..HeaderRepr::new(
                FrameType::MacCommand,
                AddressingRepr {
                    dst_pan_id: PAN_ID,
                    dst_address: Address::short(0x0000),
                    src_pan_id: PAN_ID,
                    src_address: Address::extended(DEVICE_EXT),
                },
            )
        };
        build_command(&header, &CommandRepr::DataRequest).unwrap()
    }

    fn coordinator(events: &EventQueue) -> TestMac<'_> {
        let mut mac = mac(events, COORD_EXT);
        mac.pib.pan_id = PAN_ID;
        mac.pib.short_address = 0x0000;
        mac.pib.association_permit = true;
        mac
    }

    #[test]
    fn coordinator_side() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);

        rx(&mut mac, &events, association_request(), SymbolTime::from_symbols(10));
        assert!(matches!(
            mac.upper().indications[..],
            [MacIndication::MlmeAssociate(AssociateIndication {
                capability: CAPABILITY,
                ..
            })]
        ));

        mac.request(MacRequest::MlmeAssociateResponse(AssociateResponse {
            device_address: DEVICE_EXT.to_be_bytes(),
            short_address: 0x0007,
            status: association_status::SUCCESS,
            security: Security::NONE,
        }));
        // waits for the device
        assert!(mac.radio().transmitted().is_empty());
        assert_eq!(mac.queue.counts(), (0, 1));

        rx(&mut mac, &events, data_request(), SymbolTime::from_symbols(20));
        let frame = mac.radio().last_transmitted().unwrap();
        let frame = Frame::new(&frame[..]).unwrap();
        assert_eq!(frame.payload(), &[0x02, 0x07, 0x00, 0x00]);

        tx_done(&mut mac, &events, TxStatus::Success);
        let status = mac.upper().indications.iter().find_map(|i| match i {
            MacIndication::MlmeCommStatus(c) => Some((c.dst_address, c.status)),
            _ => None,
        });
        assert_eq!(status, Some((Address::extended(DEVICE_EXT), Ok(()))));
    }

    #[test]
    fn not_permitted() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.pib.association_permit = false;
        rx(&mut mac, &events, association_request(), SymbolTime::from_symbols(10));
        assert!(mac.upper().indications.is_empty());
    }

    #[test]
    fn response_expires() {
        let events = EventQueue::new();
        let mut mac = coordinator(&events);
        mac.request(MacRequest::MlmeAssociateResponse(AssociateResponse {
            device_address: DEVICE_EXT.to_be_bytes(),
            short_address: 0x0007,
            status: association_status::SUCCESS,
            security: Security::NONE,
        }));

        let persistence = u32::from(mac.pib().transaction_persistence_time);
        run_until(&mut mac, &events, SymbolTime::from_symbols(persistence * BASE_SUPERFRAME_DURATION));
        assert!(matches!(
            mac.upper().indications[..],
            [MacIndication::MlmeCommStatus(CommStatusIndication {
                status: Err(Error::TransactionExpired),
                ..
            })]
        ));
        assert_eq!(mac.queue.counts(), (0, 0));
    }
}
