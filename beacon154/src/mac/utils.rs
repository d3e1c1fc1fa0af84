use rand_core::RngCore;

use crate::frame::{
    Address, AddressingMode, AddressingRepr, CommandRepr, Frame, FrameBuffer, FrameType,
    FrameVersion, HeaderRepr, SecurityLevel,
};
use crate::hopping::FrequencyHopping;
use crate::phy::constants::MAX_PHY_PACKET_SIZE;
use crate::phy::radio::Radio;
use crate::timer::TimerId;
use crate::upper::UpperLayer;

use super::constants::*;
use super::pib::Pib;
use super::queue::{TxEntry, TxFlags, TxKind, TxOptions};
use super::security::Security;
use super::{Error, Mac, Result};

/// Octets of the FCS, appended by the radio.
pub const FCS_LEN: usize = 2;
/// Largest MPDU without FCS.
pub const MAX_FRAME_LEN: usize = MAX_PHY_PACKET_SIZE - FCS_LEN;

/// Checks if the current frame is intended for us. Frames without a
/// destination are only taken by a coordinator that started a PAN, or when
/// they are beacons.
pub fn is_frame_for_us(pib: &Pib, coordinator: bool, frame: &Frame<&[u8]>) -> bool {
    let frame_type = frame.frame_control().frame_type();
    // acknowledgments are handled by the radio
    if !matches!(
        frame_type,
        FrameType::Beacon | FrameType::Data | FrameType::MacCommand
    ) {
        return false;
    }
    if matches!(frame.frame_control().frame_version(), FrameVersion::Unknown) {
        return false;
    }
    let Some(addressing) = frame.addressing() else {
        return false;
    };

    let dst_pan_id = addressing.dst_pan_id().unwrap_or(BROADCAST_PAN_ID);
    if dst_pan_id != pib.pan_id && dst_pan_id != BROADCAST_PAN_ID {
        return false;
    }

    let addr = addressing.dst_address();
    match &addr {
        _ if addr.is_broadcast() => true,
        Address::Absent => {
            frame_type == FrameType::Beacon
                || coordinator && addressing.effective_src_pan_id() == Some(pib.pan_id)
        }
        Address::Short(_) => addr.as_short() == Some(pib.short_address),
        Address::Extended(addr) => *addr == pib.extended_address,
    }
}

/// Build a frame around `payload`, with room for the MIC at the tail.
pub fn build_frame(header: &HeaderRepr, payload: &[u8]) -> Result<FrameBuffer> {
    let mic_len = header
        .security
        .map_or(0, |aux| aux.security_level.mic_len());
    if header.buffer_len() + payload.len() + mic_len > MAX_FRAME_LEN {
        return Err(Error::FrameTooLong);
    }

    let mut buffer = FrameBuffer::new(MAX_FRAME_LEN - payload.len() - mic_len);
    buffer.append(payload)?;
    buffer.reserve_back(mic_len)?;
    header.emit(&mut buffer)?;
    Ok(buffer)
}

/// Build a MAC command frame.
pub fn build_command(header: &HeaderRepr, command: &CommandRepr) -> Result<FrameBuffer> {
    let mut payload = [0u8; 16];
    let len = command.buffer_len();
    command.emit(&mut payload[..len])?;
    build_frame(header, &payload[..len])
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Our short address when one is assigned, our extended address
    /// otherwise.
    pub(crate) fn own_address(&self) -> Address {
        if self.pib.short_address < Address::USE_EXTENDED {
            Address::short(self.pib.short_address)
        } else {
            Address::Extended(self.pib.extended_address)
        }
    }

    /// Source address for the requested mode.
    pub(crate) fn source_address(&self, mode: AddressingMode) -> Result<Address> {
        match mode {
            AddressingMode::Absent => Ok(Address::Absent),
            AddressingMode::Short if self.pib.short_address < Address::USE_EXTENDED => {
                Ok(Address::short(self.pib.short_address))
            }
            AddressingMode::Extended => Ok(Address::Extended(self.pib.extended_address)),
            _ => Err(Error::InvalidAddress),
        }
    }

    /// The coordinator we are associated with.
    pub(crate) fn coord_address(&self) -> Address {
        if self.pib.coord_short_address < Address::USE_EXTENDED {
            Address::short(self.pib.coord_short_address)
        } else {
            Address::Extended(self.pib.coord_extended_address)
        }
    }

    pub(crate) fn is_coordinator(&self, address: &Address) -> bool {
        match address {
            Address::Short(_) => address.as_short() == Some(self.pib.coord_short_address),
            Address::Extended(ext) => *ext == self.pib.coord_extended_address,
            Address::Absent => false,
        }
    }

    pub(crate) fn is_own_address(&self, address: &Address) -> bool {
        match address {
            Address::Short(_) => address.as_short() == Some(self.pib.short_address),
            Address::Extended(ext) => *ext == self.pib.extended_address,
            Address::Absent => false,
        }
    }

    pub(crate) fn check_security(&self, security: &Security) -> Result<()> {
        if security.level != SecurityLevel::None && !self.pib.security_enabled {
            return Err(Error::UnsupportedSecurity);
        }
        Ok(())
    }

    /// Header of a data or command frame with the next data sequence
    /// number.
    pub(crate) fn header(
        &mut self,
        frame_type: FrameType,
        addressing: AddressingRepr,
        ack_request: bool,
        security: &Security,
    ) -> HeaderRepr {
        let aux = security.aux_header();
        HeaderRepr {
            frame_version: if aux.is_some() {
                FrameVersion::Ieee802154_2006
            } else {
                FrameVersion::Ieee802154_2003
            },
            ack_request: ack_request && addressing.dst_address.is_unicast(),
            sequence_number: Some(self.pib.next_dsn()),
            security: aux,
            ..HeaderRepr::new(frame_type, addressing)
        }
    }

    /// Queue a frame. Direct frames are ready at once, indirect ones wait
    /// for a data request from `destination`.
    pub(crate) fn enqueue(
        &mut self,
        frame: FrameBuffer,
        kind: TxKind,
        destination: Address,
        indirect: bool,
    ) -> Result<()> {
        let ack_request = Frame::new_unchecked(frame.as_slice())
            .frame_control()
            .ack_request();
        let mut entry = TxEntry::new(frame, kind, destination);
        if ack_request {
            entry.options.insert(TxOptions::ACK_REQUEST);
            entry.retries = self.pib.max_frame_retries;
        }
        self.schedule_entry(&mut entry, indirect);

        let indirect = entry.is_indirect();
        self.queue
            .enqueue(entry)
            .map_err(|_| Error::TransactionOverflow)?;

        if indirect && !self.coord.is_beaconing() && !self.timers.is_armed(TimerId::IndirectExpiry) {
            let now = self.radio.now();
            self.timers
                .arm(TimerId::IndirectExpiry, now, BASE_SUPERFRAME_DURATION);
        }
        Ok(())
    }

    /// Scheduling flags of a new entry, given the active beacon roles.
    fn schedule_entry(&self, entry: &mut TxEntry, indirect: bool) {
        let beaconing = self.coord.is_beaconing();

        if entry.kind == TxKind::BeaconRequest {
            entry.flags = TxFlags::SCAN_RELATED | TxFlags::READY;
            return;
        }

        // without beacons a broadcast cannot be announced
        let broadcast = entry.destination.is_broadcast();
        if indirect && (beaconing || !broadcast) {
            entry.flags = TxFlags::OUTGOING_CAP | TxFlags::INDIRECT;
            entry.options.insert(TxOptions::INDIRECT);
            entry.persistence = self.pib.transaction_persistence_time;
            if broadcast {
                entry.flags.insert(TxFlags::BROADCAST);
            }
            if beaconing {
                entry.options.insert(TxOptions::SLOTTED);
            }
            return;
        }

        let to_coordinator = entry.destination == Address::Absent || self.is_coordinator(&entry.destination);
        if self.tracker.is_tracking() && to_coordinator {
            entry.flags = TxFlags::INCOMING_CAP | TxFlags::READY;
            entry.options.insert(TxOptions::SLOTTED);
        } else {
            entry.flags = TxFlags::OUTGOING_CAP | TxFlags::READY;
            if beaconing {
                entry.options.insert(TxOptions::SLOTTED);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{AuxSecurityHeaderRepr, KeyIdMode};

    fn addressing() -> AddressingRepr {
        AddressingRepr {
            dst_pan_id: 0x1234,
            dst_address: Address::short(0x0001),
            src_pan_id: 0x1234,
            src_address: Address::short(0x0000),
        }
    }

    #[test]
    fn frame_with_mic_room() {
        let header = HeaderRepr {
            sequence_number: Some(1),
            frame_version: FrameVersion::Ieee802154_2006,
            security: Some(AuxSecurityHeaderRepr {
                security_level: SecurityLevel::EncMic32,
                key_id_mode: KeyIdMode::Index,
                frame_counter: 0,
                key_source: [0; 8],
                key_index: 1,
            }),
            ..HeaderRepr::new(FrameType::Data, addressing())
        };
        let frame = build_frame(&header, &[1, 2, 3]).unwrap();
        assert_eq!(frame.len(), header.buffer_len() + 3 + 4);

        let parsed = Frame::new(frame.as_slice()).unwrap();
        assert!(parsed.frame_control().security_enabled());
        assert_eq!(&parsed.content()[..3], &[1, 2, 3]);
    }

    fn data_header(addressing: AddressingRepr) -> HeaderRepr {
        HeaderRepr {
            sequence_number: Some(1),
            ..HeaderRepr::new(FrameType::Data, addressing)
        }
    }

    #[test]
    fn frame_too_long() {
        let header = data_header(addressing());
        let fits = MAX_FRAME_LEN - header.buffer_len();
        assert!(build_frame(&header, &[0; MAX_FRAME_LEN][..fits]).is_ok());
        assert_eq!(
            build_frame(&header, &[0; MAX_FRAME_LEN][..fits + 1]),
            Err(Error::FrameTooLong)
        );
    }

    #[test]
    fn command_frame() {
        let header = HeaderRepr {
            ack_request: true,
            sequence_number: Some(2),
            ..HeaderRepr::new(FrameType::MacCommand, addressing())
        };
        let frame = build_command(&header, &CommandRepr::DataRequest).unwrap();
        let parsed = Frame::new(frame.as_slice()).unwrap();
        assert_eq!(parsed.payload(), &[0x04]);
    }

    #[test]
    fn filter() {
        let pib = Pib {
            pan_id: 0x1234,
            short_address: 0x0001,
            ..Default::default()
        };
        let frame = build_frame(&data_header(addressing()), &[]).unwrap();
        assert!(is_frame_for_us(&pib, false, &Frame::new(frame.as_slice()).unwrap()));

        let to_coordinator = AddressingRepr {
            dst_address: Address::Absent,
            ..addressing()
        };
        let frame = build_frame(&data_header(to_coordinator), &[]).unwrap();
        let frame = Frame::new(frame.as_slice()).unwrap();
        assert!(!is_frame_for_us(&pib, false, &frame));
        assert!(is_frame_for_us(&pib, true, &frame));
    }
}
