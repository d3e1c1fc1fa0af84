//! High-level representations used to build MAC headers.

use crate::addressing::AddressPresence;
use crate::{
    Address, AddressingFields, AddressingMode, AuxSecurityHeaderRepr, Frame, FrameBuffer,
    FrameControl, FrameType, FrameVersion,
};
use crate::{Error, Result};

/// A high-level representation of the IEEE 802.15.4 Addressing Fields.
///
/// The PAN ID compression flag is derived: it is set when both addresses are
/// present and share the PAN ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct AddressingRepr {
    /// Destination PAN ID, ignored when the destination is absent.
    pub dst_pan_id: u16,
    /// Destination address.
    pub dst_address: Address,
    /// Source PAN ID, ignored when the source is absent.
    pub src_pan_id: u16,
    /// Source address.
    pub src_address: Address,
}

impl Default for AddressingRepr {
    fn default() -> Self {
        Self {
            dst_pan_id: 0xffff,
            dst_address: Address::Absent,
            src_pan_id: 0xffff,
            src_address: Address::Absent,
        }
    }
}

impl AddressingRepr {
    /// Parse the [`AddressingFields`].
    pub fn parse<T: AsRef<[u8]>>(af: &AddressingFields<T>) -> Self {
        let dst_pan_id = af.dst_pan_id().or(af.src_pan_id()).unwrap_or(0xffff);
        Self {
            dst_pan_id,
            dst_address: af.dst_address(),
            src_pan_id: af.effective_src_pan_id().unwrap_or(dst_pan_id),
            src_address: af.src_address(),
        }
    }

    /// Returns `true` when the source PAN ID is elided.
    pub fn pan_id_compression(&self) -> bool {
        !self.dst_address.is_empty()
            && !self.src_address.is_empty()
            && self.dst_pan_id == self.src_pan_id
    }

    fn presence(&self, version: FrameVersion) -> Option<AddressPresence> {
        AddressPresence::new(
            version,
            AddressingMode::from(self.dst_address),
            AddressingMode::from(self.src_address),
            self.pan_id_compression(),
        )
    }

    /// Return the length of the emitted fields.
    pub fn buffer_len(&self, version: FrameVersion) -> usize {
        self.presence(version).map_or(0, |p| p.len())
    }

    /// Emit the fields into the given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error for a reserved frame version or a short buffer.
    pub fn emit(&self, version: FrameVersion, buffer: &mut [u8]) -> Result<()> {
        let presence = self.presence(version).ok_or(Error)?;
        if buffer.len() < presence.len() {
            return Err(Error);
        }

        let mut offset = 0;
        if presence.dst_pan_id {
            buffer[..2].copy_from_slice(&self.dst_pan_id.to_le_bytes());
            offset += 2;
        }
        self.dst_address
            .write_le_bytes(&mut buffer[offset..][..self.dst_address.len()]);
        offset += self.dst_address.len();
        if presence.src_pan_id {
            buffer[offset..][..2].copy_from_slice(&self.src_pan_id.to_le_bytes());
            offset += 2;
        }
        self.src_address
            .write_le_bytes(&mut buffer[offset..][..self.src_address.len()]);
        Ok(())
    }
}

/// A high-level representation of a MAC header: frame control, sequence
/// number, addressing fields and auxiliary security header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct HeaderRepr {
    /// Frame type.
    pub frame_type: FrameType,
    /// Frame version.
    pub frame_version: FrameVersion,
    /// Frame pending flag.
    pub frame_pending: bool,
    /// Acknowledgment request flag.
    pub ack_request: bool,
    /// IE present flag.
    pub ie_present: bool,
    /// Sequence number, `None` when suppressed.
    pub sequence_number: Option<u8>,
    /// Addressing fields.
    pub addressing: AddressingRepr,
    /// Auxiliary security header, `None` for unsecured frames.
    pub security: Option<AuxSecurityHeaderRepr>,
}

impl HeaderRepr {
    /// Create a header for the given frame type with every flag cleared.
    pub fn new(frame_type: FrameType, addressing: AddressingRepr) -> Self {
        Self {
            frame_type,
            frame_version: FrameVersion::Ieee802154_2003,
            frame_pending: false,
            ack_request: false,
            ie_present: false,
            sequence_number: None,
            addressing,
            security: None,
        }
    }

    /// Parse the header of a [`Frame`].
    pub fn parse<T: AsRef<[u8]>>(frame: &Frame<T>) -> Self {
        let fc = frame.frame_control();
        Self {
            frame_type: fc.frame_type(),
            frame_version: fc.frame_version(),
            frame_pending: fc.frame_pending(),
            ack_request: fc.ack_request(),
            ie_present: fc.information_elements_present(),
            sequence_number: frame.sequence_number(),
            addressing: frame
                .addressing()
                .map(|af| AddressingRepr::parse(&af))
                .unwrap_or_default(),
            security: frame
                .auxiliary_security_header()
                .map(|aux| AuxSecurityHeaderRepr::parse(&aux)),
        }
    }

    /// Return the length of the emitted header.
    pub fn buffer_len(&self) -> usize {
        2 + self.sequence_number.is_some() as usize
            + self.addressing.buffer_len(self.frame_version)
            + self.security.map_or(0, |s| s.buffer_len())
    }

    /// Prepend the header in front of the buffer content.
    ///
    /// # Errors
    ///
    /// Returns an error when the headroom is too small or the frame version
    /// is reserved.
    pub fn emit<const N: usize>(&self, buffer: &mut FrameBuffer<N>) -> Result<()> {
        if let Some(security) = &self.security {
            let aux = buffer.reserve_front(security.buffer_len())?;
            aux.fill(0);
            security.emit(aux)?;
        }

        let len = self.addressing.buffer_len(self.frame_version);
        self.addressing
            .emit(self.frame_version, buffer.reserve_front(len)?)?;

        if let Some(seq) = self.sequence_number {
            buffer.prepend(&[seq])?;
        }

        let fc_buffer = buffer.reserve_front(2)?;
        // reserved bit 7 stays zero
        fc_buffer.fill(0);
        let mut fc = FrameControl::new_unchecked(fc_buffer);
        fc.set_frame_type(self.frame_type);
        fc.set_security_enabled(self.security.is_some());
        fc.set_frame_pending(self.frame_pending);
        fc.set_ack_request(self.ack_request);
        fc.set_pan_id_compression(self.addressing.pan_id_compression());
        fc.set_sequence_number_suppression(self.sequence_number.is_none());
        fc.set_information_elements_present(self.ie_present);
        fc.set_dst_addressing_mode(AddressingMode::from(self.addressing.dst_address));
        fc.set_src_addressing_mode(AddressingMode::from(self.addressing.src_address));
        fc.set_frame_version(self.frame_version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyIdMode, SecurityLevel};

    #[test]
    fn data_header() {
        let header = HeaderRepr {
            sequence_number: Some(1),
            frame_version: FrameVersion::Ieee802154_2006,
            ..HeaderRepr::new(
                FrameType::Data,
                AddressingRepr {
                    dst_pan_id: 0xabcd,
                    dst_address: Address::BROADCAST,
                    src_pan_id: 0xabcd,
                    src_address: Address::extended(0x0012_4b00_14b5_d9c7),
                },
            )
        };
        assert_eq!(header.buffer_len(), 15);

        let mut buffer = FrameBuffer::<64>::new(32);
        buffer.append(&[0x2b, 0x00, 0x00, 0x00]).unwrap();
        header.emit(&mut buffer).unwrap();
        assert_eq!(
            buffer.as_slice(),
            hex::decode("41d801cdabffffc7d9b514004b12002b000000")
                .unwrap()
                .as_slice()
        );

        let frame = Frame::new(buffer.as_slice()).unwrap();
        assert_eq!(HeaderRepr::parse(&frame), header);
    }

    #[test]
    fn beacon_header() {
        let header = HeaderRepr {
            sequence_number: Some(0x2a),
            ..HeaderRepr::new(
                FrameType::Beacon,
                AddressingRepr {
                    src_pan_id: 0x1234,
                    src_address: Address::short(0x0000),
                    ..Default::default()
                },
            )
        };
        let mut buffer = FrameBuffer::<16>::new(16);
        header.emit(&mut buffer).unwrap();
        assert_eq!(
            buffer.as_slice(),
            &[0x00, 0x80, 0x2a, 0x34, 0x12, 0x00, 0x00]
        );
    }

    #[test]
    fn secured_header() {
        let header = HeaderRepr {
            sequence_number: Some(7),
            frame_version: FrameVersion::Ieee802154_2006,
            security: Some(AuxSecurityHeaderRepr {
                security_level: SecurityLevel::EncMic32,
                key_id_mode: KeyIdMode::Index,
                frame_counter: 5,
                key_index: 1,
                ..Default::default()
            }),
            ..HeaderRepr::new(
                FrameType::Data,
                AddressingRepr {
                    dst_pan_id: 0xabcd,
                    dst_address: Address::short(0x0001),
                    src_pan_id: 0xabcd,
                    src_address: Address::short(0x0002),
                },
            )
        };
        let mut buffer = FrameBuffer::<32>::new(32);
        header.emit(&mut buffer).unwrap();
        assert_eq!(
            buffer.as_slice(),
            &[
                0x49, 0x98, 0x07, 0xcd, 0xab, 0x01, 0x00, 0x02, 0x00, 0x0d, 0x05, 0x00, 0x00,
                0x00, 0x01
            ]
        );
    }

    #[test]
    fn no_headroom() {
        let header = HeaderRepr::new(FrameType::Data, AddressingRepr::default());
        let mut buffer = FrameBuffer::<4>::new(1);
        assert!(header.emit(&mut buffer).is_err());
    }
}
