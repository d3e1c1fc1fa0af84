//! Readers for complete IEEE 802.15.4 frames.

use crate::{Error, Result};

use crate::addressing::AddressPresence;
use crate::{
    decode_ies, AddressingFields, AuxiliarySecurityHeader, FrameControl, FrameType, FrameVersion,
    ParsedIes,
};

mod beacon;
pub use beacon::*;

mod command;
pub use command::*;

/// A reader/writer for an IEEE 802.15.4 frame without FCS.
///
/// ```notrust
/// +----+-----+------------+--------------+---------+---------+---------+-----+
/// | FC | Seq | Addressing | Aux Security | Header  | Payload | Payload | MIC |
/// |    |     |            | Header       | IEs     | IEs     |         |     |
/// +----+-----+------------+--------------+---------+---------+---------+-----+
/// ```
///
/// The MIC is not separated from the payload: its length depends on the
/// security level and it is stripped by the security transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Frame<T> {
    /// Create a new [`Frame`] reader/writer from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame control is reserved or the buffer is too
    /// short to hold the MAC header it describes.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Self::new_unchecked(buffer);

        if !frame.check_len() {
            return Err(Error);
        }

        Ok(frame)
    }

    fn check_len(&self) -> bool {
        let buffer = self.buffer.as_ref();
        if buffer.len() < 2 {
            return false;
        }

        let fc = self.frame_control();
        if fc.frame_version() == FrameVersion::Unknown || fc.frame_type() == FrameType::Unknown {
            return false;
        }

        let Some(presence) = AddressPresence::new(
            fc.frame_version(),
            fc.dst_addressing_mode(),
            fc.src_addressing_mode(),
            fc.pan_id_compression(),
        ) else {
            return false;
        };

        let offset = self.addressing_offset() + presence.len();
        if buffer.len() < offset {
            return false;
        }

        if fc.security_enabled() {
            return AuxiliarySecurityHeader::new(&buffer[offset..]).is_ok();
        }

        true
    }

    /// Create a new [`Frame`] reader/writer without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Returns the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the [`FrameControl`] reader.
    pub fn frame_control(&self) -> FrameControl<&[u8]> {
        FrameControl::new_unchecked(&self.buffer.as_ref()[..2])
    }

    /// Return the sequence number if not suppressed.
    pub fn sequence_number(&self) -> Option<u8> {
        if self.frame_control().sequence_number_suppression() {
            None
        } else {
            Some(self.buffer.as_ref()[2])
        }
    }

    fn addressing_offset(&self) -> usize {
        if self.frame_control().sequence_number_suppression() {
            2
        } else {
            3
        }
    }

    /// Return the [`AddressingFields`] reader.
    pub fn addressing(&self) -> Option<AddressingFields<&[u8]>> {
        let fc = self.frame_control();
        AddressingFields::new(&self.buffer.as_ref()[self.addressing_offset()..], &fc).ok()
    }

    fn security_offset(&self) -> usize {
        self.addressing_offset() + self.addressing().map_or(0, |af| af.len())
    }

    /// Return the [`AuxiliarySecurityHeader`] reader, when security is
    /// enabled.
    pub fn auxiliary_security_header(&self) -> Option<AuxiliarySecurityHeader<&[u8]>> {
        if !self.frame_control().security_enabled() {
            return None;
        }
        AuxiliarySecurityHeader::new(&self.buffer.as_ref()[self.security_offset()..]).ok()
    }

    /// Return the length of the MAC header up to the first IE: frame
    /// control, sequence number, addressing fields and auxiliary security
    /// header.
    pub fn header_len(&self) -> usize {
        self.security_offset() + self.auxiliary_security_header().map_or(0, |aux| aux.len())
    }

    /// Return everything behind the auxiliary security header.
    pub fn content(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..]
    }

    /// Decode the information elements. Frames without the IE present flag
    /// yield empty lists.
    ///
    /// # Errors
    ///
    /// Returns an error when an IE section holds more IEs than can be kept.
    pub fn information_elements(&self) -> Result<ParsedIes<'_>> {
        if self.frame_control().information_elements_present() {
            decode_ies(self.content())
        } else {
            Ok(ParsedIes::default())
        }
    }

    /// Return the MAC payload, behind any IEs.
    pub fn payload(&self) -> &[u8] {
        let content = self.content();
        let ies = self.information_elements().map_or(0, |ies| ies.len());
        &content[ies.min(content.len())..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Frame<T> {
    /// Return a [`FrameControl`] writer.
    pub fn frame_control_mut(&mut self) -> FrameControl<&mut [u8]> {
        FrameControl::new_unchecked(&mut self.buffer.as_mut()[..2])
    }

    /// Set the sequence number, if not suppressed.
    pub fn set_sequence_number(&mut self, value: u8) {
        if !self.frame_control().sequence_number_suppression() {
            self.buffer.as_mut()[2] = value;
        }
    }

    /// Return everything behind the auxiliary security header, mutably.
    pub fn content_mut(&mut self) -> &mut [u8] {
        let offset = self.header_len();
        &mut self.buffer.as_mut()[offset..]
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for Frame<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.frame_control())?;
        if let Some(seq) = self.sequence_number() {
            writeln!(f, "Sequence Number: {}", seq)?;
        }
        if let Some(af) = self.addressing() {
            write!(f, "{}", af)?;
        }
        if let Some(aux) = self.auxiliary_security_header() {
            write!(f, "{}", aux)?;
        }
        if let Ok(ies) = self.information_elements() {
            for ie in &ies.header {
                writeln!(f, "Header IE {}({:0x?})", ie.element_id(), ie.content)?;
            }
            for ie in &ies.payload {
                writeln!(f, "Payload IE {:?}", ie.group())?;
                for sub in ie.sub_ies() {
                    writeln!(f, "  {}", sub)?;
                }
            }
        }
        writeln!(f, "Payload: {:02x?}", self.payload())
    }
}

/// A reader for an IEEE 802.15.4 frame followed by its Frame Check Sequence
/// (FCS).
pub struct FrameWithFcs<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> FrameWithFcs<T> {
    /// Create a new [`FrameWithFcs`] from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short or the FCS does not match.
    pub fn new(buffer: T) -> Result<Self> {
        let frame = Self::new_unchecked(buffer);

        if !frame.check_len() {
            return Err(Error);
        }

        if !frame.check_fcs() {
            return Err(Error);
        }

        Ok(frame)
    }

    /// Check the length of the frame.
    pub fn check_len(&self) -> bool {
        self.buffer.as_ref().len() >= 2
    }

    /// Calculate the Frame Check Sequence (FCS) of the frame.
    #[inline]
    pub fn calculate_fcs(&self) -> u16 {
        calculate_fcs(self.content())
    }

    /// Check the Frame Check Sequence (FCS) of the frame.
    #[inline]
    pub fn check_fcs(&self) -> bool {
        self.calculate_fcs() == self.fcs()
    }

    /// Create a new [`FrameWithFcs`] from a given buffer without checking the FCS.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Return the content of the frame, excluding the FCS.
    pub fn content(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.buffer.as_ref().len() - 2]
    }

    /// Return the Frame Check Sequence (FCS) of the frame.
    pub fn fcs(&self) -> u16 {
        let len = self.buffer.as_ref().len();
        u16::from_le_bytes([self.buffer.as_ref()[len - 2], self.buffer.as_ref()[len - 1]])
    }

    /// Return a [`Frame`] reader over the content, excluding the FCS.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is not a valid frame.
    pub fn frame(&self) -> Result<Frame<&'_ [u8]>> {
        Frame::new(self.content())
    }
}

/// Compute the 16-bit ITU-T CRC used as FCS.
///
/// The polynomial is x^16 + x^12 + x^5 + 1, with both the initial and final
/// values 0x0000, computed over the whole frame excluding the FCS.
pub fn calculate_fcs(data: &[u8]) -> u16 {
    const CRC_16_IEEE802154: crc::Algorithm<u16> = crc::Algorithm {
        width: 16,
        poly: 0x1021,
        init: 0x0000,
        refin: true,
        refout: true,
        xorout: 0x0000,
        check: 0x2189,
        residue: 0x0000,
    };
    crc::Crc::<u16>::new(&CRC_16_IEEE802154).checksum(data)
}
