//! IEEE 802.15.4 Header Information Element reader and writers.

use crate::{Error, Result};
use beacon154_macros::frame;

/// A reader/writer for the IEEE 802.15.4 Header Information Elements.
///
/// ```notrust
/// +--------+------------+--------+--------------------------+
/// | Length | Element ID | Type=0 | Content (0-127 octets)...|
/// +--------+------------+--------+--------------------------+
///    0-6       7-14        15
/// ```
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct HeaderInformationElement<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> HeaderInformationElement<T> {
    /// Create a new [`HeaderInformationElement`] reader/writer from a given
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot hold the header and the content
    /// announced by the length field.
    pub fn new(data: T) -> Result<Self> {
        let ie = Self::new_unchecked(data);

        if !ie.check_len() {
            return Err(Error);
        }

        Ok(ie)
    }

    /// Returns `false` if the buffer is too short to contain the Header
    /// Information Element.
    fn check_len(&self) -> bool {
        self.data.as_ref().len() >= 2 && self.data.as_ref().len() >= 2 + self.len()
    }

    /// Create a new [`HeaderInformationElement`] reader/writer from a given
    /// buffer without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Returns `true` when the length field is 0.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the length field value.
    pub fn len(&self) -> usize {
        let b = &self.data.as_ref()[0..2];
        (u16::from_le_bytes([b[0], b[1]]) & 0x7f) as usize
    }

    /// Return the raw element ID.
    pub fn raw_element_id(&self) -> u8 {
        let b = &self.data.as_ref()[0..2];
        ((u16::from_le_bytes([b[0], b[1]]) >> 7) & 0xff) as u8
    }

    /// Return the [`HeaderElementId`].
    pub fn element_id(&self) -> HeaderElementId {
        HeaderElementId::from(self.raw_element_id())
    }

    /// Returns `true` for the two header termination IEs.
    pub fn is_termination(&self) -> bool {
        matches!(
            self.element_id(),
            HeaderElementId::HeaderTermination1 | HeaderElementId::HeaderTermination2
        )
    }

    /// Return the content of this Header Information Element.
    pub fn content(&self) -> &[u8] {
        &self.data.as_ref()[2..][..self.len()]
    }
}

impl<'f> HeaderInformationElement<&'f [u8]> {
    /// Return the content, borrowing the underlying buffer.
    pub fn into_content(self) -> &'f [u8] {
        let len = self.len();
        &self.data[2..][..len]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> HeaderInformationElement<T> {
    /// Set the length field.
    pub fn set_length(&mut self, len: u16) {
        const MASK: u16 = 0x007f;

        let b = &mut self.data.as_mut()[0..2];
        let value = u16::from_le_bytes([b[0], b[1]]) & !MASK;
        let value = value | (len & MASK);
        b[0..2].copy_from_slice(&value.to_le_bytes());
    }

    /// Set the element ID field and clear the type bit.
    pub fn set_element_id(&mut self, id: u8) {
        const SHIFT: u16 = 7;
        const MASK: u16 = 0b1111_1111_1000_0000;

        let b = &mut self.data.as_mut()[0..2];
        let value = u16::from_le_bytes([b[0], b[1]]) & !MASK;
        let value = value | (((id as u16) << SHIFT) & 0x7f80);
        b[0..2].copy_from_slice(&value.to_le_bytes());
    }

    /// Return the content of this Header Information Element.
    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data.as_mut()[2..]
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for HeaderInformationElement<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let id = self.element_id();
        match id {
            HeaderElementId::HeaderTermination1 | HeaderElementId::HeaderTermination2 => {
                write!(f, "{:?}", id)
            }
            HeaderElementId::Csl => match Csl::new(self.content()) {
                Ok(csl) => write!(
                    f,
                    "{} phase: {}, period: {}",
                    id,
                    csl.csl_phase(),
                    csl.csl_period()
                ),
                Err(_) => write!(f, "{}({:0x?})", id, self.content()),
            },
            HeaderElementId::Rit => match Rit::new(self.content()) {
                Ok(rit) => write!(
                    f,
                    "{} first listen: {}, repeat: {}, interval: {}",
                    id,
                    rit.time_to_first_listen(),
                    rit.number_of_repeat_listen(),
                    rit.repeat_listen_interval()
                ),
                Err(_) => write!(f, "{}({:0x?})", id, self.content()),
            },
            HeaderElementId::VendorSpecificHeader => match VendorSpecific::new(self.content()) {
                Ok(vendor) => write!(
                    f,
                    "{} oui: {:06x}, payload: {:0x?}",
                    id,
                    vendor.vendor_oui(),
                    vendor.vendor_specific_payload()
                ),
                Err(_) => write!(f, "{}({:0x?})", id, self.content()),
            },
            id => write!(f, "{}({:0x?})", id, self.content()),
        }
    }
}

/// Header Information Element ID.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum HeaderElementId {
    /// Vendor specific header.
    VendorSpecificHeader = 0x00,
    /// Csl header.
    Csl = 0x1a,
    /// Rit header.
    Rit = 0x1b,
    /// Dsme Pan Descriptor header.
    DsmePanDescriptor = 0x1c,
    /// Rendezvous Time header.
    RendezvousTime = 0x1d,
    /// Time Correction header.
    TimeCorrection = 0x1e,
    /// Extended Dsme Pan Descriptor header.
    ExtendedDsmePanDescriptor = 0x21,
    /// Fragment Sequence Context Description header.
    FragmentSequenceContextDescription = 0x22,
    /// Simplified Superframe Specification header.
    SimplifiedSuperframeSpecification = 0x23,
    /// Simplified Gts Specification header.
    SimplifiedGtsSpecification = 0x24,
    /// Lecim Capabilities header.
    LecimCapabilities = 0x25,
    /// Trle Descriptor header.
    TrleDescriptor = 0x26,
    /// Rcc Capabilities header.
    RccCapabilities = 0x27,
    /// Rccn Descriptor header.
    RccnDescriptor = 0x28,
    /// Global Time header.
    GlobalTime = 0x29,
    /// Da header.
    Da = 0x2b,
    /// Header Termination 1, payload IEs follow.
    HeaderTermination1 = 0x7e,
    /// Header Termination 2, no payload IEs follow.
    HeaderTermination2 = 0x7f,
    /// Unknown header.
    Unknown,
}

impl From<u8> for HeaderElementId {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::VendorSpecificHeader,
            0x1a => Self::Csl,
            0x1b => Self::Rit,
            0x1c => Self::DsmePanDescriptor,
            0x1d => Self::RendezvousTime,
            0x1e => Self::TimeCorrection,
            0x21 => Self::ExtendedDsmePanDescriptor,
            0x22 => Self::FragmentSequenceContextDescription,
            0x23 => Self::SimplifiedSuperframeSpecification,
            0x24 => Self::SimplifiedGtsSpecification,
            0x25 => Self::LecimCapabilities,
            0x26 => Self::TrleDescriptor,
            0x27 => Self::RccCapabilities,
            0x28 => Self::RccnDescriptor,
            0x29 => Self::GlobalTime,
            0x2b => Self::Da,
            0x7e => Self::HeaderTermination1,
            0x7f => Self::HeaderTermination2,
            _ => Self::Unknown,
        }
    }
}

impl core::fmt::Display for HeaderElementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::VendorSpecificHeader => write!(f, "Vendor Specific"),
            Self::TimeCorrection => write!(f, "Time Correction"),
            Self::RendezvousTime => write!(f, "Rendezvous Time"),
            _ => write!(f, "{:?}", self),
        }
    }
}

/// An [`Iterator`] over [`HeaderInformationElement`].
///
/// Iteration stops after a termination IE, at the end of the data, or at the
/// first IE whose length runs past the data.
#[derive(Debug)]
pub struct HeaderInformationElementsIterator<'f> {
    pub(crate) data: &'f [u8],
    pub(crate) offset: usize,
    pub(crate) terminated: bool,
    pub(crate) malformed: bool,
}

impl<'f> HeaderInformationElementsIterator<'f> {
    /// Create a new iterator over the header IEs at the start of `data`.
    pub fn new(data: &'f [u8]) -> Self {
        Self {
            data,
            offset: 0,
            terminated: data.is_empty(),
            malformed: false,
        }
    }

    /// Returns the offset of the next Header Information Element.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns `true` when an IE ran past the end of the data.
    pub fn malformed(&self) -> bool {
        self.malformed
    }
}

impl<'f> Iterator for HeaderInformationElementsIterator<'f> {
    type Item = HeaderInformationElement<&'f [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }

        let Ok(ie) = HeaderInformationElement::new(&self.data[self.offset..]) else {
            self.terminated = true;
            self.malformed = true;
            return None;
        };

        let len = ie.len() + 2;
        let ie = HeaderInformationElement::new_unchecked(&self.data[self.offset..][..len]);

        self.terminated = ie.is_termination();
        self.offset += len;

        if self.offset >= self.data.len() {
            self.terminated = true;
        }

        Some(ie)
    }
}

/// Vendor Specific Header Information Element.
#[frame]
#[derive(Debug)]
pub struct VendorSpecific {
    #[bytes(3)]
    /// Returns the vendor OUI field.
    vendor_oui: u32,

    #[bytes(0)]
    /// Returns the vendor specific payload.
    vendor_specific_payload: &[u8],
}

/// CSL Header Information Element.
#[frame]
#[derive(Debug)]
pub struct Csl {
    /// Return the CSL phase field value.
    csl_phase: u16,
    /// Return the CSL period field value.
    csl_period: u16,
}

/// RIT Header Information Element.
#[frame]
#[derive(Debug)]
pub struct Rit {
    /// Return the time to first listen field value.
    time_to_first_listen: u8,
    /// Return the number of repeat listen field value.
    number_of_repeat_listen: u8,
    /// Return the repeat listen interval field value.
    repeat_listen_interval: u16,
}
