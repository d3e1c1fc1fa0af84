use super::{Error, Result};
use beacon154_macros::frame;

/// A reader/writer for the IEEE 802.15.4 Nested Information Elements.
///
/// ## Short format
/// ```notrust
/// +--------+--------+--------+--------------------------+
/// | Length | Sub-ID | Type=0 | Content (0-255 octets)...|
/// +--------+--------+--------+--------------------------+
///    0-7      8-14      15
/// ```
///
/// ## Long format
/// ```notrust
/// +--------+--------+--------+---------------------------+
/// | Length | Sub-ID | Type=1 | Content (0-2047 octets)...|
/// +--------+--------+--------+---------------------------+
///    0-10    11-14      15
/// ```
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct NestedInformationElement<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> NestedInformationElement<T> {
    /// Create a new [`NestedInformationElement`] reader/writer from a given
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short to contain the nested
    /// information element.
    pub fn new(data: T) -> Result<Self> {
        let nested = Self::new_unchecked(data);

        if !nested.check_len() {
            return Err(Error);
        }

        Ok(nested)
    }

    fn check_len(&self) -> bool {
        self.data.as_ref().len() >= 2 && self.data.as_ref().len() >= self.length() + 2
    }

    /// Create a new [`NestedInformationElement`] reader/writer from a given
    /// buffer without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    fn raw(&self) -> u16 {
        let b = self.data.as_ref();
        u16::from_le_bytes([b[0], b[1]])
    }

    /// Return the length of the content in bytes.
    pub fn length(&self) -> usize {
        if self.is_long() {
            (self.raw() & 0x07ff) as usize
        } else {
            (self.raw() & 0x00ff) as usize
        }
    }

    /// Return the raw sub-ID.
    pub fn raw_sub_id(&self) -> u8 {
        if self.is_long() {
            ((self.raw() >> 11) & 0b1111) as u8
        } else {
            ((self.raw() >> 8) & 0x7f) as u8
        }
    }

    /// Return the [`NestedSubId`].
    pub fn sub_id(&self) -> NestedSubId {
        if self.is_long() {
            NestedSubId::from_long(self.raw_sub_id())
        } else {
            NestedSubId::from_short(self.raw_sub_id())
        }
    }

    /// Returns `true` when the Nested Information Element is a short type.
    pub fn is_short(&self) -> bool {
        !self.is_long()
    }

    /// Returns `true` when the Nested Information Element is a long type.
    pub fn is_long(&self) -> bool {
        (self.raw() >> 15) & 0b1 == 0b1
    }

    /// Return the content of this Nested Information Element.
    pub fn content(&self) -> &[u8] {
        &self.data.as_ref()[2..][..self.length()]
    }
}

impl<'f> NestedInformationElement<&'f [u8]> {
    /// Return the content, borrowing the underlying buffer.
    pub fn into_content(self) -> &'f [u8] {
        let len = self.length();
        &self.data[2..][..len]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> NestedInformationElement<T> {
    /// Write the header of a short or long sub-IE.
    pub fn set_header(&mut self, long: bool, sub_id: u8, len: u16) {
        let value = if long {
            0x8000 | (((sub_id as u16) & 0b1111) << 11) | (len & 0x07ff)
        } else {
            (((sub_id as u16) & 0x7f) << 8) | (len & 0x00ff)
        };
        self.data.as_mut()[0..2].copy_from_slice(&value.to_le_bytes());
    }

    /// Return a mutable reference to the content of this Nested Information
    /// Element.
    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data.as_mut()[2..]
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for NestedInformationElement<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.sub_id() {
            NestedSubId::Short(NestedSubIdShort::CoexistenceSpecification) => {
                match CoexistenceSpecification::new(self.content()) {
                    Ok(coex) => write!(
                        f,
                        "Coexistence Specification bo: {}, so: {}, final cap slot: {}",
                        coex.beacon_order(),
                        coex.superframe_order(),
                        coex.final_cap_slot()
                    ),
                    Err(_) => write!(f, "Coexistence Specification({:0x?})", self.content()),
                }
            }
            NestedSubId::Short(id) => write!(f, "{:?}({:0x?})", id, self.content()),
            NestedSubId::Long(id) => write!(f, "{:?}({:0x?})", id, self.content()),
        }
    }
}

/// Nested Information Element ID.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum NestedSubId {
    /// Short Nested Information Element ID.
    Short(NestedSubIdShort),
    /// Long Nested Information Element ID.
    Long(NestedSubIdLong),
}

impl NestedSubId {
    /// Create a short [`NestedSubId`] from a `u8`.
    pub fn from_short(value: u8) -> Self {
        Self::Short(NestedSubIdShort::from(value))
    }

    /// Create a long [`NestedSubId`] from a `u8`.
    pub fn from_long(value: u8) -> Self {
        Self::Long(NestedSubIdLong::from(value))
    }

    /// Returns `true` when the Nested Information Element is a short type.
    pub fn is_short(&self) -> bool {
        matches!(self, Self::Short(_))
    }

    /// Returns `true` when the Nested Information Element is a long type.
    pub fn is_long(&self) -> bool {
        matches!(self, Self::Long(_))
    }
}

/// Short Nested Information Element ID.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum NestedSubIdShort {
    /// TSCH Synchronization.
    TschSynchronization = 0x1a,
    /// TSCH Slotframe and Link.
    TschSlotframeAndLink = 0x1b,
    /// TSCH Timeslot.
    TschTimeslot = 0x1c,
    /// Hopping Timing.
    HoppingTiming = 0x1d,
    /// Enhanced Beacon Filter.
    EnhancedBeaconFilter = 0x1e,
    /// MAC Metrics.
    MacMetrics = 0x1f,
    /// All MAC Metrics.
    AllMacMetrics = 0x20,
    /// Coexistence Specification.
    CoexistenceSpecification = 0x21,
    /// Sun Device Capabilities.
    SunDeviceCapabilities = 0x22,
    /// Sun FSK Generic PHY.
    SunFskGenericPhy = 0x23,
    /// Mode Switch Parameter.
    ModeSwitchParameter = 0x24,
    /// PHY Parameter Change.
    PhyParameterChange = 0x25,
    /// O-QPSK PHY Mode.
    OQpskPhyMode = 0x26,
    /// PCA Allocation.
    PcaAllocation = 0x27,
    /// Timestamp.
    Timestamp = 0x33,
    /// Link Margin.
    LinkMargin = 0x37,
    /// Vendor Specific.
    VendorSpecific = 0x40,
    /// Unknown.
    Unknown,
}

impl From<u8> for NestedSubIdShort {
    fn from(value: u8) -> Self {
        match value {
            0x1a => Self::TschSynchronization,
            0x1b => Self::TschSlotframeAndLink,
            0x1c => Self::TschTimeslot,
            0x1d => Self::HoppingTiming,
            0x1e => Self::EnhancedBeaconFilter,
            0x1f => Self::MacMetrics,
            0x20 => Self::AllMacMetrics,
            0x21 => Self::CoexistenceSpecification,
            0x22 => Self::SunDeviceCapabilities,
            0x23 => Self::SunFskGenericPhy,
            0x24 => Self::ModeSwitchParameter,
            0x25 => Self::PhyParameterChange,
            0x26 => Self::OQpskPhyMode,
            0x27 => Self::PcaAllocation,
            0x33 => Self::Timestamp,
            0x37 => Self::LinkMargin,
            0x40 => Self::VendorSpecific,
            _ => Self::Unknown,
        }
    }
}

/// Long Nested Information Element ID.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum NestedSubIdLong {
    /// Vendor Specific Nested Information Elements.
    VendorSpecificNested = 0x08,
    /// Channel Hopping.
    ChannelHopping = 0x09,
    /// Unknown.
    Unknown,
}

impl From<u8> for NestedSubIdLong {
    fn from(value: u8) -> Self {
        match value {
            0x08 => Self::VendorSpecificNested,
            0x09 => Self::ChannelHopping,
            _ => Self::Unknown,
        }
    }
}

/// Coexistence Specification sub-IE, advertising the superframe structure
/// in enhanced beacons.
#[frame]
#[derive(Debug)]
pub struct CoexistenceSpecification {
    #[bits(4)]
    /// Return the beacon order field value.
    beacon_order: u8,
    #[bits(4)]
    /// Return the superframe order field value.
    superframe_order: u8,
    #[bits(4)]
    /// Return the final CAP slot field value.
    final_cap_slot: u8,
    #[bits(4)]
    /// Return the enhanced beacon order field value.
    enhanced_beacon_order: u8,
    #[bits(4)]
    /// Return the offset time slot field value.
    offset_time_slot: u8,
    #[bits(4)]
    /// Return the CAP backoff offset field value.
    cap_backoff_offset: u8,
    /// Return the nonbeacon PAN enhanced beacon order field value.
    nbpan_enhanced_beacon_order: u16,
}

/// An [`Iterator`] over [`NestedInformationElement`].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct NestedInformationElementsIterator<'f> {
    data: &'f [u8],
    offset: usize,
    terminated: bool,
    malformed: bool,
}

impl<'f> NestedInformationElementsIterator<'f> {
    /// Create a new [`NestedInformationElementsIterator`].
    pub fn new(data: &'f [u8]) -> Self {
        Self {
            data,
            offset: 0,
            terminated: data.is_empty(),
            malformed: false,
        }
    }

    /// Returns `true` when a sub-IE ran past the end of the data.
    pub fn malformed(&self) -> bool {
        self.malformed
    }
}

impl<'f> Iterator for NestedInformationElementsIterator<'f> {
    type Item = NestedInformationElement<&'f [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }

        let Ok(nested) = NestedInformationElement::new(&self.data[self.offset..]) else {
            self.terminated = true;
            self.malformed = true;
            return None;
        };
        let len = nested.length() + 2;

        let nested = NestedInformationElement::new_unchecked(&self.data[self.offset..][..len]);

        self.offset += len;

        if self.offset >= self.data.len() {
            self.terminated = true;
        }

        Some(nested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_and_long_headers() {
        let mut data = [0u8; 2];
        let mut nested = NestedInformationElement::new_unchecked(&mut data[..]);
        nested.set_header(false, 0x21, 200);
        let nested = NestedInformationElement::new_unchecked(&data[..]);
        assert!(nested.is_short());
        assert_eq!(nested.length(), 200);
        assert_eq!(
            nested.sub_id(),
            NestedSubId::Short(NestedSubIdShort::CoexistenceSpecification)
        );

        let mut nested = NestedInformationElement::new_unchecked(&mut data[..]);
        nested.set_header(true, 0x09, 1000);
        let nested = NestedInformationElement::new_unchecked(&data[..]);
        assert!(nested.is_long());
        assert_eq!(nested.length(), 1000);
        assert_eq!(
            nested.sub_id(),
            NestedSubId::Long(NestedSubIdLong::ChannelHopping)
        );
    }

    #[test]
    fn coexistence() {
        let data = [0x66, 0xff, 0x00, 0x00, 0x00];
        let coex = CoexistenceSpecification::new(&data[..]).unwrap();
        assert_eq!(coex.beacon_order(), 6);
        assert_eq!(coex.superframe_order(), 6);
        assert_eq!(coex.final_cap_slot(), 15);
        assert_eq!(coex.enhanced_beacon_order(), 15);
        assert_eq!(CoexistenceSpecification::<&[u8]>::size(), 5);
    }
}
