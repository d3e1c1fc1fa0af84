//! Addressing fields readers and writers.

use super::FrameControl;
use super::FrameVersion;
use super::{Error, Result};

/// An IEEE 802.15.4 address.
///
/// Octets are stored most significant first, the reverse of the on-air order.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum Address {
    /// No address.
    Absent,
    /// A 16-bit short address.
    Short([u8; 2]),
    /// A 64-bit extended address.
    Extended([u8; 8]),
}

impl Address {
    /// The broadcast address.
    pub const BROADCAST: Address = Address::Short([0xff; 2]);

    /// Short address value meaning "use the extended address".
    pub const USE_EXTENDED: u16 = 0xfffe;

    /// Create a short address from its numeric value.
    pub const fn short(value: u16) -> Self {
        Address::Short(value.to_be_bytes())
    }

    /// Create an extended address from its numeric value.
    pub const fn extended(value: u64) -> Self {
        Address::Extended(value.to_be_bytes())
    }

    /// Query whether the address is an unicast address.
    pub fn is_unicast(&self) -> bool {
        !self.is_broadcast() && !self.is_empty()
    }

    /// Query whether this address is the broadcast address.
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Create an address from its octets, most significant first.
    pub fn from_bytes(a: &[u8]) -> Option<Self> {
        match a.len() {
            0 => Some(Address::Absent),
            2 => Some(Address::Short([a[0], a[1]])),
            8 => {
                let mut b = [0u8; 8];
                b.copy_from_slice(a);
                Some(Address::Extended(b))
            }
            _ => None,
        }
    }

    /// Read an address in on-air (little-endian) order.
    pub fn from_le_bytes(mode: AddressingMode, a: &[u8]) -> Option<Self> {
        if a.len() < mode.size() {
            return None;
        }
        match mode {
            AddressingMode::Absent => Some(Address::Absent),
            AddressingMode::Short => Some(Address::Short([a[1], a[0]])),
            AddressingMode::Extended => {
                let mut b = [0u8; 8];
                b.copy_from_slice(&a[..8]);
                b.reverse();
                Some(Address::Extended(b))
            }
            AddressingMode::Unknown => None,
        }
    }

    /// Write the address in on-air (little-endian) order.
    pub fn write_le_bytes(&self, buffer: &mut [u8]) {
        let bytes = self.as_bytes();
        for (dst, src) in buffer.iter_mut().zip(bytes.iter().rev()) {
            *dst = *src;
        }
    }

    /// Return the octets of the address, most significant first.
    pub const fn as_bytes(&self) -> &[u8] {
        match self {
            Address::Absent => &[],
            Address::Short(value) => value,
            Address::Extended(value) => value,
        }
    }

    /// Return the numeric value of a short address.
    pub fn as_short(&self) -> Option<u16> {
        match self {
            Address::Short(value) => Some(u16::from_be_bytes(*value)),
            _ => None,
        }
    }

    /// Return the length of the address in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Address::Absent => 0,
            Address::Short(_) => 2,
            Address::Extended(_) => 8,
        }
    }

    /// Returns `true` for [`Address::Absent`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Address::Absent)
    }
}

impl From<Address> for AddressingMode {
    fn from(value: Address) -> Self {
        match value {
            Address::Absent => AddressingMode::Absent,
            Address::Short(_) => AddressingMode::Short,
            Address::Extended(_) => AddressingMode::Extended,
        }
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Address::Absent => write!(f, "absent"),
            Address::Short(value) => write!(f, "{:02x}:{:02x}", value[0], value[1]),
            Address::Extended(value) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                value[0], value[1], value[2], value[3], value[4], value[5], value[6], value[7]
            ),
        }
    }
}

/// IEEE 802.15.4 addressing mode.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum AddressingMode {
    /// No address.
    Absent = 0b00,
    /// 16-bit short address.
    Short = 0b10,
    /// 64-bit extended address.
    Extended = 0b11,
    /// Reserved addressing mode.
    Unknown,
}

impl AddressingMode {
    /// Return the size of the address in octets.
    pub fn size(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Short => 2,
            Self::Extended => 8,
            Self::Unknown => 0,
        }
    }
}

impl From<u8> for AddressingMode {
    fn from(value: u8) -> Self {
        match value {
            0b00 => Self::Absent,
            0b10 => Self::Short,
            0b11 => Self::Extended,
            _ => Self::Unknown,
        }
    }
}

/// Which addressing fields are present, derived from the frame control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AddressPresence {
    pub dst_pan_id: bool,
    pub dst: AddressingMode,
    pub src_pan_id: bool,
    pub src: AddressingMode,
}

impl AddressPresence {
    pub(crate) fn new(
        frame_version: FrameVersion,
        dst_addr_mode: AddressingMode,
        src_addr_mode: AddressingMode,
        pan_id_compression: bool,
    ) -> Option<Self> {
        use AddressingMode::*;
        if matches!(dst_addr_mode, Unknown) || matches!(src_addr_mode, Unknown) {
            return None;
        }
        let (dst_pan_id, src_pan_id) = match frame_version {
            FrameVersion::Ieee802154_2003 | FrameVersion::Ieee802154_2006 => {
                match (dst_addr_mode, src_addr_mode) {
                    (Absent, Absent) => (false, false),
                    (Absent, _) => (false, true),
                    (_, Absent) => (true, false),
                    _ => (true, !pan_id_compression),
                }
            }
            FrameVersion::Ieee802154_2020 => {
                match (dst_addr_mode, src_addr_mode, pan_id_compression) {
                    (Absent, Absent, false) => (false, false),
                    (Absent, Absent, true) => (true, false),
                    (_, Absent, false) => (true, false),
                    (_, Absent, true) => (false, false),
                    (Absent, _, _) => (false, true),
                    (Extended, Extended, false) => (true, false),
                    (Extended, Extended, true) => (false, false),
                    (_, _, false) => (true, true),
                    (_, _, true) => (true, false),
                }
            }
            FrameVersion::Unknown => return None,
        };
        Some(Self {
            dst_pan_id,
            dst: dst_addr_mode,
            src_pan_id,
            src: src_addr_mode,
        })
    }

    fn from_fc<T: AsRef<[u8]>>(fc: &FrameControl<T>) -> Option<Self> {
        Self::new(
            fc.frame_version(),
            fc.dst_addressing_mode(),
            fc.src_addressing_mode(),
            fc.pan_id_compression(),
        )
    }

    pub(crate) fn len(&self) -> usize {
        (if self.dst_pan_id { 2 } else { 0 })
            + self.dst.size()
            + (if self.src_pan_id { 2 } else { 0 })
            + self.src.size()
    }
}

/// A reader for the IEEE 802.15.4 Addressing Fields.
pub struct AddressingFields<T: AsRef<[u8]>> {
    buffer: T,
    presence: AddressPresence,
}

impl<T: AsRef<[u8]>> AddressingFields<T> {
    /// Create a new [`AddressingFields`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame control describes a reserved
    /// addressing combination, or when the buffer is too small to hold the
    /// fields it describes.
    pub fn new<F: AsRef<[u8]>>(buffer: T, fc: &FrameControl<F>) -> Result<Self> {
        let presence = AddressPresence::from_fc(fc).ok_or(Error)?;
        let af = Self { buffer, presence };

        if af.buffer.as_ref().len() < presence.len() {
            return Err(Error);
        }

        Ok(af)
    }

    /// Return the length of the Addressing Fields in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.presence.len()
    }

    /// Return the IEEE 802.15.4 destination PAN ID if not elided.
    pub fn dst_pan_id(&self) -> Option<u16> {
        if self.presence.dst_pan_id {
            let b = &self.buffer.as_ref()[..2];
            Some(u16::from_le_bytes([b[0], b[1]]))
        } else {
            None
        }
    }

    /// Return the IEEE 802.15.4 destination [`Address`].
    pub fn dst_address(&self) -> Address {
        let offset = if self.presence.dst_pan_id { 2 } else { 0 };
        Address::from_le_bytes(self.presence.dst, &self.buffer.as_ref()[offset..])
            .unwrap_or(Address::Absent)
    }

    /// Return the IEEE 802.15.4 source PAN ID if not elided.
    pub fn src_pan_id(&self) -> Option<u16> {
        if self.presence.src_pan_id {
            let offset = (if self.presence.dst_pan_id { 2 } else { 0 }) + self.presence.dst.size();
            let b = &self.buffer.as_ref()[offset..][..2];
            Some(u16::from_le_bytes([b[0], b[1]]))
        } else {
            None
        }
    }

    /// Return the IEEE 802.15.4 source [`Address`].
    pub fn src_address(&self) -> Address {
        let offset = (if self.presence.dst_pan_id { 2 } else { 0 })
            + self.presence.dst.size()
            + (if self.presence.src_pan_id { 2 } else { 0 });
        Address::from_le_bytes(self.presence.src, &self.buffer.as_ref()[offset..])
            .unwrap_or(Address::Absent)
    }

    /// Return the PAN ID the source belongs to, taking PAN ID compression
    /// into account.
    pub fn effective_src_pan_id(&self) -> Option<u16> {
        self.src_pan_id().or_else(|| self.dst_pan_id())
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for AddressingFields<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Addressing Fields")?;

        if let Some(id) = self.dst_pan_id() {
            writeln!(f, "  dst pan id: {:0x}", id)?;
        }

        writeln!(f, "  dst address: {}", self.dst_address())?;

        if let Some(id) = self.src_pan_id() {
            writeln!(f, "  src pan id: {:0x}", id)?;
        }

        writeln!(f, "  src address: {}", self.src_address())?;

        Ok(())
    }
}
