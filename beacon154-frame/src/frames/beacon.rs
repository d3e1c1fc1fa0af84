//! Beacon payload reader and writer.

use heapless::Vec;

use crate::{Address, AddressingMode, Error, Result};
use crate::{GtsSpecification, PendingAddressSpecification, SuperframeRepr, SuperframeSpecification};

/// The maximum number of short, and of extended, pending addresses a beacon
/// can announce.
pub const MAX_PENDING_ADDRESSES: usize = 7;

/// Length of one GTS descriptor.
const GTS_DESCRIPTOR_LEN: usize = 3;

/// A reader for the MAC payload of a beacon frame.
///
/// ```notrust
/// +------------+-----+-----------------+------------------+----------------+
/// | Superframe | GTS | GTS directions  | Pending address  | Beacon payload |
/// | spec (2)   | (1) | + descriptors   | spec + addresses |                |
/// +------------+-----+-----------------+------------------+----------------+
/// ```
#[derive(Debug)]
pub struct BeaconPayload<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> BeaconPayload<T> {
    /// Create a new [`BeaconPayload`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer cannot hold the GTS and pending address
    /// fields it announces.
    pub fn new(buffer: T) -> Result<Self> {
        let beacon = Self::new_unchecked(buffer);

        if !beacon.check_len() {
            return Err(Error);
        }

        Ok(beacon)
    }

    fn check_len(&self) -> bool {
        let len = self.buffer.as_ref().len();
        if len < 4 {
            return false;
        }
        let offset = self.pending_offset();
        if len < offset + 1 {
            return false;
        }
        len >= offset + self.pending_len()
    }

    /// Create a new [`BeaconPayload`] reader without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Return the [`SuperframeSpecification`] reader.
    pub fn superframe_specification(&self) -> SuperframeSpecification<&[u8]> {
        SuperframeSpecification::new_unchecked(&self.buffer.as_ref()[..2])
    }

    /// Return the [`GtsSpecification`] reader.
    pub fn gts_specification(&self) -> GtsSpecification<&[u8]> {
        GtsSpecification::new_unchecked(&self.buffer.as_ref()[2..3])
    }

    fn gts_len(&self) -> usize {
        match self.gts_specification().descriptor_count() as usize {
            0 => 1,
            count => 2 + count * GTS_DESCRIPTOR_LEN,
        }
    }

    fn pending_offset(&self) -> usize {
        2 + self.gts_len()
    }

    fn pending_len(&self) -> usize {
        let spec = self.pending_address_specification();
        1 + spec.short_count() as usize * 2 + spec.extended_count() as usize * 8
    }

    /// Return the [`PendingAddressSpecification`] reader.
    pub fn pending_address_specification(&self) -> PendingAddressSpecification<&[u8]> {
        PendingAddressSpecification::new_unchecked(&self.buffer.as_ref()[self.pending_offset()..][..1])
    }

    /// Return an [`Iterator`] over the pending addresses, short addresses
    /// first.
    pub fn pending_addresses(&self) -> PendingAddressIterator<'_> {
        let spec = self.pending_address_specification();
        PendingAddressIterator {
            data: &self.buffer.as_ref()[self.pending_offset() + 1..][..self.pending_len() - 1],
            short_addresses: spec.short_count(),
            extended_addresses: spec.extended_count(),
        }
    }

    /// Returns `true` when one of `addresses` is announced as pending.
    pub fn is_pending(&self, addresses: &[Address]) -> bool {
        self.pending_addresses().any(|a| addresses.contains(&a))
    }

    /// Return the beacon payload, behind the pending address fields.
    pub fn beacon_payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.pending_offset() + self.pending_len()..]
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for BeaconPayload<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sf = self.superframe_specification();
        writeln!(f, "Superframe Specification")?;
        writeln!(f, "  beacon order: {}", sf.beacon_order())?;
        writeln!(f, "  superframe order: {}", sf.superframe_order())?;
        writeln!(f, "  final cap slot: {}", sf.final_cap_slot())?;
        writeln!(
            f,
            "  battery life extension: {}",
            sf.battery_life_extension() as usize
        )?;
        writeln!(f, "  pan coordinator: {}", sf.pan_coordinator() as usize)?;
        writeln!(f, "  association permit: {}", sf.association_permit() as usize)?;
        writeln!(
            f,
            "GTS descriptors: {}",
            self.gts_specification().descriptor_count()
        )?;
        for address in self.pending_addresses() {
            writeln!(f, "Pending address: {}", address)?;
        }
        Ok(())
    }
}

/// An [`Iterator`] over the addresses of a pending address field.
#[derive(Debug)]
pub struct PendingAddressIterator<'f> {
    data: &'f [u8],
    short_addresses: u8,
    extended_addresses: u8,
}

impl Iterator for PendingAddressIterator<'_> {
    type Item = Address;

    fn next(&mut self) -> Option<Self::Item> {
        let mode = if self.short_addresses > 0 {
            self.short_addresses -= 1;
            AddressingMode::Short
        } else if self.extended_addresses > 0 {
            self.extended_addresses -= 1;
            AddressingMode::Extended
        } else {
            return None;
        };

        let address = Address::from_le_bytes(mode, self.data)?;
        self.data = &self.data[mode.size()..];
        Some(address)
    }
}

/// A high-level representation of a beacon MAC payload.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BeaconRepr<'p> {
    /// The superframe specification.
    pub superframe: SuperframeRepr,
    /// The GTS permit flag.
    pub gts_permit: bool,
    /// Short addresses with pending data.
    pub pending_short: Vec<Address, MAX_PENDING_ADDRESSES>,
    /// Extended addresses with pending data.
    pub pending_extended: Vec<Address, MAX_PENDING_ADDRESSES>,
    /// The beacon payload.
    pub payload: &'p [u8],
}

impl<'p> BeaconRepr<'p> {
    /// Parse a [`BeaconPayload`].
    pub fn parse(beacon: &BeaconPayload<&'p [u8]>) -> Self {
        let buffer: &'p [u8] = beacon.buffer;
        let mut repr = Self {
            superframe: SuperframeRepr::parse(&beacon.superframe_specification()),
            gts_permit: beacon.gts_specification().gts_permit(),
            payload: &buffer[beacon.pending_offset() + beacon.pending_len()..],
            ..Default::default()
        };
        for address in beacon.pending_addresses() {
            let _ = match address {
                Address::Short(_) => repr.pending_short.push(address),
                _ => repr.pending_extended.push(address),
            };
        }
        repr
    }

    /// Add a pending address, sorted by its kind.
    ///
    /// # Errors
    ///
    /// Returns an error when the list for that kind is full or the address
    /// is absent.
    pub fn add_pending(&mut self, address: Address) -> Result<()> {
        match address {
            Address::Short(_) => self.pending_short.push(address).map_err(|_| Error),
            Address::Extended(_) => self.pending_extended.push(address).map_err(|_| Error),
            Address::Absent => Err(Error),
        }
    }

    /// Return the length of the emitted beacon payload.
    pub fn buffer_len(&self) -> usize {
        2 + 1 + 1 + self.pending_short.len() * 2 + self.pending_extended.len() * 8 + self.payload.len()
    }

    /// Emit the beacon payload into the given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than [`Self::buffer_len`].
    pub fn emit(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < self.buffer_len() {
            return Err(Error);
        }

        self.superframe
            .emit(&mut SuperframeSpecification::new_unchecked(&mut buffer[..2]));

        let mut gts = GtsSpecification::new_unchecked(&mut buffer[2..3]);
        gts.set_descriptor_count(0);
        gts.set_gts_permit(self.gts_permit);

        let mut spec = PendingAddressSpecification::new_unchecked(&mut buffer[3..4]);
        spec.set_short_count(self.pending_short.len() as u8);
        spec.set_extended_count(self.pending_extended.len() as u8);

        let mut offset = 4;
        for address in self.pending_short.iter().chain(self.pending_extended.iter()) {
            address.write_le_bytes(&mut buffer[offset..][..address.len()]);
            offset += address.len();
        }

        buffer[offset..][..self.payload.len()].copy_from_slice(self.payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beacon_without_pending() {
        let data = [0x66, 0xcf, 0x00, 0x00, 0xaa];
        let beacon = BeaconPayload::new(&data[..]).unwrap();
        assert_eq!(beacon.superframe_specification().beacon_order(), 6);
        assert!(!beacon.gts_specification().gts_permit());
        assert_eq!(beacon.pending_addresses().count(), 0);
        assert_eq!(beacon.beacon_payload(), &[0xaa]);
    }

    #[test]
    fn pending_addresses() {
        let data = [
            0x66, 0x4f, 0x00, 0x11, 0x34, 0x12, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01,
        ];
        let beacon = BeaconPayload::new(&data[..]).unwrap();
        let pending: std::vec::Vec<_> = beacon.pending_addresses().collect();
        assert_eq!(
            pending,
            [
                Address::short(0x1234),
                Address::extended(0x0102_0304_0506_0708)
            ]
        );
        assert!(beacon.is_pending(&[Address::short(0x1234)]));
        assert!(!beacon.is_pending(&[Address::short(0x4321)]));
        assert!(beacon.beacon_payload().is_empty());

        let repr = BeaconRepr::parse(&beacon);
        assert_eq!(repr.pending_short.len(), 1);
        assert_eq!(repr.pending_extended.len(), 1);
        let mut emitted = [0u8; 14];
        repr.emit(&mut emitted).unwrap();
        assert_eq!(emitted, data);
    }

    #[test]
    fn gts_descriptors_are_skipped() {
        // one descriptor: directions octet + 3 octets
        let data = [0x66, 0xcf, 0x81, 0x00, 0x01, 0x00, 0x12, 0x00, 0xbb];
        let beacon = BeaconPayload::new(&data[..]).unwrap();
        assert_eq!(beacon.pending_addresses().count(), 0);
        assert_eq!(beacon.beacon_payload(), &[0xbb]);
    }

    #[test]
    fn truncated_pending_list() {
        let data = [0x66, 0xcf, 0x00, 0x01, 0x34];
        assert!(BeaconPayload::new(&data[..]).is_err());
    }

    #[test]
    fn emit_with_payload() {
        let mut repr = BeaconRepr {
            superframe: SuperframeRepr {
                beacon_order: 6,
                superframe_order: 6,
                final_cap_slot: 15,
                pan_coordinator: true,
                association_permit: true,
                ..Default::default()
            },
            payload: &[0xde, 0xad],
            ..Default::default()
        };
        repr.add_pending(Address::short(0x0002)).unwrap();
        assert!(repr.add_pending(Address::Absent).is_err());

        let mut buffer = [0u8; 8];
        assert_eq!(repr.buffer_len(), 8);
        repr.emit(&mut buffer).unwrap();
        assert_eq!(buffer, [0x66, 0xcf, 0x00, 0x01, 0x02, 0x00, 0xde, 0xad]);
        assert!(repr.emit(&mut [0u8; 7]).is_err());
    }
}
