//! Superframe, GTS and pending address specification fields.

use beacon154_macros::frame;

use crate::{Error, Result};

/// The beacon/superframe order meaning "no beacon" or "no active period".
pub const ORDER_NONE: u8 = 15;

#[frame]
#[derive(Debug)]
/// A reader/writer for the IEEE 802.15.4 Superframe Specification field.
pub struct SuperframeSpecification {
    #[bits(4)]
    /// Return the beacon order field value.
    beacon_order: u8,
    #[bits(4)]
    /// Return the superframe order field value.
    superframe_order: u8,
    #[bits(4)]
    /// Return the final CAP slot field value.
    final_cap_slot: u8,
    #[bits(1)]
    /// Return the battery life extension field value.
    battery_life_extension: bool,
    #[bits(1)]
    _reserved: bool,
    #[bits(1)]
    /// Return the PAN coordinator field value.
    pan_coordinator: bool,
    #[bits(1)]
    /// Return the association permit field value.
    association_permit: bool,
}

#[frame]
#[derive(Debug)]
/// A reader/writer for the IEEE 802.15.4 GTS Specification field.
pub struct GtsSpecification {
    #[bits(3)]
    /// Return the GTS descriptor count field value.
    descriptor_count: u8,
    #[bits(4)]
    _reserved: u8,
    #[bits(1)]
    /// Return the GTS permit field value.
    gts_permit: bool,
}

#[frame]
#[derive(Debug)]
/// A reader/writer for the IEEE 802.15.4 Pending Address Specification field.
pub struct PendingAddressSpecification {
    #[bits(3)]
    /// Return the number of short addresses pending.
    short_count: u8,
    #[bits(1)]
    _reserved: bool,
    #[bits(3)]
    /// Return the number of extended addresses pending.
    extended_count: u8,
    #[bits(1)]
    _reserved_2: bool,
}

/// A high-level representation of the Superframe Specification field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct SuperframeRepr {
    /// Beacon order, 15 for a nonbeacon-enabled PAN.
    pub beacon_order: u8,
    /// Superframe order, 15 when there is no active period.
    pub superframe_order: u8,
    /// Final CAP slot.
    pub final_cap_slot: u8,
    /// Battery life extension.
    pub battery_life_extension: bool,
    /// Sent by the PAN coordinator.
    pub pan_coordinator: bool,
    /// The coordinator accepts association requests.
    pub association_permit: bool,
}

impl Default for SuperframeRepr {
    fn default() -> Self {
        Self {
            beacon_order: ORDER_NONE,
            superframe_order: ORDER_NONE,
            final_cap_slot: 15,
            battery_life_extension: false,
            pan_coordinator: false,
            association_permit: false,
        }
    }
}

impl SuperframeRepr {
    /// Parse a [`SuperframeSpecification`].
    pub fn parse<T: AsRef<[u8]>>(spec: &SuperframeSpecification<T>) -> Self {
        Self {
            beacon_order: spec.beacon_order(),
            superframe_order: spec.superframe_order(),
            final_cap_slot: spec.final_cap_slot(),
            battery_life_extension: spec.battery_life_extension(),
            pan_coordinator: spec.pan_coordinator(),
            association_permit: spec.association_permit(),
        }
    }

    /// Emit the field into the given buffer.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]>>(&self, spec: &mut SuperframeSpecification<T>) {
        spec.set_beacon_order(self.beacon_order);
        spec.set_superframe_order(self.superframe_order);
        spec.set_final_cap_slot(self.final_cap_slot);
        spec.set_battery_life_extension(self.battery_life_extension);
        spec.set_pan_coordinator(self.pan_coordinator);
        spec.set_association_permit(self.association_permit);
    }

    /// Return the two octets of the field.
    pub fn to_bytes(&self) -> [u8; 2] {
        let mut bytes = [0u8; 2];
        self.emit(&mut SuperframeSpecification::new_unchecked(&mut bytes[..]));
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superframe_specification() {
        let spec = SuperframeSpecification::new(&[0x66, 0xcf][..]).unwrap();
        assert_eq!(spec.beacon_order(), 6);
        assert_eq!(spec.superframe_order(), 6);
        assert_eq!(spec.final_cap_slot(), 15);
        assert!(!spec.battery_life_extension());
        assert!(spec.pan_coordinator());
        assert!(spec.association_permit());

        let repr = SuperframeRepr::parse(&spec);
        assert_eq!(repr.to_bytes(), [0x66, 0xcf]);
    }

    #[test]
    fn setters_overwrite() {
        let mut bytes = [0xffu8, 0xff];
        let mut spec = SuperframeSpecification::new_unchecked(&mut bytes[..]);
        spec.set_superframe_order(3);
        spec.set_battery_life_extension(false);
        assert_eq!(spec.beacon_order(), 15);
        assert_eq!(spec.superframe_order(), 3);
        assert_eq!(spec.final_cap_slot(), 15);
        assert!(!spec.battery_life_extension());
        assert!(spec.association_permit());
    }

    #[test]
    fn pending_address_specification() {
        let spec = PendingAddressSpecification::new(&[0x21][..]).unwrap();
        assert_eq!(spec.short_count(), 1);
        assert_eq!(spec.extended_count(), 2);
        assert!(PendingAddressSpecification::new(&[][..]).is_err());
    }

    #[test]
    fn gts_specification() {
        let spec = GtsSpecification::new(&[0x82][..]).unwrap();
        assert_eq!(spec.descriptor_count(), 2);
        assert!(spec.gts_permit());
    }
}
