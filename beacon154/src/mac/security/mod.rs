//! Frame security.
//!
//! [`SecurityPib`] holds the key, device and security level tables. Outgoing
//! frames are secured in place with [`SecurityPib::protect`], received
//! frames are checked and decrypted with [`SecurityPib::unprotect`].
//!
//! Frame counters never repeat: the outgoing counter of a key is stamped and
//! incremented before the transform runs, and a received frame is only
//! accepted when its counter is above the last one accepted from the same
//! device with the same key.

pub mod ccm;

use heapless::Vec;

use crate::frame::{
    Address, AuxSecurityHeaderRepr, BeaconPayload, CommandId, Frame, FrameBuffer, FrameType,
    KeyIdMode, SecurityLevel,
};

use super::{Error, Result};

pub const MAX_KEYS: usize = 4;
pub const MAX_DEVICES: usize = 8;
pub const MAX_KEY_ID_LOOKUPS: usize = 2;
pub const MAX_KEY_DEVICES: usize = 8;
pub const MAX_KEY_USAGES: usize = 4;
pub const MAX_SECURITY_LEVELS: usize = 4;

/// Security parameters of a request or an indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Security {
    pub level: SecurityLevel,
    pub key_id_mode: KeyIdMode,
    pub key_source: [u8; 8],
    pub key_index: u8,
}

impl Security {
    pub const NONE: Self = Self {
        level: SecurityLevel::None,
        key_id_mode: KeyIdMode::Implicit,
        key_source: [0; 8],
        key_index: 0,
    };

    /// The auxiliary security header to emit, with a counter placeholder.
    pub fn aux_header(&self) -> Option<AuxSecurityHeaderRepr> {
        (self.level != SecurityLevel::None).then_some(AuxSecurityHeaderRepr {
            security_level: self.level,
            key_id_mode: self.key_id_mode,
            frame_counter: 0,
            key_source: self.key_source,
            key_index: self.key_index,
        })
    }
}

impl From<&AuxSecurityHeaderRepr> for Security {
    fn from(aux: &AuxSecurityHeaderRepr) -> Self {
        Self {
            level: aux.security_level,
            key_id_mode: aux.key_id_mode,
            key_source: aux.key_source,
            key_index: aux.key_index,
        }
    }
}

/// Key lookup data: 5 or 9 octets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyIdLookup(Vec<u8, 9>);

impl KeyIdLookup {
    pub fn new(data: &[u8]) -> Option<Self> {
        match data.len() {
            5 | 9 => Vec::from_slice(data).ok().map(Self),
            _ => None,
        }
    }

    /// Implicit lookup data of a peer: PAN ID and short address, or the
    /// extended address, followed by a zero octet.
    pub fn implicit(peer: Address, pan_id: u16) -> Option<Self> {
        let mut data = Vec::new();
        match peer {
            Address::Short(_) => {
                data.extend_from_slice(&pan_id.to_le_bytes()).ok()?;
                data.resize_default(4).ok()?;
                peer.write_le_bytes(&mut data[2..]);
            }
            Address::Extended(_) => {
                data.resize_default(8).ok()?;
                peer.write_le_bytes(&mut data[..]);
            }
            Address::Absent => return None,
        }
        data.push(0).ok()?;
        Some(Self(data))
    }

    /// Explicit lookup data: key source followed by the key index.
    pub fn index(key_source: &[u8], key_index: u8) -> Option<Self> {
        let mut data: Vec<u8, 9> = Vec::new();
        data.extend_from_slice(key_source).ok()?;
        data.push(key_index).ok()?;
        Self::new(&data)
    }
}

/// A device of the key's device list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDeviceDescriptor {
    /// Index into [`SecurityPib::devices`].
    pub device: usize,
    /// Last frame counter accepted with this key.
    pub frame_counter: Option<u32>,
    pub blacklisted: bool,
}

impl KeyDeviceDescriptor {
    pub fn new(device: usize) -> Self {
        Self {
            device,
            frame_counter: None,
            blacklisted: false,
        }
    }
}

/// A frame type, and command for command frames, a key may secure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage {
    pub frame_type: FrameType,
    pub command_id: Option<CommandId>,
}

impl KeyUsage {
    fn matches(&self, frame_type: FrameType, command_id: Option<CommandId>) -> bool {
        self.frame_type == frame_type
            && (frame_type != FrameType::MacCommand || self.command_id == command_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDescriptor {
    pub key: [u8; ccm::KEY_LEN],
    pub lookup: Vec<KeyIdLookup, MAX_KEY_ID_LOOKUPS>,
    pub devices: Vec<KeyDeviceDescriptor, MAX_KEY_DEVICES>,
    pub usages: Vec<KeyUsage, MAX_KEY_USAGES>,
    /// Next outgoing frame counter.
    pub frame_counter: u32,
}

impl KeyDescriptor {
    pub fn new(key: [u8; ccm::KEY_LEN]) -> Self {
        Self {
            key,
            lookup: Vec::new(),
            devices: Vec::new(),
            usages: Vec::new(),
            frame_counter: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub pan_id: u16,
    pub short_address: u16,
    pub extended_address: [u8; 8],
    /// May send unsecured frames where the level table allows an override.
    pub exempt: bool,
}

impl DeviceDescriptor {
    fn matches(&self, address: &Address, pan_id: u16) -> bool {
        match address {
            Address::Short(_) => {
                self.pan_id == pan_id && address.as_short() == Some(self.short_address)
            }
            Address::Extended(ext) => self.extended_address == *ext,
            Address::Absent => false,
        }
    }
}

/// Minimum security level for a frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityLevelDescriptor {
    pub frame_type: FrameType,
    pub command_id: Option<CommandId>,
    pub min_level: SecurityLevel,
    /// Exempt devices may send this frame type unsecured.
    pub device_override: bool,
}

/// Returns `true` when `level` offers at least the confidentiality and the
/// integrity of `min`.
fn meets(level: SecurityLevel, min: SecurityLevel) -> bool {
    level.mic_len() >= min.mic_len() && (level.encrypts() || !min.encrypts())
}

/// Security related PIB attributes.
#[derive(Debug, Clone, Default)]
pub struct SecurityPib {
    pub keys: Vec<KeyDescriptor, MAX_KEYS>,
    pub devices: Vec<DeviceDescriptor, MAX_DEVICES>,
    pub levels: Vec<SecurityLevelDescriptor, MAX_SECURITY_LEVELS>,
    pub default_key_source: [u8; 8],
    pub pan_coord_extended_address: [u8; 8],
    pub pan_coord_short_address: u16,
}

/// Offsets of the parts of a secured frame.
struct Layout {
    aux: AuxSecurityHeaderRepr,
    /// Start of the auxiliary security header.
    aux_offset: usize,
    /// Length of the authenticated-only part.
    open: usize,
    /// End of the payload, start of the MIC.
    end: usize,
    frame_type: FrameType,
    command_id: Option<CommandId>,
    peer: Address,
    peer_pan_id: u16,
}

impl SecurityPib {
    pub fn new() -> Self {
        Self {
            pan_coord_short_address: 0xffff,
            ..Default::default()
        }
    }

    fn layout(frame: &[u8], outgoing: bool) -> Result<Option<Layout>> {
        let frame = Frame::new(frame).map_err(|_| Error::InvalidParameter)?;
        let Some(aux) = frame.auxiliary_security_header() else {
            return Ok(None);
        };
        let aux = AuxSecurityHeaderRepr::parse(&aux);
        let header_len = frame.header_len();
        let end = frame
            .content()
            .len()
            .checked_sub(aux.security_level.mic_len())
            .ok_or(Error::SecurityError)?
            + header_len;
        let content = &frame.content()[..end - header_len];

        let fc = frame.frame_control();
        let frame_type = fc.frame_type();
        let mut open = header_len;
        let mut payload_ies = false;
        if fc.information_elements_present() {
            let ies = crate::frame::decode_ies(content).map_err(|_| Error::SecurityError)?;
            open += ies.header_len;
            payload_ies = !ies.payload.is_empty();
        }
        let mut command_id = None;
        match frame_type {
            FrameType::MacCommand if !payload_ies => {
                command_id = content.get(open - header_len).map(|id| CommandId::from(*id));
                open += 1;
            }
            FrameType::Beacon => {
                let beacon = BeaconPayload::new(content).map_err(|_| Error::SecurityError)?;
                open += content.len() - beacon.beacon_payload().len();
            }
            _ => {}
        }
        let open = open.min(end);

        let addressing = frame.addressing();
        let (peer, peer_pan_id) = match addressing {
            Some(af) if outgoing => (af.dst_address(), af.dst_pan_id().unwrap_or(0xffff)),
            Some(af) => (af.src_address(), af.effective_src_pan_id().unwrap_or(0xffff)),
            None => (Address::Absent, 0xffff),
        };

        Ok(Some(Layout {
            aux,
            aux_offset: header_len - aux.buffer_len(),
            open,
            end,
            frame_type,
            command_id,
            peer,
            peer_pan_id,
        }))
    }

    fn pan_coordinator(&self) -> Address {
        if self.pan_coord_short_address < Address::USE_EXTENDED {
            Address::short(self.pan_coord_short_address)
        } else {
            Address::Extended(self.pan_coord_extended_address)
        }
    }

    fn lookup_data(&self, aux: &AuxSecurityHeaderRepr, peer: Address, pan_id: u16) -> Option<KeyIdLookup> {
        match aux.key_id_mode {
            KeyIdMode::Implicit => match peer {
                Address::Absent => KeyIdLookup::implicit(self.pan_coordinator(), pan_id),
                _ => KeyIdLookup::implicit(peer, pan_id),
            },
            KeyIdMode::Index => KeyIdLookup::index(&self.default_key_source, aux.key_index),
            mode => KeyIdLookup::index(&aux.key_source[..mode.key_source_len()], aux.key_index),
        }
    }

    fn find_key(&self, lookup: &KeyIdLookup) -> Option<usize> {
        self.keys
            .iter()
            .position(|key| key.lookup.iter().any(|l| l == lookup))
    }

    fn find_device(&self, address: Address, pan_id: u16) -> Option<usize> {
        let address = match address {
            Address::Absent => self.pan_coordinator(),
            address => address,
        };
        self.devices
            .iter()
            .position(|device| device.matches(&address, pan_id))
    }

    /// Secure `buffer` in place. The MIC space must already be reserved at
    /// the end of the buffer. `source` is our extended address.
    ///
    /// Unsecured frames are left untouched.
    pub fn protect(&mut self, buffer: &mut FrameBuffer, source: [u8; 8]) -> Result<()> {
        let Some(layout) = Self::layout(buffer.as_slice(), true)? else {
            return Ok(());
        };
        let level = layout.aux.security_level;
        if level == SecurityLevel::None {
            return Ok(());
        }

        let lookup = self
            .lookup_data(&layout.aux, layout.peer, layout.peer_pan_id)
            .ok_or(Error::UnavailableKey)?;
        let key = self.find_key(&lookup).ok_or(Error::UnavailableKey)?;
        let key = &mut self.keys[key];
        if key.frame_counter == u32::MAX {
            return Err(Error::CounterError);
        }
        let counter = key.frame_counter;
        key.frame_counter += 1;

        let data = buffer.as_mut_slice();
        data[layout.aux_offset + 1..][..4].copy_from_slice(&counter.to_le_bytes());

        let nonce = ccm::nonce(&source, counter, level);
        let (data, mic) = data.split_at_mut(layout.end);
        let mic = &mut mic[..level.mic_len()];
        if level.encrypts() {
            let (a, m) = data.split_at_mut(layout.open);
            ccm::encrypt(&key.key, &nonce, a, m, mic);
        } else {
            ccm::encrypt(&key.key, &nonce, data, &mut [], mic);
        }
        Ok(())
    }

    /// Check, decrypt and strip the MIC of a received frame.
    ///
    /// Returns the security parameters of the frame, or `None` for an
    /// unsecured frame that passed the level check.
    pub fn unprotect(&mut self, buffer: &mut FrameBuffer, security_enabled: bool) -> Result<Option<Security>> {
        let Some(layout) = Self::layout(buffer.as_slice(), false)? else {
            if security_enabled {
                let frame = Frame::new_unchecked(buffer.as_slice());
                let (address, pan_id) = frame.addressing().map_or((Address::Absent, 0xffff), |af| {
                    (af.src_address(), af.effective_src_pan_id().unwrap_or(0xffff))
                });
                let frame_type = frame.frame_control().frame_type();
                let command_id = match frame_type {
                    FrameType::MacCommand => frame.payload().first().map(|id| CommandId::from(*id)),
                    _ => None,
                };
                let exempt = self
                    .find_device(address, pan_id)
                    .is_some_and(|d| self.devices[d].exempt);
                self.check_level(frame_type, command_id, SecurityLevel::None, exempt)?;
            }
            return Ok(None);
        };
        let aux = layout.aux;
        let level = aux.security_level;

        if !security_enabled {
            return Err(Error::UnsupportedSecurity);
        }
        if level == SecurityLevel::None {
            return Ok(None);
        }
        if aux.frame_counter == u32::MAX {
            return Err(Error::CounterError);
        }

        let lookup = self
            .lookup_data(&aux, layout.peer, layout.peer_pan_id)
            .ok_or(Error::UnavailableKey)?;
        let key_index = self.find_key(&lookup).ok_or(Error::UnavailableKey)?;
        let device_index = self
            .find_device(layout.peer, layout.peer_pan_id)
            .ok_or(Error::UnavailableKey)?;
        let key_device = self.keys[key_index]
            .devices
            .iter()
            .position(|kd| kd.device == device_index)
            .ok_or(Error::UnavailableKey)?;
        let kd = self.keys[key_index].devices[key_device];
        if kd.blacklisted {
            return Err(Error::UnavailableKey);
        }
        let device = self.devices[device_index];

        self.check_level(layout.frame_type, layout.command_id, level, device.exempt)?;

        let key = &self.keys[key_index];
        if !key
            .usages
            .iter()
            .any(|u| u.matches(layout.frame_type, layout.command_id))
        {
            return Err(Error::ImproperKeyType);
        }

        if kd.frame_counter.is_some_and(|last| aux.frame_counter <= last) {
            return Err(Error::CounterError);
        }

        let nonce = ccm::nonce(&device.extended_address, aux.frame_counter, level);
        let (data, mic) = buffer.as_mut_slice().split_at_mut(layout.end);
        let mic = &mic[..level.mic_len()];
        let valid = if level.encrypts() {
            let (a, m) = data.split_at_mut(layout.open);
            ccm::decrypt(&key.key, &nonce, a, m, mic)
        } else {
            ccm::decrypt(&key.key, &nonce, data, &mut [], mic)
        };
        if !valid {
            return Err(Error::SecurityError);
        }

        let kd = &mut self.keys[key_index].devices[key_device];
        kd.frame_counter = Some(aux.frame_counter);
        if aux.frame_counter == u32::MAX - 1 {
            kd.blacklisted = true;
        }
        buffer.truncate_back(level.mic_len());

        Ok(Some(Security::from(&aux)))
    }

    fn check_level(
        &self,
        frame_type: FrameType,
        command_id: Option<CommandId>,
        level: SecurityLevel,
        exempt: bool,
    ) -> Result<()> {
        let Some(descriptor) = self.levels.iter().find(|d| {
            d.frame_type == frame_type
                && (frame_type != FrameType::MacCommand || d.command_id == command_id)
        }) else {
            return Ok(());
        };
        if meets(level, descriptor.min_level) {
            return Ok(());
        }
        if level == SecurityLevel::None && descriptor.device_override && exempt {
            return Ok(());
        }
        Err(Error::ImproperSecurityLevel)
    }
}
