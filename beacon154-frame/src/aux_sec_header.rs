//! Auxiliary Security Header readers and writers.

use beacon154_macros::frame;

use crate::{Error, Result};

/// Security level of a frame, selecting confidentiality and the MIC length.
#[derive(Debug, Eq, PartialEq, Clone, Copy, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum SecurityLevel {
    /// No security.
    #[default]
    None = 0,
    /// Authentication with a 32-bit MIC.
    Mic32 = 1,
    /// Authentication with a 64-bit MIC.
    Mic64 = 2,
    /// Authentication with a 128-bit MIC.
    Mic128 = 3,
    /// Encryption without authentication.
    Enc = 4,
    /// Encryption with a 32-bit MIC.
    EncMic32 = 5,
    /// Encryption with a 64-bit MIC.
    EncMic64 = 6,
    /// Encryption with a 128-bit MIC.
    EncMic128 = 7,
}

impl From<u8> for SecurityLevel {
    fn from(value: u8) -> Self {
        match value & 0b111 {
            1 => Self::Mic32,
            2 => Self::Mic64,
            3 => Self::Mic128,
            4 => Self::Enc,
            5 => Self::EncMic32,
            6 => Self::EncMic64,
            7 => Self::EncMic128,
            _ => Self::None,
        }
    }
}

impl SecurityLevel {
    /// Return the MIC length in octets.
    pub const fn mic_len(&self) -> usize {
        match self {
            Self::None | Self::Enc => 0,
            Self::Mic32 | Self::EncMic32 => 4,
            Self::Mic64 | Self::EncMic64 => 8,
            Self::Mic128 | Self::EncMic128 => 16,
        }
    }

    /// Returns `true` when the payload is encrypted.
    pub const fn encrypts(&self) -> bool {
        (*self as u8) & 0b100 != 0
    }
}

/// Key identifier mode, selecting how the key is found.
#[derive(Debug, Eq, PartialEq, Clone, Copy, Default)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub enum KeyIdMode {
    /// The key is derived from the originator and recipient addresses.
    #[default]
    Implicit = 0,
    /// Key index with the default key source.
    Index = 1,
    /// Key index with a 4-octet key source.
    Source4 = 2,
    /// Key index with an 8-octet key source.
    Source8 = 3,
}

impl From<u8> for KeyIdMode {
    fn from(value: u8) -> Self {
        match value & 0b11 {
            1 => Self::Index,
            2 => Self::Source4,
            3 => Self::Source8,
            _ => Self::Implicit,
        }
    }
}

impl KeyIdMode {
    /// Return the length of the key source field in octets.
    pub const fn key_source_len(&self) -> usize {
        match self {
            Self::Implicit | Self::Index => 0,
            Self::Source4 => 4,
            Self::Source8 => 8,
        }
    }

    /// Return the length of the key identifier field in octets.
    pub const fn key_id_len(&self) -> usize {
        match self {
            Self::Implicit => 0,
            _ => self.key_source_len() + 1,
        }
    }
}

/// A reader/writer for the IEEE 802.15.4 Security Control field.
#[frame]
#[derive(Debug)]
pub struct SecurityControl {
    #[bits(3)]
    /// Return the raw security level field.
    security_level: u8,
    #[bits(2)]
    /// Return the raw key identifier mode field.
    key_id_mode: u8,
    #[bits(1)]
    /// Returns `true` when the frame counter is suppressed.
    frame_counter_suppression: bool,
    #[bits(1)]
    /// Returns `true` when the ASN is included in the nonce.
    asn_in_nonce: bool,
    #[bits(1)]
    _reserved: bool,
}

/// A reader for the IEEE 802.15.4 Auxiliary Security Header.
///
/// ```notrust
/// +------------------+---------------+-------------------------+
/// | Security control | Frame counter | Key identifier          |
/// | 1 octet          | 0/4 octets    | 0/1/5/9 octets          |
/// +------------------+---------------+-------------------------+
/// ```
#[derive(Debug)]
pub struct AuxiliarySecurityHeader<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> AuxiliarySecurityHeader<T> {
    /// Create a new [`AuxiliarySecurityHeader`] reader from a given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short for the fields announced
    /// by the security control field.
    pub fn new(buffer: T) -> Result<Self> {
        let header = Self::new_unchecked(buffer);

        if !header.check_len() {
            return Err(Error);
        }

        Ok(header)
    }

    fn check_len(&self) -> bool {
        !self.buffer.as_ref().is_empty() && self.buffer.as_ref().len() >= self.len()
    }

    /// Create a new [`AuxiliarySecurityHeader`] reader without length checking.
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Return the length of the header in octets.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let sc = self.security_control();
        1 + if sc.frame_counter_suppression() { 0 } else { 4 } + self.key_id_mode().key_id_len()
    }

    /// Return the [`SecurityControl`] reader.
    pub fn security_control(&self) -> SecurityControl<&[u8]> {
        SecurityControl::new_unchecked(&self.buffer.as_ref()[..1])
    }

    /// Return the [`SecurityLevel`].
    pub fn security_level(&self) -> SecurityLevel {
        SecurityLevel::from(self.security_control().security_level())
    }

    /// Return the [`KeyIdMode`].
    pub fn key_id_mode(&self) -> KeyIdMode {
        KeyIdMode::from(self.security_control().key_id_mode())
    }

    /// Return the frame counter, if not suppressed.
    pub fn frame_counter(&self) -> Option<u32> {
        if self.security_control().frame_counter_suppression() {
            return None;
        }
        let b = &self.buffer.as_ref()[1..5];
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn key_id_offset(&self) -> usize {
        if self.security_control().frame_counter_suppression() {
            1
        } else {
            5
        }
    }

    /// Return the key source field, empty for modes without one.
    pub fn key_source(&self) -> &[u8] {
        let len = self.key_id_mode().key_source_len();
        &self.buffer.as_ref()[self.key_id_offset()..][..len]
    }

    /// Return the key index field, if the key identifier mode has one.
    pub fn key_index(&self) -> Option<u8> {
        let mode = self.key_id_mode();
        if mode == KeyIdMode::Implicit {
            return None;
        }
        Some(self.buffer.as_ref()[self.key_id_offset() + mode.key_source_len()])
    }
}

impl<T: AsRef<[u8]>> core::fmt::Display for AuxiliarySecurityHeader<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Auxiliary Security Header")?;
        writeln!(f, "  security level: {:?}", self.security_level())?;
        writeln!(f, "  key identifier mode: {:?}", self.key_id_mode())?;
        if let Some(counter) = self.frame_counter() {
            writeln!(f, "  frame counter: {}", counter)?;
        }
        if !self.key_source().is_empty() {
            writeln!(f, "  key source: {:02x?}", self.key_source())?;
        }
        if let Some(index) = self.key_index() {
            writeln!(f, "  key index: {}", index)?;
        }
        Ok(())
    }
}

/// A high-level representation of the Auxiliary Security Header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "fuzz", derive(arbitrary::Arbitrary))]
pub struct AuxSecurityHeaderRepr {
    /// Security level.
    pub security_level: SecurityLevel,
    /// Key identifier mode.
    pub key_id_mode: KeyIdMode,
    /// Frame counter.
    pub frame_counter: u32,
    /// Key source, only the first `key_id_mode.key_source_len()` octets are used.
    pub key_source: [u8; 8],
    /// Key index.
    pub key_index: u8,
}

impl AuxSecurityHeaderRepr {
    /// Parse an [`AuxiliarySecurityHeader`].
    pub fn parse<T: AsRef<[u8]>>(header: &AuxiliarySecurityHeader<T>) -> Self {
        let mut key_source = [0u8; 8];
        let src = header.key_source();
        key_source[..src.len()].copy_from_slice(src);
        Self {
            security_level: header.security_level(),
            key_id_mode: header.key_id_mode(),
            frame_counter: header.frame_counter().unwrap_or(0),
            key_source,
            key_index: header.key_index().unwrap_or(0),
        }
    }

    /// Return the length of the emitted header in octets: 5, 6, 10 or 14.
    pub const fn buffer_len(&self) -> usize {
        5 + self.key_id_mode.key_id_len()
    }

    /// Emit the header into the given buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than [`Self::buffer_len`].
    pub fn emit(&self, buffer: &mut [u8]) -> Result<()> {
        if buffer.len() < self.buffer_len() {
            return Err(Error);
        }
        let mut sc = SecurityControl::new_unchecked(&mut buffer[..1]);
        sc.set_security_level(self.security_level as u8);
        sc.set_key_id_mode(self.key_id_mode as u8);
        sc.set_frame_counter_suppression(false);
        sc.set_asn_in_nonce(false);
        buffer[1..5].copy_from_slice(&self.frame_counter.to_le_bytes());

        let len = self.key_id_mode.key_source_len();
        buffer[5..][..len].copy_from_slice(&self.key_source[..len]);
        if self.key_id_mode != KeyIdMode::Implicit {
            buffer[5 + len] = self.key_index;
        }
        Ok(())
    }
}
