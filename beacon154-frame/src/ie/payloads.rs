use super::NestedInformationElementsIterator;
use super::{Error, Result};

/// A reader/writer for the IEEE 802.15.4 Payload Information Elements.
///
/// ```notrust
/// +--------+----------+--------+---------------------------+
/// | Length | Group ID | Type=1 | Content (0-2047 octets)...|
/// +--------+----------+--------+---------------------------+
///    0-10     11-14       15
/// ```
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub struct PayloadInformationElement<T: AsRef<[u8]>> {
    data: T,
}

impl<T: AsRef<[u8]>> PayloadInformationElement<T> {
    /// Create a new [`PayloadInformationElement`] reader/writer from a given
    /// buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is too short to contain the payload
    /// information element and its content.
    pub fn new(data: T) -> Result<Self> {
        let ie = Self::new_unchecked(data);

        if !ie.check_len() {
            return Err(Error);
        }

        Ok(ie)
    }

    fn check_len(&self) -> bool {
        self.data.as_ref().len() >= 2 && self.data.as_ref().len() >= 2 + self.length()
    }

    /// Create a new [`PayloadInformationElement`] reader/writer from a given
    /// buffer without length checking.
    pub fn new_unchecked(data: T) -> Self {
        Self { data }
    }

    /// Return the length field value (which is the length of the content field).
    pub fn length(&self) -> usize {
        let b = &self.data.as_ref()[0..2];
        (u16::from_le_bytes([b[0], b[1]]) & 0x07ff) as usize
    }

    /// Return the raw group ID.
    pub fn raw_group_id(&self) -> u8 {
        let b = &self.data.as_ref()[0..2];
        ((u16::from_le_bytes([b[0], b[1]]) >> 11) & 0b1111) as u8
    }

    /// Return the [`PayloadGroupId`].
    pub fn group_id(&self) -> PayloadGroupId {
        PayloadGroupId::from(self.raw_group_id())
    }

    /// Return the content of this Payload Information Element.
    pub fn content(&self) -> &[u8] {
        &self.data.as_ref()[2..][..self.length()]
    }

    /// Returns [`NestedInformationElementsIterator`] [`Iterator`], empty
    /// unless this is an [`MLME`] group IE.
    ///
    /// [`MLME`]: PayloadGroupId::Mlme
    pub fn nested_information_elements(&self) -> NestedInformationElementsIterator {
        if self.group_id() == PayloadGroupId::Mlme {
            NestedInformationElementsIterator::new(self.content())
        } else {
            NestedInformationElementsIterator::new(&[])
        }
    }
}

impl<'f> PayloadInformationElement<&'f [u8]> {
    /// Return the content, borrowing the underlying buffer.
    pub fn into_content(self) -> &'f [u8] {
        let len = self.length();
        &self.data[2..][..len]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> PayloadInformationElement<T> {
    /// Set the length field value.
    pub fn set_length(&mut self, len: u16) {
        const MASK: u16 = 0b0000_0111_1111_1111;
        let b = &mut self.data.as_mut()[0..2];
        let value = u16::from_le_bytes([b[0], b[1]]) & !MASK;
        let value = value | (len & MASK);
        b.copy_from_slice(&value.to_le_bytes());
    }

    /// Set the group ID and the type bit.
    pub fn set_group_id(&mut self, id: u8) {
        const MASK: u16 = 0b0111_1000_0000_0000;
        let b = &mut self.data.as_mut()[0..2];
        let value = u16::from_le_bytes([b[0], b[1]]) & !MASK;
        let value = value | (((id as u16) << 11) & MASK) | 0b1000_0000_0000_0000;
        b.copy_from_slice(&value.to_le_bytes());
    }

    /// Return the content of this Payload Information Element.
    pub fn content_mut(&mut self) -> &mut [u8] {
        &mut self.data.as_mut()[2..]
    }
}

/// Payload Information Element group ID.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum PayloadGroupId {
    /// Encapsulated Service Data Unit Information Elements
    Esdu = 0x00,
    /// MAC sublayer Management Entity Information Elements
    Mlme = 0x1,
    /// Vendor specific Nested Information Elements
    VendorSpecific = 0x02,
    /// Payload Termination
    PayloadTermination = 0x0f,
    /// Unknown
    Unknown,
}

impl From<u8> for PayloadGroupId {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Esdu,
            0x01 => Self::Mlme,
            0x02 => Self::VendorSpecific,
            0x0f => Self::PayloadTermination,
            _ => Self::Unknown,
        }
    }
}

/// An [`Iterator`] over [`PayloadInformationElement`].
#[derive(Debug)]
pub struct PayloadInformationElementsIterator<'f> {
    pub(crate) data: &'f [u8],
    pub(crate) offset: usize,
    pub(crate) terminated: bool,
    pub(crate) malformed: bool,
}

impl<'f> PayloadInformationElementsIterator<'f> {
    /// Create a new iterator over the payload IEs at the start of `data`.
    pub fn new(data: &'f [u8]) -> Self {
        Self {
            data,
            offset: 0,
            terminated: data.is_empty(),
            malformed: false,
        }
    }

    /// Return the offset of the iterator.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns `true` when an IE ran past the end of the data.
    pub fn malformed(&self) -> bool {
        self.malformed
    }
}

impl<'f> Iterator for PayloadInformationElementsIterator<'f> {
    type Item = PayloadInformationElement<&'f [u8]>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.terminated {
            return None;
        }

        let Ok(ie) = PayloadInformationElement::new(&self.data[self.offset..]) else {
            self.terminated = true;
            self.malformed = true;
            return None;
        };

        let len = ie.length() + 2;
        let ie = PayloadInformationElement::new_unchecked(&self.data[self.offset..][..len]);

        self.terminated = matches!(ie.group_id(), PayloadGroupId::PayloadTermination);
        self.offset += len;

        if self.offset >= self.data.len() {
            self.terminated = true;
        }

        Some(ie)
    }
}
