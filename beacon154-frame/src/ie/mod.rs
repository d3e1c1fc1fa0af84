//! Information Elements readers, writers and the IE codec.
//!
//! Outgoing IEs are written back-to-front into a [`FrameBuffer`]: payload IEs
//! are prepended in front of the MAC payload first, then the header IEs in
//! front of those. Received IEs are decoded into [`ParsedIes`], two bounded
//! lists borrowing the frame buffer.

mod headers;
pub use headers::*;

mod payloads;
pub use payloads::*;

mod nested;
pub use nested::*;

use super::{Error, Result};
use crate::FrameBuffer;

use heapless::Vec;

/// The maximum number of IEs kept per section when decoding.
pub const MAX_PARSED_IES: usize = 16;

/// Header IE element ID of the termination IE followed by payload IEs.
pub const HEADER_TERMINATION_1: u8 = 0x7e;
/// Header IE element ID of the termination IE followed by the MAC payload.
pub const HEADER_TERMINATION_2: u8 = 0x7f;
/// Payload IE group ID of the payload termination IE.
pub const PAYLOAD_TERMINATION: u8 = 0x0f;

const HEADER_IE_MAX_LEN: usize = 0x7f;
const PAYLOAD_IE_MAX_LEN: usize = 0x7ff;
const SHORT_SUB_IE_MAX_LEN: usize = 0xff;

/// A header IE to encode. An empty `content` encodes an identifier-only IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderIeRequest<'a> {
    /// Element ID.
    pub id: u8,
    /// Content octets.
    pub content: &'a [u8],
}

/// A sub-IE nested in an MLME payload IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubIeRequest<'a> {
    /// Sub-ID, 7 bits for short sub-IEs and 4 bits for long ones.
    pub id: u8,
    /// Use the long sub-IE format.
    pub long: bool,
    /// Content octets.
    pub content: &'a [u8],
}

/// A payload IE to encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadIeRequest<'a> {
    /// An MLME group IE carrying the given sub-IEs.
    Mlme(&'a [SubIeRequest<'a>]),
    /// Any other group with opaque content.
    Raw {
        /// Group ID.
        group_id: u8,
        /// Content octets.
        content: &'a [u8],
    },
}

/// A decoded header IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderIe<'f> {
    /// Element ID.
    pub id: u8,
    /// Content octets.
    pub content: &'f [u8],
}

impl HeaderIe<'_> {
    /// Return the [`HeaderElementId`].
    pub fn element_id(&self) -> HeaderElementId {
        HeaderElementId::from(self.id)
    }
}

/// A decoded payload IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadIe<'f> {
    /// Group ID.
    pub group_id: u8,
    /// Content octets.
    pub content: &'f [u8],
}

impl<'f> PayloadIe<'f> {
    /// Return the [`PayloadGroupId`].
    pub fn group(&self) -> PayloadGroupId {
        PayloadGroupId::from(self.group_id)
    }

    /// Return an iterator over the sub-IEs, empty unless this is an MLME IE.
    pub fn sub_ies(&self) -> NestedInformationElementsIterator<'f> {
        if self.group() == PayloadGroupId::Mlme {
            NestedInformationElementsIterator::new(self.content)
        } else {
            NestedInformationElementsIterator::new(&[])
        }
    }
}

/// The IEs of a received frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedIes<'f> {
    /// Header IEs, terminators excluded.
    pub header: Vec<HeaderIe<'f>, MAX_PARSED_IES>,
    /// Payload IEs, terminator excluded.
    pub payload: Vec<PayloadIe<'f>, MAX_PARSED_IES>,
    /// Octets taken by the header IEs, including the termination IE.
    pub header_len: usize,
    /// Octets taken by the payload IEs, including the termination IE.
    pub payload_len: usize,
}

impl<'f> ParsedIes<'f> {
    /// Returns `true` when the frame carried no IEs.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.payload.is_empty()
    }

    /// Total octets taken by both IE sections.
    pub fn len(&self) -> usize {
        self.header_len + self.payload_len
    }

    /// Return the first header IE with the given element ID.
    pub fn header_ie(&self, id: u8) -> Option<&HeaderIe<'f>> {
        self.header.iter().find(|ie| ie.id == id)
    }

    /// Return the content of an MLME sub-IE. See [`mlme_sub_ie`].
    pub fn mlme_sub_ie(&self, long: bool, id: u8) -> Option<&'f [u8]> {
        mlme_sub_ie(&self.payload, long, id)
    }
}

/// Prepend the header IEs, followed by a termination IE, in front of the
/// buffer content.
///
/// The terminator is [`HEADER_TERMINATION_1`] when `payload_ies_follow`,
/// [`HEADER_TERMINATION_2`] otherwise. Nothing is written when there are no
/// IEs at all.
///
/// # Errors
///
/// Returns an error if an IE is too long or the headroom is exhausted. The
/// buffer content is then unusable.
pub fn encode_header_ies<const N: usize>(
    buffer: &mut FrameBuffer<N>,
    ies: &[HeaderIeRequest<'_>],
    payload_ies_follow: bool,
) -> Result<()> {
    if ies.is_empty() && !payload_ies_follow {
        return Ok(());
    }

    let terminator = if payload_ies_follow {
        HEADER_TERMINATION_1
    } else {
        HEADER_TERMINATION_2
    };
    prepend_header_ie(buffer, terminator, &[])?;

    for ie in ies.iter().rev() {
        prepend_header_ie(buffer, ie.id, ie.content)?;
    }

    Ok(())
}

fn prepend_header_ie<const N: usize>(
    buffer: &mut FrameBuffer<N>,
    id: u8,
    content: &[u8],
) -> Result<()> {
    if content.len() > HEADER_IE_MAX_LEN {
        return Err(Error);
    }
    buffer.prepend(content)?;
    let mut ie = HeaderInformationElement::new_unchecked(buffer.reserve_front(2)?);
    ie.set_length(content.len() as u16);
    ie.set_element_id(id);
    Ok(())
}

/// Prepend the payload IEs in front of the buffer content.
///
/// A payload termination IE is written only when `payload_follows`.
///
/// # Errors
///
/// Returns an error if an IE is too long or the headroom is exhausted.
pub fn encode_payload_ies<const N: usize>(
    buffer: &mut FrameBuffer<N>,
    ies: &[PayloadIeRequest<'_>],
    payload_follows: bool,
) -> Result<()> {
    if ies.is_empty() {
        return Ok(());
    }

    if payload_follows {
        prepend_payload_ie_header(buffer, PAYLOAD_TERMINATION, 0)?;
    }

    for ie in ies.iter().rev() {
        match ie {
            PayloadIeRequest::Mlme(sub_ies) => {
                let before = buffer.len();
                for sub in sub_ies.iter().rev() {
                    prepend_sub_ie(buffer, sub)?;
                }
                let len = buffer.len() - before;
                prepend_payload_ie_header(buffer, PayloadGroupId::Mlme as u8, len)?;
            }
            PayloadIeRequest::Raw { group_id, content } => {
                buffer.prepend(content)?;
                prepend_payload_ie_header(buffer, *group_id, content.len())?;
            }
        }
    }

    Ok(())
}

fn prepend_payload_ie_header<const N: usize>(
    buffer: &mut FrameBuffer<N>,
    group_id: u8,
    len: usize,
) -> Result<()> {
    if len > PAYLOAD_IE_MAX_LEN {
        return Err(Error);
    }
    let mut ie = PayloadInformationElement::new_unchecked(buffer.reserve_front(2)?);
    ie.set_length(len as u16);
    ie.set_group_id(group_id);
    Ok(())
}

fn prepend_sub_ie<const N: usize>(buffer: &mut FrameBuffer<N>, sub: &SubIeRequest<'_>) -> Result<()> {
    let max = if sub.long {
        PAYLOAD_IE_MAX_LEN
    } else {
        SHORT_SUB_IE_MAX_LEN
    };
    if sub.content.len() > max {
        return Err(Error);
    }
    buffer.prepend(sub.content)?;
    let mut nested = NestedInformationElement::new_unchecked(buffer.reserve_front(2)?);
    nested.set_header(sub.long, sub.id, sub.content.len() as u16);
    Ok(())
}

/// Decode the IE sections at the start of `data`, the octets following the
/// auxiliary security header.
///
/// An immediate header termination IE yields empty lists. A section that runs
/// past the end of `data` is treated as absent.
///
/// # Errors
///
/// Returns an error when a section holds more than [`MAX_PARSED_IES`] IEs.
pub fn decode_ies(data: &[u8]) -> Result<ParsedIes<'_>> {
    let mut parsed = ParsedIes::default();

    let mut headers = HeaderInformationElementsIterator::new(data);
    let mut terminator = None;
    for ie in &mut headers {
        if ie.is_termination() {
            terminator = Some(ie.raw_element_id());
            break;
        }
        parsed
            .header
            .push(HeaderIe {
                id: ie.raw_element_id(),
                content: ie.into_content(),
            })
            .map_err(|_| Error)?;
    }

    if headers.malformed() {
        return Ok(ParsedIes::default());
    }
    parsed.header_len = headers.offset();

    if terminator != Some(HEADER_TERMINATION_1) {
        return Ok(parsed);
    }

    let data = &data[parsed.header_len..];
    let mut payloads = PayloadInformationElementsIterator::new(data);
    for ie in &mut payloads {
        if ie.raw_group_id() == PAYLOAD_TERMINATION {
            break;
        }
        parsed
            .payload
            .push(PayloadIe {
                group_id: ie.raw_group_id(),
                content: ie.into_content(),
            })
            .map_err(|_| Error)?;
    }

    if payloads.malformed() {
        parsed.payload.clear();
    } else {
        parsed.payload_len = payloads.offset();
    }

    Ok(parsed)
}

/// Scan the MLME payload IEs for the sub-IE with the given format and ID.
///
/// Returns the content of the first match; an empty sub-IE yields
/// `Some(&[])`.
pub fn mlme_sub_ie<'f>(ies: &[PayloadIe<'f>], long: bool, id: u8) -> Option<&'f [u8]> {
    ies.iter()
        .filter(|ie| ie.group() == PayloadGroupId::Mlme)
        .flat_map(|ie| ie.sub_ies())
        .find(|sub| sub.is_long() == long && sub.raw_sub_id() == id)
        .map(|sub| sub.into_content())
}
