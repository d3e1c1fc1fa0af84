//! Zero-copy read and write structures for beacon-enabled IEEE 802.15.4 MAC
//! frames.
//!
//! Each reader contains the following functions:
//! - [`new`]: Create a new reader, checking the buffer length.
//! - [`new_unchecked`]: Create a new reader without checking the buffer length.
//!
//! The [`Frame`] reader gives access to every part of a received frame:
//! - [`frame_control`]: returns a [`FrameControl`] reader.
//! - [`sequence_number`]: returns the sequence number if not suppressed.
//! - [`addressing`]: returns an [`AddressingFields`] reader.
//! - [`auxiliary_security_header`]: returns an [`AuxiliarySecurityHeader`]
//!   reader.
//! - [`information_elements`]: returns the decoded [`ParsedIes`].
//! - [`payload`]: returns the MAC payload of the frame.
//!
//! ## Reading a frame
//! ```
//! # use beacon154_frame::{Frame, FrameType, BeaconPayload};
//! let data = [
//!     0x00, 0x80, 0x2a, 0x34, 0x12, 0x00, 0x00, // header
//!     0x66, 0xcf, // superframe specification
//!     0x00, // GTS specification
//!     0x00, // pending address specification
//! ];
//! let frame = Frame::new(&data[..]).unwrap();
//! assert_eq!(frame.frame_control().frame_type(), FrameType::Beacon);
//! assert_eq!(frame.sequence_number(), Some(0x2a));
//!
//! let beacon = BeaconPayload::new(frame.payload()).unwrap();
//! let sf = beacon.superframe_specification();
//! assert_eq!(sf.beacon_order(), 6);
//! assert_eq!(sf.superframe_order(), 6);
//! assert_eq!(sf.final_cap_slot(), 15);
//! ```
//!
//! ## Writing a frame
//!
//! Outgoing frames are built back-to-front into a [`FrameBuffer`]: the
//! payload is appended first, then information elements, the auxiliary
//! security header and the MAC header are prepended in front of it.
//!
//! ## Information Elements
//!
//! Header IEs are encoded with [`encode_header_ies`], payload IEs with
//! [`encode_payload_ies`]. [`decode_ies`] walks both sections of a received
//! frame and returns owned lists that borrow the frame buffer.
//!
//! [`new`]: Frame::new
//! [`new_unchecked`]: Frame::new_unchecked
//! [`frame_control`]: Frame::frame_control
//! [`sequence_number`]: Frame::sequence_number
//! [`addressing`]: Frame::addressing
//! [`auxiliary_security_header`]: Frame::auxiliary_security_header
//! [`information_elements`]: Frame::information_elements
//! [`payload`]: Frame::payload
#![no_std]
#![deny(missing_docs)]
#![deny(unsafe_code)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[cfg(test)]
mod tests;

mod frames;
pub use frames::*;

mod frame_control;
pub use frame_control::*;

mod aux_sec_header;
pub use aux_sec_header::*;

mod addressing;
pub use addressing::*;

mod superframe;
pub use superframe::*;

mod buffer;
pub use buffer::FrameBuffer;

mod ie;
pub use ie::*;

mod repr;
pub use repr::*;

/// An error that can occur when reading or writing an IEEE 802.15.4 frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error;

/// A type alias for `Result<T, frame::Error>`.
pub type Result<T> = core::result::Result<T, Error>;

/// The maximum size of a PHY service data unit, in octets.
pub const MAX_PHY_PACKET_SIZE: usize = 127;
