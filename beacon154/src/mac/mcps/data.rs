use heapless::Vec;
use rand_core::RngCore;

use crate::frame::{Address, AddressingMode, AddressingRepr, Frame, FrameType};
use crate::hopping::FrequencyHopping;
use crate::mac::command::{MacConfirm, MacIndication};
use crate::mac::constants::MAC_MAX_DATA;
use crate::mac::event::RxFrame;
use crate::mac::queue::TxKind;
use crate::mac::security::Security;
use crate::mac::utils::build_frame;
use crate::mac::{Error, Mac, Result};
use crate::phy::radio::Radio;
use crate::time::SymbolTime;
use crate::upper::UpperLayer;

#[derive(Debug, Clone)]
pub struct DataRequest {
    /// Source addressing mode. Short falls back to an error when no short
    /// address is assigned.
    pub src_addr_mode: AddressingMode,
    pub dst_pan_id: u16,
    pub dst_address: Address,
    pub msdu: Vec<u8, MAC_MAX_DATA>,
    /// Handle used in the confirm and by [`PurgeRequest`](super::purge::PurgeRequest).
    pub handle: u8,
    pub ack_request: bool,
    /// Keep the frame until the destination polls for it.
    pub indirect: bool,
    pub security: Security,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataConfirm {
    pub handle: u8,
    pub status: Result<()>,
    /// Time of the successful transmission.
    pub timestamp: Option<SymbolTime>,
}

/// A received data frame.
#[derive(Debug, Clone)]
pub struct DataIndication {
    frame: RxFrame,
}

impl DataIndication {
    pub fn new(frame: RxFrame) -> Self {
        Self { frame }
    }

    /// The whole frame, MIC stripped.
    pub fn frame(&self) -> Frame<&[u8]> {
        self.frame.frame()
    }

    pub fn src_address(&self) -> Address {
        self.frame()
            .addressing()
            .map_or(Address::Absent, |af| af.src_address())
    }

    pub fn src_pan_id(&self) -> Option<u16> {
        self.frame()
            .addressing()
            .and_then(|af| af.effective_src_pan_id())
    }

    pub fn dst_address(&self) -> Address {
        self.frame()
            .addressing()
            .map_or(Address::Absent, |af| af.dst_address())
    }

    pub fn dst_pan_id(&self) -> Option<u16> {
        self.frame().addressing().and_then(|af| af.dst_pan_id())
    }

    pub fn msdu(&self) -> &[u8] {
        let len = self.frame().payload().len();
        let buffer = self.frame.buffer.as_slice();
        &buffer[buffer.len() - len..]
    }

    pub fn dsn(&self) -> Option<u8> {
        self.frame().sequence_number()
    }

    pub fn lqi(&self) -> u8 {
        self.frame.lqi
    }

    pub fn timestamp(&self) -> SymbolTime {
        self.frame.timestamp
    }

    /// Security applied by the originator, `None` for unsecured frames.
    pub fn security(&self) -> Option<Security> {
        self.frame.security
    }
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Requests the transfer of data to another device. The frame is
    /// queued; the confirm follows once it was sent or dropped.
    pub(crate) fn mcps_data_request(&mut self, request: DataRequest) {
        let handle = request.handle;
        if let Err(error) = self.queue_data(request) {
            debug!("data request {} failed: {:?}", handle, error);
            self.upper.mac_confirm(MacConfirm::McpsData(DataConfirm {
                handle,
                status: Err(error),
                timestamp: None,
            }));
        }
    }

    fn queue_data(&mut self, request: DataRequest) -> Result<()> {
        self.check_security(&request.security)?;
        let src_address = self.source_address(request.src_addr_mode)?;
        if src_address.is_empty() && request.dst_address.is_empty() {
            return Err(Error::InvalidAddress);
        }
        if request.indirect && request.dst_address.is_empty() {
            return Err(Error::InvalidParameter);
        }

        let addressing = AddressingRepr {
            dst_pan_id: request.dst_pan_id,
            dst_address: request.dst_address,
            src_pan_id: self.pib.pan_id,
            src_address,
        };
        let header = self.header(
            FrameType::Data,
            addressing,
            request.ack_request,
            &request.security,
        );
        let frame = build_frame(&header, &request.msdu)?;
        self.enqueue(
            frame,
            TxKind::Data {
                handle: request.handle,
            },
            request.dst_address,
            request.indirect,
        )
    }

    /// Completion of a queued data frame, sent or expired.
    pub(crate) fn data_sent(&mut self, handle: u8, status: Result<()>) {
        let timestamp = status.is_ok().then(|| self.radio.now());
        self.upper.mac_confirm(MacConfirm::McpsData(DataConfirm {
            handle,
            status,
            timestamp,
        }));
    }

    /// Indicates the reception of a data frame. A frame answering a poll
    /// ends it; an empty one only tells that nothing was pending.
    pub(crate) fn mcps_data_indication(&mut self, frame: RxFrame) {
        let (empty, broadcast) = {
            let f = frame.frame();
            let broadcast = f
                .addressing()
                .is_some_and(|af| af.dst_address().is_broadcast());
            (f.payload().is_empty(), broadcast)
        };

        if broadcast {
            self.broadcast_received();
        }

        let polled = !broadcast && self.data_frame_polled(empty);
        if empty && polled {
            return;
        }

        self.upper
            .mac_indication(MacIndication::McpsData(DataIndication::new(frame)));
    }
}
