//! Events run through the MAC state machine.

use crate::frame::{Address, CommandRepr, Frame, FrameBuffer, MacCommand};
use crate::time::SymbolTime;
use crate::timer::TimerId;

use super::mcps::data::DataRequest;
use super::mcps::purge::PurgeRequest;
use super::mlme::associate::{AssociateRequest, AssociateResponse};
use super::mlme::poll::PollRequest;
use super::mlme::scan::ScanRequest;
use super::mlme::start::StartRequest;
use super::mlme::sync::SyncRequest;
use super::queue::TxKind;
use super::security::Security;
use super::{Error, Result};

/// A received frame that passed filtering and the security checks. The MIC
/// is already stripped.
#[derive(Debug, Clone)]
pub struct RxFrame {
    pub buffer: FrameBuffer,
    pub timestamp: SymbolTime,
    pub lqi: u8,
    pub security: Option<Security>,
}

impl RxFrame {
    pub fn frame(&self) -> Frame<&[u8]> {
        Frame::new_unchecked(self.buffer.as_slice())
    }

    pub fn src_address(&self) -> Address {
        self.frame()
            .addressing()
            .map_or(Address::Absent, |af| af.src_address())
    }

    /// The MAC command carried by the frame.
    pub fn command(&self) -> Option<CommandRepr> {
        let frame = self.frame();
        CommandRepr::parse(&MacCommand::new(frame.payload()).ok()?)
    }
}

#[derive(Debug)]
pub enum Event {
    Data(DataRequest),
    Purge(PurgeRequest),
    Associate(AssociateRequest),
    AssociateResponse(AssociateResponse),
    Poll(PollRequest),
    Scan(ScanRequest),
    Start(StartRequest),
    Sync(SyncRequest),

    RxAssociateRequest(RxFrame),
    RxAssociateResponse(RxFrame),
    RxDataRequest(RxFrame),
    RxBeaconRequest(RxFrame),
    RxRealign(RxFrame),
    RxBeacon(RxFrame),
    RxData(RxFrame),

    TxComplete {
        kind: TxKind,
        status: Result<()>,
        /// Frame pending bit of the acknowledgment.
        pending: bool,
    },
    Timer(TimerId),

    ScanComplete,
    StartComplete(Result<()>),
    AssociateFailed(Error),
    PollComplete(Result<()>),
    AutoPoll,
}

/// Discriminant of an [`Event`], the key of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventKind {
    Data,
    Purge,
    Associate,
    AssociateResponse,
    Poll,
    Scan,
    Start,
    Sync,
    RxAssociateRequest,
    RxAssociateResponse,
    RxDataRequest,
    RxBeaconRequest,
    RxRealign,
    RxBeacon,
    RxData,
    TxComplete,
    Timer,
    ScanComplete,
    StartComplete,
    AssociateFailed,
    PollComplete,
    AutoPoll,
}

impl EventKind {
    /// Raised by a request of the upper layer.
    pub fn is_api(&self) -> bool {
        matches!(
            self,
            Self::Data
                | Self::Purge
                | Self::Associate
                | Self::AssociateResponse
                | Self::Poll
                | Self::Scan
                | Self::Start
                | Self::Sync
        )
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Data(_) => EventKind::Data,
            Self::Purge(_) => EventKind::Purge,
            Self::Associate(_) => EventKind::Associate,
            Self::AssociateResponse(_) => EventKind::AssociateResponse,
            Self::Poll(_) => EventKind::Poll,
            Self::Scan(_) => EventKind::Scan,
            Self::Start(_) => EventKind::Start,
            Self::Sync(_) => EventKind::Sync,
            Self::RxAssociateRequest(_) => EventKind::RxAssociateRequest,
            Self::RxAssociateResponse(_) => EventKind::RxAssociateResponse,
            Self::RxDataRequest(_) => EventKind::RxDataRequest,
            Self::RxBeaconRequest(_) => EventKind::RxBeaconRequest,
            Self::RxRealign(_) => EventKind::RxRealign,
            Self::RxBeacon(_) => EventKind::RxBeacon,
            Self::RxData(_) => EventKind::RxData,
            Self::TxComplete { .. } => EventKind::TxComplete,
            Self::Timer(_) => EventKind::Timer,
            Self::ScanComplete => EventKind::ScanComplete,
            Self::StartComplete(_) => EventKind::StartComplete,
            Self::AssociateFailed(_) => EventKind::AssociateFailed,
            Self::PollComplete(_) => EventKind::PollComplete,
            Self::AutoPoll => EventKind::AutoPoll,
        }
    }
}
