use rand_core::RngCore;

use crate::frame::{Address, AddressingRepr, CommandRepr, FrameType};
use crate::hopping::FrequencyHopping;
use crate::mac::command::{MacConfirm, MacIndication};
use crate::mac::event::{Event, RxFrame};
use crate::mac::queue::{PollKind, TxKind};
use crate::mac::security::Security;
use crate::mac::utils::{build_command, build_frame};
use crate::mac::{Error, Mac, Result};
use crate::phy::radio::{Radio, RxReason};
use crate::timer::TimerId;
use crate::upper::UpperLayer;

#[derive(Debug, Clone, Copy)]
pub struct PollRequest {
    pub coord_address: Address,
    pub coord_pan_id: u16,
    pub security: Security,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfirm {
    pub status: Result<()>,
}

/// A device polled us for pending data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollIndication {
    pub src_address: Address,
    pub pan_id: u16,
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Requests data from the coordinator.
    pub(crate) fn mlme_poll_request(&mut self, request: PollRequest) {
        let result = self.check_security(&request.security).and_then(|()| {
            if !request.coord_address.is_unicast() {
                return Err(Error::InvalidParameter);
            }
            self.send_data_request(
                PollKind::Explicit,
                request.coord_address,
                request.coord_pan_id,
                &request.security,
            )
        });
        if let Err(error) = result {
            self.raise(Event::PollComplete(Err(error)));
        }
    }

    pub(crate) fn poll_complete(&mut self, status: Result<()>) {
        self.upper
            .mac_confirm(MacConfirm::MlmePoll(PollConfirm { status }));
    }

    /// Queue a data request command for `coord_address`.
    pub(crate) fn send_data_request(
        &mut self,
        kind: PollKind,
        coord_address: Address,
        coord_pan_id: u16,
        security: &Security,
    ) -> Result<()> {
        let addressing = AddressingRepr {
            dst_pan_id: coord_pan_id,
            dst_address: coord_address,
            src_pan_id: self.pib.pan_id,
            src_address: self.own_address(),
        };
        let header = self.header(FrameType::MacCommand, addressing, true, security);
        let frame = build_command(&header, &CommandRepr::DataRequest)?;
        self.enqueue(frame, TxKind::DataRequest(kind), coord_address, false)
    }

    /// The data request went out. With the frame pending bit set in the
    /// acknowledgment we listen for the frame, otherwise nothing is there.
    pub(crate) fn data_request_sent(&mut self, kind: PollKind, status: Result<()>, pending: bool) {
        match status {
            Err(error) => self.finish_poll(kind, Err(error)),
            Ok(()) if pending => {
                self.poll = Some(kind);
                self.rx_set(RxReason::POLL, true);
                let now = self.radio.now();
                self.timers
                    .arm(TimerId::FrameResponse, now, self.pib.max_frame_total_wait_time);
            }
            Ok(()) => self.finish_poll(kind, Err(Error::NoData)),
        }
    }

    /// Nothing arrived in time after the frame pending acknowledgment.
    pub(crate) fn frame_response_timeout(&mut self) {
        if let Some(kind) = self.end_poll() {
            debug!("{:?} poll timed out", kind);
            self.finish_poll(kind, Err(Error::NoData));
        }
    }

    /// A unicast data frame arrived. Returns `true` when it ended a poll.
    pub(crate) fn data_frame_polled(&mut self, empty: bool) -> bool {
        let Some(kind) = self.poll else {
            return false;
        };
        // still waiting for the association response
        if kind == PollKind::Association && !empty {
            return false;
        }
        self.end_poll();
        self.finish_poll(kind, if empty { Err(Error::NoData) } else { Ok(()) });
        true
    }

    pub(crate) fn end_poll(&mut self) -> Option<PollKind> {
        self.timers.cancel(TimerId::FrameResponse);
        self.rx_set(RxReason::POLL, false);
        self.poll.take()
    }

    fn finish_poll(&mut self, kind: PollKind, status: Result<()>) {
        match kind {
            PollKind::Explicit => self.raise(Event::PollComplete(status)),
            PollKind::Association => {
                if let Err(error) = status {
                    self.raise(Event::AssociateFailed(error));
                }
            }
            PollKind::Auto => trace!("auto poll done: {:?}", status),
        }
    }

    /// Our address was pending in the beacon of the tracked coordinator.
    pub(crate) fn auto_poll(&mut self) {
        let queued = self
            .queue
            .iter()
            .chain(self.queue.in_flight())
            .any(|e| matches!(e.kind, TxKind::DataRequest(_)));
        if self.poll.is_some() || queued {
            trace!("poll already running");
            return;
        }

        let coord = self.coord_address();
        let pan_id = self.pib.pan_id;
        if let Err(error) = self.send_data_request(PollKind::Auto, coord, pan_id, &Security::NONE) {
            warn!("auto poll failed: {:?}", error);
        }
    }

    /// A device asks for its pending data. Without any, an empty data frame
    /// tells it so.
    pub(crate) fn data_request_received(&mut self, frame: RxFrame) {
        let Some((src_address, pan_id)) = frame.frame().addressing().map(|af| {
            (
                af.src_address(),
                af.effective_src_pan_id().unwrap_or(self.pib.pan_id),
            )
        }) else {
            return;
        };
        if src_address.is_empty() {
            return;
        }

        if !self
            .queue
            .send_indirect(&src_address, self.coord.is_beaconing())
        {
            trace!("nothing pending for {:?}", src_address);
            if let Err(error) = self.send_empty_data(src_address, pan_id) {
                warn!("cannot answer data request: {:?}", error);
            }
        }

        self.upper
            .mac_indication(MacIndication::MlmePoll(PollIndication {
                src_address,
                pan_id,
            }));
    }

    fn send_empty_data(&mut self, destination: Address, pan_id: u16) -> Result<()> {
        let addressing = AddressingRepr {
            dst_pan_id: pan_id,
            dst_address: destination,
            src_pan_id: self.pib.pan_id,
            src_address: self.own_address(),
        };
        let header = self.header(FrameType::Data, addressing, false, &Security::NONE);
        let frame = build_frame(&header, &[])?;
        self.enqueue(frame, TxKind::EmptyData, destination, false)
    }
}
