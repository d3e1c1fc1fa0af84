use rand_core::RngCore;

use crate::hopping::FrequencyHopping;
use crate::mac::command::{MacConfirm, MacRequest};
use crate::mac::event::Event;
use crate::mac::security::Security;
use crate::mac::{Mac, Result};
use crate::phy::radio::Radio;
use crate::upper::UpperLayer;

/// Start a PAN, or change the superframe configuration of a running one.
#[derive(Debug, Clone, Copy)]
pub struct StartRequest {
    pub pan_id: u16,
    pub channel: u8,
    pub page: u8,
    /// Offset of our beacon from the beacon we track, in symbols. Ignored
    /// by the PAN coordinator.
    pub start_time: u32,
    pub beacon_order: u8,
    pub superframe_order: u8,
    pub pan_coordinator: bool,
    pub battery_life_extension: bool,
    /// Announce the new configuration with a coordinator realignment
    /// command before applying it.
    pub coord_realignment: bool,
    pub realignment_security: Security,
    pub beacon_security: Security,
}

impl From<StartRequest> for MacRequest {
    fn from(request: StartRequest) -> Self {
        MacRequest::MlmeStart(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartConfirm {
    pub status: Result<()>,
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Used by PAN coordinator to initiate a new PAN or to begin using a new
    /// configuration. Also used by a device already associated with an
    /// existing PAN to begin using a new configuration.
    pub(crate) fn mlme_start_request(&mut self, request: StartRequest) {
        match self.coord_start(request) {
            Ok(true) => self.raise(Event::StartComplete(Ok(()))),
            // applied once the realignment went out
            Ok(false) => {}
            Err(error) => self.raise(Event::StartComplete(Err(error))),
        }
    }

    pub(crate) fn start_complete(&mut self, status: Result<()>) {
        self.upper
            .mac_confirm(MacConfirm::MlmeStart(StartConfirm { status }));
    }
}
