use rand_core::RngCore;

use crate::hopping::FrequencyHopping;
use crate::mac::command::{MacIndication, MacRequest};
use crate::mac::constants::{BROADCAST_PAN_ID, NO_SHORT_ADDRESS};
use crate::mac::device::TrackState;
use crate::mac::security::Security;
use crate::mac::{Error, Mac};
use crate::phy::constants::is_valid_channel;
use crate::phy::radio::Radio;
use crate::upper::UpperLayer;

/// Synchronize with the beacons of the coordinator we are associated with.
#[derive(Debug, Clone, Copy)]
pub struct SyncRequest {
    pub channel: u8,
    pub page: u8,
    /// Keep following the beacons after the first one.
    pub track_beacon: bool,
}

impl From<SyncRequest> for MacRequest {
    fn from(request: SyncRequest) -> Self {
        MacRequest::MlmeSync(request)
    }
}

/// The beacons of the coordinator were lost, or the PAN moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncLossIndication {
    pub reason: Error,
    pub pan_id: u16,
    pub channel: u8,
    pub page: u8,
    pub security: Security,
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    pub(crate) fn mlme_sync_request(&mut self, request: SyncRequest) {
        let coord_known = self.pib.coord_short_address != NO_SHORT_ADDRESS
            || self.pib.coord_extended_address != [0; 8];
        if !is_valid_channel(request.page, request.channel)
            || !self.pib.beacon_enabled()
            || self.pib.pan_id == BROADCAST_PAN_ID
            || !coord_known
        {
            let indication = SyncLossIndication {
                reason: Error::InvalidParameter,
                pan_id: self.pib.pan_id,
                channel: request.channel,
                page: request.page,
                security: Security::NONE,
            };
            self.upper
                .mac_indication(MacIndication::MlmeSyncLoss(indication));
            return;
        }

        if self.tracker.state != TrackState::None {
            // a new request replaces the running one
            self.sync_loss(Error::BeaconLoss, false);
        }
        info!(
            "sync on channel {}, BO {}{}",
            request.channel,
            self.pib.beacon_order,
            if request.track_beacon { ", tracking" } else { "" }
        );
        self.tune(request.page, request.channel);
        self.start_sync(request.track_beacon);
    }
}
