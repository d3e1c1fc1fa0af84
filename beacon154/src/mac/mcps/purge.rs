use rand_core::RngCore;

use crate::hopping::FrequencyHopping;
use crate::mac::command::{MacConfirm, MacRequest};
use crate::mac::{Error, Mac, Result};
use crate::phy::radio::Radio;
use crate::upper::UpperLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeRequest {
    /// Handle of the indirect data request to drop.
    pub handle: u8,
}

impl From<PurgeRequest> for MacRequest {
    fn from(request: PurgeRequest) -> Self {
        MacRequest::McpsPurge(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeConfirm {
    pub handle: u8,
    pub status: Result<()>,
}

impl<R, U, Rng, H> Mac<'_, R, U, Rng, H>
where
    R: Radio,
    U: UpperLayer,
    Rng: RngCore,
    H: FrequencyHopping,
{
    /// Allows a higher layer to purge an MSDU from the transaction
    /// queue. Only indirect frames still waiting for a data request can be
    /// purged. The purged frame is confirmed as expired first.
    pub(crate) fn mcps_purge_request(&mut self, request: PurgeRequest) {
        let status = match self.queue.purge(request.handle) {
            Some(entry) => {
                debug!("purged {:?} for {:?}", entry.kind, entry.destination);
                self.tx_complete(entry.kind, Err(Error::TransactionExpired), false);
                Ok(())
            }
            None => Err(Error::InvalidHandle),
        };
        self.upper.mac_confirm(MacConfirm::McpsPurge(PurgeConfirm {
            handle: request.handle,
            status,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Address, AddressingMode};
    use crate::mac::mcps::data::{DataConfirm, DataRequest};
    use crate::mac::security::Security;
    use crate::mac::tests::*;
    use crate::sync::event_queue::EventQueue;

    #[test]
    fn purge_indirect() {
        let events = EventQueue::new();
        let mut mac = mac(&events, COORD_EXT);
        mac.pib.pan_id = PAN_ID;
        mac.pib.short_address = 0x0000;

        mac.request(MacRequest::McpsData(DataRequest {
            src_addr_mode: AddressingMode::Short,
            dst_pan_id: PAN_ID,
            dst_address: Address::extended(DEVICE_EXT),
            msdu: heapless::Vec::from_slice(&[1, 2]).unwrap(),
            handle: 5,
            ack_request: true,
            indirect: true,
            security: Security::NONE,
        }));
        assert_eq!(mac.queue.counts(), (0, 1));

        mac.request(PurgeRequest { handle: 5 }.into());
        mac.request(PurgeRequest { handle: 5 }.into());
        assert_eq!(mac.queue.counts(), (0, 0));

        let confirms = &mac.upper().confirms;
        assert_eq!(confirms.len(), 3);
        assert!(matches!(
            confirms[0],
            MacConfirm::McpsData(DataConfirm {
                handle: 5,
                status: Err(Error::TransactionExpired),
                ..
            })
        ));
        let statuses: std::vec::Vec<_> = confirms[1..]
            .iter()
            .filter_map(|c| match c {
                MacConfirm::McpsPurge(c) => Some((c.handle, c.status)),
                _ => None,
            })
            .collect();
        assert_eq!(statuses, [(5, Ok(())), (5, Err(Error::InvalidHandle))]);
    }
}
