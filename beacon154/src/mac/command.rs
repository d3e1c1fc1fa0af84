use super::event::Event;
use super::mcps::data::{DataConfirm, DataIndication, DataRequest};
use super::mcps::purge::{PurgeConfirm, PurgeRequest};
use super::mlme::associate::{
    AssociateConfirm, AssociateIndication, AssociateRequest, AssociateResponse,
};
use super::mlme::beacon::BeaconNotifyIndication;
use super::mlme::comm_status::CommStatusIndication;
use super::mlme::poll::{PollConfirm, PollIndication, PollRequest};
use super::mlme::scan::{ScanConfirm, ScanRequest};
use super::mlme::start::{StartConfirm, StartRequest};
use super::mlme::sync::{SyncLossIndication, SyncRequest};

/// Requests of the upper layer that run through the state machine.
#[derive(Debug)]
pub enum MacRequest {
    McpsData(DataRequest),
    McpsPurge(PurgeRequest),
    MlmeAssociate(AssociateRequest),
    MlmeAssociateResponse(AssociateResponse),
    MlmePoll(PollRequest),
    MlmeScan(ScanRequest),
    MlmeStart(StartRequest),
    MlmeSync(SyncRequest),
}

impl From<MacRequest> for Event {
    fn from(request: MacRequest) -> Self {
        match request {
            MacRequest::McpsData(r) => Event::Data(r),
            MacRequest::McpsPurge(r) => Event::Purge(r),
            MacRequest::MlmeAssociate(r) => Event::Associate(r),
            MacRequest::MlmeAssociateResponse(r) => Event::AssociateResponse(r),
            MacRequest::MlmePoll(r) => Event::Poll(r),
            MacRequest::MlmeScan(r) => Event::Scan(r),
            MacRequest::MlmeStart(r) => Event::Start(r),
            MacRequest::MlmeSync(r) => Event::Sync(r),
        }
    }
}

#[derive(Debug)]
pub enum MacConfirm {
    McpsData(DataConfirm),
    McpsPurge(PurgeConfirm),
    MlmeAssociate(AssociateConfirm),
    MlmePoll(PollConfirm),
    MlmeScan(ScanConfirm),
    MlmeStart(StartConfirm),
}

#[derive(Debug)]
pub enum MacIndication {
    McpsData(DataIndication),
    MlmeBeaconNotify(BeaconNotifyIndication),
    MlmeCommStatus(CommStatusIndication),
    MlmeSyncLoss(SyncLossIndication),
    MlmeAssociate(AssociateIndication),
    MlmePoll(PollIndication),
}
