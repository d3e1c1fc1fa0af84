use crate::frame::Address;
use crate::mac::security::Security;
use crate::mac::Result;

/// Outcome of a transmission the upper layer did not request with a
/// confirm, such as an association response, or of a secured command that
/// failed its security checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommStatusIndication {
    pub pan_id: u16,
    pub src_address: Address,
    pub dst_address: Address,
    pub status: Result<()>,
    pub security: Security,
}
