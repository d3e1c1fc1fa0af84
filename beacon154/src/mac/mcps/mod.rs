//! MAC common part sublayer service: data transfer.

pub mod data;
pub mod purge;
