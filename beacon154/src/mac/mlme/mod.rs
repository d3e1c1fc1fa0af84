//! MAC sublayer management entity primitives.
//!
//! Every file holds the request, confirm and indication types of one
//! primitive, plus the part of [`Mac`](super::Mac) that runs it.

pub mod associate;
pub mod beacon;
pub mod comm_status;
pub mod poll;
pub mod reset;
pub mod scan;
pub mod set;
pub mod start;
pub mod sync;
