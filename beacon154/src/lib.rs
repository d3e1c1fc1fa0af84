#![no_std]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[macro_use]
pub(crate) mod utils;

pub use beacon154_frame as frame;

pub mod hopping;
pub mod mac;
pub mod phy;
pub mod sync;
pub mod time;
pub mod timer;
pub mod upper;
