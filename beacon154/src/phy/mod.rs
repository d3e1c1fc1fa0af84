//! Access to IEEE 802.15.4 radios.
//!
//! This module provides the [radio::Radio] trait the MAC sublayer drives,
//! the PHY constants of the 2.4 GHz O-QPSK PHY and the PHY PIB.

pub mod constants;
pub mod pib;
pub mod radio;
