#![allow(dead_code)]

// Constants from section 11.3, Table 11-1, PHY constants
/// The maximum PSDU size (in octets) the PHY shall be able to receive.
pub const MAX_PHY_PACKET_SIZE: usize = 127;
/// RX-to-TX or TX-to-RX turnaround time (in symbol periods), as defined in
/// 10.2.2 and 10.2.3.
pub const TURNAROUND_TIME: u32 = 12;
/// The time required to perform CCA detection in symbol periods.
pub const CCA_TIME: u32 = 8;
/// The symbol rate of IEEE 802.15.4 on 2.4 Ghz (symbols/s)
pub const SYMBOL_RATE: u32 = 62_500;
/// The symbol rate of IEEE 802.15.4 on 2.4 Ghz (µs/symbol)
pub const SYMBOL_RATE_INV_US: u32 = 1_000_000 / SYMBOL_RATE;
/// Duration of the synchronization header (preamble and SFD) in symbols.
pub const SHR_DURATION: u32 = 10;
/// Number of symbols per octet.
pub const SYMBOLS_PER_OCTET: u32 = 2;
/// Lowest channel of channel page 0 in the 2.4 GHz band.
pub const MIN_CHANNEL: u8 = 11;
/// Highest channel of channel page 0 in the 2.4 GHz band.
pub const MAX_CHANNEL: u8 = 26;
/// The only supported channel page.
pub const CHANNEL_PAGE: u8 = 0;

/// Returns `true` when `channel` on `page` is supported.
pub fn is_valid_channel(page: u8, channel: u8) -> bool {
    page == CHANNEL_PAGE && (MIN_CHANNEL..=MAX_CHANNEL).contains(&channel)
}

/// Time on air in symbols of a PSDU of `len` octets: synchronization header,
/// PHY header and PSDU.
pub const fn airtime(len: usize) -> u32 {
    SHR_DURATION + (1 + len as u32) * SYMBOLS_PER_OCTET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inv_symbol_rate() {
        assert_eq!(SYMBOL_RATE_INV_US, 16);
    }

    #[test]
    fn channels() {
        assert!(is_valid_channel(0, 11));
        assert!(is_valid_channel(0, 26));
        assert!(!is_valid_channel(0, 10));
        assert!(!is_valid_channel(2, 11));
    }

    #[test]
    fn time_on_air() {
        // 127 octets take 4256 µs
        assert_eq!(airtime(MAX_PHY_PACKET_SIZE) * SYMBOL_RATE_INV_US, 4256);
    }
}
