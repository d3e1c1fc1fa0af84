use super::constants::{CHANNEL_PAGE, MAX_CHANNEL};

/// PAN Information Base (PIB) specified by PHY sublayer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pib {
    /// The RF channel to use for all following
    /// transmissions and receptions
    pub current_channel: u8,
    /// This is the current PHY channel page. This is used in conjunction with
    /// `current_channel` to uniquely identify the channel currently being used.
    pub current_page: u8,
    /// The transmit power of the device in dBm.
    pub tx_power: i8,
}

impl Default for Pib {
    fn default() -> Self {
        Self {
            current_channel: MAX_CHANNEL,
            current_page: CHANNEL_PAGE,
            tx_power: 0,
        }
    }
}
