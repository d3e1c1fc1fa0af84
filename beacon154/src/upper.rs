use crate::mac::command::{MacConfirm, MacIndication};
use crate::mac;

/// This trait provides interactions with the upper layer. Confirms and
/// indications are handed over from the context running the MAC, so an
/// implementation should only store them or forward them to a channel.
pub trait UpperLayer {
    /// Result of a request.
    fn mac_confirm(&mut self, confirm: MacConfirm);
    /// Something happened that the upper layer did not ask for.
    fn mac_indication(&mut self, indication: MacIndication);
    /// Notifies upper layer of an error that has no confirm to report it.
    fn fault(&mut self, error: mac::Error) {
        let _ = error;
    }
}

#[cfg(test)]
pub mod tests {
    use std::vec::Vec;

    use super::*;

    /// Records everything the MAC hands over.
    #[derive(Debug, Default)]
    pub struct TestUpperLayer {
        pub confirms: Vec<MacConfirm>,
        pub indications: Vec<MacIndication>,
        pub faults: Vec<mac::Error>,
    }

    impl TestUpperLayer {
        pub fn clear(&mut self) {
            self.confirms.clear();
            self.indications.clear();
            self.faults.clear();
        }
    }

    impl UpperLayer for TestUpperLayer {
        fn mac_confirm(&mut self, confirm: MacConfirm) {
            self.confirms.push(confirm);
        }

        fn mac_indication(&mut self, indication: MacIndication) {
            self.indications.push(indication);
        }

        fn fault(&mut self, error: mac::Error) {
            self.faults.push(error);
        }
    }
}
