//! Timer queues on the symbol clock.
//!
//! Armed timers live in one of two ordered queues. The unaligned queue holds
//! absolute expiry times. The aligned queue holds offsets from the start of
//! the current period (a beacon interval) and is rebased every time a period
//! boundary passes, so beacon related timers follow the beacon timing even
//! when the period start is realigned to a received beacon.
//!
//! The queue does not run anything itself: the owner asks for the next
//! expiry to arm the hardware compare, and drains due timers with
//! [`TimerQueue::expire`] when the compare fires.

use heapless::Vec;

use crate::mac::superframe::beacon_interval;
use crate::time::SymbolTime;

/// Identifies the owner and purpose of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerId {
    /// Build the next beacon.
    BeaconPrepare,
    /// Hand the prebuilt beacon to the radio.
    BeaconTransmit,
    /// Battery life extension period elapsed.
    BeaconBattLife,
    /// End of the outgoing contention access period.
    BeaconPeriod,
    /// No beacon inside the reception window.
    BeaconSync,
    /// Open the reception window for the next tracked beacon.
    BeaconTrack,
    /// End of the incoming contention access period.
    BeaconIncomingPeriod,
    /// `macResponseWaitTime` elapsed after an association request.
    ResponseWait,
    /// No frame after an acknowledgment with the frame pending bit.
    FrameResponse,
    /// Dwell time on the current scan channel elapsed.
    ScanDwell,
    /// Indirect transaction persistence tick in a nonbeacon-enabled PAN.
    IndirectExpiry,
}

impl TimerId {
    /// Number of timers, every one of them can be armed at the same time.
    pub const COUNT: usize = 11;
}

/// Two ordered timer queues sharing one period.
#[derive(Debug)]
pub struct TimerQueue {
    unaligned: Vec<(TimerId, SymbolTime), { TimerId::COUNT }>,
    aligned: Vec<(TimerId, u32), { TimerId::COUNT }>,
    period_start: SymbolTime,
    rollover: u32,
    pending_rollover: Option<u32>,
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            unaligned: Vec::new(),
            aligned: Vec::new(),
            period_start: SymbolTime::ZERO,
            rollover: beacon_interval(14),
            pending_rollover: None,
        }
    }

    /// Arm `id` to expire `delay` symbols after `now`.
    pub fn arm(&mut self, id: TimerId, now: SymbolTime, delay: u32) {
        self.cancel(id);
        let at = now + delay;
        // stable: after every timer expiring at the same time
        let pos = self
            .unaligned
            .iter()
            .position(|(_, t)| at.is_before(*t))
            .unwrap_or(self.unaligned.len());
        if self.unaligned.insert(pos, (id, at)).is_err() {
            error!("timer queue full");
        }
    }

    /// Arm `id` at `offset` symbols from the start of a period. An offset
    /// that already passed in the current period lands in the next one.
    pub fn arm_aligned(&mut self, id: TimerId, now: SymbolTime, offset: u32) {
        self.cancel(id);
        let elapsed = now.since(self.period_start).max(0) as u32;
        let mut offset = offset;
        if offset <= elapsed {
            offset += ((elapsed - offset) / self.rollover + 1) * self.rollover;
        }
        let pos = self
            .aligned
            .iter()
            .position(|(_, o)| offset < *o)
            .unwrap_or(self.aligned.len());
        if self.aligned.insert(pos, (id, offset)).is_err() {
            error!("timer queue full");
        }
    }

    /// Remove `id` from whichever queue holds it. Cancelling a timer that is
    /// not armed does nothing.
    pub fn cancel(&mut self, id: TimerId) {
        self.unaligned.retain(|(t, _)| *t != id);
        self.aligned.retain(|(t, _)| *t != id);
    }

    /// Cancel every timer.
    pub fn clear(&mut self) {
        self.unaligned.clear();
        self.aligned.clear();
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.unaligned.iter().any(|(t, _)| *t == id) || self.aligned.iter().any(|(t, _)| *t == id)
    }

    /// Change the period length at the next boundary.
    pub fn set_rollover(&mut self, rollover: u32) {
        self.pending_rollover = Some(rollover.max(1));
    }

    /// Change the period length immediately.
    pub fn sync_rollover(&mut self, rollover: u32) {
        self.rollover = rollover.max(1);
        self.pending_rollover = None;
    }

    pub fn rollover(&self) -> u32 {
        self.rollover
    }

    pub fn period_start(&self) -> SymbolTime {
        self.period_start
    }

    /// Move the start of the current period to `start`, typically the
    /// timestamp of a received beacon. Whole periods between the old and
    /// the new start are taken out of the aligned offsets so that armed
    /// aligned timers only follow the drift.
    pub fn realign(&mut self, start: SymbolTime) {
        let delta = start.since(self.period_start);
        if delta > 0 {
            let periods = (delta as u32 + self.rollover / 2) / self.rollover;
            let shift = periods.saturating_mul(self.rollover);
            for (_, offset) in self.aligned.iter_mut() {
                *offset = offset.saturating_sub(shift);
            }
        }
        self.period_start = start;
    }

    fn aligned_expiry(&self) -> Option<SymbolTime> {
        self.aligned
            .first()
            .map(|(_, offset)| self.period_start + *offset)
    }

    /// The earliest expiry of both queues, to arm the hardware compare.
    pub fn next_expiry(&self) -> Option<SymbolTime> {
        match (self.unaligned.first().map(|(_, t)| *t), self.aligned_expiry()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn pop_earliest(&mut self) -> Option<TimerId> {
        let unaligned = self.unaligned.first().map(|(_, t)| *t);
        match (unaligned, self.aligned_expiry()) {
            (Some(a), Some(b)) if b.is_before(a) => Some(self.aligned.remove(0).0),
            (Some(_), _) => Some(self.unaligned.remove(0).0),
            (None, Some(_)) => Some(self.aligned.remove(0).0),
            (None, None) => None,
        }
    }

    fn next_period(&mut self) {
        self.period_start += self.rollover;
        for (_, offset) in self.aligned.iter_mut() {
            *offset = offset.saturating_sub(self.rollover);
        }
        if let Some(rollover) = self.pending_rollover.take() {
            self.rollover = rollover;
        }
    }

    /// Remove and return the next timer due at `now`, in expiry order. Period
    /// boundaries crossed on the way are processed in between, so timers
    /// from both queues fire in the order of their absolute expiry.
    pub fn expire(&mut self, now: SymbolTime) -> Option<TimerId> {
        loop {
            let boundary = self.period_start + self.rollover;
            if let Some(at) = self.next_expiry() {
                if !now.is_before(at) && !boundary.is_before(at) {
                    return self.pop_earliest();
                }
            }
            if now.is_before(boundary) {
                return None;
            }
            self.next_period();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [TimerId; TimerId::COUNT] = [
        TimerId::BeaconPrepare,
        TimerId::BeaconTransmit,
        TimerId::BeaconBattLife,
        TimerId::BeaconPeriod,
        TimerId::BeaconSync,
        TimerId::BeaconTrack,
        TimerId::BeaconIncomingPeriod,
        TimerId::ResponseWait,
        TimerId::FrameResponse,
        TimerId::ScanDwell,
        TimerId::IndirectExpiry,
    ];

    fn t(symbols: u32) -> SymbolTime {
        SymbolTime::from_symbols(symbols)
    }

    fn drain(queue: &mut TimerQueue, now: SymbolTime) -> std::vec::Vec<TimerId> {
        core::iter::from_fn(|| queue.expire(now)).collect()
    }

    #[test]
    fn unaligned_order() {
        let mut queue = TimerQueue::new();
        queue.arm(TimerId::ScanDwell, t(0), 300);
        queue.arm(TimerId::ResponseWait, t(0), 100);
        queue.arm(TimerId::FrameResponse, t(0), 100);

        assert_eq!(queue.next_expiry(), Some(t(100)));
        assert_eq!(queue.expire(t(99)), None);
        assert_eq!(
            drain(&mut queue, t(100)),
            [TimerId::ResponseWait, TimerId::FrameResponse]
        );
        assert_eq!(drain(&mut queue, t(1000)), [TimerId::ScanDwell]);
        assert_eq!(queue.next_expiry(), None);
    }

    #[test]
    fn rearm_replaces() {
        let mut queue = TimerQueue::new();
        queue.arm(TimerId::ScanDwell, t(0), 100);
        queue.arm(TimerId::ScanDwell, t(0), 200);
        assert_eq!(queue.next_expiry(), Some(t(200)));

        queue.arm_aligned(TimerId::ScanDwell, t(0), 50);
        assert_eq!(queue.next_expiry(), Some(t(50)));
        assert_eq!(drain(&mut queue, t(1000)), [TimerId::ScanDwell]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut queue = TimerQueue::new();
        queue.arm(TimerId::BeaconSync, t(0), 10);
        queue.arm(TimerId::BeaconTrack, t(0), 20);
        queue.cancel(TimerId::BeaconSync);
        queue.cancel(TimerId::BeaconSync);
        assert!(!queue.is_armed(TimerId::BeaconSync));

        assert_eq!(drain(&mut queue, t(100)), [TimerId::BeaconTrack]);
        // already fired
        queue.cancel(TimerId::BeaconTrack);
        assert_eq!(drain(&mut queue, t(200)), []);
    }

    #[test]
    fn aligned_rolls_over() {
        let mut queue = TimerQueue::new();
        queue.sync_rollover(1000);

        // offset in the past lands in the next period
        queue.arm_aligned(TimerId::BeaconPrepare, t(500), 400);
        queue.arm_aligned(TimerId::BeaconPeriod, t(500), 600);
        assert_eq!(queue.next_expiry(), Some(t(600)));

        assert_eq!(drain(&mut queue, t(600)), [TimerId::BeaconPeriod]);
        assert_eq!(drain(&mut queue, t(1399)), []);
        assert_eq!(queue.period_start(), t(1000));
        assert_eq!(drain(&mut queue, t(1400)), [TimerId::BeaconPrepare]);
    }

    #[test]
    fn merged_expiry_order() {
        let mut queue = TimerQueue::new();
        queue.sync_rollover(1000);
        queue.arm(TimerId::ScanDwell, t(0), 1500);
        queue.arm_aligned(TimerId::BeaconTransmit, t(0), 1200);
        queue.arm_aligned(TimerId::BeaconPeriod, t(0), 300);

        assert_eq!(
            drain(&mut queue, t(5000)),
            [
                TimerId::BeaconPeriod,
                TimerId::BeaconTransmit,
                TimerId::ScanDwell
            ]
        );
    }

    #[test]
    fn pending_rollover_at_boundary() {
        let mut queue = TimerQueue::new();
        queue.sync_rollover(1000);
        queue.set_rollover(2000);
        assert_eq!(queue.rollover(), 1000);

        assert_eq!(queue.expire(t(1000)), None);
        assert_eq!(queue.period_start(), t(1000));
        assert_eq!(queue.rollover(), 2000);
        assert_eq!(queue.expire(t(2999)), None);
        assert_eq!(queue.period_start(), t(1000));
    }

    #[test]
    fn realign_follows_drift() {
        let mut queue = TimerQueue::new();
        queue.sync_rollover(1000);
        // armed late in the period, so for the next beacon
        queue.arm_aligned(TimerId::BeaconSync, t(900), 100);
        assert_eq!(queue.next_expiry(), Some(t(1100)));

        // the next beacon arrives 4 symbols late
        queue.realign(t(1004));
        assert_eq!(queue.period_start(), t(1004));
        assert_eq!(queue.next_expiry(), Some(t(1104)));
    }

    #[test]
    fn clock_wrap() {
        let mut queue = TimerQueue::new();
        let now = t(u32::MAX - 50);
        queue.arm(TimerId::FrameResponse, now, 100);
        queue.arm(TimerId::ResponseWait, now, 10);
        assert_eq!(drain(&mut queue, t(49)), [TimerId::ResponseWait, TimerId::FrameResponse]);
    }

    proptest! {
        #[test]
        fn fires_in_expiry_order(
            delays in proptest::collection::vec((0u32..5000, any::<bool>()), 1..TimerId::COUNT),
            now in 0u32..3000,
        ) {
            let mut queue = TimerQueue::new();
            queue.sync_rollover(1000);
            let elapsed = now;
            let now = t(now);
            let mut expiry = std::vec::Vec::new();
            for (i, (delay, aligned)) in delays.iter().enumerate() {
                if *aligned {
                    queue.arm_aligned(ALL[i], now, *delay);
                    let offset = if *delay > elapsed {
                        *delay
                    } else {
                        *delay + ((elapsed - *delay) / 1000 + 1) * 1000
                    };
                    expiry.push((ALL[i], offset));
                } else {
                    queue.arm(ALL[i], now, *delay);
                    expiry.push((ALL[i], elapsed + *delay));
                }
            }

            let mut fired = std::vec::Vec::new();
            for step in 1..=20u32 {
                while let Some(id) = queue.expire(now + step * 500) {
                    let at = expiry.iter().find(|(e, _)| *e == id).map(|(_, at)| *at);
                    prop_assert!(at.is_some());
                    fired.push(at.unwrap_or_default());
                }
            }
            prop_assert_eq!(fired.len(), expiry.len());
            prop_assert!(fired.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
