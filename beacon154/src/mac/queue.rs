//! Transmit queue for direct and indirect frames.
//!
//! Every entry carries scheduling flags. An entry is eligible for
//! transmission when it is `READY` and its flags contain the current
//! schedule phase: `flags & (READY | phase) == READY | phase`. The inactive
//! phase sets every bit, so no entry matches it.

use bitflags::bitflags;
use heapless::Vec;

use crate::frame::{Address, Frame, FrameBuffer};
use crate::phy::radio::TxStatus;

use super::constants::{MAC_MAX_DIRECT, MAC_MAX_INDIRECT};
use super::Error;

bitflags! {
    /// Scheduling flags of a queue entry, also used as schedule phase.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TxFlags: u8 {
        /// Sent in the CAP of our own superframe, or at any time without
        /// beacons.
        const OUTGOING_CAP = 0x01;
        /// Sent in the CAP of the tracked coordinator's superframe.
        const INCOMING_CAP = 0x02;
        /// May go out now.
        const READY = 0x04;
        /// Waits for a data request from the destination.
        const INDIRECT = 0x08;
        /// Listed in the pending address field of our beacon.
        const MARKED = 0x10;
        /// Sent while scanning.
        const SCAN_RELATED = 0x20;
        /// Broadcast announced with the frame pending bit of our beacon.
        const BROADCAST = 0x40;
        /// Requested in the inactive period, ready again in the next CAP.
        const REQUESTED = 0x80;
    }
}

impl TxFlags {
    /// Phase in which nothing is sent.
    pub const INACTIVE: Self = Self::all();
}

bitflags! {
    /// How an entry is transmitted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TxOptions: u8 {
        const ACK_REQUEST = 0x01;
        const INDIRECT = 0x02;
        /// Slotted CSMA-CA.
        const SLOTTED = 0x04;
        /// The security transform was already applied.
        const SECURED = 0x08;
    }
}

/// Who asked for a data request command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollKind {
    /// Poll request from the upper layer.
    Explicit,
    /// Our address was pending in a beacon.
    Auto,
    /// Fetching an association response.
    Association,
}

/// What a queued frame is, used to route its completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxKind {
    Data { handle: u8 },
    AssociationRequest,
    AssociationResponse { device: Address },
    DataRequest(PollKind),
    BeaconRequest,
    Realignment,
    /// Answer to a data request without pending data.
    EmptyData,
    /// Answer to a beacon request without periodic beacons.
    BeaconReply,
    Beacon,
}

impl TxKind {
    fn is_command(&self) -> bool {
        !matches!(
            self,
            Self::Data { .. } | Self::EmptyData | Self::BeaconReply | Self::Beacon
        )
    }
}

#[derive(Debug, Clone)]
pub struct TxEntry {
    pub frame: FrameBuffer,
    pub flags: TxFlags,
    pub options: TxOptions,
    pub kind: TxKind,
    pub retries: u8,
    /// Beacon intervals left before an indirect entry expires.
    pub persistence: u16,
    pub destination: Address,
}

impl TxEntry {
    pub fn new(frame: FrameBuffer, kind: TxKind, destination: Address) -> Self {
        Self {
            frame,
            flags: TxFlags::empty(),
            options: TxOptions::empty(),
            kind,
            retries: 0,
            persistence: 0,
            destination,
        }
    }

    pub fn is_indirect(&self) -> bool {
        self.flags.contains(TxFlags::INDIRECT)
    }

    fn is_eligible(&self, phase: TxFlags) -> bool {
        let mask = TxFlags::READY | phase;
        self.flags & mask == mask
    }

    fn is_for(&self, destination: &Address) -> bool {
        self.is_indirect() && !self.flags.contains(TxFlags::BROADCAST) && self.destination == *destination
    }
}

/// Outcome of a transmission for the entry in flight.
#[derive(Debug)]
pub enum Completion {
    /// Sent. `pending` is the frame pending bit of the acknowledgment.
    Done { entry: TxEntry, pending: bool },
    /// Put back in the queue for another attempt.
    Retry,
    Failed { entry: TxEntry, error: Error },
}

const CAPACITY: usize = MAC_MAX_DIRECT + MAC_MAX_INDIRECT;

/// Queued entries in transmission order plus the entry in flight.
///
/// Both classes are bounded. The entry in flight still counts against its
/// class, so it can always be put back.
#[derive(Debug, Default)]
pub struct TxQueue {
    entries: Vec<TxEntry, CAPACITY>,
    direct: usize,
    indirect: usize,
    in_flight: Option<TxEntry>,
}

impl TxQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<&TxEntry> {
        self.in_flight.as_ref()
    }

    pub fn in_flight_mut(&mut self) -> Option<&mut TxEntry> {
        self.in_flight.as_mut()
    }

    /// Number of (direct, indirect) entries, in flight included.
    pub fn counts(&self) -> (usize, usize) {
        (self.direct, self.indirect)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TxEntry> {
        self.entries.iter()
    }

    /// Queue `entry`. Commands go in front of every data frame, otherwise
    /// the order of arrival is kept.
    ///
    /// Returns the entry back when its class is full. Queued entries are not
    /// touched then.
    pub fn enqueue(&mut self, entry: TxEntry) -> core::result::Result<(), TxEntry> {
        let indirect = entry.is_indirect();
        if indirect && self.indirect >= MAC_MAX_INDIRECT || !indirect && self.direct >= MAC_MAX_DIRECT {
            return Err(entry);
        }

        let pos = if entry.kind.is_command() {
            self.entries
                .iter()
                .position(|e| !e.kind.is_command())
                .unwrap_or(self.entries.len())
        } else {
            self.entries.len()
        };

        let destination = entry.destination;
        self.entries.insert(pos, entry)?;
        if indirect {
            self.indirect += 1;
            self.mark_for(&destination);
        } else {
            self.direct += 1;
        }
        Ok(())
    }

    /// Take the first entry eligible in `phase` and put it in flight.
    /// Nothing is taken while another entry is in flight.
    pub fn next(&mut self, phase: TxFlags) -> Option<&mut TxEntry> {
        if self.in_flight.is_some() {
            return None;
        }
        let pos = self.entries.iter().position(|e| e.is_eligible(phase))?;
        self.in_flight = Some(self.entries.remove(pos));
        self.in_flight.as_mut()
    }

    fn release(&mut self, entry: &TxEntry) {
        if entry.is_indirect() {
            self.indirect = self.indirect.saturating_sub(1);
            self.mark_for(&entry.destination);
        } else {
            self.direct = self.direct.saturating_sub(1);
        }
    }

    /// Settle the entry in flight with the radio's `status`.
    pub fn complete(&mut self, status: TxStatus) -> Option<Completion> {
        let mut entry = self.in_flight.take()?;

        let error = match status {
            TxStatus::Success | TxStatus::AckPending => {
                self.release(&entry);
                return Some(Completion::Done {
                    entry,
                    pending: status == TxStatus::AckPending,
                });
            }
            TxStatus::NoAck if entry.retries > 0 => {
                entry.retries -= 1;
                if entry.is_indirect() {
                    // wait for the next data request
                    entry.flags.remove(TxFlags::READY | TxFlags::REQUESTED);
                }
                // fits: the entry still counts against its class
                let _ = self.entries.insert(0, entry);
                return Some(Completion::Retry);
            }
            TxStatus::NoAck => Error::NoAck,
            TxStatus::ChannelAccessFailure => Error::ChannelAccessFailure,
        };

        self.release(&entry);
        Some(Completion::Failed { entry, error })
    }

    /// Drop the entry in flight without a transmission status, for example
    /// when it could not be secured.
    pub fn abort(&mut self) -> Option<TxEntry> {
        let entry = self.in_flight.take()?;
        self.release(&entry);
        Some(entry)
    }

    /// Mark the most recent indirect entry for `destination` and unmark the
    /// older ones, so the beacon lists every address at most once.
    pub fn mark_for(&mut self, destination: &Address) {
        let last = self.entries.iter().rposition(|e| e.is_for(destination));
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if entry.is_for(destination) {
                entry.flags.set(TxFlags::MARKED, Some(i) == last);
            }
        }
    }

    /// Remove the indirect data frame with `handle`.
    pub fn purge(&mut self, handle: u8) -> Option<TxEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.is_indirect() && e.kind == TxKind::Data { handle })?;
        let entry = self.entries.remove(pos);
        self.release(&entry);
        Some(entry)
    }

    /// One persistence unit elapsed: count down every indirect entry and
    /// return the ones that expired.
    pub fn expire_tick(&mut self) -> Vec<TxEntry, MAC_MAX_INDIRECT> {
        let mut expired = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            let entry = &mut self.entries[i];
            if entry.is_indirect() {
                entry.persistence = entry.persistence.saturating_sub(1);
                if entry.persistence == 0 {
                    let entry = self.entries.remove(i);
                    self.release(&entry);
                    let _ = expired.push(entry);
                    continue;
                }
            }
            i += 1;
        }
        expired
    }

    /// Answer a data request from `destination`: the first indirect entry
    /// for it becomes ready. The frame pending bit of that frame tells
    /// whether more entries follow.
    ///
    /// Returns `false` when nothing is queued for `destination`.
    pub fn send_indirect(&mut self, destination: &Address, beacon_network: bool) -> bool {
        let mut matching = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_for(destination))
            .map(|(i, _)| i);
        let Some(first) = matching.next() else {
            return false;
        };
        let more = matching.next().is_some();

        let entry = &mut self.entries[first];
        entry.flags.insert(TxFlags::READY);
        if beacon_network {
            entry.flags.insert(TxFlags::REQUESTED);
        }
        if !entry.options.contains(TxOptions::SECURED) {
            let mut frame = Frame::new_unchecked(entry.frame.as_mut_slice());
            frame.frame_control_mut().set_frame_pending(more);
        }
        true
    }

    /// Destinations to list in the pending address field.
    pub fn pending_addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries
            .iter()
            .filter(|e| e.flags.contains(TxFlags::MARKED))
            .map(|e| e.destination)
    }

    pub fn has_pending_for(&self, destination: &Address) -> bool {
        self.entries.iter().any(|e| e.is_for(destination))
    }

    pub fn has_broadcast(&self) -> bool {
        self.entries
            .iter()
            .any(|e| e.flags.contains(TxFlags::BROADCAST))
    }

    /// Move the first broadcast entry to the front and make it ready.
    pub fn promote_broadcast(&mut self) {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|e| e.flags.contains(TxFlags::BROADCAST))
        {
            let mut entry = self.entries.remove(pos);
            entry.flags.insert(TxFlags::READY);
            let _ = self.entries.insert(0, entry);
        }
    }

    /// Without beacons a broadcast cannot be announced: every queued one
    /// becomes ready at once.
    pub fn ready_broadcasts(&mut self) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.flags.contains(TxFlags::BROADCAST))
        {
            entry.flags.insert(TxFlags::READY);
        }
    }

    /// Sync loss: entries for the incoming CAP go out in our own schedule,
    /// without slotted access.
    pub fn flush_incoming_cap(&mut self) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.flags.contains(TxFlags::INCOMING_CAP))
        {
            entry.flags.insert(TxFlags::OUTGOING_CAP);
            entry.options.remove(TxOptions::SLOTTED);
        }
    }

    /// Our beacons started or stopped: entries sent in our own schedule
    /// switch their channel access.
    pub fn set_slotted(&mut self, slotted: bool) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| !e.flags.contains(TxFlags::INCOMING_CAP))
        {
            entry.options.set(TxOptions::SLOTTED, slotted);
        }
    }

    /// End of the CAP: indirect entries wait for the next one.
    pub fn clear_ready_indirect(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| e.is_indirect()) {
            entry.flags.remove(TxFlags::READY);
        }
    }

    /// Start of the CAP: entries requested earlier become ready.
    pub fn ready_requested(&mut self) {
        for entry in self
            .entries
            .iter_mut()
            .filter(|e| e.flags.contains(TxFlags::REQUESTED))
        {
            entry.flags.insert(TxFlags::READY);
        }
    }

    /// Remove the entries matching `f`, for example scan related frames
    /// once the scan is over.
    pub fn remove_where(&mut self, mut f: impl FnMut(&TxEntry) -> bool) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.entries.len() {
            if f(&self.entries[i]) {
                let entry = self.entries.remove(i);
                self.release(&entry);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Drop everything, the entry in flight included.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight = None;
        self.direct = 0;
        self.indirect = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{AddressingRepr, FrameType, HeaderRepr};
    use crate::mac::constants::MAC_TRANSACTION_PERSISTENCE_TIME;

    fn frame(destination: Address, seq: u8) -> FrameBuffer {
        let mut buffer = FrameBuffer::new(32);
        buffer.append(&[0xaa, seq]).unwrap();
        let header = HeaderRepr {
            sequence_number: Some(seq),
            ..HeaderRepr::new(
                FrameType::Data,
                AddressingRepr {
                    dst_pan_id: 0x1234,
                    dst_address: destination,
                    src_pan_id: 0x1234,
                    src_address: Address::short(0x0000),
                },
            )
        };
        header.emit(&mut buffer).unwrap();
        buffer
    }

    fn direct(handle: u8) -> TxEntry {
        let destination = Address::short(0x0000);
        let mut entry = TxEntry::new(frame(destination, handle), TxKind::Data { handle }, destination);
        entry.flags = TxFlags::OUTGOING_CAP | TxFlags::READY;
        entry.retries = 3;
        entry
    }

    fn indirect(destination: Address, handle: u8) -> TxEntry {
        let mut entry = TxEntry::new(frame(destination, handle), TxKind::Data { handle }, destination);
        entry.flags = TxFlags::OUTGOING_CAP | TxFlags::INDIRECT;
        entry.options = TxOptions::INDIRECT | TxOptions::ACK_REQUEST;
        entry.persistence = MAC_TRANSACTION_PERSISTENCE_TIME;
        entry.retries = 1;
        entry
    }

    fn marked(queue: &TxQueue) -> std::vec::Vec<u8> {
        queue
            .iter()
            .filter(|e| e.flags.contains(TxFlags::MARKED))
            .map(|e| match e.kind {
                TxKind::Data { handle } => handle,
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn overflow_keeps_entries() {
        let mut queue = TxQueue::new();
        for handle in 0..MAC_MAX_DIRECT as u8 {
            queue.enqueue(direct(handle)).unwrap();
        }
        let rejected = queue.enqueue(direct(0xff)).unwrap_err();
        assert_eq!(rejected.kind, TxKind::Data { handle: 0xff });
        assert_eq!(queue.len(), MAC_MAX_DIRECT);
        assert_eq!(queue.counts(), (MAC_MAX_DIRECT, 0));

        // the other class is still open
        queue.enqueue(indirect(Address::short(1), 0x10)).unwrap();
        assert_eq!(queue.counts(), (MAC_MAX_DIRECT, 1));
    }

    #[test]
    fn in_flight_counts_against_class() {
        let mut queue = TxQueue::new();
        for handle in 0..MAC_MAX_DIRECT as u8 {
            queue.enqueue(direct(handle)).unwrap();
        }
        assert!(queue.next(TxFlags::OUTGOING_CAP).is_some());
        assert!(queue.enqueue(direct(0xff)).is_err());

        assert!(matches!(queue.complete(TxStatus::NoAck), Some(Completion::Retry)));
        assert_eq!(queue.len(), MAC_MAX_DIRECT);
    }

    #[test]
    fn commands_go_first() {
        let mut queue = TxQueue::new();
        queue.enqueue(direct(1)).unwrap();
        let mut request = TxEntry::new(
            FrameBuffer::new(0),
            TxKind::DataRequest(PollKind::Explicit),
            Address::short(0),
        );
        request.flags = TxFlags::OUTGOING_CAP | TxFlags::READY;
        queue.enqueue(request).unwrap();
        queue.enqueue(direct(2)).unwrap();

        let kinds: std::vec::Vec<_> = queue.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                TxKind::DataRequest(PollKind::Explicit),
                TxKind::Data { handle: 1 },
                TxKind::Data { handle: 2 }
            ]
        );
    }

    #[test]
    fn eligibility_follows_phase() {
        let mut queue = TxQueue::new();
        let mut entry = direct(1);
        entry.flags = TxFlags::INCOMING_CAP | TxFlags::READY;
        queue.enqueue(entry).unwrap();

        assert!(queue.next(TxFlags::OUTGOING_CAP).is_none());
        assert!(queue.next(TxFlags::INACTIVE).is_none());
        assert!(queue.next(TxFlags::INCOMING_CAP).is_some());
        // one at a time
        queue.enqueue(direct(2)).unwrap();
        assert!(queue.next(TxFlags::OUTGOING_CAP).is_none());
    }

    #[test]
    fn only_most_recent_is_marked() {
        let mut queue = TxQueue::new();
        let device = Address::short(0x0001);
        queue.enqueue(indirect(device, 1)).unwrap();
        queue.enqueue(indirect(Address::short(0x0002), 2)).unwrap();
        queue.enqueue(indirect(device, 3)).unwrap();
        queue.mark_for(&device);

        assert_eq!(marked(&queue), [2, 3]);
        let pending: std::vec::Vec<_> = queue.pending_addresses().collect();
        assert_eq!(pending, [Address::short(0x0002), device]);

        // the mark moves back once the newest is gone
        queue.purge(3).unwrap();
        assert_eq!(marked(&queue), [1, 2]);
    }

    #[test]
    fn direct_retries_then_fails() {
        let mut queue = TxQueue::new();
        let mut entry = direct(7);
        entry.retries = 1;
        queue.enqueue(entry).unwrap();

        queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert!(matches!(queue.complete(TxStatus::NoAck), Some(Completion::Retry)));
        assert_eq!(queue.iter().next().unwrap().retries, 0);

        queue.next(TxFlags::OUTGOING_CAP).unwrap();
        match queue.complete(TxStatus::NoAck) {
            Some(Completion::Failed { entry, error }) => {
                assert_eq!(entry.kind, TxKind::Data { handle: 7 });
                assert_eq!(error, Error::NoAck);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(queue.is_empty());
        assert_eq!(queue.counts(), (0, 0));
        assert!(queue.complete(TxStatus::Success).is_none());
    }

    #[test]
    fn ack_pending_completes() {
        let mut queue = TxQueue::new();
        queue.enqueue(direct(1)).unwrap();
        queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert!(matches!(
            queue.complete(TxStatus::AckPending),
            Some(Completion::Done { pending: true, .. })
        ));

        queue.enqueue(direct(2)).unwrap();
        queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert!(matches!(
            queue.complete(TxStatus::ChannelAccessFailure),
            Some(Completion::Failed {
                error: Error::ChannelAccessFailure,
                ..
            })
        ));
    }

    #[test]
    fn indirect_waits_for_request() {
        let mut queue = TxQueue::new();
        let device = Address::extended(0x0102_0304_0506_0708);
        queue.enqueue(indirect(device, 1)).unwrap();
        queue.enqueue(indirect(device, 2)).unwrap();

        assert!(queue.next(TxFlags::OUTGOING_CAP).is_none());
        assert!(!queue.send_indirect(&Address::short(9), false));
        assert!(queue.send_indirect(&device, false));

        let entry = queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert_eq!(entry.kind, TxKind::Data { handle: 1 });
        let frame = Frame::new(entry.frame.as_slice()).unwrap();
        assert!(frame.frame_control().frame_pending());

        // not acknowledged: back in the queue, waiting for another request
        assert!(matches!(queue.complete(TxStatus::NoAck), Some(Completion::Retry)));
        assert!(queue.next(TxFlags::OUTGOING_CAP).is_none());

        assert!(queue.send_indirect(&device, false));
        queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert!(matches!(queue.complete(TxStatus::Success), Some(Completion::Done { .. })));

        // last one for the device: no frame pending
        assert!(queue.send_indirect(&device, false));
        let entry = queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert_eq!(entry.kind, TxKind::Data { handle: 2 });
        let frame = Frame::new(entry.frame.as_slice()).unwrap();
        assert!(!frame.frame_control().frame_pending());
    }

    #[test]
    fn requested_in_beacon_network() {
        let mut queue = TxQueue::new();
        let device = Address::short(0x0001);
        queue.enqueue(indirect(device, 1)).unwrap();
        assert!(queue.send_indirect(&device, true));

        // end of the CAP before it could go out
        queue.clear_ready_indirect();
        assert!(queue.next(TxFlags::OUTGOING_CAP).is_none());

        queue.ready_requested();
        assert!(queue.next(TxFlags::OUTGOING_CAP).is_some());
    }

    #[test]
    fn persistence_expires() {
        let mut queue = TxQueue::new();
        let device = Address::short(0x0001);
        let mut short_lived = indirect(device, 1);
        short_lived.persistence = 1;
        queue.enqueue(short_lived).unwrap();
        queue.enqueue(indirect(device, 2)).unwrap();
        queue.enqueue(direct(3)).unwrap();

        let expired = queue.expire_tick();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].kind, TxKind::Data { handle: 1 });
        assert_eq!(queue.counts(), (1, 1));

        for _ in 2..MAC_TRANSACTION_PERSISTENCE_TIME {
            assert!(queue.expire_tick().is_empty());
        }
        assert_eq!(queue.expire_tick().len(), 1);
        assert_eq!(queue.counts(), (1, 0));
    }

    #[test]
    fn broadcast_promoted() {
        let mut queue = TxQueue::new();
        queue.enqueue(indirect(Address::short(1), 1)).unwrap();
        let mut broadcast = indirect(Address::BROADCAST, 2);
        broadcast.flags.insert(TxFlags::BROADCAST);
        queue.enqueue(broadcast).unwrap();

        assert!(queue.has_broadcast());
        // broadcasts are never listed by address
        assert_eq!(queue.pending_addresses().count(), 1);

        queue.promote_broadcast();
        let entry = queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert_eq!(entry.kind, TxKind::Data { handle: 2 });
    }

    #[test]
    fn flush_after_sync_loss() {
        let mut queue = TxQueue::new();
        let mut entry = direct(1);
        entry.flags = TxFlags::INCOMING_CAP | TxFlags::READY;
        entry.options = TxOptions::SLOTTED | TxOptions::ACK_REQUEST;
        queue.enqueue(entry).unwrap();

        queue.flush_incoming_cap();
        let entry = queue.next(TxFlags::OUTGOING_CAP).unwrap();
        assert_eq!(entry.options, TxOptions::ACK_REQUEST);
    }

    #[test]
    fn slotted_follows_own_beacons() {
        let mut queue = TxQueue::new();
        let mut incoming = direct(1);
        incoming.flags = TxFlags::INCOMING_CAP | TxFlags::READY;
        incoming.options = TxOptions::SLOTTED;
        queue.enqueue(incoming).unwrap();
        queue.enqueue(direct(2)).unwrap();

        queue.set_slotted(true);
        assert!(queue.iter().all(|e| e.options.contains(TxOptions::SLOTTED)));
        queue.set_slotted(false);
        let slotted: std::vec::Vec<_> = queue
            .iter()
            .map(|e| e.options.contains(TxOptions::SLOTTED))
            .collect();
        // the incoming CAP keeps the coordinator's access
        assert_eq!(slotted, [true, false]);
    }

    #[test]
    fn purge_unknown_handle() {
        let mut queue = TxQueue::new();
        queue.enqueue(direct(1)).unwrap();
        // direct frames cannot be purged
        assert!(queue.purge(1).is_none());
        assert!(queue.purge(2).is_none());
    }
}
