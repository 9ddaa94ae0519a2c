use std::collections::VecDeque;
use std::time::Duration;

use crate::timer::Countdown;
use crate::Error;

/// One outstanding request awaiting a broker acknowledgment (§3
/// `PendingPublish` / `PendingSubscribe` / `PendingUnsubscribe`).
#[derive(Debug)]
pub struct PendingEntry<T> {
    pub packet_id: u16,
    timer: Countdown,
    pub payload: T,
}

/// Bounded ordered list of pending entries keyed by packet id (§4.C).
///
/// A `VecDeque`-backed ring rather than the original's pointer-based
/// intrusive linked list (§9 Design Note: "replace pointer-based linked
/// lists with an array or bounded ring"): the list is small (≤20) so a
/// push-to-tail, scan-from-head ring is simpler and keeps the capacity
/// check trivial.
#[derive(Debug)]
pub struct PendingAckList<T> {
    entries: VecDeque<PendingEntry<T>>,
    capacity: usize,
}

impl<T> PendingAckList<T> {
    pub fn new(capacity: usize) -> Self {
        PendingAckList {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, packet_id: u16, timeout: Duration, payload: T) -> Result<(), Error> {
        if self.entries.len() >= self.capacity {
            return Err(Error::ResourceExhausted("pending-ack list is full"));
        }
        let mut timer = Countdown::new();
        timer.start(timeout);
        self.entries.push_back(PendingEntry {
            packet_id,
            timer,
            payload,
        });
        Ok(())
    }

    /// Removes and returns the entry for `packet_id`, if any is pending.
    pub fn remove(&mut self, packet_id: u16) -> Option<T> {
        let pos = self.entries.iter().position(|e| e.packet_id == packet_id)?;
        self.entries.remove(pos).map(|e| e.payload)
    }

    /// Drains every entry whose deadline has passed, oldest first.
    pub fn drain_expired(&mut self) -> Vec<(u16, T)> {
        let mut expired = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].timer.expired() {
                let entry = self.entries.remove(i).expect("index in bounds");
                expired.push((entry.packet_id, entry.payload));
            } else {
                i += 1;
            }
        }
        expired
    }

    pub fn clear(&mut self) -> Vec<T> {
        self.entries.drain(..).map(|e| e.payload).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_respects_capacity() {
        let mut list = PendingAckList::new(2);
        list.push(1, Duration::from_secs(5), ()).unwrap();
        list.push(2, Duration::from_secs(5), ()).unwrap();
        assert!(list.push(3, Duration::from_secs(5), ()).is_err());
    }

    #[test]
    fn remove_returns_payload_for_matching_id() {
        let mut list = PendingAckList::new(4);
        list.push(1, Duration::from_secs(5), "one").unwrap();
        list.push(2, Duration::from_secs(5), "two").unwrap();
        assert_eq!(list.remove(1), Some("one"));
        assert_eq!(list.len(), 1);
        assert_eq!(list.remove(1), None);
    }

    #[test]
    fn expired_entries_are_drained_not_live_ones() {
        let mut list = PendingAckList::new(4);
        list.push(1, Duration::from_millis(5), ()).unwrap();
        list.push(2, Duration::from_secs(5), ()).unwrap();
        std::thread::sleep(Duration::from_millis(15));
        let expired = list.drain_expired();
        assert_eq!(expired.into_iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(list.len(), 1);
    }
}
