

use crate::log::{debug, warn};
use crate::{PeerId, Ts};

/// Upper bound on slots in a cycle, and so on peers tracked in auto mode
pub const MAX_SLOTS: usize = 32;

/// What happens during a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotType {
    /// Data transmission, handed to the driver as initiate-transmission
    Data,
    /// Two-way acoustic ping
    Ping,
    /// REMUS long-baseline ranging
    RemusLbl,
}

/// One slot of channel time: `src` may transmit for `slot_seconds`.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot {
    /// Peer that transmits in this slot (`BROADCAST_ID` for the blank slot)
    pub src: PeerId,
    /// Receiving peer, or `QUERY_DESTINATION_ID` to let the driver decide
    pub dest: PeerId,
    /// Modulation rate index, forwarded to the driver untouched
    pub rate: i32,
    pub kind: SlotType,
    /// Slot duration in seconds
    pub slot_seconds: u32,
    /// Most recent evidence that `src` is alive, ms since the UTC epoch.
    /// Only consulted by auto-mode expiry.
    pub last_heard_time: Ts,
}

impl Slot {
    pub fn data(src: PeerId, dest: PeerId, rate: i32, slot_seconds: u32, heard: Ts) -> Self {
        Self {
            src,
            dest,
            rate,
            kind: SlotType::Data,
            slot_seconds,
            last_heard_time: heard,
        }
    }

    pub fn ping(src: PeerId, dest: PeerId, slot_seconds: u32) -> Self {
        Self {
            src,
            dest,
            rate: 0,
            kind: SlotType::Ping,
            slot_seconds,
            last_heard_time: 0,
        }
    }

    pub fn remus_lbl(src: PeerId, slot_seconds: u32) -> Self {
        Self {
            src,
            dest: crate::QUERY_DESTINATION_ID,
            rate: 0,
            kind: SlotType::RemusLbl,
            slot_seconds,
            last_heard_time: 0,
        }
    }
}

/// Slot equality ignores `last_heard_time`: two slots describing the same
/// channel assignment are the same slot regardless of liveness bookkeeping.
impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.src == other.src
            && self.dest == other.dest
            && self.rate == other.rate
            && self.kind == other.kind
            && self.slot_seconds == other.slot_seconds
    }
}

/// Stable reference to a table entry, valid until that entry is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotHandle(u32);

#[derive(Debug, Clone)]
pub struct SlotEntry {
    pub handle: SlotHandle,
    pub slot: Slot,
}

/// Ordered table of slots defining the cycle.
///
/// Entry order is cycle order. Duplicate `src` values are allowed (a peer
/// may hold several slots in a configured cycle). Entries own their slots;
/// handles are small stable ids, never pointers into the storage.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    entries: heapless::Vec<SlotEntry, MAX_SLOTS>,
    next_handle: u32,
}

impl SlotTable {
    pub fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
            next_handle: 0,
        }
    }

    /// Append a slot to the cycle, returning its handle.
    ///
    /// A full table drops the slot with a warning; the returned handle then
    /// never resolves.
    pub fn add(&mut self, slot: Slot) -> SlotHandle {
        let handle = SlotHandle(self.next_handle);
        self.next_handle += 1;

        debug!("added slot src {} dest {} rate {} len {} s", slot.src, slot.dest, slot.rate, slot.slot_seconds);

        if self.entries.push(SlotEntry { handle, slot }).is_err() {
            warn!("slot table full ({} entries), dropping slot", MAX_SLOTS);
        }

        handle
    }

    /// Remove the first slot equal to `slot` (liveness time ignored)
    pub fn remove_matching(&mut self, slot: &Slot) -> bool {
        match self.entries.iter().position(|e| e.slot == *slot) {
            Some(index) => {
                self.remove_index(index);
                true
            }
            None => false,
        }
    }

    /// Remove an entry by handle and return it
    pub fn take(&mut self, handle: SlotHandle) -> Option<SlotEntry> {
        let index = self.entries.iter().position(|e| e.handle == handle)?;
        self.remove_index(index)
    }

    /// Insert an entry at `index` in cycle order
    pub fn insert_at(&mut self, index: usize, entry: SlotEntry) {
        if self.entries.push(entry).is_err() {
            warn!("slot table full ({} entries), dropping slot", MAX_SLOTS);
            return;
        }
        self.entries[index..].rotate_right(1);
    }

    pub fn get(&self, handle: SlotHandle) -> Option<&Slot> {
        self.entries
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| &e.slot)
    }

    pub fn get_index(&self, index: usize) -> Option<&Slot> {
        self.entries.get(index).map(|e| &e.slot)
    }

    /// Mark every slot belonging to `src` as heard at time `now`
    pub fn touch(&mut self, src: PeerId, now: Ts) {
        for e in self.entries.iter_mut() {
            if e.slot.src == src {
                e.slot.last_heard_time = now;
            }
        }
    }

    pub fn contains(&self, src: PeerId) -> bool {
        self.entries.iter().any(|e| e.slot.src == src)
    }

    /// Total cycle duration in seconds
    pub fn cycle_length(&self) -> u32 {
        self.entries.iter().map(|e| e.slot.slot_seconds).sum()
    }

    /// Sum of all `src` ids in the cycle, the peer-set fingerprint used by
    /// blank placement
    pub fn cycle_sum(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| e.slot.src.max(0) as u64)
            .sum()
    }

    /// Sort the cycle by `src` ascending so that all peers agree on order
    pub fn sort_by_src(&mut self) {
        self.entries.sort_unstable_by_key(|e| e.slot.src);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlotEntry> {
        self.entries.iter()
    }

    fn remove_index(&mut self, index: usize) -> Option<SlotEntry> {
        if index >= self.entries.len() {
            return None;
        }
        self.entries[index..].rotate_left(1);
        self.entries.pop()
    }
}
