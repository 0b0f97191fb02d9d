//! Fixed-capacity registry of loaded samples.
//!
//! Eviction is by load order, not access order: when every slot is full the
//! slot that was loaded longest ago is reused. Clearing a slot forgets its load
//! stamp entirely, so a cleared slot looks exactly like one that was never
//! used.

use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};
use crate::sample::SampleBuffer;

/// Monotonic load stamp. Larger means loaded later.
pub type LoadStamp = u64;

/// One occupied slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSlot {
    pub index: usize,
    pub sample: SampleBuffer,
    pub loaded_at: LoadStamp,
}

impl SampleSlot {
    pub fn pcm(&self) -> &[f32] {
        self.sample.pcm()
    }

    pub fn shared_pcm(&self) -> Arc<[f32]> {
        self.sample.shared_pcm()
    }

    pub fn len(&self) -> usize {
        self.sample.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sample.is_empty()
    }

    pub fn name(&self) -> &str {
        self.sample.name()
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample.sample_rate()
    }

    pub fn duration(&self) -> f64 {
        self.sample.duration()
    }
}

/// Fixed-capacity slot registry with least-recently-loaded eviction.
#[derive(Debug, Clone)]
pub struct SlotTable {
    slots: Vec<Option<SampleSlot>>,
    max_samples_per_slot: usize,
    next_stamp: LoadStamp,
}

impl SlotTable {
    /// Create an empty table.
    pub fn new(max_slots: usize, max_samples_per_slot: usize) -> Self {
        Self {
            slots: vec![None; max_slots],
            max_samples_per_slot,
            next_stamp: 0,
        }
    }

    /// Number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Samples a slot can hold.
    #[inline]
    pub fn max_samples_per_slot(&self) -> usize {
        self.max_samples_per_slot
    }

    /// Number of occupied slots.
    pub fn loaded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_loaded(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    pub fn get(&self, slot: usize) -> Option<&SampleSlot> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &SampleSlot> {
        self.slots.iter().flatten()
    }

    /// Reject out-of-range indices.
    pub fn check_index(&self, slot: usize) -> BridgeResult<()> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            Err(BridgeError::SlotOutOfRange {
                slot,
                max_slots: self.slots.len(),
            })
        }
    }

    /// Pick the slot the next load should go to.
    ///
    /// Returns the first empty slot, or the slot with the oldest load stamp
    /// when the table is full. Nothing is modified; the returned slot is
    /// evicted when it is loaded into.
    pub fn allocate(&self) -> usize {
        if let Some(free) = self.slots.iter().position(Option::is_none) {
            return free;
        }
        self.slots
            .iter()
            .flatten()
            .min_by_key(|s| s.loaded_at)
            .map(|s| s.index)
            .unwrap_or(0)
    }

    /// Store `sample` in `slot`, truncating it to the slot capacity.
    ///
    /// Returns whatever the slot held before.
    pub fn load(&mut self, slot: usize, sample: SampleBuffer) -> BridgeResult<Option<SampleSlot>> {
        self.check_index(slot)?;
        let sample = sample.truncated(self.max_samples_per_slot);
        let loaded_at = self.next_stamp;
        self.next_stamp += 1;
        Ok(self.slots[slot].replace(SampleSlot {
            index: slot,
            sample,
            loaded_at,
        }))
    }

    /// Allocate a slot and load into it.
    ///
    /// Returns the chosen index and the evicted content, if any.
    pub fn insert(&mut self, sample: SampleBuffer) -> (usize, Option<SampleSlot>) {
        let slot = self.allocate();
        match self.load(slot, sample) {
            Ok(evicted) => (slot, evicted),
            // allocate() only returns in-range indices; a zero-capacity table
            // has nothing to evict.
            Err(_) => (slot, None),
        }
    }

    /// Remove a slot's content. Out-of-range indices are ignored.
    pub fn clear(&mut self, slot: usize) -> Option<SampleSlot> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    /// Remove every slot.
    pub fn clear_all(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, len: usize) -> SampleBuffer {
        SampleBuffer::new(name, vec![0.25; len], 44_100.0).unwrap()
    }

    #[test]
    fn test_allocate_first_free() {
        let mut table = SlotTable::new(4, 16);
        assert_eq!(table.allocate(), 0);
        table.load(0, sample("a", 4)).unwrap();
        table.load(2, sample("b", 4)).unwrap();
        assert_eq!(table.allocate(), 1);
    }

    #[test]
    fn test_eviction_picks_oldest_load() {
        let mut table = SlotTable::new(3, 16);
        table.load(1, sample("first", 1)).unwrap();
        table.load(0, sample("second", 1)).unwrap();
        table.load(2, sample("third", 1)).unwrap();
        assert_eq!(table.allocate(), 1);

        // Reloading refreshes the stamp, so slot 0 becomes the oldest.
        table.load(1, sample("fourth", 1)).unwrap();
        assert_eq!(table.allocate(), 0);
    }

    #[test]
    fn test_insert_evicts_exactly_one() {
        let mut table = SlotTable::new(8, 16);
        for i in 0..8 {
            let (slot, evicted) = table.insert(sample(&format!("s{i}"), 2));
            assert_eq!(slot, i);
            assert!(evicted.is_none());
        }
        let (slot, evicted) = table.insert(sample("ninth", 2));
        assert_eq!(slot, 0);
        assert_eq!(evicted.unwrap().name(), "s0");
        assert_eq!(table.loaded_count(), 8);
    }

    #[test]
    fn test_cleared_slot_is_next_target() {
        let mut table = SlotTable::new(3, 16);
        for i in 0..3 {
            table.insert(sample(&format!("s{i}"), 1));
        }
        table.clear(2);
        assert!(!table.is_loaded(2));
        assert_eq!(table.allocate(), 2);
    }

    #[test]
    fn test_load_truncates() {
        let mut table = SlotTable::new(2, 10);
        let pcm: Vec<f32> = (0..25).map(|i| i as f32).collect();
        table
            .load(0, SampleBuffer::new("long", pcm.clone(), 48_000.0).unwrap())
            .unwrap();
        let stored = table.get(0).unwrap();
        assert_eq!(stored.len(), 10);
        assert_eq!(stored.pcm(), &pcm[..10]);
    }

    #[test]
    fn test_out_of_range() {
        let mut table = SlotTable::new(2, 10);
        let err = table.load(2, sample("x", 1)).unwrap_err();
        assert_eq!(err, BridgeError::SlotOutOfRange { slot: 2, max_slots: 2 });
        assert_eq!(table.loaded_count(), 0);
        assert!(table.clear(5).is_none());
    }
}
