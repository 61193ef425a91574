//! Typed views over a hash bucket page.
//!
//! Layout (bitmaps first, then the packed entry array):
//!
//! ```text
//! offset 0:            occupied bitmap  (ceil(capacity / 8) bytes)
//! offset bitmap_len:   readable bitmap  (ceil(capacity / 8) bytes)
//! offset 2*bitmap_len: entries          (capacity x (K::SIZE + V::SIZE) bytes)
//! ```
//!
//! A slot's occupied bit is set the first time the slot is written and never
//! cleared while the bucket lives; the readable bit is set only while the
//! slot holds a live entry. A slot with occupied set and readable clear is a
//! tombstone, which keeps linear probing valid: the first clear occupied bit
//! terminates every scan.

use crate::PAGE_SIZE;
use crate::errors::bucket_error::BucketError;
use binary_helpers::fixed::FixedEncode;
use std::marker::PhantomData;

/// Number of entry slots a bucket page holds for the given key and value
/// encodings. Each slot costs its entry bytes plus one occupied and one
/// readable bit.
pub const fn bucket_capacity<K: FixedEncode, V: FixedEncode>() -> usize {
    (4 * PAGE_SIZE - 1) / (4 * (K::SIZE + V::SIZE) + 1)
}

/// Byte offsets of the three page regions, derived from the entry width.
#[derive(Debug, Clone, Copy)]
struct BucketLayout {
    capacity: usize,
    bitmap_len: usize,
    entry_size: usize,
}

impl BucketLayout {
    fn of<K: FixedEncode, V: FixedEncode>() -> Self {
        let capacity = bucket_capacity::<K, V>();
        let bitmap_len = capacity.div_ceil(8);
        let layout = Self {
            capacity,
            bitmap_len,
            entry_size: K::SIZE + V::SIZE,
        };
        debug_assert!(layout.entry_offset(capacity) <= PAGE_SIZE);
        layout
    }

    fn readable_base(&self) -> usize {
        self.bitmap_len
    }

    fn entry_offset(&self, slot: usize) -> usize {
        2 * self.bitmap_len + slot * self.entry_size
    }

    fn check_slot(&self, index: usize) -> Result<(), BucketError> {
        if index >= self.capacity {
            return Err(BucketError::SlotOutOfBounds {
                index,
                capacity: self.capacity,
            });
        }
        Ok(())
    }
}

fn bit_is_set(bytes: &[u8], base: usize, index: usize) -> bool {
    bytes[base + index / 8] & (1 << (index % 8)) != 0
}

fn set_bit(bytes: &mut [u8], base: usize, index: usize) {
    bytes[base + index / 8] |= 1 << (index % 8);
}

fn clear_bit(bytes: &mut [u8], base: usize, index: usize) {
    bytes[base + index / 8] &= !(1 << (index % 8));
}

fn count_readable(bytes: &[u8; PAGE_SIZE], layout: &BucketLayout) -> u32 {
    bytes[layout.readable_base()..layout.readable_base() + layout.bitmap_len]
        .iter()
        .map(|byte| byte.count_ones())
        .sum()
}

/// Immutable view into a bucket page.
#[derive(Debug)]
pub struct BucketRef<'a, K, V> {
    bytes: &'a [u8; PAGE_SIZE],
    layout: BucketLayout,
    _entry: PhantomData<(K, V)>,
}

/// Mutable view into a bucket page.
///
/// Carries the live-entry count so fullness checks during a mutation batch
/// do not rescan the readable bitmap; the count is recomputed whenever a
/// view is opened.
#[derive(Debug)]
pub struct BucketMut<'a, K, V> {
    bytes: &'a mut [u8; PAGE_SIZE],
    layout: BucketLayout,
    num_readable: u32,
    _entry: PhantomData<(K, V)>,
}

impl<'a, K, V> BucketRef<'a, K, V>
where
    K: FixedEncode + Eq,
    V: FixedEncode + Eq,
{
    /// Creates a view over the raw bytes of a bucket page.
    pub fn new(bytes: &'a [u8; PAGE_SIZE]) -> Self {
        Self {
            bytes,
            layout: BucketLayout::of::<K, V>(),
            _entry: PhantomData,
        }
    }

    /// Number of entry slots in this bucket.
    pub fn capacity(&self) -> usize {
        self.layout.capacity
    }

    /// Whether the slot at `index` has ever been written.
    pub fn is_occupied(&self, index: usize) -> Result<bool, BucketError> {
        self.layout.check_slot(index)?;
        Ok(bit_is_set(&self.bytes[..], 0, index))
    }

    /// Whether the slot at `index` currently holds a live entry.
    pub fn is_readable(&self, index: usize) -> Result<bool, BucketError> {
        self.layout.check_slot(index)?;
        Ok(bit_is_set(&self.bytes[..], self.layout.readable_base(), index))
    }

    /// Key stored at `index`. Meaningful only for occupied slots.
    pub fn key_at(&self, index: usize) -> Result<K, BucketError> {
        self.layout.check_slot(index)?;
        Ok(K::read_from(&self.bytes[..], self.layout.entry_offset(index))?)
    }

    /// Value stored at `index`. Meaningful only for occupied slots.
    pub fn value_at(&self, index: usize) -> Result<V, BucketError> {
        self.layout.check_slot(index)?;
        Ok(V::read_from(
            &self.bytes[..],
            self.layout.entry_offset(index) + K::SIZE,
        )?)
    }

    /// Number of live entries.
    pub fn num_readable(&self) -> u32 {
        count_readable(self.bytes, &self.layout)
    }

    /// Whether every slot holds a live entry.
    pub fn is_full(&self) -> bool {
        self.num_readable() as usize == self.layout.capacity
    }

    /// Whether no slot holds a live entry.
    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }

    /// Collects the values of every live entry whose key equals `key`.
    /// Duplicate keys are permitted, so this can return more than one value.
    pub fn get_value(&self, key: &K) -> Result<Vec<V>, BucketError> {
        let mut matches = Vec::new();
        for slot in 0..self.layout.capacity {
            if !self.is_occupied(slot)? {
                break;
            }
            if self.is_readable(slot)? && self.key_at(slot)? == *key {
                matches.push(self.value_at(slot)?);
            }
        }
        Ok(matches)
    }

    /// Whether a live `(key, value)` entry is present.
    pub fn contains(&self, key: &K, value: &V) -> Result<bool, BucketError> {
        for slot in 0..self.layout.capacity {
            if !self.is_occupied(slot)? {
                break;
            }
            if self.is_readable(slot)?
                && self.key_at(slot)? == *key
                && self.value_at(slot)? == *value
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<'a, K, V> BucketMut<'a, K, V>
where
    K: FixedEncode + Eq,
    V: FixedEncode + Eq,
{
    /// Creates a mutable view over the raw bytes of a bucket page.
    pub fn new(bytes: &'a mut [u8; PAGE_SIZE]) -> Self {
        let layout = BucketLayout::of::<K, V>();
        let num_readable = count_readable(bytes, &layout);
        Self {
            bytes,
            layout,
            num_readable,
            _entry: PhantomData,
        }
    }

    /// Reborrows as an immutable view for the read accessors.
    pub fn as_ref(&self) -> BucketRef<'_, K, V> {
        BucketRef {
            bytes: self.bytes,
            layout: self.layout,
            _entry: PhantomData,
        }
    }

    /// Number of live entries.
    pub fn num_readable(&self) -> u32 {
        self.num_readable
    }

    /// Whether every slot holds a live entry.
    pub fn is_full(&self) -> bool {
        self.num_readable as usize == self.layout.capacity
    }

    /// Whether no slot holds a live entry.
    pub fn is_empty(&self) -> bool {
        self.num_readable == 0
    }

    /// Inserts `(key, value)` into the first tombstone on the probe path, or
    /// the first never-written slot if there is no tombstone.
    ///
    /// Returns `false` without modifying the page when the bucket is full on
    /// entry or when an identical live `(key, value)` entry already exists.
    pub fn insert(&mut self, key: &K, value: &V) -> Result<bool, BucketError> {
        if self.is_full() {
            return Ok(false);
        }

        // One scan finds both the duplicate (if any) and the insert slot.
        // The duplicate check must run to the probe terminator, since the
        // first reusable slot can precede an existing copy of the entry.
        let mut target: Option<usize> = None;
        for slot in 0..self.layout.capacity {
            if !self.as_ref().is_occupied(slot)? {
                if target.is_none() {
                    target = Some(slot);
                }
                break;
            }
            if self.as_ref().is_readable(slot)? {
                if self.as_ref().key_at(slot)? == *key && self.as_ref().value_at(slot)? == *value {
                    return Ok(false);
                }
            } else if target.is_none() {
                target = Some(slot);
            }
        }

        // A non-full bucket always has a tombstone or an unwritten slot.
        debug_assert!(target.is_some());
        match target {
            Some(slot) => {
                self.insert_at(slot, key, value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes the live entry matching `(key, value)`, leaving a tombstone.
    /// Returns `false` if the bucket is empty or holds no matching entry.
    pub fn remove(&mut self, key: &K, value: &V) -> Result<bool, BucketError> {
        if self.is_empty() {
            return Ok(false);
        }

        for slot in 0..self.layout.capacity {
            if !self.as_ref().is_occupied(slot)? {
                break;
            }
            if self.as_ref().is_readable(slot)?
                && self.as_ref().key_at(slot)? == *key
                && self.as_ref().value_at(slot)? == *value
            {
                self.remove_at(slot)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Writes `(key, value)` at `index` unconditionally, marking the slot
    /// occupied and readable. Used when rehoming entries during a split.
    pub fn insert_at(&mut self, index: usize, key: &K, value: &V) -> Result<(), BucketError> {
        self.layout.check_slot(index)?;
        assert!(
            !bit_is_set(&self.bytes[..], self.layout.readable_base(), index),
            "slot {index} already holds a live entry"
        );

        set_bit(&mut self.bytes[..], 0, index);
        set_bit(&mut self.bytes[..], self.layout.readable_base(), index);
        key.write_to(&mut self.bytes[..], self.layout.entry_offset(index))?;
        value.write_to(
            &mut self.bytes[..],
            self.layout.entry_offset(index) + K::SIZE,
        )?;
        self.num_readable += 1;
        Ok(())
    }

    /// Clears the readable bit at `index`, turning the slot into a tombstone.
    /// The occupied bit stays set so probe chains remain intact.
    pub fn remove_at(&mut self, index: usize) -> Result<(), BucketError> {
        self.layout.check_slot(index)?;
        assert!(
            bit_is_set(&self.bytes[..], self.layout.readable_base(), index),
            "slot {index} holds no live entry"
        );

        clear_bit(&mut self.bytes[..], self.layout.readable_base(), index);
        self.num_readable -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod bucket_tests {
    use super::*;
    use crate::rid::Rid;

    type Bucket<'a> = BucketMut<'a, u64, u64>;

    #[test]
    fn layout_fits_in_a_page_for_crate_codecs() {
        for (entry_size, capacity) in [
            (16, bucket_capacity::<u64, u64>()),
            (16, bucket_capacity::<u64, Rid>()),
            (8, bucket_capacity::<u32, u32>()),
            (12, bucket_capacity::<u32, Rid>()),
        ] {
            let bitmap_len = capacity.div_ceil(8);
            assert!(2 * bitmap_len + capacity * entry_size <= PAGE_SIZE);
            // The next slot would not fit, i.e. capacity is maximal.
            assert!(2 * (capacity + 1).div_ceil(8) + (capacity + 1) * entry_size > PAGE_SIZE);
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);

        assert!(bucket.insert(&1, &10).unwrap());
        assert!(bucket.insert(&2, &20).unwrap());
        assert_eq!(bucket.num_readable(), 2);

        assert_eq!(bucket.as_ref().get_value(&1).unwrap(), vec![10]);
        assert_eq!(bucket.as_ref().get_value(&2).unwrap(), vec![20]);
        assert!(bucket.as_ref().get_value(&3).unwrap().is_empty());
    }

    #[test]
    fn duplicate_entry_is_rejected_but_duplicate_key_is_not() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);

        assert!(bucket.insert(&1, &10).unwrap());
        assert!(!bucket.insert(&1, &10).unwrap());
        assert!(bucket.insert(&1, &11).unwrap());

        let mut values = bucket.as_ref().get_value(&1).unwrap();
        values.sort_unstable();
        assert_eq!(values, vec![10, 11]);
    }

    #[test]
    fn remove_leaves_a_tombstone_that_probing_skips() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);

        for key in 0..4u64 {
            assert!(bucket.insert(&key, &(key * 10)).unwrap());
        }
        assert!(bucket.remove(&1, &10).unwrap());

        // Slot 1 is a tombstone: occupied, not readable.
        assert!(bucket.as_ref().is_occupied(1).unwrap());
        assert!(!bucket.as_ref().is_readable(1).unwrap());

        // Entries past the tombstone are still reachable.
        assert_eq!(bucket.as_ref().get_value(&3).unwrap(), vec![30]);
        assert!(bucket.as_ref().get_value(&1).unwrap().is_empty());
    }

    #[test]
    fn removed_entry_cannot_be_removed_twice() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);

        assert!(bucket.insert(&5, &50).unwrap());
        assert!(bucket.remove(&5, &50).unwrap());
        assert!(!bucket.remove(&5, &50).unwrap());
        assert!(bucket.is_empty());
    }

    #[test]
    fn insert_reuses_the_first_tombstone() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);

        for key in 0..4u64 {
            assert!(bucket.insert(&key, &key).unwrap());
        }
        assert!(bucket.remove(&1, &1).unwrap());
        assert!(bucket.remove(&2, &2).unwrap());

        assert!(bucket.insert(&9, &9).unwrap());
        assert_eq!(bucket.as_ref().key_at(1).unwrap(), 9);
    }

    #[test]
    fn full_bucket_rejects_inserts() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);
        let capacity = bucket.as_ref().capacity() as u64;

        for key in 0..capacity {
            assert!(bucket.insert(&key, &key).unwrap());
        }
        assert!(bucket.is_full());
        assert!(!bucket.insert(&capacity, &capacity).unwrap());

        // A removal opens exactly one slot again.
        assert!(bucket.remove(&0, &0).unwrap());
        assert!(bucket.insert(&capacity, &capacity).unwrap());
        assert!(bucket.is_full());
    }

    #[test]
    fn num_readable_survives_view_reopen() {
        let mut bytes = [0u8; PAGE_SIZE];
        {
            let mut bucket = Bucket::new(&mut bytes);
            for key in 0..7u64 {
                bucket.insert(&key, &key).unwrap();
            }
            bucket.remove(&3, &3).unwrap();
        }

        let bucket = BucketRef::<u64, u64>::new(&bytes);
        assert_eq!(bucket.num_readable(), 6);
    }

    #[test]
    fn slot_primitives_are_bounds_checked() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);
        let capacity = bucket.as_ref().capacity();

        assert!(matches!(
            bucket.as_ref().key_at(capacity),
            Err(BucketError::SlotOutOfBounds { .. })
        ));
        assert!(matches!(
            bucket.insert_at(capacity, &1, &1),
            Err(BucketError::SlotOutOfBounds { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "already holds a live entry")]
    fn double_insert_at_one_slot_is_fatal() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = Bucket::new(&mut bytes);

        bucket.insert_at(0, &1, &1).unwrap();
        let _ = bucket.insert_at(0, &2, &2);
    }

    #[test]
    fn rid_values_round_trip() {
        let mut bytes = [0u8; PAGE_SIZE];
        let mut bucket = BucketMut::<u64, Rid>::new(&mut bytes);

        let rid = Rid::new(3, 4);
        assert!(bucket.insert(&99, &rid).unwrap());
        assert_eq!(bucket.as_ref().get_value(&99).unwrap(), vec![rid]);
    }
}
