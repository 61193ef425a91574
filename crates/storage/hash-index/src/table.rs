//! The extendible hash table.
//!
//! Every operation pins its pages through the buffer pool, latches bucket
//! content through the page latch, and unpins with the right dirty flag on
//! every path. Structural changes (splits, merges, directory resizes) run
//! under the exclusive table latch; plain reads and in-bucket writes run
//! under the shared one.
//!
//! Lock order is table latch, then page latch, then pool mutex. The table
//! never calls into the pool while holding a page latch, so pool-internal
//! latching (eviction write-back, flush) cannot deadlock against it.

use crate::errors::HashTableError;
use crate::hash_fn::HashFunction;
use binary_helpers::fixed::FixedEncode;
use buffer::guards::PageHandle;
use buffer::pool::BufferPoolManager;
use disk::api::DiskManager;
use page::bucket_page::{BucketMut, BucketRef};
use page::directory_page::{DirectoryMut, DirectoryRef};
use page::page_id::PageId;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// A persistent hash index over fixed-width keys and values.
///
/// Duplicate keys are allowed; duplicate `(key, value)` entries are not.
/// The table is safe to share across threads.
pub struct ExtendibleHashTable<K, V, D: DiskManager> {
    pool: Arc<BufferPoolManager<D>>,
    directory_page_id: PageId,
    /// Shared for reads and in-bucket writes, exclusive for splits/merges.
    table_latch: RwLock<()>,
    hash_fn: HashFunction<K>,
    _entries: PhantomData<fn() -> (K, V)>,
}

/// Direction of the per-slot local depth adjustment during a remap.
#[derive(Clone, Copy)]
enum DepthChange {
    Raise,
    Lower,
}

impl<K, V, D> ExtendibleHashTable<K, V, D>
where
    K: FixedEncode + Eq,
    V: FixedEncode + Eq,
    D: DiskManager,
{
    /// Creates a new table: one directory page routing to one empty bucket.
    /// Both pages are persisted through the pool before this returns.
    pub fn new(
        pool: Arc<BufferPoolManager<D>>,
        hash_fn: HashFunction<K>,
    ) -> Result<Self, HashTableError> {
        let directory_page_id = {
            let dir_handle = pool.new_page()?;
            let directory_page_id = dir_handle.page_id();

            let bucket_handle = match pool.new_page() {
                Ok(handle) => handle,
                Err(error) => {
                    release_page(&pool, directory_page_id, false);
                    return Err(error.into());
                }
            };
            let first_bucket_page_id = bucket_handle.page_id();

            // A fresh zeroed page already is a valid empty bucket; only the
            // directory needs explicit initialization.
            let init = (|| -> Result<(), HashTableError> {
                let mut dir_guard = dir_handle.write();
                let mut dir = DirectoryMut::new(dir_guard.data_mut());
                dir.init(directory_page_id)?;
                dir.set_local_depth(0, 0)?;
                dir.set_bucket_page_id(0, first_bucket_page_id)?;
                Ok(())
            })();
            release_page(&pool, first_bucket_page_id, true);
            release_page(&pool, directory_page_id, true);
            init?;
            directory_page_id
        };

        Ok(Self {
            pool,
            directory_page_id,
            table_latch: RwLock::new(()),
            hash_fn,
            _entries: PhantomData,
        })
    }

    /// Reattaches to a table whose directory page already exists, e.g. after
    /// a restart. `directory_page_id` must come from a previous `new` and
    /// `hash_fn` must match the one the table was built with.
    pub fn open(
        pool: Arc<BufferPoolManager<D>>,
        directory_page_id: PageId,
        hash_fn: HashFunction<K>,
    ) -> Self {
        Self {
            pool,
            directory_page_id,
            table_latch: RwLock::new(()),
            hash_fn,
            _entries: PhantomData,
        }
    }

    /// Id of the directory page; hand this to `open` to find the table again.
    pub fn directory_page_id(&self) -> PageId {
        self.directory_page_id
    }

    /// Collects every value stored under `key`.
    pub fn get_value(&self, key: &K) -> Result<Vec<V>, HashTableError> {
        let _table = self.table_latch.read().unwrap();

        let dir_handle = self.pool.fetch_page(self.directory_page_id)?;
        let (_, bucket_page_id) = match self.route(&dir_handle, key) {
            Ok(routed) => routed,
            Err(error) => {
                self.release(self.directory_page_id, false);
                return Err(error);
            }
        };

        let bucket_handle = match self.pool.fetch_page(bucket_page_id) {
            Ok(handle) => handle,
            Err(error) => {
                self.release(self.directory_page_id, false);
                return Err(error.into());
            }
        };
        let values = {
            let bucket_guard = bucket_handle.read();
            BucketRef::<K, V>::new(bucket_guard.data()).get_value(key)
        };
        self.release(bucket_page_id, false);
        self.release(self.directory_page_id, false);

        Ok(values?)
    }

    /// Inserts the `(key, value)` entry.
    ///
    /// Fails with `DuplicateEntry` if the exact pair is already present, and
    /// with `DirectoryFull` if the target bucket is full and the directory
    /// cannot grow any further.
    pub fn insert(&self, key: &K, value: &V) -> Result<(), HashTableError> {
        enum FastPath {
            Inserted,
            Duplicate,
            BucketFull,
        }

        {
            let _table = self.table_latch.read().unwrap();

            let dir_handle = self.pool.fetch_page(self.directory_page_id)?;
            let (_, bucket_page_id) = match self.route(&dir_handle, key) {
                Ok(routed) => routed,
                Err(error) => {
                    self.release(self.directory_page_id, false);
                    return Err(error);
                }
            };
            let bucket_handle = match self.pool.fetch_page(bucket_page_id) {
                Ok(handle) => handle,
                Err(error) => {
                    self.release(self.directory_page_id, false);
                    return Err(error.into());
                }
            };

            let attempt = (|| -> Result<FastPath, HashTableError> {
                let mut bucket_guard = bucket_handle.write();
                let mut bucket = BucketMut::<K, V>::new(bucket_guard.data_mut());
                if bucket.is_full() {
                    return Ok(FastPath::BucketFull);
                }
                if bucket.insert(key, value)? {
                    Ok(FastPath::Inserted)
                } else {
                    Ok(FastPath::Duplicate)
                }
            })();

            match attempt {
                Ok(FastPath::Inserted) => {
                    self.release(bucket_page_id, true);
                    self.release(self.directory_page_id, false);
                    return Ok(());
                }
                Ok(FastPath::Duplicate) => {
                    self.release(bucket_page_id, false);
                    self.release(self.directory_page_id, false);
                    return Err(HashTableError::DuplicateEntry);
                }
                Ok(FastPath::BucketFull) => {
                    // Give up all latches and escalate to a split.
                    self.release(bucket_page_id, false);
                    self.release(self.directory_page_id, false);
                }
                Err(error) => {
                    self.release(bucket_page_id, false);
                    self.release(self.directory_page_id, false);
                    return Err(error);
                }
            }
        }

        self.split_insert(key, value)
    }

    /// Removes the `(key, value)` entry, merging the bucket away if the
    /// removal left it empty.
    pub fn remove(&self, key: &K, value: &V) -> Result<(), HashTableError> {
        let became_empty;
        {
            let _table = self.table_latch.read().unwrap();

            let dir_handle = self.pool.fetch_page(self.directory_page_id)?;
            let (_, bucket_page_id) = match self.route(&dir_handle, key) {
                Ok(routed) => routed,
                Err(error) => {
                    self.release(self.directory_page_id, false);
                    return Err(error);
                }
            };
            let bucket_handle = match self.pool.fetch_page(bucket_page_id) {
                Ok(handle) => handle,
                Err(error) => {
                    self.release(self.directory_page_id, false);
                    return Err(error.into());
                }
            };

            let attempt = (|| -> Result<(bool, bool), HashTableError> {
                let mut bucket_guard = bucket_handle.write();
                let mut bucket = BucketMut::<K, V>::new(bucket_guard.data_mut());
                let removed = bucket.remove(key, value)?;
                Ok((removed, bucket.is_empty()))
            })();

            match attempt {
                Ok((true, empty)) => {
                    self.release(bucket_page_id, true);
                    self.release(self.directory_page_id, false);
                    became_empty = empty;
                }
                Ok((false, _)) => {
                    self.release(bucket_page_id, false);
                    self.release(self.directory_page_id, false);
                    return Err(HashTableError::NotPresent);
                }
                Err(error) => {
                    self.release(bucket_page_id, false);
                    self.release(self.directory_page_id, false);
                    return Err(error);
                }
            }
        }

        if became_empty {
            self.merge(key)?;
        }
        Ok(())
    }

    /// Current global depth of the directory.
    pub fn global_depth(&self) -> Result<u32, HashTableError> {
        let _table = self.table_latch.read().unwrap();

        let dir_handle = self.pool.fetch_page(self.directory_page_id)?;
        let depth = {
            let dir_guard = dir_handle.read();
            DirectoryRef::new(dir_guard.data()).global_depth()
        };
        self.release(self.directory_page_id, false);
        Ok(depth?)
    }

    /// Audits the directory invariants, panicking on any violation.
    pub fn verify_integrity(&self) -> Result<(), HashTableError> {
        let _table = self.table_latch.read().unwrap();

        let dir_handle = self.pool.fetch_page(self.directory_page_id)?;
        let audit = {
            let dir_guard = dir_handle.read();
            DirectoryRef::new(dir_guard.data()).verify_integrity()
        };
        self.release(self.directory_page_id, false);
        Ok(audit?)
    }

    /// Low 32 bits of the key's hash, the part the directory routes on.
    fn hash32(&self, key: &K) -> u32 {
        self.hash_fn.hash(key) as u32
    }

    /// Resolves `key` to its directory slot and bucket page under the
    /// current global depth.
    fn route(
        &self,
        dir_handle: &PageHandle<'_>,
        key: &K,
    ) -> Result<(usize, PageId), HashTableError> {
        let dir_guard = dir_handle.read();
        let dir = DirectoryRef::new(dir_guard.data());
        let index = (self.hash32(key) & dir.global_depth_mask()?) as usize;
        let page_id = dir.bucket_page_id(index)?;
        Ok((index, page_id))
    }

    /// Slow insert path: split the target bucket until the entry fits.
    fn split_insert(&self, key: &K, value: &V) -> Result<(), HashTableError> {
        let _table = self.table_latch.write().unwrap();

        let dir_handle = self.pool.fetch_page(self.directory_page_id)?;
        let result = self.split_insert_locked(key, value, &dir_handle);
        // Any split dirtied the directory; unpinning dirty when no split
        // happened costs one redundant write-back at most.
        self.release(self.directory_page_id, true);
        result
    }

    fn split_insert_locked(
        &self,
        key: &K,
        value: &V,
        dir_handle: &PageHandle<'_>,
    ) -> Result<(), HashTableError> {
        // The fast path dropped its latches before escalating, so another
        // writer may have inserted this exact entry in between. Re-check.
        let (_, bucket_page_id) = self.route(dir_handle, key)?;
        let bucket_handle = self.pool.fetch_page(bucket_page_id)?;
        let duplicate = {
            let bucket_guard = bucket_handle.read();
            BucketRef::<K, V>::new(bucket_guard.data()).contains(key, value)
        };
        self.release(bucket_page_id, false);
        if duplicate? {
            return Err(HashTableError::DuplicateEntry);
        }

        // One split may not relieve the target bucket: every migrating entry
        // can land on the key's side again, so splits cascade until the
        // bucket has room or the directory is saturated.
        loop {
            let (_, bucket_page_id) = self.route(dir_handle, key)?;
            let bucket_handle = self.pool.fetch_page(bucket_page_id)?;

            let attempt = (|| -> Result<bool, HashTableError> {
                let mut bucket_guard = bucket_handle.write();
                let mut bucket = BucketMut::<K, V>::new(bucket_guard.data_mut());
                if bucket.is_full() {
                    return Ok(false);
                }
                if bucket.insert(key, value)? {
                    Ok(true)
                } else {
                    panic!("insert into a non-full bucket failed");
                }
            })();

            match attempt {
                Ok(true) => {
                    self.release(bucket_page_id, true);
                    return Ok(());
                }
                Ok(false) => match self.split_once(key, dir_handle, &bucket_handle) {
                    Ok(()) => self.release(bucket_page_id, true),
                    Err(error) => {
                        self.release(bucket_page_id, false);
                        return Err(error);
                    }
                },
                Err(error) => {
                    self.release(bucket_page_id, false);
                    return Err(error);
                }
            }
        }
    }

    /// Splits the key's bucket once: allocate a sibling page, repoint the
    /// directory slots on the new discriminating bit, and rehome the entries
    /// whose hash has that bit set.
    fn split_once(
        &self,
        key: &K,
        dir_handle: &PageHandle<'_>,
        bucket_handle: &PageHandle<'_>,
    ) -> Result<(), HashTableError> {
        let (bucket_index, old_local_depth, old_global_depth, directory_full) = {
            let dir_guard = dir_handle.read();
            let dir = DirectoryRef::new(dir_guard.data());
            let index = (self.hash32(key) & dir.global_depth_mask()?) as usize;
            (
                index,
                dir.local_depth(index)?,
                dir.global_depth()?,
                dir.is_full()?,
            )
        };
        if directory_full {
            return Err(HashTableError::DirectoryFull);
        }
        debug_assert!(old_global_depth >= old_local_depth);

        // Allocate before latching anything, so the pool never runs behind a
        // held page latch.
        let new_handle = self.pool.new_page()?;
        let new_page_id = new_handle.page_id();
        let old_page_id = bucket_handle.page_id();

        let result = (|| -> Result<(), HashTableError> {
            let mut dir_guard = dir_handle.write();
            let mut dir = DirectoryMut::new(dir_guard.data_mut());

            let mut global_depth = old_global_depth;
            if global_depth == old_local_depth {
                dir.incr_global_depth()?;
                global_depth += 1;
            }

            // Slots aliasing the old bucket agree on the low `old_local_depth`
            // hash bits; after the split, bit `old_local_depth` discriminates
            // between the two halves.
            let seed = self.hash32(key) & dir.as_ref().local_depth_mask(bucket_index)?;
            let local_depth = old_local_depth + 1;
            let split_bit = 1u32 << (local_depth - 1);
            remap_bucket_slots(
                &mut dir,
                old_page_id,
                seed,
                global_depth,
                local_depth,
                DepthChange::Raise,
            )?;
            remap_bucket_slots(
                &mut dir,
                new_page_id,
                seed | split_bit,
                global_depth,
                local_depth,
                DepthChange::Raise,
            )?;

            let mut old_guard = bucket_handle.write();
            let mut old_bucket = BucketMut::<K, V>::new(old_guard.data_mut());
            let mut new_guard = new_handle.write();
            let mut new_bucket = BucketMut::<K, V>::new(new_guard.data_mut());

            let mut next_slot = 0usize;
            for slot in 0..old_bucket.as_ref().capacity() {
                if !old_bucket.as_ref().is_readable(slot)? {
                    continue;
                }
                let entry_key = old_bucket.as_ref().key_at(slot)?;
                if self.hash32(&entry_key) & split_bit != 0 {
                    let entry_value = old_bucket.as_ref().value_at(slot)?;
                    old_bucket.remove_at(slot)?;
                    new_bucket.insert_at(next_slot, &entry_key, &entry_value)?;
                    next_slot += 1;
                }
            }

            tracing::debug!(
                old_page_id,
                new_page_id,
                local_depth,
                global_depth,
                moved = next_slot,
                "bucket split"
            );
            Ok(())
        })();

        self.release(new_page_id, true);
        result
    }

    /// Merges the key's bucket into its image while the bucket is empty and
    /// the depths line up, shrinking the directory whenever the whole upper
    /// half becomes redundant.
    fn merge(&self, key: &K) -> Result<(), HashTableError> {
        let _table = self.table_latch.write().unwrap();

        let dir_handle = self.pool.fetch_page(self.directory_page_id)?;
        let result = self.merge_locked(key, &dir_handle);
        self.release(self.directory_page_id, true);
        result
    }

    fn merge_locked(&self, key: &K, dir_handle: &PageHandle<'_>) -> Result<(), HashTableError> {
        loop {
            let (bucket_index, bucket_page_id, local_depth, high_bit, image_page_id, image_depth) = {
                let dir_guard = dir_handle.read();
                let dir = DirectoryRef::new(dir_guard.data());
                let bucket_index = (self.hash32(key) & dir.global_depth_mask()?) as usize;
                let local_depth = dir.local_depth(bucket_index)?;
                if local_depth == 0 {
                    // The sole bucket has no merge partner.
                    return Ok(());
                }
                let high_bit = dir.local_high_bit(bucket_index)?;
                let image_index = bucket_index ^ high_bit as usize;
                (
                    bucket_index,
                    dir.bucket_page_id(bucket_index)?,
                    local_depth,
                    high_bit,
                    dir.bucket_page_id(image_index)?,
                    dir.local_depth(image_index)?,
                )
            };

            // Merging is only sound while the bucket is still empty and the
            // image sits at the same depth.
            let bucket_handle = self.pool.fetch_page(bucket_page_id)?;
            let still_empty = {
                let bucket_guard = bucket_handle.read();
                BucketRef::<K, V>::new(bucket_guard.data()).is_empty()
            };
            self.release(bucket_page_id, false);
            if !still_empty || local_depth != image_depth {
                return Ok(());
            }

            {
                let mut dir_guard = dir_handle.write();
                let mut dir = DirectoryMut::new(dir_guard.data_mut());

                // Both alias classes collapse onto the image page at one less
                // depth.
                let mask = dir.as_ref().local_depth_mask(bucket_index)?;
                let proto = bucket_index as u32 & mask;
                let image_proto = proto ^ high_bit;
                let global_depth = dir.as_ref().global_depth()?;
                remap_bucket_slots(
                    &mut dir,
                    image_page_id,
                    proto,
                    global_depth,
                    local_depth,
                    DepthChange::Lower,
                )?;
                remap_bucket_slots(
                    &mut dir,
                    image_page_id,
                    image_proto,
                    global_depth,
                    local_depth,
                    DepthChange::Lower,
                )?;

                while dir.as_ref().can_shrink()? {
                    dir.decr_global_depth()?;
                }
            }

            // The old bucket page is orphaned and unpinned: drop it.
            self.pool.delete_page(bucket_page_id)?;
            tracing::debug!(
                merged_page_id = bucket_page_id,
                into_page_id = image_page_id,
                "bucket merge"
            );

            // The merged bucket may itself be empty with an empty image, so
            // keep going until the chain stops.
        }
    }

    /// Unpins a page this table pinned. The pin pairing is an internal
    /// invariant; a failure here is a bug, not a recoverable condition.
    fn release(&self, page_id: PageId, is_dirty: bool) {
        release_page(&self.pool, page_id, is_dirty);
    }
}

fn release_page<D: DiskManager>(pool: &BufferPoolManager<D>, page_id: PageId, is_dirty: bool) {
    pool.unpin_page(page_id, is_dirty)
        .expect("pin accounting violated");
}

/// Rewrites every directory slot in the alias class of `seed` at
/// `local_depth`: the members share the low `local_depth` hash bits and
/// range over the free bits below `global_depth`. Each slot is pointed at
/// `page_id` and gets its local depth adjusted one step.
fn remap_bucket_slots(
    dir: &mut DirectoryMut<'_>,
    page_id: PageId,
    seed: u32,
    global_depth: u32,
    local_depth: u32,
    change: DepthChange,
) -> Result<(), HashTableError> {
    let mut slots = VecDeque::from([seed]);
    for bit in local_depth..global_depth {
        for _ in 0..slots.len() {
            let index = slots.pop_front().expect("slot queue underflow");
            slots.push_back(index);
            slots.push_back(index | (1 << bit));
        }
    }

    while let Some(index) = slots.pop_front() {
        let index = index as usize;
        dir.set_bucket_page_id(index, page_id)?;
        match change {
            DepthChange::Raise => dir.incr_local_depth(index)?,
            DepthChange::Lower => dir.decr_local_depth(index)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod extendible_hash_table_tests {
    use super::*;
    use disk::in_memory_disk_manager::InMemoryDiskManager;
    use page::bucket_page::bucket_capacity;

    type TestTable = ExtendibleHashTable<u64, u64, InMemoryDiskManager>;

    /// The identity hash makes directory routing a function of the raw key,
    /// so tests can steer keys into chosen buckets.
    fn identity_hash() -> HashFunction<u64> {
        HashFunction::new(|key: &u64| *key)
    }

    fn create_table(
        pool_size: usize,
        hash_fn: HashFunction<u64>,
    ) -> (Arc<BufferPoolManager<InMemoryDiskManager>>, TestTable) {
        let pool = Arc::new(BufferPoolManager::new(
            pool_size,
            Arc::new(InMemoryDiskManager::new()),
        ));
        let table = ExtendibleHashTable::new(pool.clone(), hash_fn).unwrap();
        (pool, table)
    }

    fn sorted_values(table: &TestTable, key: u64) -> Vec<u64> {
        let mut values = table.get_value(&key).unwrap();
        values.sort_unstable();
        values
    }

    #[test]
    fn fresh_table_starts_at_depth_zero() {
        let (_pool, table) = create_table(4, identity_hash());

        assert_eq!(table.global_depth().unwrap(), 0);
        assert!(table.get_value(&1).unwrap().is_empty());
        table.verify_integrity().unwrap();
    }

    #[test]
    fn insert_then_get_round_trips() {
        let (_pool, table) = create_table(4, identity_hash());

        table.insert(&1, &100).unwrap();
        table.insert(&2, &200).unwrap();

        assert_eq!(table.get_value(&1).unwrap(), vec![100]);
        assert_eq!(table.get_value(&2).unwrap(), vec![200]);
        assert!(table.get_value(&3).unwrap().is_empty());
    }

    #[test]
    fn duplicate_key_distinct_values() {
        let (_pool, table) = create_table(4, identity_hash());

        table.insert(&1, &1).unwrap();
        table.insert(&1, &2).unwrap();
        assert_eq!(sorted_values(&table, 1), vec![1, 2]);

        assert!(matches!(
            table.insert(&1, &1),
            Err(HashTableError::DuplicateEntry)
        ));

        table.remove(&1, &1).unwrap();
        assert_eq!(sorted_values(&table, 1), vec![2]);
    }

    #[test]
    fn removing_an_absent_entry_fails() {
        let (_pool, table) = create_table(4, identity_hash());

        table.insert(&1, &10).unwrap();

        assert!(matches!(
            table.remove(&2, &20),
            Err(HashTableError::NotPresent)
        ));
        // Value must match too, not just the key.
        assert!(matches!(
            table.remove(&1, &99),
            Err(HashTableError::NotPresent)
        ));
    }

    #[test]
    fn colliding_keys_cascade_splits_until_the_bit_discriminates() {
        let (_pool, table) = create_table(8, identity_hash());
        let capacity = bucket_capacity::<u64, u64>() as u64;

        // Every key is a multiple of 8: the low three hash bits never
        // discriminate, so relieving the first full bucket takes a cascade
        // of splits down to bit 3.
        for i in 0..=capacity {
            table.insert(&(i * 8), &i).unwrap();
        }

        assert!(table.global_depth().unwrap() >= 4);
        table.verify_integrity().unwrap();
        for i in 0..=capacity {
            assert_eq!(table.get_value(&(i * 8)).unwrap(), vec![i]);
        }
    }

    #[test]
    fn removing_everything_collapses_to_one_bucket() {
        let (_pool, table) = create_table(8, identity_hash());
        let capacity = bucket_capacity::<u64, u64>() as u64;

        for i in 0..=capacity {
            table.insert(&(i * 8), &i).unwrap();
        }
        assert!(table.global_depth().unwrap() >= 4);

        for i in 0..=capacity {
            table.remove(&(i * 8), &i).unwrap();
        }

        assert_eq!(table.global_depth().unwrap(), 0);
        table.verify_integrity().unwrap();
        for i in 0..=capacity {
            assert!(table.get_value(&(i * 8)).unwrap().is_empty());
        }

        // The collapsed table still accepts inserts.
        table.insert(&5, &50).unwrap();
        assert_eq!(table.get_value(&5).unwrap(), vec![50]);
    }

    #[test]
    fn saturated_directory_rejects_the_overflowing_insert() {
        let (_pool, table) = create_table(8, identity_hash());
        let capacity = bucket_capacity::<u64, u64>() as u64;

        // Keys sharing all nine routable bits: no split ever relieves the
        // bucket, so the directory saturates and the insert fails.
        for i in 0..capacity {
            table.insert(&(i << 9), &i).unwrap();
        }
        assert!(matches!(
            table.insert(&(capacity << 9), &capacity),
            Err(HashTableError::DirectoryFull)
        ));

        assert_eq!(table.global_depth().unwrap(), 9);
        table.verify_integrity().unwrap();

        // The failed insert left the stored entries intact.
        for i in 0..capacity {
            assert_eq!(table.get_value(&(i << 9)).unwrap(), vec![i]);
        }

        // Retrying fails again, now without any splitting left to do.
        assert!(matches!(
            table.insert(&(capacity << 9), &capacity),
            Err(HashTableError::DirectoryFull)
        ));
    }

    #[test]
    fn table_larger_than_the_pool_survives_eviction() {
        let (_pool, table) = create_table(8, HashFunction::default());

        for key in 0..2000u64 {
            table.insert(&key, &(key + 1)).unwrap();
        }

        table.verify_integrity().unwrap();
        for key in 0..2000u64 {
            assert_eq!(table.get_value(&key).unwrap(), vec![key + 1]);
        }
    }

    #[test]
    fn reopen_finds_existing_entries() {
        let pool = Arc::new(BufferPoolManager::new(
            8,
            Arc::new(InMemoryDiskManager::new()),
        ));

        let directory_page_id = {
            let table: TestTable =
                ExtendibleHashTable::new(pool.clone(), HashFunction::default()).unwrap();
            for key in 0..100u64 {
                table.insert(&key, &(key * 2)).unwrap();
            }
            table.directory_page_id()
        };
        pool.flush_all().unwrap();

        let reopened: TestTable =
            ExtendibleHashTable::open(pool, directory_page_id, HashFunction::default());
        for key in 0..100u64 {
            assert_eq!(reopened.get_value(&key).unwrap(), vec![key * 2]);
        }
    }

    #[test]
    fn interleaved_inserts_and_removes_keep_the_directory_sound() {
        let (_pool, table) = create_table(8, identity_hash());
        let capacity = bucket_capacity::<u64, u64>() as u64;

        for i in 0..=capacity {
            table.insert(&(i * 8), &i).unwrap();
        }
        // Remove one half-class, re-add it, then drain everything.
        for i in (1..=capacity).step_by(2) {
            table.remove(&(i * 8), &i).unwrap();
        }
        table.verify_integrity().unwrap();
        for i in (1..=capacity).step_by(2) {
            table.insert(&(i * 8), &i).unwrap();
        }
        for i in 0..=capacity {
            table.remove(&(i * 8), &i).unwrap();
        }

        assert_eq!(table.global_depth().unwrap(), 0);
        table.verify_integrity().unwrap();
    }

    #[test]
    fn concurrent_threads_agree_on_the_final_state() {
        const THREADS: u64 = 4;
        const KEYS_PER_THREAD: u64 = 100;
        const SHARED_KEY: u64 = 7777;

        let (_pool, table) = create_table(16, HashFunction::default());

        std::thread::scope(|scope| {
            for thread_id in 0..THREADS {
                let table = &table;
                scope.spawn(move || {
                    let base = 10_000 * (thread_id + 1);

                    // Disjoint range: insert everything, read it back, then
                    // remove the lower half.
                    for key in base..base + KEYS_PER_THREAD {
                        table.insert(&key, &key).unwrap();
                    }
                    for key in base..base + KEYS_PER_THREAD {
                        assert_eq!(table.get_value(&key).unwrap(), vec![key]);
                    }
                    for key in base..base + KEYS_PER_THREAD / 2 {
                        table.remove(&key, &key).unwrap();
                    }

                    // Shared key: each thread contributes its own value.
                    table.insert(&SHARED_KEY, &thread_id).unwrap();
                });
            }
        });

        table.verify_integrity().unwrap();
        for thread_id in 0..THREADS {
            let base = 10_000 * (thread_id + 1);
            for key in base..base + KEYS_PER_THREAD / 2 {
                assert!(table.get_value(&key).unwrap().is_empty());
            }
            for key in base + KEYS_PER_THREAD / 2..base + KEYS_PER_THREAD {
                assert_eq!(table.get_value(&key).unwrap(), vec![key]);
            }
        }
        assert_eq!(sorted_values(&table, SHARED_KEY), vec![0, 1, 2, 3]);
    }

    #[test]
    fn rid_values_work_as_index_entries() {
        use page::rid::Rid;

        let pool = Arc::new(BufferPoolManager::new(
            4,
            Arc::new(InMemoryDiskManager::new()),
        ));
        let table: ExtendibleHashTable<u64, Rid, InMemoryDiskManager> =
            ExtendibleHashTable::new(pool, HashFunction::default()).unwrap();

        let rid = Rid::new(12, 3);
        table.insert(&42, &rid).unwrap();
        assert_eq!(table.get_value(&42).unwrap(), vec![rid]);

        table.remove(&42, &rid).unwrap();
        assert!(table.get_value(&42).unwrap().is_empty());
    }
}
