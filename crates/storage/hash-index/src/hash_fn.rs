use binary_helpers::fixed::FixedEncode;
use std::fmt;
use std::sync::Arc;
use xxhash_rust::xxh3::xxh3_64;

/// Hash function applied to keys before directory routing.
///
/// The default hashes the key's fixed-width encoding with XXH3; tests and
/// embedders can supply their own function, e.g. to force collisions.
pub struct HashFunction<K> {
    inner: Arc<dyn Fn(&K) -> u64 + Send + Sync>,
}

impl<K> HashFunction<K> {
    /// Wraps an arbitrary hash function.
    pub fn new(hash: impl Fn(&K) -> u64 + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(hash),
        }
    }

    /// Hashes `key` to 64 bits.
    pub fn hash(&self, key: &K) -> u64 {
        (self.inner)(key)
    }
}

impl<K> Clone for HashFunction<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> fmt::Debug for HashFunction<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashFunction")
    }
}

impl<K: FixedEncode> Default for HashFunction<K> {
    fn default() -> Self {
        Self::new(|key: &K| {
            let mut encoded = vec![0u8; K::SIZE];
            key.write_to(&mut encoded, 0)
                .expect("fixed-width key must encode into SIZE bytes");
            xxh3_64(&encoded)
        })
    }
}
