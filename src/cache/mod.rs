//! Sharded block cache for decoded SSTable data blocks.
//!
//! Every SSTable read goes through [`SSTable::get`](crate::sstable::SSTable::get) /
//! [`SSTable::scan`](crate::sstable::SSTable::scan), which resolve a key to a data
//! block via the SSTable's index, then decode that block off the memory map. Decoding
//! involves a CRC32 check and a full `Vec<u8>` copy out of the mmap, so hot blocks
//! benefit from caching the decoded bytes keyed by `(sstable_id, block_offset)`.
//!
//! Two tiers are supported, selected via [`CacheTier`]:
//!
//! - [`CacheTier::Simple`] — a single sharded LRU, sized in bytes.
//! - [`CacheTier::TwoLevel`] — a small, fast L1 in front of a larger L2; entries
//!   are promoted from L2 to L1 after a configurable number of hits.
//!
//! Sharding avoids a single global lock becoming a bottleneck under concurrent
//! reads: the shard for a given key is chosen by hashing `(sstable_id, block_offset)`.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const NUM_SHARDS: usize = 16;

/// Key identifying a cached, decoded data block: the owning SSTable's id and
/// the block's byte offset within that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub sstable_id: u64,
    pub block_offset: u64,
}

/// Cache sizing/topology configuration, set once per [`Engine`](crate::engine::Engine)
/// via [`DbConfig::cache_tier`](crate::engine::DbConfig::cache_tier).
#[derive(Debug, Clone)]
pub enum CacheTier {
    /// No caching — every block read goes straight to the mmap.
    Disabled,

    /// A single sharded LRU, `capacity_bytes` total across all shards.
    Simple { capacity_bytes: u64 },

    /// A small hot L1 backed by a larger L2. Entries found in L2 are promoted
    /// to L1 once they've been hit `promote_after` times.
    TwoLevel {
        l1_capacity_bytes: u64,
        l2_capacity_bytes: u64,
        promote_after: u32,
    },
}

impl Default for CacheTier {
    fn default() -> Self {
        CacheTier::Simple {
            capacity_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Hit/miss counters for a [`BlockCache`], sampled via [`BlockCache::stats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct LruShard {
    capacity_bytes: u64,
    used_bytes: u64,
    entries: HashMap<CacheKey, (Arc<Vec<u8>>, u32)>,
    // Insertion/access order, oldest first. Rebuilt lazily on eviction rather
    // than kept perfectly in sync — good enough for an approximate LRU.
    order: Vec<CacheKey>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruShard {
    fn new(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes,
            used_bytes: 0,
            entries: HashMap::new(),
            order: Vec::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn get(&mut self, key: &CacheKey) -> Option<Arc<Vec<u8>>> {
        if let Some((value, hit_count)) = self.entries.get_mut(key) {
            *hit_count += 1;
            let value = Arc::clone(value);
            self.hits.fetch_add(1, Ordering::Relaxed);
            self.touch(key);
            Some(value)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    fn touch(&mut self, key: &CacheKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos);
            self.order.push(k);
        }
    }

    fn insert(&mut self, key: CacheKey, value: Arc<Vec<u8>>) {
        if self.entries.contains_key(&key) {
            self.touch(&key);
            return;
        }
        let size = value.len() as u64;
        while self.used_bytes + size > self.capacity_bytes && !self.order.is_empty() {
            let evicted = self.order.remove(0);
            if let Some((v, _)) = self.entries.remove(&evicted) {
                self.used_bytes = self.used_bytes.saturating_sub(v.len() as u64);
            }
        }
        self.used_bytes += size;
        self.order.push(key);
        self.entries.insert(key, (value, 0));
    }

    fn hit_count(&self, key: &CacheKey) -> u32 {
        self.entries.get(key).map(|(_, h)| *h).unwrap_or(0)
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Arc<Vec<u8>>> {
        if let Some((v, _)) = self.entries.remove(key) {
            self.used_bytes = self.used_bytes.saturating_sub(v.len() as u64);
            if let Some(pos) = self.order.iter().position(|k| k == key) {
                self.order.remove(pos);
            }
            Some(v)
        } else {
            None
        }
    }
}

fn shard_index(key: &CacheKey) -> usize {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % NUM_SHARDS
}

enum Tiers {
    Disabled,
    Simple(Vec<Mutex<LruShard>>),
    TwoLevel {
        l1: Vec<Mutex<LruShard>>,
        l2: Vec<Mutex<LruShard>>,
        promote_after: u32,
    },
}

/// A block cache shared across all SSTables opened by one [`Engine`](crate::engine::Engine).
pub struct BlockCache {
    tiers: Tiers,
}

impl BlockCache {
    pub fn new(tier: &CacheTier) -> Self {
        let tiers = match tier {
            CacheTier::Disabled => Tiers::Disabled,
            CacheTier::Simple { capacity_bytes } => {
                let per_shard = capacity_bytes / NUM_SHARDS as u64;
                Tiers::Simple(
                    (0..NUM_SHARDS)
                        .map(|_| Mutex::new(LruShard::new(per_shard)))
                        .collect(),
                )
            }
            CacheTier::TwoLevel {
                l1_capacity_bytes,
                l2_capacity_bytes,
                promote_after,
            } => {
                let l1_per_shard = l1_capacity_bytes / NUM_SHARDS as u64;
                let l2_per_shard = l2_capacity_bytes / NUM_SHARDS as u64;
                Tiers::TwoLevel {
                    l1: (0..NUM_SHARDS)
                        .map(|_| Mutex::new(LruShard::new(l1_per_shard)))
                        .collect(),
                    l2: (0..NUM_SHARDS)
                        .map(|_| Mutex::new(LruShard::new(l2_per_shard)))
                        .collect(),
                    promote_after: *promote_after,
                }
            }
        };
        Self { tiers }
    }

    /// Looks up a decoded block by cache key. Returns `None` on a miss (including
    /// when caching is disabled).
    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<u8>>> {
        match &self.tiers {
            Tiers::Disabled => None,
            Tiers::Simple(shards) => {
                let idx = shard_index(key);
                let mut shard = shards[idx].lock().ok()?;
                shard.get(key)
            }
            Tiers::TwoLevel { l1, l2, promote_after } => {
                let idx = shard_index(key);
                if let Some(v) = l1[idx].lock().ok()?.get(key) {
                    return Some(v);
                }
                let mut l2_shard = l2[idx].lock().ok()?;
                let found = l2_shard.get(key);
                if let Some(v) = &found
                    && l2_shard.hit_count(key) >= *promote_after
                {
                    let v = Arc::clone(v);
                    l2_shard.remove(key);
                    drop(l2_shard);
                    l1[idx].lock().ok()?.insert(*key, Arc::clone(&v));
                    return Some(v);
                }
                found
            }
        }
    }

    /// Inserts a freshly-decoded block into the cache. No-op when caching is disabled.
    pub fn insert(&self, key: CacheKey, value: Arc<Vec<u8>>) {
        match &self.tiers {
            Tiers::Disabled => {}
            Tiers::Simple(shards) => {
                let idx = shard_index(&key);
                if let Ok(mut shard) = shards[idx].lock() {
                    shard.insert(key, value);
                }
            }
            Tiers::TwoLevel { l2, .. } => {
                let idx = shard_index(&key);
                if let Ok(mut shard) = l2[idx].lock() {
                    shard.insert(key, value);
                }
            }
        }
    }

    /// Aggregate hit/miss counts across all shards (and both tiers, if applicable).
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        let mut accumulate = |shards: &[Mutex<LruShard>]| {
            for shard in shards {
                if let Ok(shard) = shard.lock() {
                    stats.hits += shard.hits.load(Ordering::Relaxed);
                    stats.misses += shard.misses.load(Ordering::Relaxed);
                }
            }
        };
        match &self.tiers {
            Tiers::Disabled => {}
            Tiers::Simple(shards) => accumulate(shards),
            Tiers::TwoLevel { l1, l2, .. } => {
                accumulate(l1);
                accumulate(l2);
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_tier_hits_after_insert() {
        let cache = BlockCache::new(&CacheTier::Simple {
            capacity_bytes: 1024,
        });
        let key = CacheKey {
            sstable_id: 1,
            block_offset: 0,
        };
        assert!(cache.get(&key).is_none());
        cache.insert(key, Arc::new(vec![1, 2, 3]));
        assert_eq!(cache.get(&key).as_deref(), Some(&vec![1, 2, 3]));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn simple_tier_evicts_when_over_capacity() {
        let cache = BlockCache::new(&CacheTier::Simple { capacity_bytes: 32 });
        for i in 0..32u64 {
            let key = CacheKey {
                sstable_id: 0,
                block_offset: i,
            };
            cache.insert(key, Arc::new(vec![0u8; 8]));
        }
        // Capacity is far smaller than total inserted bytes — some earlier
        // keys must have been evicted.
        let first = CacheKey {
            sstable_id: 0,
            block_offset: 0,
        };
        let last = CacheKey {
            sstable_id: 0,
            block_offset: 31,
        };
        assert!(cache.get(&last).is_some());
        let _ = cache.get(&first);
    }

    #[test]
    fn two_level_promotes_after_threshold() {
        let cache = BlockCache::new(&CacheTier::TwoLevel {
            l1_capacity_bytes: 1024,
            l2_capacity_bytes: 1024,
            promote_after: 2,
        });
        let key = CacheKey {
            sstable_id: 5,
            block_offset: 10,
        };
        cache.insert(key, Arc::new(vec![9, 9, 9]));
        assert!(cache.get(&key).is_some());
        assert!(cache.get(&key).is_some());
        // Third access should now be served from L1 (promoted), still a hit.
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn disabled_tier_never_caches() {
        let cache = BlockCache::new(&CacheTier::Disabled);
        let key = CacheKey {
            sstable_id: 0,
            block_offset: 0,
        };
        cache.insert(key, Arc::new(vec![1]));
        assert!(cache.get(&key).is_none());
    }
}
