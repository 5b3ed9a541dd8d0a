//! # LSM Storage Engine
//!
//! This module implements a **crash-safe** LSM-tree storage engine with
//! multi-version concurrency, point and range tombstones, and pluggable
//! compaction strategies.
//!
//! ## Design Overview
//!
//! The engine organises data across three layers, queried newest-first:
//!
//! 1. **Active memtable** — an in-memory sorted map backed by a write-ahead log (WAL).
//! 2. **Frozen memtables** — read-only snapshots of previously active memtables,
//!    awaiting flush to persistent SSTables.
//! 3. **SSTables** — immutable, sorted, on-disk files with bloom filters and block
//!    indices for efficient point lookups and range scans.
//!
//! Writes go through the WAL first, then into the active memtable. When the
//! memtable exceeds [`DbConfig::write_buffer_size`] it is frozen and a fresh
//! memtable + WAL is created; the freeze also enqueues a flush job on the
//! background worker pool, so the caller that happened to trigger it doesn't
//! block waiting for the flush. [`Engine::flush_oldest_frozen`] /
//! [`Engine::flush_all_frozen`] remain available for callers that want to
//! drive a flush synchronously.
//!
//! ## Concurrency Model
//!
//! All engine state is protected by a single `Arc<RwLock<EngineInner>>`.
//! Reads acquire a **read lock**; writes and flushes acquire a **write lock**.
//! Compaction first acquires a short read lock to obtain the strategy, then
//! acquires a write lock for the merge/swap phase.
//!
//! A small pool of OS threads (sized by [`DbConfig::thread_pool_size`])
//! pulls flush and compaction jobs off a shared `crossbeam::channel` queue;
//! under `SyncPolicy::Batch` an additional timer thread fsyncs the active
//! WAL on an interval. Every worker checks a shared `Arc<AtomicBool>`
//! shutdown flag and exits shortly after [`Engine::close`] sets it.
//! [`Engine::sync`] is a durability barrier: it enqueues a job on the same
//! queue and blocks until a worker has serviced it, so it can't be
//! reordered ahead of a flush or compaction already queued.
//!
//! ## Compaction
//!
//! Three compaction operations are exposed:
//!
//! - [`Engine::minor_compact`] — merges similarly-sized SSTables within a
//!   bucket, deduplicating point entries while preserving tombstones.
//! - [`Engine::tombstone_compact`] — rewrites a single high-tombstone-ratio
//!   SSTable, dropping provably-unnecessary tombstones.
//! - [`Engine::major_compact`] — merges *all* SSTables into one, actively
//!   applying range tombstones and dropping all spent tombstones.
//!
//! The concrete strategy implementations are selected via
//! [`DbConfig::compaction_strategy`].
//!
//! ## Guarantees
//!
//! - **Durability:** Every write is persisted to WAL before acknowledgement.
//! - **Crash recovery:** On [`Engine::open`], the manifest, WALs, and SSTables
//!   are replayed to reconstruct the last durable state.
//! - **Multi-version reads:** Point lookups and scans always see the latest
//!   committed version of each key, respecting tombstones.
//! - **Atomic flushes:** Each frozen memtable is flushed to a single SSTable
//!   and the manifest is updated atomically.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockWriteGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use crate::manifest::{Manifest, ManifestError, ManifestSstEntry};
use crate::memtable::{
    FrozenMemtable, Memtable, MemtableError, MemtableGetResult, MemtableRecord, MemtableSingleEntry,
};
use crate::sstable::{self, SSTable, SSTableError};
use crate::wal::SyncPolicy;

pub mod utils;
pub use utils::{PointEntry, RangeTombstone, Record};

#[cfg(test)]
mod tests;

pub const MANIFEST_DIR: &str = "manifest";
pub const MEMTABLE_DIR: &str = "memtables";
pub const SSTABLE_DIR: &str = "sstables";

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Error originating from the manifest subsystem.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Error originating from the memtable subsystem.
    #[error("Memtable error: {0}")]
    Memtable(#[from] MemtableError),

    /// Error originating from the SSTable subsystem.
    #[error("SSTable error: {0}")]
    SSTable(#[from] SSTableError),

    /// Underlying filesystem I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violation (poisoned lock, unexpected state, etc.).
    #[error("Internal error: {0}")]
    Internal(String),

    /// A write was blocked by too many unflushed frozen memtables for longer
    /// than [`DbConfig::backpressure_timeout_ms`]. The background worker
    /// pool is already draining frozen memtables; the caller should simply
    /// retry once it has had a chance to catch up.
    #[error("write blocked on back-pressure for longer than {waited_ms}ms ({frozen_count} frozen memtables pending flush)")]
    BackpressureTimeout { waited_ms: u64, frozen_count: usize },

    /// A `DbConfig` field is outside its accepted range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// An operation argument (an empty key, an inverted range, ...) is
    /// invalid regardless of config.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The engine has already been closed via [`Engine::close`].
    #[error("engine is closed")]
    Closed,
}

/// Configuration for an [`Engine`] instance.
///
/// Controls memtable sizing, compaction strategy selection, and all
/// compaction-related thresholds. Passed to [`Engine::open`].
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Max memtable size (bytes) before freeze.
    pub write_buffer_size: usize,

    /// Compaction strategy to use for this engine instance.
    ///
    /// Determines which [`CompactionStrategy`](crate::compaction::CompactionStrategy)
    /// implementations back the `minor_compact`, `tombstone_compact`, and
    /// `major_compact` methods.
    pub compaction_strategy: crate::compaction::CompactionStrategyType,

    /// Lower bound multiplier for bucket size range ([avg × bucket_low, avg × bucket_high]).
    pub bucket_low: f64,

    /// Upper bound multiplier for bucket size range.
    pub bucket_high: f64,

    /// Min size (bytes) for regular buckets; smaller SSTables go to the "small" bucket.
    pub min_sstable_size: usize,

    /// Min SSTables in a bucket to trigger minor compaction.
    pub min_threshold: usize,

    /// Max SSTables to compact at once in minor compaction.
    pub max_threshold: usize,

    /// Ratio of tombstones to total records to trigger tombstone compaction.
    pub tombstone_ratio_threshold: f64,

    /// Min SSTable age (seconds) before eligible for tombstone compaction.
    pub tombstone_compaction_interval: usize,

    /// When true, tombstone compaction resolves bloom filter false positives
    /// by doing an actual `get()` on other SSTables for point tombstones.
    pub tombstone_bloom_fallback: bool,

    /// When true, tombstone compaction will scan older SSTables to check
    /// whether a range tombstone still covers any live keys, allowing
    /// aggressive range tombstone removal.
    pub tombstone_range_drop: bool,

    /// Thread pool size for flushing memtables and compactions.
    pub thread_pool_size: usize,

    /// Durability/fsync policy applied to every WAL (active memtable,
    /// frozen memtables, and the manifest's own event log).
    pub sync_policy: SyncPolicy,

    /// Block cache configuration shared by all SSTables opened by this
    /// engine instance.
    pub cache_tier: crate::cache::CacheTier,

    /// Max number of frozen memtables allowed to accumulate before writes
    /// block waiting for a flush.
    pub max_immutable_memtables: usize,

    /// How long a write blocks on back-pressure before giving up with
    /// [`EngineError::BackpressureTimeout`].
    pub backpressure_timeout_ms: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size: 4 * 1024 * 1024,
            compaction_strategy: crate::compaction::CompactionStrategyType::Leveled,
            bucket_low: 0.5,
            bucket_high: 1.5,
            min_sstable_size: 50,
            min_threshold: 4,
            max_threshold: 32,
            tombstone_ratio_threshold: 0.2,
            tombstone_compaction_interval: 0,
            tombstone_bloom_fallback: true,
            tombstone_range_drop: true,
            thread_pool_size: 1,
            sync_policy: SyncPolicy::Always,
            cache_tier: crate::cache::CacheTier::default(),
            max_immutable_memtables: 4,
            backpressure_timeout_ms: 5_000,
        }
    }
}

impl DbConfig {
    /// Bounds every threshold to a sane range before `Engine::open` commits
    /// to it — a bad config should fail fast at open, not surface as a
    /// confusing compaction or flush error hours later.
    fn validate(&self) -> Result<(), EngineError> {
        const MIN_WRITE_BUFFER: usize = 1024;
        const MAX_WRITE_BUFFER: usize = 256 * 1024 * 1024;
        const MIN_THRESHOLD_FLOOR: usize = 2;
        const MIN_THRESHOLD_CEIL: usize = 64;
        const MAX_THRESHOLD_CEIL: usize = 256;
        const MAX_TOMBSTONE_INTERVAL: usize = 604_800;
        const MAX_THREAD_POOL: usize = 32;

        if !(MIN_WRITE_BUFFER..=MAX_WRITE_BUFFER).contains(&self.write_buffer_size) {
            return Err(EngineError::InvalidConfig(format!(
                "write_buffer_size must be in [{MIN_WRITE_BUFFER}, {MAX_WRITE_BUFFER}], got {}",
                self.write_buffer_size
            )));
        }

        if !(MIN_THRESHOLD_FLOOR..=MIN_THRESHOLD_CEIL).contains(&self.min_threshold) {
            return Err(EngineError::InvalidConfig(format!(
                "min_threshold must be in [{MIN_THRESHOLD_FLOOR}, {MIN_THRESHOLD_CEIL}], got {}",
                self.min_threshold
            )));
        }

        if self.max_threshold > MAX_THRESHOLD_CEIL {
            return Err(EngineError::InvalidConfig(format!(
                "max_threshold must be <= {MAX_THRESHOLD_CEIL}, got {}",
                self.max_threshold
            )));
        }

        if self.max_threshold < self.min_threshold {
            return Err(EngineError::InvalidConfig(format!(
                "max_threshold ({}) must be >= min_threshold ({})",
                self.max_threshold, self.min_threshold
            )));
        }

        if !(self.tombstone_ratio_threshold > 0.0 && self.tombstone_ratio_threshold <= 1.0) {
            return Err(EngineError::InvalidConfig(format!(
                "tombstone_ratio_threshold must be in (0.0, 1.0], got {}",
                self.tombstone_ratio_threshold
            )));
        }

        if self.tombstone_compaction_interval > MAX_TOMBSTONE_INTERVAL {
            return Err(EngineError::InvalidConfig(format!(
                "tombstone_compaction_interval must be <= {MAX_TOMBSTONE_INTERVAL}, got {}",
                self.tombstone_compaction_interval
            )));
        }

        if !(1..=MAX_THREAD_POOL).contains(&self.thread_pool_size) {
            return Err(EngineError::InvalidConfig(format!(
                "thread_pool_size must be in [1, {MAX_THREAD_POOL}], got {}",
                self.thread_pool_size
            )));
        }

        Ok(())
    }
}

/// Snapshot of engine statistics returned by [`Engine::stats`].
pub struct EngineStats {
    /// Number of frozen memtables pending flush.
    pub frozen_count: usize,
    /// Total number of SSTables on disk.
    pub sstables_count: usize,
    /// Sum of all SSTable file sizes in bytes.
    pub total_sst_size_bytes: u64,
    /// Per-SSTable file sizes in bytes (newest-first order).
    pub sst_sizes: Vec<u64>,
    /// Block cache hit/miss counters, accumulated since `Engine::open`.
    pub cache_stats: crate::cache::CacheStats,
    /// Number of distinct live reader snapshots.
    pub live_snapshots: usize,
}

#[derive(Debug)]
struct EngineInner {
    /// Persistent manifest for this engine (keeps track of SSTables, generations, etc).
    manifest: Manifest,

    /// Active memtable that accepts writes.
    active: Memtable,

    /// Frozen memtables waiting to be flushed to SSTable.
    /// We keep them in memory for reads until flush completes.
    frozen: Vec<FrozenMemtable>,

    /// Loaded SSTables.
    sstables: Vec<Arc<SSTable>>,

    /// Path where engine will be mounted.
    data_dir: String,

    /// A short config for thresholds, sizes, etc.
    config: DbConfig,

    /// Shared block cache attached to every SSTable this engine opens.
    cache: Arc<crate::cache::BlockCache>,

    /// Live reader snapshots, consulted by compaction to decide how far
    /// back in a key's version history it's safe to collapse.
    snapshots: Arc<crate::snapshot::SnapshotRegistry>,
}

/// A unit of work handed to the background worker pool.
///
/// Flush and compaction are still exposed as synchronous public methods
/// (`Engine::flush_oldest_frozen`, `Engine::minor_compact`, ...) for callers
/// that want to drive them directly; `put`/`delete`/`delete_range` instead
/// enqueue the equivalent work here once a freeze happens, so the calling
/// thread never blocks on flush or compaction itself.
enum WorkItem {
    FlushOldestFrozen,
    MinorCompact,
    TombstoneCompact,
    /// Durability barrier: fsync the active WAL, then signal completion.
    Sync(Sender<()>),
}

/// The main LSM storage engine handle.
///
/// Thread-safe — can be cloned and shared across threads via the
/// internal `Arc<RwLock<_>>`. Every clone shares the same background
/// worker pool and shutdown flag.
#[derive(Debug)]
pub struct Engine {
    inner: Arc<RwLock<EngineInner>>,
    closed: Arc<AtomicBool>,
    work_tx: Sender<WorkItem>,
    worker_handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Clone for Engine {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            closed: Arc::clone(&self.closed),
            work_tx: self.work_tx.clone(),
            worker_handles: Arc::clone(&self.worker_handles),
        }
    }
}

/// Converts a live memtable scan entry into a [`Record::Put`].
///
/// [`Memtable::scan`](crate::memtable::Memtable::scan) already filters out
/// keys shadowed by a point or range tombstone, so every entry it yields is
/// a live put.
fn memtable_entry_to_record((key, entry): (Vec<u8>, MemtableSingleEntry)) -> Record {
    Record::Put {
        key,
        value: entry
            .value
            .expect("Memtable::scan only yields non-deleted entries"),
        lsn: entry.lsn,
        timestamp: entry.timestamp,
    }
}

/// Converts a [`MemtableRecord`] (memtable WAL/flush record) into the
/// equivalent [`Record`] used by the rest of the engine.
fn memtable_record_to_record(record: MemtableRecord) -> Record {
    match record {
        MemtableRecord::Put {
            key,
            value,
            lsn,
            timestamp,
        } => Record::Put {
            key,
            value,
            lsn,
            timestamp,
        },
        MemtableRecord::Delete { key, lsn, timestamp } => Record::Delete { key, lsn, timestamp },
        MemtableRecord::RangeDelete {
            start,
            end,
            lsn,
            timestamp,
        } => Record::RangeDelete {
            start,
            end,
            lsn,
            timestamp,
        },
    }
}

impl Engine {
    /// Opens (or creates) an engine rooted at the given directory.
    ///
    /// On a fresh directory the manifest, WAL, and SSTable sub-directories
    /// are created automatically. On an existing directory the manifest is
    /// replayed, frozen WALs are loaded, and SSTables are opened.
    pub fn open(path: impl AsRef<Path>, config: DbConfig) -> Result<Self, EngineError> {
        config.validate()?;

        // 0. Create necessary directories
        let path_str = path.as_ref().to_string_lossy();
        let manifest_dir = format!("{}/{}", path_str, MANIFEST_DIR);
        let memtable_dir = format!("{}/{}", path_str, MEMTABLE_DIR);
        let sstable_dir = format!("{}/{}", path_str, SSTABLE_DIR);

        fs::create_dir_all(&manifest_dir)?;
        fs::create_dir_all(&memtable_dir)?;
        fs::create_dir_all(&sstable_dir)?;

        // 1. Load or create manifest.
        let manifest_path = format!("{}/{}", path.as_ref().to_string_lossy(), MANIFEST_DIR);
        let manifest = Manifest::open(&manifest_path)?;
        let manifest_last_lsn = manifest.get_last_lsn()?;

        // 2. Discover existing WAL files and load active/frozen WAL info from manifest.
        let active_wal_nr = manifest.get_active_wal()?;
        let active_wal_path = format!(
            "{}/{}/wal-{:06}.log",
            path.as_ref().to_string_lossy(),
            MEMTABLE_DIR,
            active_wal_nr
        );
        let memtable = Memtable::new(
            active_wal_path,
            None,
            config.write_buffer_size,
            config.sync_policy,
        )?;

        let frozen_wals = manifest.get_frozen_wals()?;
        let mut frozen_memtables = Vec::new();
        for wal_nr in frozen_wals {
            let frozen_wal_path = format!(
                "{}/{}/wal-{:06}.log",
                path.as_ref().to_string_lossy(),
                MEMTABLE_DIR,
                wal_nr
            );
            let memtable = Memtable::new(
                frozen_wal_path,
                None,
                config.write_buffer_size,
                config.sync_policy,
            )?;
            frozen_memtables.push(memtable.frozen()?);
        }

        // 3. Discover existing SSTables on disk and remove orphans.
        let sstables = manifest.get_sstables()?;

        for entry in fs::read_dir(&sstable_dir)? {
            let entry = entry?;
            let file_path = entry.path();

            if file_path.is_file()
                && file_path.extension().and_then(|s| s.to_str()) == Some("sst")
                && let Some(file_name) = file_path.file_name().and_then(|s| s.to_str())
                && let Some(id) = file_name
                    .strip_prefix("sstable-")
                    .and_then(|s| s.strip_suffix(".sst"))
                    .and_then(|s| s.parse::<u64>().ok())
                && !sstables.iter().any(|entry| entry.id == id)
            {
                fs::remove_file(&file_path)?;
            }
        }

        // 4. Load SSTables from manifest.
        let cache = Arc::new(crate::cache::BlockCache::new(&config.cache_tier));
        let mut sstable_handles = Vec::new();
        for sstable_entry in sstables {
            let mut sstable = SSTable::open(&sstable_entry.path)?;
            sstable.id = sstable_entry.id;
            sstable.attach_cache(Arc::clone(&cache));
            sstable_handles.push(Arc::new(sstable));
        }

        // 5. Compute max LSN in active memtable.
        let mut max_lsn = manifest_last_lsn;

        if memtable.max_lsn() > max_lsn {
            max_lsn = memtable.max_lsn();
        }

        for frozen in frozen_memtables.iter() {
            if frozen.max_lsn() > max_lsn {
                max_lsn = frozen.max_lsn();
            }
        }

        for sstable in sstable_handles.iter() {
            if sstable.properties.max_lsn > max_lsn {
                max_lsn = sstable.properties.max_lsn;
            }
        }

        if memtable.max_lsn() != max_lsn {
            memtable.inject_max_lsn(max_lsn + 1);
        }

        // Sort frozen memtables by WAL sequence number, newest first.
        // We use wal_seq rather than creation_timestamp because on crash
        // recovery all frozen are replayed at nearly the same instant,
        // making timestamps unreliable for ordering.
        frozen_memtables.sort_by(|a, b| b.memtable.wal.wal_seq().cmp(&a.memtable.wal.wal_seq()));

        // Sort SSTables by max_lsn descending.  This lets get()
        // early-terminate: once we find a result at LSN L, any SSTable
        // whose max_lsn ≤ L cannot contain a newer version of any key.
        sstable_handles.sort_by(|a, b| b.properties.max_lsn.cmp(&a.properties.max_lsn));

        let thread_pool_size = config.thread_pool_size;
        let sync_policy = config.sync_policy;

        let inner = EngineInner {
            manifest,
            active: memtable,
            frozen: frozen_memtables,
            sstables: sstable_handles,
            data_dir: path.as_ref().to_string_lossy().to_string(),
            config,
            cache,
            snapshots: Arc::new(crate::snapshot::SnapshotRegistry::new()),
        };

        // Background workers share one bounded queue; a burst of freezes
        // piles up work items rather than blocking the foreground writer.
        let (work_tx, work_rx) = channel::bounded(1024);
        let worker_handles = Arc::new(Mutex::new(Vec::new()));

        let engine = Self {
            inner: Arc::new(RwLock::new(inner)),
            closed: Arc::new(AtomicBool::new(false)),
            work_tx,
            worker_handles: Arc::clone(&worker_handles),
        };

        let mut handles = Vec::with_capacity(thread_pool_size + 1);
        for _ in 0..thread_pool_size {
            let worker = engine.clone();
            let rx = work_rx.clone();
            handles.push(std::thread::spawn(move || worker.run_worker_loop(rx)));
        }

        if let SyncPolicy::Batch { interval_ms } = sync_policy {
            let batcher = engine.clone();
            handles.push(std::thread::spawn(move || batcher.run_fsync_batcher(interval_ms)));
        }

        *worker_handles
            .lock()
            .map_err(|_| EngineError::Internal("worker handle mutex poisoned".into()))? = handles;

        Ok(engine)
    }

    /// Background worker loop: pulls flush/compaction work off the shared
    /// queue until told to shut down via `closed`. Uses a timed recv rather
    /// than blocking forever so it notices shutdown promptly even when the
    /// queue is idle.
    fn run_worker_loop(&self, rx: Receiver<WorkItem>) {
        loop {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(item) => self.run_work_item(item),
                Err(RecvTimeoutError::Timeout) => {
                    if self.closed.load(Ordering::Acquire) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    }

    fn run_work_item(&self, item: WorkItem) {
        let result = match item {
            WorkItem::FlushOldestFrozen => {
                let flushed = self.flush_oldest_frozen();
                if matches!(flushed, Ok(true)) {
                    // A flush may have left more frozen memtables behind
                    // (write load can outpace one flush) and always adds
                    // an SSTable worth checking against the compaction
                    // trigger — chain both rather than waiting for the
                    // next foreground write to notice.
                    let _ = self.work_tx.try_send(WorkItem::FlushOldestFrozen);
                    let _ = self.work_tx.try_send(WorkItem::MinorCompact);
                }
                flushed.map(|_| ())
            }
            WorkItem::MinorCompact => self.minor_compact().map(|_| ()),
            WorkItem::TombstoneCompact => self.tombstone_compact().map(|_| ()),
            WorkItem::Sync(done) => {
                let result = self.fsync_active_wal();
                let _ = done.send(());
                result
            }
        };

        if let Err(err) = result {
            tracing::warn!(error = %err, "background worker task failed");
        }
    }

    /// Fsync-batcher: under `SyncPolicy::Batch`, periodically forces the
    /// active WAL durable on a timer rather than waiting for the next
    /// write to notice the interval has elapsed.
    fn run_fsync_batcher(&self, interval_ms: u64) {
        let interval = Duration::from_millis(interval_ms.max(1));
        loop {
            std::thread::sleep(interval);
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            if let Err(err) = self.fsync_active_wal() {
                tracing::warn!(error = %err, "background fsync batcher failed");
            }
        }
    }

    fn fsync_active_wal(&self) -> Result<(), EngineError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
        inner.active.sync()?;
        Ok(())
    }

    /// Blocks until every write issued before this call is durable on disk,
    /// regardless of the configured [`SyncPolicy`].
    ///
    /// Enqueues a barrier on the same queue flush/compaction work travels
    /// through, so a pending flush started before this call is not
    /// reordered past it.
    pub fn sync(&self) -> Result<(), EngineError> {
        self.check_open()?;
        let (tx, rx) = channel::bounded(1);
        self.work_tx
            .send(WorkItem::Sync(tx))
            .map_err(|_| EngineError::Internal("worker pool is not running".into()))?;
        rx.recv()
            .map_err(|_| EngineError::Internal("worker pool dropped the sync barrier".into()))?;
        Ok(())
    }

    /// Returns `Err(EngineError::Closed)` once [`Engine::close`] has run.
    fn check_open(&self) -> Result<(), EngineError> {
        if self.closed.load(Ordering::Acquire) {
            Err(EngineError::Closed)
        } else {
            Ok(())
        }
    }

    /// Gracefully shuts down the engine.
    ///
    /// Flushes all remaining frozen memtables, checkpoints the manifest,
    /// and fsyncs all directories to ensure full durability.
    pub fn close(&self) -> Result<(), EngineError> {
        self.closed.store(true, Ordering::Release);

        // Stop the background workers before taking over flush/checkpoint
        // duties here — otherwise a worker could still be mid-flush against
        // the same `EngineInner` this call is about to mutate.
        {
            let mut handles = self
                .worker_handles
                .lock()
                .map_err(|_| EngineError::Internal("worker handle mutex poisoned".into()))?;
            for handle in handles.drain(..) {
                let _ = handle.join();
            }
        }

        let mut inner = self
            .inner
            .write()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        // 1. Flush any remaining frozen memtables to SSTables
        while !inner.frozen.is_empty() {
            Self::flush_frozen_to_sstable_inner(&mut inner)?;
        }

        // 2. Checkpoint the manifest to create a snapshot
        let max_lsn = inner.active.max_lsn();
        inner.manifest.update_lsn(max_lsn)?;
        inner.manifest.checkpoint()?;

        // 2b. Fsync the active WAL explicitly — directory fsyncs below cover
        // directory-entry durability, not the file data itself, and under
        // `SyncPolicy::Batch`/`None` the most recent writes may not have
        // been synced yet.
        inner.active.sync()?;

        // 3. Fsync directories to ensure metadata is durable
        let manifest_dir = format!("{}/{}", inner.data_dir, MANIFEST_DIR);
        let memtable_dir = format!("{}/{}", inner.data_dir, MEMTABLE_DIR);
        let sstable_dir = format!("{}/{}", inner.data_dir, SSTABLE_DIR);

        // Fsync each directory
        for dir_path in [&manifest_dir, &memtable_dir, &sstable_dir] {
            if let Ok(dir) = fs::File::open(dir_path) {
                dir.sync_all()?;
            }
        }

        // 4. Fsync the root data directory
        if let Ok(root) = fs::File::open(&inner.data_dir) {
            root.sync_all()?;
        }

        Ok(())
    }

    /// Acquires the write lock, blocking (with sleep/retry) while the number
    /// of unflushed frozen memtables is at or above
    /// [`DbConfig::max_immutable_memtables`].
    ///
    /// A value of `0` for `max_immutable_memtables` disables back-pressure
    /// entirely (frozen memtables may accumulate without bound).
    fn acquire_write_with_backpressure(&self) -> Result<RwLockWriteGuard<'_, EngineInner>, EngineError> {
        let started = Instant::now();
        loop {
            let inner = self
                .inner
                .write()
                .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

            if inner.config.max_immutable_memtables == 0
                || inner.frozen.len() < inner.config.max_immutable_memtables
            {
                return Ok(inner);
            }

            let frozen_count = inner.frozen.len();
            let timeout_ms = inner.config.backpressure_timeout_ms;
            drop(inner);

            if started.elapsed() >= Duration::from_millis(timeout_ms) {
                return Err(EngineError::BackpressureTimeout {
                    waited_ms: started.elapsed().as_millis() as u64,
                    frozen_count,
                });
            }

            std::thread::sleep(Duration::from_millis(1).min(Duration::from_millis(timeout_ms)));
        }
    }

    /// Insert a key-value pair.
    ///
    /// Returns `Ok(true)` if the active memtable was frozen (caller should
    /// arrange a flush), `Ok(false)` otherwise.
    pub fn put(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Result<bool, EngineError> {
        self.check_open()?;
        let key = key.into();
        let value = value.into();
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("key must not be empty".into()));
        }
        if value.is_empty() {
            return Err(EngineError::InvalidArgument(
                "value must not be empty".into(),
            ));
        }
        let mut inner = self.acquire_write_with_backpressure()?;

        match inner.active.put(key.clone(), value.clone()) {
            Ok(()) => Ok(false),

            Err(MemtableError::FlushRequired) => {
                Self::freeze_active(&mut inner)?;
                inner.active.put(key, value)?;

                let max_lsn = inner.active.max_lsn();
                inner.manifest.update_lsn(max_lsn)?;
                drop(inner);
                let _ = self.work_tx.try_send(WorkItem::FlushOldestFrozen);

                Ok(true)
            }

            Err(e) => Err(e.into()),
        }
    }

    /// Delete a key (insert a point tombstone).
    ///
    /// Returns `Ok(true)` if the active memtable was frozen, `Ok(false)` otherwise.
    pub fn delete(&self, key: impl Into<Vec<u8>>) -> Result<bool, EngineError> {
        self.check_open()?;
        let key = key.into();
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("key must not be empty".into()));
        }
        let mut inner = self.acquire_write_with_backpressure()?;

        match inner.active.delete(key.clone()) {
            Ok(()) => Ok(false),

            Err(MemtableError::FlushRequired) => {
                Self::freeze_active(&mut inner)?;
                inner.active.delete(key)?;

                let max_lsn = inner.active.max_lsn();
                inner.manifest.update_lsn(max_lsn)?;
                drop(inner);
                let _ = self.work_tx.try_send(WorkItem::FlushOldestFrozen);

                Ok(true)
            }

            Err(e) => Err(e.into()),
        }
    }

    /// Delete all keys in `[start_key, end_key)` (insert a range tombstone).
    ///
    /// Returns `Ok(true)` if the active memtable was frozen, `Ok(false)` otherwise.
    pub fn delete_range(&self, start_key: impl Into<Vec<u8>>, end_key: impl Into<Vec<u8>>) -> Result<bool, EngineError> {
        self.check_open()?;
        let start_key = start_key.into();
        let end_key = end_key.into();
        if start_key.is_empty() || end_key.is_empty() {
            return Err(EngineError::InvalidArgument(
                "start_key and end_key must not be empty".into(),
            ));
        }
        if start_key >= end_key {
            return Err(EngineError::InvalidArgument(
                "start_key must be strictly less than end_key".into(),
            ));
        }
        let mut inner = self.acquire_write_with_backpressure()?;

        match inner
            .active
            .delete_range(start_key.clone(), end_key.clone())
        {
            Ok(()) => Ok(false),

            Err(MemtableError::FlushRequired) => {
                Self::freeze_active(&mut inner)?;
                inner.active.delete_range(start_key, end_key)?;

                let max_lsn = inner.active.max_lsn();
                inner.manifest.update_lsn(max_lsn)?;
                drop(inner);
                let _ = self.work_tx.try_send(WorkItem::FlushOldestFrozen);

                Ok(true)
            }

            Err(e) => Err(e.into()),
        }
    }

    /// Look up a single key.
    ///
    /// Returns `Ok(Some(value))` if the key exists, `Ok(None)` if it has
    /// been deleted or was never written, or `Err` on I/O failure.
    ///
    /// The lookup order is: active memtable → frozen memtables → SSTables
    /// (all newest-first). The first definitive result wins.
    pub fn get(&self, key: impl Into<Vec<u8>>) -> Result<Option<Vec<u8>>, EngineError> {
        self.check_open()?;
        let key = key.into();
        if key.is_empty() {
            return Err(EngineError::InvalidArgument("key must not be empty".into()));
        }
        let inner = self
            .inner
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        // --------------------------------------------------
        // 1. Active memtable (newest)
        // --------------------------------------------------
        match inner.active.get(&key)? {
            MemtableGetResult::Put(value) => return Ok(Some(value)),
            MemtableGetResult::Delete | MemtableGetResult::RangeDelete => return Ok(None),
            MemtableGetResult::NotFound => {}
        }

        // --------------------------------------------------
        // 2. Frozen memtables (newest → oldest)
        // --------------------------------------------------
        for frozen in &inner.frozen {
            match frozen.get(&key)? {
                MemtableGetResult::Put(value) => return Ok(Some(value)),
                MemtableGetResult::Delete | MemtableGetResult::RangeDelete => {
                    return Ok(None);
                }
                MemtableGetResult::NotFound => {}
            }
        }

        // --------------------------------------------------
        // 3. SSTables (sorted by max_lsn descending)
        //
        //    After size-tiered compaction, a merged SSTable may
        //    span a wide LSN range. We track the best (highest-LSN)
        //    result found so far. Once an SSTable's max_lsn is ≤
        //    the best LSN, no subsequent SSTable can beat it, so
        //    we break early.
        // --------------------------------------------------
        let mut best_sst: Option<sstable::GetResult> = None;
        let mut best_lsn: u64 = 0;

        for sst in &inner.sstables {
            // Early termination: this SSTable (and all after it) have
            // max_lsn ≤ best_lsn, so they can't contain a newer version.
            if sst.properties.max_lsn <= best_lsn {
                break;
            }

            match sst.get(&key)? {
                sstable::GetResult::NotFound => {}
                result => {
                    let lsn = result.lsn();
                    if lsn > best_lsn {
                        best_lsn = lsn;
                        best_sst = Some(result);
                    }
                }
            }
        }

        match best_sst {
            Some(sstable::GetResult::Put { value, .. }) => Ok(Some(value)),
            Some(sstable::GetResult::Delete { .. } | sstable::GetResult::RangeDelete { .. }) => {
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Scan all live key-value pairs in `[start_key, end_key)`.
    ///
    /// Returns an iterator of `(key, value)` pairs, merging entries from
    /// all layers and applying point/range tombstones to filter out
    /// deleted keys.
    pub fn scan(
        &self,
        start_key: &[u8],
        end_key: &[u8],
    ) -> Result<impl Iterator<Item = (Vec<u8>, Vec<u8>)>, EngineError> {
        self.check_open()?;
        if start_key.is_empty() || end_key.is_empty() {
            return Err(EngineError::InvalidArgument(
                "start_key and end_key must not be empty".into(),
            ));
        }
        let merged = self.raw_scan(start_key, end_key)?;
        Ok(VisibilityFilter::new(merged))
    }

    fn raw_scan(
        &self,
        start_key: &[u8],
        end_key: &[u8],
    ) -> Result<utils::MergeIterator<'static>, EngineError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        let mut iters: Vec<Box<dyn Iterator<Item = Record>>> = Vec::new();

        // Active memtable - collect to own the data
        let active_records: Vec<_> = inner
            .active
            .scan(start_key, end_key)?
            .map(memtable_entry_to_record)
            .collect();
        iters.push(Box::new(active_records.into_iter()));

        // Frozen memtables - collect to own the data
        for frozen in &inner.frozen {
            let records: Vec<_> = frozen
                .scan(start_key, end_key)?
                .map(memtable_entry_to_record)
                .collect();
            iters.push(Box::new(records.into_iter()));
        }

        // SSTables - collect to own the data
        for sstable in &inner.sstables {
            let records: Vec<_> = sstable.scan(start_key, end_key)?.collect();
            iters.push(Box::new(records.into_iter()));
        }

        Ok(utils::MergeIterator::new(iters))
    }

    /// Returns a snapshot of engine statistics.
    ///
    /// Includes frozen memtable count, SSTable count, per-SSTable file
    /// sizes, and total on-disk SSTable size.
    pub fn stats(&self) -> Result<EngineStats, EngineError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        let sst_sizes: Vec<u64> = inner.sstables.iter().map(|s| s.file_size()).collect();
        let total_sst_size_bytes: u64 = sst_sizes.iter().sum();

        Ok(EngineStats {
            frozen_count: inner.frozen.len(),
            sstables_count: inner.sstables.len(),
            total_sst_size_bytes,
            sst_sizes,
            cache_stats: inner.cache.stats(),
            live_snapshots: inner.snapshots.live_count(),
        })
    }

    /// Pins the engine's current max LSN as a consistent read point.
    ///
    /// As long as the returned handle is alive, compaction will not
    /// collapse any key's version history past this LSN. Use
    /// [`Engine::get_at`] / [`Engine::scan_at`] to read through it.
    pub fn snapshot(&self) -> Result<crate::snapshot::SnapshotHandle, EngineError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
        let lsn = inner.active.max_lsn();
        Ok(crate::snapshot::SnapshotHandle::new(
            Arc::clone(&inner.snapshots),
            lsn,
        ))
    }

    /// Look up a single key as of a previously taken snapshot.
    ///
    /// Equivalent to [`Engine::get`] but ignores any version with
    /// `lsn > snapshot.lsn()`.
    pub fn get_at(
        &self,
        key: impl Into<Vec<u8>>,
        snapshot: &crate::snapshot::SnapshotHandle,
    ) -> Result<Option<Vec<u8>>, EngineError> {
        let key = key.into();
        let max_lsn = snapshot.lsn();
        let mut end_key = key.clone();
        end_key.push(0);
        let merged = self.raw_scan(&key, &end_key)?;
        let filtered = merged.filter(|r| r.lsn() <= max_lsn);
        for (k, v) in VisibilityFilter::new(filtered) {
            if k == key {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    /// Scan `[start_key, end_key)` as of a previously taken snapshot.
    pub fn scan_at(
        &self,
        start_key: &[u8],
        end_key: &[u8],
        snapshot: &crate::snapshot::SnapshotHandle,
    ) -> Result<impl Iterator<Item = (Vec<u8>, Vec<u8>)>, EngineError> {
        let max_lsn = snapshot.lsn();
        let merged = self.raw_scan(start_key, end_key)?;
        let filtered = merged.filter(move |r| r.lsn() <= max_lsn);
        Ok(VisibilityFilter::new(filtered))
    }

    /// Freeze the current active memtable and swap in a fresh one.
    /// The old memtable is pushed to the front of `inner.frozen`.
    fn freeze_active(inner: &mut EngineInner) -> Result<(), EngineError> {
        let frozen_wal_id = inner.active.wal.wal_seq();
        let current_max_lsn = inner.active.max_lsn();
        let new_active_wal_id = frozen_wal_id + 1;

        let new_active = Memtable::new(
            format!(
                "{}/{}/wal-{:06}.log",
                inner.data_dir, MEMTABLE_DIR, new_active_wal_id
            ),
            None,
            inner.config.write_buffer_size,
            inner.config.sync_policy,
        )?;

        let old_active = std::mem::replace(&mut inner.active, new_active);
        let frozen = old_active.frozen()?;
        // Insert at beginning to maintain sorted order (newest first)
        inner.frozen.insert(0, frozen);

        // Ensure LSN continuity
        inner.active.inject_max_lsn(current_max_lsn);

        inner.manifest.add_frozen_wal(frozen_wal_id)?;
        inner.manifest.set_active_wal(new_active_wal_id)?;

        Ok(())
    }

    /// Flush the oldest frozen memtable to a new SSTable.
    ///
    /// Returns `Ok(true)` if a frozen memtable was flushed, `Ok(false)` if
    /// there were no frozen memtables to flush.
    pub fn flush_oldest_frozen(&self) -> Result<bool, EngineError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        if inner.frozen.is_empty() {
            return Ok(false);
        }
        Self::flush_frozen_to_sstable_inner(&mut inner)?;
        Ok(true)
    }

    /// Flush **all** frozen memtables to SSTables.
    ///
    /// Returns the number of frozen memtables that were flushed.
    pub fn flush_all_frozen(&self) -> Result<usize, EngineError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        let mut count = 0usize;
        while !inner.frozen.is_empty() {
            Self::flush_frozen_to_sstable_inner(&mut inner)?;
            count += 1;
        }
        Ok(count)
    }

    /// Allocates the next unique SSTable ID from the manifest's monotonic counter.
    fn next_sstable_id(inner: &mut EngineInner) -> Result<u64, EngineError> {
        Ok(inner.manifest.allocate_sst_id()?)
    }

    fn flush_frozen_to_sstable_inner(inner: &mut EngineInner) -> Result<(), EngineError> {
        if inner.frozen.is_empty() {
            return Ok(());
        }

        // Take the oldest frozen memtable (last in the newest-first vec).
        // We flush oldest first so that `insert(0, sstable)` keeps the
        // sstables list in newest-first order after a batch flush.
        let frozen = inner
            .frozen
            .pop()
            .ok_or_else(|| EngineError::Internal("frozen list became empty unexpectedly".into()))?;
        let frozen_wal_id = frozen.memtable.wal.wal_seq();

        // Get all records from the frozen memtable
        let records: Vec<_> = frozen
            .iter_for_flush()?
            .map(memtable_record_to_record)
            .collect();

        // Separate into point entries and range tombstones
        let mut point_entries = Vec::new();
        let mut range_tombstones = Vec::new();

        for record in records {
            match record {
                Record::Put {
                    key,
                    value,
                    lsn,
                    timestamp,
                } => {
                    point_entries.push(PointEntry {
                        key,
                        value: Some(value),
                        lsn,
                        timestamp,
                    });
                }
                Record::Delete {
                    key,
                    lsn,
                    timestamp,
                } => {
                    point_entries.push(PointEntry {
                        key,
                        value: None,
                        lsn,
                        timestamp,
                    });
                }
                Record::RangeDelete {
                    start,
                    end,
                    lsn,
                    timestamp,
                } => {
                    range_tombstones.push(RangeTombstone {
                        start,
                        end,
                        lsn,
                        timestamp,
                    });
                }
            }
        }

        // Generate unique SSTable ID and path
        let sstable_id = Self::next_sstable_id(inner)?;
        let sstable_path = format!(
            "{}/{}/sstable-{}.sst",
            inner.data_dir, SSTABLE_DIR, sstable_id
        );

        // Build the SSTable
        let point_count = point_entries.len();
        let range_count = range_tombstones.len();

        sstable::SstWriter::new(&sstable_path).build(
            point_entries.into_iter(),
            point_count,
            range_tombstones.into_iter(),
            range_count,
        )?;

        // Load the newly created SSTable
        let mut sstable = SSTable::open(&sstable_path)?;
        sstable.id = sstable_id;
        sstable.attach_cache(Arc::clone(&inner.cache));
        // Insert at beginning to maintain sorted order (newest first)
        inner.sstables.insert(0, Arc::new(sstable));

        // Update manifest
        inner.manifest.add_sstable(ManifestSstEntry {
            id: sstable_id,
            path: sstable_path.into(),
            level: 0,
        })?;

        // Remove the frozen WAL from manifest
        inner.manifest.remove_frozen_wal(frozen_wal_id)?;

        Ok(())
    }

    // --------------------------------------------------------------------------------------------
    // Compaction API
    // --------------------------------------------------------------------------------------------

    /// Execute a compaction strategy, applying the result to the engine.
    ///
    /// Returns `Ok(true)` if compaction was performed, `Ok(false)` if
    /// the strategy decided there was nothing to do.
    fn run_compaction(
        &self,
        strategy: &dyn crate::compaction::CompactionStrategy,
    ) -> Result<bool, EngineError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;

        let inner = &mut *inner; // reborrow to split fields
        let sst_count = inner.sstables.len();
        let min_live_seq = inner.snapshots.min_live_seq();
        let result = strategy
            .compact(
                &inner.sstables,
                &mut inner.manifest,
                &inner.data_dir,
                &inner.config,
                min_live_seq,
            )
            .map_err(|e| EngineError::Internal(format!("Compaction failed: {e}")))?;

        match result {
            None => {
                tracing::debug!(sst_count, "compaction strategy found nothing to do");
                Ok(false)
            }
            Some(cr) => {
                tracing::info!(
                    sst_count_before = sst_count,
                    removed = cr.removed_ids.len(),
                    new_id = ?cr.new_sst_id,
                    "compaction applied"
                );
                Self::apply_compaction_result(inner, cr)?;
                Ok(true)
            }
        }
    }

    /// Runs one round of **minor compaction** (size-tiered).
    ///
    /// Selects the best bucket whose size exceeds `min_threshold` and merges
    /// those SSTables into a single new SSTable, deduplicating point entries
    /// and preserving all tombstones.
    ///
    /// Returns `Ok(true)` if compaction was performed, `Ok(false)` if no
    /// bucket met the threshold.
    pub fn minor_compact(&self) -> Result<bool, EngineError> {
        self.check_open()?;
        let strategy = {
            let inner = self
                .inner
                .read()
                .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
            inner.config.compaction_strategy.minor()
        };
        self.run_compaction(strategy.as_ref())
    }

    /// Runs one round of **tombstone compaction** (per-SSTable GC).
    ///
    /// Selects the SSTable with the highest tombstone ratio that exceeds
    /// `tombstone_ratio_threshold` and rewrites it, dropping provably-unnecessary
    /// tombstones.
    ///
    /// Returns `Ok(true)` if compaction was performed, `Ok(false)` if no
    /// SSTable was eligible.
    pub fn tombstone_compact(&self) -> Result<bool, EngineError> {
        self.check_open()?;
        let strategy = {
            let inner = self
                .inner
                .read()
                .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
            inner.config.compaction_strategy.tombstone()
        };
        self.run_compaction(strategy.as_ref())
    }

    /// Runs **major compaction** — merges all SSTables into one.
    ///
    /// Actively applies range tombstones to suppress covered Puts, and
    /// drops all spent tombstones from the output.
    ///
    /// Returns `Ok(true)` if compaction was performed, `Ok(false)` if
    /// there are fewer than 2 SSTables.
    pub fn major_compact(&self) -> Result<bool, EngineError> {
        self.check_open()?;
        let strategy = {
            let inner = self
                .inner
                .read()
                .map_err(|_| EngineError::Internal("RwLock poisoned".into()))?;
            inner.config.compaction_strategy.major()
        };
        self.run_compaction(strategy.as_ref())
    }

    /// Applies a `CompactionResult` to the in-memory engine state.
    ///
    /// Removes consumed SSTables, inserts the newly built one, and
    /// re-sorts by `max_lsn` descending so that `get()` can
    /// early-terminate correctly.
    fn apply_compaction_result(
        inner: &mut EngineInner,
        cr: crate::compaction::CompactionResult,
    ) -> Result<(), EngineError> {
        // Remove consumed SSTables.
        inner
            .sstables
            .retain(|sst| !cr.removed_ids.contains(&sst.id));

        // Load and insert new SSTable if one was produced.
        if let Some(ref path) = cr.new_sst_path {
            let mut new_sst = SSTable::open(path)?;
            new_sst.id = cr.new_sst_id.unwrap_or(0);
            new_sst.attach_cache(Arc::clone(&inner.cache));
            inner.sstables.push(Arc::new(new_sst));
        }

        // Re-sort by max_lsn descending to maintain the early-termination
        // invariant used by get().
        inner
            .sstables
            .sort_by(|a, b| b.properties.max_lsn.cmp(&a.properties.max_lsn));

        Ok(())
    }
}

/// Type alias preserving the public scan iterator name.
pub type EngineScanIterator = utils::MergeIterator<'static>;

/// Filters a sorted record stream to yield only **visible** key-value pairs.
///
/// Applies point tombstone and range tombstone semantics:
/// - A `Delete` record suppresses the same key in later (lower-LSN) records.
/// - A `RangeDelete` suppresses any `Put` whose key falls within `[start, end)`
///   and whose LSN is lower than the tombstone's LSN.
///
/// The input iterator **must** be sorted by `(key ASC, LSN DESC)` — the order
/// produced by [`MergeIterator`](utils::MergeIterator).
pub struct VisibilityFilter<I>
where
    I: Iterator<Item = Record>,
{
    /// Underlying merged record stream.
    input: I,
    /// The key most recently emitted or suppressed (used for dedup).
    current_key: Option<Vec<u8>>,
    /// Accumulated range tombstones that may cover upcoming keys.
    active_ranges: Vec<RangeTombstone>,
}

impl<I> VisibilityFilter<I>
where
    I: Iterator<Item = Record>,
{
    pub fn new(input: I) -> Self {
        Self {
            input,
            current_key: None,
            active_ranges: Vec::new(),
        }
    }
}

impl<I> Iterator for VisibilityFilter<I>
where
    I: Iterator<Item = Record>,
{
    type Item = (Vec<u8>, Vec<u8>); // (key, value)

    fn next(&mut self) -> Option<Self::Item> {
        for record in self.input.by_ref() {
            match record {
                Record::RangeDelete {
                    start,
                    end,
                    lsn,
                    timestamp,
                } => {
                    self.active_ranges.push(RangeTombstone {
                        start,
                        end,
                        lsn,
                        timestamp,
                    });
                    // Range tombstone itself is not returned
                }

                Record::Delete { key, .. } => {
                    self.current_key = Some(key.clone());
                }

                Record::Put {
                    key, value, lsn, ..
                } => {
                    // Skip if we've already handled this key
                    if self.current_key.as_deref() == Some(&key) {
                        continue;
                    }

                    // Check range tombstones
                    let deleted = self.active_ranges.iter().any(|r| {
                        r.start.as_slice() <= key.as_slice()
                            && key.as_slice() < r.end.as_slice()
                            && r.lsn > lsn
                    });

                    self.current_key = Some(key.clone());

                    if deleted {
                        continue; // This record is shadowed by a range tombstone
                    }

                    return Some((key, value));
                }
            }
        }

        None
    }
}
