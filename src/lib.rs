//! # StratumDB
//!
//! An embeddable, persistent key-value storage engine built on a
//! **Log-Structured Merge Tree (LSM-tree)** architecture. Designed for
//! fast writes and crash-safe operation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Engine                           │
//! │  ┌────────────┐  ┌──────────────┐  ┌─────────────┐  │
//! │  │  Active     │  │   Frozen     │  │  SSTables   │  │
//! │  │  Memtable   │  │  Memtables   │  │  (on disk)  │  │
//! │  │  + WAL      │  │  + WALs      │  │  + cache    │  │
//! │  └─────┬───────┘  └──────┬───────┘  └──────┬──────┘  │
//! │        │   freeze        │   flush         │         │
//! │        └─────────►       └────────►        │         │
//! │                                            │         │
//! │  ┌──────────────────────────────────────────┘         │
//! │  │  Compaction (minor / tombstone / major / leveled)  │
//! │  └───────────────────────────────────────────────────┘│
//! │                                                      │
//! │  ┌──────────────────────────┐  ┌─────────────────────┐│
//! │  │  Manifest (WAL+snapshot) │  │  Snapshot registry   ││
//! │  └──────────────────────────┘  └─────────────────────┘│
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`engine`] | Core storage engine — open, read, write, scan, flush, compact |
//! | [`memtable`] | In-memory write buffer with multi-version entries and range tombstones |
//! | [`wal`] | Generic, CRC-protected write-ahead log for crash recovery |
//! | [`sstable`] | Immutable, sorted, on-disk tables with bloom filters and block indices |
//! | [`manifest`] | Persistent metadata manager (WAL + snapshot model) |
//! | [`compaction`] | Size-tiered, tombstone, major, and leveled compaction strategies |
//! | [`cache`] | Sharded block cache for decoded SSTable data blocks |
//! | [`snapshot`] | Registry of live reader snapshots, used to bound compaction |
//!
//! ## Key Features
//!
//! - **Write-ahead logging** — every mutation is persisted to a WAL before
//!   being acknowledged, guaranteeing durability and crash recovery. The
//!   fsync policy ([`wal::SyncPolicy`]) is configurable per engine instance.
//! - **Multi-version concurrency** — multiple versions per key, ordered by
//!   log sequence number (LSN). Reads always see the latest committed version,
//!   and a taken [`engine::Engine::snapshot`] pins a consistent point-in-time view.
//! - **Point and range tombstones** — efficient delete semantics for both
//!   individual keys and key ranges.
//! - **Bloom filter lookups** — each SSTable carries a bloom filter for
//!   fast negative point-lookup responses.
//! - **Block-level CRC32 integrity** — every on-disk block (WAL records,
//!   SSTable data blocks, headers, footers) is checksummed.
//! - **Pluggable compaction** — size-tiered (minor, tombstone, major) and
//!   leveled strategies with configurable thresholds.
//! - **Write back-pressure** — writes block (with a timeout) rather than
//!   accumulating unbounded frozen memtables when flushing can't keep up.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stratumdb::{Db, DbConfig};
//! use stratumdb::compaction::CompactionStrategyType;
//!
//! let config = DbConfig {
//!     compaction_strategy: CompactionStrategyType::Stcs,
//!     ..DbConfig::default()
//! };
//!
//! let db = Db::open("/tmp/my_db", config).unwrap();
//!
//! // Write
//! db.put(b"hello".to_vec(), b"world".to_vec()).unwrap();
//!
//! // Read
//! assert_eq!(db.get(b"hello".to_vec()).unwrap(), Some(b"world".to_vec()));
//!
//! // Delete
//! db.delete(b"hello".to_vec()).unwrap();
//! assert_eq!(db.get(b"hello".to_vec()).unwrap(), None);
//!
//! // Scan
//! db.put(b"a".to_vec(), b"1".to_vec()).unwrap();
//! db.put(b"b".to_vec(), b"2".to_vec()).unwrap();
//! let results: Vec<_> = db.scan(b"a", b"c").unwrap().collect();
//!
//! // Graceful shutdown
//! db.close().unwrap();
//! ```

#![allow(dead_code)]

pub mod cache;
pub mod compaction;
pub mod encoding;
pub mod engine;
pub mod manifest;
pub mod memtable;
pub mod snapshot;
pub mod sstable;
pub mod wal;

/// Alias for [`engine::Engine`] — the primary entry point for embedders.
pub use engine::Engine as Db;
/// Alias for [`engine::DbConfig`].
pub use engine::DbConfig;
/// Alias for [`engine::EngineError`], returned by every [`Db`] operation.
pub use engine::EngineError as DbError;
