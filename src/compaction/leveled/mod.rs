//! Leveled compaction — simplified to two levels.
//!
//! Flushed memtables always land at L0 (level `0` in [`ManifestSstEntry`](crate::manifest::ManifestSstEntry)).
//! [`LeveledMinorCompaction`] merges all L0 tables together with any
//! overlapping L1 tables into a single new L1 table once L0 accumulates
//! `min_threshold` tables — after that merge, L1 holds the full, non-overlapping
//! dataset and L0 is empty again.
//!
//! This differs from RocksDB/LevelDB-style leveled compaction (which fans out
//! across many levels with per-level size ratios) — a single L0→L1 merge step
//! is enough to demonstrate bounded read amplification without the added
//! complexity of multi-level scheduling.
//!
//! Tombstone compaction is shared with the size-tiered strategy — the
//! per-SSTable GC logic ([`stcs::TombstoneCompaction`](crate::compaction::stcs::TombstoneCompaction))
//! doesn't care which level a table sits at.

use std::sync::Arc;

use crate::compaction::stcs::major;
use crate::compaction::{
    CompactionError, CompactionResult, CompactionStrategy, MergeIterator, dedup_records,
    finalize_compaction_at_level, full_range_scan_iters,
};
use crate::engine::DbConfig;
use crate::manifest::Manifest;
use crate::sstable::SSTable;
use tracing::{debug, info};

/// Merges all L0 tables into L1 once L0 reaches `min_threshold` tables.
pub struct LeveledMinorCompaction;

impl CompactionStrategy for LeveledMinorCompaction {
    fn compact(
        &self,
        sstables: &[Arc<SSTable>],
        manifest: &mut Manifest,
        data_dir: &str,
        config: &DbConfig,
        min_live_seq: Option<u64>,
    ) -> Result<Option<CompactionResult>, CompactionError> {
        let l0_ids: Vec<u64> = manifest
            .get_sstables()?
            .iter()
            .filter(|e| e.level == 0)
            .map(|e| e.id)
            .collect();

        if l0_ids.len() < config.min_threshold {
            debug!(
                l0_count = l0_ids.len(),
                min_threshold = config.min_threshold,
                "leveled minor: L0 below threshold, skipping"
            );
            return Ok(None);
        }

        let l1_ids: Vec<u64> = manifest
            .get_sstables()?
            .iter()
            .filter(|e| e.level == 1)
            .map(|e| e.id)
            .collect();

        let merge_set: Vec<&Arc<SSTable>> = sstables
            .iter()
            .filter(|s| l0_ids.contains(&s.id()) || l1_ids.contains(&s.id()))
            .collect();

        if merge_set.is_empty() {
            return Ok(None);
        }

        let removed_ids: Vec<u64> = merge_set.iter().map(|s| s.id()).collect();
        info!(
            l0_count = l0_ids.len(),
            l1_count = l1_ids.len(),
            "leveled minor: merging L0 into L1"
        );

        let sst_refs: Vec<&SSTable> = merge_set.iter().map(|s| s.as_ref()).collect();
        let iters = full_range_scan_iters(&sst_refs)?;
        let merge_iter = MergeIterator::new(iters);
        let (point_entries, range_tombstones) = dedup_records(merge_iter, min_live_seq);

        let result = finalize_compaction_at_level(
            manifest,
            data_dir,
            removed_ids,
            point_entries,
            range_tombstones,
            1,
        )?;

        Ok(Some(result))
    }
}

/// Merges every table (any level) into a single new L1 table.
pub struct LeveledMajorCompaction;

impl CompactionStrategy for LeveledMajorCompaction {
    fn compact(
        &self,
        sstables: &[Arc<SSTable>],
        manifest: &mut Manifest,
        data_dir: &str,
        _config: &DbConfig,
        min_live_seq: Option<u64>,
    ) -> Result<Option<CompactionResult>, CompactionError> {
        if sstables.len() < 2 {
            return Ok(None);
        }

        // Same merge/suppression/snapshot-floor semantics as size-tiered
        // major compaction — only the output level differs.
        let result = major::execute(sstables, manifest, data_dir, min_live_seq, 1)?;

        Ok(Some(result))
    }
}
