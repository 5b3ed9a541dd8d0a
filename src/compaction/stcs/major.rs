//! Major compaction — full merge of all SSTables.
//!
//! Merges **every** SSTable into a single new SSTable, applying range
//! tombstones actively to suppress covered point entries. Since the
//! entire dataset is being merged, all spent tombstones (both point
//! and range) are dropped from the output — there's nothing left for
//! them to suppress.
//!
//! ## Option B implementation
//!
//! During the merge, each point entry is checked against the collected
//! range tombstones. If a Put has a lower LSN than a covering range
//! tombstone, it is suppressed (not written to the output).
//!
//! After all entries are processed:
//! - Point tombstones (Delete) are dropped entirely — the corresponding
//!   Put (if any) has already been suppressed or isn't present.
//! - Range tombstones are dropped entirely — all covered data was
//!   suppressed during the merge.

use crate::compaction::{
    CompactionError, CompactionResult, MergeIterator, finalize_compaction_at_level,
    full_range_scan_iters,
};
use crate::engine::DbConfig;
use crate::engine::RangeTombstone;
use crate::engine::utils::Record;
use crate::manifest::Manifest;
use crate::sstable::{PointEntry, SSTable};
use std::sync::Arc;
use tracing::{debug, info, trace};

// ------------------------------------------------------------------------------------------------
// Public API
// ------------------------------------------------------------------------------------------------

/// Executes a major compaction, merging all SSTables into one.
///
/// This is always user-triggered (via `Engine::major_compact()`). It
/// will refuse to run if there are fewer than 2 SSTables.
///
/// `min_live_seq` is the lowest LSN still pinned by an outstanding
/// snapshot, if any — versions at or below it are retained even though
/// they aren't the newest, so a snapshot reader can still see them.
///
/// Returns `Ok(None)` if nothing to compact (0–1 SSTables).
pub fn compact(
    sstables: &[Arc<SSTable>],
    manifest: &mut Manifest,
    data_dir: &str,
    _config: &DbConfig,
    min_live_seq: Option<u64>,
) -> Result<Option<CompactionResult>, CompactionError> {
    if sstables.len() < 2 {
        debug!(
            sstable_count = sstables.len(),
            "major compaction: fewer than 2 SSTables, skipping"
        );
        return Ok(None);
    }

    let ids: Vec<u64> = sstables.iter().map(|s| s.id()).collect();
    info!(
        sstable_count = sstables.len(),
        ?ids,
        min_live_seq,
        "major compaction: starting full merge"
    );

    let result = execute(sstables, manifest, data_dir, min_live_seq, 0)?;

    info!(
        new_sst_id = ?result.new_sst_id,
        removed_count = result.removed_ids.len(),
        "major compaction: complete"
    );

    Ok(Some(result))
}

// ------------------------------------------------------------------------------------------------
// Execution
// ------------------------------------------------------------------------------------------------

/// Shared by both the size-tiered and leveled major strategies — `level`
/// only controls which level the output SSTable is filed under in the
/// manifest, the merge semantics are identical either way.
pub(crate) fn execute(
    sstables: &[Arc<SSTable>],
    manifest: &mut Manifest,
    data_dir: &str,
    min_live_seq: Option<u64>,
    level: u32,
) -> Result<CompactionResult, CompactionError> {
    let sst_refs: Vec<&SSTable> = sstables.iter().map(|s| s.as_ref()).collect();
    let removed_ids: Vec<u64> = sstables.iter().map(|s| s.id()).collect();

    // Phase 1: Collect all range tombstones upfront from all SSTables.
    // We need them before processing point entries so we can check coverage.
    let mut all_range_tombstones: Vec<RangeTombstone> = Vec::new();
    for sst in sstables {
        all_range_tombstones.extend(sst.range_tombstone_iter());
    }

    // Phase 2: Create merge iterator over all SSTables.
    let iters = full_range_scan_iters(&sst_refs)?;
    let merge_iter = MergeIterator::new(iters);

    // Phase 3: Process records — dedup point entries, apply range tombstones.
    // When a snapshot floor is active, the newest version at or below the
    // floor is retained alongside the newest overall version, and range
    // tombstones survive into the output instead of being dropped — both
    // exist so a pinned snapshot can't lose data a live compaction decided
    // was spent.
    let mut point_entries: Vec<PointEntry> = Vec::new();
    let mut last_key: Option<Vec<u8>> = None;
    let mut floor_kept_for_key = false;

    for record in merge_iter {
        match record {
            Record::RangeDelete { .. } => {
                // Already captured in all_range_tombstones above.
            }
            Record::Delete { key, lsn, timestamp } => {
                if last_key.as_ref() == Some(&key) {
                    if floor_kept_for_key || min_live_seq.is_none_or(|floor| lsn > floor) {
                        continue;
                    }
                    floor_kept_for_key = true;
                } else {
                    last_key = Some(key.clone());
                    floor_kept_for_key = min_live_seq.is_none_or(|floor| lsn <= floor);
                }

                if floor_kept_for_key && min_live_seq.is_some_and(|floor| lsn <= floor) {
                    // Retained solely for snapshot visibility below the floor.
                    point_entries.push(PointEntry {
                        key,
                        value: None,
                        lsn,
                        timestamp,
                    });
                } else {
                    trace!(key = ?key, lsn, "major: dropping point tombstone");
                }
            }
            Record::Put {
                key,
                value,
                lsn,
                timestamp,
            } => {
                if last_key.as_ref() == Some(&key) {
                    if floor_kept_for_key || min_live_seq.is_none_or(|floor| lsn > floor) {
                        continue;
                    }
                    floor_kept_for_key = true;
                } else {
                    last_key = Some(key.clone());
                    floor_kept_for_key = min_live_seq.is_none_or(|floor| lsn <= floor);
                }

                // A version at or below the snapshot floor is never
                // suppressed by a range tombstone — it must stay visible
                // to readers pinned at or before that floor.
                let protected_by_snapshot = min_live_seq.is_some_and(|floor| lsn <= floor);
                if !protected_by_snapshot
                    && is_suppressed_by_range(&key, lsn, &all_range_tombstones)
                {
                    trace!(key = ?key, lsn, "major: Put suppressed by range tombstone");
                    continue;
                }

                point_entries.push(PointEntry {
                    key,
                    value: Some(value),
                    lsn,
                    timestamp,
                });
            }
        }
    }

    // Without a snapshot floor, nothing needs the tombstones any more and
    // they're dropped entirely. With one, they're kept so the merge stays
    // safe for reads pinned below the floor.
    let range_tombstones = if min_live_seq.is_some() {
        all_range_tombstones
    } else {
        Vec::new()
    };

    finalize_compaction_at_level(
        manifest,
        data_dir,
        removed_ids,
        point_entries,
        range_tombstones,
        level,
    )
}

// ------------------------------------------------------------------------------------------------
// Range tombstone helpers
// ------------------------------------------------------------------------------------------------

/// Returns `true` if the given key+lsn is suppressed by any range
/// tombstone with a strictly higher LSN.
fn is_suppressed_by_range(key: &[u8], put_lsn: u64, range_tombstones: &[RangeTombstone]) -> bool {
    for rt in range_tombstones {
        if key >= rt.start.as_slice() && key < rt.end.as_slice() && rt.lsn > put_lsn {
            return true;
        }
    }
    false
}
