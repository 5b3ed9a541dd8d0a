//! Engine-level tests for the size-tiered compaction strategy.

mod tests_minor;
mod tests_tombstone;
