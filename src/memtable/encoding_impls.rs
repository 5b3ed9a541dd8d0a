//! Encode / Decode implementations for memtable WAL record types.
//!
//! Split into a separate file for readability — the types themselves
//! live in `super` (i.e., `src/memtable/mod.rs`).

use crate::encoding::{self, EncodingError};

use super::{MemtableRangeTombstone, MemtableRecord, MemtableSingleEntry};

// ------------------------------------------------------------------------------------------------
// MemtableSingleEntry
// ------------------------------------------------------------------------------------------------

impl encoding::Encode for MemtableSingleEntry {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::Encode::encode_to(&self.value, buf)?;
        encoding::Encode::encode_to(&self.timestamp, buf)?;
        encoding::Encode::encode_to(&self.is_delete, buf)?;
        encoding::Encode::encode_to(&self.lsn, buf)?;
        Ok(())
    }
}

impl encoding::Decode for MemtableSingleEntry {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut off = 0;
        let (value, n) = <Option<Vec<u8>>>::decode_from(&buf[off..])?;
        off += n;
        let (timestamp, n) = u64::decode_from(&buf[off..])?;
        off += n;
        let (is_delete, n) = bool::decode_from(&buf[off..])?;
        off += n;
        let (lsn, n) = u64::decode_from(&buf[off..])?;
        off += n;
        Ok((
            Self {
                value,
                timestamp,
                is_delete,
                lsn,
            },
            off,
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// MemtableRangeTombstone
// ------------------------------------------------------------------------------------------------

impl encoding::Encode for MemtableRangeTombstone {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        encoding::Encode::encode_to(&self.start, buf)?;
        encoding::Encode::encode_to(&self.end, buf)?;
        encoding::Encode::encode_to(&self.lsn, buf)?;
        encoding::Encode::encode_to(&self.timestamp, buf)?;
        Ok(())
    }
}

impl encoding::Decode for MemtableRangeTombstone {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut off = 0;
        let (start, n) = <Vec<u8>>::decode_from(&buf[off..])?;
        off += n;
        let (end, n) = <Vec<u8>>::decode_from(&buf[off..])?;
        off += n;
        let (lsn, n) = u64::decode_from(&buf[off..])?;
        off += n;
        let (timestamp, n) = u64::decode_from(&buf[off..])?;
        off += n;
        Ok((
            Self {
                start,
                end,
                lsn,
                timestamp,
            },
            off,
        ))
    }
}

// ------------------------------------------------------------------------------------------------
// MemtableRecord — tag-dispatched enum, mirroring ManifestEvent's scheme
// ------------------------------------------------------------------------------------------------

impl encoding::Encode for MemtableRecord {
    fn encode_to(&self, buf: &mut Vec<u8>) -> Result<(), EncodingError> {
        match self {
            MemtableRecord::Put {
                key,
                value,
                lsn,
                timestamp,
            } => {
                encoding::Encode::encode_to(&0u32, buf)?;
                encoding::Encode::encode_to(key, buf)?;
                encoding::Encode::encode_to(value, buf)?;
                encoding::Encode::encode_to(lsn, buf)?;
                encoding::Encode::encode_to(timestamp, buf)?;
            }
            MemtableRecord::Delete {
                key,
                lsn,
                timestamp,
            } => {
                encoding::Encode::encode_to(&1u32, buf)?;
                encoding::Encode::encode_to(key, buf)?;
                encoding::Encode::encode_to(lsn, buf)?;
                encoding::Encode::encode_to(timestamp, buf)?;
            }
            MemtableRecord::RangeDelete {
                start,
                end,
                lsn,
                timestamp,
            } => {
                encoding::Encode::encode_to(&2u32, buf)?;
                encoding::Encode::encode_to(start, buf)?;
                encoding::Encode::encode_to(end, buf)?;
                encoding::Encode::encode_to(lsn, buf)?;
                encoding::Encode::encode_to(timestamp, buf)?;
            }
        }
        Ok(())
    }
}

impl encoding::Decode for MemtableRecord {
    fn decode_from(buf: &[u8]) -> Result<(Self, usize), EncodingError> {
        let mut offset = 0;
        let (tag, n) = u32::decode_from(buf)?;
        offset += n;
        match tag {
            0 => {
                let (key, n) = <Vec<u8>>::decode_from(&buf[offset..])?;
                offset += n;
                let (value, n) = <Vec<u8>>::decode_from(&buf[offset..])?;
                offset += n;
                let (lsn, n) = u64::decode_from(&buf[offset..])?;
                offset += n;
                let (timestamp, n) = u64::decode_from(&buf[offset..])?;
                offset += n;
                Ok((
                    MemtableRecord::Put {
                        key,
                        value,
                        lsn,
                        timestamp,
                    },
                    offset,
                ))
            }
            1 => {
                let (key, n) = <Vec<u8>>::decode_from(&buf[offset..])?;
                offset += n;
                let (lsn, n) = u64::decode_from(&buf[offset..])?;
                offset += n;
                let (timestamp, n) = u64::decode_from(&buf[offset..])?;
                offset += n;
                Ok((
                    MemtableRecord::Delete {
                        key,
                        lsn,
                        timestamp,
                    },
                    offset,
                ))
            }
            2 => {
                let (start, n) = <Vec<u8>>::decode_from(&buf[offset..])?;
                offset += n;
                let (end, n) = <Vec<u8>>::decode_from(&buf[offset..])?;
                offset += n;
                let (lsn, n) = u64::decode_from(&buf[offset..])?;
                offset += n;
                let (timestamp, n) = u64::decode_from(&buf[offset..])?;
                offset += n;
                Ok((
                    MemtableRecord::RangeDelete {
                        start,
                        end,
                        lsn,
                        timestamp,
                    },
                    offset,
                ))
            }
            _ => Err(EncodingError::InvalidTag {
                tag,
                type_name: "MemtableRecord",
            }),
        }
    }
}
