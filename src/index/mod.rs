//! Index Module
//!
//! Builds the index block appended after all payloads of an ikv file.
//!
//! ## Index Block Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Key Data (KeyDataSize bytes)                            │
//! │   Serialized perfect hash, layout owned by the hasher   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Offset Table (EntryCount records, perfect-hash rank order) │
//! │   with sizes:    u64 = Offset << 32 | Size               │
//! │   without sizes: u32 = Offset                            │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (9 bytes)                                        │
//! │   EntryCount: i32 | KeyDataSize: i32 | HasSize: u8      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. The footer sits at the very end of the
//! file so a reader can find the whole block without a header.

mod builder;
mod footer;

use serde::Serialize;

pub use builder::IkvIndexBuilder;
pub use footer::Footer;

// =============================================================================
// Shared Constants (used by builder, footer, reader)
// =============================================================================

/// Table record width when payload sizes are stored
pub(crate) const SIZED_RECORD: usize = 8;

/// Table record width when only offsets are stored
pub(crate) const OFFSET_RECORD: usize = 4;

/// Width of one offset-table record
pub(crate) fn record_size(has_size: bool) -> usize {
    if has_size {
        SIZED_RECORD
    } else {
        OFFSET_RECORD
    }
}

/// Pack an offset and size into one sized table record
#[inline]
pub(crate) fn pack(offset: u32, size: u32) -> u64 {
    ((offset as u64) << 32) | size as u64
}

/// Inverse of [`pack`]
#[inline]
pub(crate) fn unpack(record: u64) -> (u32, u32) {
    ((record >> 32) as u32, record as u32)
}

// =============================================================================
// Entry
// =============================================================================

/// Location of one payload, recorded while writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Caller-chosen key, unique within one index
    pub key: i32,
    /// Absolute byte offset of the payload
    pub offset: u32,
    /// Payload length in bytes
    pub size: u32,
}

impl Entry {
    pub fn new(key: i32, offset: u32, size: u32) -> Self {
        Self { key, offset, size }
    }
}

// =============================================================================
// Build Summary
// =============================================================================

/// Summary returned by [`IkvIndexBuilder::write`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexInfo {
    /// Number of table records (one per added entry)
    pub entry_count: usize,
    /// Length of the serialized perfect hash
    pub key_data_size: usize,
    /// Width of one table record (8 or 4)
    pub record_size: usize,
    /// Length of the whole index block including the footer
    pub index_length: usize,
}
