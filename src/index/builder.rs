//! Index Builder
//!
//! Collects payload locations and serializes them behind a perfect hash.

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::IkvConfig;
use crate::error::{IkvError, Result};
use crate::mphf::{BbHash, Evaluator, KeyData, PerfectHash};

use super::{pack, record_size, Entry, Footer, IndexInfo};

/// Accumulates `(key, offset, size)` entries and writes the index block
///
/// Keys are expected to be unique. The builder does not check; with the
/// default [`BbHash`] a duplicate key makes [`write`](Self::write) fail with
/// [`IkvError::HashConstruction`].
#[derive(Debug)]
pub struct IkvIndexBuilder<H: PerfectHash = BbHash> {
    /// Recorded entries, insertion order
    entries: Vec<Entry>,
    /// Emit 8-byte `(offset, size)` records instead of 4-byte offsets
    write_size: bool,
    /// Perfect hash construction
    hasher: H,
}

impl IkvIndexBuilder {
    /// Create a builder with the default perfect hash
    pub fn new(write_size: bool) -> Self {
        Self::with_hasher(BbHash::default(), write_size)
    }

    /// Create a builder from a config (layout flag and hash parameters)
    pub fn with_config(config: &IkvConfig) -> Self {
        Self::with_hasher(BbHash::from_config(config), config.write_size)
    }
}

impl Default for IkvIndexBuilder {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<H: PerfectHash> IkvIndexBuilder<H> {
    /// Create a builder around a custom perfect hash
    pub fn with_hasher(hasher: H, write_size: bool) -> Self {
        Self {
            entries: Vec::new(),
            write_size,
            hasher,
        }
    }

    /// Record one payload location
    pub fn add(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether table records carry payload sizes
    pub fn write_size(&self) -> bool {
        self.write_size
    }

    /// Recorded entries in insertion order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Finish building: serialize hash, table and footer, hand them to `writer`
    ///
    /// The whole block is assembled in one exactly-sized buffer before
    /// `writer` runs, so the callback never sees a partial index. The buffer
    /// is released when this call returns, whatever the callback did.
    pub fn write<F>(self, writer: F) -> Result<IndexInfo>
    where
        F: FnOnce(Bytes) -> Result<()>,
    {
        let entry_count = self.entries.len();
        let footer_count = i32::try_from(entry_count).map_err(|_| {
            IkvError::HashConstruction(format!("too many entries: {}", entry_count))
        })?;

        // Step 1: build the perfect hash over all keys
        let keys: Vec<i32> = self.entries.iter().map(|e| e.key).collect();
        let key_data = self.hasher.generate(&keys)?;

        // Step 2: plan the exact block size
        let key_data_size = key_data.serialized_size();
        let footer_key_data = i32::try_from(key_data_size).map_err(|_| {
            IkvError::HashConstruction(format!("key data too large: {} bytes", key_data_size))
        })?;
        let record_size = record_size(self.write_size);
        let capacity = key_data_size + entry_count * record_size + Footer::SIZE;

        // Step 3: key data
        let mut buf = BytesMut::with_capacity(capacity);
        key_data.write_to(&mut buf);
        if buf.len() != key_data_size {
            return Err(IkvError::IndexSizeMismatch {
                expected: key_data_size,
                actual: buf.len(),
            });
        }

        // Step 4: place every entry at its rank
        let evaluator = self.hasher.build_evaluator(key_data);
        let mut by_rank = vec![usize::MAX; entry_count];
        for (index, entry) in self.entries.iter().enumerate() {
            let rank = evaluator
                .evaluate(entry.key)
                .filter(|&rank| rank < entry_count)
                .ok_or_else(|| {
                    IkvError::HashConstruction(format!("key {} has no rank", entry.key))
                })?;
            if by_rank[rank] != usize::MAX {
                return Err(IkvError::HashConstruction(format!(
                    "keys {} and {} share rank {}",
                    self.entries[by_rank[rank]].key, entry.key, rank
                )));
            }
            by_rank[rank] = index;
        }

        // Step 5: offset table in rank order
        for &index in &by_rank {
            let entry = &self.entries[index];
            if self.write_size {
                buf.put_u64_le(pack(entry.offset, entry.size));
            } else {
                buf.put_u32_le(entry.offset);
            }
        }

        // Step 6: footer
        Footer {
            entry_count: footer_count as u32,
            key_data_size: footer_key_data as u32,
            has_size: self.write_size,
        }
        .write_to(&mut buf);

        if buf.len() != capacity {
            return Err(IkvError::IndexSizeMismatch {
                expected: capacity,
                actual: buf.len(),
            });
        }

        tracing::debug!(
            entries = entry_count,
            key_data_size,
            record_size,
            index_length = capacity,
            "ikv index built"
        );

        writer(buf.freeze())?;

        Ok(IndexInfo {
            entry_count,
            key_data_size,
            record_size,
            index_length: capacity,
        })
    }
}
