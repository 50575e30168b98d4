//! Ikv Reader
//!
//! Opens finished ikv files and resolves keys in O(1) through the stored
//! perfect hash.
//!
//! ## Lookup
//! 1. Footer from the last 9 bytes
//! 2. Key data located by walking back over table and key data
//! 3. Evaluator rebuilt once at load time
//! 4. Per query: rank = evaluate(key), record = table[rank]
//!
//! ## Unknown Keys
//! No key fingerprints are stored. A key that was never written may resolve
//! to `None`, or to the location of some other key. Callers must only query
//! keys they wrote.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{IkvError, Result};
use crate::index::{unpack, Footer};
use crate::mphf::{BbHash, Evaluator, PerfectHash};

/// Read-only view over an ikv file
///
/// Immutable after load; share it between threads freely when `S` allows.
pub struct Ikv<S = Mmap, H: PerfectHash = BbHash> {
    /// Whole file contents
    storage: S,
    /// Rebuilt perfect hash
    evaluator: H::Evaluator,
    /// Decoded trailer
    footer: Footer,
    /// Start of the index block == end of payload data
    data_end: usize,
    /// Start of the offset table
    table_offset: usize,
}

impl Ikv<Mmap> {
    /// Memory-map an ikv file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only; ikv files are immutable once closed.
        let mmap = unsafe { Mmap::map(&file)? };
        let ikv = Self::load_with(mmap, &BbHash::default())?;
        tracing::debug!(
            path = %path.display(),
            entries = ikv.len(),
            has_size = ikv.has_size(),
            "ikv opened"
        );
        Ok(ikv)
    }
}

impl<S: AsRef<[u8]>> Ikv<S> {
    /// Load an ikv file already held in memory
    pub fn from_bytes(storage: S) -> Result<Self> {
        Self::load_with(storage, &BbHash::default())
    }
}

impl<S: AsRef<[u8]>, H: PerfectHash> Ikv<S, H> {
    /// Load with a specific perfect hash implementation
    pub fn load_with(storage: S, hasher: &H) -> Result<Self> {
        let bytes = storage.as_ref();
        let len = bytes.len();
        if len < Footer::SIZE {
            return Err(IkvError::Corrupted(format!(
                "file of {} bytes cannot hold a footer",
                len
            )));
        }

        let footer = Footer::decode(&bytes[len - Footer::SIZE..])?;
        let index_length = footer.index_length();
        if index_length > len {
            return Err(IkvError::Corrupted(format!(
                "index block of {} bytes exceeds file length {}",
                index_length, len
            )));
        }

        let data_end = len - index_length;
        let table_offset = data_end + footer.key_data_size as usize;
        let evaluator = hasher.load(&bytes[data_end..table_offset])?;
        if evaluator.len() != footer.entry_count as usize {
            return Err(IkvError::Corrupted(format!(
                "perfect hash covers {} keys, footer says {}",
                evaluator.len(),
                footer.entry_count
            )));
        }

        Ok(Self {
            storage,
            evaluator,
            footer,
            data_end,
            table_offset,
        })
    }

    /// Number of keys in the index
    pub fn len(&self) -> usize {
        self.footer.entry_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether payload sizes were stored
    pub fn has_size(&self) -> bool {
        self.footer.has_size
    }

    /// Length of everything before the index block
    pub fn data_len(&self) -> usize {
        self.data_end
    }

    /// Decoded footer
    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Table slot of `key`, if the hash claims it
    fn record(&self, key: i32) -> Option<&[u8]> {
        let rank = self.evaluator.evaluate(key)?;
        if rank >= self.len() {
            return None;
        }
        let width = self.footer.record_size();
        let start = self.table_offset + rank * width;
        Some(&self.storage.as_ref()[start..start + width])
    }

    /// Payload offset of `key`, for either kind of file
    pub fn get_offset(&self, key: i32) -> Option<u32> {
        let record = self.record(key)?;
        if self.footer.has_size {
            let (offset, _) = unpack(u64::from_le_bytes(record.try_into().ok()?));
            Some(offset)
        } else {
            Some(u32::from_le_bytes(record.try_into().ok()?))
        }
    }

    /// Payload `(offset, size)` of `key`
    pub fn get_offset_and_size(&self, key: i32) -> Result<Option<(u32, u32)>> {
        if !self.footer.has_size {
            return Err(IkvError::SizeNotStored);
        }
        Ok(self
            .record(key)
            .and_then(|record| record.try_into().ok())
            .map(|record| unpack(u64::from_le_bytes(record))))
    }

    /// Payload bytes of `key`
    pub fn get(&self, key: i32) -> Result<Option<&[u8]>> {
        let Some((offset, size)) = self.get_offset_and_size(key)? else {
            return Ok(None);
        };
        let start = offset as usize;
        let end = start + size as usize;
        if end > self.data_end {
            return Err(IkvError::Corrupted(format!(
                "payload {}..{} of key {} runs into the index at {}",
                start, end, key, self.data_end
            )));
        }
        Ok(Some(&self.storage.as_ref()[start..end]))
    }

    /// Bytes from the payload of `key` to the end of the data region
    ///
    /// Meant for files written without sizes whose payloads delimit
    /// themselves.
    pub fn get_unbounded(&self, key: i32) -> Result<Option<&[u8]>> {
        let Some(offset) = self.get_offset(key) else {
            return Ok(None);
        };
        let start = offset as usize;
        if start > self.data_end {
            return Err(IkvError::Corrupted(format!(
                "offset {} of key {} lies past the data region ({})",
                start, key, self.data_end
            )));
        }
        Ok(Some(&self.storage.as_ref()[start..self.data_end]))
    }
}
