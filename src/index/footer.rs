//! Index Footer
//!
//! Fixed 9-byte trailer describing the index block layout.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{IkvError, Result};

use super::record_size;

/// Trailer at the very end of an ikv file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Number of offset-table records
    pub entry_count: u32,
    /// Length of the serialized perfect hash
    pub key_data_size: u32,
    /// Whether table records carry payload sizes
    pub has_size: bool,
}

impl Footer {
    /// EntryCount (4) + KeyDataSize (4) + HasSize (1)
    pub const SIZE: usize = 9;

    /// Width of one offset-table record
    pub fn record_size(&self) -> usize {
        record_size(self.has_size)
    }

    /// Length of the offset table
    pub fn table_length(&self) -> usize {
        self.entry_count as usize * self.record_size()
    }

    /// Length of key data + table + footer
    pub fn index_length(&self) -> usize {
        self.key_data_size as usize + self.table_length() + Self::SIZE
    }

    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_i32_le(self.entry_count as i32);
        buf.put_i32_le(self.key_data_size as i32);
        buf.put_u8(self.has_size as u8);
    }

    /// Decode exactly [`Footer::SIZE`] bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::SIZE {
            return Err(IkvError::Corrupted(format!(
                "footer must be {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        let mut buf = bytes;
        let entry_count = buf.get_i32_le();
        let key_data_size = buf.get_i32_le();
        let flag = buf.get_u8();

        if entry_count < 0 || key_data_size < 0 {
            return Err(IkvError::Corrupted(format!(
                "negative footer counts: entries={}, key data={}",
                entry_count, key_data_size
            )));
        }
        let has_size = match flag {
            0 => false,
            1 => true,
            other => {
                return Err(IkvError::Corrupted(format!(
                    "invalid size flag {}",
                    other
                )))
            }
        };

        Ok(Self {
            entry_count: entry_count as u32,
            key_data_size: key_data_size as u32,
            has_size,
        })
    }
}
