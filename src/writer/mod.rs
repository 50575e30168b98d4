//! Writer Module
//!
//! Appends payloads to a channel and finishes with the index block.
//!
//! ## Responsibilities
//! - Write payloads back to back from a monotonic cursor
//! - Record each payload's `(key, offset, size)` in the index builder
//! - Retry short writes until every byte has landed
//! - On close: append the index after the last payload, sync, release channel
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Prefix (start_offset bytes, optional)   │
//! ├─────────────────────────────────────────┤
//! │ Payload 1 | Payload 2 | ... | Payload N │
//! ├─────────────────────────────────────────┤
//! │ Index Block (see `index` module)        │
//! └─────────────────────────────────────────┘
//! ```

mod channel;

use bytes::Buf;
use serde::Serialize;

use crate::config::IkvConfig;
use crate::error::{IkvError, Result};
use crate::index::{Entry, IkvIndexBuilder, IndexInfo};
use crate::mphf::{BbHash, PerfectHash};

pub use channel::IkvChannel;
use channel::write_buf_at;

/// Summary returned by [`IkvWriter::close`] and [`IkvWriter::finish`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IkvInfo {
    /// Bytes of payload written (excluding any prefix)
    pub data_length: u64,
    /// Position where the index block starts
    pub index_offset: u64,
    /// Position just past the footer
    pub file_length: u64,
    /// Index block details
    pub index: IndexInfo,
}

/// Sequential writer producing one ikv file
///
/// Owns the channel until [`close`](Self::close) or [`finish`](Self::finish).
/// Dropping a writer without closing it leaves the payloads without an index.
pub struct IkvWriter<C: IkvChannel, H: PerfectHash = BbHash> {
    /// Output channel
    channel: C,
    /// Collects payload locations
    builder: IkvIndexBuilder<H>,
    /// Next write position (bytes written so far, including the prefix)
    position: u64,
    /// Where payloads began
    start_offset: u64,
}

impl<C: IkvChannel> IkvWriter<C> {
    /// Create a writer starting at position 0
    pub fn new(channel: C, write_size: bool) -> Self {
        Self::with_builder(channel, IkvIndexBuilder::new(write_size), 0)
    }

    /// Create a writer from a config
    pub fn with_config(channel: C, config: &IkvConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_builder(
            channel,
            IkvIndexBuilder::with_config(config),
            config.start_offset,
        ))
    }
}

impl<C: IkvChannel, H: PerfectHash> IkvWriter<C, H> {
    /// Create a writer around an existing builder, first payload at `start_offset`
    pub fn with_builder(channel: C, builder: IkvIndexBuilder<H>, start_offset: u64) -> Self {
        Self {
            channel,
            builder,
            position: start_offset,
            start_offset,
        }
    }

    /// Current write position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of payloads written so far
    pub fn entry_count(&self) -> usize {
        self.builder.len()
    }

    /// Append `data` under `key`
    pub fn write(&mut self, key: i32, data: &[u8]) -> Result<()> {
        self.write_buf(key, data)
    }

    /// Append the remaining bytes of `data` under `key`
    pub fn write_buf<B: Buf>(&mut self, key: i32, mut data: B) -> Result<()> {
        let offset = u32::try_from(self.position).map_err(|_| IkvError::Overflow {
            field: "offset",
            value: self.position,
        })?;
        let remaining = data.remaining();
        let size = u32::try_from(remaining).map_err(|_| IkvError::Overflow {
            field: "size",
            value: remaining as u64,
        })?;

        // A failed write leaves no entry and the cursor in place
        let written = write_buf_at(&mut self.channel, &mut data, self.position)?;
        self.builder.add(Entry::new(key, offset, size));
        self.position += written;

        tracing::trace!(key, offset, size, "ikv entry written");
        Ok(())
    }

    /// Write the index block, sync and drop the channel
    pub fn close(self) -> Result<IkvInfo> {
        let (_channel, info) = self.finish()?;
        Ok(info)
    }

    /// Write the index block, sync and return the channel
    pub fn finish(self) -> Result<(C, IkvInfo)> {
        let Self {
            mut channel,
            builder,
            mut position,
            start_offset,
        } = self;

        let index_offset = position;
        let index = builder.write(|mut buf| {
            position += write_buf_at(&mut channel, &mut buf, position)?;
            Ok(())
        })?;
        channel.sync()?;

        let info = IkvInfo {
            data_length: index_offset - start_offset,
            index_offset,
            file_length: position,
            index,
        };
        tracing::debug!(
            entries = info.index.entry_count,
            data_length = info.data_length,
            file_length = info.file_length,
            "ikv writer closed"
        );
        Ok((channel, info))
    }
}
