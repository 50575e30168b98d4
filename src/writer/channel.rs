//! Output Channel
//!
//! Positional sink the writer appends payloads and the index block to.

use std::fs::File;
use std::io::{self, ErrorKind};

use bytes::Buf;

/// Random-access output for [`IkvWriter`](super::IkvWriter)
///
/// `write_at` may accept fewer bytes than offered; the writer keeps calling it
/// at the advanced offset until everything is written.
pub trait IkvChannel {
    /// Write up to `buf.len()` bytes at absolute `offset`, returning the count
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize>;

    /// Make written bytes durable
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl IkvChannel for File {
    #[cfg(unix)]
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::write_at(&*self, buf, offset)
    }

    #[cfg(windows)]
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        std::os::windows::fs::FileExt::seek_write(&*self, buf, offset)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// In-memory channel; writing past the end zero-fills the gap
impl IkvChannel for Vec<u8> {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "offset exceeds memory"))?;
        let end = start + buf.len();
        if self.len() < end {
            self.resize(end, 0);
        }
        self[start..end].copy_from_slice(buf);
        Ok(buf.len())
    }
}

impl<C: IkvChannel + ?Sized> IkvChannel for &mut C {
    fn write_at(&mut self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }

    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Drain `buf` into `channel` starting at `offset`, retrying short writes.
///
/// Returns the number of bytes written, which is always the initial
/// `buf.remaining()` on success.
pub(crate) fn write_buf_at<C, B>(channel: &mut C, buf: &mut B, offset: u64) -> io::Result<u64>
where
    C: IkvChannel + ?Sized,
    B: Buf + ?Sized,
{
    let mut written = 0u64;
    while buf.has_remaining() {
        match channel.write_at(buf.chunk(), offset + written) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    "channel accepted no bytes",
                ))
            }
            Ok(n) => {
                buf.advance(n);
                written += n as u64;
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}
