//! Randomly addressable byte sources.
//!
//! Everything the loader reads goes through [`DataBlock`]: the archive file
//! itself, windows carved out of it for single entries, inflating views over
//! deflated entries, and virtual blocks stitched together from several of
//! these. All reads are positioned, there is no shared cursor, so a block can
//! be read from several tasks at once.

mod file;
mod inflate;
mod memory;
mod slice;
mod virtual_block;

pub use file::FileDataBlock;
pub use inflate::InflatingDataBlock;
pub use memory::MemoryDataBlock;
pub use slice::DataBlockSlice;
pub use virtual_block::VirtualDataBlock;

use std::io;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// A finite byte source supporting positioned reads.
#[async_trait]
pub trait DataBlock: Send + Sync {
    /// Total number of addressable bytes.
    ///
    /// Fails with an I/O error if the backing resource is gone.
    fn size(&self) -> Result<u64>;

    /// Read bytes starting at `pos` into `buf`.
    ///
    /// Returns the number of bytes copied. `Ok(0)` for a non-empty `buf`
    /// means there is no more data at `pos`. Reads may be short; callers
    /// that need the whole buffer filled use [`DataBlock::read_fully`].
    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize>;

    /// Fill `buf` completely from `pos`, failing with `UnexpectedEof` if the
    /// block ends first.
    async fn read_fully(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let at = pos + filled as u64;
            let count = self.read_at(at, &mut buf[filled..]).await?;
            if count == 0 {
                return Err(Error::io(
                    format!("reading {} bytes at offset {}", buf.len(), pos),
                    io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("data ended at offset {}", at),
                    ),
                ));
            }
            filled += count;
        }
        Ok(())
    }

    /// Read the whole block into memory.
    async fn read_all(&self) -> Result<Vec<u8>> {
        let size = usize::try_from(self.size()?)
            .map_err(|_| Error::unsupported("block too large to load into memory"))?;
        let mut buf = vec![0u8; size];
        self.read_fully(0, &mut buf).await?;
        Ok(buf)
    }
}

#[async_trait]
impl<T: DataBlock + ?Sized> DataBlock for Arc<T> {
    fn size(&self) -> Result<u64> {
        (**self).size()
    }

    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(pos, buf).await
    }
}
