use std::sync::Arc;

use async_trait::async_trait;

use crate::block::{DataBlock, DataBlockSlice, InflatingDataBlock};
use crate::error::{Error, Result};

use super::parser::local_data_offset;
use super::structures::{CompressionMethod, ZipEntry};

/// The content of one entry, as uncompressed bytes.
pub enum EntryBlock {
    Stored(DataBlockSlice),
    Deflated(InflatingDataBlock),
}

impl EntryBlock {
    /// Build the content view of `entry` inside `block`.
    ///
    /// Unknown compression methods fail here, not while listing.
    pub async fn open(block: Arc<dyn DataBlock>, entry: &ZipEntry) -> Result<Self> {
        let data = raw_data(block, entry).await?;
        match entry.compression_method {
            CompressionMethod::Stored => {
                if entry.compressed_size != entry.uncompressed_size {
                    return Err(Error::format(format!(
                        "stored entry '{}' has compressed size {} but uncompressed size {}",
                        entry.name, entry.compressed_size, entry.uncompressed_size
                    )));
                }
                Ok(EntryBlock::Stored(data))
            }
            CompressionMethod::Deflated => {
                let block = InflatingDataBlock::new(
                    Arc::new(data),
                    entry.uncompressed_size,
                    entry.name.clone(),
                )?;
                if entry.uncompressed_size == 0 {
                    // Reads of an empty block never touch the stream; check it now.
                    block.read_at(0, &mut [0u8; 1]).await?;
                }
                Ok(EntryBlock::Deflated(block))
            }
            CompressionMethod::Unknown(method) => Err(Error::unsupported(format!(
                "compression method {} of entry '{}'",
                method, entry.name
            ))),
        }
    }
}

/// The entry's data as stored in the archive, still compressed.
pub(crate) async fn raw_data(block: Arc<dyn DataBlock>, entry: &ZipEntry) -> Result<DataBlockSlice> {
    let start = local_data_offset(block.as_ref(), entry).await?;
    let size = block.size()?;
    match start.checked_add(entry.compressed_size) {
        Some(end) if end <= size => DataBlockSlice::new(block, start, entry.compressed_size),
        _ => Err(Error::format(format!(
            "data of '{}' ({} bytes at offset {}) runs past the end of the archive ({} bytes)",
            entry.name, entry.compressed_size, start, size
        ))),
    }
}

#[async_trait]
impl DataBlock for EntryBlock {
    fn size(&self) -> Result<u64> {
        match self {
            EntryBlock::Stored(block) => block.size(),
            EntryBlock::Deflated(block) => block.size(),
        }
    }

    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        match self {
            EntryBlock::Stored(block) => block.read_at(pos, buf).await,
            EntryBlock::Deflated(block) => block.read_at(pos, buf).await,
        }
    }
}
