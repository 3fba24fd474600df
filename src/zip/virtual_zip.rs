//! Zip archives synthesized over a directory of another archive.
//!
//! The entries under a directory prefix are re-addressed as a standalone
//! archive without copying any entry data: each entry becomes a freshly
//! written local header followed by a slice of the original (still
//! compressed) data, and a new central directory and EOCD are appended.

use byteorder::{LittleEndian, WriteBytesExt};
use std::sync::Arc;

use crate::block::{DataBlock, MemoryDataBlock, VirtualDataBlock};
use crate::error::{Error, Result};

use super::directory::CentralDirectory;
use super::entry::raw_data;
use super::structures::EndOfCentralDirectory;

const ZIP32_LIMIT: u64 = u32::MAX as u64;

/// Build an archive over every entry of `directory` under `prefix`, with
/// the prefix stripped from the names.
pub async fn directory_archive(
    source: Arc<dyn DataBlock>,
    directory: &CentralDirectory,
    prefix: &str,
) -> Result<VirtualDataBlock> {
    let mut parts: Vec<Arc<dyn DataBlock>> = Vec::new();
    let mut central = Vec::new();
    let mut offset = 0u64;
    let mut count = 0u64;

    for entry in directory.under(prefix) {
        let name = &entry.name[prefix.len()..];
        if entry.compressed_size >= ZIP32_LIMIT
            || entry.uncompressed_size >= ZIP32_LIMIT
            || offset >= ZIP32_LIMIT
        {
            return Err(Error::unsupported(format!(
                "'{}' needs zip64 to be re-addressed under '{}'",
                entry.name, prefix
            )));
        }

        let mut local = Vec::with_capacity(30 + name.len());
        entry.write_local_header(name, &mut local)?;
        entry.write_central_header(name, offset as u32, &mut central)?;
        let data = raw_data(source.clone(), entry).await?;

        offset += local.len() as u64 + entry.compressed_size;
        count += 1;
        parts.push(Arc::new(MemoryDataBlock::new(local)));
        parts.push(Arc::new(data));
    }

    if count >= 0xFFFF || offset >= ZIP32_LIMIT || central.len() as u64 >= ZIP32_LIMIT {
        return Err(Error::unsupported(format!(
            "directory '{}' is too large to be re-addressed without zip64",
            prefix
        )));
    }

    let mut eocd = Vec::with_capacity(EndOfCentralDirectory::SIZE);
    eocd.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
    eocd.write_u16::<LittleEndian>(0)?;
    eocd.write_u16::<LittleEndian>(0)?;
    eocd.write_u16::<LittleEndian>(count as u16)?;
    eocd.write_u16::<LittleEndian>(count as u16)?;
    eocd.write_u32::<LittleEndian>(central.len() as u32)?;
    eocd.write_u32::<LittleEndian>(offset as u32)?;
    eocd.write_u16::<LittleEndian>(0)?;

    parts.push(Arc::new(MemoryDataBlock::new(central)));
    parts.push(Arc::new(MemoryDataBlock::new(eocd)));
    VirtualDataBlock::new(parts)
}
