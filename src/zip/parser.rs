//! Low-level zip archive parser.
//!
//! This module handles the binary parsing of zip structures, reading from
//! any [`DataBlock`].
//!
//! ## Parsing Strategy
//!
//! Zip files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the block's end
//! 2. If zip64, read the zip64 EOCD for 64-bit counts and offsets
//! 3. Work out where the zip data really starts, since executable jars
//!    often carry a launch script in front of it
//! 4. Read the Central Directory to get metadata for all entries
//!
//! Entry data is located later, on demand, through the Local File Header.

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use crate::block::DataBlock;
use crate::error::{Error, Result};

use super::directory::CentralDirectory;
use super::structures::*;

/// Maximum zip comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level zip parser over a single block.
///
/// Typically used through [`Archive`](super::Archive), which caches the
/// parsed directory.
pub struct ZipParser {
    /// The underlying data source
    block: Arc<dyn DataBlock>,
    /// Total size of the archive in bytes
    size: u64,
}

impl ZipParser {
    pub fn new(block: Arc<dyn DataBlock>) -> Result<Self> {
        let size = block.size()?;
        Ok(Self { block, size })
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record, its offset in the block and the archive comment.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64, String)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(Error::format(format!(
                "{} bytes is too small to be a zip archive",
                self.size
            )));
        }

        // Common case first: no comment, EOCD is the last 22 bytes.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.block.read_fully(offset, &mut buf).await?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf, offset)?;
            return Ok((eocd, offset, String::new()));
        }

        // Otherwise search backwards, at most one maximal comment away.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.block.read_fully(search_start, &mut buf).await?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // The comment length must account for exactly the remaining bytes.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let offset = search_start + i as u64;
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                        offset,
                    )?;
                    let comment =
                        String::from_utf8_lossy(&buf[i + EndOfCentralDirectory::SIZE..])
                            .into_owned();
                    return Ok((eocd, offset, comment));
                }
            }
        }

        Err(Error::format(format!(
            "no end of central directory record in the last {} bytes",
            search_size
        )))
    }

    /// Read the zip64 End of Central Directory record.
    ///
    /// The locator sits immediately before the regular EOCD. The record is
    /// looked up at the offset the locator gives, then right before the
    /// locator in case the archive has been prefixed.
    ///
    /// Returns the record and its offset in the block.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<(Zip64EOCD, u64)> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| {
                Error::format(format!(
                    "no room for a zip64 locator before the EOCD at offset {}",
                    eocd_offset
                ))
            })?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.block
            .read_fully(locator_offset, &mut locator_buf)
            .await?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf, locator_offset)?;

        let candidates = [
            Some(locator.eocd64_offset),
            locator_offset.checked_sub(Zip64EOCD::MIN_SIZE as u64),
        ];
        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        for candidate in candidates.into_iter().flatten() {
            match candidate.checked_add(Zip64EOCD::MIN_SIZE as u64) {
                Some(end) if end <= locator_offset => {}
                _ => continue,
            }
            self.block.read_fully(candidate, &mut eocd64_buf).await?;
            if Zip64EOCD::matches(&eocd64_buf) {
                return Ok((Zip64EOCD::from_bytes(&eocd64_buf, candidate)?, candidate));
            }
        }

        Err(Error::format(format!(
            "zip64 locator at offset {} points to offset {}, which holds no zip64 end of central directory record",
            locator_offset, locator.eocd64_offset
        )))
    }

    /// Parse the whole Central Directory.
    pub async fn parse(&self) -> Result<CentralDirectory> {
        let (eocd, eocd_offset, comment) = self.find_eocd().await?;
        debug!("Found end of central directory at offset {}", eocd_offset);

        // Get Central Directory info, using zip64 if needed. `cd_end` is where
        // the central directory actually stops in this block.
        let (cd_offset, cd_size, total_entries, cd_end, zip64) = if eocd.is_zip64() {
            let (eocd64, eocd64_offset) = self.read_zip64_eocd(eocd_offset).await?;
            debug!(
                "Using zip64 end of central directory at offset {} ({} entries)",
                eocd64_offset, eocd64.total_entries
            );
            (
                eocd64.cd_offset,
                eocd64.cd_size,
                eocd64.total_entries,
                eocd64_offset,
                true,
            )
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
                eocd_offset,
                false,
            )
        };

        let archive_start = cd_offset
            .checked_add(cd_size)
            .and_then(|recorded_end| cd_end.checked_sub(recorded_end))
            .ok_or_else(|| {
                Error::format(format!(
                    "central directory of {} bytes at offset {} does not fit before offset {}",
                    cd_size, cd_offset, cd_end
                ))
            })?;
        if archive_start > 0 {
            debug!("Zip data starts {} bytes into the block", archive_start);
        }

        let cd_start = archive_start + cd_offset;
        let cd_len = usize::try_from(cd_size)
            .map_err(|_| Error::unsupported("central directory does not fit in memory"))?;
        let mut cd_data = vec![0u8; cd_len];
        self.block.read_fully(cd_start, &mut cd_data).await?;

        // A header is at least 46 bytes; don't trust the count for capacity.
        let capacity = total_entries.min(cd_size / CDFH_MIN_SIZE as u64) as usize;
        let mut entries = Vec::with_capacity(capacity);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..total_entries {
            let header_offset = cd_start + cursor.position();
            let entry = parse_cdfh(&mut cursor, header_offset, archive_start).map_err(|e| {
                match e {
                    Error::Io { source, .. } => Error::Io {
                        context: format!(
                            "reading central directory entry {} at offset {}",
                            index, header_offset
                        ),
                        source,
                    },
                    other => other,
                }
            })?;
            entries.push(entry);
        }

        debug!(
            "Parsed {} central directory entries at offset {}",
            entries.len(),
            cd_start
        );
        Ok(CentralDirectory::new(
            entries,
            cd_start,
            cd_size,
            archive_start,
            zip64,
            comment,
        ))
    }
}

/// Parse a Central Directory File Header from a cursor.
///
/// `header_offset` is only used for error messages. `archive_start` is added
/// to the recorded local header offset.
fn parse_cdfh(
    cursor: &mut Cursor<&[u8]>,
    header_offset: u64,
    archive_start: u64,
) -> Result<ZipEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::format(format!(
            "invalid central directory file header signature at offset {}",
            header_offset
        )));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Use lossy conversion to handle non-UTF8 names gracefully
    let name = String::from_utf8_lossy(&file_name_bytes).into_owned();
    let is_directory = name.ends_with('/');

    // Zip64 extended information only carries the fields whose header value
    // is the 0xFFFFFFFF sentinel, in this fixed order.
    let extra_field_end = cursor.position() + extra_field_length as u64;
    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == ZIP64_EXTRA_ID {
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end + file_comment_length as u64);
    if cursor.position() > cursor.get_ref().len() as u64 {
        return Err(Error::io(
            format!("reading central directory header at offset {}", header_offset),
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "extra field or comment runs past the end of the central directory",
            ),
        ));
    }

    let lfh_offset = lfh_offset
        .checked_add(archive_start)
        .ok_or_else(|| Error::format(format!("local header offset of '{}' overflows", name)))?;

    Ok(ZipEntry {
        name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        flags,
        lfh_offset,
        last_mod_time,
        last_mod_date,
        is_directory,
    })
}

/// Get the offset of an entry's first data byte.
///
/// The Local File Header has variable-length fields (name, extra field)
/// that may differ from the Central Directory copy, so it has to be read.
pub async fn local_data_offset(block: &dyn DataBlock, entry: &ZipEntry) -> Result<u64> {
    let mut lfh_buf = [0u8; LFH_SIZE];
    block.read_fully(entry.lfh_offset, &mut lfh_buf).await?;
    let header = LocalFileHeader::from_bytes(&lfh_buf, entry.lfh_offset).map_err(|_| {
        Error::format(format!(
            "invalid local file header for '{}' at offset {}",
            entry.name, entry.lfh_offset
        ))
    })?;
    Ok(entry.lfh_offset + header.header_len())
}
