//! Zip/jar archive parsing and nested archive views.
//!
//! This module reads archives through [`DataBlock`](crate::block::DataBlock)s,
//! so an archive stored inside another archive is read exactly like one on
//! disk: no extraction, just offset translation.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing zip format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of zip structures from a block
//! - [`directory`]: The parsed, ordered central directory
//! - [`entry`]: Content views over single entries, stored or inflated
//! - [`virtual_zip`]: Archives synthesized over a directory of another archive
//! - [`archive`]: The user-facing archive with its cached directory
//!
//! ## Zip Format Overview
//!
//! A zip file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The EOCD is read first (from the end of the block), then the Central
//! Directory, which allows listing entries without touching their data.
//!
//! ## Supported Features
//!
//! - Standard zip format (PKZIP APPNOTE 6.3.x compatible)
//! - Zip64 extensions for large archives and large entry counts
//! - Archives with arbitrary data in front of them (launch scripts)
//! - STORED (no compression) and DEFLATE methods
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod directory;
mod entry;
mod parser;
mod structures;
mod virtual_zip;

pub use archive::{Archive, MAX_NESTING_DEPTH, NESTED_SEPARATOR};
pub use directory::CentralDirectory;
pub use entry::EntryBlock;
pub use parser::{ZipParser, local_data_offset};
pub use structures::*;
pub use virtual_zip::directory_archive;
