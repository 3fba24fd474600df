//! # bootjar
//!
//! Random access to executable jar archives and the archives nested inside
//! them, without extracting anything to disk.
//!
//! Every byte source is a [`DataBlock`]: a file, a window into another block,
//! an inflating view over a deflated entry, or a [`VirtualDataBlock`] stitched
//! together from several of these. A nested jar is just a window into its
//! parent, so it is parsed and read exactly like a file on disk.
//!
//! ## Features
//!
//! - Central directory parsing with zip64 support and launch-script prefixes
//! - STORED and DEFLATE entries, inflated lazily on read
//! - Nested archives (`outer.jar!/BOOT-INF/lib/inner.jar!/...`)
//! - Directories of an archive presented as standalone archives
//! - Classpath resolution for packed and exploded executable jars
//!
//! ## Example
//!
//! ```no_run
//! use bootjar::{Archive, DataBlock};
//!
//! #[tokio::main]
//! async fn main() -> bootjar::Result<()> {
//!     let archive = Archive::open("app.jar").await?;
//!
//!     for entry in archive.list_entries().await? {
//!         println!("{}", entry.name);
//!     }
//!
//!     let manifest = archive
//!         .open_path("BOOT-INF/lib/foo.jar!/META-INF/MANIFEST.MF")
//!         .await?
//!         .read_all()
//!         .await?;
//!     println!("{}", String::from_utf8_lossy(&manifest));
//!
//!     Ok(())
//! }
//! ```

pub mod block;
pub mod cli;
pub mod error;
pub mod launcher;
pub mod zip;

pub use block::{
    DataBlock, DataBlockSlice, FileDataBlock, InflatingDataBlock, MemoryDataBlock,
    VirtualDataBlock,
};
pub use cli::Cli;
pub use error::{Error, Result};
pub use launcher::{
    ClassPathContent, ClassPathEntry, ClassPathIndex, ExplodedArchive, LaunchLayout,
    LaunchSource, Launcher, Manifest, PackedArchive,
};
pub use zip::{
    Archive, CentralDirectory, CompressionMethod, EntryBlock, EntryKind, MAX_NESTING_DEPTH,
    NESTED_SEPARATOR, ZipEntry,
};
