use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use tokio::sync::OnceCell;

use crate::block::{DataBlock, FileDataBlock};
use crate::error::{Error, Result};

use super::directory::CentralDirectory;
use super::entry::EntryBlock;
use super::parser::ZipParser;
use super::structures::ZipEntry;
use super::virtual_zip::directory_archive;

/// How deep archives may be nested inside each other.
pub const MAX_NESTING_DEPTH: usize = 8;

/// Separates the segments of a path into nested archives, as in
/// `app.jar!/BOOT-INF/lib/foo.jar!/META-INF/MANIFEST.MF`.
pub const NESTED_SEPARATOR: &str = "!/";

/// A zip archive readable at random through its [`DataBlock`].
///
/// The central directory is parsed once, on first use, and cached together
/// with a possible failure until the archive is closed.
pub struct Archive {
    name: String,
    block: Arc<dyn DataBlock>,
    file: Option<Arc<FileDataBlock>>,
    depth: usize,
    closed: AtomicBool,
    directory: OnceCell<Result<Arc<CentralDirectory>>>,
}

impl Archive {
    /// Open and index the archive at `path`.
    ///
    /// The directory is parsed before returning; on failure the file handle
    /// is released along with the half-built archive.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = Arc::new(FileDataBlock::open(path)?);
        let archive = Self {
            name: path.display().to_string(),
            block: file.clone(),
            file: Some(file),
            depth: 0,
            closed: AtomicBool::new(false),
            directory: OnceCell::new(),
        };
        archive.central_directory().await?;
        Ok(archive)
    }

    /// Use `block` as an archive. Parsing is deferred to the first access.
    pub fn from_block(name: impl Into<String>, block: Arc<dyn DataBlock>) -> Self {
        Self {
            name: name.into(),
            block,
            file: None,
            depth: 0,
            closed: AtomicBool::new(false),
            directory: OnceCell::new(),
        }
    }

    fn nested(&self, name: String, block: Arc<dyn DataBlock>) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::format(format!(
                "{} is nested more than {} archives deep",
                name, MAX_NESTING_DEPTH
            )));
        }
        Ok(Self {
            depth,
            ..Self::from_block(name, block)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block(&self) -> Arc<dyn DataBlock> {
        self.block.clone()
    }

    /// Number of archives this one is nested in.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The parsed central directory, computed once.
    pub async fn central_directory(&self) -> Result<Arc<CentralDirectory>> {
        self.ensure_open()?;
        self.directory
            .get_or_init(|| async {
                debug!("Reading central directory of {}", self.name);
                let parsed = match ZipParser::new(self.block.clone()) {
                    Ok(parser) => parser.parse().await,
                    Err(e) => Err(e),
                };
                parsed.map(Arc::new).map_err(|e| {
                    let e = e.within(&self.name);
                    debug!("{}", e);
                    e
                })
            })
            .await
            .clone()
    }

    /// All entries in central directory order.
    pub async fn list_entries(&self) -> Result<Vec<ZipEntry>> {
        Ok(self.central_directory().await?.entries().to_vec())
    }

    /// The first entry called `name`.
    pub async fn entry(&self, name: &str) -> Result<Option<ZipEntry>> {
        Ok(self.central_directory().await?.find(name).cloned())
    }

    async fn require_entry(&self, name: &str) -> Result<ZipEntry> {
        self.entry(name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("'{}' in {}", name, self.name)))
    }

    /// The uncompressed content of `entry`.
    pub async fn open_entry(&self, entry: &ZipEntry) -> Result<EntryBlock> {
        self.ensure_open()?;
        EntryBlock::open(self.block.clone(), entry)
            .await
            .map_err(|e| e.within(&self.name))
    }

    /// Read `entry` as an archive of its own. Its directory is parsed on
    /// first use.
    pub async fn open_nested(&self, entry: &ZipEntry) -> Result<Archive> {
        let content = self.open_entry(entry).await?;
        self.nested(
            format!("{}{}{}", self.name, NESTED_SEPARATOR, entry.name),
            Arc::new(content),
        )
    }

    /// Present the entries under `prefix` as an archive of their own, with
    /// the prefix removed from their names.
    pub async fn open_directory(&self, prefix: &str) -> Result<Archive> {
        let prefix = if prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{}/", prefix)
        };
        let directory = self.central_directory().await?;
        let block = directory_archive(self.block.clone(), &directory, &prefix)
            .await
            .map_err(|e| e.within(&self.name))?;
        debug!(
            "Built virtual archive for {}{}{}",
            self.name, NESTED_SEPARATOR, prefix
        );
        self.nested(
            format!("{}{}{}", self.name, NESTED_SEPARATOR, prefix),
            Arc::new(block),
        )
    }

    /// Open an entry through nested archives, e.g.
    /// `BOOT-INF/lib/foo.jar!/META-INF/MANIFEST.MF`.
    pub async fn open_path(&self, path: &str) -> Result<EntryBlock> {
        let (parents, leaf) = match path.rsplit_once(NESTED_SEPARATOR) {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        if leaf.is_empty() {
            return Err(Error::NotFound(format!("'{}' in {}", path, self.name)));
        }
        match parents {
            Some(parents) => {
                let archive = self.open_archive_path(parents).await?;
                let entry = archive.require_entry(leaf).await?;
                archive.open_entry(&entry).await
            }
            None => {
                let entry = self.require_entry(leaf).await?;
                self.open_entry(&entry).await
            }
        }
    }

    /// Open a nested archive through `!/`-separated segments, e.g.
    /// `BOOT-INF/lib/foo.jar!/lib/inner.jar`. A segment ending in `/` opens
    /// that directory as an archive.
    pub async fn open_archive_path(&self, path: &str) -> Result<Archive> {
        let mut current: Option<Archive> = None;
        for segment in path.split(NESTED_SEPARATOR) {
            if segment.is_empty() {
                return Err(Error::NotFound(format!("'{}' in {}", path, self.name)));
            }
            let next = {
                let archive = current.as_ref().unwrap_or(self);
                if segment.ends_with('/') {
                    archive.open_directory(segment).await?
                } else {
                    let entry = archive.require_entry(segment).await?;
                    archive.open_nested(&entry).await?
                }
            };
            current = Some(next);
        }
        current.ok_or_else(|| Error::NotFound(format!("'{}' in {}", path, self.name)))
    }

    /// Release the underlying file, if this archive owns one. Reads through
    /// this archive and every view derived from it fail afterwards.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if let Some(file) = &self.file {
                file.close();
            }
            debug!("Closed {}", self.name);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::io(
                format!("accessing {}", self.name),
                io::Error::new(io::ErrorKind::NotConnected, "archive has been closed"),
            ));
        }
        Ok(())
    }
}
