use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use log::debug;

use super::DataBlock;
use crate::error::{Error, IoResultExt, Result};

/// A local file read with positioned reads.
///
/// The handle is released when the block is dropped or explicitly
/// [closed](FileDataBlock::close); reads after closing fail.
pub struct FileDataBlock {
    path: PathBuf,
    file: RwLock<Option<File>>,
    size: u64,
}

impl FileDataBlock {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).io_context(|| format!("opening {}", path.display()))?;
        let size = file
            .metadata()
            .io_context(|| format!("reading metadata of {}", path.display()))?
            .len();
        debug!("Opened {} ({} bytes)", path.display(), size);
        Ok(Self {
            path,
            file: RwLock::new(Some(file)),
            size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the file handle. Closing twice is a no-op.
    pub fn close(&self) {
        let mut guard = match self.file.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            debug!("Closed {}", self.path.display());
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.file.read() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }

    fn closed_error(&self) -> Error {
        Error::io(
            format!("reading {}", self.path.display()),
            io::Error::new(io::ErrorKind::NotConnected, "file has been closed"),
        )
    }

    fn read_blocking(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let guard = match self.file.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let file = guard.as_ref().ok_or_else(|| self.closed_error())?;

        if buf.is_empty() || pos >= self.size {
            return Ok(0);
        }
        let available = (self.size - pos).min(buf.len() as u64) as usize;
        let buf = &mut buf[..available];

        #[cfg(unix)]
        let read = {
            use std::os::unix::fs::FileExt;
            file.read_at(buf, pos)
        };

        #[cfg(windows)]
        let read = {
            use std::os::windows::fs::FileExt;
            file.seek_read(buf, pos)
        };

        read.io_context(|| format!("reading {} at offset {}", self.path.display(), pos))
    }
}

#[async_trait]
impl DataBlock for FileDataBlock {
    fn size(&self) -> Result<u64> {
        if self.is_closed() {
            return Err(self.closed_error());
        }
        Ok(self.size)
    }

    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.read_blocking(pos, buf)
    }
}
