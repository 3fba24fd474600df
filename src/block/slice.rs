use std::sync::Arc;

use async_trait::async_trait;

use super::DataBlock;
use crate::error::{Error, Result};

/// A window `[offset, offset + len)` over another block.
#[derive(Clone)]
pub struct DataBlockSlice {
    inner: Arc<dyn DataBlock>,
    offset: u64,
    len: u64,
}

impl DataBlockSlice {
    /// Carve a window out of `inner`. The window must lie inside it.
    pub fn new(inner: Arc<dyn DataBlock>, offset: u64, len: u64) -> Result<Self> {
        let size = inner.size()?;
        match offset.checked_add(len) {
            Some(end) if end <= size => Ok(Self { inner, offset, len }),
            _ => Err(Error::contract(format!(
                "slice [{}, +{}) is outside a block of {} bytes",
                offset, len, size
            ))),
        }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// A window into this window, sharing the same underlying block.
    pub fn slice(&self, offset: u64, len: u64) -> Result<Self> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(Self {
                inner: self.inner.clone(),
                offset: self.offset + offset,
                len,
            }),
            _ => Err(Error::contract(format!(
                "slice [{}, +{}) is outside a block of {} bytes",
                offset, len, self.len
            ))),
        }
    }
}

#[async_trait]
impl DataBlock for DataBlockSlice {
    fn size(&self) -> Result<u64> {
        Ok(self.len)
    }

    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if pos >= self.len {
            return Ok(0);
        }
        let available = (self.len - pos).min(buf.len() as u64) as usize;
        self.inner
            .read_at(self.offset + pos, &mut buf[..available])
            .await
    }
}
