use std::sync::Arc;

use async_trait::async_trait;

use super::DataBlock;
use crate::error::Result;

/// A block backed by bytes held in memory.
#[derive(Clone)]
pub struct MemoryDataBlock {
    bytes: Arc<[u8]>,
}

impl MemoryDataBlock {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[async_trait]
impl DataBlock for MemoryDataBlock {
    fn size(&self) -> Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if pos >= self.bytes.len() as u64 {
            return Ok(0);
        }
        let src = &self.bytes[pos as usize..];
        let count = src.len().min(buf.len());
        buf[..count].copy_from_slice(&src[..count]);
        Ok(count)
    }
}
