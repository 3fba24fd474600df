use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use super::DataBlock;
use crate::error::{Error, Result};

/// A block made by concatenating other blocks.
///
/// Part `i` starts at the sum of the sizes of parts `0..i`. A read that
/// reaches the end of one part carries on into the next one in the same
/// call, so callers see one continuous stream.
pub struct VirtualDataBlock {
    parts: OnceLock<Parts>,
}

struct Parts {
    blocks: Vec<Arc<dyn DataBlock>>,
    starts: Vec<u64>,
    size: u64,
}

impl VirtualDataBlock {
    pub fn new(parts: Vec<Arc<dyn DataBlock>>) -> Result<Self> {
        let block = Self::deferred();
        block.set_parts(parts)?;
        Ok(block)
    }

    /// A block whose parts are supplied later through
    /// [`set_parts`](VirtualDataBlock::set_parts). Using it before then is a
    /// contract violation.
    pub fn deferred() -> Self {
        Self {
            parts: OnceLock::new(),
        }
    }

    pub fn set_parts(&self, parts: Vec<Arc<dyn DataBlock>>) -> Result<()> {
        let mut starts = Vec::with_capacity(parts.len());
        let mut size = 0u64;
        for part in &parts {
            starts.push(size);
            size = size
                .checked_add(part.size()?)
                .ok_or_else(|| Error::format("virtual block size overflows u64"))?;
        }
        self.parts
            .set(Parts {
                blocks: parts,
                starts,
                size,
            })
            .map_err(|_| Error::contract("virtual block parts have already been set"))
    }

    pub fn parts(&self) -> Result<&[Arc<dyn DataBlock>]> {
        Ok(&self.state()?.blocks)
    }

    fn state(&self) -> Result<&Parts> {
        self.parts
            .get()
            .ok_or_else(|| Error::contract("virtual block used before its parts were set"))
    }
}

#[async_trait]
impl DataBlock for VirtualDataBlock {
    fn size(&self) -> Result<u64> {
        Ok(self.state()?.size)
    }

    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let parts = self.state()?;
        if pos >= parts.size || buf.is_empty() {
            return Ok(0);
        }

        // Last part starting at or before `pos`; empty parts are skipped by
        // the range check below.
        let first = parts.starts.partition_point(|&start| start <= pos) - 1;

        let mut pos = pos;
        let mut total = 0;
        for (index, part) in parts.blocks.iter().enumerate().skip(first) {
            let start = parts.starts[index];
            let end = parts
                .starts
                .get(index + 1)
                .copied()
                .unwrap_or(parts.size);
            while pos >= start && pos < end {
                let count = part.read_at(pos - start, &mut buf[total..]).await?;
                total += count;
                if count == 0 || total == buf.len() {
                    return Ok(total);
                }
                pos += count as u64;
            }
        }
        Ok(total)
    }
}
