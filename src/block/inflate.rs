use std::sync::Arc;

use async_trait::async_trait;
use flate2::{Decompress, FlushDecompress, Status};
use log::trace;
use tokio::sync::Mutex;

use super::DataBlock;
use crate::error::{Error, Result};

const INPUT_BUFFER_SIZE: usize = 16 * 1024;
const SKIP_BUFFER_SIZE: usize = 8 * 1024;

/// Exposes raw deflate data as its uncompressed bytes.
///
/// Inflation is lazy: a read inflates from the current stream position up
/// to what was asked for. Reading behind the current position restarts the
/// stream from the beginning, so sequential reads are cheap and random ones
/// are correct. The inflated length must equal the declared size.
pub struct InflatingDataBlock {
    compressed: Arc<dyn DataBlock>,
    compressed_size: u64,
    size: u64,
    name: String,
    state: Mutex<InflateState>,
}

struct InflateState {
    inflater: Decompress,
    input: Vec<u8>,
    input_pos: usize,
    input_len: usize,
    compressed_pos: u64,
    position: u64,
    finished: bool,
}

impl InflateState {
    fn new() -> Self {
        Self {
            inflater: Decompress::new(false),
            input: vec![0u8; INPUT_BUFFER_SIZE],
            input_pos: 0,
            input_len: 0,
            compressed_pos: 0,
            position: 0,
            finished: false,
        }
    }

    fn reset(&mut self) {
        self.inflater.reset(false);
        self.input_pos = 0;
        self.input_len = 0;
        self.compressed_pos = 0;
        self.position = 0;
        self.finished = false;
    }

    fn input_exhausted(&self) -> bool {
        self.input_pos == self.input_len
    }
}

impl InflatingDataBlock {
    /// Wrap `compressed`, which inflates to exactly `size` bytes. `name` is
    /// used in error messages.
    pub fn new(compressed: Arc<dyn DataBlock>, size: u64, name: impl Into<String>) -> Result<Self> {
        let compressed_size = compressed.size()?;
        Ok(Self {
            compressed,
            compressed_size,
            size,
            name: name.into(),
            state: Mutex::new(InflateState::new()),
        })
    }

    async fn fill(&self, state: &mut InflateState) -> Result<()> {
        let remaining = self.compressed_size - state.compressed_pos;
        let want = remaining.min(INPUT_BUFFER_SIZE as u64) as usize;
        let count = self
            .compressed
            .read_at(state.compressed_pos, &mut state.input[..want])
            .await?;
        if count == 0 {
            return Err(Error::format(format!(
                "compressed data of '{}' ended at offset {}",
                self.name, state.compressed_pos
            )));
        }
        state.input_pos = 0;
        state.input_len = count;
        state.compressed_pos += count as u64;
        Ok(())
    }

    /// Run the inflater once over the buffered input, refilling it first if
    /// needed. Returns the number of bytes produced into `out`.
    async fn step(&self, state: &mut InflateState, out: &mut [u8]) -> Result<usize> {
        if state.input_exhausted() && state.compressed_pos < self.compressed_size {
            self.fill(state).await?;
        }

        let before_in = state.inflater.total_in();
        let before_out = state.inflater.total_out();
        let status = state
            .inflater
            .decompress(
                &state.input[state.input_pos..state.input_len],
                out,
                FlushDecompress::None,
            )
            .map_err(|e| Error::format(format!("corrupt deflate data in '{}': {}", self.name, e)))?;
        let consumed = (state.inflater.total_in() - before_in) as usize;
        let produced = (state.inflater.total_out() - before_out) as usize;
        state.input_pos += consumed;
        state.position += produced as u64;

        if status == Status::StreamEnd {
            state.finished = true;
        } else if consumed == 0
            && produced == 0
            && state.input_exhausted()
            && state.compressed_pos >= self.compressed_size
        {
            return Err(Error::format(format!(
                "deflate stream of '{}' is truncated after {} bytes",
                self.name, state.position
            )));
        }
        Ok(produced)
    }

    /// Inflate into `out` until at least one byte is produced.
    async fn inflate(&self, state: &mut InflateState, out: &mut [u8]) -> Result<usize> {
        loop {
            if state.finished {
                return Err(self.length_mismatch(state.position));
            }
            let produced = self.step(state, out).await?;
            if state.finished && state.position < self.size {
                return Err(self.length_mismatch(state.position));
            }
            if produced > 0 {
                return Ok(produced);
            }
        }
    }

    /// Once `size` bytes are out, the stream must end without producing more.
    async fn verify_end(&self, state: &mut InflateState) -> Result<()> {
        let mut probe = [0u8; 1];
        while !state.finished {
            if self.step(state, &mut probe).await? > 0 {
                return Err(self.length_mismatch(state.position));
            }
        }
        Ok(())
    }

    fn length_mismatch(&self, actual: u64) -> Error {
        Error::format(format!(
            "'{}' inflated to {}{} bytes but declares an uncompressed size of {}",
            self.name,
            if actual > self.size { "at least " } else { "" },
            actual,
            self.size
        ))
    }
}

#[async_trait]
impl DataBlock for InflatingDataBlock {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    async fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if pos >= self.size {
            // An empty entry has no read that reaches its end, so check here
            // that the stream really is empty.
            if self.size == 0 {
                let mut guard = self.state.lock().await;
                self.verify_end(&mut *guard).await?;
            }
            return Ok(0);
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        if pos < state.position {
            trace!(
                "Restarting inflater for '{}' to read offset {} (at {})",
                self.name, pos, state.position
            );
            state.reset();
        }

        let mut skip: Vec<u8> = Vec::new();
        while state.position < pos {
            let want = (pos - state.position).min(SKIP_BUFFER_SIZE as u64) as usize;
            if skip.is_empty() {
                skip = vec![0u8; SKIP_BUFFER_SIZE];
            }
            self.inflate(state, &mut skip[..want]).await?;
        }

        let want = (self.size - pos).min(buf.len() as u64) as usize;
        let count = self.inflate(state, &mut buf[..want]).await?;
        if state.position == self.size {
            self.verify_end(state).await?;
        }
        Ok(count)
    }
}
