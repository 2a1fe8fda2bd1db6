//! FIFO configuration.

use crate::error::{Error, Result};

/// Default capacity (200 KiB).
pub const DEFAULT_CAPACITY: usize = 200 * 1024;

/// Default low-watermark (112 KiB).
pub const DEFAULT_LOW_WATERMARK: usize = 112 * 1024;

/// Default size of one physical transfer to or from the store.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// FIFO configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoConfig {
    /// Size of the backing store in bytes.
    pub capacity: usize,
    /// Fill level below which a starved reader suspends. At or above it, a
    /// reader that finds too little data retries without sleeping.
    pub low_watermark: usize,
    /// Upper bound on one store transfer. Smaller chunks hold the lock for
    /// less time; larger chunks make fewer store calls.
    pub chunk_size: usize,
}

impl FifoConfig {
    /// Create a config for `capacity` bytes.
    ///
    /// The low-watermark keeps the default 112/200 ratio to the capacity, and
    /// the chunk size is capped at half the capacity.
    pub fn new(capacity: usize) -> Self {
        let low_watermark =
            (capacity as u128 * DEFAULT_LOW_WATERMARK as u128 / DEFAULT_CAPACITY as u128) as usize;
        Self {
            capacity,
            low_watermark,
            chunk_size: DEFAULT_CHUNK_SIZE.min(capacity / 2).max(1),
        }
    }

    /// Set the low-watermark.
    pub fn with_low_watermark(mut self, low_watermark: usize) -> Self {
        self.low_watermark = low_watermark;
        self
    }

    /// Set the transfer chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Checks the config for values the FIFO cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidConfig("capacity must be greater than 0".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk size must be greater than 0".into()));
        }
        // A writer waiting for a whole chunk of space and a reader waiting for
        // a whole chunk of data could otherwise both be stuck.
        if self.chunk_size > self.capacity / 2 {
            return Err(Error::InvalidConfig(format!(
                "chunk size {} exceeds half of capacity {}",
                self.chunk_size, self.capacity
            )));
        }
        if self.low_watermark > self.capacity {
            return Err(Error::InvalidConfig(format!(
                "low watermark {} exceeds capacity {}",
                self.low_watermark, self.capacity
            )));
        }
        Ok(())
    }
}

impl Default for FifoConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            low_watermark: DEFAULT_LOW_WATERMARK,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
