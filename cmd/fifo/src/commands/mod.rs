//! CLI commands module.

mod selftest;
mod simulate;

use std::path::PathBuf;

use clap::Args;
use giztoy_fifo::{DEFAULT_CAPACITY, FifoConfig};

pub use selftest::SelftestCommand;
pub use simulate::SimulateCommand;

/// Store selection shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// FIFO capacity in bytes
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,

    /// Spill to this file instead of memory
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl StoreArgs {
    /// Short description of the selected store, for reports.
    pub fn describe(&self) -> String {
        match &self.file {
            Some(path) => format!("file:{}", path.display()),
            None => "memory".to_string(),
        }
    }
}

/// Flow-control tuning for commands that run a FIFO.
#[derive(Args, Debug, Clone, Default)]
pub struct TuningArgs {
    /// Fill level below which the consumer sleeps (default: 56% of capacity)
    #[arg(long)]
    pub low_watermark: Option<usize>,

    /// Bytes moved per store transfer (default: 64, at most half the capacity)
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

impl TuningArgs {
    /// Builds the FIFO config for `capacity`, keeping the library defaults
    /// for anything not given on the command line.
    pub fn config(&self, capacity: usize) -> FifoConfig {
        let mut config = FifoConfig::new(capacity);
        if let Some(low_watermark) = self.low_watermark {
            config = config.with_low_watermark(low_watermark);
        }
        if let Some(chunk_size) = self.chunk_size {
            config = config.with_chunk_size(chunk_size);
        }
        config
    }
}

/// Byte expected at absolute stream position `pos`.
pub(crate) fn pattern_byte(pos: usize) -> u8 {
    (pos % 251) as u8
}
