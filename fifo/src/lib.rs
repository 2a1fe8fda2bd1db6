//! Blocking byte FIFO over a slow or large backing store.
//!
//! This crate decouples a bursty producer (for example a network audio
//! stream) from a timing-sensitive consumer (for example playback) through a
//! large circular buffer kept in a [`BackingStore`]. The store is only ever
//! touched in bounded, non-wrapping chunks, so it can be a medium that must
//! be accessed in explicit batches.
//!
//! # Flow Control
//!
//! - The writer blocks whenever the next chunk does not fit.
//! - The reader blocks when data is short *and* the fill level is below the
//!   configured low-watermark. Above the watermark it retries without
//!   sleeping, so small timing jitter never parks the consumer.
//!
//! ```
//! use giztoy_fifo::{Fifo, FifoConfig};
//!
//! let fifo = Fifo::new(FifoConfig::new(1024).with_low_watermark(512)).unwrap();
//! fifo.write(&[1, 2, 3, 4]).unwrap();
//!
//! let mut buf = [0u8; 2];
//! fifo.read(&mut buf).unwrap();
//! assert_eq!(buf, [1, 2]);
//! assert_eq!(fifo.fill(), 2);
//! ```
//!
//! # Backing Stores
//!
//! [`MemoryStore`] keeps the bytes in memory. [`FileStore`] spills them to a
//! file. Anything implementing [`BackingStore`] can be plugged in with
//! [`Fifo::with_store`]:
//!
//! ```
//! use giztoy_fifo::{Fifo, FifoConfig, MemoryStore};
//!
//! let fifo = Fifo::with_store(MemoryStore::new(4096), FifoConfig::new(4096)).unwrap();
//! assert_eq!(fifo.capacity(), 4096);
//! ```
//!
//! # Thread Safety
//!
//! [`Fifo`] is `Send + Sync` and cheap to `Clone` (the clones share one
//! buffer). It is designed for exactly one producer thread and one consumer
//! thread.

mod config;
mod error;
mod fifo;
mod file_store;
mod state;
mod store;


pub use config::{DEFAULT_CAPACITY, DEFAULT_CHUNK_SIZE, DEFAULT_LOW_WATERMARK, FifoConfig};
pub use error::{Error, Result};
pub use fifo::{Fifo, FifoStats};
pub use file_store::FileStore;
pub use store::{BackingStore, MemoryStore};
