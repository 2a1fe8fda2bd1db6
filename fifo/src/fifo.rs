//! Blocking FIFO over a backing store.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::FifoConfig;
use crate::error::{Error, Result};
use crate::state::FifoState;
use crate::store::{BackingStore, MemoryStore};

/// A thread-safe blocking byte FIFO for one producer and one consumer.
///
/// Bytes live in a [`BackingStore`] addressed circularly. Every transfer is
/// split into chunks of at most `chunk_size` bytes that never cross the end
/// of the store, and each chunk is moved under the lock.
///
/// # Semantics
///
/// - **Write**: Blocks whenever the next chunk does not fit, until the
///   consumer frees space
/// - **Read**: When the next chunk is not buffered yet, suspends only if the
///   fill level is below the low-watermark; otherwise yields and retries
/// - **Reset**: Empties the FIFO, handshaking with a suspended reader
/// - **Close**: Wakes everyone; writes fail, reads drain what is left
///
/// # Example
///
/// ```
/// use giztoy_fifo::{Fifo, FifoConfig};
/// use std::thread;
///
/// let fifo = Fifo::new(FifoConfig::new(1024).with_low_watermark(512)).unwrap();
/// let producer = fifo.clone();
///
/// let handle = thread::spawn(move || {
///     let data: Vec<u8> = (0..4096u32).map(|i| i as u8).collect();
///     producer.write(&data).unwrap();
/// });
///
/// let mut out = vec![0u8; 4096];
/// fifo.read(&mut out).unwrap();
/// handle.join().unwrap();
/// assert!(out.iter().enumerate().all(|(i, &b)| b == i as u8));
/// ```
pub struct Fifo<S = MemoryStore> {
    inner: Arc<FifoInner<S>>,
}

struct FifoInner<S> {
    shared: Mutex<Shared<S>>,
    space_available: Condvar,
    data_available: Condvar,
    reset_acked: Condvar,
    capacity: usize,
    low_watermark: usize,
    chunk_size: usize,
}

struct Shared<S> {
    state: FifoState,
    store: S,
    closed: bool,
    // Bumped by every reset; a reader that wakes copies it to `acked_epoch`.
    epoch: u64,
    acked_epoch: u64,
    readers_waiting: usize,
}

/// Point-in-time snapshot of a FIFO's occupancy and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FifoStats {
    pub capacity: usize,
    pub fill: usize,
    pub free: usize,
    pub low_watermark: usize,
    pub chunk_size: usize,
    /// Write attempts that found too little free space.
    pub overruns: u64,
    /// Read attempts that found too little buffered data.
    pub underruns: u64,
    /// Times the writer actually suspended.
    pub write_waits: u64,
    /// Times the reader actually suspended.
    pub read_waits: u64,
    pub closed: bool,
}

impl<S> Clone for Fifo<S> {
    fn clone(&self) -> Self {
        Fifo {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Fifo<MemoryStore> {
    /// Creates a FIFO backed by memory.
    pub fn new(config: FifoConfig) -> Result<Self> {
        Self::with_store(MemoryStore::new(config.capacity), config)
    }
}

impl<S: BackingStore> Fifo<S> {
    /// Creates a FIFO over `store`.
    ///
    /// Initializes the store and runs its self-test. The store's capacity
    /// must equal `config.capacity`.
    pub fn with_store(mut store: S, config: FifoConfig) -> Result<Self> {
        config.validate()?;
        if store.capacity() != config.capacity {
            return Err(Error::InvalidConfig(format!(
                "store capacity {} does not match configured capacity {}",
                store.capacity(),
                config.capacity
            )));
        }

        store.init()?;
        if !store.self_test()? {
            warn!("fifo store failed self-test ({} bytes)", config.capacity);
            return Err(Error::SelfTest);
        }

        debug!(
            "fifo initialized: capacity={} low_watermark={} chunk_size={}",
            config.capacity, config.low_watermark, config.chunk_size
        );

        Ok(Fifo {
            inner: Arc::new(FifoInner {
                shared: Mutex::new(Shared {
                    state: FifoState::new(config.capacity),
                    store,
                    closed: false,
                    epoch: 0,
                    acked_epoch: 0,
                    readers_waiting: 0,
                }),
                space_available: Condvar::new(),
                data_available: Condvar::new(),
                reset_acked: Condvar::new(),
                capacity: config.capacity,
                low_watermark: config.low_watermark,
                chunk_size: config.chunk_size,
            }),
        })
    }

    /// Writes all of `data`, blocking while the FIFO lacks space.
    pub fn write(&self, data: &[u8]) -> Result<()> {
        self.write_until(data, None)
    }

    /// Like [`Fifo::write`], but gives up after `timeout`.
    ///
    /// On expiry returns [`Error::Timeout`]; the bytes counted in it stay
    /// buffered.
    pub fn write_timeout(&self, data: &[u8], timeout: Duration) -> Result<()> {
        self.write_until(data, Some(Instant::now() + timeout))
    }

    /// Fills all of `buf`, blocking while the FIFO lacks data.
    pub fn read(&self, buf: &mut [u8]) -> Result<()> {
        self.read_until(buf, None)
    }

    /// Like [`Fifo::read`], but gives up after `timeout`.
    ///
    /// On expiry returns [`Error::Timeout`]; the bytes counted in it have
    /// been placed at the front of `buf`.
    pub fn read_timeout(&self, buf: &mut [u8], timeout: Duration) -> Result<()> {
        self.read_until(buf, Some(Instant::now() + timeout))
    }

    fn write_until(&self, data: &[u8], deadline: Option<Instant>) -> Result<()> {
        let inner = &*self.inner;
        let mut written = 0;

        while written < data.len() {
            let mut shared = inner.shared.lock();

            let n = loop {
                if shared.closed {
                    return Err(Error::Closed {
                        transferred: written,
                    });
                }
                let n = shared
                    .state
                    .write_span(data.len() - written, inner.chunk_size);
                if shared.state.free() >= n {
                    break n;
                }

                shared.state.overflows += 1;
                if expired(deadline) {
                    return Err(Error::Timeout {
                        transferred: written,
                    });
                }
                trace!(
                    "fifo full: need {} bytes, {} free; writer waiting",
                    n,
                    shared.state.free()
                );
                shared.state.write_waits += 1;
                wait(&inner.space_available, &mut shared, deadline);
            };

            let pos = shared.state.write_pos();
            shared.store.write(pos, &data[written..written + n])?;
            shared.state.commit_write(n);
            written += n;

            drop(shared);
            inner.data_available.notify_one();
        }

        Ok(())
    }

    fn read_until(&self, buf: &mut [u8], deadline: Option<Instant>) -> Result<()> {
        let inner = &*self.inner;
        let mut read = 0;

        while read < buf.len() {
            let mut shared = inner.shared.lock();

            let n = loop {
                let n = shared.state.read_span(buf.len() - read, inner.chunk_size);
                if shared.state.fill() >= n {
                    break n;
                }
                if shared.closed {
                    return Err(Error::Closed { transferred: read });
                }

                shared.state.underflows += 1;
                if expired(deadline) {
                    return Err(Error::Timeout { transferred: read });
                }

                if shared.state.fill() < inner.low_watermark {
                    trace!(
                        "fifo starved: need {} bytes, {} buffered; reader waiting",
                        n,
                        shared.state.fill()
                    );
                    shared.state.read_waits += 1;
                    shared.readers_waiting += 1;
                    wait(&inner.data_available, &mut shared, deadline);
                    shared.readers_waiting -= 1;

                    if shared.acked_epoch != shared.epoch {
                        shared.acked_epoch = shared.epoch;
                        inner.reset_acked.notify_all();
                    }
                } else {
                    MutexGuard::unlocked(&mut shared, thread::yield_now);
                }
            };

            let pos = shared.state.read_pos();
            shared.store.read(pos, &mut buf[read..read + n])?;
            shared.state.commit_read(n);
            read += n;

            drop(shared);
            inner.space_available.notify_one();
        }

        Ok(())
    }
}

impl<S> Fifo<S> {
    /// Empties the FIFO and zeroes its counters.
    ///
    /// A blocked writer is released to retry against the empty buffer. If a
    /// reader is suspended, this returns only after that reader has woken
    /// and observed the reset, so it cannot resume with stale offsets.
    /// The closed state is left unchanged.
    pub fn reset(&self) {
        let inner = &*self.inner;
        let mut shared = inner.shared.lock();

        shared.state.clear();
        shared.epoch = shared.epoch.wrapping_add(1);
        inner.space_available.notify_all();
        inner.data_available.notify_all();

        while shared.readers_waiting > 0 && shared.acked_epoch != shared.epoch {
            inner.reset_acked.wait(&mut shared);
        }

        debug!("fifo reset (capacity={})", inner.capacity);
    }

    /// Closes the FIFO.
    ///
    /// Blocked and future writes fail with [`Error::Closed`]. Reads keep
    /// draining buffered bytes and fail once too few remain.
    pub fn close(&self) {
        let inner = &*self.inner;
        let mut shared = inner.shared.lock();
        if shared.closed {
            return;
        }
        shared.closed = true;
        inner.space_available.notify_all();
        inner.data_available.notify_all();
        debug!("fifo closed with {} bytes buffered", shared.state.fill());
    }

    /// Returns true once [`Fifo::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.shared.lock().closed
    }

    /// Returns the number of buffered bytes.
    pub fn fill(&self) -> usize {
        self.inner.shared.lock().state.fill()
    }

    /// Returns the number of bytes that can be written without blocking.
    pub fn free(&self) -> usize {
        self.capacity() - self.fill()
    }

    /// Returns the size of the backing store.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Returns the fill level below which a starved reader suspends.
    pub fn low_watermark(&self) -> usize {
        self.inner.low_watermark
    }

    /// Returns how many write attempts found too little free space.
    pub fn overrun_count(&self) -> u64 {
        self.inner.shared.lock().state.overflows
    }

    /// Returns how many read attempts found too little buffered data.
    pub fn underrun_count(&self) -> u64 {
        self.inner.shared.lock().state.underflows
    }

    /// Returns a consistent snapshot of occupancy and counters.
    pub fn stats(&self) -> FifoStats {
        let inner = &*self.inner;
        let shared = inner.shared.lock();
        FifoStats {
            capacity: inner.capacity,
            fill: shared.state.fill(),
            free: shared.state.free(),
            low_watermark: inner.low_watermark,
            chunk_size: inner.chunk_size,
            overruns: shared.state.overflows,
            underruns: shared.state.underflows,
            write_waits: shared.state.write_waits,
            read_waits: shared.state.read_waits,
            closed: shared.closed,
        }
    }

    #[cfg(test)]
    pub(crate) fn inspect<R>(&self, f: impl FnOnce(&FifoState, &mut S) -> R) -> R {
        let mut shared = self.inner.shared.lock();
        let shared = &mut *shared;
        f(&shared.state, &mut shared.store)
    }
}

fn expired(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|d| Instant::now() >= d)
}

/// Suspends on `cv`, releasing the lock until woken or past `deadline`.
/// Callers re-check their predicate afterwards.
fn wait<T>(cv: &Condvar, guard: &mut MutexGuard<'_, T>, deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => {
            cv.wait_until(guard, deadline);
        }
        None => cv.wait(guard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_basic_write_read() {
        let fifo = Fifo::new(FifoConfig::new(64)).unwrap();
        fifo.write(&[1, 2, 3]).unwrap();

        let mut data = vec![0; 3];
        fifo.read(&mut data).unwrap();
        assert_eq!(data, vec![1, 2, 3]);
        assert_eq!(fifo.fill(), 0);
    }

    #[test]
    fn test_empty_transfers_return_immediately() {
        let fifo = Fifo::new(FifoConfig::new(64)).unwrap();
        fifo.write(&[]).unwrap();
        fifo.read(&mut []).unwrap();
        assert_eq!(fifo.stats().underruns, 0);
    }

    #[test]
    fn test_capacity_fill_free() {
        let fifo = Fifo::new(FifoConfig::new(256)).unwrap();
        assert_eq!(fifo.capacity(), 256);
        assert_eq!(fifo.fill(), 0);
        assert_eq!(fifo.free(), 256);

        fifo.write(&pattern(200, 0)).unwrap();
        assert_eq!(fifo.fill(), 200);
        assert_eq!(fifo.free(), 56);
        assert_eq!(fifo.fill() + fifo.free(), fifo.capacity());
    }

    #[test]
    fn test_fill_to_exact_capacity_does_not_block() {
        let fifo = Fifo::new(FifoConfig::new(100).with_chunk_size(50)).unwrap();
        fifo.write(&pattern(100, 1)).unwrap();
        assert_eq!(fifo.free(), 0);
        assert_eq!(fifo.overrun_count(), 0);
    }

    #[test]
    fn test_store_capacity_mismatch() {
        let result = Fifo::with_store(MemoryStore::new(32), FifoConfig::new(64));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Fifo::new(FifoConfig::new(64).with_chunk_size(0));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_write_timeout_reports_progress() {
        let fifo = Fifo::new(FifoConfig::new(100).with_chunk_size(10)).unwrap();
        let err = fifo
            .write_timeout(&pattern(130, 0), Duration::from_millis(20))
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { transferred: 100 }));
        assert_eq!(fifo.fill(), 100);
        assert!(fifo.overrun_count() >= 1);
    }

    #[test]
    fn test_read_timeout_reports_progress() {
        let fifo = Fifo::new(FifoConfig::new(100).with_low_watermark(50).with_chunk_size(8))
            .unwrap();
        fifo.write(&pattern(12, 5)).unwrap();

        let mut buf = [0u8; 20];
        let err = fifo
            .read_timeout(&mut buf, Duration::from_millis(20))
            .unwrap_err();

        // One full chunk of 8 fits; the next needs 8 but only 4 remain.
        assert_eq!(err.transferred(), 8);
        assert_eq!(buf[..8], pattern(12, 5)[..8]);
        assert_eq!(fifo.fill(), 4);
    }

    #[test]
    fn test_spinning_reader_honours_deadline() {
        // Watermark 0: the reader never sleeps, it only retries.
        let fifo = Fifo::new(FifoConfig::new(64).with_low_watermark(0)).unwrap();
        let mut buf = [0u8; 4];
        let err = fifo
            .read_timeout(&mut buf, Duration::from_millis(10))
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { transferred: 0 }));
        assert_eq!(fifo.stats().read_waits, 0);
        assert!(fifo.underrun_count() >= 1);
    }

    #[test]
    fn test_close_unblocks_writer() {
        let fifo = Fifo::new(FifoConfig::new(16)).unwrap();
        fifo.write(&pattern(16, 0)).unwrap();

        let writer_fifo = fifo.clone();
        let writer = thread::spawn(move || writer_fifo.write(&[1, 2, 3]));

        thread::sleep(Duration::from_millis(50));
        fifo.close();

        let err = writer.join().unwrap().unwrap_err();
        assert!(matches!(err, Error::Closed { transferred: 0 }));
        assert!(fifo.is_closed());
    }

    #[test]
    fn test_close_lets_reader_drain() {
        let fifo = Fifo::new(FifoConfig::new(64)).unwrap();
        fifo.write(&[7, 8, 9]).unwrap();
        fifo.close();

        assert!(matches!(fifo.write(&[1]), Err(Error::Closed { transferred: 0 })));

        let mut buf = [0u8; 2];
        fifo.read(&mut buf).unwrap();
        assert_eq!(buf, [7, 8]);

        let mut buf = [0u8; 2];
        let err = fifo.read(&mut buf).unwrap_err();
        assert!(matches!(err, Error::Closed { transferred: 0 }));
        // A close is not a shortfall.
        assert_eq!(fifo.underrun_count(), 0);
    }

    #[test]
    fn test_close_unblocks_reader() {
        let fifo = Fifo::new(FifoConfig::new(64).with_low_watermark(32)).unwrap();
        let reader_fifo = fifo.clone();
        let reader = thread::spawn(move || {
            let mut buf = [0u8; 8];
            reader_fifo.read(&mut buf)
        });

        thread::sleep(Duration::from_millis(50));
        fifo.close();
        fifo.close();

        assert!(matches!(
            reader.join().unwrap(),
            Err(Error::Closed { transferred: 0 })
        ));
    }

    #[test]
    fn test_reset_without_waiters() {
        let fifo = Fifo::new(FifoConfig::new(64)).unwrap();
        fifo.write(&pattern(40, 3)).unwrap();
        fifo.reset();

        assert_eq!(fifo.fill(), 0);
        assert_eq!(fifo.free(), 64);
        fifo.inspect(|state, _| {
            assert_eq!((state.read_pos(), state.write_pos()), (0, 0));
        });
    }

    #[test]
    fn test_reset_releases_blocked_writer() {
        let fifo = Fifo::new(FifoConfig::new(32)).unwrap();
        fifo.write(&pattern(32, 0)).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let writer_fifo = fifo.clone();
        let writer_done = Arc::clone(&done);
        let writer = thread::spawn(move || {
            writer_fifo.write(&[0xAA; 4]).unwrap();
            writer_done.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));

        fifo.reset();
        writer.join().unwrap();

        assert_eq!(fifo.fill(), 4);
        let mut buf = [0u8; 4];
        fifo.read(&mut buf).unwrap();
        assert_eq!(buf, [0xAA; 4]);
    }

    #[test]
    fn test_stats_serializes() {
        let fifo = Fifo::new(FifoConfig::new(64).with_low_watermark(16)).unwrap();
        fifo.write(&[1, 2, 3]).unwrap();

        let stats = fifo.stats();
        assert_eq!(stats.fill, 3);
        assert_eq!(stats.free, 61);
        assert_eq!(stats.low_watermark, 16);
        assert!(!stats.closed);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["fill"], 3);
        assert_eq!(json["capacity"], 64);
    }
}
