//! Backing store capability and the in-memory implementation.

use std::io;

/// Block size used by the default self-test.
const SELF_TEST_BLOCK: usize = 256;

/// A fixed-capacity, byte-addressable medium holding buffered bytes.
///
/// The FIFO owns its store exclusively and only ever issues bounded requests:
/// every `read`/`write` satisfies `offset + len <= capacity()`, so
/// implementations never handle wraparound themselves.
///
/// Use [`MemoryStore`] for tests and fallback deployments, or
/// [`FileStore`](crate::FileStore) to spill to disk.
pub trait BackingStore: Send {
    /// Returns the fixed size of the medium in bytes.
    fn capacity(&self) -> usize;

    /// Allocates or prepares the medium. Called once before any I/O.
    fn init(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Writes `data` starting at `offset`.
    fn write(&mut self, offset: usize, data: &[u8]) -> io::Result<()>;

    /// Fills `buf` with the bytes starting at `offset`.
    fn read(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()>;

    /// Verifies the medium by writing a pseudo-random pattern over all of it
    /// and reading it back.
    ///
    /// Returns `Ok(false)` on a mismatch. The previous contents are lost.
    fn self_test(&mut self) -> io::Result<bool> {
        let capacity = self.capacity();
        let mut block = [0u8; SELF_TEST_BLOCK];

        let mut offset = 0;
        while offset < capacity {
            let n = SELF_TEST_BLOCK.min(capacity - offset);
            fill_pattern(offset, &mut block[..n]);
            self.write(offset, &block[..n])?;
            offset += n;
        }

        let mut expected = [0u8; SELF_TEST_BLOCK];
        let mut offset = 0;
        while offset < capacity {
            let n = SELF_TEST_BLOCK.min(capacity - offset);
            self.read(offset, &mut block[..n])?;
            fill_pattern(offset, &mut expected[..n]);
            if block[..n] != expected[..n] {
                return Ok(false);
            }
            offset += n;
        }

        Ok(true)
    }
}

/// Deterministic test pattern: a byte depends only on its absolute offset.
fn fill_pattern(offset: usize, out: &mut [u8]) {
    for (i, b) in out.iter_mut().enumerate() {
        let x = ((offset + i) as u64)
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *b = (x >> 56) as u8;
    }
}

/// Rejects requests that would run past the end of a medium of `capacity`
/// bytes.
pub(crate) fn check_range(capacity: usize, offset: usize, len: usize) -> io::Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("store: range {}+{} exceeds capacity {}", offset, len, capacity),
        )),
    }
}

/// In-memory [`BackingStore`] implementation.
///
/// Storage is allocated by [`BackingStore::init`], not by the constructor.
#[derive(Debug)]
pub struct MemoryStore {
    capacity: usize,
    data: Vec<u8>,
}

impl MemoryStore {
    /// Creates an unallocated memory store of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: Vec::new(),
        }
    }

    fn region(&self, offset: usize, len: usize) -> io::Result<std::ops::Range<usize>> {
        check_range(self.capacity, offset, len)?;
        if self.data.len() != self.capacity {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "store: memory not initialized",
            ));
        }
        Ok(offset..offset + len)
    }
}

impl BackingStore for MemoryStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn init(&mut self) -> io::Result<()> {
        self.data = vec![0; self.capacity];
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
        let range = self.region(offset, data.len())?;
        self.data[range].copy_from_slice(data);
        Ok(())
    }

    fn read(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        let range = self.region(offset, buf.len())?;
        buf.copy_from_slice(&self.data[range]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_read_write() {
        let mut store = MemoryStore::new(16);
        store.init().unwrap();

        store.write(4, &[1, 2, 3]).unwrap();
        let mut buf = [0u8; 5];
        store.read(3, &mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3, 0]);
    }

    #[test]
    fn test_memory_store_rejects_out_of_range() {
        let mut store = MemoryStore::new(16);
        store.init().unwrap();

        let err = store.write(14, &[0; 3]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        let err = store.read(usize::MAX, &mut [0; 2]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        // Touching the very end is fine.
        store.write(13, &[9; 3]).unwrap();
    }

    #[test]
    fn test_memory_store_requires_init() {
        let mut store = MemoryStore::new(8);
        let err = store.write(0, &[1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_self_test_passes_on_memory() {
        // Not a multiple of the block size, so the last block is short.
        let mut store = MemoryStore::new(SELF_TEST_BLOCK * 3 + 17);
        store.init().unwrap();
        assert!(store.self_test().unwrap());
    }

    struct StuckBitStore {
        inner: MemoryStore,
    }

    impl BackingStore for StuckBitStore {
        fn capacity(&self) -> usize {
            self.inner.capacity()
        }

        fn init(&mut self) -> io::Result<()> {
            self.inner.init()
        }

        fn write(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
            self.inner.write(offset, data)
        }

        fn read(&mut self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
            self.inner.read(offset, buf)?;
            for b in buf.iter_mut() {
                *b |= 0x01;
            }
            Ok(())
        }
    }

    #[test]
    fn test_self_test_detects_stuck_bit() {
        let mut store = StuckBitStore {
            inner: MemoryStore::new(1024),
        };
        store.init().unwrap();
        assert!(!store.self_test().unwrap());
    }

    #[test]
    fn test_pattern_is_position_dependent() {
        let mut a = [0u8; 32];
        let mut b = [0u8; 32];
        fill_pattern(0, &mut a);
        fill_pattern(1, &mut b);
        assert_eq!(a[1..], b[..31]);
        assert_ne!(a, b);
    }
}
