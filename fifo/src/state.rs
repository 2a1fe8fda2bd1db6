//! Circular-buffer bookkeeping.

/// Offsets, fill level and diagnostic counters of one FIFO.
///
/// Invariant outside a mutation: `write_pos == (read_pos + fill) % capacity`.
#[derive(Debug, Clone)]
pub(crate) struct FifoState {
    capacity: usize,
    read_pos: usize,
    write_pos: usize,
    fill: usize,
    pub(crate) overflows: u64,
    pub(crate) underflows: u64,
    pub(crate) write_waits: u64,
    pub(crate) read_waits: u64,
}

impl FifoState {
    pub(crate) fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0);
        Self {
            capacity,
            read_pos: 0,
            write_pos: 0,
            fill: 0,
            overflows: 0,
            underflows: 0,
            write_waits: 0,
            read_waits: 0,
        }
    }

    /// Empties the buffer and zeroes every counter.
    pub(crate) fn clear(&mut self) {
        *self = Self::new(self.capacity);
    }

    pub(crate) fn fill(&self) -> usize {
        self.fill
    }

    pub(crate) fn free(&self) -> usize {
        self.capacity - self.fill
    }

    pub(crate) fn read_pos(&self) -> usize {
        self.read_pos
    }

    pub(crate) fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Length of the next write chunk: at most `remaining` and `chunk_size`,
    /// and never past the end of the store.
    pub(crate) fn write_span(&self, remaining: usize, chunk_size: usize) -> usize {
        remaining.min(chunk_size).min(self.capacity - self.write_pos)
    }

    /// Length of the next read chunk, bounded like [`Self::write_span`].
    pub(crate) fn read_span(&self, remaining: usize, chunk_size: usize) -> usize {
        remaining.min(chunk_size).min(self.capacity - self.read_pos)
    }

    /// Records `n` bytes stored at `write_pos`.
    pub(crate) fn commit_write(&mut self, n: usize) {
        debug_assert!(n <= self.free());
        self.write_pos = (self.write_pos + n) % self.capacity;
        self.fill += n;
        debug_assert_eq!(self.write_pos, (self.read_pos + self.fill) % self.capacity);
    }

    /// Records `n` bytes taken from `read_pos`.
    pub(crate) fn commit_read(&mut self, n: usize) {
        debug_assert!(n <= self.fill);
        self.read_pos = (self.read_pos + n) % self.capacity;
        self.fill -= n;
        debug_assert_eq!(self.write_pos, (self.read_pos + self.fill) % self.capacity);
    }
}
