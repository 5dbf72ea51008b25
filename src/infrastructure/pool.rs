//! Reusable scratch buffers for fingerprint encoding.

use crossbeam::queue::ArrayQueue;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Default number of idle buffers kept by a pool.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Buffers that grew past this capacity are dropped instead of pooled.
const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// A bounded, lock-free pool of `String` buffers.
///
/// Buffers are cleared when acquired and handed back when the guard drops,
/// so every exit path returns them, including early returns on errors.
/// An empty pool allocates a new buffer; a full pool drops the returned one.
pub struct BufferPool {
    idle: ArrayQueue<String>,
}

impl BufferPool {
    /// Create a pool that keeps at most `capacity` idle buffers.
    ///
    /// A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            idle: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Take a cleared buffer from the pool, allocating if none is idle.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let mut buf = self.idle.pop().unwrap_or_default();
        buf.clear();
        PooledBuffer { pool: self, buf }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Maximum number of idle buffers held.
    pub fn capacity(&self) -> usize {
        self.idle.capacity()
    }

    fn release(&self, buf: String) {
        if buf.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }
        // Full pool: the buffer is simply dropped.
        let _ = self.idle.push(buf);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle.len())
            .field("capacity", &self.idle.capacity())
            .finish()
    }
}

/// A buffer on loan from a [`BufferPool`]; returned on drop.
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: String,
}

impl Deref for PooledBuffer<'_> {
    type Target = String;

    fn deref(&self) -> &String {
        &self.buf
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut String {
        &mut self.buf
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}
