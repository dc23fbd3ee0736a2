//! Lock-free single-producer single-consumer (SPSC) byte ring.
//!
//! Sits between the stream clients and the transfer worker. Indices are
//! free-running counters (kfifo style), so the full `N` bytes are usable and
//! `N` must be a power of two.
//!
//! # Safety Contract
//!
//! - Only ONE thread/context may call the producer methods
//!   ([`push()`](ByteRing::push), [`write()`](ByteRing::write)).
//! - Only ONE thread/context may call the consumer methods
//!   ([`pop()`](ByteRing::pop), [`read()`](ByteRing::read)).
//! - The two sides may run concurrently. Length queries are safe from anywhere
//!   but only a snapshot.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed-capacity byte queue with one producer and one consumer.
pub struct ByteRing<const N: usize> {
    buffer: [UnsafeCell<u8>; N],
    /// Total bytes ever written (only modified by the producer).
    head: AtomicUsize,
    /// Total bytes ever read (only modified by the consumer).
    tail: AtomicUsize,
}

// SAFETY: bytes are Copy and each cell is owned by exactly one side at a time:
// the producer only writes cells in [head, tail + N), the consumer only reads
// cells in [tail, head). Release/Acquire on the counters publishes the cell
// contents before ownership changes hands.
unsafe impl<const N: usize> Sync for ByteRing<N> {}
unsafe impl<const N: usize> Send for ByteRing<N> {}

impl<const N: usize> ByteRing<N> {
    const MASK: usize = N - 1;

    /// Create an empty ring.
    ///
    /// # Panics
    ///
    /// If `N` is not a power of two.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "ring size must be a power of two");

        ByteRing {
            buffer: [const { UnsafeCell::new(0) }; N],
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Push one byte (producer side).
    ///
    /// Returns `Err(byte)` if the ring is full.
    pub fn push(&self, byte: u8) -> Result<(), u8> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head.wrapping_sub(tail) == N {
            return Err(byte);
        }

        // SAFETY: sole producer; the slot at `head` is outside [tail, head)
        // so the consumer is not reading it.
        unsafe {
            *self.buffer[head & Self::MASK].get() = byte;
        }

        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Push as many bytes from `src` as fit, returning how many were taken.
    pub fn write(&self, src: &[u8]) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let n = src.len().min(N - head.wrapping_sub(tail));

        for (i, &byte) in src[..n].iter().enumerate() {
            // SAFETY: as in `push`, every slot in [head, head + n) is free.
            unsafe {
                *self.buffer[head.wrapping_add(i) & Self::MASK].get() = byte;
            }
        }

        self.head.store(head.wrapping_add(n), Ordering::Release);
        n
    }

    /// Pop one byte (consumer side).
    pub fn pop(&self) -> Option<u8> {
        let tail = self.tail.load(Ordering::Relaxed);

        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }

        // SAFETY: sole consumer; `tail != head` means the producer has
        // published this slot.
        let byte = unsafe { *self.buffer[tail & Self::MASK].get() };

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Pop up to `dst.len()` bytes, returning how many were copied.
    pub fn read(&self, dst: &mut [u8]) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        let n = dst.len().min(head.wrapping_sub(tail));

        for (i, slot) in dst[..n].iter_mut().enumerate() {
            // SAFETY: every slot in [tail, tail + n) has been published.
            *slot = unsafe { *self.buffer[tail.wrapping_add(i) & Self::MASK].get() };
        }

        self.tail.store(tail.wrapping_add(n), Ordering::Release);
        n
    }

    /// Number of bytes currently queued.
    pub fn len(&self) -> usize {
        // Tail first: head never trails a tail loaded earlier.
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        head.wrapping_sub(tail).min(N)
    }

    /// Free space in bytes.
    pub fn available(&self) -> usize {
        N - self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<const N: usize> Default for ByteRing<N> {
    fn default() -> Self {
        Self::new()
    }
}
