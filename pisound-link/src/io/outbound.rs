//! Client-to-peer byte queue.
//!
//! [`OutboundQueue`] holds MIDI bytes waiting for a frame slot. The worker
//! pulls from the active [`MidiSource`] with peek-then-acknowledge semantics:
//! it inspects up to one transfer's worth of unread bytes, commits what fits,
//! and acknowledges exactly that count so the source can advance.

use std::collections::VecDeque;

use crate::constants::{FIFO_SIZE, TRANSFER_SIZE};

use super::ring::ByteRing;

/// A producer of outgoing MIDI bytes.
pub trait MidiSource: Send {
    /// Copy up to `buf.len()` unread bytes into `buf` without consuming them.
    fn peek(&mut self, buf: &mut [u8]) -> usize;

    /// Mark the first `n` peeked bytes as consumed.
    fn ack(&mut self, n: usize);
}

impl MidiSource for VecDeque<u8> {
    fn peek(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.len());
        for (dst, src) in buf.iter_mut().zip(self.iter()) {
            *dst = *src;
        }
        n
    }

    fn ack(&mut self, n: usize) {
        self.drain(..n.min(self.len()));
    }
}

/// Bounded queue of bytes waiting to be sent to the peer.
pub struct OutboundQueue {
    ring: ByteRing<FIFO_SIZE>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        OutboundQueue {
            ring: ByteRing::new(),
        }
    }

    /// Pull newly available bytes from `source` (producer side).
    ///
    /// Does nothing unless there is room for a full transfer. Returns the
    /// number of bytes committed and acknowledged.
    pub fn fill_from(&self, source: &mut dyn MidiSource) -> usize {
        if self.ring.available() < TRANSFER_SIZE {
            return 0;
        }

        let mut buf = [0u8; TRANSFER_SIZE];
        let peeked = source.peek(&mut buf).min(TRANSFER_SIZE);
        if peeked == 0 {
            return 0;
        }

        let accepted = self.ring.write(&buf[..peeked]);
        source.ack(accepted);
        accepted
    }

    /// Queue bytes directly, returning how many fit.
    pub fn write(&self, bytes: &[u8]) -> usize {
        self.ring.write(bytes)
    }

    /// Take the next byte for a frame slot (consumer side).
    pub(crate) fn pop(&self) -> Option<u8> {
        self.ring.pop()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}
