//! Peer-to-client byte queue.
//!
//! [`InboundQueue`] receives the MIDI bytes the peer delivers in frame slots.
//! The transfer worker is the only producer; the registered receive client
//! drains it, typically from inside its [`InboundObserver`] callback.
//!
//! ## Usage
//!
//! ```ignore
//! input.start(|rx: &InboundQueue| {
//!     let mut buf = [0u8; 128];
//!     loop {
//!         let n = rx.recv(&mut buf);
//!         if n == 0 { break; }
//!         sink.extend_from_slice(&buf[..n]);
//!     }
//! });
//! ```

use core::sync::atomic::{AtomicUsize, Ordering};

use crate::constants::FIFO_SIZE;

use super::ring::ByteRing;

/// Notified by the worker when inbound bytes are ready to be read.
///
/// Called on the worker thread. Implementations should drain promptly and
/// must not block on the link (e.g. call `drain()` on an output endpoint).
pub trait InboundObserver: Send + Sync {
    fn on_inbound_ready(&self, inbound: &InboundQueue);
}

impl<F> InboundObserver for F
where
    F: Fn(&InboundQueue) + Send + Sync,
{
    fn on_inbound_ready(&self, inbound: &InboundQueue) {
        self(inbound)
    }
}

/// Bounded, lossy queue of bytes received from the peer.
///
/// When full, newly delivered bytes are dropped and counted in
/// [`dropped()`](Self::dropped).
pub struct InboundQueue {
    ring: ByteRing<FIFO_SIZE>,
    watermark: usize,
    dropped: AtomicUsize,
}

impl InboundQueue {
    pub fn new(watermark: usize) -> Self {
        InboundQueue {
            ring: ByteRing::new(),
            watermark,
            dropped: AtomicUsize::new(0),
        }
    }

    /// Queue one delivered byte (producer side).
    ///
    /// Returns `true` if this byte lifted the queue length from at or below
    /// the watermark to above it.
    pub(crate) fn deliver(&self, byte: u8) -> bool {
        let before = self.ring.len();
        if self.ring.push(byte).is_err() {
            let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::trace!(byte, total, "inbound queue full, byte dropped");
            return false;
        }
        before <= self.watermark && before + 1 > self.watermark
    }

    /// Copy up to `buf.len()` queued bytes into `buf`, returning the count.
    pub fn recv(&self, buf: &mut [u8]) -> usize {
        self.ring.read(buf)
    }

    /// Take every byte currently queued.
    pub fn drain(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.ring.len()];
        let n = self.ring.read(&mut out);
        out.truncate(n);
        out
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Bytes discarded because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}
