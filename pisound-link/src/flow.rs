//! Peer buffer occupancy estimator.
//!
//! The peer forwards MIDI bytes to a 31 250 baud UART through a 127-byte
//! buffer and has no way to push back. The host therefore tracks an estimate
//! of that buffer's fill level in milli-bytes: each byte sent adds
//! `cost_per_byte`, and elapsed time drains it at the UART's rate.

/// Buffer usage estimate and send gate. Pure bookkeeping, no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowController {
    usage: u32,
    ceiling: u32,
    cost_per_byte: u32,
    drain_per_tick: u32,
}

impl FlowController {
    pub fn new(ceiling: u32, cost_per_byte: u32, drain_per_tick: u32) -> Self {
        Self {
            usage: 0,
            ceiling,
            cost_per_byte,
            drain_per_tick,
        }
    }

    /// Whether one more MIDI byte may be sent without overflowing the peer.
    pub fn permits_byte(&self) -> bool {
        self.usage.saturating_add(self.cost_per_byte) < self.ceiling
    }

    /// Whether a slot may be filled at all. Control traffic is never gated.
    pub fn can_send(&self, led_pending: bool) -> bool {
        led_pending || self.permits_byte()
    }

    /// Account for one MIDI byte placed in a slot.
    pub fn on_sent_byte(&mut self) {
        self.usage = self.usage.saturating_add(self.cost_per_byte);
        debug_assert!(self.usage <= self.ceiling.saturating_add(self.cost_per_byte));
    }

    /// Drain the estimate by `ticks` elapsed milliseconds, floored at zero.
    pub fn on_elapsed(&mut self, ticks: u64) {
        let drained = ticks.saturating_mul(self.drain_per_tick as u64);
        self.usage = (self.usage as u64).saturating_sub(drained) as u32;
    }

    /// Current estimate in milli-bytes.
    pub fn usage(&self) -> u32 {
        self.usage
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn is_idle(&self) -> bool {
        self.usage == 0
    }
}
