//! Steady-state frame layout.
//!
//! ```text
//!  byte:   0        1        2        3
//!        ┌────────┬────────┬────────┬────────┐
//!  host→ │ tag 0  │ val 0  │ tag 1  │ val 1  │   tag ∈ {0x00, 0x0F MIDI, 0xF0 LED}
//!        ├────────┼────────┼────────┼────────┤
//!  ←peer │ rdy 0  │ byte 0 │ rdy 1  │ byte 1 │   rdy != 0 → byte delivered
//!        └────────┴────────┴────────┴────────┘
//! ```

use crate::constants::{SLOTS_PER_FRAME, TAG_LED, TAG_MIDI, TAG_NONE, TRANSFER_SIZE};

/// One (tag, value) pair of an outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slot {
    #[default]
    Empty,
    /// One MIDI byte for the peer's UART.
    Midi(u8),
    /// LED flash duration.
    Led(u8),
}

impl Slot {
    pub fn to_bytes(self) -> [u8; 2] {
        match self {
            Slot::Empty => [TAG_NONE, 0],
            Slot::Midi(b) => [TAG_MIDI, b],
            Slot::Led(d) => [TAG_LED, d],
        }
    }
}

/// A composed outgoing frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    slots: [Slot; SLOTS_PER_FRAME],
}

impl Frame {
    pub const EMPTY: Frame = Frame {
        slots: [Slot::Empty; SLOTS_PER_FRAME],
    };

    pub fn set(&mut self, index: usize, slot: Slot) {
        self.slots[index] = slot;
    }

    pub fn to_bytes(&self) -> [u8; TRANSFER_SIZE] {
        let mut out = [0u8; TRANSFER_SIZE];
        for (chunk, slot) in out.chunks_exact_mut(2).zip(self.slots.iter()) {
            chunk.copy_from_slice(&slot.to_bytes());
        }
        out
    }
}

/// Bytes the peer delivered in a received frame, in slot order.
pub fn delivered(rx: &[u8; TRANSFER_SIZE]) -> impl Iterator<Item = u8> + '_ {
    rx.chunks_exact(2)
        .filter(|pair| pair[0] != 0)
        .map(|pair| pair[1])
}
