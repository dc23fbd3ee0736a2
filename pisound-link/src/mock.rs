//! embedded-hal mocks shared by the unit and integration tests.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, Operation, SpiDevice};

use crate::constants::{TAG_LED, TAG_MIDI};

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MockSpiError;

impl spi::Error for MockSpiError {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

#[derive(Debug)]
pub struct MockLineError;

impl digital::Error for MockLineError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

// ── Scripted SPI ──────────────────────────────────────────────────────────

/// SPI device that answers each transfer with the next scripted response
/// (zeros once the script runs out) and records what was sent.
#[derive(Default)]
pub struct ScriptedSpi {
    responses: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
    pub delays_ns: Vec<u32>,
    /// Fail this many upcoming transfers.
    pub fail_next: usize,
}

impl ScriptedSpi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_word(&mut self, word: u16) -> &mut Self {
        self.responses.push_back(word.to_be_bytes().to_vec());
        self
    }

    /// Queue a length-prefixed block: header word then one word per byte.
    pub fn push_block(&mut self, bytes: &[u8]) -> &mut Self {
        self.push_word(0x0100 | bytes.len() as u16);
        for &b in bytes {
            self.push_word(0x0100 | b as u16);
        }
        self
    }

    pub fn push_frame(&mut self, frame: [u8; 4]) -> &mut Self {
        self.responses.push_back(frame.to_vec());
        self
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl spi::ErrorType for ScriptedSpi {
    type Error = MockSpiError;
}

impl SpiDevice for ScriptedSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        for op in operations.iter_mut() {
            match op {
                Operation::Transfer(read, write) => {
                    self.sent.push(write.to_vec());
                    if self.fail_next > 0 {
                        self.fail_next -= 1;
                        read.fill(0xEE);
                        return Err(MockSpiError);
                    }
                    let response = self.responses.pop_front().unwrap_or_default();
                    for (i, slot) in read.iter_mut().enumerate() {
                        *slot = response.get(i).copied().unwrap_or(0);
                    }
                }
                Operation::DelayNs(ns) => self.delays_ns.push(*ns),
                _ => unimplemented!("transfer-only mock"),
            }
        }
        Ok(())
    }
}

// ── Loopback peer ─────────────────────────────────────────────────────────

/// Observable state of the simulated peripheral.
#[derive(Default)]
pub struct PeerState {
    /// MIDI bytes received from the host, in order.
    pub midi: Vec<u8>,
    /// LED durations received from the host, in order.
    pub leds: Vec<u8>,
    /// Every 4-byte frame the host sent.
    pub frames: Vec<[u8; 4]>,
    /// Bytes waiting to be delivered to the host.
    pub outgoing: VecDeque<u8>,
    /// Queue received MIDI bytes back to the host.
    pub echo: bool,
}

/// Simulated peripheral: decodes host frames and delivers queued bytes.
#[derive(Clone, Default)]
pub struct LoopbackPeer {
    state: Arc<Mutex<PeerState>>,
}

impl LoopbackPeer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echoing() -> Self {
        let peer = Self::new();
        peer.state().echo = true;
        peer
    }

    pub fn state(&self) -> MutexGuard<'_, PeerState> {
        self.state.lock().unwrap()
    }

    pub fn queue_outgoing(&self, bytes: &[u8]) {
        self.state().outgoing.extend(bytes.iter().copied());
    }

    /// Queue a minimal identity: firmware version and serial number.
    pub fn queue_identity(&self, firmware: [u8; 2], serial: &[u8]) {
        let mut state = self.state();
        state.outgoing.extend([2, 2, firmware[0], firmware[1]]);
        state.outgoing.push_back(serial.len() as u8);
        state.outgoing.extend(serial.iter().copied());
    }

    /// Data-available line driven by this peer.
    pub fn data_line(&self) -> PeerLine {
        PeerLine { peer: self.clone() }
    }
}

impl spi::ErrorType for LoopbackPeer {
    type Error = Infallible;
}

impl SpiDevice for LoopbackPeer {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut state = self.state();
        for op in operations.iter_mut() {
            if let Operation::Transfer(read, write) = op {
                read.fill(0);
                // Answer with what was pending before this frame arrived.
                for pair in read.chunks_exact_mut(2) {
                    if let Some(b) = state.outgoing.pop_front() {
                        pair[0] = 0x01;
                        pair[1] = b;
                    }
                }

                if let Ok(frame) = <[u8; 4]>::try_from(&write[..]) {
                    state.frames.push(frame);
                }
                for pair in write.chunks_exact(2) {
                    match pair[0] {
                        TAG_MIDI => {
                            state.midi.push(pair[1]);
                            if state.echo {
                                state.outgoing.push_back(pair[1]);
                            }
                        }
                        TAG_LED => state.leds.push(pair[1]),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

/// Data-available line, high while the peer has bytes to deliver.
pub struct PeerLine {
    peer: LoopbackPeer,
}

impl digital::ErrorType for PeerLine {
    type Error = Infallible;
}

impl InputPin for PeerLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.peer.state().outgoing.is_empty())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

// ── Simple lines and delay ────────────────────────────────────────────────

/// Input line with a fixed level, or one that always faults.
pub struct StaticLine {
    pub level: bool,
    pub faulty: bool,
}

impl StaticLine {
    pub fn low() -> Self {
        StaticLine {
            level: false,
            faulty: false,
        }
    }

    pub fn high() -> Self {
        StaticLine {
            level: true,
            faulty: false,
        }
    }

    pub fn faulty() -> Self {
        StaticLine {
            level: false,
            faulty: true,
        }
    }
}

impl digital::ErrorType for StaticLine {
    type Error = MockLineError;
}

impl InputPin for StaticLine {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.faulty {
            return Err(MockLineError);
        }
        Ok(self.level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Output line that records every level it is driven to.
#[derive(Clone, Default)]
pub struct RecordingLine {
    pub levels: Arc<Mutex<Vec<bool>>>,
}

impl RecordingLine {
    pub fn history(&self) -> Vec<bool> {
        self.levels.lock().unwrap().clone()
    }
}

impl digital::ErrorType for RecordingLine {
    type Error = Infallible;
}

impl OutputPin for RecordingLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().unwrap().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.lock().unwrap().push(true);
        Ok(())
    }
}

/// Delay that only records the requested durations.
#[derive(Clone, Default)]
pub struct MockDelay {
    pub total_ns: Arc<Mutex<u64>>,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.lock().unwrap() += ns as u64;
    }
}
