//! Frame Exchange Engine.
//!
//! Performs full-duplex transfers with the peer over any
//! [`embedded_hal::spi::SpiDevice`]. Every transfer is followed by a short
//! fixed delay the peer firmware needs between words.
//!
//! Two transfer shapes are used:
//!
//! - [`exchange()`](FrameExchange::exchange): one 4-byte steady-state frame.
//! - [`exchange16()`](FrameExchange::exchange16): one 16-bit big-endian
//!   handshake word. The high byte of the reply is the ready flag (zero means
//!   not ready), the low byte carries a length or a data byte.
//!
//! Transfer faults never propagate out of these two calls: they are logged and
//! the caller sees an all-zero reply, i.e. "nothing happened this time".

use embedded_hal::spi::{Operation, SpiDevice};

use crate::constants::TRANSFER_SIZE;
use crate::error::{LinkError, ProtocolError};

use super::frame::Frame;

/// Longest block a length-prefixed read can return.
pub const MAX_BLOCK_LEN: usize = u8::MAX as usize;

/// Owner of the bound SPI device.
pub struct FrameExchange<SPI> {
    spi: Option<SPI>,
    word_delay_ns: u32,
}

impl<SPI> FrameExchange<SPI>
where
    SPI: SpiDevice,
{
    /// Bind `spi`, appending `word_delay_us` after every transfer.
    pub fn new(spi: SPI, word_delay_us: u32) -> Self {
        Self {
            spi: Some(spi),
            word_delay_ns: word_delay_us.saturating_mul(1000),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.spi.is_some()
    }

    /// Unbind and return the SPI device.
    pub fn release(&mut self) -> Option<SPI> {
        self.spi.take()
    }

    /// One raw transfer. `rx` is zeroed first and left zeroed on failure.
    pub fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), LinkError> {
        rx.fill(0);
        let spi = self.spi.as_mut().ok_or(LinkError::NotBound)?;

        let result = spi.transaction(&mut [
            Operation::Transfer(&mut *rx, tx),
            Operation::DelayNs(self.word_delay_ns),
        ]);

        if let Err(err) = result {
            rx.fill(0);
            return Err(LinkError::transfer(err));
        }
        Ok(())
    }

    /// Exchange one steady-state frame.
    pub fn exchange(&mut self, frame: &Frame) -> [u8; TRANSFER_SIZE] {
        let tx = frame.to_bytes();
        let mut rx = [0u8; TRANSFER_SIZE];

        match self.transfer(&tx, &mut rx) {
            Ok(()) => tracing::trace!(?tx, ?rx, "frame exchanged"),
            Err(err) => tracing::error!(%err, "frame exchange failed"),
        }
        rx
    }

    /// Exchange one 16-bit handshake word.
    pub fn exchange16(&mut self, word: u16) -> u16 {
        let mut rx = [0u8; 2];

        if let Err(err) = self.transfer(&word.to_be_bytes(), &mut rx) {
            tracing::error!(%err, word, "handshake exchange failed");
        }

        let reply = u16::from_be_bytes(rx);
        tracing::trace!("received: {reply:04x}");
        reply
    }

    /// Read one length-prefixed block into `dst`.
    ///
    /// The first handshake declares the block length, then one handshake is
    /// issued per byte. `dst` is zeroed up front and only written once the
    /// whole block has been read successfully.
    pub fn read_length_prefixed(&mut self, dst: &mut [u8]) -> Result<usize, ProtocolError> {
        dst.fill(0);

        let len = ready_byte(self.exchange16(0))? as usize;
        if len > dst.len() {
            return Err(ProtocolError::BlockTooLong {
                declared: len,
                capacity: dst.len(),
            });
        }

        let mut scratch = [0u8; MAX_BLOCK_LEN];
        for slot in scratch[..len].iter_mut() {
            *slot = ready_byte(self.exchange16(0))?;
        }

        dst[..len].copy_from_slice(&scratch[..len]);
        Ok(len)
    }
}

/// Split a handshake reply, rejecting a zero ready flag.
pub fn ready_byte(word: u16) -> Result<u8, ProtocolError> {
    if word >> 8 == 0 {
        return Err(ProtocolError::NotReady { word });
    }
    Ok(word as u8)
}
