//! Link configuration.
//!
//! Every knob defaults to the value the Pisound firmware expects (see
//! [`constants`](crate::constants)); tests and unusual boards override them
//! through the `with_*` builders.

use core::num::NonZeroUsize;

use crate::constants::*;

/// Per-instance link settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Name the [`LinkLocator`](crate::device::LinkLocator) matches the SPI device by.
    pub device_name: String,
    /// Clock rate the locator must open the SPI device at.
    pub spi_speed_hz: u32,
    /// Delay appended after every transfer, in microseconds.
    pub word_delay_us: u32,
    /// Peer UART drain rate in bytes per second.
    pub peer_byte_rate: u32,
    /// Flow-control ceiling in milli-bytes.
    pub buffer_ceiling: u32,
    /// Milli-bytes charged per MIDI byte sent.
    pub cost_per_byte: u32,
    /// Inbound queue length that triggers the ready callback.
    pub inbound_watermark: usize,
    /// Width of the peer reset pulse.
    pub reset_pulse_ms: u32,
    /// Settle time after releasing reset.
    pub reset_settle_ms: u32,
    /// LED flash issued right after identification, if any.
    pub startup_flash: Option<u8>,
    /// Upper bound on drain-loop iterations per cycle. `None` keeps draining
    /// for as long as there is work.
    pub max_cycle_iterations: Option<NonZeroUsize>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_owned(),
            spi_speed_hz: DEFAULT_SPI_SPEED_HZ,
            word_delay_us: WORD_DELAY_US,
            peer_byte_rate: PEER_BYTE_RATE,
            buffer_ceiling: PEER_BUFFER_CEILING,
            cost_per_byte: COST_PER_BYTE,
            inbound_watermark: INBOUND_WATERMARK,
            reset_pulse_ms: 1,
            reset_settle_ms: 64,
            startup_flash: Some(STARTUP_FLASH_DURATION),
            max_cycle_iterations: None,
        }
    }
}

impl LinkConfig {
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    pub fn with_spi_speed_hz(mut self, hz: u32) -> Self {
        self.spi_speed_hz = hz;
        self
    }

    pub fn with_peer_byte_rate(mut self, bytes_per_sec: u32) -> Self {
        self.peer_byte_rate = bytes_per_sec;
        self
    }

    pub fn with_buffer_ceiling(mut self, millibytes: u32) -> Self {
        self.buffer_ceiling = millibytes;
        self
    }

    pub fn with_inbound_watermark(mut self, bytes: usize) -> Self {
        self.inbound_watermark = bytes;
        self
    }

    pub fn with_reset_timing(mut self, pulse_ms: u32, settle_ms: u32) -> Self {
        self.reset_pulse_ms = pulse_ms;
        self.reset_settle_ms = settle_ms;
        self
    }

    pub fn with_startup_flash(mut self, duration: Option<u8>) -> Self {
        self.startup_flash = duration;
        self
    }

    pub fn with_max_cycle_iterations(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.max_cycle_iterations = limit;
        self
    }

    /// Peer drain rate in milli-bytes per 1 ms flow tick.
    pub fn drain_per_tick(&self) -> u32 {
        // bytes/s * 1000 milli-bytes/byte / 1000 ticks/s
        self.peer_byte_rate
    }
}
