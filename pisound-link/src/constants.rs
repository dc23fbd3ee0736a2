/// Bytes exchanged per full-duplex transfer in steady state.
pub const TRANSFER_SIZE: usize = 4;

/// Number of (tag, value) slots carried by one frame.
pub const SLOTS_PER_FRAME: usize = TRANSFER_SIZE / 2;

/// Capacity of each byte queue, in bytes. Must be a power of two.
pub const FIFO_SIZE: usize = 4096;

/// Inbound queue length above which the receive client is notified.
pub const INBOUND_WATERMARK: usize = 16;

// ── Slot tags ──────────────────────────────────────────────────────────────

/// Empty slot.
pub const TAG_NONE: u8 = 0x00;

/// Slot carries one MIDI byte.
pub const TAG_MIDI: u8 = 0x0F;

/// Slot carries an LED flash duration.
pub const TAG_LED: u8 = 0xF0;

// ── Flow control (milli-byte units) ────────────────────────────────────────

/// Size of the peer's MIDI output buffer.
pub const PEER_BUFFER_CEILING: u32 = 127 * 1000;

/// Cost charged against the peer buffer for each MIDI byte sent.
pub const COST_PER_BYTE: u32 = 1000;

/// Rate at which the peer's UART empties its buffer, in bytes per second
/// (31 250 baud, 10 bits per byte on the wire).
pub const PEER_BYTE_RATE: u32 = 3125;

// ── Link defaults ──────────────────────────────────────────────────────────

/// SPI device name the locator is asked for.
pub const DEFAULT_DEVICE_NAME: &str = "pisound-spi";

/// Default SPI clock.
pub const DEFAULT_SPI_SPEED_HZ: u32 = 150_000;

/// Delay appended after every transfer, in microseconds.
pub const WORD_DELAY_US: u32 = 10;

/// LED flash issued once the identity has been read.
pub const STARTUP_FLASH_DURATION: u8 = 8;

/// Hardware version assumed when the peer does not report one.
pub const DEFAULT_HW_VERSION: &str = "1.0";
