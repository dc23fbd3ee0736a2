use embedded_hal::{digital, spi};

/// Errors raised while bringing the link up or talking to the peer.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// No SPI device answered to the configured name.
    #[error("no SPI device named {name:?}, bring-up deferred")]
    LinkUnavailable { name: String },

    /// An exchange was attempted with no link bound.
    #[error("link is not bound")]
    NotBound,

    /// The bus reported an error during a transfer.
    #[error("SPI transfer failed: {0:?}")]
    TransferFault(spi::ErrorKind),

    /// The peer answered with a malformed handshake or identity block.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Driving or sampling a GPIO line failed.
    #[error("GPIO line fault: {0:?}")]
    LineFault(digital::ErrorKind),

    /// The transfer worker thread could not be started.
    #[error("failed to spawn transfer worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// Handshake and identity decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The handshake word carried a zero ready flag.
    #[error("peer not ready (handshake word {word:#06x})")]
    NotReady { word: u16 },

    /// A length-prefixed block declared more bytes than the destination holds.
    #[error("block of {declared} bytes exceeds {capacity}-byte destination")]
    BlockTooLong { declared: usize, capacity: usize },

    /// A fixed-width identity field had the wrong length.
    #[error("identity field {field} expected {expected} bytes, got {actual}")]
    FieldLength {
        field: u8,
        expected: usize,
        actual: usize,
    },

    /// A variable-width identity field does not fit its destination.
    #[error("identity field {field} ({len} bytes) does not fit {capacity} characters")]
    FieldOverflow {
        field: u8,
        len: usize,
        capacity: usize,
    },
}

pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    pub(crate) fn line<E: digital::Error>(err: E) -> Self {
        LinkError::LineFault(err.kind())
    }

    pub(crate) fn transfer<E: spi::Error>(err: E) -> Self {
        LinkError::TransferFault(err.kind())
    }
}
