//! Data-available line.
//!
//! The peer raises a GPIO line while it holds bytes for the host. The worker
//! samples the level through [`SignalBridge`] to decide whether to keep
//! draining; the platform's edge interrupt calls [`EdgeNotifier::notify`] on
//! every rising edge.

use std::sync::Arc;

use embedded_hal::digital::InputPin;

use crate::error::LinkError;
use crate::transport::Transport;

/// Level reader for the data-available line. Owned by the worker.
pub struct SignalBridge<PIN> {
    pin: PIN,
}

impl<PIN> SignalBridge<PIN>
where
    PIN: InputPin,
{
    pub fn new(pin: PIN) -> Self {
        Self { pin }
    }

    /// Whether the peer has data ready. A line fault reads as "nothing
    /// pending".
    pub fn level(&mut self) -> bool {
        match self.try_level() {
            Ok(high) => high,
            Err(err) => {
                tracing::error!(%err, "data-available line read failed");
                false
            }
        }
    }

    pub fn try_level(&mut self) -> Result<bool, LinkError> {
        self.pin.is_high().map_err(LinkError::line)
    }

    /// Give the line back.
    pub fn release(self) -> PIN {
        self.pin
    }
}

/// Rising-edge handler for the data-available line.
///
/// Cheap to clone; hand one to the interrupt or GPIO event thread. `notify`
/// only sets the coalescing cycle-request flag, it never blocks or allocates.
#[derive(Clone)]
pub struct EdgeNotifier {
    transport: Arc<Transport>,
}

impl EdgeNotifier {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    pub fn notify(&self) {
        self.transport.request_cycle();
    }
}
