//! Transfer cycle.
//!
//! One call to [`Scheduler::run_cycle`] drains the link: it keeps exchanging
//! frames for as long as either side has something to say. Each iteration:
//!
//! 1. pull newly available bytes from the output source into the outbound
//!    queue,
//! 2. compose a frame, LED command first, then flow-gated MIDI bytes,
//! 3. exchange it,
//! 4. decay the flow estimate by the whole milliseconds elapsed since the
//!    previous exchange (a cycle starting from an idle estimate restarts
//!    the clock),
//! 5. queue every delivered byte, notifying the input client when the
//!    inbound queue rises above its watermark.
//!
//! The loop ends once an iteration receives nothing and no outbound bytes,
//! LED command, pending line or undrained flow estimate remain. A final
//! notification then hands any backlog below the watermark to the client.

use core::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use embedded_hal::digital::InputPin;
use embedded_hal::spi::SpiDevice;

use crate::config::LinkConfig;
use crate::constants::SLOTS_PER_FRAME;
use crate::flow::FlowController;
use crate::link::frame::{self, Frame, Slot};
use crate::link::FrameExchange;
use crate::signal::SignalBridge;
use crate::transport::Transport;

/// Outcome of one [`Scheduler::run_cycle`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Frames exchanged.
    pub iterations: usize,
    /// The cycle hit its iteration bound with work still outstanding.
    pub yielded: bool,
}

/// Steady-state state confined to the worker: the bound link, the
/// data-available line and the flow estimate.
pub struct Scheduler<SPI, PIN> {
    link: FrameExchange<SPI>,
    signal: SignalBridge<PIN>,
    flow: FlowController,
    transport: Arc<Transport>,
    last_exchange: Instant,
    max_iterations: Option<NonZeroUsize>,
}

impl<SPI, PIN> Scheduler<SPI, PIN>
where
    SPI: SpiDevice,
    PIN: InputPin,
{
    pub fn new(
        link: FrameExchange<SPI>,
        signal: SignalBridge<PIN>,
        transport: Arc<Transport>,
        config: &LinkConfig,
    ) -> Self {
        Self {
            link,
            signal,
            flow: FlowController::new(
                config.buffer_ceiling,
                config.cost_per_byte,
                config.drain_per_tick(),
            ),
            transport,
            last_exchange: Instant::now(),
            max_iterations: config.max_cycle_iterations,
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    /// Run one drain cycle.
    pub fn run_cycle(&mut self) -> CycleReport {
        let transport = Arc::clone(&self.transport);
        let mut iterations = 0;
        let mut yielded = false;

        // Idle time is never credited against the bytes this cycle sends.
        if self.flow.is_idle() {
            self.last_exchange = Instant::now();
        }

        loop {
            transport.pull_output();

            let tx = self.compose(&transport);
            let rx = self.link.exchange(&tx);
            self.decay(Instant::now());

            let mut had_data = false;
            let mut crossed = false;
            for byte in frame::delivered(&rx) {
                had_data = true;
                crossed |= transport.inbound().deliver(byte);
            }
            if crossed {
                transport.notify_inbound();
            }

            iterations += 1;

            let more = had_data
                || !transport.outbound().is_empty()
                || self.signal.level()
                || transport.led().is_pending()
                || !self.flow.is_idle();
            if !more {
                break;
            }
            if self
                .max_iterations
                .is_some_and(|max| iterations >= max.get())
            {
                yielded = true;
                break;
            }
        }

        if !transport.inbound().is_empty() {
            transport.notify_inbound();
        }

        tracing::trace!(iterations, yielded, usage = self.flow.usage(), "cycle done");
        CycleReport {
            iterations,
            yielded,
        }
    }

    fn compose(&mut self, transport: &Transport) -> Frame {
        let mut tx = Frame::EMPTY;

        for index in 0..SLOTS_PER_FRAME {
            if !self.flow.can_send(transport.led().is_pending()) {
                break;
            }

            if let Some(duration) = transport.led().take() {
                tx.set(index, Slot::Led(duration));
            } else if let Some(byte) = transport.outbound().pop() {
                tx.set(index, Slot::Midi(byte));
                self.flow.on_sent_byte();
            } else {
                break;
            }
        }
        tx
    }

    fn decay(&mut self, now: Instant) {
        let ticks = now.saturating_duration_since(self.last_exchange).as_millis() as u64;
        if ticks > 0 {
            self.flow.on_elapsed(ticks);
            self.last_exchange += Duration::from_millis(ticks);
        }
    }

    /// Tear down, returning the link and the line.
    pub fn into_parts(self) -> (FrameExchange<SPI>, SignalBridge<PIN>) {
        (self.link, self.signal)
    }
}
