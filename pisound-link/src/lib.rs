//! # pisound-link
//!
//! Host side of the Pisound MIDI link: a fixed-frame, full-duplex SPI
//! protocol that carries MIDI bytes and LED commands between a Linux host and
//! the board's microcontroller, written against the
//! [`embedded-hal`](https://docs.rs/embedded-hal) 1.0 traits.
//!
//! The microcontroller forwards host bytes to a 31 250 baud UART through a
//! small buffer it cannot protect, so the host paces itself with a flow
//! estimator instead of relying on back-pressure.
//!
//! ## Architecture
//!
//! | Layer | Module | Purpose |
//! |-------|--------|---------|
//! | Wire | [`link`] | Frame/slot layout, SPI exchange engine, identity decoding |
//! | Queues | [`io`] | Lock-free SPSC byte rings between clients and the worker |
//! | Pacing | [`flow`] | Peer buffer occupancy estimator |
//! | Scheduling | [`scheduler`] / [`worker`] | Drain loop and its dedicated thread |
//! | Shared state | [`transport`] | Queues, LED command, client registrations |
//! | Lines | [`signal`] | Data-available level and edge notification |
//! | Clients | [`midi`] | Output and input stream endpoints |
//! | Lifecycle | [`device`] | Bring-up, rollback and teardown |
//!
//! ## Quick start
//!
//! ```ignore
//! use pisound_link::{LinkConfig, LinkLines, Pisound};
//!
//! let lines = LinkLines { reset, data_available, delay };
//! let card = Pisound::probe(&mut locator, lines, LinkConfig::default())?;
//! println!("{}", card.identity());
//!
//! // From the GPIO edge handler:
//! let notifier = card.edge_notifier();
//! notifier.notify();
//!
//! let mut input = card.midi_input();
//! input.open();
//! input.start(|rx: &InboundQueue| forward(rx.drain()));
//!
//! let output = card.midi_output();
//! output.send(&[0x90, 0x3C, 0x7F]);
//! output.drain();
//!
//! let released = card.shutdown();
//! ```
//!
//! ## Link parameters
//!
//! - **Frame:** 4 bytes, two `(tag, value)` slots ([`constants::TRANSFER_SIZE`])
//! - **Queues:** 4096 bytes per direction ([`constants::FIFO_SIZE`])
//! - **Flow ceiling:** 127 000 milli-bytes ([`constants::PEER_BUFFER_CEILING`])
//! - **SPI clock:** 150 kHz ([`constants::DEFAULT_SPI_SPEED_HZ`])

pub mod constants;
pub mod config;
pub mod error;
pub mod io;
pub mod link;
pub mod flow;
pub mod signal;
pub mod transport;
pub mod scheduler;
pub mod worker;
pub mod midi;
pub mod device;

#[cfg(test)]
mod mock;


pub use config::LinkConfig;
pub use device::{LinkLines, LinkLocator, Pisound, Released};
pub use error::{LinkError, ProtocolError, Result};
pub use io::{InboundObserver, InboundQueue, MidiSource};
pub use link::DeviceIdentity;
pub use midi::{MidiInput, MidiOutput};
pub use signal::EdgeNotifier;
