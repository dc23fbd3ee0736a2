//! Byte queues between the stream clients and the transfer worker.
//!
//! ## Components
//!
//! | Queue | Producer | Consumer | Full policy |
//! |-------|----------|----------|-------------|
//! | [`OutboundQueue`] | worker pulling from the active [`MidiSource`], or a client `send` under the output lock | worker, filling frame slots | producer stops pulling |
//! | [`InboundQueue`] | worker, unpacking frame slots | receive client | byte dropped |
//!
//! Both are 4096-byte [`ring::ByteRing`]s, lock-free with one producer and
//! one consumer per direction.

pub mod ring;
pub mod inbound;
pub mod outbound;

pub use inbound::{InboundObserver, InboundQueue};
pub use outbound::{MidiSource, OutboundQueue};
