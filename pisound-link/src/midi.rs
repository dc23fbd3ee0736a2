//! MIDI byte-stream endpoints.
//!
//! Each bound link publishes one output and one input endpoint, both named
//! after the card's serial number. The lifecycle mirrors a raw MIDI stream:
//!
//! | Call | Output | Input |
//! |------|--------|-------|
//! | `open` | installs the byte source | marks the endpoint open |
//! | `start` | requests a cycle | registers the ready callback, requests a cycle |
//! | `stop` | - | clears the callback |
//! | `drain` | blocks until the outbound queue is empty | - |
//! | `close` | removes the source | clears the callback |

use std::sync::Arc;

use crate::io::{InboundObserver, MidiSource};
use crate::transport::Transport;

/// Host-to-peer MIDI stream.
pub struct MidiOutput {
    transport: Arc<Transport>,
    name: String,
}

impl MidiOutput {
    pub(crate) fn new(transport: Arc<Transport>, name: String) -> Self {
        Self { transport, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Make `source` the active producer. Any previous source is dropped.
    pub fn open(&self, source: Box<dyn MidiSource>) {
        if self.transport.set_output(Some(source)).is_some() {
            tracing::debug!(port = %self.name, "replacing open output source");
        }
    }

    pub fn is_open(&self) -> bool {
        self.transport.has_output()
    }

    /// Ask the worker to pull from the source.
    pub fn start(&self) {
        self.transport.request_cycle();
    }

    /// Queue bytes without going through a source, returning how many fit.
    pub fn send(&self, bytes: &[u8]) -> usize {
        let n = self.transport.send(bytes);
        if n > 0 {
            self.transport.request_cycle();
        }
        n
    }

    /// Block until every queued byte has been handed to the peer.
    ///
    /// Must not be called from an [`InboundObserver`].
    pub fn drain(&self) {
        self.transport.drain();
    }

    /// Deactivate the endpoint, returning its source.
    pub fn close(&self) -> Option<Box<dyn MidiSource>> {
        self.transport.set_output(None)
    }
}

/// Peer-to-host MIDI stream.
///
/// Stopping or dropping a handle only removes the observer that handle
/// registered.
pub struct MidiInput {
    transport: Arc<Transport>,
    name: String,
    open: bool,
    observer: Option<Arc<dyn InboundObserver>>,
}

impl MidiInput {
    pub(crate) fn new(transport: Arc<Transport>, name: String) -> Self {
        Self {
            transport,
            name,
            open: false,
            observer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Register `observer` and kick a cycle so any backlog is delivered.
    pub fn start<O>(&mut self, observer: O)
    where
        O: InboundObserver + 'static,
    {
        if !self.open {
            tracing::debug!(port = %self.name, "starting input that was never opened");
            self.open = true;
        }
        let observer: Arc<dyn InboundObserver> = Arc::new(observer);
        self.transport.set_observer(Some(Arc::clone(&observer)));
        self.observer = Some(observer);
        self.transport.request_cycle();
    }

    pub fn stop(&mut self) {
        if let Some(observer) = self.observer.take() {
            if !self.transport.clear_observer(&observer) {
                tracing::debug!(port = %self.name, "observer already replaced");
            }
        }
    }

    pub fn close(&mut self) {
        self.stop();
        self.open = false;
    }
}

impl Drop for MidiInput {
    fn drop(&mut self) {
        self.stop();
    }
}
