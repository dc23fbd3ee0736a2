//! Shared transport context.
//!
//! One [`Transport`] exists per bound link. It is the only state shared
//! between the stream clients, the edge notifier and the worker:
//!
//! ```text
//!  MidiOutput ──open(source)──┐                      ┌──► InboundObserver
//!  flash_led() ──► LedCommand │   ┌──────────────┐   │
//!  EdgeNotifier ──────────────┼──►│  Transport   │───┤
//!  MidiInput ──start(obs)─────┘   │ queues, LED, │   └──► OutboundQueue / InboundQueue
//!                                 │ cycle signal │
//!                                 └──────┬───────┘
//!                                        ▼
//!                                      Worker
//! ```

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::LinkConfig;
use crate::io::{InboundObserver, InboundQueue, MidiSource, OutboundQueue};
use crate::worker::CycleRequests;

const LED_PENDING: u16 = 0x100;

/// One-shot LED flash request, last write wins.
///
/// Packed into a single atomic so it can be set from any context and
/// consumed by the worker without a lock.
#[derive(Debug, Default)]
pub struct LedCommand {
    state: AtomicU16,
}

impl LedCommand {
    pub const fn new() -> Self {
        Self {
            state: AtomicU16::new(0),
        }
    }

    /// Schedule a flash, replacing any unsent one.
    pub fn set(&self, duration: u8) {
        self.state.store(LED_PENDING | duration as u16, Ordering::Release);
    }

    /// Take the pending duration, clearing the command.
    pub fn take(&self) -> Option<u8> {
        let state = self.state.swap(0, Ordering::AcqRel);
        (state & LED_PENDING != 0).then_some(state as u8)
    }

    pub fn is_pending(&self) -> bool {
        self.state.load(Ordering::Acquire) & LED_PENDING != 0
    }
}

/// Queues, control state and client registrations for one link.
pub struct Transport {
    inbound: InboundQueue,
    outbound: OutboundQueue,
    led: LedCommand,
    output: Mutex<Option<Box<dyn MidiSource>>>,
    observer: Mutex<Option<Arc<dyn InboundObserver>>>,
    requests: CycleRequests,
}

impl Transport {
    pub fn new(config: &LinkConfig) -> Self {
        Self {
            inbound: InboundQueue::new(config.inbound_watermark),
            outbound: OutboundQueue::new(),
            led: LedCommand::new(),
            output: Mutex::new(None),
            observer: Mutex::new(None),
            requests: CycleRequests::new(),
        }
    }

    pub fn inbound(&self) -> &InboundQueue {
        &self.inbound
    }

    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    pub fn led(&self) -> &LedCommand {
        &self.led
    }

    pub fn requests(&self) -> &CycleRequests {
        &self.requests
    }

    /// Ask the worker for a transfer cycle. Never blocks or allocates.
    pub fn request_cycle(&self) {
        self.requests.request();
    }

    /// Schedule a one-shot LED flash.
    pub fn flash_led(&self, duration: u8) {
        self.led.set(duration);
        tracing::debug!(duration, "schedule from flash_led");
        self.request_cycle();
    }

    // ── Output client ─────────────────────────────────────────────────

    /// Install (or with `None`, remove) the active output source, returning
    /// the previous one.
    pub fn set_output(&self, source: Option<Box<dyn MidiSource>>) -> Option<Box<dyn MidiSource>> {
        let mut slot = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, source)
    }

    pub fn has_output(&self) -> bool {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Queue bytes directly, returning how many fit.
    ///
    /// Holds the output lock so this never races the worker pulling from
    /// the active source.
    pub fn send(&self, bytes: &[u8]) -> usize {
        let _source = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        self.outbound.write(bytes)
    }

    /// Move newly available bytes from the active source into the outbound
    /// queue. Worker only.
    pub(crate) fn pull_output(&self) -> usize {
        let mut slot = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_mut() {
            Some(source) => self.outbound.fill_from(&mut **source),
            None => 0,
        }
    }

    /// Block until the outbound queue has been handed to the peer.
    ///
    /// Must not be called from the worker thread (i.e. from inside an
    /// [`InboundObserver`]).
    pub fn drain(&self) {
        while !self.outbound.is_empty() && !self.requests.is_shut_down() {
            self.request_cycle();
            self.requests.wait_idle();
        }
    }

    // ── Input client ──────────────────────────────────────────────────

    pub fn set_observer(&self, observer: Option<Arc<dyn InboundObserver>>) {
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner) = observer;
    }

    /// Remove `observer` if it is still the registered one. Returns whether
    /// it was removed.
    pub fn clear_observer(&self, observer: &Arc<dyn InboundObserver>) -> bool {
        let mut slot = self.observer.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(current) if Arc::ptr_eq(current, observer) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    pub fn has_observer(&self) -> bool {
        self.observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Invoke the ready callback, if one is registered. Worker only.
    pub(crate) fn notify_inbound(&self) {
        let observer = self
            .observer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(observer) = observer {
            observer.on_inbound_ready(&self.inbound);
        }
    }
}
