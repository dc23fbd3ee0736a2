//! Transfer worker.
//!
//! A single dedicated thread owns the [`Scheduler`] (and with it the SPI
//! device and the data-available line), so frame exchanges are never
//! concurrent. Everyone else talks to it through [`CycleRequests`]:
//!
//! - [`request()`](CycleRequests::request) sets a pending flag and unparks the
//!   worker. It never blocks or allocates, so it is safe from an interrupt
//!   handler. Requests made while one is already pending are no-ops; a request
//!   made while a cycle is running leaves exactly one follow-up cycle pending.
//! - [`wait_idle()`](CycleRequests::wait_idle) blocks until nothing is pending
//!   or running.
//!
//! Shutdown stops accepting requests, lets the worker finish the cycle in
//! flight plus at most one pending one, then joins it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle, Thread};
use std::time::Duration;

use embedded_hal::digital::InputPin;
use embedded_hal::spi::SpiDevice;

use crate::error::LinkError;
use crate::scheduler::Scheduler;
use crate::transport::Transport;

/// Upper bound on a single idle wait, so a missed notification only costs
/// one timeout.
const IDLE_POLL: Duration = Duration::from_millis(10);

/// Coalescing cycle-request signal between producers and the worker.
#[derive(Debug, Default)]
pub struct CycleRequests {
    pending: AtomicBool,
    running: AtomicBool,
    shut_down: AtomicBool,
    worker: OnceLock<Thread>,
    /// Completed cycle count, guarded for the idle condvar.
    completed: Mutex<u64>,
    idle: Condvar,
}

impl CycleRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a transfer cycle.
    ///
    /// Returns `false` if the request was coalesced with one already pending
    /// or the worker is shut down.
    pub fn request(&self) -> bool {
        if self.shut_down.load(Ordering::Acquire) {
            return false;
        }
        if self.pending.swap(true, Ordering::SeqCst) {
            return false;
        }
        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Cycles completed since the link came up.
    pub fn completed(&self) -> u64 {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until no cycle is pending or running (or the worker is gone).
    pub fn wait_idle(&self) {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        while (self.is_pending() || self.is_running()) && !self.is_shut_down() {
            completed = self
                .idle
                .wait_timeout(completed, IDLE_POLL)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Stop accepting requests and wake the worker so it can flush and exit.
    pub(crate) fn shut_down(&self) {
        self.shut_down.store(true, Ordering::Release);
        if let Some(worker) = self.worker.get() {
            worker.unpark();
        }
        self.idle.notify_all();
    }

    fn attach(&self, worker: Thread) {
        if self.worker.set(worker).is_err() {
            tracing::warn!("transfer worker already attached");
        }
    }

    /// Claim the pending request, marking a cycle as running. Worker only.
    fn begin(&self) -> bool {
        if !self.pending.load(Ordering::SeqCst) {
            return false;
        }
        // Running is raised before pending drops so waiters never observe
        // a gap between the two.
        self.running.store(true, Ordering::SeqCst);
        self.pending.store(false, Ordering::SeqCst);
        true
    }

    fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        *completed += 1;
        self.idle.notify_all();
    }
}

/// Handle to the running worker thread.
pub struct Worker<SPI, PIN>
where
    SPI: SpiDevice + Send + 'static,
    PIN: InputPin + Send + 'static,
{
    transport: Arc<Transport>,
    handle: Option<JoinHandle<Scheduler<SPI, PIN>>>,
}

impl<SPI, PIN> Worker<SPI, PIN>
where
    SPI: SpiDevice + Send + 'static,
    PIN: InputPin + Send + 'static,
{
    /// Start the worker thread, handing it the scheduler.
    pub fn spawn(scheduler: Scheduler<SPI, PIN>) -> Result<Self, LinkError> {
        let transport = Arc::clone(scheduler.transport());
        let handle = thread::Builder::new()
            .name("pisound-link".into())
            .spawn(move || run(scheduler))?;

        Ok(Self {
            transport,
            handle: Some(handle),
        })
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Quiesce and stop the worker, returning the scheduler and the
    /// resources it owns.
    pub fn shutdown(mut self) -> Option<Scheduler<SPI, PIN>> {
        self.stop()
    }

    fn stop(&mut self) -> Option<Scheduler<SPI, PIN>> {
        let handle = self.handle.take()?;

        // The worker runs any cycle already pending before it exits.
        self.transport.requests().shut_down();

        match handle.join() {
            Ok(scheduler) => Some(scheduler),
            Err(_) => {
                tracing::error!("transfer worker panicked");
                None
            }
        }
    }
}

impl<SPI, PIN> Drop for Worker<SPI, PIN>
where
    SPI: SpiDevice + Send + 'static,
    PIN: InputPin + Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<SPI, PIN>(mut scheduler: Scheduler<SPI, PIN>) -> Scheduler<SPI, PIN>
where
    SPI: SpiDevice,
    PIN: InputPin,
{
    let transport = Arc::clone(scheduler.transport());
    let requests = transport.requests();
    requests.attach(thread::current());
    tracing::debug!("transfer worker started");

    loop {
        if requests.begin() {
            let report = scheduler.run_cycle();
            requests.finish();

            if report.yielded {
                tracing::trace!(iterations = report.iterations, "cycle yielded");
                requests.request();
            }
        } else if requests.is_shut_down() {
            break;
        } else {
            thread::park();
        }
    }

    tracing::debug!("transfer worker stopped");
    scheduler
}
