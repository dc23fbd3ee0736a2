//! Link bring-up and teardown.
//!
//! [`Pisound::probe`] takes the board from power-on to steady state:
//!
//! 1. find the SPI device through a [`LinkLocator`],
//! 2. pulse the peer's reset line and let it settle,
//! 3. read the [`DeviceIdentity`],
//! 4. flash the LEDs once,
//! 5. start the transfer worker, kicking a first cycle if the peer already
//!    has data waiting.
//!
//! Any failure rolls back what was acquired: the SPI device is released, the
//! peer is held in reset and the lines are dropped.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

use crate::config::LinkConfig;
use crate::constants::TAG_LED;
use crate::error::{LinkError, Result};
use crate::link::{DeviceIdentity, FrameExchange};
use crate::midi::{MidiInput, MidiOutput};
use crate::scheduler::Scheduler;
use crate::signal::{EdgeNotifier, SignalBridge};
use crate::transport::Transport;
use crate::worker::Worker;

/// Finds the peer's SPI device.
pub trait LinkLocator {
    type Spi: SpiDevice;

    /// Open the device registered as `name`, clocked at `speed_hz`, or
    /// `None` if no such device exists (yet).
    fn locate(&mut self, name: &str, speed_hz: u32) -> Option<Self::Spi>;
}

/// GPIO lines and timer the link needs besides the SPI device.
pub struct LinkLines<RST, DA, D> {
    /// Peer reset, active low.
    pub reset: RST,
    /// Data-available line, high while the peer holds bytes for the host.
    pub data_available: DA,
    pub delay: D,
}

/// Resources handed back by [`Pisound::shutdown`].
pub struct Released<SPI, RST, DA> {
    pub spi: Option<SPI>,
    pub reset: RST,
    pub data_available: Option<DA>,
}

/// A bound, running link.
pub struct Pisound<SPI, RST, DA>
where
    SPI: SpiDevice + Send + 'static,
    DA: InputPin + Send + 'static,
{
    identity: DeviceIdentity,
    transport: Arc<Transport>,
    worker: Worker<SPI, DA>,
    reset: RST,
}

impl<SPI, RST, DA> Pisound<SPI, RST, DA>
where
    SPI: SpiDevice + Send + 'static,
    RST: OutputPin,
    DA: InputPin + Send + 'static,
{
    /// Bring the link up.
    ///
    /// Returns [`LinkError::LinkUnavailable`] if the locator has no device by
    /// the configured name; the caller may retry later.
    pub fn probe<L, D>(
        locator: &mut L,
        lines: LinkLines<RST, DA, D>,
        config: LinkConfig,
    ) -> Result<Self>
    where
        L: LinkLocator<Spi = SPI>,
        D: DelayNs,
    {
        let LinkLines {
            mut reset,
            data_available,
            mut delay,
        } = lines;

        tracing::info!(speed_hz = config.spi_speed_hz, "setting SPI speed");
        let Some(spi) = locator.locate(&config.device_name, config.spi_speed_hz) else {
            tracing::warn!(name = %config.device_name, "SPI device not found, deferring");
            return Err(LinkError::LinkUnavailable {
                name: config.device_name,
            });
        };

        if let Err(err) = reset_peer(&mut reset, &mut delay, &config) {
            tracing::error!(%err, "peer reset failed");
            hold_in_reset(&mut reset);
            return Err(err);
        }

        let mut link = FrameExchange::new(spi, config.word_delay_us);
        let identity = match DeviceIdentity::read(&mut link) {
            Ok(identity) => identity,
            Err(err) => {
                tracing::warn!(%err, "failed reading pisound identity");
                drop(link.release());
                hold_in_reset(&mut reset);
                return Err(err.into());
            }
        };

        if let Some(duration) = config.startup_flash {
            link.exchange16(u16::from_be_bytes([TAG_LED, duration]));
        }

        let transport = Arc::new(Transport::new(&config));
        let mut signal = SignalBridge::new(data_available);
        let data_pending = signal.level();

        let scheduler = Scheduler::new(link, signal, Arc::clone(&transport), &config);
        let worker = match Worker::spawn(scheduler) {
            Ok(worker) => worker,
            Err(err) => {
                tracing::error!(%err, "transfer worker failed to start");
                hold_in_reset(&mut reset);
                return Err(err);
            }
        };

        tracing::info!("detected pisound card: {identity}");

        if data_pending {
            transport.request_cycle();
        }

        Ok(Self {
            identity,
            transport,
            worker,
            reset,
        })
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn serial(&self) -> &str {
        &self.identity.serial
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn firmware_version(&self) -> &str {
        &self.identity.firmware_version
    }

    pub fn hardware_version(&self) -> &str {
        &self.identity.hardware_version
    }

    /// Flash the LEDs for `duration` (firmware-defined units).
    pub fn flash_led(&self, duration: u8) {
        self.transport.flash_led(duration);
    }

    /// Handler for the data-available line's rising edge.
    pub fn edge_notifier(&self) -> EdgeNotifier {
        EdgeNotifier::new(Arc::clone(&self.transport))
    }

    pub fn midi_output(&self) -> MidiOutput {
        MidiOutput::new(Arc::clone(&self.transport), self.identity.port_name())
    }

    pub fn midi_input(&self) -> MidiInput {
        MidiInput::new(Arc::clone(&self.transport), self.identity.port_name())
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// Quiesce the worker, then hold the peer in reset and hand every
    /// resource back.
    pub fn shutdown(self) -> Released<SPI, RST, DA> {
        let Pisound {
            worker, mut reset, ..
        } = self;

        let (spi, data_available) = match worker.shutdown() {
            Some(scheduler) => {
                let (mut link, signal) = scheduler.into_parts();
                (link.release(), Some(signal.release()))
            }
            None => (None, None),
        };

        hold_in_reset(&mut reset);
        tracing::info!("pisound link shut down");

        Released {
            spi,
            reset,
            data_available,
        }
    }
}

fn reset_peer<RST, D>(reset: &mut RST, delay: &mut D, config: &LinkConfig) -> Result<()>
where
    RST: OutputPin,
    D: DelayNs,
{
    reset.set_low().map_err(LinkError::line)?;
    delay.delay_ms(config.reset_pulse_ms);
    reset.set_high().map_err(LinkError::line)?;
    delay.delay_ms(config.reset_settle_ms);
    Ok(())
}

fn hold_in_reset<RST: OutputPin>(reset: &mut RST) {
    if let Err(err) = reset.set_low() {
        tracing::error!(err = %LinkError::line(err), "failed to hold peer in reset");
    }
}
