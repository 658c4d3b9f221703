//! Hardware tick sources.
//!
//! A tick source wraps one hardware timer peripheral that raises a periodic
//! interrupt. It calls a single registered function on every tick, never
//! re-entrantly; that function is normally a thin wrapper around
//! [`crate::IsrTimer::on_tick`].

use core::fmt;

use crate::config::{interval_us_to_hz, TIMER_CLOCK_HZ};

/// Errors reported by tick sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSourceError {
    /// The underlying peripheral is already owned by another tick source.
    AlreadyInitialized,
    /// Zero, or faster than the counter clock can divide.
    InvalidFrequency,
    /// Started before a frequency and callback were set.
    NotConfigured,
    HardwareFault(&'static str),
}

impl fmt::Display for TickSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickSourceError::AlreadyInitialized => f.write_str("tick source already initialized"),
            TickSourceError::InvalidFrequency => f.write_str("unsupported tick frequency"),
            TickSourceError::NotConfigured => f.write_str("tick source not configured"),
            TickSourceError::HardwareFault(msg) => write!(f, "tick source fault: {}", msg),
        }
    }
}

/// A periodic hardware interrupt delivering ticks at a fixed frequency.
pub trait HardwareTickSource {
    /// Set the tick frequency. Takes effect on the next [`start`](Self::start).
    fn configure(&mut self, frequency_hz: u32) -> Result<(), TickSourceError>;

    /// Register the function called on every tick, replacing any previous one.
    fn set_tick_callback(&mut self, callback: fn());

    fn start(&mut self) -> Result<(), TickSourceError>;

    fn stop(&mut self);

    /// Configured frequency, if any.
    fn frequency_hz(&self) -> Option<u32>;

    /// Configure by tick period instead of frequency.
    ///
    /// The frequency is `TIMER_CLOCK_HZ / interval_us` in whole Hz, so
    /// intervals must be between 1µs and one second
    /// ([`TIMER_CLOCK_HZ`] µs). Longer intervals return
    /// [`TickSourceError::InvalidFrequency`]; run a faster tick and give the
    /// software timer a longer period instead.
    fn set_interval_us(&mut self, interval_us: u32) -> Result<(), TickSourceError> {
        let hz = interval_us_to_hz(interval_us).ok_or(TickSourceError::InvalidFrequency)?;
        self.configure(hz)
    }

    /// Start counting again from zero.
    fn restart(&mut self) -> Result<(), TickSourceError> {
        self.stop();
        self.start()
    }
}

/// Check a requested frequency against the counter clock.
pub fn validate_frequency(frequency_hz: u32) -> Result<u32, TickSourceError> {
    if frequency_hz == 0 || frequency_hz > TIMER_CLOCK_HZ {
        return Err(TickSourceError::InvalidFrequency);
    }
    Ok(frequency_hz)
}

/// Configure `source`, register `callback` and start ticking.
pub fn attach<S: HardwareTickSource>(
    source: &mut S,
    frequency_hz: u32,
    callback: fn(),
) -> Result<(), TickSourceError> {
    source.configure(frequency_hz)?;
    source.set_tick_callback(callback);
    source.start()?;
    log_info!("tick source running at {} Hz", frequency_hz);
    Ok(())
}

/// Software tick source. Ticks are delivered by calling [`MockTickSource::fire`].
#[derive(Debug, Default)]
pub struct MockTickSource {
    frequency_hz: Option<u32>,
    callback: Option<fn()>,
    running: bool,
    delivered: u64,
}

impl MockTickSource {
    pub const fn new() -> Self {
        Self {
            frequency_hz: None,
            callback: None,
            running: false,
            delivered: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks delivered since creation.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Deliver one tick. Returns `false` if the source is stopped.
    pub fn fire(&mut self) -> bool {
        match (self.running, self.callback) {
            (true, Some(callback)) => {
                self.delivered += 1;
                callback();
                true
            }
            _ => false,
        }
    }

    /// Deliver `n` ticks one at a time, returning how many were delivered.
    pub fn fire_n(&mut self, n: u32) -> u32 {
        (0..n).map(|_| self.fire() as u32).sum()
    }
}

impl HardwareTickSource for MockTickSource {
    fn configure(&mut self, frequency_hz: u32) -> Result<(), TickSourceError> {
        self.frequency_hz = Some(validate_frequency(frequency_hz)?);
        Ok(())
    }

    fn set_tick_callback(&mut self, callback: fn()) {
        self.callback = Some(callback);
    }

    fn start(&mut self) -> Result<(), TickSourceError> {
        if self.frequency_hz.is_none() || self.callback.is_none() {
            return Err(TickSourceError::NotConfigured);
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn frequency_hz(&self) -> Option<u32> {
        self.frequency_hz
    }
}
