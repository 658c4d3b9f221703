//! ESP32 tick source on the TIMG0 timer0 peripheral.
//!
//! The timer runs in auto-reload mode and raises `TG0_T0_LEVEL` once per
//! tick. The trampoline acknowledges the interrupt, then calls the
//! registered tick callback outside the driver's own critical section.

use core::cell::{Cell, RefCell};

use critical_section::Mutex;
use esp_hal::{
    interrupt::{self, IsrCallback, Priority},
    peripherals::{Interrupt, TIMG0},
    system::Cpu,
    time::Duration,
    timer::{timg::TimerGroup, PeriodicTimer},
    Blocking,
};

use crate::{
    config::TIMER_CLOCK_HZ,
    tick_source::{validate_frequency, HardwareTickSource, TickSourceError},
};

/// Interrupt priority of the tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickPriority {
    Level1,
    Level2,
    Level3,
}

impl From<TickPriority> for Priority {
    fn from(value: TickPriority) -> Self {
        match value {
            TickPriority::Level1 => Priority::Priority1,
            TickPriority::Level2 => Priority::Priority2,
            TickPriority::Level3 => Priority::Priority3,
        }
    }
}

type HwTimer = PeriodicTimer<'static, Blocking>;

/// Stored hardware timer so the ISR can acknowledge interrupts.
static TIMER: Mutex<RefCell<Option<HwTimer>>> = Mutex::new(RefCell::new(None));

static TICK_CALLBACK: Mutex<Cell<Option<fn()>>> = Mutex::new(Cell::new(None));

/// TIMG0-backed [`HardwareTickSource`]. Only one may exist.
pub struct Esp32TickSource {
    frequency_hz: Option<u32>,
    priority: TickPriority,
}

impl Esp32TickSource {
    /// Take ownership of TIMG0 and route its timer0 interrupt to the tick
    /// trampoline. The timer stays stopped until [`HardwareTickSource::start`].
    pub fn new(timg0: TIMG0<'static>) -> Result<Self, TickSourceError> {
        critical_section::with(|cs| {
            let mut cell = TIMER.borrow_ref_mut(cs);
            if cell.is_some() {
                return Err(TickSourceError::AlreadyInitialized);
            }

            let tg0 = TimerGroup::new(timg0);
            cell.replace(PeriodicTimer::new(tg0.timer0));
            Ok(())
        })?;

        // The trampoline is an `extern "C"` fn that only touches state
        // guarded by critical sections.
        unsafe {
            interrupt::bind_interrupt(
                Interrupt::TG0_T0_LEVEL,
                IsrCallback::new(tick_isr_trampoline),
            );
        }

        Ok(Self {
            frequency_hz: None,
            priority: TickPriority::Level1,
        })
    }

    pub fn with_priority(mut self, priority: TickPriority) -> Self {
        self.priority = priority;
        self
    }
}

impl HardwareTickSource for Esp32TickSource {
    fn configure(&mut self, frequency_hz: u32) -> Result<(), TickSourceError> {
        self.frequency_hz = Some(validate_frequency(frequency_hz)?);
        log_info!(
            "tick timer: clock {} Hz, frequency {} Hz, count {}",
            TIMER_CLOCK_HZ,
            frequency_hz,
            TIMER_CLOCK_HZ / frequency_hz
        );
        Ok(())
    }

    fn set_tick_callback(&mut self, callback: fn()) {
        critical_section::with(|cs| TICK_CALLBACK.borrow(cs).set(Some(callback)));
    }

    fn start(&mut self) -> Result<(), TickSourceError> {
        let frequency_hz = self.frequency_hz.ok_or(TickSourceError::NotConfigured)?;
        if critical_section::with(|cs| TICK_CALLBACK.borrow(cs).get()).is_none() {
            return Err(TickSourceError::NotConfigured);
        }

        // Auto-reload period in counter clock units (1µs).
        let period = Duration::from_micros((TIMER_CLOCK_HZ / frequency_hz) as u64);

        critical_section::with(|cs| -> Result<(), TickSourceError> {
            let mut cell = TIMER.borrow_ref_mut(cs);
            let timer = cell.as_mut().ok_or(TickSourceError::NotConfigured)?;
            timer
                .start(period)
                .map_err(|_| TickSourceError::HardwareFault("failed to start tick timer"))?;
            timer.listen();
            Ok(())
        })?;

        interrupt::enable(Interrupt::TG0_T0_LEVEL, self.priority.into())
            .map_err(|_| TickSourceError::HardwareFault("failed to enable tick interrupt"))
    }

    fn stop(&mut self) {
        interrupt::disable(Cpu::current(), Interrupt::TG0_T0_LEVEL);
        critical_section::with(|cs| {
            if let Some(timer) = TIMER.borrow_ref_mut(cs).as_mut() {
                let _ = timer.stop();
            }
        });
    }

    fn frequency_hz(&self) -> Option<u32> {
        self.frequency_hz
    }
}

/// ISR trampoline registered with the HAL interrupt controller.
extern "C" fn tick_isr_trampoline() {
    let callback = critical_section::with(|cs| {
        if let Some(timer) = TIMER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
        TICK_CALLBACK.borrow(cs).get()
    });

    if let Some(callback) = callback {
        callback();
    }
}
