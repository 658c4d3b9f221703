#![cfg_attr(not(test), no_std)]

//! Software timers multiplexed onto one hardware timer interrupt.
//!
//! A microcontroller has only a few timer peripherals that can raise
//! periodic interrupts. This crate takes the tick of one of them and fans it
//! out to a fixed table of software timers, each with its own period,
//! run count, enable state and callback.
//!
//! ```ignore
//! static TIMERS: IsrTimer = IsrTimer::new();
//!
//! fn tick() {
//!     TIMERS.on_tick();
//! }
//!
//! let blink = TIMERS.set_interval_ms(500, toggle_led)?;
//! tick_source::attach(&mut source, TICK_FREQUENCY_HZ, tick)?;
//! ```

#[macro_use]
mod logging;

pub mod config;
#[cfg(feature = "esp32")]
pub mod esp32;
pub mod isr_timer;
pub mod period;
pub mod scheduler;
pub mod table;
pub mod tick_source;

pub use config::{MAX_NUMBER_TIMERS, TICK_FREQUENCY_HZ};
pub use isr_timer::IsrTimer;
pub use period::Period;
pub use table::{Callback, Runs, TimerArg, TimerError, TimerId, TimerTable};
pub use tick_source::{HardwareTickSource, MockTickSource, TickSourceError};
