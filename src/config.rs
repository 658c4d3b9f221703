//! Compile-time configuration and tick/time conversions.

/// Default number of software timer slots multiplexed onto one hardware timer.
pub const MAX_NUMBER_TIMERS: usize = 16;

/// Default tick frequency in Hz (1000 Hz = 1ms per tick).
pub const TICK_FREQUENCY_HZ: u32 = 1_000;

/// Counter clock of the hardware tick source (1 MHz = 1µs resolution).
pub const TIMER_CLOCK_HZ: u32 = 1_000_000;

/// Converts milliseconds to ticks at `tick_hz`, rounding up.
///
/// Rounding up keeps a timer from firing earlier than requested. Any
/// non-zero duration maps to at least one tick.
pub const fn ms_to_ticks(ms: u32, tick_hz: u32) -> u64 {
    div_ceil(ms as u64 * tick_hz as u64, 1_000)
}

/// Converts microseconds to ticks at `tick_hz`, rounding up.
pub const fn us_to_ticks(us: u32, tick_hz: u32) -> u64 {
    div_ceil(us as u64 * tick_hz as u64, 1_000_000)
}

/// Frequency that produces one tick every `interval_us` microseconds.
///
/// Returns `None` for a zero interval or one longer than a second of
/// counter clock can express as a whole frequency.
pub const fn interval_us_to_hz(interval_us: u32) -> Option<u32> {
    if interval_us == 0 || interval_us > TIMER_CLOCK_HZ {
        return None;
    }
    Some(TIMER_CLOCK_HZ / interval_us)
}

const fn div_ceil(value: u64, divisor: u64) -> u64 {
    (value + divisor - 1) / divisor
}
