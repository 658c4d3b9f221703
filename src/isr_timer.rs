//! Control API over a timer table shared with interrupt context.
//!
//! [`IsrTimer`] is meant to live in a `static`. The tick source calls
//! [`IsrTimer::on_tick`] from its interrupt handler; application code calls
//! the rest from normal context. Every table access runs inside
//! `critical_section::with`, so tick delivery is masked while a slot is
//! being created, reconfigured or freed, and the lock is released on every
//! exit path.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::{
    config::{ms_to_ticks, us_to_ticks, MAX_NUMBER_TIMERS, TICK_FREQUENCY_HZ},
    period::Period,
    scheduler::DueList,
    table::{Callback, Runs, TimerArg, TimerError, TimerId, TimerTable},
};

/// Software timers multiplexed onto one hardware tick.
pub struct IsrTimer<const N: usize = MAX_NUMBER_TIMERS> {
    table: Mutex<RefCell<TimerTable<N>>>,
    tick_hz: u32,
}

impl<const N: usize> IsrTimer<N> {
    /// Empty timer set ticking at [`TICK_FREQUENCY_HZ`].
    pub const fn new() -> Self {
        Self::with_tick_hz(TICK_FREQUENCY_HZ)
    }

    /// Empty timer set for a tick source running at `tick_hz`. The rate is
    /// only used to convert millisecond intervals.
    pub const fn with_tick_hz(tick_hz: u32) -> Self {
        Self {
            table: Mutex::new(RefCell::new(TimerTable::new())),
            tick_hz,
        }
    }

    pub const fn tick_hz(&self) -> u32 {
        self.tick_hz
    }

    fn with_table<R>(&self, f: impl FnOnce(&mut TimerTable<N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.table.borrow_ref_mut(cs)))
    }

    /// Tick handler. Call once per hardware tick, from the tick interrupt.
    ///
    /// The table is scanned under the lock; the due callbacks run after it
    /// is released, in table order. A timer deleted by an earlier callback
    /// on the same tick is skipped. A timer on its last run is freed after
    /// its callback returns. Returns the number of callbacks run.
    pub fn on_tick(&self) -> usize {
        let mut due = DueList::<N>::new();
        self.with_table(|table| table.tick(&mut due));

        let mut fired = 0;
        for entry in &due {
            if !self.with_table(|table| table.contains(entry.id)) {
                continue;
            }
            entry.callback.invoke();
            fired += 1;
            if entry.last_run {
                self.with_table(|table| table.retire(entry));
            }
        }
        fired
    }

    /// Alias of [`IsrTimer::on_tick`].
    pub fn run(&self) -> usize {
        self.on_tick()
    }

    /// Delete every timer.
    pub fn init(&self) {
        self.with_table(TimerTable::clear);
        log_info!("timer table reset, {} slots", N);
    }

    /// Register a timer firing every `period_ticks` ticks, `runs` times.
    pub fn create(
        &self,
        period_ticks: u64,
        runs: Runs,
        callback: Callback,
    ) -> Result<TimerId, TimerError> {
        let period = Period::from_ticks(period_ticks).ok_or_else(|| {
            log_warn!("rejected timer period of {} ticks", period_ticks);
            TimerError::InvalidArgument
        })?;

        match self.with_table(|table| table.allocate(period, runs, callback)) {
            Ok(id) => {
                log_debug!("timer {} armed: {} ticks, {:?}", id, period_ticks, runs);
                Ok(id)
            }
            Err(err) => {
                log_warn!("timer not created: {}", err);
                Err(err)
            }
        }
    }

    /// [`IsrTimer::create`] with the period in milliseconds.
    pub fn create_ms(
        &self,
        period_ms: u32,
        runs: Runs,
        callback: Callback,
    ) -> Result<TimerId, TimerError> {
        self.create(ms_to_ticks(period_ms, self.tick_hz), runs, callback)
    }

    /// [`IsrTimer::create`] with the period in microseconds, rounded up to
    /// whole ticks.
    pub fn create_us(
        &self,
        period_us: u32,
        runs: Runs,
        callback: Callback,
    ) -> Result<TimerId, TimerError> {
        self.create(us_to_ticks(period_us, self.tick_hz), runs, callback)
    }

    /// Periodic timer that runs until deleted.
    pub fn set_interval(&self, period_ticks: u64, callback: fn()) -> Result<TimerId, TimerError> {
        self.create(period_ticks, Runs::Forever, Callback::NoArg(callback))
    }

    pub fn set_interval_with_arg(
        &self,
        period_ticks: u64,
        callback: fn(TimerArg),
        arg: TimerArg,
    ) -> Result<TimerId, TimerError> {
        self.create(period_ticks, Runs::Forever, Callback::WithArg(callback, arg))
    }

    pub fn set_interval_ms(&self, period_ms: u32, callback: fn()) -> Result<TimerId, TimerError> {
        self.create_ms(period_ms, Runs::Forever, Callback::NoArg(callback))
    }

    pub fn set_interval_us(&self, period_us: u32, callback: fn()) -> Result<TimerId, TimerError> {
        self.create_us(period_us, Runs::Forever, Callback::NoArg(callback))
    }

    /// Timer that fires `runs` times and then deletes itself.
    pub fn set_timer(
        &self,
        period_ticks: u64,
        runs: u32,
        callback: fn(),
    ) -> Result<TimerId, TimerError> {
        self.create(period_ticks, Runs::Finite(runs), Callback::NoArg(callback))
    }

    pub fn set_timer_with_arg(
        &self,
        period_ticks: u64,
        runs: u32,
        callback: fn(TimerArg),
        arg: TimerArg,
    ) -> Result<TimerId, TimerError> {
        self.create(period_ticks, Runs::Finite(runs), Callback::WithArg(callback, arg))
    }

    pub fn set_timer_ms(
        &self,
        period_ms: u32,
        runs: u32,
        callback: fn(),
    ) -> Result<TimerId, TimerError> {
        self.create_ms(period_ms, Runs::Finite(runs), Callback::NoArg(callback))
    }

    /// One-shot timer.
    pub fn set_timeout(&self, delay_ticks: u64, callback: fn()) -> Result<TimerId, TimerError> {
        self.set_timer(delay_ticks, 1, callback)
    }

    pub fn set_timeout_with_arg(
        &self,
        delay_ticks: u64,
        callback: fn(TimerArg),
        arg: TimerArg,
    ) -> Result<TimerId, TimerError> {
        self.set_timer_with_arg(delay_ticks, 1, callback, arg)
    }

    pub fn set_timeout_ms(&self, delay_ms: u32, callback: fn()) -> Result<TimerId, TimerError> {
        self.set_timer_ms(delay_ms, 1, callback)
    }

    pub fn set_timeout_us(&self, delay_us: u32, callback: fn()) -> Result<TimerId, TimerError> {
        self.create_us(delay_us, Runs::Finite(1), Callback::NoArg(callback))
    }

    pub fn enable(&self, id: TimerId) -> Result<(), TimerError> {
        self.with_table(|table| table.enable(id))
    }

    pub fn disable(&self, id: TimerId) -> Result<(), TimerError> {
        self.with_table(|table| table.disable(id))
    }

    /// Flip the enabled state, returning the new state.
    pub fn toggle(&self, id: TimerId) -> Result<bool, TimerError> {
        self.with_table(|table| table.toggle(id))
    }

    pub fn enable_all(&self) {
        self.with_table(TimerTable::enable_all)
    }

    pub fn disable_all(&self) {
        self.with_table(TimerTable::disable_all)
    }

    /// Delete the timer and free its slot.
    pub fn delete_timer(&self, id: TimerId) -> Result<(), TimerError> {
        self.with_table(|table| table.free(id))?;
        log_debug!("timer {} deleted", id);
        Ok(())
    }

    /// Count the current period again from zero.
    pub fn restart_timer(&self, id: TimerId) -> Result<(), TimerError> {
        self.with_table(|table| table.restart(id))
    }

    /// Replace the period; the countdown restarts from zero.
    pub fn change_interval(&self, id: TimerId, period_ticks: u64) -> Result<(), TimerError> {
        let period = Period::from_ticks(period_ticks).ok_or(TimerError::InvalidArgument)?;
        self.with_table(|table| table.change_interval(id, period))
    }

    pub fn change_interval_ms(&self, id: TimerId, period_ms: u32) -> Result<(), TimerError> {
        self.change_interval(id, ms_to_ticks(period_ms, self.tick_hz))
    }

    pub fn change_interval_us(&self, id: TimerId, period_us: u32) -> Result<(), TimerError> {
        self.change_interval(id, us_to_ticks(period_us, self.tick_hz))
    }

    pub fn is_enabled(&self, id: TimerId) -> Result<bool, TimerError> {
        self.with_table(|table| table.is_enabled(id))
    }

    pub fn remaining_runs(&self, id: TimerId) -> Result<Runs, TimerError> {
        self.with_table(|table| table.remaining_runs(id))
    }

    /// Number of timers currently registered.
    pub fn num_timers(&self) -> usize {
        self.with_table(|table| table.len())
    }

    /// Number of free slots.
    pub fn num_available_timers(&self) -> usize {
        self.with_table(|table| table.available())
    }

    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for IsrTimer<N> {
    fn default() -> Self {
        Self::new()
    }
}
