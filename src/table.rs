//! Fixed-capacity timer table.
//!
//! Slots are stored inline in an array sized at compile time, so nothing in
//! here allocates. Each slot carries a generation counter that is bumped
//! whenever the slot is freed; a [`TimerId`] is only accepted while its
//! generation matches, so a stale handle can never address a later occupant
//! of the same slot.

use core::fmt;

use crate::{
    config::MAX_NUMBER_TIMERS,
    period::{Countdown, Period},
};

/// Opaque value handed to a one-argument callback.
pub type TimerArg = usize;

/// Errors reported by timer table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// Every slot is occupied.
    CapacityExceeded,
    /// The handle refers to a freed slot or was never issued.
    InvalidHandle,
    /// Zero period, zero run count, or a period too long to represent.
    InvalidArgument,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::CapacityExceeded => f.write_str("no free timer slot"),
            TimerError::InvalidHandle => f.write_str("invalid timer handle"),
            TimerError::InvalidArgument => f.write_str("invalid timer argument"),
        }
    }
}

/// Handle to an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    index: u16,
    generation: u16,
}

impl TimerId {
    /// Slot index in the table.
    pub const fn index(&self) -> usize {
        self.index as usize
    }

    pub(crate) const fn new(index: usize, generation: u16) -> Self {
        Self {
            index: index as u16,
            generation,
        }
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

/// Function invoked when a timer fires.
#[derive(Debug, Clone, Copy)]
pub enum Callback {
    NoArg(fn()),
    WithArg(fn(TimerArg), TimerArg),
}

impl Callback {
    pub fn invoke(self) {
        match self {
            Callback::NoArg(f) => f(),
            Callback::WithArg(f, arg) => f(arg),
        }
    }
}

/// How many more times a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runs {
    Forever,
    Finite(u32),
}

/// State of an occupied slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Timer {
    pub(crate) enabled: bool,
    pub(crate) period: Period,
    pub(crate) countdown: Countdown,
    pub(crate) runs: Runs,
    pub(crate) callback: Callback,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub(crate) generation: u16,
    pub(crate) timer: Option<Timer>,
}

impl Slot {
    const FREE: Slot = Slot {
        generation: 0,
        timer: None,
    };

    /// Frees the slot and invalidates every outstanding handle to it.
    pub(crate) fn release(&mut self) {
        self.timer = None;
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Fixed set of `N` timer slots.
pub struct TimerTable<const N: usize = MAX_NUMBER_TIMERS> {
    pub(crate) slots: [Slot; N],
}

impl<const N: usize> TimerTable<N> {
    const INDEX_FITS: () = assert!(N <= u16::MAX as usize, "timer table too large");

    /// Create an empty table.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::INDEX_FITS;
        Self {
            slots: [Slot::FREE; N],
        }
    }

    /// Occupy the first free slot with an enabled timer whose countdown
    /// starts at zero.
    pub fn allocate(
        &mut self,
        period: Period,
        runs: Runs,
        callback: Callback,
    ) -> Result<TimerId, TimerError> {
        if runs == Runs::Finite(0) {
            return Err(TimerError::InvalidArgument);
        }

        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.timer.is_none())
            .ok_or(TimerError::CapacityExceeded)?;

        slot.timer = Some(Timer {
            enabled: true,
            period,
            countdown: Countdown::new(),
            runs,
            callback,
        });

        Ok(TimerId::new(index, slot.generation))
    }

    /// Whether `id` still refers to an occupied slot.
    pub fn contains(&self, id: TimerId) -> bool {
        self.timer(id).is_ok()
    }

    /// Free the slot, dropping its callback and argument.
    pub fn free(&mut self, id: TimerId) -> Result<(), TimerError> {
        self.timer_mut(id)?;
        self.slots[id.index()].release();
        Ok(())
    }

    /// Resume dispatch, continuing the countdown where it stopped.
    pub fn enable(&mut self, id: TimerId) -> Result<(), TimerError> {
        self.timer_mut(id)?.enabled = true;
        Ok(())
    }

    /// Pause dispatch. Elapsed progress is kept.
    pub fn disable(&mut self, id: TimerId) -> Result<(), TimerError> {
        self.timer_mut(id)?.enabled = false;
        Ok(())
    }

    /// Flip the enabled state, returning the new state.
    pub fn toggle(&mut self, id: TimerId) -> Result<bool, TimerError> {
        let timer = self.timer_mut(id)?;
        timer.enabled = !timer.enabled;
        Ok(timer.enabled)
    }

    /// Reset elapsed progress to zero without touching the enabled state.
    pub fn restart(&mut self, id: TimerId) -> Result<(), TimerError> {
        self.timer_mut(id)?.countdown.reset();
        Ok(())
    }

    /// Replace the period and restart the countdown from zero.
    pub fn change_interval(&mut self, id: TimerId, period: Period) -> Result<(), TimerError> {
        let timer = self.timer_mut(id)?;
        timer.period = period;
        timer.countdown.reset();
        Ok(())
    }

    pub fn is_enabled(&self, id: TimerId) -> Result<bool, TimerError> {
        Ok(self.timer(id)?.enabled)
    }

    /// Firings left before the slot frees itself.
    pub fn remaining_runs(&self, id: TimerId) -> Result<Runs, TimerError> {
        Ok(self.timer(id)?.runs)
    }

    pub fn period(&self, id: TimerId) -> Result<Period, TimerError> {
        Ok(self.timer(id)?.period)
    }

    /// Ticks counted toward the next firing.
    pub fn elapsed_ticks(&self, id: TimerId) -> Result<u64, TimerError> {
        let timer = self.timer(id)?;
        Ok(timer.countdown.elapsed_ticks(&timer.period))
    }

    pub fn enable_all(&mut self) {
        self.occupied_mut().for_each(|timer| timer.enabled = true);
    }

    pub fn disable_all(&mut self) {
        self.occupied_mut().for_each(|timer| timer.enabled = false);
    }

    /// Free every slot.
    pub fn clear(&mut self) {
        self.slots
            .iter_mut()
            .filter(|slot| slot.timer.is_some())
            .for_each(Slot::release);
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.timer.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of free slots.
    pub fn available(&self) -> usize {
        N - self.len()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    fn timer(&self, id: TimerId) -> Result<&Timer, TimerError> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.timer.as_ref())
            .ok_or(TimerError::InvalidHandle)
    }

    fn timer_mut(&mut self, id: TimerId) -> Result<&mut Timer, TimerError> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.timer.as_mut())
            .ok_or(TimerError::InvalidHandle)
    }

    fn occupied_mut(&mut self) -> impl Iterator<Item = &mut Timer> {
        self.slots.iter_mut().filter_map(|slot| slot.timer.as_mut())
    }
}

impl<const N: usize> Default for TimerTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() {}

    fn ticks(n: u64) -> Period {
        Period::from_ticks(n).unwrap()
    }

    #[test]
    fn allocate_uses_first_free_slot() {
        let mut table = TimerTable::<4>::new();
        let a = table.allocate(ticks(10), Runs::Forever, Callback::NoArg(noop)).unwrap();
        let b = table.allocate(ticks(10), Runs::Forever, Callback::NoArg(noop)).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);

        table.free(a).unwrap();
        let c = table.allocate(ticks(10), Runs::Forever, Callback::NoArg(noop)).unwrap();
        assert_eq!(c.index(), 0);
        assert_ne!(a, c);
    }

    #[test]
    fn new_timer_is_enabled_and_fresh() {
        let mut table = TimerTable::<2>::new();
        let id = table.allocate(ticks(7), Runs::Finite(3), Callback::NoArg(noop)).unwrap();
        assert_eq!(table.is_enabled(id), Ok(true));
        assert_eq!(table.elapsed_ticks(id), Ok(0));
        assert_eq!(table.remaining_runs(id), Ok(Runs::Finite(3)));
        assert_eq!(table.period(id).map(|p| p.ticks()), Ok(7));
    }

    #[test]
    fn capacity_is_fixed() {
        let mut table = TimerTable::<3>::new();
        let ids: [TimerId; 3] = core::array::from_fn(|_| {
            table.allocate(ticks(1), Runs::Forever, Callback::NoArg(noop)).unwrap()
        });
        assert_eq!(table.available(), 0);
        assert_eq!(
            table.allocate(ticks(1), Runs::Forever, Callback::NoArg(noop)),
            Err(TimerError::CapacityExceeded)
        );

        table.free(ids[1]).unwrap();
        assert!(table.allocate(ticks(1), Runs::Forever, Callback::NoArg(noop)).is_ok());
        assert_eq!(
            table.allocate(ticks(1), Runs::Forever, Callback::NoArg(noop)),
            Err(TimerError::CapacityExceeded)
        );
    }

    #[test]
    fn zero_runs_rejected() {
        let mut table = TimerTable::<1>::new();
        assert_eq!(
            table.allocate(ticks(1), Runs::Finite(0), Callback::NoArg(noop)),
            Err(TimerError::InvalidArgument)
        );
        assert!(table.is_empty());
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mut table = TimerTable::<1>::new();
        let old = table.allocate(ticks(5), Runs::Forever, Callback::NoArg(noop)).unwrap();
        table.free(old).unwrap();
        let new = table.allocate(ticks(5), Runs::Forever, Callback::NoArg(noop)).unwrap();

        assert_eq!(old.index(), new.index());
        assert_eq!(table.free(old), Err(TimerError::InvalidHandle));
        assert_eq!(table.disable(old), Err(TimerError::InvalidHandle));
        assert_eq!(table.is_enabled(new), Ok(true));
    }

    #[test]
    fn toggle_and_bulk_enable() {
        let mut table = TimerTable::<3>::new();
        let a = table.allocate(ticks(2), Runs::Forever, Callback::NoArg(noop)).unwrap();
        let b = table.allocate(ticks(2), Runs::Forever, Callback::NoArg(noop)).unwrap();

        assert_eq!(table.toggle(a), Ok(false));
        assert_eq!(table.toggle(a), Ok(true));

        table.disable_all();
        assert_eq!(table.is_enabled(a), Ok(false));
        assert_eq!(table.is_enabled(b), Ok(false));

        table.enable_all();
        assert_eq!(table.is_enabled(a), Ok(true));
        assert_eq!(table.is_enabled(b), Ok(true));
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut table = TimerTable::<2>::new();
        let a = table.allocate(ticks(2), Runs::Forever, Callback::NoArg(noop)).unwrap();
        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.available(), 2);
        assert_eq!(table.is_enabled(a), Err(TimerError::InvalidHandle));
    }
}
