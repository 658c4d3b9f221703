//! Tick dispatch.
//!
//! Every tick advances each enabled timer by one and collects the ones that
//! came due. Collecting into a fixed-capacity [`heapless::Vec`] keeps the
//! scan free of allocation and lets the caller release the table lock before
//! any callback runs, so callbacks may use the control API on their own or
//! other timers.

use heapless::Vec;

use crate::table::{Callback, Runs, TimerId, TimerTable};

/// A timer that came due on the current tick.
#[derive(Debug, Clone, Copy)]
pub struct Due {
    pub id: TimerId,
    pub callback: Callback,
    /// The timer used up its last run; free it once the callback returns.
    pub last_run: bool,
}

/// Timers due on one tick, in table order.
pub type DueList<const N: usize> = Vec<Due, N>;

impl<const N: usize> TimerTable<N> {
    /// Advance every enabled timer by one tick and push the ones that came
    /// due onto `due`.
    ///
    /// A due timer is re-armed from zero immediately, so the next period is
    /// measured from this tick rather than from when its callback runs. A
    /// finite timer on its last run is disabled here and stays occupied
    /// until [`TimerTable::retire`] frees it after the callback.
    pub fn tick(&mut self, due: &mut DueList<N>) {
        due.clear();

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let id = TimerId::new(index, slot.generation);
            let Some(timer) = slot.timer.as_mut() else {
                continue;
            };
            if !timer.enabled || !timer.countdown.advance(&timer.period) {
                continue;
            }

            let mut last_run = false;
            if let Runs::Finite(runs) = &mut timer.runs {
                *runs -= 1;
                if *runs == 0 {
                    timer.enabled = false;
                    last_run = true;
                }
            }

            // One entry per slot, so this cannot overflow.
            let _ = due.push(Due {
                id,
                callback: timer.callback,
                last_run,
            });
        }
    }

    /// Free the slot of a timer whose last callback has run. Does nothing
    /// if the timer was deleted in the meantime.
    pub fn retire(&mut self, due: &Due) {
        if due.last_run && self.contains(due.id) {
            self.slots[due.id.index()].release();
        }
    }

    /// Advance one tick and run the due callbacks straight away.
    ///
    /// Only for tables that are not shared with another context; a shared
    /// table goes through [`crate::IsrTimer::on_tick`].
    pub fn tick_and_fire(&mut self) -> usize {
        let mut due = DueList::<N>::new();
        self.tick(&mut due);
        for entry in &due {
            entry.callback.invoke();
            self.retire(entry);
        }
        due.len()
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{period::Period, table::TimerError};

    fn noop() {}

    fn ticks(n: u64) -> Period {
        Period::from_ticks(n).unwrap()
    }

    /// Runs `n` ticks and counts how often `id` came due.
    fn run<const N: usize>(table: &mut TimerTable<N>, n: u32, id: TimerId) -> usize {
        let mut fired = 0;
        let mut due = DueList::<N>::new();
        for _ in 0..n {
            table.tick(&mut due);
            fired += due.iter().filter(|entry| entry.id == id).count();
            due.iter().for_each(|entry| table.retire(entry));
        }
        fired
    }

    #[test]
    fn fires_once_per_period() {
        let mut table = TimerTable::<4>::new();
        let id = table.allocate(ticks(4), Runs::Forever, Callback::NoArg(noop)).unwrap();
        assert_eq!(run(&mut table, 3, id), 0);
        assert_eq!(run(&mut table, 1, id), 1);
        assert_eq!(run(&mut table, 8, id), 2);
    }

    #[test]
    fn finite_timer_frees_itself() {
        let mut table = TimerTable::<4>::new();
        let id = table.allocate(ticks(3), Runs::Finite(2), Callback::NoArg(noop)).unwrap();
        assert_eq!(run(&mut table, 3, id), 1);
        assert_eq!(table.remaining_runs(id), Ok(Runs::Finite(1)));
        assert_eq!(run(&mut table, 3, id), 1);
        assert_eq!(table.is_enabled(id), Err(TimerError::InvalidHandle));
        assert!(table.is_empty());
    }

    #[test]
    fn last_run_stays_occupied_until_retired() {
        let mut table = TimerTable::<2>::new();
        let id = table.allocate(ticks(2), Runs::Finite(1), Callback::NoArg(noop)).unwrap();
        let mut due = DueList::<2>::new();

        table.tick(&mut due);
        table.tick(&mut due);
        assert_eq!(due.len(), 1);
        assert!(due[0].last_run);
        assert_eq!(table.is_enabled(id), Ok(false));
        assert_eq!(table.remaining_runs(id), Ok(Runs::Finite(0)));

        table.retire(&due[0]);
        assert!(!table.contains(id));
    }

    #[test]
    fn retire_skips_deleted_timer() {
        let mut table = TimerTable::<1>::new();
        let id = table.allocate(ticks(1), Runs::Finite(1), Callback::NoArg(noop)).unwrap();
        let mut due = DueList::<1>::new();
        table.tick(&mut due);

        table.free(id).unwrap();
        let other = table.allocate(ticks(5), Runs::Forever, Callback::NoArg(noop)).unwrap();
        table.retire(&due[0]);
        assert!(table.contains(other));
    }

    #[test]
    fn disabled_timer_does_not_advance() {
        let mut table = TimerTable::<2>::new();
        let id = table.allocate(ticks(5), Runs::Forever, Callback::NoArg(noop)).unwrap();
        run(&mut table, 2, id);
        table.disable(id).unwrap();
        assert_eq!(run(&mut table, 50, id), 0);
        assert_eq!(table.elapsed_ticks(id), Ok(2));
    }

    #[test]
    fn due_list_in_table_order() {
        static ORDER: AtomicUsize = AtomicUsize::new(0);
        fn record(slot: usize) {
            // Packs the firing order as decimal digits.
            let _ = ORDER.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some(v * 10 + slot));
        }

        let mut table = TimerTable::<3>::new();
        for slot in 1..=3 {
            table
                .allocate(ticks(2), Runs::Forever, Callback::WithArg(record, slot))
                .unwrap();
        }
        assert_eq!(table.tick_and_fire(), 0);
        assert_eq!(table.tick_and_fire(), 3);
        assert_eq!(ORDER.load(Ordering::SeqCst), 123);
    }

    #[test]
    fn long_period_fires_exactly() {
        let mut table = TimerTable::<1>::new();
        let period = Period::with_lap(25, 7).unwrap();
        let id = table.allocate(period, Runs::Forever, Callback::NoArg(noop)).unwrap();
        assert_eq!(run(&mut table, 24, id), 0);
        assert_eq!(run(&mut table, 1, id), 1);
        assert_eq!(run(&mut table, 50, id), 2);
    }
}
