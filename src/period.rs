//! Timer periods and the countdown that tracks progress toward them.
//!
//! A period that fits in a 32-bit tick counter counts down in one level.
//! Longer periods (days at a fast tick rate) are split into a number of
//! whole inner laps plus a final partial lap, so the per-slot counters never
//! exceed 32 bits and no precision is lost to wrapping or rounding.

/// Inner lap length used for long-duration periods.
pub const LAP_TICKS: u32 = 1 << 31;

/// Longest period accepted, in ticks.
pub const MAX_PERIOD_TICKS: u64 = u32::MAX as u64 * LAP_TICKS as u64 + (LAP_TICKS as u64 - 1);

/// Number of ticks between two firings of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// Length of one inner lap.
    lap: u32,
    /// Whole inner laps counted before the tail.
    laps: u32,
    /// Ticks after the last whole lap. Non-zero whenever `laps` is zero.
    tail: u32,
}

impl Period {
    /// Builds a period of `ticks`, returning `None` for zero or for a
    /// period longer than [`MAX_PERIOD_TICKS`].
    pub const fn from_ticks(ticks: u64) -> Option<Self> {
        if ticks <= u32::MAX as u64 {
            if ticks == 0 {
                return None;
            }
            Some(Self::short(ticks as u32))
        } else {
            Self::with_lap(ticks, LAP_TICKS)
        }
    }

    /// Builds a period of `ticks` counted in inner laps of `lap` ticks.
    ///
    /// Periods no longer than one lap count down in a single level.
    pub const fn with_lap(ticks: u64, lap: u32) -> Option<Self> {
        if ticks == 0 || lap == 0 {
            return None;
        }
        if ticks <= lap as u64 {
            return Some(Self::short(ticks as u32));
        }
        let laps = ticks / lap as u64;
        if laps > u32::MAX as u64 {
            return None;
        }
        Some(Self {
            lap,
            laps: laps as u32,
            tail: (ticks % lap as u64) as u32,
        })
    }

    const fn short(ticks: u32) -> Self {
        Self {
            lap: ticks,
            laps: 0,
            tail: ticks,
        }
    }

    /// Total period in ticks.
    pub const fn ticks(&self) -> u64 {
        self.laps as u64 * self.lap as u64 + self.tail as u64
    }

    /// Whether the period needs the two-level countdown.
    pub const fn is_long(&self) -> bool {
        self.laps != 0
    }
}

/// Progress of one timer toward its [`Period`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    elapsed: u32,
    laps_done: u32,
}

impl Countdown {
    pub const fn new() -> Self {
        Self {
            elapsed: 0,
            laps_done: 0,
        }
    }

    /// Advance by one tick. Returns `true` when the period completes, in
    /// which case the countdown has already been re-armed from zero.
    pub fn advance(&mut self, period: &Period) -> bool {
        self.elapsed += 1;

        if self.laps_done < period.laps {
            if self.elapsed < period.lap {
                return false;
            }
            self.elapsed = 0;
            self.laps_done += 1;
            if self.laps_done < period.laps || period.tail != 0 {
                return false;
            }
        } else if self.elapsed < period.tail {
            return false;
        }

        self.reset();
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Ticks accumulated since activation or the last firing.
    pub const fn elapsed_ticks(&self, period: &Period) -> u64 {
        self.laps_done as u64 * period.lap as u64 + self.elapsed as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticks_until_fire(period: &Period, limit: u64) -> Option<u64> {
        let mut countdown = Countdown::new();
        (1..=limit).find(|_| countdown.advance(period))
    }

    #[test]
    fn zero_is_rejected() {
        assert_eq!(Period::from_ticks(0), None);
        assert_eq!(Period::with_lap(10, 0), None);
    }

    #[test]
    fn short_period_fits_one_level() {
        let period = Period::from_ticks(u32::MAX as u64).unwrap();
        assert!(!period.is_long());
        assert_eq!(period.ticks(), u32::MAX as u64);
    }

    #[test]
    fn long_period_splits_into_laps() {
        let ticks = 10 * LAP_TICKS as u64 + 7;
        let period = Period::from_ticks(ticks).unwrap();
        assert!(period.is_long());
        assert_eq!(period.ticks(), ticks);
    }

    #[test]
    fn too_long_is_rejected() {
        assert!(Period::from_ticks(MAX_PERIOD_TICKS).is_some());
        assert_eq!(Period::from_ticks(MAX_PERIOD_TICKS + 1), None);
    }

    #[test]
    fn short_countdown_fires_on_period() {
        let period = Period::from_ticks(5).unwrap();
        assert_eq!(ticks_until_fire(&period, 100), Some(5));
    }

    #[test]
    fn two_level_countdown_is_exact() {
        // 4 laps of 10 plus a tail of 3
        let period = Period::with_lap(43, 10).unwrap();
        assert!(period.is_long());
        assert_eq!(ticks_until_fire(&period, 1_000), Some(43));
    }

    #[test]
    fn two_level_countdown_without_tail() {
        let period = Period::with_lap(40, 10).unwrap();
        assert_eq!(ticks_until_fire(&period, 1_000), Some(40));
    }

    #[test]
    fn countdown_rearms_after_firing() {
        let period = Period::with_lap(25, 10).unwrap();
        let mut countdown = Countdown::new();
        let fired: u32 = (0..100).map(|_| countdown.advance(&period) as u32).sum();
        assert_eq!(fired, 4);
        assert_eq!(countdown.elapsed_ticks(&period), 0);
    }

    #[test]
    fn elapsed_stays_below_period() {
        let period = Period::with_lap(23, 4).unwrap();
        let mut countdown = Countdown::new();
        for _ in 0..200 {
            countdown.advance(&period);
            assert!(countdown.elapsed_ticks(&period) < period.ticks());
        }
    }
}
