//! Simulated wall-clock time and the timeslot clock that advances it.

use std::fmt;

/// Milliseconds in one hour.
pub const HOUR: i64 = 3_600_000;

/// Milliseconds in one day.
pub const DAY: i64 = 24 * HOUR;

/// An instant in simulated time, in milliseconds since the scenario epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimTime(i64);

impl SimTime {
    /// The scenario epoch (midnight of day zero).
    pub const EPOCH: SimTime = SimTime(0);

    /// Creates an instant from a millisecond offset.
    pub const fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    /// Creates an instant a whole number of hours after the epoch.
    pub const fn from_hours(hours: i64) -> Self {
        Self(hours * HOUR)
    }

    /// Millisecond offset from the epoch.
    pub const fn millis(self) -> i64 {
        self.0
    }

    /// Returns the instant `ms` milliseconds later (or earlier, if negative).
    pub const fn plus(self, ms: i64) -> Self {
        Self(self.0 + ms)
    }

    /// Hour of the day, 0..24.
    pub fn hour_of_day(self) -> u32 {
        (self.0.rem_euclid(DAY) / HOUR) as u32
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let day = self.0.div_euclid(DAY);
        write!(f, "d{}+{:02}h", day, self.hour_of_day())
    }
}

/// A simulation clock that hands out consecutive timeslots.
///
/// Each tick yields the timeslot index and the instant at which that
/// timeslot starts.
///
/// # Examples
///
/// ```
/// use tariff_sim::sim::clock::{Clock, HOUR, SimTime};
///
/// let mut clock = Clock::new(SimTime::EPOCH, HOUR, 3);
/// let mut slots = Vec::new();
///
/// clock.run(|slot, at| slots.push((slot, at.millis() / HOUR)));
/// assert_eq!(slots, vec![(0, 0), (1, 1), (2, 2)]);
/// ```
#[derive(Debug, Clone)]
pub struct Clock {
    start: SimTime,
    slot_ms: i64,
    /// Next timeslot to hand out
    current: usize,
    /// Total timeslots to run
    total: usize,
}

impl Clock {
    /// Creates a clock.
    ///
    /// # Arguments
    ///
    /// * `start` - Instant at which timeslot 0 begins
    /// * `slot_ms` - Timeslot length in milliseconds
    /// * `total` - Number of timeslots the clock will hand out
    pub fn new(start: SimTime, slot_ms: i64, total: usize) -> Self {
        Self {
            start,
            slot_ms,
            current: 0,
            total,
        }
    }

    /// Start instant of a given timeslot.
    pub fn slot_start(&self, slot: usize) -> SimTime {
        self.start.plus(self.slot_ms * slot as i64)
    }

    /// Advances the clock by one timeslot.
    ///
    /// # Returns
    ///
    /// * `Some((slot, start))` - The timeslot index and its start instant
    /// * `None` - If every timeslot has been handed out
    pub fn tick(&mut self) -> Option<(usize, SimTime)> {
        if self.current < self.total {
            let slot = self.current;
            self.current += 1;
            Some((slot, self.slot_start(slot)))
        } else {
            None
        }
    }

    /// Runs a function for each remaining timeslot.
    pub fn run(&mut self, mut f: impl FnMut(usize, SimTime)) {
        while let Some((slot, at)) = self.tick() {
            f(slot, at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_yields_slot_starts() {
        let mut clock = Clock::new(SimTime::from_hours(7), HOUR, 2);
        assert_eq!(clock.tick(), Some((0, SimTime::from_hours(7))));
        assert_eq!(clock.tick(), Some((1, SimTime::from_hours(8))));
        assert_eq!(clock.tick(), None);
    }

    #[test]
    fn empty_clock_never_calls() {
        let mut clock = Clock::new(SimTime::EPOCH, HOUR, 0);
        let mut was_called = false;
        clock.run(|_, _| was_called = true);
        assert!(!was_called);
    }

    #[test]
    fn hour_of_day_wraps() {
        assert_eq!(SimTime::from_hours(25).hour_of_day(), 1);
        assert_eq!(SimTime::from_hours(-1).hour_of_day(), 23);
        assert_eq!(SimTime::from_hours(49).to_string(), "d2+01h");
    }
}
