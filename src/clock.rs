// src/clock.rs

/// One discrete step of logical time.
pub type Tick = u64;

/// The logical clock shared by the scheduler and the graph.
///
/// This struct:
/// - only moves forward, one tick per `advance()`
/// - is the time axis of the scheduler
/// - is the memoization key of the graph
///
/// Both subsystems read the same value, so a tick's resumptions and a tick's
/// rendering always agree on "now".
#[derive(Debug, Clone)]
pub struct Clock {
    now: Tick,

    /// Ticks per second, used only by the duration helpers.
    sample_rate: f64,
}

impl Clock {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            now: 0,
            sample_rate,
        }
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    #[inline]
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Move to the next tick.
    ///
    /// Only the driver loop calls this.
    #[inline]
    pub(crate) fn advance(&mut self) {
        self.now += 1;
    }

    // -------------------------------
    // MARK: Duration helpers
    // -------------------------------

    /// Number of ticks covering `seconds` of wall time.
    ///
    /// Rounded to the nearest tick; negative or NaN durations give 0.
    pub fn seconds(&self, seconds: f64) -> Tick {
        let ticks = (seconds * self.sample_rate).round();
        if ticks.is_nan() || ticks <= 0.0 {
            0
        } else {
            ticks as Tick
        }
    }

    pub fn ms(&self, ms: f64) -> Tick {
        self.seconds(ms / 1000.0)
    }

    pub fn minutes(&self, minutes: f64) -> Tick {
        self.seconds(minutes * 60.0)
    }

    pub fn hours(&self, hours: f64) -> Tick {
        self.seconds(hours * 3600.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_at_zero_and_advances_by_one() {
        let mut clock = Clock::new(44_100.0);
        assert_eq!(clock.now(), 0);
        clock.advance();
        clock.advance();
        assert_eq!(clock.now(), 2);
    }

    #[test]
    fn test_duration_helpers() {
        let clock = Clock::new(44_100.0);
        assert_eq!(clock.seconds(1.0), 44_100);
        assert_eq!(clock.ms(200.0), 8_820);
        assert_eq!(clock.minutes(1.0), 44_100 * 60);
        assert_eq!(clock.hours(0.5), 44_100 * 1800);
    }

    #[test]
    fn test_duration_helpers_never_negative() {
        let clock = Clock::new(48_000.0);
        assert_eq!(clock.seconds(-3.0), 0);
        assert_eq!(clock.ms(f64::NAN), 0);
        // Rounds to the nearest tick
        assert_eq!(clock.seconds(1.4 / 48_000.0), 1);
    }
}
