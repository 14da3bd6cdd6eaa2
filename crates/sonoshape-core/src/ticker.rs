//! Fixed-rate tick scheduling for the UI-rate consumer.
//!
//! Deadlines advance by a fixed interval so timing jitter does not accumulate.
//! When the caller falls more than one interval behind, missed ticks are
//! skipped rather than replayed in a burst.

use std::time::{Duration, Instant};

const MIN_RATE_HZ: f32 = 1.0;
const MAX_RATE_HZ: f32 = 240.0;

pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    /// Rate is clamped to 1-240 Hz
    pub fn new(rate_hz: f32) -> Self {
        let rate = if rate_hz.is_finite() {
            rate_hz.clamp(MIN_RATE_HZ, MAX_RATE_HZ)
        } else {
            MIN_RATE_HZ
        };
        let interval = Duration::from_secs_f32(1.0 / rate);
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time left until the next deadline (zero if already due)
    pub fn remaining(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Advance the deadline after a tick observed at `now`.
    /// Returns the number of ticks skipped because the caller was late.
    pub fn advance(&mut self, now: Instant) -> u32 {
        self.next += self.interval;
        if self.next > now {
            return 0;
        }
        let behind = now.duration_since(self.next);
        let skipped = (behind.as_secs_f64() / self.interval.as_secs_f64()) as u32 + 1;
        self.next = now + self.interval;
        skipped
    }

    /// Sleep until the next deadline, then advance it
    pub fn wait(&mut self) -> u32 {
        let remaining = self.remaining(Instant::now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
        self.advance(Instant::now())
    }

    /// Restart the schedule from now, e.g. after a session restart
    pub fn reset(&mut self) {
        self.next = Instant::now() + self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_clamped() {
        assert_eq!(Ticker::new(0.0).interval(), Duration::from_secs(1));
        assert_eq!(Ticker::new(f32::NAN).interval(), Duration::from_secs(1));
        assert!(Ticker::new(10_000.0).interval() >= Duration::from_secs_f32(1.0 / 240.0));
    }

    #[test]
    fn on_time_ticks_skip_nothing() {
        let mut ticker = Ticker::new(50.0);
        let start = ticker.next - ticker.interval;
        let now = start + ticker.interval;
        assert_eq!(ticker.advance(now), 0);
        assert_eq!(ticker.remaining(now), ticker.interval);
    }

    #[test]
    fn late_ticks_are_skipped_not_replayed() {
        let mut ticker = Ticker::new(10.0);
        let late = ticker.next + Duration::from_millis(350);
        let skipped = ticker.advance(late);
        assert!(skipped >= 3, "skipped {}", skipped);
        assert_eq!(ticker.remaining(late), ticker.interval);
    }

    #[test]
    fn wait_blocks_roughly_one_interval() {
        let mut ticker = Ticker::new(100.0);
        let start = Instant::now();
        ticker.wait();
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
