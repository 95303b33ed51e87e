//! # One-shot timers
//!
//! The sink does not own a clock. Every call into the sink carries a
//! timestamp in milliseconds, timers store a deadline and are polled by
//! `GreenPowerSink::update`. The timestamp may wrap.

/// Milliseconds per second
pub const MILLISECONDS: u32 = 1_000;

/// The timers of the commissioning procedure
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TimeoutKind {
    /// Bounds the commissioning of a generic switch
    GenericSwitch,
    /// Bounds the collection of application descriptions
    MultiSensor,
    /// The sink wide commissioning window
    CommissioningWindow,
}

/// Single shot timer
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Timer {
    deadline: Option<u32>,
}

impl Timer {
    /// Arm the timer to expire `duration` milliseconds after `now`
    pub fn arm(&mut self, now: u32, duration: u32) {
        self.deadline = Some(now.wrapping_add(duration));
    }

    /// Arm the timer with a duration in seconds
    pub fn arm_seconds(&mut self, now: u32, seconds: u16) {
        self.arm(now, seconds as u32 * MILLISECONDS);
    }

    /// Stop the timer
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// True while armed
    pub fn is_active(&self) -> bool {
        self.deadline.is_some()
    }

    /// True if armed and the deadline has passed
    pub fn expired(&self, now: u32) -> bool {
        match self.deadline {
            Some(deadline) => (now.wrapping_sub(deadline) as i32) >= 0,
            None => false,
        }
    }

    /// Milliseconds left, `None` when not armed
    pub fn remaining(&self, now: u32) -> Option<u32> {
        self.deadline.map(|deadline| {
            let left = deadline.wrapping_sub(now) as i32;
            if left > 0 {
                left as u32
            } else {
                0
            }
        })
    }
}

/// Combine the time left on a set of timers into the value returned to the
/// caller, zero when no timer is armed and at least one otherwise
pub fn next_timeout<I>(remaining: I) -> u32
where
    I: IntoIterator<Item = Option<u32>>,
{
    remaining
        .into_iter()
        .flatten()
        .min()
        .map(|left| left.max(1))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_and_expire() {
        let mut timer = Timer::default();
        assert!(!timer.is_active());
        assert!(!timer.expired(0));
        timer.arm_seconds(1_000, 20);
        assert!(timer.is_active());
        assert_eq!(timer.remaining(1_000), Some(20_000));
        assert!(!timer.expired(20_999));
        assert!(timer.expired(21_000));
        assert_eq!(timer.remaining(30_000), Some(0));
        timer.cancel();
        assert!(!timer.expired(30_000));
        assert_eq!(timer.remaining(30_000), None);
    }

    #[test]
    fn wrapping_timestamp() {
        let mut timer = Timer::default();
        timer.arm(0xffff_ff00, 0x200);
        assert!(!timer.expired(0xffff_ffff));
        assert!(!timer.expired(0x0000_00ff));
        assert!(timer.expired(0x0000_0100));
        assert_eq!(timer.remaining(0xffff_ff00), Some(0x200));
    }

    #[test]
    fn combined_timeout() {
        assert_eq!(next_timeout(vec![None, None]), 0);
        assert_eq!(next_timeout(vec![Some(500), None, Some(200)]), 200);
        assert_eq!(next_timeout(vec![Some(0)]), 1);
    }
}
