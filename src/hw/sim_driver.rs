//! Baseband driver with a software clock
//!
//! The clock does not advance on its own. Tests and host simulations move it with
//! [`set_now`](SimDriver::set_now) and [`advance`](SimDriver::advance), and check the armed
//! wake-up time with [`armed`](SimDriver::armed).

use super::BbDriver;
use crate::clock::Ticks;
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Software baseband driver
pub struct SimDriver {
    now: AtomicU32,
    armed_at: AtomicU32,
    is_armed: AtomicBool,
    is_enabled: AtomicBool,
}

impl SimDriver {
    /// Creates a disabled driver with the clock at zero
    pub const fn new() -> Self {
        Self {
            now: AtomicU32::new(0),
            armed_at: AtomicU32::new(0),
            is_armed: AtomicBool::new(false),
            is_enabled: AtomicBool::new(false),
        }
    }

    /// Sets the clock value
    pub fn set_now(&self, now: Ticks) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Advances the clock, wrapping around at the end of the counter range
    pub fn advance(&self, ticks: Ticks) {
        let now = self.now.load(Ordering::SeqCst);
        self.now.store(now.wrapping_add(ticks), Ordering::SeqCst);
    }

    /// Time of the requested wake-up, if any
    pub fn armed(&self) -> Option<Ticks> {
        if self.is_armed.load(Ordering::SeqCst) {
            Some(self.armed_at.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Checks if the baseband is powered
    pub fn is_enabled(&self) -> bool {
        self.is_enabled.load(Ordering::SeqCst)
    }
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl BbDriver for SimDriver {
    fn enable(&self) {
        self.is_enabled.store(true, Ordering::SeqCst);
    }

    fn disable(&self) {
        self.is_enabled.store(false, Ordering::SeqCst);
    }

    fn now(&self) -> Ticks {
        self.now.load(Ordering::SeqCst)
    }

    fn arm(&self, at: Ticks) {
        self.armed_at.store(at, Ordering::SeqCst);
        self.is_armed.store(true, Ordering::SeqCst);
    }

    fn disarm(&self) {
        self.is_armed.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_wraps() {
        let driver = SimDriver::new();

        driver.set_now(0xffff_fff0);
        driver.advance(0x20);
        assert_eq!(driver.now(), 0x10);
    }

    #[test]
    fn test_arm_replaces_previous_request() {
        let driver = SimDriver::new();
        assert_eq!(driver.armed(), None);

        driver.arm(100);
        driver.arm(50);
        assert_eq!(driver.armed(), Some(50));

        driver.disarm();
        assert_eq!(driver.armed(), None);
    }
}
