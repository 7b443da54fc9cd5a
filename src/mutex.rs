//! Mutex guarding the scheduler data shared between thread mode and the baseband IRQs.
//!
//! Access requires proof of blocked IRQs provided by a [`CriticalSection`] token.

use crate::crit_sect::{self, CriticalSection};
use core::cell::{RefCell, RefMut};

/// Wraps data accessible from the baseband IRQs
///
/// The inner `RefCell` detects nested access at run time. Nested access happens when a scheduler
/// callback is invoked while the data is locked and the callback enters the scheduler again.
pub struct Mutex<T>(RefCell<T>);

impl<T> Mutex<T> {
    /// Wraps `value`
    pub const fn new(value: T) -> Mutex<T> {
        Self(RefCell::new(value))
    }

    /// Mutably borrows the wrapped data for the lifetime of the critical section
    pub fn borrow_mut<'cs>(&'cs self, _cs: &'cs CriticalSection) -> RefMut<'cs, T> {
        self.0.borrow_mut()
    }

    /// Enters a critical section and runs `f` on the wrapped data
    ///
    /// # Example
    ///
    /// ```
    /// use bb_sched::mutex::Mutex;
    ///
    /// static START_COUNT: Mutex<u8> = Mutex::new(0);
    ///
    /// let count = START_COUNT.lock(|count| {
    ///     *count += 1;
    ///     *count
    /// });
    /// assert_eq!(count, 1);
    /// ```
    pub fn lock<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        crit_sect::locked(|cs| f(&mut self.borrow_mut(cs)))
    }
}

// Safety: Mutex is Sync assuming the contained type is Send and the CriticalSection module prevents
// concurrent access to Mutex from multiple contexts. Nested access from the same context is caught
// by the RefCell.
unsafe impl<T> Sync for Mutex<T> where T: Send {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_returns_closure_result() {
        let mutex = Mutex::new(5u32);

        let result = mutex.lock(|value| {
            *value += 1;
            *value * 2
        });

        assert_eq!(result, 12);
        assert_eq!(mutex.lock(|value| *value), 6);
    }

    #[test]
    #[should_panic]
    fn test_nested_lock_panics() {
        let mutex = Mutex::new(0u32);

        mutex.lock(|_| {
            mutex.lock(|value| *value += 1);
        });
    }
}
