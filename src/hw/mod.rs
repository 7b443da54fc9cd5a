//! Baseband driver shim
//!
//! The scheduler reads the baseband clock and requests a wake-up at the next load time through the
//! [`BbDriver`] trait. The driver used in a build depends on the selected platform feature.

#[cfg(feature = "mocked_platform")]
pub mod sim_driver;
pub mod timer_driver;

use crate::clock::Ticks;

#[cfg(test)]
use mockall::automock;

/// Hardware services required by the scheduler
///
/// Implementations are shared between thread mode and the IRQ handlers, so all methods take
/// `&self`.
#[cfg_attr(test, automock)]
pub trait BbDriver: Sync {
    /// Powers up the baseband
    ///
    /// Called when the first protocol is started.
    fn enable(&self);

    /// Powers down the baseband
    ///
    /// Called when the last protocol is stopped.
    fn disable(&self);

    /// Current value of the baseband clock
    fn now(&self) -> Ticks;

    /// Requests a call to [`Scheduler::dispatch`](crate::sch::Scheduler::dispatch) at `at`
    ///
    /// A new request replaces the previous one.
    fn arm(&self, at: Ticks);

    /// Cancels the requested call
    fn disarm(&self);
}
