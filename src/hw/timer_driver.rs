//! Baseband driver based on the TIMER peripheral available in nRF MCUs
//!
//! The TIMER runs at 1 MHz in 32-bit mode, so its counter is the baseband clock. Compare channel 0
//! wakes the scheduler up. Capture channel 1 samples the current time.
//!
//! TIMER significantly increases power consumption. It should be replaced with something based on
//! RTC for battery operated devices.

use super::BbDriver;
use crate::clock::Ticks;
use core::ops::Deref;

use nrf52840_hal::pac::timer0;
type TimerRegisterBlock = timer0::RegisterBlock;

struct TimerPeriphWrapper {
    ptr: *const TimerRegisterBlock,
}
impl TimerPeriphWrapper {
    pub fn new(timer: &TimerRegisterBlock) -> Self {
        TimerPeriphWrapper { ptr: timer }
    }
}
impl Deref for TimerPeriphWrapper {
    type Target = TimerRegisterBlock;
    fn deref(&self) -> &Self::Target {
        unsafe { &*self.ptr }
    }
}
// The driver only writes whole registers and triggers tasks. Callers serialize arm and disarm with
// the scheduler lock.
unsafe impl Sync for TimerPeriphWrapper {}

const WAKE_UP_CH: usize = 0;
const CAPTURE_NOW_CH: usize = 1;

/// 16 MHz / 2^4
const PRESCALER_1MHZ: u8 = 4;

/// Baseband driver using a `TIMER` peripheral
pub struct TimerDriver {
    timer: TimerPeriphWrapper,
}

impl TimerDriver {
    /// Create a new [`TimerDriver`] instance using passed hardware TIMER instance
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bb_sched::hw::timer_driver::TimerDriver;
    /// use nrf52840_hal::pac::Peripherals;
    ///
    /// let peripherals = Peripherals::take().unwrap();
    ///
    /// let driver = TimerDriver::new(&peripherals.TIMER0);
    /// ```
    pub fn new(timer: &TimerRegisterBlock) -> Self {
        Self {
            timer: TimerPeriphWrapper::new(timer),
        }
    }

    /// Acknowledges the wake-up event
    ///
    /// To be called from the TIMER IRQ handler before
    /// [`Scheduler::dispatch`](crate::sch::Scheduler::dispatch). Returns `true` if the wake-up
    /// time was reached.
    pub fn take_compare_event(&self) -> bool {
        let is_set = self.timer.events_compare[WAKE_UP_CH]
            .read()
            .events_compare()
            .bit_is_set();
        if is_set {
            self.timer.events_compare[WAKE_UP_CH].write(|w| w.events_compare().clear_bit());
        }
        is_set
    }
}

impl BbDriver for TimerDriver {
    fn enable(&self) {
        self.timer
            .mode
            .write(|w| w.mode().variant(timer0::mode::MODE_A::TIMER));
        self.timer
            .bitmode
            .write(|w| w.bitmode().variant(timer0::bitmode::BITMODE_A::_32BIT));
        self.timer
            .prescaler
            .write(|w| w.prescaler().variant(PRESCALER_1MHZ));
        self.timer.tasks_start.write(|w| w.tasks_start().set_bit());
    }

    fn disable(&self) {
        self.timer.intenclr.write(|w| w.compare0().clear());
        self.timer.tasks_stop.write(|w| w.tasks_stop().set_bit());
    }

    fn now(&self) -> Ticks {
        self.timer.tasks_capture[CAPTURE_NOW_CH].write(|w| w.tasks_capture().set_bit());
        self.timer.cc[CAPTURE_NOW_CH].read().bits()
    }

    fn arm(&self, at: Ticks) {
        self.timer.cc[WAKE_UP_CH].write(|w| w.cc().variant(at));
        self.timer.events_compare[WAKE_UP_CH].write(|w| w.events_compare().clear_bit());
        self.timer.intenset.write(|w| w.compare0().set());
    }

    fn disarm(&self) {
        self.timer.intenclr.write(|w| w.compare0().clear());
    }
}
