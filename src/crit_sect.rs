//! Critical sections protecting the scheduler state from the radio and timer IRQs

// TODO: Disable only the radio and baseband timer IRQs instead of all of them

/// Proof that the caller runs inside a critical section
///
/// The token can be obtained only through [`locked`]. It is required to access data wrapped in a
/// [`Mutex`](crate::mutex::Mutex).
pub struct CriticalSection<'a> {
    _internal_cs: critical_section::CriticalSection<'a>,
}

impl<'a> CriticalSection<'a> {
    fn new(internal_cs: critical_section::CriticalSection<'a>) -> Self {
        Self {
            _internal_cs: internal_cs,
        }
    }
}

/// Runs `f` with the scheduler IRQs blocked
///
/// On nRF52840 all IRQs are disabled by `cortex-m`. Host builds serialize the callers with a
/// global lock instead.
///
/// Keep `f` short and never call scheduler callbacks from it: callbacks are allowed to enter the
/// scheduler again, what would require nested access to the locked data.
pub fn locked<F, R>(f: F) -> R
where
    F: FnOnce(&CriticalSection) -> R,
{
    critical_section::with(|cs| f(&CriticalSection::new(cs)))
}
