//! Baseband control
//!
//! The baseband hands BODs to the protocols executing them and tracks the single executing BOD.
//! Protocols are powered with reference counted [`start`](Scheduler::start) and
//! [`stop`](Scheduler::stop) calls.
//!
//! A protocol receives an [`ExecToken`] together with each BOD it executes. The token is the only
//! way to [`terminate`](Scheduler::terminate_bod) the execution, so a BOD cannot be terminated by
//! a context which did not execute it.

pub mod registry;

use crate::bod::protocol::ProtocolId;
use crate::bod::Bod;
use crate::error::{BodError, Error};
use crate::sch::list::BodHandle;
use crate::sch::{Scheduler, State};
use core::sync::atomic::Ordering;

/// Capability identifying one execution of a BOD
///
/// Handed to the protocol's execute callback and consumed by
/// [`terminate_bod`](Scheduler::terminate_bod).
#[derive(Debug, Eq, PartialEq)]
pub struct ExecToken {
    generation: u32,
}

/// The executing BOD
pub(crate) struct Executing {
    pub(crate) bod: Bod,
    pub(crate) handle: Option<BodHandle>,
    pub(crate) background: bool,
    generation: u32,
}

/// Background BOD waiting for execution
pub(crate) struct Background {
    pub(crate) bod: Bod,
    started: bool,
}

impl Background {
    pub(crate) fn new(bod: Bod) -> Self {
        Self {
            bod,
            started: false,
        }
    }

    /// Background BOD which was executed at least once
    pub(crate) fn started(bod: Bod) -> Self {
        Self { bod, started: true }
    }

    /// Hands the BOD to its end callback if it was ever executed, or to its abort callback
    pub(crate) fn finish(self, sched: &Scheduler<'_>) {
        if self.started {
            self.bod.finish(sched);
        } else {
            self.bod.abort(sched);
        }
    }
}

impl State {
    /// Makes `bod` the executing BOD
    ///
    /// Returns a copy of the BOD for the execute callback along with the token of this execution.
    pub(crate) fn begin(
        &mut self,
        bod: Bod,
        handle: Option<BodHandle>,
        background: bool,
    ) -> (Bod, ExecToken) {
        debug_assert!(self.executing.is_none());

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let copy = bod.clone();
        self.executing = Some(Executing {
            bod,
            handle,
            background,
            generation,
        });

        (copy, ExecToken { generation })
    }
}

impl<'a> Scheduler<'a> {
    /// Starts using the baseband by protocol `id`
    ///
    /// Calls are counted. The protocol's start callback is called on the first start of the
    /// protocol, and the baseband driver is enabled on the first start of any protocol.
    ///
    /// # Examples
    ///
    /// ```
    /// use bb_sched::bb::registry::{ProtocolHandler, ProtocolRegistry};
    /// use bb_sched::bod::protocol::ProtocolId;
    /// use bb_sched::error::Error;
    /// use bb_sched::hw::sim_driver::SimDriver;
    /// use bb_sched::Scheduler;
    ///
    /// let handler = ProtocolHandler {
    ///     execute: |_, _, _| {},
    ///     cancel: |_, _| {},
    ///     start: |_| {},
    ///     stop: |_| {},
    /// };
    /// let mut registry = ProtocolRegistry::new();
    /// registry.register(ProtocolId::Ble, handler).unwrap();
    ///
    /// let driver = SimDriver::new();
    /// let sched = Scheduler::new(Default::default(), registry, &driver).unwrap();
    ///
    /// sched.start(ProtocolId::Ble).unwrap();
    /// assert!(driver.is_enabled());
    ///
    /// sched.stop(ProtocolId::Ble).unwrap();
    /// assert!(!driver.is_enabled());
    /// assert_eq!(sched.stop(ProtocolId::Ble), Err(Error::NotStarted));
    /// assert_eq!(sched.start(ProtocolId::Prbs15), Err(Error::InvalidProtocol));
    /// ```
    pub fn start(&self, id: ProtocolId) -> Result<(), Error> {
        let handler = *self.registry.get(id).ok_or(Error::InvalidProtocol)?;

        let (first_of_protocol, first_of_all) = self.state.lock(|state| {
            let first_of_all = state.start_counts.iter().all(|count| *count == 0);
            let count = &mut state.start_counts[id.index()];
            *count = count.saturating_add(1);
            (*count == 1, first_of_all)
        });

        if first_of_all {
            info!("Baseband enabled");
            self.driver.enable();
        }
        if first_of_protocol {
            (handler.start)(self);
        }
        Ok(())
    }

    /// Stops using the baseband by protocol `id`
    ///
    /// Reverts one [`start`](Scheduler::start) call. Stopping a protocol which is not started does
    /// nothing and returns [`Error::NotStarted`].
    pub fn stop(&self, id: ProtocolId) -> Result<(), Error> {
        let handler = *self.registry.get(id).ok_or(Error::InvalidProtocol)?;

        let (last_of_protocol, last_of_all) = self
            .state
            .lock(|state| {
                let count = &mut state.start_counts[id.index()];
                if *count == 0 {
                    return None;
                }

                *count -= 1;
                let last_of_protocol = *count == 0;
                let last_of_all = state.start_counts.iter().all(|count| *count == 0);
                Some((last_of_protocol, last_of_all))
            })
            .ok_or_else(|| {
                warn!("Protocol {} stopped more times than started", id);
                Error::NotStarted
            })?;

        if last_of_protocol {
            (handler.stop)(self);
        }
        if last_of_all {
            info!("Baseband disabled");
            self.driver.disable();
        }
        Ok(())
    }

    /// Executes `bod` immediately, bypassing the list of pending BODs
    ///
    /// Fails with [`BodError::Busy`] if another BOD is executing.
    pub fn execute_bod(&self, bod: Bod) -> Result<(), BodError> {
        let bod = self.check_registered(bod)?;

        let (bod, token) = self.state.lock(|state| {
            if state.executing.is_some() {
                return Err(BodError::Busy(bod));
            }

            Ok(state.begin(bod, None, false))
        })?;

        self.run(&bod, token);
        Ok(())
    }

    /// Cancels the executing BOD and returns it
    ///
    /// The protocol's cancel callback is called, but neither the end nor the abort callback of the
    /// BOD. The caller completes the BOD, usually with [`Bod::finish`]. Returns `None` if no
    /// foreground BOD is executing.
    pub fn cancel_bod(&self) -> Option<Bod> {
        let bod = self.state.lock(|state| {
            if state.executing_window().is_some() {
                state.executing.take().map(|executing| executing.bod)
            } else {
                None
            }
        })?;

        debug!("BOD due at {} cancelled", bod.due);
        self.call_cancel(&bod);
        self.dispatch();
        Some(bod)
    }

    /// Requests the executing BOD to finish as soon as possible
    ///
    /// Protocols check the flag with [`terminate_flag`](Scheduler::terminate_flag) between radio
    /// events. The flag is cleared when the next BOD is executed.
    pub fn set_terminate_flag(&self) {
        self.terminate.store(true, Ordering::SeqCst);
    }

    /// Checks if the executing BOD is requested to finish
    pub fn terminate_flag(&self) -> bool {
        self.terminate.load(Ordering::SeqCst)
    }

    /// Completes the executing BOD
    ///
    /// The BOD is passed to its end callback after the next BOD is loaded. `token` must be the one
    /// received with the executing BOD, otherwise [`Error::InvalidContext`] is returned and
    /// nothing changes.
    pub fn terminate_bod(&self, token: ExecToken) -> Result<(), Error> {
        let bod = self.state.lock(|state| match state.executing.take() {
            Some(executing) if executing.generation == token.generation => Ok(executing.bod),
            Some(executing) => {
                state.executing = Some(executing);
                Err(Error::InvalidContext)
            }
            None => Err(Error::NotExecuting),
        });

        let bod = match bod {
            Ok(bod) => bod,
            Err(error) => {
                error!("BOD terminated with invalid token: {}", error);
                return Err(error);
            }
        };

        self.terminate.store(false, Ordering::SeqCst);
        self.dispatch();
        bod.finish(self);
        Ok(())
    }

    /// Copy of the executing BOD
    pub fn current_bod(&self) -> Option<Bod> {
        self.state.lock(|state| {
            state
                .executing
                .as_ref()
                .map(|executing| executing.bod.clone())
        })
    }

    /// Handle of the executing BOD
    ///
    /// `None` if no BOD is executing, or if the executing BOD was not taken from the list of
    /// pending BODs.
    pub fn current_handle(&self) -> Option<BodHandle> {
        self.state.lock(|state| {
            state
                .executing
                .as_ref()
                .and_then(|executing| executing.handle)
        })
    }

    /// Checks if any BOD is executing
    pub fn is_executing(&self) -> bool {
        self.state.lock(|state| state.executing.is_some())
    }

    /// Calls the execute callback of the protocol of `bod`
    pub(crate) fn run(&self, bod: &Bod, token: ExecToken) {
        self.terminate.store(false, Ordering::SeqCst);

        match bod.protocol_id() {
            Some(id) => match self.registry.get(id) {
                Some(handler) => {
                    self.stats.count_executed(id);
                    (handler.execute)(self, bod, token);
                }
                None => error!("No handler executing protocol {}", id),
            },
            None => error!("BOD without protocol loaded"),
        }
    }

    /// Calls the cancel callback of the protocol of `bod`
    pub(crate) fn call_cancel(&self, bod: &Bod) {
        if let Some(handler) = bod.protocol_id().and_then(|id| self.registry.get(id)) {
            (handler.cancel)(self, bod);
        }
    }
}
