//! Table of protocol handlers
//!
//! Each protocol sharing the radio registers a set of callbacks used by the baseband to run the
//! protocol's BODs. The registry is filled before the scheduler is created and is moved into it.

use super::ExecToken;
use crate::bod::protocol::ProtocolId;
use crate::bod::Bod;
use crate::config::BB_PROT_NUM;
use crate::error::Error;
use crate::sch::Scheduler;

/// Starts radio operation described by the BOD. The token identifies this execution.
pub type ExecuteCallback = fn(&Scheduler<'_>, &Bod, ExecToken);
/// Stops radio operation described by the BOD before it completes
pub type CancelCallback = fn(&Scheduler<'_>, &Bod);
/// Notifies the protocol about a start or stop of its use of the baseband
pub type StartStopCallback = fn(&Scheduler<'_>);

/// Callbacks of a single protocol
#[derive(Clone, Copy)]
pub struct ProtocolHandler {
    /// Called when a BOD of this protocol is due
    pub execute: ExecuteCallback,
    /// Called when an executing BOD of this protocol is cancelled
    pub cancel: CancelCallback,
    /// Called when the protocol is started
    pub start: StartStopCallback,
    /// Called when the protocol is stopped
    pub stop: StartStopCallback,
}

/// Protocol handlers indexed with the protocol ID
///
/// # Examples
///
/// ```
/// use bb_sched::bb::registry::{ProtocolHandler, ProtocolRegistry};
/// use bb_sched::bod::protocol::ProtocolId;
/// use bb_sched::error::Error;
///
/// let handler = ProtocolHandler {
///     execute: |_, _, _| {},
///     cancel: |_, _| {},
///     start: |_| {},
///     stop: |_| {},
/// };
///
/// let mut registry = ProtocolRegistry::new();
/// assert_eq!(registry.register(ProtocolId::Ble, handler), Ok(()));
/// assert_eq!(
///     registry.register(ProtocolId::Ble, handler),
///     Err(Error::AlreadyRegistered)
/// );
/// assert!(registry.is_registered(ProtocolId::Ble));
/// assert!(!registry.is_registered(ProtocolId::Ieee802154));
/// ```
#[derive(Clone, Copy, Default)]
pub struct ProtocolRegistry {
    handlers: [Option<ProtocolHandler>; BB_PROT_NUM],
}

impl ProtocolRegistry {
    /// Creates a registry without any handlers
    pub const fn new() -> Self {
        Self {
            handlers: [None; BB_PROT_NUM],
        }
    }

    /// Registers handler of protocol `id`
    ///
    /// A protocol can be registered only once.
    pub fn register(&mut self, id: ProtocolId, handler: ProtocolHandler) -> Result<(), Error> {
        let entry = &mut self.handlers[id.index()];
        if entry.is_some() {
            return Err(Error::AlreadyRegistered);
        }

        *entry = Some(handler);
        Ok(())
    }

    /// Handler of protocol `id`
    pub fn get(&self, id: ProtocolId) -> Option<&ProtocolHandler> {
        self.handlers[id.index()].as_ref()
    }

    /// Checks if a handler of protocol `id` is registered
    pub fn is_registered(&self, id: ProtocolId) -> bool {
        self.handlers[id.index()].is_some()
    }
}
