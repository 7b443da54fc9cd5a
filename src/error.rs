use crate::bod::Bod;

/// Errors reported by the baseband and scheduler APIs
#[derive(Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A handler is already registered for the requested protocol
    AlreadyRegistered,
    /// The protocol ID does not identify a registrable protocol
    InvalidProtocol,
    /// The channel number is out of range for the selected protocol
    InvalidChannel,
    /// A runtime configuration value is out of range
    InvalidConfig,
    /// The BOD represented by the passed handle is not pending
    NotFound,
    /// The protocol was stopped more times than it was started
    NotStarted,
    /// No BOD is executing
    NotExecuting,
    /// The execution token does not belong to the executing BOD
    InvalidContext,
}

/// Errors reported by the operations taking a [`Bod`] by value
///
/// Whenever the operation fails without handing the BOD to its abort callback, the ownership of
/// the BOD is returned to the caller inside the error.
pub enum BodError {
    /// The BOD lost a conflict against a BOD which could not be moved. It was already passed to its
    /// abort callback.
    Conflict,
    /// No free gap was found in the requested range
    NoSlot(Bod),
    /// All BOD slots are in use
    NoMemory(Bod),
    /// No handler is registered for the protocol of the BOD
    Unregistered(Bod),
    /// The BOD cannot be reloaded, because its policy is not periodic or its period is zero
    NotPeriodic(Bod),
    /// Another BOD is executing
    Busy(Bod),
    /// A background BOD is already present
    AlreadyPresent(Bod),
}

impl BodError {
    /// Takes back the BOD carried by this error, if any
    ///
    /// # Example
    ///
    /// ```
    /// use bb_sched::bod::Bod;
    /// use bb_sched::error::BodError;
    ///
    /// let error = BodError::NoSlot(Bod::new(100, Default::default(), &()));
    /// let bod = error.into_bod().unwrap();
    /// assert_eq!(bod.due, 100);
    ///
    /// assert!(BodError::Conflict.into_bod().is_none());
    /// ```
    pub fn into_bod(self) -> Option<Bod> {
        match self {
            BodError::Conflict => None,
            BodError::NoSlot(bod)
            | BodError::NoMemory(bod)
            | BodError::Unregistered(bod)
            | BodError::NotPeriodic(bod)
            | BodError::Busy(bod)
            | BodError::AlreadyPresent(bod) => Some(bod),
        }
    }
}

impl core::fmt::Debug for BodError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            BodError::Conflict => "Conflict",
            BodError::NoSlot(_) => "NoSlot",
            BodError::NoMemory(_) => "NoMemory",
            BodError::Unregistered(_) => "Unregistered",
            BodError::NotPeriodic(_) => "NotPeriodic",
            BodError::Busy(_) => "Busy",
            BodError::AlreadyPresent(_) => "AlreadyPresent",
        };
        f.write_str(name)
    }
}
