//! Baseband Operation Descriptors
//!
//! A BOD describes one unit of radio work: when it should start, how long it may take, how
//! flexible its start time is and which protocol executes it.
//!
//! A BOD is moved into the [`Scheduler`] when it is inserted. The scheduler gives it back exactly
//! once: either to the end callback after the BOD was executed, or to the abort callback if the
//! BOD was dropped before it started.

pub mod protocol;

use crate::clock::{self, Ticks};
use crate::sch::Scheduler;
use core::any::Any;
use core::fmt::{Debug, Formatter};
use protocol::{ProtocolData, ProtocolId};

/// Reference to any data selected by the BOD owner. The scheduler never inspects it.
pub type Context = &'static (dyn Any + Send + Sync);

/// Callback receiving back a BOD which left the scheduler
pub type BodCallback = fn(&Scheduler<'_>, Bod);

/// Flexibility of a BOD's due time
///
/// Variants are ordered from the least to the most flexible. A less flexible BOD wins a conflict
/// against a more flexible one.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReschedulePolicy {
    /// Due time shall not be changed. Aborted when it loses a conflict.
    FixedPreferred,
    /// Due time cannot be changed. Aborted when it loses a conflict.
    Fixed,
    /// Repeating operation which can be moved
    Periodic,
    /// Operation which should keep its due time, but can be moved
    MoveablePreferred,
    /// Operation which can be moved
    Moveable,
    /// Idle-time filler
    Background,
}

impl ReschedulePolicy {
    /// Checks if a BOD with this policy can be moved after losing a conflict
    pub fn is_movable(self) -> bool {
        matches!(
            self,
            ReschedulePolicy::Periodic
                | ReschedulePolicy::MoveablePreferred
                | ReschedulePolicy::Moveable
                | ReschedulePolicy::Background
        )
    }
}

/// Baseband Operation Descriptor
///
/// # Examples
///
/// ```
/// use bb_sched::bod::{Bod, ReschedulePolicy};
/// use bb_sched::bod::protocol::{BleChannel, BleOp, BleOpType, ProtocolData, ProtocolId};
///
/// let channel = BleChannel::new(37, 0x8e89_bed6, 0x55_5555).unwrap();
/// let data = ProtocolData::Ble(BleOp {
///     channel,
///     op_type: BleOpType::Advertising,
/// });
///
/// let bod = Bod::new(1000, data, &())
///     .with_duration(200, 1500)
///     .with_policy(ReschedulePolicy::MoveablePreferred);
///
/// assert_eq!(bod.protocol_id(), Some(ProtocolId::Ble));
/// assert_eq!(bod.end(), 2500);
/// ```
#[derive(Clone)]
pub struct Bod {
    /// Time at which the operation should start
    pub due: Ticks,
    /// Total shift of `due` applied by the scheduler
    pub due_offset_usec: u32,
    /// Shortest acceptable execution time
    pub min_duration_usec: u32,
    /// Longest execution time. Defines the window occupied by the BOD.
    pub max_duration_usec: u32,
    /// Reload period of a periodic BOD
    pub period_usec: u32,
    /// Flexibility of the due time
    pub policy: ReschedulePolicy,
    /// Called when the BOD was executed
    pub end_callback: Option<BodCallback>,
    /// Called when the BOD was dropped before it started
    pub abort_callback: Option<BodCallback>,
    /// Owner's data
    pub context: Context,
    /// Parameters interpreted by the protocol executing the BOD
    pub protocol_data: ProtocolData,
}

impl Bod {
    /// Creates a fixed BOD with empty duration and without callbacks
    pub fn new(due: Ticks, protocol_data: ProtocolData, context: Context) -> Self {
        Self {
            due,
            due_offset_usec: 0,
            min_duration_usec: 0,
            max_duration_usec: 0,
            period_usec: 0,
            policy: ReschedulePolicy::Fixed,
            end_callback: None,
            abort_callback: None,
            context,
            protocol_data,
        }
    }

    /// Sets the execution time limits
    pub fn with_duration(mut self, min_usec: u32, max_usec: u32) -> Self {
        self.min_duration_usec = min_usec;
        self.max_duration_usec = max_usec;
        self
    }

    /// Sets the reschedule policy
    pub fn with_policy(mut self, policy: ReschedulePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the reload period
    pub fn with_period(mut self, period_usec: u32) -> Self {
        self.period_usec = period_usec;
        self
    }

    /// Sets the end and abort callbacks
    pub fn with_callbacks(mut self, end: BodCallback, abort: BodCallback) -> Self {
        self.end_callback = Some(end);
        self.abort_callback = Some(abort);
        self
    }

    /// Protocol executing this BOD
    pub fn protocol_id(&self) -> Option<ProtocolId> {
        self.protocol_data.protocol_id()
    }

    /// Window length in ticks
    pub fn duration_ticks(&self) -> Ticks {
        clock::us_to_ticks(self.max_duration_usec)
    }

    /// End of the window occupied by this BOD
    pub fn end(&self) -> Ticks {
        self.due.wrapping_add(self.duration_ticks())
    }

    /// Due time requested by the owner, before the scheduler moved the BOD
    pub fn original_due(&self) -> Ticks {
        self.due
            .wrapping_sub(clock::us_to_ticks(self.due_offset_usec))
    }

    /// Moves the due time to `due`, recording the shift in `due_offset_usec`
    pub(crate) fn move_to(&mut self, due: Ticks) {
        let shift = clock::ticks_to_us(due.wrapping_sub(self.due));
        self.due_offset_usec = self.due_offset_usec.wrapping_add(shift);
        self.due = due;
    }

    /// Hands this executed BOD to its end callback
    ///
    /// Used by protocol handlers to finish a BOD they got back from
    /// [`cancel_bod`](Scheduler::cancel_bod). The scheduler calls it for BODs terminated with
    /// [`terminate_bod`](Scheduler::terminate_bod).
    pub fn finish(self, sched: &Scheduler<'_>) {
        if let Some(callback) = self.end_callback {
            callback(sched, self);
        }
    }

    /// Hands this never started BOD to its abort callback
    pub(crate) fn abort(self, sched: &Scheduler<'_>) {
        if let Some(callback) = self.abort_callback {
            callback(sched, self);
        }
    }
}

impl Debug for Bod {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), core::fmt::Error> {
        f.debug_struct("Bod")
            .field("due", &self.due)
            .field("due_offset_usec", &self.due_offset_usec)
            .field("min_duration_usec", &self.min_duration_usec)
            .field("max_duration_usec", &self.max_duration_usec)
            .field("period_usec", &self.period_usec)
            .field("policy", &self.policy)
            .field("protocol_data", &self.protocol_data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_order_from_least_flexible() {
        use ReschedulePolicy::*;

        let ordered = [
            FixedPreferred,
            Fixed,
            Periodic,
            MoveablePreferred,
            Moveable,
            Background,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_fixed_policies_are_not_movable() {
        assert!(!ReschedulePolicy::FixedPreferred.is_movable());
        assert!(!ReschedulePolicy::Fixed.is_movable());
        assert!(ReschedulePolicy::Periodic.is_movable());
        assert!(ReschedulePolicy::Moveable.is_movable());
    }

    #[test]
    fn test_move_records_offset() {
        let mut bod = Bod::new(120, ProtocolData::None, &()).with_duration(0, 50);

        bod.move_to(150);
        assert_eq!(bod.due, 150);
        assert_eq!(bod.due_offset_usec, 30);
        assert_eq!(bod.original_due(), 120);

        bod.move_to(200);
        assert_eq!(bod.due_offset_usec, 80);
        assert_eq!(bod.original_due(), 120);
        assert_eq!(bod.end(), 250);
    }

    #[test]
    fn test_move_across_wraparound() {
        let mut bod = Bod::new(0xffff_fff0, ProtocolData::None, &()).with_duration(0, 0x40);

        bod.move_to(0x10);
        assert_eq!(bod.due_offset_usec, 0x20);
        assert_eq!(bod.original_due(), 0xffff_fff0);
        assert_eq!(bod.end(), 0x50);
    }
}
