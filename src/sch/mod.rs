//! Scheduler of Baseband Operation Descriptors
//!
//! The scheduler keeps a list of pending BODs sorted by their due times and hands each of them to
//! the protocol executing it shortly before the BOD is due. Windows of pending BODs never overlap:
//! conflicts are resolved when a BOD is inserted, by moving or dropping the more flexible BOD.
//!
//! All operations can be called from thread mode, from the baseband IRQs and from the scheduler's
//! own callbacks. Scheduler data is locked only for the time needed to update it and callbacks are
//! called after it is unlocked.

pub mod conflict;
mod gap;
pub mod list;
pub mod stats;

use crate::bb::registry::ProtocolRegistry;
use crate::bb::{Background, Executing};
use crate::bod::{Bod, ReschedulePolicy};
use crate::clock::{self, Ticks};
use crate::config::{RtCfg, BB_PROT_NUM};
use crate::error::{BodError, Error};
use crate::hw::BbDriver;
use crate::mutex::Mutex;
use conflict::{Aborted, Window};
use core::sync::atomic::AtomicBool;
use gap::{Direction, Occupied};
use list::{BodHandle, BodList};
use stats::{SchStats, SchStatsSnapshot};

/// Scheduler data shared between all contexts
pub(crate) struct State {
    pub(crate) list: BodList,
    pub(crate) executing: Option<Executing>,
    pub(crate) background: Option<Background>,
    pub(crate) start_counts: [u16; BB_PROT_NUM],
    pub(crate) generation: u32,
}

impl State {
    const fn new() -> Self {
        Self {
            list: BodList::new(),
            executing: None,
            background: None,
            start_counts: [0; BB_PROT_NUM],
            generation: 0,
        }
    }

    /// Window of the executing BOD, unless it is the background one
    pub(crate) fn executing_window(&self) -> Option<Window> {
        self.executing
            .as_ref()
            .filter(|executing| !executing.background)
            .map(|executing| Window::of(&executing.bod))
    }

    pub(crate) fn is_background_executing(&self) -> bool {
        self.executing
            .as_ref()
            .map_or(false, |executing| executing.background)
    }

    fn occupied(&self) -> Occupied {
        let mut occupied = Occupied::new();
        if let Some(window) = self.executing_window() {
            occupied.push(window);
        }
        for (_, bod) in self.list.iter() {
            occupied.push(Window::of(bod));
        }
        occupied
    }
}

/// Baseband Operation Descriptors scheduler
///
/// # Examples
///
/// ```
/// use bb_sched::bb::registry::{ProtocolHandler, ProtocolRegistry};
/// use bb_sched::bod::protocol::{BleChannel, BleOp, BleOpType, ProtocolData, ProtocolId};
/// use bb_sched::bod::{Bod, ReschedulePolicy};
/// use bb_sched::hw::sim_driver::SimDriver;
/// use bb_sched::Scheduler;
///
/// let mut registry = ProtocolRegistry::new();
/// registry
///     .register(
///         ProtocolId::Ble,
///         ProtocolHandler {
///             execute: |sched, _bod, token| {
///                 // Radio activity is started here. This one completes immediately.
///                 sched.terminate_bod(token).unwrap();
///             },
///             cancel: |_, _| {},
///             start: |_| {},
///             stop: |_| {},
///         },
///     )
///     .unwrap();
///
/// let driver = SimDriver::new();
/// let sched = Scheduler::new(Default::default(), registry, &driver).unwrap();
///
/// let channel = BleChannel::new(37, 0x8e89_bed6, 0x55_5555).unwrap();
/// let data = ProtocolData::Ble(BleOp {
///     channel,
///     op_type: BleOpType::Advertising,
/// });
/// let bod = Bod::new(5000, data, &())
///     .with_duration(1000, 1000)
///     .with_policy(ReschedulePolicy::MoveablePreferred);
///
/// let handle = sched.insert_at_due_time(bod).unwrap();
/// assert!(sched.is_bod_cancellable(handle));
///
/// // The BOD is loaded at its due time minus the setup delay
/// assert_eq!(driver.armed(), Some(4500));
/// driver.set_now(4500);
/// sched.dispatch();
/// assert!(!sched.is_executing());
/// ```
pub struct Scheduler<'a> {
    pub(crate) state: Mutex<State>,
    pub(crate) registry: ProtocolRegistry,
    pub(crate) driver: &'a dyn BbDriver,
    pub(crate) cfg: RtCfg,
    pub(crate) terminate: AtomicBool,
    pub(crate) stats: SchStats,
}

impl<'a> Scheduler<'a> {
    /// Creates a scheduler running BODs of protocols from `registry`
    ///
    /// Fails with [`Error::InvalidConfig`] if `cfg` does not pass validation.
    pub fn new(
        cfg: RtCfg,
        registry: ProtocolRegistry,
        driver: &'a dyn BbDriver,
    ) -> Result<Self, Error> {
        cfg.validate()?;
        info!(
            "Scheduler created, setup delay {} us",
            cfg.sch_setup_delay_us
        );

        Ok(Self {
            state: Mutex::new(State::new()),
            registry,
            driver,
            cfg,
            terminate: AtomicBool::new(false),
            stats: SchStats::new(),
        })
    }

    /// Runtime configuration
    pub fn rt_cfg(&self) -> &RtCfg {
        &self.cfg
    }

    pub(crate) fn setup_ticks(&self) -> Ticks {
        clock::us_to_ticks(u32::from(self.cfg.sch_setup_delay_us))
    }

    pub(crate) fn check_registered(&self, bod: Bod) -> Result<Bod, BodError> {
        match bod.protocol_id() {
            Some(id) if self.registry.is_registered(id) => Ok(bod),
            _ => {
                warn!("BOD of an unregistered protocol");
                Err(BodError::Unregistered(bod))
            }
        }
    }

    /// Inserts `bod` behind all pending BODs
    ///
    /// The due time of `bod` is overwritten with the end of the last window in the schedule, or
    /// with the earliest time the BOD can be loaded if the schedule is empty.
    pub fn insert_next_available(&self, mut bod: Bod) -> Result<BodHandle, BodError> {
        bod = self.check_registered(bod)?;

        let handle = self.state.lock(|state| -> Result<BodHandle, BodError> {
            let mut due = self.driver.now().wrapping_add(self.setup_ticks());
            if let Some(window) = state.executing_window() {
                due = clock::later(due, window.end());
            }
            for (_, pending) in state.list.iter() {
                due = clock::later(due, Window::of(pending).end());
            }
            bod.due = due;

            let index = state.list.allocate(bod).map_err(BodError::NoMemory)?;
            state.list.link(index);
            Ok(state.list.handle(index))
        })?;

        self.dispatch();
        Ok(handle)
    }

    /// Inserts `bod` at its due time, resolving conflicts with the pending BODs
    ///
    /// If `bod` loses a conflict and cannot be moved, it is passed to its abort callback before
    /// this function returns [`BodError::Conflict`]. Pending BODs beaten by `bod` are moved behind
    /// it, or aborted if their policy does not allow moving.
    pub fn insert_at_due_time(&self, bod: Bod) -> Result<BodHandle, BodError> {
        let bod = self.check_registered(bod)?;

        let (handle, aborted) = self.state.lock(|state| -> Result<_, BodError> {
            let index = state.list.allocate(bod).map_err(BodError::NoMemory)?;
            let executing = state.executing_window();
            let placement = conflict::place(&mut state.list, executing, index, &self.stats);
            let handle = placement.placed.then(|| state.list.handle(index));
            Ok((handle, placement.aborted))
        })?;

        self.dispatch();
        aborted.abort_all(self);
        handle.ok_or(BodError::Conflict)
    }

    /// Inserts `bod` at the earliest free time in range `[due + min_usec, due + max_usec]`
    ///
    /// The window from the selected start to the start plus the minimal duration of `bod` must be
    /// free. The maximal duration is shortened to the free gap. If no such start exists the BOD
    /// is returned in [`BodError::NoSlot`] and the schedule does not change.
    ///
    /// # Examples
    ///
    /// ```
    /// use bb_sched::bb::registry::{ProtocolHandler, ProtocolRegistry};
    /// use bb_sched::bod::protocol::{Ieee802154Channel, Ieee802154Op, Ieee802154OpType};
    /// use bb_sched::bod::protocol::{ProtocolData, ProtocolId};
    /// use bb_sched::bod::Bod;
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
    /// registry.register(ProtocolId::Ieee802154, handler).unwrap();
    ///
    /// let driver = SimDriver::new();
    /// let sched = Scheduler::new(Default::default(), registry, &driver).unwrap();
    ///
    /// let data = ProtocolData::Ieee802154(Ieee802154Op {
    ///     channel: Ieee802154Channel::new(11).unwrap(),
    ///     tx_power_dbm: 0,
    ///     op_type: Ieee802154OpType::Rx,
    /// });
    ///
    /// sched
    ///     .insert_at_due_time(Bod::new(10_000, data, &()).with_duration(2000, 2000))
    ///     .unwrap();
    ///
    /// let rx = Bod::new(9_000, data, &()).with_duration(1000, 5000);
    /// sched.insert_early_as_possible(rx, 0, 10_000).unwrap();
    /// ```
    pub fn insert_early_as_possible(
        &self,
        bod: Bod,
        min_usec: u32,
        max_usec: u32,
    ) -> Result<BodHandle, BodError> {
        self.insert_in_gap(bod, min_usec, max_usec, Direction::Early)
    }

    /// Inserts `bod` at the latest free time in range `[due + min_usec, due + max_usec]`
    ///
    /// Gaps are selected like in [`insert_early_as_possible`](Scheduler::insert_early_as_possible).
    pub fn insert_late_as_possible(
        &self,
        bod: Bod,
        min_usec: u32,
        max_usec: u32,
    ) -> Result<BodHandle, BodError> {
        self.insert_in_gap(bod, min_usec, max_usec, Direction::Late)
    }

    fn insert_in_gap(
        &self,
        bod: Bod,
        min_usec: u32,
        max_usec: u32,
        direction: Direction,
    ) -> Result<BodHandle, BodError> {
        let bod = self.check_registered(bod)?;

        let handle = self.state.lock(|state| -> Result<BodHandle, BodError> {
            let occupied = state.occupied();
            let earliest = bod.due.wrapping_add(clock::us_to_ticks(min_usec));
            let latest = bod.due.wrapping_add(clock::us_to_ticks(max_usec));
            let min_len = clock::us_to_ticks(bod.min_duration_usec);

            let start = match occupied.find(earliest, latest, min_len, direction) {
                Some(start) => start,
                None => return Err(BodError::NoSlot(bod)),
            };

            let index = state.list.allocate(bod).map_err(BodError::NoMemory)?;
            let bod = state.list.bod_mut(index);
            bod.move_to(start);
            if let Some(gap_end) = occupied.next_start(start) {
                let gap = gap_end.wrapping_sub(start);
                if gap < bod.duration_ticks() {
                    bod.max_duration_usec = clock::ticks_to_us(gap);
                }
            }

            state.list.link(index);
            Ok(state.list.handle(index))
        })?;

        self.dispatch();
        Ok(handle)
    }

    /// Removes a pending BOD and passes it to its abort callback
    ///
    /// Fails with [`Error::NotFound`] if the BOD already left the list: it is executing, it was
    /// executed or it was dropped.
    pub fn remove(&self, handle: BodHandle) -> Result<(), Error> {
        let bod = self
            .state
            .lock(|state| state.list.remove(handle))
            .ok_or(Error::NotFound)?;

        self.dispatch();
        bod.abort(self);
        Ok(())
    }

    /// Inserts the next occurrence of a periodic BOD
    ///
    /// The new due time is the time the BOD was last due plus the period, so moves made by the
    /// scheduler carry over to the next occurrence. The next occurrence is requested for its new
    /// due time and starts without a due offset. BODs which are not periodic, or have an empty
    /// period, are returned in [`BodError::NotPeriodic`].
    pub fn reload(&self, mut bod: Bod) -> Result<BodHandle, BodError> {
        if bod.policy != ReschedulePolicy::Periodic || bod.period_usec == 0 {
            return Err(BodError::NotPeriodic(bod));
        }

        bod.due = bod.due.wrapping_add(clock::us_to_ticks(bod.period_usec));
        bod.due_offset_usec = 0;
        self.insert_at_due_time(bod)
    }

    /// Sets the BOD executed whenever no other BOD is pending
    ///
    /// Only one background BOD can be present at a time. The background BOD is cancelled when a
    /// pending BOD is due and resumed once the list is empty again.
    pub fn insert_background(&self, bod: Bod) -> Result<(), BodError> {
        let bod = self.check_registered(bod)?;

        self.state.lock(|state| {
            if state.background.is_some() || state.is_background_executing() {
                return Err(BodError::AlreadyPresent(bod));
            }

            state.background = Some(Background::new(bod));
            Ok(())
        })?;

        self.dispatch();
        Ok(())
    }

    /// Removes the background BOD
    ///
    /// An executing background BOD is cancelled. The BOD is passed to its end callback if it was
    /// ever executed, otherwise to its abort callback.
    pub fn remove_background(&self) -> Result<(), Error> {
        self.finish_background(true)
    }

    /// Completes the background BOD on request of its protocol
    ///
    /// Like [`remove_background`](Scheduler::remove_background), but the protocol is not asked to
    /// cancel the BOD.
    pub fn terminate_background(&self) -> Result<(), Error> {
        self.finish_background(false)
    }

    fn finish_background(&self, cancel: bool) -> Result<(), Error> {
        let (background, was_executing) = self
            .state
            .lock(|state| {
                if state.is_background_executing() {
                    state
                        .executing
                        .take()
                        .map(|executing| (Background::started(executing.bod), true))
                } else {
                    state.background.take().map(|background| (background, false))
                }
            })
            .ok_or(Error::NotFound)?;

        if cancel && was_executing {
            self.call_cancel(&background.bod);
        }
        self.dispatch();
        background.finish(self);
        Ok(())
    }

    /// Drops all pending BODs and the background BOD
    ///
    /// Pending BODs are passed to their abort callbacks. The executing BOD is not affected.
    pub fn reset(&self) {
        let (aborted, background) = self.state.lock(|state| {
            let mut aborted = Aborted::new();
            while let Some((_, bod)) = state.list.pop_first() {
                aborted.push(bod);
            }
            (aborted, state.background.take())
        });

        info!("Scheduler reset, {} BODs aborted", aborted.len());
        self.dispatch();
        aborted.abort_all(self);
        if let Some(background) = background {
            background.finish(self);
        }
    }

    /// Checks if a pending BOD is far enough from its load time to be removed safely
    pub fn is_bod_cancellable(&self, handle: BodHandle) -> bool {
        self.state.lock(|state| {
            state.list.get(handle).map_or(false, |bod| {
                let load_at = bod.due.wrapping_sub(self.setup_ticks());
                clock::is_before(self.driver.now(), load_at)
            })
        })
    }

    /// Current values of the statistics counters
    pub fn stats(&self) -> SchStatsSnapshot {
        self.stats.snapshot()
    }

    /// Zeroes the statistics counters
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    /// Loads the first pending BOD if it is due, or arms the driver for its load time
    ///
    /// Called from the driver's wake-up IRQ and by all scheduler operations changing the schedule.
    /// A BOD is loaded [`sch_setup_delay_us`](RtCfg::sch_setup_delay_us) before it is due. BODs
    /// loaded after their due time are executed anyway and counted in
    /// [`SchStatsSnapshot::late_loads`].
    pub fn dispatch(&self) {
        let mut preempted = None;

        let loaded = self.state.lock(|state| {
            if state.executing_window().is_some() {
                self.driver.disarm();
                return None;
            }

            let now = self.driver.now();
            let head_due = state.list.first().map(|bod| bod.due);

            match head_due {
                Some(due) => {
                    let load_at = due.wrapping_sub(self.setup_ticks());
                    if clock::is_before(now, load_at) {
                        self.driver.arm(load_at);
                        return None;
                    }

                    self.driver.disarm();
                    let (handle, bod) = state.list.pop_first()?;
                    if clock::is_after(now, bod.due) {
                        warn!("BOD loaded {} us late", clock::ticks_diff(now, bod.due));
                        self.stats.count_late_load();
                    }

                    if state.is_background_executing() {
                        if let Some(executing) = state.executing.take() {
                            preempted = Some(executing.bod.clone());
                            state.background = Some(Background::started(executing.bod));
                        }
                    }

                    Some(state.begin(bod, Some(handle), false))
                }
                None => {
                    self.driver.disarm();
                    if state.executing.is_some() {
                        return None;
                    }

                    let background = state.background.take()?;
                    Some(state.begin(background.bod, None, true))
                }
            }
        });

        if let Some(bod) = preempted {
            debug!("Background BOD preempted");
            self.call_cancel(&bod);
        }
        if let Some((bod, token)) = loaded {
            self.run(&bod, token);
        }
    }
}
