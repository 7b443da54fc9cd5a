//! Resolution of conflicts between BODs with overlapping windows

use super::list::{BodList, IndexQueue};
use super::stats::SchStats;
use crate::bod::Bod;
use crate::clock::{self, Ticks};
use crate::config::MAX_BODS;
use core::cmp::Ordering;

/// Upper bound of moves of a BOD before it fits in the list
///
/// Each move puts the BOD behind a different window, so a BOD never passes more windows than the
/// list and the executing BOD hold. The bound stops a BOD circling across the clock wraparound.
const MAX_MOVES_PER_BOD: usize = MAX_BODS + 1;

/// Winner of a conflict
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Winner {
    /// The BOD being inserted wins
    New,
    /// The BOD already present in the schedule wins
    Existing,
}

/// What happens to a BOD which lost a conflict
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoserFate {
    /// The BOD is moved right behind the winner
    Move {
        /// New due time of the loser
        due: Ticks,
    },
    /// The BOD is dropped and handed to its abort callback
    Abort,
}

/// Selects the winner of a conflict between `new` and `existing`
///
/// The less flexible policy wins. With equal policies the BOD requested for the earlier time
/// wins, and if both were requested for the same time the existing one wins.
///
/// # Examples
///
/// ```
/// use bb_sched::bod::{Bod, ReschedulePolicy};
/// use bb_sched::sch::conflict::{resolve, Winner};
///
/// let fixed = Bod::new(100, Default::default(), &()).with_duration(50, 50);
/// let moveable = Bod::new(120, Default::default(), &())
///     .with_duration(50, 50)
///     .with_policy(ReschedulePolicy::Moveable);
///
/// assert_eq!(resolve(&fixed, &moveable), Winner::New);
/// assert_eq!(resolve(&moveable, &fixed), Winner::Existing);
/// ```
pub fn resolve(new: &Bod, existing: &Bod) -> Winner {
    match new.policy.cmp(&existing.policy) {
        Ordering::Less => Winner::New,
        Ordering::Greater => Winner::Existing,
        Ordering::Equal => {
            if clock::is_before(new.original_due(), existing.original_due()) {
                Winner::New
            } else {
                Winner::Existing
            }
        }
    }
}

/// Decides the fate of `loser` beaten by a BOD whose window ends at `winner_end`
pub fn loser_fate(loser: &Bod, winner_end: Ticks) -> LoserFate {
    if loser.policy.is_movable() {
        LoserFate::Move { due: winner_end }
    } else {
        LoserFate::Abort
    }
}

/// BODs dropped by an operation, waiting for their abort callbacks
///
/// The callbacks are called only after the scheduler data is unlocked.
pub(crate) struct Aborted {
    bods: [Option<Bod>; MAX_BODS + 1],
    len: usize,
}

impl Aborted {
    const NO_BOD: Option<Bod> = None;

    pub(crate) const fn new() -> Self {
        Self {
            bods: [Self::NO_BOD; MAX_BODS + 1],
            len: 0,
        }
    }

    pub(crate) fn push(&mut self, bod: Bod) {
        debug_assert!(self.len < self.bods.len());
        self.bods[self.len] = Some(bod);
        self.len += 1;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Hands all collected BODs to their abort callbacks, in the order they were dropped
    pub(crate) fn abort_all(self, sched: &super::Scheduler<'_>) {
        for bod in self.bods.into_iter().flatten() {
            bod.abort(sched);
        }
    }
}

/// Result of placing a BOD in the list
pub(crate) struct Placement {
    /// The placed BOD is linked in the list
    pub(crate) placed: bool,
    /// BODs dropped while placing, including the placed one if it was rejected
    pub(crate) aborted: Aborted,
}

/// Window occupied by the executing foreground BOD
#[derive(Clone, Copy)]
pub(crate) struct Window {
    pub(crate) start: Ticks,
    pub(crate) len: Ticks,
}

impl Window {
    pub(crate) fn of(bod: &Bod) -> Self {
        Self {
            start: bod.due,
            len: bod.duration_ticks(),
        }
    }

    /// End of the window. An empty window still occupies its start tick.
    pub(crate) fn end(&self) -> Ticks {
        self.start.wrapping_add(self.len.max(1))
    }

    pub(crate) fn overlaps(&self, bod: &Bod) -> bool {
        clock::windows_overlap(self.start, self.len, bod.due, bod.duration_ticks())
    }
}

/// Finds the end of a window which `bod` overlaps and loses against
fn find_blocker(list: &BodList, executing: Option<Window>, bod: &Bod) -> Option<Ticks> {
    if let Some(window) = executing {
        if window.overlaps(bod) {
            return Some(window.end());
        }
    }

    list.iter()
        .map(|(_, existing)| existing)
        .find(|existing| {
            Window::of(existing).overlaps(bod) && resolve(bod, existing) == Winner::Existing
        })
        .map(|existing| Window::of(existing).end())
}

/// Links the allocated, but unlinked BOD at `index` into the list
///
/// The BOD is first moved behind every window it loses against, or rejected if it cannot be moved.
/// A rejected BOD leaves the list untouched. Once the BOD fits, the BODs it beats are unlinked and
/// placed the same way behind it. Fixed ones among them are dropped.
pub(crate) fn place(
    list: &mut BodList,
    executing: Option<Window>,
    index: u8,
    stats: &SchStats,
) -> Placement {
    let mut placement = Placement {
        placed: false,
        aborted: Aborted::new(),
    };
    let mut pending = IndexQueue::new();
    pending.push(index);

    while let Some(curr) = pending.pop() {
        let mut rejected = false;
        let mut moves = 0;

        while let Some(blocker_end) = find_blocker(list, executing, list.bod(curr)) {
            match loser_fate(list.bod(curr), blocker_end) {
                LoserFate::Move { due } if moves < MAX_MOVES_PER_BOD => {
                    moves += 1;
                    stats.count_move();
                    debug!("BOD moved to {}", due);
                    list.bod_mut(curr).move_to(due);
                }
                LoserFate::Move { .. } => {
                    warn!("BOD could not be placed within {} moves", MAX_MOVES_PER_BOD);
                    rejected = true;
                    break;
                }
                LoserFate::Abort => {
                    rejected = true;
                    break;
                }
            }
        }

        if rejected {
            stats.count_abort();
            if let Some(bod) = list.release(curr) {
                debug!("BOD due at {} aborted by conflict", bod.due);
                placement.aborted.push(bod);
            }
            continue;
        }

        // All overlapping BODs left in the list lose against the current one
        let mut next = list.first_index();
        while let Some(other) = next {
            next = list.next_index(other);
            if Window::of(list.bod(other)).overlaps(list.bod(curr)) {
                list.unlink(other);
                pending.push(other);
            }
        }

        list.link(curr);
        if curr == index {
            placement.placed = true;
        }
    }

    debug_assert!(pending.is_empty());
    placement
}
