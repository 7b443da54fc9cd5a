//! Search of free gaps between occupied windows

use super::conflict::Window;
use crate::clock::{self, Ticks};
use crate::config::MAX_BODS;

/// Direction of the search
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Direction {
    /// Earliest start in the range
    Early,
    /// Latest start in the range
    Late,
}

/// Windows of all pending BODs and the executing one
pub(crate) struct Occupied {
    windows: [Window; MAX_BODS + 1],
    len: usize,
}

impl Occupied {
    pub(crate) fn new() -> Self {
        Self {
            windows: [Window { start: 0, len: 0 }; MAX_BODS + 1],
            len: 0,
        }
    }

    pub(crate) fn push(&mut self, window: Window) {
        debug_assert!(self.len < self.windows.len());
        self.windows[self.len] = window;
        self.len += 1;
    }

    fn as_slice(&self) -> &[Window] {
        &self.windows[..self.len]
    }

    fn overlapping(&self, start: Ticks, len: Ticks) -> Option<&Window> {
        self.as_slice()
            .iter()
            .find(|window| clock::windows_overlap(window.start, window.len, start, len))
    }

    /// Finds a start in range `[earliest, latest]` for which `[start, start + len)` is free
    ///
    /// An empty `len` is searched as a single tick, so the found start is never inside an occupied
    /// window.
    pub(crate) fn find(
        &self,
        earliest: Ticks,
        latest: Ticks,
        len: Ticks,
        direction: Direction,
    ) -> Option<Ticks> {
        let len = len.max(1);
        let mut start = match direction {
            Direction::Early => earliest,
            Direction::Late => latest,
        };

        // Each step leaves one window behind, so one more step than windows is enough
        for _ in 0..=self.len {
            if clock::is_before(start, earliest) || clock::is_after(start, latest) {
                return None;
            }

            match self.overlapping(start, len) {
                None => return Some(start),
                Some(window) => {
                    start = match direction {
                        Direction::Early => window.end(),
                        Direction::Late => window.start.wrapping_sub(len),
                    }
                }
            }
        }

        None
    }

    /// Start of the first window at or after `start`
    pub(crate) fn next_start(&self, start: Ticks) -> Option<Ticks> {
        self.as_slice()
            .iter()
            .filter(|window| !clock::is_before(window.start, start))
            .map(|window| window.start)
            .reduce(|first, other| {
                if clock::is_before(other, first) {
                    other
                } else {
                    first
                }
            })
    }
}
