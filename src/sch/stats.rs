//! Scheduler statistics

use crate::bod::protocol::ProtocolId;
use crate::config::BB_PROT_NUM;
use core::sync::atomic::{AtomicU32, Ordering};

/// Counters updated by the scheduler, readable from any context
pub struct SchStats {
    late_loads: AtomicU32,
    conflict_aborts: AtomicU32,
    conflict_moves: AtomicU32,
    executed: [AtomicU32; BB_PROT_NUM],
}

/// Copy of the scheduler counters taken at one instant
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchStatsSnapshot {
    /// BODs handed to their protocol after their due time
    pub late_loads: u32,
    /// BODs dropped because of conflicts
    pub conflict_aborts: u32,
    /// Due time changes caused by conflicts
    pub conflict_moves: u32,
    /// Executed BODs, indexed with [`ProtocolId::index`]
    pub executed: [u32; BB_PROT_NUM],
}

impl SchStats {
    pub(crate) fn new() -> Self {
        Self {
            late_loads: AtomicU32::new(0),
            conflict_aborts: AtomicU32::new(0),
            conflict_moves: AtomicU32::new(0),
            // Magic number, because arr! requires a literal. Keep it equal to BB_PROT_NUM
            executed: arr_macro::arr![AtomicU32::new(0); 4],
        }
    }

    pub(crate) fn count_late_load(&self) {
        self.late_loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_abort(&self) {
        self.conflict_aborts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_move(&self) {
        self.conflict_moves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_executed(&self, id: ProtocolId) {
        self.executed[id.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> SchStatsSnapshot {
        let mut executed = [0; BB_PROT_NUM];
        for (value, counter) in executed.iter_mut().zip(self.executed.iter()) {
            *value = counter.load(Ordering::Relaxed);
        }

        SchStatsSnapshot {
            late_loads: self.late_loads.load(Ordering::Relaxed),
            conflict_aborts: self.conflict_aborts.load(Ordering::Relaxed),
            conflict_moves: self.conflict_moves.load(Ordering::Relaxed),
            executed,
        }
    }

    pub(crate) fn reset(&self) {
        self.late_loads.store(0, Ordering::Relaxed);
        self.conflict_aborts.store(0, Ordering::Relaxed);
        self.conflict_moves.store(0, Ordering::Relaxed);
        for counter in self.executed.iter() {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
