//! Protocol handlers and BOD owners recording scheduler activity in unit tests

use crate::bb::registry::{ProtocolHandler, ProtocolRegistry};
use crate::bb::ExecToken;
use crate::bod::protocol::{BleChannel, BleOp, BleOpType, ProtocolData, ProtocolId};
use crate::bod::{Bod, ReschedulePolicy};
use crate::clock::Ticks;
use crate::config::RtCfg;
use crate::sch::Scheduler;
use std::sync::Mutex;

/// Callback observed by a [`Recorder`], with the original due time of the BOD
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Event {
    Execute(Ticks),
    Cancel(Ticks),
    End(Ticks),
    Abort(Ticks),
}

/// Context of BODs created in tests
///
/// Each test uses its own static recorder, so tests running in parallel don't see each other.
pub(crate) struct Recorder {
    events: Mutex<Vec<Event>>,
    token: Mutex<Option<ExecToken>>,
}

impl Recorder {
    pub(crate) const fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            token: Mutex::new(None),
        }
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Token of the last BOD executed with this recorder
    pub(crate) fn take_token(&self) -> Option<ExecToken> {
        self.token.lock().unwrap().take()
    }

    /// Number of end and abort callbacks of the BOD requested at `due`
    pub(crate) fn finished(&self, due: Ticks) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == Event::End(due) || **event == Event::Abort(due))
            .count()
    }
}

fn recorder(bod: &Bod) -> &'static Recorder {
    let context = bod.context;
    context
        .downcast_ref::<Recorder>()
        .expect("BOD context is not a Recorder")
}

fn execute(_sched: &Scheduler<'_>, bod: &Bod, token: ExecToken) {
    let recorder = recorder(bod);
    recorder.push(Event::Execute(bod.original_due()));
    *recorder.token.lock().unwrap() = Some(token);
}

fn cancel(_sched: &Scheduler<'_>, bod: &Bod) {
    recorder(bod).push(Event::Cancel(bod.original_due()));
}

pub(crate) fn end(_sched: &Scheduler<'_>, bod: Bod) {
    recorder(&bod).push(Event::End(bod.original_due()));
}

pub(crate) fn abort(_sched: &Scheduler<'_>, bod: Bod) {
    recorder(&bod).push(Event::Abort(bod.original_due()));
}

/// Handler recording execution and cancellation in the BOD's recorder
pub(crate) fn handler() -> ProtocolHandler {
    ProtocolHandler {
        execute,
        cancel,
        start: |_| {},
        stop: |_| {},
    }
}

/// Registry with the recording handler registered for BLE
pub(crate) fn registry() -> ProtocolRegistry {
    let mut registry = ProtocolRegistry::new();
    registry
        .register(ProtocolId::Ble, handler())
        .expect("Empty registry rejected a handler");
    registry
}

/// Configuration with a short scheduler setup delay
pub(crate) fn cfg() -> RtCfg {
    RtCfg {
        sch_setup_delay_us: 10,
        ..RtCfg::default()
    }
}

/// BLE advertising BOD recording its callbacks in `recorder`
pub(crate) fn ble_bod(
    due: Ticks,
    len: u32,
    policy: ReschedulePolicy,
    recorder: &'static Recorder,
) -> Bod {
    let channel = BleChannel::new(37, 0x8e89_bed6, 0x55_5555).expect("Invalid BLE channel");
    let data = ProtocolData::Ble(BleOp {
        channel,
        op_type: BleOpType::Advertising,
    });

    Bod::new(due, data, recorder)
        .with_duration(len, len)
        .with_policy(policy)
        .with_callbacks(end, abort)
}

/// Windows of the pending BODs in the list order
pub(crate) fn pending(sched: &Scheduler<'_>) -> Vec<(Ticks, Ticks)> {
    sched
        .state
        .lock(|state| state.list.iter().map(|(_, bod)| (bod.due, bod.end())).collect())
}
