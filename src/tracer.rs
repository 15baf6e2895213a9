use crate::common::{address::Address, word::Word};
use crate::computation::Log;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CallScheme {
    #[default]
    Call,
    Code,
    Delegate,
    Static,
    Create,
    Create2,
}

#[derive(Debug)]
pub enum EventData {
    Opcode {
        pc: usize,
        byte: u8,
        name: String,
        immediate: Option<Vec<u8>>,
    },
    StorageRead {
        address: Address,
        slot: Word,
        value: Word,
    },
    StorageWrite {
        address: Address,
        slot: Word,
        value: Word,
    },
    Call {
        scheme: CallScheme,
        from: Address,
        to: Address,
        value: Word,
    },
    Created {
        address: Address,
    },
    Halt {
        output: Vec<u8>,
        reverted: bool,
    },
    Log(Log),
}

pub struct Event {
    pub data: EventData,
    pub depth: usize,
    pub reverted: bool,
}

/// Observation seam threaded through every frame. Child frames get a
/// `fork`ed tracer which is `join`ed back when the child halts, so that a
/// reverted subtree's events stay visible but marked.
#[allow(unused_variables)] // default impl ignores all arguments
pub trait EventTracer: Default {
    fn record(&mut self, event: Event) {}
    fn take(&mut self) -> Vec<Event> {
        vec![]
    }
    fn fork(&self) -> Self {
        Self::default()
    }
    fn join(&mut self, mut other: Self, reverted: bool) {
        for mut event in other.take() {
            event.reverted = event.reverted || reverted;
            self.record(event);
        }
    }
}

#[derive(Default)]
pub struct NoopTracer;

impl EventTracer for NoopTracer {}

/// Keeps every event in order; what the test harness and any outer
/// inspection code consume.
#[derive(Default)]
pub struct CollectingTracer {
    events: Vec<Event>,
}

impl EventTracer for CollectingTracer {
    fn record(&mut self, event: Event) {
        self.events.push(event);
    }

    fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
