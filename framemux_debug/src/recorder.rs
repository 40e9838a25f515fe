// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory event recording.
//!
//! [`RecorderSink`] implements [`TraceSink`] and appends every event to a
//! `Vec<RecordedEvent>` in arrival order. Install it behind an
//! `Rc<RefCell<_>>` to read the log while the loop keeps running.

use framemux_core::trace::{
    CallbackPanicEvent, DispatchSummary, SubscriptionEvent, TickEvent, TraceSink, TransitionEvent,
};

/// A single recorded trace event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A tick started.
    Tick(TickEvent),
    /// A dispatch pass settled.
    DispatchSummary(DispatchSummary),
    /// A subscriber was added or removed.
    Subscription(SubscriptionEvent),
    /// The loop changed phase.
    Transition(TransitionEvent),
    /// A subscriber panicked.
    CallbackPanic(CallbackPanicEvent),
}

/// A [`TraceSink`] that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecorderSink {
    events: Vec<RecordedEvent>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// Consumes the recorder and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<RecordedEvent> {
        self.events
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl TraceSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.events.push(RecordedEvent::Tick(*e));
    }

    fn on_dispatch_summary(&mut self, s: &DispatchSummary) {
        self.events.push(RecordedEvent::DispatchSummary(*s));
    }

    fn on_subscription(&mut self, e: &SubscriptionEvent) {
        self.events.push(RecordedEvent::Subscription(*e));
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.events.push(RecordedEvent::Transition(*e));
    }

    fn on_callback_panic(&mut self, e: &CallbackPanicEvent) {
        self.events.push(RecordedEvent::CallbackPanic(*e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use framemux_core::trace::{SubscriptionChange, TransitionCause};
    use framemux_core::{FrameLoop, FrameLoopConfig, LoopPhase, ManualHost, SubscriptionId};

    #[test]
    fn records_a_full_tick() {
        let host = ManualHost::new();
        let frames = FrameLoop::new(host.clone());
        let rec = Rc::new(RefCell::new(RecorderSink::new()));
        frames.set_trace_sink(Rc::clone(&rec));

        let sub = frames.subscribe(|_| {});
        host.tick(16.0);
        sub.unsubscribe();

        let rec = rec.borrow();
        let events = rec.events();
        assert_eq!(
            events[0],
            RecordedEvent::Subscription(SubscriptionEvent {
                id: SubscriptionId(1),
                change: SubscriptionChange::Subscribed,
                subscribers: 1,
            })
        );
        assert_eq!(
            events[1],
            RecordedEvent::Transition(TransitionEvent {
                from: LoopPhase::Idle,
                to: LoopPhase::Running,
                cause: TransitionCause::Subscribe,
            })
        );
        assert!(
            matches!(events[2], RecordedEvent::Tick(TickEvent { frame_index: 0, subscribers: 1, .. })),
            "got: {:?}",
            events[2]
        );
        assert!(
            matches!(
                events[3],
                RecordedEvent::Transition(TransitionEvent {
                    to: LoopPhase::Dispatching,
                    ..
                })
            ),
            "got: {:?}",
            events[3]
        );
        assert!(
            matches!(
                events.last(),
                Some(RecordedEvent::Transition(TransitionEvent {
                    to: LoopPhase::Idle,
                    ..
                }))
            ),
            "got: {events:?}"
        );
    }

    #[test]
    fn records_isolated_panics() {
        let host = ManualHost::new();
        let frames = FrameLoop::with_config(host.clone(), FrameLoopConfig::isolated());
        let rec = Rc::new(RefCell::new(RecorderSink::new()));
        frames.set_trace_sink(Rc::clone(&rec));

        let bad = frames.subscribe(|_| panic!("subscriber failure"));
        frames.subscribe(|_| {});
        host.tick(1.0);

        let rec = rec.borrow();
        let panics: Vec<_> = rec
            .events()
            .iter()
            .filter_map(|e| match e {
                RecordedEvent::CallbackPanic(p) => Some(p.id),
                _ => None,
            })
            .collect();
        assert_eq!(panics, [bad.id()]);

        let summary = rec.events().iter().find_map(|e| match e {
            RecordedEvent::DispatchSummary(s) => Some(*s),
            _ => None,
        });
        let summary = summary.expect("dispatch summary recorded");
        assert_eq!(summary.invoked, 2);
        assert_eq!(summary.panicked, 1);
        assert!(summary.rescheduled, "loop must keep running");
    }

    #[test]
    fn clear_discards_events() {
        let mut rec = RecorderSink::new();
        rec.on_tick(&TickEvent {
            frame_index: 0,
            timestamp: 0.0,
            subscribers: 0,
        });
        assert_eq!(rec.events().len(), 1);
        rec.clear();
        assert!(rec.events().is_empty());
        assert!(rec.into_events().is_empty());
    }
}
