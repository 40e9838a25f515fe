// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`FrameLoop`](crate::frame_loop::FrameLoop) calls as subscribers come and
//! go and as ticks are dispatched. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! A sink is installed with
//! [`FrameLoop::set_trace_sink`](crate::frame_loop::FrameLoop::set_trace_sink).
//! When the `trace` feature is **off**, installing is a no-op and every emit
//! site compiles to nothing. When **on**, each emit performs a single `Option`
//! branch before dispatching.
//!
//! Sinks are owned by the loop. To read a sink back after installing it, wrap
//! it in `Rc<RefCell<_>>` and keep a clone; that wrapper implements
//! [`TraceSink`] by forwarding.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;

use crate::frame_loop::{LoopPhase, SubscriptionId};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why the loop changed phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionCause {
    /// A subscriber was added.
    Subscribe,
    /// A subscriber was removed (explicitly or by a one-shot firing).
    Unsubscribe,
    /// [`pause`](crate::frame_loop::FrameLoop::pause) was called.
    Pause,
    /// [`resume`](crate::frame_loop::FrameLoop::resume) was called.
    Resume,
    /// The host fired the outstanding tick.
    TickStart,
    /// A dispatch pass finished with subscribers left and requested the next tick.
    Reschedule,
    /// A dispatch pass finished with no subscribers left.
    Drained,
    /// The host was unavailable or declined the request.
    HostUnavailable,
    /// A subscriber panic unwound out of the dispatch.
    Aborted,
}

/// What happened to a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubscriptionChange {
    /// Added with [`subscribe`](crate::frame_loop::FrameLoop::subscribe).
    Subscribed,
    /// Added with [`once`](crate::frame_loop::FrameLoop::once).
    SubscribedOnce,
    /// Removed from the registry.
    Unsubscribed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the host fires a tick, before any subscriber runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickEvent {
    /// Monotonic dispatch counter, starting at 0.
    pub frame_index: u64,
    /// Timestamp delivered by the host, in milliseconds.
    pub timestamp: f64,
    /// Number of subscribers captured in this tick's snapshot.
    pub subscribers: usize,
}

/// Emitted when a dispatch pass has finished and the loop has settled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DispatchSummary {
    /// Dispatch counter, matching the preceding [`TickEvent`].
    pub frame_index: u64,
    /// Timestamp delivered by the host, in milliseconds.
    pub timestamp: f64,
    /// Callbacks that ran (including ones that panicked).
    pub invoked: usize,
    /// Callbacks that panicked.
    pub panicked: usize,
    /// Subscribers left in the registry after the pass.
    pub remaining: usize,
    /// Whether another tick was requested.
    pub rescheduled: bool,
}

/// Emitted when a subscription is added or removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionEvent {
    /// The subscription concerned.
    pub id: SubscriptionId,
    /// What happened.
    pub change: SubscriptionChange,
    /// Registry size after the change.
    pub subscribers: usize,
}

/// Emitted on every loop phase change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TransitionEvent {
    /// Phase before the change.
    pub from: LoopPhase,
    /// Phase after the change.
    pub to: LoopPhase,
    /// What triggered it.
    pub cause: TransitionCause,
}

/// Emitted when a subscriber panics during dispatch (requires `std`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallbackPanicEvent {
    /// Dispatch counter of the tick.
    pub frame_index: u64,
    /// The subscription whose callback panicked.
    pub id: SubscriptionId,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from a [`FrameLoop`](crate::frame_loop::FrameLoop).
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about. Sinks must not call back into the loop
/// that emitted the event.
pub trait TraceSink {
    /// Called when the host fires a tick.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called after a dispatch pass has settled.
    fn on_dispatch_summary(&mut self, s: &DispatchSummary) {
        _ = s;
    }

    /// Called when a subscription is added or removed.
    fn on_subscription(&mut self, e: &SubscriptionEvent) {
        _ = e;
    }

    /// Called on every phase change.
    fn on_transition(&mut self, e: &TransitionEvent) {
        _ = e;
    }

    /// Called when a subscriber panics during dispatch.
    fn on_callback_panic(&mut self, e: &CallbackPanicEvent) {
        _ = e;
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_tick(&mut self, e: &TickEvent) {
        self.borrow_mut().on_tick(e);
    }

    fn on_dispatch_summary(&mut self, s: &DispatchSummary) {
        self.borrow_mut().on_dispatch_summary(s);
    }

    fn on_subscription(&mut self, e: &SubscriptionEvent) {
        self.borrow_mut().on_subscription(e);
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        self.borrow_mut().on_transition(e);
    }

    fn on_callback_panic(&mut self, e: &CallbackPanicEvent) {
        self.borrow_mut().on_callback_panic(e);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// TraceSlot
// ---------------------------------------------------------------------------

/// Owned, optional sink held by a frame loop.
///
/// When the `trace` feature is **off**, the slot is zero-sized and every
/// method compiles to nothing.
#[derive(Default)]
pub(crate) struct TraceSlot {
    #[cfg(feature = "trace")]
    sink: RefCell<Option<Box<dyn TraceSink>>>,
}

impl TraceSlot {
    #[inline]
    pub(crate) fn install(&self, sink: Box<dyn TraceSink>) {
        #[cfg(feature = "trace")]
        {
            *self.sink.borrow_mut() = Some(sink);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
        }
    }

    #[inline]
    pub(crate) fn clear(&self) {
        #[cfg(feature = "trace")]
        {
            self.sink.borrow_mut().take();
        }
    }

    /// Runs `f` against the installed sink, if any.
    ///
    /// A sink that re-enters its own loop would find the slot busy; such
    /// nested events are dropped instead of panicking on the `RefCell`.
    #[inline]
    pub(crate) fn emit(&self, f: impl FnOnce(&mut dyn TraceSink)) {
        #[cfg(feature = "trace")]
        if let Ok(mut slot) = self.sink.try_borrow_mut()
            && let Some(sink) = slot.as_mut()
        {
            f(&mut **sink);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = f;
        }
    }

    #[inline]
    pub(crate) fn is_installed(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.borrow().is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[derive(Default)]
    struct CountingSink {
        ticks: Vec<u64>,
        transitions: usize,
    }

    impl TraceSink for CountingSink {
        fn on_tick(&mut self, e: &TickEvent) {
            self.ticks.push(e.frame_index);
        }

        fn on_transition(&mut self, _e: &TransitionEvent) {
            self.transitions += 1;
        }
    }

    fn sample_tick() -> TickEvent {
        TickEvent {
            frame_index: 42,
            timestamp: 1000.0,
            subscribers: 3,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_tick(&sample_tick());
        sink.on_transition(&TransitionEvent {
            from: LoopPhase::Idle,
            to: LoopPhase::Running,
            cause: TransitionCause::Subscribe,
        });
        sink.on_callback_panic(&CallbackPanicEvent {
            frame_index: 0,
            id: SubscriptionId(1),
        });
    }

    #[test]
    fn shared_sink_forwards() {
        let shared = Rc::new(RefCell::new(CountingSink::default()));
        let mut handle = Rc::clone(&shared);
        handle.on_tick(&sample_tick());
        handle.on_transition(&TransitionEvent {
            from: LoopPhase::Running,
            to: LoopPhase::Dispatching,
            cause: TransitionCause::TickStart,
        });
        assert_eq!(shared.borrow().ticks, &[42]);
        assert_eq!(shared.borrow().transitions, 1);
    }

    #[test]
    fn empty_slot_does_nothing() {
        let slot = TraceSlot::default();
        assert!(!slot.is_installed(), "fresh slot must be empty");
        slot.emit(|s| s.on_tick(&sample_tick()));
    }

    #[cfg(feature = "trace")]
    #[test]
    fn slot_dispatches_to_installed_sink() {
        let shared = Rc::new(RefCell::new(CountingSink::default()));
        let slot = TraceSlot::default();
        slot.install(Box::new(Rc::clone(&shared)));
        assert!(slot.is_installed(), "sink must be installed");

        slot.emit(|s| s.on_tick(&sample_tick()));
        assert_eq!(shared.borrow().ticks, &[42]);

        slot.clear();
        slot.emit(|s| s.on_tick(&sample_tick()));
        assert_eq!(shared.borrow().ticks.len(), 1, "cleared slot must not emit");
    }
}
