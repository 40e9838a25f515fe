// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame-loop multiplexer.
//!
//! A [`FrameLoop`] serves any number of subscribers from a single outstanding
//! host request. It requests the first tick when the first subscriber
//! arrives, re-requests after every tick while subscribers remain, and cancels
//! the pending request when the last one leaves.
//!
//! # Phases
//!
//! ```text
//!            subscribe / resume                 tick fires
//!   Idle ─────────────────────────► Running ─────────────────► Dispatching
//!    ▲  ◄── last unsubscribe ───────  │  ▲  ◄── subscribers left ──┘ │
//!    │                                │  └──────── resume ───┐       │
//!    │                          pause ▼                      │       │ pause
//!    └─── pass ends empty ───────  Paused ◄──────────────────┴───────┘
//! ```
//!
//! [`LoopPhase::Running`] is the only phase in which a host token is
//! outstanding. Paused is sticky while subscribers remain: subscribing while
//! paused records the subscriber but requests nothing until
//! [`FrameLoop::resume`]. When the last subscriber leaves a paused loop, the
//! pause is released and the loop goes idle, so the next subscribe starts it.
//!
//! # Dispatch
//!
//! Each tick snapshots the registry before the first callback runs. Every
//! subscriber in the snapshot is called exactly once with the tick's
//! timestamp, whatever earlier callbacks in the same pass subscribe or
//! unsubscribe. Subscribers added during the pass first run on the next tick.
//! No registry borrow is held while user code runs, so callbacks may freely
//! call back into the loop.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::config::FrameLoopConfig;
#[cfg(feature = "std")]
use crate::config::PanicPolicy;
use crate::host::FrameHost;
use crate::trace::{
    CallbackPanicEvent, DispatchSummary, SubscriptionChange, SubscriptionEvent, TickEvent,
    TraceSink, TraceSlot, TransitionCause, TransitionEvent,
};

/// Identifies one subscription within a [`FrameLoop`].
///
/// Ids are allocated in increasing order starting at 1 and are never reused
/// by the same loop.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// Observable lifecycle phase of a [`FrameLoop`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopPhase {
    /// No tick requested.
    Idle,
    /// Exactly one tick requested from the host.
    Running,
    /// A tick is being delivered to subscribers.
    Dispatching,
    /// Explicitly paused; no tick requested until resumed.
    Paused,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum LoopState<T> {
    Idle,
    Running { token: T, generation: u64 },
    Dispatching,
    Paused,
}

impl<T> LoopState<T> {
    const fn phase(&self) -> LoopPhase {
        match self {
            Self::Idle => LoopPhase::Idle,
            Self::Running { .. } => LoopPhase::Running,
            Self::Dispatching => LoopPhase::Dispatching,
            Self::Paused => LoopPhase::Paused,
        }
    }
}

struct Listener {
    callback: RefCell<Box<dyn FnMut(f64)>>,
    once: bool,
}

#[cfg(feature = "std")]
type PanicPayload = Box<dyn core::any::Any + Send + 'static>;

// Without `std` panics are not caught, so there is never a payload.
#[cfg(not(feature = "std"))]
type PanicPayload = ();

struct Shared<H: FrameHost + 'static> {
    host: H,
    config: FrameLoopConfig,
    state: Cell<LoopState<H::Token>>,
    registry: RefCell<BTreeMap<SubscriptionId, Rc<Listener>>>,
    next_id: Cell<u64>,
    /// Bumped on every host request; a tick only dispatches if it carries the
    /// current generation.
    generation: Cell<u64>,
    frames: Cell<u64>,
    trace: TraceSlot,
}

impl<H: FrameHost + 'static> Shared<H> {
    fn transition(&self, to: LoopState<H::Token>, cause: TransitionCause) {
        let from = self.state.replace(to).phase();
        let to = to.phase();
        if from != to {
            self.trace
                .emit(|s| s.on_transition(&TransitionEvent { from, to, cause }));
        }
    }

    fn subscriber_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Asks the host for a tick bound to a fresh generation.
    fn request(self: &Rc<Self>) -> Option<LoopState<H::Token>> {
        if !self.host.is_available() {
            return None;
        }
        let generation = self.generation.get().wrapping_add(1);
        self.generation.set(generation);
        let weak = Rc::downgrade(self);
        let token = self.host.request_tick(Box::new(move |timestamp| {
            if let Some(shared) = weak.upgrade() {
                shared.dispatch(generation, timestamp);
            }
        }))?;
        Some(LoopState::Running { token, generation })
    }

    /// Moves to Running if there is anything to run, Idle otherwise.
    fn start(self: &Rc<Self>, cause: TransitionCause) {
        if self.registry.borrow().is_empty() {
            self.transition(LoopState::Idle, cause);
            return;
        }
        match self.request() {
            Some(running) => self.transition(running, cause),
            None => self.transition(LoopState::Idle, TransitionCause::HostUnavailable),
        }
    }

    fn insert(self: &Rc<Self>, callback: Box<dyn FnMut(f64)>, once: bool) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let subscribers = {
            let mut registry = self.registry.borrow_mut();
            registry.insert(
                id,
                Rc::new(Listener {
                    callback: RefCell::new(callback),
                    once,
                }),
            );
            registry.len()
        };
        let change = if once {
            SubscriptionChange::SubscribedOnce
        } else {
            SubscriptionChange::Subscribed
        };
        self.trace.emit(|s| {
            s.on_subscription(&SubscriptionEvent {
                id,
                change,
                subscribers,
            });
        });

        if matches!(self.state.get(), LoopState::Idle) {
            self.start(TransitionCause::Subscribe);
        }
        id
    }

    /// Removes `id` from the registry. Returns `false` if it was not present.
    fn remove(&self, id: SubscriptionId) -> bool {
        let (removed, subscribers) = {
            let mut registry = self.registry.borrow_mut();
            let removed = registry.remove(&id);
            (removed, registry.len())
        };
        let Some(removed) = removed else {
            return false;
        };

        self.trace.emit(|s| {
            s.on_subscription(&SubscriptionEvent {
                id,
                change: SubscriptionChange::Unsubscribed,
                subscribers,
            });
        });

        if subscribers == 0 {
            match self.state.get() {
                LoopState::Running { token, .. } => {
                    self.host.cancel_tick(token);
                    self.transition(LoopState::Idle, TransitionCause::Unsubscribe);
                }
                // A pause holds subscribers; with none left there is nothing
                // to hold, and the next subscribe starts the loop again.
                LoopState::Paused => {
                    self.transition(LoopState::Idle, TransitionCause::Unsubscribe);
                }
                LoopState::Idle | LoopState::Dispatching => {}
            }
        }
        // Dropped last, outside the borrow: the callback may own handles that
        // unsubscribe on drop.
        drop(removed);
        true
    }

    fn pause(&self) {
        match self.state.get() {
            LoopState::Running { token, .. } => {
                self.host.cancel_tick(token);
                self.transition(LoopState::Paused, TransitionCause::Pause);
            }
            LoopState::Dispatching => self.transition(LoopState::Paused, TransitionCause::Pause),
            LoopState::Idle | LoopState::Paused => {}
        }
    }

    fn resume(self: &Rc<Self>) {
        match self.state.get() {
            LoopState::Idle | LoopState::Paused => self.start(TransitionCause::Resume),
            LoopState::Running { .. } | LoopState::Dispatching => {}
        }
    }

    fn dispatch(self: &Rc<Self>, generation: u64, timestamp: f64) {
        match self.state.get() {
            LoopState::Running { generation: g, .. } if g == generation => {}
            _ => return,
        }
        let frame_index = self.frames.get();
        self.frames.set(frame_index + 1);

        let snapshot: Vec<(SubscriptionId, Rc<Listener>)> = self
            .registry
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();
        self.trace.emit(|s| {
            s.on_tick(&TickEvent {
                frame_index,
                timestamp,
                subscribers: snapshot.len(),
            });
        });
        self.transition(LoopState::Dispatching, TransitionCause::TickStart);

        let mut guard = DispatchGuard {
            shared: self,
            armed: true,
        };
        let mut invoked = 0;
        let mut panicked = 0;
        let mut first_panic: Option<PanicPayload> = None;
        for (id, listener) in &snapshot {
            if listener.once {
                self.remove(*id);
            }
            invoked += 1;
            if let Err(payload) = invoke(listener, timestamp) {
                panicked += 1;
                let id = *id;
                self.trace
                    .emit(|s| s.on_callback_panic(&CallbackPanicEvent { frame_index, id }));
                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }
        }
        guard.armed = false;

        let rescheduled = self.settle();
        let remaining = self.subscriber_count();
        self.trace.emit(|s| {
            s.on_dispatch_summary(&DispatchSummary {
                frame_index,
                timestamp,
                invoked,
                panicked,
                remaining,
                rescheduled,
            });
        });

        #[cfg(feature = "std")]
        if self.config.panic_policy == PanicPolicy::Rethrow
            && let Some(payload) = first_panic
        {
            drop(snapshot);
            std::panic::resume_unwind(payload);
        }
        #[cfg(not(feature = "std"))]
        {
            _ = first_panic;
        }
    }

    /// Decides what follows a dispatch pass. Returns `true` if a tick is
    /// outstanding afterwards.
    fn settle(self: &Rc<Self>) -> bool {
        match self.state.get() {
            LoopState::Dispatching => {
                if self.registry.borrow().is_empty() {
                    self.transition(LoopState::Idle, TransitionCause::Drained);
                    return false;
                }
                match self.request() {
                    Some(running) => {
                        self.transition(running, TransitionCause::Reschedule);
                        true
                    }
                    None => {
                        self.transition(LoopState::Idle, TransitionCause::HostUnavailable);
                        false
                    }
                }
            }
            // Paused from inside the pass, then possibly resumed again.
            LoopState::Running { .. } => true,
            LoopState::Paused if self.registry.borrow().is_empty() => {
                self.transition(LoopState::Idle, TransitionCause::Drained);
                false
            }
            LoopState::Idle | LoopState::Paused => false,
        }
    }
}

impl<H: FrameHost + 'static> Drop for Shared<H> {
    fn drop(&mut self) {
        if let LoopState::Running { token, .. } = self.state.get() {
            self.host.cancel_tick(token);
        }
    }
}

/// Returns the loop to Idle if a panic unwinds out of a dispatch pass.
struct DispatchGuard<'a, H: FrameHost + 'static> {
    shared: &'a Shared<H>,
    armed: bool,
}

impl<H: FrameHost + 'static> Drop for DispatchGuard<'_, H> {
    fn drop(&mut self) {
        if self.armed
            && matches!(
                self.shared.state.get(),
                LoopState::Dispatching | LoopState::Paused
            )
        {
            self.shared
                .transition(LoopState::Idle, TransitionCause::Aborted);
        }
    }
}

fn invoke(listener: &Listener, timestamp: f64) -> Result<(), PanicPayload> {
    // Only busy if the callback is already on the stack; it has had its call.
    let Ok(mut callback) = listener.callback.try_borrow_mut() else {
        return Ok(());
    };
    #[cfg(feature = "std")]
    {
        std::panic::catch_unwind(core::panic::AssertUnwindSafe(|| {
            (&mut **callback)(timestamp);
        }))
    }
    #[cfg(not(feature = "std"))]
    {
        (&mut **callback)(timestamp);
        Ok(())
    }
}

trait Unsubscribe {
    fn unsubscribe(&self, id: SubscriptionId);
}

impl<H: FrameHost + 'static> Unsubscribe for Shared<H> {
    fn unsubscribe(&self, id: SubscriptionId) {
        self.remove(id);
    }
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

/// Multiplexes per-frame subscribers onto one host tick request.
///
/// Create one per display surface at wiring time and hand clones to whatever
/// needs frame callbacks; clones share the same registry and host request.
///
/// ```
/// use framemux_core::{FrameLoop, ManualHost};
///
/// let host = ManualHost::new();
/// let frames = FrameLoop::new(host.clone());
///
/// let a = frames.subscribe(|t| assert_eq!(t, 16.0));
/// let _b = frames.subscribe(|t| assert_eq!(t, 16.0));
/// assert_eq!(host.pending_count(), 1);
///
/// host.tick(16.0);
/// a.unsubscribe();
/// assert_eq!(frames.subscriber_count(), 1);
/// ```
///
/// A callback that captures a clone of its own `FrameLoop` keeps the loop
/// alive until that callback is unsubscribed.
pub struct FrameLoop<H: FrameHost + 'static> {
    shared: Rc<Shared<H>>,
}

impl<H: FrameHost + 'static> FrameLoop<H> {
    /// Creates an idle loop on `host` with the default configuration.
    #[must_use]
    pub fn new(host: H) -> Self {
        Self::with_config(host, FrameLoopConfig::new())
    }

    /// Creates an idle (or paused, see [`FrameLoopConfig::start_paused`]) loop.
    #[must_use]
    pub fn with_config(host: H, config: FrameLoopConfig) -> Self {
        let state = if config.start_paused {
            LoopState::Paused
        } else {
            LoopState::Idle
        };
        Self {
            shared: Rc::new(Shared {
                host,
                config,
                state: Cell::new(state),
                registry: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(1),
                generation: Cell::new(0),
                frames: Cell::new(0),
                trace: TraceSlot::default(),
            }),
        }
    }

    /// Registers `callback` to run on every tick until unsubscribed.
    ///
    /// Starts the loop if it is idle and the host is available. Dropping the
    /// returned handle does **not** unsubscribe; use
    /// [`Subscription::into_guard`] for that.
    pub fn subscribe(&self, callback: impl FnMut(f64) + 'static) -> Subscription {
        let id = self.shared.insert(Box::new(callback), false);
        let owner = Rc::downgrade(&self.shared);
        let owner: Weak<dyn Unsubscribe> = owner;
        Subscription {
            id,
            owner,
            active: Cell::new(true),
        }
    }

    /// Registers `callback` to run on the next tick only.
    ///
    /// The subscription is removed before `callback` runs, so the callback
    /// observes a subscriber count that no longer includes itself.
    pub fn once(&self, callback: impl FnOnce(f64) + 'static) {
        let mut callback = Some(callback);
        self.shared.insert(
            Box::new(move |timestamp| {
                if let Some(callback) = callback.take() {
                    callback(timestamp);
                }
            }),
            true,
        );
    }

    /// Cancels the pending tick and stays paused until [`resume`](Self::resume)
    /// or until the last subscriber leaves.
    ///
    /// Subscriptions are kept. No-op if nothing is scheduled. Called from a
    /// subscriber during dispatch, it stops the loop from rescheduling at the
    /// end of that tick.
    pub fn pause(&self) {
        self.shared.pause();
    }

    /// Requests a tick if there are subscribers, none is pending, and the host
    /// is available. Otherwise a no-op (a paused loop with no host becomes
    /// idle).
    pub fn resume(&self) {
        self.shared.resume();
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscriber_count()
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> LoopPhase {
        self.shared.state.get().phase()
    }

    /// Returns `true` if a tick is pending or being dispatched.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.phase(), LoopPhase::Running | LoopPhase::Dispatching)
    }

    /// Returns `true` if [`pause`](Self::pause) is in effect.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.phase() == LoopPhase::Paused
    }

    /// Number of ticks dispatched so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.shared.frames.get()
    }

    /// The host this loop schedules on.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.shared.host
    }

    /// The configuration this loop was built with.
    #[must_use]
    pub fn config(&self) -> FrameLoopConfig {
        self.shared.config
    }

    /// Installs `sink` to receive trace events, replacing any previous sink.
    ///
    /// A no-op unless the `trace` feature is enabled.
    pub fn set_trace_sink(&self, sink: impl TraceSink + 'static) {
        self.shared.trace.install(Box::new(sink));
    }

    /// Removes the installed trace sink, if any.
    pub fn clear_trace_sink(&self) {
        self.shared.trace.clear();
    }

    /// Returns `true` if a trace sink is installed.
    #[must_use]
    pub fn has_trace_sink(&self) -> bool {
        self.shared.trace.is_installed()
    }
}

impl<H: FrameHost + 'static> Clone for FrameLoop<H> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<H: FrameHost + 'static> fmt::Debug for FrameLoop<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameLoop")
            .field("phase", &self.phase())
            .field("subscribers", &self.subscriber_count())
            .field("frame_count", &self.frame_count())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Subscription handles
// ---------------------------------------------------------------------------

/// Handle to one registered subscriber.
///
/// [`unsubscribe`](Self::unsubscribe) is idempotent and never panics, even
/// after the [`FrameLoop`] itself has been dropped.
pub struct Subscription {
    id: SubscriptionId,
    owner: Weak<dyn Unsubscribe>,
    active: Cell<bool>,
}

impl Subscription {
    /// The id of this subscription.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `true` until this handle unsubscribes or its loop is dropped.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.get() && self.owner.strong_count() > 0
    }

    /// Removes the subscriber. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            owner.unsubscribe(self.id);
        }
    }

    /// Converts this handle into one that unsubscribes when dropped.
    #[must_use]
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard { subscription: self }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// A [`Subscription`] that unsubscribes when dropped.
#[derive(Debug)]
pub struct SubscriptionGuard {
    subscription: Subscription,
}

impl SubscriptionGuard {
    /// The id of the guarded subscription.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    /// Returns `true` while the guarded subscriber is registered.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscription.is_active()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
