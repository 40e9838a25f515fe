// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A host driven by explicit [`tick`](ManualHost::tick) calls.
//!
//! [`ManualHost`] queues requested callbacks and fires them only when told
//! to. It is the test double for a platform frame clock, and doubles as a
//! stepping host for headless simulations that still want frame callbacks.
//!
//! The handle is cheaply clonable; clones share one queue, so a test can keep
//! a clone while the [`FrameLoop`](crate::frame_loop::FrameLoop) owns another.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::host::{FrameHost, TickCallback};

/// Token returned by [`ManualHost`] for each request.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManualToken(pub u32);

impl fmt::Debug for ManualToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ManualToken({})", self.0)
    }
}

/// A [`FrameHost`] whose ticks fire only on [`tick`](Self::tick).
#[derive(Clone)]
pub struct ManualHost {
    inner: Rc<ManualState>,
}

struct ManualState {
    queue: RefCell<BTreeMap<u32, TickCallback>>,
    last_id: Cell<u32>,
    available: Cell<bool>,
    requested: Cell<u64>,
    cancelled: Cell<u64>,
}

impl ManualHost {
    /// Creates an available host with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ManualState {
                queue: RefCell::new(BTreeMap::new()),
                last_id: Cell::new(0),
                available: Cell::new(true),
                requested: Cell::new(0),
                cancelled: Cell::new(0),
            }),
        }
    }

    /// Creates a host that reports itself unavailable.
    #[must_use]
    pub fn unavailable() -> Self {
        let host = Self::new();
        host.set_available(false);
        host
    }

    /// Changes what [`is_available`](FrameHost::is_available) reports.
    ///
    /// Already queued callbacks are kept and still fire on [`tick`](Self::tick).
    pub fn set_available(&self, available: bool) {
        self.inner.available.set(available);
    }

    /// Number of requests waiting to fire.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.queue.borrow().len()
    }

    /// Total number of requests accepted since creation.
    #[must_use]
    pub fn requested_count(&self) -> u64 {
        self.inner.requested.get()
    }

    /// Total number of pending requests removed by `cancel_tick`.
    #[must_use]
    pub fn cancelled_count(&self) -> u64 {
        self.inner.cancelled.get()
    }

    /// Fires every queued callback with `timestamp`, in request order.
    ///
    /// The queue is drained before the first callback runs, so requests made
    /// by those callbacks wait for the next `tick`. Returns the number of
    /// callbacks fired.
    pub fn tick(&self, timestamp: f64) -> usize {
        let due = core::mem::take(&mut *self.inner.queue.borrow_mut());
        let fired = due.len();
        for callback in due.into_values() {
            callback(timestamp);
        }
        fired
    }
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for ManualHost {
    type Token = ManualToken;

    fn is_available(&self) -> bool {
        self.inner.available.get()
    }

    fn request_tick(&self, callback: TickCallback) -> Option<ManualToken> {
        if !self.is_available() {
            return None;
        }
        let id = self.inner.last_id.get() + 1;
        self.inner.last_id.set(id);
        self.inner.requested.set(self.inner.requested.get() + 1);
        self.inner.queue.borrow_mut().insert(id, callback);
        Some(ManualToken(id))
    }

    fn cancel_tick(&self, token: ManualToken) {
        if self.inner.queue.borrow_mut().remove(&token.0).is_some() {
            self.inner.cancelled.set(self.inner.cancelled.get() + 1);
        }
    }
}

impl fmt::Debug for ManualHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualHost")
            .field("pending", &self.pending_count())
            .field("available", &self.inner.available.get())
            .field("requested", &self.inner.requested.get())
            .field("cancelled", &self.inner.cancelled.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;
    use alloc::vec::Vec;

    #[test]
    fn tick_fires_in_request_order_and_drains() {
        let host = ManualHost::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for tag in 0..3 {
            let seen = Rc::clone(&seen);
            host.request_tick(Box::new(move |t| seen.borrow_mut().push((tag, t))));
        }
        assert_eq!(host.pending_count(), 3);

        assert_eq!(host.tick(16.5), 3);
        assert_eq!(*seen.borrow(), [(0, 16.5), (1, 16.5), (2, 16.5)]);
        assert_eq!(host.pending_count(), 0);
        assert_eq!(host.tick(33.0), 0, "drained queue must not refire");
    }

    #[test]
    fn requests_from_inside_a_tick_wait_for_the_next_one() {
        let host = ManualHost::new();
        let fired = Rc::new(Cell::new(0));
        let inner_host = host.clone();
        let inner_fired = Rc::clone(&fired);
        host.request_tick(Box::new(move |_| {
            inner_fired.set(inner_fired.get() + 1);
            let again = Rc::clone(&inner_fired);
            inner_host.request_tick(Box::new(move |_| again.set(again.get() + 1)));
        }));

        host.tick(1.0);
        assert_eq!(fired.get(), 1);
        assert_eq!(host.pending_count(), 1);
        host.tick(2.0);
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn cancel_is_noop_after_fire() {
        let host = ManualHost::new();
        let token = host.request_tick(Box::new(|_| {})).unwrap();
        host.tick(0.0);
        host.cancel_tick(token);
        assert_eq!(host.cancelled_count(), 0);

        let token = host.request_tick(Box::new(|_| {})).unwrap();
        host.cancel_tick(token);
        host.cancel_tick(token);
        assert_eq!(host.cancelled_count(), 1);
        assert_eq!(host.pending_count(), 0);
    }

    #[test]
    fn unavailable_host_declines() {
        let host = ManualHost::unavailable();
        assert!(host.request_tick(Box::new(|_| {})).is_none());
        assert_eq!(host.requested_count(), 0);
        host.set_available(true);
        assert!(host.request_tick(Box::new(|_| {})).is_some());
    }
}
