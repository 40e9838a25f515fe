// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for platform frame clocks.
//!
//! A *host* is whatever the platform offers for "call me back on the next
//! frame": `requestAnimationFrame` in a browser, a display-link callback on
//! Apple platforms, a compositor frame callback on Wayland. The
//! [`FrameLoop`](crate::frame_loop::FrameLoop) only needs three things from
//! it, captured by [`FrameHost`]:
//!
//! - request one tick and get a token back,
//! - cancel a pending tick by token,
//! - report whether the facility exists at all right now.
//!
//! Availability is a first-class answer rather than something detected by
//! probing globals: headless contexts pass [`HeadlessHost`] and the loop simply
//! never schedules anything.

use alloc::boxed::Box;
use core::fmt;

/// One-shot callback handed to [`FrameHost::request_tick`].
///
/// The argument is the frame timestamp in milliseconds, as delivered by the
/// platform (e.g. a `DOMHighResTimeStamp`). It is forwarded to subscribers
/// unmodified.
pub type TickCallback = Box<dyn FnOnce(f64)>;

/// A platform facility that runs a callback once on an upcoming frame.
///
/// # Contract
///
/// - [`request_tick`](Self::request_tick) must not invoke the callback
///   synchronously; it runs later, from the host's own event loop.
/// - [`cancel_tick`](Self::cancel_tick) must be a no-op for tokens whose tick
///   already fired or was already cancelled.
/// - A host may become unavailable (or available) at any time;
///   [`is_available`](Self::is_available) is queried before every request.
pub trait FrameHost {
    /// Opaque handle identifying one pending request.
    type Token: Copy + PartialEq + fmt::Debug;

    /// Returns `true` if ticks can currently be requested.
    fn is_available(&self) -> bool;

    /// Schedules `callback` to run once on an upcoming frame.
    ///
    /// Returns `None` if the host declined the request; the caller treats that
    /// like an unavailable host.
    fn request_tick(&self, callback: TickCallback) -> Option<Self::Token>;

    /// Cancels a pending request.
    fn cancel_tick(&self, token: Self::Token);
}

/// A host for contexts with no frame clock (servers, CLIs, SSR).
///
/// Always unavailable. A [`FrameLoop`](crate::frame_loop::FrameLoop) built on
/// it still records subscriptions, so subscriber counts stay accurate, but it
/// never requests a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeadlessHost;

impl FrameHost for HeadlessHost {
    type Token = ();

    fn is_available(&self) -> bool {
        false
    }

    fn request_tick(&self, callback: TickCallback) -> Option<()> {
        _ = callback;
        None
    }

    fn cancel_tick(&self, token: ()) {
        _ = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_host_declines_requests() {
        let host = HeadlessHost;
        assert!(!host.is_available(), "headless host must report unavailable");
        assert_eq!(
            host.request_tick(Box::new(|_| {})),
            None,
            "headless host must decline every request"
        );
        host.cancel_tick(());
    }
}
