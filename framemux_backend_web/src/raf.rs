// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `requestAnimationFrame` host.
//!
//! [`RafHost`] implements [`FrameHost`] on top of the browser's
//! `window.requestAnimationFrame` / `cancelAnimationFrame`. Each tick receives
//! a [`DOMHighResTimeStamp`][mdn] (milliseconds since the time origin), passed
//! through to subscribers unchanged.
//!
//! The host registers one persistent JS closure and keeps the pending Rust
//! callback in a slot beside it, so no JS closure is allocated per frame. A
//! [`FrameLoop`](framemux_core::FrameLoop) never has more than one request
//! outstanding, which is all the slot holds; a new request replaces (and
//! cancels) an older one.
//!
//! [mdn]: https://developer.mozilla.org/en-US/docs/Web/API/DOMHighResTimeStamp

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;

use framemux_core::host::{FrameHost, TickCallback};

/// Token for one pending `requestAnimationFrame` call (the browser's request id).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RafToken(pub i32);

impl fmt::Debug for RafToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RafToken({})", self.0)
    }
}

type RafClosure = Closure<dyn FnMut(f64)>;

/// A [`FrameHost`] backed by `window.requestAnimationFrame`.
///
/// Available when a `Window` exists. Off the main thread, in workers without
/// a window, or on non-wasm targets it reports unavailable and every request
/// is declined, so a [`FrameLoop`](framemux_core::FrameLoop) built on it
/// behaves like one on [`HeadlessHost`](framemux_core::HeadlessHost).
pub struct RafHost {
    inner: Rc<RafInner>,
}

struct RafInner {
    window: Option<web_sys::Window>,

    /// The JS closure registered with `requestAnimationFrame`, created on the
    /// first request.
    closure: RefCell<Option<RafClosure>>,

    /// Request id and Rust callback for the outstanding request.
    pending: RefCell<Option<(i32, TickCallback)>>,
}

impl RafHost {
    /// Creates a host bound to the current global `Window`, if any.
    #[must_use]
    pub fn new() -> Self {
        Self::with_window(current_window())
    }

    /// Creates a host bound to `window`, or an unavailable host for `None`.
    #[must_use]
    pub fn with_window(window: Option<web_sys::Window>) -> Self {
        Self {
            inner: Rc::new(RafInner {
                window,
                closure: RefCell::new(None),
                pending: RefCell::new(None),
            }),
        }
    }

    /// Reads `performance.now()`, in milliseconds, on the same clock as tick
    /// timestamps. `None` when no window or `Performance` object exists.
    #[must_use]
    pub fn now(&self) -> Option<f64> {
        let performance = self.inner.window.as_ref()?.performance()?;
        Some(performance.now())
    }

    /// Returns `true` while a request is outstanding.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    fn ensure_closure(&self) {
        let mut slot = self.inner.closure.borrow_mut();
        if slot.is_some() {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        *slot = Some(Closure::wrap(Box::new(move |timestamp_ms: f64| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            // Take the callback before running it: it will usually request
            // the next frame, which refills the slot.
            let due = inner.pending.borrow_mut().take();
            if let Some((_, callback)) = due {
                callback(timestamp_ms);
            }
        }) as Box<dyn FnMut(f64)>));
    }
}

#[cfg(target_arch = "wasm32")]
fn current_window() -> Option<web_sys::Window> {
    web_sys::window()
}

// wasm-bindgen imports panic when called off wasm.
#[cfg(not(target_arch = "wasm32"))]
fn current_window() -> Option<web_sys::Window> {
    None
}

impl Default for RafHost {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for RafHost {
    type Token = RafToken;

    fn is_available(&self) -> bool {
        self.inner.window.is_some()
    }

    fn request_tick(&self, callback: TickCallback) -> Option<RafToken> {
        let window = self.inner.window.as_ref()?;
        self.ensure_closure();
        let id = {
            let closure = self.inner.closure.borrow();
            let closure = closure.as_ref()?;
            window
                .request_animation_frame(closure.as_ref().unchecked_ref())
                .ok()?
        };
        let previous = self.inner.pending.replace(Some((id, callback)));
        if let Some((previous_id, _)) = previous {
            _ = window.cancel_animation_frame(previous_id);
        }
        Some(RafToken(id))
    }

    fn cancel_tick(&self, token: RafToken) {
        let cancelled = {
            let mut pending = self.inner.pending.borrow_mut();
            match pending.as_ref() {
                Some((id, _)) if *id == token.0 => pending.take(),
                _ => None,
            }
        };
        if cancelled.is_some()
            && let Some(window) = &self.inner.window
        {
            _ = window.cancel_animation_frame(token.0);
        }
    }
}

impl Drop for RafInner {
    fn drop(&mut self) {
        // The closure is about to be freed; the browser must not call it.
        if let (Some(window), Some((id, _))) = (&self.window, self.pending.get_mut().take()) {
            _ = window.cancel_animation_frame(id);
        }
    }
}

impl fmt::Debug for RafHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RafHost")
            .field("available", &self.is_available())
            .field("pending", &self.has_pending())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framemux_core::{FrameLoop, LoopPhase};

    #[test]
    fn detached_host_is_unavailable() {
        let host = RafHost::with_window(None);
        assert!(!host.is_available(), "no window means no frames");
        assert!(host.request_tick(Box::new(|_| {})).is_none());
        assert!(!host.has_pending());
        assert_eq!(host.now(), None);
        host.cancel_tick(RafToken(1));
    }

    #[test]
    fn frame_loop_on_detached_host_stays_idle() {
        let frames = FrameLoop::new(RafHost::with_window(None));
        let sub = frames.subscribe(|_| {});
        assert_eq!(frames.subscriber_count(), 1);
        assert_eq!(frames.phase(), LoopPhase::Idle);
        frames.resume();
        assert_eq!(frames.phase(), LoopPhase::Idle);
        sub.unsubscribe();
        assert_eq!(frames.subscriber_count(), 0);
    }
}
