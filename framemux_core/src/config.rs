// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction-time configuration for a [`FrameLoop`](crate::frame_loop::FrameLoop).

/// What to do with a subscriber that panics during dispatch.
///
/// Panics are only caught when the `std` feature is enabled. Without it, a
/// panic unwinds out of the dispatch; the loop drops back to Idle with all
/// subscriptions kept, and [`resume`](crate::frame_loop::FrameLoop::resume)
/// restarts it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PanicPolicy {
    /// Catch the panic, finish the tick, reschedule, then re-raise the first
    /// payload with `resume_unwind` so the embedder's panic handling sees it.
    #[default]
    Rethrow,
    /// Catch the panic, report it to the trace sink and carry on.
    Isolate,
}

/// Configuration for a [`FrameLoop`](crate::frame_loop::FrameLoop).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FrameLoopConfig {
    /// Policy for panicking subscribers.
    pub panic_policy: PanicPolicy,
    /// Begin in the Paused phase: subscriptions accumulate but no tick is
    /// requested until the first `resume()`. Like any pause, it is released
    /// if the subscribers that accumulated all leave again.
    pub start_paused: bool,
}

impl FrameLoopConfig {
    /// Default configuration: panics are re-raised after the tick, the loop
    /// starts on the first subscriber.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            panic_policy: PanicPolicy::Rethrow,
            start_paused: false,
        }
    }

    /// Configuration that swallows subscriber panics after reporting them.
    #[must_use]
    pub const fn isolated() -> Self {
        Self {
            panic_policy: PanicPolicy::Isolate,
            start_paused: false,
        }
    }

    /// Returns a copy of this configuration that starts paused.
    #[must_use]
    pub const fn paused(self) -> Self {
        Self {
            start_paused: true,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(FrameLoopConfig::new(), FrameLoopConfig::default());
        assert_eq!(
            FrameLoopConfig::isolated().panic_policy,
            PanicPolicy::Isolate,
            "isolated preset must swallow panics"
        );
        let paused = FrameLoopConfig::isolated().paused();
        assert!(paused.start_paused, "paused() must set start_paused");
        assert_eq!(paused.panic_policy, PanicPolicy::Isolate);
    }
}
