// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Web host for framemux.
//!
//! This crate provides integration with browser APIs:
//!
//! - [`RafHost`]: `requestAnimationFrame` frame host
//! - [`frame_loop`]: a [`FrameLoop`] wired to the current window

#![no_std]

extern crate alloc;

mod raf;

pub use framemux_core::host::FrameHost;
pub use raf::{RafHost, RafToken};

use framemux_core::{FrameLoop, FrameLoopConfig};

/// Creates a [`FrameLoop`] driven by `requestAnimationFrame` on the current
/// window.
///
/// Without a window (workers, non-wasm targets) the loop still accepts
/// subscribers but never ticks.
#[must_use]
pub fn frame_loop() -> FrameLoop<RafHost> {
    FrameLoop::new(RafHost::new())
}

/// Like [`frame_loop`], with an explicit configuration.
#[must_use]
pub fn frame_loop_with_config(config: FrameLoopConfig) -> FrameLoop<RafHost> {
    FrameLoop::with_config(RafHost::new(), config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use framemux_core::LoopPhase;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn frame_loop_off_wasm_is_headless() {
        let frames = frame_loop_with_config(FrameLoopConfig::new().paused());
        assert!(!frames.host().is_available(), "no window off wasm");
        frames.once(|_| {});
        assert_eq!(frames.phase(), LoopPhase::Paused);
        frames.resume();
        assert_eq!(frames.phase(), LoopPhase::Idle);
        assert_eq!(frames.subscriber_count(), 1);
    }
}
