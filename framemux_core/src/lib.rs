// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coalesces many per-frame subscribers onto a single host animation-frame
//! request.
//!
//! `framemux_core` owns one [`FrameLoop`](frame_loop::FrameLoop) per display
//! surface. Any number of subscribers register callbacks with it; the loop
//! keeps **at most one** outstanding request with the host's frame scheduling
//! primitive and fans each tick out to every subscriber. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   subscribe() / once() ──► Registry ──┐
//!                                       │ first subscriber
//!                                       ▼
//!   FrameHost::request_tick() ◄── LoopState (Idle/Running/Dispatching/Paused)
//!          │                            ▲
//!          ▼ host fires                 │ reschedule while subscribers remain
//!   dispatch(timestamp) ──► snapshot ──► callback(timestamp) × N
//! ```
//!
//! **[`frame_loop`]**: The multiplexer: subscription registry, lifecycle
//! state machine and dispatch.
//!
//! **[`host`]**: The [`FrameHost`](host::FrameHost) trait that platform
//! backends implement, plus [`HeadlessHost`](host::HeadlessHost) for contexts
//! without a frame clock.
//!
//! **[`manual`]**: [`ManualHost`](manual::ManualHost), a host driven by
//! explicit `tick()` calls, for tests and headless stepping.
//!
//! **[`config`]**: Construction-time [`FrameLoopConfig`](config::FrameLoopConfig).
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! loop instrumentation.
//!
//! # Crate features
//!
//! - `std` (enabled by default): Runs each subscriber under `catch_unwind`
//!   so one panicking callback cannot starve the rest of a tick. Build with
//!   `default-features = false` for `no_std` targets; a panicking subscriber
//!   then unwinds out of the tick and the loop returns to idle.
//! - `trace` (disabled by default): Enables trace sink dispatch. Without it,
//!   every emit site compiles to nothing.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod config;
pub mod frame_loop;
pub mod host;
pub mod manual;
pub mod trace;

pub use config::{FrameLoopConfig, PanicPolicy};
pub use frame_loop::{FrameLoop, LoopPhase, Subscription, SubscriptionGuard, SubscriptionId};
pub use host::{FrameHost, HeadlessHost, TickCallback};
pub use manual::ManualHost;
