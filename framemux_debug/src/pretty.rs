// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are host frame timestamps in milliseconds.

use std::io::Write;

use framemux_core::trace::{
    CallbackPanicEvent, DispatchSummary, SubscriptionChange, SubscriptionEvent, TickEvent,
    TraceSink, TransitionEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn change_name(change: SubscriptionChange) -> &'static str {
    match change {
        SubscriptionChange::Subscribed => "subscribe",
        SubscriptionChange::SubscribedOnce => "once",
        SubscriptionChange::Unsubscribed => "unsubscribe",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] frame={} t={:.3}ms subscribers={}",
            e.frame_index, e.timestamp, e.subscribers,
        );
    }

    fn on_dispatch_summary(&mut self, s: &DispatchSummary) {
        let next = if s.rescheduled { "rescheduled" } else { "stopped" };
        let _ = writeln!(
            self.writer,
            "[dispatch] frame={} invoked={} panicked={} remaining={} {next}",
            s.frame_index, s.invoked, s.panicked, s.remaining,
        );
    }

    fn on_subscription(&mut self, e: &SubscriptionEvent) {
        let _ = writeln!(
            self.writer,
            "[{}] id={} subscribers={}",
            change_name(e.change),
            e.id.0,
            e.subscribers,
        );
    }

    fn on_transition(&mut self, e: &TransitionEvent) {
        let _ = writeln!(
            self.writer,
            "[phase] {:?} -> {:?} ({:?})",
            e.from, e.to, e.cause,
        );
    }

    fn on_callback_panic(&mut self, e: &CallbackPanicEvent) {
        let _ = writeln!(
            self.writer,
            "[panic] frame={} id={}",
            e.frame_index, e.id.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framemux_core::trace::TransitionCause;
    use framemux_core::{LoopPhase, SubscriptionId};

    #[test]
    fn pretty_print_tick() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_tick(&TickEvent {
            frame_index: 1,
            timestamp: 1234.56,
            subscribers: 3,
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        assert!(output.contains("[tick]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("t=1234.560ms"), "got: {output}");
    }

    #[test]
    fn pretty_print_lifecycle_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_subscription(&SubscriptionEvent {
            id: SubscriptionId(7),
            change: SubscriptionChange::SubscribedOnce,
            subscribers: 2,
        });
        sink.on_transition(&TransitionEvent {
            from: LoopPhase::Running,
            to: LoopPhase::Paused,
            cause: TransitionCause::Pause,
        });
        let output = String::from_utf8(sink.into_writer()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines, ["[once] id=7 subscribers=2", "[phase] Running -> Paused (Pause)"]);
    }
}
