// Copyright 2026 the Framemux Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads events captured by a
//! [`RecorderSink`](super::recorder::RecorderSink) and writes
//! [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Ticks become instant events on the timeline, the subscriber count becomes
//! a counter track, and phase changes become instant events carrying their
//! cause. Subscription and phase events carry no timestamp of their own; they
//! are placed at the most recent tick.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::RecordedEvent;

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(events: &[RecordedEvent], writer: &mut dyn Write) -> io::Result<()> {
    let mut out: Vec<Value> = Vec::new();
    let mut ts = 0.0;

    for recorded in events {
        match recorded {
            RecordedEvent::Tick(e) => {
                ts = ms_to_us(e.timestamp);
                out.push(json!({
                    "ph": "i",
                    "name": "Tick",
                    "cat": "FrameLoop",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "subscribers": e.subscribers,
                    }
                }));
            }
            RecordedEvent::DispatchSummary(s) => {
                out.push(json!({
                    "ph": "i",
                    "name": "Dispatch",
                    "cat": "FrameLoop",
                    "ts": ms_to_us(s.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "frame_index": s.frame_index,
                        "invoked": s.invoked,
                        "panicked": s.panicked,
                        "remaining": s.remaining,
                        "rescheduled": s.rescheduled,
                    }
                }));
            }
            RecordedEvent::Subscription(e) => {
                out.push(json!({
                    "ph": "C",
                    "name": "subscribers",
                    "cat": "Registry",
                    "ts": ts,
                    "pid": 0,
                    "args": { "count": e.subscribers }
                }));
            }
            RecordedEvent::Transition(e) => {
                out.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.to),
                    "cat": "Phase",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "from": format!("{:?}", e.from),
                        "cause": format!("{:?}", e.cause),
                    }
                }));
            }
            RecordedEvent::CallbackPanic(e) => {
                out.push(json!({
                    "ph": "i",
                    "name": "CallbackPanic",
                    "cat": "FrameLoop",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "frame_index": e.frame_index,
                        "subscription": e.id.0,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &out)?;
    Ok(())
}

fn ms_to_us(ms: f64) -> f64 {
    ms * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use std::cell::RefCell;
    use std::rc::Rc;

    use framemux_core::{FrameLoop, ManualHost};

    #[test]
    fn export_produces_valid_json() {
        let host = ManualHost::new();
        let frames = FrameLoop::new(host.clone());
        let rec = Rc::new(RefCell::new(RecorderSink::new()));
        frames.set_trace_sink(Rc::clone(&rec));

        frames.once(|_| {});
        host.tick(16.5);

        let mut out = Vec::new();
        export(rec.borrow().events(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();

        // once, Idle -> Running, tick, Running -> Dispatching, unsubscribe,
        // Dispatching -> Idle, dispatch summary.
        assert_eq!(parsed.len(), 7);

        assert_eq!(parsed[0]["ph"], "C");
        assert_eq!(parsed[0]["args"]["count"], 1);

        assert_eq!(parsed[1]["name"], "Running");
        assert_eq!(parsed[1]["args"]["cause"], "Subscribe");

        assert_eq!(parsed[2]["name"], "Tick");
        assert_eq!(parsed[2]["ts"], 16_500.0);

        // The phase change caused by a tick sits on that tick's timestamp.
        assert_eq!(parsed[3]["name"], "Dispatching");
        assert_eq!(parsed[3]["ts"], 16_500.0);

        assert_eq!(parsed[4]["ph"], "C");
        assert_eq!(parsed[4]["ts"], 16_500.0);
        assert_eq!(parsed[4]["args"]["count"], 0);

        assert_eq!(parsed[5]["name"], "Idle");
        assert_eq!(parsed[5]["args"]["cause"], "Drained");

        assert_eq!(parsed[6]["name"], "Dispatch");
        assert_eq!(parsed[6]["args"]["rescheduled"], false);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
