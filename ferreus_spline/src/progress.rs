/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages, sinks, and helper functions for spline fitting.
//
// Created on: 15 Nov 2025     Author: Daniel Owen 
//
// Copyright (c) 2025, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License. 
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting primitives for spline fitting.

use std::fmt::Debug;
use std::sync::{Arc, mpsc};
use std::thread;

/// Progress events emitted while fitting a spline.
#[derive(Debug, Clone)]
pub enum ProgressMsg {
    /// A least-squares spline was fitted on the current knot set during knot growth.
    KnotsInserted {
        iteration: usize,
        num_knots: usize,
        residual: f64,
    },

    /// Iteration status of the smoothing parameter search.
    SmoothingIteration {
        iter: usize,
        smoothing_parameter: f64,
        residual: f64,
        progress: f64,
    },

    /// Arbitrary informational message.
    Message { message: String },
}

/// Sink that consumes progress messages.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, msg: ProgressMsg);
}

/// Progress sink that forwards messages over a bounded channel without blocking.
#[derive(Debug)]
pub struct ClosureSink {
    tx: mpsc::SyncSender<ProgressMsg>,
}

impl ProgressSink for ClosureSink {
    #[inline]
    fn emit(&self, msg: ProgressMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Spawns a listener thread that runs a handler closure for each progress message.
///
/// `buffer` bounds the number of messages waiting for the handler. While the
/// buffer is full new messages are dropped, so a slow handler never stalls the
/// fit. Size it for the number of messages the handler may fall behind by.
///
/// The listener exits once every clone of the returned sink has been dropped.
pub fn closure_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressMsg>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ClosureSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            handler(msg);
        }
    });

    (sink, handle)
}

/// Fraction of the way from the starting misfit to the target misfit, in `[0, 1]`.
///
/// Misfits are measured as `|fp - s|` on a log scale.
#[inline]
pub(crate) fn progress_from_misfit(current: f64, start: f64, target: f64) -> f64 {
    if current <= target {
        1.0
    } else if start <= target || current >= start {
        0.0
    } else {
        (start.log10() - current.log10()) / (start.log10() - target.log10())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn closure_sink_delivers_messages_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let (sink, handle) = closure_sink(16, move |msg| {
            if let ProgressMsg::KnotsInserted { num_knots, .. } = msg {
                seen_clone.lock().unwrap().push(num_knots);
            }
        });

        for n in [8, 9, 11] {
            sink.emit(ProgressMsg::KnotsInserted {
                iteration: 0,
                num_knots: n,
                residual: 1.0,
            });
        }
        drop(sink);
        handle.join().unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![8, 9, 11]);
    }

    #[test]
    fn full_buffer_drops_messages() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let delivered_clone = Arc::clone(&delivered);
        let (gate_tx, gate_rx) = mpsc::channel::<()>();

        let (sink, handle) = closure_sink(1, move |_| {
            if delivered_clone.fetch_add(1, Ordering::SeqCst) == 0 {
                let _ = gate_rx.recv();
            }
        });

        // The handler holds the first message until released, so at most one
        // more fits in the buffer.
        for iteration in 0..10 {
            sink.emit(ProgressMsg::KnotsInserted {
                iteration,
                num_knots: 8,
                residual: 1.0,
            });
        }
        gate_tx.send(()).unwrap();
        drop(sink);
        handle.join().unwrap();

        let count = delivered.load(Ordering::SeqCst);
        assert!((1..=2).contains(&count));
    }

    #[test]
    fn progress_is_clamped_to_unit_interval() {
        assert_eq!(progress_from_misfit(1e-6, 1.0, 1e-3), 1.0);
        assert_eq!(progress_from_misfit(2.0, 1.0, 1e-3), 0.0);
        let mid = progress_from_misfit(10f64.powf(-1.5), 1.0, 1e-3);
        assert!((mid - 0.5).abs() < 1e-12);
    }
}
