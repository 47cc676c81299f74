//! Dedicated worker thread driving collection cycles at a fixed interval.
//!
//! Single-worker pattern: one thread owns the loop, cycles run strictly one
//! at a time. The tick is the control channel's receive timeout, so a cycle
//! that outruns the interval delays the next firing instead of overlapping
//! it. There is no per-call network timeout: a hung server stalls the worker
//! until the call returns, and shutdown waits for it.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Commands sent to the worker.
#[derive(Debug)]
pub(crate) enum Command {
    /// Graceful shutdown.
    Shutdown,
}

/// Spawn the worker thread and return its handle plus the control sender.
pub(crate) fn spawn(
    name: &str,
    interval: Duration,
    cycle: impl FnMut() + Send + 'static,
) -> io::Result<(JoinHandle<()>, SyncSender<Command>)> {
    let (tx, rx) = mpsc::sync_channel(1);
    let handle = thread::Builder::new()
        .name(name.to_string())
        .spawn(move || run(interval, rx, cycle))?;
    Ok((handle, tx))
}

fn run(interval: Duration, control: Receiver<Command>, mut cycle: impl FnMut()) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| loop {
        match control.recv_timeout(interval) {
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                // One bad cycle must not stop future firings.
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| cycle())) {
                    tracing::error!(panic = panic_message(&*payload), "collection cycle panicked");
                }
            }
        }
    }));

    match outcome {
        Ok(()) => tracing::debug!("collector worker stopped"),
        // Fatal for the collector: no further cycles will run.
        Err(payload) => tracing::error!(
            panic = panic_message(&*payload),
            "collector worker terminated unexpectedly"
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_worker_fires_repeatedly_and_stops() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let (handle, control) = spawn("test-ticker", Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(110));
        control.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        let fired = count.load(Ordering::SeqCst);
        assert!((2..=7).contains(&fired), "fired {fired} times");

        // No firings after shutdown.
        thread::sleep(Duration::from_millis(60));
        assert_eq!(count.load(Ordering::SeqCst), fired);
    }

    #[test]
    fn test_cycle_panic_does_not_stop_the_worker() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let (handle, control) = spawn("test-panics", Duration::from_millis(20), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                panic!("first cycle fails");
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(110));
        control.send(Command::Shutdown).unwrap();
        handle.join().unwrap();

        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_dropping_control_channel_stops_the_worker() {
        let (handle, control) = spawn("test-drop", Duration::from_millis(10), || {}).unwrap();
        drop(control);
        handle.join().unwrap();
    }
}
