//! Bounded-parallelism dispatch.
//!
//! A fixed pool of worker threads drains the request stream; at most
//! `jobs` subprocess invocations are in flight at once. Results land in the
//! reporter in whatever order tests complete. A timeout is an ordinary
//! recorded outcome; a harness fault trips the cancellation token, lets
//! in-flight work drain, and propagates to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::error::HarnessResult;
use crate::exec;
use crate::fixture::{ExecRequest, RunConfig};
use crate::report::Reporter;

/// Default number of worker threads
pub const DEFAULT_WORKERS: usize = 5;

/// Cooperative stop signal checked before each new dispatch. Set once by
/// whichever worker first hits a harness fault; already-running tests are
/// not forcibly cancelled.
#[derive(Debug, Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
}

impl CancellationToken {
    /// Create a fresh, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that no further work be dispatched
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Run every request under bounded parallelism, recording exactly one
/// outcome per request into `reporter`.
///
/// Returns the first harness fault encountered, after all workers have
/// wound down; the partial summary accumulated up to that point remains
/// available in the reporter. A panicking worker is re-raised here.
pub fn run_all(
    config: &RunConfig,
    requests: Vec<ExecRequest>,
    reporter: &Reporter,
) -> HarnessResult<()> {
    let workers = config.jobs.max(1);
    let cancel = CancellationToken::new();
    let (tx, rx) = crossbeam::channel::unbounded();
    for request in requests {
        // Receiver is alive in this scope, so the send cannot fail.
        let _ = tx.send(request);
    }
    drop(tx);

    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = rx.clone();
            let cancel = &cancel;
            handles.push(scope.spawn(move || -> HarnessResult<()> {
                while let Ok(request) = rx.recv() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    match exec::run_request(&config.interpreter, &request, config.timeout) {
                        Ok(outcome) => reporter.record(&request.case().name, outcome),
                        Err(error) => {
                            cancel.cancel();
                            return Err(error);
                        }
                    }
                }
                Ok(())
            }));
        }

        let mut first_error = None;
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(%error, "worker aborted on harness fault");
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
                // A panic is a bug in the harness itself; re-raise it.
                Err(payload) => std::panic::resume_unwind(payload),
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    })
}
