//! Timed worker pool with cooperative cancellation.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use tracing::error;

use crate::error::SolverError;

const WATCHDOG_POLL: Duration = Duration::from_millis(5);

/// Shared cancellation flag. Flipping it is a request, not an interrupt:
/// readers observe it at their own suspension points.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Run `f` on `threads` parallel workers until all finish or `timeout`
/// elapses.
///
/// Every worker owns its own token; at the deadline the watchdog flips all
/// of them and waits for the workers to return, so partial results survive.
/// Results arrive in worker order; the first worker error is surfaced, and a
/// worker panic is logged and resumed.
pub fn run_for<R, F>(f: F, timeout: Duration, threads: usize) -> Result<Vec<R>, SolverError>
where
    F: Fn(CancellationToken) -> Result<R, SolverError> + Sync,
    R: Send,
{
    if timeout < Duration::from_secs(1) {
        return Err(SolverError::InvalidTimeout {
            seconds: timeout.as_secs_f64(),
        });
    }
    let threads = threads.max(1);
    let deadline = Instant::now() + timeout;

    let tokens: Vec<CancellationToken> = (0..threads).map(|_| CancellationToken::new()).collect();
    let running = AtomicUsize::new(threads);
    let f = &f;

    let joined: Vec<thread::Result<Result<R, SolverError>>> = thread::scope(|scope| {
        let handles: Vec<_> = tokens
            .iter()
            .map(|token| {
                let token = token.clone();
                let running = &running;
                scope.spawn(move || {
                    let outcome = f(token);
                    running.fetch_sub(1, Ordering::Release);
                    outcome
                })
            })
            .collect();

        // watchdog: wake early when the workers drain before the deadline
        while running.load(Ordering::Acquire) > 0 && Instant::now() < deadline {
            thread::sleep(WATCHDOG_POLL);
        }
        for token in &tokens {
            token.cancel();
        }

        handles.into_iter().map(|handle| handle.join()).collect()
    });

    let mut results = Vec::with_capacity(threads);
    for outcome in joined {
        match outcome {
            Ok(Ok(result)) => results.push(result),
            Ok(Err(err)) => return Err(err),
            Err(payload) => {
                error!("worker panicked; propagating");
                std::panic::resume_unwind(payload);
            }
        }
    }
    Ok(results)
}
