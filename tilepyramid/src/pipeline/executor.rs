//! Bounded concurrency executor.
//!
//! Drains a lazy sequence of work items, running at most `max_concurrency`
//! handlers at once. A slot is refilled the moment any handler settles, so a
//! slow item never holds back admission of the rest.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──run()──► Admitting ──sequence exhausted / cancelled──► Draining ──in-flight empty──► Done
//! ```
//!
//! - **Admitting**: waits for a free permit, pulls the next item from the
//!   sequence and spawns its handler. Finished handlers are reaped as they
//!   settle.
//! - **Draining**: nothing new is admitted; the executor waits for every
//!   in-flight handler.
//!
//! # Failure policy
//!
//! Handler errors and panics are isolated to their item. Admission carries
//! on, and once the executor reaches `Done` every failure is returned in a
//! single [`ExecutionError`] so the caller can decide whether to abort.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::concurrency_limiter::{ConcurrencyLimiter, ConcurrencyPermit, LimiterClosed};

/// Errors raised when building an executor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("max concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Executor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Admitting,
    Draining,
    Done,
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Admitting => "admitting",
            Self::Draining => "draining",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Why a single item failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause<E> {
    Handler(E),
    Panicked(String),
}

impl<E: fmt::Display> fmt::Display for FailureCause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler(e) => write!(f, "{}", e),
            Self::Panicked(message) => write!(f, "handler panicked: {}", message),
        }
    }
}

/// A failed item together with its cause.
#[derive(Debug, Clone)]
pub struct ItemFailure<T, E> {
    pub item: T,
    pub cause: FailureCause<E>,
}

/// Counters describing one executor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Items handed to the handler
    pub admitted: u64,
    /// Handlers that returned `Ok`
    pub succeeded: u64,
    /// Handlers that returned `Err` or panicked
    pub failed: u64,
    /// Tasks whose outcome could not be collected (runtime shutting down)
    pub lost: u64,
    /// Highest number of handlers observed in flight at once
    pub peak_in_flight: usize,
    /// Wall-clock time of the run
    pub elapsed: Duration,
    /// Admission stopped early because of a cancellation request
    pub cancelled: bool,
    /// Final state, always `Done` once `run` returns
    pub state: ExecutorState,
}

impl ExecutionSummary {
    fn new() -> Self {
        Self {
            admitted: 0,
            succeeded: 0,
            failed: 0,
            lost: 0,
            peak_in_flight: 0,
            elapsed: Duration::ZERO,
            cancelled: false,
            state: ExecutorState::Idle,
        }
    }

    /// Number of handlers that have settled.
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed + self.lost
    }
}

/// Returned after a full drain when at least one item failed.
///
/// `failures` keeps the first failures in completion order, up to the
/// executor's failure limit. `summary.failed` counts all of them.
#[derive(Debug)]
pub struct ExecutionError<T, E> {
    pub summary: ExecutionSummary,
    pub failures: Vec<ItemFailure<T, E>>,
}

impl<T, E> ExecutionError<T, E> {
    /// Failures counted in the summary but not kept in `failures`.
    pub fn omitted(&self) -> u64 {
        self.summary.failed - self.failures.len() as u64
    }
}

impl<T, E> fmt::Display for ExecutionError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} items failed",
            self.summary.failed + self.summary.lost,
            self.summary.admitted
        )
    }
}

impl<T: fmt::Debug, E: fmt::Debug> std::error::Error for ExecutionError<T, E> {}

type Outcome<T, E> = (T, Result<Result<(), E>, String>);

/// Failures kept per run unless configured otherwise.
pub const DEFAULT_FAILURE_LIMIT: usize = 100;

/// Runs a handler over a sequence with a fixed fan-out.
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    max_concurrency: usize,
    failure_limit: usize,
    label: String,
}

impl BoundedExecutor {
    /// Creates an executor admitting at most `max_concurrency` items at once.
    pub fn new(max_concurrency: usize, label: impl Into<String>) -> Result<Self, ExecutorError> {
        if max_concurrency == 0 {
            return Err(ExecutorError::ZeroConcurrency);
        }
        Ok(Self {
            max_concurrency,
            failure_limit: DEFAULT_FAILURE_LIMIT,
            label: label.into(),
        })
    }

    /// Caps how many failed items are kept for the caller.
    pub fn with_failure_limit(mut self, limit: usize) -> Self {
        self.failure_limit = limit;
        self
    }

    /// Runs `handler` over every item and waits for all of them to settle.
    pub async fn run<I, F, Fut, E>(
        &self,
        items: I,
        handler: F,
    ) -> Result<ExecutionSummary, ExecutionError<I::Item, E>>
    where
        I: IntoIterator,
        I::Item: Clone + Send + 'static,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        self.run_until(items, handler, &CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops admitting once `cancel` fires.
    ///
    /// Cancellation closes the limiter, so an item waiting for a slot is
    /// dropped unadmitted. Handlers already in flight run to completion.
    pub async fn run_until<I, F, Fut, E>(
        &self,
        items: I,
        handler: F,
        cancel: &CancellationToken,
    ) -> Result<ExecutionSummary, ExecutionError<I::Item, E>>
    where
        I: IntoIterator,
        I::Item: Clone + Send + 'static,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        let started = Instant::now();
        let limiter = ConcurrencyLimiter::new(self.max_concurrency);
        let mut items = items.into_iter();
        let mut next_item: Option<I::Item> = None;
        let mut in_flight: JoinSet<Outcome<I::Item, E>> = JoinSet::new();
        let mut summary = ExecutionSummary::new();
        let mut failures = Vec::new();

        let mut state = ExecutorState::Idle;
        self.transition(&mut state, ExecutorState::Admitting, &limiter);

        loop {
            match state {
                ExecutorState::Admitting => {
                    // A permit is only taken once an item is in hand.
                    let Some(item) = next_item.take().or_else(|| items.next()) else {
                        self.transition(&mut state, ExecutorState::Draining, &limiter);
                        continue;
                    };

                    tokio::select! {
                        biased;

                        _ = cancel.cancelled(), if !limiter.is_closed() => {
                            summary.cancelled = true;
                            limiter.close();
                            next_item = Some(item);
                        }

                        Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                            self.settle(joined, &mut summary, &mut failures);
                            next_item = Some(item);
                        }

                        permit = limiter.acquire() => match permit {
                            Ok(permit) => {
                                summary.admitted += 1;
                                Self::spawn(&mut in_flight, item, &handler, permit);
                            }
                            Err(LimiterClosed) => {
                                self.transition(&mut state, ExecutorState::Draining, &limiter);
                            }
                        },
                    }
                }
                ExecutorState::Draining => match in_flight.join_next().await {
                    Some(joined) => self.settle(joined, &mut summary, &mut failures),
                    None => self.transition(&mut state, ExecutorState::Done, &limiter),
                },
                ExecutorState::Idle | ExecutorState::Done => break,
            }
        }

        summary.state = state;
        summary.peak_in_flight = limiter.peak_in_flight();
        summary.elapsed = started.elapsed();

        if summary.failed == 0 && summary.lost == 0 {
            Ok(summary)
        } else {
            Err(ExecutionError { summary, failures })
        }
    }

    fn spawn<T, F, Fut, E>(
        in_flight: &mut JoinSet<Outcome<T, E>>,
        item: T,
        handler: &F,
        permit: ConcurrencyPermit,
    ) where
        T: Clone + Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Send + 'static,
    {
        let work = handler(item.clone());
        in_flight.spawn(async move {
            let outcome = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .map_err(|panic| panic_message(panic.as_ref()));
            drop(permit);
            (item, outcome)
        });
    }

    fn settle<T, E>(
        &self,
        joined: Result<Outcome<T, E>, tokio::task::JoinError>,
        summary: &mut ExecutionSummary,
        failures: &mut Vec<ItemFailure<T, E>>,
    ) {
        let (item, cause) = match joined {
            Ok((_, Ok(Ok(())))) => {
                summary.succeeded += 1;
                return;
            }
            Ok((item, Ok(Err(e)))) => (item, FailureCause::Handler(e)),
            Ok((item, Err(message))) => (item, FailureCause::Panicked(message)),
            Err(e) => {
                summary.lost += 1;
                error!(executor = %self.label, error = %e, "Handler task could not be joined");
                return;
            }
        };

        summary.failed += 1;
        if failures.len() < self.failure_limit {
            failures.push(ItemFailure { item, cause });
        }
    }

    fn transition(
        &self,
        state: &mut ExecutorState,
        next: ExecutorState,
        limiter: &ConcurrencyLimiter,
    ) {
        debug!(
            executor = %self.label,
            from = %state,
            to = %next,
            in_flight = limiter.in_flight(),
            "Executor state change"
        );
        *state = next;
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
