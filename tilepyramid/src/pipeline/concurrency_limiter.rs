//! Instrumented concurrency limiter.
//!
//! A semaphore wrapper that tracks how many permits are currently held and
//! the highest number ever held at once. The executor takes one permit per
//! admitted item and moves it into the spawned task, so the permit is
//! released the moment the handler settles.
//!
//! # Usage
//!
//! ```ignore
//! use tilepyramid::pipeline::ConcurrencyLimiter;
//!
//! let limiter = ConcurrencyLimiter::new(50);
//! let permit = limiter.acquire().await?;
//! tokio::spawn(async move {
//!     let _permit = permit;
//!     // work happens here, permit released on drop
//! });
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Returned when a permit is requested from a closed limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("concurrency limiter closed")]
pub struct LimiterClosed;

/// Semaphore-based limiter with in-flight and peak counters.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    /// Semaphore controlling concurrent operations
    semaphore: Arc<Semaphore>,

    /// Current number of held permits
    in_flight: Arc<AtomicUsize>,

    /// Peak concurrent permits observed
    peak_in_flight: AtomicUsize,
}

impl ConcurrencyLimiter {
    /// Creates a new limiter with the specified maximum concurrent operations.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrent` is 0. Callers validate the bound first.
    pub fn new(max_concurrent: usize) -> Self {
        assert!(max_concurrent > 0, "max_concurrent must be > 0");

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot and returns an owned permit.
    ///
    /// Fails once the limiter is closed, including for callers already
    /// waiting.
    pub async fn acquire(&self) -> Result<ConcurrencyPermit, LimiterClosed> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| LimiterClosed)?;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        Ok(ConcurrencyPermit {
            _permit: permit,
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Stops handing out permits. Held permits stay valid.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the peak number of concurrent permits observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// A held slot. Released when dropped.
#[derive(Debug)]
pub struct ConcurrencyPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        // Decrement before the semaphore permit is returned so the counter
        // never reads above the bound.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
