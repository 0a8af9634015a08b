use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::errors::SandboxError;

/// Fixed-size admission gate. Waiters queue; nobody is turned away for capacity.
#[derive(Debug, Clone)]
pub struct Admission {
    sem: Arc<Semaphore>,
    capacity: usize,
    gauges: Arc<Gauges>,
}

#[derive(Debug, Default)]
struct Gauges {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    waiting: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdmissionSnapshot {
    pub capacity: usize,
    pub in_flight: usize,
    pub peak_in_flight: usize,
    pub waiting: usize,
}

/// Held for the duration of one execution.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    gauges: Arc<Gauges>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gauges.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keeps `waiting` accurate even when the acquiring future is cancelled.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Admission {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
            gauges: Arc::new(Gauges::default()),
        }
    }

    pub async fn acquire(&self) -> Result<AdmissionPermit, SandboxError> {
        let permit = {
            let _waiting = WaitingGuard::enter(&self.gauges.waiting);
            Arc::clone(&self.sem).acquire_owned().await
        }
        .map_err(|_| SandboxError::AdmissionClosed)?;

        let now = self.gauges.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.gauges.peak.fetch_max(now, Ordering::SeqCst);
        Ok(AdmissionPermit {
            _permit: permit,
            gauges: Arc::clone(&self.gauges),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            capacity: self.capacity,
            in_flight: self.gauges.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.gauges.peak.load(Ordering::SeqCst),
            waiting: self.gauges.waiting.load(Ordering::SeqCst),
        }
    }
}
