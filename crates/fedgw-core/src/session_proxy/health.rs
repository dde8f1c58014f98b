//! Per-controller request counters and failure-ratio health evaluation.
//!
//! Counters only grow. Health is judged on the difference between the current
//! sample and the one taken at the previous health check.

use fedgw_types::{HealthConfig, HealthStatus};
use metrics::counter;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GatewayError, GatewayResult};

/// Session operation a request counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOp {
    Create,
    Update,
    Terminate,
}

impl SessionOp {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOp::Create => "create",
            SessionOp::Update => "update",
            SessionOp::Terminate => "terminate",
        }
    }
}

impl fmt::Display for SessionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Timeout => "timeout",
        }
    }

    pub fn of<T>(result: &GatewayResult<T>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) if e.is_timeout() => Outcome::Timeout,
            Err(_) => Outcome::Failure,
        }
    }
}

/// Snapshot of one operation's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCounters {
    pub attempts: u64,
    pub failures: u64,
    pub timeouts: u64,
}

impl OperationCounters {
    fn checked_sub(&self, previous: &Self) -> Option<Self> {
        Some(Self {
            attempts: self.attempts.checked_sub(previous.attempts)?,
            failures: self.failures.checked_sub(previous.failures)?,
            timeouts: self.timeouts.checked_sub(previous.timeouts)?,
        })
    }
}

/// Snapshot of all counters of one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionHealthMetrics {
    pub create: OperationCounters,
    pub update: OperationCounters,
    pub terminate: OperationCounters,
}

impl SessionHealthMetrics {
    /// Counter growth since `previous`. Fails if any counter went backwards.
    pub fn delta(&self, previous: &Self) -> GatewayResult<Self> {
        match (
            self.create.checked_sub(&previous.create),
            self.update.checked_sub(&previous.update),
            self.terminate.checked_sub(&previous.terminate),
        ) {
            (Some(create), Some(update), Some(terminate)) => Ok(Self { create, update, terminate }),
            _ => Err(GatewayError::Internal(
                "request counters decreased between samples".to_string(),
            )),
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.create.attempts + self.update.attempts + self.terminate.attempts
    }

    /// Failed plus timed out requests.
    pub fn total_failures(&self) -> u64 {
        [self.create, self.update, self.terminate]
            .iter()
            .map(|c| c.failures + c.timeouts)
            .sum()
    }
}

#[derive(Debug, Default)]
struct AtomicCounters {
    attempts: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
}

impl AtomicCounters {
    fn snapshot(&self) -> OperationCounters {
        OperationCounters {
            attempts: self.attempts.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::SeqCst),
        }
    }
}

/// Request counters of one controller plus the sample taken at the last health check.
#[derive(Debug)]
pub struct HealthTracker {
    shard: usize,
    create: AtomicCounters,
    update: AtomicCounters,
    terminate: AtomicCounters,
    previous: Mutex<SessionHealthMetrics>,
}

impl HealthTracker {
    pub fn new(shard: usize) -> Self {
        Self {
            shard,
            create: AtomicCounters::default(),
            update: AtomicCounters::default(),
            terminate: AtomicCounters::default(),
            previous: Mutex::new(SessionHealthMetrics::default()),
        }
    }

    fn counters(&self, op: SessionOp) -> &AtomicCounters {
        match op {
            SessionOp::Create => &self.create,
            SessionOp::Update => &self.update,
            SessionOp::Terminate => &self.terminate,
        }
    }

    pub fn record(&self, op: SessionOp, outcome: Outcome) {
        let counters = self.counters(op);
        counters.attempts.fetch_add(1, Ordering::SeqCst);
        match outcome {
            Outcome::Success => {},
            Outcome::Failure => {
                counters.failures.fetch_add(1, Ordering::SeqCst);
            },
            Outcome::Timeout => {
                counters.timeouts.fetch_add(1, Ordering::SeqCst);
            },
        }

        let labels = [
            ("shard", self.shard.to_string()),
            ("op", op.as_str().to_string()),
            ("outcome", outcome.as_str().to_string()),
        ];
        counter!("fedgw_session_requests_total", &labels).increment(1);
    }

    pub fn sample(&self) -> SessionHealthMetrics {
        SessionHealthMetrics {
            create: self.create.snapshot(),
            update: self.update.snapshot(),
            terminate: self.terminate.snapshot(),
        }
    }

    /// Take a new sample and return its difference to the previous one.
    ///
    /// The new sample becomes the baseline only when the difference is valid.
    pub fn take_delta(&self) -> GatewayResult<SessionHealthMetrics> {
        let current = self.sample();
        let mut previous = self.previous.lock();
        let delta = current.delta(&previous)?;
        *previous = current;
        Ok(delta)
    }

    #[cfg(test)]
    pub(crate) fn set_previous(&self, sample: SessionHealthMetrics) {
        *self.previous.lock() = sample;
    }
}

/// UNHEALTHY iff enough requests were seen and the failure ratio reaches the threshold.
pub fn evaluate(delta: &SessionHealthMetrics, config: &HealthConfig) -> HealthStatus {
    let total = delta.total_requests();
    let failures = delta.total_failures();
    if total == 0 || total < config.minimum_request_threshold {
        return HealthStatus::healthy(format!(
            "{} requests since the last check, below the threshold of {}",
            total, config.minimum_request_threshold
        ));
    }

    let ratio = failures as f64 / total as f64;
    if ratio >= config.request_failure_threshold {
        HealthStatus::unhealthy(format!(
            "{} of {} requests failed ({:.1}%), threshold is {:.1}%",
            failures,
            total,
            ratio * 100.0,
            config.request_failure_threshold * 100.0
        ))
    } else {
        HealthStatus::healthy(format!("{} of {} requests failed", failures, total))
    }
}
