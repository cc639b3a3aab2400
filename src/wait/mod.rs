//! Wait engine
//!
//! Polls an [`Observable`] until it holds or the [`WaitSpec`] timeout runs
//! out. Every synchronization point of a scenario goes through [`wait_for`];
//! there are no fixed sleeps anywhere else in the harness.
//!
//! Elapsed time is measured with `tokio::time::Instant`, which is monotonic
//! (and can be paused in tests).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::common::{Error, Result};

/// Default timeout for a wait point
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default interval between two probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeout and poll interval for one synchronization point
///
/// Always satisfies `0 < poll_interval <= timeout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSpec {
    timeout: Duration,
    poll_interval: Duration,
}

impl WaitSpec {
    /// Create a wait spec, rejecting zero durations and a poll interval
    /// longer than the timeout
    pub fn new(timeout: Duration, poll_interval: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(Error::InvalidWait("timeout must be greater than zero".to_string()));
        }
        if poll_interval.is_zero() {
            return Err(Error::InvalidWait(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if poll_interval > timeout {
            return Err(Error::InvalidWait(format!(
                "poll interval {:?} exceeds timeout {:?}",
                poll_interval, timeout
            )));
        }
        Ok(Self {
            timeout,
            poll_interval,
        })
    }

    /// Same as [`WaitSpec::new`] with millisecond values
    pub fn from_millis(timeout_ms: u64, poll_interval_ms: u64) -> Result<Self> {
        Self::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(poll_interval_ms),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A time-varying fact about the system under test
///
/// `C` is whatever the probe queries: a browser driver, an HTTP client, or a
/// test double. A probe error means "not yet" to the wait engine; it is only
/// reported if the wait eventually times out.
#[async_trait]
pub trait Observable<C: ?Sized>: Send + Sync {
    /// Human-readable description used in timeout diagnostics
    fn describe(&self) -> String;

    /// Evaluate the predicate once
    async fn probe(&self, target: &C) -> Result<bool>;
}

#[async_trait]
impl<C, O> Observable<C> for Box<O>
where
    C: ?Sized + Sync,
    O: Observable<C> + ?Sized,
{
    fn describe(&self) -> String {
        (**self).describe()
    }

    async fn probe(&self, target: &C) -> Result<bool> {
        (**self).probe(target).await
    }
}

/// Holds when every inner observable holds
pub struct AllOf<C: ?Sized> {
    parts: Vec<Box<dyn Observable<C>>>,
}

impl<C: ?Sized> AllOf<C> {
    pub fn new(parts: Vec<Box<dyn Observable<C>>>) -> Self {
        Self { parts }
    }
}

#[async_trait]
impl<C: ?Sized + Sync> Observable<C> for AllOf<C> {
    fn describe(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.describe())
            .collect::<Vec<_>>()
            .join(" and ")
    }

    async fn probe(&self, target: &C) -> Result<bool> {
        for part in &self.parts {
            if !part.probe(target).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Holds when at least one inner observable holds
///
/// A failing part does not fail the whole; its error is returned only when
/// every part failed.
pub struct AnyOf<C: ?Sized> {
    parts: Vec<Box<dyn Observable<C>>>,
}

impl<C: ?Sized> AnyOf<C> {
    pub fn new(parts: Vec<Box<dyn Observable<C>>>) -> Self {
        Self { parts }
    }
}

#[async_trait]
impl<C: ?Sized + Sync> Observable<C> for AnyOf<C> {
    fn describe(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.describe())
            .collect::<Vec<_>>()
            .join(" or ")
    }

    async fn probe(&self, target: &C) -> Result<bool> {
        let mut last_error = None;
        let mut answered = false;
        for part in &self.parts {
            match part.probe(target).await {
                Ok(true) => return Ok(true),
                Ok(false) => answered = true,
                Err(e) => last_error = Some(e),
            }
        }
        match last_error {
            Some(e) if !answered => Err(e),
            _ => Ok(false),
        }
    }
}

/// Outcome of one wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The observable held after `elapsed`
    Satisfied { elapsed: Duration, attempts: u32 },
    /// The observable never held within the timeout
    TimedOut {
        description: String,
        timeout: Duration,
        elapsed: Duration,
        attempts: u32,
        /// Last transient probe error, if the final probes were failing
        last_error: Option<String>,
    },
}

impl WaitOutcome {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, WaitOutcome::Satisfied { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            WaitOutcome::Satisfied { elapsed, .. } | WaitOutcome::TimedOut { elapsed, .. } => {
                *elapsed
            }
        }
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitOutcome::Satisfied { elapsed, attempts } => {
                write!(f, "satisfied after {:?} ({} probes)", elapsed, attempts)
            }
            WaitOutcome::TimedOut {
                description,
                timeout,
                last_error,
                ..
            } => {
                write!(f, "timed out after {:?} waiting for {}", timeout, description)?;
                if let Some(err) = last_error {
                    write!(f, " (last error: {})", err)?;
                }
                Ok(())
            }
        }
    }
}

/// Poll `observable` against `target` until it holds or `spec` times out
///
/// The first probe runs immediately, so an already-true observable returns
/// without delay. The last probe runs at or after the deadline, so a timeout
/// always reports `elapsed >= timeout`.
pub async fn wait_for<C, O>(target: &C, observable: &O, spec: &WaitSpec) -> WaitOutcome
where
    C: ?Sized + Sync,
    O: Observable<C> + ?Sized,
{
    let start = Instant::now();
    let deadline = start + spec.timeout();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let bound = spec
            .poll_interval()
            .max(deadline.saturating_duration_since(Instant::now()));

        let last_error = match tokio::time::timeout(bound, observable.probe(target)).await {
            Ok(Ok(true)) => {
                let elapsed = start.elapsed();
                tracing::debug!(
                    "{} satisfied after {:?} ({} probes)",
                    observable.describe(),
                    elapsed,
                    attempts
                );
                return WaitOutcome::Satisfied { elapsed, attempts };
            }
            Ok(Ok(false)) => None,
            Ok(Err(e)) => {
                tracing::trace!("Probe for {} failed: {}", observable.describe(), e);
                Some(e.to_string())
            }
            Err(_) => {
                tracing::trace!("Probe for {} did not answer in {:?}", observable.describe(), bound);
                Some(format!("probe did not answer within {:?}", bound))
            }
        };

        let now = Instant::now();
        if now >= deadline {
            let description = observable.describe();
            tracing::debug!("Timed out after {:?} waiting for {}", spec.timeout(), description);
            return WaitOutcome::TimedOut {
                description,
                timeout: spec.timeout(),
                elapsed: start.elapsed(),
                attempts,
                last_error,
            };
        }

        tokio::time::sleep_until((now + spec.poll_interval()).min(deadline)).await;
    }
}
