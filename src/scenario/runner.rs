//! Scenario runner
//!
//! Executes a scenario's steps strictly in order against one session, stops
//! at the first failing step, and always releases the session afterwards.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use tracing::Instrument;

use super::session::Session;
use super::step::{Scenario, StepFailure};
use crate::report::{ScenarioRecorder, ScenarioResult, ScenarioStatus};

/// Extra time granted on top of the scenario's summed wait budgets
pub const DEFAULT_DEADLINE_MARGIN: Duration = Duration::from_secs(30);

/// Upper bound for collecting failure evidence
const EVIDENCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for releasing the session
const RELEASE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs scenarios with fail-fast semantics and guaranteed teardown
#[derive(Debug, Clone)]
pub struct Runner {
    margin: Duration,
    deadline: Option<Duration>,
}

impl Default for Runner {
    fn default() -> Self {
        Self {
            margin: DEFAULT_DEADLINE_MARGIN,
            deadline: None,
        }
    }
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Margin added to the summed wait budgets to form the scenario deadline
    pub fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    /// Fixed scenario deadline, replacing the budget-derived one
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn deadline_for<C: ?Sized + Sync>(&self, scenario: &Scenario<C>) -> Duration {
        self.deadline
            .unwrap_or_else(|| scenario.budget() + self.margin)
    }

    /// Run `scenario` against `session`, consuming the session
    pub async fn run<S: Session>(&self, scenario: &Scenario<S::Target>, session: S) -> ScenarioResult {
        self.run_until(scenario, session, std::future::pending::<()>())
            .await
    }

    /// Like [`Runner::run`], but stop early when `cancel` completes
    ///
    /// A cancelled run records the in-flight step as errored, then collects
    /// evidence and releases the session as usual.
    pub async fn run_until<S, F>(
        &self,
        scenario: &Scenario<S::Target>,
        session: S,
        cancel: F,
    ) -> ScenarioResult
    where
        S: Session,
        F: Future<Output = ()> + Send,
    {
        let span = tracing::info_span!("scenario", name = %scenario.name());
        async move {
            let mut recorder = ScenarioRecorder::start(scenario.name());
            let deadline = self.deadline_for(scenario);
            tracing::info!(
                "Running {} steps (deadline {:?})",
                scenario.steps().len(),
                deadline
            );

            let stop = tokio::select! {
                completed = tokio::time::timeout(
                    deadline,
                    run_steps(scenario, session.target(), &mut recorder),
                ) => completed.err().map(|_| Stop::Deadline),
                _ = cancel => Some(Stop::Cancelled),
            };

            match stop {
                None => {}
                Some(Stop::Deadline) => {
                    tracing::warn!("Scenario deadline of {:?} exceeded", deadline);
                    recorder.interrupt(StepFailure::TimedOut {
                        description: "scenario deadline exceeded".to_string(),
                        timeout: deadline,
                        last_error: None,
                    });
                }
                Some(Stop::Cancelled) => {
                    tracing::warn!("Scenario cancelled");
                    recorder.interrupt(StepFailure::action("CANCELLED", "scenario cancelled"));
                }
            }

            if recorder.status() != ScenarioStatus::Passed {
                match tokio::time::timeout(EVIDENCE_TIMEOUT, session.evidence()).await {
                    Ok(evidence) => recorder.attach_evidence(evidence),
                    Err(_) => tracing::debug!("Evidence capture timed out"),
                }
            }

            match tokio::time::timeout(RELEASE_TIMEOUT, session.release()).await {
                Ok(Ok(())) => tracing::debug!("Session released"),
                Ok(Err(e)) => {
                    tracing::warn!("Failed to release session: {}", e);
                    recorder.teardown_failed(e.to_string());
                }
                Err(_) => {
                    tracing::warn!("Session release timed out after {:?}", RELEASE_TIMEOUT);
                    recorder.teardown_failed(format!(
                        "session release timed out after {:?}",
                        RELEASE_TIMEOUT
                    ));
                }
            }

            let result = recorder.seal();
            tracing::info!(
                "Scenario {} {} after {:?}",
                result.scenario(),
                result.status().label(),
                result.elapsed()
            );
            result
        }
        .instrument(span)
        .await
    }
}

enum Stop {
    Deadline,
    Cancelled,
}

/// Execute steps in order until one fails
async fn run_steps<C: ?Sized + Sync>(
    scenario: &Scenario<C>,
    target: &C,
    recorder: &mut ScenarioRecorder,
) {
    for step in scenario.steps() {
        let span = tracing::info_span!("step", name = %step.name());
        recorder.begin_step(step.name());

        let outcome = AssertUnwindSafe(step.execute(target))
            .catch_unwind()
            .instrument(span)
            .await
            .unwrap_or_else(|panic| {
                Err(StepFailure::action(
                    "PANIC",
                    format!("action panicked: {}", panic_message(panic.as_ref())),
                ))
            });

        match &outcome {
            Ok(()) => tracing::info!("✓ {}", step.name()),
            Err(e) => tracing::warn!("✗ {}: {}", step.name(), e),
        }

        if !recorder.finish_step(outcome) {
            break;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
