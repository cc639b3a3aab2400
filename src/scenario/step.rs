//! Steps, wait points and the step failure taxonomy

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::common::Error;
use crate::wait::{wait_for, Observable, WaitOutcome, WaitSpec};

/// Why a step stopped the scenario
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// A wait predicate never became true within its budget
    #[error("{description}: timed out after {timeout:?}{}", last_error_suffix(.last_error))]
    TimedOut {
        description: String,
        timeout: Duration,
        last_error: Option<String>,
    },

    /// The action itself failed: target missing, network refused, malformed
    /// response, or a panic in action code
    #[error("{message}")]
    ActionError { category: String, message: String },

    /// A post-condition was checked explicitly and found false
    #[error("{0}")]
    AssertionFailed(String),
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {})", e),
        None => String::new(),
    }
}

impl StepFailure {
    pub fn action(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ActionError {
            category: category.into(),
            message: message.into(),
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed(message.into())
    }
}

impl From<Error> for StepFailure {
    fn from(e: Error) -> Self {
        Self::ActionError {
            category: e.category().to_string(),
            message: e.to_string(),
        }
    }
}

/// Something a step does to the system under test
///
/// Actions run exactly once; they are never retried.
#[async_trait]
pub trait Action<C: ?Sized>: Send + Sync {
    /// Short description for logs
    fn describe(&self) -> String;

    async fn perform(&self, target: &C) -> Result<(), StepFailure>;
}

/// Several actions performed back to back as one
pub struct Sequence<C: ?Sized> {
    actions: Vec<Box<dyn Action<C>>>,
}

impl<C: ?Sized + Sync> Sequence<C> {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    pub fn then(mut self, action: impl Action<C> + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }
}

impl<C: ?Sized + Sync> Default for Sequence<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<C: ?Sized + Sync> Action<C> for Sequence<C> {
    fn describe(&self) -> String {
        self.actions
            .iter()
            .map(|a| a.describe())
            .collect::<Vec<_>>()
            .join(", then ")
    }

    async fn perform(&self, target: &C) -> Result<(), StepFailure> {
        for action in &self.actions {
            action.perform(target).await?;
        }
        Ok(())
    }
}

/// An observable paired with its wait budget
pub struct WaitPoint<C: ?Sized> {
    observable: Box<dyn Observable<C>>,
    spec: WaitSpec,
    message: Option<String>,
}

impl<C: ?Sized + Sync> WaitPoint<C> {
    pub fn new(observable: impl Observable<C> + 'static, spec: WaitSpec) -> Self {
        Self {
            observable: Box::new(observable),
            spec,
            message: None,
        }
    }

    /// Text that leads the timeout diagnostic, e.g. "authentication did not complete"
    pub fn on_timeout(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn spec(&self) -> &WaitSpec {
        &self.spec
    }

    pub fn describe(&self) -> String {
        self.observable.describe()
    }

    /// Block until the observable holds; a timeout becomes a step failure
    pub async fn settle(&self, target: &C) -> Result<Duration, StepFailure> {
        match wait_for(target, &*self.observable, &self.spec).await {
            WaitOutcome::Satisfied { elapsed, .. } => Ok(elapsed),
            WaitOutcome::TimedOut {
                description,
                timeout,
                last_error,
                ..
            } => {
                let description = match &self.message {
                    Some(message) => format!("{}: waiting for {}", message, description),
                    None => format!("waiting for {}", description),
                };
                Err(StepFailure::TimedOut {
                    description,
                    timeout,
                    last_error,
                })
            }
        }
    }
}

/// One named scenario step: optional wait, optional action, optional wait
pub struct Step<C: ?Sized> {
    name: String,
    before: Option<WaitPoint<C>>,
    action: Option<Box<dyn Action<C>>>,
    after: Option<WaitPoint<C>>,
}

impl<C: ?Sized + Sync> Step<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            before: None,
            action: None,
            after: None,
        }
    }

    pub fn wait_before(mut self, wait: WaitPoint<C>) -> Self {
        self.before = Some(wait);
        self
    }

    pub fn action(mut self, action: impl Action<C> + 'static) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    pub fn wait_after(mut self, wait: WaitPoint<C>) -> Self {
        self.after = Some(wait);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Upper bound on the time this step spends waiting
    pub fn budget(&self) -> Duration {
        [&self.before, &self.after]
            .into_iter()
            .flatten()
            .map(|w| w.spec().timeout())
            .sum()
    }

    /// Run pre-wait, action and post-wait in order
    pub async fn execute(&self, target: &C) -> Result<(), StepFailure> {
        if let Some(wait) = &self.before {
            tracing::debug!("Waiting for {}", wait.describe());
            wait.settle(target).await?;
        }
        if let Some(action) = &self.action {
            tracing::debug!("Performing {}", action.describe());
            action.perform(target).await?;
        }
        if let Some(wait) = &self.after {
            tracing::debug!("Waiting for {}", wait.describe());
            wait.settle(target).await?;
        }
        Ok(())
    }
}

/// An ordered list of steps making up one user journey
pub struct Scenario<C: ?Sized> {
    name: String,
    description: Option<String>,
    steps: Vec<Step<C>>,
}

impl<C: ?Sized + Sync> Scenario<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn step(mut self, step: Step<C>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn steps(&self) -> &[Step<C>] {
        &self.steps
    }

    /// Sum of every wait point's timeout
    pub fn budget(&self) -> Duration {
        self.steps.iter().map(|s| s.budget()).sum()
    }
}
