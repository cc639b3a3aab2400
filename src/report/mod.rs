//! Scenario results and reporters
//!
//! A [`ScenarioResult`] is assembled by the runner through a
//! [`ScenarioRecorder`] and sealed once the scenario ends; from then on it is
//! read-only. Reporters turn a sealed result into text for a terminal or a
//! JSON record for CI. Emitting is the only I/O the report layer does.

mod json;
mod text;

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio::time::Instant;

use crate::common::{paths, Result};
use crate::scenario::StepFailure;

pub use json::JsonReporter;
pub use text::TextReporter;

/// Status of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    TimedOut,
}

/// Overall status of a scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    Passed,
    /// A wait timed out or an assertion failed
    Failed,
    /// An action itself failed
    Errored,
}

impl ScenarioStatus {
    /// Process exit code for this status
    pub fn exit_code(&self) -> i32 {
        match self {
            ScenarioStatus::Passed => 0,
            ScenarioStatus::Failed => 1,
            ScenarioStatus::Errored => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScenarioStatus::Passed => "Passed",
            ScenarioStatus::Failed => "Failed",
            ScenarioStatus::Errored => "Errored",
        }
    }
}

/// Failure taxonomy as it appears in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TimedOut,
    ActionError,
    AssertionFailed,
}

/// Everything known about why a step failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: FailureKind,
    /// Error code for action errors (e.g. `ELEMENT_NOT_FOUND`, `HTTP_STATUS`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub message: String,
    /// Evidence captured from the session after the failure
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<String>,
}

impl From<&StepFailure> for Diagnostic {
    fn from(failure: &StepFailure) -> Self {
        let (kind, category) = match failure {
            StepFailure::TimedOut { .. } => (FailureKind::TimedOut, None),
            StepFailure::ActionError { category, .. } => {
                (FailureKind::ActionError, Some(category.clone()))
            }
            StepFailure::AssertionFailed(_) => (FailureKind::AssertionFailed, None),
        };
        Self {
            kind,
            category,
            message: failure.to_string(),
            evidence: Vec::new(),
        }
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    name: String,
    status: StepStatus,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    elapsed: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostic: Option<Diagnostic>,
}

impl StepResult {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> StepStatus {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        self.diagnostic.as_ref()
    }
}

/// Sealed outcome of a whole scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioResult {
    scenario: String,
    status: ScenarioStatus,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    elapsed: Duration,
    steps: Vec<StepResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    teardown_error: Option<String>,
}

impl ScenarioResult {
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    pub fn status(&self) -> ScenarioStatus {
        self.status
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Error raised while releasing the session, if any
    pub fn teardown_error(&self) -> Option<&str> {
        self.teardown_error.as_deref()
    }

    /// The first (and only) failing step
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.status != StepStatus::Passed)
    }

    pub fn passed(&self) -> bool {
        self.status == ScenarioStatus::Passed
    }
}

/// In-flight result owned by the runner while a scenario executes
#[derive(Debug)]
pub struct ScenarioRecorder {
    scenario: String,
    started: Instant,
    status: ScenarioStatus,
    steps: Vec<StepResult>,
    in_flight: Option<(String, Instant)>,
    teardown_error: Option<String>,
}

impl ScenarioRecorder {
    pub fn start(scenario: &str) -> Self {
        Self {
            scenario: scenario.to_string(),
            started: Instant::now(),
            status: ScenarioStatus::Passed,
            steps: Vec::new(),
            in_flight: None,
            teardown_error: None,
        }
    }

    pub fn status(&self) -> ScenarioStatus {
        self.status
    }

    pub fn begin_step(&mut self, name: &str) {
        self.in_flight = Some((name.to_string(), Instant::now()));
    }

    /// Record the outcome of the in-flight step
    ///
    /// Returns `false` when the scenario must stop.
    pub fn finish_step(&mut self, outcome: std::result::Result<(), StepFailure>) -> bool {
        let (name, started) = self
            .in_flight
            .take()
            .unwrap_or_else(|| ("(unnamed step)".to_string(), Instant::now()));
        let elapsed = started.elapsed();

        match outcome {
            Ok(()) => {
                self.steps.push(StepResult {
                    name,
                    status: StepStatus::Passed,
                    elapsed,
                    diagnostic: None,
                });
                true
            }
            Err(failure) => {
                let (step_status, scenario_status) = match &failure {
                    StepFailure::TimedOut { .. } => (StepStatus::TimedOut, ScenarioStatus::Failed),
                    StepFailure::AssertionFailed(_) => (StepStatus::Failed, ScenarioStatus::Failed),
                    StepFailure::ActionError { .. } => {
                        (StepStatus::Failed, ScenarioStatus::Errored)
                    }
                };
                self.steps.push(StepResult {
                    name,
                    status: step_status,
                    elapsed,
                    diagnostic: Some(Diagnostic::from(&failure)),
                });
                self.status = scenario_status;
                false
            }
        }
    }

    /// Record a failure for whatever step was running when the scenario was cut short
    pub fn interrupt(&mut self, failure: StepFailure) {
        if self.in_flight.is_none() {
            self.begin_step("(interrupted)");
        }
        self.finish_step(Err(failure));
    }

    /// Attach evidence to the failing step
    pub fn attach_evidence(&mut self, evidence: Vec<String>) {
        if evidence.is_empty() {
            return;
        }
        if let Some(diagnostic) = self
            .steps
            .iter_mut()
            .rev()
            .find_map(|s| s.diagnostic.as_mut())
        {
            diagnostic.evidence.extend(evidence);
        }
    }

    pub fn teardown_failed(&mut self, message: String) {
        self.teardown_error = Some(message);
    }

    pub fn seal(self) -> ScenarioResult {
        ScenarioResult {
            scenario: self.scenario,
            status: self.status,
            elapsed: self.started.elapsed(),
            steps: self.steps,
            teardown_error: self.teardown_error,
        }
    }
}

/// Output format for the scenario report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Turns a sealed result into an external representation
pub trait Reporter {
    fn render(&self, result: &ScenarioResult) -> Result<String>;
}

/// Reporter for a format; colors only apply to text written to a terminal
pub fn reporter_for(format: ReportFormat, color: bool) -> Box<dyn Reporter> {
    match format {
        ReportFormat::Text => Box::new(TextReporter::new(color)),
        ReportFormat::Json => Box::new(JsonReporter),
    }
}

/// Render `result` and write it to `sink`
pub fn emit(result: &ScenarioResult, reporter: &dyn Reporter, sink: &mut dyn Write) -> Result<()> {
    let rendered = reporter.render(result)?;
    sink.write_all(rendered.as_bytes())?;
    if !rendered.ends_with('\n') {
        sink.write_all(b"\n")?;
    }
    sink.flush()?;
    Ok(())
}

/// Write a report file, creating parent directories as needed
pub fn write_file(result: &ScenarioResult, reporter: &dyn Reporter, path: &Path) -> Result<()> {
    paths::ensure_parent_dir(path)?;
    let mut file = std::fs::File::create(path)?;
    emit(result, reporter, &mut file)?;
    tracing::info!("Report written to {}", path.display());
    Ok(())
}

/// Format a duration the way reports show it
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}
