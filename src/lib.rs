//! Journey - end-to-end journey harness
//!
//! A scenario is a fixed list of steps, each synchronized by the wait engine
//! on an observable post-condition. The runner executes it fail-fast against
//! an exclusively owned session and always releases that session; the
//! reporter turns the sealed result into text or JSON.

pub mod api;
pub mod cli;
pub mod commands;
pub mod common;
pub mod driver;
pub mod report;
pub mod scenario;
pub mod wait;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use report::{ScenarioResult, ScenarioStatus, StepResult, StepStatus};
pub use scenario::{Runner, Scenario, Session, Step, StepFailure};
