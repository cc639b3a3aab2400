//! Scenario definition and execution
//!
//! A scenario is data: an ordered list of [`Step`]s, each an optional wait,
//! an optional action and another optional wait. The [`Runner`] executes it
//! against a [`Session`] with fail-fast semantics.

mod file;
mod journeys;
mod runner;
mod session;
mod step;

pub use file::ScenarioFile;
pub use journeys::{api_login, builtin, messaging, Builtin, BUILTINS};
pub use runner::{Runner, DEFAULT_DEADLINE_MARGIN};
pub use session::Session;
pub use step::{Action, Scenario, Sequence, Step, StepFailure, WaitPoint};
