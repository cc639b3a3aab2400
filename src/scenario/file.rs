//! Scenario definitions loaded from YAML files
//!
//! ```yaml
//! name: login-only
//! steps:
//!   - name: "Navigate: login page"
//!     action: { kind: navigate, url: /login }
//!   - name: "Wait-for: login form"
//!     before:
//!       condition: { kind: visible, selector: "#email" }
//!       timeout_ms: 10000
//!   - name: "Action: submit credentials"
//!     action: { kind: type_text, selector: "#email", text: "{{email}}" }
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::driver::actions::{Click, ClickFirstIfAny, Navigate, Submit, TypeText};
use crate::driver::observe::{
    ElementInteractable, ElementPresent, ElementVisible, ElementWithText, LocationContains,
};
use crate::driver::{Driver, Selector};
use crate::wait::{AllOf, AnyOf, Observable, WaitSpec};

use super::{Scenario, Step, WaitPoint};

/// A scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct ScenarioFile {
    pub name: String,
    pub description: Option<String>,
    /// Surface the scenario drives
    #[serde(default)]
    pub target: FileTarget,
    pub steps: Vec<FileStep>,
}

#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileTarget {
    #[default]
    Ui,
    Api,
}

/// One step: optional wait, optional action, optional wait
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct FileStep {
    pub name: String,
    pub before: Option<FileWait>,
    pub action: Option<FileAction>,
    pub after: Option<FileWait>,
}

/// A wait point; unset timings fall back to the configured ones for the step
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct FileWait {
    pub condition: Condition,
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    /// Leads the diagnostic when the wait times out
    pub message: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Present { selector: Selector },
    Visible { selector: Selector },
    Interactable { selector: Selector },
    Text { selector: Selector, text: String },
    LocationContains { text: String },
    AllOf { conditions: Vec<Condition> },
    AnyOf { conditions: Vec<Condition> },
}

#[derive(Deserialize, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileAction {
    Navigate {
        url: String,
    },
    TypeText {
        selector: Selector,
        text: String,
        #[serde(default)]
        secret: bool,
    },
    Click {
        selector: Selector,
    },
    Submit {
        selector: Selector,
    },
    ClickFirstIfAny {
        selector: Selector,
    },
}

impl ScenarioFile {
    /// Load a scenario from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build a runnable browser scenario, expanding templates and validating waits
    pub fn compile(&self, config: &Config) -> Result<Scenario<dyn Driver>> {
        if self.target == FileTarget::Api {
            return Err(Error::Config(format!(
                "Scenario '{}': the api target is only available through the built-in 'api-login' scenario",
                self.name
            )));
        }

        let vars = Templates { config };
        let mut scenario = Scenario::new(self.name.clone());
        if let Some(description) = &self.description {
            scenario = scenario.describe(description.clone());
        }

        for step in &self.steps {
            let mut compiled = Step::new(step.name.clone());
            if let Some(wait) = &step.before {
                compiled = compiled.wait_before(wait.compile(&step.name, config, &vars)?);
            }
            if let Some(action) = &step.action {
                compiled = action.attach(compiled, config, &vars)?;
            }
            if let Some(wait) = &step.after {
                compiled = compiled.wait_after(wait.compile(&step.name, config, &vars)?);
            }
            scenario = scenario.step(compiled);
        }

        Ok(scenario)
    }
}

impl FileWait {
    fn compile(
        &self,
        step: &str,
        config: &Config,
        vars: &Templates<'_>,
    ) -> Result<WaitPoint<dyn Driver>> {
        let base = config.timeouts.wait_spec(step)?;
        let spec = WaitSpec::from_millis(
            self.timeout_ms
                .unwrap_or_else(|| base.timeout().as_millis() as u64),
            self.poll_interval_ms
                .unwrap_or_else(|| base.poll_interval().as_millis() as u64),
        )
        .map_err(|e| match e {
            Error::InvalidWait(m) => Error::InvalidWait(format!("step '{}': {}", step, m)),
            other => other,
        })?;

        let mut wait = WaitPoint::new(self.condition.observable(vars)?, spec);
        if let Some(message) = &self.message {
            wait = wait.on_timeout(message.clone());
        }
        Ok(wait)
    }
}

impl Condition {
    fn observable(&self, vars: &Templates<'_>) -> Result<Box<dyn Observable<dyn Driver>>> {
        let observable: Box<dyn Observable<dyn Driver>> = match self {
            Condition::Present { selector } => Box::new(ElementPresent(selector.clone())),
            Condition::Visible { selector } => Box::new(ElementVisible(selector.clone())),
            Condition::Interactable { selector } => {
                Box::new(ElementInteractable(selector.clone()))
            }
            Condition::Text { selector, text } => Box::new(ElementWithText {
                selector: selector.clone(),
                text: vars.expand(text)?,
            }),
            Condition::LocationContains { text } => {
                Box::new(LocationContains(vars.expand(text)?))
            }
            Condition::AllOf { conditions } => Box::new(AllOf::new(
                conditions
                    .iter()
                    .map(|c| c.observable(vars))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Condition::AnyOf { conditions } => Box::new(AnyOf::new(
                conditions
                    .iter()
                    .map(|c| c.observable(vars))
                    .collect::<Result<Vec<_>>>()?,
            )),
        };
        Ok(observable)
    }
}

impl FileAction {
    fn attach(
        &self,
        step: Step<dyn Driver>,
        config: &Config,
        vars: &Templates<'_>,
    ) -> Result<Step<dyn Driver>> {
        Ok(match self {
            FileAction::Navigate { url } => {
                step.action(Navigate(config.target.page_url(&vars.expand(url)?)))
            }
            FileAction::TypeText {
                selector,
                text,
                secret,
            } => step.action(TypeText {
                selector: selector.clone(),
                secret: *secret || text.contains("{{password}}"),
                text: vars.expand(text)?,
            }),
            FileAction::Click { selector } => step.action(Click(selector.clone())),
            FileAction::Submit { selector } => step.action(Submit(selector.clone())),
            FileAction::ClickFirstIfAny { selector } => {
                step.action(ClickFirstIfAny(selector.clone()))
            }
        })
    }
}

/// `{{name}}` substitution from configuration
struct Templates<'a> {
    config: &'a Config,
}

impl Templates<'_> {
    fn expand(&self, text: &str) -> Result<String> {
        let mut out = text
            .replace("{{base_url}}", self.config.target.base_url.trim_end_matches('/'))
            .replace("{{message}}", &self.config.journey.message);
        if out.contains("{{email}}") || out.contains("{{password}}") {
            let (email, password) = self.config.credentials.require()?;
            out = out
                .replace("{{email}}", email)
                .replace("{{password}}", password);
        }
        Ok(out)
    }
}
