//! Human-readable report

use std::fmt::Write as _;

use colored::{ColoredString, Colorize};

use super::{format_duration, Reporter, ScenarioResult, ScenarioStatus, StepStatus};
use crate::common::Result;

/// Renders a scenario the way the terminal shows it
pub struct TextReporter {
    color: bool,
}

impl TextReporter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

impl Reporter for TextReporter {
    fn render(&self, result: &ScenarioResult) -> Result<String> {
        let mut out = String::new();

        let _ = writeln!(
            out,
            "{} {}",
            self.paint("Scenario:", |s| s.blue().bold()),
            self.paint(result.scenario(), |s| s.white().bold())
        );

        for (i, step) in result.steps().iter().enumerate() {
            let marker = match step.status() {
                StepStatus::Passed => self.paint("✓", |s| s.green()),
                StepStatus::Failed => self.paint("✗", |s| s.red()),
                StepStatus::TimedOut => self.paint("⏱", |s| s.red()),
            };
            let _ = writeln!(
                out,
                "  {} Step {}: {} {}",
                marker,
                i + 1,
                step.name(),
                self.paint(&format!("({})", format_duration(step.elapsed())), |s| s
                    .dimmed())
            );

            if let Some(diagnostic) = step.diagnostic() {
                let kind = match &diagnostic.category {
                    Some(category) => format!("{:?} [{}]", diagnostic.kind, category),
                    None => format!("{:?}", diagnostic.kind),
                };
                let _ = writeln!(
                    out,
                    "      {} {}",
                    self.paint(&format!("{}:", kind), |s| s.red()),
                    diagnostic.message
                );
                for line in &diagnostic.evidence {
                    let _ = writeln!(out, "      {}", self.paint(line, |s| s.dimmed()));
                }
            }
        }

        if let Some(err) = result.teardown_error() {
            let _ = writeln!(
                out,
                "  {} {}",
                self.paint("teardown:", |s| s.yellow()),
                err
            );
        }

        let summary = format!(
            "{} {} in {} ({} steps)",
            if result.passed() { "✓" } else { "✗" },
            result.status().label(),
            format_duration(result.elapsed()),
            result.steps().len()
        );
        let _ = writeln!(
            out,
            "\n{}",
            match result.status() {
                ScenarioStatus::Passed => self.paint(&summary, |s| s.green().bold()),
                ScenarioStatus::Failed | ScenarioStatus::Errored => {
                    self.paint(&summary, |s| s.red().bold())
                }
            }
        );

        Ok(out)
    }
}
