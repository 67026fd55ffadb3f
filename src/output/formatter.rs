//! Summary formatters
//!
//! Plain text for people, JSON for tooling and for the pager's reruns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::models::Reporter;
use crate::utils::Timer;

/// Output format options
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "plain" | "text" => Some(OutputFormat::Plain),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Json => "json",
        }
    }
}

/// Machine-readable summary of a run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JsonReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    #[serde(flatten)]
    pub reporter: Reporter,
}

impl JsonReport {
    pub fn new(reporter: &Reporter, timer: &Timer) -> Self {
        Self {
            started_at: timer.started_at(),
            elapsed_secs: timer.elapsed_secs(),
            reporter: reporter.clone(),
        }
    }
}

/// Counters and timing, optionally followed by one line per failure
pub fn summary(reporter: &Reporter, elapsed_secs: f64, with_failures: bool) -> String {
    let report = if with_failures && !reporter.failures().is_empty() {
        let lines: Vec<String> = reporter.failures().iter().map(ToString::to_string).collect();
        format!("\n\n{}", lines.join("\n"))
    } else {
        String::new()
    };

    format!(
        "Tests: {} Expectations: {}\nPassed: {} Failures: {}{report}\n\nFinished in {elapsed_secs} seconds\n",
        reporter.test_count(),
        reporter.expectation_count(),
        reporter.success_count(),
        reporter.failure_count(),
    )
}

/// Final report printer for non-interactive runs
pub struct SummaryFormatter {
    format: OutputFormat,
}

impl SummaryFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_summary(&self, reporter: &Reporter, timer: &Timer) -> anyhow::Result<String> {
        match self.format {
            // Two blank lines separate the summary from the progress glyphs
            OutputFormat::Plain => Ok(format!(
                "\n\n{}",
                summary(reporter, timer.elapsed_secs(), true)
            )),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&JsonReport::new(reporter, timer))?;
                Ok(format!("{json}\n"))
            }
        }
    }

    pub fn write_summary(
        &self,
        out: &mut impl Write,
        reporter: &Reporter,
        timer: &Timer,
    ) -> anyhow::Result<()> {
        out.write_all(self.format_summary(reporter, timer)?.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl Default for SummaryFormatter {
    fn default() -> Self {
        Self::new(OutputFormat::Plain)
    }
}
