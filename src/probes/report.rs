//! Probe results.
//!
//! A [`ProbeReport`] is an append-only list of human-readable status lines
//! plus an overall [`ProbeOutcome`]. Probes push lines as they go; a failed
//! check or a caught error flips the outcome to `Failed`, and nothing flips it
//! back.

use std::fmt::Display;
use std::time::Instant;

use chrono::{DateTime, Utc};

use super::ProbeKind;
use crate::infrastructure::ProbeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Passed,
    Failed,
}

impl ProbeOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProbeOutcome {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    kind: ProbeKind,
    lines: Vec<String>,
    outcome: ProbeOutcome,
    started_at: DateTime<Utc>,
    started: Instant,
    elapsed_ms: Option<u64>,
}

impl ProbeReport {
    /// Starts an empty, passing report.
    #[must_use]
    pub fn begin(kind: ProbeKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
            outcome: ProbeOutcome::Passed,
            started_at: Utc::now(),
            started: Instant::now(),
            elapsed_ms: None,
        }
    }

    pub fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    pub fn section(&mut self, title: impl Display) {
        self.lines.push(format!("=== {title} ==="));
    }

    /// Appends `label: PASS` or `label: FAIL`.
    pub fn check(&mut self, label: impl Display, passed: bool) {
        let verdict = if passed { "PASS" } else { "FAIL" };
        self.lines.push(format!("{label}: {verdict}"));
        if !passed {
            self.outcome = ProbeOutcome::Failed;
        }
    }

    /// Records a caught error and marks the report failed.
    pub fn fail(&mut self, error: &ProbeError) {
        self.lines
            .push(format!("{} test failed: {error}", self.kind.display_name()));
        self.outcome = ProbeOutcome::Failed;
    }

    /// Freezes the elapsed time. Calling it again keeps the first value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn finish(mut self) -> Self {
        if self.elapsed_ms.is_none() {
            self.elapsed_ms = Some(self.started.elapsed().as_millis() as u64);
        }
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ProbeKind {
        self.kind
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[must_use]
    pub const fn outcome(&self) -> ProbeOutcome {
        self.outcome
    }

    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Passed)
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed milliseconds, or `None` until [`ProbeReport::finish`] is called.
    #[must_use]
    pub const fn elapsed_ms(&self) -> Option<u64> {
        self.elapsed_ms
    }

    /// Renders the report as plain text, one entry per line.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut text = format!(
            "{} ({}): {}\n",
            self.kind.display_name(),
            self.kind.slug(),
            self.outcome
        );
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}
