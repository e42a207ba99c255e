//! Result accumulation and reporting.
//!
//! The [`Reporter`] is the single synchronization point of a run: every
//! worker records outcomes through it, and the same lock guards the one-line
//! console echo so concurrent completions never interleave mid-line.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of running a single test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Test passed
    Success,
    /// Test failed, with detail for the operator
    Failure(String),
    /// Test was skipped, with reason
    Skipped(String),
    /// Test did not complete within the deadline
    TimedOut,
}

impl Outcome {
    /// Check if the outcome is a pass
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Check if the outcome is a failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Check if the outcome is a skip
    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    /// Check if the outcome is a timeout
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Outcome::TimedOut)
    }
}

/// Aggregate of one full run: four append-only buckets, one per outcome
/// kind. Created empty, appended to as tests complete, read once at run end
/// to print the tally and compute the exit status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// Names of passing tests
    pub passed: Vec<String>,
    /// Skipped tests with (name, reason)
    pub skipped: Vec<(String, String)>,
    /// Names of tests that hit the deadline
    pub timed_out: Vec<String>,
    /// Failed tests with (name, detail)
    pub failed: Vec<(String, String)>,
}

impl RunSummary {
    /// Create a new empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one outcome to its bucket
    pub fn record(&mut self, name: &str, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.passed.push(name.to_string()),
            Outcome::Failure(detail) => self.failed.push((name.to_string(), detail)),
            Outcome::Skipped(reason) => self.skipped.push((name.to_string(), reason)),
            Outcome::TimedOut => self.timed_out.push(name.to_string()),
        }
    }

    /// Total number of recorded outcomes
    pub fn total(&self) -> usize {
        self.passed.len() + self.skipped.len() + self.timed_out.len() + self.failed.len()
    }

    /// Pass rate as a percentage of recorded outcomes
    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            (self.passed.len() as f64 / self.total() as f64) * 100.0
        }
    }

    /// Whether the run is green: no failures. Skips and timeouts do not
    /// count against this.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Process exit status: zero only if the failed bucket is empty
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// Export as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Print the final tally: counts per bucket, identity lists for the
    /// skipped, timed-out, and failed buckets, and elapsed wall-clock.
    pub fn print(&self, elapsed: Duration) {
        println!();
        println!("Result:");
        println!("\t{} passed", self.passed.len());
        println!("\t{} skipped:", self.skipped.len());
        for (name, reason) in &self.skipped {
            println!("\t\t{name}: {reason}");
        }
        println!("\t{} timed out:", self.timed_out.len());
        for name in &self.timed_out {
            println!("\t\t{name}");
        }
        println!("\t{} failed:", self.failed.len());
        for (name, _) in &self.failed {
            println!("\t\t{name}");
        }
        println!("\tTime: {:.2}s", elapsed.as_secs_f64());
    }
}

/// Serialized sink for outcomes, shared by every worker.
///
/// One lock covers both the summary append and the console echo; it is held
/// for exactly one record plus one print.
#[derive(Debug, Default)]
pub struct Reporter {
    inner: Mutex<RunSummary>,
}

impl Reporter {
    /// Create a reporter with an empty summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome and echo its one-line status
    pub fn record(&self, name: &str, outcome: Outcome) {
        let mut summary = self.inner.lock();
        match &outcome {
            Outcome::Success => println!("{name}: ok."),
            Outcome::Skipped(_) => println!("{name}: skipped."),
            Outcome::TimedOut => println!("{name}: timeout"),
            Outcome::Failure(detail) => println!("{name}: {detail}"),
        }
        summary.record(name, outcome);
    }

    /// Consume the reporter and hand back the accumulated summary
    pub fn finish(self) -> RunSummary {
        self.inner.into_inner()
    }
}
