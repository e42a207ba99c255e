//! LambdaJS ES5 Conformance Harness
//!
//! This crate runs the LambdaJS conformance suite against a compiled ES5
//! interpreter binary: it discovers fixture files, executes each test as a
//! child process under a hard wall-clock timeout, compares captured output
//! against an expected-output file or a textual success marker, and
//! aggregates pass/fail/skip/timeout results into a report with a
//! CI-gating exit code.

pub mod error;
pub mod exec;
pub mod fixture;
pub mod report;
pub mod scheduler;

pub use error::{HarnessError, HarnessResult};
pub use fixture::{DesugarConfig, ExecRequest, RunConfig, TestCase};
pub use report::{Outcome, Reporter, RunSummary};
pub use scheduler::CancellationToken;
