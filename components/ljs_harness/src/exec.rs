//! Subprocess execution and outcome evaluation.
//!
//! One [`ExecRequest`] becomes at most two child processes: the desugaring
//! tool (desugared mode only) and the interpreter. The whole request shares
//! a single wall-clock deadline; a child still running at the deadline is
//! killed and reaped, and the test is recorded as timed out.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{HarnessError, HarnessResult};
use crate::fixture::{ExecRequest, TestCase};
use crate::report::Outcome;

/// Default hard wall-clock limit per test
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(240);

/// Final positional argument telling the interpreter that the program
/// source arrives on standard input
pub const STDIN_ARG: &str = "stdin";

/// How often a worker polls a running child for completion
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Where a child's standard input comes from
enum StdinSource {
    /// Nothing; the stream is closed
    Null,
    /// An opened fixture file handed to the child directly
    File(PathBuf),
    /// Bytes piped in from a writer thread
    Bytes(Vec<u8>),
}

/// A completed child: exit status plus drained standard output
struct Captured {
    status: ExitStatus,
    stdout: Vec<u8>,
}

/// Result of waiting on a child under a deadline
enum Wait {
    Completed(Captured),
    DeadlineExceeded,
}

/// Execute a single request end to end and evaluate its outcome.
///
/// Skip conditions short-circuit before any process is spawned. Timeouts are
/// ordinary outcomes; only faults in the harness itself (a binary that
/// cannot be spawned, a broken pipe wiring) surface as errors.
pub fn run_request(
    interpreter: &Path,
    request: &ExecRequest,
    timeout: Duration,
) -> HarnessResult<Outcome> {
    let case = request.case();

    if let Some(marker) = &case.skip_marker {
        let reason = fs::read_to_string(marker).map_err(|source| HarnessError::Io {
            path: marker.clone(),
            source,
        })?;
        return Ok(Outcome::Skipped(reason.trim_end().to_string()));
    }

    let deadline = Instant::now() + timeout;
    match request {
        ExecRequest::Plain(case) => run_compare(interpreter, None, case, deadline),
        ExecRequest::Env { env_dump, case } => {
            run_compare(interpreter, Some(env_dump.as_path()), case, deadline)
        }
        ExecRequest::Desugared {
            env_dump,
            desugar_bin,
            case,
        } => {
            if case.requires_eval() {
                return Ok(Outcome::Skipped("Requires eval".to_string()));
            }
            run_desugared(interpreter, env_dump.as_deref(), desugar_bin, case, deadline)
        }
    }
}

/// Plain and env-preloaded modes: feed the fixture on stdin, then compare
/// captured output byte-for-byte against the expected-output file.
fn run_compare(
    interpreter: &Path,
    env_dump: Option<&Path>,
    case: &TestCase,
    deadline: Instant,
) -> HarnessResult<Outcome> {
    let command = interpreter_command(interpreter, env_dump);
    let captured = match run_child(
        command,
        StdinSource::File(case.input.clone()),
        deadline,
    )? {
        Wait::Completed(captured) => captured,
        Wait::DeadlineExceeded => return Ok(Outcome::TimedOut),
    };

    // A crashing interpreter is a failure in its own right; there is nothing
    // meaningful to compare.
    if !captured.status.success() {
        return Ok(Outcome::Failure(format!(
            "interpreter exited with {}",
            captured.status
        )));
    }

    Ok(compare_expected(case.expected.as_deref(), &captured.stdout))
}

/// Desugared mode: lower the test through the desugaring tool, pipe the
/// result to the interpreter, and look for the success marker.
fn run_desugared(
    interpreter: &Path,
    env_dump: Option<&Path>,
    desugar_bin: &Path,
    case: &TestCase,
    deadline: Instant,
) -> HarnessResult<Outcome> {
    let mut desugar = Command::new(desugar_bin);
    desugar.arg("-desugar").arg(&case.input).arg("-print-src");

    let desugared = match run_child(desugar, StdinSource::Null, deadline)? {
        Wait::Completed(captured) => captured,
        Wait::DeadlineExceeded => return Ok(Outcome::TimedOut),
    };
    if !desugared.status.success() {
        // The tool's exit status is advisory; a bad lowering simply fails
        // the marker check downstream.
        tracing::debug!(test = %case.name, status = %desugared.status, "desugaring tool exited non-zero");
    }

    let command = interpreter_command(interpreter, env_dump);
    let captured = match run_child(command, StdinSource::Bytes(desugared.stdout), deadline)? {
        Wait::Completed(captured) => captured,
        Wait::DeadlineExceeded => return Ok(Outcome::TimedOut),
    };

    let output = String::from_utf8_lossy(&captured.stdout);
    if contains_success_marker(&output) {
        Ok(Outcome::Success)
    } else {
        Ok(Outcome::Failure(output.into_owned()))
    }
}

/// Whether desugared-mode output proves a passing run. Exactly the two
/// spellings `passed` and `Passed` are recognized, anywhere in the text.
pub fn contains_success_marker(output: &str) -> bool {
    output.contains("passed") || output.contains("Passed")
}

/// Byte-exact comparison against the expected-output file. Any divergence,
/// including a trailing-newline difference, is a failure; there is no
/// normalization or fuzzy match.
pub fn compare_expected(expected: Option<&Path>, actual: &[u8]) -> Outcome {
    let Some(expected_path) = expected else {
        return Outcome::Failure("no expected-output file for this case".to_string());
    };
    match fs::read(expected_path) {
        Ok(expected) if expected == actual => Outcome::Success,
        Ok(expected) => Outcome::Failure(format!(
            "output mismatch\n--- expected ({})\n{}--- actual\n{}",
            expected_path.display(),
            String::from_utf8_lossy(&expected),
            String::from_utf8_lossy(actual),
        )),
        Err(e) => Outcome::Failure(format!(
            "cannot read expected output {}: {}",
            expected_path.display(),
            e
        )),
    }
}

/// Build the interpreter invocation: `[-load <env>] stdin`.
fn interpreter_command(interpreter: &Path, env_dump: Option<&Path>) -> Command {
    let mut command = Command::new(interpreter);
    if let Some(env) = env_dump {
        command.arg("-load").arg(env);
    }
    command.arg(STDIN_ARG);
    command
}

/// Spawn a child, drain its stdout on a background thread, and poll for
/// completion until the deadline.
///
/// Stdout is drained off-thread so the pipe buffer can never fill up and
/// wedge a chatty child. Stderr is discarded: it plays no part in pass/fail
/// decisions and would interleave as noise across concurrent tests. On
/// deadline the child is killed and reaped before we report the timeout, so
/// no orphan survives the run.
fn run_child(mut command: Command, stdin: StdinSource, deadline: Instant) -> HarnessResult<Wait> {
    let program = command.get_program().to_string_lossy().into_owned();
    command.stdout(Stdio::piped()).stderr(Stdio::null());

    let payload = match stdin {
        StdinSource::Null => {
            command.stdin(Stdio::null());
            None
        }
        StdinSource::File(path) => {
            let file = File::open(&path).map_err(|source| HarnessError::Io {
                path: path.clone(),
                source,
            })?;
            command.stdin(Stdio::from(file));
            None
        }
        StdinSource::Bytes(bytes) => {
            command.stdin(Stdio::piped());
            Some(bytes)
        }
    };

    tracing::debug!(program = %program, args = ?command.get_args().collect::<Vec<_>>(), "spawning");
    let mut child = command.spawn().map_err(|source| HarnessError::Spawn {
        program: program.clone(),
        source,
    })?;

    let mut writer = match payload {
        Some(bytes) => {
            let mut pipe = child.stdin.take().ok_or_else(|| HarnessError::MissingPipe {
                program: program.clone(),
                stream: "stdin",
            })?;
            // Closing the pipe on thread exit is what signals EOF to the child.
            Some(thread::spawn(move || {
                let _ = pipe.write_all(&bytes);
            }))
        }
        None => None,
    };

    let stdout = child.stdout.take().ok_or_else(|| HarnessError::MissingPipe {
        program: program.clone(),
        stream: "stdout",
    })?;
    let reader = thread::spawn(move || {
        let mut stdout = stdout;
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf);
        buf
    });

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if let Some(handle) = writer.take() {
                    let _ = handle.join();
                }
                let stdout = reader.join().unwrap_or_default();
                return Ok(Wait::Completed(Captured { status, stdout }));
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    tracing::warn!(program = %program, "deadline exceeded, killing child");
                    let _ = child.kill();
                    let _ = child.wait();
                    if let Some(handle) = writer.take() {
                        let _ = handle.join();
                    }
                    let _ = reader.join();
                    return Ok(Wait::DeadlineExceeded);
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                if let Some(handle) = writer.take() {
                    let _ = handle.join();
                }
                let _ = reader.join();
                return Err(HarnessError::Wait { program, source });
            }
        }
    }
}
