//! Unit tests for the executor and outcome evaluator

use std::fs;

use ljs_harness::exec;
use ljs_harness::report::Outcome;

#[test]
fn test_success_marker_lowercase() {
    assert!(exec::contains_success_marker("passed"));
    assert!(exec::contains_success_marker("17 tests passed\n"));
}

#[test]
fn test_success_marker_capitalized() {
    assert!(exec::contains_success_marker("Passed"));
    assert!(exec::contains_success_marker("...Passed 3 assertions...\n"));
}

#[test]
fn test_success_marker_rejects_other_spellings() {
    assert!(!exec::contains_success_marker("PASSED"));
    assert!(!exec::contains_success_marker("pass"));
    assert!(!exec::contains_success_marker("FAILED"));
    assert!(!exec::contains_success_marker(""));
}

#[test]
fn test_compare_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().join("add.out.ljs");
    fs::write(&expected, "2\n").unwrap();
    let outcome = exec::compare_expected(Some(expected.as_path()), b"2\n");
    assert!(outcome.is_success());
}

#[test]
fn test_compare_trailing_newline_divergence_fails() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().join("add.out.ljs");
    fs::write(&expected, "2").unwrap();
    let outcome = exec::compare_expected(Some(expected.as_path()), b"2\n");
    assert!(outcome.is_failure());
}

#[test]
fn test_compare_missing_expected_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().join("gone.out.ljs");
    let outcome = exec::compare_expected(Some(expected.as_path()), b"2\n");
    assert!(outcome.is_failure());
}

#[test]
fn test_compare_without_expected_path_fails() {
    let outcome = exec::compare_expected(None, b"2\n");
    assert!(outcome.is_failure());
}

#[cfg(unix)]
mod subprocess {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use ljs_harness::error::HarnessError;
    use ljs_harness::exec;
    use ljs_harness::fixture::{ExecRequest, TestCase};
    use ljs_harness::report::Outcome;

    const TIMEOUT: Duration = Duration::from_secs(10);

    /// Write an executable shell script standing in for a binary under test.
    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn case(dir: &Path, stem: &str) -> TestCase {
        let name = dir.join(stem).to_str().unwrap().to_string();
        TestCase {
            input: PathBuf::from(format!("{name}.in.ljs")),
            expected: Some(PathBuf::from(format!("{name}.out.ljs"))),
            skip_marker: None,
            name,
        }
    }

    #[test]
    fn test_skip_marker_short_circuits_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let mut case = case(dir.path(), "foo");
        case.skip_marker = Some(dir.path().join("foo.skip"));
        fs::write(&case.input, "1;\n").unwrap();
        fs::write(case.skip_marker.as_ref().unwrap(), "flaky on CI\n").unwrap();

        // The interpreter path does not exist: reaching spawn would error.
        let missing = dir.path().join("missing-interpreter");
        let outcome = exec::run_request(&missing, &ExecRequest::Plain(case), TIMEOUT).unwrap();
        assert_eq!(outcome, Outcome::Skipped("flaky on CI".to_string()));
    }

    #[test]
    fn test_eval_test_skipped_without_invoking_tool() {
        let dir = tempfile::tempdir().unwrap();
        let name = dir.path().join("obj-eval.js").to_str().unwrap().to_string();
        let case = TestCase {
            input: PathBuf::from(&name),
            expected: None,
            skip_marker: None,
            name,
        };

        // Both binaries are absent: any spawn attempt would be a fault.
        let request = ExecRequest::Desugared {
            env_dump: None,
            desugar_bin: dir.path().join("missing-tool"),
            case,
        };
        let missing = dir.path().join("missing-interpreter");
        let outcome = exec::run_request(&missing, &request, TIMEOUT).unwrap();
        assert_eq!(outcome, Outcome::Skipped("Requires eval".to_string()));
    }

    #[test]
    fn test_plain_mode_exact_match_passes() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_script(dir.path(), "eval.native", "cat");
        let case = case(dir.path(), "add");
        fs::write(&case.input, "1+1;\n").unwrap();
        fs::write(case.expected.as_ref().unwrap(), "1+1;\n").unwrap();

        let outcome = exec::run_request(&interpreter, &ExecRequest::Plain(case), TIMEOUT).unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[test]
    fn test_plain_mode_trailing_newline_fails() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_script(dir.path(), "eval.native", "cat");
        let case = case(dir.path(), "add");
        fs::write(&case.input, "1+1;\n").unwrap();
        fs::write(case.expected.as_ref().unwrap(), "1+1;").unwrap();

        let outcome = exec::run_request(&interpreter, &ExecRequest::Plain(case), TIMEOUT).unwrap();
        assert!(outcome.is_failure());
    }

    #[test]
    fn test_plain_mode_nonzero_exit_fails_without_comparison() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_script(dir.path(), "eval.native", "exit 3");
        let case = case(dir.path(), "crash");
        fs::write(&case.input, "1;\n").unwrap();
        // No expected-output file: the comparison must never be reached.

        let outcome = exec::run_request(&interpreter, &ExecRequest::Plain(case), TIMEOUT).unwrap();
        match outcome {
            Outcome::Failure(detail) => assert!(detail.contains("exit")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_hanging_interpreter_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_script(dir.path(), "eval.native", "sleep 5");
        let case = case(dir.path(), "hang");
        fs::write(&case.input, "1;\n").unwrap();

        let outcome = exec::run_request(
            &interpreter,
            &ExecRequest::Plain(case),
            Duration::from_millis(200),
        )
        .unwrap();
        assert_eq!(outcome, Outcome::TimedOut);
    }

    #[test]
    fn test_env_mode_passes_load_flag() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_script(dir.path(), "eval.native", "printf '%s\\n' \"$@\"");
        let env_dump = dir.path().join("es5.dump");
        let case = case(dir.path(), "scoped");
        fs::write(&case.input, "1;\n").unwrap();
        fs::write(
            case.expected.as_ref().unwrap(),
            format!("-load\n{}\nstdin\n", env_dump.display()),
        )
        .unwrap();

        let request = ExecRequest::Env {
            env_dump: env_dump.clone(),
            case,
        };
        let outcome = exec::run_request(&interpreter, &request, TIMEOUT).unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[test]
    fn test_desugared_mode_accepts_marker() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_script(dir.path(), "eval.native", "cat");
        let tool = write_script(dir.path(), "ljs", "echo \"Passed 3 assertions\"");
        let name = dir.path().join("array.js").to_str().unwrap().to_string();
        let case = TestCase {
            input: PathBuf::from(&name),
            expected: None,
            skip_marker: None,
            name,
        };

        let request = ExecRequest::Desugared {
            env_dump: None,
            desugar_bin: tool,
            case,
        };
        let outcome = exec::run_request(&interpreter, &request, TIMEOUT).unwrap();
        assert_eq!(outcome, Outcome::Success);
    }

    #[test]
    fn test_desugared_mode_surfaces_output_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let interpreter = write_script(dir.path(), "eval.native", "cat >/dev/null\necho assertion 2 blew up");
        let tool = write_script(dir.path(), "ljs", "echo \"var x = 1;\"");
        let name = dir.path().join("array.js").to_str().unwrap().to_string();
        let case = TestCase {
            input: PathBuf::from(&name),
            expected: None,
            skip_marker: None,
            name,
        };

        let request = ExecRequest::Desugared {
            env_dump: None,
            desugar_bin: tool,
            case,
        };
        let outcome = exec::run_request(&interpreter, &request, TIMEOUT).unwrap();
        assert_eq!(
            outcome,
            Outcome::Failure("assertion 2 blew up\n".to_string())
        );
    }

    #[test]
    fn test_missing_interpreter_is_a_harness_fault() {
        let dir = tempfile::tempdir().unwrap();
        let case = case(dir.path(), "add");
        fs::write(&case.input, "1;\n").unwrap();

        let missing = dir.path().join("missing-interpreter");
        let result = exec::run_request(&missing, &ExecRequest::Plain(case), TIMEOUT);
        assert!(matches!(result, Err(HarnessError::Spawn { .. })));
    }
}
