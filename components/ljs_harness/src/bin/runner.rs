//! LambdaJS Conformance Runner
//!
//! Command-line entry point. Invoked with no positional arguments it runs
//! only the `no-env/` fixture family; with an environment dump it adds
//! `with-env/`; with a desugaring binary and its test directory it adds the
//! pre-desugared family as well.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use ljs_harness::exec;
use ljs_harness::fixture::{self, DesugarConfig, RunConfig};
use ljs_harness::report::Reporter;
use ljs_harness::scheduler;

/// Exit status for an interpreter binary that cannot be used
const EXIT_BAD_INTERPRETER: i32 = 3;

#[derive(Parser, Debug)]
#[command(
    name = "ljs-runner",
    about = "Run the LambdaJS ES5 conformance suite against an interpreter binary",
    version
)]
struct Cli {
    /// ES5 environment dump to preload (enables the with-env fixture family)
    env_dump: Option<PathBuf>,

    /// LambdaJS desugaring binary (enables the pre-desugared family)
    #[arg(requires = "desugar_tests")]
    desugar_bin: Option<PathBuf>,

    /// Directory of pre-desugared *.js tests
    #[arg(requires = "desugar_bin")]
    desugar_tests: Option<PathBuf>,

    /// Root directory holding the no-env/ and with-env/ fixture families
    #[arg(long, default_value = "tests")]
    tests_root: PathBuf,

    /// Interpreter binary under test
    #[arg(long, default_value = "build/eval.native")]
    interpreter: PathBuf,

    /// Hard wall-clock limit per test, in seconds
    #[arg(long, default_value_t = exec::DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Worker threads running tests in parallel
    #[arg(long, default_value_t = scheduler::DEFAULT_WORKERS)]
    jobs: usize,

    /// Write the final summary as JSON to this path
    #[arg(long)]
    json_report: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr so per-test status lines own stdout.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    if !cli.interpreter.exists() {
        eprintln!(
            "interpreter binary not found: {}",
            cli.interpreter.display()
        );
        process::exit(EXIT_BAD_INTERPRETER);
    }

    let config = RunConfig {
        tests_root: cli.tests_root,
        interpreter: cli.interpreter,
        env_dump: cli.env_dump,
        desugar: match (cli.desugar_bin, cli.desugar_tests) {
            (Some(bin), Some(tests_dir)) => Some(DesugarConfig { bin, tests_dir }),
            _ => None,
        },
        timeout: Duration::from_secs(cli.timeout_secs),
        jobs: cli.jobs,
    };

    let requests = fixture::compose_requests(&config);
    tracing::info!(
        count = requests.len(),
        jobs = config.jobs,
        timeout_secs = config.timeout.as_secs(),
        "starting conformance run"
    );

    let reporter = Reporter::new();
    let start = Instant::now();
    let run_result = scheduler::run_all(&config, requests, &reporter);

    let summary = reporter.finish();
    summary.print(start.elapsed());

    if let Some(path) = &cli.json_report {
        let written = summary
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
        if let Err(error) = written {
            eprintln!("could not write JSON report to {}: {}", path.display(), error);
            process::exit(1);
        }
    }

    // A harness fault outranks the tally: the run is broken, not merely red.
    if let Err(error) = run_result {
        eprintln!("harness fault: {error}");
        process::exit(1);
    }

    process::exit(summary.exit_code());
}
