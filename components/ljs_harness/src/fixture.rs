//! Fixture discovery and test classification.
//!
//! A fixture is a pair of files sharing a stem `T`: `T.in.ljs` holds the
//! program fed to the interpreter and `T.out.ljs` holds the exact output it
//! is expected to print. An optional `T.skip` file marks the test as skipped;
//! its contents are the reason. Pre-desugared tests are bare `*.js` files
//! with no expected-output sibling; their verdict comes from a success
//! marker in the interpreter's output instead.

use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Suffix of fixture input files
pub const INPUT_SUFFIX: &str = ".in.ljs";
/// Suffix of expected-output files
pub const EXPECTED_SUFFIX: &str = ".out.ljs";
/// Suffix of skip-marker files
pub const SKIP_SUFFIX: &str = ".skip";

/// Fixture family run without an environment dump
pub const NO_ENV_DIR: &str = "no-env";
/// Fixture family run with the ES5 environment preloaded
pub const WITH_ENV_DIR: &str = "with-env";

/// A single discovered test case. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Display identity: the path stem, unique within its fixture family
    pub name: String,
    /// File fed to the interpreter (or to the desugaring tool)
    pub input: PathBuf,
    /// Expected-output file; `None` for the pre-desugared family
    pub expected: Option<PathBuf>,
    /// Skip-marker file, when one was present at discovery
    pub skip_marker: Option<PathBuf>,
}

impl TestCase {
    /// Whether the test name marks it as needing dynamic evaluation, which
    /// the desugaring pipeline does not support. The rule is the one the
    /// suite has always used: the basename up to its first `.`, split on
    /// `-`, contains the token `eval` (`obj-eval.js` yes, `evaluate.js` no).
    pub fn requires_eval(&self) -> bool {
        let base = self
            .input
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        let head = base.split('.').next().unwrap_or("");
        head.split('-').any(|token| token == "eval")
    }
}

/// How a test is to be executed. Constructed once by [`compose_requests`],
/// consumed exactly once by the executor. Each variant carries exactly the
/// inputs its mode needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecRequest {
    /// Run the raw fixture with no environment
    Plain(TestCase),
    /// Run the raw fixture with an environment dump preloaded
    Env {
        /// Environment dump passed to the interpreter via `-load`
        env_dump: PathBuf,
        /// The test case
        case: TestCase,
    },
    /// Desugar the test first, then pipe the result to the interpreter
    Desugared {
        /// Environment dump, when one was supplied at launch
        env_dump: Option<PathBuf>,
        /// The desugaring tool binary
        desugar_bin: PathBuf,
        /// The test case
        case: TestCase,
    },
}

impl ExecRequest {
    /// The test case this request executes
    pub fn case(&self) -> &TestCase {
        match self {
            ExecRequest::Plain(case) => case,
            ExecRequest::Env { case, .. } => case,
            ExecRequest::Desugared { case, .. } => case,
        }
    }

    /// Environment dump to preload, if any
    pub fn env_dump(&self) -> Option<&Path> {
        match self {
            ExecRequest::Plain(_) => None,
            ExecRequest::Env { env_dump, .. } => Some(env_dump),
            ExecRequest::Desugared { env_dump, .. } => env_dump.as_deref(),
        }
    }
}

/// Desugaring tool inputs supplied at launch
#[derive(Debug, Clone)]
pub struct DesugarConfig {
    /// The desugaring tool binary
    pub bin: PathBuf,
    /// Directory of pre-desugared `*.js` tests
    pub tests_dir: PathBuf,
}

/// Everything a run needs, assembled once from the command line
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Root directory holding the `no-env/` and `with-env/` families
    pub tests_root: PathBuf,
    /// Interpreter binary under test
    pub interpreter: PathBuf,
    /// Environment dump, when supplied
    pub env_dump: Option<PathBuf>,
    /// Desugaring tool inputs, when supplied
    pub desugar: Option<DesugarConfig>,
    /// Hard wall-clock limit per test
    pub timeout: Duration,
    /// Worker threads running tests in parallel
    pub jobs: usize,
}

/// Scan one directory level of `dir` for `*.in.ljs` fixtures.
///
/// A missing directory is a valid "no such fixture family" state and yields
/// an empty set. Discovery order is filesystem-dependent; entries are sorted
/// by name so display order is stable across runs.
pub fn discover(dir: &Path) -> Vec<TestCase> {
    let mut cases: Vec<TestCase> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.to_str()?.strip_suffix(INPUT_SUFFIX)?.to_string();
            let skip = PathBuf::from(format!("{name}{SKIP_SUFFIX}"));
            Some(TestCase {
                expected: Some(PathBuf::from(format!("{name}{EXPECTED_SUFFIX}"))),
                skip_marker: skip.is_file().then_some(skip),
                input: path.to_path_buf(),
                name,
            })
        })
        .collect();
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(dir = %dir.display(), count = cases.len(), "discovered fixtures");
    cases
}

/// Scan one directory level of `dir` for pre-desugared `*.js` tests.
///
/// These carry no expected-output file; the identity keeps its `.js`
/// extension and the skip marker sits alongside it as `<name>.js.skip`.
pub fn discover_desugared(dir: &Path) -> Vec<TestCase> {
    let mut cases: Vec<TestCase> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext == "js")
                .unwrap_or(false)
        })
        .filter_map(|entry| {
            let path = entry.path();
            let name = path.to_str()?.to_string();
            let skip = PathBuf::from(format!("{name}{SKIP_SUFFIX}"));
            Some(TestCase {
                expected: None,
                skip_marker: skip.is_file().then_some(skip),
                input: path.to_path_buf(),
                name,
            })
        })
        .collect();
    cases.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(dir = %dir.display(), count = cases.len(), "discovered desugared tests");
    cases
}

/// Combine the three fixture families into one ordered request stream,
/// conditioned on which optional inputs were supplied at launch. Pure data
/// composition; no subprocess activity happens here.
pub fn compose_requests(config: &RunConfig) -> Vec<ExecRequest> {
    let mut requests: Vec<ExecRequest> = discover(&config.tests_root.join(NO_ENV_DIR))
        .into_iter()
        .map(ExecRequest::Plain)
        .collect();

    if let Some(env_dump) = &config.env_dump {
        requests.extend(
            discover(&config.tests_root.join(WITH_ENV_DIR))
                .into_iter()
                .map(|case| ExecRequest::Env {
                    env_dump: env_dump.clone(),
                    case,
                }),
        );
    }

    if let Some(desugar) = &config.desugar {
        requests.extend(discover_desugared(&desugar.tests_dir).into_iter().map(
            |case| ExecRequest::Desugared {
                env_dump: config.env_dump.clone(),
                desugar_bin: desugar.bin.clone(),
                case,
            },
        ));
    }

    requests
}
