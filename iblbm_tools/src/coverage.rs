//! lcov coverage workflow.
//!
//! [`run`] executes a fixed five-step plan from the source root:
//!
//! 1. `lcov --directory . --zerocounters`
//! 2. the coverage build of the test binary, without arguments
//! 3. `lcov --capture` into `coverage.info`
//! 4. `lcov --remove` of the excluded paths into `coverage.info.cleaned`
//! 5. `genhtml` into the `coverage` directory
//!
//! and then deletes both capture files.
//!
//! By default a step that fails to start or exits non-zero is logged and the
//! sequence goes on, so a broken test run yields an empty or stale report
//! rather than an error. With [`CoverageConfig::strict`] the first failure
//! aborts the run and the intermediates stay on disk.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CoverageError, CoverageResult};
use crate::layout::ProjectLayout;
use crate::lcov::{self, CoverageSummary};
use crate::runner::{CommandSpec, ProcessRunner, RunStatus};

pub const DEFAULT_LCOV: &str = "/usr/bin/lcov";
pub const DEFAULT_GENHTML: &str = "/usr/bin/genhtml";
pub const DEFAULT_TITLE: &str = "IBLBM Coverage Results";
pub const REPORT_NAME: &str = "coverage";
pub const DEFAULT_EXCLUSIONS: [&str; 5] = [
    "usr/*",
    "*/examples/*",
    "*/fortests/*",
    "*/test/*",
    "*/thirdparty/*",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStep {
    ZeroCounters,
    TestBinary,
    Capture,
    Filter,
    Report,
}

impl fmt::Display for CoverageStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ZeroCounters => "zerocounters",
            Self::TestBinary => "test binary",
            Self::Capture => "capture",
            Self::Filter => "filter",
            Self::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageConfig {
    pub lcov: PathBuf,
    pub genhtml: PathBuf,
    pub lcovrc: PathBuf,
    pub test_binary: PathBuf,
    /// Working directory of every step.
    pub working_dir: PathBuf,
    /// Directory handed to `lcov --capture --directory`.
    pub capture_scope: PathBuf,
    pub raw_capture: PathBuf,
    pub filtered_capture: PathBuf,
    /// genhtml output directory, relative to `working_dir` unless absolute.
    pub report_dir: PathBuf,
    pub title: String,
    pub exclusions: Vec<String>,
    pub strict: bool,
}

impl CoverageConfig {
    pub fn for_layout(layout: &ProjectLayout) -> Self {
        let root = layout.source_root();
        Self {
            lcov: PathBuf::from(DEFAULT_LCOV),
            genhtml: PathBuf::from(DEFAULT_GENHTML),
            lcovrc: layout.lcovrc(),
            test_binary: layout.coverage_test_binary(),
            working_dir: root.to_path_buf(),
            capture_scope: root.to_path_buf(),
            raw_capture: root.join(format!("{REPORT_NAME}.info")),
            filtered_capture: root.join(format!("{REPORT_NAME}.info.cleaned")),
            report_dir: PathBuf::from(REPORT_NAME),
            title: DEFAULT_TITLE.to_string(),
            exclusions: DEFAULT_EXCLUSIONS.iter().map(|p| p.to_string()).collect(),
            strict: false,
        }
    }

    /// Reject exclusion patterns that are not valid globs. Called before any
    /// step runs.
    pub fn validate(&self) -> CoverageResult<()> {
        for pattern in &self.exclusions {
            glob::Pattern::new(pattern).map_err(|err| CoverageError::Pattern {
                pattern: pattern.clone(),
                details: err.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn plan(&self) -> Vec<CommandSpec> {
        let cwd = &self.working_dir;
        vec![
            CommandSpec::new(CoverageStep::ZeroCounters, &self.lcov, cwd)
                .args(["--directory", ".", "--zerocounters"]),
            CommandSpec::new(CoverageStep::TestBinary, &self.test_binary, cwd),
            CommandSpec::new(CoverageStep::Capture, &self.lcov, cwd)
                .arg("--config-file")
                .arg(&self.lcovrc)
                .arg("--directory")
                .arg(&self.capture_scope)
                .arg("--capture")
                .arg("--output-file")
                .arg(&self.raw_capture),
            CommandSpec::new(CoverageStep::Filter, &self.lcov, cwd)
                .arg("--config-file")
                .arg(&self.lcovrc)
                .arg("--remove")
                .arg(&self.raw_capture)
                .args(self.exclusions.iter().cloned())
                .arg("--output-file")
                .arg(&self.filtered_capture),
            CommandSpec::new(CoverageStep::Report, &self.genhtml, cwd)
                .arg("--title")
                .arg(self.title.clone())
                .arg("--config-file")
                .arg(&self.lcovrc)
                .arg("--no-function-coverage")
                .arg("-o")
                .arg(&self.report_dir)
                .arg(&self.filtered_capture),
        ]
    }

    /// Capture files deleted once the report has been rendered.
    pub fn intermediates(&self) -> [&Path; 2] {
        [&self.raw_capture, &self.filtered_capture]
    }
}

/// Result of one executed step; `status` is `None` when the program never started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: CoverageStep,
    pub status: Option<RunStatus>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CoverageOutcome {
    pub steps: Vec<StepRecord>,
    pub removed: Vec<PathBuf>,
    pub summary: Option<CoverageSummary>,
}

impl CoverageOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.steps
            .iter()
            .all(|record| record.status.is_some_and(|s| s.success()))
    }
}

pub fn run<R>(config: &CoverageConfig, runner: &mut R) -> CoverageResult<CoverageOutcome>
where
    R: ProcessRunner + ?Sized,
{
    config.validate()?;
    let plan = config.plan();
    preflight(&plan, config.strict)?;

    let mut outcome = CoverageOutcome::default();
    for command in &plan {
        let status = match runner.run(command) {
            Ok(status) if status.success() => Some(status),
            Ok(status) => {
                if config.strict {
                    return Err(CoverageError::step_failed(command.step, status));
                }
                warn!(step = %command.step, "{status}; continuing");
                Some(status)
            }
            Err(source) => {
                if config.strict {
                    return Err(CoverageError::Spawn {
                        step: command.step,
                        program: command.program.clone(),
                        source,
                    });
                }
                warn!(step = %command.step, program = %command.program.display(), "failed to launch: {source}; continuing");
                None
            }
        };
        outcome.steps.push(StepRecord {
            step: command.step,
            status,
        });

        if command.step == CoverageStep::TestBinary {
            report_counter_files(&config.capture_scope);
        }
    }

    outcome.summary = summarize_capture(&config.filtered_capture);

    for path in config.intermediates() {
        if remove_intermediate(path, config.strict)? {
            outcome.removed.push(path.to_path_buf());
        }
    }

    Ok(outcome)
}

fn preflight(plan: &[CommandSpec], strict: bool) -> CoverageResult<()> {
    for command in plan {
        if program_available(&command.program) {
            continue;
        }
        if strict {
            return Err(CoverageError::ToolNotFound {
                step: command.step,
                program: command.program.clone(),
            });
        }
        warn!(step = %command.step, program = %command.program.display(), "program not found");
    }
    Ok(())
}

fn program_available(program: &Path) -> bool {
    let mut components = program.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => which::which(program).is_ok(),
        _ => program.is_file(),
    }
}

fn report_counter_files(scope: &Path) {
    let count = WalkDir::new(scope)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "gcda"))
        .count();
    if count == 0 {
        warn!(scope = %scope.display(), "no .gcda counter files after the test run; the report will be empty");
    } else {
        debug!(scope = %scope.display(), count, "found .gcda counter files");
    }
}

fn summarize_capture(path: &Path) -> Option<CoverageSummary> {
    match fs::read_to_string(path) {
        Ok(content) => {
            let summary = lcov::summarize(&content);
            info!("coverage: {summary}");
            Some(summary)
        }
        Err(err) => {
            warn!(path = %path.display(), "cannot summarize capture: {err}");
            None
        }
    }
}

/// Returns whether the file existed and was removed.
fn remove_intermediate(path: &Path, strict: bool) -> CoverageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed intermediate capture");
            Ok(true)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound && !strict => {
            warn!(path = %path.display(), "intermediate capture missing");
            Ok(false)
        }
        Err(err) => Err(CoverageError::cleanup(path, err)),
    }
}
