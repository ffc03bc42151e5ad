//! Process execution seam.
//!
//! The coverage workflow is a list of [`CommandSpec`]s handed to a
//! [`ProcessRunner`]. [`SystemRunner`] spawns real processes; tests supply
//! their own runner and inspect what would have been executed.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Command;

use serde::ser::{Error as _, SerializeSeq};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::coverage::CoverageStep;

/// One external invocation: program, arguments and working directory.
///
/// Arguments keep the raw bytes of the paths they came from. Serializing a
/// command whose arguments are not UTF-8 fails instead of altering them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub step: CoverageStep,
    pub program: PathBuf,
    #[serde(serialize_with = "serialize_args")]
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl CommandSpec {
    pub fn new(step: CoverageStep, program: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            step,
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

fn serialize_args<S: Serializer>(args: &[OsString], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(args.len()))?;
    for arg in args {
        let arg = arg
            .to_str()
            .ok_or_else(|| S::Error::custom(format!("argument is not valid UTF-8: {arg:?}")))?;
        seq.serialize_element(arg)?;
    }
    seq.end()
}

/// How a finished child exited. `code` is `None` when it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStatus {
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn signaled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

pub trait ProcessRunner {
    /// Run `command` to completion. `Err` means the process could not be started.
    fn run(&mut self, command: &CommandSpec) -> io::Result<RunStatus>;
}

/// Spawns children with inherited stdio and waits for them without a timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&mut self, command: &CommandSpec) -> io::Result<RunStatus> {
        debug!(step = %command.step, cwd = %command.cwd.display(), "running: {command}");
        let status = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .status()?;
        Ok(RunStatus { code: status.code() })
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn command_spec__display__then_quotes_whitespace_arguments() {
        let spec = CommandSpec::new(CoverageStep::Report, "/usr/bin/genhtml", "/proj")
            .args(["--title", "IBLBM Coverage Results", "-o", "coverage"]);
        assert_eq!(
            spec.to_string(),
            "/usr/bin/genhtml --title \"IBLBM Coverage Results\" -o coverage"
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_spec__non_utf8_argument__then_kept_raw_and_not_serialized() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let raw = OsStr::from_bytes(b"/tmp/proj\xff/coverage.info");
        let spec = CommandSpec::new(CoverageStep::Capture, "lcov", "/tmp").arg(raw);

        assert_eq!(spec.args[0].as_bytes(), raw.as_bytes());
        assert!(serde_json::to_string(&spec).is_err());
    }

    #[test]
    fn run_status__codes__then_only_zero_is_success() {
        assert!(RunStatus::exited(0).success());
        assert!(!RunStatus::exited(1).success());
        assert!(!RunStatus::signaled().success());
        assert_eq!(RunStatus::signaled().to_string(), "terminated by signal");
    }

    #[cfg(unix)]
    #[test]
    fn system_runner__true_and_false__then_reports_exit_codes() {
        let cwd = std::env::temp_dir();
        let mut runner = SystemRunner;

        let ok = runner
            .run(&CommandSpec::new(CoverageStep::TestBinary, "true", &cwd))
            .expect("spawn true");
        let failed = runner
            .run(&CommandSpec::new(CoverageStep::TestBinary, "false", &cwd))
            .expect("spawn false");

        assert_eq!(ok, RunStatus::exited(0));
        assert_eq!(failed, RunStatus::exited(1));
    }

    #[test]
    fn system_runner__missing_program__then_spawn_error() {
        let mut runner = SystemRunner;
        let spec = CommandSpec::new(
            CoverageStep::ZeroCounters,
            "/nonexistent/iblbm/lcov",
            std::env::temp_dir(),
        );
        let err = runner.run(&spec).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
