use std::{fmt, io, path::PathBuf};

use thiserror::Error;

use crate::coverage::CoverageStep;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder `{name}` at byte {offset}")]
    UnknownPlaceholder { name: String, offset: usize },
    #[error("invalid placeholder at byte {offset}")]
    InvalidPlaceholder { offset: usize },
}

pub type TemplateResult<T> = Result<T, TemplateError>;

#[derive(Debug, Error)]
pub enum BuildInfoError {
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("template {path:?}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
    #[error("{key} path is not valid UTF-8: {path:?}")]
    NonUtf8Path { key: &'static str, path: PathBuf },
}

pub type BuildInfoResult<T> = Result<T, BuildInfoError>;

impl BuildInfoError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn template(path: impl Into<PathBuf>, source: TemplateError) -> Self {
        Self::Template {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoverageError {
    #[error("failed to launch {step} ({program:?}): {source}")]
    Spawn {
        step: CoverageStep,
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{step} failed: {status}")]
    StepFailed { step: CoverageStep, status: String },
    #[error("{step}: program not found: {program:?}")]
    ToolNotFound { step: CoverageStep, program: PathBuf },
    #[error("failed to remove {path:?}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid exclusion pattern `{pattern}`: {details}")]
    Pattern { pattern: String, details: String },
}

pub type CoverageResult<T> = Result<T, CoverageError>;

impl CoverageError {
    pub fn step_failed(step: CoverageStep, status: impl fmt::Display) -> Self {
        Self::StepFailed {
            step,
            status: status.to_string(),
        }
    }

    pub fn cleanup(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Cleanup {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn build_info_error__io_constructor__then_preserves_path_and_source() {
        let err = BuildInfoError::io(
            "/proj/src/io/IblbmBuildInfo.input",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );

        let message = err.to_string();
        match &err {
            BuildInfoError::Io { path, source } => {
                assert!(path.ends_with("IblbmBuildInfo.input"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(message.contains("IblbmBuildInfo.input"));
        assert!(message.contains("no such file"));
    }

    #[test]
    fn build_info_error__template_constructor__then_names_placeholder() {
        let err = BuildInfoError::template(
            "template.input",
            TemplateError::UnknownPlaceholder {
                name: "Iblbm_BIULD_DIR".to_string(),
                offset: 4,
            },
        );
        let chain = format!("{err}: {}", std::error::Error::source(&err).unwrap());
        assert!(chain.contains("template.input"));
        assert!(chain.contains("Iblbm_BIULD_DIR"));
    }

    #[test]
    fn coverage_error__step_failed__then_formats_step_and_status() {
        let err = CoverageError::step_failed(CoverageStep::Capture, "exit code 2");
        assert_eq!(err.to_string(), "capture failed: exit code 2");
    }
}
