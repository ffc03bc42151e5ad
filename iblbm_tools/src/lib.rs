//! IBLBM build tooling
//!
//! Two small utilities that operate on an IBLBM source checkout:
//!
//! - [`build_info`] substitutes the resolved source and build roots into
//!   `src/io/IblbmBuildInfo.input` and writes `src/io/IblbmBuildRoot.cpp`.
//! - [`coverage`] drives the `lcov`/`genhtml` workflow: zero counters, run the
//!   coverage test binary, capture, filter, render HTML, drop intermediates.
//!
//! Both start from a [`layout::ProjectLayout`], which fixes every path they
//! touch. External processes go through [`runner::ProcessRunner`] so the
//! coverage sequence can be exercised without real tools.

pub mod build_info;
pub mod coverage;
pub mod error;
pub mod layout;
pub mod lcov;
pub mod logging;
pub mod runner;
pub mod template;

pub use build_info::{generate, BuildInfoConfig, CONFIRMATION_BANNER};
pub use coverage::{CoverageConfig, CoverageOutcome, CoverageStep};
pub use error::{BuildInfoError, CoverageError, TemplateError};
pub use layout::ProjectLayout;
pub use runner::{CommandSpec, ProcessRunner, RunStatus, SystemRunner};
