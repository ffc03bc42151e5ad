//! Generation of `IblbmBuildRoot.cpp`.
//!
//! The library records where its checkout and build tree live by compiling a
//! source file generated from `IblbmBuildInfo.input`. The template refers to
//! the roots as `${Iblbm_SOURCE_DIR}` and `${Iblbm_BUILD_DIR}`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BuildInfoError, BuildInfoResult};
use crate::layout::ProjectLayout;
use crate::template::{self, Mode, Substitutions};

pub const SOURCE_DIR_KEY: &str = "Iblbm_SOURCE_DIR";
pub const BUILD_DIR_KEY: &str = "Iblbm_BUILD_DIR";

/// Printed to stdout after the output file has been written.
pub const CONFIRMATION_BANNER: &str = "========== Updated IBLBM Build Root Info ==========";

#[derive(Debug, Clone)]
pub struct BuildInfoConfig {
    pub template: PathBuf,
    pub output: PathBuf,
    pub substitutions: Substitutions,
    pub mode: Mode,
}

impl BuildInfoConfig {
    /// Fails when a root is not valid UTF-8; the generated source must carry
    /// the paths byte for byte.
    pub fn for_layout(layout: &ProjectLayout) -> BuildInfoResult<Self> {
        let substitutions = Substitutions::new()
            .with(BUILD_DIR_KEY, utf8_root(BUILD_DIR_KEY, layout.build_root())?)
            .with(SOURCE_DIR_KEY, utf8_root(SOURCE_DIR_KEY, layout.source_root())?);
        Ok(Self {
            template: layout.build_info_template(),
            output: layout.build_info_output(),
            substitutions,
            mode: Mode::Lenient,
        })
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.mode = if strict { Mode::Strict } else { Mode::Lenient };
        self
    }
}

fn utf8_root<'a>(key: &'static str, path: &'a Path) -> BuildInfoResult<&'a str> {
    path.to_str().ok_or_else(|| BuildInfoError::NonUtf8Path {
        key,
        path: path.to_path_buf(),
    })
}

/// Render the template and overwrite the output file.
///
/// The template is read and rendered completely before the output is opened,
/// so a missing template or a strict-mode rejection leaves the output as it
/// was.
pub fn generate(config: &BuildInfoConfig) -> BuildInfoResult<()> {
    debug!(template = %config.template.display(), "reading build-info template");
    let source = fs::read_to_string(&config.template)
        .map_err(|err| BuildInfoError::io(&config.template, err))?;

    let rendered = template::substitute(&source, &config.substitutions, config.mode)
        .map_err(|err| BuildInfoError::template(&config.template, err))?;

    fs::write(&config.output, rendered).map_err(|err| BuildInfoError::io(&config.output, err))?;
    let keys: Vec<&str> = config.substitutions.names().collect();
    debug!(output = %config.output.display(), ?keys, "wrote build-info source");
    Ok(())
}
