//! Source tree layout
//!
//! Every path the tools read or write is derived from the source root:
//!
//! ```text
//! <source root>
//! |
//! +-build                         (build root)
//! | +-Coverage/bin/IBLBM          (coverage test binary)
//! +-scripts
//! | +-lcovrc                      (lcov/genhtml configuration)
//! +-src/io
//!   +-IblbmBuildInfo.input        (build-info template)
//!   +-IblbmBuildRoot.cpp          (generated)
//! ```

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Resolved roots of an IBLBM checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    source_root: PathBuf,
    build_root: PathBuf,
}

impl ProjectLayout {
    /// Resolve the layout from the location of the invoking tool.
    ///
    /// The source root is two levels above `anchor`. Symlinks along the
    /// existing part of the path are resolved before the two parent steps
    /// are applied; a missing remainder is only normalized, and is not
    /// reported.
    pub fn resolve(anchor: &Path) -> Self {
        let candidate = absolute(anchor).join("..").join("..");
        Self::from_source_root(real_path(&candidate))
    }

    /// Layout for the checkout containing this tools crate.
    pub fn from_tool_location() -> Self {
        Self::resolve(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml")))
    }

    /// Layout for an explicit source root, or for this tool's checkout when
    /// none is given.
    pub fn locate(source_root: Option<&Path>) -> Self {
        match source_root {
            Some(root) => Self::from_source_root(real_path(&absolute(root))),
            None => Self::from_tool_location(),
        }
    }

    pub fn from_source_root(source_root: impl Into<PathBuf>) -> Self {
        let source_root = source_root.into();
        let build_root = source_root.join("build");
        Self {
            source_root,
            build_root,
        }
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn build_root(&self) -> &Path {
        &self.build_root
    }

    pub fn build_info_template(&self) -> PathBuf {
        self.source_root.join("src").join("io").join("IblbmBuildInfo.input")
    }

    pub fn build_info_output(&self) -> PathBuf {
        self.source_root.join("src").join("io").join("IblbmBuildRoot.cpp")
    }

    pub fn coverage_test_binary(&self) -> PathBuf {
        self.build_root.join("Coverage").join("bin").join("IBLBM")
    }

    pub fn lcovrc(&self) -> PathBuf {
        self.source_root.join("scripts").join("lcovrc")
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// Canonicalize the longest prefix of `path` that exists, then fold the
/// components that do not exist onto it lexically.
fn real_path(path: &Path) -> PathBuf {
    let mut prefix = path;
    let mut tail = Vec::new();
    loop {
        if let Ok(resolved) = fs::canonicalize(prefix) {
            let joined = tail.iter().rev().fold(resolved, |acc: PathBuf, part| acc.join(part));
            return normalize(&joined);
        }
        let mut components = prefix.components();
        match components.next_back() {
            Some(last @ (Component::Normal(_) | Component::CurDir | Component::ParentDir)) => {
                tail.push(last.as_os_str());
                prefix = components.as_path();
            }
            _ => return normalize(path),
        }
    }
}

/// Fold `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
