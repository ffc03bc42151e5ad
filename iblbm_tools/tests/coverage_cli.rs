#![cfg(unix)]
#![allow(non_snake_case)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const FAKE_LCOV: &str = r#"#!/bin/sh
echo "lcov $*" >> "$IBLBM_FAKE_LOG"
prev=""
for arg in "$@"; do
  if [ "$prev" = "--output-file" ]; then
    printf 'SF:/src/core/Lattice.cpp\nDA:1,1\nDA:2,0\nend_of_record\n' > "$arg"
  fi
  prev="$arg"
done
"#;

const FAKE_GENHTML: &str = r#"#!/bin/sh
echo "genhtml $*" >> "$IBLBM_FAKE_LOG"
prev=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then
    mkdir -p "$arg"
    echo "<html></html>" > "$arg/index.html"
  fi
  prev="$arg"
done
"#;

const FAILING_TESTS: &str = r#"#!/bin/sh
echo "tests $(pwd)" >> "$IBLBM_FAKE_LOG"
exit 7
"#;

struct Checkout {
    _temp: TempDir,
    root: PathBuf,
    tools: PathBuf,
    log: PathBuf,
}

impl Checkout {
    fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = fs::canonicalize(temp.path()).unwrap().join("iblbm");
        let tools = fs::canonicalize(temp.path()).unwrap().join("tools");
        fs::create_dir_all(root.join("scripts")).unwrap();
        fs::create_dir_all(&tools).unwrap();
        fs::write(root.join("scripts/lcovrc"), "genhtml_branch_coverage = 1\n").unwrap();

        write_script(&tools.join("lcov"), FAKE_LCOV);
        write_script(&tools.join("genhtml"), FAKE_GENHTML);
        write_script(&tools.join("IBLBM"), FAILING_TESTS);

        let log = tools.join("calls.log");
        Self {
            _temp: temp,
            root,
            tools,
            log,
        }
    }

    fn run(&self, extra: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_iblbm-coverage"))
            .arg("--source-root")
            .arg(&self.root)
            .arg("--lcov")
            .arg(self.tools.join("lcov"))
            .arg("--genhtml")
            .arg(self.tools.join("genhtml"))
            .arg("--test-binary")
            .arg(self.tools.join("IBLBM"))
            .args(extra)
            .env("IBLBM_FAKE_LOG", &self.log)
            .env_remove("RUST_LOG")
            .output()
            .expect("run iblbm-coverage")
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn write_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn coverage_binary__failing_test_binary__then_full_sequence_and_exit_zero() {
    let checkout = Checkout::new();

    let output = checkout.run(&[]);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(output.stdout.is_empty());

    let root = checkout.root.display().to_string();
    let calls = checkout.calls();
    assert_eq!(calls.len(), 5, "calls: {calls:?}");
    assert_eq!(calls[0], "lcov --directory . --zerocounters");
    assert_eq!(calls[1], format!("tests {root}"));
    assert_eq!(
        calls[2],
        format!(
            "lcov --config-file {root}/scripts/lcovrc --directory {root} --capture \
             --output-file {root}/coverage.info"
        )
    );
    assert_eq!(
        calls[3],
        format!(
            "lcov --config-file {root}/scripts/lcovrc --remove {root}/coverage.info \
             usr/* */examples/* */fortests/* */test/* */thirdparty/* \
             --output-file {root}/coverage.info.cleaned"
        )
    );
    assert_eq!(
        calls[4],
        format!(
            "genhtml --title IBLBM Coverage Results --config-file {root}/scripts/lcovrc \
             --no-function-coverage -o coverage {root}/coverage.info.cleaned"
        )
    );

    assert!(!checkout.root.join("coverage.info").exists());
    assert!(!checkout.root.join("coverage.info.cleaned").exists());
    assert!(checkout.root.join("coverage/index.html").is_file());
}

#[test]
fn coverage_binary__strict_with_failing_test_binary__then_stops_with_error() {
    let checkout = Checkout::new();

    let output = checkout.run(&["--strict"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("test binary failed"));
    assert_eq!(checkout.calls().len(), 2);
    assert!(!checkout.root.join("coverage").exists());
}

#[test]
fn coverage_binary__dry_run_json__then_prints_plan_without_running() {
    let checkout = Checkout::new();

    let output = checkout.run(&["--dry-run", "--format", "json"]);

    assert!(output.status.success());
    assert!(checkout.calls().is_empty());

    let plan: Value = serde_json::from_slice(&output.stdout).expect("json plan");
    let steps: Vec<&str> = plan
        .as_array()
        .expect("array")
        .iter()
        .map(|c| c["step"].as_str().unwrap())
        .collect();
    assert_eq!(
        steps,
        vec!["zero_counters", "test_binary", "capture", "filter", "report"]
    );
    assert_eq!(plan[4]["args"][1], "IBLBM Coverage Results");
    assert_eq!(plan[0]["cwd"], checkout.root.display().to_string());
}

#[test]
fn coverage_binary__dry_run_unknown_format__then_fails() {
    let checkout = Checkout::new();

    let output = checkout.run(&["--dry-run", "--format", "yaml"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unsupported format"));
}
