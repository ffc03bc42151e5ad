//! Runs the lcov coverage workflow for the IBLBM coverage build and leaves an
//! HTML report in `<source root>/coverage`.
//!
//! ```bash
//! # Full run; a failing step is logged and the run continues
//! iblbm-coverage
//!
//! # Stop at the first failing step
//! iblbm-coverage --strict
//!
//! # Show the commands without running them
//! iblbm-coverage --dry-run --format json
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use iblbm_tools::coverage::{self, CoverageConfig};
use iblbm_tools::{logging, CommandSpec, ProjectLayout, SystemRunner};
use tracing::debug;

#[derive(Parser)]
#[command(name = "iblbm-coverage")]
#[command(author, version, about = "Coverage report for the IBLBM test binary", long_about = None)]
struct Cli {
    /// Source root of the checkout (default: the directory containing the tools crate)
    #[arg(long, env = "IBLBM_SOURCE_ROOT")]
    source_root: Option<PathBuf>,

    /// lcov executable
    #[arg(long, env = "IBLBM_LCOV")]
    lcov: Option<PathBuf>,

    /// genhtml executable
    #[arg(long, env = "IBLBM_GENHTML")]
    genhtml: Option<PathBuf>,

    /// Coverage test binary (default: build/Coverage/bin/IBLBM)
    #[arg(long, env = "IBLBM_TEST_BINARY")]
    test_binary: Option<PathBuf>,

    /// Report title
    #[arg(long)]
    title: Option<String>,

    /// Abort on the first failing step and keep the capture files
    #[arg(long)]
    strict: bool,

    /// Print the commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// Output format for --dry-run (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let layout = ProjectLayout::locate(cli.source_root.as_deref());
    let mut config = CoverageConfig::for_layout(&layout);
    if let Some(lcov) = cli.lcov {
        config.lcov = lcov;
    }
    if let Some(genhtml) = cli.genhtml {
        config.genhtml = genhtml;
    }
    if let Some(test_binary) = cli.test_binary {
        config.test_binary = test_binary;
    }
    if let Some(title) = cli.title {
        config.title = title;
    }
    config.strict = cli.strict;

    if cli.dry_run {
        config.validate()?;
        return print_plan(&config.plan(), &cli.format);
    }

    let outcome = coverage::run(&config, &mut SystemRunner).context("Coverage run failed")?;
    debug!(
        steps = outcome.steps.len(),
        removed = outcome.removed.len(),
        all_succeeded = outcome.all_succeeded(),
        "coverage workflow finished"
    );
    Ok(())
}

fn print_plan(plan: &[CommandSpec], format: &str) -> anyhow::Result<()> {
    match format {
        "text" => {
            for command in plan {
                println!("[{}] (cd {}) {}", command.step, command.cwd.display(), command);
            }
        }
        "json" => println!("{}", serde_json::to_string_pretty(plan)?),
        _ => anyhow::bail!("Unsupported format: {}", format),
    }
    Ok(())
}
