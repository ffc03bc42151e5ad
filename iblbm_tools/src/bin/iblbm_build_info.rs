//! Regenerates `src/io/IblbmBuildRoot.cpp` from `src/io/IblbmBuildInfo.input`
//! with the source and build roots of the current checkout.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use iblbm_tools::{build_info, logging, BuildInfoConfig, ProjectLayout, CONFIRMATION_BANNER};

#[derive(Parser)]
#[command(name = "iblbm-build-info")]
#[command(author, version, about = "Update the IBLBM build root info source", long_about = None)]
struct Cli {
    /// Source root of the checkout (default: the directory containing the tools crate)
    #[arg(long, env = "IBLBM_SOURCE_ROOT")]
    source_root: Option<PathBuf>,

    /// Fail on unknown placeholders instead of copying them through
    #[arg(long)]
    strict: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let layout = ProjectLayout::locate(cli.source_root.as_deref());
    let config = BuildInfoConfig::for_layout(&layout)
        .with_context(|| format!("Cannot use source root {}", layout.source_root().display()))?
        .strict(cli.strict);

    build_info::generate(&config)
        .with_context(|| format!("Failed to update {}", config.output.display()))?;

    println!("{CONFIRMATION_BANNER}");
    Ok(())
}
