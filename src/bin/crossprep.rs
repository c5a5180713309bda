//! crossprep CLI - fetch and unpack cross-compiler sources
//!
//! Usage:
//!   crossprep --dest-dir /opt/cross
//!   crossprep --dest-dir /opt/cross --build-dir /tmp/xbuild --download-dir ~/tarballs

use anyhow::Result;
use clap::Parser;
use crossprep::output;
use crossprep::pipeline::{Dirs, Pipeline};
use crossprep::Manifest;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "crossprep")]
#[command(about = "Downloads, verifies, and extracts the sources needed to build a cross compiler")]
#[command(version)]
struct Cli {
    /// Directory the cross compiler will ultimately be installed into.
    /// Created if it does not exist.
    #[arg(long, env = "CROSSPREP_DEST_DIR")]
    dest_dir: PathBuf,

    /// Directory where sources are extracted and built. May be safely
    /// deleted after a successful build. Defaults to the current directory.
    #[arg(long)]
    build_dir: Option<PathBuf>,

    /// Directory where downloaded archives are cached across runs.
    /// Defaults to the build directory.
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

fn run(cli: Cli) -> Result<()> {
    let dirs = Dirs::new(cli.dest_dir, cli.build_dir, cli.download_dir);
    Pipeline::new(Manifest::toolchain(), dirs).run()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
