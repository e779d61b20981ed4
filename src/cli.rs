//! CLI argument parsing for Cambiar

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cambiar")]
#[command(version)]
#[command(about = "Release-over-release performance change analysis for configurable systems", long_about = None)]
pub struct Cli {
    /// Directory containing one subdirectory per case study
    pub input: PathBuf,

    /// Directory to write analysis artifacts to
    pub output: PathBuf,

    /// Analysis configuration (TOML)
    #[arg(short, long, default_value = "analysis.toml", value_name = "FILE")]
    pub config: PathBuf,

    /// Restrict the run to a single case study
    #[arg(long = "case-study", value_name = "NAME")]
    pub case_study: Option<String>,

    /// Skip the precision/recall cross-validation stage
    #[arg(long = "skip-cross-validation")]
    pub skip_cross_validation: bool,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,
}
