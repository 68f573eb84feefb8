//! Command-line argument parsing for Monte Carlo runs

use clap::Parser;

/// Hard linear molecule Monte Carlo with YAML configuration
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML run configuration
    #[arg(short, long, default_value = "run.yaml")]
    pub config_file: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override the starting configuration file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the number of blocks
    #[arg(long)]
    pub blocks: Option<usize>,

    /// Override the number of steps per block
    #[arg(long)]
    pub steps: Option<usize>,

    /// Override the random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Also report per-move debug events
    #[arg(short, long)]
    pub verbose: bool,
}
