//! Command-line argument parsing

use crate::mixer::MixerType;
use clap::Parser;

/// Coupled-cluster step runner driven by a YAML input file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML input file
    #[arg(short, long, default_value = "input.yaml")]
    pub input: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Path of the YAML results file
    #[arg(short, long, default_value = "results.yaml")]
    pub results: String,

    /// Override maximum iterations of every iterative step
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// Override the amplitude mixer
    #[arg(long, value_enum)]
    pub mixer: Option<MixerType>,
}

impl Args {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            max_iterations: self.max_iterations,
            mixer: self.mixer,
        }
    }
}

/// Command-line values that take precedence over the input file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub max_iterations: Option<usize>,
    pub mixer: Option<MixerType>,
}
