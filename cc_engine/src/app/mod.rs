//! Step runner: reads the input file, dispatches each step to its
//! algorithm and writes the results file.

mod context;
mod registry;
mod report;
mod steps;

pub use context::{Context, Data};
pub use registry::{Algorithm, AlgorithmRegistry, StepOutcome};
pub use report::{ResultsReport, StepRecord};

use crate::config::{parse_input, Args, InputFile};
use crate::io::setup_output;
use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::fs;
use tracing::{error, info};

pub struct CcApplication {
    args: Args,
    input: InputFile,
    registry: AlgorithmRegistry,
}

impl CcApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let input = load_input(&args.input)?;
        Ok(Self::new(args, input))
    }

    pub fn new(args: Args, input: InputFile) -> Self {
        Self {
            args,
            input,
            registry: AlgorithmRegistry::standard(),
        }
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());
        self.execute().map(|_| ())
    }

    /// Runs every step, writes the results file, and fails if a step did.
    pub fn execute(&self) -> Result<ResultsReport> {
        info!("Input: {}", self.args.input);
        info!("Steps: {}", self.input.steps.len());
        info!("Available algorithms: {}", self.registry.names().join(", "));

        let mut context = Context::new(self.args.overrides());
        let mut report = ResultsReport::default();

        for (index, step) in self.input.steps.iter().enumerate() {
            info!("");
            info!("Step {}: {}", index + 1, step.name);
            let outcome = self
                .registry
                .get(&step.name)
                .and_then(|algorithm| algorithm.run(&step.arguments(), &mut context));
            match outcome {
                Ok(outcome) => report.push(StepRecord::succeeded(&step.name, outcome)),
                Err(err) => {
                    error!("Step {} ({}) failed: {}", index + 1, step.name, err);
                    report.push(StepRecord::failed(&step.name, err.to_string()));
                }
            }
        }

        report.write(&self.args.results)?;
        match report.failures() {
            0 => Ok(report),
            n => Err(eyre!("{} of {} steps failed", n, report.steps.len())),
        }
    }
}

pub fn load_input(path: &str) -> Result<InputFile> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Unable to read input file: {}", path))?;

    parse_input(&content).wrap_err("Failed to parse input file")
}
