//! The algorithms a step can name.

use super::context::{Context, Data};
use super::registry::{Algorithm, StepOutcome};
use crate::amplitudes::AmplitudeSet;
use crate::config::{ClusterOptions, DavidsonOptions, StepArguments};
use crate::eom::eom_ccsd;
use crate::error::{CcError, Result};
use crate::integrals::CoulombIntegrals;
use crate::io::read_fcidump;
use crate::methods::{Ccsd, Ccsdt1, Drccd, Mp2, PerturbativeTriples};
use crate::solver::{AmplitudeSolver, ClusterEquations, SolverReport};
use serde::Deserialize;
use std::sync::Arc;
use tensor::io::{read_any, read_tensor, write_tensor, AnyTensor};
use tensor::{Tensor, VectorSpace};
use tracing::{info, warn};

fn publish(arguments: &StepArguments<'_>, context: &mut Context, key: &str, data: Data) {
    if let Some(name) = arguments.output(key) {
        context.insert(name, data);
    }
}

fn integrals(arguments: &StepArguments<'_>, context: &Context) -> Result<Arc<CoulombIntegrals<f64>>> {
    context.integrals(arguments.string("integrals")?)
}

/// `amplitudes` with zero components appended up to `levels`.
fn padded(amplitudes: &AmplitudeSet<f64>, levels: usize) -> Result<AmplitudeSet<f64>> {
    if amplitudes.levels() >= levels {
        return Ok(amplitudes.clone());
    }
    let template = AmplitudeSet::zeros(amplitudes.n_occ(), amplitudes.n_virt(), levels)?;
    let components = amplitudes
        .components()
        .iter()
        .chain(&template.components()[amplitudes.levels()..])
        .cloned()
        .collect();
    AmplitudeSet::from_components(amplitudes.n_occ(), amplitudes.n_virt(), components)
}

fn solve_cluster<E: ClusterEquations<f64>>(
    equations: &E,
    arguments: &StepArguments<'_>,
    context: &Context,
) -> Result<SolverReport<f64>> {
    let options: ClusterOptions = arguments.options()?;
    let settings = options
        .with_overrides(context.overrides())
        .with_defaults()
        .solver_settings()?;
    let mut solver = AmplitudeSolver::new(settings);
    match arguments.optional_string("initialAmplitudes")? {
        Some(name) => {
            let initial = padded(context.amplitudes(name)?, equations.excitation_levels())?;
            solver.solve_from(equations, initial)
        }
        None => solver.solve(equations),
    }
}

const T1_WARNING: f64 = 0.02;

/// `|t1| / sqrt(N)` over spin orbitals.
fn t1_diagnostic(amplitudes: &AmplitudeSet<f64>) -> Result<f64> {
    let n_occ = amplitudes.n_occ().max(1) as f64;
    Ok(amplitudes.singles()?.norm() / n_occ.sqrt())
}

fn log_t1_diagnostic(t1: f64) {
    info!("T1 diagnostic:             {:.6}", t1);
    if t1 > T1_WARNING {
        warn!("T1 diagnostic above {} points to multireference character", T1_WARNING);
    }
}

fn summary(method: &str, reference: f64, correlation: f64) {
    info!("===========================================");
    info!("        {} Results Summary", method);
    info!("===========================================");
    info!("Reference energy:          {:.10} Eh", reference);
    info!("{:<27}{:.10} Eh", format!("{method} correlation energy:"), correlation);
    info!("{:<27}{:.10} Eh", format!("Total {method} energy:"), reference + correlation);
}

/// Publishes a cluster solve and describes it for the results file.
fn cluster_outcome(
    arguments: &StepArguments<'_>,
    context: &mut Context,
    report: SolverReport<f64>,
    reference: f64,
) -> StepOutcome {
    let outcome = StepOutcome {
        status: Some(format!("{:?}", report.status)),
        iterations: Some(report.iterations),
        ..StepOutcome::default()
    }
    .with_result("energy", report.energy)
    .with_result("totalEnergy", reference + report.energy)
    .with_result("residualNorm", report.residual_norm);
    publish(arguments, context, "energy", Data::Real(report.energy));
    publish(arguments, context, "amplitudes", Data::Amplitudes(report.amplitudes));
    outcome
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReaderOptions {
    file: String,
    nelec: Option<usize>,
}

pub struct FcidumpReader;

impl Algorithm for FcidumpReader {
    fn name(&self) -> &'static str {
        "FcidumpReader"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let options: ReaderOptions = arguments.options()?;
        let spatial = read_fcidump(&options.file, options.nelec)?;
        let integrals = spatial.to_spin_orbitals()?;
        let reference = integrals.reference_energy();
        info!("Reference energy: {:.10} Eh", reference);

        let outcome = StepOutcome::default()
            .with_result("referenceEnergy", reference)
            .with_result("orbitals", spatial.n_orbitals as f64)
            .with_result("electrons", spatial.n_electrons as f64);
        publish(arguments, context, "integrals", Data::Integrals(Arc::new(integrals)));
        publish(arguments, context, "referenceEnergy", Data::Real(reference));
        Ok(outcome)
    }
}

pub struct Mp2Step;

impl Algorithm for Mp2Step {
    fn name(&self) -> &'static str {
        "Mp2"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let ints = integrals(arguments, context)?;
        let result = Mp2::new(ints.as_ref()).run()?;
        let reference = ints.reference_energy();
        summary("MP2", reference, result.energy);

        let outcome = StepOutcome::default()
            .with_result("energy", result.energy)
            .with_result("totalEnergy", reference + result.energy);
        publish(arguments, context, "energy", Data::Real(result.energy));
        publish(arguments, context, "amplitudes", Data::Amplitudes(result.amplitudes));
        Ok(outcome)
    }
}

pub struct CcsdStep;

impl Algorithm for CcsdStep {
    fn name(&self) -> &'static str {
        "Ccsd"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let ints = integrals(arguments, context)?;
        let report = solve_cluster(&Ccsd::new(ints.as_ref()), arguments, context)?;
        let reference = ints.reference_energy();
        summary("CCSD", reference, report.energy);

        let t1 = t1_diagnostic(&report.amplitudes)?;
        log_t1_diagnostic(t1);
        Ok(cluster_outcome(arguments, context, report, reference).with_result("t1Diagnostic", t1))
    }
}

pub struct CcsdtStep;

impl Algorithm for CcsdtStep {
    fn name(&self) -> &'static str {
        "Ccsdt"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let ints = integrals(arguments, context)?;
        let report = solve_cluster(&Ccsdt1::new(ints.as_ref()), arguments, context)?;
        let reference = ints.reference_energy();
        summary("CCSDT-1a", reference, report.energy);
        Ok(cluster_outcome(arguments, context, report, reference))
    }
}

pub struct DrccdStep;

impl Algorithm for DrccdStep {
    fn name(&self) -> &'static str {
        "Drccd"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let ints = integrals(arguments, context)?;
        let drccd = Drccd::new(ints.as_ref());
        let report = solve_cluster(&drccd, arguments, context)?;
        let components = drccd.report(&report.amplitudes)?;
        let reference = ints.reference_energy();
        summary("drCCD", reference, report.energy);

        publish(arguments, context, "directEnergy", Data::Real(components.direct));
        publish(arguments, context, "exchangeEnergy", Data::Real(components.exchange));
        Ok(cluster_outcome(arguments, context, report, reference)
            .with_result("directEnergy", components.direct)
            .with_result("exchangeEnergy", components.exchange))
    }
}

pub struct PerturbativeTriplesStep;

impl Algorithm for PerturbativeTriplesStep {
    fn name(&self) -> &'static str {
        "PerturbativeTriples"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let ints = integrals(arguments, context)?;
        let amplitudes = context.amplitudes(arguments.string("amplitudes")?)?;
        let energy = PerturbativeTriples::new(ints.as_ref()).energy(amplitudes)?;
        let mut outcome = StepOutcome::default().with_result("energy", energy);
        if let Some(name) = arguments.optional_string("ccsdEnergy")? {
            let total = ints.reference_energy() + context.real(name)? + energy;
            info!("Total CCSD(T) energy:      {:.10} Eh", total);
            outcome = outcome.with_result("totalEnergy", total);
        }
        publish(arguments, context, "energy", Data::Real(energy));
        Ok(outcome)
    }
}

/// Start vectors for an eigensolve: the eigenvectors of an earlier solve or
/// a single amplitude set.
fn guess_vectors(context: &Context, name: &str) -> Result<Vec<AmplitudeSet<f64>>> {
    match context.get(name)? {
        Data::Eigenpairs(set) => Ok(set.pairs.iter().map(|p| p.vector.clone()).collect()),
        Data::Amplitudes(vector) => Ok(vec![vector.clone()]),
        other => Err(CcError::WrongDataType {
            name: name.to_string(),
            expected: "eigenpairs or amplitudes",
            found: other.kind(),
        }),
    }
}

pub struct EomCcsdStep;

impl Algorithm for EomCcsdStep {
    fn name(&self) -> &'static str {
        "EomCcsd"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let ints = integrals(arguments, context)?;
        let ground = context.amplitudes(arguments.string("amplitudes")?)?.clone();
        let options: DavidsonOptions = arguments.options()?;
        let options = options.with_overrides(context.overrides()).with_defaults();

        let guesses = match arguments.optional_string("initialGuesses")? {
            Some(name) => guess_vectors(context, name)?,
            None => Vec::new(),
        };

        let result = eom_ccsd(
            &ints,
            ground,
            options.davidson_settings(),
            options.denominator_floor(),
            guesses,
        )?;
        let values = result.values();
        let mut outcome = StepOutcome {
            status: Some(format!("{:?}", result.status)),
            iterations: Some(result.iterations),
            ..StepOutcome::default()
        };
        for (k, value) in values.iter().enumerate() {
            outcome = outcome.with_result(&format!("root{k}"), *value);
        }

        let energies = Tensor::from_vec("EomEnergies", &[values.len()], values)?;
        publish(arguments, context, "energies", Data::Tensor(energies));
        publish(arguments, context, "eigenpairs", Data::Eigenpairs(Arc::new(result)));
        Ok(outcome)
    }
}

/// Replaced by the excitation level in file names.
const LEVEL_SLOT: &str = "{level}";
/// Replaced by the root index in file names.
const ROOT_SLOT: &str = "{root}";

/// Writes one level of `amplitudes` to `file`, or every level when `file`
/// has a `{level}` slot and no level is requested. Returns the norm of what
/// was written.
fn write_amplitudes(file: &str, amplitudes: &AmplitudeSet<f64>, level: Option<usize>) -> Result<f64> {
    let levels = match level {
        Some(level) => level..=level,
        None if file.contains(LEVEL_SLOT) => 1..=amplitudes.levels(),
        None => amplitudes.levels()..=amplitudes.levels(),
    };
    let mut squared = 0.0;
    for level in levels {
        let t = amplitudes.get(level)?;
        write_tensor(file.replace(LEVEL_SLOT, &level.to_string()), t)?;
        squared += t.norm().powi(2);
    }
    Ok(squared.sqrt())
}

/// Reads levels `1..=levels` written by [`write_amplitudes`]; the singles
/// fix the orbital counts.
fn read_amplitudes(file: &str, levels: usize) -> Result<AmplitudeSet<f64>> {
    let components = (1..=levels)
        .map(|level| read_tensor::<f64>(file.replace(LEVEL_SLOT, &level.to_string())))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let (n_occ, n_virt) = match components.first().map(|t| t.shape()) {
        Some(&[n_occ, n_virt]) => (n_occ, n_virt),
        _ => {
            return Err(CcError::invalid_option(
                "file",
                format!("{} does not hold singles amplitudes", file.replace(LEVEL_SLOT, "1")),
            ))
        }
    };
    AmplitudeSet::from_components(n_occ, n_virt, components)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WriterOptions {
    data: String,
    file: String,
    level: Option<usize>,
}

pub struct TensorWriter;

impl Algorithm for TensorWriter {
    fn name(&self) -> &'static str {
        "TensorWriter"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let options: WriterOptions = arguments.options()?;
        let norm = match context.get(&options.data)? {
            Data::Tensor(t) => {
                write_tensor(&options.file, t)?;
                t.norm()
            }
            Data::ComplexTensor(t) => {
                write_tensor(&options.file, t)?;
                t.norm()
            }
            Data::Amplitudes(amplitudes) => write_amplitudes(&options.file, amplitudes, options.level)?,
            Data::Eigenpairs(set) => {
                if !options.file.contains(ROOT_SLOT) {
                    return Err(CcError::invalid_option(
                        "file",
                        format!("eigenvectors are written one file per root and need a {ROOT_SLOT} slot"),
                    ));
                }
                let mut squared = 0.0;
                for (k, pair) in set.pairs.iter().enumerate() {
                    let file = options.file.replace(ROOT_SLOT, &k.to_string());
                    squared += write_amplitudes(&file, &pair.vector, options.level)?.powi(2);
                }
                info!("Wrote {} eigenvectors", set.pairs.len());
                squared.sqrt()
            }
            Data::Real(x) => {
                write_tensor(&options.file, &Tensor::from_vec(options.data.as_str(), &[], vec![*x])?)?;
                x.abs()
            }
            other => {
                return Err(CcError::WrongDataType {
                    name: options.data.clone(),
                    expected: "tensor",
                    found: other.kind(),
                })
            }
        };
        info!("Wrote {} to {}", options.data, options.file);
        Ok(StepOutcome::default().with_result("norm", norm))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TensorFileOptions {
    file: String,
    /// Amplitude levels to read when `file` has a `{level}` slot.
    levels: Option<usize>,
}

pub struct TensorReader;

impl Algorithm for TensorReader {
    fn name(&self) -> &'static str {
        "TensorReader"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let options: TensorFileOptions = arguments.options()?;
        let file = options.file.as_str();
        if file.contains(LEVEL_SLOT) {
            let amplitudes = read_amplitudes(file, options.levels.unwrap_or(2))?;
            let norm = amplitudes.norm();
            info!("Read {} amplitude levels from {}", amplitudes.levels(), file);
            publish(arguments, context, "amplitudes", Data::Amplitudes(amplitudes));
            return Ok(StepOutcome::default().with_result("norm", norm));
        }

        let (data, norm) = match read_any(file)? {
            AnyTensor::Real(t) => {
                let norm = t.norm();
                (Data::Tensor(t), norm)
            }
            AnyTensor::Complex(t) => {
                let norm = t.norm();
                (Data::ComplexTensor(t), norm)
            }
        };
        info!("Read {} tensor from {}", data.kind(), file);
        publish(arguments, context, "tensor", data);
        Ok(StepOutcome::default().with_result("norm", norm))
    }
}

pub struct Delete;

impl Algorithm for Delete {
    fn name(&self) -> &'static str {
        "Delete"
    }

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome> {
        let name = arguments.string("data")?;
        let removed = context.remove(name)?;
        info!("Deleted {} ({})", name, removed.kind());
        Ok(StepOutcome::default())
    }
}
