//! Fixed-point iteration of the amplitude equations `Ω(T) = 0`.
//!
//! Each iteration evaluates the residual and the energy of the current
//! amplitudes, checks convergence, then takes a Jacobi step
//! `T + Ω / (D - shift)` and lets the mixer propose the next amplitudes.

#[cfg(test)]
mod tests;

use crate::amplitudes::AmplitudeSet;
use crate::error::Result;
use crate::mixer::{Mixer, MixerSettings};
use serde::Serialize;
use tensor::{Scalar, VectorSpace};
use tracing::{info, warn};

/// Denominators smaller than this leave the amplitude unchanged.
const SMALL_DENOMINATOR: f64 = 1e-12;

/// A set of coupled-cluster amplitude equations.
pub trait ClusterEquations<F: Scalar> {
    fn name(&self) -> &str;

    /// Highest excitation level of the amplitudes, e.g. 2 for CCSD.
    fn excitation_levels(&self) -> usize;

    fn initial_amplitudes(&self) -> Result<AmplitudeSet<F>>;

    /// Full residual `Ω(T)`, zero at the solution.
    fn residual(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>>;

    /// Correlation energy of `amplitudes`.
    fn energy(&self, amplitudes: &AmplitudeSet<F>) -> Result<F>;

    /// Orbital-energy denominators `D` in the layout of `amplitudes`.
    fn denominators(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Initialized,
    Iterating,
    Converged,
    MaxIterationsExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolverStatus {
    Converged,
    MaxIterationsExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    pub energy_convergence: f64,
    pub amplitudes_convergence: f64,
    pub max_iterations: usize,
    pub level_shift: f64,
    pub mixer: MixerSettings,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            energy_convergence: 1e-6,
            amplitudes_convergence: 1e-5,
            max_iterations: 16,
            level_shift: 0.0,
            mixer: MixerSettings::default(),
        }
    }
}

/// Outcome of one solve. Non-convergence is reported, not raised.
#[derive(Debug, Clone)]
pub struct SolverReport<F: Scalar = f64> {
    pub status: SolverStatus,
    /// Amplitude updates performed.
    pub iterations: usize,
    pub energy: F,
    pub residual_norm: f64,
    pub amplitudes: AmplitudeSet<F>,
}

impl<F: Scalar> SolverReport<F> {
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }
}

pub struct AmplitudeSolver {
    settings: SolverSettings,
    state: SolverState,
}

impl AmplitudeSolver {
    pub fn new(settings: SolverSettings) -> Self {
        AmplitudeSolver {
            settings,
            state: SolverState::Initialized,
        }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Iterates from the equations' own starting amplitudes.
    pub fn solve<F: Scalar, E: ClusterEquations<F> + ?Sized>(
        &mut self,
        equations: &E,
    ) -> Result<SolverReport<F>> {
        let initial = equations.initial_amplitudes()?;
        self.solve_from(equations, initial)
    }

    pub fn solve_from<F: Scalar, E: ClusterEquations<F> + ?Sized>(
        &mut self,
        equations: &E,
        initial: AmplitudeSet<F>,
    ) -> Result<SolverReport<F>> {
        let settings = self.settings;
        info!("===========================================");
        info!("     {} amplitude equations", equations.name());
        info!("===========================================");
        info!("Mixer: {}", settings.mixer.kind);
        info!("Max iterations: {}", settings.max_iterations);
        info!("Energy convergence: {:.2e}", settings.energy_convergence);
        info!("Amplitudes convergence: {:.2e}", settings.amplitudes_convergence);
        if settings.level_shift != 0.0 {
            info!("Level shift: {:.4}", settings.level_shift);
        }

        let shift = F::from_real(settings.level_shift);
        let mut denominators = equations.denominators(&initial)?;
        if !shift.is_zero() {
            for d in denominators.components_mut() {
                d.data_mut().iter_mut().for_each(|x| *x -= shift);
            }
        }

        let mut mixer: Mixer<AmplitudeSet<F>> = Mixer::new(&settings.mixer);
        let mut amplitudes = initial;
        let mut previous_energy = F::zero();
        let mut iteration = 0;
        self.state = SolverState::Iterating;

        info!("{:>5} {:>20} {:>16} {:>16}", "Iter", "Energy", "|Ω|", "ΔE");
        info!("{}", "-".repeat(60));

        let (status, energy, residual_norm) = loop {
            let residual = equations.residual(&amplitudes)?;
            let residual_norm = residual.norm();
            let energy = equations.energy(&amplitudes)?;
            let delta = (energy - previous_energy).modulus();
            info!(
                "{:5} {:20.12} {:16.8e} {:16.8e}",
                iteration,
                energy.real(),
                residual_norm,
                delta
            );

            if residual_norm < settings.amplitudes_convergence
                && delta < settings.energy_convergence
            {
                break (SolverStatus::Converged, energy, residual_norm);
            }
            if iteration >= settings.max_iterations {
                break (SolverStatus::MaxIterationsExceeded, energy, residual_norm);
            }

            let mut change = residual;
            change.zip_map(&denominators, |r, d| {
                if d.modulus() < SMALL_DENOMINATOR {
                    F::zero()
                } else {
                    r / d
                }
            });
            let mut estimate = amplitudes.clone();
            estimate.add_scaled(F::one(), &change);
            mixer.append(estimate, change);
            if let Some(next) = mixer.next() {
                amplitudes = next;
            }

            previous_energy = energy;
            iteration += 1;
        };

        info!("{}", "-".repeat(60));
        match status {
            SolverStatus::Converged => {
                self.state = SolverState::Converged;
                info!("{} converged in {} iterations", equations.name(), iteration);
            }
            SolverStatus::MaxIterationsExceeded => {
                self.state = SolverState::MaxIterationsExceeded;
                warn!(
                    "{} not converged after {} iterations (|Ω| = {:.3e})",
                    equations.name(),
                    iteration,
                    residual_norm
                );
            }
        }
        info!("{} correlation energy: {:.12} Eh", equations.name(), energy.real());

        Ok(SolverReport {
            status,
            iterations: iteration,
            energy,
            residual_norm,
            amplitudes,
        })
    }
}
