//! EOM-CCSD excitation energies as eigenvalues of the CCSD Jacobian.
//!
//! The Jacobian action `A r = dΩ(T + εr)/dε` is taken from central
//! differences of the residual with one Richardson step. The residual is
//! quartic in the amplitudes, so the extrapolated difference has no
//! truncation error.

use crate::amplitudes::AmplitudeSet;
use crate::davidson::{
    DavidsonSettings, DavidsonSolver, DiagonalPreconditioner, EigenpairSet, LinearOperator,
    Preconditioner,
};
use crate::error::{CcError, Result};
use crate::integrals::CoulombIntegrals;
use crate::methods::Ccsd;
use crate::solver::ClusterEquations;
use tensor::VectorSpace;
use tracing::info;

const DEFAULT_STEP: f64 = 1e-2;

pub struct EomCcsdOperator<'a> {
    equations: Ccsd<'a, f64>,
    ground: AmplitudeSet<f64>,
    step: f64,
}

impl<'a> EomCcsdOperator<'a> {
    pub fn new(integrals: &'a CoulombIntegrals<f64>, ground: AmplitudeSet<f64>) -> Result<Self> {
        if ground.levels() != 2
            || ground.n_occ() != integrals.n_occ()
            || ground.n_virt() != integrals.n_virt()
        {
            return Err(CcError::invalid_option(
                "amplitudes",
                format!(
                    "EOM-CCSD needs CCSD amplitudes for {} occupied and {} virtual orbitals",
                    integrals.n_occ(),
                    integrals.n_virt()
                ),
            ));
        }
        Ok(EomCcsdOperator {
            equations: Ccsd::new(integrals),
            ground,
            step: DEFAULT_STEP,
        })
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// `ε_a - ε_i` and `ε_a + ε_b - ε_i - ε_j` in the amplitude layout.
    pub fn diagonal(&self) -> Result<AmplitudeSet<f64>> {
        let mut diagonal = self.ground.denominators(self.equations.integrals())?;
        diagonal.scale(-1.0);
        Ok(diagonal)
    }

    fn central_difference(&self, r: &AmplitudeSet<f64>, h: f64) -> Result<AmplitudeSet<f64>> {
        let mut plus = self.ground.clone();
        plus.add_scaled(h, r);
        let mut minus = self.ground.clone();
        minus.add_scaled(-h, r);
        let mut difference = self.equations.residual(&plus)?;
        difference.add_scaled(-1.0, &self.equations.residual(&minus)?);
        difference.scale(0.5 / h);
        Ok(difference)
    }
}

impl LinearOperator<AmplitudeSet<f64>> for EomCcsdOperator<'_> {
    fn apply(&self, x: &AmplitudeSet<f64>) -> Result<AmplitudeSet<f64>> {
        let mut fine = self.central_difference(x, self.step)?;
        let coarse = self.central_difference(x, 2.0 * self.step)?;
        fine.scale(4.0 / 3.0);
        fine.add_scaled(-1.0 / 3.0, &coarse);
        Ok(fine)
    }
}

/// Lowest EOM-CCSD roots above the converged CCSD ground state.
///
/// `guesses` seed the subspace, e.g. eigenvectors of an earlier solve. When
/// there are fewer of them than roots, the preconditioner's unit vectors are
/// added after them.
pub fn eom_ccsd(
    integrals: &CoulombIntegrals<f64>,
    ground: AmplitudeSet<f64>,
    settings: DavidsonSettings,
    denominator_floor: f64,
    guesses: Vec<AmplitudeSet<f64>>,
) -> Result<EigenpairSet<AmplitudeSet<f64>>> {
    let operator = EomCcsdOperator::new(integrals, ground)?;
    let preconditioner = DiagonalPreconditioner::new(operator.diagonal()?, denominator_floor);
    for guess in &guesses {
        if guess.levels() != 2 || guess.len() != operator.ground.len() {
            return Err(CcError::invalid_option(
                "initialGuesses",
                format!(
                    "guess with {} levels and {} elements does not fit the CCSD space of {}",
                    guess.levels(),
                    guess.len(),
                    operator.ground.len()
                ),
            ));
        }
    }

    let mut solver = DavidsonSolver::new(settings)?;
    let result = if guesses.is_empty() {
        solver.solve(&operator, &preconditioner)?
    } else {
        let mut start: Vec<_> = guesses.into_iter().take(settings.max_subspace - settings.n_roots).collect();
        if start.len() < settings.n_roots {
            start.extend(preconditioner.initial_basis(settings.n_roots));
        }
        info!("Starting from {} guess vectors", start.len());
        solver.solve_from(&operator, &preconditioner, start)?
    };
    for (k, pair) in result.pairs.iter().enumerate() {
        info!("EOM-CCSD root {}: {:.10} Eh", k, pair.value);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixer::{MixerSettings, MixerType};
    use crate::solver::{AmplitudeSolver, SolverSettings};
    use crate::testing::{self, h2_like};
    use approx::assert_relative_eq;

    fn converged_h2() -> (CoulombIntegrals<f64>, AmplitudeSet<f64>) {
        let ints = h2_like().to_spin_orbitals().unwrap();
        let settings = SolverSettings {
            energy_convergence: 1e-12,
            amplitudes_convergence: 1e-11,
            max_iterations: 200,
            level_shift: 0.0,
            mixer: MixerSettings {
                kind: MixerType::Diis,
                ..MixerSettings::default()
            },
        };
        let report = AmplitudeSolver::new(settings)
            .solve(&Ccsd::new(&ints))
            .unwrap();
        assert!(report.converged());
        (ints, report.amplitudes)
    }

    #[test]
    fn jacobian_action_is_linear() {
        let (ints, ground) = converged_h2();
        let op = EomCcsdOperator::new(&ints, ground.clone()).unwrap();
        let x = ground.basis_vector(0).unwrap();
        let mut two_x = x.clone();
        two_x.scale(2.0);
        let ax = op.apply(&x).unwrap();
        let mut a2x = op.apply(&two_x).unwrap();
        a2x.add_scaled(-2.0, &ax);
        assert!(a2x.norm() < 1e-10);
    }

    #[test]
    fn diagonal_is_positive() {
        let (ints, ground) = converged_h2();
        let op = EomCcsdOperator::new(&ints, ground).unwrap();
        let diagonal = op.diagonal().unwrap();
        let d1 = diagonal.singles().unwrap();
        assert!(d1.data().iter().all(|&d| d > 0.0));
    }

    #[test]
    fn h2_excitation_energies_are_exact() {
        let (ints, ground) = converged_h2();
        let settings = DavidsonSettings {
            n_roots: 4,
            max_iterations: 50,
            tolerance: 1e-7,
            energy_tolerance: 1e-9,
            max_subspace: 8,
            ..DavidsonSettings::default()
        };
        let result = eom_ccsd(&ints, ground, settings, 1e-4, Vec::new()).unwrap();
        assert!(result.converged());
        let (triplet, singlet) = testing::excitation_energies();
        let values = result.values();
        for value in &values[..3] {
            assert_relative_eq!(*value, triplet, epsilon = 1e-6);
        }
        assert_relative_eq!(values[3], singlet, epsilon = 1e-6);
    }

    #[test]
    fn earlier_eigenvectors_seed_a_new_solve() {
        let (ints, ground) = converged_h2();
        let settings = DavidsonSettings {
            n_roots: 4,
            max_iterations: 50,
            tolerance: 1e-7,
            max_subspace: 8,
            ..DavidsonSettings::default()
        };
        let first = eom_ccsd(&ints, ground.clone(), settings, 1e-4, Vec::new()).unwrap();
        let guesses = first.pairs.iter().map(|p| p.vector.clone()).collect();
        let again = eom_ccsd(&ints, ground.clone(), settings, 1e-4, guesses).unwrap();
        assert!(again.converged());
        assert!(again.iterations <= first.iterations);
        for (a, b) in again.values().iter().zip(first.values()) {
            assert_relative_eq!(*a, b, epsilon = 1e-7);
        }

        // one guess for two roots is topped up from the diagonal
        let lowest = vec![first.pairs[0].vector.clone()];
        let two = DavidsonSettings { n_roots: 2, ..settings };
        let topped = eom_ccsd(&ints, ground.clone(), two, 1e-4, lowest).unwrap();
        assert!(topped.converged());
        assert_relative_eq!(topped.values()[0], first.values()[0], epsilon = 1e-6);

        let wrong = AmplitudeSet::zeros(ints.n_occ(), ints.n_virt(), 3).unwrap();
        assert!(eom_ccsd(&ints, ground, two, 1e-4, vec![wrong]).is_err());
    }

    #[test]
    fn rejects_mismatched_amplitudes() {
        let ints = h2_like().to_spin_orbitals().unwrap();
        let wrong = AmplitudeSet::zeros(ints.n_occ(), ints.n_virt(), 3).unwrap();
        assert!(EomCcsdOperator::new(&ints, wrong).is_err());
    }
}
