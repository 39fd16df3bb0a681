#[cfg(test)]
mod tests {
    use super::super::{connected_triples, Ccsd, Ccsdt1, Drccd, Mp2, PerturbativeTriples};
    use crate::amplitudes::AmplitudeSet;
    use crate::integrals::{CoulombIntegrals, SpatialIntegrals};
    use crate::mixer::{MixerSettings, MixerType};
    use crate::solver::{AmplitudeSolver, ClusterEquations, SolverSettings, SolverStatus};
    use crate::testing::{self, h2_like, random_model};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use tensor::VectorSpace;

    fn tight(kind: MixerType) -> SolverSettings {
        SolverSettings {
            energy_convergence: 1e-11,
            amplitudes_convergence: 1e-9,
            max_iterations: 100,
            level_shift: 0.0,
            mixer: MixerSettings {
                kind,
                ..MixerSettings::default()
            },
        }
    }

    fn h2() -> CoulombIntegrals<f64> {
        h2_like().to_spin_orbitals().unwrap()
    }

    fn four_electrons() -> CoulombIntegrals<f64> {
        random_model(4, 4, 11).to_spin_orbitals().unwrap()
    }

    /// Lowest singlet of two electrons, diagonalized over the `n²`
    /// determinants with one α and one β electron.
    fn two_electron_fci(model: &SpatialIntegrals) -> f64 {
        let n = model.n_orbitals;
        let h = |p: usize, q: usize| model.core_hamiltonian.get(&[p, q]).unwrap();
        let g = |p: usize, q: usize, r: usize, s: usize| model.eri.get(&[p, q, r, s]).unwrap();
        let mut hamiltonian = DMatrix::<f64>::zeros(n * n, n * n);
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    for l in 0..n {
                        let mut x = g(i, k, j, l);
                        if j == l {
                            x += h(i, k);
                        }
                        if i == k {
                            x += h(j, l);
                        }
                        hamiltonian[(i * n + j, k * n + l)] = x;
                    }
                }
            }
        }
        let eigen = hamiltonian.symmetric_eigen();
        // singlets are symmetric under exchange of the two orbitals
        let lowest = (0..n * n)
            .filter(|&m| {
                let c = eigen.eigenvectors.column(m);
                (0..n).all(|i| (0..n).all(|j| (c[i * n + j] - c[j * n + i]).abs() < 1e-8))
            })
            .map(|m| eigen.eigenvalues[m])
            .fold(f64::INFINITY, f64::min);
        lowest + model.core_energy
    }

    #[test]
    fn mp2_matches_closed_form() {
        let ints = h2();
        let eps1 = testing::H11 + testing::J11;
        let eps2 = testing::H22 + 2.0 * testing::J12 - testing::K12;
        let expected = testing::K12 * testing::K12 / (2.0 * (eps1 - eps2));
        let result = Mp2::new(&ints).run().unwrap();
        assert_relative_eq!(result.energy, expected, epsilon = 1e-12);
    }

    #[test]
    fn ccsd_energy_of_first_order_doubles_is_mp2() {
        let ints = four_electrons();
        let mp2 = Mp2::new(&ints).run().unwrap();
        let ccsd = Ccsd::new(&ints);
        let mut start = ccsd.initial_amplitudes().unwrap();
        // non-canonical reference: compare the doubles term only
        start.get_mut(1).unwrap().fill(0.0);
        assert_relative_eq!(ccsd.energy(&start).unwrap(), mp2.energy, epsilon = 1e-12);
    }

    #[test]
    fn ccsd_is_exact_for_two_electrons() {
        let ints = h2();
        for kind in [MixerType::Linear, MixerType::Diis] {
            let report = AmplitudeSolver::new(tight(kind))
                .solve(&Ccsd::new(&ints))
                .unwrap();
            assert_eq!(report.status, SolverStatus::Converged);
            assert_relative_eq!(report.energy, testing::correlation_energy(), epsilon = 1e-8);
        }
    }

    #[test]
    fn ccsd_with_singles_matches_two_electron_fci() {
        for seed in [3, 11, 29] {
            let model = random_model(4, 2, seed);
            let ints = model.to_spin_orbitals().unwrap();
            let report = AmplitudeSolver::new(tight(MixerType::Diis))
                .solve(&Ccsd::new(&ints))
                .unwrap();
            assert!(report.converged());
            assert!(report.amplitudes.singles().unwrap().max_abs() > 1e-4);
            assert_relative_eq!(
                ints.reference_energy() + report.energy,
                two_electron_fci(&model),
                epsilon = 1e-8
            );
        }
    }

    #[test]
    fn ccsd_residual_keeps_antisymmetry() {
        let ints = four_electrons();
        let ccsd = Ccsd::new(&ints);
        let mut t = ccsd.initial_amplitudes().unwrap();
        t.get_mut(1).unwrap().fill(0.01);
        let omega = ccsd.residual(&t).unwrap();
        let r2 = omega.doubles().unwrap();
        let (o, v) = (ints.n_occ(), ints.n_virt());
        for i in 0..o {
            for j in 0..o {
                for a in 0..v {
                    for b in 0..v {
                        let x = r2.get(&[i, j, a, b]).unwrap();
                        assert_relative_eq!(x, -r2.get(&[j, i, a, b]).unwrap(), epsilon = 1e-12);
                        assert_relative_eq!(x, -r2.get(&[i, j, b, a]).unwrap(), epsilon = 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn ccsd_converges_on_four_electrons() {
        let ints = four_electrons();
        let report = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&Ccsd::new(&ints))
            .unwrap();
        assert!(report.converged());
        let mp2 = Mp2::new(&ints).run().unwrap();
        assert!(report.energy < 0.0);
        assert!((report.energy - mp2.energy).abs() < 0.5 * mp2.energy.abs());
    }

    #[test]
    fn ccsdt1_reduces_to_ccsd_for_two_electrons() {
        let ints = h2();
        let ccsdt = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&Ccsdt1::new(&ints))
            .unwrap();
        assert!(ccsdt.converged());
        assert_eq!(ccsdt.amplitudes.levels(), 3);
        assert_relative_eq!(ccsdt.amplitudes.triples().unwrap().max_abs(), 0.0);
        assert_relative_eq!(ccsdt.energy, testing::correlation_energy(), epsilon = 1e-8);
    }

    #[test]
    fn ccsdt1_triples_lower_the_ccsd_energy() {
        let ints = random_model(6, 4, 5).to_spin_orbitals().unwrap();
        let ccsd = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&Ccsd::new(&ints))
            .unwrap();
        let equations = Ccsdt1::new(&ints);
        let ccsdt = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&equations)
            .unwrap();
        assert!(ccsd.converged());
        assert!(ccsdt.converged());

        assert!(ccsdt.amplitudes.triples().unwrap().max_abs() > 1e-8);
        let omega = equations.residual(&ccsdt.amplitudes).unwrap();
        assert!(omega.triples().unwrap().norm() < 1e-9);

        let shift = ccsdt.energy - ccsd.energy;
        assert!(shift < 0.0);
        assert!(shift.abs() < 0.1 * ccsd.energy.abs());
    }

    #[test]
    fn connected_triples_are_antisymmetric() {
        let ints = four_electrons();
        let t2 = Mp2::new(&ints).run().unwrap().amplitudes;
        let w = connected_triples(&ints, t2.doubles().unwrap()).unwrap();
        let (o, v) = (ints.n_occ(), ints.n_virt());
        assert_eq!(w.shape(), &[o, o, o, v, v, v]);
        assert!(w.max_abs() > 0.0);
        for (i, j, k) in [(0, 1, 2), (1, 2, 3)] {
            for (a, b, c) in [(0, 1, 2), (0, 2, 3)] {
                let x = w.get(&[i, j, k, a, b, c]).unwrap();
                assert_relative_eq!(x, -w.get(&[j, i, k, a, b, c]).unwrap(), epsilon = 1e-12);
                assert_relative_eq!(x, w.get(&[j, k, i, a, b, c]).unwrap(), epsilon = 1e-12);
                assert_relative_eq!(x, -w.get(&[i, j, k, a, c, b]).unwrap(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn perturbative_triples_vanish_for_two_electrons() {
        let ints = h2();
        let report = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&Ccsd::new(&ints))
            .unwrap();
        let correction = PerturbativeTriples::new(&ints)
            .energy(&report.amplitudes)
            .unwrap();
        assert_relative_eq!(correction, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn perturbative_triples_lower_the_energy() {
        let ints = four_electrons();
        let report = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&Ccsd::new(&ints))
            .unwrap();
        let correction = PerturbativeTriples::new(&ints)
            .energy(&report.amplitudes)
            .unwrap();
        assert!(correction < 0.0);
        assert!(correction.abs() < report.energy.abs());
    }

    #[test]
    fn drccd_reports_direct_and_exchange() {
        let ints = h2();
        let drccd = Drccd::new(&ints);
        let report = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&drccd)
            .unwrap();
        assert!(report.converged());
        let energy = drccd.report(&report.amplitudes).unwrap();
        assert!(energy.direct < 0.0);
        assert_relative_eq!(energy.total(), report.energy, epsilon = 1e-12);
        assert_relative_eq!(
            report.amplitudes.singles().unwrap().max_abs(),
            0.0
        );
    }

    #[test]
    fn residual_vanishes_at_converged_amplitudes() {
        let ints = h2();
        let ccsd = Ccsd::new(&ints);
        let report = AmplitudeSolver::new(tight(MixerType::Diis))
            .solve(&ccsd)
            .unwrap();
        let omega = ccsd.residual(&report.amplitudes).unwrap();
        assert!(omega.norm() < 1e-9);
        let zero = AmplitudeSet::<f64>::for_integrals(&ints, 2).unwrap();
        assert!(ccsd.residual(&zero).unwrap().norm() > 0.1);
    }
}
