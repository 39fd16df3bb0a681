#[cfg(test)]
mod tests {
    use super::super::{
        AmplitudeSolver, ClusterEquations, SolverSettings, SolverState, SolverStatus,
    };
    use crate::amplitudes::AmplitudeSet;
    use crate::error::Result;
    use crate::mixer::{MixerSettings, MixerType};
    use approx::assert_relative_eq;
    use tensor::VectorSpace;

    /// Weakly nonlinear model `Ω_a = b_a + c t_a² + Σ_b K_ab t_b - d_a t_a`
    /// on one occupied and three virtual orbitals.
    struct ToyEquations {
        b: [f64; 3],
        d: [f64; 3],
        coupling: [[f64; 3]; 3],
        c: f64,
    }

    impl ToyEquations {
        fn new() -> Self {
            ToyEquations {
                b: [0.10, -0.05, 0.02],
                d: [-1.0, -1.5, -2.0],
                coupling: [[0.0, 0.3, 0.1], [0.3, 0.0, 0.2], [0.1, 0.2, 0.0]],
                c: 0.4,
            }
        }
    }

    impl ClusterEquations<f64> for ToyEquations {
        fn name(&self) -> &str {
            "Toy"
        }

        fn excitation_levels(&self) -> usize {
            1
        }

        fn initial_amplitudes(&self) -> Result<AmplitudeSet<f64>> {
            AmplitudeSet::zeros(1, 3, 1)
        }

        fn residual(&self, t: &AmplitudeSet<f64>) -> Result<AmplitudeSet<f64>> {
            let mut omega = t.zeros_like();
            let x = t.singles()?.data().to_vec();
            let out = omega.get_mut(1)?.data_mut();
            for a in 0..3 {
                let coupled: f64 = (0..3).map(|b| self.coupling[a][b] * x[b]).sum();
                out[a] = self.b[a] + self.c * x[a] * x[a] + coupled - self.d[a] * x[a];
            }
            Ok(omega)
        }

        fn energy(&self, t: &AmplitudeSet<f64>) -> Result<f64> {
            Ok(t.singles()?.data().iter().zip(&self.b).map(|(x, b)| x * b).sum())
        }

        fn denominators(&self, t: &AmplitudeSet<f64>) -> Result<AmplitudeSet<f64>> {
            let mut d = t.zeros_like();
            d.get_mut(1)?.data_mut().copy_from_slice(&self.d);
            Ok(d)
        }
    }

    fn settings(kind: MixerType, max_iterations: usize) -> SolverSettings {
        SolverSettings {
            energy_convergence: 1e-12,
            amplitudes_convergence: 1e-10,
            max_iterations,
            level_shift: 0.0,
            mixer: MixerSettings {
                kind,
                ..MixerSettings::default()
            },
        }
    }

    #[test]
    fn linear_mixer_reaches_the_fixed_point() {
        let equations = ToyEquations::new();
        let mut solver = AmplitudeSolver::new(settings(MixerType::Linear, 200));
        assert_eq!(solver.state(), SolverState::Initialized);
        let report = solver.solve(&equations).unwrap();

        assert_eq!(report.status, SolverStatus::Converged);
        assert_eq!(solver.state(), SolverState::Converged);
        let residual = equations.residual(&report.amplitudes).unwrap();
        assert!(residual.norm() < 1e-10);
    }

    #[test]
    fn diis_converges_faster_than_linear() {
        let equations = ToyEquations::new();
        let linear = AmplitudeSolver::new(settings(MixerType::Linear, 200))
            .solve(&equations)
            .unwrap();
        let diis = AmplitudeSolver::new(settings(MixerType::Diis, 200))
            .solve(&equations)
            .unwrap();
        assert!(diis.converged());
        assert!(diis.iterations < linear.iterations);
        assert_relative_eq!(diis.energy, linear.energy, epsilon = 1e-10);
    }

    #[test]
    fn iteration_cap_returns_best_effort_amplitudes() {
        let equations = ToyEquations::new();
        let mut solver = AmplitudeSolver::new(settings(MixerType::Linear, 2));
        let report = solver.solve(&equations).unwrap();
        assert_eq!(report.status, SolverStatus::MaxIterationsExceeded);
        assert_eq!(solver.state(), SolverState::MaxIterationsExceeded);
        assert_eq!(report.iterations, 2);
        assert!(report.amplitudes.singles().unwrap().max_abs() > 0.0);
    }

    #[test]
    fn zero_iterations_evaluates_the_start() {
        let equations = ToyEquations::new();
        let report = AmplitudeSolver::new(settings(MixerType::Linear, 0))
            .solve(&equations)
            .unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(report.energy, 0.0);
        assert_relative_eq!(report.residual_norm, (0.01f64 + 0.0025 + 0.0004).sqrt());
    }

    #[test]
    fn level_shift_keeps_the_solution() {
        let equations = ToyEquations::new();
        let mut shifted = settings(MixerType::Diis, 200);
        shifted.level_shift = 0.5;
        let plain = AmplitudeSolver::new(settings(MixerType::Diis, 200))
            .solve(&equations)
            .unwrap();
        let report = AmplitudeSolver::new(shifted).solve(&equations).unwrap();
        assert!(report.converged());
        assert_relative_eq!(report.energy, plain.energy, epsilon = 1e-10);
    }
}
