use super::MixerState;
use nalgebra::{ComplexField, DMatrix, DVector};
use std::collections::VecDeque;
use tensor::VectorSpace;
use tracing::{debug, warn};

/// Reciprocal condition number below which the bordered B matrix is
/// treated as singular.
const MIN_RCOND: f64 = 1e-12;

/// DIIS (Direct Inversion in the Iterative Subspace) extrapolation over
/// amplitude vectors.
///
/// The coefficients `c_i` minimise `|Σ c_i r_i|²` subject to `Σ c_i = 1`:
///
/// ```text
/// | B   -1 | |c|   | 0|
/// | -1   0 | |λ| = |-1|,   B_ij = Re<r_i|r_j>
/// ```
///
/// and the proposal is `Σ c_i t_i`. `B` is scaled by its largest diagonal
/// element before the solve.
#[derive(Debug, Clone)]
pub struct DiisMixer<V: VectorSpace> {
    capacity: usize,
    history: VecDeque<(V, V)>,
}

impl<V: VectorSpace> DiisMixer<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        DiisMixer {
            capacity,
            history: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stores a pair, evicting the oldest once the window is full.
    pub fn append(&mut self, amplitudes: V, residual: V) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back((amplitudes, residual));
    }

    pub fn next(&self) -> Option<V> {
        let (latest, _) = self.history.back()?;
        for start in 0..self.history.len() - 1 {
            if let Some(coefficients) = self.coefficients(start) {
                debug!(
                    "DIIS coefficients over {} vectors: {:?}",
                    coefficients.len(),
                    coefficients.as_slice()
                );
                return Some(self.combine(latest.zeros_like(), start, &coefficients));
            }
            debug!(
                "DIIS subspace of {} vectors is ill-conditioned, dropping the oldest",
                self.history.len() - start
            );
        }
        if self.history.len() > 1 {
            warn!("DIIS extrapolation failed, using the latest amplitudes");
        }
        Some(latest.clone())
    }

    pub fn state(&self) -> MixerState {
        MixerState::for_history(self.history.len(), self.capacity)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Stored amplitudes, oldest first.
    pub fn amplitudes(&self) -> impl Iterator<Item = &V> {
        self.history.iter().map(|(amplitudes, _)| amplitudes)
    }

    /// Solves the bordered system over `history[start..]`.
    fn coefficients(&self, start: usize) -> Option<DVector<f64>> {
        let residuals: Vec<&V> = self.history.range(start..).map(|(_, r)| r).collect();
        let n = residuals.len();

        let mut b = DMatrix::<f64>::zeros(n + 1, n + 1);
        for i in 0..n {
            for j in i..n {
                let overlap = residuals[i].inner(residuals[j]).real();
                b[(i, j)] = overlap;
                b[(j, i)] = overlap;
            }
        }
        let scale = (0..n).map(|i| b[(i, i)]).fold(0.0, f64::max);
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }
        for i in 0..n {
            for j in 0..n {
                b[(i, j)] /= scale;
            }
            b[(i, n)] = -1.0;
            b[(n, i)] = -1.0;
        }

        let singular_values = b.clone().singular_values();
        let largest = singular_values.max();
        let smallest = singular_values.min();
        if !largest.is_finite() || largest <= 0.0 || smallest / largest < MIN_RCOND {
            return None;
        }

        let mut rhs = DVector::zeros(n + 1);
        rhs[n] = -1.0;
        let solution = b.lu().solve(&rhs)?;
        let coefficients = solution.rows(0, n).into_owned();
        coefficients
            .iter()
            .all(|c| c.is_finite())
            .then_some(coefficients)
    }

    fn combine(&self, mut result: V, start: usize, coefficients: &DVector<f64>) -> V {
        for ((amplitudes, _), &c) in self.history.range(start..).zip(coefficients.iter()) {
            result.add_scaled(<V::Field as ComplexField>::from_real(c), amplitudes);
        }
        result
    }
}
