//! Davidson eigensolver for implicitly defined operators.
//!
//! Only the action `x -> A x` is needed. The solver keeps an orthonormal
//! trial basis together with its images, projects `A` into it, and expands
//! the basis with preconditioned residuals of the targeted Ritz pairs.
//! When the basis would outgrow `max_subspace` it is collapsed onto the
//! current Ritz vectors; their images are combined from the stored ones.

mod dense;
mod preconditioner;


pub use preconditioner::DiagonalPreconditioner;

use crate::error::{CcError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tensor::vector::orthogonalize;
use tensor::VectorSpace;
use tracing::{debug, info, warn};

/// Relative norm below which a new direction counts as linearly dependent.
const DEPENDENCE_THRESHOLD: f64 = 1e-8;

pub trait LinearOperator<V: VectorSpace> {
    fn apply(&self, x: &V) -> Result<V>;

    fn is_hermitian(&self) -> bool {
        false
    }
}

pub trait Preconditioner<V: VectorSpace> {
    /// Up to `n` starting vectors.
    fn initial_basis(&self, n: usize) -> Vec<V>;

    /// Correction direction for a Ritz pair with value `ritz_value` and
    /// residual `residual`.
    fn correction(&self, ritz_value: f64, residual: &V) -> V;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Target {
    #[default]
    #[serde(alias = "lowest")]
    Lowest,
    #[serde(alias = "highest")]
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DavidsonState {
    Initialized,
    ExpandingSubspace,
    Diagonalized,
    Converged,
    MaxIterationsExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DavidsonStatus {
    Converged,
    MaxIterationsExceeded,
    /// No correction survived orthogonalization before convergence.
    Stagnated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DavidsonSettings {
    pub n_roots: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub energy_tolerance: f64,
    pub max_subspace: usize,
    pub target: Target,
}

impl Default for DavidsonSettings {
    fn default() -> Self {
        DavidsonSettings {
            n_roots: 3,
            max_iterations: 32,
            tolerance: 1e-6,
            energy_tolerance: 1e-8,
            max_subspace: 24,
            target: Target::Lowest,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Eigenpair<V> {
    pub value: f64,
    /// Imaginary part of the Ritz value; zero for Hermitian operators.
    pub imaginary: f64,
    pub vector: V,
    pub residual_norm: f64,
}

#[derive(Debug, Clone)]
pub struct EigenpairSet<V> {
    pub status: DavidsonStatus,
    pub iterations: usize,
    pub pairs: Vec<Eigenpair<V>>,
}

impl<V> EigenpairSet<V> {
    pub fn values(&self) -> Vec<f64> {
        self.pairs.iter().map(|p| p.value).collect()
    }

    pub fn converged(&self) -> bool {
        self.status == DavidsonStatus::Converged
    }
}

/// Orthonormal trial vectors and their images under the operator.
struct Subspace<V> {
    basis: Vec<V>,
    images: Vec<V>,
}

impl<V: VectorSpace<Field = f64>> Subspace<V> {
    fn new() -> Self {
        Subspace {
            basis: Vec::new(),
            images: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.basis.len()
    }

    /// Orthonormalizes `v` against the basis; `false` if it is dependent.
    fn push(&mut self, mut v: V) -> bool {
        let initial = v.norm();
        if initial == 0.0 || !initial.is_finite() {
            return false;
        }
        let remaining = orthogonalize(&mut v, &self.basis);
        if remaining < DEPENDENCE_THRESHOLD * initial {
            return false;
        }
        v.scale(remaining.recip());
        self.basis.push(v);
        true
    }

    /// Like `push`, applying the same combination to a known image `av`.
    fn push_with_image(&mut self, mut v: V, mut av: V) -> bool {
        let initial = v.norm();
        if initial == 0.0 || !initial.is_finite() || self.images.len() != self.basis.len() {
            return false;
        }
        for _ in 0..2 {
            for (b, ab) in self.basis.iter().zip(&self.images) {
                let overlap = b.inner(&v);
                if overlap != 0.0 {
                    v.add_scaled(-overlap, b);
                    av.add_scaled(-overlap, ab);
                }
            }
        }
        let remaining = v.norm();
        if remaining < DEPENDENCE_THRESHOLD * initial {
            return false;
        }
        v.scale(remaining.recip());
        av.scale(remaining.recip());
        self.basis.push(v);
        self.images.push(av);
        true
    }

    fn combine(vectors: &[V], coefficients: &nalgebra::DVector<f64>) -> Option<V> {
        let mut result = vectors.first()?.zeros_like();
        for (v, &c) in vectors.iter().zip(coefficients.iter()) {
            if c != 0.0 {
                result.add_scaled(c, v);
            }
        }
        Some(result)
    }
}

struct RitzPair<V> {
    value: f64,
    imaginary: f64,
    vector: V,
    image: V,
    residual: V,
    residual_norm: f64,
}

pub struct DavidsonSolver {
    settings: DavidsonSettings,
    state: DavidsonState,
}

impl DavidsonSolver {
    pub fn new(settings: DavidsonSettings) -> Result<Self> {
        if settings.n_roots == 0 {
            return Err(CcError::invalid_option("nRoots", "at least one root is required"));
        }
        if settings.max_subspace < 2 * settings.n_roots {
            return Err(CcError::invalid_option(
                "maxSubspace",
                format!(
                    "{} is smaller than twice the number of roots ({})",
                    settings.max_subspace, settings.n_roots
                ),
            ));
        }
        Ok(DavidsonSolver {
            settings,
            state: DavidsonState::Initialized,
        })
    }

    pub fn state(&self) -> DavidsonState {
        self.state
    }

    pub fn settings(&self) -> &DavidsonSettings {
        &self.settings
    }

    /// Seeds the subspace from the preconditioner.
    pub fn solve<V, A, P>(&mut self, operator: &A, preconditioner: &P) -> Result<EigenpairSet<V>>
    where
        V: VectorSpace<Field = f64>,
        A: LinearOperator<V> + ?Sized,
        P: Preconditioner<V> + ?Sized,
    {
        let guesses = preconditioner.initial_basis(self.settings.n_roots);
        self.solve_from(operator, preconditioner, guesses)
    }

    pub fn solve_from<V, A, P>(
        &mut self,
        operator: &A,
        preconditioner: &P,
        guesses: Vec<V>,
    ) -> Result<EigenpairSet<V>>
    where
        V: VectorSpace<Field = f64>,
        A: LinearOperator<V> + ?Sized,
        P: Preconditioner<V> + ?Sized,
    {
        let settings = self.settings;
        let hermitian = operator.is_hermitian();
        info!("===========================================");
        info!("     Davidson eigensolver");
        info!("===========================================");
        info!("Roots: {} ({:?})", settings.n_roots, settings.target);
        info!("Operator: {}", if hermitian { "Hermitian" } else { "general" });
        info!("Max iterations: {}", settings.max_iterations);
        info!("Max subspace: {}", settings.max_subspace);

        let mut subspace = Subspace::new();
        for guess in guesses {
            subspace.push(guess);
        }
        if subspace.len() < settings.n_roots {
            return Err(CcError::invalid_option(
                "nRoots",
                format!(
                    "only {} independent start vectors for {} roots",
                    subspace.len(),
                    settings.n_roots
                ),
            ));
        }
        self.state = DavidsonState::Initialized;

        let mut previous: Option<Vec<f64>> = None;
        let mut iteration = 0;
        info!("{:>5} {:>6} {:>18} {:>14}", "Iter", "Basis", "max |r|", "max |Δλ|");
        info!("{}", "-".repeat(50));

        loop {
            iteration += 1;
            self.state = DavidsonState::ExpandingSubspace;
            for k in subspace.images.len()..subspace.len() {
                let image = operator.apply(&subspace.basis[k])?;
                subspace.images.push(image);
            }

            let n = subspace.len();
            let mut projected = DMatrix::<f64>::zeros(n, n);
            for i in 0..n {
                for j in 0..n {
                    projected[(i, j)] = subspace.basis[i].inner(&subspace.images[j]);
                }
            }
            let mut eigen = dense::eigenpairs(&projected, hermitian);
            self.state = DavidsonState::Diagonalized;
            if settings.target == Target::Highest {
                eigen.reverse();
            }

            let ritz: Vec<RitzPair<V>> = eigen
                .iter()
                .take(settings.n_roots)
                .filter_map(|pair| {
                    let mut vector = Subspace::<V>::combine(&subspace.basis, &pair.coefficients)?;
                    let mut image = Subspace::<V>::combine(&subspace.images, &pair.coefficients)?;
                    let norm = vector.norm();
                    if norm > 0.0 {
                        vector.scale(norm.recip());
                        image.scale(norm.recip());
                    }
                    let mut residual = image.clone();
                    residual.add_scaled(-pair.value, &vector);
                    let residual_norm = residual.norm();
                    Some(RitzPair {
                        value: pair.value,
                        imaginary: pair.imaginary,
                        vector,
                        image,
                        residual,
                        residual_norm,
                    })
                })
                .collect();

            let values: Vec<f64> = ritz.iter().map(|p| p.value).collect();
            let max_residual = ritz.iter().map(|p| p.residual_norm).fold(0.0, f64::max);
            let max_change = previous
                .as_ref()
                .map(|old| {
                    old.iter()
                        .zip(&values)
                        .map(|(a, b)| (a - b).abs())
                        .fold(0.0, f64::max)
                })
                .unwrap_or(0.0);
            info!("{:5} {:6} {:18.8e} {:14.4e}", iteration, n, max_residual, max_change);
            for (k, pair) in ritz.iter().enumerate() {
                debug!(
                    "root {}: {:.12} (im {:.2e}), |r| = {:.3e}",
                    k, pair.value, pair.imaginary, pair.residual_norm
                );
            }

            let converged = max_residual < settings.tolerance
                && max_change < settings.energy_tolerance
                && ritz.len() == settings.n_roots;
            if converged {
                self.state = DavidsonState::Converged;
                info!("Davidson converged in {} iterations", iteration);
                return Ok(Self::finish(DavidsonStatus::Converged, iteration, ritz));
            }
            if iteration >= settings.max_iterations {
                self.state = DavidsonState::MaxIterationsExceeded;
                warn!(
                    "Davidson not converged after {} iterations (max |r| = {:.3e})",
                    iteration, max_residual
                );
                return Ok(Self::finish(
                    DavidsonStatus::MaxIterationsExceeded,
                    iteration,
                    ritz,
                ));
            }

            let pending = ritz
                .iter()
                .filter(|p| p.residual_norm >= settings.tolerance)
                .count()
                .max(1);
            if subspace.len() + pending > settings.max_subspace {
                debug!("collapsing subspace of {} onto {} Ritz vectors", n, ritz.len());
                let mut collapsed = Subspace::new();
                for pair in &ritz {
                    collapsed.push_with_image(pair.vector.clone(), pair.image.clone());
                }
                subspace = collapsed;
            }

            let before = subspace.len();
            for pair in ritz.iter().filter(|p| p.residual_norm >= settings.tolerance) {
                let correction = preconditioner.correction(pair.value, &pair.residual);
                subspace.push(correction);
            }
            if subspace.len() == before {
                let status = if max_residual < settings.tolerance {
                    self.state = DavidsonState::Converged;
                    DavidsonStatus::Converged
                } else {
                    self.state = DavidsonState::MaxIterationsExceeded;
                    warn!("Davidson subspace stopped growing at iteration {}", iteration);
                    DavidsonStatus::Stagnated
                };
                return Ok(Self::finish(status, iteration, ritz));
            }
            previous = Some(values);
        }
    }

    fn finish<V>(status: DavidsonStatus, iterations: usize, ritz: Vec<RitzPair<V>>) -> EigenpairSet<V> {
        EigenpairSet {
            status,
            iterations,
            pairs: ritz
                .into_iter()
                .map(|p| Eigenpair {
                    value: p.value,
                    imaginary: p.imaginary,
                    vector: p.vector,
                    residual_norm: p.residual_norm,
                })
                .collect(),
        }
    }
}
