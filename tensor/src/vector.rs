//! Vector-space view of tensors for the iterative solvers.
//!
//! Mixers and eigensolvers only need linear combinations and inner
//! products; anything implementing [`VectorSpace`] can be iterated on.

use crate::scalar::Scalar;
use crate::tensor::Tensor;
use nalgebra::ComplexField;
use num_traits::Zero;

pub trait VectorSpace: Clone + Send + Sync {
    type Field: Scalar;

    fn zeros_like(&self) -> Self;

    fn scale(&mut self, alpha: Self::Field);

    /// `self += alpha * x`
    ///
    /// # Panics
    ///
    /// If `x` does not belong to the same space as `self`.
    fn add_scaled(&mut self, alpha: Self::Field, x: &Self);

    /// Inner product, conjugate-linear in `self`.
    fn inner(&self, other: &Self) -> Self::Field;

    fn norm(&self) -> f64 {
        self.inner(self).real().max(0.0).sqrt()
    }

    /// Number of coordinates.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element(&self, index: usize) -> Self::Field;

    /// Unit trial vector for coordinate `index`, or `None` when that
    /// coordinate is redundant under the space's symmetry.
    fn basis_vector(&self, index: usize) -> Option<Self>;

    /// Applies `f(self_i, other_i)` to every coordinate.
    fn zip_map(&mut self, other: &Self, f: impl Fn(Self::Field, Self::Field) -> Self::Field + Sync);
}

impl<F: Scalar> VectorSpace for Tensor<F> {
    type Field = F;

    fn zeros_like(&self) -> Self {
        Tensor::zeros_like(self)
    }

    fn scale(&mut self, alpha: F) {
        Tensor::scale(self, alpha)
    }

    fn add_scaled(&mut self, alpha: F, x: &Self) {
        if let Err(err) = self.axpy(alpha, x) {
            panic!("{err}");
        }
    }

    fn inner(&self, other: &Self) -> F {
        match self.dot(other) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    fn len(&self) -> usize {
        Tensor::len(self)
    }

    fn element(&self, index: usize) -> F {
        self.data()[index]
    }

    fn basis_vector(&self, index: usize) -> Option<Self> {
        if index >= Tensor::len(self) {
            return None;
        }
        let mut unit = Tensor::zeros_like(self);
        unit.data_mut()[index] = F::one();
        Some(unit)
    }

    fn zip_map(&mut self, other: &Self, f: impl Fn(F, F) -> F + Sync) {
        if let Err(err) = self.zip_apply(other, f) {
            panic!("{err}");
        }
    }
}

/// Modified Gram–Schmidt of `v` against an orthonormal `basis`, two passes.
/// Returns the norm left after projection.
pub fn orthogonalize<V: VectorSpace>(v: &mut V, basis: &[V]) -> f64 {
    for _ in 0..2 {
        for b in basis {
            let overlap = b.inner(v);
            if !overlap.is_zero() {
                v.add_scaled(-overlap, b);
            }
        }
    }
    v.norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn orthogonalize_removes_projection() {
        let e0 = Tensor::from_vec("e0", &[3], vec![1.0, 0.0, 0.0]).unwrap();
        let mut v = Tensor::from_vec("v", &[3], vec![2.0, 3.0, 4.0]).unwrap();
        let remaining = orthogonalize(&mut v, &[e0.clone()]);
        assert_relative_eq!(remaining, 5.0, epsilon = 1e-14);
        assert_relative_eq!(e0.inner(&v), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn basis_vector_is_unit() {
        let t = Tensor::<f64>::zeros("t", &[2, 2]);
        let e = t.basis_vector(3).unwrap();
        assert_eq!(e.data(), &[0.0, 0.0, 0.0, 1.0]);
        assert!(t.basis_vector(4).is_none());
    }
}
