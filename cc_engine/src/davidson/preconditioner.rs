use super::Preconditioner;
use std::cmp::Ordering;
use tensor::VectorSpace;

/// Diagonal approximation of the operator, fixed for one eigensolve.
///
/// Corrections are `r / (λ - d)`; denominators smaller than `floor` are
/// clamped to `±floor`, keeping their sign.
#[derive(Debug, Clone)]
pub struct DiagonalPreconditioner<V: VectorSpace<Field = f64>> {
    diagonal: V,
    floor: f64,
}

impl<V: VectorSpace<Field = f64>> DiagonalPreconditioner<V> {
    pub fn new(diagonal: V, floor: f64) -> Self {
        DiagonalPreconditioner {
            diagonal,
            floor: floor.abs(),
        }
    }

    pub fn diagonal(&self) -> &V {
        &self.diagonal
    }

    /// Coordinates by ascending diagonal value; exact zeros go last and
    /// ties keep index order.
    fn ranked(&self) -> Vec<usize> {
        let values: Vec<f64> = (0..self.diagonal.len())
            .map(|i| self.diagonal.element(i))
            .collect();
        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by(|&a, &b| {
            let (x, y) = (values[a], values[b]);
            (x == 0.0)
                .cmp(&(y == 0.0))
                .then(x.partial_cmp(&y).unwrap_or(Ordering::Equal))
                .then(a.cmp(&b))
        });
        order
    }
}

impl<V: VectorSpace<Field = f64>> Preconditioner<V> for DiagonalPreconditioner<V> {
    fn initial_basis(&self, n: usize) -> Vec<V> {
        self.ranked()
            .into_iter()
            .filter_map(|index| self.diagonal.basis_vector(index))
            .take(n)
            .collect()
    }

    fn correction(&self, ritz_value: f64, residual: &V) -> V {
        let floor = self.floor;
        let mut correction = residual.clone();
        correction.zip_map(&self.diagonal, |r, d| {
            let denominator = ritz_value - d;
            let clamped = if denominator.abs() >= floor {
                denominator
            } else if denominator < 0.0 {
                -floor
            } else {
                floor
            };
            r / clamped
        });
        correction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor::Tensor;

    fn diagonal(values: &[f64]) -> DiagonalPreconditioner<Tensor<f64>> {
        DiagonalPreconditioner::new(
            Tensor::from_vec("d", &[values.len()], values.to_vec()).unwrap(),
            1e-4,
        )
    }

    #[test]
    fn initial_basis_prefers_low_nonzero_entries() {
        let p = diagonal(&[3.0, 0.0, 1.0, 1.0, 2.0]);
        let basis = p.initial_basis(4);
        let picked: Vec<usize> = basis
            .iter()
            .map(|v| v.data().iter().position(|&x| x == 1.0).unwrap())
            .collect();
        assert_eq!(picked, vec![2, 3, 4, 0]);
    }

    #[test]
    fn correction_floors_small_denominators() {
        let p = diagonal(&[1.0, 2.0]);
        let r = Tensor::from_vec("r", &[2], vec![1.0, 1.0]).unwrap();
        let c = p.correction(1.0, &r);
        assert_eq!(c.data(), &[1e4, -1.0]);
        let c = p.correction(1.0 - 1e-9, &r);
        assert_eq!(c.data()[0], -1e4);
    }
}
