use crate::error::{Result, TensorError};
use crate::scalar::Scalar;
use crate::space::IndexSpace;
use rayon::prelude::*;
use std::ops::Range;

/// Named dense tensor stored in row-major order.
///
/// Every dimension carries an [`IndexSpace`] tag so that permutation
/// symmetries can be checked against the orbital partition they act on.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<F: Scalar = f64> {
    name: String,
    shape: Vec<usize>,
    spaces: Vec<IndexSpace>,
    data: Vec<F>,
}

pub(crate) fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for d in (0..shape.len().saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * shape[d + 1];
    }
    strides
}

/// Writes the multi-index of row-major position `flat` into `index`.
pub(crate) fn unravel(mut flat: usize, shape: &[usize], index: &mut [usize]) {
    for d in (0..shape.len()).rev() {
        if shape[d] > 0 {
            index[d] = flat % shape[d];
            flat /= shape[d];
        }
    }
}

impl<F: Scalar> Tensor<F> {
    pub fn zeros(name: impl Into<String>, shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Tensor {
            name: name.into(),
            shape: shape.to_vec(),
            spaces: vec![IndexSpace::General; shape.len()],
            data: vec![F::zero(); len],
        }
    }

    pub fn from_vec(name: impl Into<String>, shape: &[usize], data: Vec<F>) -> Result<Self> {
        let name = name.into();
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::shape_mismatch(
                "tensor construction",
                (&name, shape),
                ("data", &[data.len()]),
            ));
        }
        Ok(Tensor {
            name,
            shape: shape.to_vec(),
            spaces: vec![IndexSpace::General; shape.len()],
            data,
        })
    }

    /// Zero tensor whose dimensions are tagged from conventional labels,
    /// e.g. `"ijab"` with extents `[o, o, v, v]`.
    pub fn zeros_labelled(name: impl Into<String>, labels: &str, shape: &[usize]) -> Self {
        let mut tensor = Self::zeros(name, shape);
        if labels.chars().count() == shape.len() {
            tensor.spaces = IndexSpace::from_labels(labels);
        }
        tensor
    }

    pub fn with_spaces(mut self, spaces: &[IndexSpace]) -> Result<Self> {
        if spaces.len() != self.shape.len() {
            let labels: String = spaces.iter().map(|s| s.code()).collect();
            return Err(TensorError::LabelMismatch {
                tensor: self.name,
                order: self.shape.len(),
                labels,
            });
        }
        self.spaces = spaces.to_vec();
        Ok(self)
    }

    pub fn zeros_like(&self) -> Self {
        Tensor {
            name: self.name.clone(),
            shape: self.shape.clone(),
            spaces: self.spaces.clone(),
            data: vec![F::zero(); self.data.len()],
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn spaces(&self) -> &[IndexSpace] {
        &self.spaces
    }

    pub fn order(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[F] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [F] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<F> {
        self.data
    }

    pub fn strides(&self) -> Vec<usize> {
        row_major_strides(&self.shape)
    }

    pub fn offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return Err(TensorError::IndexOutOfBounds {
                tensor: self.name.clone(),
                index: index.to_vec(),
                shape: self.shape.clone(),
            });
        }
        Ok(index
            .iter()
            .zip(self.strides())
            .map(|(i, stride)| i * stride)
            .sum())
    }

    pub fn get(&self, index: &[usize]) -> Result<F> {
        Ok(self.data[self.offset(index)?])
    }

    pub fn set(&mut self, index: &[usize], value: F) -> Result<()> {
        let offset = self.offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    pub fn fill(&mut self, value: F) {
        self.data.iter_mut().for_each(|x| *x = value);
    }

    pub fn scale(&mut self, alpha: F) {
        if alpha == F::one() {
            return;
        }
        if alpha.is_zero() {
            self.fill(F::zero());
            return;
        }
        self.data.par_iter_mut().for_each(|x| *x *= alpha);
    }

    fn check_same_shape(&self, other: &Self, operation: &str) -> Result<()> {
        if self.shape != other.shape {
            return Err(TensorError::shape_mismatch(
                operation,
                (&self.name, &self.shape),
                (&other.name, &other.shape),
            ));
        }
        Ok(())
    }

    /// `self += alpha * other`
    pub fn axpy(&mut self, alpha: F, other: &Self) -> Result<()> {
        self.check_same_shape(other, "axpy")?;
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(y, &x)| *y += alpha * x);
        Ok(())
    }

    /// Inner product `Σ conj(self) * other`.
    pub fn dot(&self, other: &Self) -> Result<F> {
        self.check_same_shape(other, "dot")?;
        Ok(self
            .data
            .par_iter()
            .zip(other.data.par_iter())
            .map(|(&x, &y)| x.conjugate() * y)
            .reduce(F::zero, |a, b| a + b))
    }

    pub fn norm_sqr(&self) -> f64 {
        self.data.par_iter().map(|x| x.modulus_squared()).sum()
    }

    /// Frobenius norm over all elements.
    pub fn norm(&self) -> f64 {
        self.norm_sqr().sqrt()
    }

    pub fn max_abs(&self) -> f64 {
        self.data
            .iter()
            .map(|x| x.modulus())
            .fold(0.0, f64::max)
    }

    /// Applies `f(self_i, other_i)` element-wise in place.
    pub fn zip_apply(&mut self, other: &Self, f: impl Fn(F, F) -> F + Sync) -> Result<()> {
        self.check_same_shape(other, "element-wise update")?;
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(x, &y)| *x = f(*x, y));
        Ok(())
    }

    /// Tensor whose dimension `d` is dimension `perm[d]` of `self`.
    pub fn permuted(&self, perm: &[usize]) -> Result<Self> {
        let mut seen = vec![false; self.order()];
        let valid = perm.len() == self.order()
            && perm.iter().all(|&p| p < seen.len() && !std::mem::replace(&mut seen[p], true));
        if !valid {
            return Err(TensorError::IndexOutOfBounds {
                tensor: self.name.clone(),
                index: perm.to_vec(),
                shape: self.shape.clone(),
            });
        }

        let shape: Vec<usize> = perm.iter().map(|&p| self.shape[p]).collect();
        let spaces: Vec<IndexSpace> = perm.iter().map(|&p| self.spaces[p]).collect();
        let source_strides = self.strides();
        let strides: Vec<usize> = perm.iter().map(|&p| source_strides[p]).collect();

        let mut data = vec![F::zero(); self.data.len()];
        data.par_iter_mut().enumerate().for_each_init(
            || vec![0usize; shape.len()],
            |index, (flat, x)| {
                unravel(flat, &shape, index);
                let offset: usize = index.iter().zip(&strides).map(|(i, s)| i * s).sum();
                *x = self.data[offset];
            },
        );

        Ok(Tensor {
            name: self.name.clone(),
            shape,
            spaces,
            data,
        })
    }

    /// Sub-block selected by one range per dimension.
    pub fn slice(&self, ranges: &[Range<usize>]) -> Result<Self> {
        let in_bounds = ranges.len() == self.order()
            && ranges
                .iter()
                .zip(&self.shape)
                .all(|(r, &n)| r.start <= r.end && r.end <= n);
        if !in_bounds {
            return Err(TensorError::IndexOutOfBounds {
                tensor: self.name.clone(),
                index: ranges.iter().map(|r| r.end).collect(),
                shape: self.shape.clone(),
            });
        }

        let shape: Vec<usize> = ranges.iter().map(|r| r.end - r.start).collect();
        let strides = self.strides();
        let mut data = vec![F::zero(); shape.iter().product()];
        data.par_iter_mut().enumerate().for_each_init(
            || vec![0usize; shape.len()],
            |index, (flat, x)| {
                unravel(flat, &shape, index);
                let offset: usize = index
                    .iter()
                    .zip(ranges)
                    .zip(&strides)
                    .map(|((i, r), s)| (i + r.start) * s)
                    .sum();
                *x = self.data[offset];
            },
        );

        Ok(Tensor {
            name: self.name.clone(),
            shape,
            spaces: self.spaces.clone(),
            data,
        })
    }
}
