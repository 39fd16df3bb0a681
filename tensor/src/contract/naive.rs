//! Strided element loop for arbitrary label patterns.

use super::{has_repeats, LabelExtents};
use crate::error::Result;
use crate::scalar::Scalar;
use crate::tensor::{row_major_strides, unravel, Tensor};
use rayon::prelude::*;

/// Label layout shared by every output element: output labels first,
/// summed labels after them.
struct Plan {
    extents: Vec<usize>,
    n_free: usize,
    operands: Vec<Vec<(usize, usize)>>,
    output: Vec<(usize, usize)>,
}

impl Plan {
    fn new<F: Scalar>(
        operands: &[(&Tensor<F>, &str)],
        output: &Tensor<F>,
        output_labels: &str,
        extents: &LabelExtents,
    ) -> Self {
        let mut labels: Vec<char> = Vec::new();
        for c in output_labels.chars() {
            if !labels.contains(&c) {
                labels.push(c);
            }
        }
        let n_free = labels.len();
        for (_, operand_labels) in operands {
            for c in operand_labels.chars() {
                if !labels.contains(&c) {
                    labels.push(c);
                }
            }
        }

        let slot = |c: char| labels.iter().position(|&l| l == c).unwrap_or(0);
        let slots = |tensor_labels: &str, shape: &[usize]| -> Vec<(usize, usize)> {
            tensor_labels
                .chars()
                .zip(row_major_strides(shape))
                .map(|(c, stride)| (slot(c), stride))
                .collect()
        };

        Plan {
            extents: labels
                .iter()
                .map(|&c| extents.extent(c).unwrap_or(1))
                .collect(),
            n_free,
            operands: operands
                .iter()
                .map(|(tensor, l)| slots(l, tensor.shape()))
                .collect(),
            output: slots(output_labels, output.shape()),
        }
    }

    fn summed_count(&self) -> usize {
        self.extents[self.n_free..].iter().product()
    }

    /// Sum over all summed-label assignments for fixed free labels.
    fn element<F: Scalar>(&self, data: &[&[F]], values: &mut [usize]) -> F {
        let mut sum = F::zero();
        for v in values[self.n_free..].iter_mut() {
            *v = 0;
        }
        for _ in 0..self.summed_count() {
            let mut product = F::one();
            for (strides, operand) in self.operands.iter().zip(data) {
                let offset: usize = strides.iter().map(|&(s, stride)| values[s] * stride).sum();
                product *= operand[offset];
            }
            sum += product;

            for d in (self.n_free..values.len()).rev() {
                values[d] += 1;
                if values[d] < self.extents[d] {
                    break;
                }
                values[d] = 0;
            }
        }
        sum
    }
}

pub(super) fn accumulate<F: Scalar>(
    alpha: F,
    operands: &[(&Tensor<F>, &str)],
    beta: F,
    output: &mut Tensor<F>,
    output_labels: &str,
) -> Result<()> {
    let mut extents = LabelExtents::new();
    for (tensor, labels) in operands {
        extents.bind(tensor, labels)?;
    }
    extents.bind(output, output_labels)?;

    let plan = Plan::new(operands, output, output_labels, &extents);
    let data: Vec<&[F]> = operands.iter().map(|(t, _)| t.data()).collect();
    let n_slots = plan.extents.len();

    if !has_repeats(output_labels) {
        let shape = output.shape().to_vec();
        output.data_mut().par_iter_mut().enumerate().for_each_init(
            || vec![0usize; n_slots],
            |values, (flat, x)| {
                unravel(flat, &shape, &mut values[..plan.n_free]);
                let value = plan.element(&data, values);
                *x = if beta.is_zero() {
                    alpha * value
                } else {
                    beta * *x + alpha * value
                };
            },
        );
        return Ok(());
    }

    // Repeated output labels address a diagonal; the rest is only scaled.
    if beta.is_zero() {
        output.fill(F::zero());
    } else {
        output.scale(beta);
    }
    let free_shape = plan.extents[..plan.n_free].to_vec();
    let free_count: usize = free_shape.iter().product();
    let mut values = vec![0usize; n_slots];
    for flat in 0..free_count {
        unravel(flat, &free_shape, &mut values[..plan.n_free]);
        let offset: usize = plan
            .output
            .iter()
            .map(|&(s, stride)| values[s] * stride)
            .sum();
        let value = plan.element(&data, &mut values);
        output.data_mut()[offset] += alpha * value;
    }
    Ok(())
}
