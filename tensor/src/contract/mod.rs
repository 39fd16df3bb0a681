//! Einstein-notation contractions over labelled tensors.
//!
//! A contraction accumulates `C[out] = beta * C[out] + alpha * A[la] * B[lb] * ...`.
//! Labels present in the operands but absent from the output are summed,
//! a label repeated inside one operand selects its diagonal, and output
//! labels that no operand carries are broadcast.
//!
//! Products of more than two operands are reduced pairwise from the left,
//! keeping only the labels later factors or the output still need. A pair
//! without hyperedges is evaluated as a matrix product; everything else
//! goes through the strided element loop.

mod gemm;
mod naive;


use crate::antisym::Antisymmetrizer;
use crate::error::{Result, TensorError};
use crate::scalar::Scalar;
use crate::space::IndexSpace;
use crate::tensor::Tensor;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Builder for one contraction term.
pub struct Contraction<'a, F: Scalar> {
    alpha: F,
    operands: Vec<(&'a Tensor<F>, &'a str)>,
}

/// Extent of each label together with the tensor that fixed it.
pub(crate) struct LabelExtents {
    bound: BTreeMap<char, (usize, String, Vec<usize>)>,
}

impl LabelExtents {
    fn new() -> Self {
        LabelExtents {
            bound: BTreeMap::new(),
        }
    }

    pub(crate) fn bind<F: Scalar>(&mut self, tensor: &Tensor<F>, labels: &str) -> Result<()> {
        check_labels(tensor, labels)?;
        for (label, &extent) in labels.chars().zip(tensor.shape()) {
            match self.bound.get(&label) {
                Some((known, name, shape)) if *known != extent => {
                    return Err(TensorError::shape_mismatch(
                        format!("contraction over index '{label}'"),
                        (name, shape),
                        (tensor.name(), tensor.shape()),
                    ));
                }
                Some(_) => {}
                None => {
                    self.bound.insert(
                        label,
                        (extent, tensor.name().to_string(), tensor.shape().to_vec()),
                    );
                }
            }
        }
        Ok(())
    }

    pub(crate) fn extent(&self, label: char) -> Option<usize> {
        self.bound.get(&label).map(|(extent, _, _)| *extent)
    }
}

pub(crate) fn check_labels<F: Scalar>(tensor: &Tensor<F>, labels: &str) -> Result<()> {
    if labels.chars().count() != tensor.order() {
        return Err(TensorError::LabelMismatch {
            tensor: tensor.name().to_string(),
            order: tensor.order(),
            labels: labels.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn has_repeats(labels: &str) -> bool {
    labels
        .char_indices()
        .any(|(pos, c)| labels[pos + c.len_utf8()..].contains(c))
}

impl<'a, F: Scalar> Contraction<'a, F> {
    pub fn new(alpha: F) -> Self {
        Contraction {
            alpha,
            operands: Vec::new(),
        }
    }

    pub fn operand(mut self, tensor: &'a Tensor<F>, labels: &'a str) -> Self {
        self.operands.push((tensor, labels));
        self
    }

    /// `output[labels] = beta * output[labels] + alpha * Π operands`
    pub fn accumulate_into(self, beta: F, output: &mut Tensor<F>, labels: &str) -> Result<()> {
        if self.operands.is_empty() {
            return Err(TensorError::EmptyContraction {
                output: output.name().to_string(),
            });
        }

        let mut extents = LabelExtents::new();
        for (tensor, operand_labels) in &self.operands {
            extents.bind(tensor, operand_labels)?;
        }
        extents.bind(output, labels)?;

        let (product, product_labels) = self.reduce_pairwise(labels)?;
        accumulate_single(self.alpha, &product, &product_labels, beta, output, labels)
    }

    /// Allocates the output from the operand extents and evaluates into it.
    pub fn evaluate(self, name: &str, labels: &str) -> Result<Tensor<F>> {
        let mut extents = LabelExtents::new();
        for (tensor, operand_labels) in &self.operands {
            extents.bind(tensor, operand_labels)?;
        }
        let mut shape = Vec::with_capacity(labels.len());
        for label in labels.chars() {
            let extent = extents.extent(label).ok_or_else(|| TensorError::UnboundLabel {
                label,
                output: name.to_string(),
            })?;
            shape.push(extent);
        }
        let mut output = Tensor::zeros_labelled(name, labels, &shape);
        if let Some(spaces) = spaces_from_operands(&self.operands, labels) {
            output = output.with_spaces(&spaces)?;
        }
        self.accumulate_into(F::zero(), &mut output, labels)?;
        Ok(output)
    }

    /// Evaluates the product once and accumulates every signed permutation
    /// of `antisymmetrizer` into `output`.
    pub fn accumulate_antisymmetrized(
        self,
        antisymmetrizer: &Antisymmetrizer,
        beta: F,
        output: &mut Tensor<F>,
        labels: &str,
    ) -> Result<()> {
        antisymmetrizer.validate(output, labels)?;
        let mut scratch = output.zeros_like();
        scratch.set_name(format!("P[{}]", output.name()));
        self.accumulate_into(F::zero(), &mut scratch, labels)?;
        antisymmetrizer.apply(F::one(), &scratch, labels, beta, output)
    }

    /// Folds the operand list into one tensor, keeping the labels the
    /// output or a later operand still refers to.
    fn reduce_pairwise(&self, output_labels: &str) -> Result<(Cow<'a, Tensor<F>>, String)> {
        let (first, first_labels) = self.operands[0];
        let mut current: Cow<'a, Tensor<F>> = Cow::Borrowed(first);
        let mut current_labels = first_labels.to_string();

        for k in 1..self.operands.len() {
            let (next, next_labels) = self.operands[k];
            let still_needed = |c: char| {
                output_labels.contains(c)
                    || self.operands[k + 1..]
                        .iter()
                        .any(|(_, later)| later.contains(c))
            };
            let mut kept = String::new();
            for c in current_labels.chars().chain(next_labels.chars()) {
                if still_needed(c) && !kept.contains(c) {
                    kept.push(c);
                }
            }

            let product = multiply_pair(&current, &current_labels, next, next_labels, &kept)?;
            current = Cow::Owned(product);
            current_labels = kept;
        }

        Ok((current, current_labels))
    }
}

fn spaces_from_operands<F: Scalar>(
    operands: &[(&Tensor<F>, &str)],
    labels: &str,
) -> Option<Vec<IndexSpace>> {
    labels
        .chars()
        .map(|label| {
            operands.iter().find_map(|(tensor, operand_labels)| {
                operand_labels
                    .chars()
                    .position(|c| c == label)
                    .map(|pos| tensor.spaces()[pos])
            })
        })
        .collect()
}

/// Product of two operands with result labels `kept`.
fn multiply_pair<F: Scalar>(
    a: &Tensor<F>,
    la: &str,
    b: &Tensor<F>,
    lb: &str,
    kept: &str,
) -> Result<Tensor<F>> {
    let mut extents = LabelExtents::new();
    extents.bind(a, la)?;
    extents.bind(b, lb)?;
    let shape: Vec<usize> = kept
        .chars()
        .map(|c| extents.extent(c).unwrap_or(1))
        .collect();
    let name = format!("({}*{})", a.name(), b.name());

    if gemm::applies(la, lb, kept) {
        return gemm::multiply(a, la, b, lb, name);
    }

    let mut output = Tensor::zeros(name, &shape);
    if let Some(spaces) = spaces_from_operands(&[(a, la), (b, lb)], kept) {
        output = output.with_spaces(&spaces)?;
    }
    naive::accumulate(F::one(), &[(a, la), (b, lb)], F::zero(), &mut output, kept)?;
    Ok(output)
}

/// `output[lo] = beta * output + alpha * source[ls]`, using a plain
/// permutation when the label sets coincide.
fn accumulate_single<F: Scalar>(
    alpha: F,
    source: &Tensor<F>,
    ls: &str,
    beta: F,
    output: &mut Tensor<F>,
    lo: &str,
) -> Result<()> {
    let is_permutation = !has_repeats(ls)
        && !has_repeats(lo)
        && ls.len() == lo.len()
        && lo.chars().all(|c| ls.contains(c));

    if is_permutation {
        let perm: Vec<usize> = lo
            .chars()
            .filter_map(|c| ls.chars().position(|s| s == c))
            .collect();
        let permuted = if perm.iter().enumerate().all(|(d, &p)| d == p) {
            Cow::Borrowed(source)
        } else {
            Cow::Owned(source.permuted(&perm)?)
        };
        if beta.is_zero() {
            output.fill(F::zero());
        } else {
            output.scale(beta);
        }
        return output.axpy(alpha, &permuted).map_err(|_| {
            TensorError::shape_mismatch(
                "contraction result",
                (source.name(), source.shape()),
                (output.name(), output.shape()),
            )
        });
    }

    naive::accumulate(alpha, &[(source, ls)], beta, output, lo)
}
