//! Pairwise contraction as a matrix product.
//!
//! Operand `A` is permuted to `[free_a, shared]` and `B` to `[shared, free_b]`,
//! so that `C[free_a, free_b] = A · B` is a single GEMM call.

use super::has_repeats;
use crate::error::Result;
use crate::scalar::Scalar;
use crate::space::IndexSpace;
use crate::tensor::Tensor;
use nalgebra::DMatrix;
use std::borrow::Cow;

/// Whether the pair `la * lb -> kept` is a plain matrix product: no
/// diagonals, every shared label summed, every unshared label kept.
pub(super) fn applies(la: &str, lb: &str, kept: &str) -> bool {
    if has_repeats(la) || has_repeats(lb) {
        return false;
    }
    la.chars()
        .chain(lb.chars())
        .all(|c| (la.contains(c) && lb.contains(c)) != kept.contains(c))
}

fn arranged<'t, F: Scalar>(
    tensor: &'t Tensor<F>,
    labels: &str,
    target: &str,
) -> Result<Cow<'t, Tensor<F>>> {
    let perm: Vec<usize> = target
        .chars()
        .filter_map(|c| labels.chars().position(|l| l == c))
        .collect();
    if perm.iter().enumerate().all(|(d, &p)| d == p) {
        Ok(Cow::Borrowed(tensor))
    } else {
        Ok(Cow::Owned(tensor.permuted(&perm)?))
    }
}

pub(super) fn multiply<F: Scalar>(
    a: &Tensor<F>,
    la: &str,
    b: &Tensor<F>,
    lb: &str,
    name: String,
) -> Result<Tensor<F>> {
    let free_a: String = la.chars().filter(|&c| !lb.contains(c)).collect();
    let shared: String = la.chars().filter(|&c| lb.contains(c)).collect();
    let free_b: String = lb.chars().filter(|&c| !la.contains(c)).collect();

    let a = arranged(a, la, &format!("{free_a}{shared}"))?;
    let b = arranged(b, lb, &format!("{shared}{free_b}"))?;

    let n_free_a = free_a.chars().count();
    let n_shared = shared.chars().count();
    let m: usize = a.shape()[..n_free_a].iter().product();
    let k: usize = a.shape()[n_free_a..].iter().product();
    let n: usize = b.shape()[n_shared..].iter().product();

    // Row-major data read column-major is the transpose, so C^T = B^T A^T
    // lands directly in row-major order for C.
    let at = DMatrix::from_column_slice(k, m, a.data());
    let bt = DMatrix::from_column_slice(n, k, b.data());
    let ct = bt * at;

    let shape: Vec<usize> = a.shape()[..n_free_a]
        .iter()
        .chain(&b.shape()[n_shared..])
        .copied()
        .collect();
    let spaces: Vec<IndexSpace> = a.spaces()[..n_free_a]
        .iter()
        .chain(&b.spaces()[n_shared..])
        .copied()
        .collect();

    Tensor::from_vec(name, &shape, ct.as_slice().to_vec())?.with_spaces(&spaces)
}
