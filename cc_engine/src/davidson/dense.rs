//! Dense eigensolves of the projected subspace matrix.

use nalgebra::{DMatrix, DVector};
use std::cmp::Ordering;

/// Relative width within which eigenvalues of a general matrix are
/// treated as one degenerate cluster.
const CLUSTER_WIDTH: f64 = 1e-8;

/// Eigenpair of the small projected matrix.
#[derive(Debug, Clone)]
pub(super) struct SubspacePair {
    pub value: f64,
    pub imaginary: f64,
    pub coefficients: DVector<f64>,
}

fn by_real_part(values: &[(f64, f64)]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .0
            .partial_cmp(&values[b].0)
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });
    order
}

/// All eigenpairs of `h`, sorted by real part with ties broken by index.
pub(super) fn eigenpairs(h: &DMatrix<f64>, hermitian: bool) -> Vec<SubspacePair> {
    if hermitian {
        symmetric(h)
    } else {
        general(h)
    }
}

fn symmetric(h: &DMatrix<f64>) -> Vec<SubspacePair> {
    let symmetrized = (h + h.transpose()) * 0.5;
    let eigen = symmetrized.symmetric_eigen();
    let values: Vec<(f64, f64)> = eigen.eigenvalues.iter().map(|&v| (v, 0.0)).collect();
    by_real_part(&values)
        .into_iter()
        .map(|k| SubspacePair {
            value: values[k].0,
            imaginary: 0.0,
            coefficients: eigen.eigenvectors.column(k).into_owned(),
        })
        .collect()
}

/// Eigenvalues from the Schur form; right eigenvectors as the null space of
/// `h - λ` for each cluster of (near-)equal real parts, so degenerate roots
/// get independent vectors.
fn general(h: &DMatrix<f64>) -> Vec<SubspacePair> {
    let n = h.nrows();
    let eigenvalues = h.clone().schur().complex_eigenvalues();
    let values: Vec<(f64, f64)> = eigenvalues.iter().map(|z| (z.re, z.im)).collect();
    let order = by_real_part(&values);

    let mut pairs = Vec::with_capacity(n);
    let mut start = 0;
    while start < order.len() {
        let anchor = values[order[start]].0;
        let width = CLUSTER_WIDTH * anchor.abs().max(1.0);
        let mut end = start + 1;
        while end < order.len() && (values[order[end]].0 - anchor).abs() < width {
            end += 1;
        }
        let cluster = &order[start..end];
        let shift = cluster.iter().map(|&k| values[k].0).sum::<f64>() / cluster.len() as f64;

        let shifted = h - DMatrix::identity(n, n) * shift;
        let svd = shifted.svd(false, true);
        let null_space = match svd.v_t {
            Some(v_t) => {
                let mut columns: Vec<usize> = (0..svd.singular_values.len()).collect();
                columns.sort_by(|&a, &b| {
                    svd.singular_values[a]
                        .partial_cmp(&svd.singular_values[b])
                        .unwrap_or(Ordering::Equal)
                });
                columns
                    .into_iter()
                    .take(cluster.len())
                    .map(|row| v_t.row(row).transpose())
                    .collect::<Vec<_>>()
            }
            None => Vec::new(),
        };

        for (slot, &k) in cluster.iter().enumerate() {
            let coefficients = null_space
                .get(slot)
                .cloned()
                .unwrap_or_else(|| unit(n, k));
            pairs.push(SubspacePair {
                value: values[k].0,
                imaginary: values[k].1,
                coefficients,
            });
        }
        start = end;
    }
    pairs
}

fn unit(n: usize, k: usize) -> DVector<f64> {
    let mut v = DVector::zeros(n);
    v[k.min(n.saturating_sub(1))] = 1.0;
    v
}
