//! Signed permutation sums over index labels.
//!
//! `P(ij)P(ab)` is written `Antisymmetrizer::over(&["ij", "ab"])` and expands
//! to the four terms `X[ijab] - X[jiab] - X[ijba] + X[jiba]`. The coset form
//! `P(k/ij) = 1 - (ik) - (jk)` used by triples is `Antisymmetrizer::coset('k', "ij")`.

use crate::contract::{check_labels, Contraction};
use crate::error::{Result, TensorError};
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use itertools::Itertools;

#[derive(Debug, Clone, PartialEq)]
struct Term {
    sign: f64,
    substitution: Vec<(char, char)>,
}

impl Term {
    fn relabel(&self, labels: &str) -> String {
        labels
            .chars()
            .map(|c| {
                self.substitution
                    .iter()
                    .find(|(from, _)| *from == c)
                    .map_or(c, |(_, to)| *to)
            })
            .collect()
    }
}

/// A set of signed label permutations together with the label groups they act on.
#[derive(Debug, Clone, PartialEq)]
pub struct Antisymmetrizer {
    terms: Vec<Term>,
    groups: Vec<String>,
}

fn parity(perm: &[usize]) -> f64 {
    let inversions = (0..perm.len())
        .flat_map(|i| (i + 1..perm.len()).map(move |j| (i, j)))
        .filter(|&(i, j)| perm[i] > perm[j])
        .count();
    if inversions % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}

impl Antisymmetrizer {
    pub fn identity() -> Self {
        Antisymmetrizer {
            terms: vec![Term {
                sign: 1.0,
                substitution: Vec::new(),
            }],
            groups: Vec::new(),
        }
    }

    /// All `n!` permutations of `group`, weighted by their parity.
    pub fn full(group: &str) -> Self {
        let letters: Vec<char> = group.chars().collect();
        let terms = (0..letters.len())
            .permutations(letters.len())
            .map(|perm| Term {
                sign: parity(&perm),
                substitution: letters
                    .iter()
                    .zip(&perm)
                    .map(|(&from, &p)| (from, letters[p]))
                    .collect(),
            })
            .collect();
        Antisymmetrizer {
            terms,
            groups: vec![group.to_string()],
        }
    }

    /// Product of full antisymmetrizers over disjoint groups.
    pub fn over(groups: &[&str]) -> Self {
        groups
            .iter()
            .fold(Self::identity(), |acc, group| acc.then(&Self::full(group)))
    }

    /// `P(k/ij)`: identity minus the transpositions of `single` with each
    /// member of `pair`.
    pub fn coset(single: char, pair: &str) -> Self {
        let mut terms = vec![Term {
            sign: 1.0,
            substitution: Vec::new(),
        }];
        for other in pair.chars() {
            terms.push(Term {
                sign: -1.0,
                substitution: vec![(single, other), (other, single)],
            });
        }
        Antisymmetrizer {
            terms,
            groups: vec![format!("{single}{pair}")],
        }
    }

    /// Composition `self · other` on disjoint label groups.
    pub fn then(&self, other: &Self) -> Self {
        let terms = self
            .terms
            .iter()
            .cartesian_product(&other.terms)
            .map(|(left, right)| Term {
                sign: left.sign * right.sign,
                substitution: left
                    .substitution
                    .iter()
                    .chain(&right.substitution)
                    .copied()
                    .collect(),
            })
            .collect();
        let groups = self.groups.iter().chain(&other.groups).cloned().collect();
        Antisymmetrizer { terms, groups }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// `(sign, permuted labels)` for every term applied to `labels`.
    pub fn relabelled(&self, labels: &str) -> Vec<(f64, String)> {
        self.terms
            .iter()
            .map(|term| (term.sign, term.relabel(labels)))
            .collect()
    }

    /// Every group must name labels of `tensor` that share one index space
    /// and one extent.
    pub fn validate<F: Scalar>(&self, tensor: &Tensor<F>, labels: &str) -> Result<()> {
        check_labels(tensor, labels)?;
        for group in &self.groups {
            let mut dims = Vec::new();
            for c in group.chars() {
                match labels.chars().position(|l| l == c) {
                    Some(pos) => dims.push((tensor.spaces()[pos], tensor.shape()[pos])),
                    None => {
                        return Err(TensorError::UnboundLabel {
                            label: c,
                            output: tensor.name().to_string(),
                        })
                    }
                }
            }
            if dims.windows(2).any(|w| w[0] != w[1]) {
                return Err(TensorError::MixedSpacePermutation {
                    tensor: tensor.name().to_string(),
                    group: group.clone(),
                });
            }
        }
        Ok(())
    }

    /// `output[labels] = beta * output + alpha * Σ sign · source[σ(labels)]`
    pub fn apply<F: Scalar>(
        &self,
        alpha: F,
        source: &Tensor<F>,
        labels: &str,
        beta: F,
        output: &mut Tensor<F>,
    ) -> Result<()> {
        self.validate(source, labels)?;
        output.scale(beta);
        for (sign, permuted) in self.relabelled(labels) {
            Contraction::new(alpha * F::from_real(sign))
                .operand(source, &permuted)
                .accumulate_into(F::one(), output, labels)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::IndexSpace;
    use approx::assert_relative_eq;

    fn random_like(shape: &[usize], seed: u64) -> Tensor<f64> {
        let len: usize = shape.iter().product();
        let mut state = seed;
        let data = (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f64) / (1u64 << 31) as f64 - 0.5
            })
            .collect();
        Tensor::from_vec("X", shape, data).unwrap()
    }

    #[test]
    fn full_group_has_signed_permutations() {
        let p = Antisymmetrizer::full("ijk");
        assert_eq!(p.len(), 6);
        let terms = p.relabelled("ijk");
        let total: f64 = terms.iter().map(|(s, _)| s).sum();
        assert_eq!(total, 0.0);
        assert!(terms.contains(&(-1.0, "jik".to_string())));
        assert!(terms.contains(&(1.0, "jki".to_string())));
    }

    #[test]
    fn coset_matches_three_terms() {
        let terms = Antisymmetrizer::coset('k', "ij").relabelled("ijk");
        assert_eq!(
            terms,
            vec![
                (1.0, "ijk".to_string()),
                (-1.0, "kji".to_string()),
                (-1.0, "ikj".to_string())
            ]
        );
    }

    #[test]
    fn antisymmetrized_tensor_flips_sign_under_swap() {
        let x = random_like(&[3, 3, 2, 2], 7)
            .with_spaces(&IndexSpace::from_labels("ijab"))
            .unwrap();
        let mut out = x.zeros_like();
        Antisymmetrizer::over(&["ij", "ab"])
            .apply(1.0, &x, "ijab", 0.0, &mut out)
            .unwrap();
        for i in 0..3 {
            for j in 0..3 {
                for a in 0..2 {
                    for b in 0..2 {
                        let v = out.get(&[i, j, a, b]).unwrap();
                        assert_relative_eq!(v, -out.get(&[j, i, a, b]).unwrap(), epsilon = 1e-14);
                        assert_relative_eq!(v, -out.get(&[i, j, b, a]).unwrap(), epsilon = 1e-14);
                    }
                }
            }
        }
    }

    #[test]
    fn group_across_partitions_is_rejected() {
        let x = Tensor::<f64>::zeros_labelled("Vijab", "ijab", &[2, 2, 2, 2]);
        let err = Antisymmetrizer::full("ia").validate(&x, "ijab").unwrap_err();
        assert!(matches!(err, TensorError::MixedSpacePermutation { .. }));
    }
}
