//! Cluster amplitudes `T1, T2, ...` stored as one tensor per excitation level.
//!
//! Level `n` is a `2n`-index tensor ordered `[i, j, .., a, b, ..]`, with
//! occupied indices first. Tensors are kept antisymmetric within the
//! occupied and within the virtual group; the redundant entries are stored.

use crate::error::{CcError, Result};
use crate::integrals::CoulombIntegrals;
use tensor::{Antisymmetrizer, Contraction, Scalar, Tensor, VectorSpace};

const OCCUPIED: [char; 4] = ['i', 'j', 'k', 'l'];
const VIRTUAL: [char; 4] = ['a', 'b', 'c', 'd'];

/// Label string for excitation level `level`, e.g. `"ijab"` for doubles.
pub fn level_labels(level: usize) -> String {
    OCCUPIED[..level]
        .iter()
        .chain(&VIRTUAL[..level])
        .collect()
}

pub const MAX_LEVEL: usize = OCCUPIED.len();

#[derive(Debug, Clone, PartialEq)]
pub struct AmplitudeSet<F: Scalar = f64> {
    n_occ: usize,
    n_virt: usize,
    components: Vec<Tensor<F>>,
}

impl<F: Scalar> AmplitudeSet<F> {
    /// Zero amplitudes for levels `1..=levels`.
    pub fn zeros(n_occ: usize, n_virt: usize, levels: usize) -> Result<Self> {
        if levels == 0 || levels > MAX_LEVEL {
            return Err(CcError::MissingLevel { level: levels });
        }
        let components = (1..=levels)
            .map(|level| {
                let shape: Vec<usize> = std::iter::repeat(n_occ)
                    .take(level)
                    .chain(std::iter::repeat(n_virt).take(level))
                    .collect();
                Tensor::zeros_labelled(format!("T{level}"), &level_labels(level), &shape)
            })
            .collect();
        Ok(AmplitudeSet {
            n_occ,
            n_virt,
            components,
        })
    }

    pub fn for_integrals(integrals: &CoulombIntegrals<F>, levels: usize) -> Result<Self> {
        Self::zeros(integrals.n_occ(), integrals.n_virt(), levels)
    }

    /// Wraps existing tensors, checking that component `n` has the shape of
    /// level `n + 1`.
    pub fn from_components(n_occ: usize, n_virt: usize, components: Vec<Tensor<F>>) -> Result<Self> {
        let template = Self::zeros(n_occ, n_virt, components.len())?;
        let components = components
            .into_iter()
            .zip(&template.components)
            .map(|(given, expected)| {
                if given.shape() != expected.shape() {
                    return Err(CcError::Tensor(tensor::TensorError::ShapeMismatch {
                        operation: "amplitude set".to_string(),
                        left: expected.name().to_string(),
                        left_shape: expected.shape().to_vec(),
                        right: given.name().to_string(),
                        right_shape: given.shape().to_vec(),
                    }));
                }
                Ok(given
                    .with_spaces(expected.spaces())?
                    .renamed(expected.name()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(AmplitudeSet {
            n_occ,
            n_virt,
            components,
        })
    }

    pub fn n_occ(&self) -> usize {
        self.n_occ
    }

    pub fn n_virt(&self) -> usize {
        self.n_virt
    }

    pub fn levels(&self) -> usize {
        self.components.len()
    }

    pub fn components(&self) -> &[Tensor<F>] {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut [Tensor<F>] {
        &mut self.components
    }

    pub fn into_components(self) -> Vec<Tensor<F>> {
        self.components
    }

    pub fn get(&self, level: usize) -> Result<&Tensor<F>> {
        level
            .checked_sub(1)
            .and_then(|n| self.components.get(n))
            .ok_or(CcError::MissingLevel { level })
    }

    pub fn get_mut(&mut self, level: usize) -> Result<&mut Tensor<F>> {
        level
            .checked_sub(1)
            .and_then(|n| self.components.get_mut(n))
            .ok_or(CcError::MissingLevel { level })
    }

    pub fn singles(&self) -> Result<&Tensor<F>> {
        self.get(1)
    }

    pub fn doubles(&self) -> Result<&Tensor<F>> {
        self.get(2)
    }

    pub fn triples(&self) -> Result<&Tensor<F>> {
        self.get(3)
    }

    /// Same layout with `D = Σ f_occ - Σ f_virt` in every element.
    pub fn denominators(&self, integrals: &CoulombIntegrals<F>) -> Result<Self> {
        let mut denominators = self.zeros_like();
        for (level, d) in (1..).zip(denominators.components.iter_mut()) {
            let labels = level_labels(level);
            for c in labels.chars() {
                let (eps, sign) = if OCCUPIED.contains(&c) {
                    (integrals.eps_occ(), F::one())
                } else {
                    (integrals.eps_virt(), -F::one())
                };
                let single = c.to_string();
                Contraction::new(sign)
                    .operand(eps, &single)
                    .accumulate_into(F::one(), d, &labels)?;
            }
            d.set_name(format!("D{level}"));
        }
        Ok(denominators)
    }

    /// Largest element modulus over all levels.
    pub fn max_abs(&self) -> f64 {
        self.components
            .iter()
            .map(|t| t.max_abs())
            .fold(0.0, f64::max)
    }

    fn locate(&self, mut index: usize) -> Option<(usize, usize)> {
        for (n, component) in self.components.iter().enumerate() {
            if index < component.len() {
                return Some((n, index));
            }
            index -= component.len();
        }
        None
    }
}

fn strictly_increasing(indices: &[usize]) -> bool {
    indices.windows(2).all(|w| w[0] < w[1])
}

impl<F: Scalar> VectorSpace for AmplitudeSet<F> {
    type Field = F;

    fn zeros_like(&self) -> Self {
        AmplitudeSet {
            n_occ: self.n_occ,
            n_virt: self.n_virt,
            components: self.components.iter().map(Tensor::zeros_like).collect(),
        }
    }

    fn scale(&mut self, alpha: F) {
        for component in &mut self.components {
            component.scale(alpha);
        }
    }

    fn add_scaled(&mut self, alpha: F, x: &Self) {
        assert_eq!(self.levels(), x.levels(), "amplitude sets differ in level count");
        for (y, x) in self.components.iter_mut().zip(&x.components) {
            VectorSpace::add_scaled(y, alpha, x);
        }
    }

    fn inner(&self, other: &Self) -> F {
        assert_eq!(self.levels(), other.levels(), "amplitude sets differ in level count");
        self.components
            .iter()
            .zip(&other.components)
            .fold(F::zero(), |acc, (a, b)| acc + a.inner(b))
    }

    fn len(&self) -> usize {
        self.components.iter().map(|t| t.len()).sum()
    }

    fn element(&self, index: usize) -> F {
        match self.locate(index) {
            Some((n, offset)) => self.components[n].data()[offset],
            None => panic!("amplitude index {index} out of range {}", self.len()),
        }
    }

    /// Antisymmetrized unit excitation. Only the canonical element of each
    /// permutation orbit (`i < j < ..`, `a < b < ..`) yields a vector.
    fn basis_vector(&self, index: usize) -> Option<Self> {
        let (n, offset) = self.locate(index)?;
        let level = n + 1;
        let component = &self.components[n];

        let mut multi = vec![0; component.order()];
        let mut rest = offset;
        for d in (0..multi.len()).rev() {
            multi[d] = rest % component.shape()[d];
            rest /= component.shape()[d];
        }
        if !strictly_increasing(&multi[..level]) || !strictly_increasing(&multi[level..]) {
            return None;
        }

        let mut unit = component.zeros_like();
        unit.set(&multi, F::one()).ok()?;
        let labels = level_labels(level);
        let (occupied, virtual_) = labels.split_at(level);
        let antisymmetrizer = Antisymmetrizer::over(&[occupied, virtual_]);
        let mut vector = self.zeros_like();
        antisymmetrizer
            .apply(F::one(), &unit, &labels, F::zero(), &mut vector.components[n])
            .ok()?;
        let norm = vector.components[n].norm();
        vector.components[n].scale(F::from_real(norm.recip()));
        Some(vector)
    }

    fn zip_map(&mut self, other: &Self, f: impl Fn(F, F) -> F + Sync) {
        assert_eq!(self.levels(), other.levels(), "amplitude sets differ in level count");
        for (x, y) in self.components.iter_mut().zip(&other.components) {
            VectorSpace::zip_map(x, y, &f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::h2_like;
    use approx::assert_relative_eq;

    #[test]
    fn labels_follow_levels() {
        assert_eq!(level_labels(1), "ia");
        assert_eq!(level_labels(3), "ijkabc");
    }

    #[test]
    fn shapes_and_level_access() {
        let t = AmplitudeSet::<f64>::zeros(3, 5, 2).unwrap();
        assert_eq!(t.singles().unwrap().shape(), &[3, 5]);
        assert_eq!(t.doubles().unwrap().shape(), &[3, 3, 5, 5]);
        assert_eq!(t.len(), 15 + 225);
        assert!(matches!(t.triples(), Err(CcError::MissingLevel { level: 3 })));
        assert!(AmplitudeSet::<f64>::zeros(3, 5, 0).is_err());
    }

    #[test]
    fn from_components_checks_shapes() {
        let ok = AmplitudeSet::from_components(2, 3, vec![Tensor::<f64>::zeros("x", &[2, 3])]);
        assert_eq!(ok.unwrap().singles().unwrap().name(), "T1");
        let bad = AmplitudeSet::from_components(2, 3, vec![Tensor::<f64>::zeros("x", &[3, 2])]);
        assert!(bad.is_err());
    }

    #[test]
    fn survives_a_trip_through_tensor_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut t = AmplitudeSet::<f64>::zeros(2, 3, 2).unwrap();
        for (n, component) in t.components_mut().iter_mut().enumerate() {
            let len = component.len();
            component
                .data_mut()
                .iter_mut()
                .zip(0..len)
                .for_each(|(x, k)| *x = (k as f64 + 0.5) / (n as f64 + 3.0));
        }

        let mut read = Vec::new();
        for component in t.components() {
            let path = dir.path().join(format!("{}.bin", component.name()));
            tensor::io::write_tensor(&path, component).unwrap();
            let header = tensor::io::read_header(&path).unwrap();
            assert_eq!(header.shape, component.shape());
            read.push(tensor::io::read_tensor::<f64>(&path).unwrap());
        }
        let back = AmplitudeSet::from_components(2, 3, read).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn denominators_sum_orbital_energies() {
        let ints = h2_like().to_spin_orbitals().unwrap();
        let t = AmplitudeSet::for_integrals(&ints, 2).unwrap();
        let d = t.denominators(&ints).unwrap();
        let (e_o, e_v) = (ints.eps_occ().data()[0], ints.eps_virt().data()[0]);
        assert_relative_eq!(d.singles().unwrap().get(&[1, 0]).unwrap(), e_o - e_v, epsilon = 1e-12);
        assert_relative_eq!(
            d.doubles().unwrap().get(&[0, 1, 1, 0]).unwrap(),
            2.0 * (e_o - e_v),
            epsilon = 1e-12
        );
    }

    #[test]
    fn basis_vectors_are_normalized_and_antisymmetric() {
        let t = AmplitudeSet::<f64>::zeros(2, 2, 2).unwrap();
        // first doubles element [0,1,0,1] sits after the four singles
        let index = 4 + 0b0101;
        let e = t.basis_vector(index).unwrap();
        assert_relative_eq!(e.norm(), 1.0, epsilon = 1e-14);
        let t2 = e.doubles().unwrap();
        assert_relative_eq!(t2.get(&[0, 1, 0, 1]).unwrap(), 0.5);
        assert_relative_eq!(t2.get(&[1, 0, 0, 1]).unwrap(), -0.5);

        // [1,0,0,1] is the same excitation, [0,0,0,1] is identically zero
        assert!(t.basis_vector(4 + 0b1001).is_none());
        assert!(t.basis_vector(4 + 0b0001).is_none());
        assert!(t.basis_vector(t.len()).is_none());
    }

    #[test]
    fn inner_product_spans_levels() {
        let mut a = AmplitudeSet::<f64>::zeros(1, 1, 2).unwrap();
        a.get_mut(1).unwrap().set(&[0, 0], 2.0).unwrap();
        a.get_mut(2).unwrap().set(&[0, 0, 0, 0], 3.0).unwrap();
        assert_relative_eq!(a.inner(&a), 13.0);
        let mut b = a.zeros_like();
        b.add_scaled(0.5, &a);
        assert_relative_eq!(b.element(1), 1.5);
    }
}
