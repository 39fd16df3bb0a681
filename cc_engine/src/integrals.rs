//! Molecular-orbital integrals in the layouts the cluster equations read.
//!
//! [`SpatialIntegrals`] holds a restricted closed-shell Hamiltonian in
//! spatial orbitals (what an FCIDUMP file contains). [`CoulombIntegrals`]
//! is the spin-orbital form every method works with: the Fock matrix and all
//! sixteen occupied/virtual blocks of `<pq|rs>` and `<pq||rs>`, occupied spin
//! orbitals first.

use crate::error::{CcError, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::Range;
use tensor::{Contraction, IndexSpace, Scalar, Tensor};
use tracing::{debug, info};

/// Restricted closed-shell integrals over spatial orbitals.
#[derive(Debug, Clone)]
pub struct SpatialIntegrals {
    pub n_orbitals: usize,
    pub n_electrons: usize,
    pub core_energy: f64,
    /// One-electron Hamiltonian `h_pq`.
    pub core_hamiltonian: Tensor<f64>,
    /// Two-electron integrals in chemists' notation `(pq|rs)`.
    pub eri: Tensor<f64>,
}

impl SpatialIntegrals {
    pub fn new(
        n_electrons: usize,
        core_energy: f64,
        core_hamiltonian: Tensor<f64>,
        eri: Tensor<f64>,
    ) -> Result<Self> {
        let n = core_hamiltonian.shape().first().copied().unwrap_or(0);
        if core_hamiltonian.shape() != [n, n] || eri.shape() != [n, n, n, n] {
            return Err(CcError::Tensor(tensor::TensorError::ShapeMismatch {
                operation: "spatial integrals".to_string(),
                left: core_hamiltonian.name().to_string(),
                left_shape: core_hamiltonian.shape().to_vec(),
                right: eri.name().to_string(),
                right_shape: eri.shape().to_vec(),
            }));
        }
        if n_electrons % 2 != 0 || n_electrons > 2 * n {
            return Err(CcError::invalid_option(
                "nelec",
                format!("{n_electrons} electrons cannot fill {n} orbitals as a closed shell"),
            ));
        }
        Ok(SpatialIntegrals {
            n_orbitals: n,
            n_electrons,
            core_energy,
            core_hamiltonian,
            eri,
        })
    }

    pub fn n_occupied(&self) -> usize {
        self.n_electrons / 2
    }

    /// Closed-shell Fock matrix `f_pq = h_pq + Σ_i [2 (pq|ii) - (pi|iq)]`.
    pub fn fock(&self) -> Result<Tensor<f64>> {
        let n = self.n_orbitals;
        let o = self.n_occupied();
        let coulomb = self.eri.slice(&[0..n, 0..n, 0..o, 0..o])?;
        let exchange = self.eri.slice(&[0..n, 0..o, 0..o, 0..n])?;

        let mut fock = self.core_hamiltonian.clone().renamed("F");
        Contraction::new(2.0)
            .operand(&coulomb, "pqii")
            .accumulate_into(1.0, &mut fock, "pq")?;
        Contraction::new(-1.0)
            .operand(&exchange, "piiq")
            .accumulate_into(1.0, &mut fock, "pq")?;
        Ok(fock)
    }

    /// Hartree-Fock energy of the determinant filling the lowest orbitals.
    pub fn reference_energy(&self) -> Result<f64> {
        let fock = self.fock()?;
        let mut energy = self.core_energy;
        for i in 0..self.n_occupied() {
            energy += self.core_hamiltonian.get(&[i, i])? + fock.get(&[i, i])?;
        }
        Ok(energy)
    }

    /// Expands to spin orbitals ordered `[occupied α/β pairs, virtual α/β pairs]`.
    pub fn to_spin_orbitals(&self) -> Result<CoulombIntegrals<f64>> {
        let n = self.n_orbitals;
        let n_so = 2 * n;
        let fock = self.fock()?;
        let spatial = |p: usize| (p / 2, p % 2);

        let mut fock_so = Tensor::zeros("F", &[n_so, n_so]);
        for p in 0..n_so {
            for q in 0..n_so {
                let ((sp, sigma_p), (sq, sigma_q)) = (spatial(p), spatial(q));
                if sigma_p == sigma_q {
                    fock_so.set(&[p, q], fock.get(&[sp, sq])?)?;
                }
            }
        }

        // <pq|rs> = (PR|QS) δ(σp,σr) δ(σq,σs)
        let eri = self.eri.data();
        let block = (n_so * n_so * n_so).max(1);
        let mut direct = Tensor::zeros("V", &[n_so, n_so, n_so, n_so]);
        direct
            .data_mut()
            .par_chunks_mut(block)
            .enumerate()
            .for_each(|(p, chunk)| {
                let (sp, sigma_p) = spatial(p);
                for (offset, value) in chunk.iter_mut().enumerate() {
                    let (q, r, s) = (offset / (n_so * n_so), (offset / n_so) % n_so, offset % n_so);
                    let ((sq, sigma_q), (sr, sigma_r), (ss, sigma_s)) =
                        (spatial(q), spatial(r), spatial(s));
                    if sigma_p == sigma_r && sigma_q == sigma_s {
                        *value = eri[((sp * n + sr) * n + sq) * n + ss];
                    }
                }
            });

        CoulombIntegrals::from_spin_orbitals(
            2 * self.n_occupied(),
            fock_so,
            direct,
            self.reference_energy()?,
        )
    }
}

/// Spin-orbital integrals partitioned into occupied and virtual blocks.
///
/// Block lookup takes the same label strings the contractions use: letters
/// `i..=o` index occupied and `a..=h` virtual spin orbitals, so
/// `integrals.v("mnef")` is the `<oo||vv>` block.
#[derive(Debug, Clone)]
pub struct CoulombIntegrals<F: Scalar = f64> {
    n_occ: usize,
    n_virt: usize,
    reference_energy: f64,
    fock: BTreeMap<String, Tensor<F>>,
    eps_occ: Tensor<F>,
    eps_virt: Tensor<F>,
    antisymmetrized: BTreeMap<String, Tensor<F>>,
    direct: BTreeMap<String, Tensor<F>>,
}

fn pattern(labels: &str) -> Option<String> {
    labels
        .chars()
        .map(|c| match IndexSpace::from_label(c) {
            IndexSpace::General => None,
            space => Some(space.code()),
        })
        .collect()
}

fn ranges(pattern: &str, n_occ: usize, n_total: usize) -> Vec<Range<usize>> {
    pattern
        .chars()
        .map(|c| if c == 'o' { 0..n_occ } else { n_occ..n_total })
        .collect()
}

fn spaces(pattern: &str) -> Vec<IndexSpace> {
    pattern
        .chars()
        .map(|c| if c == 'o' { IndexSpace::Occupied } else { IndexSpace::Virtual })
        .collect()
}

fn all_patterns(order: usize) -> Vec<String> {
    (0..1usize << order)
        .map(|bits| {
            (0..order)
                .map(|d| if bits >> (order - 1 - d) & 1 == 0 { 'o' } else { 'v' })
                .collect()
        })
        .collect()
}

impl<F: Scalar> CoulombIntegrals<F> {
    /// Builds every block from the full spin-orbital Fock matrix and the
    /// direct integrals `<pq|rs>`; `<pq||rs> = <pq|rs> - <pq|sr>`.
    pub fn from_spin_orbitals(
        n_occ: usize,
        fock: Tensor<F>,
        direct: Tensor<F>,
        reference_energy: f64,
    ) -> Result<Self> {
        let n = fock.shape().first().copied().unwrap_or(0);
        if fock.shape() != [n, n] || direct.shape() != [n, n, n, n] || n_occ > n {
            return Err(CcError::Tensor(tensor::TensorError::ShapeMismatch {
                operation: "spin-orbital integrals".to_string(),
                left: fock.name().to_string(),
                left_shape: fock.shape().to_vec(),
                right: direct.name().to_string(),
                right_shape: direct.shape().to_vec(),
            }));
        }
        let n_virt = n - n_occ;

        let mut antisymmetrized = direct.clone();
        Contraction::new(-F::one())
            .operand(&direct, "pqsr")
            .accumulate_into(F::one(), &mut antisymmetrized, "pqrs")?;

        let mut fock_blocks = BTreeMap::new();
        for p in all_patterns(2) {
            let block = fock
                .slice(&ranges(&p, n_occ, n))?
                .with_spaces(&spaces(&p))?
                .renamed(format!("F{p}"));
            fock_blocks.insert(p, block);
        }

        let mut antisymmetrized_blocks = BTreeMap::new();
        let mut direct_blocks = BTreeMap::new();
        for p in all_patterns(4) {
            let r = ranges(&p, n_occ, n);
            let block = antisymmetrized
                .slice(&r)?
                .with_spaces(&spaces(&p))?
                .renamed(format!("V{p}"));
            antisymmetrized_blocks.insert(p.clone(), block);
            let block = direct
                .slice(&r)?
                .with_spaces(&spaces(&p))?
                .renamed(format!("C{p}"));
            direct_blocks.insert(p, block);
        }

        let diagonal = |range: Range<usize>, name: &str, space: IndexSpace| -> Result<Tensor<F>> {
            let values = range
                .map(|p| fock.get(&[p, p]))
                .collect::<std::result::Result<Vec<F>, _>>()?;
            let len = values.len();
            Ok(Tensor::from_vec(name, &[len], values)?.with_spaces(&[space])?)
        };
        let eps_occ = diagonal(0..n_occ, "eps_o", IndexSpace::Occupied)?;
        let eps_virt = diagonal(n_occ..n, "eps_v", IndexSpace::Virtual)?;

        info!(
            "Spin-orbital integrals: {} occupied, {} virtual, {:.2} MB in blocks",
            n_occ,
            n_virt,
            (2 * n.pow(4) * F::SCALAR_TYPE.size_of()) as f64 / 1_048_576.0
        );

        Ok(CoulombIntegrals {
            n_occ,
            n_virt,
            reference_energy,
            fock: fock_blocks,
            eps_occ,
            eps_virt,
            antisymmetrized: antisymmetrized_blocks,
            direct: direct_blocks,
        })
    }

    pub fn n_occ(&self) -> usize {
        self.n_occ
    }

    pub fn n_virt(&self) -> usize {
        self.n_virt
    }

    pub fn reference_energy(&self) -> f64 {
        self.reference_energy
    }

    fn lookup<'s>(map: &'s BTreeMap<String, Tensor<F>>, labels: &str) -> Result<&'s Tensor<F>> {
        pattern(labels)
            .and_then(|p| map.get(&p))
            .ok_or_else(|| CcError::UnknownBlock {
                labels: labels.to_string(),
            })
    }

    /// Antisymmetrized block `<pq||rs>` selected by four labels.
    pub fn v(&self, labels: &str) -> Result<&Tensor<F>> {
        Self::lookup(&self.antisymmetrized, labels)
    }

    /// Direct block `<pq|rs>` selected by four labels.
    pub fn direct(&self, labels: &str) -> Result<&Tensor<F>> {
        Self::lookup(&self.direct, labels)
    }

    /// Fock block selected by two labels.
    pub fn fock(&self, labels: &str) -> Result<&Tensor<F>> {
        Self::lookup(&self.fock, labels)
    }

    /// Fock block with the orbital energies removed. Mixed `ov`/`vo` blocks
    /// have no diagonal and come back unchanged.
    pub fn fock_off_diagonal(&self, labels: &str) -> Result<Tensor<F>> {
        let mut block = self.fock(labels)?.clone();
        if matches!(pattern(labels).as_deref(), Some("oo" | "vv")) {
            for p in 0..block.shape()[0] {
                block.set(&[p, p], F::zero())?;
            }
        }
        debug!("off-diagonal Fock block {}", block.name());
        Ok(block)
    }

    pub fn eps_occ(&self) -> &Tensor<F> {
        &self.eps_occ
    }

    pub fn eps_virt(&self) -> &Tensor<F> {
        &self.eps_virt
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{h2_like, random_model};
    use approx::assert_relative_eq;

    #[test]
    fn closed_shell_fock_and_energy() {
        let ints = h2_like();
        let fock = ints.fock().unwrap();
        assert_relative_eq!(fock.get(&[0, 0]).unwrap(), -1.2528 + 0.6746, epsilon = 1e-12);
        assert_relative_eq!(
            fock.get(&[1, 1]).unwrap(),
            -0.4756 + 2.0 * 0.6636 - 0.1813,
            epsilon = 1e-12
        );
        assert_relative_eq!(fock.get(&[0, 1]).unwrap(), 0.0);
        assert_relative_eq!(
            ints.reference_energy().unwrap(),
            0.7137 + 2.0 * -1.2528 + 0.6746,
            epsilon = 1e-12
        );
    }

    #[test]
    fn spin_orbital_blocks_are_antisymmetric() {
        let so = h2_like().to_spin_orbitals().unwrap();
        assert_eq!((so.n_occ(), so.n_virt()), (2, 2));

        let vijab = so.v("ijab").unwrap();
        assert_eq!(vijab.shape(), &[2, 2, 2, 2]);
        // <1α 1β || 2α 2β> = (12|12)
        assert_relative_eq!(vijab.get(&[0, 1, 0, 1]).unwrap(), 0.1813, epsilon = 1e-12);
        assert_relative_eq!(vijab.get(&[1, 0, 0, 1]).unwrap(), -0.1813, epsilon = 1e-12);
        assert_relative_eq!(vijab.get(&[0, 0, 0, 1]).unwrap(), 0.0);

        // <1α 1β | 1α 1β> = (11|11), <1α 1α || 1α 1α> = 0
        assert_relative_eq!(so.direct("ijkl").unwrap().get(&[0, 1, 0, 1]).unwrap(), 0.6746);
        assert_relative_eq!(so.v("ijkl").unwrap().get(&[0, 0, 0, 0]).unwrap(), 0.0);

        assert_relative_eq!(so.eps_occ().data()[1], -1.2528 + 0.6746, epsilon = 1e-12);
        assert!(matches!(so.v("ijpq"), Err(CcError::UnknownBlock { .. })));
    }

    #[test]
    fn off_diagonal_fock_keeps_mixed_blocks() {
        // four spin orbitals occupied and four virtual, so every block is square
        let so = random_model(4, 4, 7).to_spin_orbitals().unwrap();
        assert_eq!(so.n_occ(), so.n_virt());

        let f_ov = so.fock("me").unwrap();
        assert!((0..so.n_occ()).any(|p| f_ov.get(&[p, p]).unwrap() != 0.0));
        assert_eq!(&so.fock_off_diagonal("me").unwrap(), f_ov);

        let f_oo = so.fock_off_diagonal("mi").unwrap();
        let f_vv = so.fock_off_diagonal("ae").unwrap();
        for p in 0..so.n_occ() {
            assert_eq!(f_oo.get(&[p, p]).unwrap(), 0.0);
            assert_eq!(f_vv.get(&[p, p]).unwrap(), 0.0);
        }
        assert_eq!(f_oo.get(&[0, 2]).unwrap(), so.fock("mi").unwrap().get(&[0, 2]).unwrap());
    }

    #[test]
    fn odd_electron_count_is_rejected() {
        let ints = h2_like();
        let err = SpatialIntegrals::new(3, 0.0, ints.core_hamiltonian.clone(), ints.eri.clone());
        assert!(err.is_err());
    }
}
