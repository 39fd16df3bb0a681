//! Two-orbital model Hamiltonian shared by the unit tests.
//!
//! With gerade/ungerade symmetry every integral with an odd number of
//! ungerade indices vanishes, so the singlet ground state is an exact
//! mixture of the reference and the doubly excited determinant. CCSD is
//! exact for two electrons, which gives closed-form targets.

use crate::integrals::SpatialIntegrals;
use tensor::Tensor;

pub(crate) const H11: f64 = -1.2528;
pub(crate) const H22: f64 = -0.4756;
pub(crate) const J11: f64 = 0.6746;
pub(crate) const J22: f64 = 0.6975;
pub(crate) const J12: f64 = 0.6636;
pub(crate) const K12: f64 = 0.1813;
pub(crate) const CORE: f64 = 0.7137;

pub(crate) fn h2_like() -> SpatialIntegrals {
    let h = Tensor::from_vec("h", &[2, 2], vec![H11, 0.0, 0.0, H22]).unwrap();
    let mut eri = Tensor::zeros("eri", &[2, 2, 2, 2]);
    eri.set(&[0, 0, 0, 0], J11).unwrap();
    eri.set(&[1, 1, 1, 1], J22).unwrap();
    for idx in [[0, 0, 1, 1], [1, 1, 0, 0]] {
        eri.set(&idx, J12).unwrap();
    }
    for idx in [[0, 1, 0, 1], [1, 0, 1, 0], [0, 1, 1, 0], [1, 0, 0, 1]] {
        eri.set(&idx, K12).unwrap();
    }
    SpatialIntegrals::new(2, CORE, h, eri).unwrap()
}

/// Electronic energy of the reference determinant.
pub(crate) fn reference_energy() -> f64 {
    2.0 * H11 + J11
}

/// Exact singlet ground state energy, electronic part.
pub(crate) fn ground_state_energy() -> f64 {
    let e_hf = reference_energy();
    let e_d = 2.0 * H22 + J22;
    0.5 * (e_hf + e_d) - ((0.5 * (e_d - e_hf)).powi(2) + K12 * K12).sqrt()
}

pub(crate) fn correlation_energy() -> f64 {
    ground_state_energy() - reference_energy()
}

/// Exact excitation energies from the ground state: the singly excited
/// triplet (three spin components) and singlet.
pub(crate) fn excitation_energies() -> (f64, f64) {
    let e0 = ground_state_energy();
    let triplet = H11 + H22 + J12 - K12;
    let singlet = H11 + H22 + J12 + K12;
    (triplet - e0, singlet - e0)
}

/// Same model as an FCIDUMP file.
pub(crate) fn h2_fcidump() -> String {
    format!(
        " &FCI NORB=  2,NELEC=  2,MS2=0,\n  ORBSYM=1,5,\n  ISYM=1,\n &END\n\
         {J11:.10}  1  1  1  1\n\
         {J12:.10}  1  1  2  2\n\
         {K12:.10}  2  1  2  1\n\
         {J22:.10}  2  2  2  2\n\
         {H11:.10}  1  1  0  0\n\
         {H22:.10}  2  2  0  0\n\
         {CORE:.10}  0  0  0  0\n"
    )
}

/// Closed-shell model with `n` orbitals and small pseudo-random integrals
/// carrying the full 8-fold permutational symmetry.
pub(crate) fn random_model(n: usize, n_electrons: usize, seed: u64) -> SpatialIntegrals {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) as f64) / (1u64 << 31) as f64 - 0.5
    };

    let mut h = Tensor::zeros("h", &[n, n]);
    for p in 0..n {
        h.set(&[p, p], -2.0 + 1.2 * p as f64).unwrap();
        for q in 0..p {
            let x = 0.05 * next();
            h.set(&[p, q], x).unwrap();
            h.set(&[q, p], x).unwrap();
        }
    }

    let mut eri = Tensor::zeros("eri", &[n, n, n, n]);
    for p in 0..n {
        for q in 0..=p {
            for r in 0..n {
                for s in 0..=r {
                    if p * (p + 1) / 2 + q < r * (r + 1) / 2 + s {
                        continue;
                    }
                    let diagonal = if p == q && r == s { 0.5 } else { 0.0 };
                    let x = diagonal + 0.08 * next();
                    for idx in [
                        [p, q, r, s],
                        [q, p, r, s],
                        [p, q, s, r],
                        [q, p, s, r],
                        [r, s, p, q],
                        [s, r, p, q],
                        [r, s, q, p],
                        [s, r, q, p],
                    ] {
                        eri.set(&idx, x).unwrap();
                    }
                }
            }
        }
    }
    SpatialIntegrals::new(n_electrons, 0.0, h, eri).unwrap()
}
