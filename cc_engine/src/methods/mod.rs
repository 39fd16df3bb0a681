//! Coupled-cluster methods over spin-orbital integrals.
//!
//! Label conventions throughout: `i j k l m n o` run over occupied and
//! `a b c d e f g h` over virtual spin orbitals; integral blocks are looked
//! up by the labels they are contracted with.

mod ccsd;
mod ccsdt;
mod drccd;
mod mp2;
mod triples;

#[cfg(test)]
mod tests;

pub use ccsd::Ccsd;
pub use ccsdt::Ccsdt1;
pub use drccd::{Drccd, DrccdEnergy};
pub use mp2::{first_order_doubles, Mp2, Mp2Result};
pub use triples::{connected_triples, PerturbativeTriples};

use crate::error::Result;
use crate::integrals::CoulombIntegrals;
use tensor::{Contraction, IndexSpace, Scalar, Tensor};

/// Fully contracted term as a scalar.
pub(crate) fn scalar<F: Scalar>(contraction: Contraction<'_, F>) -> Result<F> {
    Ok(contraction.evaluate("E", "")?.get(&[])?)
}

/// Adds `-D t` to `out`, where `D = Σ f_occ - Σ f_virt` over `labels`.
pub(crate) fn subtract_denominator<F: Scalar>(
    integrals: &CoulombIntegrals<F>,
    amplitudes: &Tensor<F>,
    out: &mut Tensor<F>,
    labels: &str,
) -> Result<()> {
    for c in labels.chars() {
        let single = c.to_string();
        let (eps, sign) = match IndexSpace::from_label(c) {
            IndexSpace::Occupied => (integrals.eps_occ(), -F::one()),
            _ => (integrals.eps_virt(), F::one()),
        };
        Contraction::new(sign)
            .operand(eps, &single)
            .operand(amplitudes, labels)
            .accumulate_into(F::one(), out, labels)?;
    }
    Ok(())
}
