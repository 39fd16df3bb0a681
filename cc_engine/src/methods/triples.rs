//! Connected triples from doubles and the (T) correction.

use crate::amplitudes::AmplitudeSet;
use crate::error::Result;
use crate::integrals::CoulombIntegrals;
use tensor::{Antisymmetrizer, Contraction, Scalar, Tensor};
use tracing::info;

fn p_triples() -> Antisymmetrizer {
    Antisymmetrizer::coset('i', "jk").then(&Antisymmetrizer::coset('a', "bc"))
}

/// `W_ijk^abc = P(i/jk) P(a/bc) [t_jk^ae <ei||bc> - t_im^bc <ma||jk>]`
pub fn connected_triples<F: Scalar>(
    integrals: &CoulombIntegrals<F>,
    t2: &Tensor<F>,
) -> Result<Tensor<F>> {
    let (o, v) = (integrals.n_occ(), integrals.n_virt());
    let mut w = Tensor::zeros_labelled("W3", "ijkabc", &[o, o, o, v, v, v]);
    let mut scratch = w.zeros_like();
    Contraction::new(F::one())
        .operand(t2, "jkae")
        .operand(integrals.v("eibc")?, "eibc")
        .accumulate_into(F::zero(), &mut scratch, "ijkabc")?;
    Contraction::new(-F::one())
        .operand(t2, "imbc")
        .operand(integrals.v("majk")?, "majk")
        .accumulate_into(F::one(), &mut scratch, "ijkabc")?;
    p_triples().apply(F::one(), &scratch, "ijkabc", F::zero(), &mut w)?;
    Ok(w)
}

/// Perturbative triples correction on converged CCSD amplitudes.
pub struct PerturbativeTriples<'a, F: Scalar = f64> {
    integrals: &'a CoulombIntegrals<F>,
}

impl<'a, F: Scalar> PerturbativeTriples<'a, F> {
    pub fn new(integrals: &'a CoulombIntegrals<F>) -> Self {
        PerturbativeTriples { integrals }
    }

    /// `E(T) = 1/36 Σ conj(W) (W + V) / D` with the disconnected part
    /// `V_ijk^abc = P(i/jk) P(a/bc) t_i^a <jk||bc>`.
    pub fn energy(&self, amplitudes: &AmplitudeSet<F>) -> Result<F> {
        let ints = self.integrals;
        let t1 = amplitudes.singles()?;
        let t2 = amplitudes.doubles()?;
        let connected = connected_triples(ints, t2)?;

        let mut disconnected = connected.zeros_like().renamed("V3");
        Contraction::new(F::one())
            .operand(t1, "ia")
            .operand(ints.v("jkbc")?, "jkbc")
            .accumulate_antisymmetrized(&p_triples(), F::zero(), &mut disconnected, "ijkabc")?;

        let denominators = AmplitudeSet::for_integrals(ints, 3)?.denominators(ints)?;
        let d3 = denominators.triples()?;

        let sum = connected
            .data()
            .iter()
            .zip(disconnected.data())
            .zip(d3.data())
            .fold(F::zero(), |acc, ((&w, &v), &d)| {
                if d.is_zero() {
                    acc
                } else {
                    acc + w.conjugate() * (w + v) / d
                }
            });
        let energy = sum * F::from_real(1.0 / 36.0);
        info!("(T) correction: {:.12} Eh", energy.real());
        Ok(energy)
    }
}
