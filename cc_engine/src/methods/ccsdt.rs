//! CCSDT-1a: CCSD with triples driven by doubles only, fed back into the
//! singles and doubles residuals.

use super::{connected_triples, subtract_denominator, Ccsd};
use crate::amplitudes::AmplitudeSet;
use crate::error::Result;
use crate::integrals::CoulombIntegrals;
use crate::solver::ClusterEquations;
use tensor::{Antisymmetrizer, Contraction, Scalar};

pub struct Ccsdt1<'a, F: Scalar = f64> {
    ccsd: Ccsd<'a, F>,
}

impl<'a, F: Scalar> Ccsdt1<'a, F> {
    pub fn new(integrals: &'a CoulombIntegrals<F>) -> Self {
        Ccsdt1 {
            ccsd: Ccsd::new(integrals),
        }
    }

    fn integrals(&self) -> &'a CoulombIntegrals<F> {
        self.ccsd.integrals()
    }
}

impl<F: Scalar> ClusterEquations<F> for Ccsdt1<'_, F> {
    fn name(&self) -> &str {
        "CCSDT-1a"
    }

    fn excitation_levels(&self) -> usize {
        3
    }

    fn initial_amplitudes(&self) -> Result<AmplitudeSet<F>> {
        let doubles = self.ccsd.initial_amplitudes()?;
        let mut amplitudes = AmplitudeSet::for_integrals(self.integrals(), 3)?;
        *amplitudes.get_mut(2)? = doubles.doubles()?.clone();
        Ok(amplitudes)
    }

    fn residual(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>> {
        let ints = self.integrals();
        let (t1, t2, t3) = (
            amplitudes.singles()?,
            amplitudes.doubles()?,
            amplitudes.triples()?,
        );
        let (mut omega1, mut omega2) = self.ccsd.singles_doubles_residual(t1, t2)?;
        let one = F::one();

        // ¼ <mn||ef> t_imn^aef
        Contraction::new(F::from_real(0.25))
            .operand(ints.v("mnef")?, "mnef")
            .operand(t3, "imnaef")
            .accumulate_into(one, &mut omega1, "ia")?;

        // f_me t_ijm^abe + ½ P(ab) <bm||ef> t_ijm^aef - ½ P(ij) <mn||je> t_imn^abe
        Contraction::new(one)
            .operand(ints.fock("me")?, "me")
            .operand(t3, "ijmabe")
            .accumulate_into(one, &mut omega2, "ijab")?;
        Contraction::new(F::from_real(0.5))
            .operand(ints.v("bmef")?, "bmef")
            .operand(t3, "ijmaef")
            .accumulate_antisymmetrized(&Antisymmetrizer::full("ab"), one, &mut omega2, "ijab")?;
        Contraction::new(F::from_real(-0.5))
            .operand(ints.v("mnje")?, "mnje")
            .operand(t3, "imnabe")
            .accumulate_antisymmetrized(&Antisymmetrizer::full("ij"), one, &mut omega2, "ijab")?;

        let mut omega3 = connected_triples(ints, t2)?.renamed("R3");
        subtract_denominator(ints, t3, &mut omega3, "ijkabc")?;

        AmplitudeSet::from_components(
            amplitudes.n_occ(),
            amplitudes.n_virt(),
            vec![omega1, omega2, omega3],
        )
    }

    /// Triples do not enter the energy directly.
    fn energy(&self, amplitudes: &AmplitudeSet<F>) -> Result<F> {
        self.ccsd
            .singles_doubles_energy(amplitudes.singles()?, amplitudes.doubles()?)
    }

    fn denominators(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>> {
        amplitudes.denominators(self.integrals())
    }
}
