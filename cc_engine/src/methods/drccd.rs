//! Direct-ring CCD (RPA) over the non-antisymmetrized integrals.
//!
//! ```text
//! Ω_ij^ab = <ab|ij> + <ak|ic> t_kj^cb + <kb|cj> t_ik^ac + t_ik^ac <kl|cd> t_lj^db - D t_ij^ab
//! ```

use super::{scalar, subtract_denominator};
use crate::amplitudes::AmplitudeSet;
use crate::error::Result;
use crate::integrals::CoulombIntegrals;
use crate::solver::ClusterEquations;
use serde::Serialize;
use tensor::{Contraction, Scalar, VectorSpace};
use tracing::info;

/// Direct ring energy together with its second-order screened exchange
/// counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrccdEnergy {
    pub direct: f64,
    pub exchange: f64,
}

impl DrccdEnergy {
    pub fn total(&self) -> f64 {
        self.direct + self.exchange
    }
}

pub struct Drccd<'a, F: Scalar = f64> {
    integrals: &'a CoulombIntegrals<F>,
}

impl<'a, F: Scalar> Drccd<'a, F> {
    pub fn new(integrals: &'a CoulombIntegrals<F>) -> Self {
        Drccd { integrals }
    }

    /// `½ Σ <ij|ab> t_ij^ab` and `-½ Σ <ij|ba> t_ij^ab`.
    pub fn energy_components(&self, amplitudes: &AmplitudeSet<F>) -> Result<(F, F)> {
        let t2 = amplitudes.doubles()?;
        let coulomb = self.integrals.direct("ijab")?;
        let direct = scalar(
            Contraction::new(F::from_real(0.5))
                .operand(coulomb, "ijab")
                .operand(t2, "ijab"),
        )?;
        let exchange = scalar(
            Contraction::new(F::from_real(-0.5))
                .operand(coulomb, "ijba")
                .operand(t2, "ijab"),
        )?;
        Ok((direct, exchange))
    }

    pub fn report(&self, amplitudes: &AmplitudeSet<F>) -> Result<DrccdEnergy> {
        let (direct, exchange) = self.energy_components(amplitudes)?;
        let energy = DrccdEnergy {
            direct: direct.real(),
            exchange: exchange.real(),
        };
        info!("drCCD direct energy:   {:.12} Eh", energy.direct);
        info!("drCCD exchange energy: {:.12} Eh", energy.exchange);
        Ok(energy)
    }
}

impl<F: Scalar> ClusterEquations<F> for Drccd<'_, F> {
    fn name(&self) -> &str {
        "drCCD"
    }

    fn excitation_levels(&self) -> usize {
        2
    }

    /// Singles are carried with a zero residual so the layout matches CCSD.
    fn initial_amplitudes(&self) -> Result<AmplitudeSet<F>> {
        AmplitudeSet::for_integrals(self.integrals, 2)
    }

    fn residual(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>> {
        let ints = self.integrals;
        let t2 = amplitudes.doubles()?;
        let one = F::one();

        let mut residual = amplitudes.zeros_like();
        let omega2 = residual.get_mut(2)?;
        Contraction::new(one)
            .operand(ints.direct("abij")?, "abij")
            .accumulate_into(F::zero(), omega2, "ijab")?;
        Contraction::new(one)
            .operand(ints.direct("akic")?, "akic")
            .operand(t2, "kjcb")
            .accumulate_into(one, omega2, "ijab")?;
        Contraction::new(one)
            .operand(ints.direct("kbcj")?, "kbcj")
            .operand(t2, "ikac")
            .accumulate_into(one, omega2, "ijab")?;
        Contraction::new(one)
            .operand(t2, "ikac")
            .operand(ints.direct("klcd")?, "klcd")
            .operand(t2, "ljdb")
            .accumulate_into(one, omega2, "ijab")?;
        subtract_denominator(ints, t2, omega2, "ijab")?;
        Ok(residual)
    }

    fn energy(&self, amplitudes: &AmplitudeSet<F>) -> Result<F> {
        let (direct, exchange) = self.energy_components(amplitudes)?;
        Ok(direct + exchange)
    }

    fn denominators(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>> {
        amplitudes.denominators(self.integrals)
    }
}
