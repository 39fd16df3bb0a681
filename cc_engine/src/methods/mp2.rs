use super::scalar;
use crate::amplitudes::AmplitudeSet;
use crate::error::Result;
use crate::integrals::CoulombIntegrals;
use tensor::{Contraction, Scalar, Tensor};
use tracing::info;

/// `t_ij^ab = <ab||ij> / D_ijab`
pub fn first_order_doubles<F: Scalar>(integrals: &CoulombIntegrals<F>) -> Result<Tensor<F>> {
    let template = AmplitudeSet::for_integrals(integrals, 2)?;
    let denominators = template.denominators(integrals)?;
    let mut t2 = template.doubles()?.zeros_like();
    Contraction::new(F::from_real(1.0))
        .operand(integrals.v("abij")?, "abij")
        .accumulate_into(F::zero(), &mut t2, "ijab")?;
    t2.zip_apply(denominators.doubles()?, |v, d| {
        if d.is_zero() {
            F::zero()
        } else {
            v / d
        }
    })?;
    Ok(t2)
}

#[derive(Debug, Clone)]
pub struct Mp2Result<F: Scalar = f64> {
    pub energy: F,
    pub amplitudes: AmplitudeSet<F>,
}

/// Second-order Møller–Plesset energy on a canonical reference.
pub struct Mp2<'a, F: Scalar = f64> {
    integrals: &'a CoulombIntegrals<F>,
}

impl<'a, F: Scalar> Mp2<'a, F> {
    pub fn new(integrals: &'a CoulombIntegrals<F>) -> Self {
        Mp2 { integrals }
    }

    pub fn run(&self) -> Result<Mp2Result<F>> {
        let t2 = first_order_doubles(self.integrals)?;
        let energy = scalar(
            Contraction::new(F::from_real(0.25))
                .operand(self.integrals.v("ijab")?, "ijab")
                .operand(&t2, "ijab"),
        )?;
        info!("MP2 correlation energy: {:.12} Eh", energy.real());

        let mut amplitudes = AmplitudeSet::for_integrals(self.integrals, 2)?;
        *amplitudes.get_mut(2)? = t2.renamed("T2");
        Ok(Mp2Result { energy, amplitudes })
    }
}
