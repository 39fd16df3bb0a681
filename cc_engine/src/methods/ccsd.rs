//! Spin-orbital CCSD with the Stanton–Gauss intermediates.
//!
//! ```text
//! τ̃_ij^ab = t_ij^ab + ½ P(ab) t_i^a t_j^b       τ_ij^ab = t_ij^ab + P(ab) t_i^a t_j^b
//!
//! F_ae = (1-δ) f_ae - ½ f_me t_m^a + t_m^f <ma||fe> - ½ τ̃_mn^af <mn||ef>
//! F_mi = (1-δ) f_mi + ½ t_i^e f_me + t_n^e <mn||ie> + ½ τ̃_in^ef <mn||ef>
//! F_me = f_me + t_n^f <mn||ef>
//! W_mnij = <mn||ij> + P(ij) t_j^e <mn||ie> + ¼ τ_ij^ef <mn||ef>
//! W_abef = <ab||ef> - P(ab) t_m^b <am||ef> + ¼ τ_mn^ab <mn||ef>
//! W_mbej = <mb||ej> + t_j^f <mb||ef> - t_n^b <mn||ej> - (½ t_jn^fb + t_j^f t_n^b) <mn||ef>
//! ```

use super::{first_order_doubles, scalar, subtract_denominator};
use crate::amplitudes::AmplitudeSet;
use crate::error::Result;
use crate::integrals::CoulombIntegrals;
use crate::solver::ClusterEquations;
use tensor::{Antisymmetrizer, Contraction, Scalar, Tensor};

fn real<F: Scalar>(x: f64) -> F {
    F::from_real(x)
}

pub struct Ccsd<'a, F: Scalar = f64> {
    integrals: &'a CoulombIntegrals<F>,
}

/// Intermediates shared by the singles and doubles residuals.
struct Intermediates<F: Scalar> {
    tau: Tensor<F>,
    f_ae: Tensor<F>,
    f_mi: Tensor<F>,
    f_me: Tensor<F>,
    w_mnij: Tensor<F>,
    w_abef: Tensor<F>,
    w_mbej: Tensor<F>,
}

impl<'a, F: Scalar> Ccsd<'a, F> {
    pub fn new(integrals: &'a CoulombIntegrals<F>) -> Self {
        Ccsd { integrals }
    }

    pub fn integrals(&self) -> &'a CoulombIntegrals<F> {
        self.integrals
    }

    fn intermediates(&self, t1: &Tensor<F>, t2: &Tensor<F>) -> Result<Intermediates<F>> {
        let ints = self.integrals;
        let p_ab = Antisymmetrizer::full("ab");
        let p_ij = Antisymmetrizer::full("ij");
        let one = F::one();

        let mut tau_tilde = t2.clone().renamed("tau~");
        Contraction::new(real(0.5))
            .operand(t1, "ia")
            .operand(t1, "jb")
            .accumulate_antisymmetrized(&p_ab, one, &mut tau_tilde, "ijab")?;
        let mut tau = t2.clone().renamed("tau");
        Contraction::new(one)
            .operand(t1, "ia")
            .operand(t1, "jb")
            .accumulate_antisymmetrized(&p_ab, one, &mut tau, "ijab")?;

        let mut f_ae = ints.fock_off_diagonal("ae")?.renamed("Fae");
        Contraction::new(real(-0.5))
            .operand(ints.fock("me")?, "me")
            .operand(t1, "ma")
            .accumulate_into(one, &mut f_ae, "ae")?;
        Contraction::new(one)
            .operand(t1, "mf")
            .operand(ints.v("mafe")?, "mafe")
            .accumulate_into(one, &mut f_ae, "ae")?;
        Contraction::new(real(-0.5))
            .operand(&tau_tilde, "mnaf")
            .operand(ints.v("mnef")?, "mnef")
            .accumulate_into(one, &mut f_ae, "ae")?;

        let mut f_mi = ints.fock_off_diagonal("mi")?.renamed("Fmi");
        Contraction::new(real(0.5))
            .operand(t1, "ie")
            .operand(ints.fock("me")?, "me")
            .accumulate_into(one, &mut f_mi, "mi")?;
        Contraction::new(one)
            .operand(t1, "ne")
            .operand(ints.v("mnie")?, "mnie")
            .accumulate_into(one, &mut f_mi, "mi")?;
        Contraction::new(real(0.5))
            .operand(&tau_tilde, "inef")
            .operand(ints.v("mnef")?, "mnef")
            .accumulate_into(one, &mut f_mi, "mi")?;

        let mut f_me = ints.fock("me")?.clone().renamed("Fme");
        Contraction::new(one)
            .operand(t1, "nf")
            .operand(ints.v("mnef")?, "mnef")
            .accumulate_into(one, &mut f_me, "me")?;

        let mut w_mnij = ints.v("mnij")?.clone().renamed("Wmnij");
        Contraction::new(one)
            .operand(t1, "je")
            .operand(ints.v("mnie")?, "mnie")
            .accumulate_antisymmetrized(&p_ij, one, &mut w_mnij, "mnij")?;
        Contraction::new(real(0.25))
            .operand(&tau, "ijef")
            .operand(ints.v("mnef")?, "mnef")
            .accumulate_into(one, &mut w_mnij, "mnij")?;

        let mut w_abef = ints.v("abef")?.clone().renamed("Wabef");
        Contraction::new(-one)
            .operand(t1, "mb")
            .operand(ints.v("amef")?, "amef")
            .accumulate_antisymmetrized(&p_ab, one, &mut w_abef, "abef")?;
        Contraction::new(real(0.25))
            .operand(&tau, "mnab")
            .operand(ints.v("mnef")?, "mnef")
            .accumulate_into(one, &mut w_abef, "abef")?;

        let mut w_mbej = ints.v("mbej")?.clone().renamed("Wmbej");
        Contraction::new(one)
            .operand(t1, "jf")
            .operand(ints.v("mbef")?, "mbef")
            .accumulate_into(one, &mut w_mbej, "mbej")?;
        Contraction::new(-one)
            .operand(t1, "nb")
            .operand(ints.v("mnej")?, "mnej")
            .accumulate_into(one, &mut w_mbej, "mbej")?;
        Contraction::new(real(-0.5))
            .operand(t2, "jnfb")
            .operand(ints.v("mnef")?, "mnef")
            .accumulate_into(one, &mut w_mbej, "mbej")?;
        Contraction::new(-one)
            .operand(t1, "jf")
            .operand(t1, "nb")
            .operand(ints.v("mnef")?, "mnef")
            .accumulate_into(one, &mut w_mbej, "mbej")?;

        Ok(Intermediates {
            tau,
            f_ae,
            f_mi,
            f_me,
            w_mnij,
            w_abef,
            w_mbej,
        })
    }

    /// `(Ω1, Ω2)` of the CCSD equations, including the `-D t` terms.
    pub(crate) fn singles_doubles_residual(
        &self,
        t1: &Tensor<F>,
        t2: &Tensor<F>,
    ) -> Result<(Tensor<F>, Tensor<F>)> {
        let ints = self.integrals;
        let x = self.intermediates(t1, t2)?;
        let one = F::one();
        let p_ab = Antisymmetrizer::full("ab");
        let p_ij = Antisymmetrizer::full("ij");
        let p_ijab = Antisymmetrizer::over(&["ij", "ab"]);

        let mut omega1 = t1.zeros_like().renamed("R1");
        Contraction::new(one)
            .operand(ints.fock("ai")?, "ai")
            .accumulate_into(F::zero(), &mut omega1, "ia")?;
        Contraction::new(one)
            .operand(t1, "ie")
            .operand(&x.f_ae, "ae")
            .accumulate_into(one, &mut omega1, "ia")?;
        Contraction::new(-one)
            .operand(t1, "ma")
            .operand(&x.f_mi, "mi")
            .accumulate_into(one, &mut omega1, "ia")?;
        Contraction::new(one)
            .operand(t2, "imae")
            .operand(&x.f_me, "me")
            .accumulate_into(one, &mut omega1, "ia")?;
        Contraction::new(-one)
            .operand(t1, "nf")
            .operand(ints.v("naif")?, "naif")
            .accumulate_into(one, &mut omega1, "ia")?;
        Contraction::new(real(-0.5))
            .operand(t2, "imef")
            .operand(ints.v("maef")?, "maef")
            .accumulate_into(one, &mut omega1, "ia")?;
        Contraction::new(real(-0.5))
            .operand(t2, "mnae")
            .operand(ints.v("nmei")?, "nmei")
            .accumulate_into(one, &mut omega1, "ia")?;
        subtract_denominator(ints, t1, &mut omega1, "ia")?;

        let mut omega2 = t2.zeros_like().renamed("R2");
        Contraction::new(one)
            .operand(ints.v("abij")?, "abij")
            .accumulate_into(F::zero(), &mut omega2, "ijab")?;

        // F_be - ½ t_m^b F_me
        let mut f_be = x.f_ae.clone();
        Contraction::new(real(-0.5))
            .operand(t1, "mb")
            .operand(&x.f_me, "me")
            .accumulate_into(one, &mut f_be, "be")?;
        Contraction::new(one)
            .operand(t2, "ijae")
            .operand(&f_be, "be")
            .accumulate_antisymmetrized(&p_ab, one, &mut omega2, "ijab")?;

        // F_mj + ½ t_j^e F_me
        let mut f_mj = x.f_mi.clone();
        Contraction::new(real(0.5))
            .operand(t1, "je")
            .operand(&x.f_me, "me")
            .accumulate_into(one, &mut f_mj, "mj")?;
        Contraction::new(-one)
            .operand(t2, "imab")
            .operand(&f_mj, "mj")
            .accumulate_antisymmetrized(&p_ij, one, &mut omega2, "ijab")?;

        Contraction::new(real(0.5))
            .operand(&x.tau, "mnab")
            .operand(&x.w_mnij, "mnij")
            .accumulate_into(one, &mut omega2, "ijab")?;
        Contraction::new(real(0.5))
            .operand(&x.tau, "ijef")
            .operand(&x.w_abef, "abef")
            .accumulate_into(one, &mut omega2, "ijab")?;

        Contraction::new(one)
            .operand(t2, "imae")
            .operand(&x.w_mbej, "mbej")
            .accumulate_antisymmetrized(&p_ijab, one, &mut omega2, "ijab")?;
        Contraction::new(-one)
            .operand(t1, "ie")
            .operand(t1, "ma")
            .operand(ints.v("mbej")?, "mbej")
            .accumulate_antisymmetrized(&p_ijab, one, &mut omega2, "ijab")?;

        Contraction::new(one)
            .operand(t1, "ie")
            .operand(ints.v("abej")?, "abej")
            .accumulate_antisymmetrized(&p_ij, one, &mut omega2, "ijab")?;
        Contraction::new(-one)
            .operand(t1, "ma")
            .operand(ints.v("mbij")?, "mbij")
            .accumulate_antisymmetrized(&p_ab, one, &mut omega2, "ijab")?;
        subtract_denominator(ints, t2, &mut omega2, "ijab")?;

        Ok((omega1, omega2))
    }

    /// `E = f_ia t_i^a + ¼ <ij||ab> t_ij^ab + ½ <ij||ab> t_i^a t_j^b`
    pub(crate) fn singles_doubles_energy(&self, t1: &Tensor<F>, t2: &Tensor<F>) -> Result<F> {
        let ints = self.integrals;
        let singles = scalar(
            Contraction::new(F::one())
                .operand(ints.fock("ia")?, "ia")
                .operand(t1, "ia"),
        )?;
        let doubles = scalar(
            Contraction::new(real(0.25))
                .operand(ints.v("ijab")?, "ijab")
                .operand(t2, "ijab"),
        )?;
        let disconnected = scalar(
            Contraction::new(real(0.5))
                .operand(ints.v("ijab")?, "ijab")
                .operand(t1, "ia")
                .operand(t1, "jb"),
        )?;
        Ok(singles + doubles + disconnected)
    }
}

impl<F: Scalar> ClusterEquations<F> for Ccsd<'_, F> {
    fn name(&self) -> &str {
        "CCSD"
    }

    fn excitation_levels(&self) -> usize {
        2
    }

    /// Zero singles and first-order doubles.
    fn initial_amplitudes(&self) -> Result<AmplitudeSet<F>> {
        let mut amplitudes = AmplitudeSet::for_integrals(self.integrals, 2)?;
        *amplitudes.get_mut(2)? = first_order_doubles(self.integrals)?.renamed("T2");
        Ok(amplitudes)
    }

    fn residual(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>> {
        let (omega1, omega2) =
            self.singles_doubles_residual(amplitudes.singles()?, amplitudes.doubles()?)?;
        AmplitudeSet::from_components(
            amplitudes.n_occ(),
            amplitudes.n_virt(),
            vec![omega1, omega2],
        )
    }

    fn energy(&self, amplitudes: &AmplitudeSet<F>) -> Result<F> {
        self.singles_doubles_energy(amplitudes.singles()?, amplitudes.doubles()?)
    }

    fn denominators(&self, amplitudes: &AmplitudeSet<F>) -> Result<AmplitudeSet<F>> {
        amplitudes.denominators(self.integrals)
    }
}
