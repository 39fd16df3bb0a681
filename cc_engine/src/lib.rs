//! Coupled-cluster engine over dense spin-orbital tensors.
//!
//! Amplitude equations (CCSD, CCSDT-1a, drCCD) are iterated to a fixed
//! point with linear or DIIS mixing; MP2 and (T) are closed-form;
//! EOM-CCSD roots come from a Davidson solve of the CCSD Jacobian. The
//! `app` module strings these together as named steps read from YAML.

pub mod amplitudes;
pub mod app;
pub mod config;
pub mod davidson;
pub mod eom;
pub mod error;
pub mod integrals;
pub mod io;
pub mod methods;
pub mod mixer;
pub mod solver;

#[cfg(test)]
mod testing;

pub use amplitudes::AmplitudeSet;
pub use error::{CcError, Result};
pub use integrals::{CoulombIntegrals, SpatialIntegrals};
