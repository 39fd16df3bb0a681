use crate::amplitudes::AmplitudeSet;
use crate::config::Overrides;
use crate::davidson::EigenpairSet;
use crate::error::{CcError, Result};
use crate::integrals::CoulombIntegrals;
use std::collections::BTreeMap;
use std::sync::Arc;
use tensor::{Complex64, Tensor};
use tracing::debug;

/// A value published by one step for later steps.
#[derive(Debug, Clone)]
pub enum Data {
    Integrals(Arc<CoulombIntegrals<f64>>),
    Amplitudes(AmplitudeSet<f64>),
    Real(f64),
    Tensor(Tensor<f64>),
    ComplexTensor(Tensor<Complex64>),
    Eigenpairs(Arc<EigenpairSet<AmplitudeSet<f64>>>),
}

impl Data {
    pub fn kind(&self) -> &'static str {
        match self {
            Data::Integrals(_) => "integrals",
            Data::Amplitudes(_) => "amplitudes",
            Data::Real(_) => "real",
            Data::Tensor(_) => "tensor",
            Data::ComplexTensor(_) => "complex tensor",
            Data::Eigenpairs(_) => "eigenpairs",
        }
    }
}

/// Named data shared between the steps of one run.
#[derive(Debug, Default)]
pub struct Context {
    data: BTreeMap<String, Data>,
    overrides: Overrides,
}

impl Context {
    pub fn new(overrides: Overrides) -> Self {
        Context {
            data: BTreeMap::new(),
            overrides,
        }
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Stores `data` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, data: Data) {
        let name = name.into();
        debug!("context: {} <- {}", name, data.kind());
        self.data.insert(name, data);
    }

    pub fn get(&self, name: &str) -> Result<&Data> {
        self.data.get(name).ok_or_else(|| CcError::MissingData {
            name: name.to_string(),
        })
    }

    pub fn remove(&mut self, name: &str) -> Result<Data> {
        self.data.remove(name).ok_or_else(|| CcError::MissingData {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.data.keys().map(String::as_str).collect()
    }

    fn wrong_type(name: &str, expected: &'static str, found: &Data) -> CcError {
        CcError::WrongDataType {
            name: name.to_string(),
            expected,
            found: found.kind(),
        }
    }

    pub fn integrals(&self, name: &str) -> Result<Arc<CoulombIntegrals<f64>>> {
        match self.get(name)? {
            Data::Integrals(ints) => Ok(Arc::clone(ints)),
            other => Err(Self::wrong_type(name, "integrals", other)),
        }
    }

    pub fn amplitudes(&self, name: &str) -> Result<&AmplitudeSet<f64>> {
        match self.get(name)? {
            Data::Amplitudes(t) => Ok(t),
            other => Err(Self::wrong_type(name, "amplitudes", other)),
        }
    }

    pub fn real(&self, name: &str) -> Result<f64> {
        match self.get(name)? {
            Data::Real(x) => Ok(*x),
            other => Err(Self::wrong_type(name, "real", other)),
        }
    }

    pub fn tensor(&self, name: &str) -> Result<&Tensor<f64>> {
        match self.get(name)? {
            Data::Tensor(t) => Ok(t),
            other => Err(Self::wrong_type(name, "tensor", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_access_checks_kind() {
        let mut context = Context::default();
        context.insert("E", Data::Real(-1.0));
        assert_eq!(context.real("E").unwrap(), -1.0);
        assert!(matches!(
            context.tensor("E"),
            Err(CcError::WrongDataType {
                expected: "tensor",
                found: "real",
                ..
            })
        ));
        assert!(matches!(
            context.real("missing"),
            Err(CcError::MissingData { .. })
        ));
    }

    #[test]
    fn remove_drops_entry() {
        let mut context = Context::default();
        context.insert("T", Data::Tensor(Tensor::zeros("T", &[2])));
        assert!(context.contains("T"));
        context.remove("T").unwrap();
        assert!(context.names().is_empty());
        assert!(context.remove("T").is_err());
    }
}
