use super::context::Context;
use super::steps;
use crate::config::StepArguments;
use crate::error::{CcError, Result};
use std::collections::BTreeMap;

/// What a step reports back for the results file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    /// Solver status, when the step iterates.
    pub status: Option<String>,
    pub iterations: Option<usize>,
    pub results: BTreeMap<String, f64>,
}

impl StepOutcome {
    pub fn with_result(mut self, key: &str, value: f64) -> Self {
        self.results.insert(key.to_string(), value);
        self
    }
}

/// A named step that reads from and publishes to the [`Context`].
pub trait Algorithm: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, arguments: &StepArguments<'_>, context: &mut Context) -> Result<StepOutcome>;
}

/// Algorithms by name; lookup ignores case.
#[derive(Default)]
pub struct AlgorithmRegistry {
    algorithms: BTreeMap<String, Box<dyn Algorithm>>,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every algorithm this crate provides.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(steps::FcidumpReader));
        registry.register(Box::new(steps::Mp2Step));
        registry.register(Box::new(steps::CcsdStep));
        registry.register(Box::new(steps::CcsdtStep));
        registry.register(Box::new(steps::DrccdStep));
        registry.register(Box::new(steps::PerturbativeTriplesStep));
        registry.register(Box::new(steps::EomCcsdStep));
        registry.register(Box::new(steps::TensorWriter));
        registry.register(Box::new(steps::TensorReader));
        registry.register(Box::new(steps::Delete));
        registry
    }

    /// Adds `algorithm`, replacing one registered under the same name.
    pub fn register(&mut self, algorithm: Box<dyn Algorithm>) {
        self.algorithms
            .insert(algorithm.name().to_ascii_lowercase(), algorithm);
    }

    pub fn get(&self, name: &str) -> Result<&dyn Algorithm> {
        self.algorithms
            .get(&name.to_ascii_lowercase())
            .map(|a| a.as_ref())
            .ok_or_else(|| CcError::UnknownAlgorithm {
                name: name.to_string(),
                available: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.algorithms.values().map(|a| a.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let registry = AlgorithmRegistry::standard();
        assert_eq!(registry.get("ccsd").unwrap().name(), "Ccsd");
        assert_eq!(registry.get("FCIDUMPREADER").unwrap().name(), "FcidumpReader");
        assert_eq!(registry.names().len(), 10);
    }

    #[test]
    fn unknown_name_lists_available() {
        let registry = AlgorithmRegistry::standard();
        match registry.get("Ccsdtq") {
            Err(CcError::UnknownAlgorithm { name, available }) => {
                assert_eq!(name, "Ccsdtq");
                assert!(available.contains("EomCcsd"));
            }
            other => panic!("expected UnknownAlgorithm, got {:?}", other.map(|a| a.name())),
        }
    }
}
