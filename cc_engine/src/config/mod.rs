//! Input file and option structures
//!
//! An input file is a list of steps. Each step names an algorithm, a flat
//! `in` map with data references and options, and an `out` map naming the
//! data it publishes. Options are typed structs with optional fields that
//! `with_defaults()` completes; command-line overrides are applied first.

mod args;

pub use args::{Args, Overrides};

use crate::davidson::{DavidsonSettings, Target};
use crate::error::{CcError, Result};
use crate::mixer::{MixerSettings, MixerType};
use crate::solver::SolverSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yml::{Mapping, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputFile {
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StepConfig {
    pub name: String,
    #[serde(rename = "in", default)]
    pub inputs: Mapping,
    #[serde(rename = "out", default)]
    pub outputs: BTreeMap<String, String>,
}

impl StepConfig {
    pub fn arguments(&self) -> StepArguments<'_> {
        StepArguments {
            inputs: &self.inputs,
            outputs: &self.outputs,
        }
    }
}

/// Read access to one step's `in` and `out` maps.
#[derive(Debug, Clone, Copy)]
pub struct StepArguments<'a> {
    inputs: &'a Mapping,
    outputs: &'a BTreeMap<String, String>,
}

impl<'a> StepArguments<'a> {
    pub fn new(inputs: &'a Mapping, outputs: &'a BTreeMap<String, String>) -> Self {
        StepArguments { inputs, outputs }
    }

    fn value(&self, key: &str) -> Option<&'a Value> {
        self.inputs.get(Value::String(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.value(key).is_some()
    }

    /// String value of `key`, e.g. the name of a context entry.
    pub fn string(&self, key: &str) -> Result<&'a str> {
        match self.value(key) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(CcError::invalid_option(key, "expected a string")),
            None => Err(CcError::MissingData {
                name: key.to_string(),
            }),
        }
    }

    pub fn optional_string(&self, key: &str) -> Result<Option<&'a str>> {
        if self.contains(key) {
            self.string(key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Deserializes the whole `in` map; keys the options do not know are
    /// ignored.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T> {
        serde_yml::from_value(Value::Mapping(self.inputs.clone()))
            .map_err(|err| CcError::invalid_option("in", err.to_string()))
    }

    pub fn output(&self, key: &str) -> Option<&'a str> {
        self.outputs.get(key).map(String::as_str)
    }
}

/// Options shared by every amplitude-equation step
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOptions {
    pub energy_convergence: Option<f64>,
    pub amplitudes_convergence: Option<f64>,
    pub max_iterations: Option<usize>,
    pub mixer_type: Option<MixerType>,
    pub mixer_ratio: Option<f64>,
    pub max_residua: Option<usize>,
    pub level_shift: Option<f64>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        ClusterOptions {
            energy_convergence: Some(1e-6),
            amplitudes_convergence: Some(1e-5),
            max_iterations: Some(16),
            mixer_type: Some(MixerType::Linear),
            mixer_ratio: Some(1.0),
            max_residua: Some(4),
            level_shift: Some(0.0),
        }
    }
}

impl ClusterOptions {
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if overrides.max_iterations.is_some() {
            self.max_iterations = overrides.max_iterations;
        }
        if overrides.mixer.is_some() {
            self.mixer_type = overrides.mixer;
        }
        self
    }

    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.energy_convergence.is_none() {
            self.energy_convergence = defaults.energy_convergence;
        }
        if self.amplitudes_convergence.is_none() {
            self.amplitudes_convergence = defaults.amplitudes_convergence;
        }
        if self.max_iterations.is_none() {
            self.max_iterations = defaults.max_iterations;
        }
        if self.mixer_type.is_none() {
            self.mixer_type = defaults.mixer_type;
        }
        if self.mixer_ratio.is_none() {
            self.mixer_ratio = defaults.mixer_ratio;
        }
        if self.max_residua.is_none() {
            self.max_residua = defaults.max_residua;
        }
        if self.level_shift.is_none() {
            self.level_shift = defaults.level_shift;
        }
        self
    }

    pub fn solver_settings(&self) -> Result<SolverSettings> {
        let defaults = SolverSettings::default();
        let mixer = MixerSettings {
            kind: self.mixer_type.unwrap_or(defaults.mixer.kind),
            ratio: self.mixer_ratio.unwrap_or(defaults.mixer.ratio),
            max_residua: self.max_residua.unwrap_or(defaults.mixer.max_residua),
        };
        if mixer.max_residua == 0 {
            return Err(CcError::invalid_option("maxResidua", "must be at least 1"));
        }
        if !(mixer.ratio > 0.0 && mixer.ratio <= 1.0) {
            return Err(CcError::invalid_option(
                "mixerRatio",
                format!("{} is outside (0, 1]", mixer.ratio),
            ));
        }
        Ok(SolverSettings {
            energy_convergence: self.energy_convergence.unwrap_or(defaults.energy_convergence),
            amplitudes_convergence: self
                .amplitudes_convergence
                .unwrap_or(defaults.amplitudes_convergence),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            level_shift: self.level_shift.unwrap_or(defaults.level_shift),
            mixer,
        })
    }
}

/// Options of the Davidson eigensolver
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DavidsonOptions {
    pub n_roots: Option<usize>,
    pub max_iterations: Option<usize>,
    pub tolerance: Option<f64>,
    pub energy_tolerance: Option<f64>,
    pub max_subspace: Option<usize>,
    pub denominator_floor: Option<f64>,
    pub target: Option<Target>,
}

impl Default for DavidsonOptions {
    fn default() -> Self {
        DavidsonOptions {
            n_roots: Some(3),
            max_iterations: Some(32),
            tolerance: Some(1e-6),
            energy_tolerance: Some(1e-8),
            max_subspace: None,
            denominator_floor: Some(1e-4),
            target: Some(Target::Lowest),
        }
    }
}

impl DavidsonOptions {
    pub fn with_overrides(mut self, overrides: &Overrides) -> Self {
        if overrides.max_iterations.is_some() {
            self.max_iterations = overrides.max_iterations;
        }
        self
    }

    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        let defaults = Self::default();
        if self.n_roots.is_none() {
            self.n_roots = defaults.n_roots;
        }
        if self.max_iterations.is_none() {
            self.max_iterations = defaults.max_iterations;
        }
        if self.tolerance.is_none() {
            self.tolerance = defaults.tolerance;
        }
        if self.energy_tolerance.is_none() {
            self.energy_tolerance = defaults.energy_tolerance;
        }
        if self.max_subspace.is_none() {
            let roots = self.n_roots.unwrap_or(1);
            self.max_subspace = Some((8 * roots).max(2 * roots + 2));
        }
        if self.denominator_floor.is_none() {
            self.denominator_floor = defaults.denominator_floor;
        }
        if self.target.is_none() {
            self.target = defaults.target;
        }
        self
    }

    pub fn davidson_settings(&self) -> DavidsonSettings {
        let defaults = DavidsonSettings::default();
        let n_roots = self.n_roots.unwrap_or(defaults.n_roots);
        DavidsonSettings {
            n_roots,
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            energy_tolerance: self.energy_tolerance.unwrap_or(defaults.energy_tolerance),
            max_subspace: self
                .max_subspace
                .unwrap_or((8 * n_roots).max(2 * n_roots + 2)),
            target: self.target.unwrap_or(defaults.target),
        }
    }

    pub fn denominator_floor(&self) -> f64 {
        self.denominator_floor.unwrap_or(1e-4)
    }
}

/// Parses a YAML input file.
pub fn parse_input(content: &str) -> std::result::Result<InputFile, serde_yml::Error> {
    serde_yml::from_str::<InputFile>(content)
}
