//! Mixers propose the next amplitudes from the history of Jacobi updates.
//!
//! Every iteration the solver hands over the Jacobi estimate together with
//! the change that produced it: `append(amplitudes, residual)`. The linear
//! mixer damps that change, DIIS extrapolates over a window of past pairs.
//!
//! ```rust,ignore
//! let mut mixer = Mixer::new(&MixerSettings::default());
//! mixer.append(estimate, change);
//! let next = mixer.next().unwrap_or(current);
//! ```

mod diis;
mod linear;


pub use diis::DiisMixer;
pub use linear::LinearMixer;

use serde::{Deserialize, Serialize};
use std::fmt;
use tensor::VectorSpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum MixerType {
    #[default]
    #[serde(alias = "linear", alias = "LinearMixer")]
    Linear,
    #[serde(alias = "DIIS", alias = "diis", alias = "DiisMixer")]
    Diis,
}

impl fmt::Display for MixerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerType::Linear => write!(f, "Linear"),
            MixerType::Diis => write!(f, "DIIS"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixerState {
    Empty,
    Accumulating,
    /// History is at its cap; every append evicts the oldest pair.
    Steady,
}

impl MixerState {
    fn for_history(len: usize, capacity: usize) -> Self {
        match len {
            0 => MixerState::Empty,
            n if n >= capacity => MixerState::Steady,
            _ => MixerState::Accumulating,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixerSettings {
    pub kind: MixerType,
    /// Damping of the linear mixer; `1.0` takes the full Jacobi step.
    pub ratio: f64,
    /// DIIS window.
    pub max_residua: usize,
}

impl Default for MixerSettings {
    fn default() -> Self {
        MixerSettings {
            kind: MixerType::Linear,
            ratio: 1.0,
            max_residua: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Mixer<V: VectorSpace> {
    Linear(LinearMixer<V>),
    Diis(DiisMixer<V>),
}

impl<V: VectorSpace> Mixer<V> {
    pub fn new(settings: &MixerSettings) -> Self {
        match settings.kind {
            MixerType::Linear => Mixer::Linear(LinearMixer::new(settings.ratio)),
            MixerType::Diis => Mixer::Diis(DiisMixer::new(settings.max_residua)),
        }
    }

    pub fn kind(&self) -> MixerType {
        match self {
            Mixer::Linear(_) => MixerType::Linear,
            Mixer::Diis(_) => MixerType::Diis,
        }
    }

    pub fn append(&mut self, amplitudes: V, residual: V) {
        match self {
            Mixer::Linear(mixer) => mixer.append(amplitudes, residual),
            Mixer::Diis(mixer) => mixer.append(amplitudes, residual),
        }
    }

    /// Proposed amplitudes, `None` before the first `append`.
    pub fn next(&self) -> Option<V> {
        match self {
            Mixer::Linear(mixer) => mixer.next(),
            Mixer::Diis(mixer) => mixer.next(),
        }
    }

    pub fn state(&self) -> MixerState {
        match self {
            Mixer::Linear(mixer) => mixer.state(),
            Mixer::Diis(mixer) => mixer.state(),
        }
    }

    pub fn history_len(&self) -> usize {
        match self {
            Mixer::Linear(mixer) => mixer.history_len(),
            Mixer::Diis(mixer) => mixer.history_len(),
        }
    }
}
