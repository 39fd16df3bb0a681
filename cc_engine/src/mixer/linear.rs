use super::MixerState;
use nalgebra::ComplexField;
use tensor::VectorSpace;

/// Damped fixed-point step: `previous + ratio * residual`.
#[derive(Debug, Clone)]
pub struct LinearMixer<V: VectorSpace> {
    ratio: f64,
    last: Option<(V, V)>,
}

impl<V: VectorSpace> LinearMixer<V> {
    pub fn new(ratio: f64) -> Self {
        LinearMixer { ratio, last: None }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn append(&mut self, amplitudes: V, residual: V) {
        self.last = Some((amplitudes, residual));
    }

    pub fn next(&self) -> Option<V> {
        let (amplitudes, residual) = self.last.as_ref()?;
        let mut next = amplitudes.clone();
        if self.ratio != 1.0 {
            next.add_scaled(<V::Field as ComplexField>::from_real(self.ratio - 1.0), residual);
        }
        Some(next)
    }

    pub fn state(&self) -> MixerState {
        MixerState::for_history(self.history_len(), 1)
    }

    pub fn history_len(&self) -> usize {
        usize::from(self.last.is_some())
    }
}
