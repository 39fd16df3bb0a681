//! Element types a tensor can hold.

use nalgebra::ComplexField;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Runtime tag of a tensor's element type, as stored in tensor files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Real64,
    Complex64,
}

impl ScalarType {
    pub fn tag(self) -> u32 {
        match self {
            ScalarType::Real64 => 0,
            ScalarType::Complex64 => 1,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(ScalarType::Real64),
            1 => Some(ScalarType::Complex64),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            ScalarType::Real64 => 8,
            ScalarType::Complex64 => 16,
        }
    }
}

/// Field over which tensors are built: `f64` or `Complex64`.
///
/// All arithmetic comes from [`ComplexField`]; this trait adds the runtime
/// tag and the little-endian encoding used by the file format.
pub trait Scalar: ComplexField<RealField = f64> + Copy + Default {
    const SCALAR_TYPE: ScalarType;

    /// Appends the little-endian encoding of `self` to `out`.
    fn encode(self, out: &mut Vec<u8>);

    /// Decodes one element. `bytes` holds exactly `SCALAR_TYPE.size_of()` bytes.
    fn decode(bytes: &[u8]) -> Self;
}

fn decode_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    f64::from_le_bytes(raw)
}

impl Scalar for f64 {
    const SCALAR_TYPE: ScalarType = ScalarType::Real64;

    fn encode(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        decode_f64(bytes)
    }
}

impl Scalar for Complex64 {
    const SCALAR_TYPE: ScalarType = ScalarType::Complex64;

    fn encode(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.re.to_le_bytes());
        out.extend_from_slice(&self.im.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        Complex64::new(decode_f64(&bytes[..8]), decode_f64(&bytes[8..16]))
    }
}
