//! Binary tensor files.
//!
//! Layout, all integers little-endian:
//!
//! | field        | type            |
//! |--------------|-----------------|
//! | magic        | `b"CCTN"`       |
//! | version      | `u32` (= 100)   |
//! | scalar type  | `u32` tag       |
//! | order        | `u32`           |
//! | extents      | `order × u64`   |
//! | name length  | `u32`           |
//! | name         | UTF-8 bytes     |
//! | elements     | row-major data  |
//!
//! Complex elements are stored as real part followed by imaginary part.

use crate::error::{Result, TensorError};
use crate::scalar::{Scalar, ScalarType};
use crate::tensor::Tensor;
use num_complex::Complex64;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MAGIC: [u8; 4] = *b"CCTN";
pub const VERSION: u32 = 100;

/// Everything in a tensor file except the elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorHeader {
    pub version: u32,
    pub scalar_type: ScalarType,
    pub shape: Vec<usize>,
    pub name: String,
}

/// A tensor read without knowing its element type in advance.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyTensor {
    Real(Tensor<f64>),
    Complex(Tensor<Complex64>),
}

impl AnyTensor {
    pub fn name(&self) -> &str {
        match self {
            AnyTensor::Real(t) => t.name(),
            AnyTensor::Complex(t) => t.name(),
        }
    }
}

fn encode_header(header: &TensorHeader, out: &mut Vec<u8>) {
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&header.version.to_le_bytes());
    out.extend_from_slice(&header.scalar_type.tag().to_le_bytes());
    out.extend_from_slice(&(header.shape.len() as u32).to_le_bytes());
    for &extent in &header.shape {
        out.extend_from_slice(&(extent as u64).to_le_bytes());
    }
    out.extend_from_slice(&(header.name.len() as u32).to_le_bytes());
    out.extend_from_slice(header.name.as_bytes());
}

pub fn write_tensor<F: Scalar>(path: impl AsRef<Path>, tensor: &Tensor<F>) -> Result<()> {
    let path = path.as_ref();
    let header = TensorHeader {
        version: VERSION,
        scalar_type: F::SCALAR_TYPE,
        shape: tensor.shape().to_vec(),
        name: tensor.name().to_string(),
    };
    let mut bytes = Vec::with_capacity(64 + tensor.len() * F::SCALAR_TYPE.size_of());
    encode_header(&header, &mut bytes);
    for &x in tensor.data() {
        x.encode(&mut bytes);
    }
    fs::write(path, bytes).map_err(|source| TensorError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "wrote {} {:?} ({} elements) to {}",
        tensor.name(),
        tensor.shape(),
        tensor.len(),
        path.display()
    );
    Ok(())
}

struct ByteReader<'b> {
    bytes: &'b [u8],
    pos: usize,
    path: PathBuf,
}

impl<'b> ByteReader<'b> {
    fn take(&mut self, n: usize) -> Result<&'b [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| TensorError::format(&self.path, "unexpected end of file"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(raw))
    }

    fn header(&mut self) -> Result<TensorHeader> {
        if self.take(4)? != MAGIC {
            return Err(TensorError::format(&self.path, "not a tensor file"));
        }
        let version = self.u32()?;
        if version != VERSION {
            return Err(TensorError::format(
                &self.path,
                format!("unsupported version {version}, expected {VERSION}"),
            ));
        }
        let tag = self.u32()?;
        let scalar_type = ScalarType::from_tag(tag)
            .ok_or_else(|| TensorError::format(&self.path, format!("unknown scalar type {tag}")))?;
        let order = self.u32()? as usize;
        let mut shape = Vec::with_capacity(order);
        for _ in 0..order {
            let extent = self.u64()?;
            let extent = usize::try_from(extent).map_err(|_| {
                TensorError::format(&self.path, format!("extent {extent} does not fit in memory"))
            })?;
            shape.push(extent);
        }
        let name_len = self.u32()? as usize;
        let name = String::from_utf8(self.take(name_len)?.to_vec())
            .map_err(|_| TensorError::format(&self.path, "tensor name is not UTF-8"))?;
        Ok(TensorHeader {
            version,
            scalar_type,
            shape,
            name,
        })
    }

    fn elements<F: Scalar>(&mut self, header: &TensorHeader) -> Result<Tensor<F>> {
        let len = header
            .shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| TensorError::format(&self.path, "tensor is too large"))?;
        let size = F::SCALAR_TYPE.size_of();
        let raw = self.take(len.saturating_mul(size))?;
        if self.pos != self.bytes.len() {
            return Err(TensorError::format(
                &self.path,
                format!("{} trailing bytes", self.bytes.len() - self.pos),
            ));
        }
        let data = raw.chunks_exact(size).map(F::decode).collect();
        Tensor::from_vec(header.name.clone(), &header.shape, data)
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| TensorError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_header(path: impl AsRef<Path>) -> Result<TensorHeader> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    ByteReader {
        bytes: &bytes,
        pos: 0,
        path: path.to_path_buf(),
    }
    .header()
}

/// Reads a tensor whose element type must be `F`.
pub fn read_tensor<F: Scalar>(path: impl AsRef<Path>) -> Result<Tensor<F>> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    let mut reader = ByteReader {
        bytes: &bytes,
        pos: 0,
        path: path.to_path_buf(),
    };
    let header = reader.header()?;
    if header.scalar_type != F::SCALAR_TYPE {
        return Err(TensorError::format(
            path,
            format!(
                "holds {:?} elements, expected {:?}",
                header.scalar_type,
                F::SCALAR_TYPE
            ),
        ));
    }
    reader.elements(&header)
}

pub fn read_any(path: impl AsRef<Path>) -> Result<AnyTensor> {
    let path = path.as_ref();
    match read_header(path)?.scalar_type {
        ScalarType::Real64 => read_tensor(path).map(AnyTensor::Real),
        ScalarType::Complex64 => read_tensor(path).map(AnyTensor::Complex),
    }
}
