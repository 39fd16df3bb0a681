//! Dense labelled tensors for coupled-cluster algebra.
//!
//! The crate provides the tensor handle, an Einstein-notation contraction
//! engine with antisymmetrization, the [`VectorSpace`] abstraction used by
//! the iterative solvers, and a small binary file format.
//!
//! ```rust,ignore
//! use tensor::{Contraction, Tensor};
//!
//! let a = Tensor::<f64>::zeros("A", &[2, 3]);
//! let b = Tensor::<f64>::zeros("B", &[3, 4]);
//! let mut c = Tensor::<f64>::zeros("C", &[2, 4]);
//! Contraction::new(1.0)
//!     .operand(&a, "ik")
//!     .operand(&b, "kj")
//!     .accumulate_into(0.0, &mut c, "ij")?;
//! ```

pub mod antisym;
pub mod contract;
pub mod error;
pub mod io;
pub mod scalar;
pub mod space;
mod tensor;
pub mod vector;

pub use antisym::Antisymmetrizer;
pub use contract::Contraction;
pub use error::{Result, TensorError};
pub use scalar::{Scalar, ScalarType};
pub use space::IndexSpace;
pub use tensor::Tensor;
pub use vector::VectorSpace;

pub use num_complex::Complex64;
