//! Error types for tensor operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by tensor construction, contraction and file access.
#[derive(Debug, Error)]
pub enum TensorError {
    /// Two operands disagree on the extent of an index.
    #[error("shape mismatch in {operation}: {left} has shape {left_shape:?}, {right} has shape {right_shape:?}")]
    ShapeMismatch {
        operation: String,
        left: String,
        left_shape: Vec<usize>,
        right: String,
        right_shape: Vec<usize>,
    },

    /// The label string does not match the tensor order.
    #[error("tensor {tensor} has order {order} but was labelled \"{labels}\"")]
    LabelMismatch {
        tensor: String,
        order: usize,
        labels: String,
    },

    /// An output label is not carried by any operand.
    #[error("label '{label}' of {output} does not appear in any operand")]
    UnboundLabel { label: char, output: String },

    /// A contraction was evaluated without operands.
    #[error("contraction into {output} has no operands")]
    EmptyContraction { output: String },

    /// A permutation group mixes index spaces or extents.
    #[error("labels \"{group}\" of {tensor} do not share one index space")]
    MixedSpacePermutation { tensor: String, group: String },

    #[error("index {index:?} is out of bounds for {tensor} with shape {shape:?}")]
    IndexOutOfBounds {
        tensor: String,
        index: Vec<usize>,
        shape: Vec<usize>,
    },

    #[error("invalid tensor file {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, TensorError>;

impl TensorError {
    pub(crate) fn shape_mismatch(
        operation: impl Into<String>,
        left: (&str, &[usize]),
        right: (&str, &[usize]),
    ) -> Self {
        TensorError::ShapeMismatch {
            operation: operation.into(),
            left: left.0.to_string(),
            left_shape: left.1.to_vec(),
            right: right.0.to_string(),
            right_shape: right.1.to_vec(),
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TensorError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
