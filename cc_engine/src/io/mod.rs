//! Input/Output operations
//!
//! Logging setup and the FCIDUMP integral reader. Tensors are persisted
//! through `tensor::io`.

mod fcidump;
mod output;

pub use fcidump::{parse_fcidump, parse_header, read_fcidump, FcidumpHeader};
pub use output::setup_output;
