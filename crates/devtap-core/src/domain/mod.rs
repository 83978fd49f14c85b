//! Domain module containing the pipeline value types.

pub mod fingerprint;
pub mod operation;

pub use fingerprint::{fingerprint, OperationKey};
pub use operation::*;
