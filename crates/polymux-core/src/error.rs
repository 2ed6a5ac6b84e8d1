//! Error types for polymux-core.

use thiserror::Error;

/// Result type alias for polymux-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("{param} = {value} out of range ({min}-{max})")]
    ParamOutOfRange {
        param: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("Unknown parameter key: {0}")]
    UnknownParam(u16),

    #[error("Unknown parameter name: {0}")]
    UnknownParamName(String),
}
