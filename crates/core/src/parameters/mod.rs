//! Parameter management types
//!
//! Configuration is read from a [`ParameterStore`] into plain value
//! structs that the pipeline consumes.

pub mod calibration;
pub mod error;
pub mod ins;
pub mod storage;

pub use calibration::CalibrationParams;
pub use error::ParameterError;
pub use ins::{InsParams, RawLoggingOptions};
pub use storage::{ParamFlags, ParamValue, ParameterStore, MAX_PARAMS, PARAM_NAME_LEN};
