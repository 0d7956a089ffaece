//! Shared infrastructure: logging macros and platform traits.

pub mod logging;
pub mod traits;
