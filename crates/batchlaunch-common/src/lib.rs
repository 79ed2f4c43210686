//! Shared types for batchlaunch: errors, YAML loading and config merging

#![deny(missing_docs)]

pub mod error;
pub mod merge;
pub mod yaml;

pub use error::Error;
pub use merge::merge;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
