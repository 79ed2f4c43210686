//! Job definitions and their compilation into Kubernetes Jobs
//!
//! Turns one merged job config mapping into a `batch/v1` Job:
//! - Typed, validated `JobDefinition` via `definition`
//! - CPU/memory/GPU requests and limits via `resources`
//! - Node affinity for GPU product, GPU memory, region and hostname via `affinity`
//!
//! # Usage
//!
//! ```rust,ignore
//! let definition = JobDefinition::from_value(&merged)?;
//! let job = JobCompiler::new(&definition)
//!     .with_namespace(namespace)
//!     .compile()?;
//! ```

pub mod affinity;
pub mod compiler;
pub mod definition;
mod helpers;
pub mod k8s;
pub mod resources;

pub use compiler::{synthesize, JobCompiler};
pub use definition::{job_name_of, Command, JobDefinition};

/// The cluster object submitted for one job
pub type WorkloadDescriptor = k8s::Job;
