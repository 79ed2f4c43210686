//! Batch launcher
//!
//! Loads a batch configuration, layers the shared defaults under each job,
//! compiles every selected job and submits it through a `ClusterClient`.
//! Failures are isolated per job and collected into a `BatchReport`.

pub mod client;
pub mod config;
pub mod launcher;
pub mod report;

pub use client::{create_client, ClusterClient, KubeClusterClient, PodSummary, SubmittedJob};
pub use config::BatchConfig;
pub use launcher::{BatchLauncher, LaunchOptions};
pub use report::{BatchReport, JobOutcome, JobRecord};
